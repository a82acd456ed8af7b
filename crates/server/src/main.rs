use blogpost_server::{Config, build_state, service};
use salvo::prelude::*;
use salvo::server::ServerHandle;
use tokio::signal;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = Config::from_env()?;
    tracing::debug!(?config, "configuration loaded");
    let state = build_state(&config).await?;

    let acceptor = TcpListener::new(config.listen_addr()).bind().await;
    let server = Server::new(acceptor);
    tokio::spawn(listen_shutdown_signal(server.handle()));

    tracing::info!("server listening on http://{}", config.listen_addr());
    server.serve(service(state, &config.cors)).await;
    Ok(())
}

async fn listen_shutdown_signal(handle: ServerHandle) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("ctrl-c received, shutting down"),
        _ = terminate => tracing::info!("SIGTERM received, shutting down"),
    }
    handle.stop_graceful(None);
}
