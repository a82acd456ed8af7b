//! HTTP/JSON blog post service.
//!
//! | Route | Auth | Success |
//! |---|---|---|
//! | `GET /api/blogposts` | none | 200, list of posts |
//! | `POST /api/blogposts` | bearer token | 201, created post |
//! | `DELETE /api/blogposts/{id}` | bearer token | 200, deleted post |
//! | `POST /api/auth/register` | none | 201 |
//! | `POST /api/auth/login` | none | 200, signed token |
//!
//! Every failure is answered with a `{"error": "..."}` body, see [`AppError`].
//!
//! # Example
//!
//! ```no_run
//! use blogpost_server::Config;
//! use salvo::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::from_env()?;
//!     let state = blogpost_server::build_state(&config).await?;
//!     let acceptor = TcpListener::new(config.listen_addr()).bind().await;
//!     Server::new(acceptor)
//!         .serve(blogpost_server::service(state, &config.cors))
//!         .await;
//!     Ok(())
//! }
//! ```
#![cfg_attr(docsrs, feature(doc_cfg))]

use std::sync::Arc;

use blogpost_store::{MemoryStore, MongoStore, StoreError};
use salvo::affix_state;
use salvo::logging::Logger;
use salvo::prelude::*;

pub mod auth;
pub mod config;
pub mod cors;
pub mod error;
pub mod routers;
pub mod state;

pub use auth::{Claims, TokenIssuer};
pub use config::{Config, ConfigError, CorsPolicy, StoreBackend};
pub use error::{AppError, AppResult, ErrorBody};
pub use state::AppState;

/// Builds the `/api` router with `state` injected into every request.
pub fn router(state: AppState) -> Router {
    let posts = routers::posts::router(&state.tokens);
    Router::with_path("api")
        .hoop(affix_state::inject(state))
        .push(posts)
        .push(routers::auth::router())
}

/// Wraps [`router`] with request logging and the CORS policy.
///
/// CORS sits on the service so preflight requests are answered for every path.
pub fn service(state: AppState, cors: &CorsPolicy) -> Service {
    Service::new(router(state))
        .hoop(Logger::default())
        .hoop(cors::handler(cors))
}

/// Opens the configured store and assembles the shared state.
pub async fn build_state(config: &Config) -> Result<AppState, StoreError> {
    let tokens = TokenIssuer::new(&config.jwt_secret, config.token_ttl);
    let state = match &config.store {
        StoreBackend::Memory { seed_posts } => {
            let store = if *seed_posts {
                MemoryStore::with_seed_posts()
            } else {
                MemoryStore::new()
            };
            tracing::warn!("using the in-memory store, data is lost on restart");
            AppState::in_memory(store, tokens, config.bcrypt_cost)
        }
        StoreBackend::Mongo(options) => {
            let store = Arc::new(MongoStore::connect(options).await?);
            AppState::new(store.clone(), store, tokens, config.bcrypt_cost)
        }
    };
    Ok(state)
}
