//! Cross-origin policy.
use salvo::cors::{AllowOrigin, Cors, CorsHandler};
use salvo::http::Method;

use crate::config::CorsPolicy;

const ALLOWED_HEADERS: [&str; 2] = ["authorization", "content-type"];

/// Builds the service level CORS middleware for `policy`.
///
/// An allow-list sends credentials; the open policy never does, since a
/// wildcard origin cannot be combined with credentials.
pub fn handler(policy: &CorsPolicy) -> CorsHandler {
    let cors = Cors::new()
        .allow_methods(vec![Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers(ALLOWED_HEADERS.to_vec());
    let cors = match policy {
        CorsPolicy::Open => cors.allow_origin(AllowOrigin::any()),
        CorsPolicy::AllowList(origins) => cors.allow_origin(origins).allow_credentials(true),
    };
    cors.into_handler()
}
