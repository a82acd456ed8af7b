//! Error type shared by all handlers and its JSON rendering.
use blogpost_store::{StoreError, ValidationError};
use salvo::http::ParseError;
use salvo::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// JSON body of every error response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Human readable message.
    pub error: String,
}

/// Errors a handler can answer with.
///
/// Client mistakes map to 4xx, everything else to 500 with the underlying
/// message passed through.
#[derive(Debug, Error)]
pub enum AppError {
    /// Required fields are missing or empty.
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// The body is not the expected JSON.
    #[error("invalid request body: {0}")]
    InvalidBody(String),
    /// Registration with a name that is already in use.
    #[error("username already exists")]
    UsernameTaken,
    /// Unknown username or wrong password.
    #[error("invalid username or password")]
    InvalidCredentials,
    /// No bearer token in the authorization header.
    #[error("authorization header missing or malformed")]
    MissingToken,
    /// Bearer token with a bad signature or past its expiry.
    #[error("invalid or expired token")]
    InvalidToken,
    /// No post with the requested identifier.
    #[error("blog post not found")]
    PostNotFound,
    /// Persistence failure.
    #[error(transparent)]
    Store(StoreError),
    /// Password hashing failure.
    #[error(transparent)]
    Hashing(#[from] bcrypt::BcryptError),
    /// Token signing failure.
    #[error(transparent)]
    Token(#[from] jsonwebtoken::errors::Error),
    /// Anything else.
    #[error("{0}")]
    Internal(String),
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::DuplicateUsername(_) => Self::UsernameTaken,
            err => Self::Store(err),
        }
    }
}

impl From<ParseError> for AppError {
    fn from(err: ParseError) -> Self {
        Self::InvalidBody(err.to_string())
    }
}

impl AppError {
    /// Status code sent for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_)
            | Self::InvalidBody(_)
            | Self::UsernameTaken
            | Self::InvalidCredentials => StatusCode::BAD_REQUEST,
            Self::MissingToken => StatusCode::UNAUTHORIZED,
            Self::InvalidToken => StatusCode::FORBIDDEN,
            Self::PostNotFound => StatusCode::NOT_FOUND,
            Self::Store(_) | Self::Hashing(_) | Self::Token(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

#[async_trait]
impl Writer for AppError {
    async fn write(self, _req: &mut Request, _depot: &mut Depot, res: &mut Response) {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = ?self, "request failed");
        } else {
            tracing::debug!(error = %self, %status, "request rejected");
        }
        res.status_code(status);
        res.render(Json(ErrorBody {
            error: self.to_string(),
        }));
    }
}

/// Result type returned by handlers.
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use salvo::test::{ResponseExt, TestClient};

    use super::*;

    #[handler]
    async fn taken() -> AppResult<()> {
        Err(StoreError::DuplicateUsername("alice".into()).into())
    }

    #[handler]
    async fn broken() -> AppResult<()> {
        Err(AppError::Internal("connection refused".into()))
    }

    #[tokio::test]
    async fn test_error_body() {
        let router = Router::new()
            .push(Router::with_path("taken").get(taken))
            .push(Router::with_path("broken").get(broken));
        let service = Service::new(router);

        let mut res = TestClient::get("http://127.0.0.1:5800/taken").send(&service).await;
        assert_eq!(res.status_code, Some(StatusCode::BAD_REQUEST));
        let body: ErrorBody = res.take_json().await.unwrap();
        assert_eq!(body.error, "username already exists");

        let mut res = TestClient::get("http://127.0.0.1:5800/broken").send(&service).await;
        assert_eq!(res.status_code, Some(StatusCode::INTERNAL_SERVER_ERROR));
        let body: ErrorBody = res.take_json().await.unwrap();
        assert_eq!(body.error, "connection refused");
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(AppError::MissingToken.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(AppError::InvalidToken.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(AppError::PostNotFound.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(
            AppError::from(ValidationError::MissingPostFields).status_code(),
            StatusCode::BAD_REQUEST
        );
    }
}
