//! Password hashing, token issuing and the bearer token gate.
//!
//! The gate is salvo's [`JwtAuth`] in pass-through mode followed by
//! [`require_auth`], so a rejected request still gets the JSON error body:
//!
//! - no `Authorization: Bearer <token>` header: 401
//! - bad signature, expired or undecodable token: 403
use std::fmt;
use std::time::Duration;

use blogpost_store::User;
use jsonwebtoken::{EncodingKey, Header};
use salvo::jwt_auth::{ConstDecoder, HeaderFinder, JwtAuth, JwtAuthDepotExt, JwtAuthState};
use salvo::prelude::*;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::error::{AppError, AppResult};

/// Claims carried by issued tokens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Identifier of the user.
    pub sub: String,
    /// Username at issue time.
    pub username: String,
    /// Issued at, unix seconds.
    pub iat: i64,
    /// Expiry, unix seconds.
    pub exp: i64,
}

/// Signs tokens and builds the matching verification gate.
#[derive(Clone)]
pub struct TokenIssuer {
    secret: Vec<u8>,
    encoding_key: EncodingKey,
    ttl: Duration,
}

impl fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenIssuer")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl TokenIssuer {
    /// Creates an issuer signing with `secret` (HS256).
    pub fn new(secret: impl AsRef<[u8]>, ttl: Duration) -> Self {
        let secret = secret.as_ref().to_vec();
        Self {
            encoding_key: EncodingKey::from_secret(&secret),
            secret,
            ttl,
        }
    }

    /// Validity of issued tokens.
    #[inline]
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Issues a token for `user`, valid for [`ttl`](Self::ttl).
    pub fn issue(&self, user: &User) -> AppResult<String> {
        let iat = OffsetDateTime::now_utc().unix_timestamp();
        let exp = i64::try_from(self.ttl.as_secs())
            .ok()
            .and_then(|secs| iat.checked_add(secs))
            .ok_or_else(|| AppError::Internal("token lifetime out of range".to_owned()))?;
        let claims = Claims {
            sub: user.id.to_string(),
            username: user.username.clone(),
            iat,
            exp,
        };
        Ok(jsonwebtoken::encode(
            &Header::default(),
            &claims,
            &self.encoding_key,
        )?)
    }

    /// Middleware decoding the bearer token into the depot.
    ///
    /// It never rejects on its own; pair it with [`require_auth`].
    pub fn gate(&self) -> JwtAuth<Claims, ConstDecoder> {
        JwtAuth::new(ConstDecoder::from_secret(&self.secret))
            .finders(vec![Box::new(HeaderFinder::new())])
            .force_passed(true)
    }
}

/// Stops the request unless the preceding gate authorized it.
#[handler]
pub async fn require_auth(
    req: &mut Request,
    depot: &mut Depot,
    res: &mut Response,
    ctrl: &mut FlowCtrl,
) {
    let err = match depot.jwt_auth_state() {
        JwtAuthState::Authorized => return,
        JwtAuthState::Unauthorized => AppError::MissingToken,
        JwtAuthState::Forbidden => AppError::InvalidToken,
    };
    err.write(req, depot, res).await;
    ctrl.skip_rest();
}

/// Claims of the authorized caller, if the gate ran and accepted the token.
pub fn current_claims(depot: &Depot) -> Option<&Claims> {
    depot.jwt_auth_data::<Claims>().map(|data| &data.claims)
}

/// Hashes `password` with a random salt on the blocking pool.
pub async fn hash_password(password: String, cost: u32) -> AppResult<String> {
    tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?
        .map_err(AppError::from)
}

/// Checks `password` against a stored bcrypt hash on the blocking pool.
pub async fn verify_password(password: String, hash: String) -> AppResult<bool> {
    tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?
        .map_err(AppError::from)
}

#[cfg(test)]
mod tests {
    use blogpost_store::RecordId;
    use jsonwebtoken::{DecodingKey, Validation};
    use salvo::test::{ResponseExt, TestClient};

    use super::*;
    use crate::error::ErrorBody;

    fn user() -> User {
        User {
            id: RecordId::Seq(9),
            username: "alice".into(),
            password_hash: String::new(),
        }
    }

    #[test]
    fn test_issue_token() {
        let issuer = TokenIssuer::new("secret", Duration::from_secs(3600));
        let token = issuer.issue(&user()).unwrap();
        let data = jsonwebtoken::decode::<Claims>(
            &token,
            &DecodingKey::from_secret(b"secret"),
            &Validation::default(),
        )
        .unwrap();
        assert_eq!(data.claims.sub, "9");
        assert_eq!(data.claims.username, "alice");
        assert_eq!(data.claims.exp - data.claims.iat, 3600);
    }

    #[test]
    fn test_issue_with_oversized_ttl() {
        let issuer = TokenIssuer::new("secret", Duration::MAX);
        assert!(matches!(issuer.issue(&user()), Err(AppError::Internal(_))));
    }

    #[tokio::test]
    async fn test_password_hash_round_trip() {
        let hash = hash_password("hunter2".into(), 4).await.unwrap();
        assert_ne!(hash, "hunter2");
        assert!(verify_password("hunter2".into(), hash.clone()).await.unwrap());
        assert!(!verify_password("hunter3".into(), hash).await.unwrap());
    }

    #[tokio::test]
    async fn test_gate() {
        #[handler]
        async fn whoami(depot: &mut Depot) -> String {
            current_claims(depot)
                .map(|claims| claims.username.clone())
                .unwrap_or_default()
        }

        let issuer = TokenIssuer::new("secret", Duration::from_secs(3600));
        let router = Router::with_hoop(issuer.gate())
            .hoop(require_auth)
            .push(Router::with_path("whoami").get(whoami));
        let service = Service::new(router);

        let token = issuer.issue(&user()).unwrap();
        let mut res = TestClient::get("http://127.0.0.1:5800/whoami")
            .bearer_auth(&token)
            .send(&service)
            .await;
        assert_eq!(res.status_code, Some(StatusCode::OK));
        assert_eq!(res.take_string().await.unwrap(), "alice");

        let mut res = TestClient::get("http://127.0.0.1:5800/whoami")
            .send(&service)
            .await;
        assert_eq!(res.status_code, Some(StatusCode::UNAUTHORIZED));
        let body: ErrorBody = res.take_json().await.unwrap();
        assert_eq!(body.error, "authorization header missing or malformed");

        let res = TestClient::get("http://127.0.0.1:5800/whoami")
            .add_header("authorization", format!("Basic {token}"), true)
            .send(&service)
            .await;
        assert_eq!(res.status_code, Some(StatusCode::UNAUTHORIZED));

        let forged = TokenIssuer::new("other", Duration::from_secs(3600))
            .issue(&user())
            .unwrap();
        let res = TestClient::get("http://127.0.0.1:5800/whoami")
            .bearer_auth(forged)
            .send(&service)
            .await;
        assert_eq!(res.status_code, Some(StatusCode::FORBIDDEN));
    }
}
