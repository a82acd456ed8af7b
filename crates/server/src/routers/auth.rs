//! Registration and login.
use blogpost_store::{NewUser, ValidationError};
use salvo::prelude::*;
use serde::{Deserialize, Serialize};

use crate::auth::{hash_password, verify_password};
use crate::error::{AppError, AppResult};
use crate::state::AppState;

#[derive(Deserialize)]
struct Credentials {
    username: Option<String>,
    password: Option<String>,
}

impl Credentials {
    fn into_parts(self) -> Result<(String, String), ValidationError> {
        match (self.username, self.password) {
            (Some(username), Some(password)) if !username.is_empty() && !password.is_empty() => {
                Ok((username, password))
            }
            _ => Err(ValidationError::MissingCredentials),
        }
    }
}

/// Body returned after registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registered {
    /// Confirmation text.
    pub message: String,
    /// The registered username.
    pub username: String,
}

/// Body returned after a successful login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenResponse {
    /// Signed bearer token.
    pub token: String,
    /// Always `Bearer`.
    pub token_type: String,
    /// Seconds until the token expires.
    pub expires_in: u64,
}

/// `/auth/register` and `/auth/login`.
pub fn router() -> Router {
    Router::with_path("auth")
        .push(Router::with_path("register").post(register))
        .push(Router::with_path("login").post(login))
}

#[handler]
async fn register(req: &mut Request, depot: &mut Depot, res: &mut Response) -> AppResult<()> {
    let (username, password) = req.parse_json::<Credentials>().await?.into_parts()?;
    let state = AppState::obtain(depot)?;

    // Fast path only: the store rejects duplicates on insert as well.
    if state.users.find_user(&username).await?.is_some() {
        return Err(AppError::UsernameTaken);
    }
    let password_hash = hash_password(password, state.bcrypt_cost).await?;
    let user = state
        .users
        .insert_user(NewUser {
            username,
            password_hash,
        })
        .await?;
    tracing::info!(id = %user.id, username = %user.username, "user registered");

    res.status_code(StatusCode::CREATED);
    res.render(Json(Registered {
        message: "user registered".to_owned(),
        username: user.username,
    }));
    Ok(())
}

#[handler]
async fn login(req: &mut Request, depot: &mut Depot, res: &mut Response) -> AppResult<()> {
    let (username, password) = req.parse_json::<Credentials>().await?.into_parts()?;
    let state = AppState::obtain(depot)?;

    let Some(user) = state.users.find_user(&username).await? else {
        tracing::debug!(%username, "login for unknown user");
        return Err(AppError::InvalidCredentials);
    };
    if !verify_password(password, user.password_hash.clone()).await? {
        tracing::debug!(%username, "login with wrong password");
        return Err(AppError::InvalidCredentials);
    }

    let token = state.tokens.issue(&user)?;
    res.render(Json(TokenResponse {
        token,
        token_type: "Bearer".to_owned(),
        expires_in: state.tokens.ttl().as_secs(),
    }));
    Ok(())
}
