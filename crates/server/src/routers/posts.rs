//! Blog post listing, creation and removal.
use blogpost_store::{BlogPost, NewPost, RecordId};
use salvo::prelude::*;
use serde::{Deserialize, Serialize};

use crate::auth::{TokenIssuer, current_claims, require_auth};
use crate::error::{AppError, AppResult};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
struct PostPayload {
    title: Option<String>,
    content: Option<String>,
}

/// Body returned after a successful delete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeletedPost {
    /// Confirmation text.
    pub message: String,
    /// The removed post.
    pub post: BlogPost,
}

/// `/blogposts`: public listing, token protected create and delete.
pub fn router(tokens: &TokenIssuer) -> Router {
    Router::with_path("blogposts").get(list_posts).push(
        Router::new()
            .hoop(tokens.gate())
            .hoop(require_auth)
            .post(create_post)
            .push(Router::with_path("{id}").delete(delete_post)),
    )
}

#[handler]
async fn list_posts(depot: &mut Depot, res: &mut Response) -> AppResult<()> {
    let state = AppState::obtain(depot)?;
    let posts = state.posts.list_posts().await?;
    res.render(Json(posts));
    Ok(())
}

#[handler]
async fn create_post(req: &mut Request, depot: &mut Depot, res: &mut Response) -> AppResult<()> {
    let payload = req.parse_json::<PostPayload>().await?;
    let post = NewPost::new(payload.title, payload.content)?;

    let state = AppState::obtain(depot)?;
    let post = state.posts.insert_post(post).await?;
    tracing::info!(
        id = %post.id,
        author = current_claims(depot).map(|c| c.username.as_str()),
        "blog post created"
    );

    res.status_code(StatusCode::CREATED);
    res.render(Json(post));
    Ok(())
}

#[handler]
async fn delete_post(req: &mut Request, depot: &mut Depot, res: &mut Response) -> AppResult<()> {
    // An id that cannot be parsed cannot match any post either.
    let id = req
        .param::<String>("id")
        .and_then(|raw| raw.parse::<RecordId>().ok())
        .ok_or(AppError::PostNotFound)?;

    let state = AppState::obtain(depot)?;
    let post = state
        .posts
        .delete_post(&id)
        .await?
        .ok_or(AppError::PostNotFound)?;
    tracing::info!(
        %id,
        author = current_claims(depot).map(|c| c.username.as_str()),
        "blog post deleted"
    );

    res.render(Json(DeletedPost {
        message: "blog post deleted".to_owned(),
        post,
    }));
    Ok(())
}
