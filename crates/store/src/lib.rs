//! Persistence for the blog post service.
//!
//! The service talks to storage through two small traits, [`PostStore`] and
//! [`UserStore`]. Two accessors implement both of them:
//!
//! - [`MemoryStore`]: process scoped state, created once at startup and dropped
//!   with the process. Used for local development and tests.
//! - [`MongoStore`]: a MongoDB client issuing find-all, insert and
//!   delete-by-identifier calls against the `blogposts` and `users` collections.
//!
//! # Example
//!
//! ```
//! use blogpost_store::{MemoryStore, NewPost, PostStore};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), blogpost_store::StoreError> {
//! let store = MemoryStore::new();
//! let post = NewPost::new(Some("T".into()), Some("C".into())).expect("valid post");
//! let created = store.insert_post(post).await?;
//! assert_eq!(store.list_posts().await?, vec![created]);
//! # Ok(())
//! # }
//! ```
#![cfg_attr(docsrs, feature(doc_cfg))]

use async_trait::async_trait;
use thiserror::Error;

mod memory;
mod model;
mod mongo;

pub use memory::MemoryStore;
pub use model::{BlogPost, NewPost, NewUser, ParseRecordIdError, RecordId, User, ValidationError};
pub use mongo::{MongoOptions, MongoStore};

#[doc(no_inline)]
pub use mongodb::bson::oid::ObjectId;

/// Errors returned by the persistence accessors.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The username is already registered.
    #[error("username `{0}` already exists")]
    DuplicateUsername(String),
    /// Error reported by the MongoDB driver.
    #[error(transparent)]
    Database(#[from] mongodb::error::Error),
    /// The document store returned an insert id that is not an `ObjectId`.
    #[error("unexpected inserted id: {0}")]
    UnexpectedId(String),
}

/// Result type alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Blog post persistence.
#[async_trait]
pub trait PostStore: Send + Sync {
    /// Returns every post in insertion order.
    async fn list_posts(&self) -> StoreResult<Vec<BlogPost>>;

    /// Persists a post and returns it with its assigned identifier.
    async fn insert_post(&self, post: NewPost) -> StoreResult<BlogPost>;

    /// Removes the post with the given identifier.
    ///
    /// Returns the removed post, or `None` when nothing matched.
    async fn delete_post(&self, id: &RecordId) -> StoreResult<Option<BlogPost>>;
}

/// User persistence.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Looks a user up by username.
    async fn find_user(&self, username: &str) -> StoreResult<Option<User>>;

    /// Persists a user.
    ///
    /// Fails with [`StoreError::DuplicateUsername`] when the username is taken.
    async fn insert_user(&self, user: NewUser) -> StoreResult<User>;
}
