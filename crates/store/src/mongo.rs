use std::time::Duration;

use async_trait::async_trait;
use futures_util::TryStreamExt;
use mongodb::bson::doc;
use mongodb::bson::oid::ObjectId;
use mongodb::error::{ErrorKind, WriteFailure};
use mongodb::options::{ClientOptions, IndexOptions};
use mongodb::{Client, Collection, Database, IndexModel};
use serde::{Deserialize, Serialize};

use crate::{
    BlogPost, NewPost, NewUser, PostStore, RecordId, StoreError, StoreResult, User, UserStore,
};

const POSTS_COLLECTION: &str = "blogposts";
const USERS_COLLECTION: &str = "users";
const DUPLICATE_KEY: i32 = 11000;

/// Connection settings for [`MongoStore`].
#[derive(Clone, Debug)]
#[non_exhaustive]
pub struct MongoOptions {
    /// Connection string, e.g. `mongodb://localhost:27017`.
    pub uri: String,
    /// Database holding the collections.
    pub database: String,
    /// Applied to both connect and server selection.
    pub timeout: Duration,
}

impl MongoOptions {
    /// Creates options with the default database (`blog`) and a 5 second timeout.
    pub fn new(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            database: "blog".to_owned(),
            timeout: Duration::from_secs(5),
        }
    }

    /// Sets the database name.
    #[must_use]
    pub fn database(mut self, database: impl Into<String>) -> Self {
        self.database = database.into();
        self
    }

    /// Sets the connect and server selection timeout.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct PostDocument {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    id: Option<ObjectId>,
    title: String,
    content: String,
}

impl PostDocument {
    fn into_post(self) -> Option<BlogPost> {
        Some(BlogPost {
            id: self.id?.into(),
            title: self.title,
            content: self.content,
        })
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct UserDocument {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    id: Option<ObjectId>,
    username: String,
    password: String,
}

impl UserDocument {
    fn into_user(self) -> Option<User> {
        Some(User {
            id: self.id?.into(),
            username: self.username,
            password_hash: self.password,
        })
    }
}

/// MongoDB backed store.
#[derive(Debug)]
pub struct MongoStore {
    db: Database,
    posts: Collection<PostDocument>,
    users: Collection<UserDocument>,
}

impl MongoStore {
    /// Connects, checks the server is reachable and ensures the unique
    /// username index exists.
    pub async fn connect(options: &MongoOptions) -> StoreResult<Self> {
        let mut client_options = ClientOptions::parse(&options.uri).await?;
        client_options.app_name = Some("blogpost-server".to_owned());
        client_options.connect_timeout = Some(options.timeout);
        client_options.server_selection_timeout = Some(options.timeout);
        let client = Client::with_options(client_options)?;

        let store = Self::with_database(client.database(&options.database));
        store.ping().await?;
        store.ensure_indexes().await?;
        tracing::info!(database = %options.database, "connected to mongodb");
        Ok(store)
    }

    /// Wraps an existing database handle without touching the server.
    pub fn with_database(db: Database) -> Self {
        Self {
            posts: db.collection(POSTS_COLLECTION),
            users: db.collection(USERS_COLLECTION),
            db,
        }
    }

    /// Round trips a `ping` command.
    pub async fn ping(&self) -> StoreResult<()> {
        self.db.run_command(doc! { "ping": 1 }).await?;
        Ok(())
    }

    /// Creates the unique index on `users.username`.
    ///
    /// Uniqueness is enforced by the server, so two concurrent registrations
    /// of the same name cannot both succeed.
    pub async fn ensure_indexes(&self) -> StoreResult<()> {
        let model = IndexModel::builder()
            .keys(doc! { "username": 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build();
        self.users.create_index(model).await?;
        Ok(())
    }
}

fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    matches!(
        err.kind.as_ref(),
        ErrorKind::Write(WriteFailure::WriteError(e)) if e.code == DUPLICATE_KEY
    )
}

fn inserted_object_id(id: &mongodb::bson::Bson) -> StoreResult<ObjectId> {
    id.as_object_id()
        .ok_or_else(|| StoreError::UnexpectedId(id.to_string()))
}

#[async_trait]
impl PostStore for MongoStore {
    async fn list_posts(&self) -> StoreResult<Vec<BlogPost>> {
        let docs: Vec<PostDocument> = self.posts.find(doc! {}).await?.try_collect().await?;
        Ok(docs.into_iter().filter_map(PostDocument::into_post).collect())
    }

    async fn insert_post(&self, post: NewPost) -> StoreResult<BlogPost> {
        let document = PostDocument {
            id: None,
            title: post.title.clone(),
            content: post.content.clone(),
        };
        let result = self.posts.insert_one(&document).await?;
        let oid = inserted_object_id(&result.inserted_id)?;
        tracing::debug!(id = %oid, "post inserted");
        Ok(post.into_post(oid.into()))
    }

    async fn delete_post(&self, id: &RecordId) -> StoreResult<Option<BlogPost>> {
        let RecordId::Object(oid) = id else {
            return Ok(None);
        };
        let removed = self.posts.find_one_and_delete(doc! { "_id": *oid }).await?;
        Ok(removed.and_then(PostDocument::into_post))
    }
}

#[async_trait]
impl UserStore for MongoStore {
    async fn find_user(&self, username: &str) -> StoreResult<Option<User>> {
        let found = self.users.find_one(doc! { "username": username }).await?;
        Ok(found.and_then(UserDocument::into_user))
    }

    async fn insert_user(&self, user: NewUser) -> StoreResult<User> {
        let document = UserDocument {
            id: None,
            username: user.username.clone(),
            password: user.password_hash.clone(),
        };
        match self.users.insert_one(&document).await {
            Ok(result) => {
                let oid = inserted_object_id(&result.inserted_id)?;
                Ok(user.into_user(oid.into()))
            }
            Err(e) if is_duplicate_key(&e) => Err(StoreError::DuplicateUsername(user.username)),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_options_builder() {
        let options = MongoOptions::new("mongodb://localhost:27017")
            .database("blog_test")
            .timeout(Duration::from_secs(2));
        assert_eq!(options.database, "blog_test");
        assert_eq!(options.timeout, Duration::from_secs(2));
    }

    #[test]
    fn test_post_document_shape() {
        let document = PostDocument {
            id: None,
            title: "T".into(),
            content: "C".into(),
        };
        let bson = mongodb::bson::to_document(&document).unwrap();
        assert!(!bson.contains_key("_id"));
        assert_eq!(bson.get_str("title").unwrap(), "T");

        let oid = ObjectId::new();
        let post = PostDocument {
            id: Some(oid),
            ..document
        }
        .into_post()
        .unwrap();
        assert_eq!(post.id, RecordId::Object(oid));
    }

    // Needs a reachable server: MONGODB_URI=mongodb://localhost:27017 cargo test -- --ignored
    #[tokio::test]
    #[ignore]
    async fn test_mongo_round_trip() {
        let uri = std::env::var("MONGODB_URI").expect("MONGODB_URI must be set");
        let options = MongoOptions::new(uri).database(format!("blog_test_{}", ObjectId::new()));
        let store = MongoStore::connect(&options).await.unwrap();

        let post = NewPost::new(Some("T".into()), Some("C".into())).unwrap();
        let created = store.insert_post(post).await.unwrap();
        assert!(store.list_posts().await.unwrap().contains(&created));
        assert_eq!(store.delete_post(&created.id).await.unwrap(), Some(created.clone()));
        assert_eq!(store.delete_post(&created.id).await.unwrap(), None);

        let user = NewUser {
            username: "alice".into(),
            password_hash: "hash".into(),
        };
        store.insert_user(user.clone()).await.unwrap();
        assert!(matches!(
            store.insert_user(user).await,
            Err(StoreError::DuplicateUsername(_))
        ));

        store.db.drop().await.unwrap();
    }
}
