use async_trait::async_trait;
use parking_lot::RwLock;

use crate::{
    BlogPost, NewPost, NewUser, PostStore, RecordId, StoreError, StoreResult, User, UserStore,
};

const SEED_POSTS: [(&str, &str); 2] = [
    ("Mijn eerste blogpost", "Dit is mijn eerste blogpost!"),
    (
        "Azure OpenAI & DevOps",
        "Hoe ik AI en DevOps samenbreng in mijn werk.",
    ),
];

/// Process scoped store keeping posts and users in memory.
///
/// Identifiers come from monotonic counters, so an id is never handed out
/// twice even after deletions.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    posts: Vec<BlogPost>,
    users: Vec<User>,
    last_post_id: u64,
    last_user_id: u64,
}

impl Inner {
    fn push_post(&mut self, post: NewPost) -> BlogPost {
        self.last_post_id += 1;
        let post = post.into_post(RecordId::Seq(self.last_post_id));
        self.posts.push(post.clone());
        post
    }
}

impl MemoryStore {
    /// Creates an empty store.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store holding the two sample posts.
    pub fn with_seed_posts() -> Self {
        let store = Self::new();
        {
            let mut inner = store.inner.write();
            for (title, content) in SEED_POSTS {
                inner.push_post(NewPost {
                    title: title.to_owned(),
                    content: content.to_owned(),
                });
            }
        }
        store
    }
}

#[async_trait]
impl PostStore for MemoryStore {
    async fn list_posts(&self) -> StoreResult<Vec<BlogPost>> {
        Ok(self.inner.read().posts.clone())
    }

    async fn insert_post(&self, post: NewPost) -> StoreResult<BlogPost> {
        let post = self.inner.write().push_post(post);
        tracing::debug!(id = %post.id, "post stored in memory");
        Ok(post)
    }

    async fn delete_post(&self, id: &RecordId) -> StoreResult<Option<BlogPost>> {
        let mut inner = self.inner.write();
        let removed = inner
            .posts
            .iter()
            .position(|post| &post.id == id)
            .map(|index| inner.posts.remove(index));
        Ok(removed)
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn find_user(&self, username: &str) -> StoreResult<Option<User>> {
        Ok(self
            .inner
            .read()
            .users
            .iter()
            .find(|user| user.username == username)
            .cloned())
    }

    async fn insert_user(&self, user: NewUser) -> StoreResult<User> {
        // Lookup and insert share one write guard.
        let mut inner = self.inner.write();
        if inner.users.iter().any(|u| u.username == user.username) {
            return Err(StoreError::DuplicateUsername(user.username));
        }
        inner.last_user_id += 1;
        let user = user.into_user(RecordId::Seq(inner.last_user_id));
        inner.users.push(user.clone());
        Ok(user)
    }
}
