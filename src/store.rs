// Post persistence seam
// Handlers talk to `PostStore`; `Database` and `MemoryStore` implement it

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use tracing::info;
use uuid::Uuid;

use crate::{error::ApiError, models::Post};

pub type SharedStore = Arc<dyn PostStore>;

#[async_trait]
pub trait PostStore: Send + Sync {
    /// Every stored post, oldest first.
    async fn all(&self) -> Result<Vec<Post>, ApiError>;

    /// Fails with `ApiError::NotFound` when no post has this id.
    async fn find(&self, id: Uuid) -> Result<Post, ApiError>;

    async fn insert(&self, post: &Post) -> Result<Post, ApiError>;

    /// Overwrite the assignable attributes of an existing post and bump `updated_at`.
    async fn save(&self, post: &Post) -> Result<Post, ApiError>;

    /// Write only the `published` column. No attribute validation runs.
    async fn set_published(&self, id: Uuid, published: bool) -> Result<Post, ApiError>;

    async fn delete(&self, id: Uuid) -> Result<(), ApiError>;

    /// Validate then insert. Rejected posts are never written.
    async fn create(&self, post: &Post) -> Result<Post, ApiError> {
        post.validate()?;
        self.insert(post).await
    }

    /// Validate then save. Rejected changes are never written.
    async fn update(&self, post: &Post) -> Result<Post, ApiError> {
        post.validate()?;
        self.save(post).await
    }
}

pub(crate) fn not_found(id: Uuid) -> ApiError {
    ApiError::not_found(format!("Post with id {}", id))
}

/// Process-local store, kept in insertion order.
#[derive(Default)]
pub struct MemoryStore {
    posts: RwLock<Vec<Post>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> SharedStore {
        Arc::new(Self::new())
    }
}

#[async_trait]
impl PostStore for MemoryStore {
    async fn all(&self) -> Result<Vec<Post>, ApiError> {
        Ok(self.posts.read().await.clone())
    }

    async fn find(&self, id: Uuid) -> Result<Post, ApiError> {
        self.posts
            .read()
            .await
            .iter()
            .find(|post| post.id == id)
            .cloned()
            .ok_or_else(|| not_found(id))
    }

    async fn insert(&self, post: &Post) -> Result<Post, ApiError> {
        let mut posts = self.posts.write().await;
        if posts.iter().any(|existing| existing.id == post.id) {
            return Err(ApiError::Database(format!("duplicate post id {}", post.id)));
        }

        posts.push(post.clone());
        info!("Created post with id: {}", post.id);
        Ok(post.clone())
    }

    async fn save(&self, post: &Post) -> Result<Post, ApiError> {
        let mut posts = self.posts.write().await;
        let stored = posts
            .iter_mut()
            .find(|existing| existing.id == post.id)
            .ok_or_else(|| not_found(post.id))?;

        stored.title = post.title.clone();
        stored.body = post.body.clone();
        stored.published = post.published;
        stored.updated_at = Utc::now();

        info!("Updated post with id: {}", post.id);
        Ok(stored.clone())
    }

    async fn set_published(&self, id: Uuid, published: bool) -> Result<Post, ApiError> {
        let mut posts = self.posts.write().await;
        let stored = posts
            .iter_mut()
            .find(|existing| existing.id == id)
            .ok_or_else(|| not_found(id))?;

        stored.published = published;
        stored.updated_at = Utc::now();
        Ok(stored.clone())
    }

    async fn delete(&self, id: Uuid) -> Result<(), ApiError> {
        let mut posts = self.posts.write().await;
        let before = posts.len();
        posts.retain(|post| post.id != id);

        if posts.len() == before {
            Err(not_found(id))
        } else {
            info!("Deleted post with id: {}", id);
            Ok(())
        }
    }
}
