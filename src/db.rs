use async_trait::async_trait;
use chrono::Utc;
use deadpool_postgres::{Config, Object, Pool, Runtime};
use native_tls::TlsConnector;
use postgres_native_tls::MakeTlsConnector;
use tokio_postgres::Row;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::config::DatabaseConfig;
use crate::error::ApiError;
use crate::models::Post;
use crate::store::{not_found, PostStore};

const POST_COLUMNS: &str = "id, title, body, published, created_at, updated_at";

/// PostgreSQL-backed post store. Cheap to clone: the pool is shared.
#[derive(Clone)]
pub struct Database {
    pool: Pool,
}

impl Database {
    /// Build the connection pool and check that a connection can be made.
    pub async fn new(config: DatabaseConfig) -> Result<Self, ApiError> {
        info!("Creating PostgreSQL connection pool for {}", config.describe());

        let pool = Self::create_pool(config)?;

        let db = Database { pool };
        db.health_check().await?;

        Ok(db)
    }

    fn create_pool(config: DatabaseConfig) -> Result<Pool, ApiError> {
        let mut pg_config = Config::new();

        if let Some(url) = config.url {
            pg_config.url = Some(url);
        } else {
            pg_config.host = Some(config.host);
            pg_config.port = Some(config.port);
            pg_config.dbname = Some(config.database);
            pg_config.user = Some(config.username);
            pg_config.password = Some(config.password);

            pg_config.ssl_mode = Some(match config.ssl_mode.as_str() {
                "disable" => deadpool_postgres::SslMode::Disable,
                "prefer" => deadpool_postgres::SslMode::Prefer,
                "require" => deadpool_postgres::SslMode::Require,
                other => {
                    warn!("Unknown SSL mode '{}', defaulting to 'require'", other);
                    deadpool_postgres::SslMode::Require
                }
            });
        }

        pg_config.manager = Some(deadpool_postgres::ManagerConfig {
            recycling_method: deadpool_postgres::RecyclingMethod::Fast,
        });
        pg_config.pool = Some(deadpool_postgres::PoolConfig::new(config.max_connections));

        let tls_connector = TlsConnector::builder().build().map_err(|e| {
            error!("Failed to create TLS connector: {}", e);
            ApiError::Database(format!("TLS connector creation failed: {}", e))
        })?;
        let tls = MakeTlsConnector::new(tls_connector);

        pg_config.create_pool(Some(Runtime::Tokio1), tls).map_err(|e| {
            error!("Failed to create connection pool: {}", e);
            ApiError::Database(format!("Connection pool creation failed: {}", e))
        })
    }

    async fn get_connection(&self) -> Result<Object, ApiError> {
        self.pool.get().await.map_err(ApiError::from)
    }

    pub async fn health_check(&self) -> Result<(), ApiError> {
        let client = self.get_connection().await?;

        client.execute("SELECT 1", &[]).await.map_err(|e| {
            error!("Database health check failed: {}", e);
            ApiError::Database(format!("Health check failed: {}", e))
        })?;

        info!("Database health check successful");
        Ok(())
    }

    /// Create the `posts` table if it does not exist yet.
    pub async fn migrate(&self) -> Result<(), ApiError> {
        info!("Running database migrations");

        let client = self.get_connection().await?;

        let posts_table = r#"
            CREATE TABLE IF NOT EXISTS posts (
                id UUID PRIMARY KEY,
                title TEXT NOT NULL,
                body TEXT NOT NULL,
                published BOOLEAN NOT NULL DEFAULT FALSE,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )
        "#;

        client.execute(posts_table, &[]).await.map_err(|e| {
            error!("Failed to create posts table: {}", e);
            ApiError::Database(format!("Posts table creation failed: {}", e))
        })?;

        let posts_created_index =
            "CREATE INDEX IF NOT EXISTS idx_posts_created_at ON posts(created_at)";
        client.execute(posts_created_index, &[]).await.map_err(|e| {
            error!("Failed to create posts created_at index: {}", e);
            ApiError::Database(format!("Posts created_at index creation failed: {}", e))
        })?;

        info!("Database migrations completed successfully");
        Ok(())
    }
}

fn post_from_row(row: &Row) -> Post {
    Post {
        id: row.get(0),
        title: row.get(1),
        body: row.get(2),
        published: row.get(3),
        created_at: row.get(4),
        updated_at: row.get(5),
    }
}

#[async_trait]
impl PostStore for Database {
    /// Every post, oldest first.
    async fn all(&self) -> Result<Vec<Post>, ApiError> {
        let client = self.get_connection().await?;
        let query = format!("SELECT {} FROM posts ORDER BY created_at, id", POST_COLUMNS);

        let rows = client.query(query.as_str(), &[]).await?;

        Ok(rows.iter().map(post_from_row).collect())
    }

    /// One post by id; `NotFound` when no row matches.
    async fn find(&self, id: Uuid) -> Result<Post, ApiError> {
        let client = self.get_connection().await?;
        let query = format!("SELECT {} FROM posts WHERE id = $1", POST_COLUMNS);

        let row = client.query_opt(query.as_str(), &[&id]).await?;

        row.as_ref().map(post_from_row).ok_or_else(|| not_found(id))
    }

    /// Write a new row as-is. Validation happens in `PostStore::create`.
    async fn insert(&self, post: &Post) -> Result<Post, ApiError> {
        let client = self.get_connection().await?;
        let query = format!(
            "INSERT INTO posts ({cols}) VALUES ($1, $2, $3, $4, $5, $6) RETURNING {cols}",
            cols = POST_COLUMNS
        );

        let row = client
            .query_one(
                query.as_str(),
                &[
                    &post.id,
                    &post.title,
                    &post.body,
                    &post.published,
                    &post.created_at,
                    &post.updated_at,
                ],
            )
            .await?;

        let created = post_from_row(&row);
        info!("Created post with id: {}", created.id);
        Ok(created)
    }

    /// Overwrite title, body and published, bumping `updated_at`.
    async fn save(&self, post: &Post) -> Result<Post, ApiError> {
        let client = self.get_connection().await?;
        let query = format!(
            "UPDATE posts SET title = $1, body = $2, published = $3, updated_at = $4 \
             WHERE id = $5 RETURNING {}",
            POST_COLUMNS
        );

        let row = client
            .query_opt(
                query.as_str(),
                &[&post.title, &post.body, &post.published, &Utc::now(), &post.id],
            )
            .await?;

        let saved = row.as_ref().map(post_from_row).ok_or_else(|| not_found(post.id))?;
        info!("Updated post with id: {}", saved.id);
        Ok(saved)
    }

    // single-column write, no validation
    async fn set_published(&self, id: Uuid, published: bool) -> Result<Post, ApiError> {
        let client = self.get_connection().await?;
        let query = format!(
            "UPDATE posts SET published = $1, updated_at = $2 WHERE id = $3 RETURNING {}",
            POST_COLUMNS
        );

        let row = client
            .query_opt(query.as_str(), &[&published, &Utc::now(), &id])
            .await?;

        row.as_ref().map(post_from_row).ok_or_else(|| not_found(id))
    }

    /// Remove a row; zero rows affected means it was already gone.
    async fn delete(&self, id: Uuid) -> Result<(), ApiError> {
        let client = self.get_connection().await?;

        let rows_affected = client
            .execute("DELETE FROM posts WHERE id = $1", &[&id])
            .await?;

        if rows_affected == 0 {
            Err(not_found(id))
        } else {
            info!("Deleted post with id: {}", id);
            Ok(())
        }
    }
}
