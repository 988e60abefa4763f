// Library root for the posts application

pub mod config;
pub mod db;
pub mod error;
pub mod format;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod params;
pub mod routes;
pub mod store;
pub mod views;

// Re-export commonly used types
pub use db::Database;
pub use error::ApiError;
pub use models::{Post, PostParams, ValidationErrors};
pub use routes::create_router;
pub use store::{MemoryStore, PostStore, SharedStore};
