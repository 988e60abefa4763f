// Models module

pub mod post;

// Re-export commonly used types
pub use post::{Post, PostParams, ValidationErrors};
