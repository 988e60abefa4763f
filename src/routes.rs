use std::time::Duration;

use axum::{
    routing::{get, patch},
    Router,
};

use crate::{
    handlers::{
        health_check,
        posts::{create, destroy, edit, index, method_override, new, show, update, update_checked},
    },
    middleware::create_middleware_stack,
    store::SharedStore,
};

/// Routes for the posts resource, without middleware.
pub fn post_routes() -> Router<SharedStore> {
    Router::new()
        .route("/posts", get(index).post(create))
        .route("/posts.json", get(index).post(create))
        .route("/posts/new", get(new))
        .route(
            "/posts/:id",
            get(show)
                .patch(update)
                .put(update)
                .delete(destroy)
                .post(method_override),
        )
        .route("/posts/:id/edit", get(edit))
        .route(
            "/posts/:id/update_checked",
            patch(update_checked).put(update_checked).post(update_checked),
        )
        .route(
            "/posts/:id/update_checked.json",
            patch(update_checked).put(update_checked).post(update_checked),
        )
}

/// The full application: health check, post routes, shared store and middleware.
pub fn create_router(store: SharedStore, request_timeout: Duration) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .merge(post_routes())
        .with_state(store)
        .layer(create_middleware_stack(request_timeout))
}
