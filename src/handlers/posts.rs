// Post handlers
// HTTP handlers for the posts resource

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    error::ApiError,
    format::{strip_format_extension, Format, RequestedFormat},
    models::post::{checkbox_checked, Post, PostParams},
    params::RequestParams,
    store::SharedStore,
    views::{
        location, post_path, redirect_with_notice, render_html, render_turbo_stream,
        EditTemplate, IndexTemplate, NewTemplate, NoticeQuery, PostForm, PostResource,
        PublishedStream, PublishedToggle, ShowTemplate, POSTS_PATH,
    },
};

const HTML_OR_JSON: &[Format] = &[Format::Html, Format::Json];
const TOGGLE_FORMATS: &[Format] = &[Format::TurboStream, Format::Html, Format::Json];

/// Resolve a path id (optionally suffixed with `.json`) to a stored post.
/// Ids that are not UUIDs cannot exist, so they are reported as not found.
async fn find_post(store: &SharedStore, raw_id: &str) -> Result<Post, ApiError> {
    let raw_id = strip_format_extension(raw_id);
    let id = Uuid::parse_str(raw_id)
        .map_err(|_| ApiError::not_found(format!("Post with id {}", raw_id)))?;

    store.find(id).await
}

/// List every post
/// GET /posts, /posts.json
pub async fn index(
    State(store): State<SharedStore>,
    format: RequestedFormat,
    Query(query): Query<NoticeQuery>,
) -> Result<Response, ApiError> {
    info!("Fetching all posts");

    let posts = store.all().await?;

    info!("Retrieved {} posts", posts.len());
    match format.negotiate(HTML_OR_JSON) {
        Format::Json => {
            let body: Vec<PostResource> = posts.iter().map(PostResource::from).collect();
            Ok(Json(body).into_response())
        }
        _ => render_html(
            StatusCode::OK,
            &IndexTemplate {
                posts,
                notice: query.notice,
            },
        ),
    }
}

/// Show one post
/// GET /posts/:id
pub async fn show(
    State(store): State<SharedStore>,
    Path(raw_id): Path<String>,
    format: RequestedFormat,
    Query(query): Query<NoticeQuery>,
) -> Result<Response, ApiError> {
    info!("Fetching post with id: {}", raw_id);

    let post = find_post(&store, &raw_id).await?;

    match format.negotiate(HTML_OR_JSON) {
        Format::Json => Ok(Json(PostResource::from(&post)).into_response()),
        _ => render_html(
            StatusCode::OK,
            &ShowTemplate {
                post,
                notice: query.notice,
            },
        ),
    }
}

/// Blank creation form
/// GET /posts/new
pub async fn new() -> Result<Response, ApiError> {
    let post = Post::new(PostParams::default());

    render_html(
        StatusCode::OK,
        &NewTemplate {
            form: PostForm::for_new(&post),
            errors: Vec::new(),
            notice: None,
        },
    )
}

/// Edit form for an existing post
/// GET /posts/:id/edit
pub async fn edit(
    State(store): State<SharedStore>,
    Path(raw_id): Path<String>,
) -> Result<Response, ApiError> {
    info!("Editing post with id: {}", raw_id);

    let post = find_post(&store, &raw_id).await?;

    render_html(
        StatusCode::OK,
        &EditTemplate {
            post_id: post.id,
            form: PostForm::for_edit(&post),
            errors: Vec::new(),
            notice: None,
        },
    )
}

/// Create a new post
/// POST /posts, /posts.json
pub async fn create(
    State(store): State<SharedStore>,
    format: RequestedFormat,
    params: RequestParams,
) -> Result<Response, ApiError> {
    let post = Post::new(params.post_params());
    info!("Creating new post with title: {}", post.title);

    match store.create(&post).await {
        Ok(created) => {
            info!("Successfully created post with id: {}", created.id);
            match format.negotiate(HTML_OR_JSON) {
                Format::Json => Ok((
                    StatusCode::CREATED,
                    location(created.id)?,
                    Json(PostResource::from(&created)),
                )
                    .into_response()),
                _ => redirect_with_notice(&post_path(created.id), "Post was successfully created."),
            }
        }
        Err(ApiError::Validation(errors)) => {
            warn!("Rejected new post: {}", errors);
            match format.negotiate(HTML_OR_JSON) {
                Format::Json => Ok((StatusCode::UNPROCESSABLE_ENTITY, Json(errors)).into_response()),
                _ => render_html(
                    StatusCode::UNPROCESSABLE_ENTITY,
                    &NewTemplate {
                        form: PostForm::for_new(&post),
                        errors: errors.full_messages(),
                        notice: None,
                    },
                ),
            }
        }
        Err(e) => Err(e),
    }
}

/// Update a post
/// PATCH/PUT /posts/:id
pub async fn update(
    State(store): State<SharedStore>,
    Path(raw_id): Path<String>,
    format: RequestedFormat,
    params: RequestParams,
) -> Result<Response, ApiError> {
    update_post(&store, &raw_id, &format, &params).await
}

async fn update_post(
    store: &SharedStore,
    raw_id: &str,
    format: &RequestedFormat,
    params: &RequestParams,
) -> Result<Response, ApiError> {
    info!("Updating post with id: {}", raw_id);

    let mut post = find_post(store, raw_id).await?;
    post.assign(params.post_params());

    match store.update(&post).await {
        Ok(updated) => {
            info!("Successfully updated post with id: {}", updated.id);
            match format.negotiate(HTML_OR_JSON) {
                Format::Json => Ok((
                    StatusCode::OK,
                    location(updated.id)?,
                    Json(PostResource::from(&updated)),
                )
                    .into_response()),
                _ => redirect_with_notice(&post_path(updated.id), "Post was successfully updated."),
            }
        }
        Err(ApiError::Validation(errors)) => {
            warn!("Rejected update of post {}: {}", post.id, errors);
            match format.negotiate(HTML_OR_JSON) {
                Format::Json => Ok((StatusCode::UNPROCESSABLE_ENTITY, Json(errors)).into_response()),
                _ => render_html(
                    StatusCode::UNPROCESSABLE_ENTITY,
                    &EditTemplate {
                        post_id: post.id,
                        form: PostForm::for_edit(&post),
                        errors: errors.full_messages(),
                        notice: None,
                    },
                ),
            }
        }
        Err(e) => Err(e),
    }
}

/// Toggle `published` from the list's checkbox. Only the literal `"1"` publishes.
/// PATCH/PUT/POST /posts/:id/update_checked
pub async fn update_checked(
    State(store): State<SharedStore>,
    Path(raw_id): Path<String>,
    format: RequestedFormat,
    params: RequestParams,
) -> Result<Response, ApiError> {
    info!("Toggling published for post with id: {}", raw_id);

    let post = find_post(&store, &raw_id).await?;
    let published = checkbox_checked(params.post_field("published"));
    let post = store.set_published(post.id, published).await?;

    info!("Post {} published: {}", post.id, post.published);
    match format.negotiate(TOGGLE_FORMATS) {
        Format::TurboStream => render_turbo_stream(&PublishedStream { post }),
        Format::Html => redirect_with_notice(POSTS_PATH, "Post updated successfully"),
        Format::Json => Ok(Json(PublishedToggle {
            success: true,
            published: post.published,
        })
        .into_response()),
    }
}

/// Delete a post
/// DELETE /posts/:id
pub async fn destroy(
    State(store): State<SharedStore>,
    Path(raw_id): Path<String>,
    format: RequestedFormat,
) -> Result<Response, ApiError> {
    destroy_post(&store, &raw_id, &format).await
}

async fn destroy_post(
    store: &SharedStore,
    raw_id: &str,
    format: &RequestedFormat,
) -> Result<Response, ApiError> {
    info!("Deleting post with id: {}", raw_id);

    let post = find_post(store, raw_id).await?;
    store.delete(post.id).await?;

    info!("Successfully deleted post with id: {}", post.id);
    match format.negotiate(HTML_OR_JSON) {
        Format::Json => Ok(StatusCode::NO_CONTENT.into_response()),
        _ => redirect_with_notice(POSTS_PATH, "Post was successfully destroyed."),
    }
}

/// HTML forms can only POST; they name the real verb in a hidden `_method` field.
/// POST /posts/:id
pub async fn method_override(
    State(store): State<SharedStore>,
    Path(raw_id): Path<String>,
    format: RequestedFormat,
    params: RequestParams,
) -> Result<Response, ApiError> {
    match params.method_override().as_deref() {
        Some("patch") | Some("put") => update_post(&store, &raw_id, &format, &params).await,
        Some("delete") => destroy_post(&store, &raw_id, &format).await,
        other => Err(ApiError::bad_request(format!(
            "Unsupported form method: {}",
            other.unwrap_or("none")
        ))),
    }
}
