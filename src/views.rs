// Views
// Askama page templates, the Turbo Stream fragment and JSON representations of posts

use askama::Template;
use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{Html, IntoResponse, Redirect, Response},
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{error::ApiError, format::TURBO_STREAM_MIME, models::Post};

pub const POSTS_PATH: &str = "/posts";

/// Flash notice carried across a redirect in the query string.
#[derive(Debug, Default, Deserialize)]
pub struct NoticeQuery {
    pub notice: Option<String>,
}

#[derive(Template)]
#[template(path = "posts/index.html")]
pub struct IndexTemplate {
    pub posts: Vec<Post>,
    pub notice: Option<String>,
}

#[derive(Template)]
#[template(path = "posts/show.html")]
pub struct ShowTemplate {
    pub post: Post,
    pub notice: Option<String>,
}

#[derive(Template)]
#[template(path = "posts/new.html")]
pub struct NewTemplate {
    pub form: PostForm,
    pub errors: Vec<String>,
    pub notice: Option<String>,
}

#[derive(Template)]
#[template(path = "posts/edit.html")]
pub struct EditTemplate {
    pub post_id: Uuid,
    pub form: PostForm,
    pub errors: Vec<String>,
    pub notice: Option<String>,
}

/// Replaces the checkbox form inside `post_{id}_published`.
#[derive(Template)]
#[template(path = "posts/published.turbo_stream.html")]
pub struct PublishedStream {
    pub post: Post,
}

/// Values shown in the new/edit form. On a failed save these are the submitted values.
#[derive(Debug, Clone)]
pub struct PostForm {
    pub action: String,
    pub method: Option<&'static str>,
    pub title: String,
    pub body: String,
    pub published: bool,
    pub submit_label: &'static str,
}

impl PostForm {
    pub fn for_new(post: &Post) -> Self {
        PostForm {
            action: POSTS_PATH.to_string(),
            method: None,
            title: post.title.clone(),
            body: post.body.clone(),
            published: post.published,
            submit_label: "Create Post",
        }
    }

    pub fn for_edit(post: &Post) -> Self {
        PostForm {
            action: post_path(post.id),
            method: Some("patch"),
            title: post.title.clone(),
            body: post.body.clone(),
            published: post.published,
            submit_label: "Update Post",
        }
    }
}

/// JSON representation of a post: its attributes plus a `url`.
#[derive(Debug, Serialize)]
pub struct PostResource<'a> {
    #[serde(flatten)]
    pub post: &'a Post,
    pub url: String,
}

impl<'a> From<&'a Post> for PostResource<'a> {
    fn from(post: &'a Post) -> Self {
        PostResource {
            post,
            url: format!("{}.json", post_path(post.id)),
        }
    }
}

/// Body of the JSON response to a checkbox toggle.
#[derive(Debug, Serialize)]
pub struct PublishedToggle {
    pub success: bool,
    pub published: bool,
}

/// Page path of a post, `/posts/{id}`.
pub fn post_path(id: Uuid) -> String {
    format!("{}/{}", POSTS_PATH, id)
}

/// Render a page template with the given status.
pub fn render_html<T: Template>(status: StatusCode, template: &T) -> Result<Response, ApiError> {
    Ok((status, Html(template.render()?)).into_response())
}

/// Render a Turbo Stream fragment under its own content type.
pub fn render_turbo_stream<T: Template>(template: &T) -> Result<Response, ApiError> {
    let body = template.render()?;
    Ok((
        [(header::CONTENT_TYPE, HeaderValue::from_static(TURBO_STREAM_MIME))],
        body,
    )
        .into_response())
}

/// `303 See Other` to `path`, with the notice for the next page.
pub fn redirect_with_notice(path: &str, notice: &str) -> Result<Response, ApiError> {
    let query = serde_urlencoded::to_string(&[("notice", notice)])
        .map_err(|e| ApiError::Internal(e.into()))?;
    Ok(Redirect::to(&format!("{}?{}", path, query)).into_response())
}

/// `Location` header pointing at a post's page.
pub fn location(id: Uuid) -> Result<[(header::HeaderName, HeaderValue); 1], ApiError> {
    let value = HeaderValue::from_str(&post_path(id)).map_err(|e| ApiError::Internal(e.into()))?;
    Ok([(header::LOCATION, value)])
}
