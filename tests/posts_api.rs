// HTTP-level tests for the posts resource, run against the in-memory store

use std::time::Duration;

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    response::Response,
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use posts_app::{create_router, MemoryStore, Post, PostParams, PostStore, SharedStore};

const TURBO_STREAM: &str = "text/vnd.turbo-stream.html";

fn app() -> (Router, SharedStore) {
    let store = MemoryStore::shared();
    (create_router(store.clone(), Duration::from_secs(5)), store)
}

async fn send(app: &Router, request: Request<Body>) -> Response {
    app.clone().oneshot(request).await.unwrap()
}

fn json_request(method: Method, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::ACCEPT, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn form_request(method: Method, uri: &str, accept: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .header(header::ACCEPT, accept)
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn browser_form_request(method: Method, uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str, accept: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header(header::ACCEPT, accept)
        .body(Body::empty())
        .unwrap()
}

async fn body_text(response: Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

async fn body_json(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn location(response: &Response) -> &str {
    response.headers()[header::LOCATION].to_str().unwrap()
}

async fn seed(store: &SharedStore, title: &str, published: bool) -> Post {
    let post = Post::new(PostParams {
        title: Some(title.to_string()),
        body: Some("Seeded body".to_string()),
        published: Some(published),
    });
    store.create(&post).await.unwrap()
}

#[tokio::test]
async fn create_json_then_show() {
    let (app, _store) = app();

    let response = send(
        &app,
        json_request(
            Method::POST,
            "/posts.json",
            json!({ "post": { "title": "Hello", "body": "World", "published": "1" } }),
        ),
    )
    .await;

    assert_eq!(response.status(), StatusCode::CREATED);
    let created = body_json(response).await;
    let id = created["id"].as_str().unwrap().to_string();
    assert_eq!(created["published"], true);
    assert_eq!(created["url"], format!("/posts/{}.json", id));

    let response = send(&app, get(&format!("/posts/{}.json", id), "*/*")).await;
    assert_eq!(response.status(), StatusCode::OK);
    let shown = body_json(response).await;
    assert_eq!(shown["title"], "Hello");
    assert_eq!(shown["body"], "World");
    assert_eq!(shown["published"], true);
}

#[tokio::test]
async fn create_json_sets_location_header() {
    let (app, _store) = app();

    let response = send(
        &app,
        json_request(Method::POST, "/posts", json!({ "title": "Hello", "body": "World" })),
    )
    .await;

    assert_eq!(response.status(), StatusCode::CREATED);
    let header = location(&response).to_string();
    let created = body_json(response).await;
    assert_eq!(header, format!("/posts/{}", created["id"].as_str().unwrap()));
    assert_eq!(created["published"], false);
}

#[tokio::test]
async fn create_with_missing_field_persists_nothing() {
    let (app, store) = app();

    let response = send(
        &app,
        json_request(Method::POST, "/posts", json!({ "post": { "title": "No body" } })),
    )
    .await;

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body_json(response).await, json!({ "body": ["can't be blank"] }));
    assert!(store.all().await.unwrap().is_empty());
}

#[tokio::test]
async fn create_html_failure_rerenders_form_with_submitted_values() {
    let (app, store) = app();

    let response = send(
        &app,
        form_request(Method::POST, "/posts", "text/html", "post[title]=Kept+title&post[body]="),
    )
    .await;

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let page = body_text(response).await;
    assert!(page.contains("New post"));
    assert!(page.contains("Kept title"));
    assert!(page.contains("Body can"));
    assert!(store.all().await.unwrap().is_empty());
}

#[tokio::test]
async fn create_html_redirects_to_post() {
    let (app, store) = app();

    let response = send(
        &app,
        form_request(
            Method::POST,
            "/posts",
            "text/html",
            "post[title]=Hello&post[body]=World&post[published]=0&post[published]=1",
        ),
    )
    .await;

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    let posts = store.all().await.unwrap();
    assert_eq!(posts.len(), 1);
    assert!(posts[0].published);
    assert_eq!(
        location(&response),
        format!("/posts/{}?notice=Post+was+successfully+created.", posts[0].id)
    );
}

#[tokio::test]
async fn update_ignores_fields_outside_whitelist() {
    let (app, store) = app();
    let post = seed(&store, "Original", true).await;

    let response = send(
        &app,
        json_request(
            Method::PATCH,
            &format!("/posts/{}", post.id),
            json!({ "post": { "title": "Renamed", "admin": true, "id": Uuid::new_v4() } }),
        ),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(location(&response), format!("/posts/{}", post.id));
    let updated = body_json(response).await;
    assert_eq!(updated["id"], post.id.to_string());
    assert!(updated.get("admin").is_none());

    let stored = store.find(post.id).await.unwrap();
    assert_eq!(stored.title, "Renamed");
    assert_eq!(stored.body, "Seeded body");
    // published was not submitted and stays as it was
    assert!(stored.published);
}

#[tokio::test]
async fn update_failure_leaves_post_untouched() {
    let (app, store) = app();
    let post = seed(&store, "Original", false).await;

    let response = send(
        &app,
        json_request(Method::PUT, &format!("/posts/{}", post.id), json!({ "title": "" })),
    )
    .await;

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body_json(response).await, json!({ "title": ["can't be blank"] }));
    assert_eq!(store.find(post.id).await.unwrap().title, "Original");

    let response = send(
        &app,
        form_request(
            Method::PATCH,
            &format!("/posts/{}", post.id),
            "text/html",
            "post[title]=",
        ),
    )
    .await;

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body_text(response).await.contains("Editing post"));
}

#[tokio::test]
async fn update_html_redirects_to_post() {
    let (app, store) = app();
    let post = seed(&store, "Original", false).await;

    let response = send(
        &app,
        form_request(
            Method::PATCH,
            &format!("/posts/{}", post.id),
            "text/html",
            "post[title]=Renamed&post[published]=1",
        ),
    )
    .await;

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(
        location(&response),
        format!("/posts/{}?notice=Post+was+successfully+updated.", post.id)
    );

    let stored = store.find(post.id).await.unwrap();
    assert_eq!(stored.title, "Renamed");
    assert!(stored.published);
}

#[tokio::test]
async fn update_checked_only_publishes_on_literal_one() {
    let (app, store) = app();
    let post = seed(&store, "Toggle me", false).await;
    let uri = format!("/posts/{}/update_checked", post.id);

    let response = send(
        &app,
        json_request(Method::PATCH, &uri, json!({ "post": { "published": "1" } })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!({ "success": true, "published": true }));
    assert!(store.find(post.id).await.unwrap().published);

    for body in [
        json!({ "post": { "published": "0" } }),
        json!({ "post": { "published": "false" } }),
        json!({ "post": { "published": "true" } }),
        json!({ "post": { "published": true } }),
        json!({ "post": {} }),
        json!({}),
    ] {
        // start each case from published
        store.set_published(post.id, true).await.unwrap();

        let response = send(&app, json_request(Method::PATCH, &uri, body.clone())).await;
        assert_eq!(response.status(), StatusCode::OK, "{body}");
        assert_eq!(
            body_json(response).await,
            json!({ "success": true, "published": false }),
            "{body}"
        );
        assert!(!store.find(post.id).await.unwrap().published, "{body}");
    }
}

#[tokio::test]
async fn update_checked_turbo_stream_targets_checkbox() {
    let (app, store) = app();
    let post = seed(&store, "Toggle me", false).await;

    let response = send(
        &app,
        form_request(
            Method::POST,
            &format!("/posts/{}/update_checked", post.id),
            "text/vnd.turbo-stream.html, text/html, application/xhtml+xml",
            "_method=patch&post[published]=0&post[published]=1",
        ),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], TURBO_STREAM);
    let stream = body_text(response).await;
    assert!(stream.contains(&format!(r#"target="post_{}_published""#, post.id)));
    assert!(stream.contains(" checked>"));
    // only the checkbox form is replaced, not the whole post
    assert!(stream.contains(&format!("/posts/{}/update_checked", post.id)));
    assert!(!stream.contains(&format!(r#"<div id="post_{}">"#, post.id)));
    assert!(!stream.contains("Toggle me"));
    assert!(store.find(post.id).await.unwrap().published);
}

#[tokio::test]
async fn update_checked_without_accept_header_redirects_to_list() {
    let (app, store) = app();
    let post = seed(&store, "Toggle me", false).await;

    let response = send(
        &app,
        browser_form_request(
            Method::PATCH,
            &format!("/posts/{}/update_checked", post.id),
            "post[published]=1",
        ),
    )
    .await;

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/posts?notice=Post+updated+successfully");
    assert!(store.find(post.id).await.unwrap().published);
}

#[tokio::test]
async fn update_checked_json_suffix_answers_json() {
    let (app, store) = app();
    let post = seed(&store, "Toggle me", false).await;

    let response = send(
        &app,
        browser_form_request(
            Method::PATCH,
            &format!("/posts/{}/update_checked.json", post.id),
            "post[published]=1",
        ),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!({ "success": true, "published": true }));
    assert!(store.find(post.id).await.unwrap().published);
}

#[tokio::test]
async fn update_checked_html_redirects_to_list() {
    let (app, store) = app();
    let post = seed(&store, "Toggle me", true).await;

    let response = send(
        &app,
        form_request(
            Method::PATCH,
            &format!("/posts/{}/update_checked", post.id),
            "text/html",
            "post[published]=0",
        ),
    )
    .await;

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/posts?notice=Post+updated+successfully");
    assert!(!store.find(post.id).await.unwrap().published);
}

#[tokio::test]
async fn update_checked_on_missing_post_is_not_found() {
    let (app, store) = app();

    let response = send(
        &app,
        json_request(
            Method::PATCH,
            &format!("/posts/{}/update_checked", Uuid::new_v4()),
            json!({ "post": { "published": "1" } }),
        ),
    )
    .await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(store.all().await.unwrap().is_empty());
}

#[tokio::test]
async fn update_checked_does_not_validate_other_attributes() {
    let (app, store) = app();
    // a record that would fail validation, stored without it
    let legacy = store
        .insert(&Post::new(PostParams::default()))
        .await
        .unwrap();

    let response = send(
        &app,
        json_request(
            Method::PATCH,
            &format!("/posts/{}/update_checked", legacy.id),
            json!({ "post": { "published": "1" } }),
        ),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(store.find(legacy.id).await.unwrap().published);
}

#[tokio::test]
async fn destroy_json_then_show_is_not_found() {
    let (app, store) = app();
    let post = seed(&store, "Doomed", false).await;

    let response = send(
        &app,
        Request::builder()
            .method(Method::DELETE)
            .uri(format!("/posts/{}.json", post.id))
            .body(Body::empty())
            .unwrap(),
    )
    .await;

    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert!(body_text(response).await.is_empty());

    let response = send(&app, get(&format!("/posts/{}", post.id), "application/json")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn destroy_html_redirects_with_see_other() {
    let (app, store) = app();
    let post = seed(&store, "Doomed", false).await;

    let response = send(
        &app,
        Request::builder()
            .method(Method::DELETE)
            .uri(format!("/posts/{}", post.id))
            .header(header::ACCEPT, "text/html")
            .body(Body::empty())
            .unwrap(),
    )
    .await;

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/posts?notice=Post+was+successfully+destroyed.");
    assert!(store.all().await.unwrap().is_empty());
}

#[tokio::test]
async fn index_lists_every_persisted_post() {
    let (app, store) = app();
    let first = seed(&store, "First", true).await;
    let second = seed(&store, "Second", false).await;

    // rejected posts never show up
    let rejected = send(&app, json_request(Method::POST, "/posts", json!({ "title": "" }))).await;
    assert_eq!(rejected.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let response = send(&app, get("/posts.json", "*/*")).await;
    assert_eq!(response.status(), StatusCode::OK);

    let listed = body_json(response).await;
    let ids: Vec<&str> = listed
        .as_array()
        .unwrap()
        .iter()
        .map(|post| post["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec![first.id.to_string(), second.id.to_string()]);
}

#[tokio::test]
async fn index_html_renders_posts_and_notice() {
    let (app, store) = app();
    seed(&store, "Rendered title", false).await;

    let response = send(&app, get("/posts?notice=Hello+there", "text/html")).await;

    assert_eq!(response.status(), StatusCode::OK);
    let page = body_text(response).await;
    assert!(page.contains("Rendered title"));
    assert!(page.contains("Hello there"));
}

#[tokio::test]
async fn new_and_edit_forms() {
    let (app, store) = app();
    let post = seed(&store, "Editable", false).await;

    let response = send(&app, get("/posts/new", "text/html")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.contains("New post"));

    let response = send(&app, get(&format!("/posts/{}/edit", post.id), "text/html")).await;
    assert_eq!(response.status(), StatusCode::OK);
    let page = body_text(response).await;
    assert!(page.contains("Editing post"));
    assert!(page.contains("Editable"));
}

#[tokio::test]
async fn missing_post_is_not_found_before_any_mutation() {
    let (app, store) = app();
    let existing = seed(&store, "Bystander", false).await;

    for id in [Uuid::new_v4().to_string(), "not-a-uuid".to_string()] {
        let requests = vec![
            get(&format!("/posts/{}", id), "text/html"),
            get(&format!("/posts/{}/edit", id), "text/html"),
            json_request(Method::PATCH, &format!("/posts/{}", id), json!({ "title": "x" })),
            Request::builder()
                .method(Method::DELETE)
                .uri(format!("/posts/{}", id))
                .body(Body::empty())
                .unwrap(),
        ];

        for request in requests {
            let uri = request.uri().to_string();
            let response = send(&app, request).await;
            assert_eq!(response.status(), StatusCode::NOT_FOUND, "{uri}");
            assert_eq!(body_json(response).await["error"]["code"], "NOT_FOUND");
        }
    }

    assert_eq!(store.all().await.unwrap(), vec![existing]);
}

#[tokio::test]
async fn html_forms_override_method() {
    let (app, store) = app();
    let post = seed(&store, "Original", false).await;
    let uri = format!("/posts/{}", post.id);

    let response = send(
        &app,
        form_request(Method::POST, &uri, "text/html", "_method=patch&post[title]=Renamed"),
    )
    .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(store.find(post.id).await.unwrap().title, "Renamed");

    let response = send(&app, form_request(Method::POST, &uri, "text/html", "_method=get")).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = send(&app, form_request(Method::POST, &uri, "text/html", "_method=delete")).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert!(store.all().await.unwrap().is_empty());
}

#[tokio::test]
async fn malformed_json_is_bad_request() {
    let (app, store) = app();

    let response = send(
        &app,
        Request::builder()
            .method(Method::POST)
            .uri("/posts")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{\"post\": "))
            .unwrap(),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(store.all().await.unwrap().is_empty());
}
