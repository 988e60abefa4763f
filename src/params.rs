// Request parameters
// Decodes JSON and urlencoded form bodies into one generic mapping

use axum::{
    async_trait,
    body::Bytes,
    extract::{FromRequest, Request},
    http::header::CONTENT_TYPE,
};
use serde_json::{Map, Value};
use tracing::debug;

use crate::{error::ApiError, models::PostParams};

/// Untyped request body. Handlers pick what they need out of it; the typed
/// whitelist lives in [`PostParams`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestParams(Map<String, Value>);

impl RequestParams {
    pub fn from_json(bytes: &[u8]) -> Result<Self, ApiError> {
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::default());
        }

        match serde_json::from_slice::<Value>(bytes) {
            Ok(Value::Object(map)) => Ok(Self(map)),
            Ok(_) => Err(ApiError::bad_request("Request body must be a JSON object")),
            Err(e) => Err(ApiError::bad_request(format!("Malformed JSON body: {}", e))),
        }
    }

    /// Decode `application/x-www-form-urlencoded`. Keys like `post[title]` are
    /// nested under `post`; a repeated key keeps its last value.
    pub fn from_form(bytes: &[u8]) -> Result<Self, ApiError> {
        let pairs: Vec<(String, String)> = serde_urlencoded::from_bytes(bytes)
            .map_err(|e| ApiError::bad_request(format!("Malformed form body: {}", e)))?;

        let mut root = Map::new();
        for (key, value) in pairs {
            match split_nested_key(&key) {
                Some((outer, inner)) => {
                    let entry = root
                        .entry(outer.to_string())
                        .or_insert_with(|| Value::Object(Map::new()));
                    if !entry.is_object() {
                        *entry = Value::Object(Map::new());
                    }
                    if let Value::Object(nested) = entry {
                        nested.insert(inner.to_string(), Value::String(value));
                    }
                }
                None => {
                    root.insert(key, Value::String(value));
                }
            }
        }

        Ok(Self(root))
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Attributes scoped under `name` when the client nested them, otherwise the top level.
    pub fn resource(&self, name: &str) -> &Map<String, Value> {
        match self.0.get(name) {
            Some(Value::Object(nested)) => nested,
            _ => &self.0,
        }
    }

    pub fn post_params(&self) -> PostParams {
        PostParams::from_map(self.resource("post"))
    }

    /// Raw value submitted for one post attribute, before any coercion.
    pub fn post_field(&self, field: &str) -> Option<&Value> {
        self.resource("post").get(field)
    }

    /// Verb requested by an HTML form through its hidden `_method` field.
    pub fn method_override(&self) -> Option<String> {
        self.0
            .get("_method")
            .and_then(Value::as_str)
            .map(|method| method.trim().to_ascii_lowercase())
    }
}

impl From<Map<String, Value>> for RequestParams {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

#[async_trait]
impl<S> FromRequest<S> for RequestParams
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let content_type = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.to_ascii_lowercase())
            .unwrap_or_default();

        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(|e| ApiError::bad_request(e.body_text()))?;

        if content_type.starts_with("application/json") || content_type.contains("+json") {
            Self::from_json(&bytes)
        } else if content_type.starts_with("application/x-www-form-urlencoded") {
            Self::from_form(&bytes)
        } else {
            if !bytes.is_empty() {
                debug!("Ignoring request body with content type '{}'", content_type);
            }
            Ok(Self::default())
        }
    }
}

fn split_nested_key(key: &str) -> Option<(&str, &str)> {
    let (outer, rest) = key.split_once('[')?;
    let inner = rest.strip_suffix(']')?;
    if outer.is_empty() || inner.is_empty() {
        return None;
    }
    Some((outer, inner))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_form_keys_are_nested() {
        let params =
            RequestParams::from_form(b"post%5Btitle%5D=Hello&post[body]=World&_method=patch")
                .unwrap();

        assert_eq!(params.resource("post").get("title"), Some(&json!("Hello")));
        assert_eq!(params.resource("post").get("body"), Some(&json!("World")));
        assert_eq!(params.method_override().as_deref(), Some("patch"));
    }

    #[test]
    fn test_checkbox_hidden_field_is_overridden_by_checked_value() {
        let params =
            RequestParams::from_form(b"post[published]=0&post[published]=1").unwrap();
        assert_eq!(params.post_field("published"), Some(&json!("1")));
    }

    #[test]
    fn test_json_nested_and_flat() {
        let nested = RequestParams::from_json(br#"{"post":{"title":"A","body":"B"}}"#).unwrap();
        assert_eq!(nested.post_params().title.as_deref(), Some("A"));

        let flat = RequestParams::from_json(br#"{"title":"A","body":"B"}"#).unwrap();
        assert_eq!(flat.post_params().body.as_deref(), Some("B"));
    }

    #[test]
    fn test_unknown_fields_never_reach_post_params() {
        let params = RequestParams::from_json(
            br#"{"post":{"title":"A","body":"B","published":"1","admin":true}}"#,
        )
        .unwrap();

        let permitted = params.post_params();
        assert_eq!(
            permitted,
            PostParams {
                title: Some("A".to_string()),
                body: Some("B".to_string()),
                published: Some(true),
            }
        );
    }

    #[test]
    fn test_empty_and_malformed_json() {
        assert_eq!(RequestParams::from_json(b"  ").unwrap(), RequestParams::default());
        assert!(matches!(
            RequestParams::from_json(b"{not json"),
            Err(ApiError::BadRequest(_))
        ));
        assert!(matches!(
            RequestParams::from_json(b"[1,2]"),
            Err(ApiError::BadRequest(_))
        ));
    }

    #[test]
    fn test_split_nested_key() {
        assert_eq!(split_nested_key("post[title]"), Some(("post", "title")));
        assert_eq!(split_nested_key("title"), None);
        assert_eq!(split_nested_key("[title]"), None);
        assert_eq!(split_nested_key("post[]"), None);
    }
}
