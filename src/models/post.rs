use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

pub const TITLE_MAX_LEN: usize = 200;
pub const BODY_MAX_LEN: usize = 10_000;

/// A blog post as stored by the persistence layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: Uuid,
    pub title: String,
    pub body: String,
    pub published: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The attributes a client may assign to a post.
///
/// Built from an arbitrary request mapping: only `title`, `body` and `published`
/// are read, everything else is dropped. A `None` field was not supplied and
/// leaves the post untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PostParams {
    pub title: Option<String>,
    pub body: Option<String>,
    pub published: Option<bool>,
}

/// Field name to messages, in the shape clients expect: `{"title":["can't be blank"]}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors(BTreeMap<String, Vec<String>>);

impl Post {
    /// Build an unsaved post from permitted params. Unsupplied fields take their defaults.
    pub fn new(params: PostParams) -> Self {
        let now = Utc::now();

        Post {
            id: Uuid::new_v4(),
            title: params.title.unwrap_or_default(),
            body: params.body.unwrap_or_default(),
            published: params.published.unwrap_or(false),
            created_at: now,
            updated_at: now,
        }
    }

    /// Assign the supplied params. Timestamps are left to the store.
    pub fn assign(&mut self, params: PostParams) {
        if let Some(title) = params.title {
            self.title = title;
        }

        if let Some(body) = params.body {
            self.body = body;
        }

        if let Some(published) = params.published {
            self.published = published;
        }
    }

    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::default();

        if self.title.trim().is_empty() {
            errors.add("title", "can't be blank");
        } else if self.title.chars().count() > TITLE_MAX_LEN {
            errors.add("title", format!("is too long (maximum is {} characters)", TITLE_MAX_LEN));
        }

        if self.body.trim().is_empty() {
            errors.add("body", "can't be blank");
        } else if self.body.chars().count() > BODY_MAX_LEN {
            errors.add("body", format!("is too long (maximum is {} characters)", BODY_MAX_LEN));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// DOM id of the element that holds this post's `published` checkbox.
    pub fn published_dom_id(&self) -> String {
        format!("post_{}_published", self.id)
    }
}

impl PostParams {
    pub fn from_map(map: &Map<String, Value>) -> Self {
        PostParams {
            title: map.get("title").and_then(coerce_string),
            body: map.get("body").and_then(coerce_string),
            published: map.get("published").and_then(coerce_boolean),
        }
    }
}

impl ValidationErrors {
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0.entry(field.to_string()).or_default().push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    /// Human readable messages, e.g. "Title can't be blank".
    pub fn full_messages(&self) -> Vec<String> {
        self.0
            .iter()
            .flat_map(|(field, messages)| {
                messages
                    .iter()
                    .map(move |message| format!("{} {}", humanize(field), message))
            })
            .collect()
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.full_messages().join(", "))
    }
}

/// Boolean cast used for `published` on create and update.
///
/// `None` means "not supplied": JSON null and the empty string.
pub fn coerce_boolean(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => Some(n.as_f64().map_or(true, |n| n != 0.0)),
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(!matches!(
            s.as_str(),
            "0" | "f" | "F" | "false" | "FALSE" | "off" | "OFF"
        )),
        _ => None,
    }
}

/// The checkbox toggle only treats the literal string `"1"` as checked.
pub fn checkbox_checked(value: Option<&Value>) -> bool {
    matches!(value, Some(Value::String(s)) if s == "1")
}

fn coerce_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Null => Some(String::new()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Array(_) | Value::Object(_) => None,
    }
}

fn humanize(field: &str) -> String {
    let mut chars = field.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect::<String>().replace('_', " "),
        None => String::new(),
    }
}
