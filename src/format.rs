// Content negotiation
// Picks the response representation for a request: HTML, JSON or a Turbo Stream fragment

use std::{cmp::Ordering, convert::Infallible};

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::ACCEPT, request::Parts},
};

pub const TURBO_STREAM_MIME: &str = "text/vnd.turbo-stream.html";

const JSON_EXTENSION: &str = ".json";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Html,
    Json,
    TurboStream,
}

impl Format {
    fn from_media_type(media_type: &str) -> Option<Format> {
        match media_type {
            "text/html" | "application/xhtml+xml" => Some(Format::Html),
            "application/json" => Some(Format::Json),
            TURBO_STREAM_MIME => Some(Format::TurboStream),
            _ => None,
        }
    }
}

/// What the client asked for, before an action says what it can offer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestedFormat {
    json_extension: bool,
    accepted: Vec<String>,
}

impl RequestedFormat {
    pub fn from_parts(path: &str, accept: Option<&str>) -> Self {
        RequestedFormat {
            json_extension: path.ends_with(JSON_EXTENSION),
            accepted: accept.map(parse_accept).unwrap_or_default(),
        }
    }

    /// Choose among `offered`, in the action's order of preference.
    ///
    /// A `.json` path suffix wins over the `Accept` header. A request without an
    /// `Accept` header is a plain browser submission and gets HTML when the action
    /// offers it. `*/*`, or a header naming nothing offered, gets the action's first format.
    pub fn negotiate(&self, offered: &[Format]) -> Format {
        let fallback = offered.first().copied().unwrap_or(Format::Html);

        if self.json_extension && offered.contains(&Format::Json) {
            return Format::Json;
        }

        if self.accepted.is_empty() && offered.contains(&Format::Html) {
            return Format::Html;
        }

        for media_type in &self.accepted {
            if media_type == "*/*" {
                return fallback;
            }
            if let Some(format) = Format::from_media_type(media_type) {
                if offered.contains(&format) {
                    return format;
                }
            }
        }

        fallback
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for RequestedFormat
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let accept = parts.headers.get(ACCEPT).and_then(|value| value.to_str().ok());
        Ok(RequestedFormat::from_parts(parts.uri.path(), accept))
    }
}

/// Strip a trailing `.json` from a path segment such as `:id`.
pub fn strip_format_extension(segment: &str) -> &str {
    segment.strip_suffix(JSON_EXTENSION).unwrap_or(segment)
}

/// Media types from an `Accept` header, highest quality first. `q=0` entries are dropped.
fn parse_accept(header: &str) -> Vec<String> {
    let mut entries: Vec<(String, f32)> = header
        .split(',')
        .filter_map(|entry| {
            let mut pieces = entry.split(';');
            let media_type = pieces.next()?.trim().to_ascii_lowercase();
            if media_type.is_empty() {
                return None;
            }

            let quality = pieces
                .filter_map(|param| param.trim().strip_prefix("q="))
                .find_map(|q| q.trim().parse::<f32>().ok())
                .unwrap_or(1.0);

            (quality > 0.0).then_some((media_type, quality))
        })
        .collect();

    // stable: equal qualities keep header order
    entries.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
    entries.into_iter().map(|(media_type, _)| media_type).collect()
}
