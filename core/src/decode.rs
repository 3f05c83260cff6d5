//! Content-type driven response decoding.
//!
//! # Design
//! Two entry points share the same dispatch on `Content-Type`:
//! - `payload` is used when the caller did not commit to a shape. It never
//!   fails: anything that is not JSON comes back as text.
//! - `shaped` is used when the caller asked for a concrete `T`. Decode
//!   failures are errors.
//!
//! `text/plain` bodies are decoded with JSON rules when a shape is demanded,
//! `application/xml` bodies with `quick-xml`, and everything else as JSON.

use serde::de::DeserializeOwned;

use crate::error::DecodeError;

/// A best-effort decoded body for callers that did not name a shape.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Json(serde_json::Value),
    Text(String),
}

impl Payload {
    pub fn as_json(&self) -> Option<&serde_json::Value> {
        match self {
            Payload::Json(value) => Some(value),
            Payload::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Payload::Text(text) => Some(text),
            Payload::Json(_) => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Text,
    Xml,
    Json,
}

fn kind(content_type: &str) -> Kind {
    if content_type.contains("text/plain") {
        Kind::Text
    } else if content_type.contains("application/xml") {
        Kind::Xml
    } else {
        Kind::Json
    }
}

pub fn payload(content_type: &str, bytes: &[u8]) -> Payload {
    match kind(content_type) {
        Kind::Text | Kind::Xml => Payload::Text(text(bytes)),
        Kind::Json => match serde_json::from_slice(bytes) {
            Ok(value) => Payload::Json(value),
            Err(err) => {
                tracing::debug!(error = %err, "response is not json, returning text");
                Payload::Text(text(bytes))
            }
        },
    }
}

pub fn shaped<T: DeserializeOwned>(content_type: &str, bytes: &[u8]) -> Result<T, DecodeError> {
    match kind(content_type) {
        Kind::Xml => Ok(quick_xml::de::from_reader(bytes)?),
        Kind::Text | Kind::Json => Ok(serde_json::from_slice(bytes)?),
    }
}

fn text(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}
