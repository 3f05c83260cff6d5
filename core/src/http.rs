//! Plain-data views of an outgoing request and a finished exchange.
//!
//! # Design
//! `Outbound` is the working state the pipeline derives from a `Request`:
//! the final method, URL and header list. Keeping it separate from the
//! descriptor means the caller's value is never rewritten in place, and the
//! header assembly rules can be tested without a network.
//!
//! `Reply` is what a successful call returns. In download mode `bytes` and
//! `decoded` stay empty and `downloaded` records how much was written.

use std::time::Duration;

use ureq::http::{response, HeaderMap, StatusCode, Version};

pub const DEFAULT_CONTENT_TYPE: &str = "application/json";

/// A request ready to hand to the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outbound {
    pub method: String,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub timeout: Option<Duration>,
}

impl Outbound {
    /// Assembles the header list in wire order: explicit headers, the default
    /// content type when the caller gave no header list at all, then the
    /// bearer token. A forced content type replaces every caller-supplied one.
    /// Duplicate names are kept.
    pub fn headers(
        explicit: Option<Vec<(String, String)>>,
        bearer_token: Option<&str>,
        forced_content_type: Option<&str>,
    ) -> Vec<(String, String)> {
        let mut headers = match explicit {
            Some(headers) => headers,
            None => vec![("Content-Type".to_string(), DEFAULT_CONTENT_TYPE.to_string())],
        };

        if let Some(content_type) = forced_content_type {
            headers.retain(|(name, _)| !name.eq_ignore_ascii_case("content-type"));
            headers.push(("Content-Type".to_string(), content_type.to_string()));
        }

        if let Some(token) = bearer_token.filter(|token| !token.is_empty()) {
            headers.push(("Authorization".to_string(), format!("Bearer {token}")));
        }
        headers
    }
}

/// Joins a relative target onto `base_url`. Absolute targets pass through.
pub fn resolve(base_url: Option<&str>, target: &str) -> String {
    let absolute = target.starts_with("http://") || target.starts_with("https://");
    match base_url {
        Some(base) if !absolute => {
            let base = base.trim_end_matches('/');
            if target.starts_with('/') {
                format!("{base}{target}")
            } else {
                format!("{base}/{target}")
            }
        }
        _ => target.to_string(),
    }
}

/// The outcome of a successful call.
#[derive(Debug)]
pub struct Reply<D> {
    pub status: StatusCode,
    pub version: Version,
    pub headers: HeaderMap,
    /// Raw body. `None` in download mode.
    pub bytes: Option<Vec<u8>>,
    /// Decoded body. `None` in download mode.
    pub decoded: Option<D>,
    /// Bytes written to the destination in download mode.
    pub downloaded: Option<u64>,
}

impl<D> Reply<D> {
    pub(crate) fn decoded(head: response::Parts, bytes: Vec<u8>, decoded: D) -> Self {
        Self {
            status: head.status,
            version: head.version,
            headers: head.headers,
            bytes: Some(bytes),
            decoded: Some(decoded),
            downloaded: None,
        }
    }

    pub(crate) fn downloaded(head: response::Parts, written: u64) -> Self {
        Self {
            status: head.status,
            version: head.version,
            headers: head.headers,
            bytes: None,
            decoded: None,
            downloaded: Some(written),
        }
    }

    pub fn content_type(&self) -> Option<&str> {
        self.headers
            .get(ureq::http::header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
    }

    pub fn into_decoded(self) -> Option<D> {
        self.decoded
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(list: &[(&str, &str)]) -> Vec<(String, String)> {
        list.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn default_content_type_when_no_headers() {
        assert_eq!(
            Outbound::headers(None, None, None),
            pairs(&[("Content-Type", "application/json")])
        );
    }

    #[test]
    fn empty_header_list_suppresses_default() {
        assert!(Outbound::headers(Some(Vec::new()), None, None).is_empty());
    }

    #[test]
    fn explicit_headers_then_bearer() {
        let headers = Outbound::headers(Some(pairs(&[("X-A", "1"), ("X-A", "2")])), Some("tok"), None);
        assert_eq!(
            headers,
            pairs(&[("X-A", "1"), ("X-A", "2"), ("Authorization", "Bearer tok")])
        );
    }

    #[test]
    fn empty_token_is_ignored() {
        assert_eq!(Outbound::headers(Some(Vec::new()), Some(""), None), Vec::new());
    }

    #[test]
    fn forced_content_type_replaces_caller_value() {
        let headers = Outbound::headers(
            Some(pairs(&[("content-type", "text/plain"), ("X-B", "b")])),
            None,
            Some("multipart/form-data; boundary=x"),
        );
        assert_eq!(
            headers,
            pairs(&[("X-B", "b"), ("Content-Type", "multipart/form-data; boundary=x")])
        );

        let headers = Outbound::headers(None, None, Some("multipart/form-data; boundary=x"));
        assert_eq!(headers, pairs(&[("Content-Type", "multipart/form-data; boundary=x")]));
    }

    #[test]
    fn resolve_joins_relative_targets() {
        assert_eq!(resolve(Some("http://h:1/"), "/items"), "http://h:1/items");
        assert_eq!(resolve(Some("http://h:1"), "items"), "http://h:1/items");
        assert_eq!(resolve(Some("http://h:1"), "https://other/x"), "https://other/x");
        assert_eq!(resolve(None, "/items"), "/items");
    }
}
