//! The request descriptor and its payload types.
//!
//! # Design
//! A `Request` is plain data the caller fills in once per call and moves into
//! the executor. The pipeline never mutates the caller's value in place: URL
//! composition produces a fresh descriptor (see `Request::composed`), and the
//! encoder consumes the payload fields.
//!
//! Upload handles and download writers are boxed trait objects, so `Request`
//! is `Send` but not `Clone`.

use std::collections::HashMap;
use std::fmt;
use std::io::{Read, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;

use crate::error::EncodingError;
use crate::intercept::Interceptor;
use crate::url;

/// Everything one HTTP call needs.
#[derive(Default)]
pub struct Request {
    pub target: String,
    pub verb: String,
    pub path_params: HashMap<String, String>,
    pub query_params: HashMap<String, String>,
    /// `None` applies the default `Content-Type: application/json`;
    /// `Some(vec![])` suppresses it.
    pub headers: Option<Vec<(String, String)>>,
    pub bearer_token: Option<String>,
    pub body: Option<serde_json::Value>,
    pub form: Option<Form>,
    /// Forces the multipart encoder even when `form` is `None`.
    pub multipart: bool,
    /// Zero leaves the agent's default in place.
    pub timeout: Duration,
    pub download: Option<Destination>,
    pub interceptor: Option<Arc<dyn Interceptor>>,
}

impl Request {
    pub fn new(verb: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            verb: verb.into(),
            ..Self::default()
        }
    }

    pub fn get(target: impl Into<String>) -> Self {
        Self::new("GET", target)
    }

    pub fn post(target: impl Into<String>) -> Self {
        Self::new("POST", target)
    }

    pub fn put(target: impl Into<String>) -> Self {
        Self::new("PUT", target)
    }

    pub fn delete(target: impl Into<String>) -> Self {
        Self::new("DELETE", target)
    }

    pub fn path_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.path_params.insert(name.into(), value.into());
        self
    }

    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query_params.insert(key.into(), value.into());
        self
    }

    /// Appends a header. The first call turns off the default content type.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers
            .get_or_insert_with(Vec::new)
            .push((name.into(), value.into()));
        self
    }

    /// Sends no headers beyond the ones the pipeline itself adds.
    pub fn no_default_headers(mut self) -> Self {
        self.headers.get_or_insert_with(Vec::new);
        self
    }

    pub fn bearer_token(mut self, token: impl Into<String>) -> Self {
        self.bearer_token = Some(token.into());
        self
    }

    pub fn json<T: Serialize + ?Sized>(mut self, body: &T) -> Result<Self, EncodingError> {
        self.body = Some(serde_json::to_value(body)?);
        Ok(self)
    }

    pub fn form(mut self, form: Form) -> Self {
        self.form = Some(form);
        self
    }

    pub fn multipart(mut self) -> Self {
        self.multipart = true;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn download_to(mut self, destination: Destination) -> Self {
        self.download = Some(destination);
        self
    }

    pub fn interceptor(mut self, interceptor: Arc<dyn Interceptor>) -> Self {
        self.interceptor = Some(interceptor);
        self
    }

    pub(crate) fn has_payload(&self) -> bool {
        self.body.is_some() || self.form.is_some()
    }

    pub(crate) fn is_multipart(&self) -> bool {
        self.form.is_some() || self.multipart
    }

    /// Consumes the descriptor and returns one whose `target` is the composed
    /// URL and whose parameter maps are empty, so composing again is a no-op.
    pub(crate) fn composed(mut self) -> Self {
        self.target = url::compose(&self.target, &self.path_params, &self.query_params);
        self.path_params.clear();
        self.query_params.clear();
        self
    }
}

impl fmt::Debug for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Request")
            .field("target", &self.target)
            .field("verb", &self.verb)
            .field("path_params", &self.path_params)
            .field("query_params", &self.query_params)
            .field("headers", &self.headers)
            .field("bearer_token", &self.bearer_token.as_ref().map(|_| "<redacted>"))
            .field("body", &self.body)
            .field("form", &self.form)
            .field("multipart", &self.multipart)
            .field("timeout", &self.timeout)
            .field("download", &self.download)
            .field("interceptor", &self.interceptor.is_some())
            .finish()
    }
}

/// A multipart/form-data payload.
#[derive(Debug, Default)]
pub struct Form {
    pub files: Vec<FormFile>,
    pub data: Vec<FormData>,
}

impl Form {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn file(mut self, file: FormFile) -> Self {
        self.files.push(file);
        self
    }

    pub fn text(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.data.push(FormData {
            key: key.into(),
            value: value.into(),
        });
        self
    }
}

/// A plain text field sent alongside the files of a `Form`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormData {
    pub key: String,
    pub value: String,
}

/// One file part of a `Form`.
///
/// `path` and `handle` are alternatives. When both are set the handle is
/// used and the path is ignored; when neither is set encoding fails.
pub struct FormFile {
    /// File name reported to the server.
    pub name: String,
    /// Form field the file is attached to.
    pub key: String,
    pub path: Option<PathBuf>,
    pub handle: Option<Box<dyn Read + Send>>,
}

impl FormFile {
    pub fn from_path(key: impl Into<String>, name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            key: key.into(),
            path: Some(path.into()),
            handle: None,
        }
    }

    /// The handle is dropped once its bytes have been streamed.
    pub fn from_reader(
        key: impl Into<String>,
        name: impl Into<String>,
        handle: impl Read + Send + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            key: key.into(),
            path: None,
            handle: Some(Box::new(handle)),
        }
    }
}

impl fmt::Debug for FormFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FormFile")
            .field("name", &self.name)
            .field("key", &self.key)
            .field("path", &self.path)
            .field("handle", &self.handle.is_some())
            .finish()
    }
}

/// Where download mode writes the response body.
///
/// `writer` wins over `location` when both are set. Leaving both empty is
/// reported as `DownloadError::DestinationMissing` when the request is sent.
#[derive(Default)]
pub struct Destination {
    pub location: Option<PathBuf>,
    pub writer: Option<Box<dyn Write + Send>>,
}

impl Destination {
    /// Creates or truncates the file at `path`.
    pub fn path(path: impl Into<PathBuf>) -> Self {
        Self {
            location: Some(path.into()),
            writer: None,
        }
    }

    pub fn writer(writer: impl Write + Send + 'static) -> Self {
        Self {
            location: None,
            writer: Some(Box::new(writer)),
        }
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.location.is_none() && self.writer.is_none()
    }
}

impl fmt::Debug for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Destination")
            .field("location", &self.location)
            .field("writer", &self.writer.is_some())
            .finish()
    }
}
