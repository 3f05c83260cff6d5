//! Error types for the request pipeline.
//!
//! # Design
//! Every stage owns its own error enum so callers can tell "the descriptor
//! was wrong" from "the network failed" without string matching. The
//! top-level `Error` wraps them all and is what `Executor` returns.
//!
//! A decode failure carries the raw response body alongside the underlying
//! error so callers can apply their own fallback.

use std::io;
use std::path::PathBuf;

use ureq::http::StatusCode;

/// Errors returned by `Executor::execute` and `Executor::execute_as`.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The descriptor failed pre-flight checks. No I/O was attempted.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The request payload could not be produced.
    #[error(transparent)]
    Encoding(#[from] EncodingError),

    /// The request could not be built or the round trip failed.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// An interceptor refused the request or the response.
    #[error(transparent)]
    Intercept(#[from] InterceptError),

    /// The response body could not be read off the wire.
    #[error("failed to read response body: {0}")]
    Read(#[source] ureq::Error),

    /// Download mode failed.
    #[error(transparent)]
    Download(#[from] DownloadError),

    /// The response body did not match the demanded shape.
    #[error("failed to decode {status} response: {source}")]
    Decode {
        #[source]
        source: DecodeError,
        status: StatusCode,
        body: Vec<u8>,
    },
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("target url is required")]
    MissingTarget,

    #[error("http verb is required")]
    MissingVerb,

    #[error("a body is not allowed for {verb} requests")]
    BodyNotAllowed { verb: String },
}

#[derive(Debug, thiserror::Error)]
pub enum EncodingError {
    #[error("failed to serialize request body: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("failed to open upload file {}: {source}", .path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to read upload source for field {key:?}: {source}")]
    Read {
        key: String,
        #[source]
        source: io::Error,
    },

    #[error("form file {key:?} has neither a path nor a handle")]
    MissingSource { key: String },

    #[error("multipart stream closed: {0}")]
    Write(#[source] io::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("invalid request: {0}")]
    Build(String),

    #[error("request failed: {0}")]
    Call(#[from] ureq::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum DownloadError {
    #[error("download mode requires a destination path or writer")]
    DestinationMissing,

    #[error("failed to create download file {}: {source}", .path.display())]
    Create {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to write download: {0}")]
    Write(#[source] io::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("invalid json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid xml: {0}")]
    Xml(#[from] quick_xml::DeError),
}

#[derive(Debug, thiserror::Error)]
pub enum InterceptError {
    #[error("interceptor rejected the exchange: {0}")]
    Rejected(String),

    #[error("unexpected response status {0}")]
    UnexpectedStatus(StatusCode),
}

impl Error {
    /// Raw response bytes, when the failure happened after the body was read.
    pub fn body(&self) -> Option<&[u8]> {
        match self {
            Error::Decode { body, .. } => Some(body),
            _ => None,
        }
    }
}
