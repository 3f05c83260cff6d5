//! Declarative, blocking HTTP request executor.
//!
//! # Overview
//! Callers describe a call as a `Request` (target, verb, path and query
//! parameters, headers, bearer token, JSON body or multipart form, timeout)
//! and hand it to an `Executor`. The executor validates it, composes the URL,
//! encodes the body, sends it through `ureq`, and decodes the response by its
//! content type, or streams it to a file or writer in download mode.
//!
//! # Design
//! - `Executor` is stateless apart from its config and a shared agent.
//! - The response shape is a type parameter (`execute_as::<T>`); `execute`
//!   returns a best-effort `Payload` instead.
//! - Multipart bodies are produced on a helper thread and streamed through a
//!   bounded channel, never buffered whole.
//! - `Interceptor`s can rewrite the request before encoding and inspect the
//!   response before its body is read.

pub mod client;
pub mod decode;
pub mod download;
pub mod encode;
pub mod error;
pub mod http;
pub mod intercept;
pub mod multipart;
pub mod request;
pub mod transport;
pub mod url;
pub mod validate;

pub use client::{Executor, ExecutorConfig};
pub use decode::Payload;
pub use error::{
    DecodeError, DownloadError, EncodingError, Error, InterceptError, TransportError, ValidationError,
};
pub use http::{Outbound, Reply};
pub use intercept::{Hooks, Interceptor, OnUnexpected, RawResponse, StatusGuard};
pub use request::{Destination, Form, FormData, FormFile, Request};
