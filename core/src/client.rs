//! The request executor.
//!
//! # Design
//! `Executor` holds only configuration and a shared `ureq::Agent`; it keeps
//! no per-call state, so one value can serve any number of threads. A call
//! runs the stages in a fixed order:
//!
//! validate -> compose URL -> `before_send` -> encode body -> send ->
//! `after_receive` -> download or decode.
//!
//! Each call blocks until the response is routed. The only extra thread is
//! the multipart producer, joined before the call returns.

use std::fmt;
use std::time::Duration;

use serde::de::DeserializeOwned;
use ureq::{Agent, SendBody};

use crate::decode::{self, Payload};
use crate::download;
use crate::encode::{self, Body};
use crate::error::{DecodeError, DownloadError, EncodingError, Error};
use crate::http::{self, Outbound, Reply};
use crate::intercept::RawResponse;
use crate::multipart;
use crate::request::Request;
use crate::transport;
use crate::validate::validate;

const DEFAULT_BODY_LIMIT: u64 = 10 * 1024 * 1024;
const DEFAULT_USER_AGENT: &str = concat!("courier/", env!("CARGO_PKG_VERSION"));

/// Settings shared by every call made through one `Executor`.
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// Prefixed to targets that are not absolute URLs.
    pub base_url: Option<String>,
    /// Applied when a request does not set its own timeout. `None` leaves
    /// the agent without a global timeout.
    pub timeout: Option<Duration>,
    /// Sent as `User-Agent` unless the request sets its own. Empty sends none.
    pub user_agent: String,
    /// Largest response body read into memory in decode mode.
    pub body_limit: u64,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout: None,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            body_limit: DEFAULT_BODY_LIMIT,
        }
    }
}

/// Blocking HTTP executor.
///
/// Turns a `Request` into one HTTP round trip and hands back the routed
/// response. Cloning is cheap and clones share the connection pool.
#[derive(Clone)]
pub struct Executor {
    config: ExecutorConfig,
    agent: Agent,
}

impl fmt::Debug for Executor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Executor").field("config", &self.config).finish_non_exhaustive()
    }
}

impl Default for Executor {
    fn default() -> Self {
        Self::new(ExecutorConfig::default())
    }
}

impl Executor {
    /// Create an executor. The agent is built once here and reused by every
    /// call.
    pub fn new(config: ExecutorConfig) -> Self {
        let agent = transport::agent(config.timeout, &config.user_agent);
        Self { config, agent }
    }

    /// An executor that resolves relative targets against `base_url`.
    pub fn with_base_url(base_url: &str) -> Self {
        Self::new(ExecutorConfig {
            base_url: Some(base_url.trim_end_matches('/').to_string()),
            ..ExecutorConfig::default()
        })
    }

    /// The configuration this executor was built with.
    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    /// Runs `request` and decodes the body without a demanded shape: JSON
    /// when it parses, text otherwise.
    pub fn execute(&self, request: Request) -> Result<Reply<Payload>, Error> {
        self.run(request, |content_type, bytes| Ok(decode::payload(content_type, bytes)))
    }

    /// Runs `request` and decodes the body into `T`. Decode failures are
    /// returned as `Error::Decode` with the raw body attached.
    pub fn execute_as<T: DeserializeOwned>(&self, request: Request) -> Result<Reply<T>, Error> {
        self.run(request, decode::shaped::<T>)
    }

    fn run<D, F>(&self, request: Request, decode: F) -> Result<Reply<D>, Error>
    where
        F: FnOnce(&str, &[u8]) -> Result<D, DecodeError>,
    {
        validate(&request)?;

        let mut request = request.composed();
        tracing::debug!(verb = %request.verb, url = %request.target, "composed request");

        let interceptor = request.interceptor.take();
        if let Some(interceptor) = &interceptor {
            request = interceptor.before_send(request)?.composed();
        }

        let destination = request.download.take();
        if destination.as_ref().is_some_and(|d| d.is_empty()) {
            return Err(DownloadError::DestinationMissing.into());
        }

        let mut response = self.dispatch(request)?;
        if let Some(interceptor) = &interceptor {
            response = interceptor.after_receive(response)?;
        }

        let (head, mut body) = response.into_parts();
        if let Some(destination) = destination {
            let written = download::stream_to(body.into_reader(), destination)?;
            tracing::debug!(bytes = written, "download complete");
            return Ok(Reply::downloaded(head, written));
        }

        let bytes = body
            .with_config()
            .limit(self.config.body_limit)
            .read_to_vec()
            .map_err(Error::Read)?;
        let content_type = head
            .headers
            .get(ureq::http::header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default()
            .to_string();

        match decode(&content_type, &bytes) {
            Ok(decoded) => Ok(Reply::decoded(head, bytes, decoded)),
            Err(source) => Err(Error::Decode {
                source,
                status: head.status,
                body: bytes,
            }),
        }
    }

    /// Encodes the body and performs the round trip.
    fn dispatch(&self, mut request: Request) -> Result<RawResponse, Error> {
        let encoded = encode::encode(&mut request)?;
        let outbound = Outbound {
            method: request.verb.to_ascii_uppercase(),
            url: http::resolve(self.config.base_url.as_deref(), &request.target),
            headers: Outbound::headers(
                request.headers.take(),
                request.bearer_token.as_deref(),
                encoded.content_type.as_deref(),
            ),
            timeout: (!request.timeout.is_zero()).then_some(request.timeout),
        };

        match encoded.body {
            Body::Empty => Ok(transport::send(&self.agent, outbound, ())?),
            Body::Json(bytes) => Ok(transport::send(&self.agent, outbound, bytes)?),
            Body::Multipart { reader, producer } => {
                let sent = transport::send(&self.agent, outbound, SendBody::from_owned_reader(reader));
                // The reader went down with the request, so the producer
                // cannot be blocked on a full channel any more.
                match (sent, producer.finish()) {
                    (
                        _,
                        Err(
                            err @ (EncodingError::Open { .. }
                            | EncodingError::Read { .. }
                            | EncodingError::MissingSource { .. }),
                        ),
                    ) => Err(err.into()),
                    (Err(err), _) => Err(err.into()),
                    (Ok(response), Err(err)) if multipart::consumer_gone(&err) => {
                        tracing::debug!(error = %err, "server answered before the multipart body was consumed");
                        Ok(response)
                    }
                    (Ok(_), Err(err)) => Err(err.into()),
                    (Ok(response), Ok(())) => Ok(response),
                }
            }
        }
    }
}
