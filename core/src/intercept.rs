//! Hooks that run immediately before send and immediately after receipt.
//!
//! # Design
//! `before_send` sees the descriptor after URL composition but before body
//! encoding, so anything it changes (body, headers, token) ends up on the
//! wire. `after_receive` sees the response before its body is consumed.
//!
//! Interceptors report problems through `InterceptError`, which the executor
//! returns like any other error. Whether an unexpected status should abort
//! the process is left to the caller: `StatusGuard` takes an explicit
//! `OnUnexpected` policy.

use ureq::http::StatusCode;

use crate::error::InterceptError;
use crate::request::Request;

/// The raw response handed to `after_receive`.
pub type RawResponse = ureq::http::Response<ureq::Body>;

pub trait Interceptor: Send + Sync {
    /// Returns the descriptor the pipeline continues with.
    fn before_send(&self, request: Request) -> Result<Request, InterceptError> {
        Ok(request)
    }

    /// Returns the response the pipeline continues with.
    fn after_receive(&self, response: RawResponse) -> Result<RawResponse, InterceptError> {
        Ok(response)
    }
}

type BeforeSend = dyn Fn(Request) -> Result<Request, InterceptError> + Send + Sync;
type AfterReceive = dyn Fn(RawResponse) -> Result<RawResponse, InterceptError> + Send + Sync;

/// An `Interceptor` built from a pair of optional closures.
#[derive(Default)]
pub struct Hooks {
    before: Option<Box<BeforeSend>>,
    after: Option<Box<AfterReceive>>,
}

impl Hooks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_before_send<F>(mut self, hook: F) -> Self
    where
        F: Fn(Request) -> Result<Request, InterceptError> + Send + Sync + 'static,
    {
        self.before = Some(Box::new(hook));
        self
    }

    pub fn on_after_receive<F>(mut self, hook: F) -> Self
    where
        F: Fn(RawResponse) -> Result<RawResponse, InterceptError> + Send + Sync + 'static,
    {
        self.after = Some(Box::new(hook));
        self
    }
}

impl Interceptor for Hooks {
    fn before_send(&self, request: Request) -> Result<Request, InterceptError> {
        match &self.before {
            Some(hook) => hook(request),
            None => Ok(request),
        }
    }

    fn after_receive(&self, response: RawResponse) -> Result<RawResponse, InterceptError> {
        match &self.after {
            Some(hook) => hook(response),
            None => Ok(response),
        }
    }
}

/// What `StatusGuard` does with a status it was not told to expect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnUnexpected {
    /// Return `InterceptError::UnexpectedStatus` to the caller.
    Fail,
    /// Panic. Only for callers that treat the status as unrecoverable.
    Abort,
}

/// Rejects responses whose status is not in the expected set.
///
/// An empty set accepts any 2xx status.
#[derive(Debug, Clone)]
pub struct StatusGuard {
    expected: Vec<StatusCode>,
    policy: OnUnexpected,
}

impl StatusGuard {
    pub fn success(policy: OnUnexpected) -> Self {
        Self {
            expected: Vec::new(),
            policy,
        }
    }

    pub fn expect(expected: impl IntoIterator<Item = StatusCode>, policy: OnUnexpected) -> Self {
        Self {
            expected: expected.into_iter().collect(),
            policy,
        }
    }

    fn accepts(&self, status: StatusCode) -> bool {
        if self.expected.is_empty() {
            status.is_success()
        } else {
            self.expected.contains(&status)
        }
    }

    pub fn check(&self, status: StatusCode) -> Result<(), InterceptError> {
        if self.accepts(status) {
            return Ok(());
        }
        match self.policy {
            OnUnexpected::Fail => Err(InterceptError::UnexpectedStatus(status)),
            OnUnexpected::Abort => panic!("unexpected response status {status}"),
        }
    }
}

impl Interceptor for StatusGuard {
    fn after_receive(&self, response: RawResponse) -> Result<RawResponse, InterceptError> {
        self.check(response.status())?;
        Ok(response)
    }
}
