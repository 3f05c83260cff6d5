//! Sends an `Outbound` request through a `ureq` agent.

use std::time::Duration;

use ureq::http;
use ureq::{Agent, AsSendBody};

use crate::error::TransportError;
use crate::http::Outbound;
use crate::intercept::RawResponse;

/// Builds an agent that hands 4xx/5xx responses back as data, like any
/// other response, and applies `timeout` to the whole call.
pub fn agent(timeout: Option<Duration>, user_agent: &str) -> Agent {
    Agent::config_builder()
        .http_status_as_error(false)
        .timeout_global(timeout)
        .user_agent(user_agent)
        .build()
        .new_agent()
}

/// One round trip. Header order and duplicates are preserved. A timeout on
/// `outbound` overrides the agent's for this call only.
pub fn send<B: AsSendBody>(agent: &Agent, outbound: Outbound, body: B) -> Result<RawResponse, TransportError> {
    let mut builder = http::Request::builder()
        .method(outbound.method.as_str())
        .uri(outbound.url.as_str());
    for (name, value) in &outbound.headers {
        builder = builder.header(name.as_str(), value.as_str());
    }
    let mut request = builder
        .body(body)
        .map_err(|err| TransportError::Build(err.to_string()))?;
    if let Some(timeout) = outbound.timeout {
        request = agent
            .configure_request(request)
            .timeout_global(Some(timeout))
            .build();
    }

    tracing::debug!(method = %outbound.method, url = %outbound.url, "sending request");
    let response = agent.run(request)?;
    tracing::debug!(status = %response.status(), "response received");
    Ok(response)
}
