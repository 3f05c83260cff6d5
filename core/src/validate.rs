//! Pre-flight checks on a `Request`.

use crate::error::ValidationError;
use crate::request::Request;

/// Rejects descriptors that can never produce a sensible request.
///
/// A body on DELETE is allowed but logged, since many servers ignore it.
pub fn validate(request: &Request) -> Result<(), ValidationError> {
    if request.target.is_empty() {
        return Err(ValidationError::MissingTarget);
    }
    if request.verb.is_empty() {
        return Err(ValidationError::MissingVerb);
    }

    if request.has_payload() {
        if request.verb.eq_ignore_ascii_case("GET") {
            return Err(ValidationError::BodyNotAllowed {
                verb: request.verb.to_ascii_uppercase(),
            });
        }
        if request.verb.eq_ignore_ascii_case("DELETE") {
            tracing::warn!(url = %request.target, "body may not be honoured for DELETE requests");
        }
    }
    Ok(())
}
