//! Picks the request body strategy: a buffered JSON payload or a streamed
//! multipart form.

use crate::error::EncodingError;
use crate::multipart::{ChannelReader, MultipartStream, Producer};
use crate::request::Request;

pub enum Body {
    Empty,
    Json(Vec<u8>),
    Multipart {
        reader: ChannelReader,
        producer: Producer,
    },
}

/// An encoded body plus the content type it forces, if any.
pub struct Encoded {
    pub body: Body,
    pub content_type: Option<String>,
}

/// Takes the payload out of `request` and encodes it.
///
/// The multipart producer starts running immediately; the returned reader
/// must be consumed or dropped before its `Producer` is joined.
pub fn encode(request: &mut Request) -> Result<Encoded, EncodingError> {
    if request.is_multipart() {
        let form = request.form.take().unwrap_or_default();
        if request.body.take().is_some() {
            tracing::warn!(url = %request.target, "json body ignored for multipart request");
        }
        tracing::debug!(
            files = form.files.len(),
            fields = form.data.len(),
            "streaming multipart body"
        );
        let (content_type, reader, producer) = MultipartStream::spawn(form)?.into_parts();
        return Ok(Encoded {
            body: Body::Multipart { reader, producer },
            content_type: Some(content_type),
        });
    }

    let body = match request.body.take() {
        Some(value) => Body::Json(serde_json::to_vec(&value)?),
        None => Body::Empty,
    };
    Ok(Encoded {
        body,
        content_type: None,
    })
}
