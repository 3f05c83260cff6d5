//! Download mode: stream a response body straight to its destination.

use std::fs::File;
use std::io::{self, Read, Write};

use crate::error::DownloadError;
use crate::request::Destination;

/// Copies `body` into the destination without buffering it and returns the
/// number of bytes written. Partial writes are left in place on failure.
pub fn stream_to<R: Read>(mut body: R, destination: Destination) -> Result<u64, DownloadError> {
    let Destination { location, writer } = destination;

    let mut sink: Box<dyn Write + Send> = match (writer, location) {
        (Some(writer), _) => writer,
        (None, Some(path)) => match File::create(&path) {
            Ok(file) => Box::new(file),
            Err(source) => return Err(DownloadError::Create { path, source }),
        },
        (None, None) => return Err(DownloadError::DestinationMissing),
    };

    let written = io::copy(&mut body, &mut sink).map_err(DownloadError::Write)?;
    sink.flush().map_err(DownloadError::Write)?;
    Ok(written)
}
