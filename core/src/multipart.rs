//! Streaming multipart/form-data encoder.
//!
//! # Design
//! `write_form` serializes a `Form` into any `Write`. For real requests the
//! writer is a `ChunkWriter` feeding a bounded channel, drained on the other
//! side by a `ChannelReader` the transport pulls from. The producer runs on
//! its own thread, so the encoded body is never materialized in full.
//!
//! The producer owns every file it opens. Handles are dropped as soon as
//! their part is written, and any remaining ones are dropped with the form on
//! early exit. A producer failure is pushed into the stream as an `io::Error`
//! (so the transport stops) and returned through the join handle (so the
//! caller sees the real cause).

use std::fs::File;
use std::io::{self, Read, Write};
use std::thread::{self, JoinHandle};

use crossbeam_channel::{Receiver, Sender};
use uuid::Uuid;

use crate::error::EncodingError;
use crate::request::{Form, FormFile};

const CHUNK_SIZE: usize = 64 * 1024;
const CHANNEL_DEPTH: usize = 4;

type Chunk = io::Result<Vec<u8>>;

pub fn boundary() -> String {
    Uuid::new_v4().simple().to_string()
}

pub fn content_type(boundary: &str) -> String {
    format!("multipart/form-data; boundary={boundary}")
}

/// Writes every file part, then every data field, then the closing
/// delimiter. Stops at the first failure.
pub fn write_form<W: Write>(form: Form, boundary: &str, out: &mut W) -> Result<(), EncodingError> {
    let Form { files, data } = form;

    for file in files {
        write_file(file, boundary, out)?;
    }
    for field in data {
        write!(
            out,
            "--{boundary}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n",
            escape(&field.key)
        )
        .map_err(EncodingError::Write)?;
        out.write_all(field.value.as_bytes()).map_err(EncodingError::Write)?;
        out.write_all(b"\r\n").map_err(EncodingError::Write)?;
    }
    write!(out, "--{boundary}--\r\n").map_err(EncodingError::Write)?;
    Ok(())
}

fn write_file<W: Write>(file: FormFile, boundary: &str, out: &mut W) -> Result<(), EncodingError> {
    let FormFile {
        name,
        key,
        path,
        handle,
    } = file;

    let mut source: Box<dyn Read + Send> = match (handle, path) {
        (Some(handle), _) => handle,
        (None, Some(path)) => match File::open(&path) {
            Ok(file) => Box::new(file),
            Err(source) => return Err(EncodingError::Open { path, source }),
        },
        (None, None) => return Err(EncodingError::MissingSource { key }),
    };

    let mime = mime_guess::from_path(&name).first_or_octet_stream();
    write!(
        out,
        "--{boundary}\r\nContent-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: {mime}\r\n\r\n",
        escape(&key),
        escape(&name)
    )
    .map_err(EncodingError::Write)?;

    let mut buf = [0u8; 8 * 1024];
    loop {
        let n = match source.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(source) => return Err(EncodingError::Read { key, source }),
        };
        out.write_all(&buf[..n]).map_err(EncodingError::Write)?;
    }
    out.write_all(b"\r\n").map_err(EncodingError::Write)?;
    Ok(())
}

fn escape(raw: &str) -> String {
    raw.replace('"', "%22").replace('\r', "%0D").replace('\n', "%0A")
}

/// True when the producer only stopped because the reading side went away.
pub(crate) fn consumer_gone(err: &EncodingError) -> bool {
    matches!(err, EncodingError::Write(source) if source.kind() == io::ErrorKind::BrokenPipe)
}

/// A multipart body being produced on a background thread.
pub struct MultipartStream {
    pub content_type: String,
    pub reader: ChannelReader,
    producer: JoinHandle<Result<(), EncodingError>>,
}

impl MultipartStream {
    /// Starts the producer. The returned reader yields the encoded body.
    pub fn spawn(form: Form) -> Result<Self, EncodingError> {
        let boundary = boundary();
        let content_type = content_type(&boundary);
        let (tx, rx) = crossbeam_channel::bounded::<Chunk>(CHANNEL_DEPTH);

        let producer = thread::Builder::new()
            .name("courier-multipart".to_string())
            .spawn(move || {
                let mut sink = ChunkWriter::new(tx);
                let result = write_form(form, &boundary, &mut sink)
                    .and_then(|()| sink.flush().map_err(EncodingError::Write));
                match &result {
                    Err(err) if consumer_gone(err) => {
                        tracing::debug!(error = %err, "multipart consumer hung up");
                    }
                    Err(err) => {
                        tracing::error!(error = %err, "multipart producer failed");
                        sink.abort(err);
                    }
                    Ok(()) => {}
                }
                result
            })
            .map_err(EncodingError::Write)?;

        Ok(Self {
            content_type,
            reader: ChannelReader::new(rx),
            producer,
        })
    }

    /// Splits the stream so the reader can be handed to the transport while
    /// the caller keeps the handle to join later.
    pub fn into_parts(self) -> (String, ChannelReader, Producer) {
        (self.content_type, self.reader, Producer(self.producer))
    }
}

/// Join handle of a running multipart producer.
pub struct Producer(JoinHandle<Result<(), EncodingError>>);

impl Producer {
    /// Waits for the producer to exit. Must be called after the reader has
    /// been dropped or drained, otherwise it can block on a full channel.
    pub fn finish(self) -> Result<(), EncodingError> {
        self.0.join().unwrap_or_else(|_| {
            Err(EncodingError::Write(io::Error::other(
                "multipart producer panicked",
            )))
        })
    }
}

struct ChunkWriter {
    tx: Sender<Chunk>,
    buf: Vec<u8>,
}

impl ChunkWriter {
    fn new(tx: Sender<Chunk>) -> Self {
        Self {
            tx,
            buf: Vec::with_capacity(CHUNK_SIZE),
        }
    }

    fn send(&mut self) -> io::Result<()> {
        if self.buf.is_empty() {
            return Ok(());
        }
        let chunk = std::mem::replace(&mut self.buf, Vec::with_capacity(CHUNK_SIZE));
        self.tx
            .send(Ok(chunk))
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "multipart consumer hung up"))
    }

    /// Makes the consuming side fail instead of seeing a clean end of body.
    /// Ignores a consumer that is already gone.
    fn abort(&self, err: &EncodingError) {
        let _ = self.tx.send(Err(io::Error::other(err.to_string())));
    }
}

impl Write for ChunkWriter {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.buf.extend_from_slice(data);
        if self.buf.len() >= CHUNK_SIZE {
            self.send()?;
        }
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.send()
    }
}

/// Receiving end of the multipart pipe.
pub struct ChannelReader {
    rx: Receiver<Chunk>,
    chunk: Vec<u8>,
    pos: usize,
}

impl ChannelReader {
    fn new(rx: Receiver<Chunk>) -> Self {
        Self {
            rx,
            chunk: Vec::new(),
            pos: 0,
        }
    }
}

impl Read for ChannelReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        while self.pos >= self.chunk.len() {
            match self.rx.recv() {
                Ok(Ok(chunk)) => {
                    self.chunk = chunk;
                    self.pos = 0;
                }
                Ok(Err(err)) => return Err(err),
                // Sender dropped: the producer is done.
                Err(_) => return Ok(0),
            }
        }
        let n = buf.len().min(self.chunk.len() - self.pos);
        buf[..n].copy_from_slice(&self.chunk[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    const B: &str = "BOUNDARY";

    fn encode(form: Form) -> Result<String, EncodingError> {
        let mut out = Vec::new();
        write_form(form, B, &mut out)?;
        Ok(String::from_utf8(out).unwrap())
    }

    #[test]
    fn boundary_is_32_hex_chars() {
        let b = boundary();
        assert_eq!(b.len(), 32);
        assert!(b.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(b, boundary());
    }

    #[test]
    fn encodes_file_then_field() {
        let form = Form::new()
            .text("title", "holiday")
            .file(FormFile::from_reader("photo", "beach.png", Cursor::new(b"PNGDATA".to_vec())));
        let body = encode(form).unwrap();
        assert_eq!(
            body,
            "--BOUNDARY\r\n\
             Content-Disposition: form-data; name=\"photo\"; filename=\"beach.png\"\r\n\
             Content-Type: image/png\r\n\r\n\
             PNGDATA\r\n\
             --BOUNDARY\r\n\
             Content-Disposition: form-data; name=\"title\"\r\n\r\n\
             holiday\r\n\
             --BOUNDARY--\r\n"
        );
    }

    #[test]
    fn empty_form_is_only_the_closing_delimiter() {
        assert_eq!(encode(Form::new()).unwrap(), "--BOUNDARY--\r\n");
    }

    #[test]
    fn unknown_extension_is_octet_stream() {
        let form = Form::new().file(FormFile::from_reader("f", "blob", Cursor::new(vec![1u8])));
        assert!(encode(form).unwrap().contains("Content-Type: application/octet-stream"));
    }

    #[test]
    fn quotes_in_names_are_escaped() {
        let form = Form::new().text("we\"ird", "v");
        assert!(encode(form).unwrap().contains("name=\"we%22ird\""));
    }

    #[test]
    fn handle_wins_over_path() {
        let mut file = FormFile::from_reader("f", "a.txt", Cursor::new(b"from handle".to_vec()));
        file.path = Some("/definitely/not/here".into());
        let body = encode(Form::new().file(file)).unwrap();
        assert!(body.contains("from handle"));
    }

    #[test]
    fn reads_file_from_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, "on disk").unwrap();
        let body = encode(Form::new().file(FormFile::from_path("doc", "notes.txt", &path))).unwrap();
        assert!(body.contains("filename=\"notes.txt\"\r\nContent-Type: text/plain\r\n\r\non disk\r\n"));
    }

    #[test]
    fn missing_path_is_open_error() {
        let form = Form::new().file(FormFile::from_path("doc", "x.txt", "/definitely/not/here"));
        assert!(matches!(encode(form), Err(EncodingError::Open { .. })));
    }

    #[test]
    fn missing_source_is_reported() {
        let file = FormFile {
            name: "x".to_string(),
            key: "doc".to_string(),
            path: None,
            handle: None,
        };
        let err = encode(Form::new().file(file)).unwrap_err();
        assert!(matches!(err, EncodingError::MissingSource { key } if key == "doc"));
    }

    struct DropFlag(Arc<AtomicBool>, Cursor<Vec<u8>>);

    impl Read for DropFlag {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            self.1.read(buf)
        }
    }

    impl Drop for DropFlag {
        fn drop(&mut self) {
            self.0.store(true, Ordering::SeqCst);
        }
    }

    #[test]
    fn remaining_handles_are_closed_after_failure() {
        let closed = Arc::new(AtomicBool::new(false));
        let form = Form::new()
            .file(FormFile::from_path("a", "a.txt", "/definitely/not/here"))
            .file(FormFile::from_reader(
                "b",
                "b.txt",
                DropFlag(closed.clone(), Cursor::new(b"never sent".to_vec())),
            ));
        assert!(encode(form).is_err());
        assert!(closed.load(Ordering::SeqCst));
    }

    #[test]
    fn stream_delivers_the_same_bytes_as_write_form() {
        let payload = vec![b'x'; CHUNK_SIZE * 3 + 17];
        let form = Form::new()
            .file(FormFile::from_reader("big", "big.bin", Cursor::new(payload.clone())))
            .text("k", "v");

        let (content_type, mut reader, producer) = MultipartStream::spawn(form).unwrap().into_parts();
        let mut body = Vec::new();
        reader.read_to_end(&mut body).unwrap();
        drop(reader);
        producer.finish().unwrap();

        let boundary = content_type.strip_prefix("multipart/form-data; boundary=").unwrap();
        let mut expected = Vec::new();
        let form = Form::new()
            .file(FormFile::from_reader("big", "big.bin", Cursor::new(payload)))
            .text("k", "v");
        write_form(form, boundary, &mut expected).unwrap();
        assert_eq!(body, expected);
    }

    #[test]
    fn stream_surfaces_producer_failure() {
        let form = Form::new().file(FormFile::from_path("doc", "x.txt", "/definitely/not/here"));
        let (_, mut reader, producer) = MultipartStream::spawn(form).unwrap().into_parts();
        let mut body = Vec::new();
        assert!(reader.read_to_end(&mut body).is_err());
        drop(reader);
        assert!(matches!(producer.finish(), Err(EncodingError::Open { .. })));
    }

    #[test]
    fn producer_stops_when_consumer_hangs_up() {
        let closed = Arc::new(AtomicBool::new(false));
        let payload = vec![0u8; CHUNK_SIZE * (CHANNEL_DEPTH + 4)];
        let form = Form::new().file(FormFile::from_reader(
            "big",
            "big.bin",
            DropFlag(closed.clone(), Cursor::new(payload)),
        ));
        let (_, reader, producer) = MultipartStream::spawn(form).unwrap().into_parts();
        drop(reader);
        let err = producer.finish().unwrap_err();
        assert!(matches!(err, EncodingError::Write(_)));
        assert!(consumer_gone(&err));
        assert!(closed.load(Ordering::SeqCst));
    }

    #[test]
    fn input_failures_are_not_a_hang_up() {
        let open = EncodingError::Open {
            path: "/nope".into(),
            source: io::Error::from(io::ErrorKind::NotFound),
        };
        assert!(!consumer_gone(&open));
        assert!(!consumer_gone(&EncodingError::MissingSource { key: "k".to_string() }));
        assert!(!consumer_gone(&EncodingError::Write(io::Error::other("disk full"))));
    }
}
