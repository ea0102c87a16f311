//! Header-delimited JSON message framing.
//!
//! Messages follow the format:
//! ```text
//! Content-Length: 123\r\n
//! \r\n
//! {"jsonrpc":"2.0",...}
//! ```
//! Header lines may end in `\r\n` or `\n`. Only `Content-Length:` carries
//! meaning; other headers are accepted and ignored.

use serde::Serialize;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::trace;

use crate::error::{Error, Result};
use crate::rpc::types::Message;

/// The only header key the framing layer interprets. Matched exactly.
pub const CONTENT_LENGTH_HEADER: &str = "Content-Length:";

/// Payloads larger than this are rejected before allocation.
pub const MAX_CONTENT_LENGTH: usize = 64 * 1024 * 1024;

/// Longest header line accepted, terminator included.
pub const MAX_HEADER_LINE: usize = 8 * 1024;

/// Framing layer over one byte stream.
///
/// Owns both halves of a connection. Reads are strictly sequential and a
/// write returns only after header and payload are flushed.
#[derive(Debug)]
pub struct MessageTransport<R, W> {
    reader: R,
    writer: W,
}

impl<R, W> MessageTransport<R, W>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    /// Create a transport from a buffered reader and a writer.
    #[must_use]
    pub const fn new(reader: R, writer: W) -> Self {
        Self { reader, writer }
    }

    /// Read and classify the next message.
    ///
    /// Returns `Ok(None)` when the stream ends before a header starts, which
    /// is how a disconnecting client looks.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Framing`] for a malformed header or a short payload,
    /// and [`Error::Io`] when the underlying stream fails.
    pub async fn read_message(&mut self) -> Result<Option<Message>> {
        Ok(self
            .read_payload()
            .await?
            .map(|payload| Message::from_slice(&payload)))
    }

    /// Read the next raw payload without decoding it.
    ///
    /// # Errors
    ///
    /// See [`read_message`](Self::read_message).
    pub async fn read_payload(&mut self) -> Result<Option<Vec<u8>>> {
        let Some(length) = self.read_headers().await? else {
            return Ok(None);
        };

        let mut payload = vec![0u8; length];
        self.reader
            .read_exact(&mut payload)
            .await
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::UnexpectedEof => {
                    Error::Framing(format!("stream ended before {length} payload bytes were read"))
                }
                _ => Error::Io(e),
            })?;

        trace!(
            "input <= {}",
            String::from_utf8_lossy(&payload)
        );

        Ok(Some(payload))
    }

    /// Serialize `message` and write it with its header.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails or if writing or flushing
    /// either part fails.
    pub async fn write_message<T: Serialize + ?Sized>(&mut self, message: &T) -> Result<()> {
        let content = serde_json::to_vec(message)?;
        let header = format!("{CONTENT_LENGTH_HEADER} {}\r\n\r\n", content.len());

        trace!("output => {}", String::from_utf8_lossy(&content));

        self.writer.write_all(header.as_bytes()).await?;
        self.writer.write_all(&content).await?;
        self.writer.flush().await?;

        Ok(())
    }

    /// Flush and shut down the write side.
    ///
    /// # Errors
    ///
    /// Returns an error if the shutdown fails.
    pub async fn close(&mut self) -> Result<()> {
        self.writer.shutdown().await?;
        Ok(())
    }

    /// Give back the underlying reader and writer.
    pub fn into_parts(self) -> (R, W) {
        (self.reader, self.writer)
    }

    /// Read header lines up to the blank separator line.
    ///
    /// Returns the declared content length, or `None` on a clean end of stream.
    async fn read_headers(&mut self) -> Result<Option<usize>> {
        let mut content_length = None;
        let mut line = String::new();
        let mut first_line = true;

        loop {
            line.clear();
            let bytes_read = (&mut self.reader)
                .take(MAX_HEADER_LINE as u64)
                .read_line(&mut line)
                .await
                .map_err(|e| match e.kind() {
                    std::io::ErrorKind::InvalidData => {
                        Error::Framing("header is not valid UTF-8".to_string())
                    }
                    _ => Error::Io(e),
                })?;

            if bytes_read == 0 {
                if first_line {
                    return Ok(None);
                }
                return Err(Error::Framing(
                    "stream ended inside message header".to_string(),
                ));
            }
            first_line = false;

            if !line.ends_with('\n') && bytes_read >= MAX_HEADER_LINE {
                return Err(Error::Framing(format!(
                    "header line exceeds {MAX_HEADER_LINE} bytes"
                )));
            }

            let header = line.trim_end_matches(['\r', '\n']);
            if header.is_empty() {
                break;
            }

            trace!("header <= {header:?}");
            let (key, value) = split_header(header)?;
            if key == CONTENT_LENGTH_HEADER {
                content_length = Some(parse_content_length(value)?);
            }
        }

        content_length
            .map(Some)
            .ok_or_else(|| Error::Framing("missing Content-Length header".to_string()))
    }
}

fn split_header(header: &str) -> Result<(&str, &str)> {
    header
        .split_once(char::is_whitespace)
        .map(|(key, value)| (key, value.trim()))
        .filter(|(key, value)| !key.is_empty() && !value.is_empty())
        .ok_or_else(|| Error::Framing(format!("malformed header line: {header:?}")))
}

fn parse_content_length(value: &str) -> Result<usize> {
    let length = value
        .parse::<usize>()
        .map_err(|e| Error::Framing(format!("invalid Content-Length {value:?}: {e}")))?;

    if length == 0 {
        return Err(Error::Framing("Content-Length must be positive".to_string()));
    }
    if length > MAX_CONTENT_LENGTH {
        return Err(Error::Framing(format!(
            "Content-Length {length} exceeds limit of {MAX_CONTENT_LENGTH} bytes"
        )));
    }
    Ok(length)
}
