use std::pin::Pin;
use std::time::Duration;

use async_stream::try_stream;
use bytes::Bytes;
use futures::Stream;
use thiserror::Error;
use tokio::{
    io::{AsyncRead, AsyncReadExt},
    time::timeout,
};

use crate::http::headers::Headers;
use crate::http::method::Method;
use crate::http::request_line::{RequestLine, parse_request_line};

/// The head of a request: method, target, version and headers.
///
/// Split out from the full `Request` so router and middleware layers that
/// only need to inspect the head (not drain the body) don't have to hold
/// the whole request.
#[derive(Debug, Clone)]
pub struct RequestHead {
    /// The parsed request line.
    pub request_line: RequestLine,
    /// The parsed headers.
    pub headers: Headers,
}

impl RequestHead {
    /// Returns the request method.
    #[must_use]
    pub const fn method(&self) -> Method {
        self.request_line.method
    }

    /// Returns the raw request target, e.g. `/foo/bar?a=1`.
    #[must_use]
    pub fn request_target(&self) -> &str {
        &self.request_line.request_target
    }
}

/// Representation of a HTTP request: its head plus a lazy body stream.
///
/// The body is a single-consumer stream of byte chunks: once drained (via
/// [`Request::collect_body`] or by polling [`BodySource`] directly) it
/// cannot be read again, matching §3's "finite, not restartable" body
/// contract.
#[derive(Debug)]
pub struct Request {
    /// The request head.
    pub head: RequestHead,
    /// The lazy request body.
    pub body: BodySource,
}

impl Request {
    /// Drains the body stream into a contiguous buffer, failing if more
    /// than `limit` bytes are produced or the underlying stream errors.
    ///
    /// # Errors
    ///
    /// Returns `HttpError::ContentTooLarge` if the body exceeds `limit`, or
    /// propagates whatever error the underlying stream produced.
    pub async fn collect_body(&mut self, limit: usize) -> Result<Bytes, HttpError> {
        self.body.collect(limit).await
    }
}

/// Represents the different stages of the head parser.
#[derive(Debug, PartialEq, Eq)]
enum ParseState {
    /// The parser was initialized.
    Initialized,
    /// The parser is parsing headers.
    ParseHeaders,
    /// The parser finished parsing the head.
    Done,
}

/// Represents the kind of error that can occur during request parsing or
/// body streaming.
#[derive(Error, Debug)]
pub enum HttpError {
    /// The request contains an unsupported / invalid HTTP version
    #[error("unsupported HTTP version: {0}")]
    UnsupportedVersion(String),

    /// The request contains an unsupported / invalid HTTP method.
    #[error("unsupported HTTP method: {0}")]
    InvalidMethod(String),

    /// The parser is in an invalid state.
    #[error("parser is in an invalid state")]
    InvalidParserState,

    /// The request line does not follow the RFC standard.
    #[error("request line is malformed")]
    MalformedRequestLine,

    /// The header does not follow the RFC standard.
    #[error("header is malformed")]
    MalformedHeader,

    /// A header was syntactically valid but semantically empty where it may not be.
    #[error("header is invalid")]
    InvalidHeaders,

    /// The parser unexpectedly reached an end of file.
    #[error("unexpected end of file")]
    UnexpectedEOF,

    /// The passed body length does not match the header specification.
    #[error("body length does not match header")]
    InvalidBodyLength,

    /// There was a generic IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// There was an error parsing an integer to a string.
    #[error("Parsing error: {0}")]
    ParseError(#[from] std::num::ParseIntError),

    /// An internal invariant was violated.
    /// This is most likely used as a safety net to catch errors that logically should not be able to happen.
    #[error("Internal invariant violated")]
    InternalInvariantViolated,

    /// The request timed out.
    /// This can happen due to the request arriving too slowly (fault of the client).
    #[error("Timed out")]
    Timeout,

    /// The content of the request is too large.
    /// This can happen both due to the total request size exceeding the configured limit, but also the headers themselves exceeding their own limit.
    #[error("Content too large")]
    ContentTooLarge,

    /// The body stream was polled after it had already been fully drained.
    #[error("body has already been consumed")]
    BodyAlreadyConsumed,
}

/// Parses the head (request line + headers) of a request from a reader,
/// returning it alongside a [`BodySource`] for whatever remains.
///
/// The reader may be of any type that implements `AsyncRead`. Unlike the
/// request line / header parsing, which happens eagerly here, the body is
/// never read until the returned `BodySource` is polled.
///
/// # Errors
///
/// Throws a `HttpError` if the head was not valid, or if reading timed out.
pub async fn request_from_reader<R>(mut reader: R) -> Result<Request, HttpError>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    const READ_HEAD_TIMEOUT: Duration = Duration::from_secs(30);
    const MAX_HEAD_SIZE: usize = 32 * 1024;

    let mut buffer: Vec<u8> = Vec::new();
    let mut temp = [0u8; 64];
    let mut headers = Headers::new();
    let mut parse_state = ParseState::Initialized;
    let mut request_line: Option<RequestLine> = None;
    let mut bytes_read = 0;
    let mut total_head_bytes = 0;

    let head = timeout(READ_HEAD_TIMEOUT, async {
        loop {
            let string = String::from_utf8_lossy(&buffer[..bytes_read]).into_owned();
            match parse_state {
                ParseState::Initialized => {
                    let (parsed, size) = parse_request_line(&string)?;
                    if let Some(line) = parsed {
                        if line.http_version != "1.1" {
                            return Err(HttpError::UnsupportedVersion(line.http_version));
                        }
                        request_line = Some(line);
                        parse_state = ParseState::ParseHeaders;
                    }
                    if size > 0 {
                        buffer.drain(0..size);
                        bytes_read -= size;
                        continue;
                    }
                }
                ParseState::ParseHeaders => {
                    let (size, done) = headers.parse_header(string.as_bytes())?;
                    if size > 0 {
                        buffer.drain(0..size);
                        bytes_read -= size;
                    }
                    if done {
                        parse_state = ParseState::Done;
                    }
                    if size > 0 {
                        continue;
                    }
                }
                ParseState::Done => break,
            }

            let read = reader.read(&mut temp[..]).await?;
            if read == 0 {
                return Err(HttpError::UnexpectedEOF);
            }
            buffer.extend_from_slice(&temp[..read]);
            bytes_read += read;
            total_head_bytes += read;
            if total_head_bytes > MAX_HEAD_SIZE {
                return Err(HttpError::ContentTooLarge);
            }
        }

        let request_line = request_line.ok_or(HttpError::InternalInvariantViolated)?;
        Ok(RequestHead {
            request_line,
            headers,
        })
    })
    .await
    .map_err(|_elapsed| HttpError::Timeout)??;

    let content_length: usize = match head.headers.get("content-length") {
        Some(raw) => raw.parse()?,
        None => 0,
    };

    let leftover = Bytes::copy_from_slice(&buffer[..bytes_read]);
    let body = BodySource::new(leftover, content_length, reader);

    Ok(Request { head, body })
}

/// A lazy, single-consumer stream of request body byte chunks.
///
/// The stream is finite (bounded by `Content-Length`) and not restartable:
/// once exhausted, or once [`BodySource::collect`] has been called, polling
/// it again yields `HttpError::BodyAlreadyConsumed`.
pub struct BodySource {
    inner: Pin<Box<dyn Stream<Item = Result<Bytes, HttpError>> + Send>>,
    consumed: bool,
}

impl std::fmt::Debug for BodySource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BodySource")
            .field("consumed", &self.consumed)
            .finish()
    }
}

impl BodySource {
    fn new<R>(leftover: Bytes, content_length: usize, mut reader: R) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        let stream = try_stream! {
            let mut received = leftover.len();
            if received > content_length {
                Err(HttpError::InvalidBodyLength)?;
            }
            if !leftover.is_empty() {
                let take = leftover.len().min(content_length);
                yield leftover.slice(0..take);
            }

            let mut chunk = vec![0u8; 8 * 1024];
            while received < content_length {
                let remaining = content_length - received;
                let want = remaining.min(chunk.len());
                let read = reader.read(&mut chunk[..want]).await?;
                if read == 0 {
                    Err(HttpError::UnexpectedEOF)?;
                }
                received += read;
                yield Bytes::copy_from_slice(&chunk[..read]);
            }
        };

        Self {
            inner: Box::pin(stream),
            consumed: false,
        }
    }

    /// Drains the remaining chunks into a contiguous buffer, failing if the
    /// total exceeds `limit`.
    ///
    /// # Errors
    ///
    /// Returns `HttpError::ContentTooLarge` on overflow, `BodyAlreadyConsumed`
    /// if called twice, or whatever error the stream produced.
    pub async fn collect(&mut self, limit: usize) -> Result<Bytes, HttpError> {
        use futures::StreamExt;

        if self.consumed {
            return Err(HttpError::BodyAlreadyConsumed);
        }
        let mut buffer = Vec::new();
        while let Some(chunk) = self.inner.next().await {
            let chunk = chunk?;
            if buffer.len() + chunk.len() > limit {
                self.consumed = true;
                return Err(HttpError::ContentTooLarge);
            }
            buffer.extend_from_slice(&chunk);
        }
        self.consumed = true;
        Ok(Bytes::from(buffer))
    }
}

#[cfg(test)]
mod tests {
    use std::{
        pin::Pin,
        task::{Context, Poll},
        time::Duration,
    };

    use tokio::io::AsyncWriteExt;
    use tokio::io::{self, AsyncRead, BufReader, ReadBuf};

    use crate::http::method::Method;
    use crate::http::request::{HttpError, request_from_reader};

    pub struct ChunkReader {
        data: Vec<u8>,
        num_bytes_per_read: usize,
        pos: usize,
    }

    impl ChunkReader {
        pub fn new(data: &str, num_bytes_per_read: usize) -> Self {
            Self {
                data: data.as_bytes().to_vec(),
                num_bytes_per_read: num_bytes_per_read.max(1),
                pos: 0,
            }
        }
    }

    impl AsyncRead for ChunkReader {
        fn poll_read(
            mut self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            buf: &mut ReadBuf<'_>,
        ) -> Poll<io::Result<()>> {
            if self.pos >= self.data.len() {
                return Poll::Ready(Ok(()));
            }

            let remaining = self.data.len() - self.pos;
            let max_take = self.num_bytes_per_read.min(remaining).min(buf.remaining());

            if max_take == 0 {
                return Poll::Ready(Ok(()));
            }

            let chunk = self.data[self.pos..self.pos + max_take].to_vec();
            buf.put_slice(&chunk);
            self.pos += max_take;

            Poll::Ready(Ok(()))
        }
    }

    #[tokio::test]
    async fn get_request_line_valid() {
        let input = "GET / HTTP/1.1\r\n\
             Host: localhost:8080\r\n\
             User-Agent: curl/7.81.0\r\n\
             Accept: */*\r\n\
             \r\n";
        let chunk_reader = ChunkReader::new(input, 7);
        let buffered = BufReader::new(chunk_reader);
        let r = request_from_reader(buffered).await.unwrap();

        assert_eq!(r.head.method(), Method::Get);
        assert_eq!(r.head.request_target(), "/");
    }

    #[tokio::test]
    async fn post_request_with_body_valid() {
        let input = "POST /coffee HTTP/1.1\r\n\
             Host: localhost:8080\r\n\
             Content-Length: 17\r\n\
             Content-Type: text/plain\r\n\
             \r\n\
             flavor: dark mode";

        let chunk_reader = ChunkReader::new(input, 32);
        let buffered = BufReader::new(chunk_reader);
        let mut r = request_from_reader(buffered).await.unwrap();

        assert_eq!(r.head.method(), Method::Post);
        let body = r.collect_body(1024).await.unwrap();
        assert_eq!(&body[..], b"flavor: dark mode");
    }

    #[tokio::test]
    async fn body_longer_than_content_length_should_throw_invalidbodylength() {
        let input = "\
            POST /st HTTP/1.1\r\n\
                        Host: localhost:8080\r\n\
                        Content-Length: 5\r\n\
                        \r\n\
                        hello world!";

        let chunk_reader = ChunkReader::new(input, 30);
        let buffered = BufReader::new(chunk_reader);
        let mut r = request_from_reader(buffered).await.unwrap();
        let result = r.collect_body(1024).await;

        assert!(matches!(result, Err(HttpError::InvalidBodyLength)));
    }

    #[tokio::test]
    async fn rejects_when_body_exceeds_limit() {
        let size = 64;
        let input = format!(
            "POST /st HTTP/1.1\r\nContent-Length: {size}\r\n\r\n{}",
            "x".repeat(size)
        );

        let chunk_reader = ChunkReader::new(&input, 32);
        let buffered = BufReader::new(chunk_reader);
        let mut r = request_from_reader(buffered).await.unwrap();
        let result = r.collect_body(8).await;

        assert!(matches!(result, Err(HttpError::ContentTooLarge)));
    }

    #[tokio::test]
    async fn second_collect_fails() {
        let input = "POST /st HTTP/1.1\r\nContent-Length: 5\r\n\r\nhello";
        let chunk_reader = ChunkReader::new(input, 32);
        let buffered = BufReader::new(chunk_reader);
        let mut r = request_from_reader(buffered).await.unwrap();

        r.collect_body(1024).await.unwrap();
        let result = r.collect_body(1024).await;
        assert!(matches!(result, Err(HttpError::BodyAlreadyConsumed)));
    }

    #[tokio::test]
    async fn incomplete_request_should_throw_unexpectedeof() {
        let input = "GET / HTTP/1.1";
        let reader = ChunkReader::new(input, input.len());

        let result = request_from_reader(reader).await;

        assert!(matches!(result, Err(HttpError::UnexpectedEOF)));
    }

    #[tokio::test]
    async fn server_times_out_when_head_read_too_long() {
        tokio::time::pause();

        let (server_read, mut client_write) = io::duplex(4096);
        let buffered = BufReader::new(server_read);

        client_write
            .write_all(b"GET / HTTP/1.1\r\n")
            .await
            .unwrap();
        client_write.flush().await.unwrap();

        tokio::time::advance(Duration::from_secs(31)).await;

        let result = request_from_reader(buffered).await.unwrap_err();
        assert!(matches!(result, HttpError::Timeout));
    }
}
