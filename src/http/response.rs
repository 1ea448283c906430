use std::fmt;

use tokio::io::{self, AsyncWrite, AsyncWriteExt};

use crate::http::headers::Headers;

/// A fully materialized HTTP response: status, headers and body.
///
/// This is what a completed [`crate::writer::ResponseWriter`] is rendered
/// into for the transport loop to put on the wire. Nothing upstream of the
/// writer ever constructs one of these directly.
#[derive(Debug)]
pub struct Response {
    /// The status code the response contains
    pub status: StatusCode,
    /// The headers the response contains
    pub headers: Headers,
    /// A byte vector representing the body
    pub body: Vec<u8>,
}

/// The status codes this framework's dispatcher is known to emit, plus an
/// escape hatch for operation-configured custom codes (e.g. `statusOnSuccess
/// = 418`).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StatusCode {
    /// Represents a successful response.
    Ok,
    /// Represents a successful creation.
    Created,
    /// The operation succeeded with no content to return.
    NoContent,
    /// Input validation failed, or the router could not resolve the operation.
    BadRequest,
    /// Represents the request target not being found as a valid endpoint.
    NotFound,
    /// An allow-listed domain error or a configured success status used a
    /// status code this enum has no dedicated variant for.
    Custom(u16),
    /// Represents an internal error of the server.
    InternalServerError,
    /// The client did not finish sending a request in time.
    RequestTimeout,
    /// A downstream dependency failed to respond in time.
    GatewayTimeout,
}

impl StatusCode {
    /// Returns the numeric status code.
    #[must_use]
    pub const fn code(self) -> u16 {
        match self {
            Self::Ok => 200,
            Self::Created => 201,
            Self::NoContent => 204,
            Self::BadRequest => 400,
            Self::NotFound => 404,
            Self::RequestTimeout => 408,
            Self::InternalServerError => 500,
            Self::GatewayTimeout => 504,
            Self::Custom(code) => code,
        }
    }

    /// Returns the reason phrase conventionally associated with the status
    /// code.
    #[must_use]
    pub const fn reason_phrase(self) -> &'static str {
        match self {
            Self::Ok => "OK",
            Self::Created => "Created",
            Self::NoContent => "No Content",
            Self::BadRequest => "Bad Request",
            Self::NotFound => "Not Found",
            Self::RequestTimeout => "Request Timeout",
            Self::InternalServerError => "Internal Server Error",
            Self::GatewayTimeout => "Gateway Timeout",
            Self::Custom(_) => "",
        }
    }

    /// Builds a `StatusCode` from a raw numeric code, falling back to
    /// `Custom` when it doesn't match a known variant.
    #[must_use]
    pub const fn from_code(code: u16) -> Self {
        match code {
            200 => Self::Ok,
            201 => Self::Created,
            204 => Self::NoContent,
            400 => Self::BadRequest,
            404 => Self::NotFound,
            408 => Self::RequestTimeout,
            500 => Self::InternalServerError,
            504 => Self::GatewayTimeout,
            other => Self::Custom(other),
        }
    }
}

/// Implements Display for the Status Code to enable formatting the codes as integer values.
impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Writes the status line to the passed async writer.
///
/// Hardcodes HTTP/1.1 due to the limit of the server to that version.
///
/// # Errors
///
/// This function will return an error if the underlying writer fails to write the entire buffer.
pub async fn write_status_line<W: AsyncWrite + Unpin>(
    writer: &mut W,
    status_code: StatusCode,
) -> io::Result<()> {
    let line = format!(
        "HTTP/1.1 {} {}\r\n",
        status_code.code(),
        status_code.reason_phrase()
    );
    writer.write_all(line.as_bytes()).await
}

/// Writes the headers to the passed async writer.
///
/// Given the headers, iterates through them and prints the keys and values
/// in HTTP valid format, then prints the final linebreak separating headers
/// from the body.
///
/// # Errors
///
/// This function will return an error if the underlying writer fails to write the entire buffer.
pub async fn write_headers<W: AsyncWrite + Unpin>(
    writer: &mut W,
    headers: &Headers,
) -> io::Result<()> {
    for (key, value) in headers.iter() {
        writer
            .write_all(format!("{key}: {value}\r\n").as_bytes())
            .await?;
    }
    writer.write_all(b"\r\n").await
}

/// Writes the full materialized response (status line, headers, body) to
/// the passed async writer.
///
/// # Errors
///
/// This function will return an error if any write to the underlying
/// writer fails.
pub async fn write_response<W: AsyncWrite + Unpin>(
    writer: &mut W,
    response: &Response,
) -> io::Result<()> {
    write_status_line(writer, response.status).await?;
    write_headers(writer, &response.headers).await?;
    writer.write_all(&response.body).await?;
    writer.flush().await
}

#[cfg(test)]
mod tests {
    use super::{Response, StatusCode, write_response};
    use crate::http::headers::Headers;

    #[tokio::test]
    async fn writes_status_headers_and_body() {
        let mut headers = Headers::new();
        headers.insert("content-type", "text/plain");
        let response = Response {
            status: StatusCode::Ok,
            headers,
            body: b"hi".to_vec(),
        };

        let mut buf = Vec::new();
        write_response(&mut buf, &response).await.unwrap();
        let text = String::from_utf8(buf).unwrap();

        assert!(text.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(text.contains("content-type: text/plain\r\n"));
        assert!(text.ends_with("\r\n\r\nhi"));
    }

    #[test]
    fn custom_status_round_trips() {
        let status = StatusCode::from_code(418);
        assert_eq!(status.code(), 418);
        assert!(matches!(status, StatusCode::Custom(418)));
    }
}
