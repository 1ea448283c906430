use std::fmt;

use crate::http::request::HttpError;

/// The HTTP methods this framework is willing to route.
///
/// Kept as a closed enum (mirroring the `VALID_METHODS` list the request-line
/// parser already enforces) so route-table keys and `OperationId::method`
/// compare by value instead of re-parsing strings on every dispatch.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Method {
    /// `GET`
    Get,
    /// `POST`
    Post,
    /// `PUT`
    Put,
    /// `PATCH`
    Patch,
    /// `DELETE`
    Delete,
    /// `HEAD`
    Head,
    /// `OPTIONS`
    Options,
}

impl Method {
    /// Parses the method token from a request line.
    ///
    /// # Errors
    ///
    /// Returns `HttpError::InvalidMethod` if the token is not one of the
    /// methods this framework knows how to route.
    pub fn parse(token: &str) -> Result<Self, HttpError> {
        match token {
            "GET" => Ok(Self::Get),
            "POST" => Ok(Self::Post),
            "PUT" => Ok(Self::Put),
            "PATCH" => Ok(Self::Patch),
            "DELETE" => Ok(Self::Delete),
            "HEAD" => Ok(Self::Head),
            "OPTIONS" => Ok(Self::Options),
            other => Err(HttpError::InvalidMethod(other.to_string())),
        }
    }

    /// Returns the canonical wire token for the method.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
            Self::Head => "HEAD",
            Self::Options => "OPTIONS",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
