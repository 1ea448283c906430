use std::fmt;

/// One of the four disjoint carriers a typed input field may be drawn from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Location {
    /// The request body.
    Body,
    /// The query string.
    Query,
    /// Captured path template variables.
    Path,
    /// Request headers.
    Headers,
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Body => "body",
            Self::Query => "query",
            Self::Path => "path",
            Self::Headers => "headers",
        })
    }
}
