use crate::codec::location::Location;
use crate::error::DispatchError;
use crate::http::headers::Headers;
use crate::http::uri::Uri;
use crate::router::path_template::PathShape;

/// Decodes a typed input's body-sourced sub-shape from the collected body
/// buffer.
pub trait DecodeBody: Sized {
    /// Decodes `body`.
    ///
    /// # Errors
    ///
    /// Returns a `DispatchError::ValidationError` (without a location set —
    /// [`compose_input`] tags it) on malformed or semantically invalid
    /// input.
    fn decode_body(body: &[u8]) -> Result<Self, DispatchError>;
}

/// Decodes a typed input's query-sourced sub-shape from the parsed query
/// string.
pub trait DecodeQuery: Sized {
    /// Decodes `query`.
    ///
    /// # Errors
    ///
    /// Returns a `DispatchError::ValidationError` on a missing or malformed
    /// parameter.
    fn decode_query(query: &Uri) -> Result<Self, DispatchError>;
}

/// Decodes a typed input's path-sourced sub-shape from the router's
/// captured path shape.
pub trait DecodePath: Sized {
    /// Decodes `path`.
    ///
    /// # Errors
    ///
    /// Returns a `DispatchError::ValidationError` on a missing capture.
    fn decode_path(path: &PathShape) -> Result<Self, DispatchError>;
}

/// Decodes a typed input's header-sourced sub-shape from the request head.
pub trait DecodeHeaders: Sized {
    /// Decodes `headers`.
    ///
    /// # Errors
    ///
    /// Returns a `DispatchError::ValidationError` on a missing or malformed
    /// header.
    fn decode_headers(headers: &Headers) -> Result<Self, DispatchError>;
}

/// The unit type decodes to itself from every carrier, for operations that
/// don't draw an input sub-shape from a given location.
impl DecodeBody for () {
    fn decode_body(_body: &[u8]) -> Result<Self, DispatchError> {
        Ok(())
    }
}
impl DecodeQuery for () {
    fn decode_query(_query: &Uri) -> Result<Self, DispatchError> {
        Ok(())
    }
}
impl DecodePath for () {
    fn decode_path(_path: &PathShape) -> Result<Self, DispatchError> {
        Ok(())
    }
}
impl DecodeHeaders for () {
    fn decode_headers(_headers: &Headers) -> Result<Self, DispatchError> {
        Ok(())
    }
}

/// The four raw carriers a typed input's sub-shapes are decoded from.
#[derive(Debug, Clone, Copy)]
pub struct RawParts<'a> {
    /// The collected request body.
    pub body: &'a [u8],
    /// The parsed query string.
    pub query: &'a Uri,
    /// The router's captured path shape.
    pub path: &'a PathShape,
    /// The request headers.
    pub headers: &'a Headers,
}

/// Decodes the four input sub-shapes from `parts` and merges them into the
/// final typed input via `compose`.
///
/// Each thunk's failure is tagged with the [`Location`] it was decoding
/// from, per §4.D's "reported ... with the originating location".
///
/// # Errors
///
/// Returns the first sub-shape's decode failure, located.
pub fn compose_input<B, Q, P, H, Out>(
    parts: RawParts<'_>,
    compose: impl FnOnce(B, Q, P, H) -> Out,
) -> Result<Out, DispatchError>
where
    B: DecodeBody,
    Q: DecodeQuery,
    P: DecodePath,
    H: DecodeHeaders,
{
    let body = locate(Location::Body, B::decode_body(parts.body))?;
    let query = locate(Location::Query, Q::decode_query(parts.query))?;
    let path = locate(Location::Path, P::decode_path(parts.path))?;
    let headers = locate(Location::Headers, H::decode_headers(parts.headers))?;
    Ok(compose(body, query, path, headers))
}

fn locate<T>(location: Location, result: Result<T, DispatchError>) -> Result<T, DispatchError> {
    result.map_err(|error| match error {
        DispatchError::ValidationError { location: None, detail } => {
            DispatchError::ValidationError {
                location: Some(location),
                detail,
            }
        }
        other => other,
    })
}

#[cfg(test)]
mod tests {
    use super::{DecodeBody, RawParts, compose_input};
    use crate::codec::Location;
    use crate::error::DispatchError;
    use crate::http::headers::Headers;
    use crate::http::uri::Uri;
    use crate::router::path_template::PathShape;

    struct TheId(String);

    impl DecodeBody for TheId {
        fn decode_body(body: &[u8]) -> Result<Self, DispatchError> {
            #[derive(serde::Deserialize)]
            struct Raw {
                #[serde(rename = "theID")]
                the_id: String,
            }
            let raw: Raw = serde_json::from_slice(body)
                .map_err(|error| DispatchError::validation(Location::Body, error.to_string()))?;
            if raw.the_id.len() != 12 {
                return Err(DispatchError::ValidationError {
                    location: None,
                    detail: "theID must have length 12".to_string(),
                });
            }
            Ok(Self(raw.the_id))
        }
    }

    #[test]
    fn composes_valid_body_input() {
        let body = br#"{"theID":"123456789012"}"#;
        let parts = RawParts {
            body,
            query: &Uri::default(),
            path: &PathShape::default(),
            headers: &Headers::new(),
        };
        let result: Result<String, _> =
            compose_input(parts, |id: TheId, (): (), (): (), (): ()| id.0);
        assert_eq!(result.unwrap(), "123456789012");
    }

    #[test]
    fn tags_validation_failure_with_body_location() {
        let body = br#"{"theID":"1789012"}"#;
        let parts = RawParts {
            body,
            query: &Uri::default(),
            path: &PathShape::default(),
            headers: &Headers::new(),
        };
        let result: Result<String, _> =
            compose_input(parts, |id: TheId, (): (), (): (), (): ()| id.0);
        match result.unwrap_err() {
            DispatchError::ValidationError { location, .. } => {
                assert_eq!(location, Some(Location::Body));
            }
            other => panic!("expected ValidationError, got {other:?}"),
        }
    }
}
