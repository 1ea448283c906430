use serde::Serialize;

use crate::error::DispatchError;

/// Projects a typed output value onto additional response headers.
///
/// Most outputs carry none; implement this only when an operation's output
/// type needs to contribute headers beyond `Content-Type` (which the typed
/// writer sets itself).
pub trait TypedOutput {
    /// Returns the `(name, value)` pairs to merge into the response headers
    /// before commit, with precedence over framework defaults except
    /// `Content-Type`.
    fn additional_headers(&self) -> Vec<(String, String)> {
        Vec::new()
    }
}

/// Blanket: any serializable value has no additional headers unless it
/// opts in by implementing `TypedOutput` itself.
impl<T> TypedOutput for T where T: Serialize {}

/// Serializes a typed output value into a body part and its content type.
///
/// `TypedBodyWriter<T>` is generic over this trait (default: [`JsonCodec`])
/// so a non-JSON codec could be substituted without touching the writer.
pub trait BodyCodec<T> {
    /// Serializes `value`, returning the encoded bytes and the MIME type to
    /// advertise via `Content-Type`.
    ///
    /// # Errors
    ///
    /// Returns `DispatchError::InternalError` if serialization fails — per
    /// §4.H, output validation/serialization failure is a 500, not a 400.
    fn encode(value: &T) -> Result<(Vec<u8>, &'static str), DispatchError>;
}

/// The default codec: JSON via `serde_json`.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl<T> BodyCodec<T> for JsonCodec
where
    T: Serialize,
{
    fn encode(value: &T) -> Result<(Vec<u8>, &'static str), DispatchError> {
        let bytes = serde_json::to_vec(value)
            .map_err(|error| DispatchError::InternalError(error.to_string()))?;
        Ok((bytes, "application/json"))
    }
}
