use serde::Serialize;

use crate::error::DispatchError;

/// The wire shape every error path encodes to: `{"__type": ..., "Reason": ...}`.
#[derive(Serialize, Debug)]
pub struct ErrorEnvelope {
    /// The error tag, e.g. `"ValidationError"` or a domain error's own tag.
    #[serde(rename = "__type")]
    pub error_type: String,
    /// An optional human-readable detail.
    #[serde(rename = "Reason", skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl From<&DispatchError> for ErrorEnvelope {
    fn from(error: &DispatchError) -> Self {
        Self {
            error_type: error.tag().to_string(),
            reason: error.reason(),
        }
    }
}

impl ErrorEnvelope {
    /// Serializes the envelope to JSON bytes.
    ///
    /// # Errors
    ///
    /// Returns an error only if `serde_json` itself fails, which does not
    /// happen for this envelope's shape; kept fallible to match the codec's
    /// general serialization contract.
    pub fn to_json_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }
}
