//! Codec adapters: input composition from the four request carriers, output
//! emission onto a typed writer, and the error-envelope JSON shape.

/// The JSON error envelope `{"__type", "Reason"}`.
pub mod error_envelope;
/// Input composition: four location-decoding thunks merged via `compose`.
pub mod input;
/// One of the four disjoint carriers an input field may be drawn from.
pub mod location;
/// Output emission: body serialization and the additional-headers
/// projection.
pub mod output;

pub use error_envelope::ErrorEnvelope;
pub use input::{DecodeBody, DecodeHeaders, DecodePath, DecodeQuery, RawParts, compose_input};
pub use location::Location;
pub use output::{BodyCodec, JsonCodec, TypedOutput};
