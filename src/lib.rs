//! # Typed Dispatch
//!
//! A typed HTTP/1 operation-dispatch framework: a route table, a statically
//! checked middleware pipeline, and a response-writer state machine sit
//! between the raw byte stream and a handler written against plain,
//! operation-specific input/output types.
//!
//! Refer to the included binary example for a complete server implementation.
/// Logic containing parsing the HTTP.
pub mod http;
/// Logic handling runtime logic for a server instance.
pub mod runtime;

/// Input/output codec adapters: typed body/query/path/header decoding and
/// the JSON error-envelope shape.
pub mod codec;
/// The dispatcher: decodes input, invokes the operation, recovers errors.
pub mod dispatch;
/// `WriterError` and `DispatchError`, the two failure taxonomies.
pub mod error;
/// Statically and dynamically typed middleware combinators.
pub mod middleware;
/// `Operation`, the terminal unit of a pipeline.
pub mod operation;
/// Declarative pipeline registration atop the dispatcher.
pub mod pipeline;
/// The route table, path templates, and per-request router context.
pub mod router;
/// The response-writer state machine and its typed one-shot views.
pub mod writer;