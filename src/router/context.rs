use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::Span;

use crate::http::request::RequestHead;
use crate::operation::OperationId;
use crate::router::path_template::PathShape;

/// Generates monotonically increasing request identifiers.
///
/// The teacher has no UUID dependency, and none of the other repos in the
/// retrieval pack carry one either, so request ids are formatted from a
/// plain counter rather than pulling in a crate the corpus doesn't use.
#[derive(Debug, Default)]
pub struct RequestIdGenerator(AtomicU64);

impl RequestIdGenerator {
    /// Creates a fresh generator starting at zero.
    #[must_use]
    pub const fn new() -> Self {
        Self(AtomicU64::new(0))
    }

    /// Allocates the next request id, formatted as a short hex string.
    pub fn next(&self) -> String {
        let id = self.0.fetch_add(1, Ordering::Relaxed);
        format!("{id:08x}")
    }
}

/// The context the router constructs for every request before handing it to
/// the registered operation's pipeline.
///
/// Middleware may produce successor contexts of any shape; this is simply
/// the one the router itself hands to the outermost stage.
#[derive(Debug, Clone)]
pub struct RouterContext {
    /// The operation this request was routed to.
    pub operation_id: OperationId,
    /// The path template variables captured for this request.
    pub path_shape: PathShape,
    /// A span-scoped logger carrying the `request_id` field.
    pub logger: Span,
    /// The original request head, kept around for middleware that needs raw
    /// headers/method/target rather than the typed input.
    pub request_head: Arc<RequestHead>,
    /// The request id allocated for this request.
    pub request_id: String,
}

impl RouterContext {
    /// Builds a new router context, creating the per-request tracing span.
    #[must_use]
    pub fn new(
        operation_id: OperationId,
        path_shape: PathShape,
        request_head: Arc<RequestHead>,
        request_id: String,
    ) -> Self {
        let logger = tracing::info_span!(
            "request",
            request_id = %request_id,
            operation = %operation_id.name,
        );
        Self {
            operation_id,
            path_shape,
            logger,
            request_head,
            request_id,
        }
    }
}
