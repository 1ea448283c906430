//! Maps `(method, path)` to a registered operation's pipeline and builds the
//! per-request [`context::RouterContext`].

/// The per-request router context and request-id generation.
pub mod context;
/// `{name}`-capturing path template matching.
pub mod path_template;
/// The `(method, normalized_template)` route table.
pub mod table;

pub use context::{RequestIdGenerator, RouterContext};
pub use path_template::PathShape;
pub use table::{RegisteredOperation, RouteTable};
