//! The response-writer state machine and the typed views over it.

/// The shared, mutable response-construction handle.
pub mod handle;
/// The `NotCommitted` / `Committed` / `Completed` state machine.
pub mod state;
/// `VoidWriter` and `TypedBodyWriter<T>`, the one-shot typed views.
pub mod typed;

pub use handle::ResponseWriter;
pub use state::WriterState;
pub use typed::{TypedBodyWriter, VoidWriter};
