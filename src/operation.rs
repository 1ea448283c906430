use std::future::Future;

use crate::http::method::Method;

/// Identifies a registered operation: its name, permitted method, and
/// canonical path template (e.g. `exampleoperation/{token}`).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct OperationId {
    /// The operation's name, used as its `tracing` span label and in test
    /// assertions.
    pub name: &'static str,
    /// The HTTP method this operation is registered for.
    pub method: Method,
    /// The canonical path template, e.g. `exampleoperation/{token}`.
    pub path_template: &'static str,
}

impl OperationId {
    /// Builds a new operation id.
    #[must_use]
    pub const fn new(name: &'static str, method: Method, path_template: &'static str) -> Self {
        Self {
            name,
            method,
            path_template,
        }
    }
}

/// The terminal unit of a pipeline: a function from typed input + context to
/// a typed output or void, that may fail with the operation's own error
/// type.
///
/// Per Open Question (a), there is exactly one dispatch surface here: the
/// trait's `call` is `async fn` directly (no separate sync trait). A plain
/// synchronous closure is still usable as an `Operation` via
/// [`sync_operation`], which wraps it in an adapter that runs it inline and
/// returns an already-ready future — an "immediate-complete wrapper" rather
/// than a second, parallel dispatch path.
pub trait Operation<I, C, O, E>: Send + Sync {
    /// Invokes the operation.
    fn call(&self, input: I, context: C) -> impl Future<Output = Result<O, E>> + Send;
}

impl<I, C, O, E, F, Fut> Operation<I, C, O, E> for F
where
    F: Fn(I, C) -> Fut + Send + Sync,
    Fut: Future<Output = Result<O, E>> + Send,
{
    fn call(&self, input: I, context: C) -> impl Future<Output = Result<O, E>> + Send {
        self(input, context)
    }
}

/// Adapts a synchronous handler (`Fn(I, C) -> Result<O, E>`) into an
/// [`Operation`] by running it inline and wrapping the result in an
/// already-ready future.
///
/// This is the resolution of Open Question (a): rather than keeping a
/// second, sync-flavored dispatch surface alongside the async one, a
/// synchronous handler is simply adapted at the boundary.
pub fn sync_operation<I, C, O, E>(
    handler: impl Fn(I, C) -> Result<O, E> + Send + Sync,
) -> impl Operation<I, C, O, E>
where
    I: Send,
    C: Send,
    O: Send,
    E: Send,
{
    move |input: I, context: C| {
        let result = handler(input, context);
        async move { result }
    }
}

#[cfg(test)]
mod tests {
    use super::{OperationId, Operation, sync_operation};
    use crate::http::method::Method;

    #[tokio::test]
    async fn sync_operation_runs_inline() {
        let op = sync_operation(|input: i32, _ctx: ()| Ok::<_, String>(input + 1));
        let result = op.call(41, ()).await;
        assert_eq!(result, Ok(42));
    }

    #[test]
    fn operation_id_carries_its_template() {
        let id = OperationId::new("exampleoperation", Method::Post, "exampleoperation");
        assert_eq!(id.path_template, "exampleoperation");
        assert_eq!(id.method, Method::Post);
    }
}
