use std::future::Future;
use std::pin::Pin;

use crate::error::DispatchError;
use crate::http::method::Method;
use crate::http::request::Request;
use crate::http::uri::Uri;
use crate::operation::OperationId;
use crate::router::context::RouterContext;
use crate::router::path_template::{match_template, normalize_template};
use crate::writer::ResponseWriter;

type DispatchFuture = Pin<Box<dyn Future<Output = Result<(), DispatchError>> + Send>>;
type DispatchFn = Box<dyn Fn(Request, RouterContext, ResponseWriter) -> DispatchFuture + Send + Sync>;

/// An operation registered with the router: its id plus a type-erased
/// entry point into its (statically typed, per-operation) dispatch chain.
///
/// [`crate::pipeline::PipelineBuilder`] is what actually constructs one of
/// these — it closes over the operation's concrete `B`/`Q`/`Ph`/`Hd`/`O`/`E`
/// types and boxes the resulting future, so the router table itself can
/// stay a plain, homogeneous `Vec`.
pub struct RegisteredOperation {
    /// The operation this entry answers for.
    pub operation_id: OperationId,
    dispatch: DispatchFn,
}

impl std::fmt::Debug for RegisteredOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisteredOperation")
            .field("operation_id", &self.operation_id)
            .finish_non_exhaustive()
    }
}

impl RegisteredOperation {
    /// Wraps a type-erased dispatch closure under `operation_id`.
    pub fn new<F>(operation_id: OperationId, dispatch: F) -> Self
    where
        F: Fn(Request, RouterContext, ResponseWriter) -> DispatchFuture + Send + Sync + 'static,
    {
        Self {
            operation_id,
            dispatch: Box::new(dispatch),
        }
    }

    /// Runs this operation's dispatch chain.
    pub async fn dispatch(
        &self,
        request: Request,
        context: RouterContext,
        writer: ResponseWriter,
    ) -> Result<(), DispatchError> {
        (self.dispatch)(request, context, writer).await
    }
}

/// Maps `(method, normalized_path_template)` to a registered operation.
#[derive(Default, Debug)]
pub struct RouteTable {
    operations: Vec<RegisteredOperation>,
}

impl RouteTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an operation.
    pub fn register(&mut self, operation: RegisteredOperation) {
        self.operations.push(operation);
    }

    /// Finds the operation matching `method` and `request_target`.
    ///
    /// Path comparison is case-insensitive on literal segments; method
    /// comparison is exact. A path that matches under a different method
    /// still reports `InvalidOperation`, same as an unmatched path — §4.G
    /// draws no distinction on the wire between the two cases.
    ///
    /// # Errors
    ///
    /// Returns `DispatchError::InvalidOperation` if no entry matches both
    /// the path and the method.
    pub fn route(
        &self,
        method: Method,
        request_target: &str,
    ) -> Result<(&RegisteredOperation, crate::router::path_template::PathShape), DispatchError> {
        let uri = Uri::parse(request_target);
        for operation in &self.operations {
            let template = normalize_template(operation.operation_id.path_template);
            if let Some(path_shape) = match_template(template, &uri.segments)
                && operation.operation_id.method == method
            {
                return Ok((operation, path_shape));
            }
        }
        Err(DispatchError::InvalidOperation)
    }
}

#[cfg(test)]
mod tests {
    use super::{RegisteredOperation, RouteTable};
    use crate::error::DispatchError;
    use crate::http::method::Method;
    use crate::operation::OperationId;

    fn no_op_operation(id: OperationId) -> RegisteredOperation {
        RegisteredOperation::new(id, move |_request, _context, _writer| {
            Box::pin(async { Ok(()) })
        })
    }

    #[test]
    fn routes_to_matching_method_and_path() {
        let mut table = RouteTable::new();
        let id = OperationId::new("exampleoperation", Method::Post, "exampleoperation");
        table.register(no_op_operation(id));

        let (operation, _shape) = table.route(Method::Post, "/exampleoperation").unwrap();
        assert_eq!(operation.operation_id, id);
    }

    #[test]
    fn unknown_path_is_invalid_operation() {
        let table = RouteTable::new();
        let result = table.route(Method::Post, "/unknownOp");
        assert!(matches!(result, Err(DispatchError::InvalidOperation)));
    }

    #[test]
    fn method_mismatch_is_invalid_operation() {
        let mut table = RouteTable::new();
        let id = OperationId::new("exampleoperation", Method::Post, "exampleoperation");
        table.register(no_op_operation(id));

        let result = table.route(Method::Get, "/exampleoperation");
        assert!(matches!(result, Err(DispatchError::InvalidOperation)));
    }
}
