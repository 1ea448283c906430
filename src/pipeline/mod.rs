//! Declarative pipeline registration: wires an operation's concrete decode
//! types, handler, and allow-list into a type-erased [`RegisteredOperation`]
//! the router can hold alongside every other operation's.
//!
//! Per §4.F, a pipeline is conceptually `outer₁ ∘ … ∘ transform ∘ inner₁ ∘
//! … ∘ terminal`. The statically-typed combinators that model that
//! concatenation for a fixed-at-compile-time chain live in
//! [`crate::middleware`]; the `outer`/`inner` stacks a registration may
//! supply, by contrast, are built at runtime from a `Vec` (registration
//! field 3 and 5 in §6), so this module composes them via the
//! dynamically-dispatched [`crate::middleware::dyn_stack::Stack`] instead.
//! The `transform` stage's body is exactly the dispatcher algorithm in
//! [`crate::dispatch`] — it sits between `outer` and `inner` regardless, and
//! `statusOnSuccess` is the constructor option this module exposes on it.

use std::sync::Arc;

use crate::codec::{BodyCodec, DecodeBody, DecodeHeaders, DecodePath, DecodeQuery, JsonCodec, TypedOutput};
use crate::dispatch::{AllowedErrors, body_terminal, decode_stage, void_terminal};
use crate::http::request::Request;
use crate::http::response::StatusCode;
use crate::middleware::dyn_stack::Stack;
use crate::operation::Operation;
use crate::router::{RegisteredOperation, RouterContext};
use crate::writer::ResponseWriter;

/// An `outer` middleware stack: sees the raw request, the raw writer, and
/// the router context, per §4.F field 3.
pub type OuterStack = Stack<Request, ResponseWriter, RouterContext>;

/// An `inner` middleware stack for an operation whose typed input is `In`:
/// sees the typed input, the shared writer handle, and the router context,
/// per §4.F field 5.
pub type InnerStack<In> = Stack<In, ResponseWriter, RouterContext>;

/// Builds [`RegisteredOperation`] entries for an operation that returns a
/// typed output or void, with a configurable default max body size.
#[derive(Debug, Clone, Copy)]
pub struct PipelineBuilder {
    max_body_size: usize,
}

impl Default for PipelineBuilder {
    fn default() -> Self {
        Self {
            max_body_size: 1024 * 1024,
        }
    }
}

impl PipelineBuilder {
    /// Creates a builder with a 1 MiB default max body size.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Overrides the max body size step 1 of the dispatch algorithm enforces.
    #[must_use]
    pub const fn with_max_body_size(mut self, max_body_size: usize) -> Self {
        self.max_body_size = max_body_size;
        self
    }

    /// Registers an operation whose handler returns a typed output `O`,
    /// serialized via `Codec` (default [`JsonCodec`]).
    #[must_use]
    pub fn register<B, Q, Ph, Hd, In, O, E, Op, Codec>(
        &self,
        operation_id: crate::operation::OperationId,
        operation: Op,
        compose: impl Fn(B, Q, Ph, Hd) -> In + Send + Sync + 'static,
        allowed_errors: AllowedErrors<E>,
        status_on_success: StatusCode,
    ) -> RegisteredOperation
    where
        B: DecodeBody + Send + Sync + 'static,
        Q: DecodeQuery + Send + Sync + 'static,
        Ph: DecodePath + Send + Sync + 'static,
        Hd: DecodeHeaders + Send + Sync + 'static,
        In: Send + 'static,
        O: TypedOutput + Send + 'static,
        Codec: BodyCodec<O> + Send + Sync + 'static,
        Op: Operation<In, RouterContext, O, E> + Send + Sync + 'static,
        E: std::fmt::Display + Send + Sync + 'static,
    {
        self.register_with_middleware::<B, Q, Ph, Hd, In, O, E, Op, Codec>(
            operation_id,
            operation,
            compose,
            allowed_errors,
            status_on_success,
            OuterStack::new(),
            InnerStack::<In>::new(),
        )
    }

    /// Registers an operation whose handler returns a typed output `O`,
    /// additionally supplying the optional `outer` and `inner` middleware
    /// stacks from §4.F's registration fields 3 and 5.
    ///
    /// `outer` sees the raw `(Request, ResponseWriter, RouterContext)`
    /// triple and wraps the whole transform + inner + terminal chain.
    /// `inner` sees the typed input, the shared writer, and the router
    /// context, and wraps only the terminal operation invocation.
    #[must_use]
    pub fn register_with_middleware<B, Q, Ph, Hd, In, O, E, Op, Codec>(
        &self,
        operation_id: crate::operation::OperationId,
        operation: Op,
        compose: impl Fn(B, Q, Ph, Hd) -> In + Send + Sync + 'static,
        allowed_errors: AllowedErrors<E>,
        status_on_success: StatusCode,
        outer: OuterStack,
        inner: InnerStack<In>,
    ) -> RegisteredOperation
    where
        B: DecodeBody + Send + Sync + 'static,
        Q: DecodeQuery + Send + Sync + 'static,
        Ph: DecodePath + Send + Sync + 'static,
        Hd: DecodeHeaders + Send + Sync + 'static,
        In: Send + 'static,
        O: TypedOutput + Send + 'static,
        Codec: BodyCodec<O> + Send + Sync + 'static,
        Op: Operation<In, RouterContext, O, E> + Send + Sync + 'static,
        E: std::fmt::Display + Send + Sync + 'static,
    {
        let max_body_size = self.max_body_size;
        let terminal = body_terminal::<In, O, E, Op, Codec>(
            Arc::new(operation),
            Arc::new(allowed_errors),
            status_on_success,
        );
        let inner_stage = inner.build(terminal);
        let decode = decode_stage(max_body_size, compose, inner_stage);
        let chain: Arc<_> = outer.build(decode).into();

        RegisteredOperation::new(operation_id, move |request, context, writer| {
            let chain = chain.clone();
            Box::pin(async move { chain.run(request, writer, context).await })
        })
    }

    /// Registers a JSON-codec operation; shorthand for [`Self::register`]
    /// with `Codec = JsonCodec`.
    #[must_use]
    pub fn register_json<B, Q, Ph, Hd, In, O, E, Op>(
        &self,
        operation_id: crate::operation::OperationId,
        operation: Op,
        compose: impl Fn(B, Q, Ph, Hd) -> In + Send + Sync + 'static,
        allowed_errors: AllowedErrors<E>,
        status_on_success: StatusCode,
    ) -> RegisteredOperation
    where
        B: DecodeBody + Send + Sync + 'static,
        Q: DecodeQuery + Send + Sync + 'static,
        Ph: DecodePath + Send + Sync + 'static,
        Hd: DecodeHeaders + Send + Sync + 'static,
        In: Send + 'static,
        O: TypedOutput + serde::Serialize + Send + 'static,
        Op: Operation<In, RouterContext, O, E> + Send + Sync + 'static,
        E: std::fmt::Display + Send + Sync + 'static,
    {
        self.register::<B, Q, Ph, Hd, In, O, E, Op, JsonCodec>(
            operation_id,
            operation,
            compose,
            allowed_errors,
            status_on_success,
        )
    }

    /// Registers a JSON-codec operation with the optional `outer`/`inner`
    /// middleware stacks; shorthand for [`Self::register_with_middleware`]
    /// with `Codec = JsonCodec`.
    #[must_use]
    pub fn register_json_with_middleware<B, Q, Ph, Hd, In, O, E, Op>(
        &self,
        operation_id: crate::operation::OperationId,
        operation: Op,
        compose: impl Fn(B, Q, Ph, Hd) -> In + Send + Sync + 'static,
        allowed_errors: AllowedErrors<E>,
        status_on_success: StatusCode,
        outer: OuterStack,
        inner: InnerStack<In>,
    ) -> RegisteredOperation
    where
        B: DecodeBody + Send + Sync + 'static,
        Q: DecodeQuery + Send + Sync + 'static,
        Ph: DecodePath + Send + Sync + 'static,
        Hd: DecodeHeaders + Send + Sync + 'static,
        In: Send + 'static,
        O: TypedOutput + serde::Serialize + Send + 'static,
        Op: Operation<In, RouterContext, O, E> + Send + Sync + 'static,
        E: std::fmt::Display + Send + Sync + 'static,
    {
        self.register_with_middleware::<B, Q, Ph, Hd, In, O, E, Op, JsonCodec>(
            operation_id,
            operation,
            compose,
            allowed_errors,
            status_on_success,
            outer,
            inner,
        )
    }

    /// Registers a void operation: one whose handler returns `Ok(())` on
    /// success, writing `status_on_success` with no body.
    #[must_use]
    pub fn register_void<B, Q, Ph, Hd, In, E, Op>(
        &self,
        operation_id: crate::operation::OperationId,
        operation: Op,
        compose: impl Fn(B, Q, Ph, Hd) -> In + Send + Sync + 'static,
        allowed_errors: AllowedErrors<E>,
        status_on_success: StatusCode,
    ) -> RegisteredOperation
    where
        B: DecodeBody + Send + Sync + 'static,
        Q: DecodeQuery + Send + Sync + 'static,
        Ph: DecodePath + Send + Sync + 'static,
        Hd: DecodeHeaders + Send + Sync + 'static,
        In: Send + 'static,
        Op: Operation<In, RouterContext, (), E> + Send + Sync + 'static,
        E: std::fmt::Display + Send + Sync + 'static,
    {
        self.register_void_with_middleware(
            operation_id,
            operation,
            compose,
            allowed_errors,
            status_on_success,
            OuterStack::new(),
            InnerStack::<In>::new(),
        )
    }

    /// Registers a void operation, additionally supplying the optional
    /// `outer` and `inner` middleware stacks. See
    /// [`Self::register_with_middleware`] for the triples each stack sees.
    #[must_use]
    pub fn register_void_with_middleware<B, Q, Ph, Hd, In, E, Op>(
        &self,
        operation_id: crate::operation::OperationId,
        operation: Op,
        compose: impl Fn(B, Q, Ph, Hd) -> In + Send + Sync + 'static,
        allowed_errors: AllowedErrors<E>,
        status_on_success: StatusCode,
        outer: OuterStack,
        inner: InnerStack<In>,
    ) -> RegisteredOperation
    where
        B: DecodeBody + Send + Sync + 'static,
        Q: DecodeQuery + Send + Sync + 'static,
        Ph: DecodePath + Send + Sync + 'static,
        Hd: DecodeHeaders + Send + Sync + 'static,
        In: Send + 'static,
        Op: Operation<In, RouterContext, (), E> + Send + Sync + 'static,
        E: std::fmt::Display + Send + Sync + 'static,
    {
        let max_body_size = self.max_body_size;
        let terminal = void_terminal(Arc::new(operation), Arc::new(allowed_errors), status_on_success);
        let inner_stage = inner.build(terminal);
        let decode = decode_stage(max_body_size, compose, inner_stage);
        let chain: Arc<_> = outer.build(decode).into();

        RegisteredOperation::new(operation_id, move |request, context, writer| {
            let chain = chain.clone();
            Box::pin(async move { chain.run(request, writer, context).await })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{InnerStack, OuterStack, PipelineBuilder};
    use crate::dispatch::AllowedErrors;
    use crate::error::DispatchError;
    use crate::http::method::Method;
    use crate::http::request::request_from_reader;
    use crate::http::response::StatusCode;
    use crate::middleware::dyn_stack::{DynPassThroughMiddleware, DynStage};
    use crate::operation::{Operation, OperationId};
    use crate::router::{RegisteredOperation, RouterContext};
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};
    use tokio::io::BufReader;

    struct PingOperation;

    impl Operation<(), RouterContext, (), std::convert::Infallible> for PingOperation {
        async fn call(&self, (): (), _context: RouterContext) -> Result<(), std::convert::Infallible> {
            Ok(())
        }
    }

    struct OuterRecorder {
        order: Arc<Mutex<Vec<&'static str>>>,
    }

    #[async_trait]
    impl DynPassThroughMiddleware<crate::http::request::Request, crate::writer::ResponseWriter, RouterContext>
        for OuterRecorder
    {
        async fn handle(
            &self,
            input: crate::http::request::Request,
            writer: crate::writer::ResponseWriter,
            context: RouterContext,
            next: &(dyn DynStage<crate::http::request::Request, crate::writer::ResponseWriter, RouterContext> + Sync),
        ) -> Result<(), DispatchError> {
            self.order.lock().unwrap().push("outer-pre");
            let result = next.run(input, writer, context).await;
            self.order.lock().unwrap().push("outer-post");
            result
        }
    }

    struct InnerRecorder {
        order: Arc<Mutex<Vec<&'static str>>>,
    }

    #[async_trait]
    impl DynPassThroughMiddleware<(), crate::writer::ResponseWriter, RouterContext> for InnerRecorder {
        async fn handle(
            &self,
            input: (),
            writer: crate::writer::ResponseWriter,
            context: RouterContext,
            next: &(dyn DynStage<(), crate::writer::ResponseWriter, RouterContext> + Sync),
        ) -> Result<(), DispatchError> {
            self.order.lock().unwrap().push("inner-pre");
            let result = next.run(input, writer, context).await;
            self.order.lock().unwrap().push("inner-post");
            result
        }
    }

    async fn dispatch_ping(registered: &RegisteredOperation) {
        let raw = "POST /ping HTTP/1.1\r\nHost: x\r\nContent-Length: 0\r\n\r\n";
        let reader = BufReader::new(std::io::Cursor::new(raw.as_bytes().to_vec()));
        let request = request_from_reader(reader).await.expect("request parses");
        let context = RouterContext::new(
            OperationId::new("ping", Method::Post, "ping"),
            crate::router::PathShape::default(),
            Arc::new(request.head.clone()),
            "0".to_owned(),
        );
        let writer = crate::writer::ResponseWriter::new();
        registered.dispatch(request, context, writer).await.unwrap();
    }

    #[tokio::test]
    async fn outer_and_inner_middleware_run_around_the_transform_and_terminal() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let outer = OuterStack::new().push(Box::new(OuterRecorder { order: order.clone() }));
        let inner = InnerStack::<()>::new().push(Box::new(InnerRecorder { order: order.clone() }));

        let builder = PipelineBuilder::new();
        let registered = builder.register_void_with_middleware::<(), (), (), (), (), std::convert::Infallible, _>(
            OperationId::new("ping", Method::Post, "ping"),
            PingOperation,
            |(), (), (), ()| (),
            AllowedErrors::new(),
            StatusCode::Ok,
            outer,
            inner,
        );

        dispatch_ping(&registered).await;

        assert_eq!(
            *order.lock().unwrap(),
            vec!["outer-pre", "inner-pre", "inner-post", "outer-post"]
        );
    }
}
