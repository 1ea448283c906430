//! The middleware abstraction: pass-through middleware (same input/writer/
//! context shape before and after) and transforming middleware (different
//! shape after), plus the combinators that stitch them into one
//! monomorphized chain.
//!
//! Everything in this module is the **statically typed** flavor: the whole
//! outer → transform → inner → terminal chain is one generic type, so the
//! compiler rejects a pipeline whose adjacent stages disagree on their
//! `(Input, Writer, Context)` triple. The *dynamically dispatched* flavor,
//! used only for the optional outer/inner middleware stacks a registration
//! may supply as a runtime-built list, lives in [`dyn_stack`].

/// Object-safe, `async-trait`-boxed middleware for the optional outer/inner
/// stacks built up from a `Vec` at registration time.
pub mod dyn_stack;

use std::future::Future;

use crate::error::DispatchError;

/// A single link in the pipeline: given an input/writer/context triple,
/// drives the request to completion (or propagates a `DispatchError`).
///
/// Every concrete pipeline — a chain of `WithPassThrough`/`WithTransform`
/// wrappers ending in a terminal stage — implements this for its own
/// `(Input, Writer, Context)` triple.
pub trait Stage<I, W, C>: Send + Sync {
    /// Runs this stage (and, transitively, everything nested inside it).
    fn run(&self, input: I, writer: W, context: C) -> impl Future<Output = Result<(), DispatchError>> + Send;
}

/// Middleware whose `next` stage shares the *same* input/writer/context
/// triple. May perform work before and/or after invoking `next`; must
/// invoke `next` exactly once on the success path, or intentionally
/// short-circuit by writing a response and returning without calling it.
pub trait PassThroughMiddleware<I, W, C>: Send + Sync {
    /// Runs this middleware's pre-action, invokes `next` (unless
    /// short-circuiting), then runs its post-action.
    fn handle<N>(
        &self,
        input: I,
        writer: W,
        context: C,
        next: &N,
    ) -> impl Future<Output = Result<(), DispatchError>> + Send
    where
        N: Stage<I, W, C> + Sync;
}

/// Middleware whose `next` stage accepts a *different* input/writer/context
/// triple. Responsible for producing the successor triple — typically by
/// parsing the raw request into a typed input, wrapping the writer, or
/// reshaping the context.
pub trait TransformMiddleware<I1, W1, C1, I2, W2, C2>: Send + Sync {
    /// Runs this middleware's pre-action, builds the successor triple,
    /// invokes `next`, then runs its post-action.
    fn handle<N>(
        &self,
        input: I1,
        writer: W1,
        context: C1,
        next: &N,
    ) -> impl Future<Output = Result<(), DispatchError>> + Send
    where
        N: Stage<I2, W2, C2> + Sync;
}

/// Wraps a [`PassThroughMiddleware`] around a `next` stage, itself becoming
/// a `Stage` over the same triple.
#[derive(Debug, Clone, Copy)]
pub struct WithPassThrough<M, N> {
    middleware: M,
    next: N,
}

impl<M, N> WithPassThrough<M, N> {
    /// Composes `middleware` in front of `next`.
    pub const fn new(middleware: M, next: N) -> Self {
        Self { middleware, next }
    }
}

impl<I, W, C, M, N> Stage<I, W, C> for WithPassThrough<M, N>
where
    I: Send,
    W: Send,
    C: Send,
    M: PassThroughMiddleware<I, W, C>,
    N: Stage<I, W, C> + Sync,
{
    async fn run(&self, input: I, writer: W, context: C) -> Result<(), DispatchError> {
        self.middleware.handle(input, writer, context, &self.next).await
    }
}

/// Wraps a [`TransformMiddleware`] around a `next` stage of a different
/// triple, itself becoming a `Stage` over the *outer* triple.
#[derive(Debug, Clone, Copy)]
pub struct WithTransform<M, N> {
    middleware: M,
    next: N,
}

impl<M, N> WithTransform<M, N> {
    /// Composes `middleware` in front of `next`.
    pub const fn new(middleware: M, next: N) -> Self {
        Self { middleware, next }
    }
}

impl<I1, W1, C1, I2, W2, C2, M, N> Stage<I1, W1, C1> for WithTransform<M, N>
where
    I1: Send,
    W1: Send,
    C1: Send,
    M: TransformMiddleware<I1, W1, C1, I2, W2, C2>,
    N: Stage<I2, W2, C2> + Sync,
{
    async fn run(&self, input: I1, writer: W1, context: C1) -> Result<(), DispatchError> {
        self.middleware.handle(input, writer, context, &self.next).await
    }
}

#[cfg(test)]
mod tests {
    use super::{PassThroughMiddleware, Stage, WithPassThrough};
    use crate::error::DispatchError;
    use std::sync::Arc;

    struct Terminal;
    impl Stage<u32, (), ()> for Terminal {
        async fn run(&self, _input: u32, (): (), (): ()) -> Result<(), DispatchError> {
            Ok(())
        }
    }

    struct OrderRecorder {
        order: Arc<std::sync::Mutex<Vec<&'static str>>>,
        label: &'static str,
    }

    impl PassThroughMiddleware<u32, (), ()> for OrderRecorder {
        async fn handle<N>(
            &self,
            input: u32,
            writer: (),
            context: (),
            next: &N,
        ) -> Result<(), DispatchError>
        where
            N: Stage<u32, (), ()> + Sync,
        {
            self.order.lock().unwrap().push(self.label);
            let result = next.run(input, writer, context).await;
            self.order.lock().unwrap().push(self.label);
            result
        }
    }

    #[tokio::test]
    async fn post_actions_run_in_reverse_of_pre_actions() {
        let order = Arc::new(std::sync::Mutex::new(Vec::new()));
        let inner = WithPassThrough::new(
            OrderRecorder {
                order: order.clone(),
                label: "inner",
            },
            Terminal,
        );
        let outer = WithPassThrough::new(
            OrderRecorder {
                order: order.clone(),
                label: "outer",
            },
            inner,
        );

        outer.run(1, (), ()).await.unwrap();

        assert_eq!(*order.lock().unwrap(), vec!["outer", "inner", "inner", "outer"]);
    }
}
