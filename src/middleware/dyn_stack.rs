use async_trait::async_trait;

use crate::error::DispatchError;
use crate::middleware::Stage;

/// The object-safe counterpart to [`Stage`], used wherever a chain is built
/// up at runtime from a `Vec` rather than fixed at the type level.
#[async_trait]
pub trait DynStage<I, W, C>: Send + Sync {
    /// Runs this stage.
    async fn run(&self, input: I, writer: W, context: C) -> Result<(), DispatchError>;
}

/// The object-safe counterpart to [`crate::middleware::PassThroughMiddleware`].
#[async_trait]
pub trait DynPassThroughMiddleware<I, W, C>: Send + Sync {
    /// Runs this middleware's pre-action, invokes `next` (unless
    /// short-circuiting), then runs its post-action.
    async fn handle(
        &self,
        input: I,
        writer: W,
        context: C,
        next: &(dyn DynStage<I, W, C> + Sync),
    ) -> Result<(), DispatchError>;
}

struct DynWithPassThrough<I, W, C> {
    middleware: Box<dyn DynPassThroughMiddleware<I, W, C> + Send + Sync>,
    next: Box<dyn DynStage<I, W, C> + Send + Sync>,
}

#[async_trait]
impl<I, W, C> DynStage<I, W, C> for DynWithPassThrough<I, W, C>
where
    I: Send + 'static,
    W: Send + 'static,
    C: Send + 'static,
{
    async fn run(&self, input: I, writer: W, context: C) -> Result<(), DispatchError> {
        self.middleware
            .handle(input, writer, context, self.next.as_ref())
            .await
    }
}

/// A variable-length, runtime-built stack of pass-through middleware, used
/// for the optional `outer`/`inner` middleware a registration may supply.
///
/// Layers run in the order they were `push`ed (first pushed is outermost).
pub struct Stack<I, W, C> {
    layers: Vec<Box<dyn DynPassThroughMiddleware<I, W, C> + Send + Sync>>,
}

impl<I, W, C> Default for Stack<I, W, C> {
    fn default() -> Self {
        Self { layers: Vec::new() }
    }
}

impl<I, W, C> Stack<I, W, C>
where
    I: Send + 'static,
    W: Send + 'static,
    C: Send + 'static,
{
    /// Creates an empty stack.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a layer to the stack.
    #[must_use]
    pub fn push(mut self, layer: Box<dyn DynPassThroughMiddleware<I, W, C> + Send + Sync>) -> Self {
        self.layers.push(layer);
        self
    }

    /// Returns `true` if no layers have been pushed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Builds the stack around `terminal`, producing a single boxed stage.
    #[must_use]
    pub fn build(
        self,
        terminal: Box<dyn DynStage<I, W, C> + Send + Sync>,
    ) -> Box<dyn DynStage<I, W, C> + Send + Sync> {
        self.layers
            .into_iter()
            .rev()
            .fold(terminal, |next, middleware| {
                Box::new(DynWithPassThrough { middleware, next }) as Box<dyn DynStage<I, W, C> + Send + Sync>
            })
    }
}

/// Bridges a boxed [`DynStage`] back into the statically-typed [`Stage`]
/// trait, so a runtime-built stack can terminate (or originate) a
/// monomorphized chain.
pub struct DynStageAdapter<I, W, C>(pub Box<dyn DynStage<I, W, C> + Send + Sync>);

impl<I, W, C> Stage<I, W, C> for DynStageAdapter<I, W, C>
where
    I: Send,
    W: Send,
    C: Send,
{
    async fn run(&self, input: I, writer: W, context: C) -> Result<(), DispatchError> {
        self.0.run(input, writer, context).await
    }
}
