use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;

use crate::codec::{BodyCodec, ErrorEnvelope, RawParts, TypedOutput, compose_input};
use crate::codec::{DecodeBody, DecodeHeaders, DecodePath, DecodeQuery};
use crate::dispatch::allowed_errors::AllowedErrors;
use crate::error::DispatchError;
use crate::http::request::{HttpError, Request};
use crate::http::response::StatusCode;
use crate::http::uri::Uri;
use crate::middleware::dyn_stack::DynStage;
use crate::operation::Operation;
use crate::router::context::RouterContext;
use crate::writer::{ResponseWriter, TypedBodyWriter, VoidWriter, WriterState};

/// The terminal [`DynStage`] for an operation whose handler returns a typed
/// output: invokes the operation, then writes its result (success or
/// recovered thrown error) onto the shared [`ResponseWriter`].
///
/// This is what an `inner` middleware stack (per §4.F field 5) ultimately
/// wraps — middleware pushed onto that stack see the same typed input and
/// the same writer handle this terminal writes through.
struct BodyTerminal<O, E, Op, Codec> {
    operation: Arc<Op>,
    allowed_errors: Arc<AllowedErrors<E>>,
    status_on_success: StatusCode,
    _marker: PhantomData<fn(O, Codec)>,
}

#[async_trait]
impl<In, O, E, Op, Codec> DynStage<In, ResponseWriter, RouterContext> for BodyTerminal<O, E, Op, Codec>
where
    In: Send + 'static,
    O: TypedOutput + Send + 'static,
    Codec: BodyCodec<O> + Send + Sync + 'static,
    Op: Operation<In, RouterContext, O, E> + Send + Sync + 'static,
    E: std::fmt::Display + Send + Sync + 'static,
{
    async fn run(&self, input: In, writer: ResponseWriter, context: RouterContext) -> Result<(), DispatchError> {
        match self.operation.call(input, context).await {
            Ok(output) => {
                let typed_writer: TypedBodyWriter<O, Codec> =
                    TypedBodyWriter::new(writer.clone(), self.status_on_success);
                match typed_writer.write(output) {
                    Ok(()) => Ok(()),
                    Err(error) => finish_with_error(&writer, &error),
                }
            }
            Err(error) => finish_with_error(&writer, &resolve_domain_error(self.allowed_errors.as_ref(), &error)),
        }
    }
}

/// The terminal [`DynStage`] for a void operation: invokes the operation,
/// then commits and completes the writer with `status_on_success` and no
/// body on success.
struct VoidTerminal<E, Op> {
    operation: Arc<Op>,
    allowed_errors: Arc<AllowedErrors<E>>,
    status_on_success: StatusCode,
}

#[async_trait]
impl<In, E, Op> DynStage<In, ResponseWriter, RouterContext> for VoidTerminal<E, Op>
where
    In: Send + 'static,
    Op: Operation<In, RouterContext, (), E> + Send + Sync + 'static,
    E: std::fmt::Display + Send + Sync + 'static,
{
    async fn run(&self, input: In, writer: ResponseWriter, context: RouterContext) -> Result<(), DispatchError> {
        match self.operation.call(input, context).await {
            Ok(()) => {
                let void_writer = VoidWriter::new(writer.clone(), self.status_on_success);
                match void_writer.write() {
                    Ok(()) => Ok(()),
                    Err(error) => finish_with_error(&writer, &error.into()),
                }
            }
            Err(error) => finish_with_error(&writer, &resolve_domain_error(self.allowed_errors.as_ref(), &error)),
        }
    }
}

/// Builds the boxed terminal stage for a typed-output operation, suitable
/// for wrapping in an `inner` [`crate::middleware::dyn_stack::Stack`].
pub(crate) fn body_terminal<In, O, E, Op, Codec>(
    operation: Arc<Op>,
    allowed_errors: Arc<AllowedErrors<E>>,
    status_on_success: StatusCode,
) -> Box<dyn DynStage<In, ResponseWriter, RouterContext> + Send + Sync>
where
    In: Send + 'static,
    O: TypedOutput + Send + 'static,
    Codec: BodyCodec<O> + Send + Sync + 'static,
    Op: Operation<In, RouterContext, O, E> + Send + Sync + 'static,
    E: std::fmt::Display + Send + Sync + 'static,
{
    Box::new(BodyTerminal::<O, E, Op, Codec> {
        operation,
        allowed_errors,
        status_on_success,
        _marker: PhantomData,
    })
}

/// Builds the boxed terminal stage for a void operation, suitable for
/// wrapping in an `inner` [`crate::middleware::dyn_stack::Stack`].
pub(crate) fn void_terminal<In, E, Op>(
    operation: Arc<Op>,
    allowed_errors: Arc<AllowedErrors<E>>,
    status_on_success: StatusCode,
) -> Box<dyn DynStage<In, ResponseWriter, RouterContext> + Send + Sync>
where
    In: Send + 'static,
    Op: Operation<In, RouterContext, (), E> + Send + Sync + 'static,
    E: std::fmt::Display + Send + Sync + 'static,
{
    Box::new(VoidTerminal {
        operation,
        allowed_errors,
        status_on_success,
    })
}

/// The transform stage (per §4.E/§4.F): collects the request body, decodes
/// and composes the typed input from the four carriers, then hands it —
/// along with the raw writer and context — to `inner`.
///
/// This is the one stage §4.F mandates is "always the statically-typed
/// flavor" conceptually, but since the `inner` middleware stack it precedes
/// is built at runtime from a `Vec`, the transform itself is expressed here
/// as a [`DynStage`] too so the two compose uniformly under an `outer`
/// stack operating on the raw `(Request, ResponseWriter, RouterContext)`
/// triple.
struct DecodeStage<B, Q, Ph, Hd, In, Compose> {
    max_body_size: usize,
    compose: Arc<Compose>,
    inner: Box<dyn DynStage<In, ResponseWriter, RouterContext> + Send + Sync>,
    _marker: PhantomData<fn(B, Q, Ph, Hd)>,
}

#[async_trait]
impl<B, Q, Ph, Hd, In, Compose> DynStage<Request, ResponseWriter, RouterContext>
    for DecodeStage<B, Q, Ph, Hd, In, Compose>
where
    B: DecodeBody + Send + Sync + 'static,
    Q: DecodeQuery + Send + Sync + 'static,
    Ph: DecodePath + Send + Sync + 'static,
    Hd: DecodeHeaders + Send + Sync + 'static,
    In: Send + 'static,
    Compose: Fn(B, Q, Ph, Hd) -> In + Send + Sync + 'static,
{
    async fn run(&self, mut request: Request, writer: ResponseWriter, context: RouterContext) -> Result<(), DispatchError> {
        let body = match collect_body(&mut request, self.max_body_size).await {
            Ok(body) => body,
            Err(error) => return finish_with_error(&writer, &error),
        };

        let typed_input = match decode_typed_input(&context, &body, |b, q, p, h| (self.compose)(b, q, p, h)) {
            Ok(input) => input,
            Err(error) => return finish_with_error(&writer, &error),
        };

        self.inner.run(typed_input, writer, context).await
    }
}

/// Builds the boxed transform/decode stage, suitable for wrapping in an
/// `outer` [`crate::middleware::dyn_stack::Stack`].
pub(crate) fn decode_stage<B, Q, Ph, Hd, In>(
    max_body_size: usize,
    compose: impl Fn(B, Q, Ph, Hd) -> In + Send + Sync + 'static,
    inner: Box<dyn DynStage<In, ResponseWriter, RouterContext> + Send + Sync>,
) -> Box<dyn DynStage<Request, ResponseWriter, RouterContext> + Send + Sync>
where
    B: DecodeBody + Send + Sync + 'static,
    Q: DecodeQuery + Send + Sync + 'static,
    Ph: DecodePath + Send + Sync + 'static,
    Hd: DecodeHeaders + Send + Sync + 'static,
    In: Send + 'static,
{
    Box::new(DecodeStage {
        max_body_size,
        compose: Arc::new(compose),
        inner,
        _marker: PhantomData,
    })
}

async fn collect_body(request: &mut Request, max_body_size: usize) -> Result<Bytes, DispatchError> {
    match request.collect_body(max_body_size).await {
        Ok(bytes) => Ok(bytes),
        Err(HttpError::ContentTooLarge) => Err(DispatchError::BodyLimitExceeded),
        Err(other) => Err(DispatchError::BodyStreamError(other)),
    }
}

fn decode_typed_input<B, Q, Ph, Hd, In>(
    context: &RouterContext,
    body: &[u8],
    compose: impl FnOnce(B, Q, Ph, Hd) -> In,
) -> Result<In, DispatchError>
where
    B: DecodeBody,
    Q: DecodeQuery,
    Ph: DecodePath,
    Hd: DecodeHeaders,
{
    let uri = Uri::parse(context.request_head.request_target());
    let parts = RawParts {
        body,
        query: &uri,
        path: &context.path_shape,
        headers: &context.request_head.headers,
    };
    compose_input(parts, compose)
}

fn resolve_domain_error<E: std::fmt::Display>(
    allowed_errors: &AllowedErrors<E>,
    error: &E,
) -> DispatchError {
    match allowed_errors.resolve(error) {
        Some((tag, status)) => DispatchError::AllowedDomainError {
            tag: tag.to_string(),
            status,
            detail: Some(error.to_string()),
        },
        None => DispatchError::InternalError(error.to_string()),
    }
}

/// Encodes `error` as the JSON error envelope and finalizes `writer` with
/// it, unless the writer has already begun emitting a response (in which
/// case the original emission wins and this is a no-op).
fn finish_with_error(writer: &ResponseWriter, error: &DispatchError) -> Result<(), DispatchError> {
    if matches!(error, DispatchError::WriterLifecycleError(_)) {
        tracing::error!(%error, "writer lifecycle violated; coercing to InternalError");
    }

    if writer.state() != WriterState::NotCommitted {
        return Ok(());
    }

    let envelope = ErrorEnvelope::from(error);
    let bytes = envelope
        .to_json_bytes()
        .unwrap_or_else(|_| br#"{"__type":"InternalError"}"#.to_vec());

    writer.set_status(error.status())?;
    writer.set_content_type("application/json")?;
    writer.set_body_length(bytes.len())?;
    writer.commit()?;
    writer.append_body_part(Bytes::from(bytes))?;
    writer.complete()?;
    Ok(())
}
