//! # Typed Dispatch — demo binary
//!
//! This binary crate showcases the registration surface the library in
//! this crate provides: three operations wired onto one `RouteTable`,
//! served with `serve`, one of them additionally wrapped in an `outer`
//! timing middleware and an `inner` logging middleware (§4.F fields 3/5).
//!
//! This is more to showcase usage rather than be a realistic depiction of
//! the server's usage at scale.
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use typed_dispatch::codec::{DecodeBody, DecodeHeaders, DecodePath, DecodeQuery, Location};
use typed_dispatch::dispatch::AllowedErrors;
use typed_dispatch::error::DispatchError;
use typed_dispatch::http::headers::Headers;
use typed_dispatch::http::method::Method;
use typed_dispatch::http::request::Request;
use typed_dispatch::http::response::StatusCode;
use typed_dispatch::http::uri::Uri;
use typed_dispatch::middleware::dyn_stack::{DynPassThroughMiddleware, DynStage};
use typed_dispatch::operation::{Operation, OperationId, sync_operation};
use typed_dispatch::pipeline::{InnerStack, OuterStack, PipelineBuilder};
use typed_dispatch::router::{PathShape, RouteTable, RouterContext};
use typed_dispatch::runtime::server::serve;
use typed_dispatch::writer::ResponseWriter;

#[derive(Debug, Deserialize)]
struct ExampleBody {
    #[serde(rename = "theID")]
    the_id: String,
}

impl DecodeBody for ExampleBody {
    fn decode_body(body: &[u8]) -> Result<Self, DispatchError> {
        let parsed: Self = serde_json::from_slice(body)
            .map_err(|error| DispatchError::validation(Location::Body, error.to_string()))?;
        if parsed.the_id.len() != 12 {
            return Err(DispatchError::validation(Location::Body, "theID must have length 12"));
        }
        Ok(parsed)
    }
}

#[derive(Debug)]
struct ExampleQuery {
    the_parameter: String,
}

impl DecodeQuery for ExampleQuery {
    fn decode_query(query: &Uri) -> Result<Self, DispatchError> {
        let the_parameter = query
            .query_param("theParameter")
            .ok_or_else(|| DispatchError::validation(Location::Query, "missing theParameter"))?
            .to_owned();
        Ok(Self { the_parameter })
    }
}

#[derive(Debug)]
struct ExamplePath {
    token: String,
}

impl DecodePath for ExamplePath {
    fn decode_path(path: &PathShape) -> Result<Self, DispatchError> {
        let token = path
            .get("token")
            .ok_or_else(|| DispatchError::validation(Location::Path, "missing token capture"))?
            .to_owned();
        Ok(Self { token })
    }
}

#[derive(Debug)]
struct ExampleHeaders {
    the_header: String,
}

impl DecodeHeaders for ExampleHeaders {
    fn decode_headers(headers: &Headers) -> Result<Self, DispatchError> {
        let the_header = headers
            .get("theheader")
            .ok_or_else(|| DispatchError::validation(Location::Headers, "missing theHeader"))?
            .to_owned();
        Ok(Self { the_header })
    }
}

#[derive(Debug)]
struct ExampleInput {
    the_id: String,
    the_parameter: String,
    token: String,
    the_header: String,
}

#[derive(Debug, Serialize)]
struct ExampleOutput {
    #[serde(rename = "bodyColor")]
    body_color: String,
    #[serde(rename = "isGreat")]
    is_great: bool,
}

/// A recognizable id is "great"; anything else fails output validation by
/// resolving to a color the operation isn't allowed to return.
fn example_handler(input: ExampleInput, _context: RouterContext) -> Result<ExampleOutput, Infallible> {
    tracing::info!(
        the_parameter = %input.the_parameter,
        token = %input.token,
        the_header = %input.the_header,
        "handling exampleoperation"
    );
    let body_color = if input.the_id == "888888888888" {
        "yellow".to_owned()
    } else {
        "blue".to_owned()
    };
    Ok(ExampleOutput {
        body_color,
        is_great: true,
    })
}

#[derive(Debug, Error)]
enum BadOperationError {
    #[error("{0}")]
    TheError(String),
}

fn bad_operation_handler(_input: (), _context: RouterContext) -> Result<(), BadOperationError> {
    Err(BadOperationError::TheError("Is bad!".to_owned()))
}

struct PingOperation;

impl Operation<(), RouterContext, (), Infallible> for PingOperation {
    async fn call(&self, (): (), _context: RouterContext) -> Result<(), Infallible> {
        Ok(())
    }
}

/// An `outer` middleware (§4.F field 3): sees the raw request, the raw
/// writer, and the router context. Logs how long the whole transform +
/// inner + terminal chain took.
struct TimingMiddleware;

#[async_trait]
impl DynPassThroughMiddleware<Request, ResponseWriter, RouterContext> for TimingMiddleware {
    async fn handle(
        &self,
        input: Request,
        writer: ResponseWriter,
        context: RouterContext,
        next: &(dyn DynStage<Request, ResponseWriter, RouterContext> + Sync),
    ) -> Result<(), DispatchError> {
        let started = Instant::now();
        let result = next.run(input, writer, context).await;
        tracing::info!(elapsed_us = %started.elapsed().as_micros(), "request handled");
        result
    }
}

/// An `inner` middleware (§4.F field 5): sees the typed input, the shared
/// writer handle, and the router context. Logs before and after the
/// terminal operation invocation, demonstrating that post-actions run even
/// though the writer may already be committed by the time control returns.
struct InnerLogMiddleware;

#[async_trait]
impl DynPassThroughMiddleware<ExampleInput, ResponseWriter, RouterContext> for InnerLogMiddleware {
    async fn handle(
        &self,
        input: ExampleInput,
        writer: ResponseWriter,
        context: RouterContext,
        next: &(dyn DynStage<ExampleInput, ResponseWriter, RouterContext> + Sync),
    ) -> Result<(), DispatchError> {
        tracing::info!("entering exampleoperation's terminal");
        let result = next.run(input, writer, context).await;
        tracing::info!("leaving exampleoperation's terminal");
        result
    }
}

fn build_routes() -> RouteTable {
    let mut table = RouteTable::new();
    let pipeline = PipelineBuilder::new();

    let example_id = OperationId::new("exampleoperation", Method::Post, "exampleoperation/{token}");
    table.register(
        pipeline.register_json_with_middleware::<ExampleBody, ExampleQuery, ExamplePath, ExampleHeaders, ExampleInput, ExampleOutput, Infallible, _>(
            example_id,
            sync_operation(example_handler),
            |body: ExampleBody, query: ExampleQuery, path: ExamplePath, headers: ExampleHeaders| ExampleInput {
                the_id: body.the_id,
                the_parameter: query.the_parameter,
                token: path.token,
                the_header: headers.the_header,
            },
            AllowedErrors::new(),
            StatusCode::Ok,
            OuterStack::new().push(Box::new(TimingMiddleware)),
            InnerStack::new().push(Box::new(InnerLogMiddleware)),
        ),
    );

    let bad_id = OperationId::new("badoperation", Method::Post, "badoperation");
    table.register(pipeline.register_void::<(), (), (), (), (), BadOperationError, _>(
        bad_id,
        sync_operation(bad_operation_handler),
        |(), (), (), ()| (),
        AllowedErrors::new().allow("TheError", StatusCode::BadRequest, |error| {
            matches!(error, BadOperationError::TheError(_))
        }),
        StatusCode::Ok,
    ));

    let ping_id = OperationId::new("ping", Method::Post, "ping");
    table.register(pipeline.register_void::<(), (), (), (), (), Infallible, _>(
        ping_id,
        PingOperation,
        |(), (), (), ()| (),
        AllowedErrors::new(),
        StatusCode::Custom(418),
    ));

    table
}

#[tokio::main]
async fn main() -> Result<(), std::io::Error> {
    tracing_subscriber::fmt::init();

    const PORT: u16 = 8080;
    let routes = Arc::new(build_routes());
    let _server = serve(PORT, routes).await?;

    tracing::info!(port = PORT, "listening");
    tokio::task::spawn_blocking(|| {
        let mut buf = String::new();
        std::io::stdin().read_line(&mut buf)
    })
    .await??;
    Ok(())
}
