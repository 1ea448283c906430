use std::{
    io::Error,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};
use tokio::{
    io::{ReadHalf, WriteHalf, split},
    net::{TcpListener, TcpStream},
    time::{sleep, timeout},
};

use crate::http::request::{HttpError, request_from_reader};
use crate::http::response::{Response, StatusCode, write_response};
use crate::router::{RequestIdGenerator, RouteTable, RouterContext};
use crate::writer::ResponseWriter;

/// A struct representing an instance of a `HttpServer`, containing the state of the server.
#[derive(Debug)]
pub struct Server {
    server_state: Arc<ServerState>,
}

/// A struct representing the state of a server: its listener, whether it has
/// been closed, the route table it dispatches against, and the generator
/// used to stamp each accepted request with an id.
#[derive(Debug)]
struct ServerState {
    listener: TcpListener,
    closed: AtomicBool,
    routes: Arc<RouteTable>,
    request_ids: RequestIdGenerator,
}

impl Server {
    /// Sets the closed state of the server it's called on.
    pub fn close(&self) {
        self.server_state.closed.store(true, Ordering::SeqCst);
    }
}

impl ServerState {
    /// Called on a `ServerState`, listening for connections.
    pub async fn listen(self: Arc<Self>) {
        loop {
            if self.closed.load(Ordering::SeqCst) {
                return;
            }
            match self.listener.accept().await {
                Ok((stream, _)) => {
                    let state = Arc::clone(&self);
                    tokio::spawn(async move {
                        if let Err(error) = handle(stream, &state).await {
                            tracing::warn!(%error, "connection ended with an error");
                        }
                    });
                }
                Err(error) => {
                    if self.closed.load(Ordering::SeqCst) {
                        break;
                    }
                    tracing::error!(%error, "failed to accept connection");
                    sleep(Duration::from_millis(50)).await;
                }
            }
        }
    }
}

/// Serves the operations registered in `routes` on the given port.
///
/// # Errors
///
/// Throws an Error if binding the tcp listener fails.
pub async fn serve(port: u16, routes: Arc<RouteTable>) -> Result<Server, Error> {
    let listener = TcpListener::bind(("127.0.0.1", port)).await?;
    let state = Arc::new(ServerState {
        listener,
        routes,
        closed: AtomicBool::new(false),
        request_ids: RequestIdGenerator::new(),
    });
    let server = Server {
        server_state: Arc::clone(&state),
    };
    tokio::spawn(async move {
        state.listen().await;
    });
    Ok(server)
}

/// Handles one request/response cycle for an accepted connection.
///
/// The connection's read half is moved into the lazily-streamed request
/// body for the duration of the request, so it cannot be handed back for a
/// second request on the same socket: one connection serves exactly one
/// request.
///
/// # Errors
///
/// Throws an `HttpError` if the parsing process fails or the response
/// could not be written.
async fn handle(stream: TcpStream, state: &ServerState) -> Result<(), HttpError> {
    const CONNECTION_TIMEOUT: Duration = Duration::from_secs(120);

    let (read_half, mut write_half) = split(stream);
    match timeout(CONNECTION_TIMEOUT, process_request(read_half, &mut write_half, state)).await {
        Ok(result) => result,
        Err(_elapsed) => {
            let response = plain_text_response(StatusCode::GatewayTimeout, "Gateway Timed Out");
            write_response(&mut write_half, &response).await
        }
    }
}

/// Parses the request off `read_half`, routes it through `state.routes`,
/// and writes the dispatcher's finalized response to `write_half`.
///
/// # Errors
///
/// Throws an `HttpError` if the head could not be parsed (the caller
/// writes its own error response for the recognized failure modes) or if
/// writing the response failed.
async fn process_request(
    read_half: ReadHalf<TcpStream>,
    write_half: &mut WriteHalf<TcpStream>,
    state: &ServerState,
) -> Result<(), HttpError> {
    const HEAD_READ_TIMEOUT: Duration = Duration::from_secs(15);

    let request = match timeout(HEAD_READ_TIMEOUT, request_from_reader(read_half)).await {
        Ok(Ok(request)) => request,
        Ok(Err(HttpError::UnexpectedEOF)) => return Ok(()),
        Ok(Err(HttpError::Timeout)) => {
            let response = plain_text_response(StatusCode::RequestTimeout, "Request Timed Out");
            return write_response(write_half, &response).await;
        }
        Ok(Err(_)) => {
            let response = plain_text_response(StatusCode::BadRequest, "Bad Request");
            return write_response(write_half, &response).await;
        }
        Err(_elapsed) => {
            let response = plain_text_response(StatusCode::RequestTimeout, "Request Timed Out");
            return write_response(write_half, &response).await;
        }
    };

    let request_id = state.request_ids.next();
    let method = request.head.method();
    let target = request.head.request_target().to_owned();

    let writer = ResponseWriter::new();
    match state.routes.route(method, &target) {
        Ok((operation, path_shape)) => {
            let request_head = Arc::new(request.head.clone());
            let context =
                RouterContext::new(operation.operation_id, path_shape, request_head, request_id);
            let _span = context.logger.clone().entered();
            if let Err(error) = operation.dispatch(request, context, writer.clone()).await {
                tracing::error!(%error, "dispatch returned an error after writing a response");
            }
        }
        Err(_invalid_operation) => {
            let envelope = crate::codec::ErrorEnvelope::from(&crate::error::DispatchError::InvalidOperation);
            let bytes = envelope.to_json_bytes().unwrap_or_default();
            let _ = writer.set_status(StatusCode::BadRequest);
            let _ = writer.set_content_type("application/json");
            let _ = writer.commit();
            let _ = writer.append_body_part(bytes::Bytes::from(bytes));
            let _ = writer.complete();
        }
    }

    let response = writer.render();
    write_response(write_half, &response).await
}

fn plain_text_response(status: StatusCode, message: &str) -> Response {
    let mut headers = crate::http::headers::Headers::new();
    headers.insert("content-type", "text/plain");
    Response {
        status,
        headers,
        body: message.as_bytes().to_vec(),
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, time::Duration};

    use reqwest::Client;
    use tokio::time::timeout;

    use crate::dispatch::AllowedErrors;
    use crate::http::method::Method;
    use crate::http::response::StatusCode;
    use crate::operation::{Operation, OperationId};
    use crate::pipeline::PipelineBuilder;
    use crate::router::{RouteTable, RouterContext};
    use crate::runtime::server::serve;

    #[derive(Debug, serde::Serialize)]
    struct Greeting {
        message: String,
    }

    struct GreetOperation;

    impl Operation<(), RouterContext, Greeting, std::convert::Infallible> for GreetOperation {
        async fn call(
            &self,
            _input: (),
            _context: RouterContext,
        ) -> Result<Greeting, std::convert::Infallible> {
            Ok(Greeting {
                message: "hello".to_owned(),
            })
        }
    }

    fn test_routes(port_label: &'static str) -> Arc<RouteTable> {
        let mut table = RouteTable::new();
        let id = OperationId::new(port_label, Method::Get, "test");
        let builder = PipelineBuilder::new();
        table.register(builder.register_json::<(), (), (), (), (), Greeting, std::convert::Infallible, _>(
            id,
            GreetOperation,
            |(), (), (), ()| (),
            AllowedErrors::new(),
            StatusCode::Ok,
        ));
        Arc::new(table)
    }

    #[tokio::test]
    async fn server_can_establish_connection_and_dispatches() {
        let routes = test_routes("server_can_establish_connection_and_dispatches");
        let server = serve(8090, routes).await.expect("failed to start server");

        let client = Client::builder()
            .timeout(Duration::from_secs(5))
            .build()
            .unwrap();
        let url = "http://127.0.0.1:8090/test".to_owned();

        let task = tokio::spawn(async move {
            let resp = client.get(&url).send().await.expect("request failed");
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            (status, text)
        });

        let (status, body) = timeout(Duration::from_secs(10), task)
            .await
            .expect("test timed out")
            .unwrap();
        assert!(status.is_success());
        assert!(body.contains("hello"));
        server.close();
    }

    #[tokio::test]
    async fn unknown_path_yields_bad_request() {
        let routes = test_routes("unknown_path_yields_bad_request");
        let server = serve(8091, routes).await.expect("failed to start server");

        let client = Client::builder()
            .timeout(Duration::from_secs(5))
            .build()
            .unwrap();
        let url = "http://127.0.0.1:8091/nope".to_owned();

        let task = tokio::spawn(async move {
            let resp = client.get(&url).send().await.expect("request failed");
            resp.status()
        });

        let status = timeout(Duration::from_secs(10), task)
            .await
            .expect("test timed out")
            .unwrap();
        assert_eq!(status.as_u16(), 400);
        server.close();
    }

    #[tokio::test]
    async fn server_works_concurrently() {
        const CONCURRENT_REQUESTS: usize = 20;
        let routes = test_routes("server_works_concurrently");
        let server = serve(8092, routes).await.expect("failed to start server");

        let client = Client::builder()
            .timeout(Duration::from_secs(5))
            .build()
            .unwrap();

        let start = std::time::Instant::now();
        let tasks: Vec<_> = (0..CONCURRENT_REQUESTS)
            .map(|_| {
                let client = client.clone();
                tokio::spawn(async move {
                    let resp = client
                        .get("http://127.0.0.1:8092/test")
                        .send()
                        .await
                        .expect("request failed");
                    resp.status()
                })
            })
            .collect();

        let results = futures::future::join_all(tasks).await;
        let elapsed = start.elapsed();

        for result in results {
            assert!(result.unwrap().is_success());
        }
        assert!(elapsed < Duration::from_secs(1));
        server.close();
    }
}
