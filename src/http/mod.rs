/// Module containing logic to parse HTTP headers
pub mod headers;
/// Module containing the closed set of HTTP methods this framework routes.
pub mod method;
/// Module containing logic to parse HTTP request lines
pub mod request_line;
/// Module containing logic to parse requests
pub mod request;
/// Module formatting the response.
pub mod response;
/// Module decomposing a request target into path segments and a query map.
pub mod uri;