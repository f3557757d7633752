//! Middleware components for the coderunner server.

use std::time::Instant;

use axum::{body::Body, http::Request, middleware::Next, response::Response};

//--------------------------------------------------------------------------------------------------
// Middleware Functions
//--------------------------------------------------------------------------------------------------

/// Log incoming requests and their outcome
pub async fn logging_middleware(req: Request<Body>, next: Next) -> Response {
    let method = req.method().clone();
    let uri = req.uri().clone();
    let started = Instant::now();

    tracing::info!("Request: {} {}", method, uri);

    let response = next.run(req).await;

    tracing::info!(
        "Response: {} {}: {} in {}ms",
        method,
        uri,
        response.status(),
        started.elapsed().as_millis()
    );

    response
}
