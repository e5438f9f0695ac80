use crate::http::Request;
use crate::middleware::{Middleware, MiddlewareResult, Next};
use std::time::Instant;

/// Access log in the spirit of a "dev" request logger: one event per request
/// with method, original URL, final status and elapsed time.
#[derive(Clone, Copy, Debug, Default)]
pub struct RequestLogger;

impl Middleware for RequestLogger {
    fn call(&self, req: Request, next: Next) -> MiddlewareResult {
        Box::pin(async move {
            let start = Instant::now();
            let method = req.method.clone();
            let url = req.url.clone();
            let res = next.handle(req).await;
            let status = match &res {
                Ok(res) => res.status,
                Err(err) => err.status_code(),
            };
            tracing::info!(
                target: "axeon_mvc::access",
                method = %method,
                url = %url,
                status,
                elapsed_ms = start.elapsed().as_secs_f64() * 1000.0,
                "request"
            );
            res
        })
    }

    fn name(&self) -> &str {
        "RequestLogger"
    }
}
