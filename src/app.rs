//! The composed application and its HTTP/1.1 listener.
//!
//! # Examples
//!
//! ```rust,no_run
//! use axeon_mvc::{Engine, EngineOptions, MiddlewareRegistry, RouteDescriptor, ServerError};
//! use axeon_mvc::controller::ActionResult;
//! use axeon_mvc::context::{RequestAdapter, ResponseAdapter};
//! use std::sync::Arc;
//!
//! fn invoke(
//!     route: Option<Arc<RouteDescriptor>>,
//!     _req: RequestAdapter,
//!     mut res: ResponseAdapter,
//! ) -> ActionResult {
//!     Box::pin(async move {
//!         match route {
//!             Some(route) => res.text(&route.method_name),
//!             None => res.status(404).text("not found"),
//!         };
//!         Ok::<_, ServerError>(res.finish())
//!     })
//! }
//!
//! let routes = vec![RouteDescriptor::new("HomeController", "/home", "GET", "/index", "index")];
//! let app = Engine::new(EngineOptions::new(), invoke, MiddlewareRegistry::new())
//!     .init(&routes)
//!     .unwrap();
//! app.listen("127.0.0.1:3000").unwrap();
//! ```

use crate::context::RequestAdapter;
use crate::error::ServerError;
use crate::http::{parse_cookies, Body, Method, Request, Response};
use crate::interceptor::ErrorInterceptor;
use crate::options::EngineOptions;
use crate::router::{RouteTable, Router};
use futures::FutureExt;
use std::collections::HashMap;
use std::io::{Error, ErrorKind};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{
    AsyncBufRead, AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader,
};
use tokio::net::TcpListener;
use tokio::runtime::Runtime;
use tokio::sync::Semaphore;

const MAX_HEADERS: usize = 100;
const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;
const MAX_LINE_BYTES: usize = 8 * 1024;
const LINGER: Duration = Duration::from_secs(1);

/// Router plus error interceptor, ready to serve. Cheap to clone; the
/// route table is shared read-only between connections.
#[derive(Clone)]
pub struct Application {
    routes: RouteTable,
    interceptor: ErrorInterceptor,
    max_connections: usize,
}

impl Application {
    pub fn new(router: Router, options: &EngineOptions) -> Self {
        Self {
            routes: router.seal(),
            interceptor: ErrorInterceptor::new(options),
            max_connections: options.max_connections.max(1),
        }
    }

    /// Runs one request through the chain. Failures and panics in any
    /// handler end up in the error interceptor; this never fails.
    pub async fn handle(&self, mut req: Request) -> Response {
        if let Some(params) = self.routes.params(req.get_method(), &req.path) {
            req.params = params;
        }
        let snapshot = self
            .interceptor
            .wants_request()
            .then(|| RequestAdapter::new(&req));

        // The first middleware runs as soon as the chain is called, so the
        // call itself has to happen inside the guarded future.
        let handler = Arc::clone(self.routes.handler());
        let result = AssertUnwindSafe(async move { handler.handle(req).await })
            .catch_unwind()
            .await
            .unwrap_or_else(|panic| Err(ServerError::PanicError(panic_message(panic))));

        match result {
            Ok(response) => response,
            Err(err) => self.interceptor.intercept(err, snapshot),
        }
    }

    /// Starts the server on `addr` and blocks until it stops.
    pub fn listen(self, addr: &str) -> Result<(), Box<dyn std::error::Error>> {
        let runtime = Runtime::new()?;
        runtime.block_on(async {
            let listener = TcpListener::bind(addr).await?;
            let local = listener.local_addr()?;
            tracing::info!(address = %local, "listening");
            self.serve(listener).await?;
            Ok::<(), Box<dyn std::error::Error>>(())
        })
    }

    /// Accept loop over an already bound listener.
    pub async fn serve(self, listener: TcpListener) -> Result<(), Error> {
        let permits = Arc::new(Semaphore::new(self.max_connections));
        loop {
            let permit = Arc::clone(&permits)
                .acquire_owned()
                .await
                .map_err(|e| Error::new(ErrorKind::Other, e))?;

            match listener.accept().await {
                Ok((stream, peer)) => {
                    let app = self.clone();
                    tokio::spawn(async move {
                        if let Err(e) = app.handle_connection(stream).await {
                            tracing::warn!(peer = %peer, error = %e, "connection error");
                        }
                        drop(permit);
                    });
                }
                Err(e) => tracing::warn!(error = %e, "accept failed"),
            }
        }
    }

    async fn handle_connection<S>(&self, mut stream: S) -> Result<(), Error>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let request = match Self::read_request(&mut stream).await? {
            Some(request) => request,
            None => return Ok(()),
        };
        let head_only = matches!(&request, Ok(req) if req.get_method() == Method::HEAD);
        let rejected = request.is_err();
        let mut response = match request {
            Ok(request) => self.handle(request).await,
            Err(status) => Response::new(status),
        };
        response.header("Connection", "close");
        stream
            .write_all(&response.to_http_bytes(!head_only))
            .await?;
        stream.flush().await?;

        if rejected {
            // Unread input turns the close into a reset; drain it first.
            stream.shutdown().await?;
            let mut rest = (&mut stream).take(MAX_BODY_BYTES as u64);
            let _ = tokio::time::timeout(LINGER, tokio::io::copy(&mut rest, &mut tokio::io::sink())).await;
        }
        Ok(())
    }

    /// Reads one request. `Ok(None)` means the peer sent nothing; `Err(status)`
    /// inside marks a request that is answered without dispatch.
    async fn read_request<S>(stream: &mut S) -> Result<Option<Result<Request, u16>>, Error>
    where
        S: AsyncRead + Unpin,
    {
        let mut reader = BufReader::new(stream);
        let mut request_line = String::new();
        if !read_line_capped(&mut reader, &mut request_line).await? {
            return Ok(Some(Err(414)));
        }
        if request_line.trim().is_empty() {
            return Ok(None);
        }

        let mut parts = request_line.split_whitespace();
        let method = parts
            .next()
            .ok_or_else(|| Error::new(ErrorKind::InvalidData, "Invalid request line"))?
            .to_string();
        let url = parts
            .next()
            .ok_or_else(|| Error::new(ErrorKind::InvalidData, "Invalid request line"))?
            .to_string();
        let http_version = parts
            .next()
            .and_then(|v| v.strip_prefix("HTTP/"))
            .unwrap_or("1.0")
            .to_string();

        let mut headers = HashMap::new();
        loop {
            let mut line = String::new();
            if !read_line_capped(&mut reader, &mut line).await? {
                return Ok(Some(Err(431)));
            }
            if line.trim().is_empty() {
                break;
            }
            if headers.len() >= MAX_HEADERS {
                return Ok(Some(Err(431)));
            }
            if let Some((key, value)) = line.trim().split_once(':') {
                add_header(&mut headers, key.trim(), value.trim());
            }
        }

        let mut request = Request::new(&method, &url).with_version(&http_version);
        request.headers = headers;
        if let Some(cookies) = request.get_header("cookie").map(parse_cookies) {
            request.cookies = cookies;
        }

        let content_length = request
            .get_header("content-length")
            .and_then(|v| v.parse::<usize>().ok());
        if let Some(length) = content_length {
            if length > MAX_BODY_BYTES {
                return Ok(Some(Err(413)));
            }
            let mut data = Vec::with_capacity(length);
            reader.take(length as u64).read_to_end(&mut data).await?;
            let content_type = request
                .get_header("content-type")
                .unwrap_or("application/octet-stream")
                .to_string();
            request = request.with_body(Body::from_bytes(data).with_content_type(&content_type));
        }
        Ok(Some(Ok(request)))
    }
}

/// Reads one line of at most `MAX_LINE_BYTES`. Returns `false` when the line
/// is longer than that.
async fn read_line_capped<R>(reader: &mut R, line: &mut String) -> Result<bool, Error>
where
    R: AsyncBufRead + Unpin,
{
    let read = reader.take(MAX_LINE_BYTES as u64).read_line(line).await?;
    Ok(read < MAX_LINE_BYTES || line.ends_with('\n'))
}

/// Repeated header names, in any case, are combined into one
/// comma-separated value under the first spelling seen.
fn add_header(headers: &mut HashMap<String, String>, key: &str, value: &str) {
    match headers.iter_mut().find(|(name, _)| name.eq_ignore_ascii_case(key)) {
        Some((_, existing)) => {
            existing.push_str(", ");
            existing.push_str(value);
        }
        None => {
            headers.insert(key.to_string(), value.to_string());
        }
    }
}

fn panic_message(panic: Box<dyn std::any::Any + Send>) -> String {
    if let Some(msg) = panic.downcast_ref::<&str>() {
        msg.to_string()
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        msg.clone()
    } else {
        "Unknown panic".to_string()
    }
}
