mod logger;
mod static_files;

pub use logger::RequestLogger;
pub use static_files::StaticFiles;

use crate::handler::{HttpResponse, IntoResponse, SharedHandler};
use crate::http::Request;
use futures::future::BoxFuture;
use std::fmt;
use std::sync::Arc;

/// The remainder of the chain after the current middleware.
#[derive(Clone)]
pub struct Next {
    handler: SharedHandler,
}

impl Next {
    pub fn new<F, R>(handler: F) -> Self
    where
        F: Fn(Request) -> R + Send + Sync + 'static,
        R: IntoResponse,
    {
        Self {
            handler: Arc::new(handler),
        }
    }

    pub(crate) fn from_handler(handler: SharedHandler) -> Self {
        Self { handler }
    }

    pub async fn handle(&self, req: Request) -> HttpResponse {
        self.handler.handle(req).await
    }
}

pub type MiddlewareResult = BoxFuture<'static, HttpResponse>;

/// A request-processing unit placed in front of a handler.
///
/// Returning without awaiting `next` short-circuits everything ordered after
/// this middleware, including the action itself.
pub trait Middleware: Send + Sync + 'static {
    fn call(&self, req: Request, next: Next) -> MiddlewareResult;

    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

/// Adapts a closure `Fn(Request, Next) -> MiddlewareResult` into a [`Middleware`].
pub fn from_fn<F>(f: F) -> FromFn<F>
where
    F: Fn(Request, Next) -> MiddlewareResult + Send + Sync + 'static,
{
    FromFn { f }
}

pub struct FromFn<F> {
    f: F,
}

impl<F> Middleware for FromFn<F>
where
    F: Fn(Request, Next) -> MiddlewareResult + Send + Sync + 'static,
{
    fn call(&self, req: Request, next: Next) -> MiddlewareResult {
        (self.f)(req, next)
    }
}

/// Ordered middleware sequence. Index 0 runs first.
#[derive(Clone, Default)]
pub struct MiddlewareChain {
    middlewares: Vec<Arc<dyn Middleware>>,
}

impl MiddlewareChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add<M: Middleware + 'static>(&mut self, middleware: M) -> &mut Self {
        self.middlewares.push(Arc::new(middleware));
        self
    }

    pub fn append(&mut self, other: &MiddlewareChain) -> &mut Self {
        self.middlewares.extend(other.middlewares.iter().cloned());
        self
    }

    pub fn len(&self) -> usize {
        self.middlewares.len()
    }

    pub fn is_empty(&self) -> bool {
        self.middlewares.is_empty()
    }

    /// Folds the chain around `handler` into a single handler. Done once when
    /// a route is bound, not per request.
    pub fn wrap(&self, handler: SharedHandler) -> SharedHandler {
        let mut next = Next::from_handler(handler);
        for middleware in self.middlewares.iter().rev() {
            let middleware = Arc::clone(middleware);
            let inner = next;
            next = Next::new(move |req| middleware.call(req, inner.clone()));
        }
        next.handler
    }
}

impl fmt::Debug for MiddlewareChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.middlewares.iter().map(|m| m.name()))
            .finish()
    }
}
