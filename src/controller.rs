use crate::context::{RequestAdapter, ResponseAdapter};
use crate::error::ServerResult;
use crate::handler::{HttpResponse, SharedHandler};
use crate::http::{Request, Response};
use crate::metadata::RouteDescriptor;
use crate::views::ViewEngine;
use futures::future::BoxFuture;
use std::path::PathBuf;
use std::sync::Arc;

pub type ActionResult = BoxFuture<'static, ServerResult<Response>>;

/// Creates controllers and runs their actions.
///
/// `route` is `None` when the request reached the catch-all; the invoker is
/// then expected to produce its not-found outcome.
pub trait ActionInvoker: Send + Sync + 'static {
    fn execute(
        &self,
        route: Option<Arc<RouteDescriptor>>,
        request: RequestAdapter,
        response: ResponseAdapter,
    ) -> ActionResult;
}

impl<F> ActionInvoker for F
where
    F: Fn(Option<Arc<RouteDescriptor>>, RequestAdapter, ResponseAdapter) -> ActionResult
        + Send
        + Sync
        + 'static,
{
    fn execute(
        &self,
        route: Option<Arc<RouteDescriptor>>,
        request: RequestAdapter,
        response: ResponseAdapter,
    ) -> ActionResult {
        (self)(route, request, response)
    }
}

/// A descriptor (or the catch-all marker) tied to the invoker.
///
/// Built once while composing and shared by every request that hits it.
pub struct ControllerBinding {
    route: Option<Arc<RouteDescriptor>>,
    invoker: Arc<dyn ActionInvoker>,
    view_path: Arc<PathBuf>,
    views: Option<Arc<dyn ViewEngine>>,
}

impl ControllerBinding {
    pub fn new(
        route: Option<Arc<RouteDescriptor>>,
        invoker: Arc<dyn ActionInvoker>,
        view_path: Arc<PathBuf>,
        views: Option<Arc<dyn ViewEngine>>,
    ) -> Self {
        Self {
            route,
            invoker,
            view_path,
            views,
        }
    }

    /// Adapts the request, runs the action and waits for it to finish.
    pub async fn dispatch(&self, req: Request) -> HttpResponse {
        let request = RequestAdapter::new(&req);
        let response = ResponseAdapter::new(Arc::clone(&self.view_path), self.views.clone());
        self.invoker
            .execute(self.route.clone(), request, response)
            .await
    }

    pub fn into_handler(self: Arc<Self>) -> SharedHandler {
        Arc::new(move |req: Request| {
            let binding = Arc::clone(&self);
            async move { binding.dispatch(req).await }
        })
    }
}
