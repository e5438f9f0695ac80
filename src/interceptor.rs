//! Last line of the chain: turns a failed request into a response.

use crate::context::{RequestAdapter, ResponseAdapter};
use crate::error::ServerError;
use crate::http::{Request, Response};
use crate::options::{EngineOptions, Environment, ErrorHandler};
use crate::views::ViewEngine;
use serde_json::{json, Value};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::Arc;

/// What a custom error handler receives.
pub struct HttpError {
    /// Status carried by the failure, `500` when it has none.
    pub status: u16,
    pub error: ServerError,
    pub request: RequestAdapter,
    pub response: ResponseAdapter,
}

/// Chosen once when the application is built.
#[derive(Clone)]
pub enum ErrorStrategy {
    Custom(ErrorHandler),
    Default { environment: Environment },
}

#[derive(Clone)]
pub struct ErrorInterceptor {
    strategy: ErrorStrategy,
    view_path: Arc<PathBuf>,
    views: Option<Arc<dyn ViewEngine>>,
}

impl ErrorInterceptor {
    pub fn new(options: &EngineOptions) -> Self {
        let strategy = match &options.error_handler {
            Some(handler) => ErrorStrategy::Custom(Arc::clone(handler)),
            None => ErrorStrategy::Default {
                environment: options.environment,
            },
        };
        Self {
            strategy,
            view_path: Arc::new(options.view_path.clone()),
            views: options.view_engine.clone(),
        }
    }

    /// Only the custom strategy hands the request to user code, so only it
    /// needs a snapshot taken before the request is consumed.
    pub(crate) fn wants_request(&self) -> bool {
        matches!(self.strategy, ErrorStrategy::Custom(_))
    }

    pub fn intercept(&self, error: ServerError, request: Option<RequestAdapter>) -> Response {
        let status = error.status_code();
        if status >= 500 {
            tracing::error!(status, error = %error, "request failed");
        } else {
            tracing::debug!(status, error = %error, "request failed");
        }

        match &self.strategy {
            ErrorStrategy::Custom(handler) => {
                let request = request.unwrap_or_else(|| RequestAdapter::new(&Request::new("", "/")));
                let response = ResponseAdapter::new(Arc::clone(&self.view_path), self.views.clone());
                let failure = HttpError {
                    status,
                    error,
                    request,
                    response,
                };
                catch_unwind(AssertUnwindSafe(|| handler(failure))).unwrap_or_else(|_| {
                    tracing::error!("custom error handler panicked");
                    Response::new(500)
                })
            }
            ErrorStrategy::Default { environment } => self.render_default(status, &error, *environment),
        }
    }

    fn render_default(&self, status: u16, error: &ServerError, environment: Environment) -> Response {
        let detail = if environment.is_development() {
            error.detail()
        } else {
            json!({})
        };
        let model = json!({
            "message": error.to_string(),
            "error": detail,
        });

        let mut response = ResponseAdapter::new(Arc::clone(&self.view_path), self.views.clone());
        response.status(status);
        if self.views.is_some() {
            match response.render("error", &model).map(|_| ()) {
                Ok(()) => return response.finish(),
                Err(err) => tracing::warn!(error = %err, "error view failed to render"),
            }
        }
        Self::json_fallback(status, &model)
    }

    fn json_fallback(status: u16, model: &Value) -> Response {
        let mut response = Response::new(status);
        if response.json(model).is_err() {
            response.body("Internal Server Error");
        }
        response
    }
}
