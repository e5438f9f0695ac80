//! # Axeon MVC
//!
//! Controller/action dispatch on top of an Express-style router.
//!
//! Given the route descriptors of an MVC application (controller class,
//! action, verb, paths) this crate builds the live router:
//!
//! - one sub-router per controller, mounted at the controller's base path,
//!   with class middleware ahead of method middleware ahead of the action
//! - an optional default page served at `GET /`
//! - a catch-all that hands unmatched requests to the action invoker
//! - an error interceptor wrapping everything
//!
//! Controllers see requests through [`RequestAdapter`], whose header, cookie
//! and param lookups ignore case.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use axeon_mvc::{Engine, EngineOptions, MiddlewareRegistry, RouteDescriptor, ServerError};
//! use axeon_mvc::controller::ActionResult;
//! use axeon_mvc::context::{RequestAdapter, ResponseAdapter};
//! use std::sync::Arc;
//!
//! fn invoke(
//!     route: Option<Arc<RouteDescriptor>>,
//!     req: RequestAdapter,
//!     mut res: ResponseAdapter,
//! ) -> ActionResult {
//!     Box::pin(async move {
//!         match route {
//!             Some(route) => res.text(&format!("{} {}", route.method_name, req.url())),
//!             None => res.status(404).text("not found"),
//!         };
//!         Ok::<_, ServerError>(res.finish())
//!     })
//! }
//!
//! let routes = vec![
//!     RouteDescriptor::new("ItemsController", "/items", "GET", "/", "list"),
//!     RouteDescriptor::new("ItemsController", "/items", "POST", "/", "create"),
//! ];
//! let options = EngineOptions::new().show_console_log(true);
//! axeon_mvc::logging::init(options.show_console_log);
//! let app = Engine::new(options, invoke, MiddlewareRegistry::new())
//!     .init(&routes)
//!     .expect("invalid routes");
//! app.listen("127.0.0.1:3000").unwrap();
//! ```

pub mod app;
pub mod context;
pub mod controller;
pub mod engine;
pub mod error;
pub mod handler;
pub mod http;
pub mod interceptor;
pub mod logging;
pub mod metadata;
pub mod middleware;
pub mod options;
pub mod router;
pub mod views;
pub extern crate serde_json;

pub use serde_json::{json, Value};

pub use app::Application;
pub use context::{RequestAdapter, ResponseAdapter};
pub use controller::{ActionInvoker, ControllerBinding};
pub use engine::Engine;
pub use error::{ConfigError, ServerError, ServerResult};
pub use http::{Body, Method, Request, Response};
pub use interceptor::HttpError;
pub use metadata::{MetadataSource, MiddlewareRegistry, MiddlewareResolver, RouteDescriptor};
pub use middleware::{Middleware, MiddlewareChain, Next};
pub use options::{EngineOptions, Environment, Settings};
pub use router::Router;
pub use views::ViewEngine;
