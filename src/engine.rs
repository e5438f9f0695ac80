//! Builds the live router from route descriptors.
//!
//! Precedence of the composed tree, first to last:
//!
//! 1. global middleware (request logger, static files, `options.middlewares`)
//! 2. the default page bound at `GET /`
//! 3. one router per controller class, in discovery order, mounted at the
//!    class base path. Class middleware runs once for any request under that
//!    path, then method middleware, then the action. A request no action of
//!    the class accepts continues with the next class.
//! 4. the catch-all, which calls the invoker without a descriptor

use crate::app::Application;
use crate::controller::{ActionInvoker, ControllerBinding};
use crate::error::ConfigError;
use crate::handler::SharedHandler;
use crate::http::Method;
use crate::metadata::{MetadataSource, MiddlewareResolver, RouteDescriptor};
use crate::middleware::{RequestLogger, StaticFiles};
use crate::options::EngineOptions;
use crate::router::{group_routes, RouteGroup, Router};
use std::path::PathBuf;
use std::sync::Arc;

pub struct Engine {
    options: EngineOptions,
    invoker: Arc<dyn ActionInvoker>,
    resolver: MiddlewareResolver,
    view_path: Arc<PathBuf>,
}

impl Engine {
    pub fn new(
        options: EngineOptions,
        invoker: impl ActionInvoker,
        metadata: impl MetadataSource,
    ) -> Self {
        let view_path = Arc::new(options.view_path.clone());
        Self {
            options,
            invoker: Arc::new(invoker),
            resolver: MiddlewareResolver::new(Arc::new(metadata)),
            view_path,
        }
    }

    /// Composes the router and wraps it in the error interceptor.
    pub fn init(self, routes: &[RouteDescriptor]) -> Result<Application, ConfigError> {
        let router = self.compose(routes)?;
        Ok(Application::new(router, &self.options))
    }

    pub fn compose(&self, routes: &[RouteDescriptor]) -> Result<Router, ConfigError> {
        let routes: Vec<Arc<RouteDescriptor>> = routes.iter().cloned().map(Arc::new).collect();
        let mut app = Router::new();

        if self.options.show_console_log {
            app.middleware(RequestLogger);
        }
        if let Some(path) = &self.options.static_file_path {
            app.middleware(StaticFiles::new(path));
        }
        app.layer(&self.options.middlewares);

        if let Some(route) = self.default_route(&routes) {
            tracing::debug!(route = %route.route, "default page bound at /");
            app.route(Method::GET, "/", self.handler(Some(route)));
        }

        let groups = group_routes(&routes);
        for group in &groups {
            validate_path(group.class_path(), &group.class_name)?;
            let class_chain = self.resolver.resolve_class_middleware(&group.class_name);
            app.mount_with(group.class_path(), &class_chain, self.method_router(group)?);
        }

        app.fallback(self.handler(None));

        tracing::debug!(
            controllers = groups.len(),
            bindings = app.len(),
            "router composed"
        );
        Ok(app)
    }

    /// One binding per descriptor of the group, paths relative to the class.
    fn method_router(&self, group: &RouteGroup) -> Result<Router, ConfigError> {
        let mut methods = Router::new();
        for route in &group.routes {
            let verb = Method::parse_verb(&route.http_method).ok_or_else(|| {
                ConfigError::InvalidVerb {
                    verb: route.http_method.clone(),
                    class_name: route.class_name.clone(),
                    action: route.method_name.clone(),
                }
            })?;
            validate_path(&route.method_path, &route.class_name)?;
            let chain = self
                .resolver
                .resolve_method_middleware(&route.class_name, &route.method_name);
            methods.route_with(verb, &route.method_path, &chain, self.handler(Some(Arc::clone(route))));
        }
        Ok(methods)
    }

    /// The single descriptor whose route name equals `default_page`, ignoring
    /// case. Zero or several matches bind nothing.
    fn default_route(&self, routes: &[Arc<RouteDescriptor>]) -> Option<Arc<RouteDescriptor>> {
        let page = self.options.default_page.as_deref()?;
        let page = page.to_lowercase();
        let matches: Vec<&Arc<RouteDescriptor>> = routes
            .iter()
            .filter(|route| route.route.to_lowercase() == page)
            .collect();

        match matches.as_slice() {
            [route] => Some(Arc::clone(route)),
            _ => {
                tracing::warn!(
                    default_page = %page,
                    matches = matches.len(),
                    "default page must match exactly one route; not binding /"
                );
                None
            }
        }
    }

    fn handler(&self, route: Option<Arc<RouteDescriptor>>) -> SharedHandler {
        Arc::new(ControllerBinding::new(
            route,
            Arc::clone(&self.invoker),
            Arc::clone(&self.view_path),
            self.options.view_engine.clone(),
        ))
        .into_handler()
    }
}

fn validate_path(path: &str, class_name: &str) -> Result<(), ConfigError> {
    let invalid = |reason| ConfigError::InvalidPath {
        path: path.to_string(),
        class_name: class_name.to_string(),
        reason,
    };
    if path.chars().any(|c| c.is_whitespace() || c == '?' || c == '#') {
        return Err(invalid("contains whitespace, `?` or `#`"));
    }
    if path.split('/').any(|segment| segment == ":") {
        return Err(invalid("parameter without a name"));
    }
    Ok(())
}
