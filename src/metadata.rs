//! Route descriptors and middleware metadata.
//!
//! Descriptors are produced by whatever discovers controllers; this crate
//! treats them as immutable input. Middleware annotations are looked up
//! through a [`MetadataSource`].

use crate::middleware::{Middleware, MiddlewareChain};
use crate::router::join_paths;
use std::collections::HashMap;
use std::sync::Arc;

/// One controller action and its verb/path binding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteDescriptor {
    pub class_name: String,
    pub class_path: String,
    /// Verb as written in the route metadata; validated at composition.
    pub http_method: String,
    pub method_path: String,
    pub method_name: String,
    /// Route name matched against `default_page`.
    pub route: String,
}

impl RouteDescriptor {
    pub fn new(
        class_name: &str,
        class_path: &str,
        http_method: &str,
        method_path: &str,
        method_name: &str,
    ) -> Self {
        Self {
            class_name: class_name.to_string(),
            class_path: class_path.to_string(),
            http_method: http_method.to_string(),
            method_path: method_path.to_string(),
            method_name: method_name.to_string(),
            route: join_paths(class_path, method_path),
        }
    }

    pub fn with_route(mut self, route: &str) -> Self {
        self.route = route.to_string();
        self
    }
}

/// Lookup of middleware declared on controllers and their actions.
pub trait MetadataSource: Send + Sync + 'static {
    fn class_middlewares(&self, controller: &str) -> MiddlewareChain;
    fn method_middlewares(&self, controller: &str, action: &str) -> MiddlewareChain;
}

/// In-memory [`MetadataSource`].
#[derive(Clone, Default, Debug)]
pub struct MiddlewareRegistry {
    classes: HashMap<String, MiddlewareChain>,
    methods: HashMap<(String, String), MiddlewareChain>,
}

impl MiddlewareRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn class<M: Middleware>(&mut self, controller: &str, middleware: M) -> &mut Self {
        self.classes
            .entry(controller.to_string())
            .or_default()
            .add(middleware);
        self
    }

    pub fn method<M: Middleware>(&mut self, controller: &str, action: &str, middleware: M) -> &mut Self {
        self.methods
            .entry((controller.to_string(), action.to_string()))
            .or_default()
            .add(middleware);
        self
    }
}

impl MetadataSource for MiddlewareRegistry {
    fn class_middlewares(&self, controller: &str) -> MiddlewareChain {
        self.classes.get(controller).cloned().unwrap_or_default()
    }

    fn method_middlewares(&self, controller: &str, action: &str) -> MiddlewareChain {
        self.methods
            .get(&(controller.to_string(), action.to_string()))
            .cloned()
            .unwrap_or_default()
    }
}

/// Resolves class- and method-scope chains. Holds no cache; the composer
/// resolves each class chain once per group.
#[derive(Clone)]
pub struct MiddlewareResolver {
    source: Arc<dyn MetadataSource>,
}

impl MiddlewareResolver {
    pub fn new(source: Arc<dyn MetadataSource>) -> Self {
        Self { source }
    }

    pub fn resolve_class_middleware(&self, controller: &str) -> MiddlewareChain {
        self.source.class_middlewares(controller)
    }

    pub fn resolve_method_middleware(&self, controller: &str, action: &str) -> MiddlewareChain {
        self.source.method_middlewares(controller, action)
    }
}
