mod group;

pub use group::{group_routes, RouteGroup};

use crate::error::ServerError;
use crate::handler::{HttpResponse, SharedHandler};
use crate::http::{normalize_path, Method, Request};
use crate::middleware::{Middleware, MiddlewareChain};
use futures::future::BoxFuture;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Clone, Debug, PartialEq, Eq)]
enum Segment {
    Static(String),
    Param(String),
}

/// Compiled `/items/:id` style path.
#[derive(Clone, Debug)]
pub(crate) struct PathPattern {
    path: String,
    segments: Vec<Segment>,
}

impl PathPattern {
    pub(crate) fn parse(path: &str) -> Self {
        let path = normalize_path(path);
        let segments = path
            .split('/')
            .filter(|part| !part.is_empty())
            .map(|part| match part.strip_prefix(':') {
                Some(name) => Segment::Param(name.to_string()),
                None => Segment::Static(part.to_string()),
            })
            .collect();
        Self { path, segments }
    }

    pub(crate) fn matches(&self, path: &str) -> Option<HashMap<String, String>> {
        let parts: Vec<&str> = path.split('/').filter(|part| !part.is_empty()).collect();
        if parts.len() != self.segments.len() {
            return None;
        }

        let mut params = HashMap::new();
        for (segment, part) in self.segments.iter().zip(parts) {
            match segment {
                Segment::Static(expected) if expected == part => {}
                Segment::Static(_) => return None,
                Segment::Param(name) => {
                    let value = urlencoding::decode(part)
                        .map(|v| v.into_owned())
                        .unwrap_or_else(|_| part.to_string());
                    params.insert(name.clone(), value);
                }
            }
        }
        Some(params)
    }

    /// Whether `path` lies at or below this pattern, segment by segment.
    pub(crate) fn matches_prefix(&self, path: &str) -> bool {
        let parts: Vec<&str> = path.split('/').filter(|part| !part.is_empty()).collect();
        parts.len() >= self.segments.len()
            && self.segments.iter().zip(parts).all(|(segment, part)| match segment {
                Segment::Static(expected) => expected == part,
                Segment::Param(_) => true,
            })
    }
}

/// One endpoint binding. `method: None` accepts any verb and `pattern: None`
/// any path; the catch-all is both.
#[derive(Clone)]
pub(crate) struct Route {
    pub(crate) method: Option<Method>,
    pub(crate) pattern: Option<PathPattern>,
    pub(crate) handler: SharedHandler,
}

impl Route {
    fn accepts(&self, method: Method) -> bool {
        match self.method {
            None => true,
            Some(bound) => bound == method || (method == Method::HEAD && bound == Method::GET),
        }
    }

    fn matches(&self, method: Method, path: &str) -> Option<HashMap<String, String>> {
        if !self.accepts(method) {
            return None;
        }
        match &self.pattern {
            None => Some(HashMap::new()),
            Some(pattern) => pattern.matches(path),
        }
    }

    fn describe(&self) -> String {
        let method = self.method.map(|m| m.as_str()).unwrap_or("*");
        let path = self.pattern.as_ref().map(|p| p.path.as_str()).unwrap_or("*");
        format!("{} {}", method, path)
    }

    fn prefixed(self, prefix: &str) -> Self {
        Self {
            pattern: self
                .pattern
                .map(|pattern| PathPattern::parse(&join_paths(prefix, &pattern.path))),
            ..self
        }
    }
}

/// Bindings nested under a path prefix. `chain` runs once for any request
/// under the prefix before the nested bindings are tried; when none of them
/// accepts the request, dispatch resumes after the scope.
#[derive(Clone)]
pub(crate) struct Scope {
    prefix: PathPattern,
    chain: MiddlewareChain,
    layers: Arc<[Layer]>,
}

#[derive(Clone)]
pub(crate) enum Layer {
    Route(Route),
    Scope(Scope),
}

impl Layer {
    fn prefixed(self, prefix: &str) -> Self {
        match self {
            Layer::Route(route) => Layer::Route(route.prefixed(prefix)),
            Layer::Scope(scope) => Layer::Scope(Scope {
                prefix: PathPattern::parse(&join_paths(prefix, &scope.prefix.path)),
                chain: scope.chain,
                layers: scope
                    .layers
                    .iter()
                    .cloned()
                    .map(|layer| layer.prefixed(prefix))
                    .collect(),
            }),
        }
    }
}

/// Ordered router. Bindings are tried in the order they were added and the
/// first one accepting the verb and path wins.
///
/// Middleware registered with [`Router::middleware`] runs once per request
/// ahead of every binding of this router.
#[derive(Clone, Default)]
pub struct Router {
    pub(crate) middlewares: MiddlewareChain,
    pub(crate) layers: Vec<Layer>,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(&mut self, method: Method, path: &str, handler: SharedHandler) -> &mut Self {
        self.route_with(method, path, &MiddlewareChain::new(), handler)
    }

    /// Binds `handler` behind a route-specific chain.
    pub fn route_with(
        &mut self,
        method: Method,
        path: &str,
        chain: &MiddlewareChain,
        handler: SharedHandler,
    ) -> &mut Self {
        self.layers.push(Layer::Route(Route {
            method: Some(method),
            pattern: Some(PathPattern::parse(path)),
            handler: chain.wrap(handler),
        }));
        self
    }

    /// Binds `handler` for every verb and path. Only meaningful as the last
    /// binding, since anything added after it is unreachable.
    pub fn fallback(&mut self, handler: SharedHandler) -> &mut Self {
        self.layers.push(Layer::Route(Route {
            method: None,
            pattern: None,
            handler,
        }));
        self
    }

    pub fn middleware(&mut self, middleware: impl Middleware + 'static) -> &mut Self {
        self.middlewares.add(middleware);
        self
    }

    pub fn layer(&mut self, chain: &MiddlewareChain) -> &mut Self {
        self.middlewares.append(chain);
        self
    }

    /// Nests `router` under `prefix`.
    pub fn mount(&mut self, prefix: &str, router: Router) -> &mut Self {
        self.mount_with(prefix, &MiddlewareChain::new(), router)
    }

    /// Nests `router` under `prefix`. For every request whose path starts
    /// with `prefix`, `chain` and then the child's own middleware run once
    /// before the child's bindings are tried. A request none of them accepts
    /// continues with the bindings added after this one.
    pub fn mount_with(&mut self, prefix: &str, chain: &MiddlewareChain, router: Router) -> &mut Self {
        let Router { middlewares, layers } = router;
        let mut scope_chain = chain.clone();
        scope_chain.append(&middlewares);
        self.layers.push(Layer::Scope(Scope {
            prefix: PathPattern::parse(prefix),
            chain: scope_chain,
            layers: layers.into_iter().map(|layer| layer.prefixed(prefix)).collect(),
        }));
        self
    }

    /// Number of endpoint bindings, nested ones included.
    pub fn len(&self) -> usize {
        collect_routes(&self.layers).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Endpoint bindings in precedence order, as `VERB /path` strings.
    pub fn describe(&self) -> Vec<String> {
        collect_routes(&self.layers)
            .into_iter()
            .map(Route::describe)
            .collect()
    }

    /// Freezes the router: its own middleware folded around dispatch over
    /// the layer list.
    pub(crate) fn seal(self) -> RouteTable {
        let Router { middlewares, layers } = self;
        let layers: Arc<[Layer]> = layers.into();
        let root = Cursor {
            layers: Arc::clone(&layers),
            index: 0,
            resume: None,
        };
        let entry: SharedHandler = Arc::new(move |req: Request| dispatch(root.clone(), req));
        RouteTable {
            layers,
            handler: middlewares.wrap(entry),
        }
    }
}

/// A sealed router, shared read-only by every request.
#[derive(Clone)]
pub(crate) struct RouteTable {
    layers: Arc<[Layer]>,
    handler: SharedHandler,
}

impl RouteTable {
    pub(crate) fn handler(&self) -> &SharedHandler {
        &self.handler
    }

    /// Params of the first binding accepting `method` and `path`, if any.
    pub(crate) fn params(&self, method: Method, path: &str) -> Option<HashMap<String, String>> {
        find_route(&self.layers, method, path).map(|(_, params)| params)
    }
}

/// Position in a layer list, plus where to continue once it is exhausted.
#[derive(Clone)]
struct Cursor {
    layers: Arc<[Layer]>,
    index: usize,
    resume: Option<Arc<Cursor>>,
}

fn dispatch(cursor: Cursor, mut req: Request) -> BoxFuture<'static, HttpResponse> {
    Box::pin(async move {
        let method = req.get_method();
        let mut cursor = cursor;
        loop {
            let layers = Arc::clone(&cursor.layers);
            let Some(layer) = layers.get(cursor.index) else {
                match cursor.resume.take() {
                    Some(outer) => {
                        cursor = Cursor::clone(&outer);
                        continue;
                    }
                    None => return Err(ServerError::NotFound),
                }
            };
            cursor.index += 1;

            match layer {
                Layer::Route(route) => {
                    if let Some(params) = route.matches(method, &req.path) {
                        req.params = params;
                        return route.handler.handle(req).await;
                    }
                }
                Layer::Scope(scope) => {
                    if !scope.prefix.matches_prefix(&req.path) {
                        continue;
                    }
                    let inner = Cursor {
                        layers: Arc::clone(&scope.layers),
                        index: 0,
                        resume: Some(Arc::new(cursor)),
                    };
                    if scope.chain.is_empty() {
                        cursor = inner;
                        continue;
                    }
                    let rest: SharedHandler = Arc::new(move |req: Request| dispatch(inner.clone(), req));
                    return scope.chain.wrap(rest).handle(req).await;
                }
            }
        }
    })
}

fn collect_routes(layers: &[Layer]) -> Vec<&Route> {
    let mut routes = Vec::new();
    for layer in layers {
        match layer {
            Layer::Route(route) => routes.push(route),
            Layer::Scope(scope) => routes.extend(collect_routes(&scope.layers)),
        }
    }
    routes
}

/// First binding in `layers` accepting `method` and `path`, with its params.
/// Scopes are entered when their prefix matches; their middleware is not run.
pub(crate) fn find_route<'a>(
    layers: &'a [Layer],
    method: Method,
    path: &str,
) -> Option<(&'a Route, HashMap<String, String>)> {
    layers.iter().find_map(|layer| match layer {
        Layer::Route(route) => route.matches(method, path).map(|params| (route, params)),
        Layer::Scope(scope) if scope.prefix.matches_prefix(path) => {
            find_route(&scope.layers, method, path)
        }
        Layer::Scope(_) => None,
    })
}

/// Joins a mount prefix and a relative path into one normalized path.
pub fn join_paths(prefix: &str, path: &str) -> String {
    let prefix = normalize_path(prefix);
    let path = normalize_path(path);
    match (prefix.as_str(), path.as_str()) {
        ("/", _) => path,
        (_, "/") => prefix,
        _ => format!("{}{}", prefix, path),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::Response;
    use std::sync::Mutex;

    fn text(body: &'static str) -> SharedHandler {
        Arc::new(move |_req: Request| async move { Ok::<_, ServerError>(Response::text(body)) })
    }

    #[test]
    fn join_paths_normalizes_slashes() {
        assert_eq!(join_paths("/", "/"), "/");
        assert_eq!(join_paths("", "items"), "/items");
        assert_eq!(join_paths("/items/", "/"), "/items");
        assert_eq!(join_paths("/items", "/:id/"), "/items/:id");
        assert_eq!(join_paths("api", "v1"), "/api/v1");
    }

    #[test]
    fn pattern_extracts_decoded_params() {
        let pattern = PathPattern::parse("/items/:id/tags/:tag");
        let params = pattern.matches("/items/42/tags/red%20car").unwrap();
        assert_eq!(params["id"], "42");
        assert_eq!(params["tag"], "red car");
        assert!(pattern.matches("/items/42").is_none());
        assert!(pattern.matches("/users/42/tags/x").is_none());
        assert!(PathPattern::parse("/").matches("/").is_some());
    }

    #[test]
    fn prefixes_match_whole_segments() {
        let prefix = PathPattern::parse("/admin");
        assert!(prefix.matches_prefix("/admin"));
        assert!(prefix.matches_prefix("/admin/users/1"));
        assert!(!prefix.matches_prefix("/administrator"));
        assert!(!prefix.matches_prefix("/"));
        assert!(PathPattern::parse("/").matches_prefix("/anything"));
    }

    #[test]
    fn first_matching_binding_wins_and_head_uses_get() {
        let mut child = Router::new();
        child.route(Method::GET, "/new", text("new"));
        child.route(Method::GET, "/:id", text("by id"));

        let mut router = Router::new();
        router.mount("/items", child);
        router.route(Method::POST, "/items", text("create"));
        router.fallback(text("fallback"));
        let layers = router.layers;

        let (route, params) = find_route(&layers, Method::GET, "/items/new").unwrap();
        assert_eq!(route.describe(), "GET /items/new");
        assert!(params.is_empty());

        let (route, params) = find_route(&layers, Method::HEAD, "/items/7").unwrap();
        assert_eq!(route.describe(), "GET /items/:id");
        assert_eq!(params["id"], "7");

        let (route, _) = find_route(&layers, Method::DELETE, "/items").unwrap();
        assert_eq!(route.describe(), "* *");
    }

    #[test]
    fn mount_prefixes_paths_in_order() {
        let mut child = Router::new();
        child.route(Method::GET, "/", text("list"));
        child.route(Method::GET, "/:id", text("show"));

        let mut parent = Router::new();
        parent.route(Method::GET, "/", text("home"));
        parent.mount("/items", child);

        assert_eq!(parent.describe(), ["GET /", "GET /items", "GET /items/:id"]);
        assert_eq!(parent.len(), 3);
    }

    #[tokio::test]
    async fn scope_chain_runs_once_then_falls_through_to_later_bindings() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let scope_log = Arc::clone(&log);
        let mut chain = MiddlewareChain::new();
        chain.add(crate::middleware::from_fn(move |req, next| {
            let log = Arc::clone(&scope_log);
            Box::pin(async move {
                log.lock().unwrap().push(req.path.clone());
                next.handle(req).await
            })
        }));

        let mut child = Router::new();
        child.route(Method::GET, "/", text("list"));
        let mut router = Router::new();
        router.mount_with("/items", &chain, child);
        router.fallback(text("fallback"));
        let table = router.seal();

        let hit = table.handler().handle(Request::new("GET", "/items")).await.unwrap();
        assert_eq!(hit.body_text(), "list");
        let miss = table.handler().handle(Request::new("GET", "/items/7/edit")).await.unwrap();
        assert_eq!(miss.body_text(), "fallback");
        let outside = table.handler().handle(Request::new("GET", "/users")).await.unwrap();
        assert_eq!(outside.body_text(), "fallback");

        assert_eq!(*log.lock().unwrap(), ["/items", "/items/7/edit"]);
    }

    #[tokio::test]
    async fn nothing_bound_is_not_found() {
        let table = Router::new().seal();
        let result = table.handler().handle(Request::new("GET", "/")).await;
        assert!(matches!(result, Err(ServerError::NotFound)));
    }
}
