//! Shared fixtures: an invoker and middleware that record what ran.
#![allow(dead_code)]

use axeon_mvc::context::{RequestAdapter, ResponseAdapter};
use axeon_mvc::controller::ActionResult;
use axeon_mvc::middleware::from_fn;
use axeon_mvc::{ActionInvoker, Middleware, RouteDescriptor, ServerError};
use std::sync::{Arc, Mutex};

pub type Log = Arc<Mutex<Vec<String>>>;

pub fn new_log() -> Log {
    Arc::new(Mutex::new(Vec::new()))
}

pub fn entries(log: &Log) -> Vec<String> {
    log.lock().unwrap().clone()
}

/// Records `action:<class>.<action>` or `catch-all` and answers with the same
/// label. Actions named `fail*` raise a 404 failure and `explode` panics.
pub fn recording_invoker(log: Log) -> impl ActionInvoker {
    move |route: Option<Arc<RouteDescriptor>>,
          req: RequestAdapter,
          mut res: ResponseAdapter|
          -> ActionResult {
        let log = Arc::clone(&log);
        Box::pin(async move {
            let label = match &route {
                Some(route) => format!("action:{}.{}", route.class_name, route.method_name),
                None => "catch-all".to_string(),
            };
            log.lock().unwrap().push(label.clone());

            match route.as_deref().map(|r| r.method_name.as_str()) {
                Some(name) if name.starts_with("fail") => {
                    return Err(ServerError::status(404, "item is gone"));
                }
                Some("explode") => panic!("action exploded"),
                Some("show") => {
                    let id = req.get_param("ID").unwrap_or("-");
                    res.text(&format!("{} id={}", label, id));
                }
                Some(_) => {
                    res.text(&label);
                }
                None => {
                    res.status(404).text(&label);
                }
            }
            Ok::<_, ServerError>(res.finish())
        })
    }
}

/// Appends `label` to the log, then continues the chain.
pub fn tracer(log: &Log, label: &str) -> impl Middleware {
    let log = Arc::clone(log);
    let label = label.to_string();
    from_fn(move |req, next| {
        let log = Arc::clone(&log);
        let label = label.clone();
        Box::pin(async move {
            log.lock().unwrap().push(label);
            next.handle(req).await
        })
    })
}

/// Logs `label` and answers `status` without calling the rest of the chain.
pub fn blocker(log: &Log, label: &str, status: u16) -> impl Middleware {
    let log = Arc::clone(log);
    let label = label.to_string();
    from_fn(move |_req, _next| {
        log.lock().unwrap().push(label.clone());
        Box::pin(async move { Ok(axeon_mvc::Response::new(status)) })
    })
}

pub fn route(class: &str, class_path: &str, verb: &str, path: &str, action: &str) -> RouteDescriptor {
    RouteDescriptor::new(class, class_path, verb, path, action)
}
