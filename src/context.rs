//! Framework-neutral views over the listener's request and response.
//!
//! Controllers never see [`Request`] directly. They get a [`RequestAdapter`]
//! whose header, cookie and param keys are lowercased once at construction,
//! so every lookup is case-insensitive, and a [`ResponseAdapter`] that
//! collects what the action wants to send back.

use crate::error::{ServerError, ServerResult};
use crate::http::{Body, Method, Request, Response};
use crate::views::ViewEngine;
use serde::Serialize;
use serde_json::Value;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

/// Lowercases every key. Keys that collide once lowercased are visited in
/// sorted order and `merge` folds each later value into the kept one.
fn lowercase_keys(map: &HashMap<String, String>, merge: fn(&mut String, &str)) -> HashMap<String, String> {
    let mut entries: Vec<(&String, &String)> = map.iter().collect();
    entries.sort();

    let mut lowered = HashMap::with_capacity(entries.len());
    for (key, value) in entries {
        match lowered.entry(key.to_lowercase()) {
            Entry::Occupied(mut slot) => merge(slot.get_mut(), value),
            Entry::Vacant(slot) => {
                slot.insert(value.clone());
            }
        }
    }
    lowered
}

fn join_values(kept: &mut String, value: &str) {
    kept.push_str(", ");
    kept.push_str(value);
}

fn keep_first(_kept: &mut String, _value: &str) {}

/// Read-only projection of one inbound request.
#[derive(Debug, Clone)]
pub struct RequestAdapter {
    http_version: String,
    http_method: Method,
    url: String,
    referrer: Option<String>,
    headers: HashMap<String, String>,
    cookies: HashMap<String, String>,
    params: HashMap<String, String>,
    body: Arc<Body>,
}

impl RequestAdapter {
    pub fn new(request: &Request) -> Self {
        let headers = lowercase_keys(&request.headers, join_values);
        // The header is spelled "Referer" on the wire; accept both.
        let referrer = headers
            .get("referer")
            .or_else(|| headers.get("referrer"))
            .cloned();
        Self {
            http_version: request.http_version.clone(),
            http_method: request.get_method(),
            url: request.url.clone(),
            referrer,
            cookies: lowercase_keys(&request.cookies, keep_first),
            params: lowercase_keys(&request.params, keep_first),
            headers,
            body: Arc::clone(&request.body),
        }
    }

    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_lowercase()).map(String::as_str)
    }

    pub fn get_cookie(&self, name: &str) -> Option<&str> {
        self.cookies.get(&name.to_lowercase()).map(String::as_str)
    }

    pub fn get_param(&self, name: &str) -> Option<&str> {
        self.params.get(&name.to_lowercase()).map(String::as_str)
    }

    pub fn http_method(&self) -> Method {
        self.http_method
    }

    pub fn http_version(&self) -> &str {
        &self.http_version
    }

    /// URL as received, query string included.
    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn referrer(&self) -> Option<&str> {
        self.referrer.as_deref()
    }

    pub fn body(&self) -> &Body {
        &self.body
    }
}

/// Outbound side handed to the action. Finished into a [`Response`] once the
/// action completes.
pub struct ResponseAdapter {
    response: Response,
    view_path: Arc<PathBuf>,
    views: Option<Arc<dyn ViewEngine>>,
}

impl ResponseAdapter {
    pub fn new(view_path: Arc<PathBuf>, views: Option<Arc<dyn ViewEngine>>) -> Self {
        Self {
            response: Response::new(200),
            view_path,
            views,
        }
    }

    pub fn status(&mut self, status: u16) -> &mut Self {
        self.response.status(status);
        self
    }

    pub fn header(&mut self, name: &str, value: &str) -> &mut Self {
        self.response.header(name, value);
        self
    }

    pub fn set_cookie(&mut self, name: &str, value: &str) -> &mut Self {
        self.response
            .cookies
            .push(format!("{}={}; Path=/", name, urlencoding::encode(value)));
        self
    }

    pub fn text(&mut self, body: &str) -> &mut Self {
        self.response.header("Content-Type", "text/plain").body(body);
        self
    }

    pub fn html(&mut self, body: &str) -> &mut Self {
        self.response.header("Content-Type", "text/html").body(body);
        self
    }

    pub fn json<T: Serialize>(&mut self, value: &T) -> ServerResult<&mut Self> {
        self.response.json(value)?;
        Ok(self)
    }

    pub fn redirect(&mut self, location: &str) -> &mut Self {
        self.response.status(302).header("Location", location);
        self
    }

    /// Renders `view` with `model` through the configured view engine.
    pub fn render(&mut self, view: &str, model: &Value) -> ServerResult<&mut Self> {
        let views = self
            .views
            .as_ref()
            .ok_or_else(|| ServerError::InternalError("no view engine configured".to_string()))?;
        let html = views.render(&self.view_path, view, model)?;
        self.response.header("Content-Type", "text/html").body(html);
        Ok(self)
    }

    pub fn current_status(&self) -> u16 {
        self.response.status
    }

    pub fn finish(self) -> Response {
        self.response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookups_ignore_case_on_both_sides() {
        let mut request = Request::new("post", "/Items/7?x=1")
            .header("Content-Type", "application/json")
            .header("Referer", "http://example.com/")
            .cookie("SessionId", "abc")
            .with_version("1.0");
        request.params.insert("ID".to_string(), "7".to_string());

        let adapter = RequestAdapter::new(&request);
        assert_eq!(adapter.get_header("content-type"), Some("application/json"));
        assert_eq!(adapter.get_header("CONTENT-TYPE"), Some("application/json"));
        assert_eq!(adapter.get_cookie("sessionid"), Some("abc"));
        assert_eq!(adapter.get_param("id"), Some("7"));
        assert_eq!(adapter.http_method(), Method::POST);
        assert_eq!(adapter.http_version(), "1.0");
        assert_eq!(adapter.url(), "/Items/7?x=1");
        assert_eq!(adapter.referrer(), Some("http://example.com/"));
    }

    #[test]
    fn missing_data_is_absent_not_a_failure() {
        let adapter = RequestAdapter::new(&Request::new("BREW", "/"));
        assert_eq!(adapter.get_header("accept"), None);
        assert_eq!(adapter.get_cookie("sid"), None);
        assert_eq!(adapter.get_param("id"), None);
        assert_eq!(adapter.referrer(), None);
        assert_eq!(adapter.http_method(), Method::Unknown);
        assert!(adapter.body().is_empty());
    }

    #[test]
    fn keys_differing_only_in_case_merge_the_same_way_every_time() {
        let request = Request::new("GET", "/")
            .header("x-tag", "b")
            .header("X-Tag", "a")
            .cookie("sid", "lower")
            .cookie("SID", "upper");

        let adapter = RequestAdapter::new(&request);
        assert_eq!(adapter.get_header("x-tag"), Some("a, b"));
        assert_eq!(adapter.get_cookie("sid"), Some("upper"));
    }

    #[test]
    fn response_adapter_builds_json_html_and_redirects() {
        let mut json = ResponseAdapter::new(Arc::new(PathBuf::new()), None);
        json.status(201).header("X-Id", "7").json(&serde_json::json!({"id": 7})).unwrap();
        assert_eq!(json.current_status(), 201);
        let json = json.finish();
        assert_eq!(json.headers["Content-Type"], "application/json");
        assert_eq!(json.headers["X-Id"], "7");
        assert_eq!(json.body_text(), r#"{"id":7}"#);

        let mut page = ResponseAdapter::new(Arc::new(PathBuf::new()), None);
        page.html("<p>hi</p>");
        let page = page.finish();
        assert_eq!(page.headers["Content-Type"], "text/html");
        assert_eq!(page.body_text(), "<p>hi</p>");

        let mut moved = ResponseAdapter::new(Arc::new(PathBuf::new()), None);
        moved.redirect("/login");
        let moved = moved.finish();
        assert_eq!(moved.status, 302);
        assert_eq!(moved.headers["Location"], "/login");
    }

    #[test]
    fn render_without_engine_is_an_error() {
        let mut response = ResponseAdapter::new(Arc::new(PathBuf::from("views")), None);
        assert!(response.render("index", &Value::Null).is_err());
        let response = {
            let mut r = ResponseAdapter::new(Arc::new(PathBuf::new()), None);
            r.status(201).set_cookie("sid", "a b").text("made");
            r.finish()
        };
        assert_eq!(response.status, 201);
        assert_eq!(response.cookies, vec!["sid=a%20b; Path=/".to_string()]);
    }
}
