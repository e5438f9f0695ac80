use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Closed set of verbs a controller action can be bound to.
#[derive(Eq, Hash, PartialEq, Copy, Clone, Debug)]
pub enum Method {
    GET,
    POST,
    PUT,
    DELETE,
    PATCH,
    HEAD,
    OPTIONS,
    Unknown,
}

impl Method {
    /// Maps a wire method onto the enumeration. Never fails: anything outside
    /// the closed set becomes `Unknown`.
    pub fn from_string(s: &str) -> Method {
        Self::parse_verb(s).unwrap_or(Method::Unknown)
    }

    /// Strict, case-insensitive parse used when binding routes.
    pub fn parse_verb(s: &str) -> Option<Method> {
        match s.trim().to_ascii_uppercase().as_str() {
            "GET" => Some(Method::GET),
            "POST" => Some(Method::POST),
            "PUT" => Some(Method::PUT),
            "DELETE" => Some(Method::DELETE),
            "PATCH" => Some(Method::PATCH),
            "HEAD" => Some(Method::HEAD),
            "OPTIONS" => Some(Method::OPTIONS),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Method::GET => "GET",
            Method::POST => "POST",
            Method::PUT => "PUT",
            Method::DELETE => "DELETE",
            Method::PATCH => "PATCH",
            Method::HEAD => "HEAD",
            Method::OPTIONS => "OPTIONS",
            Method::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw request payload. Opaque to the dispatch layer; actions decode it.
#[derive(Debug, Default)]
pub struct Body {
    pub(crate) content_type: String,
    pub(crate) data: Vec<u8>,
}

impl Body {
    pub fn new() -> Body {
        Body::default()
    }

    pub fn from_string(s: &str) -> Body {
        Body {
            content_type: "text/plain".to_string(),
            data: s.as_bytes().to_vec(),
        }
    }

    pub fn from_bytes(b: Vec<u8>) -> Body {
        Body {
            content_type: "application/octet-stream".to_string(),
            data: b,
        }
    }

    pub fn with_content_type(mut self, content_type: &str) -> Body {
        self.content_type = content_type.to_string();
        self
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_string(&self) -> String {
        String::from_utf8_lossy(&self.data).to_string()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn json<T>(&self) -> Option<T>
    where
        T: serde::de::DeserializeOwned,
    {
        if self.content_type.starts_with("application/json") {
            serde_json::from_slice(&self.data).ok()
        } else {
            None
        }
    }

    /// Decodes an `application/x-www-form-urlencoded` payload. Pairs that fail
    /// to percent-decode are skipped.
    pub fn form(&self) -> Option<HashMap<String, String>> {
        if !self.content_type.starts_with("application/x-www-form-urlencoded") {
            return None;
        }
        let raw = String::from_utf8_lossy(&self.data);
        let form = raw
            .split('&')
            .filter(|pair| !pair.is_empty())
            .filter_map(|pair| {
                let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
                let key = urlencoding::decode(&key.replace('+', " ")).ok()?.into_owned();
                let value = urlencoding::decode(&value.replace('+', " ")).ok()?.into_owned();
                Some((key, value))
            })
            .collect();
        Some(form)
    }
}

/// Request as handed over by the HTTP listener.
///
/// Header, cookie and param keys keep whatever case the client or the
/// router produced; `RequestAdapter` is the case-insensitive view over it.
#[derive(Debug)]
pub struct Request {
    pub method: String,
    /// Original URL including the query string.
    pub url: String,
    pub path: String,
    pub http_version: String,
    pub headers: HashMap<String, String>,
    pub cookies: HashMap<String, String>,
    pub params: HashMap<String, String>,
    pub body: Arc<Body>,
}

impl Request {
    pub fn new(method: &str, url: &str) -> Self {
        Self {
            method: method.to_string(),
            url: url.to_string(),
            path: normalize_path(url.split('?').next().unwrap_or("/")),
            http_version: "1.1".to_string(),
            headers: HashMap::new(),
            cookies: HashMap::new(),
            params: HashMap::new(),
            body: Arc::new(Body::new()),
        }
    }

    pub fn header(mut self, key: &str, value: &str) -> Self {
        self.headers.insert(key.to_string(), value.to_string());
        self
    }

    pub fn cookie(mut self, key: &str, value: &str) -> Self {
        self.cookies.insert(key.to_string(), value.to_string());
        self
    }

    pub fn with_body(mut self, body: Body) -> Self {
        self.body = Arc::new(body);
        self
    }

    pub fn with_version(mut self, version: &str) -> Self {
        self.http_version = version.to_string();
        self
    }

    pub fn get_method(&self) -> Method {
        Method::from_string(&self.method)
    }

    pub fn get_header(&self, key: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(key))
            .map(|(_, value)| value.as_str())
    }
}

/// Strips trailing slashes; the empty path becomes `/`.
pub(crate) fn normalize_path(path: &str) -> String {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{}", trimmed)
    }
}

/// Parses a `Cookie` header (`a=1; b=2`) into name/value pairs.
pub(crate) fn parse_cookies(header: &str) -> HashMap<String, String> {
    header
        .split(';')
        .filter_map(|pair| {
            let (name, value) = pair.trim().split_once('=')?;
            let value = value.trim().trim_matches('"');
            let value = urlencoding::decode(value)
                .map(|v| v.into_owned())
                .unwrap_or_else(|_| value.to_string());
            Some((name.trim().to_string(), value))
        })
        .filter(|(name, _)| !name.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbs_parse_case_insensitively_and_reject_unknown() {
        assert_eq!(Method::parse_verb("get"), Some(Method::GET));
        assert_eq!(Method::parse_verb("Patch"), Some(Method::PATCH));
        assert_eq!(Method::parse_verb("FETCH"), None);
        assert_eq!(Method::from_string("TRACE"), Method::Unknown);
    }

    #[test]
    fn request_path_drops_query_and_trailing_slash() {
        let req = Request::new("GET", "/items/?page=2");
        assert_eq!(req.path, "/items");
        assert_eq!(req.url, "/items/?page=2");
        assert_eq!(Request::new("GET", "").path, "/");
    }

    #[test]
    fn cookies_are_split_and_decoded() {
        let cookies = parse_cookies("sid=abc%20def; theme=\"dark\"; broken");
        assert_eq!(cookies.get("sid").map(String::as_str), Some("abc def"));
        assert_eq!(cookies.get("theme").map(String::as_str), Some("dark"));
        assert_eq!(cookies.len(), 2);
    }

    #[test]
    fn form_body_is_decoded() {
        let body = Body::from_string("name=Jane+Doe&tag=a%26b")
            .with_content_type("application/x-www-form-urlencoded");
        let form = body.form().unwrap();
        assert_eq!(form["name"], "Jane Doe");
        assert_eq!(form["tag"], "a&b");
        assert!(Body::from_string("x").form().is_none());
    }

    #[test]
    fn body_exposes_raw_bytes_and_type() {
        let body = Body::from_bytes(vec![0xde, 0xad]);
        assert_eq!(body.content_type(), "application/octet-stream");
        assert_eq!(body.as_bytes(), [0xde, 0xad]);
        assert!(!body.is_empty());
        assert_eq!(Body::from_string("hi").as_string(), "hi");
    }

    #[test]
    fn json_body_needs_a_json_content_type() {
        #[derive(serde::Deserialize)]
        struct Item {
            name: String,
            qty: u32,
        }

        let body = Body::from_string(r#"{"name":"bolt","qty":3}"#)
            .with_content_type("application/json; charset=utf-8");
        let item: Item = body.json().unwrap();
        assert_eq!(item.name, "bolt");
        assert_eq!(item.qty, 3);

        let untyped = Body::from_string(r#"{"name":"bolt","qty":3}"#);
        assert!(untyped.json::<Item>().is_none());
        let broken = Body::from_string("{").with_content_type("application/json");
        assert!(broken.json::<Item>().is_none());
    }
}
