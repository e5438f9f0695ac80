use crate::http::{Method, Request, Response};
use crate::middleware::{Middleware, MiddlewareResult, Next};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

/// Serves files below `root` for GET and HEAD. Requests that do not name an
/// existing file pass through to the rest of the chain.
#[derive(Clone, Debug)]
pub struct StaticFiles {
    root: Arc<PathBuf>,
}

impl StaticFiles {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: Arc::new(root.as_ref().to_path_buf()),
        }
    }

    async fn lookup(root: &Path, path: &str) -> Option<PathBuf> {
        let decoded = urlencoding::decode(path).ok()?;
        let candidate = root.join(decoded.trim_start_matches('/'));
        let canonical = tokio::fs::canonicalize(&candidate).await.ok()?;
        let root = tokio::fs::canonicalize(root).await.ok()?;
        if !canonical.starts_with(&root) {
            return None;
        }
        let metadata = tokio::fs::metadata(&canonical).await.ok()?;
        metadata.is_file().then_some(canonical)
    }

    async fn serve(path: &Path) -> Option<Response> {
        let contents = tokio::fs::read(path).await.ok()?;
        let mut response = Response::new(200);
        response.header("Content-Type", content_type(path));
        response.header("Cache-Control", "public, max-age=0");

        if let Ok(metadata) = tokio::fs::metadata(path).await {
            if let Ok(modified) = metadata.modified() {
                response.header("Last-Modified", httpdate::fmt_http_date(modified));
                let secs = modified
                    .duration_since(SystemTime::UNIX_EPOCH)
                    .map(|d| d.as_secs())
                    .unwrap_or(0);
                response.header("ETag", format!("\"{}-{}\"", metadata.len(), secs));
            }
        }

        response.body = contents;
        Some(response)
    }
}

fn content_type(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()) {
        Some("html") | Some("htm") => "text/html",
        Some("css") => "text/css",
        Some("js") => "text/javascript",
        Some("json") => "application/json",
        Some("txt") => "text/plain",
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("svg") => "image/svg+xml",
        Some("ico") => "image/x-icon",
        _ => "application/octet-stream",
    }
}

impl Middleware for StaticFiles {
    fn call(&self, req: Request, next: Next) -> MiddlewareResult {
        let root = Arc::clone(&self.root);
        Box::pin(async move {
            if matches!(req.get_method(), Method::GET | Method::HEAD) {
                if let Some(file) = Self::lookup(&root, &req.path).await {
                    if let Some(response) = Self::serve(&file).await {
                        return Ok(response);
                    }
                }
            }
            next.handle(req).await
        })
    }

    fn name(&self) -> &str {
        "StaticFiles"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ServerError;

    fn fallthrough() -> Next {
        Next::new(|_req| async { Err::<Response, _>(ServerError::NotFound) })
    }

    #[tokio::test]
    async fn serves_existing_file_and_falls_through_otherwise() {
        let dir = std::env::temp_dir().join(format!("axeon-mvc-static-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("site.css"), "body{}").unwrap();
        let files = StaticFiles::new(&dir);

        let hit = files.call(Request::new("GET", "/site.css"), fallthrough()).await.unwrap();
        assert_eq!(hit.body_text(), "body{}");
        assert_eq!(hit.headers["Content-Type"], "text/css");

        let miss = files.call(Request::new("GET", "/missing.css"), fallthrough()).await;
        assert!(matches!(miss, Err(ServerError::NotFound)));

        let post = files.call(Request::new("POST", "/site.css"), fallthrough()).await;
        assert!(matches!(post, Err(ServerError::NotFound)));

        let escape = files.call(Request::new("GET", "/../../etc/passwd"), fallthrough()).await;
        assert!(escape.is_err());

        std::fs::remove_dir_all(&dir).ok();
    }

    #[tokio::test]
    async fn binary_files_are_served_byte_for_byte() {
        let dir = std::env::temp_dir().join(format!("axeon-mvc-static-bin-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let png = [0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a, 0x00, 0xff];
        std::fs::write(dir.join("logo.png"), png).unwrap();

        let hit = StaticFiles::new(&dir)
            .call(Request::new("GET", "/logo.png"), fallthrough())
            .await
            .unwrap();
        assert_eq!(hit.body, png);
        assert_eq!(hit.headers["Content-Type"], "image/png");

        std::fs::remove_dir_all(&dir).ok();
    }
}
