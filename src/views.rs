use crate::error::ServerResult;
use serde_json::Value;
use std::path::Path;

/// View-rendering collaborator. The dispatch layer only hands it a view
/// name, the configured view directory and a JSON model.
pub trait ViewEngine: Send + Sync + 'static {
    fn render(&self, view_path: &Path, view: &str, model: &Value) -> ServerResult<String>;
}

impl<F> ViewEngine for F
where
    F: Fn(&Path, &str, &Value) -> ServerResult<String> + Send + Sync + 'static,
{
    fn render(&self, view_path: &Path, view: &str, model: &Value) -> ServerResult<String> {
        (self)(view_path, view, model)
    }
}
