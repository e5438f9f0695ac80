use crate::error::ConfigError;
use crate::interceptor::HttpError;
use crate::http::Response;
use crate::middleware::{Middleware, MiddlewareChain};
use crate::views::ViewEngine;
use serde::Deserialize;
use std::path::PathBuf;
use std::sync::Arc;

pub type ErrorHandler = Arc<dyn Fn(HttpError) -> Response + Send + Sync>;

/// Decides whether error responses carry diagnostic detail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    #[serde(alias = "dev")]
    Development,
    #[serde(alias = "prod")]
    Production,
}

impl Environment {
    /// Reads `AXEON_ENV`; anything but `production`/`prod` is development.
    pub fn from_env() -> Self {
        match std::env::var("AXEON_ENV") {
            Ok(value) => Self::parse(&value),
            Err(_) => Environment::Development,
        }
    }

    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "production" | "prod" => Environment::Production,
            _ => Environment::Development,
        }
    }

    pub fn is_development(&self) -> bool {
        *self == Environment::Development
    }
}

/// Plain-data subset of [`EngineOptions`] that can be loaded from JSON.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub view_path: Option<PathBuf>,
    pub static_file_path: Option<PathBuf>,
    pub show_console_log: bool,
    pub default_page: Option<String>,
    pub environment: Option<Environment>,
    pub max_connections: Option<usize>,
}

/// Process-wide configuration, fixed once the router is composed.
#[derive(Clone)]
pub struct EngineOptions {
    pub view_path: PathBuf,
    pub view_engine: Option<Arc<dyn ViewEngine>>,
    pub static_file_path: Option<PathBuf>,
    pub show_console_log: bool,
    /// Global chain, run ahead of every binding.
    pub middlewares: MiddlewareChain,
    /// Route name served at `GET /`.
    pub default_page: Option<String>,
    pub error_handler: Option<ErrorHandler>,
    pub environment: Environment,
    pub max_connections: usize,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            view_path: PathBuf::from("views"),
            view_engine: None,
            static_file_path: None,
            show_console_log: false,
            middlewares: MiddlewareChain::new(),
            default_page: None,
            error_handler: None,
            environment: Environment::from_env(),
            max_connections: 256,
        }
    }
}

impl EngineOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_settings(settings: Settings) -> Self {
        let defaults = Self::default();
        Self {
            view_path: settings.view_path.unwrap_or(defaults.view_path),
            static_file_path: settings.static_file_path,
            show_console_log: settings.show_console_log,
            default_page: settings.default_page,
            environment: settings.environment.unwrap_or(defaults.environment),
            max_connections: settings.max_connections.unwrap_or(defaults.max_connections),
            ..defaults
        }
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let settings: Settings = serde_json::from_str(json)?;
        Ok(Self::from_settings(settings))
    }

    pub fn view_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.view_path = path.into();
        self
    }

    pub fn view_engine(mut self, engine: impl ViewEngine) -> Self {
        self.view_engine = Some(Arc::new(engine));
        self
    }

    pub fn static_file_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.static_file_path = Some(path.into());
        self
    }

    pub fn show_console_log(mut self, enabled: bool) -> Self {
        self.show_console_log = enabled;
        self
    }

    pub fn middleware(mut self, middleware: impl Middleware) -> Self {
        self.middlewares.add(middleware);
        self
    }

    pub fn default_page(mut self, route: &str) -> Self {
        self.default_page = Some(route.to_string());
        self
    }

    pub fn error_handler<F>(mut self, handler: F) -> Self
    where
        F: Fn(HttpError) -> Response + Send + Sync + 'static,
    {
        self.error_handler = Some(Arc::new(handler));
        self
    }

    pub fn environment(mut self, environment: Environment) -> Self {
        self.environment = environment;
        self
    }

    pub fn max_connections(mut self, max_connections: usize) -> Self {
        self.max_connections = max_connections;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settings_use_camel_case_option_names() {
        let options = EngineOptions::from_json(
            r#"{
                "viewPath": "templates",
                "staticFilePath": "public",
                "showConsoleLog": true,
                "defaultPage": "/home/index",
                "environment": "prod",
                "maxConnections": 8
            }"#,
        )
        .unwrap();
        assert_eq!(options.view_path, PathBuf::from("templates"));
        assert_eq!(options.static_file_path, Some(PathBuf::from("public")));
        assert!(options.show_console_log);
        assert_eq!(options.default_page.as_deref(), Some("/home/index"));
        assert_eq!(options.environment, Environment::Production);
        assert_eq!(options.max_connections, 8);
    }

    #[test]
    fn empty_settings_keep_defaults_and_bad_json_is_a_config_error() {
        let options = EngineOptions::from_json("{}").unwrap();
        assert_eq!(options.view_path, PathBuf::from("views"));
        assert!(options.static_file_path.is_none());
        assert!(matches!(
            EngineOptions::from_json("{\"showConsoleLog\": \"yes\"}"),
            Err(ConfigError::Settings(_))
        ));
    }

    #[test]
    fn environment_parse_defaults_to_development() {
        assert_eq!(Environment::parse("Production"), Environment::Production);
        assert_eq!(Environment::parse("staging"), Environment::Development);
    }
}
