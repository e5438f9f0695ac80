pub(crate) mod request;
pub(crate) mod response;

pub use request::{Body, Method, Request};
pub use response::Response;
pub(crate) use request::{normalize_path, parse_cookies};
