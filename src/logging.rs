use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Installs a global `fmt` subscriber. `RUST_LOG` wins when set; otherwise the
/// crate logs at `info` with console logging enabled and `warn` without.
///
/// Safe to call more than once: later calls leave the first subscriber alone.
pub fn init(show_console_log: bool) {
    let fallback = if show_console_log {
        "axeon_mvc=info"
    } else {
        "axeon_mvc=warn"
    };
    let _ = tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| fallback.into()))
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}
