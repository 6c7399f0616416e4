//! Logging initialization.
//!
//! Controlled by `UPLIFT_LOG`:
//! - unset → events at warn and above, human-readable, to stderr
//! - a tracing filter expression (e.g. `debug`, `uplift=trace`) → that filter
//! - `"json"` → JSON events to stderr at the `RUST_LOG` filter (or info)

use tracing_subscriber::EnvFilter;

/// Initialize logging based on `UPLIFT_LOG`. Safe to call once from `main`.
pub fn init() {
    use tracing_subscriber::layer::SubscriberExt as _;
    use tracing_subscriber::util::SubscriberInitExt as _;

    let setting = std::env::var("UPLIFT_LOG").ok();

    if setting.as_deref() == Some("json") {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init();
        return;
    }

    let filter = match setting {
        Some(expr) => EnvFilter::new(expr),
        None => EnvFilter::new("warn"),
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
