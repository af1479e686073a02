use tracing_subscriber::{fmt, EnvFilter};

/// Initialize process logging.
///
/// Uses the `RUST_LOG` environment variable if set, otherwise falls back to
/// `default_level` (e.g. "info", "bt_doctor=debug,warn"). With `json` set,
/// output is JSON-formatted for log shippers.
///
/// Safe to call multiple times (e.g. in tests) -- subsequent calls are no-ops.
pub fn init(service_name: &str, default_level: &str, json: bool) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    if json {
        fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .with_level(true)
            .try_init()
            .ok();
    } else {
        fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_level(true)
            .try_init()
            .ok();
    }

    tracing::info!(service = service_name, json, "logging initialised");
}
