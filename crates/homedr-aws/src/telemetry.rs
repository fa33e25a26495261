//! Tracing subscriber setup shared by the binaries.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Environment variable selecting the log format (`json` or plain).
pub const LOG_FORMAT_ENV: &str = "HOMEDR_LOG_FORMAT";

/// Install the global subscriber. `RUST_LOG` filters, defaulting to `info`.
pub fn init() {
    let json = std::env::var(LOG_FORMAT_ENV)
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(json.then(|| fmt::layer().json().with_current_span(false)))
        .with((!json).then(|| fmt::layer().with_ansi(false)))
        .with(filter)
        .init();
}
