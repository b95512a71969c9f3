//! Logging setup for the broker binary and tests.

use std::str::FromStr;

use tracing::Level;

/// Parses a level name (`error`, `warn`, `info`, `debug`, `trace`, any case).
/// Anything else maps to `info`.
pub fn parse_level(name: &str) -> Level {
    match name.trim().to_lowercase().as_str() {
        "warning" => Level::WARN,
        other => Level::from_str(other).unwrap_or(Level::INFO),
    }
}

/// Installs the global fmt subscriber at `level`. Returns `false` if one
/// was already installed, which is expected when tests call this repeatedly.
pub fn init(level: &str) -> bool {
    tracing_subscriber::fmt()
        .with_max_level(parse_level(level))
        .with_target(false)
        .try_init()
        .is_ok()
}
