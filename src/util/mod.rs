//! Utility module
//!
//! This module provides display formatting and logging setup used
//! throughout the library.

use tracing_subscriber::EnvFilter;

use crate::core::{Error, Result};

/// Placeholder shown for a reading that is not a finite number
pub const NOT_FINITE: &str = "---";

/// Formats a reading with a fixed number of decimals and a unit
pub fn format_reading(value: f64, decimals: usize, unit: &str) -> String {
    if value.is_finite() {
        format!("{:.*} {}", decimals, value, unit)
    } else {
        format!("{} {}", NOT_FINITE, unit)
    }
}

/// Formats a reading exactly as received, followed by a unit
pub fn format_verbatim(value: f64, unit: &str) -> String {
    if value.is_finite() {
        format!("{} {}", value, unit)
    } else {
        format!("{} {}", NOT_FINITE, unit)
    }
}

/// Formats seconds as `HH:MM:SS`
pub fn format_uptime(secs: f64) -> String {
    if !secs.is_finite() || secs < 0.0 {
        return "--:--:--".to_string();
    }
    let elapsed = match chrono::Duration::try_seconds(secs as i64) {
        Some(elapsed) => elapsed,
        None => return "--:--:--".to_string(),
    };
    format!(
        "{:02}:{:02}:{:02}",
        elapsed.num_hours(),
        elapsed.num_minutes() % 60,
        elapsed.num_seconds() % 60
    )
}

/// Installs a global fmt subscriber filtered by `RUST_LOG`, falling back to `default_filter`
pub fn init_tracing(default_filter: &str) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_filter))
        .map_err(|e| Error::config(format!("Invalid log filter: {}", e)))?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init()
        .map_err(|e| Error::config(format!("Failed to install subscriber: {}", e)))
}
