//! Tracing subscriber setup
//!
//! Logs go to stderr so command output on stdout stays pipeable.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use crate::core::config::Config;

/// Resolved logging options
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogOptions {
    pub level: String,
    pub json: bool,
}

impl LogOptions {
    /// Config level, raised by `-v` (debug) or lowered by `-q` (error)
    pub fn from_config(config: &Config, verbose: bool, quiet: bool) -> Self {
        let level = if verbose {
            "debug".to_string()
        } else if quiet {
            "error".to_string()
        } else {
            config.log_level().to_string()
        };
        Self {
            level,
            json: config.log_json(),
        }
    }

    /// `RUST_LOG` wins over the configured level
    fn filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(&self.level))
            .unwrap_or_else(|_| EnvFilter::new("warn"))
    }
}

/// Install the global subscriber. A second call is a no-op.
pub fn init(options: &LogOptions) {
    let layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);
    let layer = if options.json {
        layer.json().boxed()
    } else {
        layer.with_target(false).boxed()
    };

    // try_init fails only when a subscriber is already set (tests, re-entry)
    let _ = tracing_subscriber::registry()
        .with(options.filter())
        .with(layer)
        .try_init();
}
