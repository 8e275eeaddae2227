//! Runtime configuration.
//!
//! RepCRec's topology (20 variables, 10 sites) is fixed by the
//! specification and lives in `crate::common`; this module only holds
//! the handful of knobs that genuinely vary between runs.

/// CLI-level configuration, derived from the parsed command-line
/// arguments in `main`.
#[derive(Debug, Clone)]
pub struct Config {
    /// Emit `tracing` diagnostics at debug level instead of just warn/error.
    pub verbose: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self { verbose: false }
    }
}

/// Installs the `tracing_subscriber` formatter used for all diagnostic
/// (non-operation-result) output.
pub fn init_logging(config: &Config) {
    let level = if config.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };

    let _ = tracing_subscriber::fmt()
        .with_target(false)
        .with_level(true)
        .with_max_level(level)
        .try_init();
}
