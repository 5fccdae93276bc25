//! Object-model configuration.
//!
//! Resolved once at startup (see [`crate::init_runtime`]) and read without
//! locking afterwards.

use std::sync::OnceLock;
use tracing::warn;

/// Environment variable overriding [`RuntimeConfig::max_sequence_length`].
pub const ENV_MAX_SEQUENCE_LENGTH: &str = "EMBER_MAX_SEQUENCE_LENGTH";

/// Environment variable overriding [`RuntimeConfig::max_suspension_resumes`].
pub const ENV_MAX_SUSPENSION_RESUMES: &str = "EMBER_MAX_SUSPENSION_RESUMES";

// =============================================================================
// Runtime Configuration
// =============================================================================

/// Tunables for the object model.
///
/// # Example
///
/// ```
/// use ember_runtime::config::RuntimeConfig;
///
/// let config = RuntimeConfig {
///     max_sequence_length: 1 << 20,
///     ..Default::default()
/// };
/// assert_eq!(config.max_suspension_resumes, 10_000);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeConfig {
    /// Largest number of elements a tuple repetition or concatenation may
    /// produce. Larger results fail with an overflow error.
    ///
    /// Default: `isize::MAX`
    pub max_sequence_length: usize,

    /// How many times a suspension is resumed synchronously when the
    /// caller did not allow suspension, before giving up.
    ///
    /// Default: 10 000
    pub max_suspension_resumes: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            max_sequence_length: isize::MAX as usize,
            max_suspension_resumes: 10_000,
        }
    }
}

impl RuntimeConfig {
    /// Defaults overridden by `EMBER_*` environment variables.
    ///
    /// Malformed values are ignored with a warning.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(n) = Self::env_usize(ENV_MAX_SEQUENCE_LENGTH) {
            config.max_sequence_length = n;
        }
        if let Some(n) = Self::env_usize(ENV_MAX_SUSPENSION_RESUMES) {
            config.max_suspension_resumes = n;
        }
        config
    }

    fn env_usize(name: &str) -> Option<usize> {
        let raw = std::env::var(name).ok()?;
        Self::parse_usize(name, &raw)
    }

    fn parse_usize(name: &str, raw: &str) -> Option<usize> {
        match raw.trim().parse::<usize>() {
            Ok(n) => Some(n),
            Err(_) => {
                warn!(variable = name, value = raw, "ignoring malformed configuration value");
                None
            }
        }
    }
}

// =============================================================================
// Global Configuration
// =============================================================================

static RUNTIME_CONFIG: OnceLock<RuntimeConfig> = OnceLock::new();

/// Install the process-wide configuration.
///
/// Returns `false` if a configuration was already installed (or already
/// read, which installs the defaults).
pub fn install(config: RuntimeConfig) -> bool {
    RUNTIME_CONFIG.set(config).is_ok()
}

/// Get the process-wide configuration, installing defaults on first use.
pub fn runtime_config() -> &'static RuntimeConfig {
    RUNTIME_CONFIG.get_or_init(RuntimeConfig::default)
}
