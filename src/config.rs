//! Environment-driven configuration for the core, `OPSGATE_*` variables with
//! sensible defaults so a bare start works.

use std::path::PathBuf;
use std::time::Duration;

use tracing::warn;

pub const DEFAULT_WARNING_THRESHOLD_SECS: u64 = 5 * 60;
pub const DEFAULT_ATTEST_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_ATTEST_BACKOFF_MS: u64 = 1000;
pub const DEFAULT_VAULT_PATH: &str = "opsgate_session.json";

#[derive(Debug, Clone)]
pub struct CoreConfig {
    /// Window before expiry inside which the arm-time warning fires.
    pub warning_threshold: Duration,
    pub attest_max_attempts: u32,
    pub attest_backoff: Duration,
    /// Durable-tier file for the remembered credential.
    pub vault_path: PathBuf,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            warning_threshold: Duration::from_secs(DEFAULT_WARNING_THRESHOLD_SECS),
            attest_max_attempts: DEFAULT_ATTEST_MAX_ATTEMPTS,
            attest_backoff: Duration::from_millis(DEFAULT_ATTEST_BACKOFF_MS),
            vault_path: PathBuf::from(DEFAULT_VAULT_PATH),
        }
    }
}

fn env_parse<T: std::str::FromStr>(name: &str, default: T) -> T {
    match std::env::var(name) {
        Ok(raw) => raw.parse().unwrap_or_else(|_| {
            warn!(var = name, value = %raw, "unparsable value, using default");
            default
        }),
        Err(_) => default,
    }
}

impl CoreConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            warning_threshold: Duration::from_secs(env_parse(
                "OPSGATE_WARNING_THRESHOLD_SECS",
                DEFAULT_WARNING_THRESHOLD_SECS,
            )),
            attest_max_attempts: env_parse(
                "OPSGATE_ATTEST_MAX_ATTEMPTS",
                DEFAULT_ATTEST_MAX_ATTEMPTS,
            ),
            attest_backoff: Duration::from_millis(env_parse(
                "OPSGATE_ATTEST_BACKOFF_MS",
                DEFAULT_ATTEST_BACKOFF_MS,
            )),
            vault_path: std::env::var("OPSGATE_VAULT_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.vault_path),
        }
    }
}
