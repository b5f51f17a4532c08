//! Client configuration.
//!
//! Read from YAML when a path is given, otherwise defaults; a couple of
//! environment variables override the file.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::backend::TaskBackend;
use crate::controller::PollOptions;
use crate::error::{AppError, AppResult};
use crate::http::{DEFAULT_BASE_URL, HttpBackend};
use crate::simulated::{DEFAULT_STEP, SimulatedBackend, SimulationOptions};

pub const ENV_API_URL: &str = "CONDENSERFLOW_API_URL";
pub const ENV_POLL_MS: &str = "CONDENSERFLOW_POLL_MS";

pub const DEFAULT_POLL_INTERVAL_MS: u64 = 800;
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;
pub const DEFAULT_RESULTS_DIR: &str = ".condenserflow/results";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BackendConfig {
    Http {
        base_url: String,
        #[serde(default = "default_timeout_ms")]
        timeout_ms: u64,
    },
    Simulated {
        #[serde(default = "default_step")]
        step: u8,
        #[serde(default)]
        fail_at_progress: Option<u8>,
    },
}

impl Default for BackendConfig {
    fn default() -> Self {
        BackendConfig::Http {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }
}

impl BackendConfig {
    pub fn simulated() -> Self {
        BackendConfig::Simulated {
            step: DEFAULT_STEP,
            fail_at_progress: None,
        }
    }
}

fn default_timeout_ms() -> u64 {
    DEFAULT_TIMEOUT_MS
}

fn default_step() -> u8 {
    DEFAULT_STEP
}

fn default_poll_interval_ms() -> u64 {
    DEFAULT_POLL_INTERVAL_MS
}

fn default_results_dir() -> PathBuf {
    PathBuf::from(DEFAULT_RESULTS_DIR)
}

fn default_max_poll_failures() -> Option<u32> {
    Some(10)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_results_dir")]
    pub results_dir: PathBuf,
    /// Consecutive failed polls tolerated before the CLI stops waiting.
    #[serde(default = "default_max_poll_failures")]
    pub max_poll_failures: Option<u32>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            backend: BackendConfig::default(),
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            results_dir: default_results_dir(),
            max_poll_failures: default_max_poll_failures(),
        }
    }
}

impl ClientConfig {
    /// Load from `path` if given, then apply environment overrides.
    pub fn load(path: Option<&Path>) -> AppResult<Self> {
        let config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.with_overrides(|key| std::env::var(key).ok())
    }

    pub fn from_file(path: &Path) -> AppResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| AppError::FileRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&text)
    }

    pub fn from_yaml(text: &str) -> AppResult<Self> {
        let config: Self =
            serde_yaml::from_str(text).map_err(|err| AppError::Config(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `CONDENSERFLOW_API_URL` and `CONDENSERFLOW_POLL_MS` as reported
    /// by `lookup`. An API url always selects the HTTP backend.
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> AppResult<Self> {
        if let Some(base_url) = lookup(ENV_API_URL).filter(|v| !v.trim().is_empty()) {
            debug!(%base_url, "api url from environment");
            let timeout_ms = match self.backend {
                BackendConfig::Http { timeout_ms, .. } => timeout_ms,
                BackendConfig::Simulated { .. } => DEFAULT_TIMEOUT_MS,
            };
            self.backend = BackendConfig::Http {
                base_url: base_url.trim().to_string(),
                timeout_ms,
            };
        }
        if let Some(raw) = lookup(ENV_POLL_MS) {
            self.poll_interval_ms = raw.trim().parse().map_err(|_| {
                AppError::Config(format!("{ENV_POLL_MS} must be a whole number, got {raw:?}"))
            })?;
        }
        self.validate()?;
        Ok(self)
    }

    fn validate(&self) -> AppResult<()> {
        if self.poll_interval_ms == 0 {
            return Err(AppError::Config(
                "poll_interval_ms must be greater than zero".to_string(),
            ));
        }
        if let BackendConfig::Simulated { step: 0, .. } = self.backend {
            return Err(AppError::Config(
                "simulated step must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    pub fn poll_options(&self) -> PollOptions {
        PollOptions {
            interval: Duration::from_millis(self.poll_interval_ms),
            max_consecutive_failures: self.max_poll_failures,
        }
    }

    pub fn build_backend(&self) -> AppResult<Arc<dyn TaskBackend>> {
        Ok(match &self.backend {
            BackendConfig::Http {
                base_url,
                timeout_ms,
            } => Arc::new(HttpBackend::new(
                base_url,
                Duration::from_millis(*timeout_ms),
            )?),
            BackendConfig::Simulated {
                step,
                fail_at_progress,
            } => Arc::new(SimulatedBackend::new(SimulationOptions {
                step: *step,
                fail_at_progress: *fail_at_progress,
            })),
        })
    }
}
