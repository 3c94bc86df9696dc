use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ConsentError, ConsentResult};

pub const DEFAULT_STORAGE_KEY: &str = "cookie-consent";
pub const DEFAULT_PROMPT_DELAY_MS: u64 = 1000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsentConfig {
    /// Key the decision is persisted under. Carries no schema version.
    pub storage_key: String,
    /// Grace period before the banner is surfaced to a user with no decision.
    pub prompt_delay_ms: u64,
    /// Directory for file-backed storage. In-memory storage when unset.
    pub storage_dir: Option<PathBuf>,
}

impl Default for ConsentConfig {
    fn default() -> Self {
        Self {
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            prompt_delay_ms: DEFAULT_PROMPT_DELAY_MS,
            storage_dir: None,
        }
    }
}

impl ConsentConfig {
    pub fn prompt_delay(&self) -> Duration {
        Duration::from_millis(self.prompt_delay_ms)
    }

    pub fn validate(&self) -> ConsentResult<()> {
        if self.storage_key.trim().is_empty() {
            return Err(ConsentError::Config("storage_key must not be empty".to_string()));
        }
        Ok(())
    }

    /// Load a JSON config file. A missing file yields the defaults.
    pub fn load(path: &Path) -> ConsentResult<Self> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "consent config not found; using defaults");
            return Ok(Self::default());
        }

        let data = std::fs::read_to_string(path).map_err(|error| {
            ConsentError::Config(format!(
                "failed to read consent config {}: {error}",
                path.display()
            ))
        })?;
        let config: Self = serde_json::from_str(&data).map_err(|error| {
            ConsentError::Config(format!(
                "failed to parse consent config {}: {error}",
                path.display()
            ))
        })?;
        config.validate()?;
        Ok(config)
    }
}
