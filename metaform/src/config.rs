//! Engine configuration loaded through Figment.
//!
//! Sources, later overriding earlier:
//! 1. Built-in defaults
//! 2. `metaform.toml`, `metaform.yaml`, `metaform.json` in the given directory
//! 3. `METAFORM_`-prefixed environment variables

use std::path::Path;
use std::time::Duration;

use figment::{
    providers::{Env, Format, Json, Serialized, Toml, Yaml},
    Figment,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Result;

/// Basename of the configuration files looked up by [`EngineConfig::load_from_dir`].
pub const CONFIG_FILE_STEM: &str = "metaform";

/// Environment variable prefix.
pub const ENV_PREFIX: &str = "METAFORM_";

/// Behavioural switches for a form session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Only re-run providers whose declared inputs include the changed field.
    /// Providers without declared inputs always re-run.
    pub scoped_option_refresh: bool,

    /// Per-invocation provider time limit in milliseconds. Unset means no limit.
    pub provider_timeout_ms: Option<u64>,

    /// Validate the changed field on every value change.
    pub validate_on_change: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            scoped_option_refresh: false,
            provider_timeout_ms: None,
            validate_on_change: true,
        }
    }
}

impl EngineConfig {
    /// Load from the current directory and environment.
    pub fn load() -> Result<Self> {
        Self::load_from_dir(Path::new("."))
    }

    /// Load from configuration files in `dir` and the environment.
    pub fn load_from_dir(dir: &Path) -> Result<Self> {
        let config: Self = Self::figment(dir).extract()?;
        debug!(?config, dir = %dir.display(), "engine configuration loaded");
        Ok(config)
    }

    fn figment(dir: &Path) -> Figment {
        Figment::new()
            .merge(Serialized::defaults(Self::default()))
            .merge(Toml::file(dir.join(format!("{CONFIG_FILE_STEM}.toml"))))
            .merge(Yaml::file(dir.join(format!("{CONFIG_FILE_STEM}.yaml"))))
            .merge(Json::file(dir.join(format!("{CONFIG_FILE_STEM}.json"))))
            .merge(Env::prefixed(ENV_PREFIX).map(|key| key.as_str().to_lowercase().into()))
    }

    pub fn provider_timeout(&self) -> Option<Duration> {
        self.provider_timeout_ms.map(Duration::from_millis)
    }

    pub fn with_scoped_option_refresh(mut self, scoped: bool) -> Self {
        self.scoped_option_refresh = scoped;
        self
    }

    pub fn with_provider_timeout(mut self, timeout: Duration) -> Self {
        self.provider_timeout_ms = Some(u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX));
        self
    }

    pub fn with_validate_on_change(mut self, validate: bool) -> Self {
        self.validate_on_change = validate;
        self
    }
}
