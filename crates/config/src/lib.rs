//! Configuration for the `iphoto` command.
//!
//! Sources, later ones overriding earlier ones:
//! 1. built-in defaults,
//! 2. `config.toml` in the user's configuration directory (if present),
//! 3. an explicitly given file (TOML, YAML or JSON, by extension),
//! 4. `IPHOTO_*` environment variables (e.g. `IPHOTO_CONCURRENCY=8`).

pub mod error;

use crate::error::{ErrorKind, Result};
use directories::ProjectDirs;
use exn::ResultExt;
use figment::Figment;
use figment::providers::{Env, Format, Json, Serialized, Toml, Yaml};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const APPLICATION: &str = "iphoto";
const CONFIG_FILE: &str = "config.toml";
const ENV_PREFIX: &str = "IPHOTO_";
const DEFAULT_CONCURRENCY: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Where zipped libraries have their database files staged. The system
    /// temporary directory when unset.
    pub staging_dir: Option<PathBuf>,
    /// How many media files are read at once.
    pub concurrency: usize,
}
impl Default for Config {
    fn default() -> Self {
        Self {
            staging_dir: None,
            concurrency: DEFAULT_CONCURRENCY,
        }
    }
}

impl Config {
    /// Load and validate the configuration.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let user = ProjectDirs::from("", "", APPLICATION).map(|dirs| dirs.config_dir().join(CONFIG_FILE));
        Self::load_from(user.as_deref(), explicit)
    }

    fn load_from(user: Option<&Path>, explicit: Option<&Path>) -> Result<Self> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));
        if let Some(user) = user {
            tracing::debug!(path = %user.display(), "Reading user configuration (if present)");
            figment = figment.merge(Toml::file(user));
        }
        if let Some(explicit) = explicit {
            if !explicit.is_file() {
                exn::bail!(ErrorKind::NotFound(explicit.to_path_buf()));
            }
            figment = match explicit.extension().and_then(|ext| ext.to_str()) {
                Some("yaml" | "yml") => figment.merge(Yaml::file(explicit)),
                Some("json") => figment.merge(Json::file(explicit)),
                _ => figment.merge(Toml::file(explicit)),
            };
        }
        let config: Self = figment.merge(Env::prefixed(ENV_PREFIX)).extract().or_raise(|| ErrorKind::Load)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.concurrency == 0 {
            exn::bail!(ErrorKind::Invalid("concurrency must be at least 1".to_string()));
        }
        if let Some(staging_dir) = &self.staging_dir
            && !staging_dir.is_dir()
        {
            exn::bail!(ErrorKind::Invalid(format!(
                "staging directory {} is not a directory",
                staging_dir.display()
            )));
        }
        Ok(())
    }
}
