// ============================================================================
// src/config.rs – strict config loader (TOML or YAML)
// ============================================================================

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::vault::KdfParams;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StoreCfg {
    /// JSON document holding the password record and private fields
    #[serde(default = "default_store_path")]
    pub path: PathBuf,
}

fn default_store_path() -> PathBuf {
    PathBuf::from("field_vault.json")
}

impl Default for StoreCfg {
    fn default() -> Self {
        Self {
            path: default_store_path(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LogCfg {
    /// tracing `EnvFilter` directive used when `RUST_LOG` is unset
    #[serde(default = "default_log_filter")]
    pub filter: String,
}

fn default_log_filter() -> String {
    "warn".to_string()
}

impl Default for LogCfg {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub store: StoreCfg,
    /// Parameters for newly stored passwords; existing records keep theirs
    #[serde(default)]
    pub kdf: KdfParams,
    #[serde(default)]
    pub log: LogCfg,
}

impl Config {
    pub fn load<P: AsRef<Path>>(p: P) -> Result<Self> {
        let s = fs::read_to_string(&p)
            .with_context(|| format!("read config: {}", p.as_ref().display()))?;
        let cfg = Self::parse(&s, p.as_ref())?;
        cfg.kdf
            .validate()
            .with_context(|| format!("invalid [kdf] in {}", p.as_ref().display()))?;
        Ok(cfg)
    }

    /// Load `p` if given, otherwise the defaults.
    pub fn load_or_default(p: Option<&Path>) -> Result<Self> {
        match p {
            Some(p) => Self::load(p),
            None => Ok(Self::default()),
        }
    }

    fn parse(s: &str, p: &Path) -> Result<Self> {
        let ext = p.extension().and_then(|e| e.to_str());
        let cfg = if matches!(ext, Some("yaml") | Some("yml")) {
            serde_yaml::from_str(s).context("yaml parse")?
        } else {
            toml::from_str(s).context("toml parse")?
        };
        Ok(cfg)
    }
}
