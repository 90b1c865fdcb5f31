use crate::error::Result;
use crate::paths;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

// ---------------------------------------------------------------------------
// ToolsConfig
// ---------------------------------------------------------------------------

/// Executable names (or paths) of the external collaborators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolsConfig {
    #[serde(default = "default_docker")]
    pub docker: String,
    #[serde(default = "default_pnpm")]
    pub pnpm: String,
    #[serde(default = "default_dotenv")]
    pub dotenv: String,
    /// Shell used for composed steps such as `db:reset`.
    #[serde(default = "default_shell")]
    pub shell: String,
}

fn default_docker() -> String {
    "docker".to_string()
}

fn default_pnpm() -> String {
    "pnpm".to_string()
}

fn default_dotenv() -> String {
    "dotenv".to_string()
}

fn default_shell() -> String {
    "sh".to_string()
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            docker: default_docker(),
            pnpm: default_pnpm(),
            dotenv: default_dotenv(),
            shell: default_shell(),
        }
    }
}

// ---------------------------------------------------------------------------
// Config (top-level)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Package scope prefixed to every service name passed to `pnpm --filter`.
    #[serde(default = "default_scope")]
    pub service_scope: String,
    #[serde(default = "default_packages_dir")]
    pub packages_dir: String,
    /// Dotenv file loaded for service actions, relative to the workspace root.
    #[serde(default = "default_env_file")]
    pub env_file: String,
    #[serde(default)]
    pub tools: ToolsConfig,
    /// Seconds `dev all` waits after SIGTERM before killing a service.
    #[serde(default = "default_stop_timeout_secs")]
    pub stop_timeout_secs: u64,
}

fn default_scope() -> String {
    "@rd-node-orms".to_string()
}

fn default_packages_dir() -> String {
    paths::DEFAULT_PACKAGES_DIR.to_string()
}

fn default_env_file() -> String {
    paths::DEFAULT_ENV_FILE.to_string()
}

fn default_stop_timeout_secs() -> u64 {
    5
}

impl Default for Config {
    fn default() -> Self {
        Self {
            service_scope: default_scope(),
            packages_dir: default_packages_dir(),
            env_file: default_env_file(),
            tools: ToolsConfig::default(),
            stop_timeout_secs: default_stop_timeout_secs(),
        }
    }
}

impl Config {
    /// Load `orm-helper.yaml` from the workspace root. A missing file yields
    /// the defaults; a malformed one is an error.
    pub fn load(root: &Path) -> Result<Self> {
        let path = paths::config_path(root);
        if !path.exists() {
            return Ok(Self::default());
        }
        let data = std::fs::read_to_string(&path)?;
        if data.trim().is_empty() {
            return Ok(Self::default());
        }
        let cfg: Config = serde_yaml::from_str(&data)?;
        tracing::debug!(path = %path.display(), "loaded config");
        Ok(cfg)
    }

    pub fn stop_timeout(&self) -> Duration {
        Duration::from_secs(self.stop_timeout_secs)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
