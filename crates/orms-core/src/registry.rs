//! The ORM → service mapping, built once per process.

use crate::config::{Config, ToolsConfig};
use crate::paths;
use crate::types::Orm;
use std::path::{Path, PathBuf};

/// One row of the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrmEntry {
    pub orm: Orm,
    /// Package name passed to `pnpm --filter`, e.g. `@rd-node-orms/prisma-service`.
    pub service_name: String,
    /// Directory holding the ORM's compose file.
    pub package_dir: PathBuf,
}

/// Immutable lookup table from ORM identifier to its service and package
/// directory. Construct it at startup and pass it to the planner.
#[derive(Debug, Clone)]
pub struct ServiceRegistry {
    root: PathBuf,
    env_file: String,
    tools: ToolsConfig,
    entries: Vec<OrmEntry>,
}

impl ServiceRegistry {
    pub fn new(root: &Path, config: &Config) -> Self {
        let entries = Orm::ALL
            .into_iter()
            .map(|orm| OrmEntry {
                orm,
                service_name: format!("{}/{}-service", config.service_scope, orm.as_str()),
                package_dir: paths::package_dir(root, &config.packages_dir, orm),
            })
            .collect();
        Self {
            root: root.to_path_buf(),
            env_file: config.env_file.clone(),
            tools: config.tools.clone(),
            entries,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn env_file(&self) -> &str {
        &self.env_file
    }

    pub fn tools(&self) -> &ToolsConfig {
        &self.tools
    }

    pub fn entry(&self, orm: Orm) -> &OrmEntry {
        // `entries` is built from `Orm::ALL`, so the index always matches.
        &self.entries[orm as usize]
    }

    pub fn service_name(&self, orm: Orm) -> &str {
        &self.entry(orm).service_name
    }

    pub fn package_dir(&self, orm: Orm) -> &Path {
        &self.entry(orm).package_dir
    }
}
