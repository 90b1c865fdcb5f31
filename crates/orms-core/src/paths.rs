use crate::types::Orm;
use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// Workspace constants
// ---------------------------------------------------------------------------

pub const CONFIG_FILE: &str = "orm-helper.yaml";
pub const WORKSPACE_MARKER: &str = "pnpm-workspace.yaml";
pub const DEFAULT_PACKAGES_DIR: &str = "packages";
pub const DEFAULT_ENV_FILE: &str = ".env";

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

pub fn config_path(root: &Path) -> PathBuf {
    root.join(CONFIG_FILE)
}

/// `<root>/<packages_dir>/<orm>`, the directory holding the ORM's compose file.
pub fn package_dir(root: &Path, packages_dir: &str, orm: Orm) -> PathBuf {
    root.join(packages_dir).join(orm.as_str())
}
