use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// Directory constants
// ---------------------------------------------------------------------------

pub const CMDFLOW_DIR: &str = ".cmdflow";

pub const CONFIG_FILE: &str = ".cmdflow/config.yaml";
pub const DB_FILE: &str = ".cmdflow/cmdflow.db";

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

pub fn cmdflow_dir(root: &Path) -> PathBuf {
    root.join(CMDFLOW_DIR)
}

pub fn config_path(root: &Path) -> PathBuf {
    root.join(CONFIG_FILE)
}

pub fn db_path(root: &Path) -> PathBuf {
    root.join(DB_FILE)
}
