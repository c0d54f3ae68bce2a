pub mod check;
pub mod config;
pub mod detect;
pub mod init;
pub mod insights;
pub mod record;
pub mod suggest;

use anyhow::Context;
use cmdflow_core::config::Config;
use cmdflow_core::{paths, PatternRecognizer, RedbStore};
use std::future::Future;
use std::path::Path;
use std::sync::Arc;

/// Open the project's store and build a recognizer from its config.
pub fn open_recognizer(root: &Path) -> anyhow::Result<PatternRecognizer> {
    let config = Config::load(root).context("failed to load config")?;
    let store = open_store(root)?;
    PatternRecognizer::builder()
        .store(Arc::new(store))
        .config(config.recognizer)
        .build()
        .context("invalid recognizer configuration")
}

pub fn open_store(root: &Path) -> anyhow::Result<RedbStore> {
    let path = paths::db_path(root);
    RedbStore::open(&path).with_context(|| format!("failed to open {}", path.display()))
}

/// Drive an async engine call to completion from the synchronous CLI.
pub fn block_on<F: Future>(fut: F) -> anyhow::Result<F::Output> {
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start tokio runtime")?;
    Ok(rt.block_on(fut))
}
