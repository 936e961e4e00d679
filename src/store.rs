use std::fs;

use camino::{Utf8Path, Utf8PathBuf};
use directories::BaseDirs;

use crate::error::PipelineError;

/// Table-scoped locations for downloaded artifacts.
///
/// Every table writes to its own path under the base directory, so pipelines
/// for independent tables never collide.
#[derive(Debug, Clone)]
pub struct Store {
    base: Utf8PathBuf,
}

impl Store {
    pub fn new() -> Result<Self, PipelineError> {
        let base = BaseDirs::new()
            .and_then(|dirs| {
                Utf8PathBuf::from_path_buf(dirs.home_dir().join(".cache").join("opentecr-pipeline"))
                    .ok()
            })
            .ok_or_else(|| {
                PipelineError::Filesystem("unable to resolve cache directory".to_string())
            })?;
        Ok(Self { base })
    }

    pub fn new_with_base(base: Utf8PathBuf) -> Self {
        Self { base }
    }

    pub fn base(&self) -> &Utf8Path {
        &self.base
    }

    pub fn ensure_base(&self) -> Result<(), PipelineError> {
        fs::create_dir_all(self.base.as_std_path())
            .map_err(|err| PipelineError::Filesystem(err.to_string()))
    }

    /// Destination for one exported spreadsheet sheet.
    pub fn sheet_path(&self, gid: &str) -> Utf8PathBuf {
        self.base.join(format!("{gid}.xlsx"))
    }

    /// Destination for one compressed MetaNetX table.
    pub fn mnx_table_path(&self, table: &str) -> Utf8PathBuf {
        self.base.join(format!("{table}.zst"))
    }
}
