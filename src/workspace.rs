//! Output-folder layout shared by ingestion jobs.
//!
//! ```text
//! <base>/raw               uploaded files as received
//! <base>/processed         cleaned tables (processed_<name>.csv)
//! <base>/mapped
//! <base>/result
//! <base>/formatted_result
//! <base>/combined_result
//! ```

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result, anyhow};
use log::debug;

use crate::{data::CleanedTable, io_utils};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderLayout {
    pub base: PathBuf,
    pub raw: PathBuf,
    pub processed: PathBuf,
    pub mapped: PathBuf,
    pub result: PathBuf,
    pub formatted_result: PathBuf,
    pub combined_result: PathBuf,
}

impl FolderLayout {
    pub fn new(base: &Path) -> Self {
        Self {
            base: base.to_path_buf(),
            raw: base.join("raw"),
            processed: base.join("processed"),
            mapped: base.join("mapped"),
            result: base.join("result"),
            formatted_result: base.join("formatted_result"),
            combined_result: base.join("combined_result"),
        }
    }

    fn folders(&self) -> [&Path; 7] {
        [
            self.base.as_path(),
            self.raw.as_path(),
            self.processed.as_path(),
            self.mapped.as_path(),
            self.result.as_path(),
            self.formatted_result.as_path(),
            self.combined_result.as_path(),
        ]
    }

    /// Creates every folder of the layout that does not exist yet.
    pub fn ensure(&self) -> Result<()> {
        for folder in self.folders() {
            fs::create_dir_all(folder)
                .with_context(|| format!("Creating folder {folder:?}"))?;
        }
        Ok(())
    }

    /// Stores uploaded bytes under `raw/`, keeping only the file name component.
    pub fn save_upload(&self, bytes: &[u8], filename: &str) -> Result<PathBuf> {
        let name = Path::new(filename)
            .file_name()
            .ok_or_else(|| anyhow!("Upload file name '{filename}' has no file component"))?;
        self.ensure()?;
        let path = self.raw.join(name);
        fs::write(&path, bytes).with_context(|| format!("Writing upload to {path:?}"))?;
        debug!("Stored {} byte upload at {:?}", bytes.len(), path);
        Ok(path)
    }

    pub fn processed_path(&self, name: &str) -> PathBuf {
        self.processed.join(format!("processed_{name}.csv"))
    }

    pub fn save_processed(&self, table: &CleanedTable, name: &str) -> Result<PathBuf> {
        self.ensure()?;
        let path = self.processed_path(name);
        io_utils::write_table_to_path(&path, table)
            .with_context(|| format!("Saving processed table to {path:?}"))?;
        Ok(path)
    }
}
