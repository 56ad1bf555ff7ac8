#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use tempfile::{TempDir, tempdir};

/// Returns the absolute path to a fixture under `tests/data`.
pub fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("data")
        .join(name)
}

/// Scratch directory helper that cleans up files automatically on drop.
pub struct TestWorkspace {
    temp_dir: TempDir,
}

impl TestWorkspace {
    pub fn new() -> Self {
        Self {
            temp_dir: tempdir().expect("temp dir"),
        }
    }

    /// Returns the root path for all files owned by this workspace.
    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Writes `contents` into a file under the workspace and returns the path.
    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        self.write_bytes(name, contents.as_bytes())
    }

    pub fn write_bytes(&self, name: &str, contents: &[u8]) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        fs::write(&path, contents).expect("write temp file contents");
        path
    }

    /// Writes a CSV with an `id,name,city` header and `rows` generated data rows.
    pub fn write_people_csv(&self, name: &str, rows: usize) -> PathBuf {
        let mut contents = String::from("id,name,city\n");
        for idx in 0..rows {
            contents.push_str(&format!("{},person{},city{}\n", idx + 1, idx, idx % 3));
        }
        self.write(name, &contents)
    }
}

/// Two title rows ahead of the real header, the second one numeric.
pub const TITLED_CSV: &str = "\
Quarterly report,,
2024,1,2
id,name,city
1,Ann,Oslo
2,Bo,null
3,Cy,
";
