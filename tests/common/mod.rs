#![allow(dead_code)]

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::{TempDir, tempdir};

/// Scratch directory helper that cleans up files automatically on drop.
pub struct TestWorkspace {
    temp_dir: TempDir,
}

impl TestWorkspace {
    /// Creates a fresh scratch directory for the current test case.
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
        let path = self.temp_dir.path().join(name);
        let mut file = File::create(&path).expect("create temp file");
        file.write_all(contents.as_bytes())
            .expect("write temp file contents");
        path
    }
}

/// A small messy export: aliased headers, currency formatting, a duplicate
/// order, one junk date, and inconsistent channel casing.
pub const MESSY_ORDERS_CSV: &str = "\
Order Date,Order ID,Cust ID,Total Amount,Channel,Ad Spend
2024-01-05,o1,c1,\"$1,200.00\",Web,100
2024-01-09,o2,c1,$300.50,web,50
2024-01-09,o2,c1,$999.99,web,50
2024-02-14,o3,c2,€450.00,Email ,75
not-a-date,o4,c3,$80.00,web,10
2024-02-20,o5,c3,$149.50,EMAIL,25
";
