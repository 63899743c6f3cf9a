use std::path::{Path, PathBuf};

/// Temporary directory that is removed when dropped. Files are written
/// relative to its root, creating the missing parent directories.
pub struct FixtureDir {
    dir: tempfile::TempDir,
}

impl FixtureDir {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("BUG: failed to create a temp dir");
        Self { dir }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn join(&self, relative: impl AsRef<Path>) -> PathBuf {
        self.dir.path().join(relative)
    }

    pub fn write(&self, relative: impl AsRef<Path>, contents: impl AsRef<[u8]>) -> PathBuf {
        let path = self.join(relative);
        if let Some(parent) = path.parent() {
            fs_err::create_dir_all(parent).unwrap();
        }
        fs_err::write(&path, contents).unwrap();
        path
    }

    pub fn write_json(&self, relative: impl AsRef<Path>, value: &serde_json::Value) -> PathBuf {
        self.write(relative, serde_json::to_vec_pretty(value).unwrap())
    }
}

impl Default for FixtureDir {
    fn default() -> Self {
        Self::new()
    }
}
