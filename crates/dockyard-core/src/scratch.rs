use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::{debug, warn};

/// Build context directory that is removed when dropped, on every exit path.
///
/// Either a fresh temporary directory or a caller-chosen fixed path.
pub struct ScratchDir {
    path: PathBuf,
    temp: Option<TempDir>,
}

impl ScratchDir {
    pub fn create(fixed: Option<&Path>) -> std::io::Result<Self> {
        match fixed {
            Some(path) => {
                fs::create_dir_all(path)?;
                Ok(Self {
                    path: path.to_path_buf(),
                    temp: None,
                })
            }
            None => {
                let temp = tempfile::Builder::new().prefix("dockyard").tempdir()?;
                Ok(Self {
                    path: temp.path().to_path_buf(),
                    temp: Some(temp),
                })
            }
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for ScratchDir {
    fn drop(&mut self) {
        let result = match self.temp.take() {
            Some(temp) => temp.close(),
            None => fs::remove_dir_all(&self.path),
        };
        match result {
            Ok(()) => debug!("removed scratch dir {}", self.path.display()),
            Err(e) => warn!("failed to remove scratch dir {}: {e}", self.path.display()),
        }
    }
}
