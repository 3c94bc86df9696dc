use std::path::PathBuf;

use crate::error::{ConsentError, ConsentResult};
use crate::storage::KvStore;

/// Stores each key as `<root>/<key>.json`.
#[derive(Debug, Clone)]
pub struct FileKvStore {
    root: PathBuf,
}

impl FileKvStore {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    fn build_path(&self, key: &str) -> ConsentResult<PathBuf> {
        validate_key(key)?;
        let mut filename = key.to_string();
        if !filename.ends_with(".json") {
            filename.push_str(".json");
        }
        Ok(self.root.join(filename))
    }

    fn ensure_root_dir(&self) -> ConsentResult<()> {
        std::fs::create_dir_all(&self.root).map_err(|error| {
            ConsentError::StorageUnavailable(format!(
                "failed to create storage directory {}: {error}",
                self.root.display()
            ))
        })
    }
}

impl KvStore for FileKvStore {
    fn get(&self, key: &str) -> ConsentResult<Option<String>> {
        let path = self.build_path(key)?;
        match std::fs::read_to_string(&path) {
            Ok(data) => Ok(Some(data)),
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(error) => Err(ConsentError::Io(error)),
        }
    }

    fn set(&self, key: &str, value: &str) -> ConsentResult<()> {
        let path = self.build_path(key)?;
        self.ensure_root_dir()?;
        std::fs::write(&path, value)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> ConsentResult<bool> {
        let path = self.build_path(key)?;
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(error) => Err(ConsentError::Io(error)),
        }
    }
}

fn validate_key(key: &str) -> ConsentResult<()> {
    if key.is_empty() || key == "." || key == ".." {
        return Err(ConsentError::InvalidKey(key.to_string()));
    }
    if key.contains('/') || key.contains('\\') {
        return Err(ConsentError::InvalidKey(key.to_string()));
    }
    Ok(())
}
