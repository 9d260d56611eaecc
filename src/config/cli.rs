use crate::core::Storage;
use crate::utils::error::Result;
use std::fs;
use std::path::{Path, PathBuf};

/// Reads programs from disk, relative to a base directory.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    base_path: PathBuf,
}

impl LocalStorage {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }
}

impl Storage for LocalStorage {
    fn read_source(&self, path: &str) -> Result<String> {
        let full_path = Path::new(&self.base_path).join(path);
        tracing::debug!(path = %full_path.display(), "reading source");
        Ok(fs::read_to_string(full_path)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::error::PlcError;

    #[test]
    fn test_reads_relative_to_base() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("main.plc"), "print(1);").unwrap();

        let storage = LocalStorage::new(dir.path());
        assert_eq!(storage.read_source("main.plc").unwrap(), "print(1);");
        assert!(matches!(
            storage.read_source("missing.plc"),
            Err(PlcError::IoError(_))
        ));
    }
}
