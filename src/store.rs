use std::fs;
use std::io::Write;
use std::path::Path;

use camino::{Utf8Path, Utf8PathBuf};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tempfile::Builder;

use crate::error::KiraError;

#[derive(Debug, Clone)]
pub struct Store {
    root: Utf8PathBuf,
}

impl Store {
    pub fn new(root: impl Into<Utf8PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn from_path(path: &Path) -> Result<Self, KiraError> {
        let root = Utf8PathBuf::from_path_buf(path.to_path_buf())
            .map_err(|_| KiraError::Filesystem(format!("non UTF-8 path: {}", path.display())))?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    pub fn file_path(&self, filename: &str) -> Utf8PathBuf {
        self.root.join(filename)
    }

    pub fn pathway_names_path(&self) -> Utf8PathBuf {
        self.root.join("pathway_names.json")
    }

    pub fn targets_path(&self) -> Utf8PathBuf {
        self.root.join("targets.txt")
    }

    pub fn manifest_path(&self) -> Utf8PathBuf {
        self.root.join("run.json")
    }

    pub fn checkpoint_path(&self) -> Utf8PathBuf {
        self.root.join("checkpoint.json")
    }

    pub fn ensure_root(&self) -> Result<(), KiraError> {
        fs::create_dir_all(self.root.as_std_path())
            .map_err(|err| KiraError::Filesystem(err.to_string()))
    }

    pub fn write_bytes_atomic(path: &Utf8Path, content: &[u8]) -> Result<(), KiraError> {
        let parent = path
            .parent()
            .ok_or_else(|| KiraError::Filesystem(format!("invalid destination path {path}")))?;
        fs::create_dir_all(parent.as_std_path())
            .map_err(|err| KiraError::Filesystem(err.to_string()))?;
        let mut temp = Builder::new()
            .prefix("kira-pm-file")
            .tempfile_in(parent.as_std_path())
            .map_err(|err| KiraError::Filesystem(err.to_string()))?;
        temp.write_all(content)
            .map_err(|err| KiraError::Filesystem(err.to_string()))?;
        temp.persist(path.as_std_path())
            .map_err(|err| KiraError::Filesystem(format!("{path}: {}", err.error)))?;
        Ok(())
    }

    pub fn write_json<T: Serialize + ?Sized>(path: &Utf8Path, value: &T) -> Result<(), KiraError> {
        let content = serde_json::to_vec_pretty(value)
            .map_err(|err| KiraError::Filesystem(err.to_string()))?;
        Self::write_bytes_atomic(path, &content)
    }

    pub fn read_bytes(path: &Utf8Path) -> Result<Vec<u8>, KiraError> {
        fs::read(path.as_std_path())
            .map_err(|err| KiraError::Filesystem(format!("read {path}: {err}")))
    }

    pub fn read_json<T: DeserializeOwned>(path: &Utf8Path) -> Result<T, KiraError> {
        let content = Self::read_bytes(path)?;
        serde_json::from_slice(&content)
            .map_err(|err| KiraError::parse_failure(path.to_string(), err.to_string()))
    }

    pub fn remove_if_exists(path: &Utf8Path) -> Result<(), KiraError> {
        if path.as_std_path().exists() {
            fs::remove_file(path.as_std_path())
                .map_err(|err| KiraError::Filesystem(err.to_string()))?;
        }
        Ok(())
    }
}
