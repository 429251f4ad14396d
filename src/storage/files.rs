use serde::{de::DeserializeOwned, Serialize};
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use uuid::Uuid;
use crate::common::{AttendanceError, Result};

const EXTENSION: &str = "bincode";

/// A directory of bincode files, one record per key.
#[derive(Debug, Clone)]
pub struct RecordDir {
    root: PathBuf,
}

impl RecordDir {
    pub fn open(root: PathBuf) -> Result<Self> {
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn contains(&self, key: &str) -> bool {
        self.path_for(key).exists()
    }

    /// Writes or replaces the record.
    pub fn save<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        let tmp = self.write_temp(value)?;
        fs::rename(&tmp, self.path_for(key)).map_err(|e| {
            let _ = fs::remove_file(&tmp);
            AttendanceError::Io(e)
        })
    }

    /// Writes the record only if the key is free. Returns `false` when it was taken.
    ///
    /// The complete file is hard-linked into place, so the check and the
    /// write happen as one filesystem operation and readers never observe a
    /// half-written record.
    pub fn insert_new<T: Serialize>(&self, key: &str, value: &T) -> Result<bool> {
        let tmp = self.write_temp(value)?;
        let result = fs::hard_link(&tmp, self.path_for(key));
        fs::remove_file(&tmp)?;

        match result {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    pub fn load<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let path = self.path_for(key);
        let data = match fs::read(&path) {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let value = bincode::deserialize(&data)
            .map_err(|e| AttendanceError::Storage(format!("Failed to deserialize {}: {}", path.display(), e)))?;
        Ok(Some(value))
    }

    pub fn load_all<T: DeserializeOwned>(&self) -> Result<Vec<T>> {
        let mut records = Vec::new();

        for entry in fs::read_dir(&self.root)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(EXTENSION) {
                continue;
            }
            let Some(key) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            if let Some(record) = self.load(key)? {
                records.push(record);
            }
        }

        Ok(records)
    }

    pub fn remove(&self, key: &str) -> Result<()> {
        match fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(format!("{}.{}", key, EXTENSION))
    }

    fn write_temp<T: Serialize>(&self, value: &T) -> Result<PathBuf> {
        let encoded = bincode::serialize(value)
            .map_err(|e| AttendanceError::Storage(format!("Failed to serialize: {}", e)))?;

        let tmp = self.root.join(format!(".{}.tmp", Uuid::new_v4()));
        let mut file = fs::File::create(&tmp)?;
        file.write_all(&encoded)?;
        file.sync_all()?;
        Ok(tmp)
    }
}

/// Stable file-name-safe key for a free-form unique value such as an email.
pub fn index_key(value: &str) -> String {
    use sha2::{Digest, Sha256};
    let digest = Sha256::digest(value.trim().to_lowercase().as_bytes());
    format!("{:x}", digest)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_new_refuses_existing_key() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = RecordDir::open(tmp.path().join("records")).unwrap();

        assert!(dir.insert_new("a", &1u32).unwrap());
        assert!(!dir.insert_new("a", &2u32).unwrap());
        assert_eq!(dir.load::<u32>("a").unwrap(), Some(1));
    }

    #[test]
    fn save_replaces_and_load_all_skips_temp_files() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = RecordDir::open(tmp.path().to_path_buf()).unwrap();

        dir.save("x", &"first".to_string()).unwrap();
        dir.save("x", &"second".to_string()).unwrap();
        dir.save("y", &"other".to_string()).unwrap();
        fs::write(tmp.path().join(".stray.tmp"), b"junk").unwrap();

        let mut all: Vec<String> = dir.load_all().unwrap();
        all.sort();
        assert_eq!(all, vec!["other".to_string(), "second".to_string()]);
    }

    #[test]
    fn missing_key_loads_as_none() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = RecordDir::open(tmp.path().to_path_buf()).unwrap();
        assert_eq!(dir.load::<u32>("nope").unwrap(), None);
        dir.remove("nope").unwrap();
    }

    #[test]
    fn index_key_ignores_case_and_whitespace() {
        assert_eq!(index_key(" Ana@School.edu "), index_key("ana@school.edu"));
        assert_ne!(index_key("a@b.c"), index_key("d@e.f"));
    }
}
