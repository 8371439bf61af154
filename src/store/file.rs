//! On-disk store: one file per key

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use super::{KeyValueStore, StoreError};

/// A store that keeps each key in its own file under a directory.
///
/// The directory is created on first write. Writes go to a temporary file
/// that is renamed over the target, so a crash mid-write leaves the previous
/// value intact.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(file_name(key))
    }
}

/// Map a key to a safe file name: bytes outside `[A-Za-z0-9_.-]` become `%XX`.
fn file_name(key: &str) -> String {
    let mut name = String::with_capacity(key.len());
    for b in key.bytes() {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'_' | b'-' => name.push(b as char),
            // Keep dots, but never let a key become "." or "..".
            b'.' if key.len() > 2 => name.push('.'),
            _ => name.push_str(&format!("%{:02X}", b)),
        }
    }
    if name.is_empty() {
        name.push('%');
    }
    name
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let path = self.path_for(key);
        match fs::read_to_string(&path) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StoreError::Read { path, source }),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let path = self.path_for(key);
        fs::create_dir_all(&self.dir).map_err(|source| StoreError::Write {
            path: self.dir.clone(),
            source,
        })?;

        let tmp = self.dir.join(format!(".{}.tmp", file_name(key)));
        fs::write(&tmp, value).map_err(|source| StoreError::Write {
            path: tmp.clone(),
            source,
        })?;
        fs::rename(&tmp, &path).map_err(|source| StoreError::Write {
            path: path.clone(),
            source,
        })?;

        tracing::trace!("stored {} bytes at {}", value.len(), path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_name_escaping() {
        assert_eq!(file_name("chatroom_1718000000000"), "chatroom_1718000000000");
        assert_eq!(file_name("chat-storage"), "chat-storage");
        assert_eq!(file_name("a/b"), "a%2Fb");
        assert_eq!(file_name(".."), "%2E%2E");
        assert_eq!(file_name(""), "%");
    }

    #[test]
    fn test_roundtrip_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("storage"));

        // Directory is created lazily.
        assert_eq!(store.get("chatroom_1").unwrap(), None);
        assert!(!store.dir().exists());

        store.set("chatroom_1", "[]").unwrap();
        assert_eq!(store.get("chatroom_1").unwrap().as_deref(), Some("[]"));
        assert!(store.dir().join("chatroom_1").exists());
        // No temp file left behind.
        assert!(!store.dir().join(".chatroom_1.tmp").exists());
    }

    #[test]
    fn test_set_replaces() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());

        store.set("k", "first").unwrap();
        store.set("k", "second").unwrap();
        assert_eq!(store.get("k").unwrap().as_deref(), Some("second"));
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_keys_do_not_escape_directory() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("inner"));
        store.set("../outside", "x").unwrap();
        assert!(!dir.path().join("outside").exists());
        assert_eq!(store.get("../outside").unwrap().as_deref(), Some("x"));
    }
}
