//! File-backed mirror backend.
//!
//! Each key is one file inside the mirror directory. Writes go to a
//! temporary sibling first and are renamed into place so a crash never
//! leaves a half-written entry behind.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use super::{MirrorBackend, MirrorError};

/// Mirror backend storing one file per key under a directory.
#[derive(Debug, Clone)]
pub struct FileMirror {
    dir: PathBuf,
}

impl FileMirror {
    /// Open (and create if needed) a mirror directory.
    ///
    /// # Errors
    ///
    /// Returns `MirrorError::Io` if the directory cannot be created.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, MirrorError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    /// The mirror directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, MirrorError> {
        let valid = !key.is_empty()
            && key
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-');
        if !valid {
            return Err(MirrorError::InvalidKey(key.to_owned()));
        }
        Ok(self.dir.join(key))
    }
}

impl MirrorBackend for FileMirror {
    fn get(&self, key: &str) -> Result<Option<String>, MirrorError> {
        let path = self.path_for(key)?;
        match std::fs::read_to_string(path) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), MirrorError> {
        let path = self.path_for(key)?;
        let tmp = self.dir.join(format!(".{key}.tmp"));
        std::fs::write(&tmp, value)?;
        std::fs::rename(&tmp, path)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), MirrorError> {
        let path = self.path_for(key)?;
        match std::fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_set_get_remove() {
        let dir = tempfile::tempdir().unwrap();
        let mirror = FileMirror::open(dir.path()).unwrap();

        assert_eq!(mirror.get("vix_admin").unwrap(), None);
        mirror.set("vix_admin", "true").unwrap();
        assert_eq!(mirror.get("vix_admin").unwrap().as_deref(), Some("true"));

        mirror.remove("vix_admin").unwrap();
        assert_eq!(mirror.get("vix_admin").unwrap(), None);
        mirror.remove("vix_admin").unwrap();
    }

    #[test]
    fn test_persists_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        FileMirror::open(dir.path())
            .unwrap()
            .set("vix_products", "[]")
            .unwrap();

        let reopened = FileMirror::open(dir.path()).unwrap();
        assert_eq!(reopened.get("vix_products").unwrap().as_deref(), Some("[]"));
    }

    #[test]
    fn test_rejects_path_like_keys() {
        let dir = tempfile::tempdir().unwrap();
        let mirror = FileMirror::open(dir.path()).unwrap();

        assert!(matches!(
            mirror.set("../escape", "x"),
            Err(MirrorError::InvalidKey(_))
        ));
        assert!(matches!(mirror.get(""), Err(MirrorError::InvalidKey(_))));
    }

    #[test]
    fn test_creates_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a").join("b");
        let mirror = FileMirror::open(&nested).unwrap();
        mirror.set("vix_orders_backup", "[]").unwrap();
        assert!(nested.join("vix_orders_backup").exists());
    }
}
