//! [`KeyStore`]: the only code allowed to read or write the key file.

use std::{
    fs::{self, OpenOptions},
    io::{self, Write},
    path::{Path, PathBuf},
};

use thiserror::Error;
use tracing::{debug, info, warn};
use zeroize::Zeroize;

use super::{SymmetricKey, KEY_LEN};

/// Errors produced by the key layer.
#[derive(Debug, Error)]
pub enum KeyError {
    /// No key file exists at the configured path.
    #[error("no key file at {0}")]
    NotFound(PathBuf),

    /// The key file exists but could not be read.
    #[error("failed to read key file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The key material has an unexpected length.
    #[error("key has invalid length: expected {KEY_LEN} bytes, got {0}")]
    InvalidLength(usize),

    /// Exclusive save refused to replace an existing key.
    #[error("a key already exists at {0}; refusing to overwrite")]
    AlreadyExists(PathBuf),

    /// The key could not be written.
    #[error("failed to persist key file {path}: {source}")]
    Persist {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Handle on a single key file.
///
/// Holds only the path; key bytes are returned to the caller and never
/// cached here, so each operation can be given its own store in tests.
#[derive(Debug, Clone)]
pub struct KeyStore {
    path: PathBuf,
}

impl KeyStore {
    /// Create a store for the key file at `path`. Nothing is touched on disk.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Location of the key file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the existing key verbatim.
    ///
    /// # Errors
    ///
    /// Returns [`KeyError::NotFound`] if there is no key file,
    /// [`KeyError::Read`] if it cannot be read, and
    /// [`KeyError::InvalidLength`] if it is not exactly [`KEY_LEN`] bytes.
    pub fn load(&self) -> Result<SymmetricKey, KeyError> {
        let mut bytes = match fs::read(&self.path) {
            Ok(b) => b,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(KeyError::NotFound(self.path.clone()))
            }
            Err(e) => {
                return Err(KeyError::Read {
                    path: self.path.clone(),
                    source: e,
                })
            }
        };
        let key = SymmetricKey::from_slice(&bytes);
        bytes.zeroize();
        let key = key?;
        info!(path = %self.path.display(), key_id = %key.fingerprint(), "key loaded");
        Ok(key)
    }

    /// Return the existing key, or generate and persist a new one.
    ///
    /// Creation is exclusive: if another process publishes a key between our
    /// check and our save, its key is loaded and returned instead of ours.
    ///
    /// # Errors
    ///
    /// Any [`KeyStore::load`] error other than [`KeyError::NotFound`], or a
    /// [`KeyError::Persist`] if the new key cannot be written. The process
    /// must not continue with a key that was not saved.
    pub fn load_or_create(&self) -> Result<SymmetricKey, KeyError> {
        match self.load() {
            Ok(key) => return Ok(key),
            Err(KeyError::NotFound(_)) => {}
            Err(e) => return Err(e),
        }

        let key = SymmetricKey::generate();
        match self.save(&key, false) {
            Ok(()) => {
                info!(path = %self.path.display(), key_id = %key.fingerprint(), "generated new key");
                Ok(key)
            }
            Err(KeyError::AlreadyExists(_)) => {
                warn!(path = %self.path.display(), "key created concurrently; using the existing one");
                self.load()
            }
            Err(e) => Err(e),
        }
    }

    /// Write exactly the raw key bytes to the key file.
    ///
    /// The key is first written and fsynced to a private temp file next to
    /// the destination, then published atomically: with `overwrite == false`
    /// via a hard link, which fails if the destination exists; with
    /// `overwrite == true` via rename. A reader never observes a partial key.
    ///
    /// # Errors
    ///
    /// Returns [`KeyError::AlreadyExists`] if a key exists and `overwrite`
    /// is false, or [`KeyError::Persist`] on any filesystem failure.
    pub fn save(&self, key: &SymmetricKey, overwrite: bool) -> Result<(), KeyError> {
        let persist = |source: io::Error| KeyError::Persist {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(persist)?;
        }

        let tmp = self.temp_path();
        if let Err(e) = write_private(&tmp, key.as_bytes()) {
            let _ = fs::remove_file(&tmp);
            return Err(persist(e));
        }

        let published = if overwrite {
            fs::rename(&tmp, &self.path)
        } else {
            let linked = fs::hard_link(&tmp, &self.path);
            let _ = fs::remove_file(&tmp);
            linked
        };

        match published {
            Ok(()) => {
                debug!(path = %self.path.display(), overwrite, "key file written");
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                Err(KeyError::AlreadyExists(self.path.clone()))
            }
            Err(e) => {
                let _ = fs::remove_file(&tmp);
                Err(persist(e))
            }
        }
    }

    fn temp_path(&self) -> PathBuf {
        let name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "key".into());
        self.path
            .with_file_name(format!(".{name}.{}.tmp", uuid::Uuid::new_v4().simple()))
    }
}

/// Create `path` (must not exist), owner-only on Unix, and fsync `bytes` into it.
fn write_private(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let mut opts = OpenOptions::new();
    opts.write(true).create_new(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        opts.mode(0o600);
    }
    let mut file = opts.open(path)?;
    file.write_all(bytes)?;
    file.sync_all()
}
