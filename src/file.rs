//! File locations, shared file I/O and format selection.
//!
//! # Locations
//!
//! A [`Location`] names the directory a config file lives in:
//!
//! - `Platform(app)`: the OS config directory for `app` (e.g.
//!   `~/.config/{app}/` on Linux).
//! - `Home(subdir)`: a directory under `$HOME`, e.g. `Home(".myapp")`.
//! - `Cwd`: the working directory.
//! - `Path(path)`: an explicit directory.
//!
//! # Format selection
//!
//! [`open_store`] picks a backend from the file extension:
//!
//! | Extension | Store |
//! |-----------|-------|
//! | `.ini`, `.cfg`, `.conf` | [`IniStore`] |
//! | `.toml` | `TomlStore` (feature `toml`) |
//! | `.json` | `JsonStore` (feature `json`) |
//! | `.env` | [`DotenvStore`] |
//!
//! Anything else is [`BindfigError::UnsupportedFormat`]. Opening never touches
//! the disk; the file is read on the first access through a context and
//! created on the first persist.

use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

use crate::dotenv::DotenvStore;
use crate::error::BindfigError;
use crate::ini::IniStore;
use crate::store::{Revision, Store};

/// Directory a config file is resolved against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
    Platform(String),
    Home(String),
    Cwd,
    Path(PathBuf),
}

impl Location {
    /// Resolve to a concrete directory.
    pub fn resolve(&self) -> Result<PathBuf, BindfigError> {
        match self {
            Location::Platform(app) => directories::ProjectDirs::from("", "", app)
                .map(|proj| proj.config_dir().to_path_buf())
                .ok_or(BindfigError::NoConfigDir),
            Location::Home(subdir) => directories::UserDirs::new()
                .map(|user| user.home_dir().join(subdir))
                .ok_or(BindfigError::NoConfigDir),
            Location::Cwd => std::env::current_dir().map_err(|e| BindfigError::io(".", e)),
            Location::Path(p) => Ok(p.clone()),
        }
    }

    /// Resolve to the path of `file_name` inside this location.
    pub fn file(&self, file_name: &str) -> Result<PathBuf, BindfigError> {
        self.resolve().map(|dir| dir.join(file_name))
    }
}

/// Open the store matching the file's extension.
pub fn open_store(path: impl AsRef<Path>) -> Result<Box<dyn Store>, BindfigError> {
    let path = path.as_ref();
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("ini" | "cfg" | "conf") => Ok(Box::new(IniStore::open(path))),
        #[cfg(feature = "toml")]
        Some("toml") => Ok(Box::new(crate::toml_doc::TomlStore::open(path))),
        #[cfg(feature = "json")]
        Some("json") => Ok(Box::new(crate::json_doc::JsonStore::open(path))),
        Some("env") => Ok(Box::new(DotenvStore::open(path))),
        _ if path.file_name().and_then(|n| n.to_str()) == Some(".env") => {
            Ok(Box::new(DotenvStore::open(path)))
        }
        _ => Err(BindfigError::UnsupportedFormat(path.to_path_buf())),
    }
}

/// Read a file, treating a missing file as `None`.
pub(crate) fn read_optional(path: &Path) -> Result<Option<String>, BindfigError> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(Some(content)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(BindfigError::io(path, e)),
    }
}

/// Write a file, creating parent directories as needed.
pub(crate) fn write_creating_dirs(path: &Path, content: &str) -> Result<(), BindfigError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent).map_err(|e| BindfigError::io(parent, e))?;
    }
    std::fs::write(path, content).map_err(|e| BindfigError::io(path, e))
}

/// Content digest of a file, or [`Revision::Missing`] if it does not exist.
pub(crate) fn content_revision(path: &Path) -> Result<Revision, BindfigError> {
    match std::fs::read(path) {
        Ok(bytes) => Ok(Revision::Digest(Sha256::digest(&bytes).into())),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Revision::Missing),
        Err(e) => Err(BindfigError::io(path, e)),
    }
}
