//! The backing-store contract.
//!
//! A [`Store`] is a key-value medium addressed by `(section, option)`. The
//! engine only needs the operations below plus a comparable [`Revision`]
//! marker that changes whenever the medium's content changes. Reads and
//! writes work on the store's in-memory view; `load` and `persist` move that
//! view to and from the underlying medium.

use std::fmt;

use serde::Serialize;

use crate::error::BindfigError;

/// Opaque marker summarizing the medium's content state.
///
/// Two markers compare equal exactly when the engine may assume nothing
/// changed in between.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Revision {
    /// The medium does not exist yet (e.g. the file was never written).
    Missing,
    /// Monotonic write counter, for in-process media.
    Counter(u64),
    /// SHA-256 of the persisted content, for file media.
    Digest([u8; 32]),
}

pub trait Store: Send + 'static {
    /// Stored text at an address, if present.
    fn read(&self, section: &str, option: &str) -> Option<String>;

    /// Set the text at an address in the in-memory view.
    fn write(&mut self, section: &str, option: &str, text: &str) -> Result<(), BindfigError>;

    fn has(&self, section: &str, option: &str) -> bool {
        self.read(section, option).is_some()
    }

    /// Drop an address. Returns whether it was present.
    fn remove(&mut self, section: &str, option: &str) -> bool;

    /// Current revision of the underlying medium.
    fn revision(&self) -> Result<Revision, BindfigError>;

    /// Replace the in-memory view with the medium's current content.
    fn load(&mut self) -> Result<(), BindfigError>;

    /// Write the in-memory view back to the medium.
    fn persist(&mut self) -> Result<(), BindfigError>;

    /// Every stored address with its text, in the store's natural order.
    fn entries(&self) -> Vec<Entry>;
}

/// One stored address and its text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Entry {
    pub section: String,
    pub option: String,
    pub value: String,
}

impl fmt::Display for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.section.is_empty() {
            write!(f, "{} = {}", self.option, self.value)
        } else {
            write!(f, "{}.{} = {}", self.section, self.option, self.value)
        }
    }
}

/// All stored entries, displayed one `section.option = value` per line.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Listing {
    pub entries: Vec<Entry>,
}

impl Listing {
    pub fn get(&self, section: &str, option: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|e| e.section == section && e.option == option)
            .map(|e| e.value.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Display for Listing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, entry) in self.entries.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{entry}")?;
        }
        Ok(())
    }
}
