//! In-memory store.
//!
//! Clones share the same underlying map, so a clone kept outside the engine
//! acts as an "external writer": its writes bump the shared counter and are
//! picked up by the change monitor like an edit to a file would be.

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::BindfigError;
use crate::store::{Entry, Revision, Store};

#[derive(Debug, Default)]
struct Shared {
    sections: BTreeMap<String, BTreeMap<String, String>>,
    counter: u64,
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    shared: Arc<Mutex<Shared>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populate from `(section, option, text)` triples.
    pub fn with_entries<'a>(entries: impl IntoIterator<Item = (&'a str, &'a str, &'a str)>) -> Self {
        let store = Self::new();
        {
            let mut shared = store.shared.lock();
            for (section, option, text) in entries {
                shared
                    .sections
                    .entry(section.to_string())
                    .or_default()
                    .insert(option.to_string(), text.to_string());
            }
        }
        store
    }
}

impl Store for MemoryStore {
    fn read(&self, section: &str, option: &str) -> Option<String> {
        self.shared
            .lock()
            .sections
            .get(section)
            .and_then(|s| s.get(option))
            .cloned()
    }

    fn write(&mut self, section: &str, option: &str, text: &str) -> Result<(), BindfigError> {
        let mut shared = self.shared.lock();
        shared
            .sections
            .entry(section.to_string())
            .or_default()
            .insert(option.to_string(), text.to_string());
        shared.counter += 1;
        Ok(())
    }

    fn has(&self, section: &str, option: &str) -> bool {
        self.shared
            .lock()
            .sections
            .get(section)
            .is_some_and(|s| s.contains_key(option))
    }

    fn remove(&mut self, section: &str, option: &str) -> bool {
        let mut shared = self.shared.lock();
        let removed = shared
            .sections
            .get_mut(section)
            .and_then(|s| s.remove(option))
            .is_some();
        if removed {
            if shared.sections.get(section).is_some_and(|s| s.is_empty()) {
                shared.sections.remove(section);
            }
            shared.counter += 1;
        }
        removed
    }

    fn revision(&self) -> Result<Revision, BindfigError> {
        Ok(Revision::Counter(self.shared.lock().counter))
    }

    fn load(&mut self) -> Result<(), BindfigError> {
        Ok(())
    }

    fn persist(&mut self) -> Result<(), BindfigError> {
        Ok(())
    }

    fn entries(&self) -> Vec<Entry> {
        let shared = self.shared.lock();
        shared
            .sections
            .iter()
            .flat_map(|(section, options)| {
                options.iter().map(move |(option, value)| Entry {
                    section: section.clone(),
                    option: option.clone(),
                    value: value.clone(),
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_then_read() {
        let mut store = MemoryStore::new();
        store.write("AppConfig", "port", "8080").unwrap();
        assert_eq!(store.read("AppConfig", "port").as_deref(), Some("8080"));
        assert!(store.has("AppConfig", "port"));
        assert!(!store.has("AppConfig", "host"));
    }

    #[test]
    fn writes_bump_revision() {
        let mut store = MemoryStore::new();
        let before = store.revision().unwrap();
        store.write("A", "x", "1").unwrap();
        assert_ne!(store.revision().unwrap(), before);
    }

    #[test]
    fn clones_share_state() {
        let store = MemoryStore::new();
        let mut external = store.clone();
        external.write("A", "x", "1").unwrap();
        assert_eq!(store.read("A", "x").as_deref(), Some("1"));
        assert_eq!(store.revision().unwrap(), Revision::Counter(1));
    }

    #[test]
    fn remove_drops_empty_section() {
        let mut store = MemoryStore::with_entries([("A", "x", "1")]);
        assert!(store.remove("A", "x"));
        assert!(!store.remove("A", "x"));
        assert!(store.entries().is_empty());
    }

    #[test]
    fn entries_sorted_by_address() {
        let store = MemoryStore::with_entries([("B", "y", "2"), ("A", "x", "1"), ("A", "a", "0")]);
        let addresses: Vec<_> = store
            .entries()
            .into_iter()
            .map(|e| format!("{}.{}", e.section, e.option))
            .collect();
        assert_eq!(addresses, ["A.a", "A.x", "B.y"]);
    }
}
