//! JSON file store.
//!
//! The document is an object of sections, each an object of options:
//!
//! ```json
//! {
//!   "AppConfig": {
//!     "port": 8080,
//!     "host": "localhost"
//!   }
//! }
//! ```
//!
//! Numbers and booleans are written unquoted when the converter's text is
//! exactly their JSON rendering; everything else is a string. Output is
//! pretty-printed with sections and options in sorted order.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::error::BindfigError;
use crate::file;
use crate::store::{Entry, Revision, Store};

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(transparent)]
struct JsonDocument {
    sections: BTreeMap<String, BTreeMap<String, Value>>,
}

#[derive(Debug)]
pub struct JsonStore {
    path: PathBuf,
    doc: JsonDocument,
}

impl JsonStore {
    /// A store backed by `path`. Nothing is read until [`Store::load`].
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            doc: JsonDocument::default(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn typed_value(text: &str) -> Value {
    let candidate = match text {
        "true" => Some(Value::Bool(true)),
        "false" => Some(Value::Bool(false)),
        _ => serde_json::from_str::<serde_json::Number>(text)
            .ok()
            .map(Value::Number),
    };
    match candidate {
        Some(v) if value_text(&v) == text => v,
        _ => Value::String(text.to_string()),
    }
}

impl Store for JsonStore {
    fn read(&self, section: &str, option: &str) -> Option<String> {
        self.doc
            .sections
            .get(section)?
            .get(option)
            .map(value_text)
    }

    fn write(&mut self, section: &str, option: &str, text: &str) -> Result<(), BindfigError> {
        self.doc
            .sections
            .entry(section.to_string())
            .or_default()
            .insert(option.to_string(), typed_value(text));
        Ok(())
    }

    fn remove(&mut self, section: &str, option: &str) -> bool {
        let Some(options) = self.doc.sections.get_mut(section) else {
            return false;
        };
        let removed = options.remove(option).is_some();
        if options.is_empty() {
            self.doc.sections.remove(section);
        }
        removed
    }

    fn revision(&self) -> Result<Revision, BindfigError> {
        file::content_revision(&self.path)
    }

    fn load(&mut self) -> Result<(), BindfigError> {
        self.doc = match file::read_optional(&self.path)? {
            Some(content) if content.trim().is_empty() => JsonDocument::default(),
            Some(content) => {
                serde_json::from_str(&content).map_err(|e| BindfigError::ParseError {
                    path: self.path.clone(),
                    reason: e.to_string(),
                })?
            }
            None => JsonDocument::default(),
        };
        debug!(path = %self.path.display(), "loaded json store");
        Ok(())
    }

    fn persist(&mut self) -> Result<(), BindfigError> {
        let mut content =
            serde_json::to_string_pretty(&self.doc).map_err(|e| BindfigError::ParseError {
                path: self.path.clone(),
                reason: e.to_string(),
            })?;
        content.push('\n');
        file::write_creating_dirs(&self.path, &content)
    }

    fn entries(&self) -> Vec<Entry> {
        self.doc
            .sections
            .iter()
            .flat_map(|(section, options)| {
                options.iter().map(move |(option, value)| Entry {
                    section: section.clone(),
                    option: option.clone(),
                    value: value_text(value),
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn value_typing() {
        assert_eq!(typed_value("8080"), Value::from(8080));
        assert_eq!(typed_value("true"), Value::Bool(true));
        assert_eq!(typed_value("0.5"), serde_json::json!(0.5));
        assert_eq!(typed_value("localhost"), Value::from("localhost"));
    }

    #[test]
    fn value_typing_keeps_text_exact() {
        for text in ["007", "1.50", "1e3", "null", "", "-0", " 1"] {
            assert_eq!(value_text(&typed_value(text)), text, "{text}");
        }
    }

    #[test]
    fn persist_and_reload() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("app.json");

        let mut store = JsonStore::open(&path);
        store.load().unwrap();
        store.write("AppConfig", "port", "8080").unwrap();
        store.write("AppConfig", "host", "localhost").unwrap();
        store.persist().unwrap();

        let parsed: Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(parsed["AppConfig"]["port"], Value::from(8080));
        assert_eq!(parsed["AppConfig"]["host"], Value::from("localhost"));

        let mut reopened = JsonStore::open(&path);
        reopened.load().unwrap();
        assert_eq!(reopened.read("AppConfig", "port").as_deref(), Some("8080"));
        assert_eq!(reopened.entries().len(), 2);
    }

    #[test]
    fn empty_file_is_empty_document() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("app.json");
        fs::write(&path, "").unwrap();
        let mut store = JsonStore::open(&path);
        store.load().unwrap();
        assert!(store.entries().is_empty());
    }

    #[test]
    fn wrong_shape_is_parse_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("app.json");
        fs::write(&path, "[1, 2]").unwrap();
        let mut store = JsonStore::open(&path);
        assert!(matches!(
            store.load(),
            Err(BindfigError::ParseError { .. })
        ));
    }

    #[test]
    fn remove_drops_empty_section() {
        let mut store = JsonStore::open("unused.json");
        store.write("A", "x", "1").unwrap();
        assert!(store.remove("A", "x"));
        assert!(store.entries().is_empty());
    }
}
