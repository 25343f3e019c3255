//! TOML file store that preserves formatting.
//!
//! Uses `toml_edit` so comments, key order and whitespace in hand-edited files
//! survive a write. Each section is a TOML table and each option a key inside
//! it. Values are written typed (integer, float, boolean) when the converter's
//! text is exactly how TOML renders that value, and as strings otherwise, so
//! reading back always yields the same text.

use std::path::{Path, PathBuf};

use toml_edit::{DocumentMut, Item, Table, Value};
use tracing::debug;

use crate::error::BindfigError;
use crate::file;
use crate::store::{Entry, Revision, Store};

#[derive(Debug)]
pub struct TomlStore {
    path: PathBuf,
    doc: DocumentMut,
}

impl TomlStore {
    /// A store backed by `path`. Nothing is read until [`Store::load`].
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            doc: DocumentMut::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Text form of a stored TOML value.
fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.value().clone(),
        other => {
            let mut bare = other.clone();
            bare.decor_mut().clear();
            bare.to_string()
        }
    }
}

/// Pick a typed TOML value for `text` when it renders back identically.
fn typed_value(text: &str) -> Value {
    let candidate: Option<Value> = if text == "true" || text == "false" {
        Some(Value::from(text == "true"))
    } else if let Ok(i) = text.parse::<i64>() {
        Some(Value::from(i))
    } else if text.contains('.')
        && let Ok(f) = text.parse::<f64>()
    {
        Some(Value::from(f))
    } else {
        None
    };

    match candidate {
        Some(v) if value_text(&v) == text => v,
        _ => Value::from(text),
    }
}

/// Patch a TOML document string, setting `section.option` to `text`.
///
/// Pure function used by the store and handy for tests.
pub(crate) fn set_in_document(
    doc: &mut DocumentMut,
    section: &str,
    option: &str,
    text: &str,
) -> Result<(), String> {
    let root = doc.as_table_mut();
    if !root.contains_key(section) {
        root.insert(section, Item::Table(Table::new()));
    }
    let table = root
        .get_mut(section)
        .and_then(Item::as_table_like_mut)
        .ok_or_else(|| format!("`{section}` is a value, not a table"))?;

    // Keep the existing value's decoration (inline comments).
    let decor = table
        .get(option)
        .and_then(Item::as_value)
        .map(|v| v.decor().clone());
    let mut value = typed_value(text);
    if let Some(decor) = decor {
        *value.decor_mut() = decor;
    }
    table.insert(option, Item::Value(value));
    Ok(())
}

impl Store for TomlStore {
    fn read(&self, section: &str, option: &str) -> Option<String> {
        self.doc
            .get(section)?
            .as_table_like()?
            .get(option)?
            .as_value()
            .map(value_text)
    }

    fn write(&mut self, section: &str, option: &str, text: &str) -> Result<(), BindfigError> {
        set_in_document(&mut self.doc, section, option, text).map_err(|reason| {
            BindfigError::ParseError {
                path: self.path.clone(),
                reason,
            }
        })
    }

    fn remove(&mut self, section: &str, option: &str) -> bool {
        self.doc
            .get_mut(section)
            .and_then(Item::as_table_like_mut)
            .and_then(|t| t.remove(option))
            .is_some()
    }

    fn revision(&self) -> Result<Revision, BindfigError> {
        file::content_revision(&self.path)
    }

    fn load(&mut self) -> Result<(), BindfigError> {
        self.doc = match file::read_optional(&self.path)? {
            Some(content) => content.parse().map_err(|e: toml_edit::TomlError| {
                BindfigError::ParseError {
                    path: self.path.clone(),
                    reason: e.to_string(),
                }
            })?,
            None => DocumentMut::new(),
        };
        debug!(path = %self.path.display(), "loaded toml store");
        Ok(())
    }

    fn persist(&mut self) -> Result<(), BindfigError> {
        file::write_creating_dirs(&self.path, &self.doc.to_string())
    }

    fn entries(&self) -> Vec<Entry> {
        let mut entries = Vec::new();
        for (section, item) in self.doc.iter() {
            let Some(table) = item.as_table_like() else {
                continue;
            };
            for (option, item) in table.iter() {
                if let Some(value) = item.as_value() {
                    entries.push(Entry {
                        section: section.to_string(),
                        option: option.to_string(),
                        value: value_text(value),
                    });
                }
            }
        }
        entries
    }
}
