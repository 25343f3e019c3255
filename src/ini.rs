//! Structured-sections file store: the reference persisted layout.
//!
//! ```text
//! [ScheduleConfig]
//! created_at = 2024-01-01T12:00:00
//! backup_time = 2024-06-15T14:30:00
//! ```
//!
//! One section per owner, one `option = value` line per binding. Lines
//! starting with `#` or `;` are comments. Values are trimmed on read; text
//! with surrounding whitespace, or starting with `"`, is written inside double
//! quotes and the outer pair is stripped again on read. Section and option
//! names are case-sensitive. Section and option order from the file
//! is kept; new addresses are appended. Comments are not written back.

use std::borrow::Cow;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::BindfigError;
use crate::file;
use crate::store::{Entry, Revision, Store};

type Options = Vec<(String, String)>;

#[derive(Debug)]
pub struct IniStore {
    path: PathBuf,
    sections: Vec<(String, Options)>,
}

impl IniStore {
    /// A store backed by `path`. Nothing is read until [`Store::load`].
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            sections: Vec::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn section(&self, name: &str) -> Option<&Options> {
        self.sections
            .iter()
            .find(|(s, _)| s == name)
            .map(|(_, options)| options)
    }

    fn section_mut(&mut self, name: &str) -> &mut Options {
        let idx = match self.sections.iter().position(|(s, _)| s == name) {
            Some(idx) => idx,
            None => {
                self.sections.push((name.to_string(), Vec::new()));
                self.sections.len() - 1
            }
        };
        &mut self.sections[idx].1
    }
}

/// Strip one pair of surrounding double quotes.
fn unquote(value: &str) -> &str {
    if value.len() >= 2
        && let Some(inner) = value.strip_prefix('"').and_then(|v| v.strip_suffix('"'))
    {
        return inner;
    }
    value
}

fn quote(value: &str) -> Cow<'_, str> {
    if value != value.trim() || value.starts_with('"') {
        Cow::Owned(format!("\"{value}\""))
    } else {
        Cow::Borrowed(value)
    }
}

/// Parse INI text into ordered sections.
pub(crate) fn parse(content: &str, path: &Path) -> Result<Vec<(String, Options)>, BindfigError> {
    let mut sections: Vec<(String, Options)> = Vec::new();
    let mut current: Option<String> = None;

    for (lineno, raw) in content.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
            continue;
        }
        let error = |reason: &str| BindfigError::ParseError {
            path: path.to_path_buf(),
            reason: format!("line {}: {reason}", lineno + 1),
        };

        if let Some(rest) = line.strip_prefix('[') {
            let name = rest
                .strip_suffix(']')
                .ok_or_else(|| error("unterminated section header"))?
                .trim();
            if name.is_empty() {
                return Err(error("empty section name"));
            }
            if !sections.iter().any(|(s, _)| s == name) {
                sections.push((name.to_string(), Vec::new()));
            }
            current = Some(name.to_string());
            continue;
        }

        let (key, value) = line
            .split_once('=')
            .ok_or_else(|| error("expected `option = value`"))?;
        let key = key.trim();
        if key.is_empty() {
            return Err(error("empty option name"));
        }
        let Some(name) = current.as_deref() else {
            return Err(error("option outside of any section"));
        };
        // Re-opened sections are merged into their first occurrence.
        let options = sections
            .iter_mut()
            .find(|(s, _)| s == name)
            .map(|(_, o)| o)
            .ok_or_else(|| error("option outside of any section"))?;
        let value = unquote(value.trim()).to_string();
        match options.iter_mut().find(|(k, _)| k == key) {
            Some(slot) => slot.1 = value,
            None => options.push((key.to_string(), value)),
        }
    }

    Ok(sections)
}

/// Render ordered sections back to INI text.
pub(crate) fn render(sections: &[(String, Options)]) -> String {
    let mut out = String::new();
    for (i, (name, options)) in sections.iter().enumerate() {
        if options.is_empty() {
            continue;
        }
        if i > 0 && !out.is_empty() {
            out.push('\n');
        }
        let _ = writeln!(out, "[{name}]");
        for (key, value) in options {
            let _ = writeln!(out, "{key} = {}", quote(value));
        }
    }
    out
}

impl Store for IniStore {
    fn read(&self, section: &str, option: &str) -> Option<String> {
        self.section(section)?
            .iter()
            .find(|(k, _)| k == option)
            .map(|(_, v)| v.clone())
    }

    fn write(&mut self, section: &str, option: &str, text: &str) -> Result<(), BindfigError> {
        if text.contains('\n') || text.contains('\r') {
            return Err(BindfigError::TypeMismatch {
                expected: "single-line text".into(),
                found: format!("{} lines", text.lines().count()),
            });
        }
        let options = self.section_mut(section);
        match options.iter_mut().find(|(k, _)| k == option) {
            Some(slot) => slot.1 = text.to_string(),
            None => options.push((option.to_string(), text.to_string())),
        }
        Ok(())
    }

    fn remove(&mut self, section: &str, option: &str) -> bool {
        let Some((_, options)) = self.sections.iter_mut().find(|(s, _)| s == section) else {
            return false;
        };
        let before = options.len();
        options.retain(|(k, _)| k != option);
        before != options.len()
    }

    fn revision(&self) -> Result<Revision, BindfigError> {
        file::content_revision(&self.path)
    }

    fn load(&mut self) -> Result<(), BindfigError> {
        self.sections = match file::read_optional(&self.path)? {
            Some(content) => parse(&content, &self.path)?,
            None => Vec::new(),
        };
        debug!(path = %self.path.display(), sections = self.sections.len(), "loaded ini store");
        Ok(())
    }

    fn persist(&mut self) -> Result<(), BindfigError> {
        file::write_creating_dirs(&self.path, &render(&self.sections))
    }

    fn entries(&self) -> Vec<Entry> {
        self.sections
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
