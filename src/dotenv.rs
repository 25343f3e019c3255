//! Flat `KEY=value` store in the style of `.env` files.
//!
//! Sections fold into a composite key: `(AppConfig, port)` is stored as
//! `APPCONFIG_PORT`. Anything outside `[A-Za-z0-9_]` becomes `_`, and the key
//! is upper-cased.
//!
//! On read, process environment variables take precedence over the file, so
//! `APPCONFIG_PORT=9000 myapp` overrides the stored value without touching it.
//! Writes always go to the file.
//!
//! File syntax: blank lines and `#` comments are skipped, an optional
//! `export ` prefix is accepted, and values may be wrapped in single or
//! double quotes (stripped on read, added on write when the value would not
//! survive unquoted).

use std::collections::HashMap;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::BindfigError;
use crate::file;
use crate::store::{Entry, Revision, Store};

/// Where environment overrides come from.
#[derive(Debug, Clone)]
pub enum EnvOverlay {
    /// The live process environment.
    Process,
    /// A fixed set of variables.
    Fixed(HashMap<String, String>),
    /// No overlay; only the file is consulted.
    Disabled,
}

impl EnvOverlay {
    fn get(&self, key: &str) -> Option<String> {
        match self {
            EnvOverlay::Process => std::env::var(key).ok(),
            EnvOverlay::Fixed(vars) => vars.get(key).cloned(),
            EnvOverlay::Disabled => None,
        }
    }
}

#[derive(Debug)]
pub struct DotenvStore {
    path: PathBuf,
    vars: Vec<(String, String)>,
    overlay: EnvOverlay,
}

/// Composite key for an address.
pub fn env_key(section: &str, option: &str) -> String {
    format!("{section}_{option}")
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_uppercase()
            } else {
                '_'
            }
        })
        .collect()
}

impl DotenvStore {
    /// A store backed by `path`, overlaid by the process environment.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            vars: Vec::new(),
            overlay: EnvOverlay::Process,
        }
    }

    /// Replace the environment overlay.
    pub fn with_overlay(mut self, overlay: EnvOverlay) -> Self {
        self.overlay = overlay;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn file_value(&self, key: &str) -> Option<&str> {
        self.vars
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

fn unquote(value: &str) -> &str {
    for quote in ['"', '\''] {
        if value.len() >= 2
            && let Some(inner) = value
                .strip_prefix(quote)
                .and_then(|v| v.strip_suffix(quote))
        {
            return inner;
        }
    }
    value
}

fn quote(value: &str) -> String {
    let needs_quotes = value != value.trim()
        || value.contains('#')
        || value.starts_with('"')
        || value.starts_with('\'');
    if !needs_quotes {
        value.to_string()
    } else if !value.contains('"') {
        format!("\"{value}\"")
    } else if !value.contains('\'') {
        format!("'{value}'")
    } else {
        value.to_string()
    }
}

/// Parse `.env` text into ordered key/value pairs.
pub(crate) fn parse(content: &str, path: &Path) -> Result<Vec<(String, String)>, BindfigError> {
    let mut vars: Vec<(String, String)> = Vec::new();
    for (lineno, raw) in content.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let line = line.strip_prefix("export ").unwrap_or(line);
        let (key, value) = line.split_once('=').ok_or_else(|| BindfigError::ParseError {
            path: path.to_path_buf(),
            reason: format!("line {}: expected `KEY=value`", lineno + 1),
        })?;
        let key = key.trim().to_string();
        let value = unquote(value.trim()).to_string();
        match vars.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => vars.push((key, value)),
        }
    }
    Ok(vars)
}

impl Store for DotenvStore {
    fn read(&self, section: &str, option: &str) -> Option<String> {
        let key = env_key(section, option);
        self.overlay
            .get(&key)
            .or_else(|| self.file_value(&key).map(str::to_string))
    }

    fn write(&mut self, section: &str, option: &str, text: &str) -> Result<(), BindfigError> {
        if text.contains('\n') || text.contains('\r') {
            return Err(BindfigError::TypeMismatch {
                expected: "single-line text".into(),
                found: format!("{} lines", text.lines().count()),
            });
        }
        let key = env_key(section, option);
        match self.vars.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = text.to_string(),
            None => self.vars.push((key, text.to_string())),
        }
        Ok(())
    }

    fn remove(&mut self, section: &str, option: &str) -> bool {
        let key = env_key(section, option);
        let before = self.vars.len();
        self.vars.retain(|(k, _)| *k != key);
        before != self.vars.len()
    }

    fn revision(&self) -> Result<Revision, BindfigError> {
        file::content_revision(&self.path)
    }

    fn load(&mut self) -> Result<(), BindfigError> {
        self.vars = match file::read_optional(&self.path)? {
            Some(content) => parse(&content, &self.path)?,
            None => Vec::new(),
        };
        debug!(path = %self.path.display(), vars = self.vars.len(), "loaded dotenv store");
        Ok(())
    }

    fn persist(&mut self) -> Result<(), BindfigError> {
        let mut out = String::new();
        for (key, value) in &self.vars {
            let _ = writeln!(out, "{key}={}", quote(value));
        }
        file::write_creating_dirs(&self.path, &out)
    }

    fn entries(&self) -> Vec<Entry> {
        self.vars
            .iter()
            .map(|(key, value)| Entry {
                section: String::new(),
                option: key.clone(),
                value: self.overlay.get(key).unwrap_or_else(|| value.clone()),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn fixed(pairs: &[(&str, &str)]) -> EnvOverlay {
        EnvOverlay::Fixed(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }

    #[test]
    fn composite_key() {
        assert_eq!(env_key("AppConfig", "port"), "APPCONFIG_PORT");
        assert_eq!(env_key("my-app", "log.level"), "MY_APP_LOG_LEVEL");
    }

    #[test]
    fn parses_quotes_comments_and_export() {
        let vars = parse(
            "# comment\nA=1\nexport B=two\nC=\"spaced value\"\nD='x # y'\nE=\n",
            Path::new(".env"),
        )
        .unwrap();
        assert_eq!(
            vars,
            vec![
                ("A".to_string(), "1".to_string()),
                ("B".to_string(), "two".to_string()),
                ("C".to_string(), "spaced value".to_string()),
                ("D".to_string(), "x # y".to_string()),
                ("E".to_string(), "".to_string()),
            ]
        );
    }

    #[test]
    fn missing_equals_is_parse_error() {
        assert!(matches!(
            parse("JUSTAKEY\n", Path::new(".env")),
            Err(BindfigError::ParseError { .. })
        ));
    }

    #[test]
    fn quote_round_trips() {
        for value in ["plain", " padded ", "a # b", "\"q\"", "it's", ""] {
            let line = format!("K={}", quote(value));
            let vars = parse(&line, Path::new(".env")).unwrap();
            assert_eq!(vars[0].1, value, "{value}");
        }
    }

    #[test]
    fn environment_takes_precedence_on_read() {
        let mut store = DotenvStore::open("unused.env")
            .with_overlay(fixed(&[("APPCONFIG_PORT", "9000")]));
        store.write("AppConfig", "port", "8080").unwrap();
        store.write("AppConfig", "host", "localhost").unwrap();
        assert_eq!(store.read("AppConfig", "port").as_deref(), Some("9000"));
        assert_eq!(store.read("AppConfig", "host").as_deref(), Some("localhost"));
    }

    #[test]
    fn environment_alone_counts_as_present() {
        let store = DotenvStore::open("unused.env").with_overlay(fixed(&[("A_X", "1")]));
        assert!(store.has("A", "x"));
    }

    #[test]
    fn writes_go_to_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(".env");
        let mut store = DotenvStore::open(&path)
            .with_overlay(fixed(&[("APPCONFIG_PORT", "9000")]));
        store.load().unwrap();
        store.write("AppConfig", "port", "8080").unwrap();
        store.write("AppConfig", "motd", "hello world ").unwrap();
        store.persist().unwrap();
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "APPCONFIG_PORT=8080\nAPPCONFIG_MOTD=\"hello world \"\n"
        );
    }

    #[test]
    fn entries_are_flat() {
        let mut store = DotenvStore::open("unused.env").with_overlay(EnvOverlay::Disabled);
        store.write("A", "x", "1").unwrap();
        let entries = store.entries();
        assert_eq!(entries[0].section, "");
        assert_eq!(entries[0].option, "A_X");
        assert_eq!(entries[0].to_string(), "A_X = 1");
    }
}
