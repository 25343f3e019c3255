//! Collection converters: lists, sets, mappings and pairs.
//!
//! Elements are joined with a single-character separator. Any literal
//! separator or escape character inside an element's text is prefixed with
//! the escape character, so arbitrary element text survives a round trip:
//!
//! ```text
//! ["a,b", "c\\d", ""]  <->  a\,b,c\\d,
//! ```
//!
//! Encoding rules:
//!
//! - Empty text is the empty collection.
//! - A collection holding a single empty element is written as a lone escape
//!   character, keeping it distinct from the empty collection.
//! - An escape followed by a non-reserved character is kept literally on
//!   parse, so hand-edited files with stray backslashes still load.
//! - [`Map`] additionally splits each entry on an unescaped key/value
//!   delimiter, which is also escaped inside keys and values.

use std::collections::{BTreeMap, BTreeSet};

use crate::converter::Converter;
use crate::error::BindfigError;

/// Separator, escape and key/value characters for collection encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Delimiters {
    separator: char,
    escape: char,
    key_value: char,
}

impl Default for Delimiters {
    fn default() -> Self {
        Self {
            separator: ',',
            escape: '\\',
            key_value: ':',
        }
    }
}

impl Delimiters {
    /// Custom separator and escape characters; they must differ.
    pub fn new(separator: char, escape: char) -> Result<Self, BindfigError> {
        if separator == escape {
            return Err(BindfigError::InvalidDelimiters(format!(
                "separator and escape are both '{separator}'"
            )));
        }
        let key_value = if separator == ':' || escape == ':' {
            '='
        } else {
            ':'
        };
        Ok(Self {
            separator,
            escape,
            key_value,
        })
    }

    /// Custom key/value delimiter for [`Map`]; it must differ from the other two.
    pub fn with_key_value(mut self, key_value: char) -> Result<Self, BindfigError> {
        if key_value == self.separator || key_value == self.escape {
            return Err(BindfigError::InvalidDelimiters(format!(
                "key/value delimiter '{key_value}' collides with separator or escape"
            )));
        }
        self.key_value = key_value;
        Ok(self)
    }

    pub fn separator(&self) -> char {
        self.separator
    }

    pub fn escape(&self) -> char {
        self.escape
    }

    pub fn key_value(&self) -> char {
        self.key_value
    }

    fn is_reserved(&self, c: char, pairs: bool) -> bool {
        c == self.separator || c == self.escape || (pairs && c == self.key_value)
    }

    fn escape_text(&self, text: &str, pairs: bool) -> String {
        let mut out = String::with_capacity(text.len());
        for c in text.chars() {
            if self.is_reserved(c, pairs) {
                out.push(self.escape);
            }
            out.push(c);
        }
        out
    }

    /// Join already-escaped tokens.
    fn join(&self, tokens: &[String]) -> String {
        if let [only] = tokens
            && only.is_empty()
        {
            return self.escape.to_string();
        }
        tokens.join(self.separator.encode_utf8(&mut [0; 4]))
    }

    /// Split on unescaped separators (and key/value delimiters when `pairs`),
    /// unescaping as it goes. Returns one entry per token, each holding its
    /// key/value parts.
    fn split(&self, text: &str, pairs: bool) -> Vec<Vec<String>> {
        let mut tokens = Vec::new();
        let mut parts = Vec::new();
        let mut current = String::new();
        let mut chars = text.chars();

        while let Some(c) = chars.next() {
            if c == self.escape {
                match chars.next() {
                    Some(next) if self.is_reserved(next, pairs) => current.push(next),
                    Some(next) => {
                        current.push(c);
                        current.push(next);
                    }
                    // Dangling escape: the single-empty-element marker.
                    None => {}
                }
            } else if c == self.separator {
                parts.push(std::mem::take(&mut current));
                tokens.push(std::mem::take(&mut parts));
            } else if pairs && c == self.key_value {
                parts.push(std::mem::take(&mut current));
            } else {
                current.push(c);
            }
        }
        parts.push(current);
        tokens.push(parts);
        tokens
    }

    fn elements(&self, text: &str) -> Vec<String> {
        if text.is_empty() {
            return Vec::new();
        }
        self.split(text, false)
            .into_iter()
            .map(|mut parts| parts.remove(0))
            .collect()
    }
}

/// Ordered list of elements.
pub struct List<C> {
    inner: C,
    delimiters: Delimiters,
}

impl<C: Converter> List<C> {
    pub fn new(inner: C) -> Self {
        Self {
            inner,
            delimiters: Delimiters::default(),
        }
    }

    pub fn with_delimiters(mut self, delimiters: Delimiters) -> Self {
        self.delimiters = delimiters;
        self
    }
}

impl<C: Converter> Converter for List<C> {
    type Value = Vec<C::Value>;

    fn type_name(&self) -> &'static str {
        "list"
    }

    fn parse(&self, text: &str) -> Result<Self::Value, BindfigError> {
        self.delimiters
            .elements(text)
            .iter()
            .map(|token| self.inner.parse(token))
            .collect()
    }

    fn format(&self, value: &Self::Value) -> String {
        let tokens: Vec<String> = value
            .iter()
            .map(|v| self.delimiters.escape_text(&self.inner.format(v), false))
            .collect();
        self.delimiters.join(&tokens)
    }

    fn validate(&self, value: Self::Value) -> Result<Self::Value, BindfigError> {
        value.into_iter().map(|v| self.inner.validate(v)).collect()
    }
}

/// Unordered set of elements, written in sorted order.
pub struct Set<C> {
    inner: C,
    delimiters: Delimiters,
}

impl<C: Converter> Set<C>
where
    C::Value: Ord,
{
    pub fn new(inner: C) -> Self {
        Self {
            inner,
            delimiters: Delimiters::default(),
        }
    }

    pub fn with_delimiters(mut self, delimiters: Delimiters) -> Self {
        self.delimiters = delimiters;
        self
    }
}

impl<C: Converter> Converter for Set<C>
where
    C::Value: Ord,
{
    type Value = BTreeSet<C::Value>;

    fn type_name(&self) -> &'static str {
        "set"
    }

    fn parse(&self, text: &str) -> Result<Self::Value, BindfigError> {
        self.delimiters
            .elements(text)
            .iter()
            .map(|token| self.inner.parse(token))
            .collect()
    }

    fn format(&self, value: &Self::Value) -> String {
        let tokens: Vec<String> = value
            .iter()
            .map(|v| self.delimiters.escape_text(&self.inner.format(v), false))
            .collect();
        self.delimiters.join(&tokens)
    }

    fn validate(&self, value: Self::Value) -> Result<Self::Value, BindfigError> {
        value.into_iter().map(|v| self.inner.validate(v)).collect()
    }
}

/// Key/value mapping, written in key order as `k:v,k:v`.
pub struct Map<K, V> {
    keys: K,
    values: V,
    delimiters: Delimiters,
}

impl<K: Converter, V: Converter> Map<K, V>
where
    K::Value: Ord,
{
    pub fn new(keys: K, values: V) -> Self {
        Self {
            keys,
            values,
            delimiters: Delimiters::default(),
        }
    }

    pub fn with_delimiters(mut self, delimiters: Delimiters) -> Self {
        self.delimiters = delimiters;
        self
    }
}

impl<K: Converter, V: Converter> Converter for Map<K, V>
where
    K::Value: Ord,
{
    type Value = BTreeMap<K::Value, V::Value>;

    fn type_name(&self) -> &'static str {
        "map"
    }

    fn parse(&self, text: &str) -> Result<Self::Value, BindfigError> {
        if text.is_empty() {
            return Ok(BTreeMap::new());
        }
        let mut map = BTreeMap::new();
        for parts in self.delimiters.split(text, true) {
            let [key, value] = <[String; 2]>::try_from(parts).map_err(|parts| {
                BindfigError::TypeMismatch {
                    expected: format!("key{}value entry", self.delimiters.key_value),
                    found: format!("{} part(s): {parts:?}", parts.len()),
                }
            })?;
            map.insert(self.keys.parse(&key)?, self.values.parse(&value)?);
        }
        Ok(map)
    }

    fn format(&self, value: &Self::Value) -> String {
        let d = &self.delimiters;
        let tokens: Vec<String> = value
            .iter()
            .map(|(k, v)| {
                format!(
                    "{}{}{}",
                    d.escape_text(&self.keys.format(k), true),
                    d.key_value,
                    d.escape_text(&self.values.format(v), true)
                )
            })
            .collect();
        d.join(&tokens)
    }

    fn validate(&self, value: Self::Value) -> Result<Self::Value, BindfigError> {
        value
            .into_iter()
            .map(|(k, v)| Ok((self.keys.validate(k)?, self.values.validate(v)?)))
            .collect()
    }
}

/// A fixed two-element tuple.
pub struct Pair<A, B> {
    first: A,
    second: B,
    delimiters: Delimiters,
}

impl<A: Converter, B: Converter> Pair<A, B> {
    pub fn new(first: A, second: B) -> Self {
        Self {
            first,
            second,
            delimiters: Delimiters::default(),
        }
    }

    pub fn with_delimiters(mut self, delimiters: Delimiters) -> Self {
        self.delimiters = delimiters;
        self
    }
}

impl<A: Converter, B: Converter> Converter for Pair<A, B> {
    type Value = (A::Value, B::Value);

    fn type_name(&self) -> &'static str {
        "pair"
    }

    fn parse(&self, text: &str) -> Result<Self::Value, BindfigError> {
        let elements = self.delimiters.elements(text);
        let [a, b] = <[String; 2]>::try_from(elements).map_err(|found| {
            BindfigError::TypeMismatch {
                expected: "2 elements".into(),
                found: format!("{} element(s)", found.len()),
            }
        })?;
        Ok((self.first.parse(&a)?, self.second.parse(&b)?))
    }

    fn format(&self, (a, b): &Self::Value) -> String {
        let d = &self.delimiters;
        let tokens = [
            d.escape_text(&self.first.format(a), false),
            d.escape_text(&self.second.format(b), false),
        ];
        d.join(&tokens)
    }

    fn validate(&self, (a, b): Self::Value) -> Result<Self::Value, BindfigError> {
        Ok((self.first.validate(a)?, self.second.validate(b)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::converter::ConverterExt;
    use crate::primitive::{Integer, Text};
    use proptest::prelude::*;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn list_basic() {
        let conv = Integer.list();
        assert_eq!(conv.parse("1,2,3").unwrap(), vec![1, 2, 3]);
        assert_eq!(conv.format(&vec![1, 2, 3]), "1,2,3");
    }

    #[test]
    fn list_empty_text_is_empty() {
        assert!(Text.list().parse("").unwrap().is_empty());
        assert_eq!(Text.list().format(&vec![]), "");
    }

    #[test]
    fn list_escapes_separator_and_escape() {
        let conv = Text.list();
        let value = strings(&["a,b", "c\\d", ""]);
        let text = conv.format(&value);
        assert_eq!(text, "a\\,b,c\\\\d,");
        assert_eq!(conv.parse(&text).unwrap(), value);
    }

    #[test]
    fn list_single_empty_element() {
        let conv = Text.list();
        let value = strings(&[""]);
        let text = conv.format(&value);
        assert_eq!(text, "\\");
        assert_eq!(conv.parse(&text).unwrap(), value);
    }

    #[test]
    fn list_keeps_stray_escape_literally() {
        assert_eq!(
            Text.list().parse("C:\\temp,x").unwrap(),
            strings(&["C:\\temp", "x"])
        );
    }

    #[test]
    fn list_element_error_propagates() {
        let err = Integer.list().parse("1,two,3").unwrap_err();
        assert!(matches!(err, BindfigError::Conversion { .. }));
    }

    #[test]
    fn list_validate_checks_each_element() {
        let conv = Integer.bounded(0..10).list();
        assert!(conv.validate(vec![1, 2]).is_ok());
        assert!(conv.validate(vec![1, 20]).is_err());
    }

    #[test]
    fn custom_delimiters() {
        let d = Delimiters::new(';', '%').unwrap();
        let conv = Text.list().with_delimiters(d);
        let value = strings(&["a;b", "50%", "c,d"]);
        let text = conv.format(&value);
        assert_eq!(text, "a%;b;50%%;c,d");
        assert_eq!(conv.parse(&text).unwrap(), value);
    }

    #[test]
    fn delimiters_must_differ() {
        assert!(Delimiters::new(',', ',').is_err());
        assert!(Delimiters::default().with_key_value(',').is_err());
        assert_eq!(Delimiters::new(':', '\\').unwrap().key_value(), '=');
    }

    #[test]
    fn set_sorted_and_deduplicated() {
        let conv = Set::new(Integer);
        let parsed = conv.parse("3,1,3,2").unwrap();
        assert_eq!(parsed.len(), 3);
        assert_eq!(conv.format(&parsed), "1,2,3");
    }

    #[test]
    fn map_round_trip_with_escapes() {
        let conv = Map::new(Text, Text);
        let mut value = BTreeMap::new();
        value.insert("host:port".to_string(), "a,b".to_string());
        value.insert("plain".to_string(), "".to_string());
        let text = conv.format(&value);
        assert_eq!(text, "host\\:port:a\\,b,plain:");
        assert_eq!(conv.parse(&text).unwrap(), value);
    }

    #[test]
    fn map_typed_values() {
        let conv = Map::new(Text, Integer);
        let parsed = conv.parse("a:1,b:2").unwrap();
        assert_eq!(parsed["a"], 1);
        assert_eq!(parsed["b"], 2);
    }

    #[test]
    fn map_entry_without_delimiter_is_type_mismatch() {
        let err = Map::new(Text, Text).parse("a:1,b").unwrap_err();
        assert!(matches!(err, BindfigError::TypeMismatch { .. }));
        let err = Map::new(Text, Text).parse("a:1:2").unwrap_err();
        assert!(matches!(err, BindfigError::TypeMismatch { .. }));
    }

    #[test]
    fn pair_round_trip() {
        let conv = Pair::new(Text, Integer);
        let value = ("localhost".to_string(), 8080);
        let text = conv.format(&value);
        assert_eq!(text, "localhost,8080");
        assert_eq!(conv.parse(&text).unwrap(), value);
    }

    #[test]
    fn pair_wrong_arity_is_type_mismatch() {
        let conv = Pair::new(Integer, Integer);
        for text in ["1", "1,2,3", ""] {
            assert!(
                matches!(conv.parse(text), Err(BindfigError::TypeMismatch { .. })),
                "{text} should fail"
            );
        }
    }

    proptest! {
        #[test]
        fn list_escaping_round_trips(items in prop::collection::vec("[ab,\\\\:]{0,4}", 0..6)) {
            let conv = Text.list();
            let text = conv.format(&items);
            prop_assert_eq!(conv.parse(&text).unwrap(), items);
        }

        #[test]
        fn map_escaping_round_trips(
            entries in prop::collection::btree_map("[ab,\\\\:]{0,3}", "[ab,\\\\:]{0,3}", 0..5)
        ) {
            let conv = Map::new(Text, Text);
            let text = conv.format(&entries);
            prop_assert_eq!(conv.parse(&text).unwrap(), entries);
        }
    }
}
