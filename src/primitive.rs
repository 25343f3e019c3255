//! Converters for scalar values: text, integers, floats, booleans and null.

use crate::converter::{Converter, NULL_SENTINEL};
use crate::error::BindfigError;

/// Identity converter for free-form text. Accepts the empty string.
#[derive(Debug, Clone, Copy, Default)]
pub struct Text;

impl Converter for Text {
    type Value = String;

    fn type_name(&self) -> &'static str {
        "text"
    }

    fn parse(&self, text: &str) -> Result<String, BindfigError> {
        Ok(text.to_string())
    }

    fn format(&self, value: &String) -> String {
        value.clone()
    }
}

/// Decimal signed integer.
#[derive(Debug, Clone, Copy, Default)]
pub struct Integer;

impl Converter for Integer {
    type Value = i64;

    fn type_name(&self) -> &'static str {
        "integer"
    }

    fn parse(&self, text: &str) -> Result<i64, BindfigError> {
        text.trim()
            .parse::<i64>()
            .map_err(|e| BindfigError::conversion(self.type_name(), text, e))
    }

    fn format(&self, value: &i64) -> String {
        value.to_string()
    }
}

/// 64-bit floating point number.
#[derive(Debug, Clone, Copy, Default)]
pub struct Float;

impl Converter for Float {
    type Value = f64;

    fn type_name(&self) -> &'static str {
        "float"
    }

    fn parse(&self, text: &str) -> Result<f64, BindfigError> {
        text.trim()
            .parse::<f64>()
            .map_err(|e| BindfigError::conversion(self.type_name(), text, e))
    }

    fn format(&self, value: &f64) -> String {
        value.to_string()
    }
}

const TRUE_TOKENS: &[&str] = &["true", "yes", "on", "1"];
const FALSE_TOKENS: &[&str] = &["false", "no", "off", "0"];

/// Boolean with canonical tokens `true` / `false`.
///
/// Parsing is case-insensitive and also accepts `yes`/`no`, `on`/`off` and
/// `1`/`0`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Boolean;

impl Converter for Boolean {
    type Value = bool;

    fn type_name(&self) -> &'static str {
        "boolean"
    }

    fn parse(&self, text: &str) -> Result<bool, BindfigError> {
        let token = text.trim().to_ascii_lowercase();
        if TRUE_TOKENS.contains(&token.as_str()) {
            return Ok(true);
        }
        if FALSE_TOKENS.contains(&token.as_str()) {
            return Ok(false);
        }
        Err(BindfigError::conversion(
            self.type_name(),
            text,
            "expected one of true/false, yes/no, on/off, 1/0",
        ))
    }

    fn format(&self, value: &bool) -> String {
        if *value { "true" } else { "false" }.to_string()
    }
}

/// A slot whose only legal value is null.
///
/// Parses `null`, `none` and `nil` (case-insensitively) and formats
/// [`NULL_SENTINEL`].
#[derive(Debug, Clone, Copy, Default)]
pub struct NullValue;

impl Converter for NullValue {
    type Value = ();

    fn type_name(&self) -> &'static str {
        "null"
    }

    fn parse(&self, text: &str) -> Result<(), BindfigError> {
        match text.trim().to_ascii_lowercase().as_str() {
            "null" | "none" | "nil" => Ok(()),
            _ => Err(BindfigError::conversion(
                self.type_name(),
                text,
                "expected null, none or nil",
            )),
        }
    }

    fn format(&self, _value: &()) -> String {
        NULL_SENTINEL.to_string()
    }

    fn null_value(&self) -> Option<()> {
        Some(())
    }
}
