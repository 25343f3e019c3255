//! Unsigned integers rendered in a non-decimal base.
//!
//! Format always emits the base prefix (`0x`, `0o`, `0b`). Parse accepts the
//! prefixed form or bare digits, and checks every digit against the base
//! before converting so the error names the offending character.

use crate::converter::Converter;
use crate::error::BindfigError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Radix {
    Binary,
    Octal,
    Hex,
}

impl Radix {
    pub fn base(self) -> u32 {
        match self {
            Radix::Binary => 2,
            Radix::Octal => 8,
            Radix::Hex => 16,
        }
    }

    pub fn prefix(self) -> &'static str {
        match self {
            Radix::Binary => "0b",
            Radix::Octal => "0o",
            Radix::Hex => "0x",
        }
    }

    fn name(self) -> &'static str {
        match self {
            Radix::Binary => "binary integer",
            Radix::Octal => "octal integer",
            Radix::Hex => "hexadecimal integer",
        }
    }
}

/// An unsigned integer stored in the given base.
#[derive(Debug, Clone, Copy)]
pub struct RadixInteger {
    radix: Radix,
}

impl RadixInteger {
    pub fn new(radix: Radix) -> Self {
        Self { radix }
    }

    pub fn hex() -> Self {
        Self::new(Radix::Hex)
    }

    pub fn octal() -> Self {
        Self::new(Radix::Octal)
    }

    pub fn binary() -> Self {
        Self::new(Radix::Binary)
    }

    pub fn radix(&self) -> Radix {
        self.radix
    }

    fn strip_prefix<'a>(&self, text: &'a str) -> &'a str {
        let prefix = self.radix.prefix();
        match text.get(..prefix.len()) {
            Some(head) if head.eq_ignore_ascii_case(prefix) => &text[prefix.len()..],
            _ => text,
        }
    }
}

impl Converter for RadixInteger {
    type Value = u64;

    fn type_name(&self) -> &'static str {
        self.radix.name()
    }

    fn parse(&self, text: &str) -> Result<u64, BindfigError> {
        let digits = self.strip_prefix(text.trim());
        if digits.is_empty() {
            return Err(BindfigError::conversion(self.type_name(), text, "no digits"));
        }
        if let Some(bad) = digits.chars().find(|c| !c.is_digit(self.radix.base())) {
            return Err(BindfigError::conversion(
                self.type_name(),
                text,
                format!("invalid digit '{bad}' for base {}", self.radix.base()),
            ));
        }
        u64::from_str_radix(digits, self.radix.base())
            .map_err(|e| BindfigError::conversion(self.type_name(), text, e))
    }

    fn format(&self, value: &u64) -> String {
        match self.radix {
            Radix::Binary => format!("0b{value:b}"),
            Radix::Octal => format!("0o{value:o}"),
            Radix::Hex => format!("0x{value:x}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_format_has_prefix() {
        assert_eq!(RadixInteger::hex().format(&255), "0xff");
        assert_eq!(RadixInteger::octal().format(&8), "0o10");
        assert_eq!(RadixInteger::binary().format(&5), "0b101");
    }

    #[test]
    fn parse_prefixed_and_bare() {
        let hex = RadixInteger::hex();
        assert_eq!(hex.parse("0xff").unwrap(), 255);
        assert_eq!(hex.parse("0XFF").unwrap(), 255);
        assert_eq!(hex.parse("ff").unwrap(), 255);
        assert_eq!(RadixInteger::binary().parse("101").unwrap(), 5);
        assert_eq!(RadixInteger::octal().parse("0o17").unwrap(), 15);
    }

    #[test]
    fn rejects_digit_outside_base() {
        let err = RadixInteger::octal().parse("0o19").unwrap_err();
        assert!(err.to_string().contains("'9'"));
        assert!(RadixInteger::binary().parse("0b102").is_err());
        assert!(RadixInteger::hex().parse("0xfg").is_err());
    }

    #[test]
    fn rejects_empty_digits() {
        assert!(RadixInteger::hex().parse("0x").is_err());
        assert!(RadixInteger::hex().parse("").is_err());
    }

    #[test]
    fn rejects_foreign_prefix() {
        assert!(RadixInteger::octal().parse("0x10").is_err());
    }

    #[test]
    fn zero_round_trips() {
        let hex = RadixInteger::hex();
        assert_eq!(hex.format(&0), "0x0");
        assert_eq!(hex.parse("0x0").unwrap(), 0);
    }

    #[test]
    fn overflow_is_conversion_error() {
        let err = RadixInteger::hex().parse("0x1ffffffffffffffff").unwrap_err();
        assert!(matches!(err, BindfigError::Conversion { .. }));
    }
}
