//! Enumeration converters.
//!
//! Three encodings are supported, matching how enumerations usually show up
//! in config files:
//!
//! | Converter | Stored as | Requires |
//! |-----------|-----------|----------|
//! | [`Named`] | member name (`fast`) | [`ConfigEnum`] |
//! | [`IntEnum`] | integer value (`2`) | [`IntValued`] |
//! | [`Flags`] | bit union as an integer (`5`) | [`FlagSet`] |
//!
//! [`Flags`] also parses unions of member names (`READ|EXEC`) when the flag
//! type lists them in [`FlagSet::named`].
//!
//! Unrecognized tokens fail with [`BindfigError::UnknownMember`].

use std::marker::PhantomData;

use crate::converter::Converter;
use crate::error::BindfigError;

/// An enumeration whose members have canonical names.
pub trait ConfigEnum: Sized + Clone + PartialEq + Send + Sync + 'static {
    /// Name used in error messages.
    const TYPE_NAME: &'static str;
    /// Every member, in declaration order.
    const MEMBERS: &'static [Self];

    fn name(&self) -> &'static str;
}

/// An enumeration whose members carry an integer value.
pub trait IntValued: ConfigEnum {
    fn value(&self) -> i64;
}

/// A bit-set type, stored as the integer union of its bits.
pub trait FlagSet: Copy + PartialEq + Send + Sync + 'static {
    const TYPE_NAME: &'static str;

    /// Union of every defined bit.
    fn all_bits() -> u64;
    fn bits(self) -> u64;
    fn from_bits(bits: u64) -> Self;

    /// Named members and their bits, for parsing `A|B` unions.
    fn named() -> &'static [(&'static str, u64)] {
        &[]
    }
}

/// Stores a member by name.
///
/// Qualified tokens (`Mode.fast`, `Mode::fast`) are accepted on parse; only
/// the last segment is matched. Matching is case-sensitive.
pub struct Named<E>(PhantomData<fn() -> E>);

impl<E: ConfigEnum> Named<E> {
    pub fn new() -> Self {
        Self(PhantomData)
    }
}

impl<E: ConfigEnum> Default for Named<E> {
    fn default() -> Self {
        Self::new()
    }
}

fn last_segment(token: &str) -> &str {
    let token = token.rsplit("::").next().unwrap_or(token);
    token.rsplit('.').next().unwrap_or(token)
}

impl<E: ConfigEnum> Converter for Named<E> {
    type Value = E;

    fn type_name(&self) -> &'static str {
        E::TYPE_NAME
    }

    fn parse(&self, text: &str) -> Result<E, BindfigError> {
        let token = last_segment(text.trim());
        E::MEMBERS
            .iter()
            .find(|member| member.name() == token)
            .cloned()
            .ok_or_else(|| BindfigError::UnknownMember {
                target: E::TYPE_NAME,
                token: text.to_string(),
            })
    }

    fn format(&self, value: &E) -> String {
        value.name().to_string()
    }
}

/// Stores a member by its integer value.
pub struct IntEnum<E>(PhantomData<fn() -> E>);

impl<E: IntValued> IntEnum<E> {
    pub fn new() -> Self {
        Self(PhantomData)
    }
}

impl<E: IntValued> Default for IntEnum<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: IntValued> Converter for IntEnum<E> {
    type Value = E;

    fn type_name(&self) -> &'static str {
        E::TYPE_NAME
    }

    fn parse(&self, text: &str) -> Result<E, BindfigError> {
        let raw: i64 = text
            .trim()
            .parse()
            .map_err(|e| BindfigError::conversion(E::TYPE_NAME, text, e))?;
        E::MEMBERS
            .iter()
            .find(|member| member.value() == raw)
            .cloned()
            .ok_or_else(|| BindfigError::UnknownMember {
                target: E::TYPE_NAME,
                token: text.to_string(),
            })
    }

    fn format(&self, value: &E) -> String {
        value.value().to_string()
    }
}

fn union_of_names<F: FlagSet>(text: &str, trimmed: &str) -> Result<u64, BindfigError> {
    let mut bits = 0;
    for token in trimmed.split('|').map(str::trim) {
        if token.is_empty() {
            return Err(BindfigError::conversion(F::TYPE_NAME, text, "empty flag name"));
        }
        let name = token.rsplit(['.', ':']).next().unwrap_or(token);
        let (_, bit) = F::named()
            .iter()
            .find(|(member, _)| *member == name)
            .ok_or_else(|| BindfigError::UnknownMember {
                target: F::TYPE_NAME,
                token: token.to_string(),
            })?;
        bits |= bit;
    }
    Ok(bits)
}

/// Stores a flag set as the decimal integer union of its bits.
pub struct Flags<F>(PhantomData<fn() -> F>);

impl<F: FlagSet> Flags<F> {
    pub fn new() -> Self {
        Self(PhantomData)
    }
}

impl<F: FlagSet> Default for Flags<F> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F: FlagSet> Converter for Flags<F> {
    type Value = F;

    fn type_name(&self) -> &'static str {
        F::TYPE_NAME
    }

    fn parse(&self, text: &str) -> Result<F, BindfigError> {
        let trimmed = text.trim();
        let bits = match trimmed.parse::<u64>() {
            Ok(bits) => bits,
            Err(e) if F::named().is_empty() || trimmed.is_empty() => {
                return Err(BindfigError::conversion(F::TYPE_NAME, text, e));
            }
            Err(_) => union_of_names::<F>(text, trimmed)?,
        };
        if bits & !F::all_bits() != 0 {
            return Err(BindfigError::UnknownMember {
                target: F::TYPE_NAME,
                token: text.to_string(),
            });
        }
        Ok(F::from_bits(bits))
    }

    fn format(&self, value: &F) -> String {
        value.bits().to_string()
    }

    fn validate(&self, value: F) -> Result<F, BindfigError> {
        let unknown = value.bits() & !F::all_bits();
        if unknown != 0 {
            return Err(BindfigError::validation(
                F::TYPE_NAME,
                format!("undefined bits {unknown:#b}"),
            ));
        }
        Ok(value)
    }
}
