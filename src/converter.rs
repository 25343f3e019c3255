//! The converter contract and the wrappers that compose converters.
//!
//! A [`Converter`] owns one value shape and three operations: `parse` (text to
//! value, used when reading from the store), `format` (value to canonical
//! text, used when writing) and `validate` (domain constraints on an
//! already-typed value, used on both paths). Converters are immutable once
//! built and hold no per-binding state.
//!
//! Composition happens by wrapping rather than by subtyping:
//!
//! - [`Optional`] adds an absent state encoded by a reserved sentinel token.
//! - [`Validated`] adds a user constraint on top of the wrapped converter's own.
//! - The collection converters in [`collection`](crate::collection) wrap an
//!   element converter with a separator/escape policy.
//!
//! [`ConverterExt`] provides the combinators as chained methods:
//!
//! ```ignore
//! let port = Integer.bounded(1..=65535);
//! let tags = Text.list();
//! let token = Text.optional();
//! ```

use std::fmt::Debug;
use std::ops::RangeBounds;
use std::sync::Arc;

use crate::collection::List;
use crate::error::BindfigError;

/// Canonical text for the absent state of an [`Optional`] converter.
pub const NULL_SENTINEL: &str = "null";

/// A parse/format/validate unit for one value shape.
pub trait Converter: Send + Sync + 'static {
    type Value: Clone + Send + Sync + 'static;

    /// Short name of the target shape, used in error messages.
    fn type_name(&self) -> &'static str;

    /// Convert stored text into a typed value.
    fn parse(&self, text: &str) -> Result<Self::Value, BindfigError>;

    /// Render a typed value in its canonical textual form.
    fn format(&self, value: &Self::Value) -> String;

    /// Check domain constraints on an already-typed value.
    fn validate(&self, value: Self::Value) -> Result<Self::Value, BindfigError> {
        Ok(value)
    }

    /// The absent value, for converters that have one.
    fn null_value(&self) -> Option<Self::Value> {
        None
    }
}

type Check<T> = Arc<dyn Fn(&T) -> Result<(), String> + Send + Sync>;

/// A converter with an extra user-defined constraint.
///
/// The wrapped converter's own `validate` runs first, then the check.
pub struct Validated<C: Converter> {
    inner: C,
    check: Check<C::Value>,
}

impl<C: Converter> Validated<C> {
    pub fn new<F>(inner: C, check: F) -> Self
    where
        F: Fn(&C::Value) -> Result<(), String> + Send + Sync + 'static,
    {
        Self {
            inner,
            check: Arc::new(check),
        }
    }
}

impl<C: Converter> Converter for Validated<C> {
    type Value = C::Value;

    fn type_name(&self) -> &'static str {
        self.inner.type_name()
    }

    fn parse(&self, text: &str) -> Result<Self::Value, BindfigError> {
        self.inner.parse(text)
    }

    fn format(&self, value: &Self::Value) -> String {
        self.inner.format(value)
    }

    fn validate(&self, value: Self::Value) -> Result<Self::Value, BindfigError> {
        let value = self.inner.validate(value)?;
        (self.check)(&value).map_err(|reason| BindfigError::validation(self.type_name(), reason))?;
        Ok(value)
    }

    fn null_value(&self) -> Option<Self::Value> {
        self.inner.null_value()
    }
}

/// Wraps a converter with an absent state.
///
/// The absent state is stored as a single reserved token ([`NULL_SENTINEL`]
/// unless overridden). Parsing that exact token yields `None`; any other text
/// goes to the wrapped converter. A present value whose formatted text would
/// equal the sentinel is rejected by `validate`, so the sentinel never stands
/// for a real value.
pub struct Optional<C> {
    inner: C,
    sentinel: String,
}

impl<C: Converter> Optional<C> {
    pub fn new(inner: C) -> Self {
        Self {
            inner,
            sentinel: NULL_SENTINEL.to_string(),
        }
    }

    /// Use a different reserved token for the absent state.
    pub fn with_sentinel(mut self, sentinel: &str) -> Self {
        self.sentinel = sentinel.to_string();
        self
    }

    pub fn sentinel(&self) -> &str {
        &self.sentinel
    }

    pub fn inner(&self) -> &C {
        &self.inner
    }
}

impl<C: Converter> Converter for Optional<C> {
    type Value = Option<C::Value>;

    fn type_name(&self) -> &'static str {
        self.inner.type_name()
    }

    fn parse(&self, text: &str) -> Result<Self::Value, BindfigError> {
        if text == self.sentinel {
            return Ok(None);
        }
        self.inner.parse(text).map(Some)
    }

    fn format(&self, value: &Self::Value) -> String {
        match value {
            Some(v) => self.inner.format(v),
            None => self.sentinel.clone(),
        }
    }

    fn validate(&self, value: Self::Value) -> Result<Self::Value, BindfigError> {
        match value {
            None => Ok(None),
            Some(v) => {
                if self.inner.format(&v) == self.sentinel {
                    return Err(BindfigError::validation(
                        self.type_name(),
                        format!("'{}' is reserved for the absent value", self.sentinel),
                    ));
                }
                self.inner.validate(v).map(Some)
            }
        }
    }

    fn null_value(&self) -> Option<Self::Value> {
        Some(None)
    }
}

/// Chained combinators available on every converter.
pub trait ConverterExt: Converter + Sized {
    /// Allow the absent state.
    fn optional(self) -> Optional<Self> {
        Optional::new(self)
    }

    /// An ordered list of this converter's values, `,`-separated.
    fn list(self) -> List<Self> {
        List::new(self)
    }

    /// Add a custom constraint. The closure returns the rejection reason.
    fn validate_with<F>(self, check: F) -> Validated<Self>
    where
        F: Fn(&Self::Value) -> Result<(), String> + Send + Sync + 'static,
    {
        Validated::new(self, check)
    }

    /// Restrict values to a range.
    fn bounded<R>(self, range: R) -> Validated<Self>
    where
        Self::Value: PartialOrd + Debug,
        R: RangeBounds<Self::Value> + Send + Sync + 'static,
    {
        Validated::new(self, move |value| {
            if range.contains(value) {
                Ok(())
            } else {
                Err(format!("{value:?} is outside the allowed range"))
            }
        })
    }

    /// Restrict values to an explicit set.
    fn one_of(self, allowed: Vec<Self::Value>) -> Validated<Self>
    where
        Self::Value: PartialEq + Debug,
    {
        Validated::new(self, move |value| {
            if allowed.contains(value) {
                Ok(())
            } else {
                Err(format!("{value:?} is not one of {allowed:?}"))
            }
        })
    }
}

impl<C: Converter> ConverterExt for C {}
