//! Binding descriptors.
//!
//! A [`Binding`] names one configuration slot: an address `(section, option)`,
//! the converter for its values, and a default. It is created once per
//! declared attribute and shared by every instance of the owning type; it
//! holds no values itself. Cached values live in the [`Context`], keyed by
//! the binding's identity and an [`InstanceId`].
//!
//! ```ignore
//! struct AppConfig;
//!
//! static PORT: Lazy<Binding<Validated<Integer>>> = Lazy::new(|| {
//!     Binding::builder(Integer.bounded(1..=65535), 8080)
//!         .owner::<AppConfig>()
//!         .attribute("port")
//!         .build()
//!         .expect("valid binding")
//! });
//!
//! let port = PORT.get()?;   // seeds [AppConfig] port = 8080 on first access
//! PORT.set(9000)?;          // validated, formatted, written back
//! ```
//!
//! Several bindings may alias the same address by setting `.section()` and
//! `.option()` explicitly; they observe each other's writes.

use std::any::type_name;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::context::Context;
use crate::converter::Converter;
use crate::error::BindfigError;
use crate::state;

/// Identity of a binding, unique for the process lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BindingId(u64);

impl BindingId {
    fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        BindingId(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

/// Identity of an owning instance.
///
/// [`InstanceId::SHARED`] is the slot used by [`Binding::get`] and friends.
/// Instances that need their own unflushed values allocate an id with
/// [`InstanceId::new`] and go through [`Binding::of`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InstanceId(u64);

impl InstanceId {
    pub const SHARED: InstanceId = InstanceId(0);

    /// A fresh id, distinct from every other id in the process.
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        InstanceId(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

/// How a change was observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeOrigin {
    /// A read found different stored text than the cached one.
    Get,
    /// An assignment changed the stored text.
    Set,
}

#[derive(Debug, Clone)]
pub struct ChangeEvent<T> {
    pub section: String,
    pub option: String,
    pub instance: InstanceId,
    pub origin: ChangeOrigin,
    /// Previous value, when one was known and still parses.
    pub old: Option<T>,
    pub new: T,
}

type Callback<T> = Arc<dyn Fn(&ChangeEvent<T>) + Send + Sync>;

pub struct Binding<C: Converter> {
    id: BindingId,
    section: String,
    option: String,
    converter: C,
    default: C::Value,
    default_text: String,
    write_on_edit: Option<bool>,
    on_change: Option<Callback<C::Value>>,
}

impl<C: Converter> fmt::Debug for Binding<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Binding")
            .field("section", &self.section)
            .field("option", &self.option)
            .field("type", &self.converter.type_name())
            .field("default", &self.default_text)
            .field("write_on_edit", &self.write_on_edit)
            .finish()
    }
}

impl<C: Converter> Binding<C> {
    pub fn builder(converter: C, default: C::Value) -> BindingBuilder<C> {
        BindingBuilder {
            converter,
            default,
            owner: None,
            attribute: None,
            section: None,
            option: None,
            write_on_edit: None,
            on_change: None,
        }
    }

    pub(crate) fn id(&self) -> BindingId {
        self.id
    }

    pub fn section(&self) -> &str {
        &self.section
    }

    pub fn option(&self) -> &str {
        &self.option
    }

    pub fn converter(&self) -> &C {
        &self.converter
    }

    pub fn default(&self) -> &C::Value {
        &self.default
    }

    /// The default in its stored form, written when the address is seeded.
    pub fn default_text(&self) -> &str {
        &self.default_text
    }

    /// Binding-level override of the context's write-on-edit default.
    pub fn write_on_edit(&self) -> Option<bool> {
        self.write_on_edit
    }

    pub(crate) fn notify(&self, event: &ChangeEvent<C::Value>) {
        if let Some(callback) = &self.on_change {
            callback(event);
        }
    }

    /// This binding scoped to one owning instance.
    pub fn of(&self, instance: InstanceId) -> Slot<'_, C> {
        Slot {
            binding: self,
            instance,
        }
    }

    /// Current value, through the process-wide context.
    pub fn get(&self) -> Result<C::Value, BindfigError> {
        self.of(InstanceId::SHARED).get()
    }

    pub fn set(&self, value: C::Value) -> Result<(), BindfigError> {
        self.of(InstanceId::SHARED).set(value)
    }

    pub fn flush(&self) -> Result<(), BindfigError> {
        self.of(InstanceId::SHARED).flush()
    }

    pub fn clear(&self) -> Result<(), BindfigError> {
        self.of(InstanceId::SHARED).clear()
    }
}

/// A binding scoped to one instance, resolved against the process-wide
/// context on every call.
#[derive(Debug)]
pub struct Slot<'a, C: Converter> {
    binding: &'a Binding<C>,
    instance: InstanceId,
}

impl<C: Converter> Slot<'_, C> {
    pub fn instance(&self) -> InstanceId {
        self.instance
    }

    pub fn get(&self) -> Result<C::Value, BindfigError> {
        state::context()?.get(self.binding, self.instance)
    }

    pub fn set(&self, value: C::Value) -> Result<(), BindfigError> {
        state::context()?.set(self.binding, self.instance, value)
    }

    pub fn flush(&self) -> Result<(), BindfigError> {
        state::context()?.flush(self.binding, self.instance)
    }

    pub fn clear(&self) -> Result<(), BindfigError> {
        state::context()?.clear(self.binding, self.instance)
    }

    /// Same operations against an explicit context instead of the
    /// process-wide one.
    pub fn get_in(&self, context: &Context) -> Result<C::Value, BindfigError> {
        context.get(self.binding, self.instance)
    }

    pub fn set_in(&self, context: &Context, value: C::Value) -> Result<(), BindfigError> {
        context.set(self.binding, self.instance, value)
    }

    pub fn flush_in(&self, context: &Context) -> Result<(), BindfigError> {
        context.flush(self.binding, self.instance)
    }

    pub fn clear_in(&self, context: &Context) -> Result<(), BindfigError> {
        context.clear(self.binding, self.instance)
    }
}

pub struct BindingBuilder<C: Converter> {
    converter: C,
    default: C::Value,
    owner: Option<String>,
    attribute: Option<String>,
    section: Option<String>,
    option: Option<String>,
    write_on_edit: Option<bool>,
    on_change: Option<Callback<C::Value>>,
}

/// Last path segment of a type name, without generic arguments.
pub(crate) fn short_type_name<T: ?Sized>() -> &'static str {
    let full = type_name::<T>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}

fn non_empty(name: Option<String>) -> Option<String> {
    name.filter(|n| !n.is_empty())
}

impl<C: Converter> BindingBuilder<C> {
    /// The owning type; its short name becomes the default section.
    pub fn owner<T: ?Sized>(mut self) -> Self {
        self.owner = Some(short_type_name::<T>().to_string());
        self
    }

    /// The attribute name; becomes the default option.
    pub fn attribute(mut self, name: &str) -> Self {
        self.attribute = Some(name.to_string());
        self
    }

    /// Explicit section, overriding the owner's name.
    pub fn section(mut self, name: &str) -> Self {
        self.section = Some(name.to_string());
        self
    }

    /// Explicit option, overriding the attribute name.
    pub fn option(mut self, name: &str) -> Self {
        self.option = Some(name.to_string());
        self
    }

    /// Override the context's write-on-edit default for this binding.
    pub fn write_on_edit(mut self, enabled: bool) -> Self {
        self.write_on_edit = Some(enabled);
        self
    }

    /// Called after a get or set observes a changed stored text.
    ///
    /// Runs outside the context lock, so the callback may use bindings.
    pub fn on_change<F>(mut self, callback: F) -> Self
    where
        F: Fn(&ChangeEvent<C::Value>) + Send + Sync + 'static,
    {
        self.on_change = Some(Arc::new(callback));
        self
    }

    /// Resolve the address and check the default against the converter.
    pub fn build(self) -> Result<Binding<C>, BindfigError> {
        let option = non_empty(self.option)
            .or(non_empty(self.attribute))
            .ok_or(BindfigError::AttributeNameRequired)?;
        let section = non_empty(self.section)
            .or(non_empty(self.owner))
            .ok_or(BindfigError::SectionRequired)?;
        let default = self.converter.validate(self.default)?;
        let default_text = self.converter.format(&default);

        Ok(Binding {
            id: BindingId::next(),
            section,
            option,
            converter: self.converter,
            default,
            default_text,
            write_on_edit: self.write_on_edit,
            on_change: self.on_change,
        })
    }
}
