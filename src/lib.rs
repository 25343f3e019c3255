//! Typed configuration bindings for Rust applications. Declare a slot, point
//! at a file, and read and write typed values.
//!
//! Bindfig binds strongly-typed values to named configuration slots, converts
//! between those values and the text stored in a configuration file, and
//! writes changes back as they happen.
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
//! bindfig::set_path("myapp.ini")?;
//! let port = PORT.get()?;   // 8080, and `[AppConfig] port = 8080` is now in the file
//! PORT.set(9000)?;          // validated, then written back
//! ```
//!
//! # Why bindfig
//!
//! Settings that users edit, and that the application also changes at
//! runtime, usually end up with hand-written parsing on the way in and
//! hand-written formatting on the way out, with validation scattered across
//! both. Bindfig puts all three behind one [`Converter`] per value shape and
//! one [`Binding`] per slot, so the same rules apply whichever way a value
//! travels.
//!
//! # Bindings
//!
//! A [`Binding`] is created once per declared attribute and shared by every
//! instance of the owning type. Its address is `(section, option)`:
//!
//! - **section** defaults to the owner's short type name
//!   ([`owner::<T>()`](BindingBuilder::owner)), overridable with
//!   [`section()`](BindingBuilder::section).
//! - **option** defaults to the attribute name, overridable with
//!   [`option()`](BindingBuilder::option).
//!
//! Setting both explicitly lets several bindings alias one address. Values
//! are cached per binding and per [`InstanceId`]; the binding itself holds
//! none.
//!
//! The first read of an address that is missing from the store writes the
//! binding's formatted default, so the file always shows every setting the
//! application uses.
//!
//! # Converters
//!
//! Every converter implements three operations: `parse` (text to value),
//! `format` (value to canonical text) and `validate` (domain constraints).
//! `validate` runs on both paths: after parsing stored text, and on
//! assignment before anything is written.
//!
//! | Module | Converters |
//! |--------|------------|
//! | [`primitive`] | [`Text`], [`Integer`], [`Float`], [`Boolean`], [`NullValue`] |
//! | [`radix`] | [`RadixInteger`] (`0xff`, `0o17`, `0b101`) |
//! | [`enums`] | [`Named`], [`IntEnum`], [`Flags`] |
//! | [`temporal`] | [`DateTimeIso`], [`DateIso`], [`TimeIso`], [`DurationIso`] |
//! | [`link`] | [`UrlValue`] |
//! | [`collection`] | [`List`], [`Set`], [`Map`], [`Pair`] |
//!
//! Converters compose by wrapping, through [`ConverterExt`]:
//!
//! ```ignore
//! Integer.bounded(1..=65535)          // range check
//! Text.optional()                     // "null" means absent
//! Text.one_of(vec!["a".into()])       // allowed set
//! Integer.list()                      // "1,2,3"
//! ```
//!
//! Collections escape their separator and escape characters inside element
//! text, so any element survives a round trip, including the empty string.
//!
//! # Stores
//!
//! A [`Store`] is the persistence medium. [`set_path`] picks one from the
//! file extension:
//!
//! | Extension | Store | Layout |
//! |-----------|-------|--------|
//! | `.ini`, `.cfg`, `.conf` | [`IniStore`] | `[Section]` / `option = value` |
//! | `.toml` | [`TomlStore`] | tables per section, comments preserved |
//! | `.json` | [`JsonStore`] | object of objects |
//! | `.env` | [`DotenvStore`] | flat `SECTION_OPTION=value`, env overrides |
//!
//! [`MemoryStore`] keeps everything in process, which is handy for tests.
//! Custom media implement [`Store`] and go through [`set_store`].
//!
//! # Freshness
//!
//! Every access compares the store's [`Revision`] (a content digest for
//! files) against the one recorded at the last load. When the file changed
//! behind the application's back, the store is reloaded and cached values
//! are re-read; otherwise reads are served from cache. No background thread
//! polls; a [`StaleSignal`] lets an external watcher force the next check.
//!
//! # Writing
//!
//! With write-on-edit (the default) an assignment validates, formats, writes
//! and persists in one step. With it off, globally via
//! [`set_write_on_edit_default`] or per binding via
//! [`write_on_edit()`](BindingBuilder::write_on_edit), assignments stay in
//! the cache until [`Binding::flush`] or [`persist`]. Either way a failed
//! validation leaves the cache and the store untouched.
//!
//! # Process-wide state
//!
//! [`set_store`], [`set_path`] and [`set_location`] install exactly one live
//! [`Context`]; accessing a binding before that fails with
//! [`BindfigError::NotConfigured`]. [`reset`] drops it again. Code that wants
//! no globals at all can build a [`Context`] directly and pass it around.
//!
//! # Error handling
//!
//! All fallible operations return [`BindfigError`]. Messages quote the
//! offending text and name the target type, and missing prerequisites name
//! the call that fixes them. See the [`error`] module for the full set.

pub mod error;

pub mod collection;
pub mod converter;
pub mod enums;
pub mod link;
pub mod primitive;
pub mod radix;
pub mod temporal;

pub mod dotenv;
pub mod file;
pub mod ini;
#[cfg(feature = "json")]
pub mod json_doc;
pub mod memory;
pub mod store;
#[cfg(feature = "toml")]
pub mod toml_doc;

pub mod binding;
pub mod context;
pub mod monitor;
pub mod state;

#[cfg(test)]
mod fixtures;

pub use binding::{
    Binding, BindingBuilder, ChangeEvent, ChangeOrigin, InstanceId, Slot,
};
pub use collection::{Delimiters, List, Map, Pair, Set};
pub use context::{Context, ContextBuilder, Settings};
pub use converter::{Converter, ConverterExt, NULL_SENTINEL, Optional, Validated};
pub use dotenv::{DotenvStore, EnvOverlay};
pub use enums::{ConfigEnum, FlagSet, Flags, IntEnum, IntValued, Named};
pub use error::BindfigError;
pub use file::{Location, open_store};
pub use ini::IniStore;
#[cfg(feature = "json")]
pub use json_doc::JsonStore;
pub use link::UrlValue;
pub use memory::MemoryStore;
pub use monitor::{MonitorState, StaleSignal};
pub use primitive::{Boolean, Float, Integer, NullValue, Text};
pub use radix::{Radix, RadixInteger};
pub use state::{
    context, persist, reset, set_enforce_type_validation, set_location, set_path, set_store,
    set_write_on_edit_default,
};
pub use store::{Entry, Listing, Revision, Store};
pub use temporal::{DateIso, DateTimeIso, DurationIso, TimeIso, Timestamp};
#[cfg(feature = "toml")]
pub use toml_doc::TomlStore;
