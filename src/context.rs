//! The context: one store, its change monitor, and the value cache.
//!
//! Everything lives behind a single lock, so a get or set runs its
//! check → read/write → cache update sequence atomically with respect to
//! other threads using the same context. Change callbacks run after the
//! lock is released.
//!
//! # Read path
//!
//! 1. Check the store's revision against the monitor baseline. On the first
//!    access the store is loaded; when the revision moved, it is reloaded.
//! 2. If the address is missing, seed it with the binding's formatted default.
//! 3. Serve from cache when the cached entry was filled at the current
//!    baseline (or holds an unflushed local edit).
//! 4. Otherwise read, parse and validate the stored text, then cache it.
//!
//! # Write path
//!
//! Validate (when type validation is enforced), format, then either write
//! through to the store and persist (write-on-edit) or keep the text as a
//! pending cache entry until [`Context::flush`] or [`Context::persist`].
//! Nothing is mutated when validation fails.
//!
//! Own writes acknowledge the store's new revision, so they never look like
//! external modifications. Cache entries record the baseline they were filled
//! at. An own write carries every entry for other addresses forward to the
//! new baseline, while entries for the written address are left behind, so
//! other bindings on that address re-read on their next access.
//!
//! When several instances hold pending edits for one address, [`Context::persist`]
//! writes the most recently assigned one and drops the others from the cache.

use std::any::Any;
use std::collections::HashMap;

use parking_lot::Mutex;
use tracing::{debug, trace, warn};

use crate::binding::{Binding, BindingId, ChangeEvent, ChangeOrigin, InstanceId};
use crate::converter::Converter;
use crate::error::BindfigError;
use crate::monitor::{Check, Monitor, MonitorState, StaleSignal};
use crate::store::{Listing, Revision, Store};

/// Behavior switches for a context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Settings {
    /// Run the converter's `validate` on assignment.
    pub enforce_type_validation: bool,
    /// Write assignments through to the store unless the binding says otherwise.
    pub write_on_edit_default: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            enforce_type_validation: true,
            write_on_edit_default: true,
        }
    }
}

type CacheKey = (BindingId, InstanceId);

struct CacheEntry {
    section: String,
    option: String,
    text: String,
    value: Box<dyn Any + Send + Sync>,
    revision: Revision,
    /// Assigned locally but not yet written to the store.
    pending: bool,
    /// Assignment order; zero for entries filled by a read.
    sequence: u64,
}

struct Inner {
    store: Box<dyn Store>,
    monitor: Monitor,
    cache: HashMap<CacheKey, CacheEntry>,
    /// The store holds writes that were not persisted yet.
    dirty: bool,
    settings: Settings,
    last_sequence: u64,
}

pub struct Context {
    inner: Mutex<Inner>,
}

pub struct ContextBuilder {
    store: Box<dyn Store>,
    settings: Settings,
}

impl ContextBuilder {
    pub(crate) fn from_boxed(store: Box<dyn Store>) -> Self {
        Self {
            store,
            settings: Settings::default(),
        }
    }

    /// Run converter validation on assignment (default: `true`).
    pub fn enforce_type_validation(mut self, enabled: bool) -> Self {
        self.settings.enforce_type_validation = enabled;
        self
    }

    /// Write assignments through to the store (default: `true`).
    pub fn write_on_edit_default(mut self, enabled: bool) -> Self {
        self.settings.write_on_edit_default = enabled;
        self
    }

    pub fn settings(mut self, settings: Settings) -> Self {
        self.settings = settings;
        self
    }

    pub fn build(self) -> Context {
        Context {
            inner: Mutex::new(Inner {
                store: self.store,
                monitor: Monitor::new(),
                cache: HashMap::new(),
                dirty: false,
                settings: self.settings,
                last_sequence: 0,
            }),
        }
    }
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("Context")
            .field("settings", &inner.settings)
            .field("monitor", &inner.monitor.state())
            .field("cached", &inner.cache.len())
            .field("dirty", &inner.dirty)
            .finish()
    }
}

impl Context {
    pub fn builder<S: Store>(store: S) -> ContextBuilder {
        ContextBuilder::from_boxed(Box::new(store))
    }

    pub fn new<S: Store>(store: S) -> Self {
        Self::builder(store).build()
    }

    pub fn settings(&self) -> Settings {
        self.inner.lock().settings
    }

    pub fn set_enforce_type_validation(&self, enabled: bool) {
        self.inner.lock().settings.enforce_type_validation = enabled;
    }

    pub fn set_write_on_edit_default(&self, enabled: bool) {
        self.inner.lock().settings.write_on_edit_default = enabled;
    }

    pub fn monitor_state(&self) -> MonitorState {
        self.inner.lock().monitor.state()
    }

    /// Handle for marking the store stale from outside (e.g. a file watcher).
    pub fn stale_signal(&self) -> StaleSignal {
        self.inner.lock().monitor.signal()
    }

    /// Current value of `binding` for `instance`.
    pub fn get<C: Converter>(
        &self,
        binding: &Binding<C>,
        instance: InstanceId,
    ) -> Result<C::Value, BindfigError> {
        let (value, event) = self.inner.lock().get(binding, instance)?;
        if let Some(event) = event {
            binding.notify(&event);
        }
        Ok(value)
    }

    /// Assign `value`. All-or-nothing: on error the cache is unchanged.
    pub fn set<C: Converter>(
        &self,
        binding: &Binding<C>,
        instance: InstanceId,
        value: C::Value,
    ) -> Result<(), BindfigError> {
        let event = self.inner.lock().set(binding, instance, value)?;
        if let Some(event) = event {
            binding.notify(&event);
        }
        Ok(())
    }

    /// Write the cached value to the store and persist, regardless of
    /// write-on-edit.
    pub fn flush<C: Converter>(
        &self,
        binding: &Binding<C>,
        instance: InstanceId,
    ) -> Result<(), BindfigError> {
        let event = self.inner.lock().flush(binding, instance)?;
        if let Some(event) = event {
            binding.notify(&event);
        }
        Ok(())
    }

    /// Assign the converter's absent value.
    ///
    /// Fails with [`BindfigError::TypeMismatch`] when the converter has none
    /// (i.e. the binding is not optional).
    pub fn clear<C: Converter>(
        &self,
        binding: &Binding<C>,
        instance: InstanceId,
    ) -> Result<(), BindfigError> {
        let null = binding
            .converter()
            .null_value()
            .ok_or_else(|| BindfigError::TypeMismatch {
                expected: binding.converter().type_name().to_string(),
                found: "null".into(),
            })?;
        self.set(binding, instance, null)
    }

    /// Write every pending edit and persist the store.
    pub fn persist(&self) -> Result<(), BindfigError> {
        self.inner.lock().persist_all()
    }

    /// Every stored entry, after a freshness check.
    pub fn listing(&self) -> Result<Listing, BindfigError> {
        let mut inner = self.inner.lock();
        inner.refresh()?;
        Ok(Listing {
            entries: inner.store.entries(),
        })
    }

    /// Drop an address from the store and the cache. The next get through a
    /// binding on this address seeds its default again.
    pub fn remove(&self, section: &str, option: &str) -> Result<bool, BindfigError> {
        let mut inner = self.inner.lock();
        inner.refresh()?;
        inner
            .cache
            .retain(|_, entry| entry.section != section || entry.option != option);
        if !inner.store.remove(section, option) {
            return Ok(false);
        }
        let persist = inner.settings.write_on_edit_default;
        inner.commit(persist, &[(section, option)])?;
        debug!(section, option, "removed");
        Ok(true)
    }
}

impl Inner {
    fn baseline(&self) -> Revision {
        self.monitor
            .baseline()
            .cloned()
            .unwrap_or(Revision::Missing)
    }

    /// Load on first use, reload when the medium changed.
    fn refresh(&mut self) -> Result<(), BindfigError> {
        let current = self.store.revision()?;
        match self.monitor.check(&current) {
            Check::Fresh => return Ok(()),
            Check::Initial => debug!(revision = ?current, "loading store"),
            Check::Stale => {
                let pending = self.cache.values().filter(|e| e.pending).count();
                if pending > 0 {
                    warn!(
                        pending,
                        "store changed externally while local edits are unflushed"
                    );
                }
                debug!(revision = ?current, "store changed, reloading");
            }
        }
        self.store.load()?;
        self.dirty = false;
        let revision = self.store.revision()?;
        self.monitor.acknowledge(revision);
        Ok(())
    }

    /// Persist (or mark dirty) after an own write to `written`, then adopt
    /// the new revision as the baseline. Entries that were current for other
    /// addresses stay current.
    fn commit(&mut self, persist: bool, written: &[(&str, &str)]) -> Result<(), BindfigError> {
        if persist {
            self.store.persist()?;
            self.dirty = false;
            debug!("store persisted");
        } else {
            self.dirty = true;
        }
        let previous = self.baseline();
        let revision = self.store.revision()?;
        if revision != previous {
            for entry in self.cache.values_mut() {
                let touched = written
                    .iter()
                    .any(|(s, o)| entry.section == *s && entry.option == *o);
                if entry.revision == previous && !touched {
                    entry.revision = revision.clone();
                }
            }
        }
        self.monitor.acknowledge(revision);
        Ok(())
    }

    fn write_on_edit<C: Converter>(&self, binding: &Binding<C>) -> bool {
        binding
            .write_on_edit()
            .unwrap_or(self.settings.write_on_edit_default)
    }

    /// Write the default if the address is missing.
    fn seed<C: Converter>(&mut self, binding: &Binding<C>) -> Result<(), BindfigError> {
        let (section, option) = (binding.section(), binding.option());
        if self.store.has(section, option) {
            return Ok(());
        }
        debug!(section, option, default = binding.default_text(), "seeding default");
        self.store.write(section, option, binding.default_text())?;
        let persist = self.write_on_edit(binding);
        if let Err(e) = self.commit(persist, &[(section, option)]) {
            self.store.remove(section, option);
            return Err(e);
        }
        Ok(())
    }

    fn get<C: Converter>(
        &mut self,
        binding: &Binding<C>,
        instance: InstanceId,
    ) -> Result<(C::Value, Option<ChangeEvent<C::Value>>), BindfigError> {
        let (section, option) = (binding.section(), binding.option());
        self.refresh()?;
        self.seed(binding)?;

        let key = (binding.id(), instance);
        let baseline = self.baseline();
        if let Some(entry) = self.cache.get(&key)
            && (entry.pending || entry.revision == baseline)
            && let Some(value) = entry.value.downcast_ref::<C::Value>()
        {
            trace!(section, option, "cache hit");
            return Ok((value.clone(), None));
        }

        let text = self
            .store
            .read(section, option)
            .unwrap_or_else(|| binding.default_text().to_string());
        let converter = binding.converter();
        let value = converter.validate(converter.parse(&text)?)?;
        trace!(section, option, text = %text, "cache refreshed");

        let previous = self.cache.insert(
            key,
            CacheEntry {
                section: section.to_string(),
                option: option.to_string(),
                text: text.clone(),
                value: Box::new(value.clone()),
                revision: baseline,
                pending: false,
                sequence: 0,
            },
        );
        let event = previous
            .filter(|prev| prev.text != text)
            .map(|prev| ChangeEvent {
                section: section.to_string(),
                option: option.to_string(),
                instance,
                origin: ChangeOrigin::Get,
                old: prev.value.downcast::<C::Value>().ok().map(|b| *b),
                new: value.clone(),
            });
        Ok((value, event))
    }

    fn set<C: Converter>(
        &mut self,
        binding: &Binding<C>,
        instance: InstanceId,
        value: C::Value,
    ) -> Result<Option<ChangeEvent<C::Value>>, BindfigError> {
        let (section, option) = (binding.section(), binding.option());
        let converter = binding.converter();
        let value = if self.settings.enforce_type_validation {
            converter.validate(value)?
        } else {
            value
        };
        let text = converter.format(&value);
        self.refresh()?;

        let key = (binding.id(), instance);
        let prior: Option<(String, Option<C::Value>)> = match self.cache.get(&key) {
            Some(entry) => Some((
                entry.text.clone(),
                entry.value.downcast_ref::<C::Value>().cloned(),
            )),
            None => self
                .store
                .read(section, option)
                .map(|t| (t.clone(), converter.parse(&t).ok())),
        };

        let write_now = self.write_on_edit(binding);
        if write_now {
            let stored = self.store.read(section, option);
            self.store.write(section, option, &text)?;
            if let Err(e) = self.commit(true, &[(section, option)]) {
                // Leave the in-memory store as it was before the write.
                match stored {
                    Some(old) => {
                        if let Err(rollback) = self.store.write(section, option, &old) {
                            warn!(
                                section,
                                option,
                                error = %rollback,
                                "failed to restore previous value"
                            );
                        }
                    }
                    None => {
                        self.store.remove(section, option);
                    }
                }
                return Err(e);
            }
            debug!(section, option, text = %text, "value written");
        } else {
            trace!(section, option, text = %text, "value cached, pending flush");
        }

        let revision = self.baseline();
        self.last_sequence += 1;
        self.cache.insert(
            key,
            CacheEntry {
                section: section.to_string(),
                option: option.to_string(),
                text: text.clone(),
                value: Box::new(value.clone()),
                revision,
                pending: !write_now,
                sequence: self.last_sequence,
            },
        );

        let event = match prior {
            Some((old_text, _)) if old_text == text => None,
            Some((_, old)) => Some(ChangeEvent {
                section: section.to_string(),
                option: option.to_string(),
                instance,
                origin: ChangeOrigin::Set,
                old,
                new: value,
            }),
            None => Some(ChangeEvent {
                section: section.to_string(),
                option: option.to_string(),
                instance,
                origin: ChangeOrigin::Set,
                old: None,
                new: value,
            }),
        };
        Ok(event)
    }

    fn flush<C: Converter>(
        &mut self,
        binding: &Binding<C>,
        instance: InstanceId,
    ) -> Result<Option<ChangeEvent<C::Value>>, BindfigError> {
        let (section, option) = (binding.section(), binding.option());
        let key = (binding.id(), instance);
        self.refresh()?;
        let pending = self.cache.get(&key).is_some_and(|e| e.pending);
        let event = if pending {
            None
        } else {
            self.get(binding, instance)?.1
        };
        let Some(text) = self.cache.get(&key).map(|e| e.text.clone()) else {
            return Ok(event);
        };

        self.store.write(section, option, &text)?;
        self.commit(true, &[(section, option)])?;
        let baseline = self.baseline();
        if let Some(entry) = self.cache.get_mut(&key) {
            entry.pending = false;
            entry.revision = baseline;
        }
        debug!(section, option, "flushed");
        Ok(event)
    }

    fn persist_all(&mut self) -> Result<(), BindfigError> {
        self.refresh()?;
        let mut pending: Vec<(CacheKey, u64)> = self
            .cache
            .iter()
            .filter(|(_, e)| e.pending)
            .map(|(key, e)| (*key, e.sequence))
            .collect();
        if pending.is_empty() && !self.dirty {
            return Ok(());
        }
        // Oldest first, so the latest assignment to an address wins.
        pending.sort_by_key(|(_, sequence)| *sequence);

        let mut winners: HashMap<(String, String), CacheKey> = HashMap::new();
        for (key, _) in &pending {
            if let Some(entry) = self.cache.get(key) {
                self.store.write(&entry.section, &entry.option, &entry.text)?;
                winners.insert((entry.section.clone(), entry.option.clone()), *key);
            }
        }
        let written: Vec<(&str, &str)> = winners
            .keys()
            .map(|(s, o)| (s.as_str(), o.as_str()))
            .collect();
        self.commit(true, &written)?;

        let baseline = self.baseline();
        for (key, _) in pending {
            let Some(entry) = self.cache.get_mut(&key) else {
                continue;
            };
            let address = (entry.section.clone(), entry.option.clone());
            if winners.get(&address) == Some(&key) {
                entry.pending = false;
                entry.revision = baseline.clone();
            } else {
                self.cache.remove(&key);
            }
        }
        Ok(())
    }
}
