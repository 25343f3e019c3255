//! Process-wide configuration state.
//!
//! Bindings resolve their context here. The lifecycle is explicit:
//!
//! ```text
//! uninitialized ──set_store / set_path──▶ live ──reset──▶ uninitialized
//! ```
//!
//! Any binding access before initialization fails with
//! [`BindfigError::NotConfigured`]; installing a second store while one is
//! live fails with [`BindfigError::AlreadyConfigured`]. [`reset`] exists for
//! test isolation and for hosts that genuinely switch files.
//!
//! The two global flags seed every context installed afterwards and are
//! applied immediately to the live one.

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::RwLock;
use tracing::debug;

use crate::context::{Context, ContextBuilder};
use crate::error::BindfigError;
use crate::file::{self, Location};
use crate::store::Store;

static ACTIVE: RwLock<Option<Arc<Context>>> = parking_lot::const_rwlock(None);
static ENFORCE_TYPE_VALIDATION: AtomicBool = AtomicBool::new(true);
static WRITE_ON_EDIT_DEFAULT: AtomicBool = AtomicBool::new(true);

fn install(store: Box<dyn Store>) -> Result<Arc<Context>, BindfigError> {
    let mut active = ACTIVE.write();
    if active.is_some() {
        return Err(BindfigError::AlreadyConfigured);
    }
    let context = Arc::new(
        ContextBuilder::from_boxed(store)
            .enforce_type_validation(ENFORCE_TYPE_VALIDATION.load(Ordering::Acquire))
            .write_on_edit_default(WRITE_ON_EDIT_DEFAULT.load(Ordering::Acquire))
            .build(),
    );
    *active = Some(Arc::clone(&context));
    debug!("configuration store installed");
    Ok(context)
}

/// Install `store` as the process-wide backing store.
pub fn set_store<S: Store>(store: S) -> Result<Arc<Context>, BindfigError> {
    install(Box::new(store))
}

/// Install a file store, choosing the format from the extension.
pub fn set_path(path: impl AsRef<Path>) -> Result<Arc<Context>, BindfigError> {
    let path = path.as_ref();
    let store = file::open_store(path)?;
    debug!(path = %path.display(), "opening config file");
    install(store)
}

/// Install a file store for `file_name` inside `location`.
pub fn set_location(location: &Location, file_name: &str) -> Result<Arc<Context>, BindfigError> {
    set_path(location.file(file_name)?)
}

/// The live context.
pub fn context() -> Result<Arc<Context>, BindfigError> {
    ACTIVE.read().clone().ok_or(BindfigError::NotConfigured)
}

pub fn is_configured() -> bool {
    ACTIVE.read().is_some()
}

/// Drop the live context and restore the global flags to their defaults.
///
/// Unflushed edits are discarded; call [`persist`] first to keep them.
pub fn reset() {
    let previous = ACTIVE.write().take();
    ENFORCE_TYPE_VALIDATION.store(true, Ordering::Release);
    WRITE_ON_EDIT_DEFAULT.store(true, Ordering::Release);
    if previous.is_some() {
        debug!("configuration store reset");
    }
}

pub fn enforce_type_validation() -> bool {
    ENFORCE_TYPE_VALIDATION.load(Ordering::Acquire)
}

pub fn set_enforce_type_validation(enabled: bool) {
    ENFORCE_TYPE_VALIDATION.store(enabled, Ordering::Release);
    if let Some(context) = ACTIVE.read().as_ref() {
        context.set_enforce_type_validation(enabled);
    }
}

pub fn write_on_edit_default() -> bool {
    WRITE_ON_EDIT_DEFAULT.load(Ordering::Acquire)
}

pub fn set_write_on_edit_default(enabled: bool) {
    WRITE_ON_EDIT_DEFAULT.store(enabled, Ordering::Release);
    if let Some(context) = ACTIVE.read().as_ref() {
        context.set_write_on_edit_default(enabled);
    }
}

/// Write all pending edits of the live context and persist its store.
pub fn persist() -> Result<(), BindfigError> {
    context()?.persist()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binding::{Binding, InstanceId};
    use crate::converter::ConverterExt;
    use crate::memory::MemoryStore;
    use crate::primitive::{Integer, Text};
    use parking_lot::{Mutex, MutexGuard};
    use std::fs;
    use tempfile::TempDir;

    static TEST_LOCK: Mutex<()> = parking_lot::const_mutex(());

    /// Serialize tests that touch the process-wide state, starting from reset.
    fn isolated() -> MutexGuard<'static, ()> {
        let guard = TEST_LOCK.lock();
        reset();
        guard
    }

    struct AppConfig;

    fn port() -> Binding<Integer> {
        Binding::builder(Integer, 8080)
            .owner::<AppConfig>()
            .attribute("port")
            .build()
            .unwrap()
    }

    #[test]
    fn access_before_setup_is_not_configured() {
        let _guard = isolated();
        assert!(matches!(port().get(), Err(BindfigError::NotConfigured)));
        assert!(matches!(port().set(1), Err(BindfigError::NotConfigured)));
        assert!(matches!(persist(), Err(BindfigError::NotConfigured)));
        assert!(!is_configured());
    }

    #[test]
    fn second_install_is_rejected() {
        let _guard = isolated();
        set_store(MemoryStore::new()).unwrap();
        assert!(matches!(
            set_store(MemoryStore::new()),
            Err(BindfigError::AlreadyConfigured)
        ));
    }

    #[test]
    fn reset_allows_reinstall() {
        let _guard = isolated();
        let first = MemoryStore::new();
        set_store(first.clone()).unwrap();
        port().set(9000).unwrap();

        reset();
        assert!(!is_configured());

        let second = MemoryStore::new();
        set_store(second.clone()).unwrap();
        assert_eq!(port().get().unwrap(), 8080);
        assert_eq!(first.read("AppConfig", "port").as_deref(), Some("9000"));
        assert_eq!(second.read("AppConfig", "port").as_deref(), Some("8080"));
    }

    #[test]
    fn bindings_use_live_context() {
        let _guard = isolated();
        let store = MemoryStore::new();
        set_store(store.clone()).unwrap();
        let port = port();

        assert_eq!(port.get().unwrap(), 8080);
        port.set(9000).unwrap();
        assert_eq!(port.get().unwrap(), 9000);
        assert_eq!(store.read("AppConfig", "port").as_deref(), Some("9000"));
    }

    #[test]
    fn flags_apply_to_live_and_future_contexts() {
        let _guard = isolated();
        let ctx = set_store(MemoryStore::new()).unwrap();
        set_write_on_edit_default(false);
        assert!(!ctx.settings().write_on_edit_default);

        reset();
        assert!(write_on_edit_default(), "reset restores defaults");

        set_enforce_type_validation(false);
        let ctx = set_store(MemoryStore::new()).unwrap();
        assert!(!ctx.settings().enforce_type_validation);
        assert!(!enforce_type_validation());
    }

    #[test]
    fn global_flush_and_persist() {
        let _guard = isolated();
        let store = MemoryStore::new();
        set_store(store.clone()).unwrap();
        set_write_on_edit_default(false);
        let port = port();

        port.set(9000).unwrap();
        assert_eq!(store.read("AppConfig", "port"), None);
        port.flush().unwrap();
        assert_eq!(store.read("AppConfig", "port").as_deref(), Some("9000"));

        port.set(9100).unwrap();
        persist().unwrap();
        assert_eq!(store.read("AppConfig", "port").as_deref(), Some("9100"));
    }

    #[test]
    fn instance_slots_through_global_context() {
        let _guard = isolated();
        set_store(MemoryStore::new()).unwrap();
        set_write_on_edit_default(false);
        let port = port();
        let instance = InstanceId::new();

        port.of(instance).set(1234).unwrap();
        assert_eq!(port.of(instance).get().unwrap(), 1234);
        assert_eq!(port.get().unwrap(), 8080);
    }

    #[test]
    fn clear_through_binding() {
        let _guard = isolated();
        set_store(MemoryStore::new()).unwrap();
        let token = Binding::builder(Text.optional(), None)
            .section("Auth")
            .option("token")
            .build()
            .unwrap();
        token.set(Some("secret".into())).unwrap();
        token.clear().unwrap();
        assert_eq!(token.get().unwrap(), None);
        assert!(matches!(
            port().clear(),
            Err(BindfigError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn set_path_selects_format_and_creates_file() {
        let _guard = isolated();
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("conf").join("app.ini");
        set_path(&path).unwrap();

        assert_eq!(port().get().unwrap(), 8080);
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "[AppConfig]\nport = 8080\n"
        );

        port().set(9000).unwrap();
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "[AppConfig]\nport = 9000\n"
        );
    }

    #[test]
    fn set_path_rejects_unknown_format() {
        let _guard = isolated();
        assert!(matches!(
            set_path("settings.yaml"),
            Err(BindfigError::UnsupportedFormat(_))
        ));
        assert!(!is_configured());
    }

    #[test]
    fn set_location_joins_file_name() {
        let _guard = isolated();
        let dir = TempDir::new().unwrap();
        set_location(&Location::Path(dir.path().to_path_buf()), "app.ini").unwrap();
        port().get().unwrap();
        assert!(dir.path().join("app.ini").exists());
    }
}
