#[cfg(test)]
pub mod test {
    use std::ops::BitOr;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::enums::{ConfigEnum, FlagSet, IntValued};
    use crate::error::BindfigError;
    use crate::memory::MemoryStore;
    use crate::store::{Entry, Revision, Store};

    // -- Named enumeration ------------------------------------------------------

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum Mode {
        Fast,
        Slow,
    }

    impl ConfigEnum for Mode {
        const TYPE_NAME: &'static str = "Mode";
        const MEMBERS: &'static [Self] = &[Mode::Fast, Mode::Slow];

        fn name(&self) -> &'static str {
            match self {
                Mode::Fast => "fast",
                Mode::Slow => "slow",
            }
        }
    }

    // -- Integer-valued enumeration ---------------------------------------------

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum Priority {
        Low,
        Normal,
        High,
    }

    impl ConfigEnum for Priority {
        const TYPE_NAME: &'static str = "Priority";
        const MEMBERS: &'static [Self] = &[Priority::Low, Priority::Normal, Priority::High];

        fn name(&self) -> &'static str {
            match self {
                Priority::Low => "low",
                Priority::Normal => "normal",
                Priority::High => "high",
            }
        }
    }

    impl IntValued for Priority {
        fn value(&self) -> i64 {
            match self {
                Priority::Low => 1,
                Priority::Normal => 5,
                Priority::High => 10,
            }
        }
    }

    // -- Flag set -----------------------------------------------------------------

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Perms(u64);

    impl Perms {
        pub const READ: Perms = Perms(1);
        pub const WRITE: Perms = Perms(2);
        pub const EXEC: Perms = Perms(4);

        pub fn empty() -> Self {
            Perms(0)
        }
    }

    impl BitOr for Perms {
        type Output = Perms;

        fn bitor(self, rhs: Perms) -> Perms {
            Perms(self.0 | rhs.0)
        }
    }

    impl FlagSet for Perms {
        const TYPE_NAME: &'static str = "Perms";

        fn all_bits() -> u64 {
            (Perms::READ | Perms::WRITE | Perms::EXEC).0
        }

        fn bits(self) -> u64 {
            self.0
        }

        fn from_bits(bits: u64) -> Self {
            Perms(bits)
        }

        fn named() -> &'static [(&'static str, u64)] {
            &[("READ", 1), ("WRITE", 2), ("EXEC", 4)]
        }
    }

    // -- Read-counting store ------------------------------------------------------

    /// A [`MemoryStore`] that counts reads, writes and loads.
    ///
    /// Clones share the counters, so a test keeps one handle and hands the
    /// other to a context. `has` is not counted as a read.
    #[derive(Debug, Clone, Default)]
    pub struct CountingStore {
        inner: MemoryStore,
        reads: Arc<AtomicUsize>,
        writes: Arc<AtomicUsize>,
        loads: Arc<AtomicUsize>,
    }

    impl CountingStore {
        pub fn reads(&self) -> usize {
            self.reads.load(Ordering::SeqCst)
        }

        pub fn writes(&self) -> usize {
            self.writes.load(Ordering::SeqCst)
        }

        pub fn loads(&self) -> usize {
            self.loads.load(Ordering::SeqCst)
        }

        /// Uncounted handle on the same data, for simulating outside edits.
        pub fn external(&self) -> MemoryStore {
            self.inner.clone()
        }
    }

    impl Store for CountingStore {
        fn read(&self, section: &str, option: &str) -> Option<String> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            self.inner.read(section, option)
        }

        fn write(&mut self, section: &str, option: &str, text: &str) -> Result<(), BindfigError> {
            self.writes.fetch_add(1, Ordering::SeqCst);
            self.inner.write(section, option, text)
        }

        fn has(&self, section: &str, option: &str) -> bool {
            self.inner.has(section, option)
        }

        fn remove(&mut self, section: &str, option: &str) -> bool {
            self.inner.remove(section, option)
        }

        fn revision(&self) -> Result<Revision, BindfigError> {
            self.inner.revision()
        }

        fn load(&mut self) -> Result<(), BindfigError> {
            self.loads.fetch_add(1, Ordering::SeqCst);
            self.inner.load()
        }

        fn persist(&mut self) -> Result<(), BindfigError> {
            self.inner.persist()
        }

        fn entries(&self) -> Vec<Entry> {
            self.inner.entries()
        }
    }

    #[test]
    fn counting_store_counts() {
        let mut store = CountingStore::default();
        store.write("A", "x", "1").unwrap();
        assert_eq!(store.read("A", "x").as_deref(), Some("1"));
        assert!(store.has("A", "x"));
        assert_eq!((store.reads(), store.writes()), (1, 1));
    }

    #[test]
    fn perms_union() {
        assert_eq!(Perms::all_bits(), 7);
        assert_eq!((Perms::READ | Perms::EXEC).bits(), 5);
    }
}
