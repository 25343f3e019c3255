//! Change monitor: decides whether cached values still reflect the store.
//!
//! ```text
//! Unwatched ──first check──▶ Watching ──acknowledge──▶ Fresh ◀──▶ Stale
//! ```
//!
//! Checks are pull-based: every access through a context compares the
//! baseline revision recorded at the last load against the store's current
//! [`Revision`]. No background thread polls the medium.
//!
//! A [`StaleSignal`] handle lets an external notifier (a file watcher, a test)
//! mark the monitor stale asynchronously; the next check honors it.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::store::Revision;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorState {
    /// No check has happened yet.
    Unwatched,
    /// First check done, store not yet acknowledged.
    Watching,
    Fresh,
    Stale,
}

/// Outcome of a freshness check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Check {
    /// Never loaded; the store must be loaded before use.
    Initial,
    Fresh,
    /// The medium changed since the baseline; the store must be reloaded.
    Stale,
}

/// Push-based staleness flag, shareable across threads.
#[derive(Debug, Clone)]
pub struct StaleSignal(Arc<AtomicBool>);

impl StaleSignal {
    pub fn mark_stale(&self) {
        self.0.store(true, Ordering::Release);
    }
}

#[derive(Debug)]
pub struct Monitor {
    state: MonitorState,
    baseline: Option<Revision>,
    signal: Arc<AtomicBool>,
}

impl Default for Monitor {
    fn default() -> Self {
        Self::new()
    }
}

impl Monitor {
    pub fn new() -> Self {
        Self {
            state: MonitorState::Unwatched,
            baseline: None,
            signal: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn state(&self) -> MonitorState {
        self.state
    }

    /// Revision recorded at the last acknowledge.
    pub fn baseline(&self) -> Option<&Revision> {
        self.baseline.as_ref()
    }

    pub fn signal(&self) -> StaleSignal {
        StaleSignal(Arc::clone(&self.signal))
    }

    /// Compare `current` against the baseline.
    pub fn check(&mut self, current: &Revision) -> Check {
        let signalled = self.signal.swap(false, Ordering::AcqRel);
        match &self.baseline {
            None => {
                self.state = MonitorState::Watching;
                Check::Initial
            }
            Some(baseline) if signalled || baseline != current => {
                self.state = MonitorState::Stale;
                Check::Stale
            }
            Some(_) => {
                self.state = MonitorState::Fresh;
                Check::Fresh
            }
        }
    }

    /// Record `revision` as the new baseline after a load or an own write.
    pub fn acknowledge(&mut self, revision: Revision) {
        self.baseline = Some(revision);
        self.state = MonitorState::Fresh;
    }

    /// Forget the baseline; the next check reports [`Check::Initial`].
    pub fn reset(&mut self) {
        self.baseline = None;
        self.state = MonitorState::Unwatched;
        self.signal.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_check_is_initial() {
        let mut monitor = Monitor::new();
        assert_eq!(monitor.state(), MonitorState::Unwatched);
        assert_eq!(monitor.check(&Revision::Missing), Check::Initial);
        assert_eq!(monitor.state(), MonitorState::Watching);
    }

    #[test]
    fn unchanged_revision_is_fresh() {
        let mut monitor = Monitor::new();
        monitor.check(&Revision::Counter(1));
        monitor.acknowledge(Revision::Counter(1));
        assert_eq!(monitor.check(&Revision::Counter(1)), Check::Fresh);
        assert_eq!(monitor.state(), MonitorState::Fresh);
    }

    #[test]
    fn changed_revision_is_stale_until_acknowledged() {
        let mut monitor = Monitor::new();
        monitor.acknowledge(Revision::Counter(1));
        assert_eq!(monitor.check(&Revision::Counter(2)), Check::Stale);
        assert_eq!(monitor.state(), MonitorState::Stale);
        assert_eq!(monitor.check(&Revision::Counter(2)), Check::Stale);

        monitor.acknowledge(Revision::Counter(2));
        assert_eq!(monitor.check(&Revision::Counter(2)), Check::Fresh);
    }

    #[test]
    fn signal_forces_one_stale_check() {
        let mut monitor = Monitor::new();
        monitor.acknowledge(Revision::Missing);
        let signal = monitor.signal();

        let handle = std::thread::spawn(move || signal.mark_stale());
        handle.join().unwrap();

        assert_eq!(monitor.check(&Revision::Missing), Check::Stale);
        monitor.acknowledge(Revision::Missing);
        assert_eq!(monitor.check(&Revision::Missing), Check::Fresh);
    }

    #[test]
    fn reset_returns_to_unwatched() {
        let mut monitor = Monitor::new();
        monitor.acknowledge(Revision::Counter(3));
        monitor.signal().mark_stale();
        monitor.reset();
        assert_eq!(monitor.state(), MonitorState::Unwatched);
        assert!(monitor.baseline().is_none());
        assert_eq!(monitor.check(&Revision::Counter(3)), Check::Initial);
    }
}
