#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::unwrap_used)]

//! The method pool: a process-wide registry of method summaries.
//!
//! A summary is the precomputed effect of invoking a method: the merged
//! return element produced by simulating its bytecode once with fresh
//! parameter-typed values. Summaries are computed lazily, cached forever,
//! and shared between workers: when two workers ask for the same missing
//! summary, one computes while the other waits on a completion signal.
//! Recursion within one worker is bounded by an in-progress marker keyed by
//! thread; a recursive lookup reports [`SummaryOutcome::Recursive`] and the
//! caller substitutes a conservative empty element.

use std::collections::HashMap;
use std::sync::{Condvar, Mutex, MutexGuard};
use std::thread::{self, ThreadId};

use log::debug;
use types::{Element, MethodIdentifier};

enum Entry {
    InProgress(ThreadId),
    Ready(Element),
}

/// Outcome of a pool lookup.
#[derive(Debug, Clone, PartialEq)]
pub enum SummaryOutcome {
    /// The merged return element of the callee.
    Ready(Element),
    /// The lookup re-entered a computation running on this thread; the
    /// caller must fall back to a conservative empty element.
    Recursive,
}

/// The shared pool of interpreted method summaries.
#[derive(Default)]
pub struct MethodPool {
    entries: Mutex<HashMap<MethodIdentifier, Entry>>,
    ready: Condvar,
}

impl MethodPool {
    /// An empty pool.
    pub fn new() -> Self { Self::default() }

    /// Number of completed summaries.
    pub fn summary_count(&self) -> usize {
        self.lock().values().filter(|e| matches!(e, Entry::Ready(_))).count()
    }

    /// Whether a completed summary exists for `id`.
    pub fn contains(&self, id: &MethodIdentifier) -> bool {
        matches!(self.lock().get(id), Some(Entry::Ready(_)))
    }

    /// Look up the summary for `id`, computing it with `compute` when
    /// absent. `compute` runs outside the pool lock and may recurse into
    /// the pool; re-entry for the same identifier on the same thread
    /// reports [`SummaryOutcome::Recursive`] instead of deadlocking.
    pub fn summary_or_compute(
        &self,
        id: &MethodIdentifier,
        compute: impl FnOnce() -> Element,
    ) -> SummaryOutcome {
        let me = thread::current().id();
        let mut entries = self.lock();
        loop {
            match entries.get(id) {
                Some(Entry::Ready(element)) => return SummaryOutcome::Ready(element.clone()),
                Some(Entry::InProgress(owner)) if *owner == me => {
                    debug!("recursive summary request for {}", id);
                    return SummaryOutcome::Recursive;
                }
                Some(Entry::InProgress(_)) => {
                    entries = match self.ready.wait(entries) {
                        Ok(guard) => guard,
                        Err(poisoned) => poisoned.into_inner(),
                    };
                }
                None => break,
            }
        }
        entries.insert(id.clone(), Entry::InProgress(me));
        drop(entries);

        let element = compute();

        let mut entries = self.lock();
        entries.insert(id.clone(), Entry::Ready(element.clone()));
        self.ready.notify_all();
        SummaryOutcome::Ready(element)
    }

    /// Insert a precomputed summary, replacing any in-progress marker.
    pub fn insert(&self, id: MethodIdentifier, element: Element) {
        self.lock().insert(id, Entry::Ready(element));
        self.ready.notify_all();
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<MethodIdentifier, Entry>> {
        match self.entries.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use types::{ConstValue, TypeRef};

    fn id(name: &str) -> MethodIdentifier {
        MethodIdentifier::of("pkg.Service", name, vec![], TypeRef::new("java.lang.String"))
    }

    #[test]
    fn computes_once_and_caches() {
        let pool = MethodPool::new();
        let target = id("greet");

        let first = pool.summary_or_compute(&target, || {
            Element::constant(ConstValue::Str("hi".to_string()))
        });
        assert!(matches!(first, SummaryOutcome::Ready(_)));

        // Second lookup must not recompute.
        let second = pool.summary_or_compute(&target, || panic!("summary recomputed"));
        assert_eq!(first, second);
        assert_eq!(pool.summary_count(), 1);
    }

    #[test]
    fn same_thread_reentry_is_recursive() {
        let pool = MethodPool::new();
        let target = id("loops");

        let outcome = pool.summary_or_compute(&target, || {
            match pool.summary_or_compute(&target, || unreachable!("nested compute")) {
                SummaryOutcome::Recursive => Element::empty(TypeRef::object()),
                SummaryOutcome::Ready(_) => panic!("expected recursion marker"),
            }
        });
        assert!(matches!(outcome, SummaryOutcome::Ready(_)));
        assert!(pool.contains(&target));
    }

    #[test]
    fn waiting_worker_receives_the_computed_summary() {
        use std::sync::Arc;

        let pool = Arc::new(MethodPool::new());
        let target = id("slow");
        let (started_tx, started_rx) = std::sync::mpsc::channel();

        let computing = {
            let pool = Arc::clone(&pool);
            let target = target.clone();
            std::thread::spawn(move || {
                pool.summary_or_compute(&target, || {
                    started_tx.send(()).expect("signal start");
                    std::thread::sleep(std::time::Duration::from_millis(50));
                    Element::constant(ConstValue::Int(1))
                })
            })
        };

        started_rx.recv().expect("computation started");
        let waited = pool.summary_or_compute(&target, || panic!("second computation"));
        let computed = computing.join().expect("join computing thread");
        assert_eq!(waited, computed);
        assert_eq!(pool.summary_count(), 1);
    }
}
