//! Resource lifecycle: the transform gate and per-request scopes.
//!
//! Decoded pixel surfaces for multi-megapixel images are large, and
//! uncontrolled concurrency turns a handful of simultaneous uploads into
//! a memory spike. [`TransformGate`] serializes the heavy
//! decode/transform/encode section process-wide: at most one request
//! runs CPU-bound codec work at a time, the rest wait on the lock. The
//! gate and the scope counter are the only shared mutable state in the
//! crate — there is no cross-request cache and no shared transform state.
//! Both live in the dispatcher, constructed once at startup; nothing here
//! is a global.
//!
//! [`RequestScope`] tracks each request through its phases and guarantees
//! the `Released` transition on every exit path via `Drop`. Buffers are
//! owned by the request's stack frame, so releasing is deterministic;
//! the original service's periodic forced-GC backstop has no counterpart
//! here on purpose.
//!
//! There is no per-request transform timeout: the compression engine's
//! probe cap bounds the worst offender, and a timeout firing mid-encode
//! could only abandon the gate in an unknown state. Known, accepted gap.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Process-wide serialization of heavy codec work. Construct once at
/// startup and thread into the dispatcher.
#[derive(Debug, Default)]
pub struct TransformGate {
    lock: Mutex<()>,
}

/// Held for the duration of one request's gated section.
pub struct TransformPermit<'a> {
    _guard: MutexGuard<'a, ()>,
}

impl TransformGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Block until this request may run its heavy section.
    ///
    /// A poisoned lock is recovered rather than propagated: the gate
    /// guards no data, only CPU/memory occupancy, so a panic in a
    /// previous holder leaves nothing inconsistent behind.
    pub fn acquire(&self) -> TransformPermit<'_> {
        let guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        TransformPermit { _guard: guard }
    }

    /// Non-blocking acquire, used by tests to observe gate occupancy.
    pub fn try_acquire(&self) -> Option<TransformPermit<'_>> {
        match self.lock.try_lock() {
            Ok(guard) => Some(TransformPermit { _guard: guard }),
            Err(std::sync::TryLockError::Poisoned(p)) => Some(TransformPermit {
                _guard: p.into_inner(),
            }),
            Err(std::sync::TryLockError::WouldBlock) => None,
        }
    }
}

/// Request progress through the pipeline. Transitions are forward-only;
/// any error path jumps straight to `Released` via scope drop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Phase {
    Received,
    Decoding,
    Transforming,
    Encoding,
    Responding,
    Released,
}

impl Phase {
    pub fn name(self) -> &'static str {
        match self {
            Phase::Received => "received",
            Phase::Decoding => "decoding",
            Phase::Transforming => "transforming",
            Phase::Encoding => "encoding",
            Phase::Responding => "responding",
            Phase::Released => "released",
        }
    }
}

/// Counts requests currently holding buffers. The count returns to zero
/// after every request, success or failure — the release invariant the
/// integration tests pin down.
#[derive(Debug, Clone, Default)]
pub struct ScopeCounter {
    live: Arc<AtomicUsize>,
}

impl ScopeCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn live(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }
}

/// RAII tracker for one request's lifetime.
pub struct RequestScope {
    phase: Phase,
    counter: ScopeCounter,
}

impl RequestScope {
    pub fn begin(counter: &ScopeCounter) -> Self {
        counter.live.fetch_add(1, Ordering::SeqCst);
        Self {
            phase: Phase::Received,
            counter: counter.clone(),
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Move to a later phase. Going backwards is a programming error.
    pub fn advance(&mut self, next: Phase) {
        debug_assert!(
            next >= self.phase,
            "phase may not regress: {:?} -> {next:?}",
            self.phase
        );
        self.phase = next;
    }
}

impl Drop for RequestScope {
    fn drop(&mut self) {
        self.phase = Phase::Released;
        self.counter.live.fetch_sub(1, Ordering::SeqCst);
    }
}
