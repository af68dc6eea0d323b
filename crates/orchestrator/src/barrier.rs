//! Reusable N-party tick barrier.
//!
//! The coordinating thread reads the current [`epoch`](TickBarrier::epoch)
//! before handing out work, every party calls [`arrive`](TickBarrier::arrive)
//! once when done, and the coordinator blocks in
//! [`wait`](TickBarrier::wait) until all parties of that epoch arrived. The
//! last arrival releases every waiter at once and opens the next epoch.
//!
//! A party that panics before arriving poisons the barrier instead of leaving
//! the coordinator blocked forever; see [`ArrivalGuard`].

use std::sync::{Condvar, Mutex, MutexGuard};
use std::thread;

/// The barrier was poisoned by a party that died before arriving.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BarrierBroken;

#[derive(Debug)]
struct State {
    arrived: usize,
    epoch: u64,
    broken: bool,
}

/// Counting rendezvous for a fixed number of parties, reused every tick.
#[derive(Debug)]
pub struct TickBarrier {
    parties: usize,
    state: Mutex<State>,
    released: Condvar,
}

impl TickBarrier {
    /// Barrier released by `parties` arrivals per epoch.
    ///
    /// # Panics
    /// If `parties` is zero.
    pub fn new(parties: usize) -> Self {
        assert!(parties > 0, "a barrier needs at least one party");
        Self {
            parties,
            state: Mutex::new(State {
                arrived: 0,
                epoch: 0,
                broken: false,
            }),
            released: Condvar::new(),
        }
    }

    /// Number of arrivals that release one epoch.
    pub fn parties(&self) -> usize {
        self.parties
    }

    /// The epoch currently collecting arrivals.
    pub fn epoch(&self) -> u64 {
        self.lock().epoch
    }

    /// Record one completion signal for the current epoch.
    pub fn arrive(&self) {
        let mut state = self.lock();
        state.arrived += 1;
        if state.arrived == self.parties {
            state.arrived = 0;
            state.epoch += 1;
            self.released.notify_all();
        }
    }

    /// Block until `epoch` has been released.
    ///
    /// Returns immediately when it already was.
    pub fn wait(&self, epoch: u64) -> Result<(), BarrierBroken> {
        let mut state = self.lock();
        while state.epoch <= epoch && !state.broken {
            state = self
                .released
                .wait(state)
                .unwrap_or_else(|poisoned| poisoned.into_inner());
        }
        if state.epoch > epoch {
            Ok(())
        } else {
            Err(BarrierBroken)
        }
    }

    /// Whether `epoch` has already been released. Never blocks on arrivals.
    pub fn released(&self, epoch: u64) -> bool {
        self.lock().epoch > epoch
    }

    /// Whether a party died before arriving.
    pub fn is_broken(&self) -> bool {
        self.lock().broken
    }

    /// Mark the barrier broken and wake every waiter.
    pub fn poison(&self) {
        let mut state = self.lock();
        state.broken = true;
        self.released.notify_all();
    }

    /// Guard that poisons the barrier if dropped during a panic.
    pub fn guard(&self) -> ArrivalGuard<'_> {
        ArrivalGuard { barrier: self }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        // The state is a pair of counters; a panic elsewhere cannot leave it
        // half-updated.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Held by a party for the lifetime of its thread.
pub struct ArrivalGuard<'a> {
    barrier: &'a TickBarrier,
}

impl Drop for ArrivalGuard<'_> {
    fn drop(&mut self) {
        if thread::panicking() {
            self.barrier.poison();
        }
    }
}
