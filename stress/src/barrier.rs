/******************************************************************************
 * Copyright ContinuousC. Licensed under the "Elastic License 2.0".           *
 ******************************************************************************/

use std::fmt;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

/// A reusable barrier for a fixed set of participants.
///
/// The protocol:
/// - Each participant calls [`wait_with`](Self::wait_with), optionally
///   writing into the round's payload, and blocks until every
///   registered participant has arrived.
/// - The last to arrive runs the validation hook on the payload (under
///   the lock, so strictly after all arrivals and before any release),
///   starts a fresh payload for the next round and wakes everybody.
///   All participants of the round get the hook's verdict.
/// - A participant that is done for good either [`leave`](Self::leave)s
///   (finished normally; the remaining peers no longer wait for it) or
///   [`abandon`](Self::abandon)s (failed; the barrier breaks and every
///   current and future waiter is released with
///   [`SyncOutcome::Broken`]). A wait that exceeds the timeout breaks
///   the barrier too. A broken barrier stays broken.
pub struct SyncBarrier<P> {
    state: Mutex<BarrierState<P>>,
    condvar: Condvar,
    validate: Box<dyn Fn(&P) -> bool + Send + Sync>,
    timeout: Option<Duration>,
}

struct BarrierState<P> {
    capacity: usize,
    waiting: usize,
    generation: u64,
    /// Verdict of the last completed round.
    last_ok: bool,
    broken: Option<BreakReason>,
    payload: P,
}

#[derive(PartialEq, Eq, Clone, Debug)]
pub enum BreakReason {
    Timeout,
    Abandoned(String),
}

#[derive(PartialEq, Eq, Clone, Debug)]
pub enum SyncOutcome {
    Passed,
    /// The round completed but the validation hook rejected it.
    Failed,
    Broken(BreakReason),
}

impl<P: Default> SyncBarrier<P> {
    pub fn new<F>(capacity: usize, timeout: Option<Duration>, validate: F) -> Self
    where
        F: Fn(&P) -> bool + Send + Sync + 'static,
    {
        Self {
            state: Mutex::new(BarrierState {
                capacity,
                waiting: 0,
                generation: 0,
                last_ok: true,
                broken: None,
                payload: P::default(),
            }),
            condvar: Condvar::new(),
            validate: Box::new(validate),
            timeout,
        }
    }

    pub fn wait(&self) -> SyncOutcome {
        self.wait_with(|_| ())
    }

    /// Arrive at the barrier after adding to the round's payload.
    pub fn wait_with<F>(&self, contribute: F) -> SyncOutcome
    where
        F: FnOnce(&mut P),
    {
        let mut state = self.state.lock();
        if let Some(reason) = &state.broken {
            return SyncOutcome::Broken(reason.clone());
        }

        contribute(&mut state.payload);
        state.waiting += 1;
        if state.waiting >= state.capacity {
            return self.release(&mut state);
        }

        let generation = state.generation;
        let deadline = self.timeout.map(|timeout| Instant::now() + timeout);

        loop {
            let timed_out = match deadline {
                Some(deadline) => {
                    self.condvar.wait_until(&mut state, deadline).timed_out()
                }
                None => {
                    self.condvar.wait(&mut state);
                    false
                }
            };

            if state.generation != generation {
                return SyncOutcome::from_verdict(state.last_ok);
            }
            if let Some(reason) = &state.broken {
                return SyncOutcome::Broken(reason.clone());
            }
            if timed_out {
                log::warn!(
                    "barrier timed out with {} of {} participant(s) arrived",
                    state.waiting,
                    state.capacity
                );
                state.broken = Some(BreakReason::Timeout);
                self.condvar.notify_all();
                return SyncOutcome::Broken(BreakReason::Timeout);
            }
        }
    }

    /// Deregister a participant that will not arrive anymore. Completes
    /// the pending round if everybody else is already waiting.
    pub fn leave(&self) {
        let mut state = self.state.lock();
        if state.broken.is_some() {
            return;
        }
        state.capacity = state.capacity.saturating_sub(1);
        if state.waiting > 0 && state.waiting >= state.capacity {
            self.release(&mut state);
        }
    }

    /// Break the barrier on behalf of a failed participant.
    pub fn abandon(&self, participant: &str) {
        let mut state = self.state.lock();
        if state.broken.is_none() {
            log::debug!("barrier abandoned by {}", participant);
            state.broken = Some(BreakReason::Abandoned(participant.to_string()));
            self.condvar.notify_all();
        }
    }

    /// Number of completed rounds (= validation hook invocations).
    pub fn rounds(&self) -> u64 {
        self.state.lock().generation
    }

    pub fn capacity(&self) -> usize {
        self.state.lock().capacity
    }

    pub fn is_broken(&self) -> bool {
        self.state.lock().broken.is_some()
    }

    fn release(&self, state: &mut BarrierState<P>) -> SyncOutcome {
        let payload = std::mem::take(&mut state.payload);
        let ok = (self.validate)(&payload);
        state.last_ok = ok;
        state.waiting = 0;
        state.generation += 1;
        self.condvar.notify_all();
        log::debug!(
            "barrier round {} released: {}",
            state.generation,
            if ok { "ok" } else { "validation failed" }
        );
        SyncOutcome::from_verdict(ok)
    }
}

impl SyncOutcome {
    fn from_verdict(ok: bool) -> Self {
        match ok {
            true => Self::Passed,
            false => Self::Failed,
        }
    }

    pub fn is_passed(&self) -> bool {
        matches!(self, Self::Passed)
    }
}

impl fmt::Display for BreakReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout => write!(f, "timed out"),
            Self::Abandoned(who) => write!(f, "abandoned by {}", who),
        }
    }
}

impl fmt::Display for SyncOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Passed => write!(f, "passed"),
            Self::Failed => write!(f, "round rejected by validation"),
            Self::Broken(reason) => write!(f, "barrier {}", reason),
        }
    }
}
