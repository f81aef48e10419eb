//! Test-harness dispatch
//!
//! [`ExpectationHandler`] records every frame it sees and releases a
//! [`CountDownLatch`] once each code of an expected set has appeared at
//! least once. Clones share state, so a test keeps one clone and hands the
//! other to the drain agent.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use evlog_core::{EventCode, HandlerError, MessageHandler};

/// Blocks waiters until counted down to zero
#[derive(Debug)]
pub struct CountDownLatch {
    count: Mutex<usize>,
    released: Condvar,
}

impl CountDownLatch {
    pub fn new(count: usize) -> Self {
        Self {
            count: Mutex::new(count),
            released: Condvar::new(),
        }
    }

    pub fn count(&self) -> usize {
        *self.count.lock()
    }

    /// Decrement, waking every waiter when zero is reached
    pub fn count_down(&self) {
        let mut count = self.count.lock();
        if *count > 0 {
            *count -= 1;
            if *count == 0 {
                self.released.notify_all();
            }
        }
    }

    /// Wait until zero or until `timeout` elapses; true if released
    pub fn await_timeout(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut count = self.count.lock();
        while *count > 0 {
            if self.released.wait_until(&mut count, deadline).timed_out() {
                return *count == 0;
            }
        }
        true
    }
}

#[derive(Debug)]
struct Expectations {
    pending: HashSet<i32>,
    frames: Vec<(i32, Vec<u8>)>,
}

/// Records frames and signals once every expected code has been seen
#[derive(Debug, Clone)]
pub struct ExpectationHandler {
    state: Arc<Mutex<Expectations>>,
    latch: Arc<CountDownLatch>,
}

impl ExpectationHandler {
    pub fn new<I>(expected: I) -> Self
    where
        I: IntoIterator<Item = EventCode>,
    {
        let pending: HashSet<i32> = expected.into_iter().map(|code| code.type_id()).collect();
        let latch = Arc::new(CountDownLatch::new(pending.len()));
        Self {
            state: Arc::new(Mutex::new(Expectations {
                pending,
                frames: Vec::new(),
            })),
            latch,
        }
    }

    /// Wait until every expected code has been seen
    pub fn await_all(&self, timeout: Duration) -> bool {
        self.latch.await_timeout(timeout)
    }

    pub fn is_complete(&self) -> bool {
        self.latch.count() == 0
    }

    /// Expected codes not seen yet, ascending
    pub fn pending(&self) -> Vec<i32> {
        let mut pending: Vec<_> = self.state.lock().pending.iter().copied().collect();
        pending.sort_unstable();
        pending
    }

    /// Every id seen, in arrival order
    pub fn seen_ids(&self) -> Vec<i32> {
        self.state.lock().frames.iter().map(|(id, _)| *id).collect()
    }

    /// How many frames carried `code`
    pub fn count_of(&self, code: EventCode) -> usize {
        let type_id = code.type_id();
        self.state
            .lock()
            .frames
            .iter()
            .filter(|(id, _)| *id == type_id)
            .count()
    }

    /// Payloads of every frame carrying `code`, in arrival order
    pub fn payloads_of(&self, code: EventCode) -> Vec<Vec<u8>> {
        let type_id = code.type_id();
        self.state
            .lock()
            .frames
            .iter()
            .filter(|(id, _)| *id == type_id)
            .map(|(_, payload)| payload.clone())
            .collect()
    }
}

impl MessageHandler for ExpectationHandler {
    fn on_message(&mut self, type_id: i32, payload: &[u8]) -> Result<(), HandlerError> {
        let first_sighting = {
            let mut state = self.state.lock();
            state.frames.push((type_id, payload.to_vec()));
            state.pending.remove(&type_id)
        };
        if first_sighting {
            self.latch.count_down();
        }
        Ok(())
    }
}
