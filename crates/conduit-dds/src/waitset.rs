// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! WaitSet - blocking wait for condition triggers.
//!
//! Every wait set owns a single coalescing signal (mutex-protected flag plus
//! condvar). Attached conditions hold a weak reference to it and raise the
//! flag whenever their trigger value may have become `true`; `wait` rescans
//! the attached conditions after each wake-up.

use crate::condition::{Condition, WaitsetSignal};
use crate::{Error, Result};
use parking_lot::{Condvar, Mutex};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

struct SignalState {
    id: u64,
    pending: Mutex<bool>,
    wakeup: Condvar,
}

impl WaitsetSignal for SignalState {
    fn signal(&self) {
        let mut pending = self.pending.lock();
        *pending = true;
        self.wakeup.notify_all();
    }

    fn id(&self) -> u64 {
        self.id
    }
}

/// Blocks until at least one attached condition triggers.
pub struct WaitSet {
    signal: Arc<SignalState>,
    conditions: Mutex<Vec<Arc<dyn Condition>>>,
}

impl WaitSet {
    #[must_use]
    pub fn new() -> Self {
        static NEXT_SIGNAL_ID: AtomicU64 = AtomicU64::new(1);
        Self {
            signal: Arc::new(SignalState {
                id: NEXT_SIGNAL_ID.fetch_add(1, Ordering::Relaxed),
                pending: Mutex::new(false),
                wakeup: Condvar::new(),
            }),
            conditions: Mutex::new(Vec::new()),
        }
    }

    /// Attach a condition. Attaching the same condition twice is an error.
    pub fn attach_condition(&self, condition: Arc<dyn Condition>) -> Result<()> {
        let mut conditions = self.conditions.lock();
        let condition_id = condition.condition_id();
        if conditions
            .iter()
            .any(|attached| attached.condition_id() == condition_id)
        {
            return Err(Error::Condition(format!(
                "condition {} already attached",
                condition_id
            )));
        }

        let signal: Arc<dyn WaitsetSignal> = Arc::clone(&self.signal) as Arc<dyn WaitsetSignal>;
        condition.add_waitset_signal(signal);
        conditions.push(condition);
        Ok(())
    }

    /// Detach a previously attached condition.
    pub fn detach_condition(&self, condition: &Arc<dyn Condition>) -> Result<()> {
        let mut conditions = self.conditions.lock();
        let condition_id = condition.condition_id();
        let Some(index) = conditions
            .iter()
            .position(|attached| attached.condition_id() == condition_id)
        else {
            return Err(Error::Condition(format!(
                "condition {} not attached",
                condition_id
            )));
        };

        let removed = conditions.swap_remove(index);
        removed.remove_waitset_signal(self.signal.id);
        Ok(())
    }

    /// Snapshot of the attached conditions.
    #[must_use]
    pub fn get_conditions(&self) -> Vec<Arc<dyn Condition>> {
        self.conditions.lock().clone()
    }

    /// Wait until at least one attached condition is triggered.
    ///
    /// `None` waits forever, `Some(Duration::ZERO)` only checks the current
    /// trigger values. Returns the triggered conditions or
    /// [`Error::Timeout`].
    pub fn wait(&self, timeout: Option<Duration>) -> Result<Vec<Arc<dyn Condition>>> {
        let deadline = timeout.map(|t| Instant::now() + t);

        loop {
            // Clear before scanning: a trigger racing with the scan re-raises it.
            *self.signal.pending.lock() = false;

            let triggered = self.collect_triggered();
            if !triggered.is_empty() {
                log::trace!("[waitset] wait returning triggered_len={}", triggered.len());
                return Ok(triggered);
            }

            let mut pending = self.signal.pending.lock();
            while !*pending {
                match deadline {
                    Some(deadline) => {
                        if self
                            .signal
                            .wakeup
                            .wait_until(&mut pending, deadline)
                            .timed_out()
                            && !*pending
                        {
                            return Err(Error::Timeout);
                        }
                    }
                    None => self.signal.wakeup.wait(&mut pending),
                }
            }
        }
    }

    fn collect_triggered(&self) -> Vec<Arc<dyn Condition>> {
        self.conditions
            .lock()
            .iter()
            .filter(|condition| condition.get_trigger_value())
            .cloned()
            .collect()
    }
}

impl Default for WaitSet {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for WaitSet {
    fn drop(&mut self) {
        for condition in self.conditions.get_mut().drain(..) {
            condition.remove_waitset_signal(self.signal.id);
        }
    }
}
