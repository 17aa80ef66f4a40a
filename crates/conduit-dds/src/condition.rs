// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Conditions - trigger predicates that can be attached to a [`WaitSet`].
//!
//! Two kinds exist:
//!
//! - [`StatusCondition`]: owned by a data reader, triggers while an enabled
//!   communication status (e.g. `DATA_AVAILABLE`) is active.
//! - [`GuardCondition`]: software flag fully controlled by the application.
//!
//! Conditions keep weak references to the signals of the wait sets they are
//! attached to and poke them whenever their trigger value may have flipped to
//! `true`.
//!
//! [`WaitSet`]: crate::WaitSet

use parking_lot::Mutex;
use std::any::Any;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

/// Wake-up hook a wait set hands to each attached condition.
pub trait WaitsetSignal: Send + Sync {
    /// Notify the wait set that a condition may have become active.
    fn signal(&self);

    /// Stable identifier of this registration.
    fn id(&self) -> u64;
}

/// Base interface of every condition.
pub trait Condition: Send + Sync {
    /// Current trigger value.
    fn get_trigger_value(&self) -> bool;

    /// Process-unique identifier (used for duplicate detection).
    fn condition_id(&self) -> u64;

    /// Register a wait set signal so this condition can wake blocked waiters.
    fn add_waitset_signal(&self, signal: Arc<dyn WaitsetSignal>);

    /// Remove a previously registered signal.
    fn remove_waitset_signal(&self, signal_id: u64);

    /// Downcast support.
    fn as_any(&self) -> &dyn Any;
}

fn next_condition_id() -> u64 {
    static NEXT_ID: AtomicU64 = AtomicU64::new(1);
    NEXT_ID.fetch_add(1, Ordering::Relaxed)
}

/// Status mask bits for [`StatusCondition`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusMask(u32);

impl StatusMask {
    /// No status enabled.
    pub const NONE: StatusMask = StatusMask(0);

    /// Data available to read.
    pub const DATA_AVAILABLE: StatusMask = StatusMask(1 << 0);

    /// Sample lost because the history was full.
    pub const SAMPLE_LOST: StatusMask = StatusMask(1 << 1);

    #[must_use]
    pub const fn from_bits(bits: u32) -> Self {
        StatusMask(bits)
    }

    #[must_use]
    pub const fn bits(&self) -> u32 {
        self.0
    }

    /// Check if this mask contains every bit of `other`.
    #[must_use]
    pub const fn contains(&self, other: StatusMask) -> bool {
        (self.0 & other.0) == other.0
    }

    /// `true` when the two masks share at least one bit.
    #[must_use]
    pub const fn intersects(&self, other: StatusMask) -> bool {
        (self.0 & other.0) != 0
    }
}

impl std::ops::BitOr for StatusMask {
    type Output = Self;
    fn bitor(self, rhs: Self) -> Self {
        StatusMask(self.0 | rhs.0)
    }
}

impl std::ops::BitAnd for StatusMask {
    type Output = Self;
    fn bitand(self, rhs: Self) -> Self {
        StatusMask(self.0 & rhs.0)
    }
}

struct WaitsetHook {
    id: u64,
    signal: Weak<dyn WaitsetSignal>,
}

/// Registered wait set signals of one condition.
#[derive(Default)]
struct SignalHooks {
    hooks: Mutex<Vec<WaitsetHook>>,
}

impl SignalHooks {
    fn add(&self, signal: &Arc<dyn WaitsetSignal>) {
        let mut hooks = self.hooks.lock();
        hooks.retain(|hook| hook.signal.upgrade().is_some());
        hooks.push(WaitsetHook {
            id: signal.id(),
            signal: Arc::downgrade(signal),
        });
    }

    fn remove(&self, signal_id: u64) {
        self.hooks.lock().retain(|hook| hook.id != signal_id);
    }

    fn notify(&self) {
        // Upgrade under the lock, signal outside of it.
        let live: Vec<Arc<dyn WaitsetSignal>> = {
            let mut hooks = self.hooks.lock();
            hooks.retain(|hook| hook.signal.upgrade().is_some());
            hooks.iter().filter_map(|hook| hook.signal.upgrade()).collect()
        };
        for signal in live {
            signal.signal();
        }
    }
}

/// Condition driven by the communication status of a data reader.
///
/// Triggers while `enabled & active != 0`. No status is enabled by default.
pub struct StatusCondition {
    id: u64,
    enabled_statuses: AtomicU32,
    active_statuses: AtomicU32,
    hooks: SignalHooks,
}

impl StatusCondition {
    #[must_use]
    pub fn new() -> Self {
        Self {
            id: next_condition_id(),
            enabled_statuses: AtomicU32::new(StatusMask::NONE.bits()),
            active_statuses: AtomicU32::new(StatusMask::NONE.bits()),
            hooks: SignalHooks::default(),
        }
    }

    /// Select which statuses drive the trigger value.
    pub fn set_enabled_statuses(&self, mask: StatusMask) {
        self.enabled_statuses.store(mask.bits(), Ordering::Release);
        if self.get_trigger_value() {
            self.hooks.notify();
        }
    }

    #[must_use]
    pub fn get_enabled_statuses(&self) -> StatusMask {
        StatusMask(self.enabled_statuses.load(Ordering::Acquire))
    }

    #[must_use]
    pub fn get_active_statuses(&self) -> StatusMask {
        StatusMask(self.active_statuses.load(Ordering::Acquire))
    }

    /// Raise statuses (called by the owning reader).
    pub(crate) fn activate(&self, mask: StatusMask) {
        self.active_statuses.fetch_or(mask.bits(), Ordering::AcqRel);
        if self.get_enabled_statuses().intersects(mask) {
            self.hooks.notify();
        }
    }

    /// Clear statuses (called by the owning reader once consumed).
    pub(crate) fn deactivate(&self, mask: StatusMask) {
        self.active_statuses
            .fetch_and(!mask.bits(), Ordering::AcqRel);
    }
}

impl Condition for StatusCondition {
    fn get_trigger_value(&self) -> bool {
        self.get_enabled_statuses()
            .intersects(self.get_active_statuses())
    }

    fn condition_id(&self) -> u64 {
        self.id
    }

    fn add_waitset_signal(&self, signal: Arc<dyn WaitsetSignal>) {
        log::trace!(
            "[condition] status cond_id={} attach signal id={}",
            self.id,
            signal.id()
        );
        self.hooks.add(&signal);
        if self.get_trigger_value() {
            signal.signal();
        }
    }

    fn remove_waitset_signal(&self, signal_id: u64) {
        self.hooks.remove(signal_id);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Default for StatusCondition {
    fn default() -> Self {
        Self::new()
    }
}

/// Manually triggered condition.
pub struct GuardCondition {
    id: u64,
    trigger_value: AtomicBool,
    hooks: SignalHooks,
}

impl GuardCondition {
    /// Create a guard condition with `trigger_value == false`.
    #[must_use]
    pub fn new() -> Self {
        Self {
            id: next_condition_id(),
            trigger_value: AtomicBool::new(false),
            hooks: SignalHooks::default(),
        }
    }

    /// Set the trigger value; `true` wakes every wait set it is attached to.
    pub fn set_trigger_value(&self, value: bool) {
        self.trigger_value.store(value, Ordering::Release);
        if value {
            self.hooks.notify();
        }
    }

    /// Atomically read and clear the trigger value.
    ///
    /// Returns the value observed before clearing, so a trigger raised
    /// concurrently is either returned here or survives for the next call.
    pub fn take_trigger_value(&self) -> bool {
        self.trigger_value.swap(false, Ordering::AcqRel)
    }
}

impl Condition for GuardCondition {
    fn get_trigger_value(&self) -> bool {
        self.trigger_value.load(Ordering::Acquire)
    }

    fn condition_id(&self) -> u64 {
        self.id
    }

    fn add_waitset_signal(&self, signal: Arc<dyn WaitsetSignal>) {
        self.hooks.add(&signal);
        if self.get_trigger_value() {
            signal.signal();
        }
    }

    fn remove_waitset_signal(&self, signal_id: u64) {
        self.hooks.remove(signal_id);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Default for GuardCondition {
    fn default() -> Self {
        Self::new()
    }
}
