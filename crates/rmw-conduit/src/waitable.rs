// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

use crate::error::{Error, Result};
use conduit_dds::Condition;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Kinds of resources `wait` accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitableKind {
    Subscription,
    GuardCondition,
}

/// A resource that can take part in a wait.
pub(crate) trait Waitable: Send + Sync {
    fn kind(&self) -> WaitableKind;

    /// Transport condition attached to the per-call wait set.
    fn condition(&self) -> Arc<dyn Condition>;

    /// Prepare the condition before it is attached.
    fn enable(&self);

    /// Readiness after the wait. Guards reset their trigger here, so a
    /// trigger is reported exactly once.
    fn take_readiness(&self) -> bool;

    /// Flag marking the resource as observed by a running wait.
    fn wait_flag(&self) -> &AtomicBool;
}

/// Exclusive right to observe a resource's readiness, released on drop.
pub(crate) struct Claim {
    waitable: Arc<dyn Waitable>,
}

impl Claim {
    /// Fails with `InvalidArgument` if another wait (or an earlier entry of
    /// the same wait) already observes the resource.
    pub(crate) fn acquire(waitable: Arc<dyn Waitable>) -> Result<Self> {
        if waitable
            .wait_flag()
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(Error::InvalidArgument(format!(
                "{:?} is already part of a wait",
                waitable.kind()
            )));
        }
        Ok(Self { waitable })
    }

    pub(crate) fn waitable(&self) -> &dyn Waitable {
        &*self.waitable
    }
}

impl Drop for Claim {
    fn drop(&mut self) {
        self.waitable.wait_flag().store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use conduit_dds::GuardCondition;

    struct FakeGuard {
        condition: Arc<GuardCondition>,
        in_wait: AtomicBool,
    }

    impl Waitable for FakeGuard {
        fn kind(&self) -> WaitableKind {
            WaitableKind::GuardCondition
        }

        fn condition(&self) -> Arc<dyn Condition> {
            self.condition.clone()
        }

        fn enable(&self) {}

        fn take_readiness(&self) -> bool {
            self.condition.take_trigger_value()
        }

        fn wait_flag(&self) -> &AtomicBool {
            &self.in_wait
        }
    }

    #[test]
    fn claim_is_exclusive_until_dropped() {
        let guard: Arc<dyn Waitable> = Arc::new(FakeGuard {
            condition: Arc::new(GuardCondition::new()),
            in_wait: AtomicBool::new(false),
        });

        let claim = Claim::acquire(Arc::clone(&guard)).expect("first claim");
        assert!(matches!(
            Claim::acquire(Arc::clone(&guard)),
            Err(Error::InvalidArgument(_))
        ));
        assert_eq!(claim.waitable().kind(), WaitableKind::GuardCondition);

        drop(claim);
        assert!(Claim::acquire(guard).is_ok());
    }
}
