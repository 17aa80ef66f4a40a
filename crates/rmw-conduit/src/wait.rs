// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Wait-set multiplexer.
//!
//! Every call builds a transport [`WaitSet`], attaches the condition of each
//! claimed resource and blocks in slices of at most the configured poll
//! interval until something triggers or the caller's deadline passes.
//! Transport timeouts inside the deadline are retried, never surfaced.

use crate::error::{Error, RetCode, Result};
use crate::waitable::Claim;
use conduit_dds::{Condition, WaitSet};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// How long `wait` may block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitTimeout {
    /// Check readiness once and return.
    NonBlocking,
    /// Block for at most this long.
    Finite(Duration),
    /// Block until something is ready.
    Infinite,
}

impl From<Option<Duration>> for WaitTimeout {
    /// `None` is infinite; `Some(Duration::ZERO)` is non-blocking.
    fn from(timeout: Option<Duration>) -> Self {
        match timeout {
            None => WaitTimeout::Infinite,
            Some(d) if d.is_zero() => WaitTimeout::NonBlocking,
            Some(d) => WaitTimeout::Finite(d),
        }
    }
}

/// Outcome of a `wait` call. Slots of the caller's lists are nulled in place;
/// the counts summarize what stayed non-null.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WaitReport {
    pub ready_subscriptions: usize,
    pub ready_guard_conditions: usize,
    /// Nothing became ready before the deadline.
    pub timed_out: bool,
}

impl WaitReport {
    #[must_use]
    pub fn ret_code(&self) -> RetCode {
        if self.timed_out {
            RetCode::Timeout
        } else {
            RetCode::Ok
        }
    }
}

/// Block on the claimed resources; returns per-claim readiness (same
/// order as `claims`) and whether the deadline passed.
pub(crate) fn multiplex(
    claims: &[Claim],
    timeout: WaitTimeout,
    poll_interval: Duration,
) -> Result<(Vec<bool>, bool)> {
    let waitset = WaitSet::new();
    // Claims are exclusive, so every condition is attached once.
    for claim in claims {
        let waitable = claim.waitable();
        waitable.enable();
        let condition: Arc<dyn Condition> = waitable.condition();
        waitset
            .attach_condition(condition)
            .map_err(|e| Error::TransportFailure(format!("failed to attach condition: {}", e)))?;
    }

    // A finite timeout past the clock's range never expires.
    let deadline = match timeout {
        WaitTimeout::Finite(d) => Instant::now().checked_add(d),
        WaitTimeout::NonBlocking | WaitTimeout::Infinite => None,
    };

    let mut timed_out = false;
    loop {
        let slice = match timeout {
            WaitTimeout::NonBlocking => Duration::ZERO,
            WaitTimeout::Infinite => poll_interval,
            WaitTimeout::Finite(_) => deadline.map_or(poll_interval, |deadline| {
                deadline
                    .saturating_duration_since(Instant::now())
                    .min(poll_interval)
            }),
        };

        match waitset.wait(Some(slice)) {
            Ok(_) => break,
            Err(conduit_dds::Error::Timeout) => {
                let expired = match timeout {
                    WaitTimeout::NonBlocking => true,
                    WaitTimeout::Infinite => false,
                    WaitTimeout::Finite(_) => {
                        deadline.map_or(false, |deadline| Instant::now() >= deadline)
                    }
                };
                if expired {
                    timed_out = true;
                    break;
                }
                log::trace!("[waitset] slice of {:?} elapsed, retrying", slice);
            }
            Err(e) => {
                return Err(Error::TransportFailure(format!("wait failed: {}", e)));
            }
        }
    }

    let readiness: Vec<bool> = claims
        .iter()
        .map(|claim| claim.waitable().take_readiness())
        .collect();
    // A trigger that raced with the deadline still counts.
    let timed_out = timed_out && !readiness.iter().any(|ready| *ready);
    Ok((readiness, timed_out))
}
