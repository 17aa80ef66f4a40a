// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Process-wide diagnostic string of the last failed rmw call.
//!
//! Purely informational: callers consult it after a non-OK return. Every
//! failing [`RmwContext`](crate::RmwContext) operation records its error
//! here before returning.

use parking_lot::{const_mutex, Mutex};

static ERROR_STRING: Mutex<Option<String>> = const_mutex(None);

/// Replace the current error string.
pub fn set_error_string(message: impl Into<String>) {
    let message = message.into();
    let mut slot = ERROR_STRING.lock();
    if let Some(previous) = slot.as_deref() {
        log::trace!("[rmw] overwriting error string '{}'", previous);
    }
    *slot = Some(message);
}

/// Last recorded error, if any.
#[must_use]
pub fn get_error_string() -> Option<String> {
    ERROR_STRING.lock().clone()
}

/// Clear the error string.
pub fn reset_error() {
    *ERROR_STRING.lock() = None;
}

/// `true` while an error string is recorded.
#[must_use]
pub fn error_is_set() -> bool {
    ERROR_STRING.lock().is_some()
}
