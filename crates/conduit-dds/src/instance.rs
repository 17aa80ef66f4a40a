// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

use std::sync::atomic::{AtomicU64, Ordering};

/// Opaque transport identity of an entity or data instance.
///
/// Handles are unique for the lifetime of the process; two endpoints that
/// share a topic name and type still get distinct handles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstanceHandle(u64);

impl InstanceHandle {
    /// The nil handle (never assigned to an entity).
    pub const NIL: InstanceHandle = InstanceHandle(0);

    pub(crate) fn next() -> Self {
        static NEXT_HANDLE: AtomicU64 = AtomicU64::new(1);
        Self(NEXT_HANDLE.fetch_add(1, Ordering::Relaxed))
    }

    /// Build a handle from its raw value (tests, FFI).
    #[must_use]
    pub const fn from_raw(value: u64) -> Self {
        Self(value)
    }

    /// Raw value of the handle.
    #[must_use]
    pub const fn as_raw(&self) -> u64 {
        self.0
    }

    /// Whether this is [`InstanceHandle::NIL`].
    #[must_use]
    pub const fn is_nil(&self) -> bool {
        self.0 == 0
    }
}

impl std::fmt::Display for InstanceHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// Whether the reader has seen the instance before.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewState {
    /// First sample for this instance (or first after it went not-alive).
    New,
    /// Instance already observed by this reader.
    NotNew,
}

/// Liveness of the instance the sample belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstanceState {
    /// Instance is alive.
    Alive,
    /// Instance was explicitly disposed (endpoint deleted).
    NotAliveDisposed,
    /// All writers of the instance are gone (participant left).
    NotAliveNoWriters,
}

impl InstanceState {
    /// `true` for both not-alive variants.
    #[must_use]
    pub const fn is_not_alive(&self) -> bool {
        !matches!(self, InstanceState::Alive)
    }
}

/// Metadata attached to every sample handed out by a reader.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SampleInfo {
    /// Instance the sample belongs to (endpoint key for built-in topics).
    pub instance_handle: InstanceHandle,
    /// Writer that produced the sample.
    pub publication_handle: InstanceHandle,
    pub view_state: ViewState,
    pub instance_state: InstanceState,
    /// `false` for pure lifecycle notifications (no payload).
    pub valid_data: bool,
}
