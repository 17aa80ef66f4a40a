// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Typed resource handles and the arenas they index.
//!
//! A handle is a plain `Copy` value: implementation tag, owning context,
//! slot index and slot generation. Destroying a resource bumps the slot
//! generation, so stale copies of the handle resolve to `InvalidArgument`
//! instead of aliasing whatever reuses the slot. The implementation tag is
//! compared by value and checked before anything else.

use crate::error::{Error, Result};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use std::sync::Arc;

/// Identifier stamped into every handle created by this implementation.
pub const IMPLEMENTATION_IDENTIFIER: &str = "conduit_static";

/// Marker for the resource a handle designates.
pub trait HandleKind: 'static {
    const NAME: &'static str;
}

macro_rules! handle_kind {
    ($(#[$meta:meta])* $kind:ident, $alias:ident, $name:literal) => {
        $(#[$meta])*
        #[derive(Debug)]
        pub enum $kind {}

        impl HandleKind for $kind {
            const NAME: &'static str = $name;
        }

        $(#[$meta])*
        pub type $alias = Handle<$kind>;
    };
}

handle_kind!(
    /// Node resource.
    NodeKind, NodeHandle, "node"
);
handle_kind!(
    /// Publisher resource.
    PublisherKind, PublisherHandle, "publisher"
);
handle_kind!(
    /// Subscription resource.
    SubscriptionKind, SubscriptionHandle, "subscription"
);
handle_kind!(
    /// Guard condition resource.
    GuardConditionKind, GuardConditionHandle, "guard condition"
);

/// Opaque reference to a resource owned by an [`RmwContext`](crate::RmwContext).
pub struct Handle<K: HandleKind> {
    implementation: &'static str,
    context: u64,
    index: u32,
    generation: u32,
    _kind: PhantomData<fn() -> K>,
}

impl<K: HandleKind> Handle<K> {
    /// Assemble a handle from its parts. Handles built this way are only
    /// accepted if they match a live resource of the same implementation.
    #[must_use]
    pub const fn from_raw_parts(
        implementation: &'static str,
        context: u64,
        index: u32,
        generation: u32,
    ) -> Self {
        Self {
            implementation,
            context,
            index,
            generation,
            _kind: PhantomData,
        }
    }

    #[must_use]
    pub const fn implementation_identifier(&self) -> &'static str {
        self.implementation
    }

    #[must_use]
    pub const fn context_id(&self) -> u64 {
        self.context
    }

    #[must_use]
    pub const fn index(&self) -> u32 {
        self.index
    }

    #[must_use]
    pub const fn generation(&self) -> u32 {
        self.generation
    }

    /// Fail with `ImplementationMismatch` unless this handle carries our tag.
    pub fn check_implementation(&self) -> Result<()> {
        if self.implementation == IMPLEMENTATION_IDENTIFIER {
            Ok(())
        } else {
            Err(Error::ImplementationMismatch {
                expected: IMPLEMENTATION_IDENTIFIER,
                found: self.implementation,
            })
        }
    }
}

impl<K: HandleKind> Clone for Handle<K> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<K: HandleKind> Copy for Handle<K> {}

impl<K: HandleKind> PartialEq for Handle<K> {
    fn eq(&self, other: &Self) -> bool {
        self.implementation == other.implementation
            && self.context == other.context
            && self.index == other.index
            && self.generation == other.generation
    }
}

impl<K: HandleKind> Eq for Handle<K> {}

impl<K: HandleKind> Hash for Handle<K> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.implementation.hash(state);
        self.context.hash(state);
        self.index.hash(state);
        self.generation.hash(state);
    }
}

impl<K: HandleKind> fmt::Debug for Handle<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}#{}:{}.{}@{}",
            K::NAME,
            self.context,
            self.index,
            self.generation,
            self.implementation
        )
    }
}

struct Slot<T> {
    generation: u32,
    value: Option<Arc<T>>,
}

/// Bounded slot table of one resource kind within one context.
pub(crate) struct Arena<K: HandleKind, T> {
    context: u64,
    capacity: usize,
    slots: Vec<Slot<T>>,
    free: Vec<u32>,
    live: usize,
    _kind: PhantomData<fn() -> K>,
}

impl<K: HandleKind, T> Arena<K, T> {
    pub(crate) fn new(context: u64, capacity: usize) -> Self {
        Self {
            context,
            capacity,
            slots: Vec::new(),
            free: Vec::new(),
            live: 0,
            _kind: PhantomData,
        }
    }

    /// Store `value`; `ResourceExhausted` once `capacity` handles are live.
    pub(crate) fn insert(&mut self, value: Arc<T>) -> Result<Handle<K>> {
        if self.live >= self.capacity {
            return Err(Error::ResourceExhausted(format!(
                "{} table full ({} live handles)",
                K::NAME,
                self.capacity
            )));
        }

        let index = match self.free.pop() {
            Some(index) => index,
            None => {
                let index = u32::try_from(self.slots.len()).map_err(|_| {
                    Error::ResourceExhausted(format!("{} index space exhausted", K::NAME))
                })?;
                self.slots.push(Slot {
                    generation: 0,
                    value: None,
                });
                index
            }
        };

        let slot = &mut self.slots[index as usize];
        slot.value = Some(value);
        self.live += 1;
        Ok(Handle::from_raw_parts(
            IMPLEMENTATION_IDENTIFIER,
            self.context,
            index,
            slot.generation,
        ))
    }

    /// Resolve a handle: implementation tag, then context, then slot.
    pub(crate) fn get(&self, handle: &Handle<K>) -> Result<Arc<T>> {
        handle.check_implementation()?;
        self.slot_index(handle)
            .and_then(|index| self.slots[index].value.clone())
            .ok_or_else(|| Self::stale(self.context, handle))
    }

    /// Remove the resource; the handle (and every copy of it) goes stale.
    pub(crate) fn remove(&mut self, handle: &Handle<K>) -> Result<Arc<T>> {
        handle.check_implementation()?;
        let context = self.context;
        let index = self
            .slot_index(handle)
            .ok_or_else(|| Self::stale(context, handle))?;
        let slot = &mut self.slots[index];
        let value = slot
            .value
            .take()
            .ok_or_else(|| Self::stale(context, handle))?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(handle.index);
        self.live -= 1;
        Ok(value)
    }

    pub(crate) fn len(&self) -> usize {
        self.live
    }

    pub(crate) fn values(&self) -> impl Iterator<Item = &Arc<T>> {
        self.slots.iter().filter_map(|slot| slot.value.as_ref())
    }

    fn slot_index(&self, handle: &Handle<K>) -> Option<usize> {
        if handle.implementation != IMPLEMENTATION_IDENTIFIER || handle.context != self.context {
            return None;
        }
        let index = handle.index as usize;
        self.slots
            .get(index)
            .filter(|slot| slot.generation == handle.generation && slot.value.is_some())
            .map(|_| index)
    }

    fn stale(context: u64, handle: &Handle<K>) -> Error {
        if handle.context != context {
            Error::InvalidArgument(format!("{:?} belongs to another context", handle))
        } else {
            Error::InvalidArgument(format!("{:?} is not a live {}", handle, K::NAME))
        }
    }
}
