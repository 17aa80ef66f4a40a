// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Records stored behind publisher, subscription and guard condition
//! handles.
//!
//! Each record owns its transport entities. The node that created a
//! publisher or subscription is only referenced by handle.

use crate::error::{Error, Result};
use crate::handle::{NodeHandle, IMPLEMENTATION_IDENTIFIER};
use crate::type_support::TypeSupport;
use crate::waitable::{Waitable, WaitableKind};
use conduit_dds::{
    Condition, DataReader, DataWriter, GuardCondition, InstanceHandle, Publisher,
    StatusCondition, StatusMask, Subscriber, Topic,
};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

/// Size of the opaque gid payload.
pub const RMW_GID_STORAGE_SIZE: usize = 24;

/// Global identifier of a publisher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Gid {
    pub implementation_identifier: &'static str,
    pub data: [u8; RMW_GID_STORAGE_SIZE],
}

impl Gid {
    /// Gid of the writer identified by `publication_handle`.
    #[must_use]
    pub fn from_publication_handle(publication_handle: InstanceHandle) -> Self {
        let mut data = [0u8; RMW_GID_STORAGE_SIZE];
        data[..8].copy_from_slice(&publication_handle.as_raw().to_le_bytes());
        Self {
            implementation_identifier: IMPLEMENTATION_IDENTIFIER,
            data,
        }
    }

    /// Transport publication handle stored in the gid.
    pub fn publication_handle(&self) -> Result<InstanceHandle> {
        self.check_implementation()?;
        let mut raw = [0u8; 8];
        raw.copy_from_slice(&self.data[..8]);
        Ok(InstanceHandle::from_raw(u64::from_le_bytes(raw)))
    }

    pub(crate) fn check_implementation(&self) -> Result<()> {
        if self.implementation_identifier == IMPLEMENTATION_IDENTIFIER {
            Ok(())
        } else {
            Err(Error::ImplementationMismatch {
                expected: IMPLEMENTATION_IDENTIFIER,
                found: self.implementation_identifier,
            })
        }
    }
}

pub(crate) struct PublisherRecord {
    pub(crate) node: NodeHandle,
    pub(crate) type_support: Arc<dyn TypeSupport>,
    pub(crate) topic: Arc<Topic>,
    pub(crate) publisher: Publisher,
    pub(crate) writer: DataWriter,
}

impl PublisherRecord {
    pub(crate) fn gid(&self) -> Gid {
        Gid::from_publication_handle(self.writer.instance_handle())
    }
}

pub(crate) struct SubscriptionRecord {
    pub(crate) node: NodeHandle,
    pub(crate) type_support: Arc<dyn TypeSupport>,
    pub(crate) topic: Arc<Topic>,
    pub(crate) subscriber: Subscriber,
    pub(crate) reader: DataReader,
    pub(crate) status: Arc<StatusCondition>,
    pub(crate) in_wait: AtomicBool,
}

impl SubscriptionRecord {
    pub(crate) fn new(
        node: NodeHandle,
        type_support: Arc<dyn TypeSupport>,
        topic: Arc<Topic>,
        subscriber: Subscriber,
        reader: DataReader,
    ) -> Self {
        let status = reader.get_status_condition();
        Self {
            node,
            type_support,
            topic,
            subscriber,
            reader,
            status,
            in_wait: AtomicBool::new(false),
        }
    }
}

impl Waitable for SubscriptionRecord {
    fn kind(&self) -> WaitableKind {
        WaitableKind::Subscription
    }

    fn condition(&self) -> Arc<dyn Condition> {
        self.status.clone()
    }

    fn enable(&self) {
        self.status.set_enabled_statuses(StatusMask::DATA_AVAILABLE);
    }

    fn take_readiness(&self) -> bool {
        self.status.get_trigger_value()
    }

    fn wait_flag(&self) -> &AtomicBool {
        &self.in_wait
    }
}

/// Who may destroy a guard condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum GuardOwner {
    /// Created through `create_guard_condition`.
    Caller,
    /// Graph guard of a node; released with the node.
    Node(NodeHandle),
}

pub(crate) struct GuardConditionRecord {
    pub(crate) condition: Arc<GuardCondition>,
    pub(crate) owner: GuardOwner,
    pub(crate) in_wait: AtomicBool,
}

impl GuardConditionRecord {
    pub(crate) fn new(condition: Arc<GuardCondition>, owner: GuardOwner) -> Self {
        Self {
            condition,
            owner,
            in_wait: AtomicBool::new(false),
        }
    }
}

impl Waitable for GuardConditionRecord {
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
