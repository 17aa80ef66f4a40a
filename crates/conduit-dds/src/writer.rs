// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

use crate::domain::DomainState;
use crate::instance::InstanceHandle;
use crate::qos::DataWriterQos;
use crate::{Error, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

struct WriterInner {
    handle: InstanceHandle,
    publisher: InstanceHandle,
    topic_name: String,
    type_name: String,
    qos: DataWriterQos,
    domain: Arc<DomainState>,
    deleted: AtomicBool,
}

/// Writer endpoint. Cloning yields another handle to the same writer.
///
/// Every `write` is delivered synchronously to all readers of the domain
/// whose topic name and type name match, including readers of the same
/// participant.
#[derive(Clone)]
pub struct DataWriter {
    inner: Arc<WriterInner>,
}

impl DataWriter {
    pub(crate) fn new(
        publisher: InstanceHandle,
        topic_name: &str,
        type_name: &str,
        qos: DataWriterQos,
        domain: Arc<DomainState>,
    ) -> Self {
        Self {
            inner: Arc::new(WriterInner {
                handle: InstanceHandle::next(),
                publisher,
                topic_name: topic_name.to_string(),
                type_name: type_name.to_string(),
                qos,
                domain,
                deleted: AtomicBool::new(false),
            }),
        }
    }

    /// Publish one serialized sample.
    pub fn write(&self, data: &[u8]) -> Result<()> {
        if self.inner.deleted.load(Ordering::Acquire) {
            return Err(Error::AlreadyDeleted);
        }
        if data.len() > self.inner.qos.max_payload_size {
            return Err(Error::OutOfResources(format!(
                "payload of {} bytes exceeds max_payload_size {}",
                data.len(),
                self.inner.qos.max_payload_size
            )));
        }

        let matched = self.inner.domain.route(
            self.inner.handle,
            &self.inner.topic_name,
            &self.inner.type_name,
            data,
        );
        log::trace!(
            "[writer] {} wrote {} bytes to {} readers on '{}'",
            self.inner.handle,
            data.len(),
            matched,
            self.inner.topic_name
        );
        Ok(())
    }

    /// Transport identity of this writer (the publication handle readers see).
    #[must_use]
    pub fn instance_handle(&self) -> InstanceHandle {
        self.inner.handle
    }

    #[must_use]
    pub fn publisher_handle(&self) -> InstanceHandle {
        self.inner.publisher
    }

    #[must_use]
    pub fn topic_name(&self) -> &str {
        &self.inner.topic_name
    }

    #[must_use]
    pub fn type_name(&self) -> &str {
        &self.inner.type_name
    }

    #[must_use]
    pub fn qos(&self) -> &DataWriterQos {
        &self.inner.qos
    }

    pub(crate) fn mark_deleted(&self) {
        self.inner.deleted.store(true, Ordering::Release);
    }
}

impl PartialEq for DataWriter {
    fn eq(&self, other: &Self) -> bool {
        self.inner.handle == other.inner.handle
    }
}

impl Eq for DataWriter {}

impl std::fmt::Debug for DataWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataWriter")
            .field("handle", &self.inner.handle)
            .field("topic", &self.inner.topic_name)
            .field("type", &self.inner.type_name)
            .finish()
    }
}
