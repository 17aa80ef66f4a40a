// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

use crate::domain::{DomainState, EndpointKind};
use crate::instance::InstanceHandle;
use crate::qos::DataWriterQos;
use crate::topic::Topic;
use crate::writer::DataWriter;
use crate::{Error, Result};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

struct PublisherInner {
    handle: InstanceHandle,
    participant: InstanceHandle,
    domain: Arc<DomainState>,
    writers: Mutex<Vec<DataWriter>>,
    deleted: AtomicBool,
}

/// Factory and owner of data writers.
#[derive(Clone)]
pub struct Publisher {
    inner: Arc<PublisherInner>,
}

impl Publisher {
    pub(crate) fn new(participant: InstanceHandle, domain: Arc<DomainState>) -> Self {
        Self {
            inner: Arc::new(PublisherInner {
                handle: InstanceHandle::next(),
                participant,
                domain,
                writers: Mutex::new(Vec::new()),
                deleted: AtomicBool::new(false),
            }),
        }
    }

    #[must_use]
    pub fn get_default_datawriter_qos(&self) -> DataWriterQos {
        DataWriterQos::default()
    }

    /// Create a writer on `topic` and announce it to the domain.
    pub fn create_datawriter(&self, topic: &Topic, qos: &DataWriterQos) -> Result<DataWriter> {
        if self.inner.deleted.load(Ordering::Acquire) {
            return Err(Error::AlreadyDeleted);
        }
        if qos.max_payload_size == 0 {
            return Err(Error::BadParameter("max_payload_size must be > 0".into()));
        }

        let writer = DataWriter::new(
            self.inner.handle,
            topic.name(),
            topic.type_name(),
            qos.clone(),
            Arc::clone(&self.inner.domain),
        );
        self.inner.writers.lock().push(writer.clone());
        self.inner.domain.register_endpoint(
            writer.instance_handle(),
            EndpointKind::Writer,
            self.inner.participant,
            topic.name(),
            topic.type_name(),
            None,
        );
        Ok(writer)
    }

    /// Delete a writer created by this publisher.
    pub fn delete_datawriter(&self, writer: &DataWriter) -> Result<()> {
        if writer.publisher_handle() != self.inner.handle {
            return Err(Error::PreconditionNotMet(format!(
                "writer {} belongs to another publisher",
                writer.instance_handle()
            )));
        }

        {
            let mut writers = self.inner.writers.lock();
            let index = writers
                .iter()
                .position(|candidate| candidate == writer)
                .ok_or(Error::AlreadyDeleted)?;
            writers.swap_remove(index);
        }
        writer.mark_deleted();
        self.inner.domain.unregister_endpoint(writer.instance_handle());
        Ok(())
    }

    /// Number of live writers.
    #[must_use]
    pub fn writer_count(&self) -> usize {
        self.inner.writers.lock().len()
    }

    #[must_use]
    pub fn instance_handle(&self) -> InstanceHandle {
        self.inner.handle
    }

    #[must_use]
    pub fn participant_handle(&self) -> InstanceHandle {
        self.inner.participant
    }

    pub(crate) fn mark_deleted(&self) {
        self.inner.deleted.store(true, Ordering::Release);
    }
}

impl PartialEq for Publisher {
    fn eq(&self, other: &Self) -> bool {
        self.inner.handle == other.inner.handle
    }
}

impl Eq for Publisher {}

impl std::fmt::Debug for Publisher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Publisher")
            .field("handle", &self.inner.handle)
            .field("writers", &self.writer_count())
            .finish()
    }
}
