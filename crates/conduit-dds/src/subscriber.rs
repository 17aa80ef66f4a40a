// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

use crate::domain::{DomainState, EndpointKind};
use crate::instance::InstanceHandle;
use crate::qos::DataReaderQos;
use crate::reader::DataReader;
use crate::topic::Topic;
use crate::{Error, Result};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

struct SubscriberInner {
    handle: InstanceHandle,
    participant: InstanceHandle,
    domain: Arc<DomainState>,
    readers: Mutex<Vec<DataReader>>,
    deleted: AtomicBool,
}

/// Factory and owner of data readers.
#[derive(Clone)]
pub struct Subscriber {
    inner: Arc<SubscriberInner>,
}

impl Subscriber {
    pub(crate) fn new(participant: InstanceHandle, domain: Arc<DomainState>) -> Self {
        Self {
            inner: Arc::new(SubscriberInner {
                handle: InstanceHandle::next(),
                participant,
                domain,
                readers: Mutex::new(Vec::new()),
                deleted: AtomicBool::new(false),
            }),
        }
    }

    #[must_use]
    pub fn get_default_datareader_qos(&self) -> DataReaderQos {
        DataReaderQos::default()
    }

    /// Create a reader on `topic`. It starts receiving samples from matching
    /// writers immediately.
    pub fn create_datareader(&self, topic: &Topic, qos: &DataReaderQos) -> Result<DataReader> {
        if self.inner.deleted.load(Ordering::Acquire) {
            return Err(Error::AlreadyDeleted);
        }

        let reader = DataReader::new(
            self.inner.participant,
            topic.name(),
            topic.type_name(),
            qos.clone(),
        );
        self.inner.readers.lock().push(reader.clone());
        self.inner.domain.register_endpoint(
            reader.instance_handle(),
            EndpointKind::Reader,
            self.inner.participant,
            topic.name(),
            topic.type_name(),
            Some(reader.clone()),
        );
        Ok(reader)
    }

    /// Delete a reader created by this subscriber. Its listener is cleared
    /// and no further samples are delivered to it.
    pub fn delete_datareader(&self, reader: &DataReader) -> Result<()> {
        {
            let mut readers = self.inner.readers.lock();
            let Some(index) = readers.iter().position(|candidate| candidate == reader) else {
                return Err(if reader.participant_handle() == self.inner.participant {
                    Error::AlreadyDeleted
                } else {
                    Error::PreconditionNotMet(format!(
                        "reader {} belongs to another participant",
                        reader.instance_handle()
                    ))
                });
            };
            readers.swap_remove(index);
        }
        self.inner.domain.unregister_endpoint(reader.instance_handle());
        reader.set_listener(None);
        Ok(())
    }

    /// Number of live readers.
    #[must_use]
    pub fn reader_count(&self) -> usize {
        self.inner.readers.lock().len()
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

impl PartialEq for Subscriber {
    fn eq(&self, other: &Self) -> bool {
        self.inner.handle == other.inner.handle
    }
}

impl Eq for Subscriber {}

impl std::fmt::Debug for Subscriber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscriber")
            .field("handle", &self.inner.handle)
            .field("readers", &self.reader_count())
            .finish()
    }
}
