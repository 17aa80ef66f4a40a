// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Untyped data reader.
//!
//! Samples are opaque serialized payloads; typed views live in the layer
//! above (type support callbacks). Each reader owns a status condition whose
//! `DATA_AVAILABLE` bit is raised on delivery and lowered once the queue has
//! been drained.

use crate::condition::{StatusCondition, StatusMask};
use crate::instance::{InstanceHandle, InstanceState, SampleInfo, ViewState};
use crate::qos::DataReaderQos;
use parking_lot::Mutex;
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

/// Callback interface invoked from the delivering thread.
///
/// Listeners must be `Send + Sync`, should not block, and may take samples
/// from the reader they are handed.
pub trait DataReaderListener: Send + Sync {
    fn on_data_available(&self, reader: &DataReader);
}

/// One sample handed out by [`DataReader::take`].
#[derive(Debug, Clone)]
pub struct Sample {
    pub info: SampleInfo,
    /// Serialized payload; `None` when `info.valid_data` is `false`.
    pub data: Option<Vec<u8>>,
}

#[derive(Default)]
struct ReaderState {
    samples: VecDeque<Sample>,
    known_instances: HashSet<InstanceHandle>,
    lost: u64,
}

struct ReaderInner {
    handle: InstanceHandle,
    participant: InstanceHandle,
    topic_name: String,
    type_name: String,
    qos: DataReaderQos,
    state: Mutex<ReaderState>,
    status: Arc<StatusCondition>,
    listener: Mutex<Option<Arc<dyn DataReaderListener>>>,
}

/// Reader endpoint. Cloning yields another handle to the same reader.
#[derive(Clone)]
pub struct DataReader {
    inner: Arc<ReaderInner>,
}

impl DataReader {
    pub(crate) fn new(
        participant: InstanceHandle,
        topic_name: &str,
        type_name: &str,
        qos: DataReaderQos,
    ) -> Self {
        Self {
            inner: Arc::new(ReaderInner {
                handle: InstanceHandle::next(),
                participant,
                topic_name: topic_name.to_string(),
                type_name: type_name.to_string(),
                qos,
                state: Mutex::new(ReaderState::default()),
                status: Arc::new(StatusCondition::new()),
                listener: Mutex::new(None),
            }),
        }
    }

    #[must_use]
    pub fn instance_handle(&self) -> InstanceHandle {
        self.inner.handle
    }

    #[must_use]
    pub fn participant_handle(&self) -> InstanceHandle {
        self.inner.participant
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
    pub fn qos(&self) -> &DataReaderQos {
        &self.inner.qos
    }

    /// Status condition of this reader (shared, never replaced).
    #[must_use]
    pub fn get_status_condition(&self) -> Arc<StatusCondition> {
        Arc::clone(&self.inner.status)
    }

    /// Install or clear the listener. Samples already queued are not
    /// replayed; callers drain them explicitly if needed.
    pub fn set_listener(&self, listener: Option<Arc<dyn DataReaderListener>>) {
        *self.inner.listener.lock() = listener;
    }

    /// Remove and return the oldest buffered sample.
    pub fn take(&self) -> Option<Sample> {
        let mut state = self.inner.state.lock();
        let sample = state.samples.pop_front();
        if state.samples.is_empty() {
            self.inner.status.deactivate(StatusMask::DATA_AVAILABLE);
        }
        sample
    }

    /// Number of samples waiting to be taken.
    #[must_use]
    pub fn unread_count(&self) -> usize {
        self.inner.state.lock().samples.len()
    }

    /// Samples dropped because the history limit was reached.
    #[must_use]
    pub fn sample_lost_count(&self) -> u64 {
        self.inner.state.lock().lost
    }

    pub(crate) fn deliver(
        &self,
        instance: InstanceHandle,
        publication: InstanceHandle,
        instance_state: InstanceState,
        data: Option<Vec<u8>>,
    ) {
        {
            let mut state = self.inner.state.lock();

            let view_state = if state.known_instances.insert(instance) {
                ViewState::New
            } else {
                ViewState::NotNew
            };
            if instance_state.is_not_alive() {
                state.known_instances.remove(&instance);
            }

            if let Some(limit) = self.inner.qos.history.limit() {
                while state.samples.len() >= limit {
                    state.samples.pop_front();
                    state.lost += 1;
                    self.inner.status.activate(StatusMask::SAMPLE_LOST);
                }
            }

            state.samples.push_back(Sample {
                info: SampleInfo {
                    instance_handle: instance,
                    publication_handle: publication,
                    view_state,
                    instance_state,
                    valid_data: data.is_some(),
                },
                data,
            });
            self.inner.status.activate(StatusMask::DATA_AVAILABLE);
        }

        let listener = self.inner.listener.lock().clone();
        if let Some(listener) = listener {
            listener.on_data_available(self);
        }
    }
}

impl PartialEq for DataReader {
    fn eq(&self, other: &Self) -> bool {
        self.inner.handle == other.inner.handle
    }
}

impl Eq for DataReader {}

impl std::fmt::Debug for DataReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataReader")
            .field("handle", &self.inner.handle)
            .field("topic", &self.inner.topic_name)
            .field("type", &self.inner.type_name)
            .finish()
    }
}
