// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Process-wide domain registry.
//!
//! ```text
//! DomainRegistry (static global)
//! +-- domains: Mutex<HashMap<DomainId, Weak<DomainState>>>
//!
//! DomainState (one per domain, per process)
//! +-- participants: builtin readers of every live participant
//! +-- endpoints:    writers and readers, keyed by instance handle
//! +-- [strong ref held by every Participant and endpoint]
//! ```
//!
//! Writers and readers match on `(topic_name, type_name)`. Endpoint creation
//! and deletion is announced on the built-in readers of every *other*
//! participant; a participant joining late gets the existing endpoints
//! replayed. Deliveries always happen after the state lock is released.

use crate::builtin::EndpointBuiltinTopicData;
use crate::instance::{InstanceHandle, InstanceState};
use crate::reader::DataReader;
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Weak};

/// Domain ID type (0-232 per DDS spec).
pub type DomainId = u32;

/// Largest valid domain id.
pub const MAX_DOMAIN_ID: DomainId = 232;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum EndpointKind {
    Writer,
    Reader,
}

struct ParticipantEntry {
    publications: DataReader,
    subscriptions: DataReader,
}

impl ParticipantEntry {
    fn builtin_reader(&self, kind: EndpointKind) -> &DataReader {
        match kind {
            EndpointKind::Writer => &self.publications,
            EndpointKind::Reader => &self.subscriptions,
        }
    }
}

struct EndpointEntry {
    kind: EndpointKind,
    participant: InstanceHandle,
    topic_name: Arc<str>,
    type_name: Arc<str>,
    /// Present for readers only.
    reader: Option<DataReader>,
}

impl EndpointEntry {
    fn builtin_data(&self, key: InstanceHandle) -> EndpointBuiltinTopicData {
        EndpointBuiltinTopicData {
            key,
            participant_key: self.participant,
            topic_name: self.topic_name.to_string(),
            type_name: self.type_name.to_string(),
        }
    }
}

/// One pending built-in sample, delivered once the state lock is released.
struct Announcement {
    target: DataReader,
    key: InstanceHandle,
    state: InstanceState,
    data: Option<Vec<u8>>,
}

impl Announcement {
    fn deliver(self) {
        self.target.deliver(self.key, self.key, self.state, self.data);
    }
}

#[derive(Default)]
struct DomainInner {
    participants: HashMap<InstanceHandle, ParticipantEntry>,
    /// Ordered by handle, i.e. by creation order.
    endpoints: BTreeMap<InstanceHandle, EndpointEntry>,
}

/// Shared state of one domain.
pub(crate) struct DomainState {
    domain_id: DomainId,
    inner: Mutex<DomainInner>,
    /// Serializes discovery announcements so that every built-in reader
    /// observes creations and deletions in the order they happened.
    announce: Mutex<()>,
}

impl DomainState {
    fn new(domain_id: DomainId) -> Self {
        Self {
            domain_id,
            inner: Mutex::new(DomainInner::default()),
            announce: Mutex::new(()),
        }
    }

    pub(crate) fn domain_id(&self) -> DomainId {
        self.domain_id
    }

    /// Join a participant and replay the endpoints it has not seen yet.
    pub(crate) fn add_participant(
        &self,
        handle: InstanceHandle,
        publications: DataReader,
        subscriptions: DataReader,
    ) {
        let _order = self.announce.lock();
        let replay: Vec<Announcement> = {
            let mut inner = self.inner.lock();
            let entry = ParticipantEntry {
                publications,
                subscriptions,
            };
            let replay = inner
                .endpoints
                .iter()
                .filter(|(_, endpoint)| endpoint.participant != handle)
                .map(|(key, endpoint)| Announcement {
                    target: entry.builtin_reader(endpoint.kind).clone(),
                    key: *key,
                    state: InstanceState::Alive,
                    data: Some(endpoint.builtin_data(*key).to_bytes()),
                })
                .collect();
            inner.participants.insert(handle, entry);
            replay
        };

        log::debug!(
            "[domain] participant {} joined domain {} (replaying {} endpoints)",
            handle,
            self.domain_id,
            replay.len()
        );
        replay.into_iter().for_each(Announcement::deliver);
    }

    /// Leave the domain; every endpoint still owned by the participant is
    /// announced as gone to the others.
    pub(crate) fn remove_participant(&self, handle: InstanceHandle) {
        let _order = self.announce.lock();
        let announcements: Vec<Announcement> = {
            let mut inner = self.inner.lock();
            inner.participants.remove(&handle);

            let owned: Vec<InstanceHandle> = inner
                .endpoints
                .iter()
                .filter(|(_, endpoint)| endpoint.participant == handle)
                .map(|(key, _)| *key)
                .collect();

            let mut announcements = Vec::new();
            for key in owned {
                if let Some(endpoint) = inner.endpoints.remove(&key) {
                    announcements.extend(Self::announce_to_others(
                        &inner,
                        key,
                        &endpoint,
                        InstanceState::NotAliveNoWriters,
                    ));
                }
            }
            announcements
        };

        log::debug!(
            "[domain] participant {} left domain {}",
            handle,
            self.domain_id
        );
        announcements.into_iter().for_each(Announcement::deliver);
    }

    pub(crate) fn register_endpoint(
        &self,
        key: InstanceHandle,
        kind: EndpointKind,
        participant: InstanceHandle,
        topic_name: &str,
        type_name: &str,
        reader: Option<DataReader>,
    ) {
        let _order = self.announce.lock();
        let announcements = {
            let mut inner = self.inner.lock();
            let endpoint = EndpointEntry {
                kind,
                participant,
                topic_name: Arc::from(topic_name),
                type_name: Arc::from(type_name),
                reader,
            };
            let announcements =
                Self::announce_to_others(&inner, key, &endpoint, InstanceState::Alive);
            inner.endpoints.insert(key, endpoint);
            announcements
        };

        log::debug!(
            "[domain] registered {:?} {} on '{}' ({})",
            kind,
            key,
            topic_name,
            type_name
        );
        announcements.into_iter().for_each(Announcement::deliver);
    }

    /// Returns `false` if the endpoint was not registered.
    pub(crate) fn unregister_endpoint(&self, key: InstanceHandle) -> bool {
        let _order = self.announce.lock();
        let announcements = {
            let mut inner = self.inner.lock();
            let Some(endpoint) = inner.endpoints.remove(&key) else {
                return false;
            };
            Self::announce_to_others(&inner, key, &endpoint, InstanceState::NotAliveDisposed)
        };

        log::debug!("[domain] unregistered endpoint {}", key);
        announcements.into_iter().for_each(Announcement::deliver);
        true
    }

    /// Deliver a payload to every reader matching `(topic_name, type_name)`.
    /// Returns the number of readers reached.
    pub(crate) fn route(
        &self,
        writer: InstanceHandle,
        topic_name: &str,
        type_name: &str,
        payload: &[u8],
    ) -> usize {
        let readers: Vec<DataReader> = {
            let inner = self.inner.lock();
            inner
                .endpoints
                .values()
                .filter(|endpoint| {
                    &*endpoint.topic_name == topic_name && &*endpoint.type_name == type_name
                })
                .filter_map(|endpoint| endpoint.reader.clone())
                .collect()
        };

        for reader in &readers {
            reader.deliver(
                InstanceHandle::NIL,
                writer,
                InstanceState::Alive,
                Some(payload.to_vec()),
            );
        }
        readers.len()
    }

    pub(crate) fn endpoint_count(&self) -> usize {
        self.inner.lock().endpoints.len()
    }

    fn announce_to_others(
        inner: &DomainInner,
        key: InstanceHandle,
        endpoint: &EndpointEntry,
        state: InstanceState,
    ) -> Vec<Announcement> {
        let data = (!state.is_not_alive()).then(|| endpoint.builtin_data(key).to_bytes());
        inner
            .participants
            .iter()
            .filter(|(handle, _)| **handle != endpoint.participant)
            .map(|(_, participant)| Announcement {
                target: participant.builtin_reader(endpoint.kind).clone(),
                key,
                state,
                data: data.clone(),
            })
            .collect()
    }
}

impl std::fmt::Debug for DomainState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("DomainState")
            .field("domain_id", &self.domain_id)
            .field("participants", &inner.participants.len())
            .field("endpoints", &inner.endpoints.len())
            .finish()
    }
}

/// Global domain registry (singleton).
pub(crate) struct DomainRegistry {
    domains: Mutex<HashMap<DomainId, Weak<DomainState>>>,
}

impl DomainRegistry {
    fn new() -> Self {
        Self {
            domains: Mutex::new(HashMap::new()),
        }
    }

    pub(crate) fn global() -> &'static DomainRegistry {
        use std::sync::OnceLock;
        static REGISTRY: OnceLock<DomainRegistry> = OnceLock::new();
        REGISTRY.get_or_init(DomainRegistry::new)
    }

    /// Get or create the state of a domain. Callers keep the returned `Arc`
    /// to keep the domain alive.
    pub(crate) fn get_or_create(&self, domain_id: DomainId) -> Arc<DomainState> {
        let mut domains = self.domains.lock();
        if let Some(strong) = domains.get(&domain_id).and_then(Weak::upgrade) {
            return strong;
        }

        domains.retain(|_, weak| weak.strong_count() > 0);
        let state = Arc::new(DomainState::new(domain_id));
        domains.insert(domain_id, Arc::downgrade(&state));
        log::debug!("[domain] created state for domain_id={}", domain_id);
        state
    }

    #[cfg(test)]
    fn active_domain_count(&self) -> usize {
        self.domains
            .lock()
            .values()
            .filter(|weak| weak.strong_count() > 0)
            .count()
    }
}
