// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

use conduit_dds::InstanceHandle;
use parking_lot::RwLock;
use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Topic name -> distinct type names advertised under it.
pub type TopicNamesAndTypes = BTreeMap<String, BTreeSet<String>>;

/// Which side of a topic an endpoint sits on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EndpointKind {
    Publisher,
    Subscriber,
}

/// A remote endpoint known to the cache.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EndpointRecord {
    pub instance_handle: InstanceHandle,
    pub kind: EndpointKind,
    pub topic_name: String,
    pub type_name: String,
}

#[derive(Debug, Default)]
struct TopicEntry {
    /// Multiset: type name -> number of live endpoints advertising it.
    type_names: BTreeMap<String, usize>,
    publishers: usize,
    subscribers: usize,
}

impl TopicEntry {
    fn count_mut(&mut self, kind: EndpointKind) -> &mut usize {
        match kind {
            EndpointKind::Publisher => &mut self.publishers,
            EndpointKind::Subscriber => &mut self.subscribers,
        }
    }
}

#[derive(Default)]
struct GraphState {
    version: u64,
    records: HashMap<(EndpointKind, InstanceHandle), EndpointRecord>,
    topics: BTreeMap<String, TopicEntry>,
}

/// Topic name -> type names of the remote endpoints currently alive.
///
/// Records are keyed by instance handle, so two endpoints advertising the
/// same topic and type are counted separately and a removal always undoes
/// exactly the addition it pairs with. A topic disappears once its last
/// record is removed.
pub struct TopicGraphCache {
    state: RwLock<GraphState>,
}

impl TopicGraphCache {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(GraphState::default()),
        }
    }

    /// Record a newly seen endpoint. Returns `false` (and changes nothing)
    /// when the instance handle is already present.
    pub fn add_endpoint(&self, record: EndpointRecord) -> bool {
        let mut guard = self.state.write();
        let state = &mut *guard;
        let key = (record.kind, record.instance_handle);
        if state.records.contains_key(&key) {
            return false;
        }

        let topic = state.topics.entry(record.topic_name.clone()).or_default();
        *topic
            .type_names
            .entry(record.type_name.clone())
            .or_insert(0) += 1;
        *topic.count_mut(record.kind) += 1;

        state.records.insert(key, record);
        state.version += 1;
        true
    }

    /// Forget an endpoint using the record stored when it was added.
    /// Unknown handles are ignored and yield `None`.
    pub fn remove_endpoint(
        &self,
        kind: EndpointKind,
        instance_handle: InstanceHandle,
    ) -> Option<EndpointRecord> {
        let mut guard = self.state.write();
        let state = &mut *guard;
        let record = state.records.remove(&(kind, instance_handle))?;

        if let Entry::Occupied(mut topic) = state.topics.entry(record.topic_name.clone()) {
            let entry = topic.get_mut();
            if let Entry::Occupied(mut occurrences) =
                entry.type_names.entry(record.type_name.clone())
            {
                *occurrences.get_mut() -= 1;
                if *occurrences.get() == 0 {
                    occurrences.remove();
                }
            }
            let count = entry.count_mut(kind);
            *count = count.saturating_sub(1);
            if entry.type_names.is_empty() {
                topic.remove();
            }
        }

        state.version += 1;
        Some(record)
    }

    /// Deep copy of the mapping; duplicate type names collapse.
    pub fn snapshot(&self) -> TopicNamesAndTypes {
        self.state
            .read()
            .topics
            .iter()
            .map(|(name, entry)| (name.clone(), entry.type_names.keys().cloned().collect()))
            .collect()
    }

    pub fn count_publishers(&self, topic_name: &str) -> usize {
        self.state
            .read()
            .topics
            .get(topic_name)
            .map_or(0, |entry| entry.publishers)
    }

    pub fn count_subscribers(&self, topic_name: &str) -> usize {
        self.state
            .read()
            .topics
            .get(topic_name)
            .map_or(0, |entry| entry.subscribers)
    }

    pub fn contains(&self, kind: EndpointKind, instance_handle: InstanceHandle) -> bool {
        self.state
            .read()
            .records
            .contains_key(&(kind, instance_handle))
    }

    pub fn endpoint_count(&self) -> usize {
        self.state.read().records.len()
    }

    /// Bumped on every applied change.
    pub fn version(&self) -> u64 {
        self.state.read().version
    }
}

impl Default for TopicGraphCache {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for TopicGraphCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.read();
        f.debug_struct("TopicGraphCache")
            .field("version", &state.version)
            .field("endpoints", &state.records.len())
            .field("topics", &state.topics.len())
            .finish()
    }
}
