// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Discovery listener feeding the topic graph cache.
//!
//! One listener per built-in reader of a node: the publication reader gets
//! an [`EndpointKind::Publisher`] listener, the subscription reader an
//! [`EndpointKind::Subscriber`] one. Both share the node's cache and graph
//! guard condition.

use crate::graph::{EndpointKind, EndpointRecord, TopicGraphCache};
use conduit_dds::{DataReader, DataReaderListener, EndpointBuiltinTopicData, GuardCondition, Sample};
use parking_lot::Mutex;
use std::sync::{Arc, Weak};

/// Applies built-in discovery samples to a [`TopicGraphCache`].
pub struct DiscoveryListener {
    kind: EndpointKind,
    cache: Arc<TopicGraphCache>,
    /// Owned by the node; only referenced here.
    graph_guard: Weak<GuardCondition>,
    /// Serializes take-and-apply so each sample is applied atomically with
    /// respect to the others.
    drain_lock: Mutex<()>,
}

impl DiscoveryListener {
    pub fn new(
        kind: EndpointKind,
        cache: Arc<TopicGraphCache>,
        graph_guard: &Arc<GuardCondition>,
    ) -> Self {
        Self {
            kind,
            cache,
            graph_guard: Arc::downgrade(graph_guard),
            drain_lock: Mutex::new(()),
        }
    }

    pub fn kind(&self) -> EndpointKind {
        self.kind
    }

    /// Take every pending sample from `reader` and apply it. Triggers the
    /// graph guard when anything changed. Returns the number of applied
    /// changes.
    pub fn drain(&self, reader: &DataReader) -> usize {
        let _serial = self.drain_lock.lock();
        let mut changes = 0;
        while let Some(sample) = reader.take() {
            if self.apply(&sample) {
                changes += 1;
            }
        }

        if changes > 0 {
            if let Some(guard) = self.graph_guard.upgrade() {
                guard.set_trigger_value(true);
            }
        }
        changes
    }

    fn apply(&self, sample: &Sample) -> bool {
        let info = &sample.info;

        if info.instance_state.is_not_alive() {
            return match self.cache.remove_endpoint(self.kind, info.instance_handle) {
                Some(record) => {
                    log::debug!(
                        "[discovery] {:?} {} left '{}' ({})",
                        self.kind,
                        info.instance_handle,
                        record.topic_name,
                        record.type_name
                    );
                    true
                }
                None => {
                    log::debug!(
                        "[discovery] ignoring removal of unknown {:?} {}",
                        self.kind,
                        info.instance_handle
                    );
                    false
                }
            };
        }

        let data = match EndpointBuiltinTopicData::from_sample(sample) {
            Some(Ok(data)) => data,
            Some(Err(e)) => {
                log::warn!(
                    "[discovery] dropping undecodable {:?} sample for {}: {}",
                    self.kind,
                    info.instance_handle,
                    e
                );
                return false;
            }
            None => return false,
        };

        let added = self.cache.add_endpoint(EndpointRecord {
            instance_handle: info.instance_handle,
            kind: self.kind,
            topic_name: data.topic_name,
            type_name: data.type_name,
        });
        if added {
            log::debug!(
                "[discovery] {:?} {} joined",
                self.kind,
                info.instance_handle
            );
        }
        added
    }
}

impl DataReaderListener for DiscoveryListener {
    fn on_data_available(&self, reader: &DataReader) {
        self.drain(reader);
    }
}

impl std::fmt::Debug for DiscoveryListener {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiscoveryListener")
            .field("kind", &self.kind)
            .field("cache", &self.cache)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use conduit_dds::{Condition, Participant};

    const TYPE: &str = "std_msgs::dds_::String_";

    struct Remote {
        participant: Participant,
    }

    impl Remote {
        fn new(domain_id: u32) -> Self {
            let participant = Participant::create(domain_id).expect("remote participant");
            participant.register_type(TYPE).expect("register");
            Self { participant }
        }

        fn writer(&self, topic: &str) -> (conduit_dds::Publisher, conduit_dds::DataWriter) {
            let topic = self
                .participant
                .create_topic(topic, TYPE, &self.participant.get_default_topic_qos())
                .expect("topic");
            let publisher = self.participant.create_publisher().expect("publisher");
            let writer = publisher
                .create_datawriter(&topic, &publisher.get_default_datawriter_qos())
                .expect("writer");
            (publisher, writer)
        }
    }

    #[test]
    fn listener_tracks_remote_writers_and_triggers_guard() {
        let local = Participant::create(170).expect("local participant");
        let cache = Arc::new(TopicGraphCache::new());
        let guard = Arc::new(GuardCondition::new());
        let listener = Arc::new(DiscoveryListener::new(
            EndpointKind::Publisher,
            Arc::clone(&cache),
            &guard,
        ));
        local
            .builtin_subscriber()
            .publication_reader()
            .set_listener(Some(listener.clone()));

        let remote = Remote::new(170);
        let (first_pub, first) = remote.writer("chatter");
        let (_second_pub, _second) = remote.writer("chatter");

        assert!(guard.take_trigger_value());
        assert_eq!(cache.count_publishers("chatter"), 2);

        first_pub.delete_datawriter(&first).expect("delete writer");
        assert!(guard.get_trigger_value());
        assert_eq!(cache.count_publishers("chatter"), 1);
        assert!(cache.snapshot().contains_key("chatter"));

        drop(remote);
        assert!(cache.snapshot().is_empty());
    }

    #[test]
    fn drain_picks_up_samples_queued_before_attach() {
        let remote = Remote::new(171);
        let _endpoint = remote.writer("early");

        let local = Participant::create(171).expect("local participant");
        let cache = Arc::new(TopicGraphCache::new());
        let guard = Arc::new(GuardCondition::new());
        let listener = DiscoveryListener::new(EndpointKind::Publisher, Arc::clone(&cache), &guard);

        let reader = local.builtin_subscriber().publication_reader();
        assert_eq!(listener.drain(reader), 1);
        assert_eq!(listener.drain(reader), 0);
        assert_eq!(cache.count_publishers("early"), 1);
        assert!(guard.get_trigger_value());
    }

    #[test]
    fn dropped_guard_does_not_stop_cache_updates() {
        let local = Participant::create(172).expect("local participant");
        let cache = Arc::new(TopicGraphCache::new());
        let guard = Arc::new(GuardCondition::new());
        let listener = DiscoveryListener::new(EndpointKind::Publisher, Arc::clone(&cache), &guard);
        drop(guard);

        let remote = Remote::new(172);
        let _endpoint = remote.writer("chatter");
        listener.drain(local.builtin_subscriber().publication_reader());
        assert_eq!(cache.count_publishers("chatter"), 1);
    }
}
