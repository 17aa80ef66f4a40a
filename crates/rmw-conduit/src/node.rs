// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

use crate::discovery::DiscoveryListener;
use crate::error::{Error, Result};
use crate::graph::{EndpointKind, TopicGraphCache};
use conduit_dds::{DataReaderListener, GuardCondition, Participant};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// State behind a node handle.
///
/// Owns the participant, both discovery listeners, the topic graph cache
/// and the graph guard condition. The guard is also registered in the
/// context's guard table (owner = this node) so callers can wait on it.
pub(crate) struct NodeRecord {
    pub(crate) name: String,
    pub(crate) participant: Participant,
    pub(crate) graph_cache: Arc<TopicGraphCache>,
    pub(crate) graph_guard: Arc<GuardCondition>,
    publication_listener: Arc<DiscoveryListener>,
    subscription_listener: Arc<DiscoveryListener>,
    /// Publishers and subscriptions created on this node and not destroyed.
    endpoints: AtomicUsize,
}

impl NodeRecord {
    /// Join `domain_id`, attach the discovery listeners and apply whatever
    /// discovery data was queued before they were attached.
    pub(crate) fn create(name: &str, domain_id: u32) -> Result<Self> {
        let participant = Participant::create(domain_id).map_err(|e| {
            Error::ResourceExhausted(format!("failed to create participant: {}", e))
        })?;

        let graph_cache = Arc::new(TopicGraphCache::new());
        let graph_guard = Arc::new(GuardCondition::new());
        let publication_listener = Arc::new(DiscoveryListener::new(
            EndpointKind::Publisher,
            Arc::clone(&graph_cache),
            &graph_guard,
        ));
        let subscription_listener = Arc::new(DiscoveryListener::new(
            EndpointKind::Subscriber,
            Arc::clone(&graph_cache),
            &graph_guard,
        ));

        let builtin = participant.builtin_subscriber();
        builtin
            .publication_reader()
            .set_listener(Some(Arc::clone(&publication_listener) as Arc<dyn DataReaderListener>));
        builtin
            .subscription_reader()
            .set_listener(Some(Arc::clone(&subscription_listener) as Arc<dyn DataReaderListener>));
        publication_listener.drain(builtin.publication_reader());
        subscription_listener.drain(builtin.subscription_reader());

        log::debug!(
            "[rmw] node '{}' joined domain {} as {}",
            name,
            domain_id,
            participant.instance_handle()
        );
        Ok(Self {
            name: name.to_string(),
            participant,
            graph_cache,
            graph_guard,
            publication_listener,
            subscription_listener,
            endpoints: AtomicUsize::new(0),
        })
    }

    pub(crate) fn endpoint_added(&self) {
        self.endpoints.fetch_add(1, Ordering::AcqRel);
    }

    pub(crate) fn endpoint_removed(&self) {
        self.endpoints.fetch_sub(1, Ordering::AcqRel);
    }

    pub(crate) fn endpoint_count(&self) -> usize {
        self.endpoints.load(Ordering::Acquire)
    }

    /// Stop discovery callbacks. The participant itself goes with the record.
    pub(crate) fn detach_listeners(&self) {
        let builtin = self.participant.builtin_subscriber();
        builtin.publication_reader().set_listener(None);
        builtin.subscription_reader().set_listener(None);
        log::trace!(
            "[rmw] node '{}' detached {:?}/{:?} listeners",
            self.name,
            self.publication_listener.kind(),
            self.subscription_listener.kind()
        );
    }
}

impl std::fmt::Debug for NodeRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeRecord")
            .field("name", &self.name)
            .field("participant", &self.participant.instance_handle())
            .field("endpoints", &self.endpoint_count())
            .field("graph", &self.graph_cache)
            .finish()
    }
}
