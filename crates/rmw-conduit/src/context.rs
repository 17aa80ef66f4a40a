// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Resource lifecycle manager.
//!
//! [`RmwContext`] owns one handle table per resource kind. Records are
//! `Arc`-shared: calls clone what they need out of a table and release the
//! table lock before touching the transport, so a blocking `wait` never
//! holds a table lock. Lock order is nodes, then any other table.

use crate::env_config::EnvConfig;
use crate::error::{Error, Result};
use crate::error_string::set_error_string;
use crate::graph::TopicNamesAndTypes;
use crate::handle::{
    Arena, GuardConditionHandle, GuardConditionKind, Handle, HandleKind, NodeHandle, NodeKind,
    PublisherHandle, PublisherKind, SubscriptionHandle, SubscriptionKind,
};
use crate::node::NodeRecord;
use crate::resources::{Gid, GuardConditionRecord, GuardOwner, PublisherRecord, SubscriptionRecord};
use crate::type_support::{qualified_type_name, TypeSupport, TYPESUPPORT_IDENTIFIER};
use crate::wait::{multiplex, WaitReport, WaitTimeout};
use crate::waitable::{Claim, Waitable};
use conduit_dds::{
    DataReader, DataWriter, GuardCondition, History, Participant, Publisher, Subscriber, Topic,
    MAX_DOMAIN_ID,
};
use parking_lot::RwLock;
use std::any::Any;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

static NEXT_CONTEXT_ID: AtomicU64 = AtomicU64::new(1);

/// Record `err` as the process-wide error string and log it.
fn report<T>(operation: &str, result: Result<T>) -> Result<T> {
    if let Err(e) = &result {
        log::debug!("[rmw] {} failed: {}", operation, e);
        set_error_string(format!("{}: {}", operation, e));
    }
    result
}

fn require<K: HandleKind>(handle: Option<Handle<K>>) -> Result<Handle<K>> {
    handle.ok_or_else(|| Error::InvalidArgument(format!("{} handle is null", K::NAME)))
}

fn validate_topic_name(topic_name: &str) -> Result<()> {
    if topic_name.is_empty() {
        return Err(Error::InvalidArgument("topic name must not be empty".into()));
    }
    if topic_name.contains('/') {
        return Err(Error::InvalidArgument(format!(
            "topic name '{}' must not contain '/', it is reserved for namespaces",
            topic_name
        )));
    }
    Ok(())
}

fn check_type_support(type_support: &dyn TypeSupport) -> Result<()> {
    let found = type_support.typesupport_identifier();
    if found == TYPESUPPORT_IDENTIFIER {
        Ok(())
    } else {
        Err(Error::ImplementationMismatch {
            expected: TYPESUPPORT_IDENTIFIER,
            found,
        })
    }
}

/// Register the message type with the node's participant and bind the topic.
fn bind_topic(
    participant: &Participant,
    type_support: &dyn TypeSupport,
    topic_name: &str,
) -> Result<Arc<Topic>> {
    let type_name = qualified_type_name(type_support.package_name(), type_support.message_name());
    type_support.register_type(participant, &type_name)?;
    Ok(participant.create_topic(topic_name, &type_name, &participant.get_default_topic_qos())?)
}

fn release_writer(participant: &Participant, publisher: &Publisher, writer: &DataWriter) {
    if let Err(e) = publisher.delete_datawriter(writer) {
        log::warn!("[rmw] failed to delete writer {}: {}", writer.instance_handle(), e);
    }
    if let Err(e) = participant.delete_publisher(publisher) {
        log::warn!("[rmw] failed to delete publisher: {}", e);
    }
}

fn release_reader(participant: &Participant, subscriber: &Subscriber, reader: &DataReader) {
    if let Err(e) = subscriber.delete_datareader(reader) {
        log::warn!("[rmw] failed to delete reader {}: {}", reader.instance_handle(), e);
    }
    if let Err(e) = participant.delete_subscriber(subscriber) {
        log::warn!("[rmw] failed to delete subscriber: {}", e);
    }
}

/// Entry point of the rmw layer: creates, resolves and destroys every
/// resource and runs waits over them.
///
/// Every failing operation also records its message through
/// [`set_error_string`].
pub struct RmwContext {
    id: u64,
    config: EnvConfig,
    nodes: RwLock<Arena<NodeKind, NodeRecord>>,
    publishers: RwLock<Arena<PublisherKind, PublisherRecord>>,
    subscriptions: RwLock<Arena<SubscriptionKind, SubscriptionRecord>>,
    guard_conditions: RwLock<Arena<GuardConditionKind, GuardConditionRecord>>,
    /// Graph guard registered for each live node.
    graph_guards: RwLock<HashMap<NodeHandle, GuardConditionHandle>>,
}

impl RmwContext {
    /// Validate `config` and allocate a fresh context.
    pub fn init(config: EnvConfig) -> Result<Self> {
        report("init", Self::init_inner(config))
    }

    fn init_inner(config: EnvConfig) -> Result<Self> {
        if config.domain_id > MAX_DOMAIN_ID {
            return Err(Error::InvalidArgument(format!(
                "domain id {} out of range (0-{})",
                config.domain_id, MAX_DOMAIN_ID
            )));
        }
        if config.wait_poll_interval.is_zero() {
            return Err(Error::InvalidArgument(
                "wait poll interval must be positive".into(),
            ));
        }
        if config.max_handles == 0 {
            return Err(Error::InvalidArgument("max_handles must be positive".into()));
        }

        let id = NEXT_CONTEXT_ID.fetch_add(1, Ordering::Relaxed);
        let capacity = config.max_handles;
        log::info!(
            "[rmw] context {} initialized (domain {}, poll {:?}, {} handles per kind)",
            id,
            config.domain_id,
            config.wait_poll_interval,
            capacity
        );
        Ok(Self {
            id,
            nodes: RwLock::new(Arena::new(id, capacity)),
            publishers: RwLock::new(Arena::new(id, capacity)),
            subscriptions: RwLock::new(Arena::new(id, capacity)),
            guard_conditions: RwLock::new(Arena::new(id, capacity)),
            graph_guards: RwLock::new(HashMap::new()),
            config,
        })
    }

    /// Context built from [`EnvConfig::from_env`].
    pub fn from_env() -> Result<Self> {
        let config = EnvConfig::from_env();
        config.apply_log_level();
        Self::init(config)
    }

    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    #[must_use]
    pub fn config(&self) -> &EnvConfig {
        &self.config
    }

    // ------------------------------------------------------------------
    // Nodes
    // ------------------------------------------------------------------

    /// Create a node: a participant in the configured domain with its own
    /// topic graph cache, discovery listeners and graph guard condition.
    pub fn create_node(&self, name: &str) -> Result<NodeHandle> {
        report("create_node", self.create_node_inner(name))
    }

    fn create_node_inner(&self, name: &str) -> Result<NodeHandle> {
        if name.is_empty() {
            return Err(Error::InvalidArgument("node name must not be empty".into()));
        }

        let record = Arc::new(NodeRecord::create(name, self.config.domain_id)?);
        let graph_guard = Arc::clone(&record.graph_guard);

        let mut nodes = self.nodes.write();
        let node = nodes.insert(record)?;
        let guard = match self
            .guard_conditions
            .write()
            .insert(Arc::new(GuardConditionRecord::new(graph_guard, GuardOwner::Node(node))))
        {
            Ok(guard) => guard,
            Err(e) => {
                if let Ok(record) = nodes.remove(&node) {
                    record.detach_listeners();
                }
                return Err(e);
            }
        };
        self.graph_guards.write().insert(node, guard);

        log::debug!("[rmw] created node '{}' as {:?}", name, node);
        Ok(node)
    }

    /// Destroy a node. Fails while publishers or subscriptions created on it
    /// are still alive.
    pub fn destroy_node(&self, node: impl Into<Option<NodeHandle>>) -> Result<()> {
        report("destroy_node", self.destroy_node_inner(node.into()))
    }

    fn destroy_node_inner(&self, node: Option<NodeHandle>) -> Result<()> {
        let node = require(node)?;
        let mut nodes = self.nodes.write();
        let record = nodes.get(&node)?;
        let endpoints = record.endpoint_count();
        if endpoints > 0 {
            return Err(Error::InvalidArgument(format!(
                "node '{}' still owns {} publishers/subscriptions",
                record.name, endpoints
            )));
        }
        nodes.remove(&node)?;
        drop(nodes);

        if let Some(guard) = self.graph_guards.write().remove(&node) {
            if let Err(e) = self.guard_conditions.write().remove(&guard) {
                log::warn!("[rmw] graph guard of {:?} already gone: {}", node, e);
            }
        }
        record.detach_listeners();
        log::debug!("[rmw] destroyed node '{}'", record.name);
        Ok(())
    }

    /// Guard condition triggered whenever the node's topic graph changes.
    pub fn node_graph_guard_condition(&self, node: NodeHandle) -> Result<GuardConditionHandle> {
        report(
            "node_graph_guard_condition",
            self.node(&node).and_then(|_| {
                self.graph_guards.read().get(&node).copied().ok_or_else(|| {
                    Error::InvalidArgument(format!("{:?} has no graph guard", node))
                })
            }),
        )
    }

    fn node(&self, node: &NodeHandle) -> Result<Arc<NodeRecord>> {
        self.nodes.read().get(node)
    }

    // ------------------------------------------------------------------
    // Publishers
    // ------------------------------------------------------------------

    /// Create a publisher for `topic_name` on `node`.
    pub fn create_publisher(
        &self,
        node: NodeHandle,
        type_support: Arc<dyn TypeSupport>,
        topic_name: &str,
    ) -> Result<PublisherHandle> {
        report(
            "create_publisher",
            self.create_publisher_inner(node, type_support, topic_name),
        )
    }

    fn create_publisher_inner(
        &self,
        node: NodeHandle,
        type_support: Arc<dyn TypeSupport>,
        topic_name: &str,
    ) -> Result<PublisherHandle> {
        node.check_implementation()?;
        validate_topic_name(topic_name)?;
        check_type_support(&*type_support)?;

        let nodes = self.nodes.read();
        let node_record = nodes.get(&node)?;
        let participant = &node_record.participant;
        let topic = bind_topic(participant, &*type_support, topic_name)?;

        let publisher = participant
            .create_publisher()
            .map_err(|e| Error::ResourceExhausted(format!("failed to create publisher: {}", e)))?;
        let writer = match publisher.create_datawriter(&topic, &publisher.get_default_datawriter_qos()) {
            Ok(writer) => writer,
            Err(e) => {
                if let Err(e) = participant.delete_publisher(&publisher) {
                    log::warn!("[rmw] failed to delete publisher: {}", e);
                }
                return Err(Error::ResourceExhausted(format!(
                    "failed to create writer: {}",
                    e
                )));
            }
        };

        let record = Arc::new(PublisherRecord {
            node,
            type_support,
            topic,
            publisher: publisher.clone(),
            writer: writer.clone(),
        });
        let handle = match self.publishers.write().insert(record) {
            Ok(handle) => handle,
            Err(e) => {
                release_writer(participant, &publisher, &writer);
                return Err(e);
            }
        };
        node_record.endpoint_added();

        log::debug!(
            "[rmw] node '{}' publishes '{}' ({}) as {:?}",
            node_record.name,
            topic_name,
            writer.type_name(),
            handle
        );
        Ok(handle)
    }

    /// Destroy a publisher; other publishers of the node keep working.
    pub fn destroy_publisher(&self, publisher: impl Into<Option<PublisherHandle>>) -> Result<()> {
        report("destroy_publisher", self.destroy_publisher_inner(publisher.into()))
    }

    fn destroy_publisher_inner(&self, publisher: Option<PublisherHandle>) -> Result<()> {
        let handle = require(publisher)?;
        let record = self.publishers.write().remove(&handle)?;

        match self.node(&record.node) {
            Ok(node) => {
                release_writer(&node.participant, &record.publisher, &record.writer);
                node.endpoint_removed();
            }
            Err(_) => {
                log::warn!(
                    "[rmw] node of {:?} vanished before its publisher",
                    handle
                );
            }
        }
        log::debug!(
            "[rmw] destroyed publisher {:?} on '{}'",
            handle,
            record.topic.name()
        );
        Ok(())
    }

    /// Serialize `message` through the publisher's type support and write it.
    pub fn publish(&self, publisher: PublisherHandle, message: &dyn Any) -> Result<()> {
        let record = self.publishers.read().get(&publisher);
        report(
            "publish",
            record.and_then(|record| record.type_support.publish(&record.writer, message)),
        )
    }

    /// Global id of `publisher`.
    pub fn publisher_gid(&self, publisher: PublisherHandle) -> Result<Gid> {
        report(
            "publisher_gid",
            self.publishers.read().get(&publisher).map(|record| record.gid()),
        )
    }

    /// `true` when both gids designate the same publisher.
    pub fn compare_gids_equal(&self, a: &Gid, b: &Gid) -> Result<bool> {
        report(
            "compare_gids_equal",
            a.check_implementation()
                .and_then(|()| b.check_implementation())
                .map(|()| a.data == b.data),
        )
    }

    // ------------------------------------------------------------------
    // Subscriptions
    // ------------------------------------------------------------------

    /// Create a subscription for `topic_name` on `node`.
    ///
    /// A non-zero `queue_size` keeps at most that many unread messages;
    /// `0` keeps the transport default depth.
    pub fn create_subscription(
        &self,
        node: NodeHandle,
        type_support: Arc<dyn TypeSupport>,
        topic_name: &str,
        queue_size: usize,
    ) -> Result<SubscriptionHandle> {
        report(
            "create_subscription",
            self.create_subscription_inner(node, type_support, topic_name, queue_size),
        )
    }

    fn create_subscription_inner(
        &self,
        node: NodeHandle,
        type_support: Arc<dyn TypeSupport>,
        topic_name: &str,
        queue_size: usize,
    ) -> Result<SubscriptionHandle> {
        node.check_implementation()?;
        validate_topic_name(topic_name)?;
        check_type_support(&*type_support)?;

        let nodes = self.nodes.read();
        let node_record = nodes.get(&node)?;
        let participant = &node_record.participant;
        let topic = bind_topic(participant, &*type_support, topic_name)?;

        let subscriber = participant
            .create_subscriber()
            .map_err(|e| Error::ResourceExhausted(format!("failed to create subscriber: {}", e)))?;
        let mut qos = subscriber.get_default_datareader_qos();
        if queue_size > 0 {
            qos.history = History::KeepLast(u32::try_from(queue_size).unwrap_or(u32::MAX));
        }
        let reader = match subscriber.create_datareader(&topic, &qos) {
            Ok(reader) => reader,
            Err(e) => {
                if let Err(e) = participant.delete_subscriber(&subscriber) {
                    log::warn!("[rmw] failed to delete subscriber: {}", e);
                }
                return Err(Error::ResourceExhausted(format!(
                    "failed to create reader: {}",
                    e
                )));
            }
        };

        let record = Arc::new(SubscriptionRecord::new(
            node,
            type_support,
            topic,
            subscriber.clone(),
            reader.clone(),
        ));
        let handle = match self.subscriptions.write().insert(record) {
            Ok(handle) => handle,
            Err(e) => {
                release_reader(participant, &subscriber, &reader);
                return Err(e);
            }
        };
        node_record.endpoint_added();

        log::debug!(
            "[rmw] node '{}' subscribes '{}' ({}, {:?}) as {:?}",
            node_record.name,
            topic_name,
            reader.type_name(),
            qos.history,
            handle
        );
        Ok(handle)
    }

    /// Destroy a subscription; publishers and other subscriptions of the
    /// node keep working.
    pub fn destroy_subscription(
        &self,
        subscription: impl Into<Option<SubscriptionHandle>>,
    ) -> Result<()> {
        report(
            "destroy_subscription",
            self.destroy_subscription_inner(subscription.into()),
        )
    }

    fn destroy_subscription_inner(&self, subscription: Option<SubscriptionHandle>) -> Result<()> {
        let handle = require(subscription)?;
        let record = self.subscriptions.write().remove(&handle)?;

        match self.node(&record.node) {
            Ok(node) => {
                release_reader(&node.participant, &record.subscriber, &record.reader);
                node.endpoint_removed();
            }
            Err(_) => {
                log::warn!(
                    "[rmw] node of {:?} vanished before its subscription",
                    handle
                );
            }
        }
        log::debug!(
            "[rmw] destroyed subscription {:?} on '{}'",
            handle,
            record.topic.name()
        );
        Ok(())
    }

    /// Take the next message into `message`. `Ok(false)` means nothing was
    /// buffered.
    pub fn take(&self, subscription: SubscriptionHandle, message: &mut dyn Any) -> Result<bool> {
        let record = self.subscriptions.read().get(&subscription);
        report(
            "take",
            record.and_then(|record| record.type_support.take(&record.reader, message)),
        )
    }

    // ------------------------------------------------------------------
    // Guard conditions
    // ------------------------------------------------------------------

    /// New guard condition, initially not triggered.
    pub fn create_guard_condition(&self) -> Result<GuardConditionHandle> {
        report(
            "create_guard_condition",
            self.guard_conditions.write().insert(Arc::new(GuardConditionRecord::new(
                Arc::new(GuardCondition::new()),
                GuardOwner::Caller,
            ))),
        )
    }

    /// Raise the guard's trigger; wakes every wait that includes it.
    pub fn trigger_guard_condition(&self, guard: GuardConditionHandle) -> Result<()> {
        report(
            "trigger_guard_condition",
            self.guard_conditions
                .read()
                .get(&guard)
                .map(|record| record.condition.set_trigger_value(true)),
        )
    }

    /// Destroy a guard created with [`create_guard_condition`](Self::create_guard_condition).
    /// Graph guards are released with their node.
    pub fn destroy_guard_condition(
        &self,
        guard: impl Into<Option<GuardConditionHandle>>,
    ) -> Result<()> {
        report(
            "destroy_guard_condition",
            self.destroy_guard_condition_inner(guard.into()),
        )
    }

    fn destroy_guard_condition_inner(&self, guard: Option<GuardConditionHandle>) -> Result<()> {
        let handle = require(guard)?;
        let mut guards = self.guard_conditions.write();
        if let GuardOwner::Node(node) = guards.get(&handle)?.owner {
            return Err(Error::InvalidArgument(format!(
                "{:?} is the graph guard of {:?}",
                handle, node
            )));
        }
        guards.remove(&handle)?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Graph
    // ------------------------------------------------------------------

    /// Topics known to `node` with the set of type names seen for each.
    pub fn get_topic_names_and_types(&self, node: NodeHandle) -> Result<TopicNamesAndTypes> {
        report(
            "get_topic_names_and_types",
            self.node(&node).map(|record| record.graph_cache.snapshot()),
        )
    }

    pub fn count_publishers(&self, node: NodeHandle, topic_name: &str) -> Result<usize> {
        report(
            "count_publishers",
            self.node(&node)
                .map(|record| record.graph_cache.count_publishers(topic_name)),
        )
    }

    pub fn count_subscribers(&self, node: NodeHandle, topic_name: &str) -> Result<usize> {
        report(
            "count_subscribers",
            self.node(&node)
                .map(|record| record.graph_cache.count_subscribers(topic_name)),
        )
    }

    // ------------------------------------------------------------------
    // Wait
    // ------------------------------------------------------------------

    /// Block until a listed subscription has data or a listed guard
    /// condition is triggered, or until `timeout` passes.
    ///
    /// On return, slots of resources that are not ready are set to `None`;
    /// `None` slots in the input are ignored. Triggered guards are reset.
    /// On error the lists are left as passed in.
    pub fn wait(
        &self,
        subscriptions: &mut [Option<SubscriptionHandle>],
        guard_conditions: &mut [Option<GuardConditionHandle>],
        timeout: WaitTimeout,
    ) -> Result<WaitReport> {
        report(
            "wait",
            self.wait_inner(subscriptions, guard_conditions, timeout),
        )
    }

    fn wait_inner(
        &self,
        subscriptions: &mut [Option<SubscriptionHandle>],
        guard_conditions: &mut [Option<GuardConditionHandle>],
        timeout: WaitTimeout,
    ) -> Result<WaitReport> {
        let mut waitables: Vec<(usize, Arc<dyn Waitable>)> = Vec::new();
        {
            let table = self.subscriptions.read();
            for (slot, handle) in subscriptions.iter().enumerate() {
                if let Some(handle) = handle {
                    waitables.push((slot, table.get(handle)? as Arc<dyn Waitable>));
                }
            }
        }
        let subscription_count = waitables.len();
        {
            let table = self.guard_conditions.read();
            for (slot, handle) in guard_conditions.iter().enumerate() {
                if let Some(handle) = handle {
                    waitables.push((slot, table.get(handle)? as Arc<dyn Waitable>));
                }
            }
        }

        let claims = waitables
            .iter()
            .map(|(_, waitable)| Claim::acquire(Arc::clone(waitable)))
            .collect::<Result<Vec<_>>>()?;

        log::trace!(
            "[waitset] waiting on {} subscriptions, {} guards ({:?})",
            subscription_count,
            claims.len() - subscription_count,
            timeout
        );
        let (readiness, timed_out) = multiplex(&claims, timeout, self.config.wait_poll_interval)?;
        drop(claims);

        let mut outcome = WaitReport {
            timed_out,
            ..WaitReport::default()
        };
        for (position, ((slot, _), ready)) in waitables.iter().zip(readiness).enumerate() {
            let is_subscription = position < subscription_count;
            match (is_subscription, ready) {
                (true, true) => outcome.ready_subscriptions += 1,
                (false, true) => outcome.ready_guard_conditions += 1,
                (true, false) => subscriptions[*slot] = None,
                (false, false) => guard_conditions[*slot] = None,
            }
        }
        Ok(outcome)
    }

    /// Live handles per kind: nodes, publishers, subscriptions, guards.
    #[must_use]
    pub fn handle_counts(&self) -> (usize, usize, usize, usize) {
        (
            self.nodes.read().len(),
            self.publishers.read().len(),
            self.subscriptions.read().len(),
            self.guard_conditions.read().len(),
        )
    }
}

impl Drop for RmwContext {
    fn drop(&mut self) {
        for record in self.nodes.get_mut().values() {
            record.detach_listeners();
        }
        log::debug!("[rmw] context {} shut down", self.id);
    }
}

impl std::fmt::Debug for RmwContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let (nodes, publishers, subscriptions, guards) = self.handle_counts();
        f.debug_struct("RmwContext")
            .field("id", &self.id)
            .field("domain_id", &self.config.domain_id)
            .field("nodes", &nodes)
            .field("publishers", &publishers)
            .field("subscriptions", &subscriptions)
            .field("guard_conditions", &guards)
            .finish()
    }
}
