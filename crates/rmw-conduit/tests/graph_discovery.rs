// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Topic graph integration tests
//!
//! Each node learns about the endpoints of every other participant in its
//! domain through the built-in discovery readers.

mod common;

use common::{context, int32_support, string_support, StringMsg};
use rmw_conduit::{EnvConfig, RmwContext, WaitTimeout};
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

const STRING_TYPE: &str = "std_msgs::dds_::String_";
const INT32_TYPE: &str = "std_msgs::dds_::Int32_";

fn types(names: &[&str]) -> BTreeSet<String> {
    names.iter().map(|name| name.to_string()).collect()
}

#[test]
fn test_chatter_publishers_collapse_to_one_type() {
    let ctx = context();
    let observer = ctx.create_node("observer").expect("Failed to create observer");
    let talker = ctx.create_node("talker").expect("Failed to create talker");
    let listener = ctx.create_node("listener").expect("Failed to create listener");

    let first = ctx
        .create_publisher(talker, string_support(), "chatter")
        .expect("Failed to create publisher");
    let second = ctx
        .create_publisher(talker, string_support(), "chatter")
        .expect("Failed to create publisher");
    let subscription = ctx
        .create_subscription(listener, string_support(), "chatter", 10)
        .expect("Failed to create subscription");

    let graph = ctx
        .get_topic_names_and_types(observer)
        .expect("Failed to read graph");
    assert_eq!(graph.len(), 1);
    assert_eq!(graph["chatter"], types(&[STRING_TYPE]));
    assert_eq!(ctx.count_publishers(observer, "chatter").expect("count"), 2);
    assert_eq!(ctx.count_subscribers(observer, "chatter").expect("count"), 1);

    ctx.destroy_publisher(first).expect("Failed to destroy publisher");
    let graph = ctx
        .get_topic_names_and_types(observer)
        .expect("Failed to read graph");
    assert_eq!(graph["chatter"], types(&[STRING_TYPE]));
    assert_eq!(ctx.count_publishers(observer, "chatter").expect("count"), 1);

    ctx.destroy_publisher(second).expect("Failed to destroy publisher");
    ctx.destroy_subscription(subscription)
        .expect("Failed to destroy subscription");
    assert!(ctx
        .get_topic_names_and_types(observer)
        .expect("Failed to read graph")
        .is_empty());
}

#[test]
fn test_one_topic_with_two_types() {
    let ctx = context();
    let observer = ctx.create_node("observer").expect("Failed to create observer");
    let strings = ctx.create_node("strings").expect("Failed to create node");
    let numbers = ctx.create_node("numbers").expect("Failed to create node");

    ctx.create_publisher(strings, string_support(), "mixed")
        .expect("Failed to create publisher");
    let number_sub = ctx
        .create_subscription(numbers, int32_support(), "mixed", 0)
        .expect("Failed to create subscription");

    let graph = ctx
        .get_topic_names_and_types(observer)
        .expect("Failed to read graph");
    assert_eq!(graph["mixed"], types(&[INT32_TYPE, STRING_TYPE]));

    ctx.destroy_subscription(number_sub)
        .expect("Failed to destroy subscription");
    let graph = ctx
        .get_topic_names_and_types(observer)
        .expect("Failed to read graph");
    assert_eq!(graph["mixed"], types(&[STRING_TYPE]));
}

#[test]
fn test_own_endpoints_are_not_reported_to_the_node() {
    let ctx = context();
    let node = ctx.create_node("solo").expect("Failed to create node");
    ctx.create_publisher(node, string_support(), "chatter")
        .expect("Failed to create publisher");
    assert!(ctx
        .get_topic_names_and_types(node)
        .expect("Failed to read graph")
        .is_empty());
}

#[test]
fn test_late_node_learns_existing_endpoints() {
    let ctx = context();
    let talker = ctx.create_node("talker").expect("Failed to create talker");
    ctx.create_publisher(talker, string_support(), "early")
        .expect("Failed to create publisher");

    let late = ctx.create_node("late").expect("Failed to create late node");
    assert_eq!(ctx.count_publishers(late, "early").expect("count"), 1);
    assert_eq!(ctx.count_subscribers(late, "early").expect("count"), 0);
}

#[test]
fn test_graph_guard_fires_on_graph_changes() {
    let ctx = context();
    let observer = ctx.create_node("observer").expect("Failed to create observer");
    let talker = ctx.create_node("talker").expect("Failed to create talker");
    let graph_guard = ctx
        .node_graph_guard_condition(observer)
        .expect("Failed to get graph guard");

    // Drain whatever the node creations produced.
    let mut guards = [Some(graph_guard)];
    ctx.wait(&mut [], &mut guards, WaitTimeout::NonBlocking)
        .expect("Wait failed");

    let publisher = ctx
        .create_publisher(talker, string_support(), "chatter")
        .expect("Failed to create publisher");
    let mut guards = [Some(graph_guard)];
    let report = ctx
        .wait(
            &mut [],
            &mut guards,
            WaitTimeout::Finite(Duration::from_millis(500)),
        )
        .expect("Wait failed");
    assert_eq!(guards, [Some(graph_guard)]);
    assert_eq!(report.ready_guard_conditions, 1);

    // Nothing changed since: the edge was consumed.
    let mut guards = [Some(graph_guard)];
    ctx.wait(&mut [], &mut guards, WaitTimeout::NonBlocking)
        .expect("Wait failed");
    assert_eq!(guards, [None]);

    ctx.destroy_publisher(publisher)
        .expect("Failed to destroy publisher");
    let mut guards = [Some(graph_guard)];
    ctx.wait(&mut [], &mut guards, WaitTimeout::NonBlocking)
        .expect("Wait failed");
    assert_eq!(guards, [Some(graph_guard)]);
}

#[test]
fn test_dropped_context_leaves_peer_graphs() {
    let ctx = context();
    let domain_id = ctx.config().domain_id;
    let observer = ctx.create_node("observer").expect("Failed to create observer");

    let peer = RmwContext::init(EnvConfig::default().with_domain_id(domain_id))
        .expect("Failed to init peer context");
    let peer_node = peer.create_node("peer").expect("Failed to create peer node");
    let peer_pub = peer
        .create_publisher(peer_node, string_support(), "chatter")
        .expect("Failed to create peer publisher");
    peer.publish(peer_pub, &StringMsg::new("bye"))
        .expect("Failed to publish");
    assert_eq!(ctx.count_publishers(observer, "chatter").expect("count"), 1);

    drop(peer);
    assert_eq!(ctx.count_publishers(observer, "chatter").expect("count"), 0);
    assert!(ctx
        .get_topic_names_and_types(observer)
        .expect("Failed to read graph")
        .is_empty());
}

#[test]
fn test_messages_cross_contexts_in_one_domain() {
    let ctx = context();
    let domain_id = ctx.config().domain_id;
    let listener = ctx.create_node("listener").expect("Failed to create node");
    let subscription = ctx
        .create_subscription(listener, string_support(), "chatter", 10)
        .expect("Failed to create subscription");

    let peer = RmwContext::init(EnvConfig::default().with_domain_id(domain_id))
        .expect("Failed to init peer context");
    let talker = peer.create_node("talker").expect("Failed to create node");
    let publisher = peer
        .create_publisher(talker, string_support(), "chatter")
        .expect("Failed to create publisher");
    peer.publish(publisher, &StringMsg::new("across"))
        .expect("Failed to publish");

    let mut subscriptions = [Some(subscription)];
    ctx.wait(
        &mut subscriptions,
        &mut [],
        WaitTimeout::Finite(Duration::from_millis(500)),
    )
    .expect("Wait failed");
    assert_eq!(subscriptions, [Some(subscription)]);

    let mut msg = StringMsg::default();
    assert!(ctx.take(subscription, &mut msg).expect("Take failed"));
    assert_eq!(msg.data, "across");
}

#[test]
fn test_concurrent_churn_across_nodes_settles_to_empty_graph() {
    const WORKERS: usize = 4;
    const ROUNDS: usize = 25;

    let ctx = Arc::new(context());
    let observer = ctx.create_node("observer").expect("Failed to create observer");
    let done = Arc::new(AtomicBool::new(false));

    let watcher = {
        let ctx = Arc::clone(&ctx);
        let done = Arc::clone(&done);
        thread::spawn(move || {
            let expected = types(&[STRING_TYPE]);
            let mut snapshots = 0usize;
            while !done.load(Ordering::Acquire) {
                let graph = ctx
                    .get_topic_names_and_types(observer)
                    .expect("Failed to snapshot graph");
                for (topic, seen) in &graph {
                    assert!(topic.starts_with("churn_"), "unexpected topic {}", topic);
                    assert_eq!(seen, &expected);
                }
                snapshots += 1;
                thread::yield_now();
            }
            snapshots
        })
    };

    let workers: Vec<_> = (0..WORKERS)
        .map(|worker| {
            let ctx = Arc::clone(&ctx);
            thread::spawn(move || {
                let node = ctx
                    .create_node(&format!("worker_{}", worker))
                    .expect("Failed to create worker node");
                let topic = format!("churn_{}", worker);
                for _ in 0..ROUNDS {
                    let publisher = ctx
                        .create_publisher(node, string_support(), &topic)
                        .expect("Failed to create publisher");
                    let subscription = ctx
                        .create_subscription(node, string_support(), &topic, 0)
                        .expect("Failed to create subscription");
                    ctx.destroy_publisher(publisher)
                        .expect("Failed to destroy publisher");
                    ctx.destroy_subscription(subscription)
                        .expect("Failed to destroy subscription");
                }
                ctx.destroy_node(node).expect("Failed to destroy worker node");
            })
        })
        .collect();

    for worker in workers {
        worker.join().expect("Worker thread panicked");
    }
    done.store(true, Ordering::Release);
    let snapshots = watcher.join().expect("Watcher thread panicked");
    assert!(snapshots > 0);

    let graph = ctx
        .get_topic_names_and_types(observer)
        .expect("Failed to snapshot graph");
    assert!(graph.is_empty(), "graph not empty: {:?}", graph);
    for worker in 0..WORKERS {
        let topic = format!("churn_{}", worker);
        assert_eq!(ctx.count_publishers(observer, &topic).expect("Count failed"), 0);
        assert_eq!(ctx.count_subscribers(observer, &topic).expect("Count failed"), 0);
    }
    assert_eq!(ctx.handle_counts(), (1, 0, 0, 1));
}
