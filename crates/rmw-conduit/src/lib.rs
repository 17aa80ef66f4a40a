// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! ROS 2 style middleware layer over `conduit-dds`.
//!
//! [`RmwContext`] hands out typed, generation-checked handles for nodes,
//! publishers, subscriptions and guard conditions, multiplexes waits over
//! them and keeps a per-node topic graph fed by the transport's built-in
//! discovery readers.
//!
//! ```rust
//! use rmw_conduit::{EnvConfig, RmwContext, WaitTimeout};
//!
//! let ctx = RmwContext::init(EnvConfig::default().with_domain_id(42))?;
//! let guard = ctx.create_guard_condition()?;
//! ctx.trigger_guard_condition(guard)?;
//!
//! let mut guards = [Some(guard)];
//! let report = ctx.wait(&mut [], &mut guards, WaitTimeout::NonBlocking)?;
//! assert_eq!(report.ready_guard_conditions, 1);
//! assert_eq!(guards, [Some(guard)]);
//! # Ok::<(), rmw_conduit::Error>(())
//! ```

mod context;
mod discovery;
pub mod env_config;
mod error;
mod error_string;
mod graph;
mod handle;
mod node;
mod resources;
mod type_support;
mod wait;
mod waitable;

pub use context::RmwContext;
pub use discovery::DiscoveryListener;
pub use env_config::EnvConfig;
pub use error::{Error, Result, RetCode};
pub use error_string::{error_is_set, get_error_string, reset_error, set_error_string};
pub use graph::{EndpointKind, EndpointRecord, TopicGraphCache, TopicNamesAndTypes};
pub use handle::{
    GuardConditionHandle, GuardConditionKind, Handle, HandleKind, NodeHandle, NodeKind,
    PublisherHandle, PublisherKind, SubscriptionHandle, SubscriptionKind,
    IMPLEMENTATION_IDENTIFIER,
};
pub use resources::{Gid, RMW_GID_STORAGE_SIZE};
pub use type_support::{
    qualified_type_name, Message, MessageTypeSupport, TypeSupport, TYPESUPPORT_IDENTIFIER,
};
pub use wait::{WaitReport, WaitTimeout};
pub use waitable::WaitableKind;
