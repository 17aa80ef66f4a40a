// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! # conduit-dds - in-process DDS object model
//!
//! A compact DDS-style transport used underneath `rmw-conduit`. It provides
//! the entity model the middleware adapter expects (participant, topic,
//! publisher/subscriber, data writer/reader), default QoS accessors,
//! condition-based notification (status and guard conditions plus a blocking
//! [`WaitSet`]) and the built-in discovery topics that announce remote
//! publications and subscriptions.
//!
//! Every participant created with the same domain id in one process joins the
//! same domain and exchanges samples with matching endpoints. There is no
//! network layer.
//!
//! ## Entity Hierarchy
//!
//! ```text
//! Participant (domain N)
//! +-- BuiltinSubscriber
//! |   +-- DataReader "DCPSPublication"   (remote writers)
//! |   +-- DataReader "DCPSSubscription"  (remote readers)
//! +-- Publisher
//! |   +-- DataWriter  ------> Topic(name, type)
//! +-- Subscriber
//!     +-- DataReader  <------ Topic(name, type)
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use conduit_dds::{Participant, StatusMask, WaitSet};
//! use std::time::Duration;
//!
//! let participant = Participant::create(7)?;
//! participant.register_type("demo::dds_::Ping_")?;
//! let topic = participant.create_topic(
//!     "ping",
//!     "demo::dds_::Ping_",
//!     &participant.get_default_topic_qos(),
//! )?;
//!
//! let publisher = participant.create_publisher()?;
//! let writer = publisher.create_datawriter(&topic, &publisher.get_default_datawriter_qos())?;
//! let subscriber = participant.create_subscriber()?;
//! let reader = subscriber.create_datareader(&topic, &subscriber.get_default_datareader_qos())?;
//!
//! let status = reader.get_status_condition();
//! status.set_enabled_statuses(StatusMask::DATA_AVAILABLE);
//! let waitset = WaitSet::new();
//! waitset.attach_condition(status)?;
//!
//! writer.write(b"hello")?;
//! let triggered = waitset.wait(Some(Duration::from_millis(100)))?;
//! assert_eq!(triggered.len(), 1);
//! assert_eq!(reader.take().and_then(|s| s.data).as_deref(), Some(&b"hello"[..]));
//! # Ok::<(), conduit_dds::Error>(())
//! ```

/// Built-in discovery topic data and helpers.
pub mod builtin;
/// Status and guard conditions.
pub mod condition;
mod domain;
/// Instance handles and sample metadata.
pub mod instance;
mod participant;
mod publisher;
/// QoS policy definitions (only the policies the loopback honours).
pub mod qos;
mod reader;
mod subscriber;
mod topic;
mod waitset;
mod writer;

pub use builtin::{EndpointBuiltinTopicData, BUILTIN_PUBLICATION_TOPIC, BUILTIN_SUBSCRIPTION_TOPIC};
pub use condition::{Condition, GuardCondition, StatusCondition, StatusMask, WaitsetSignal};
pub use domain::{DomainId, MAX_DOMAIN_ID};
pub use instance::{InstanceHandle, InstanceState, SampleInfo, ViewState};
pub use participant::{BuiltinSubscriber, Participant};
pub use publisher::Publisher;
pub use qos::{DataReaderQos, DataWriterQos, History, TopicQos};
pub use reader::{DataReader, DataReaderListener, Sample};
pub use subscriber::Subscriber;
pub use topic::Topic;
pub use waitset::WaitSet;
pub use writer::DataWriter;

/// Errors returned by transport operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Domain ID out of range (0-232).
    InvalidDomainId(u32),
    /// Malformed argument (empty name, bad payload, ...).
    BadParameter(String),
    /// Type name used before `register_type`.
    TypeNotRegistered(String),
    /// Topic already exists in this participant with a different type.
    TypeMismatch {
        /// Topic name.
        topic: String,
        /// Type already bound to the topic.
        existing: String,
        /// Type requested by the caller.
        requested: String,
    },
    /// Entity still owns children, or belongs to another parent.
    PreconditionNotMet(String),
    /// Entity was already deleted.
    AlreadyDeleted,
    /// Resource limit hit (payload size, history, ...).
    OutOfResources(String),
    /// Condition attach/detach misuse on a wait set.
    Condition(String),
    /// Wait elapsed without any attached condition triggering.
    Timeout,
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::InvalidDomainId(id) => write!(f, "Invalid domain_id: {} (must be 0-232)", id),
            Error::BadParameter(msg) => write!(f, "Bad parameter: {}", msg),
            Error::TypeNotRegistered(name) => write!(f, "Type not registered: {}", name),
            Error::TypeMismatch {
                topic,
                existing,
                requested,
            } => write!(
                f,
                "Topic '{}' already bound to type '{}' (requested '{}')",
                topic, existing, requested
            ),
            Error::PreconditionNotMet(msg) => write!(f, "Precondition not met: {}", msg),
            Error::AlreadyDeleted => write!(f, "Entity already deleted"),
            Error::OutOfResources(msg) => write!(f, "Out of resources: {}", msg),
            Error::Condition(msg) => write!(f, "Condition error: {}", msg),
            Error::Timeout => write!(f, "Timeout"),
        }
    }
}

impl std::error::Error for Error {}

/// Convenient alias for transport results.
pub type Result<T> = core::result::Result<T, Error>;
