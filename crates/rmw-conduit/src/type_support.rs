// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Per-message-type marshalling callbacks.
//!
//! [`TypeSupport`] is the boundary the rmw layer calls through; generated
//! code would implement it per message type. [`MessageTypeSupport`] is the
//! generic implementation for any [`Message`].

use crate::error::{Error, Result};
use conduit_dds::{DataReader, DataWriter, Participant};
use std::any::Any;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

/// Type support identifier accepted by this implementation.
pub const TYPESUPPORT_IDENTIFIER: &str = "rosidl_typesupport_conduit";

/// Transport type name of `package/msg/Message`: `package::dds_::Message_`.
#[must_use]
pub fn qualified_type_name(package: &str, message: &str) -> String {
    format!("{}::dds_::{}_", package, message)
}

/// A message type with a binary encoding.
pub trait Message: Any + Send + Sync + Sized {
    const PACKAGE: &'static str;
    const NAME: &'static str;

    fn encode(&self, buf: &mut Vec<u8>) -> Result<()>;

    fn decode(bytes: &[u8]) -> Result<Self>;
}

/// Marshalling callbacks for one message type.
pub trait TypeSupport: Send + Sync {
    /// Identifier of the code generator that produced these callbacks.
    fn typesupport_identifier(&self) -> &'static str {
        TYPESUPPORT_IDENTIFIER
    }

    fn package_name(&self) -> &str;

    fn message_name(&self) -> &str;

    /// Make the type known to a participant under `type_name`.
    fn register_type(&self, participant: &Participant, type_name: &str) -> Result<()>;

    /// Serialize `message` and write it.
    fn publish(&self, writer: &DataWriter, message: &dyn Any) -> Result<()>;

    /// Take the next sample into `message`. `Ok(false)` when no data is
    /// buffered.
    fn take(&self, reader: &DataReader, message: &mut dyn Any) -> Result<bool>;
}

/// Generic [`TypeSupport`] for any [`Message`].
pub struct MessageTypeSupport<M> {
    _message: PhantomData<fn() -> M>,
}

impl<M: Message> MessageTypeSupport<M> {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            _message: PhantomData,
        }
    }

    /// Shared instance, ready to hand to `create_publisher` /
    /// `create_subscription`.
    #[must_use]
    pub fn shared() -> Arc<dyn TypeSupport> {
        Arc::new(Self::new())
    }
}

impl<M: Message> Default for MessageTypeSupport<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M> fmt::Debug for MessageTypeSupport<M>
where
    M: Message,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MessageTypeSupport<{}/{}>", M::PACKAGE, M::NAME)
    }
}

impl<M: Message> TypeSupport for MessageTypeSupport<M> {
    fn package_name(&self) -> &str {
        M::PACKAGE
    }

    fn message_name(&self) -> &str {
        M::NAME
    }

    fn register_type(&self, participant: &Participant, type_name: &str) -> Result<()> {
        participant
            .register_type(type_name)
            .map_err(|e| Error::ResourceExhausted(format!("failed to register type: {}", e)))
    }

    fn publish(&self, writer: &DataWriter, message: &dyn Any) -> Result<()> {
        let message = message.downcast_ref::<M>().ok_or_else(|| {
            Error::InvalidArgument(format!("message is not a {}/{}", M::PACKAGE, M::NAME))
        })?;

        let mut buf = Vec::new();
        message.encode(&mut buf)?;
        writer
            .write(&buf)
            .map_err(|e| Error::TransportFailure(format!("failed to publish message: {}", e)))
    }

    fn take(&self, reader: &DataReader, message: &mut dyn Any) -> Result<bool> {
        let Some(out) = message.downcast_mut::<M>() else {
            return Err(Error::InvalidArgument(format!(
                "output is not a {}/{}",
                M::PACKAGE,
                M::NAME
            )));
        };

        while let Some(sample) = reader.take() {
            // Lifecycle-only samples carry nothing to hand out.
            let Some(data) = sample.data else {
                continue;
            };
            *out = M::decode(&data)?;
            return Ok(true);
        }
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default, PartialEq)]
    struct Counter {
        value: u32,
    }

    impl Message for Counter {
        const PACKAGE: &'static str = "test_msgs";
        const NAME: &'static str = "Counter";

        fn encode(&self, buf: &mut Vec<u8>) -> Result<()> {
            buf.extend_from_slice(&self.value.to_le_bytes());
            Ok(())
        }

        fn decode(bytes: &[u8]) -> Result<Self> {
            let raw: [u8; 4] = bytes
                .try_into()
                .map_err(|_| Error::Serialization(format!("expected 4 bytes, got {}", bytes.len())))?;
            Ok(Self {
                value: u32::from_le_bytes(raw),
            })
        }
    }

    #[test]
    fn qualified_name_format() {
        assert_eq!(
            qualified_type_name("std_msgs", "String"),
            "std_msgs::dds_::String_"
        );
    }

    #[test]
    fn publish_and_take_through_transport() {
        let support = MessageTypeSupport::<Counter>::new();
        let participant = Participant::create(190).expect("participant");
        let type_name = qualified_type_name(support.package_name(), support.message_name());
        support
            .register_type(&participant, &type_name)
            .expect("register");

        let topic = participant
            .create_topic("count", &type_name, &participant.get_default_topic_qos())
            .expect("topic");
        let publisher = participant.create_publisher().expect("publisher");
        let writer = publisher
            .create_datawriter(&topic, &publisher.get_default_datawriter_qos())
            .expect("writer");
        let subscriber = participant.create_subscriber().expect("subscriber");
        let reader = subscriber
            .create_datareader(&topic, &subscriber.get_default_datareader_qos())
            .expect("reader");

        let mut out = Counter::default();
        assert!(!support.take(&reader, &mut out).expect("take on empty"));

        support
            .publish(&writer, &Counter { value: 7 })
            .expect("publish");
        assert!(support.take(&reader, &mut out).expect("take"));
        assert_eq!(out, Counter { value: 7 });
    }

    #[test]
    fn wrong_message_type_is_invalid_argument() {
        let support = MessageTypeSupport::<Counter>::new();
        let participant = Participant::create(191).expect("participant");
        let type_name = qualified_type_name(Counter::PACKAGE, Counter::NAME);
        support
            .register_type(&participant, &type_name)
            .expect("register");
        let topic = participant
            .create_topic("count", &type_name, &participant.get_default_topic_qos())
            .expect("topic");
        let publisher = participant.create_publisher().expect("publisher");
        let writer = publisher
            .create_datawriter(&topic, &publisher.get_default_datawriter_qos())
            .expect("writer");

        assert!(matches!(
            support.publish(&writer, &"not a counter"),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn default_identifier() {
        let support = MessageTypeSupport::<Counter>::shared();
        assert_eq!(support.typesupport_identifier(), TYPESUPPORT_IDENTIFIER);
    }
}
