// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Domain participant - entry point of the entity hierarchy.

use crate::builtin::{BUILTIN_ENDPOINT_TYPE, BUILTIN_PUBLICATION_TOPIC, BUILTIN_SUBSCRIPTION_TOPIC};
use crate::domain::{DomainId, DomainRegistry, DomainState, MAX_DOMAIN_ID};
use crate::instance::InstanceHandle;
use crate::publisher::Publisher;
use crate::qos::{DataReaderQos, History, TopicQos};
use crate::reader::DataReader;
use crate::subscriber::Subscriber;
use crate::topic::Topic;
use crate::{Error, Result};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Built-in readers carrying discovery data about the other participants'
/// endpoints.
pub struct BuiltinSubscriber {
    publications: DataReader,
    subscriptions: DataReader,
}

impl BuiltinSubscriber {
    fn new(participant: InstanceHandle) -> Self {
        let qos = DataReaderQos {
            history: History::KeepAll,
        };
        Self {
            publications: DataReader::new(
                participant,
                BUILTIN_PUBLICATION_TOPIC,
                BUILTIN_ENDPOINT_TYPE,
                qos.clone(),
            ),
            subscriptions: DataReader::new(
                participant,
                BUILTIN_SUBSCRIPTION_TOPIC,
                BUILTIN_ENDPOINT_TYPE,
                qos,
            ),
        }
    }

    /// Reader of the `DCPSPublication` topic (remote writers).
    #[must_use]
    pub fn publication_reader(&self) -> &DataReader {
        &self.publications
    }

    /// Reader of the `DCPSSubscription` topic (remote readers).
    #[must_use]
    pub fn subscription_reader(&self) -> &DataReader {
        &self.subscriptions
    }
}

/// Domain participant.
///
/// Dropping the participant leaves the domain; all of its endpoints are
/// announced as gone to the remaining participants.
pub struct Participant {
    handle: InstanceHandle,
    domain: Arc<DomainState>,
    types: Mutex<HashSet<String>>,
    topics: Mutex<HashMap<String, Arc<Topic>>>,
    publishers: Mutex<Vec<Publisher>>,
    subscribers: Mutex<Vec<Subscriber>>,
    builtin: BuiltinSubscriber,
}

impl Participant {
    /// Join `domain_id` (0-232).
    pub fn create(domain_id: DomainId) -> Result<Self> {
        if domain_id > MAX_DOMAIN_ID {
            return Err(Error::InvalidDomainId(domain_id));
        }

        let handle = InstanceHandle::next();
        let domain = DomainRegistry::global().get_or_create(domain_id);
        let builtin = BuiltinSubscriber::new(handle);
        domain.add_participant(
            handle,
            builtin.publications.clone(),
            builtin.subscriptions.clone(),
        );

        log::debug!(
            "[participant] created {} in domain {}",
            handle,
            domain_id
        );
        Ok(Self {
            handle,
            domain,
            types: Mutex::new(HashSet::new()),
            topics: Mutex::new(HashMap::new()),
            publishers: Mutex::new(Vec::new()),
            subscribers: Mutex::new(Vec::new()),
            builtin,
        })
    }

    #[must_use]
    pub fn domain_id(&self) -> DomainId {
        self.domain.domain_id()
    }

    #[must_use]
    pub fn instance_handle(&self) -> InstanceHandle {
        self.handle
    }

    #[must_use]
    pub fn builtin_subscriber(&self) -> &BuiltinSubscriber {
        &self.builtin
    }

    /// Make `type_name` usable for topics. Registering twice is a no-op.
    pub fn register_type(&self, type_name: &str) -> Result<()> {
        if type_name.is_empty() {
            return Err(Error::BadParameter("type name must not be empty".into()));
        }
        self.types.lock().insert(type_name.to_string());
        Ok(())
    }

    #[must_use]
    pub fn is_type_registered(&self, type_name: &str) -> bool {
        self.types.lock().contains(type_name)
    }

    #[must_use]
    pub fn get_default_topic_qos(&self) -> TopicQos {
        TopicQos::default()
    }

    /// Create (or look up) a topic.
    ///
    /// Asking again for an existing topic with the same type returns the
    /// existing one; a different type is a [`Error::TypeMismatch`].
    pub fn create_topic(
        &self,
        name: &str,
        type_name: &str,
        qos: &TopicQos,
    ) -> Result<Arc<Topic>> {
        if name.is_empty() {
            return Err(Error::BadParameter("topic name must not be empty".into()));
        }
        if !self.is_type_registered(type_name) {
            return Err(Error::TypeNotRegistered(type_name.to_string()));
        }

        let mut topics = self.topics.lock();
        if let Some(existing) = topics.get(name) {
            if existing.type_name() != type_name {
                return Err(Error::TypeMismatch {
                    topic: name.to_string(),
                    existing: existing.type_name().to_string(),
                    requested: type_name.to_string(),
                });
            }
            return Ok(Arc::clone(existing));
        }

        let topic = Arc::new(Topic::new(name, type_name, qos.clone()));
        topics.insert(name.to_string(), Arc::clone(&topic));
        Ok(topic)
    }

    /// Look up a topic created earlier on this participant.
    #[must_use]
    pub fn find_topic(&self, name: &str) -> Option<Arc<Topic>> {
        self.topics.lock().get(name).cloned()
    }

    pub fn create_publisher(&self) -> Result<Publisher> {
        let publisher = Publisher::new(self.handle, Arc::clone(&self.domain));
        self.publishers.lock().push(publisher.clone());
        Ok(publisher)
    }

    pub fn create_subscriber(&self) -> Result<Subscriber> {
        let subscriber = Subscriber::new(self.handle, Arc::clone(&self.domain));
        self.subscribers.lock().push(subscriber.clone());
        Ok(subscriber)
    }

    /// Delete a publisher. Fails while it still owns writers.
    pub fn delete_publisher(&self, publisher: &Publisher) -> Result<()> {
        if publisher.participant_handle() != self.handle {
            return Err(Error::PreconditionNotMet(
                "publisher belongs to another participant".into(),
            ));
        }
        if publisher.writer_count() > 0 {
            return Err(Error::PreconditionNotMet(format!(
                "publisher still owns {} writers",
                publisher.writer_count()
            )));
        }

        let mut publishers = self.publishers.lock();
        let index = publishers
            .iter()
            .position(|candidate| candidate == publisher)
            .ok_or(Error::AlreadyDeleted)?;
        publishers.swap_remove(index).mark_deleted();
        Ok(())
    }

    /// Delete a subscriber. Fails while it still owns readers.
    pub fn delete_subscriber(&self, subscriber: &Subscriber) -> Result<()> {
        if subscriber.participant_handle() != self.handle {
            return Err(Error::PreconditionNotMet(
                "subscriber belongs to another participant".into(),
            ));
        }
        if subscriber.reader_count() > 0 {
            return Err(Error::PreconditionNotMet(format!(
                "subscriber still owns {} readers",
                subscriber.reader_count()
            )));
        }

        let mut subscribers = self.subscribers.lock();
        let index = subscribers
            .iter()
            .position(|candidate| candidate == subscriber)
            .ok_or(Error::AlreadyDeleted)?;
        subscribers.swap_remove(index).mark_deleted();
        Ok(())
    }

    /// `true` while any publisher or subscriber of this participant is alive.
    #[must_use]
    pub fn has_contained_entities(&self) -> bool {
        !self.publishers.lock().is_empty() || !self.subscribers.lock().is_empty()
    }
}

impl Drop for Participant {
    fn drop(&mut self) {
        for publisher in self.publishers.get_mut().drain(..) {
            publisher.mark_deleted();
        }
        for subscriber in self.subscribers.get_mut().drain(..) {
            subscriber.mark_deleted();
        }
        self.builtin.publications.set_listener(None);
        self.builtin.subscriptions.set_listener(None);
        self.domain.remove_participant(self.handle);
        log::debug!("[participant] dropped {}", self.handle);
    }
}

impl std::fmt::Debug for Participant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Participant")
            .field("handle", &self.handle)
            .field("domain", &self.domain)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtin::EndpointBuiltinTopicData;
    use crate::instance::InstanceState;
    use crate::reader::Sample;

    fn take_all(reader: &DataReader) -> Vec<Sample> {
        std::iter::from_fn(|| reader.take()).collect()
    }

    const TYPE: &str = "demo::dds_::Ping_";

    fn participant(domain_id: DomainId) -> Participant {
        let participant = Participant::create(domain_id).expect("participant creation");
        participant.register_type(TYPE).expect("type registration");
        participant
    }

    #[test]
    fn test_invalid_domain_id() {
        assert_eq!(
            Participant::create(MAX_DOMAIN_ID + 1).err(),
            Some(Error::InvalidDomainId(MAX_DOMAIN_ID + 1))
        );
    }

    #[test]
    fn test_create_topic_rules() {
        let participant = participant(180);
        let qos = participant.get_default_topic_qos();

        assert_eq!(
            participant.create_topic("ping", "unknown::Type", &qos).err(),
            Some(Error::TypeNotRegistered("unknown::Type".into()))
        );

        let first = participant.create_topic("ping", TYPE, &qos).expect("create topic");
        let second = participant.create_topic("ping", TYPE, &qos).expect("lookup topic");
        assert!(Arc::ptr_eq(&first, &second));

        participant.register_type("other::Type").expect("register");
        assert!(matches!(
            participant.create_topic("ping", "other::Type", &qos),
            Err(Error::TypeMismatch { .. })
        ));
        assert!(participant.create_topic("", TYPE, &qos).is_err());
    }

    #[test]
    fn test_loopback_within_participant() {
        let participant = participant(181);
        let topic = participant
            .create_topic("ping", TYPE, &participant.get_default_topic_qos())
            .expect("topic");
        let publisher = participant.create_publisher().expect("publisher");
        let writer = publisher
            .create_datawriter(&topic, &publisher.get_default_datawriter_qos())
            .expect("writer");
        let subscriber = participant.create_subscriber().expect("subscriber");
        let reader = subscriber
            .create_datareader(&topic, &subscriber.get_default_datareader_qos())
            .expect("reader");

        writer.write(&[1, 2, 3]).expect("write");
        let sample = reader.take().expect("sample delivered");
        assert_eq!(sample.data, Some(vec![1, 2, 3]));
        assert_eq!(sample.info.publication_handle, writer.instance_handle());
    }

    #[test]
    fn test_oversized_payload_rejected() {
        let participant = participant(182);
        let topic = participant
            .create_topic("big", TYPE, &participant.get_default_topic_qos())
            .expect("topic");
        let publisher = participant.create_publisher().expect("publisher");
        let qos = crate::qos::DataWriterQos {
            max_payload_size: 4,
        };
        let writer = publisher.create_datawriter(&topic, &qos).expect("writer");
        assert!(writer.write(&[0; 4]).is_ok());
        assert!(matches!(
            writer.write(&[0; 5]),
            Err(Error::OutOfResources(_))
        ));
    }

    #[test]
    fn test_delete_ordering_and_double_delete() {
        let participant = participant(183);
        let topic = participant
            .create_topic("ping", TYPE, &participant.get_default_topic_qos())
            .expect("topic");
        let publisher = participant.create_publisher().expect("publisher");
        let writer = publisher
            .create_datawriter(&topic, &publisher.get_default_datawriter_qos())
            .expect("writer");

        assert!(matches!(
            participant.delete_publisher(&publisher),
            Err(Error::PreconditionNotMet(_))
        ));
        publisher.delete_datawriter(&writer).expect("delete writer");
        assert_eq!(publisher.delete_datawriter(&writer), Err(Error::AlreadyDeleted));
        assert_eq!(writer.write(b"x"), Err(Error::AlreadyDeleted));

        participant.delete_publisher(&publisher).expect("delete publisher");
        assert_eq!(participant.delete_publisher(&publisher), Err(Error::AlreadyDeleted));
        assert!(publisher
            .create_datawriter(&topic, &publisher.get_default_datawriter_qos())
            .is_err());
        assert!(!participant.has_contained_entities());
    }

    #[test]
    fn test_builtin_topics_track_remote_endpoints() {
        let observer = participant(184);
        let remote = participant(184);
        let topic = remote
            .create_topic("chatter", TYPE, &remote.get_default_topic_qos())
            .expect("topic");
        let publisher = remote.create_publisher().expect("publisher");
        let writer = publisher
            .create_datawriter(&topic, &publisher.get_default_datawriter_qos())
            .expect("writer");

        let announced = take_all(observer.builtin_subscriber().publication_reader());
        assert_eq!(announced.len(), 1);
        let data = EndpointBuiltinTopicData::from_sample(&announced[0])
            .expect("alive sample carries data")
            .expect("decodes");
        assert_eq!(data.key, writer.instance_handle());
        assert_eq!(data.participant_key, remote.instance_handle());
        assert_eq!(data.topic_name, "chatter");
        assert_eq!(data.type_name, TYPE);
        assert!(take_all(remote.builtin_subscriber().publication_reader()).is_empty());

        drop(remote);
        let gone = take_all(observer.builtin_subscriber().publication_reader());
        assert_eq!(gone.len(), 1);
        assert_eq!(gone[0].info.instance_handle, writer.instance_handle());
        assert_eq!(gone[0].info.instance_state, InstanceState::NotAliveNoWriters);
        assert!(!gone[0].info.valid_data);
    }
}
