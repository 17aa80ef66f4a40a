// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

/// Default history depth (DDS default is KEEP_LAST 1).
pub const DEFAULT_HISTORY_DEPTH: u32 = 1;

/// Largest serialized payload a writer accepts by default (64 KiB).
pub const DEFAULT_MAX_PAYLOAD_SIZE: usize = 64 * 1024;

/// How many samples a reader keeps per topic before dropping the oldest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum History {
    /// Keep at most `depth` samples; older samples are replaced.
    KeepLast(u32),
    /// Keep everything until taken.
    KeepAll,
}

impl Default for History {
    fn default() -> Self {
        History::KeepLast(DEFAULT_HISTORY_DEPTH)
    }
}

impl History {
    /// Maximum number of buffered samples (`None` = unbounded).
    #[must_use]
    pub fn limit(&self) -> Option<usize> {
        match self {
            History::KeepLast(depth) => Some((*depth).max(1) as usize),
            History::KeepAll => None,
        }
    }
}

/// Topic-level defaults inherited by readers created on the topic.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TopicQos {
    pub history: History,
}

/// Reader QoS.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DataReaderQos {
    pub history: History,
}

impl DataReaderQos {
    /// Copy the topic-level policies into a reader QoS.
    #[must_use]
    pub fn from_topic(topic_qos: &TopicQos) -> Self {
        Self {
            history: topic_qos.history,
        }
    }
}

/// Writer QoS.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataWriterQos {
    /// Payloads larger than this are rejected with `OutOfResources`.
    pub max_payload_size: usize,
}

impl Default for DataWriterQos {
    fn default() -> Self {
        Self {
            max_payload_size: DEFAULT_MAX_PAYLOAD_SIZE,
        }
    }
}
