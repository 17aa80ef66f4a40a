// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Built-in discovery topics.
//!
//! Each participant owns two built-in readers. They receive one sample per
//! endpoint created (instance state `Alive`) or deleted (not-alive) by *other*
//! participants of the same domain. The sample payload is an
//! [`EndpointBuiltinTopicData`] encoded as little-endian length-prefixed
//! fields; lifecycle samples for removed endpoints carry no payload and are
//! identified by their instance handle only.

use crate::instance::InstanceHandle;
use crate::reader::Sample;
use crate::{Error, Result};

/// Topic name of the built-in publication reader.
pub const BUILTIN_PUBLICATION_TOPIC: &str = "DCPSPublication";

/// Topic name of the built-in subscription reader.
pub const BUILTIN_SUBSCRIPTION_TOPIC: &str = "DCPSSubscription";

/// Type name carried by both built-in topics.
pub const BUILTIN_ENDPOINT_TYPE: &str = "conduit::dds_::EndpointBuiltinTopicData_";

/// Discovery data announced for a writer or a reader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointBuiltinTopicData {
    /// Instance handle of the announced endpoint.
    pub key: InstanceHandle,
    /// Instance handle of the participant owning the endpoint.
    pub participant_key: InstanceHandle,
    pub topic_name: String,
    pub type_name: String,
}

impl EndpointBuiltinTopicData {
    /// Encode as `key:u64 | participant:u64 | len:u32 topic | len:u32 type`.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf =
            Vec::with_capacity(16 + 8 + self.topic_name.len() + self.type_name.len());
        buf.extend_from_slice(&self.key.as_raw().to_le_bytes());
        buf.extend_from_slice(&self.participant_key.as_raw().to_le_bytes());
        write_string(&mut buf, &self.topic_name);
        write_string(&mut buf, &self.type_name);
        buf
    }

    /// Decode a payload produced by [`to_bytes`](Self::to_bytes).
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let mut cursor = Cursor { bytes, pos: 0 };
        let key = InstanceHandle::from_raw(cursor.read_u64()?);
        let participant_key = InstanceHandle::from_raw(cursor.read_u64()?);
        let topic_name = cursor.read_string()?;
        let type_name = cursor.read_string()?;
        if cursor.pos != bytes.len() {
            return Err(Error::BadParameter(format!(
                "trailing {} bytes in builtin endpoint data",
                bytes.len() - cursor.pos
            )));
        }
        Ok(Self {
            key,
            participant_key,
            topic_name,
            type_name,
        })
    }

    /// Decode the payload of a built-in sample, if it carries one.
    pub fn from_sample(sample: &Sample) -> Option<Result<Self>> {
        sample.data.as_deref().map(Self::from_bytes)
    }
}

fn write_string(buf: &mut Vec<u8>, value: &str) {
    buf.extend_from_slice(&(value.len() as u32).to_le_bytes());
    buf.extend_from_slice(value.as_bytes());
}

struct Cursor<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl Cursor<'_> {
    fn read_exact(&mut self, len: usize) -> Result<&[u8]> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|end| *end <= self.bytes.len())
            .ok_or_else(|| {
                Error::BadParameter(format!(
                    "builtin endpoint data truncated at offset {}",
                    self.pos
                ))
            })?;
        let slice = &self.bytes[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn read_u64(&mut self) -> Result<u64> {
        let mut raw = [0u8; 8];
        raw.copy_from_slice(self.read_exact(8)?);
        Ok(u64::from_le_bytes(raw))
    }

    fn read_string(&mut self) -> Result<String> {
        let mut raw = [0u8; 4];
        raw.copy_from_slice(self.read_exact(4)?);
        let len = u32::from_le_bytes(raw) as usize;
        let bytes = self.read_exact(len)?;
        String::from_utf8(bytes.to_vec())
            .map_err(|_| Error::BadParameter("builtin endpoint string is not UTF-8".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chatter() -> EndpointBuiltinTopicData {
        EndpointBuiltinTopicData {
            key: InstanceHandle::from_raw(0x11),
            participant_key: InstanceHandle::from_raw(0x22),
            topic_name: "chatter".into(),
            type_name: "std_msgs::dds_::String_".into(),
        }
    }

    #[test]
    fn decode_matches_encode() {
        let data = chatter();
        let decoded = EndpointBuiltinTopicData::from_bytes(&data.to_bytes())
            .expect("decode should succeed");
        assert_eq!(decoded, data);
    }

    #[test]
    fn truncated_payload_is_rejected() {
        let bytes = chatter().to_bytes();
        for len in [0, 7, 16, 19, bytes.len() - 1] {
            assert!(
                EndpointBuiltinTopicData::from_bytes(&bytes[..len]).is_err(),
                "prefix of {} bytes should not decode",
                len
            );
        }
    }

    #[test]
    fn trailing_bytes_are_rejected() {
        let mut bytes = chatter().to_bytes();
        bytes.push(0);
        assert!(matches!(
            EndpointBuiltinTopicData::from_bytes(&bytes),
            Err(Error::BadParameter(_))
        ));
    }

    #[test]
    fn oversized_length_prefix_is_rejected() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&1u64.to_le_bytes());
        bytes.extend_from_slice(&2u64.to_le_bytes());
        bytes.extend_from_slice(&u32::MAX.to_le_bytes());
        assert!(EndpointBuiltinTopicData::from_bytes(&bytes).is_err());
    }
}
