// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

#![allow(dead_code)]

use rmw_conduit::{EnvConfig, Error, Message, MessageTypeSupport, RmwContext, TypeSupport};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// `std_msgs/String` stand-in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StringMsg {
    pub data: String,
}

impl StringMsg {
    pub fn new(data: &str) -> Self {
        Self {
            data: data.to_string(),
        }
    }
}

impl Message for StringMsg {
    const PACKAGE: &'static str = "std_msgs";
    const NAME: &'static str = "String";

    fn encode(&self, buf: &mut Vec<u8>) -> rmw_conduit::Result<()> {
        buf.extend_from_slice(self.data.as_bytes());
        Ok(())
    }

    fn decode(bytes: &[u8]) -> rmw_conduit::Result<Self> {
        String::from_utf8(bytes.to_vec())
            .map(|data| Self { data })
            .map_err(|e| Error::Serialization(e.to_string()))
    }
}

/// `std_msgs/Int32` stand-in, used where a second type is needed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Int32Msg {
    pub data: i32,
}

impl Message for Int32Msg {
    const PACKAGE: &'static str = "std_msgs";
    const NAME: &'static str = "Int32";

    fn encode(&self, buf: &mut Vec<u8>) -> rmw_conduit::Result<()> {
        buf.extend_from_slice(&self.data.to_le_bytes());
        Ok(())
    }

    fn decode(bytes: &[u8]) -> rmw_conduit::Result<Self> {
        let raw: [u8; 4] = bytes
            .try_into()
            .map_err(|_| Error::Serialization(format!("expected 4 bytes, got {}", bytes.len())))?;
        Ok(Self {
            data: i32::from_le_bytes(raw),
        })
    }
}

pub fn string_support() -> Arc<dyn TypeSupport> {
    MessageTypeSupport::<StringMsg>::shared()
}

pub fn int32_support() -> Arc<dyn TypeSupport> {
    MessageTypeSupport::<Int32Msg>::shared()
}

static NEXT_DOMAIN: AtomicU32 = AtomicU32::new(10);

/// Domain id not used by any other test of this binary.
pub fn unique_domain() -> u32 {
    NEXT_DOMAIN.fetch_add(1, Ordering::Relaxed)
}

/// Context on a fresh domain with a short poll interval.
pub fn context() -> RmwContext {
    let config = EnvConfig {
        wait_poll_interval: Duration::from_millis(20),
        ..EnvConfig::default()
    }
    .with_domain_id(unique_domain());
    RmwContext::init(config).expect("Failed to init context")
}
