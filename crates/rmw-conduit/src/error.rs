// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

use thiserror::Error;

/// Errors emitted by the rmw layer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// Null, stale or foreign handle; malformed topic name; misuse.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    /// Handle created by another middleware implementation.
    #[error("handle not from this implementation: expected '{expected}', found '{found}'")]
    ImplementationMismatch {
        expected: &'static str,
        found: &'static str,
    },
    /// Handle table full, or the transport refused to create an entity.
    #[error("resource exhausted: {0}")]
    ResourceExhausted(String),
    /// Transport reported a non-timeout failure during wait/publish/take.
    #[error("transport failure: {0}")]
    TransportFailure(String),
    /// Message could not be encoded or decoded.
    #[error("serialization failed: {0}")]
    Serialization(String),
}

/// Return codes of the C-style rmw interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum RetCode {
    Ok = 0,
    Error = 1,
    Timeout = 2,
    InvalidArgument = 11,
    BadAlloc = 10,
    IncorrectRmwImplementation = 12,
}

impl Error {
    /// Map to the rmw return code reported across the C boundary.
    #[must_use]
    pub fn ret_code(&self) -> RetCode {
        match self {
            Error::InvalidArgument(_) => RetCode::InvalidArgument,
            Error::ImplementationMismatch { .. } => RetCode::IncorrectRmwImplementation,
            Error::ResourceExhausted(_) => RetCode::BadAlloc,
            Error::TransportFailure(_) | Error::Serialization(_) => RetCode::Error,
        }
    }
}

impl From<conduit_dds::Error> for Error {
    fn from(err: conduit_dds::Error) -> Self {
        use conduit_dds::Error as Dds;
        match err {
            Dds::InvalidDomainId(_)
            | Dds::BadParameter(_)
            | Dds::TypeMismatch { .. }
            | Dds::PreconditionNotMet(_)
            | Dds::AlreadyDeleted
            | Dds::Condition(_) => Error::InvalidArgument(err.to_string()),
            Dds::TypeNotRegistered(_) | Dds::OutOfResources(_) => {
                Error::ResourceExhausted(err.to_string())
            }
            Dds::Timeout => Error::TransportFailure(err.to_string()),
        }
    }
}

/// Convenient alias for rmw results.
pub type Result<T> = core::result::Result<T, Error>;
