// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

use crate::qos::TopicQos;

/// Named data channel bound to one registered type name.
///
/// Writers and readers match when both topic name and type name are equal.
#[derive(Debug)]
pub struct Topic {
    name: String,
    type_name: String,
    qos: TopicQos,
}

impl Topic {
    pub(crate) fn new(name: &str, type_name: &str, qos: TopicQos) -> Self {
        Self {
            name: name.to_string(),
            type_name: type_name.to_string(),
            qos,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    #[must_use]
    pub fn qos(&self) -> &TopicQos {
        &self.qos
    }
}
