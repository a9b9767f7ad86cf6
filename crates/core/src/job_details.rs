// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job descriptor and the stable signature used for dedup (§3, Glossary).

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// A single captured argument: its declared type name plus the value,
/// deserializable from the persisted JSON (§9 "Reflection for user job code").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobParameter {
    pub class_name: String,
    pub value: serde_json::Value,
}

impl JobParameter {
    pub fn new(class_name: impl Into<String>, value: serde_json::Value) -> Self {
        Self { class_name: class_name.into(), value }
    }
}

/// Fully-qualified descriptor of the work a job performs: a "class" (the
/// dispatch-table namespace, since there are no real classes), a method
/// name, an optional static-field qualifier, and captured arguments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobDetails {
    pub class_name: String,
    pub method_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub static_field_name: Option<String>,
    #[serde(default)]
    pub job_params: Vec<JobParameter>,
}

impl JobDetails {
    pub fn new(class_name: impl Into<String>, method_name: impl Into<String>) -> Self {
        Self {
            class_name: class_name.into(),
            method_name: method_name.into(),
            static_field_name: None,
            job_params: Vec::new(),
        }
    }

    pub fn with_params(mut self, params: Vec<JobParameter>) -> Self {
        self.job_params = params;
        self
    }

    /// Stable hash of `(class_name, method_name, param class names)` used to
    /// dedup concurrent instances of the same recurring job (§3.1). Argument
    /// *values* are deliberately excluded — dedup is already scoped per
    /// `recurringJobId`, so the signature only needs to identify the method.
    pub fn signature(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.class_name.as_bytes());
        hasher.update([0u8]);
        hasher.update(self.method_name.as_bytes());
        for param in &self.job_params {
            hasher.update([0u8]);
            hasher.update(param.class_name.as_bytes());
        }
        let digest = hasher.finalize();
        hex::encode(digest)
    }
}

#[cfg(test)]
#[path = "job_details_tests.rs"]
mod tests;
