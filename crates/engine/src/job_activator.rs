// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `JobActivator` (§2.1, §4.5.1, §9 "Reflection for user job code"): resolves
//! a `JobDetails` descriptor to a callable. There is no runtime reflection in
//! Rust, so registration is an explicit dispatch table keyed by
//! `(class_name, method_name)` built at startup.

use async_trait::async_trait;
use bgjob_core::{JobDetails, JobExecutionError};
use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// A registered job body: takes the raw JSON parameter values (already
/// matched positionally against `JobDetails::job_params`) and resolves when
/// the job completes.
pub type JobBody = Arc<
    dyn Fn(Vec<Value>) -> Pin<Box<dyn Future<Output = Result<(), JobExecutionError>> + Send>>
        + Send
        + Sync,
>;

/// Resolves a `JobDetails` descriptor to a callable and invokes it (§4.5.1).
#[async_trait]
pub trait JobActivator: Send + Sync {
    async fn run(&self, job_details: &JobDetails) -> Result<(), JobExecutionError>;
}

/// The in-scope `JobActivator`: a static dispatch table built at startup,
/// keyed by `"{class_name}::{method_name}"` (§4.5.1).
#[derive(Clone, Default)]
pub struct DispatchTableActivator {
    table: HashMap<String, JobBody>,
}

fn key(class_name: &str, method_name: &str) -> String {
    format!("{class_name}::{method_name}")
}

impl DispatchTableActivator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a job body under `(class_name, method_name)`.
    pub fn register<F, Fut>(mut self, class_name: &str, method_name: &str, body: F) -> Self
    where
        F: Fn(Vec<Value>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), JobExecutionError>> + Send + 'static,
    {
        self.table.insert(key(class_name, method_name), Arc::new(move |args| Box::pin(body(args))));
        self
    }
}

#[async_trait]
impl JobActivator for DispatchTableActivator {
    async fn run(&self, job_details: &JobDetails) -> Result<(), JobExecutionError> {
        let body = self
            .table
            .get(&key(&job_details.class_name, &job_details.method_name))
            .cloned()
            .ok_or_else(|| {
                if self.table.keys().any(|k| k.starts_with(&format!("{}::", job_details.class_name))) {
                    JobExecutionError::MethodNotFound {
                        class_name: job_details.class_name.clone(),
                        method_name: job_details.method_name.clone(),
                    }
                } else {
                    JobExecutionError::ClassNotFound { class_name: job_details.class_name.clone() }
                }
            })?;
        let args: Vec<Value> = job_details.job_params.iter().map(|p| p.value.clone()).collect();
        body(args).await
    }
}

#[cfg(test)]
#[path = "job_activator_tests.rs"]
mod tests;
