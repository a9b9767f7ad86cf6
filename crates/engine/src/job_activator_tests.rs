// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use bgjob_core::JobDetails;
use std::sync::atomic::{AtomicBool, Ordering};

#[tokio::test]
async fn runs_the_registered_body() {
    let ran = Arc::new(AtomicBool::new(false));
    let ran_clone = ran.clone();
    let activator = DispatchTableActivator::new().register("emails", "send_welcome", move |_args| {
        let ran = ran_clone.clone();
        async move {
            ran.store(true, Ordering::SeqCst);
            Ok(())
        }
    });

    activator.run(&JobDetails::new("emails", "send_welcome")).await.unwrap();
    assert!(ran.load(Ordering::SeqCst));
}

#[tokio::test]
async fn unknown_class_reports_class_not_found() {
    let activator = DispatchTableActivator::new();
    let err = activator.run(&JobDetails::new("emails", "send_welcome")).await.unwrap_err();
    assert!(matches!(err, JobExecutionError::ClassNotFound { .. }));
}

#[tokio::test]
async fn known_class_unknown_method_reports_method_not_found() {
    let activator = DispatchTableActivator::new()
        .register("emails", "send_welcome", |_args| async { Ok(()) });
    let err = activator.run(&JobDetails::new("emails", "send_goodbye")).await.unwrap_err();
    assert!(matches!(err, JobExecutionError::MethodNotFound { .. }));
}

#[tokio::test]
async fn propagates_the_job_bodys_error() {
    let activator = DispatchTableActivator::new().register("emails", "send_welcome", |_args| async {
        Err(JobExecutionError::Failed { message: "smtp down".into(), stacktrace: String::new() })
    });
    let err = activator.run(&JobDetails::new("emails", "send_welcome")).await.unwrap_err();
    assert!(matches!(err, JobExecutionError::Failed { .. }));
}
