// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn signature_is_stable_across_calls() {
    let details = JobDetails::new("emails", "send_welcome")
        .with_params(vec![JobParameter::new("String", serde_json::json!("alice@example.com"))]);
    assert_eq!(details.signature(), details.signature());
}

#[test]
fn signature_ignores_argument_values() {
    let a = JobDetails::new("emails", "send_welcome")
        .with_params(vec![JobParameter::new("String", serde_json::json!("alice"))]);
    let b = JobDetails::new("emails", "send_welcome")
        .with_params(vec![JobParameter::new("String", serde_json::json!("bob"))]);
    assert_eq!(a.signature(), b.signature());
}

#[test]
fn signature_differs_by_method() {
    let a = JobDetails::new("emails", "send_welcome");
    let b = JobDetails::new("emails", "send_reminder");
    assert_ne!(a.signature(), b.signature());
}

#[test]
fn signature_differs_by_param_types() {
    let a = JobDetails::new("emails", "send")
        .with_params(vec![JobParameter::new("String", serde_json::json!("x"))]);
    let b = JobDetails::new("emails", "send")
        .with_params(vec![JobParameter::new("i64", serde_json::json!(1))]);
    assert_ne!(a.signature(), b.signature());
}
