// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The dispatch table this binary bootstraps (§4.5.1, §9 "Reflection for
//! user job code"): there is no real application wiring it up to, so it
//! registers a small catalog of demo job bodies under one synthetic class.

use bgjob_core::JobExecutionError;
use bgjob_engine::DispatchTableActivator;

/// Synthetic `class_name` every CLI-submitted job is registered under;
/// `job-name` on the command line is the `method_name`.
pub const DEMO_CLASS: &str = "demo";

pub fn build_activator() -> DispatchTableActivator {
    DispatchTableActivator::new()
        .register(DEMO_CLASS, "noop", |_args| async { Ok(()) })
        .register(DEMO_CLASS, "echo", |args| async move {
            tracing::info!(?args, "echo");
            Ok(())
        })
        .register(DEMO_CLASS, "fail", |_args| async {
            Err(JobExecutionError::Failed {
                message: "demo job `fail` always fails".to_string(),
                stacktrace: String::new(),
            })
        })
}
