// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Coordinator-level errors (§7). Per-job execution errors live in
//! `bgjob_core::JobExecutionError`; these are tick- and server-scoped.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Storage(#[from] bgjob_core::StorageError),

    /// Raised by the coordinator after five consecutive failed ticks (§7);
    /// the server self-terminates rather than silently backlogging.
    #[error("background job server stopped after {0} consecutive tick failures")]
    TooManyConsecutiveFailures(u32),
}
