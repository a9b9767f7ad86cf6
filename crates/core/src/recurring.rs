// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Recurring job definitions (§3).

use crate::cron::CronExpression;
use crate::job_details::JobDetails;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

/// A recurring job: a `JobDetails` descriptor materialized on a cron schedule.
///
/// Identity is a caller-chosen `String` (or, if not supplied, the job's
/// signature) rather than a `UUID` — recurring jobs are named so an operator
/// can re-register the same schedule idempotently across deploys.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecurringJob {
    pub id: String,
    pub job_details: JobDetails,
    pub cron_expression: CronExpression,
    #[serde(with = "tz_serde")]
    pub zone_id: Tz,
}

impl RecurringJob {
    pub fn new(
        id: impl Into<String>,
        job_details: JobDetails,
        cron_expression: CronExpression,
        zone_id: Tz,
    ) -> Self {
        Self { id: id.into(), job_details, cron_expression, zone_id }
    }

    /// Derive an id from the job signature when the caller doesn't supply one.
    pub fn derive_id(job_details: &JobDetails) -> String {
        job_details.signature()
    }
}

mod tz_serde {
    use chrono_tz::Tz;
    use serde::{Deserialize, Deserializer, Serializer};
    use std::str::FromStr;

    pub fn serialize<S: Serializer>(tz: &Tz, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(tz.name())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Tz, D::Error> {
        let s = String::deserialize(d)?;
        Tz::from_str(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
#[path = "recurring_tests.rs"]
mod tests;
