// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cron expression parsing and occurrence calculation (§3, §4.3).

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use cron::Schedule;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error)]
#[error("invalid cron expression {raw:?}: {source}")]
pub struct CronParseError {
    raw: String,
    #[source]
    source: cron::error::Error,
}

/// A validated cron expression, parsed once at registration time so that a
/// malformed schedule fails fast instead of on every tick (§4.3).
///
/// Wraps `cron::Schedule`; the schedule itself doesn't carry a time zone, so
/// `RecurringJob` stores the zone alongside it and `next_after` is always
/// called with that zone in mind.
#[derive(Debug, Clone)]
pub struct CronExpression {
    raw: String,
    schedule: Schedule,
}

impl CronExpression {
    pub fn parse(raw: &str) -> Result<Self, CronParseError> {
        let schedule = Schedule::from_str(raw).map_err(|source| CronParseError {
            raw: raw.to_string(),
            source,
        })?;
        Ok(Self { raw: raw.to_string(), schedule })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// The next occurrence strictly after `after`, evaluated in `zone`.
    pub fn next_after(&self, after: DateTime<Utc>, zone: Tz) -> Option<DateTime<Utc>> {
        let local_after = after.with_timezone(&zone);
        self.schedule.after(&local_after).next().map(|dt| dt.with_timezone(&Utc))
    }
}

impl fmt::Display for CronExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl PartialEq for CronExpression {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}
impl Eq for CronExpression {}

impl Serialize for CronExpression {
    fn serialize<S: serde::Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&self.raw)
    }
}

impl<'de> Deserialize<'de> for CronExpression {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(d)?;
        CronExpression::parse(&raw).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
#[path = "cron_tests.rs"]
mod tests;
