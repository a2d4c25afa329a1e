//! Five-field recurrence expressions
//!
//! `minute hour day-of-month month day-of-week`, parsed and evaluated by
//! `croner`. Months and weekdays accept three-letter names, day-of-week `0`
//! and `7` are both Sunday, and when both day fields are restricted a day
//! matches if either does.
//!
//! Descriptors: `@yearly`, `@annually`, `@monthly`, `@weekly`, `@daily`,
//! `@midnight`, `@hourly`.

use chrono::{DateTime, TimeZone};
use croner::Cron;
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// A parsed recurrence expression
#[derive(Clone)]
pub struct CronSchedule {
    expression: String,
    cron: Cron,
}

impl CronSchedule {
    /// Parse an expression; malformed input is `Error::Config`
    pub fn parse(expression: &str) -> Result<Self> {
        let trimmed = expression.trim();
        let expanded = match trimmed.to_ascii_lowercase().as_str() {
            "@yearly" | "@annually" => "0 0 1 1 *",
            "@monthly" => "0 0 1 * *",
            "@weekly" => "0 0 * * 0",
            "@daily" | "@midnight" => "0 0 * * *",
            "@hourly" => "0 * * * *",
            other if other.starts_with('@') => {
                return Err(Error::config(format!(
                    "Unknown schedule descriptor: {}",
                    trimmed
                )));
            }
            _ => trimmed,
        };

        // croner also takes a seconds field; only minute resolution is valid here
        let fields = expanded.split_whitespace().count();
        if fields != 5 {
            return Err(Error::config(format!(
                "Schedule '{}' must have 5 fields, found {}",
                trimmed, fields
            )));
        }

        let cron = Cron::new(expanded).parse().map_err(|e| {
            Error::config(format!("Invalid schedule '{}': {}", trimmed, e))
        })?;

        Ok(Self {
            expression: trimmed.to_string(),
            cron,
        })
    }

    /// The expression as written
    pub fn expression(&self) -> &str {
        &self.expression
    }

    /// Whether `t` falls on a firing
    pub fn matches<Tz: TimeZone>(&self, t: &DateTime<Tz>) -> bool {
        self.cron.is_time_matching(t).unwrap_or(false)
    }

    /// First firing strictly after `after`, evaluated in `after`'s zone
    ///
    /// Returns `None` when the schedule never fires again (e.g. `0 0 30 2 *`).
    pub fn next_after<Tz: TimeZone>(&self, after: &DateTime<Tz>) -> Option<DateTime<Tz>> {
        self.cron.find_next_occurrence(after, false).ok()
    }
}

impl PartialEq for CronSchedule {
    fn eq(&self, other: &Self) -> bool {
        self.expression == other.expression
    }
}

impl Eq for CronSchedule {}

impl FromStr for CronSchedule {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for CronSchedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.expression)
    }
}

impl fmt::Debug for CronSchedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("CronSchedule").field(&self.expression).finish()
    }
}
