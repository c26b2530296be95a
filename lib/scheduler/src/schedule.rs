//! Cron schedules and per-trigger schedule records.
//!
//! Expressions accept the common 5-field form (minute through day of
//! week) or the 6-field form with a leading seconds field; 5-field
//! expressions are normalized by prepending `0` seconds. All
//! evaluation happens in UTC; a configured timezone is stored for
//! display but does not shift computation.
//!
//! Next occurrences are anchored on the last fire, not on "now", so a
//! slow tick never silently skips an occurrence.

use crate::error::SchedulerError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use switchyard_core::{ScheduleId, WorkflowId};
use switchyard_workflow::NodeId;

/// A parsed cron expression.
#[derive(Debug, Clone)]
pub struct CronSchedule {
    expression: String,
    schedule: cron::Schedule,
}

impl CronSchedule {
    /// Parses a 5- or 6-field cron expression.
    ///
    /// # Errors
    ///
    /// Returns an error for a wrong field count or an expression the
    /// cron parser rejects.
    pub fn parse(expression: &str) -> Result<Self, SchedulerError> {
        let fields = expression.split_whitespace().count();
        let normalized = match fields {
            5 => format!("0 {expression}"),
            6 => expression.to_string(),
            _ => {
                return Err(SchedulerError::InvalidCron {
                    expression: expression.to_string(),
                    message: format!("expected 5 or 6 fields, got {fields}"),
                });
            }
        };

        let schedule =
            cron::Schedule::from_str(&normalized).map_err(|e| SchedulerError::InvalidCron {
                expression: expression.to_string(),
                message: e.to_string(),
            })?;

        Ok(Self {
            expression: expression.to_string(),
            schedule,
        })
    }

    /// The original expression as configured.
    #[must_use]
    pub fn expression(&self) -> &str {
        &self.expression
    }

    /// The first occurrence strictly after `anchor`.
    #[must_use]
    pub fn next_after(&self, anchor: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.schedule.after(&anchor).next()
    }

    /// The next `count` occurrences strictly after `anchor`.
    #[must_use]
    pub fn occurrences_after(&self, anchor: DateTime<Utc>, count: usize) -> Vec<DateTime<Utc>> {
        self.schedule.after(&anchor).take(count).collect()
    }
}

/// Persistent state for one schedule trigger of one workflow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schedule {
    pub id: ScheduleId,
    pub workflow_id: WorkflowId,
    /// The schedule trigger node this record belongs to.
    pub trigger_id: NodeId,
    pub cron: String,
    /// Stored for display; evaluation is UTC.
    pub timezone: Option<String>,
    pub enabled: bool,
    pub created_at: DateTime<Utc>,
    pub last_run: Option<DateTime<Utc>>,
    pub next_run: Option<DateTime<Utc>>,
    pub runs: u64,
    pub successes: u64,
    pub failures: u64,
}

impl Schedule {
    /// Creates an enabled schedule with its first due time computed
    /// from `now`.
    ///
    /// # Errors
    ///
    /// Returns an error if the cron expression does not parse.
    pub fn new(
        workflow_id: WorkflowId,
        trigger_id: NodeId,
        cron: impl Into<String>,
        timezone: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<Self, SchedulerError> {
        let cron = cron.into();
        let parsed = CronSchedule::parse(&cron)?;
        Ok(Self {
            id: ScheduleId::new(),
            workflow_id,
            trigger_id,
            cron,
            timezone,
            enabled: true,
            created_at: now,
            last_run: None,
            next_run: parsed.next_after(now),
            runs: 0,
            successes: 0,
            failures: 0,
        })
    }

    /// Whether the schedule is due at `now`.
    #[must_use]
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.enabled && self.next_run.is_some_and(|next| next <= now)
    }

    /// Records one fire and advances `next_run`, anchored on the fire
    /// time.
    ///
    /// # Errors
    ///
    /// Returns an error if the stored cron expression no longer
    /// parses; counters are still updated in that case and `next_run`
    /// clears, parking the schedule.
    pub fn record_fired(
        &mut self,
        fired_at: DateTime<Utc>,
        success: bool,
    ) -> Result<(), SchedulerError> {
        self.last_run = Some(fired_at);
        self.runs += 1;
        if success {
            self.successes += 1;
        } else {
            self.failures += 1;
        }

        match CronSchedule::parse(&self.cron) {
            Ok(parsed) => {
                self.next_run = parsed.next_after(fired_at);
                Ok(())
            }
            Err(e) => {
                self.next_run = None;
                Err(e)
            }
        }
    }
}
