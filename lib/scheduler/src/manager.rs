//! Trigger management.
//!
//! Owns the schedule records derived from the `schedule_trigger` nodes
//! of registered workflows. Syncing a workflow is a full replace:
//! existing records for that workflow are dropped and rebuilt from the
//! definition, so edits and deletions converge on the same path. A bad
//! cron expression on one trigger never blocks the others.
//!
//! Firing is at-least-once tolerant: before starting an execution, a
//! caller claims the `(workflow, trigger, occurrence)` slot through an
//! atomic counter; only the first claimant proceeds.

use crate::error::SchedulerError;
use crate::schedule::Schedule;
use crate::store::KeyValueStore;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde_json::Value as JsonValue;
use std::sync::Arc;
use std::time::Duration;
use switchyard_core::WorkflowId;
use switchyard_nodes::builtin::trigger::SCHEDULE_TRIGGER;
use switchyard_workflow::{NodeId, WorkflowDefinition};
use tracing::{debug, warn};

const SCHEDULE_PREFIX: &str = "schedule:";
const CLAIM_PREFIX: &str = "fired:";

/// How long a fire claim stays around to fence out duplicates.
const CLAIM_TTL: Duration = Duration::from_secs(24 * 60 * 60);

fn schedule_key(workflow_id: WorkflowId, trigger_id: NodeId) -> String {
    format!("{SCHEDULE_PREFIX}{workflow_id}:{trigger_id}")
}

fn workflow_prefix(workflow_id: WorkflowId) -> String {
    format!("{SCHEDULE_PREFIX}{workflow_id}:")
}

/// Manages schedule records in a key-value store.
pub struct TriggerManager {
    store: Arc<dyn KeyValueStore>,
}

impl TriggerManager {
    #[must_use]
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Rebuilds the schedule records of one workflow from its
    /// definition.
    ///
    /// Triggers with a missing or unparsable cron expression are
    /// skipped with a warning; the rest are scheduled normally.
    pub async fn sync_workflow(
        &self,
        definition: &WorkflowDefinition,
        now: DateTime<Utc>,
    ) -> Result<Vec<Schedule>, SchedulerError> {
        self.unschedule_workflow(definition.id).await?;

        let mut created = Vec::new();
        for instance in definition.nodes_of_type(SCHEDULE_TRIGGER) {
            let Some(cron) = instance.config.get("cron").and_then(JsonValue::as_str) else {
                warn!(
                    workflow_id = %definition.id,
                    node = %instance.name,
                    "schedule trigger has no cron expression; skipped"
                );
                continue;
            };
            let timezone = instance
                .config
                .get("timezone")
                .and_then(JsonValue::as_str)
                .map(str::to_string);

            match Schedule::new(definition.id, instance.id, cron, timezone, now) {
                Ok(schedule) => {
                    self.save(&schedule).await?;
                    debug!(
                        workflow_id = %definition.id,
                        node = %instance.name,
                        cron,
                        next_run = ?schedule.next_run,
                        "trigger scheduled"
                    );
                    created.push(schedule);
                }
                Err(e) => {
                    warn!(
                        workflow_id = %definition.id,
                        node = %instance.name,
                        error = %e,
                        "schedule trigger skipped"
                    );
                }
            }
        }
        Ok(created)
    }

    /// Removes every schedule record of one workflow. Returns how many
    /// were removed.
    pub async fn unschedule_workflow(
        &self,
        workflow_id: WorkflowId,
    ) -> Result<usize, SchedulerError> {
        let keys = self
            .store
            .keys_with_prefix(&workflow_prefix(workflow_id))
            .await?;
        let mut removed = 0;
        for key in keys {
            if self.store.remove(&key).await? {
                removed += 1;
            }
        }
        Ok(removed)
    }

    /// Every decodable schedule record, sorted by key. Undecodable
    /// records are skipped with a warning; `cleanup` removes them.
    pub async fn schedules(&self) -> Result<Vec<Schedule>, SchedulerError> {
        let keys = self.store.keys_with_prefix(SCHEDULE_PREFIX).await?;
        let mut schedules = Vec::with_capacity(keys.len());
        for key in keys {
            let Some(raw) = self.store.get(&key).await? else {
                continue;
            };
            match serde_json::from_str::<Schedule>(&raw) {
                Ok(schedule) => schedules.push(schedule),
                Err(e) => warn!(key = %key, error = %e, "undecodable schedule record"),
            }
        }
        Ok(schedules)
    }

    /// Enabled schedules only; the set a timer driver polls.
    pub async fn active_schedules(&self) -> Result<Vec<Schedule>, SchedulerError> {
        Ok(self
            .schedules()
            .await?
            .into_iter()
            .filter(|schedule| schedule.enabled)
            .collect())
    }

    /// Schedule records of one workflow, decodable ones only.
    pub async fn workflow_schedules(
        &self,
        workflow_id: WorkflowId,
    ) -> Result<Vec<Schedule>, SchedulerError> {
        let keys = self
            .store
            .keys_with_prefix(&workflow_prefix(workflow_id))
            .await?;
        let mut schedules = Vec::with_capacity(keys.len());
        for key in keys {
            let Some(raw) = self.store.get(&key).await? else {
                continue;
            };
            match serde_json::from_str::<Schedule>(&raw) {
                Ok(schedule) => schedules.push(schedule),
                Err(e) => warn!(key = %key, error = %e, "undecodable schedule record"),
            }
        }
        Ok(schedules)
    }

    /// Enabled schedules whose due time has passed.
    pub async fn due(&self, now: DateTime<Utc>) -> Result<Vec<Schedule>, SchedulerError> {
        Ok(self
            .schedules()
            .await?
            .into_iter()
            .filter(|schedule| schedule.is_due(now))
            .collect())
    }

    /// Claims one occurrence of one trigger. Returns true for the
    /// first claimant only; duplicate ticks and restarted pollers get
    /// false.
    pub async fn claim_fire(
        &self,
        schedule: &Schedule,
        scheduled_for: DateTime<Utc>,
    ) -> Result<bool, SchedulerError> {
        let key = format!(
            "{CLAIM_PREFIX}{}:{}:{}",
            schedule.workflow_id,
            schedule.trigger_id,
            scheduled_for.timestamp()
        );
        let claims = self.store.increment(&key, Some(CLAIM_TTL)).await?;
        Ok(claims == 1)
    }

    /// Records a fire against one trigger and advances its due time,
    /// anchored on the fire time.
    pub async fn record_fired(
        &self,
        workflow_id: WorkflowId,
        trigger_id: NodeId,
        fired_at: DateTime<Utc>,
        success: bool,
    ) -> Result<Schedule, SchedulerError> {
        let key = schedule_key(workflow_id, trigger_id);
        let mut schedule = self.load(&key).await?;

        let advanced = schedule.record_fired(fired_at, success);
        self.save(&schedule).await?;
        advanced.map(|()| schedule)
    }

    /// Enables or disables one trigger's schedule.
    pub async fn set_enabled(
        &self,
        workflow_id: WorkflowId,
        trigger_id: NodeId,
        enabled: bool,
    ) -> Result<Schedule, SchedulerError> {
        let key = schedule_key(workflow_id, trigger_id);
        let mut schedule = self.load(&key).await?;
        schedule.enabled = enabled;
        self.save(&schedule).await?;
        Ok(schedule)
    }

    /// Removes undecodable records and disabled schedules idle past
    /// the retention window. Returns how many records were removed.
    pub async fn cleanup(
        &self,
        now: DateTime<Utc>,
        retention: Duration,
    ) -> Result<usize, SchedulerError> {
        let retention = ChronoDuration::from_std(retention)
            .unwrap_or_else(|_| ChronoDuration::days(36500));
        let keys = self.store.keys_with_prefix(SCHEDULE_PREFIX).await?;

        let mut removed = 0;
        for key in keys {
            let Some(raw) = self.store.get(&key).await? else {
                continue;
            };
            let stale = match serde_json::from_str::<Schedule>(&raw) {
                Err(_) => true,
                Ok(schedule) => {
                    let idle_since = schedule.last_run.unwrap_or(schedule.created_at);
                    !schedule.enabled && idle_since + retention <= now
                }
            };
            if stale && self.store.remove(&key).await? {
                debug!(key = %key, "schedule record removed");
                removed += 1;
            }
        }
        Ok(removed)
    }

    async fn load(&self, key: &str) -> Result<Schedule, SchedulerError> {
        let raw = self
            .store
            .get(key)
            .await?
            .ok_or_else(|| SchedulerError::ScheduleNotFound {
                key: key.to_string(),
            })?;
        serde_json::from_str(&raw).map_err(|_| SchedulerError::ScheduleNotFound {
            key: key.to_string(),
        })
    }

    async fn save(&self, schedule: &Schedule) -> Result<(), SchedulerError> {
        let key = schedule_key(schedule.workflow_id, schedule.trigger_id);
        let raw = serde_json::to_string(schedule).map_err(|e| {
            SchedulerError::Store(crate::error::KvError::new(e.to_string()))
        })?;
        self.store.set(&key, raw).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryKeyValueStore;
    use chrono::TimeZone;
    use serde_json::json;
    use switchyard_workflow::NodeInstance;

    fn at(h: u32, mi: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 8, 26, h, mi, 0).unwrap()
    }

    fn manager() -> TriggerManager {
        TriggerManager::new(Arc::new(InMemoryKeyValueStore::new()))
    }

    fn trigger_instance(name: &str, config: serde_json::Value) -> NodeInstance {
        NodeInstance::new(
            SCHEDULE_TRIGGER,
            name,
            config.as_object().cloned().unwrap_or_default(),
        )
    }

    fn scheduled_workflow() -> WorkflowDefinition {
        let mut wf = WorkflowDefinition::new("Nightly");
        let trigger = wf.add_node(trigger_instance(
            "nightly",
            json!({"cron": "0 2 * * *", "timezone": "Europe/Berlin"}),
        ));
        let done = wf.add_node(NodeInstance::new("log_output", "done", Default::default()));
        wf.add_edge(trigger, done);
        wf
    }

    #[tokio::test]
    async fn sync_creates_a_record_per_trigger() {
        let manager = manager();
        let wf = scheduled_workflow();

        let created = manager.sync_workflow(&wf, at(1, 0)).await.unwrap();
        assert_eq!(created.len(), 1);
        assert_eq!(created[0].cron, "0 2 * * *");
        assert_eq!(created[0].timezone.as_deref(), Some("Europe/Berlin"));
        assert_eq!(created[0].next_run, Some(at(2, 0)));

        assert_eq!(manager.schedules().await.unwrap().len(), 1);

        // Syncing the same definition again leaves one record.
        manager.sync_workflow(&wf, at(1, 5)).await.unwrap();
        assert_eq!(manager.schedules().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn resync_is_a_full_replace() {
        let manager = manager();
        let mut wf = scheduled_workflow();
        manager.sync_workflow(&wf, at(1, 0)).await.unwrap();

        // Edit: swap the trigger for a different one.
        wf.nodes.retain(|n| n.node_type != SCHEDULE_TRIGGER);
        wf.edges.clear();
        wf.add_node(trigger_instance("hourly", json!({"cron": "0 * * * *"})));

        let created = manager.sync_workflow(&wf, at(1, 30)).await.unwrap();
        assert_eq!(created.len(), 1);

        let schedules = manager.schedules().await.unwrap();
        assert_eq!(schedules.len(), 1);
        assert_eq!(schedules[0].cron, "0 * * * *");
    }

    #[tokio::test]
    async fn bad_cron_on_one_trigger_spares_the_rest() {
        let manager = manager();
        let mut wf = WorkflowDefinition::new("Mixed");
        wf.add_node(trigger_instance("broken", json!({"cron": "every tuesday"})));
        wf.add_node(trigger_instance("fine", json!({"cron": "*/10 * * * *"})));

        let created = manager.sync_workflow(&wf, at(1, 0)).await.unwrap();
        assert_eq!(created.len(), 1);
        assert_eq!(created[0].cron, "*/10 * * * *");
    }

    #[tokio::test]
    async fn due_respects_enablement_and_time() {
        let manager = manager();
        let wf = scheduled_workflow();
        let created = manager.sync_workflow(&wf, at(1, 0)).await.unwrap();
        let schedule = &created[0];

        assert!(manager.due(at(1, 30)).await.unwrap().is_empty());
        assert_eq!(manager.due(at(2, 0)).await.unwrap().len(), 1);

        manager
            .set_enabled(schedule.workflow_id, schedule.trigger_id, false)
            .await
            .unwrap();
        assert!(manager.due(at(2, 0)).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn driver_surface_scopes_by_workflow_and_enablement() {
        let manager = manager();
        let first = scheduled_workflow();
        let mut second = WorkflowDefinition::new("Hourly");
        second.add_node(trigger_instance("hourly", json!({"cron": "0 * * * *"})));

        manager.sync_workflow(&first, at(1, 0)).await.unwrap();
        let created = manager.sync_workflow(&second, at(1, 0)).await.unwrap();

        assert_eq!(manager.active_schedules().await.unwrap().len(), 2);
        let scoped = manager.workflow_schedules(second.id).await.unwrap();
        assert_eq!(scoped.len(), 1);
        assert_eq!(scoped[0].cron, "0 * * * *");

        manager
            .set_enabled(second.id, created[0].trigger_id, false)
            .await
            .unwrap();
        assert_eq!(manager.active_schedules().await.unwrap().len(), 1);
        assert_eq!(manager.workflow_schedules(second.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn only_the_first_claim_wins() {
        let manager = manager();
        let wf = scheduled_workflow();
        let created = manager.sync_workflow(&wf, at(1, 0)).await.unwrap();

        let occurrence = at(2, 0);
        assert!(manager.claim_fire(&created[0], occurrence).await.unwrap());
        assert!(!manager.claim_fire(&created[0], occurrence).await.unwrap());

        // A different occurrence is a fresh claim.
        assert!(manager.claim_fire(&created[0], at(3, 0)).await.unwrap());
    }

    #[tokio::test]
    async fn record_fired_advances_from_the_fire_time() {
        let manager = manager();
        let wf = scheduled_workflow();
        let created = manager.sync_workflow(&wf, at(1, 0)).await.unwrap();
        let schedule = &created[0];

        let updated = manager
            .record_fired(schedule.workflow_id, schedule.trigger_id, at(2, 4), true)
            .await
            .unwrap();

        assert_eq!(updated.last_run, Some(at(2, 4)));
        assert_eq!(updated.runs, 1);
        assert_eq!(updated.successes, 1);
        // Daily at 02:00; fired late at 02:04, so the next run is
        // tomorrow, not a re-fire.
        assert_eq!(
            updated.next_run,
            Some(Utc.with_ymd_and_hms(2026, 8, 27, 2, 0, 0).unwrap())
        );
    }

    #[tokio::test]
    async fn cleanup_removes_stale_and_corrupt_records() {
        let store = Arc::new(InMemoryKeyValueStore::new());
        let manager = TriggerManager::new(store.clone());
        let wf = scheduled_workflow();
        let created = manager.sync_workflow(&wf, at(1, 0)).await.unwrap();
        let schedule = &created[0];

        store
            .set("schedule:corrupt", "not json".to_string())
            .await
            .unwrap();
        manager
            .set_enabled(schedule.workflow_id, schedule.trigger_id, false)
            .await
            .unwrap();

        let removed = manager
            .cleanup(at(1, 0) + ChronoDuration::days(30), Duration::from_secs(86400))
            .await
            .unwrap();

        assert_eq!(removed, 2);
        assert!(manager.schedules().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn missing_schedule_is_an_error() {
        let manager = manager();
        let result = manager
            .record_fired(WorkflowId::new(), NodeId::new(), at(1, 0), true)
            .await;
        assert!(matches!(result, Err(SchedulerError::ScheduleNotFound { .. })));
    }
}
