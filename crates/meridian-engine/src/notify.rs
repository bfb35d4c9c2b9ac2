//! # Notification Fan-out
//!
//! Pushes role-scoped events to the administrators of a branch as stored
//! notification rows. Delivery transport (push, email, whatever the
//! deployment wires up) drains them externally and is out of scope.
//!
//! Fan-out is best-effort from the caller's point of view: a committed sale
//! or a closed shift never fails because a notification insert did.

use serde_json::Value;
use tracing::warn;
use uuid::Uuid;

use crate::error::EngineResult;
use meridian_core::{Notification, NotificationEvent};
use meridian_db::Database;

/// Fans events out to branch administrators.
#[derive(Clone)]
pub struct Notifier {
    db: Database,
}

impl Notifier {
    /// Creates a new Notifier.
    pub fn new(db: Database) -> Self {
        Notifier { db }
    }

    /// Writes one notification row per active branch administrator.
    ///
    /// `dedupe_key`, when given, makes the fan-out replay-safe: the row id
    /// becomes `<key>:<recipient>` and a retried insert is ignored. The
    /// commit-step machinery passes the sale id here.
    ///
    /// ## Returns
    /// The number of administrators targeted.
    pub async fn fan_out(
        &self,
        branch_id: &str,
        event: NotificationEvent,
        payload: &Value,
        dedupe_key: Option<&str>,
    ) -> EngineResult<usize> {
        let admins = self.db.employees().admins_for_branch(branch_id).await?;
        let payload = payload.to_string();
        let now = chrono::Utc::now();

        for admin in &admins {
            let id = match dedupe_key {
                Some(key) => format!("{key}:{}", admin.id),
                None => Uuid::new_v4().to_string(),
            };

            self.db
                .activity()
                .insert_notification(&Notification {
                    id,
                    recipient_id: admin.id.clone(),
                    branch_id: branch_id.to_string(),
                    event,
                    payload: payload.clone(),
                    created_at: now,
                    read_at: None,
                })
                .await?;
        }

        Ok(admins.len())
    }

    /// Fan-out variant for callers where notification failure must never
    /// propagate (shift and return flows): errors are logged and swallowed.
    pub async fn fan_out_best_effort(
        &self,
        branch_id: &str,
        event: NotificationEvent,
        payload: &Value,
    ) {
        if let Err(e) = self.fan_out(branch_id, event, payload, None).await {
            warn!(branch_id = %branch_id, event = ?event, error = %e, "Notification fan-out failed");
        }
    }
}
