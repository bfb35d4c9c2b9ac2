//! # Activity Log & Notification Repository
//!
//! Store-and-forward: workflows append audit entries and per-administrator
//! notification rows; an external transport (out of scope here) drains them.

use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbResult;
use meridian_core::{ActivityEntry, Notification};

/// Repository for the activity log and notifications.
#[derive(Debug, Clone)]
pub struct ActivityRepository {
    pool: SqlitePool,
}

impl ActivityRepository {
    /// Creates a new ActivityRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ActivityRepository { pool }
    }

    /// Appends an activity log entry.
    ///
    /// `INSERT OR IGNORE`: callers that retry (the commit-step machinery)
    /// pass deterministic ids, so a replay is a no-op instead of a duplicate.
    pub async fn log(&self, entry: &ActivityEntry) -> DbResult<()> {
        debug!(action = %entry.action, entity_id = %entry.entity_id, "Activity log");

        sqlx::query(
            "INSERT OR IGNORE INTO activity_log (
                id, branch_id, employee_id, action, entity_type, entity_id,
                details, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        )
        .bind(&entry.id)
        .bind(&entry.branch_id)
        .bind(&entry.employee_id)
        .bind(&entry.action)
        .bind(&entry.entity_type)
        .bind(&entry.entity_id)
        .bind(&entry.details)
        .bind(entry.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Appends a notification row for one recipient.
    ///
    /// `INSERT OR IGNORE` for the same replay-safety as `log`.
    pub async fn insert_notification(&self, notification: &Notification) -> DbResult<()> {
        sqlx::query(
            "INSERT OR IGNORE INTO notifications (
                id, recipient_id, branch_id, event, payload, created_at, read_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        )
        .bind(&notification.id)
        .bind(&notification.recipient_id)
        .bind(&notification.branch_id)
        .bind(notification.event)
        .bind(&notification.payload)
        .bind(notification.created_at)
        .bind(notification.read_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Unread notifications for a recipient, newest first.
    pub async fn unread_for(&self, recipient_id: &str) -> DbResult<Vec<Notification>> {
        let notifications = sqlx::query_as::<_, Notification>(
            "SELECT id, recipient_id, branch_id, event, payload, created_at, read_at
             FROM notifications
             WHERE recipient_id = ?1 AND read_at IS NULL
             ORDER BY created_at DESC",
        )
        .bind(recipient_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(notifications)
    }
}
