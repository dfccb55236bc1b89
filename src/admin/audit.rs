/// Admin action audit trail
///
/// Append-only: entries are written once and never updated or deleted.
/// Every successful lifecycle transition produces exactly one entry; an
/// append failure is surfaced as a degraded-success flag on the action
/// result, never by rolling the mutation back.
use crate::error::{AdminError, AdminResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::{Row, SqlitePool};

/// Audit log entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditLogEntry {
    pub id: i64,
    /// None denotes a system-initiated action
    pub admin_id: Option<String>,
    /// Verb+entity tag, e.g. "user.ban"
    pub action: String,
    pub entity_type: String,
    pub entity_id: String,
    pub old_values: Value,
    pub new_values: Value,
    pub created_at: DateTime<Utc>,
}

/// Result of a mutating admin action: the updated entity plus whether its
/// audit entry landed. `audit_recorded = false` means the mutation itself
/// succeeded but the trail is incomplete.
#[derive(Debug, Clone)]
pub struct Audited<T> {
    pub entity: T,
    pub audit_recorded: bool,
}

/// Audit recorder
#[derive(Clone)]
pub struct AuditRecorder {
    db: SqlitePool,
}

impl AuditRecorder {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Append one audit entry
    pub async fn record(
        &self,
        admin_id: Option<&str>,
        action: &str,
        entity_type: &str,
        entity_id: &str,
        old_values: &Value,
        new_values: &Value,
    ) -> AdminResult<()> {
        let now = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO audit_log (admin_id, action, entity_type, entity_id, old_values, new_values, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(admin_id)
        .bind(action)
        .bind(entity_type)
        .bind(entity_id)
        .bind(old_values.to_string())
        .bind(new_values.to_string())
        .bind(now)
        .execute(&self.db)
        .await
        .map_err(|e| AdminError::AuditWrite(e.to_string()))?;

        Ok(())
    }

    /// Record an entry for an entity that was just mutated, reporting the
    /// outcome as a flag rather than an error.
    pub async fn record_or_warn(
        &self,
        admin_id: Option<&str>,
        action: &str,
        entity_type: &str,
        entity_id: &str,
        old_values: &Value,
        new_values: &Value,
    ) -> bool {
        match self
            .record(admin_id, action, entity_type, entity_id, old_values, new_values)
            .await
        {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(
                    action,
                    entity_type,
                    entity_id,
                    error = %e,
                    "audit append failed after successful mutation"
                );
                false
            }
        }
    }

    /// List recent entries, newest first
    pub async fn list(&self, limit: i64, offset: i64) -> AdminResult<Vec<AuditLogEntry>> {
        let rows = sqlx::query(
            r#"
            SELECT id, admin_id, action, entity_type, entity_id, old_values, new_values, created_at
            FROM audit_log
            ORDER BY id DESC
            LIMIT ?1 OFFSET ?2
            "#,
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.db)
        .await?;

        let mut entries = Vec::with_capacity(rows.len());
        for row in rows {
            entries.push(Self::parse_entry(row)?);
        }

        Ok(entries)
    }

    /// Count all entries
    pub async fn count(&self) -> AdminResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM audit_log")
            .fetch_one(&self.db)
            .await?;
        Ok(count)
    }

    fn parse_entry(row: sqlx::sqlite::SqliteRow) -> AdminResult<AuditLogEntry> {
        let old_values_str: String = row.get("old_values");
        let new_values_str: String = row.get("new_values");

        let old_values = serde_json::from_str(&old_values_str)
            .map_err(|e| AdminError::Internal(format!("Invalid audit snapshot: {}", e)))?;
        let new_values = serde_json::from_str(&new_values_str)
            .map_err(|e| AdminError::Internal(format!("Invalid audit snapshot: {}", e)))?;

        Ok(AuditLogEntry {
            id: row.get("id"),
            admin_id: row.get("admin_id"),
            action: row.get("action"),
            entity_type: row.get("entity_type"),
            entity_id: row.get("entity_id"),
            old_values,
            new_values,
            created_at: row.get("created_at"),
        })
    }
}
