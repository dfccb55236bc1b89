/// Content report lifecycle
///
/// `pending` is the only non-terminal status. Resolving a report stamps
/// the reviewer and timestamp in the same statement that moves the
/// status, so `reviewed_by` is non-null exactly when the report has left
/// `pending`.
use crate::{
    admin::audit::{Audited, AuditRecorder},
    error::{AdminError, AdminResult},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

/// Reported content kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    Post,
    Message,
    User,
    Profile,
}

impl ContentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentType::Post => "post",
            ContentType::Message => "message",
            ContentType::User => "user",
            ContentType::Profile => "profile",
        }
    }

    pub fn from_str(s: &str) -> AdminResult<Self> {
        match s.to_lowercase().as_str() {
            "post" => Ok(ContentType::Post),
            "message" => Ok(ContentType::Message),
            "user" => Ok(ContentType::User),
            "profile" => Ok(ContentType::Profile),
            _ => Err(AdminError::Validation(format!(
                "Invalid content type: {}",
                s
            ))),
        }
    }
}

/// Report status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportStatus {
    Pending,
    Reviewed,
    ActionTaken,
    Dismissed,
}

impl ReportStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportStatus::Pending => "pending",
            ReportStatus::Reviewed => "reviewed",
            ReportStatus::ActionTaken => "action_taken",
            ReportStatus::Dismissed => "dismissed",
        }
    }

    pub fn from_str(s: &str) -> AdminResult<Self> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(ReportStatus::Pending),
            "reviewed" => Ok(ReportStatus::Reviewed),
            "action_taken" => Ok(ReportStatus::ActionTaken),
            "dismissed" => Ok(ReportStatus::Dismissed),
            _ => Err(AdminError::Validation(format!(
                "Invalid report status: {}",
                s
            ))),
        }
    }
}

/// Terminal outcome an admin can assign to a pending report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportResolution {
    Reviewed,
    ActionTaken,
    Dismissed,
}

impl ReportResolution {
    pub fn as_status(&self) -> ReportStatus {
        match self {
            ReportResolution::Reviewed => ReportStatus::Reviewed,
            ReportResolution::ActionTaken => ReportStatus::ActionTaken,
            ReportResolution::Dismissed => ReportStatus::Dismissed,
        }
    }
}

/// Report record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub id: String,
    /// None for anonymous reports
    pub reporter_id: Option<String>,
    pub content_type: ContentType,
    pub content_id: String,
    pub reason: String,
    pub description: Option<String>,
    pub status: ReportStatus,
    pub reviewed_by: Option<String>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub action_taken: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Report status breakdown for the stats block
#[derive(Debug, Clone, Serialize)]
pub struct ReportStats {
    pub total: i64,
    pub pending: i64,
    pub reviewed: i64,
    pub action_taken: i64,
    pub dismissed: i64,
}

/// Report manager
#[derive(Clone)]
pub struct ReportManager {
    db: SqlitePool,
    audit: AuditRecorder,
}

impl ReportManager {
    pub fn new(db: SqlitePool, audit: AuditRecorder) -> Self {
        Self { db, audit }
    }

    /// Submit a report against a piece of content
    pub async fn submit_report(
        &self,
        reporter_id: Option<&str>,
        content_type: ContentType,
        content_id: &str,
        reason: &str,
        description: Option<&str>,
    ) -> AdminResult<Report> {
        if content_id.is_empty() {
            return Err(AdminError::Validation(
                "content_id must not be empty".to_string(),
            ));
        }
        if reason.is_empty() {
            return Err(AdminError::Validation(
                "reason must not be empty".to_string(),
            ));
        }

        let id = Uuid::new_v4().to_string();
        let now = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO reports (id, reporter_id, content_type, content_id, reason, description, status, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, 'pending', ?7)
            "#,
        )
        .bind(&id)
        .bind(reporter_id)
        .bind(content_type.as_str())
        .bind(content_id)
        .bind(reason)
        .bind(description)
        .bind(now)
        .execute(&self.db)
        .await?;

        Ok(Report {
            id,
            reporter_id: reporter_id.map(String::from),
            content_type,
            content_id: content_id.to_string(),
            reason: reason.to_string(),
            description: description.map(String::from),
            status: ReportStatus::Pending,
            reviewed_by: None,
            reviewed_at: None,
            action_taken: None,
            created_at: now,
        })
    }

    /// Resolve a pending report. Status, reviewer, review time and remedy
    /// text move in one atomic statement; a report that already left
    /// `pending` is a conflict.
    pub async fn resolve(
        &self,
        report_id: &str,
        resolution: ReportResolution,
        action_taken: Option<&str>,
        admin_id: &str,
    ) -> AdminResult<Audited<Report>> {
        let before = self.fetch_required(report_id).await?;
        let now = Utc::now();
        let status = resolution.as_status();

        let result = sqlx::query(
            r#"
            UPDATE reports
            SET status = ?2, reviewed_by = ?3, reviewed_at = ?4, action_taken = ?5
            WHERE id = ?1 AND status = 'pending'
            "#,
        )
        .bind(report_id)
        .bind(status.as_str())
        .bind(admin_id)
        .bind(now)
        .bind(action_taken)
        .execute(&self.db)
        .await?;

        if result.rows_affected() == 0 {
            return match self.get_report(report_id).await? {
                None => Err(AdminError::NotFound(format!(
                    "Report {} not found",
                    report_id
                ))),
                Some(report) => Err(AdminError::Conflict(format!(
                    "Report already {}",
                    report.status.as_str()
                ))),
            };
        }

        let updated = self.fetch_required(report_id).await?;

        let audit_recorded = self
            .audit
            .record_or_warn(
                Some(admin_id),
                "report.resolve",
                "report",
                report_id,
                &json!({ "status": before.status, "action_taken": before.action_taken }),
                &json!({ "status": updated.status, "action_taken": updated.action_taken }),
            )
            .await;

        Ok(Audited {
            entity: updated,
            audit_recorded,
        })
    }

    /// Get report by id
    pub async fn get_report(&self, report_id: &str) -> AdminResult<Option<Report>> {
        let row = sqlx::query("SELECT * FROM reports WHERE id = ?1")
            .bind(report_id)
            .fetch_optional(&self.db)
            .await?;

        row.map(Self::parse_report).transpose()
    }

    /// List reports with optional status filter, newest first
    pub async fn list(
        &self,
        status: Option<ReportStatus>,
        limit: i64,
    ) -> AdminResult<Vec<Report>> {
        let rows = if let Some(status) = status {
            sqlx::query("SELECT * FROM reports WHERE status = ?1 ORDER BY created_at DESC LIMIT ?2")
                .bind(status.as_str())
                .bind(limit)
                .fetch_all(&self.db)
                .await?
        } else {
            sqlx::query("SELECT * FROM reports ORDER BY created_at DESC LIMIT ?1")
                .bind(limit)
                .fetch_all(&self.db)
                .await?
        };

        rows.into_iter().map(Self::parse_report).collect()
    }

    /// Status breakdown for the stats block
    pub async fn stats(&self) -> AdminResult<ReportStats> {
        let row = sqlx::query(
            r#"
            SELECT
                COUNT(*) AS total,
                COALESCE(SUM(CASE WHEN status = 'pending' THEN 1 ELSE 0 END), 0) AS pending,
                COALESCE(SUM(CASE WHEN status = 'reviewed' THEN 1 ELSE 0 END), 0) AS reviewed,
                COALESCE(SUM(CASE WHEN status = 'action_taken' THEN 1 ELSE 0 END), 0) AS action_taken,
                COALESCE(SUM(CASE WHEN status = 'dismissed' THEN 1 ELSE 0 END), 0) AS dismissed
            FROM reports
            "#,
        )
        .fetch_one(&self.db)
        .await?;

        Ok(ReportStats {
            total: row.get("total"),
            pending: row.get("pending"),
            reviewed: row.get("reviewed"),
            action_taken: row.get("action_taken"),
            dismissed: row.get("dismissed"),
        })
    }

    fn parse_report(row: sqlx::sqlite::SqliteRow) -> AdminResult<Report> {
        let content_type_str: String = row.get("content_type");
        let content_type = ContentType::from_str(&content_type_str)?;

        let status_str: String = row.get("status");
        let status = ReportStatus::from_str(&status_str)?;

        Ok(Report {
            id: row.get("id"),
            reporter_id: row.get("reporter_id"),
            content_type,
            content_id: row.get("content_id"),
            reason: row.get("reason"),
            description: row.get("description"),
            status,
            reviewed_by: row.get("reviewed_by"),
            reviewed_at: row.get("reviewed_at"),
            action_taken: row.get("action_taken"),
            created_at: row.get("created_at"),
        })
    }

    async fn fetch_required(&self, report_id: &str) -> AdminResult<Report> {
        self.get_report(report_id)
            .await?
            .ok_or_else(|| AdminError::NotFound(format!("Report {} not found", report_id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_pool() -> SqlitePool {
        let pool = sqlx::sqlite::SqlitePoolOptions::new()
            .max_connections(1)
            .connect(":memory:")
            .await
            .unwrap();
        crate::db::run_migrations(&pool).await.unwrap();
        pool
    }

    fn manager(pool: &SqlitePool) -> ReportManager {
        ReportManager::new(pool.clone(), AuditRecorder::new(pool.clone()))
    }

    #[test]
    fn test_content_type_from_str() {
        assert_eq!(ContentType::from_str("post").unwrap(), ContentType::Post);
        assert_eq!(
            ContentType::from_str("PROFILE").unwrap(),
            ContentType::Profile
        );
        assert!(ContentType::from_str("video").is_err());
    }

    #[test]
    fn test_status_from_str() {
        assert_eq!(
            ReportStatus::from_str("action_taken").unwrap(),
            ReportStatus::ActionTaken
        );
        assert!(ReportStatus::from_str("open").is_err());
    }

    #[tokio::test]
    async fn test_submit_and_resolve() {
        let pool = test_pool().await;
        let manager = manager(&pool);

        let report = manager
            .submit_report(None, ContentType::Post, "post-1", "spam", Some("Spam post"))
            .await
            .unwrap();
        assert_eq!(report.status, ReportStatus::Pending);
        assert!(report.reviewed_by.is_none());
        assert!(report.reviewed_at.is_none());

        let resolved = manager
            .resolve(
                &report.id,
                ReportResolution::ActionTaken,
                Some("Content removed"),
                "admin-1",
            )
            .await
            .unwrap();
        assert!(resolved.audit_recorded);
        assert_eq!(resolved.entity.status, ReportStatus::ActionTaken);
        assert_eq!(resolved.entity.reviewed_by.as_deref(), Some("admin-1"));
        assert!(resolved.entity.reviewed_at.is_some());
        assert_eq!(resolved.entity.action_taken.as_deref(), Some("Content removed"));
    }

    #[tokio::test]
    async fn test_resolve_terminal_is_conflict() {
        let pool = test_pool().await;
        let manager = manager(&pool);
        let audit = AuditRecorder::new(pool.clone());

        let report = manager
            .submit_report(Some("user-9"), ContentType::User, "user-2", "harassment", None)
            .await
            .unwrap();

        manager
            .resolve(&report.id, ReportResolution::Dismissed, None, "admin-1")
            .await
            .unwrap();

        let before = audit.count().await.unwrap();

        let err = manager
            .resolve(&report.id, ReportResolution::Reviewed, None, "admin-2")
            .await
            .unwrap_err();
        assert!(matches!(err, AdminError::Conflict(_)));

        // First resolution stands, nothing new in the trail
        let current = manager.get_report(&report.id).await.unwrap().unwrap();
        assert_eq!(current.status, ReportStatus::Dismissed);
        assert_eq!(current.reviewed_by.as_deref(), Some("admin-1"));
        assert_eq!(audit.count().await.unwrap(), before);
    }

    #[tokio::test]
    async fn test_submit_rejects_empty_fields() {
        let pool = test_pool().await;
        let manager = manager(&pool);

        let err = manager
            .submit_report(None, ContentType::Post, "", "spam", None)
            .await
            .unwrap_err();
        assert!(matches!(err, AdminError::Validation(_)));

        let err = manager
            .submit_report(None, ContentType::Post, "post-1", "", None)
            .await
            .unwrap_err();
        assert!(matches!(err, AdminError::Validation(_)));
    }

    #[tokio::test]
    async fn test_list_filtered_by_status() {
        let pool = test_pool().await;
        let manager = manager(&pool);

        let a = manager
            .submit_report(None, ContentType::Post, "post-1", "spam", None)
            .await
            .unwrap();
        manager
            .submit_report(None, ContentType::Message, "msg-1", "rude", None)
            .await
            .unwrap();
        manager
            .resolve(&a.id, ReportResolution::Reviewed, None, "admin-1")
            .await
            .unwrap();

        let pending = manager.list(Some(ReportStatus::Pending), 50).await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].content_id, "msg-1");

        let all = manager.list(None, 50).await.unwrap();
        assert_eq!(all.len(), 2);

        let stats = manager.stats().await.unwrap();
        assert_eq!(stats.total, 2);
        assert_eq!(stats.pending, 1);
        assert_eq!(stats.reviewed, 1);
    }
}
