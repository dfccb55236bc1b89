/// Admin and moderation workflows
///
/// Lifecycle engines for the three mutable entities an admin acts on
/// (waitlist entries, content reports, user trust flags) plus the audit
/// trail every mutation feeds.

pub mod audit;
pub mod reports;
pub mod users;
pub mod waitlist;

pub use audit::{AuditLogEntry, AuditRecorder, Audited};
pub use reports::{ContentType, Report, ReportManager, ReportResolution, ReportStats, ReportStatus};
pub use users::{UserDetail, UserManager};
pub use waitlist::{WaitlistEntry, WaitlistManager, WaitlistStats, WaitlistStatus};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::resolve_admin;
    use crate::config::{
        AdminConfig, AuthConfig, LoggingConfig, RateLimitSettings, ServiceConfig, StorageConfig,
    };
    use crate::error::AdminError;
    use crate::session::SessionManager;
    use chrono::Utc;
    use sqlx::SqlitePool;
    use std::sync::Arc;
    use uuid::Uuid;

    fn test_config() -> Arc<AdminConfig> {
        Arc::new(AdminConfig {
            service: ServiceConfig {
                hostname: "localhost".to_string(),
                port: 8700,
                public_url: "http://localhost:8700".to_string(),
            },
            storage: StorageConfig {
                data_directory: "./data".into(),
                database: "./data/admin.sqlite".into(),
            },
            auth: AuthConfig {
                jwt_secret: "test-secret-test-secret-test-secret!".to_string(),
                session_ttl_minutes: 60,
            },
            email: None,
            rate_limit: RateLimitSettings { enabled: false },
            logging: LoggingConfig {
                level: "info".to_string(),
            },
        })
    }

    async fn test_pool() -> SqlitePool {
        let pool = sqlx::sqlite::SqlitePoolOptions::new()
            .max_connections(1)
            .connect(":memory:")
            .await
            .unwrap();
        crate::db::run_migrations(&pool).await.unwrap();
        pool
    }

    async fn insert_user(pool: &SqlitePool, phone: &str, is_admin: bool) -> String {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now();
        sqlx::query(
            "INSERT INTO users (id, phone, password_hash, is_admin, is_banned, created_at, updated_at)
             VALUES (?1, ?2, 'x', ?3, 0, ?4, ?4)",
        )
        .bind(&id)
        .bind(phone)
        .bind(is_admin)
        .bind(now)
        .execute(pool)
        .await
        .unwrap();
        id
    }

    /// A non-admin identity reaching for a protected action: the gate
    /// denies, and both entity state and audit log are untouched.
    #[tokio::test]
    async fn test_denied_request_changes_nothing() {
        let pool = test_pool().await;
        let non_admin = insert_user(&pool, "+15550300", false).await;

        let audit = AuditRecorder::new(pool.clone());
        let sessions = SessionManager::new(pool.clone(), test_config());
        let users = UserManager::new(pool.clone(), audit.clone());
        let reports = ReportManager::new(pool.clone(), audit.clone());

        let report = reports
            .submit_report(None, ContentType::Post, "post-1", "spam", None)
            .await
            .unwrap();
        let audit_before = audit.count().await.unwrap();

        let session = sessions.create_session(&non_admin).await.unwrap();
        let err = resolve_admin(&sessions, &users, &session.access_token)
            .await
            .unwrap_err();
        assert!(matches!(err, AdminError::Authorization(_)));

        // No handler ran: report still pending, audit log unchanged
        let current = reports.get_report(&report.id).await.unwrap().unwrap();
        assert_eq!(current.status, ReportStatus::Pending);
        assert!(current.reviewed_by.is_none());
        assert_eq!(audit.count().await.unwrap(), audit_before);
    }

    /// Full workflow through the gate: invite a signup, resolve a report,
    /// toggle a ban; each step leaves exactly one audit entry.
    #[tokio::test]
    async fn test_admin_workflow_end_to_end() {
        let pool = test_pool().await;
        let admin_id = insert_user(&pool, "+15550301", true).await;
        let member_id = insert_user(&pool, "+15550302", false).await;

        let audit = AuditRecorder::new(pool.clone());
        let sessions = SessionManager::new(pool.clone(), test_config());
        let users = UserManager::new(pool.clone(), audit.clone());
        let waitlist = WaitlistManager::new(pool.clone(), audit.clone());
        let reports = ReportManager::new(pool.clone(), audit.clone());

        let session = sessions.create_session(&admin_id).await.unwrap();
        let gate = resolve_admin(&sessions, &users, &session.access_token)
            .await
            .unwrap();
        assert_eq!(gate.user_id, admin_id);

        // Waitlist: invite a fresh signup
        let entry = waitlist
            .submit(Some("new@example.com".to_string()), None, None, None)
            .await
            .unwrap();
        let invited = waitlist.invite(&entry.id, &gate.user_id).await.unwrap();
        assert_eq!(invited.entity.status, WaitlistStatus::Invited);
        assert!(invited.audit_recorded);

        // Reports: resolve with a remedy
        let report = reports
            .submit_report(
                Some(&member_id),
                ContentType::Message,
                "msg-7",
                "harassment",
                Some("threatening DM"),
            )
            .await
            .unwrap();
        let resolved = reports
            .resolve(
                &report.id,
                ReportResolution::ActionTaken,
                Some("Content removed"),
                &gate.user_id,
            )
            .await
            .unwrap();
        assert_eq!(resolved.entity.reviewed_by.as_deref(), Some(admin_id.as_str()));

        // Users: ban the offender
        let banned = users.toggle_ban(&member_id, &gate.user_id).await.unwrap();
        assert!(banned.entity.is_banned);

        // One audit entry per transition, newest first
        let entries = audit.list(10, 0).await.unwrap();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].action, "user.ban");
        assert_eq!(entries[1].action, "report.resolve");
        assert_eq!(entries[2].action, "waitlist.invite");
        assert!(entries
            .iter()
            .all(|e| e.admin_id.as_deref() == Some(admin_id.as_str())));
    }
}
