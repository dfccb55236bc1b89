/// Waitlist lifecycle and invite issuance
///
/// Status machine: pending -> invited | declined, invited -> registered.
/// `registered` and `declined` are terminal. The invite code is generated
/// and attached in the same statement that moves the entry to `invited`,
/// so no observer can ever see one without the other.
use crate::{
    admin::audit::{Audited, AuditRecorder},
    error::{AdminError, AdminResult},
};
use chrono::{DateTime, Utc};
use rand::{distributions::Alphanumeric, Rng};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

/// Invite codes are 12 lowercase alphanumeric characters
const INVITE_CODE_LEN: usize = 12;

/// Waitlist entry status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WaitlistStatus {
    Pending,
    Invited,
    Registered,
    Declined,
}

impl WaitlistStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            WaitlistStatus::Pending => "pending",
            WaitlistStatus::Invited => "invited",
            WaitlistStatus::Registered => "registered",
            WaitlistStatus::Declined => "declined",
        }
    }

    pub fn from_str(s: &str) -> AdminResult<Self> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(WaitlistStatus::Pending),
            "invited" => Ok(WaitlistStatus::Invited),
            "registered" => Ok(WaitlistStatus::Registered),
            "declined" => Ok(WaitlistStatus::Declined),
            _ => Err(AdminError::Validation(format!(
                "Invalid waitlist status: {}",
                s
            ))),
        }
    }
}

/// Waitlist entry record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WaitlistEntry {
    pub id: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub status: WaitlistStatus,
    pub source: String,
    pub invite_code: Option<String>,
    pub invited_at: Option<DateTime<Utc>>,
    pub registered_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Waitlist status breakdown for the stats block
#[derive(Debug, Clone, Serialize)]
pub struct WaitlistStats {
    pub total: i64,
    pub pending: i64,
    pub invited: i64,
    pub registered: i64,
    pub declined: i64,
}

/// Waitlist manager
#[derive(Clone)]
pub struct WaitlistManager {
    db: SqlitePool,
    audit: AuditRecorder,
}

impl WaitlistManager {
    pub fn new(db: SqlitePool, audit: AuditRecorder) -> Self {
        Self { db, audit }
    }

    /// Generate an invite code
    pub fn generate_code() -> String {
        rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(INVITE_CODE_LEN)
            .map(char::from)
            .collect::<String>()
            .to_lowercase()
    }

    /// Create a pending signup. At least one of email/phone is required;
    /// rejected before touching the store otherwise.
    pub async fn submit(
        &self,
        email: Option<String>,
        phone: Option<String>,
        source: Option<String>,
        notes: Option<String>,
    ) -> AdminResult<WaitlistEntry> {
        if email.is_none() && phone.is_none() {
            return Err(AdminError::Validation(
                "Must provide either email or phone".to_string(),
            ));
        }

        let id = Uuid::new_v4().to_string();
        let now = Utc::now();
        let source = source.unwrap_or_else(|| "web".to_string());

        sqlx::query(
            r#"
            INSERT INTO waitlist (id, email, phone, status, source, notes, created_at, updated_at)
            VALUES (?1, ?2, ?3, 'pending', ?4, ?5, ?6, ?6)
            "#,
        )
        .bind(&id)
        .bind(&email)
        .bind(&phone)
        .bind(&source)
        .bind(&notes)
        .bind(now)
        .execute(&self.db)
        .await?;

        Ok(WaitlistEntry {
            id,
            email,
            phone,
            status: WaitlistStatus::Pending,
            source,
            invite_code: None,
            invited_at: None,
            registered_at: None,
            notes,
            created_at: now,
            updated_at: now,
        })
    }

    /// Issue an invite: generate a unique code and move the entry from
    /// `pending` to `invited` in one atomic statement. Of two concurrent
    /// invites for the same entry, exactly one wins; the loser gets a
    /// conflict because the entry is no longer pending.
    pub async fn invite(&self, entry_id: &str, admin_id: &str) -> AdminResult<Audited<WaitlistEntry>> {
        let before = self.fetch_required(entry_id).await?;
        let code = Self::generate_code();
        let now = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE waitlist
            SET status = 'invited', invite_code = ?2, invited_at = ?3, updated_at = ?3
            WHERE id = ?1 AND status = 'pending'
            "#,
        )
        .bind(entry_id)
        .bind(&code)
        .bind(now)
        .execute(&self.db)
        .await?;

        if result.rows_affected() == 0 {
            return Err(self.transition_conflict(entry_id).await?);
        }

        let updated = self.fetch_required(entry_id).await?;

        let audit_recorded = self
            .audit
            .record_or_warn(
                Some(admin_id),
                "waitlist.invite",
                "waitlist",
                entry_id,
                &json!({ "status": before.status, "invite_code": before.invite_code }),
                &json!({ "status": updated.status, "invite_code": updated.invite_code }),
            )
            .await;

        Ok(Audited {
            entity: updated,
            audit_recorded,
        })
    }

    /// Decline a pending entry. `declined` is terminal; declining an entry
    /// in any other state is a conflict, never a silent no-op.
    pub async fn decline(&self, entry_id: &str, admin_id: &str) -> AdminResult<Audited<WaitlistEntry>> {
        let before = self.fetch_required(entry_id).await?;
        let now = Utc::now();

        let result = sqlx::query(
            "UPDATE waitlist SET status = 'declined', updated_at = ?2 WHERE id = ?1 AND status = 'pending'",
        )
        .bind(entry_id)
        .bind(now)
        .execute(&self.db)
        .await?;

        if result.rows_affected() == 0 {
            return Err(self.transition_conflict(entry_id).await?);
        }

        let updated = self.fetch_required(entry_id).await?;

        let audit_recorded = self
            .audit
            .record_or_warn(
                Some(admin_id),
                "waitlist.decline",
                "waitlist",
                entry_id,
                &json!({ "status": before.status }),
                &json!({ "status": updated.status }),
            )
            .await;

        Ok(Audited {
            entity: updated,
            audit_recorded,
        })
    }

    /// Redeem an invite code during signup: `invited` -> `registered`.
    /// System-initiated, so the audit entry carries no admin id.
    pub async fn redeem(&self, code: &str) -> AdminResult<Audited<WaitlistEntry>> {
        let now = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE waitlist
            SET status = 'registered', registered_at = ?2, updated_at = ?2
            WHERE invite_code = ?1 AND status = 'invited'
            "#,
        )
        .bind(code)
        .bind(now)
        .execute(&self.db)
        .await?;

        if result.rows_affected() == 0 {
            return match self.get_by_code(code).await? {
                None => Err(AdminError::NotFound("Invite code not found".to_string())),
                Some(entry) => Err(AdminError::Conflict(format!(
                    "Invite code already {}",
                    entry.status.as_str()
                ))),
            };
        }

        let updated = self
            .get_by_code(code)
            .await?
            .ok_or_else(|| AdminError::Internal("Redeemed entry disappeared".to_string()))?;

        let audit_recorded = self
            .audit
            .record_or_warn(
                None,
                "waitlist.register",
                "waitlist",
                &updated.id,
                &json!({ "status": WaitlistStatus::Invited }),
                &json!({ "status": updated.status }),
            )
            .await;

        Ok(Audited {
            entity: updated,
            audit_recorded,
        })
    }

    /// Get an entry by id
    pub async fn get_entry(&self, entry_id: &str) -> AdminResult<Option<WaitlistEntry>> {
        let row = sqlx::query("SELECT * FROM waitlist WHERE id = ?1")
            .bind(entry_id)
            .fetch_optional(&self.db)
            .await?;

        row.map(Self::parse_entry).transpose()
    }

    /// Get an entry by invite code
    pub async fn get_by_code(&self, code: &str) -> AdminResult<Option<WaitlistEntry>> {
        let row = sqlx::query("SELECT * FROM waitlist WHERE invite_code = ?1")
            .bind(code)
            .fetch_optional(&self.db)
            .await?;

        row.map(Self::parse_entry).transpose()
    }

    /// List entries with optional status filter, newest first
    pub async fn list(
        &self,
        status: Option<WaitlistStatus>,
        limit: i64,
    ) -> AdminResult<Vec<WaitlistEntry>> {
        let rows = if let Some(status) = status {
            sqlx::query(
                "SELECT * FROM waitlist WHERE status = ?1 ORDER BY created_at DESC LIMIT ?2",
            )
            .bind(status.as_str())
            .bind(limit)
            .fetch_all(&self.db)
            .await?
        } else {
            sqlx::query("SELECT * FROM waitlist ORDER BY created_at DESC LIMIT ?1")
                .bind(limit)
                .fetch_all(&self.db)
                .await?
        };

        rows.into_iter().map(Self::parse_entry).collect()
    }

    /// Status breakdown for the stats block
    pub async fn stats(&self) -> AdminResult<WaitlistStats> {
        let row = sqlx::query(
            r#"
            SELECT
                COUNT(*) AS total,
                COALESCE(SUM(CASE WHEN status = 'pending' THEN 1 ELSE 0 END), 0) AS pending,
                COALESCE(SUM(CASE WHEN status = 'invited' THEN 1 ELSE 0 END), 0) AS invited,
                COALESCE(SUM(CASE WHEN status = 'registered' THEN 1 ELSE 0 END), 0) AS registered,
                COALESCE(SUM(CASE WHEN status = 'declined' THEN 1 ELSE 0 END), 0) AS declined
            FROM waitlist
            "#,
        )
        .fetch_one(&self.db)
        .await?;

        Ok(WaitlistStats {
            total: row.get("total"),
            pending: row.get("pending"),
            invited: row.get("invited"),
            registered: row.get("registered"),
            declined: row.get("declined"),
        })
    }

    fn parse_entry(row: sqlx::sqlite::SqliteRow) -> AdminResult<WaitlistEntry> {
        let status_str: String = row.get("status");
        let status = WaitlistStatus::from_str(&status_str)?;

        Ok(WaitlistEntry {
            id: row.get("id"),
            email: row.get("email"),
            phone: row.get("phone"),
            status,
            source: row.get("source"),
            invite_code: row.get("invite_code"),
            invited_at: row.get("invited_at"),
            registered_at: row.get("registered_at"),
            notes: row.get("notes"),
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
        })
    }

    async fn fetch_required(&self, entry_id: &str) -> AdminResult<WaitlistEntry> {
        self.get_entry(entry_id)
            .await?
            .ok_or_else(|| AdminError::NotFound(format!("Waitlist entry {} not found", entry_id)))
    }

    /// A transition CAS matched zero rows. One fetch disambiguates a
    /// missing row from one that already left `pending`.
    async fn transition_conflict(&self, entry_id: &str) -> AdminResult<AdminError> {
        Ok(match self.get_entry(entry_id).await? {
            None => AdminError::NotFound(format!("Waitlist entry {} not found", entry_id)),
            Some(entry) => AdminError::Conflict(format!(
                "Waitlist entry is already {}",
                entry.status.as_str()
            )),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    async fn test_pool() -> SqlitePool {
        let pool = sqlx::sqlite::SqlitePoolOptions::new()
            .max_connections(1)
            .connect(":memory:")
            .await
            .unwrap();
        crate::db::run_migrations(&pool).await.unwrap();
        pool
    }

    fn manager(pool: &SqlitePool) -> WaitlistManager {
        WaitlistManager::new(pool.clone(), AuditRecorder::new(pool.clone()))
    }

    #[test]
    fn test_generate_code_shape() {
        let code = WaitlistManager::generate_code();
        assert_eq!(code.len(), 12);
        assert!(code.chars().all(|c| c.is_ascii_alphanumeric()));
        assert!(code.chars().all(|c| !c.is_uppercase()));
    }

    #[test]
    fn test_generated_codes_are_unique() {
        let mut codes = HashSet::new();
        for _ in 0..100 {
            codes.insert(WaitlistManager::generate_code());
        }
        assert_eq!(codes.len(), 100);
    }

    #[test]
    fn test_status_from_str() {
        assert_eq!(
            WaitlistStatus::from_str("pending").unwrap(),
            WaitlistStatus::Pending
        );
        assert_eq!(
            WaitlistStatus::from_str("REGISTERED").unwrap(),
            WaitlistStatus::Registered
        );
        assert!(WaitlistStatus::from_str("nope").is_err());
    }

    #[tokio::test]
    async fn test_submit_requires_contact() {
        let pool = test_pool().await;
        let manager = manager(&pool);

        let err = manager.submit(None, None, None, None).await.unwrap_err();
        assert!(matches!(err, AdminError::Validation(_)));

        // Store untouched
        let stats = manager.stats().await.unwrap();
        assert_eq!(stats.total, 0);
    }

    #[tokio::test]
    async fn test_invite_flow_and_conflict() {
        let pool = test_pool().await;
        let manager = manager(&pool);

        let entry = manager
            .submit(Some("a@example.com".to_string()), None, None, None)
            .await
            .unwrap();
        assert_eq!(entry.status, WaitlistStatus::Pending);
        assert!(entry.invite_code.is_none());

        let invited = manager.invite(&entry.id, "admin-1").await.unwrap();
        assert_eq!(invited.entity.status, WaitlistStatus::Invited);
        let code = invited.entity.invite_code.clone().unwrap();
        assert_eq!(code.len(), 12);
        assert!(invited.entity.invited_at.is_some());

        // Second invite on the same entry conflicts
        let err = manager.invite(&entry.id, "admin-1").await.unwrap_err();
        assert!(matches!(err, AdminError::Conflict(_)));

        // The code survives the failed attempt untouched
        let current = manager.get_entry(&entry.id).await.unwrap().unwrap();
        assert_eq!(current.invite_code.as_deref(), Some(code.as_str()));
    }

    #[tokio::test]
    async fn test_decline_terminal_conflict_leaves_no_audit() {
        let pool = test_pool().await;
        let manager = manager(&pool);
        let audit = AuditRecorder::new(pool.clone());

        let entry = manager
            .submit(None, Some("+15550100".to_string()), None, None)
            .await
            .unwrap();

        let declined = manager.decline(&entry.id, "admin-1").await.unwrap();
        assert_eq!(declined.entity.status, WaitlistStatus::Declined);
        assert!(declined.entity.invite_code.is_none());

        let before = audit.count().await.unwrap();

        let err = manager.decline(&entry.id, "admin-1").await.unwrap_err();
        assert!(matches!(err, AdminError::Conflict(_)));

        // Rejected transition appended nothing
        assert_eq!(audit.count().await.unwrap(), before);
    }

    #[tokio::test]
    async fn test_redeem_moves_to_registered_once() {
        let pool = test_pool().await;
        let manager = manager(&pool);

        let entry = manager
            .submit(Some("b@example.com".to_string()), None, None, None)
            .await
            .unwrap();
        let invited = manager.invite(&entry.id, "admin-1").await.unwrap();
        let code = invited.entity.invite_code.unwrap();

        let registered = manager.redeem(&code).await.unwrap();
        assert_eq!(registered.entity.status, WaitlistStatus::Registered);
        assert!(registered.entity.registered_at.is_some());
        // Code is immutable once set
        assert_eq!(registered.entity.invite_code.as_deref(), Some(code.as_str()));

        let err = manager.redeem(&code).await.unwrap_err();
        assert!(matches!(err, AdminError::Conflict(_)));

        // System action: no admin id on the registration entry
        let audit = AuditRecorder::new(pool.clone());
        let entries = audit.list(1, 0).await.unwrap();
        assert_eq!(entries[0].action, "waitlist.register");
        assert_eq!(entries[0].admin_id, None);
    }

    #[tokio::test]
    async fn test_redeem_unknown_code() {
        let pool = test_pool().await;
        let manager = manager(&pool);

        let err = manager.redeem("nosuchcode00").await.unwrap_err();
        assert!(matches!(err, AdminError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_concurrent_invites_one_winner() {
        // File-backed pool so both tasks see the same database
        let dir = tempfile::tempdir().unwrap();
        let pool = crate::db::create_pool(
            &dir.path().join("race.sqlite"),
            crate::db::DatabaseOptions::default(),
        )
        .await
        .unwrap();
        crate::db::run_migrations(&pool).await.unwrap();

        let manager = manager(&pool);
        let entry = manager
            .submit(Some("race@example.com".to_string()), None, None, None)
            .await
            .unwrap();

        let m1 = manager.clone();
        let m2 = manager.clone();
        let id1 = entry.id.clone();
        let id2 = entry.id.clone();

        let (r1, r2) = tokio::join!(
            tokio::spawn(async move { m1.invite(&id1, "admin-1").await }),
            tokio::spawn(async move { m2.invite(&id2, "admin-2").await }),
        );
        let r1 = r1.unwrap();
        let r2 = r2.unwrap();

        // Exactly one invited outcome, one conflict
        let winners = [&r1, &r2].iter().filter(|r| r.is_ok()).count();
        assert_eq!(winners, 1);
        let loser = if r1.is_err() { r1 } else { r2 };
        assert!(matches!(loser.unwrap_err(), AdminError::Conflict(_)));

        // The entry holds one code and one invited_at
        let current = manager.get_entry(&entry.id).await.unwrap().unwrap();
        assert_eq!(current.status, WaitlistStatus::Invited);
        assert!(current.invite_code.is_some());
        assert!(current.invited_at.is_some());
    }

    #[tokio::test]
    async fn test_stats_breakdown() {
        let pool = test_pool().await;
        let manager = manager(&pool);

        let a = manager
            .submit(Some("a@example.com".to_string()), None, None, None)
            .await
            .unwrap();
        let b = manager
            .submit(Some("b@example.com".to_string()), None, None, None)
            .await
            .unwrap();
        manager
            .submit(Some("c@example.com".to_string()), None, None, None)
            .await
            .unwrap();

        manager.invite(&a.id, "admin-1").await.unwrap();
        manager.decline(&b.id, "admin-1").await.unwrap();

        let stats = manager.stats().await.unwrap();
        assert_eq!(stats.total, 3);
        assert_eq!(stats.pending, 1);
        assert_eq!(stats.invited, 1);
        assert_eq!(stats.declined, 1);
        assert_eq!(stats.registered, 0);
    }
}
