/// User trust-flag management
///
/// The two reversible lifecycle toggles (ban, admin) plus the read
/// surface the user pages need. Toggles are single-statement
/// compare-and-set updates keyed on the expected prior flag, so two
/// concurrent toggles cannot both apply.
use crate::{
    admin::audit::{Audited, AuditRecorder},
    db::models::User,
    error::{AdminError, AdminResult},
};
use chrono::Utc;
use serde::Serialize;
use serde_json::json;
use sqlx::SqlitePool;

/// Reason recorded on every admin-issued ban
const BAN_REASON: &str = "Banned by admin";

/// Aggregated view for the user detail page
#[derive(Debug, Clone, Serialize)]
pub struct UserDetail {
    pub user: User,
    pub connection_count: i64,
    pub post_count: i64,
    pub message_count: i64,
    pub report_count: i64,
}

/// User manager
#[derive(Clone)]
pub struct UserManager {
    db: SqlitePool,
    audit: AuditRecorder,
}

impl UserManager {
    pub fn new(db: SqlitePool, audit: AuditRecorder) -> Self {
        Self { db, audit }
    }

    /// Get a user by id
    pub async fn get_user(&self, user_id: &str) -> AdminResult<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?1")
            .bind(user_id)
            .fetch_optional(&self.db)
            .await?;

        Ok(user)
    }

    /// Resolve the admin flag for an identity, fresh from the store.
    ///
    /// The authorization gate calls this on every request; the result is
    /// never cached. A missing row resolves to false.
    pub async fn is_admin(&self, user_id: &str) -> AdminResult<bool> {
        let flag: Option<bool> = sqlx::query_scalar("SELECT is_admin FROM users WHERE id = ?1")
            .bind(user_id)
            .fetch_optional(&self.db)
            .await?;

        Ok(flag.unwrap_or(false))
    }

    /// List users, paged by id cursor
    pub async fn list_users(&self, limit: i64, cursor: Option<&str>) -> AdminResult<Vec<User>> {
        let users = if let Some(cursor) = cursor {
            sqlx::query_as::<_, User>(
                "SELECT * FROM users WHERE id > ?1 ORDER BY id LIMIT ?2",
            )
            .bind(cursor)
            .bind(limit)
            .fetch_all(&self.db)
            .await?
        } else {
            sqlx::query_as::<_, User>("SELECT * FROM users ORDER BY id LIMIT ?1")
                .bind(limit)
                .fetch_all(&self.db)
                .await?
        };

        Ok(users)
    }

    /// Toggle the ban flag on a user.
    ///
    /// `banned_at` and `ban_reason` move in the same statement as
    /// `is_banned`: set together on ban, cleared together on unban.
    pub async fn toggle_ban(&self, user_id: &str, admin_id: &str) -> AdminResult<Audited<User>> {
        let user = self.fetch_required(user_id).await?;
        let now = Utc::now();
        let next_banned = !user.is_banned;
        let (banned_at, ban_reason) = if next_banned {
            (Some(now), Some(BAN_REASON.to_string()))
        } else {
            (None, None)
        };

        let result = sqlx::query(
            r#"
            UPDATE users
            SET is_banned = ?2, banned_at = ?3, ban_reason = ?4, updated_at = ?5
            WHERE id = ?1 AND is_banned = ?6
            "#,
        )
        .bind(user_id)
        .bind(next_banned)
        .bind(banned_at)
        .bind(&ban_reason)
        .bind(now)
        .bind(user.is_banned)
        .execute(&self.db)
        .await?;

        if result.rows_affected() == 0 {
            return Err(self.flags_conflict(user_id).await?);
        }

        let updated = self.fetch_required(user_id).await?;

        let action = if next_banned { "user.ban" } else { "user.unban" };
        let audit_recorded = self
            .audit
            .record_or_warn(
                Some(admin_id),
                action,
                "user",
                user_id,
                &json!({
                    "is_banned": user.is_banned,
                    "banned_at": user.banned_at,
                    "ban_reason": user.ban_reason,
                }),
                &json!({
                    "is_banned": updated.is_banned,
                    "banned_at": updated.banned_at,
                    "ban_reason": updated.ban_reason,
                }),
            )
            .await;

        Ok(Audited {
            entity: updated,
            audit_recorded,
        })
    }

    /// Toggle the admin flag on a user
    pub async fn toggle_admin(&self, user_id: &str, admin_id: &str) -> AdminResult<Audited<User>> {
        let user = self.fetch_required(user_id).await?;
        let now = Utc::now();
        let next_admin = !user.is_admin;

        let result = sqlx::query(
            "UPDATE users SET is_admin = ?2, updated_at = ?3 WHERE id = ?1 AND is_admin = ?4",
        )
        .bind(user_id)
        .bind(next_admin)
        .bind(now)
        .bind(user.is_admin)
        .execute(&self.db)
        .await?;

        if result.rows_affected() == 0 {
            return Err(self.flags_conflict(user_id).await?);
        }

        let updated = self.fetch_required(user_id).await?;

        let action = if next_admin { "user.promote" } else { "user.demote" };
        let audit_recorded = self
            .audit
            .record_or_warn(
                Some(admin_id),
                action,
                "user",
                user_id,
                &json!({ "is_admin": user.is_admin }),
                &json!({ "is_admin": updated.is_admin }),
            )
            .await;

        Ok(Audited {
            entity: updated,
            audit_recorded,
        })
    }

    /// Fetch a user plus the counts the detail page shows. The four count
    /// queries have no ordering dependency, so they run concurrently and
    /// join before returning.
    pub async fn user_detail(&self, user_id: &str) -> AdminResult<UserDetail> {
        let user = self.fetch_required(user_id).await?;

        let (connection_count, post_count, message_count, report_count) = tokio::try_join!(
            self.count_where("SELECT COUNT(*) FROM connections WHERE user_id = ?1", user_id),
            self.count_where("SELECT COUNT(*) FROM posts WHERE author_id = ?1", user_id),
            self.count_where("SELECT COUNT(*) FROM messages WHERE sender_id = ?1", user_id),
            self.count_where(
                "SELECT COUNT(*) FROM reports WHERE content_type = 'user' AND content_id = ?1",
                user_id,
            ),
        )?;

        Ok(UserDetail {
            user,
            connection_count,
            post_count,
            message_count,
            report_count,
        })
    }

    async fn count_where(&self, sql: &'static str, id: &str) -> AdminResult<i64> {
        let count: i64 = sqlx::query_scalar(sql)
            .bind(id)
            .fetch_one(&self.db)
            .await?;
        Ok(count)
    }

    async fn fetch_required(&self, user_id: &str) -> AdminResult<User> {
        self.get_user(user_id)
            .await?
            .ok_or_else(|| AdminError::NotFound(format!("User {} not found", user_id)))
    }

    /// A flag CAS matched zero rows: the row is gone, or its flags moved
    /// under us. One fetch disambiguates.
    async fn flags_conflict(&self, user_id: &str) -> AdminResult<AdminError> {
        Ok(match self.get_user(user_id).await? {
            None => AdminError::NotFound(format!("User {} not found", user_id)),
            Some(_) => AdminError::Conflict(
                "User flags changed concurrently; re-fetch and retry".to_string(),
            ),
        })
    }
}
