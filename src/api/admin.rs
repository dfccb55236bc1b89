/// Gated admin endpoints
///
/// Every handler here takes an `AdminContext`, so the authorization gate
/// runs before any of this code does. Action endpoints return the
/// mutated entity together with the `audit_recorded` flag.
use crate::{
    admin::{
        AuditLogEntry, Report, ReportResolution, ReportStats, ReportStatus, UserDetail,
        WaitlistEntry, WaitlistStats, WaitlistStatus,
    },
    auth::AdminContext,
    context::AppContext,
    db::models::User,
    error::AdminResult,
};
use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

// ============================================================================
// Dashboard
// ============================================================================

#[derive(Debug, Serialize)]
pub struct DashboardStats {
    pub total_users: i64,
    pub banned_users: i64,
    pub waitlist_total: i64,
    pub waitlist_pending: i64,
    pub total_reports: i64,
    pub pending_reports: i64,
    pub total_posts: i64,
    pub total_messages: i64,
    pub total_connections: i64,
}

async fn count(pool: &SqlitePool, sql: &'static str) -> AdminResult<i64> {
    let value: i64 = sqlx::query_scalar(sql).fetch_one(pool).await?;
    Ok(value)
}

/// Dashboard stat block. The nine counts are independent reads, so they
/// run concurrently and join before the response is built.
pub async fn get_stats(
    State(ctx): State<AppContext>,
    _auth: AdminContext,
) -> AdminResult<Json<DashboardStats>> {
    let db = &ctx.db;

    let (
        total_users,
        banned_users,
        waitlist_total,
        waitlist_pending,
        total_reports,
        pending_reports,
        total_posts,
        total_messages,
        total_connections,
    ) = tokio::try_join!(
        count(db, "SELECT COUNT(*) FROM users"),
        count(db, "SELECT COUNT(*) FROM users WHERE is_banned = 1"),
        count(db, "SELECT COUNT(*) FROM waitlist"),
        count(db, "SELECT COUNT(*) FROM waitlist WHERE status = 'pending'"),
        count(db, "SELECT COUNT(*) FROM reports"),
        count(db, "SELECT COUNT(*) FROM reports WHERE status = 'pending'"),
        count(db, "SELECT COUNT(*) FROM posts"),
        count(db, "SELECT COUNT(*) FROM messages"),
        count(db, "SELECT COUNT(*) FROM connections"),
    )?;

    Ok(Json(DashboardStats {
        total_users,
        banned_users,
        waitlist_total,
        waitlist_pending,
        total_reports,
        pending_reports,
        total_posts,
        total_messages,
        total_connections,
    }))
}

// ============================================================================
// Users
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ListUsersQuery {
    pub limit: Option<i64>,
    pub cursor: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ListUsersResponse {
    pub users: Vec<User>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cursor: Option<String>,
}

pub async fn list_users(
    State(ctx): State<AppContext>,
    _auth: AdminContext,
    Query(query): Query<ListUsersQuery>,
) -> AdminResult<Json<ListUsersResponse>> {
    let limit = query.limit.unwrap_or(50).min(100);

    let users = ctx
        .user_manager
        .list_users(limit, query.cursor.as_deref())
        .await?;

    let cursor = if users.len() as i64 == limit {
        users.last().map(|u| u.id.clone())
    } else {
        None
    };

    Ok(Json(ListUsersResponse { users, cursor }))
}

pub async fn get_user(
    State(ctx): State<AppContext>,
    _auth: AdminContext,
    Path(user_id): Path<String>,
) -> AdminResult<Json<UserDetail>> {
    let detail = ctx.user_manager.user_detail(&user_id).await?;
    Ok(Json(detail))
}

#[derive(Debug, Serialize)]
pub struct UserActionResponse {
    pub user: User,
    pub audit_recorded: bool,
}

/// Toggle the ban flag on a user
pub async fn toggle_user_ban(
    State(ctx): State<AppContext>,
    auth: AdminContext,
    Path(user_id): Path<String>,
) -> AdminResult<Json<UserActionResponse>> {
    let outcome = ctx.user_manager.toggle_ban(&user_id, &auth.user_id).await?;

    Ok(Json(UserActionResponse {
        user: outcome.entity,
        audit_recorded: outcome.audit_recorded,
    }))
}

/// Toggle the admin flag on a user
pub async fn toggle_user_admin(
    State(ctx): State<AppContext>,
    auth: AdminContext,
    Path(user_id): Path<String>,
) -> AdminResult<Json<UserActionResponse>> {
    let outcome = ctx.user_manager.toggle_admin(&user_id, &auth.user_id).await?;

    Ok(Json(UserActionResponse {
        user: outcome.entity,
        audit_recorded: outcome.audit_recorded,
    }))
}

// ============================================================================
// Waitlist
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ListWaitlistQuery {
    pub status: Option<String>,
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct ListWaitlistResponse {
    pub entries: Vec<WaitlistEntry>,
}

pub async fn list_waitlist(
    State(ctx): State<AppContext>,
    _auth: AdminContext,
    Query(query): Query<ListWaitlistQuery>,
) -> AdminResult<Json<ListWaitlistResponse>> {
    let status = query
        .status
        .as_deref()
        .map(WaitlistStatus::from_str)
        .transpose()?;
    let limit = query.limit.unwrap_or(100).min(500);

    let entries = ctx.waitlist_manager.list(status, limit).await?;

    Ok(Json(ListWaitlistResponse { entries }))
}

pub async fn waitlist_stats(
    State(ctx): State<AppContext>,
    _auth: AdminContext,
) -> AdminResult<Json<WaitlistStats>> {
    let stats = ctx.waitlist_manager.stats().await?;
    Ok(Json(stats))
}

#[derive(Debug, Serialize)]
pub struct WaitlistActionResponse {
    pub entry: WaitlistEntry,
    pub audit_recorded: bool,
}

/// Issue an invite for a pending entry, then hand the code to the mailer
/// (best-effort; the committed transition is the source of truth).
pub async fn invite_waitlist_entry(
    State(ctx): State<AppContext>,
    auth: AdminContext,
    Path(entry_id): Path<String>,
) -> AdminResult<Json<WaitlistActionResponse>> {
    let outcome = ctx.waitlist_manager.invite(&entry_id, &auth.user_id).await?;

    if let (Some(email), Some(code)) = (&outcome.entity.email, &outcome.entity.invite_code) {
        if let Err(e) = ctx.mailer.send_invite_email(email, code).await {
            tracing::warn!(entry_id = %entry_id, error = %e, "invite email delivery failed");
        }
    }

    Ok(Json(WaitlistActionResponse {
        entry: outcome.entity,
        audit_recorded: outcome.audit_recorded,
    }))
}

pub async fn decline_waitlist_entry(
    State(ctx): State<AppContext>,
    auth: AdminContext,
    Path(entry_id): Path<String>,
) -> AdminResult<Json<WaitlistActionResponse>> {
    let outcome = ctx.waitlist_manager.decline(&entry_id, &auth.user_id).await?;

    Ok(Json(WaitlistActionResponse {
        entry: outcome.entity,
        audit_recorded: outcome.audit_recorded,
    }))
}

// ============================================================================
// Reports
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ListReportsQuery {
    pub status: Option<String>,
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct ListReportsResponse {
    pub reports: Vec<Report>,
}

pub async fn list_reports(
    State(ctx): State<AppContext>,
    _auth: AdminContext,
    Query(query): Query<ListReportsQuery>,
) -> AdminResult<Json<ListReportsResponse>> {
    let status = query
        .status
        .as_deref()
        .map(ReportStatus::from_str)
        .transpose()?;
    let limit = query.limit.unwrap_or(100).min(500);

    let reports = ctx.report_manager.list(status, limit).await?;

    Ok(Json(ListReportsResponse { reports }))
}

pub async fn report_stats(
    State(ctx): State<AppContext>,
    _auth: AdminContext,
) -> AdminResult<Json<ReportStats>> {
    let stats = ctx.report_manager.stats().await?;
    Ok(Json(stats))
}

#[derive(Debug, Deserialize)]
pub struct ResolveReportRequest {
    pub resolution: ReportResolution,
    pub action_taken: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ReportActionResponse {
    pub report: Report,
    pub audit_recorded: bool,
}

/// Resolve a pending report with one of the three terminal outcomes
pub async fn resolve_report(
    State(ctx): State<AppContext>,
    auth: AdminContext,
    Path(report_id): Path<String>,
    Json(req): Json<ResolveReportRequest>,
) -> AdminResult<Json<ReportActionResponse>> {
    let outcome = ctx
        .report_manager
        .resolve(
            &report_id,
            req.resolution,
            req.action_taken.as_deref(),
            &auth.user_id,
        )
        .await?;

    Ok(Json(ReportActionResponse {
        report: outcome.entity,
        audit_recorded: outcome.audit_recorded,
    }))
}

// ============================================================================
// Audit log
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct AuditLogQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct AuditLogResponse {
    pub entries: Vec<AuditLogEntry>,
    pub total: i64,
}

pub async fn list_audit_log(
    State(ctx): State<AppContext>,
    _auth: AdminContext,
    Query(query): Query<AuditLogQuery>,
) -> AdminResult<Json<AuditLogResponse>> {
    let limit = query.limit.unwrap_or(50).min(200);
    let offset = query.offset.unwrap_or(0).max(0);

    let (entries, total) = tokio::try_join!(ctx.audit.list(limit, offset), ctx.audit.count())?;

    Ok(Json(AuditLogResponse { entries, total }))
}
