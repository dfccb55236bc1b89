/// Public endpoints: the login surface and the submission endpoints the
/// app itself calls (waitlist signup, invite redemption, report intake).
use crate::{
    admin::{ContentType, Report, WaitlistEntry},
    api::middleware::SESSION_COOKIE,
    auth::OptionalAdminContext,
    context::AppContext,
    error::{AdminError, AdminResult},
};
use axum::{
    extract::{Query, State},
    http::header::SET_COOKIE,
    response::{AppendHeaders, IntoResponse, Redirect, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, message = "phone is required"))]
    pub phone: String,
    #[validate(length(min = 1, message = "password is required"))]
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub user_id: String,
    pub expires_at: DateTime<Utc>,
}

/// Sign in with phone + password. On success the session token is set as
/// an HttpOnly cookie (and also returned for header-based clients).
pub async fn login(
    State(ctx): State<AppContext>,
    Json(req): Json<LoginRequest>,
) -> AdminResult<Response> {
    req.validate()
        .map_err(|e| AdminError::Validation(e.to_string()))?;

    let (user, session) = ctx.session_manager.sign_in(&req.phone, &req.password).await?;

    tracing::info!(user_id = %user.id, "admin sign-in");

    let max_age = ctx.config.auth.session_ttl_minutes * 60;
    let cookie = format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        SESSION_COOKIE, session.access_token, max_age
    );

    Ok((
        AppendHeaders([(SET_COOKIE, cookie)]),
        Json(LoginResponse {
            user_id: user.id,
            expires_at: session.expires_at,
        }),
    )
        .into_response())
}

#[derive(Debug, Deserialize)]
pub struct LoginPageQuery {
    pub reason: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct LoginPageResponse {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// The login surface. An already-authenticated admin is bounced to the
/// dashboard instead of being offered re-authentication.
pub async fn login_page(
    auth: OptionalAdminContext,
    Query(query): Query<LoginPageQuery>,
) -> Response {
    if auth.admin.is_some() {
        return Redirect::to("/dashboard").into_response();
    }

    Json(LoginPageResponse {
        message: "Sign in required".to_string(),
        reason: query.reason,
    })
    .into_response()
}

/// Sign out: destroy the session (if any) and clear the cookie.
pub async fn logout(State(ctx): State<AppContext>, auth: OptionalAdminContext) -> Response {
    if let Some(admin) = auth.admin {
        if let Err(e) = ctx
            .session_manager
            .delete_session(&admin.session.session_id)
            .await
        {
            tracing::warn!(error = %e, "failed to delete session on logout");
        }
    }

    let cookie = format!("{}=; Path=/; HttpOnly; Max-Age=0", SESSION_COOKIE);
    (
        AppendHeaders([(SET_COOKIE, cookie)]),
        Json(serde_json::json!({ "ok": true })),
    )
        .into_response()
}

#[derive(Debug, Deserialize, Validate)]
pub struct WaitlistSignupRequest {
    #[validate(email(message = "invalid email"))]
    pub email: Option<String>,
    #[validate(length(min = 7, max = 20, message = "invalid phone"))]
    pub phone: Option<String>,
    pub source: Option<String>,
    pub notes: Option<String>,
}

/// Join the waitlist. At least one of email/phone is required; the
/// manager rejects the request before touching the store otherwise.
pub async fn waitlist_signup(
    State(ctx): State<AppContext>,
    Json(req): Json<WaitlistSignupRequest>,
) -> AdminResult<Json<WaitlistEntry>> {
    req.validate()
        .map_err(|e| AdminError::Validation(e.to_string()))?;

    let entry = ctx
        .waitlist_manager
        .submit(req.email, req.phone, req.source, req.notes)
        .await?;

    Ok(Json(entry))
}

#[derive(Debug, Deserialize, Validate)]
pub struct RedeemRequest {
    #[validate(length(min = 1, message = "code is required"))]
    pub code: String,
}

/// Redeem an invite code during app signup: moves the waitlist entry to
/// `registered` exactly once.
pub async fn redeem_invite(
    State(ctx): State<AppContext>,
    Json(req): Json<RedeemRequest>,
) -> AdminResult<Json<WaitlistEntry>> {
    req.validate()
        .map_err(|e| AdminError::Validation(e.to_string()))?;

    let outcome = ctx.waitlist_manager.redeem(&req.code).await?;

    Ok(Json(outcome.entity))
}

#[derive(Debug, Deserialize, Validate)]
pub struct SubmitReportRequest {
    pub reporter_id: Option<String>,
    pub content_type: String,
    #[validate(length(min = 1, message = "content_id is required"))]
    pub content_id: String,
    #[validate(length(min = 1, message = "reason is required"))]
    pub reason: String,
    pub description: Option<String>,
}

/// Submit a content report. Anonymous reports are allowed; the content
/// type tag is parsed into the closed enum at this boundary.
pub async fn submit_report(
    State(ctx): State<AppContext>,
    Json(req): Json<SubmitReportRequest>,
) -> AdminResult<Json<Report>> {
    req.validate()
        .map_err(|e| AdminError::Validation(e.to_string()))?;

    let content_type = ContentType::from_str(&req.content_type)?;

    let report = ctx
        .report_manager
        .submit_report(
            req.reporter_id.as_deref(),
            content_type,
            &req.content_id,
            &req.reason,
            req.description.as_deref(),
        )
        .await?;

    Ok(Json(report))
}
