/// HTTP API surface
///
/// Public endpoints (login, signup, report intake) and the gated admin
/// endpoints, one route per lifecycle transition.

pub mod admin;
pub mod middleware;
pub mod public;

use crate::context::AppContext;
use axum::{
    routing::{get, post},
    Router,
};

/// Build all API routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        // Login surface (public)
        .route("/login", get(public::login_page).post(public::login))
        .route("/logout", post(public::logout))
        // App-facing submissions (public)
        .route("/api/waitlist", post(public::waitlist_signup))
        .route("/api/waitlist/redeem", post(public::redeem_invite))
        .route("/api/reports", post(public::submit_report))
        // Dashboard (default admin landing page)
        .route("/dashboard", get(admin::get_stats))
        .route("/api/admin/stats", get(admin::get_stats))
        // Users
        .route("/api/admin/users", get(admin::list_users))
        .route("/api/admin/users/:id", get(admin::get_user))
        .route("/api/admin/users/:id/ban", post(admin::toggle_user_ban))
        .route("/api/admin/users/:id/admin", post(admin::toggle_user_admin))
        // Waitlist
        .route("/api/admin/waitlist", get(admin::list_waitlist))
        .route("/api/admin/waitlist/stats", get(admin::waitlist_stats))
        .route(
            "/api/admin/waitlist/:id/invite",
            post(admin::invite_waitlist_entry),
        )
        .route(
            "/api/admin/waitlist/:id/decline",
            post(admin::decline_waitlist_entry),
        )
        // Reports
        .route("/api/admin/reports", get(admin::list_reports))
        .route("/api/admin/reports/stats", get(admin::report_stats))
        .route(
            "/api/admin/reports/:id/resolve",
            post(admin::resolve_report),
        )
        // Audit trail
        .route("/api/admin/audit-log", get(admin::list_audit_log))
}
