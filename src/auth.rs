/// The authorization gate
///
/// Every administrative request passes through here. The gate resolves
/// the caller's session, then re-fetches the admin flag from the users
/// table — never from the session, never from a cache, never from a
/// client-supplied claim. Any failure along the way denies access.
use crate::{
    admin::UserManager,
    api::middleware::extract_session_token,
    context::AppContext,
    error::{AdminError, AdminResult},
    session::{SessionManager, ValidatedSession},
};
use axum::{async_trait, extract::FromRequestParts, http::request::Parts};

/// Authenticated admin context for a single request
#[derive(Debug, Clone)]
pub struct AdminContext {
    pub user_id: String,
    pub session: ValidatedSession,
}

/// Run the gate for a session token.
///
/// Outcomes map to the three gate results: `Ok` allows, an
/// `Authentication` error redirects to login, an `Authorization` error
/// redirects with the unauthorized marker. A store failure during the
/// admin-flag lookup denies (fail closed); it is never treated as admin.
pub async fn resolve_admin(
    sessions: &SessionManager,
    users: &UserManager,
    token: &str,
) -> AdminResult<AdminContext> {
    let session = sessions
        .validate_access_token(token)
        .await
        .map_err(|e| match e {
            AdminError::Authentication(_) => e,
            _ => AdminError::Authentication("Session could not be verified".to_string()),
        })?;

    match users.is_admin(&session.user_id).await {
        Ok(true) => Ok(AdminContext {
            user_id: session.user_id.clone(),
            session,
        }),
        Ok(false) => {
            // Drop the partially-authenticated session: a non-admin has no
            // business holding one on this service.
            if let Err(e) = sessions.delete_session(&session.session_id).await {
                tracing::warn!(error = %e, "failed to drop non-admin session");
            }
            tracing::warn!(user_id = %session.user_id, "non-admin denied at gate");
            Err(AdminError::Authorization("Admin access required".to_string()))
        }
        Err(e) => {
            tracing::warn!(error = %e, "admin flag lookup failed, denying");
            Err(AdminError::Authorization("Admin access required".to_string()))
        }
    }
}

#[async_trait]
impl FromRequestParts<AppContext> for AdminContext {
    type Rejection = AdminError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppContext,
    ) -> Result<Self, Self::Rejection> {
        let token = extract_session_token(&parts.headers)
            .ok_or_else(|| AdminError::Authentication("Missing session token".to_string()))?;

        resolve_admin(&state.session_manager, &state.user_manager, &token).await
    }
}

/// Optional identity - does not fail when no valid session is present.
/// The login surface uses this to bounce already-authenticated admins to
/// the dashboard.
#[derive(Debug, Clone)]
pub struct OptionalAdminContext {
    pub admin: Option<AdminContext>,
}

#[async_trait]
impl FromRequestParts<AppContext> for OptionalAdminContext {
    type Rejection = AdminError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppContext,
    ) -> Result<Self, Self::Rejection> {
        let admin = match extract_session_token(&parts.headers) {
            Some(token) => resolve_admin(&state.session_manager, &state.user_manager, &token)
                .await
                .ok(),
            None => None,
        };

        Ok(OptionalAdminContext { admin })
    }
}
