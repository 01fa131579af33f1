use std::sync::Arc;

use axum::extract::State;

use crate::audit::{log_activity, ActivityEntry, AuditAction};
use crate::auth::guard::CurrentSession;
use crate::auth::password::verify_password;
use crate::auth::session::SessionIdentity;
use crate::errors::{ApiJson, ApiResponse, ApiResult, AppError};
use crate::models::employee::{AuthEmployeeData, DbEmployee, LoginPayload, LoginResult};
use crate::AppState;

const BAD_CREDENTIALS: &str = "Invalid username or password";

/// Log an employee in and open a session.
pub async fn login(
    State(state): State<Arc<AppState>>,
    ApiJson(payload): ApiJson<LoginPayload>,
) -> ApiResult<LoginResult> {
    let username = payload.username.trim().to_string();

    state
        .login_limiter
        .check(&username)
        .map_err(AppError::RateLimited)?;

    let employee =
        sqlx::query_as::<_, DbEmployee>("SELECT * FROM employees WHERE username = ? AND is_active = 1")
            .bind(&username)
            .fetch_optional(&state.db)
            .await?
            .ok_or_else(|| AppError::Auth(BAD_CREDENTIALS.into()))?;

    if !verify_password(&payload.password, &employee.password_hash).await? {
        tracing::info!(target: "AUTH", username = %username, "rejected login");
        return Err(AppError::Auth(BAD_CREDENTIALS.into()));
    }

    state.login_limiter.reset(&username);

    if let Err(e) = sqlx::query("UPDATE employees SET last_login_at = CURRENT_TIMESTAMP WHERE id = ?")
        .bind(employee.id)
        .execute(&state.db)
        .await
    {
        tracing::warn!(target: "AUTH", error = %e, "failed to record last login");
    }

    let (token, expires_at) = {
        let mut store = state
            .sessions
            .lock()
            .map_err(|e| AppError::Internal(e.to_string()))?;
        let token = store.create(SessionIdentity {
            employee_id: employee.id,
            company_id: employee.company_id,
            branch_id: employee.branch_id,
            username: employee.username.clone(),
            name: employee.name.clone(),
            role: employee.role,
        });
        let expires_at = store
            .validate(&token)
            .map(|s| s.expires_at.to_rfc3339())
            .map_err(AppError::Internal)?;
        (token, expires_at)
    };

    log_activity(
        &state,
        ActivityEntry {
            company_id: Some(employee.company_id),
            employee_id: Some(employee.id),
            action: AuditAction::Login,
            description: &format!("{} logged in", employee.username),
            metadata: None,
        },
    )
    .await;

    Ok(ApiResponse::ok(LoginResult {
        employee: AuthEmployeeData {
            id: employee.id,
            company_id: employee.company_id,
            branch_id: employee.branch_id,
            name: employee.name,
            username: employee.username,
            role: employee.role,
        },
        session_token: token,
        expires_at,
    }))
}

/// Close the caller's session.
pub async fn logout(
    State(state): State<Arc<AppState>>,
    session: CurrentSession,
) -> ApiResult<()> {
    state
        .sessions
        .lock()
        .map_err(|e| AppError::Internal(e.to_string()))?
        .destroy(&session.token);

    log_activity(
        &state,
        ActivityEntry {
            company_id: Some(session.data.company_id),
            employee_id: Some(session.data.employee_id),
            action: AuditAction::Logout,
            description: "Logged out",
            metadata: None,
        },
    )
    .await;

    Ok(ApiResponse::ok(()))
}

/// Who am I (used by clients to resume a stored token).
pub async fn check_session(session: CurrentSession) -> ApiResult<AuthEmployeeData> {
    let s = session.data;
    Ok(ApiResponse::ok(AuthEmployeeData {
        id: s.employee_id,
        company_id: s.company_id,
        branch_id: s.branch_id,
        name: s.name,
        username: s.username,
        role: s.role,
    }))
}
