use std::sync::Arc;

use axum::extract::{Path, State};

use crate::audit::{log_activity, ActivityEntry, AuditAction};
use crate::auth::guard::OwnerSession;
use crate::auth::password::hash_password;
use crate::auth::session::SessionData;
use crate::errors::{ApiJson, ApiResponse, ApiResult, AppError, AppResult};
use crate::models::employee::{
    CreateEmployeePayload, DbEmployee, Employee, ResetPasswordPayload, UpdateEmployeePayload,
};
use crate::validation::{sanitize_string, validate_name, validate_password, validate_username};
use crate::AppState;

/// Branch must belong to the caller's company.
async fn ensure_branch(state: &AppState, company_id: i64, branch_id: i64) -> AppResult<()> {
    let found: Option<(i64,)> =
        sqlx::query_as("SELECT id FROM branches WHERE id = ? AND company_id = ?")
            .bind(branch_id)
            .bind(company_id)
            .fetch_optional(&state.db)
            .await?;

    found
        .map(|_| ())
        .ok_or_else(|| AppError::NotFound(format!("Branch {}", branch_id)))
}

async fn find_employee(state: &AppState, session: &SessionData, id: i64) -> AppResult<DbEmployee> {
    sqlx::query_as::<_, DbEmployee>("SELECT * FROM employees WHERE id = ? AND company_id = ?")
        .bind(id)
        .bind(session.company_id)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Employee {}", id)))
}

fn drop_sessions(state: &AppState, employee_id: i64) -> AppResult<()> {
    state
        .sessions
        .lock()
        .map_err(|e| AppError::Internal(e.to_string()))?
        .destroy_for_employee(employee_id);
    Ok(())
}

/// All employees of the company (owner only)
pub async fn get_employees(
    State(state): State<Arc<AppState>>,
    OwnerSession(session): OwnerSession,
) -> ApiResult<Vec<Employee>> {
    let rows = sqlx::query_as::<_, DbEmployee>(
        "SELECT * FROM employees WHERE company_id = ? ORDER BY role ASC, name ASC",
    )
    .bind(session.company_id)
    .fetch_all(&state.db)
    .await?;

    Ok(ApiResponse::ok(rows.into_iter().map(Employee::from).collect()))
}

/// Add a staff account (owner only)
pub async fn create_employee(
    State(state): State<Arc<AppState>>,
    OwnerSession(session): OwnerSession,
    ApiJson(payload): ApiJson<CreateEmployeePayload>,
) -> ApiResult<Employee> {
    let name = sanitize_string(&payload.name);
    let username = payload.username.trim().to_string();
    validate_name(&name)?;
    validate_username(&username)?;
    validate_password(&payload.password, state.config.security.min_password_length)?;

    let branch_id = payload.branch_id.unwrap_or(session.branch_id);
    ensure_branch(&state, session.company_id, branch_id).await?;

    let hashed = hash_password(&payload.password, state.config.security.bcrypt_cost).await?;

    let result = sqlx::query(
        "INSERT INTO employees (company_id, branch_id, name, username, password_hash, role, created_by)
         VALUES (?, ?, ?, ?, ?, 'STAFF', ?)",
    )
    .bind(session.company_id)
    .bind(branch_id)
    .bind(&name)
    .bind(&username)
    .bind(&hashed)
    .bind(session.employee_id)
    .execute(&state.db)
    .await;

    let id = match result {
        Ok(res) => res.last_insert_rowid(),
        Err(sqlx::Error::Database(err)) if err.is_unique_violation() => {
            return Err(AppError::Conflict("Username is already taken".into()));
        }
        Err(e) => return Err(e.into()),
    };

    log_activity(
        &state,
        ActivityEntry {
            company_id: Some(session.company_id),
            employee_id: Some(session.employee_id),
            action: AuditAction::CreateEmployee,
            description: &format!("Added employee {}", username),
            metadata: None,
        },
    )
    .await;

    let created = find_employee(&state, &session, id).await?;
    Ok(ApiResponse::ok(created.into()))
}

/// Edit name, username or branch (owner only)
pub async fn update_employee(
    State(state): State<Arc<AppState>>,
    OwnerSession(session): OwnerSession,
    Path(id): Path<i64>,
    ApiJson(payload): ApiJson<UpdateEmployeePayload>,
) -> ApiResult<Employee> {
    let name = sanitize_string(&payload.name);
    let username = payload.username.trim().to_string();
    validate_name(&name)?;
    validate_username(&username)?;

    find_employee(&state, &session, id).await?;
    ensure_branch(&state, session.company_id, payload.branch_id).await?;

    let result = sqlx::query(
        "UPDATE employees SET name = ?, username = ?, branch_id = ? WHERE id = ? AND company_id = ?",
    )
    .bind(&name)
    .bind(&username)
    .bind(payload.branch_id)
    .bind(id)
    .bind(session.company_id)
    .execute(&state.db)
    .await;

    match result {
        Ok(_) => {}
        Err(sqlx::Error::Database(err)) if err.is_unique_violation() => {
            return Err(AppError::Conflict("Username is already taken".into()));
        }
        Err(e) => return Err(e.into()),
    }

    // Sessions carry the old branch and name
    if id != session.employee_id {
        drop_sessions(&state, id)?;
    }

    log_activity(
        &state,
        ActivityEntry {
            company_id: Some(session.company_id),
            employee_id: Some(session.employee_id),
            action: AuditAction::UpdateEmployee,
            description: &format!("Updated employee {}", username),
            metadata: None,
        },
    )
    .await;

    let updated = find_employee(&state, &session, id).await?;
    Ok(ApiResponse::ok(updated.into()))
}

/// Activate or deactivate an account (owner only). Deactivation ends its sessions.
pub async fn toggle_employee_status(
    State(state): State<Arc<AppState>>,
    OwnerSession(session): OwnerSession,
    Path(id): Path<i64>,
) -> ApiResult<Employee> {
    if id == session.employee_id {
        return Err(AppError::Validation(
            "You cannot deactivate your own account".into(),
        ));
    }

    let employee = find_employee(&state, &session, id).await?;
    let now_active = !employee.is_active;

    sqlx::query("UPDATE employees SET is_active = ? WHERE id = ? AND company_id = ?")
        .bind(now_active)
        .bind(id)
        .bind(session.company_id)
        .execute(&state.db)
        .await?;

    if !now_active {
        drop_sessions(&state, id)?;
    }

    log_activity(
        &state,
        ActivityEntry {
            company_id: Some(session.company_id),
            employee_id: Some(session.employee_id),
            action: AuditAction::ToggleEmployee,
            description: &format!(
                "{} employee {}",
                if now_active { "Activated" } else { "Deactivated" },
                employee.username
            ),
            metadata: None,
        },
    )
    .await;

    let updated = find_employee(&state, &session, id).await?;
    Ok(ApiResponse::ok(updated.into()))
}

/// Set a new password for an employee (owner only). Ends the employee's sessions.
pub async fn reset_employee_password(
    State(state): State<Arc<AppState>>,
    OwnerSession(session): OwnerSession,
    Path(id): Path<i64>,
    ApiJson(payload): ApiJson<ResetPasswordPayload>,
) -> ApiResult<()> {
    validate_password(&payload.new_password, state.config.security.min_password_length)?;
    let employee = find_employee(&state, &session, id).await?;

    let hashed = hash_password(&payload.new_password, state.config.security.bcrypt_cost).await?;

    sqlx::query("UPDATE employees SET password_hash = ? WHERE id = ? AND company_id = ?")
        .bind(&hashed)
        .bind(id)
        .bind(session.company_id)
        .execute(&state.db)
        .await?;

    drop_sessions(&state, id)?;

    log_activity(
        &state,
        ActivityEntry {
            company_id: Some(session.company_id),
            employee_id: Some(session.employee_id),
            action: AuditAction::ResetPassword,
            description: &format!("Reset password of {}", employee.username),
            metadata: None,
        },
    )
    .await;

    Ok(ApiResponse::ok(()))
}
