use std::sync::Arc;

use axum::extract::State;

use crate::audit::{log_activity, ActivityEntry, AuditAction};
use crate::auth::guard::{CurrentSession, OwnerSession};
use crate::auth::password::hash_password;
use crate::errors::{ApiJson, ApiResponse, ApiResult, AppError};
use crate::models::company::{
    Branch, BranchWithCount, Company, CreateBranchPayload, RegisterCompanyPayload,
    RegisterCompanyResult,
};
use crate::models::employee::{AuthEmployeeData, Role};
use crate::validation::{
    sanitize_string, validate_email, validate_name, validate_password, validate_phone,
    validate_username,
};
use crate::AppState;

fn validate_contact(email: &Option<String>, phone: &Option<String>) -> Result<(), AppError> {
    if let Some(email) = email.as_deref().filter(|e| !e.trim().is_empty()) {
        validate_email(email)?;
    }
    if let Some(phone) = phone.as_deref().filter(|p| !p.trim().is_empty()) {
        validate_phone(phone)?;
    }
    Ok(())
}

/// Sign up a company: company row, head-office branch and owner account in one transaction.
pub async fn register_company(
    State(state): State<Arc<AppState>>,
    ApiJson(payload): ApiJson<RegisterCompanyPayload>,
) -> ApiResult<RegisterCompanyResult> {
    let company_name = sanitize_string(&payload.company_name);
    let owner_name = sanitize_string(&payload.owner_name);
    let username = payload.username.trim().to_string();
    let branch_name = payload
        .branch_name
        .as_deref()
        .map(sanitize_string)
        .filter(|b| !b.is_empty())
        .unwrap_or_else(|| "Head Office".to_string());

    validate_name(&company_name)?;
    validate_name(&owner_name)?;
    validate_name(&branch_name)?;
    validate_username(&username)?;
    validate_password(&payload.password, state.config.security.min_password_length)?;
    validate_contact(&payload.email, &payload.phone)?;

    let hashed = hash_password(&payload.password, state.config.security.bcrypt_cost).await?;

    let mut tx = state.db.begin().await?;

    let company_id = match sqlx::query("INSERT INTO companies (name, email, phone) VALUES (?, ?, ?)")
        .bind(&company_name)
        .bind(&payload.email)
        .bind(&payload.phone)
        .execute(&mut *tx)
        .await
    {
        Ok(res) => res.last_insert_rowid(),
        Err(sqlx::Error::Database(err)) if err.is_unique_violation() => {
            return Err(AppError::Conflict(format!(
                "Company '{}' is already registered",
                company_name
            )));
        }
        Err(e) => return Err(e.into()),
    };

    let branch_id = sqlx::query(
        "INSERT INTO branches (company_id, name, address, phone) VALUES (?, ?, ?, ?)",
    )
    .bind(company_id)
    .bind(&branch_name)
    .bind(&payload.branch_address)
    .bind(&payload.phone)
    .execute(&mut *tx)
    .await?
    .last_insert_rowid();

    let owner_id = match sqlx::query(
        "INSERT INTO employees (company_id, branch_id, name, username, password_hash, role)
         VALUES (?, ?, ?, ?, ?, 'OWNER')",
    )
    .bind(company_id)
    .bind(branch_id)
    .bind(&owner_name)
    .bind(&username)
    .bind(&hashed)
    .execute(&mut *tx)
    .await
    {
        Ok(res) => res.last_insert_rowid(),
        Err(sqlx::Error::Database(err)) if err.is_unique_violation() => {
            return Err(AppError::Conflict("Username is already taken".into()));
        }
        Err(e) => return Err(e.into()),
    };

    let company = sqlx::query_as::<_, Company>("SELECT * FROM companies WHERE id = ?")
        .bind(company_id)
        .fetch_one(&mut *tx)
        .await?;
    let branch = sqlx::query_as::<_, Branch>("SELECT * FROM branches WHERE id = ?")
        .bind(branch_id)
        .fetch_one(&mut *tx)
        .await?;

    tx.commit().await?;

    tracing::info!(target: "ONBOARDING", company_id, owner_id, "company registered");

    log_activity(
        &state,
        ActivityEntry {
            company_id: Some(company_id),
            employee_id: Some(owner_id),
            action: AuditAction::RegisterCompany,
            description: &format!("Registered company {}", company.name),
            metadata: None,
        },
    )
    .await;

    Ok(ApiResponse::ok(RegisterCompanyResult {
        company,
        branch,
        owner: AuthEmployeeData {
            id: owner_id,
            company_id,
            branch_id,
            name: owner_name,
            username,
            role: Role::Owner,
        },
    }))
}

/// Branches of the caller's company with their headcount.
pub async fn get_branches(
    State(state): State<Arc<AppState>>,
    session: CurrentSession,
) -> ApiResult<Vec<BranchWithCount>> {
    let branches = sqlx::query_as::<_, BranchWithCount>(
        "SELECT b.id, b.name, b.address, b.phone, COUNT(e.id) AS employee_count
         FROM branches b
         LEFT JOIN employees e ON e.branch_id = b.id AND e.is_active = 1
         WHERE b.company_id = ?
         GROUP BY b.id
         ORDER BY b.name ASC",
    )
    .bind(session.data.company_id)
    .fetch_all(&state.db)
    .await?;

    Ok(ApiResponse::ok(branches))
}

/// Open a new branch (owner only)
pub async fn create_branch(
    State(state): State<Arc<AppState>>,
    OwnerSession(session): OwnerSession,
    ApiJson(payload): ApiJson<CreateBranchPayload>,
) -> ApiResult<Branch> {
    let name = sanitize_string(&payload.name);
    validate_name(&name)?;
    validate_contact(&None, &payload.phone)?;

    let result = sqlx::query(
        "INSERT INTO branches (company_id, name, address, phone) VALUES (?, ?, ?, ?)",
    )
    .bind(session.company_id)
    .bind(&name)
    .bind(&payload.address)
    .bind(&payload.phone)
    .execute(&state.db)
    .await;

    match result {
        Ok(res) => {
            let id = res.last_insert_rowid();

            log_activity(
                &state,
                ActivityEntry {
                    company_id: Some(session.company_id),
                    employee_id: Some(session.employee_id),
                    action: AuditAction::CreateBranch,
                    description: &format!("Opened branch {}", name),
                    metadata: None,
                },
            )
            .await;

            let branch = sqlx::query_as::<_, Branch>("SELECT * FROM branches WHERE id = ?")
                .bind(id)
                .fetch_one(&state.db)
                .await?;
            Ok(ApiResponse::ok(branch))
        }
        Err(sqlx::Error::Database(err)) if err.is_unique_violation() => {
            Err(AppError::Conflict(format!("Branch '{}' already exists", name)))
        }
        Err(e) => Err(e.into()),
    }
}
