use sqlx::{Executor, Sqlite};

use crate::logger::redact_sensitive_data;
use crate::AppState;

/// Business actions written to `activity_logs`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditAction {
    RegisterCompany,
    Login,
    Logout,
    CreateBranch,
    CreateEmployee,
    UpdateEmployee,
    ToggleEmployee,
    ResetPassword,
    CreateCategory,
    CreateProduct,
    UpdateProduct,
    DeleteProduct,
    CreateVariant,
    UpdateVariant,
    Restock,
    AdjustStock,
    PlaceOrder,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::RegisterCompany => "REGISTER_COMPANY",
            AuditAction::Login => "LOGIN",
            AuditAction::Logout => "LOGOUT",
            AuditAction::CreateBranch => "CREATE_BRANCH",
            AuditAction::CreateEmployee => "CREATE_EMPLOYEE",
            AuditAction::UpdateEmployee => "UPDATE_EMPLOYEE",
            AuditAction::ToggleEmployee => "TOGGLE_EMPLOYEE",
            AuditAction::ResetPassword => "RESET_PASSWORD",
            AuditAction::CreateCategory => "CREATE_CATEGORY",
            AuditAction::CreateProduct => "CREATE_PRODUCT",
            AuditAction::UpdateProduct => "UPDATE_PRODUCT",
            AuditAction::DeleteProduct => "DELETE_PRODUCT",
            AuditAction::CreateVariant => "CREATE_VARIANT",
            AuditAction::UpdateVariant => "UPDATE_VARIANT",
            AuditAction::Restock => "RESTOCK",
            AuditAction::AdjustStock => "ADJUST_STOCK",
            AuditAction::PlaceOrder => "PLACE_ORDER",
        }
    }
}

/// One activity row.
pub struct ActivityEntry<'a> {
    pub company_id: Option<i64>,
    pub employee_id: Option<i64>,
    pub action: AuditAction,
    pub description: &'a str,
    pub metadata: Option<serde_json::Value>,
}

/// Write an activity row on any executor (pool, connection or open transaction).
pub async fn record_activity<'e, E>(db: E, entry: ActivityEntry<'_>) -> Result<(), sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    let metadata = entry
        .metadata
        .map(|m| redact_sensitive_data(m).to_string());

    sqlx::query(
        "INSERT INTO activity_logs (company_id, employee_id, action, description, metadata) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(entry.company_id)
    .bind(entry.employee_id)
    .bind(entry.action.as_str())
    .bind(entry.description)
    .bind(metadata)
    .execute(db)
    .await?;

    Ok(())
}

/// Best-effort audit write outside a transaction. Failures are logged, never returned.
pub async fn log_activity(state: &AppState, entry: ActivityEntry<'_>) {
    if !state.config.security.enable_audit_log {
        return;
    }

    let action = entry.action;
    if let Err(e) = record_activity(&state.db, entry).await {
        tracing::warn!(target: "AUDIT", action = action.as_str(), error = %e, "failed to write activity log");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::connection::test_pool;
    use serde_json::json;

    #[tokio::test]
    async fn metadata_is_redacted_before_storage() {
        let pool = test_pool().await;

        record_activity(
            &pool,
            ActivityEntry {
                company_id: None,
                employee_id: None,
                action: AuditAction::Login,
                description: "login attempt",
                metadata: Some(json!({ "username": "owner", "password": "Secret123" })),
            },
        )
        .await
        .unwrap();

        let (action, metadata): (String, Option<String>) =
            sqlx::query_as("SELECT action, metadata FROM activity_logs")
                .fetch_one(&pool)
                .await
                .unwrap();

        assert_eq!(action, "LOGIN");
        let metadata = metadata.unwrap();
        assert!(metadata.contains("owner"));
        assert!(!metadata.contains("Secret123"));
    }
}
