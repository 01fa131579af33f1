use std::sync::Arc;

use axum::extract::{Query, State};

use crate::auth::guard::OwnerSession;
use crate::errors::{ApiResponse, ApiResult};
use crate::models::activity::{ActivityLogWithEmployee, ActivityQuery};
use crate::AppState;

/// Company activity log, newest first (owner only)
pub async fn get_activity_logs(
    State(state): State<Arc<AppState>>,
    OwnerSession(session): OwnerSession,
    Query(query): Query<ActivityQuery>,
) -> ApiResult<Vec<ActivityLogWithEmployee>> {
    let limit = query.limit.unwrap_or(100).clamp(1, 1000);

    let logs = sqlx::query_as::<_, ActivityLogWithEmployee>(
        r#"
        SELECT al.id, al.employee_id, e.name AS employee_name, al.action,
               al.description, al.metadata, al.created_at
        FROM activity_logs al
        LEFT JOIN employees e ON al.employee_id = e.id
        WHERE al.company_id = ?
        ORDER BY al.created_at DESC, al.id DESC
        LIMIT ?
        "#,
    )
    .bind(session.company_id)
    .bind(limit)
    .fetch_all(&state.db)
    .await?;

    Ok(ApiResponse::ok(logs))
}
