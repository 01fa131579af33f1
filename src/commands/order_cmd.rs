use std::sync::Arc;

use axum::extract::{Path, Query, State};

use crate::audit::{record_activity, ActivityEntry, AuditAction};
use crate::auth::guard::CurrentSession;
use crate::checkout::{self, OrderContext};
use crate::errors::{ApiJson, ApiResponse, ApiResult, AppError};
use crate::models::employee::Role;
use crate::models::order::{
    OrderListQuery, OrderReceipt, OrderSummary, PaginatedOrders, PlaceOrderPayload,
};
use crate::AppState;

const PER_PAGE: i64 = 20;

/// Place an order: stock decrements, order, snapshot lines and payment commit together.
pub async fn place_order(
    State(state): State<Arc<AppState>>,
    session: CurrentSession,
    ApiJson(payload): ApiJson<PlaceOrderPayload>,
) -> ApiResult<OrderReceipt> {
    let ctx = OrderContext {
        company_id: session.data.company_id,
        branch_id: session.data.branch_id,
        employee_id: session.data.employee_id,
    };

    // Dropping the transaction on any error rolls back every decrement
    let mut tx = state.db.begin().await?;
    let receipt = checkout::place_order(&mut tx, &ctx, &payload).await?;

    if state.config.security.enable_audit_log {
        record_activity(
            &mut *tx,
            ActivityEntry {
                company_id: Some(ctx.company_id),
                employee_id: Some(ctx.employee_id),
                action: AuditAction::PlaceOrder,
                description: &format!(
                    "Order {} placed, total {:.2}",
                    receipt.order_no, receipt.total_order
                ),
                metadata: Some(serde_json::json!({
                    "order_no": receipt.order_no,
                    "lines": receipt.product_list.len(),
                    "to_pay": receipt.to_pay,
                    "payment_type": receipt.payment_type,
                })),
            },
        )
        .await?;
    }

    tx.commit().await?;

    tracing::info!(
        target: "ORDER",
        company_id = ctx.company_id,
        order_no = %receipt.order_no,
        lines = receipt.product_list.len(),
        total = receipt.total_order,
        "order placed"
    );

    Ok(ApiResponse::ok(receipt))
}

/// Orders of the company, newest first, 20 per page.
/// Staff only see their own branch.
pub async fn get_orders(
    State(state): State<Arc<AppState>>,
    session: CurrentSession,
    Query(query): Query<OrderListQuery>,
) -> ApiResult<PaginatedOrders> {
    let page = query.page.unwrap_or(1).clamp(1, i64::MAX / PER_PAGE);
    let offset = (page - 1) * PER_PAGE;

    if let Some(date) = &query.date {
        chrono::NaiveDate::parse_from_str(date, "%Y-%m-%d")
            .map_err(|_| AppError::Validation("date must be YYYY-MM-DD".into()))?;
    }

    let branch_filter = match session.data.role {
        Role::Owner => None,
        Role::Staff => Some(session.data.branch_id),
    };

    let mut where_clause = String::from(" WHERE o.company_id = ?");
    if branch_filter.is_some() {
        where_clause.push_str(" AND o.branch_id = ?");
    }
    if query.date.is_some() {
        where_clause.push_str(" AND DATE(o.created_at) = ?");
    }

    let count_sql = format!("SELECT COUNT(*) FROM orders o{}", where_clause);
    let mut count_query = sqlx::query_as::<_, (i64,)>(&count_sql).bind(session.data.company_id);
    if let Some(branch_id) = branch_filter {
        count_query = count_query.bind(branch_id);
    }
    if let Some(date) = &query.date {
        count_query = count_query.bind(date);
    }
    let (total,) = count_query.fetch_one(&state.db).await?;

    let list_sql = format!(
        "SELECT o.id, o.order_no, o.branch_id, o.employee_id, e.name AS employee_name,
                o.customer_contact, o.total_order, o.gst_charges, o.additional_charges,
                o.to_pay, pay.payment_type, o.created_at
         FROM orders o
         LEFT JOIN employees e ON e.id = o.employee_id
         LEFT JOIN payments pay ON pay.order_id = o.id
         {}
         ORDER BY o.created_at DESC, o.id DESC
         LIMIT ? OFFSET ?",
        where_clause
    );
    let mut list_query = sqlx::query_as::<_, OrderSummary>(&list_sql).bind(session.data.company_id);
    if let Some(branch_id) = branch_filter {
        list_query = list_query.bind(branch_id);
    }
    if let Some(date) = &query.date {
        list_query = list_query.bind(date);
    }
    let data = list_query
        .bind(PER_PAGE)
        .bind(offset)
        .fetch_all(&state.db)
        .await?;

    Ok(ApiResponse::ok(PaginatedOrders {
        data,
        total,
        page,
        per_page: PER_PAGE,
    }))
}

/// Receipt of a stored order.
pub async fn get_order(
    State(state): State<Arc<AppState>>,
    session: CurrentSession,
    Path(order_no): Path<String>,
) -> ApiResult<OrderReceipt> {
    let receipt = checkout::get_receipt(&state.db, session.data.company_id, &order_no).await?;
    Ok(ApiResponse::ok(receipt))
}
