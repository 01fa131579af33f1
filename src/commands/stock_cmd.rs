use std::sync::Arc;

use axum::extract::{Path, Query, State};
use serde::Serialize;

use crate::audit::{record_activity, ActivityEntry, AuditAction};
use crate::auth::guard::{CurrentSession, OwnerSession};
use crate::errors::{ApiJson, ApiResponse, ApiResult};
use crate::inventory::{self, Direction, Movement, Reason};
use crate::models::activity::{StockHistoryQuery, StockMovementWithDetail};
use crate::models::product::{AdjustStockPayload, LowStockQuery, LowStockVariant, RestockPayload};
use crate::validation::{sanitize_string, validate_quantity};
use crate::AppState;

const DEFAULT_HISTORY_LIMIT: i64 = 100;
const MAX_HISTORY_LIMIT: i64 = 1000;

#[derive(Debug, Serialize)]
pub struct StockLevel {
    pub product_id: i64,
    pub variant_id: i64,
    pub stock: i64,
}

fn clean_notes(notes: &Option<String>) -> Option<String> {
    notes
        .as_deref()
        .map(sanitize_string)
        .filter(|n| !n.is_empty())
}

/// Receive goods into a variant (owner only)
pub async fn restock(
    State(state): State<Arc<AppState>>,
    OwnerSession(session): OwnerSession,
    Path((product_id, variant_id)): Path<(i64, i64)>,
    ApiJson(payload): ApiJson<RestockPayload>,
) -> ApiResult<StockLevel> {
    validate_quantity(payload.quantity, Some(1), None)?;
    let notes = clean_notes(&payload.notes);

    let mut tx = state.db.begin().await?;

    let stock = inventory::restock(
        &mut tx,
        session.company_id,
        product_id,
        variant_id,
        payload.quantity,
    )
    .await?;

    inventory::record_movement(
        &mut tx,
        Movement {
            product_id,
            variant_id,
            employee_id: session.employee_id,
            direction: Direction::In,
            quantity: payload.quantity,
            reason: Reason::Restock,
            reference: notes.as_deref(),
        },
    )
    .await?;

    if state.config.security.enable_audit_log {
        record_activity(
            &mut *tx,
            ActivityEntry {
                company_id: Some(session.company_id),
                employee_id: Some(session.employee_id),
                action: AuditAction::Restock,
                description: &format!(
                    "Restocked variant {} of product {} by {} (now {})",
                    variant_id, product_id, payload.quantity, stock
                ),
                metadata: None,
            },
        )
        .await?;
    }

    tx.commit().await?;

    Ok(ApiResponse::ok(StockLevel {
        product_id,
        variant_id,
        stock,
    }))
}

/// Correct the stock count up or down (owner only)
pub async fn adjust_stock(
    State(state): State<Arc<AppState>>,
    OwnerSession(session): OwnerSession,
    Path((product_id, variant_id)): Path<(i64, i64)>,
    ApiJson(payload): ApiJson<AdjustStockPayload>,
) -> ApiResult<StockLevel> {
    let notes = clean_notes(&payload.notes);

    let mut tx = state.db.begin().await?;

    let stock = inventory::adjust(
        &mut tx,
        session.company_id,
        product_id,
        variant_id,
        payload.delta,
    )
    .await?;

    inventory::record_movement(
        &mut tx,
        Movement {
            product_id,
            variant_id,
            employee_id: session.employee_id,
            direction: if payload.delta > 0 {
                Direction::In
            } else {
                Direction::Out
            },
            quantity: payload.delta.abs(),
            reason: Reason::Adjustment,
            reference: notes.as_deref(),
        },
    )
    .await?;

    if state.config.security.enable_audit_log {
        record_activity(
            &mut *tx,
            ActivityEntry {
                company_id: Some(session.company_id),
                employee_id: Some(session.employee_id),
                action: AuditAction::AdjustStock,
                description: &format!(
                    "Adjusted variant {} of product {} by {} (now {})",
                    variant_id, product_id, payload.delta, stock
                ),
                metadata: None,
            },
        )
        .await?;
    }

    tx.commit().await?;

    Ok(ApiResponse::ok(StockLevel {
        product_id,
        variant_id,
        stock,
    }))
}

/// Stock ledger, newest first (owner only)
pub async fn get_stock_history(
    State(state): State<Arc<AppState>>,
    OwnerSession(session): OwnerSession,
    Query(query): Query<StockHistoryQuery>,
) -> ApiResult<Vec<StockMovementWithDetail>> {
    let limit = query
        .limit
        .unwrap_or(DEFAULT_HISTORY_LIMIT)
        .clamp(1, MAX_HISTORY_LIMIT);

    let history =
        inventory::stock_history(&state.db, session.company_id, query.product_id, limit).await?;

    Ok(ApiResponse::ok(history))
}

/// Tracked variants at or below the threshold.
pub async fn get_low_stock(
    State(state): State<Arc<AppState>>,
    session: CurrentSession,
    Query(query): Query<LowStockQuery>,
) -> ApiResult<Vec<LowStockVariant>> {
    let threshold = query
        .threshold
        .unwrap_or(state.config.inventory.low_stock_threshold)
        .max(0);

    let rows = inventory::low_stock(&state.db, session.data.company_id, threshold).await?;

    Ok(ApiResponse::ok(rows))
}
