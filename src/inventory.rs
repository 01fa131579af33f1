//! Stock bookkeeping for variants.
//!
//! Every change is a single conditional `UPDATE`, so the floor (`stock >= 0`) is
//! checked by the storage engine at write time rather than by a read followed by a
//! write. Callers pass the connection of an open transaction; the movement ledger
//! row is written on the same connection so both commit or roll back together.

use sqlx::{SqliteConnection, SqlitePool};

use crate::errors::{AppError, AppResult};
use crate::models::activity::StockMovementWithDetail;
use crate::models::product::LowStockVariant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    In,
    Out,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::In => "IN",
            Direction::Out => "OUT",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reason {
    Sale,
    Restock,
    Adjustment,
}

impl Reason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Reason::Sale => "SALE",
            Reason::Restock => "RESTOCK",
            Reason::Adjustment => "ADJUSTMENT",
        }
    }
}

pub struct Movement<'a> {
    pub product_id: i64,
    pub variant_id: i64,
    pub employee_id: i64,
    pub direction: Direction,
    pub quantity: i64,
    pub reason: Reason,
    pub reference: Option<&'a str>,
}

/// Append a row to the stock ledger.
pub async fn record_movement(conn: &mut SqliteConnection, m: Movement<'_>) -> AppResult<()> {
    sqlx::query(
        "INSERT INTO stock_movements (product_id, variant_id, employee_id, direction, quantity, reason, reference)
         VALUES (?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(m.product_id)
    .bind(m.variant_id)
    .bind(m.employee_id)
    .bind(m.direction.as_str())
    .bind(m.quantity)
    .bind(m.reason.as_str())
    .bind(m.reference)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Current stock of a variant owned by `company_id`.
/// `None` = no such variant, `Some(None)` = untracked.
pub async fn variant_stock(
    conn: &mut SqliteConnection,
    company_id: i64,
    product_id: i64,
    variant_id: i64,
) -> AppResult<Option<Option<i64>>> {
    let row: Option<(Option<i64>,)> = sqlx::query_as(
        "SELECT v.stock
         FROM variants v
         JOIN products p ON p.id = v.product_id
         WHERE v.id = ? AND v.product_id = ? AND p.company_id = ? AND p.is_active = 1",
    )
    .bind(variant_id)
    .bind(product_id)
    .bind(company_id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(row.map(|(stock,)| stock))
}

/// Take `count` units off a variant.
///
/// Untracked variants (`stock IS NULL`) always succeed and stay untracked.
/// Tracked variants are decremented only if enough stock remains; otherwise nothing
/// changes and `OutOfStock` names the product. Returns the remaining stock.
pub async fn take_stock(
    conn: &mut SqliteConnection,
    company_id: i64,
    product_id: i64,
    variant_id: i64,
    count: i64,
) -> AppResult<Option<i64>> {
    if count <= 0 {
        return Err(AppError::Validation(format!(
            "Item count must be positive, got {}",
            count
        )));
    }

    let affected = sqlx::query(
        "UPDATE variants
         SET stock = CASE WHEN stock IS NULL THEN NULL ELSE stock - ?1 END,
             updated_at = CURRENT_TIMESTAMP
         WHERE id = ?2 AND product_id = ?3
           AND (stock IS NULL OR stock >= ?1)
           AND EXISTS (
               SELECT 1 FROM products p
               WHERE p.id = variants.product_id AND p.company_id = ?4 AND p.is_active = 1
           )",
    )
    .bind(count)
    .bind(variant_id)
    .bind(product_id)
    .bind(company_id)
    .execute(&mut *conn)
    .await?
    .rows_affected();

    match variant_stock(conn, company_id, product_id, variant_id).await? {
        None => Err(AppError::UnknownVariant {
            product_id,
            variant_id,
        }),
        Some(_) if affected == 0 => Err(AppError::OutOfStock { product_id }),
        Some(remaining) => Ok(remaining),
    }
}

/// Add `quantity` units. An untracked variant starts tracking at `quantity`.
/// Returns the new stock.
pub async fn restock(
    conn: &mut SqliteConnection,
    company_id: i64,
    product_id: i64,
    variant_id: i64,
    quantity: i64,
) -> AppResult<i64> {
    if quantity <= 0 {
        return Err(AppError::Validation("Restock quantity must be positive".into()));
    }

    let affected = sqlx::query(
        "UPDATE variants
         SET stock = COALESCE(stock, 0) + ?1, updated_at = CURRENT_TIMESTAMP
         WHERE id = ?2 AND product_id = ?3
           AND EXISTS (
               SELECT 1 FROM products p
               WHERE p.id = variants.product_id AND p.company_id = ?4
           )",
    )
    .bind(quantity)
    .bind(variant_id)
    .bind(product_id)
    .bind(company_id)
    .execute(&mut *conn)
    .await?
    .rows_affected();

    if affected == 0 {
        return Err(AppError::NotFound(format!(
            "Variant {} of product {}",
            variant_id, product_id
        )));
    }

    let (stock,): (i64,) = sqlx::query_as("SELECT stock FROM variants WHERE id = ?")
        .bind(variant_id)
        .fetch_one(&mut *conn)
        .await?;

    Ok(stock)
}

/// Correct tracked stock by `delta` (either sign). The result may not go below zero.
/// Returns the new stock.
pub async fn adjust(
    conn: &mut SqliteConnection,
    company_id: i64,
    product_id: i64,
    variant_id: i64,
    delta: i64,
) -> AppResult<i64> {
    if delta == 0 {
        return Err(AppError::Validation("Adjustment must be non-zero".into()));
    }

    let affected = sqlx::query(
        "UPDATE variants
         SET stock = stock + ?1, updated_at = CURRENT_TIMESTAMP
         WHERE id = ?2 AND product_id = ?3
           AND stock IS NOT NULL AND stock + ?1 >= 0
           AND EXISTS (
               SELECT 1 FROM products p
               WHERE p.id = variants.product_id AND p.company_id = ?4
           )",
    )
    .bind(delta)
    .bind(variant_id)
    .bind(product_id)
    .bind(company_id)
    .execute(&mut *conn)
    .await?
    .rows_affected();

    if affected == 0 {
        let current: Option<(Option<i64>,)> = sqlx::query_as(
            "SELECT v.stock FROM variants v JOIN products p ON p.id = v.product_id
             WHERE v.id = ? AND v.product_id = ? AND p.company_id = ?",
        )
        .bind(variant_id)
        .bind(product_id)
        .bind(company_id)
        .fetch_optional(&mut *conn)
        .await?;

        return Err(match current {
            None => AppError::NotFound(format!(
                "Variant {} of product {}",
                variant_id, product_id
            )),
            Some((None,)) => AppError::Validation(
                "Variant is not stock-tracked; restock it to start tracking".into(),
            ),
            Some((Some(stock),)) => AppError::Validation(format!(
                "Stock cannot go below zero (current {}, change {})",
                stock, delta
            )),
        });
    }

    let (stock,): (i64,) = sqlx::query_as("SELECT stock FROM variants WHERE id = ?")
        .bind(variant_id)
        .fetch_one(&mut *conn)
        .await?;

    Ok(stock)
}

/// Ledger rows of a company, newest first.
pub async fn stock_history(
    pool: &SqlitePool,
    company_id: i64,
    product_id: Option<i64>,
    limit: i64,
) -> AppResult<Vec<StockMovementWithDetail>> {
    let mut query = r#"
        SELECT sm.id, sm.product_id, p.name AS product_name, sm.variant_id,
               sm.employee_id, e.name AS employee_name, sm.direction, sm.quantity,
               sm.reason, sm.reference, sm.created_at
        FROM stock_movements sm
        JOIN products p ON sm.product_id = p.id
        JOIN employees e ON sm.employee_id = e.id
        WHERE p.company_id = ?
    "#
    .to_string();

    if product_id.is_some() {
        query.push_str(" AND sm.product_id = ?");
    }

    query.push_str(" ORDER BY sm.id DESC LIMIT ?");

    let mut sql_query = sqlx::query_as::<_, StockMovementWithDetail>(&query).bind(company_id);

    if let Some(id) = product_id {
        sql_query = sql_query.bind(id);
    }

    let history = sql_query.bind(limit).fetch_all(pool).await?;

    Ok(history)
}

/// Tracked variants of active products at or below `threshold`, lowest first.
pub async fn low_stock(
    pool: &SqlitePool,
    company_id: i64,
    threshold: i64,
) -> AppResult<Vec<LowStockVariant>> {
    let rows = sqlx::query_as::<_, LowStockVariant>(
        "SELECT p.id AS product_id, p.name AS product_name, v.id AS variant_id,
                v.label, v.measuring_unit, v.stock
         FROM variants v
         JOIN products p ON p.id = v.product_id
         WHERE p.company_id = ? AND p.is_active = 1
           AND v.stock IS NOT NULL AND v.stock <= ?
         ORDER BY v.stock ASC, p.name ASC",
    )
    .bind(company_id)
    .bind(threshold)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
