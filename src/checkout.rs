//! Order placement.
//!
//! `place_order` runs on the connection of a transaction owned by the caller. It
//! either returns a receipt, after which the caller commits, or an error, after
//! which the caller drops the transaction and every stock decrement, order row and
//! payment row written here is rolled back.

use sqlx::{SqliteConnection, SqlitePool};

use crate::errors::{AppError, AppResult};
use crate::inventory::{self, Direction, Movement, Reason};
use crate::models::order::{ItemSnapshot, LineItem, OrderReceipt, PlaceOrderPayload};
use crate::validation;

/// Tenant and actor the order is placed for, taken from the session.
#[derive(Debug, Clone, Copy)]
pub struct OrderContext {
    pub company_id: i64,
    pub branch_id: i64,
    pub employee_id: i64,
}

/// Payload checks that need no database access.
pub fn validate_order(payload: &PlaceOrderPayload) -> AppResult<()> {
    validation::validate_order_no(&payload.order_no)?;

    let counts: Vec<i64> = payload.line_items.iter().map(|i| i.item_count).collect();
    validation::validate_line_item_counts(&counts)?;

    validation::validate_amount("gst_charges", payload.gst_charges, None, None)?;
    validation::validate_amount("additional_charges", payload.additional_charges, None, None)?;
    validation::validate_amount("to_pay", payload.to_pay, None, None)?;

    if let Some(contact) = &payload.customer_contact {
        if contact.len() > 100 {
            return Err(AppError::Validation(
                "Customer contact too long (max 100 characters)".into(),
            ));
        }
    }

    if let Some(payment_type) = &payload.payment_type {
        if payment_type.trim().is_empty() || payment_type.len() > 30 {
            return Err(AppError::Validation(
                "Payment type must be 1-30 characters".into(),
            ));
        }
    }

    Ok(())
}

/// Round to cents. Catalog prices carry at most two decimals, so this only drops float noise.
fn round_money(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}

pub fn order_total(snapshots: &[ItemSnapshot]) -> f64 {
    round_money(snapshots.iter().map(ItemSnapshot::line_total).sum())
}

/// Copy price and display fields of a variant at order time.
async fn snapshot(
    conn: &mut SqliteConnection,
    company_id: i64,
    item: &LineItem,
) -> AppResult<ItemSnapshot> {
    sqlx::query_as::<_, ItemSnapshot>(
        "SELECT v.product_id, v.id AS variant_id, ? AS item_count, v.cost AS unit_cost,
                p.name AS product_name, v.measuring_unit, v.discounted_cost, p.image
         FROM variants v
         JOIN products p ON p.id = v.product_id
         WHERE v.id = ? AND v.product_id = ? AND p.company_id = ?",
    )
    .bind(item.item_count)
    .bind(item.variant_id)
    .bind(item.product_id)
    .bind(company_id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or(AppError::UnknownVariant {
        product_id: item.product_id,
        variant_id: item.variant_id,
    })
}

/// Validate, decrement stock for every line, persist the order with its snapshot
/// lines and the optional payment, and return the receipt.
pub async fn place_order(
    conn: &mut SqliteConnection,
    ctx: &OrderContext,
    payload: &PlaceOrderPayload,
) -> AppResult<OrderReceipt> {
    validate_order(payload)?;

    // 1. Resolve every line item in input order
    let mut snapshots = Vec::with_capacity(payload.line_items.len());
    for item in &payload.line_items {
        let remaining = inventory::take_stock(
            conn,
            ctx.company_id,
            item.product_id,
            item.variant_id,
            item.item_count,
        )
        .await?;

        if remaining.is_some() {
            inventory::record_movement(
                conn,
                Movement {
                    product_id: item.product_id,
                    variant_id: item.variant_id,
                    employee_id: ctx.employee_id,
                    direction: Direction::Out,
                    quantity: item.item_count,
                    reason: Reason::Sale,
                    reference: Some(&payload.order_no),
                },
            )
            .await?;
        }

        snapshots.push(snapshot(conn, ctx.company_id, item).await?);
    }

    // 2. Total from the captured unit costs
    let total_order = order_total(&snapshots);

    // 3. Order row
    let inserted = sqlx::query(
        "INSERT INTO orders (
            company_id, branch_id, employee_id, order_no, customer_contact,
            total_order, gst_charges, additional_charges, to_pay
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(ctx.company_id)
    .bind(ctx.branch_id)
    .bind(ctx.employee_id)
    .bind(&payload.order_no)
    .bind(&payload.customer_contact)
    .bind(total_order)
    .bind(payload.gst_charges)
    .bind(payload.additional_charges)
    .bind(payload.to_pay)
    .execute(&mut *conn)
    .await;

    let order_id = match inserted {
        Ok(res) => res.last_insert_rowid(),
        Err(sqlx::Error::Database(err)) if err.is_unique_violation() => {
            return Err(AppError::DuplicateOrder(payload.order_no.clone()));
        }
        Err(e) => return Err(e.into()),
    };

    for (position, snap) in snapshots.iter().enumerate() {
        sqlx::query(
            "INSERT INTO order_items (
                order_id, position, product_id, variant_id, item_count, unit_cost,
                product_name, measuring_unit, discounted_cost, image
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(order_id)
        .bind(position as i64)
        .bind(snap.product_id)
        .bind(snap.variant_id)
        .bind(snap.item_count)
        .bind(snap.unit_cost)
        .bind(&snap.product_name)
        .bind(&snap.measuring_unit)
        .bind(snap.discounted_cost)
        .bind(&snap.image)
        .execute(&mut *conn)
        .await?;
    }

    // 4. Payment row
    let payment_type = payload.payment_type.as_ref().map(|p| p.trim().to_uppercase());
    if let Some(payment_type) = &payment_type {
        sqlx::query("INSERT INTO payments (order_id, payment_type, amount) VALUES (?, ?, ?)")
            .bind(order_id)
            .bind(payment_type)
            .bind(payload.to_pay)
            .execute(&mut *conn)
            .await?;
    }

    // 5. Receipt
    Ok(OrderReceipt {
        order_no: payload.order_no.clone(),
        product_list: snapshots,
        total_order,
        gst_charges: payload.gst_charges,
        additional_charges: payload.additional_charges,
        to_pay: payload.to_pay,
        payment_type,
    })
}

#[derive(sqlx::FromRow)]
struct StoredOrder {
    id: i64,
    order_no: String,
    total_order: f64,
    gst_charges: f64,
    additional_charges: f64,
    to_pay: f64,
    payment_type: Option<String>,
}

/// Rebuild a receipt from the persisted order, its snapshot lines and payment.
pub async fn get_receipt(
    pool: &SqlitePool,
    company_id: i64,
    order_no: &str,
) -> AppResult<OrderReceipt> {
    let order = sqlx::query_as::<_, StoredOrder>(
        "SELECT o.id, o.order_no, o.total_order, o.gst_charges, o.additional_charges,
                o.to_pay, pay.payment_type
         FROM orders o
         LEFT JOIN payments pay ON pay.order_id = o.id
         WHERE o.company_id = ? AND o.order_no = ?",
    )
    .bind(company_id)
    .bind(order_no)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Order {}", order_no)))?;

    let product_list = sqlx::query_as::<_, ItemSnapshot>(
        "SELECT product_id, variant_id, item_count, unit_cost, product_name,
                measuring_unit, discounted_cost, image
         FROM order_items
         WHERE order_id = ?
         ORDER BY position ASC",
    )
    .bind(order.id)
    .fetch_all(pool)
    .await?;

    Ok(OrderReceipt {
        order_no: order.order_no,
        product_list,
        total_order: order.total_order,
        gst_charges: order.gst_charges,
        additional_charges: order.additional_charges,
        to_pay: order.to_pay,
        payment_type: order.payment_type,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DatabaseConfig;
    use crate::database::connection::{init_db, test_pool};
    use crate::test_support::{count_rows, seed_tenant, seed_variant, stock_of};

    fn payload(order_no: &str, items: &[(i64, i64, i64)]) -> PlaceOrderPayload {
        PlaceOrderPayload {
            order_no: order_no.to_string(),
            customer_contact: Some("+62 812 0000 1111".into()),
            line_items: items
                .iter()
                .map(|&(product_id, variant_id, item_count)| LineItem {
                    product_id,
                    variant_id,
                    item_count,
                })
                .collect(),
            gst_charges: 16.5,
            additional_charges: 2.0,
            to_pay: 168.5,
            payment_type: Some("cash".into()),
        }
    }

    async fn place(pool: &SqlitePool, ctx: &OrderContext, p: &PlaceOrderPayload) -> AppResult<OrderReceipt> {
        let mut tx = pool.begin().await?;
        match place_order(&mut tx, ctx, p).await {
            Ok(receipt) => {
                tx.commit().await?;
                Ok(receipt)
            }
            Err(e) => {
                tx.rollback().await?;
                Err(e)
            }
        }
    }

    #[tokio::test]
    async fn places_order_and_decrements_stock() {
        let pool = test_pool().await;
        let tenant = seed_tenant(&pool, "Acme").await;
        let (product_id, variant_id) = seed_variant(&pool, tenant.company_id, "Rice", 50.0, Some(10)).await;

        let receipt = place(&pool, &tenant.context(), &payload("A-1", &[(product_id, variant_id, 3)]))
            .await
            .unwrap();

        assert_eq!(receipt.order_no, "A-1");
        assert_eq!(receipt.total_order, 150.0);
        assert_eq!(receipt.product_list.len(), 1);
        assert_eq!(receipt.product_list[0].unit_cost, 50.0);
        assert_eq!(receipt.product_list[0].product_name, "Rice");
        assert_eq!(receipt.product_list[0].image.as_deref(), Some("/img/rice.png"));
        assert_eq!(receipt.payment_type.as_deref(), Some("CASH"));

        assert_eq!(stock_of(&pool, variant_id).await, Some(7));
        assert_eq!(count_rows(&pool, "orders").await, 1);
        assert_eq!(count_rows(&pool, "order_items").await, 1);
        assert_eq!(count_rows(&pool, "payments").await, 1);
        assert_eq!(count_rows(&pool, "stock_movements").await, 1);
    }

    #[tokio::test]
    async fn total_sums_every_line() {
        let pool = test_pool().await;
        let tenant = seed_tenant(&pool, "Acme").await;
        let (rice, rice_v) = seed_variant(&pool, tenant.company_id, "Rice", 50.0, Some(10)).await;
        let (tea, tea_v) = seed_variant(&pool, tenant.company_id, "Tea", 12.25, None).await;

        let receipt = place(
            &pool,
            &tenant.context(),
            &payload("A-2", &[(rice, rice_v, 2), (tea, tea_v, 4)]),
        )
        .await
        .unwrap();

        assert_eq!(receipt.total_order, 149.0);
        assert_eq!(receipt.product_list[0].product_id, rice);
        assert_eq!(receipt.product_list[1].product_id, tea);
        assert_eq!(stock_of(&pool, tea_v).await, None);
        // untracked lines write no ledger rows
        assert_eq!(count_rows(&pool, "stock_movements").await, 1);
    }

    #[tokio::test]
    async fn out_of_stock_rolls_back_every_line() {
        let pool = test_pool().await;
        let tenant = seed_tenant(&pool, "Acme").await;
        let (rice, rice_v) = seed_variant(&pool, tenant.company_id, "Rice", 50.0, Some(10)).await;
        let (sugar, sugar_v) = seed_variant(&pool, tenant.company_id, "Sugar", 20.0, Some(2)).await;

        let err = place(
            &pool,
            &tenant.context(),
            &payload("A-3", &[(rice, rice_v, 4), (sugar, sugar_v, 5)]),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, AppError::OutOfStock { product_id } if product_id == sugar));
        assert_eq!(stock_of(&pool, rice_v).await, Some(10));
        assert_eq!(stock_of(&pool, sugar_v).await, Some(2));
        assert_eq!(count_rows(&pool, "orders").await, 0);
        assert_eq!(count_rows(&pool, "payments").await, 0);
        assert_eq!(count_rows(&pool, "stock_movements").await, 0);
    }

    #[tokio::test]
    async fn unknown_variant_rolls_back_every_line() {
        let pool = test_pool().await;
        let tenant = seed_tenant(&pool, "Acme").await;
        let (rice, rice_v) = seed_variant(&pool, tenant.company_id, "Rice", 50.0, Some(10)).await;

        let err = place(
            &pool,
            &tenant.context(),
            &payload("A-4", &[(rice, rice_v, 1), (rice, rice_v + 100, 1)]),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, AppError::UnknownVariant { .. }));
        assert_eq!(stock_of(&pool, rice_v).await, Some(10));
        assert_eq!(count_rows(&pool, "orders").await, 0);
        assert_eq!(count_rows(&pool, "payments").await, 0);
    }

    #[tokio::test]
    async fn duplicate_order_number_is_rejected() {
        let pool = test_pool().await;
        let tenant = seed_tenant(&pool, "Acme").await;
        let (rice, rice_v) = seed_variant(&pool, tenant.company_id, "Rice", 50.0, Some(10)).await;

        place(&pool, &tenant.context(), &payload("A-5", &[(rice, rice_v, 1)]))
            .await
            .unwrap();
        let err = place(&pool, &tenant.context(), &payload("A-5", &[(rice, rice_v, 1)]))
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::DuplicateOrder(ref no) if no == "A-5"));
        assert_eq!(stock_of(&pool, rice_v).await, Some(9));
        assert_eq!(count_rows(&pool, "orders").await, 1);
        assert_eq!(count_rows(&pool, "payments").await, 1);
    }

    #[tokio::test]
    async fn same_order_number_is_allowed_for_another_company() {
        let pool = test_pool().await;
        let acme = seed_tenant(&pool, "Acme").await;
        let globex = seed_tenant(&pool, "Globex").await;
        let (a, a_v) = seed_variant(&pool, acme.company_id, "Rice", 50.0, Some(10)).await;
        let (g, g_v) = seed_variant(&pool, globex.company_id, "Rice", 40.0, Some(10)).await;

        place(&pool, &acme.context(), &payload("1001", &[(a, a_v, 1)]))
            .await
            .unwrap();
        place(&pool, &globex.context(), &payload("1001", &[(g, g_v, 1)]))
            .await
            .unwrap();

        assert_eq!(count_rows(&pool, "orders").await, 2);
    }

    #[tokio::test]
    async fn payment_is_optional() {
        let pool = test_pool().await;
        let tenant = seed_tenant(&pool, "Acme").await;
        let (rice, rice_v) = seed_variant(&pool, tenant.company_id, "Rice", 50.0, Some(10)).await;

        let mut p = payload("A-6", &[(rice, rice_v, 1)]);
        p.payment_type = None;
        let receipt = place(&pool, &tenant.context(), &p).await.unwrap();

        assert!(receipt.payment_type.is_none());
        assert_eq!(count_rows(&pool, "orders").await, 1);
        assert_eq!(count_rows(&pool, "payments").await, 0);
    }

    #[tokio::test]
    async fn empty_and_non_positive_orders_are_rejected_before_writing() {
        let pool = test_pool().await;
        let tenant = seed_tenant(&pool, "Acme").await;
        let (rice, rice_v) = seed_variant(&pool, tenant.company_id, "Rice", 50.0, Some(10)).await;

        let err = place(&pool, &tenant.context(), &payload("A-7", &[])).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let err = place(&pool, &tenant.context(), &payload("A-8", &[(rice, rice_v, 0)]))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let err = place(&pool, &tenant.context(), &payload("A-9", &[(rice, rice_v, -4)]))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        assert_eq!(stock_of(&pool, rice_v).await, Some(10));
        assert_eq!(count_rows(&pool, "orders").await, 0);
    }

    #[tokio::test]
    async fn receipt_survives_catalog_edits() {
        let pool = test_pool().await;
        let tenant = seed_tenant(&pool, "Acme").await;
        let (rice, rice_v) = seed_variant(&pool, tenant.company_id, "Rice", 50.0, Some(10)).await;

        let placed = place(&pool, &tenant.context(), &payload("A-10", &[(rice, rice_v, 2)]))
            .await
            .unwrap();

        sqlx::query("UPDATE variants SET cost = 99 WHERE id = ?")
            .bind(rice_v)
            .execute(&pool)
            .await
            .unwrap();
        sqlx::query("UPDATE products SET name = 'Premium Rice' WHERE id = ?")
            .bind(rice)
            .execute(&pool)
            .await
            .unwrap();

        let stored = get_receipt(&pool, tenant.company_id, "A-10").await.unwrap();
        assert_eq!(stored.product_list, placed.product_list);
        assert_eq!(stored.total_order, 100.0);
        assert_eq!(stored.payment_type.as_deref(), Some("CASH"));

        let err = get_receipt(&pool, tenant.company_id, "missing").await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn concurrent_orders_never_oversell() {
        let dir = tempfile::tempdir().unwrap();
        let config = DatabaseConfig {
            url: format!("sqlite:{}?mode=rwc", dir.path().join("orders.db").display()),
            max_connections: 4,
            min_connections: 1,
            connect_timeout_secs: 30,
            idle_timeout_secs: 600,
        };
        let pool = init_db(&config).await.unwrap();
        let tenant = seed_tenant(&pool, "Acme").await;
        let (rice, rice_v) = seed_variant(&pool, tenant.company_id, "Rice", 50.0, Some(5)).await;
        let ctx = tenant.context();

        let first = payload("C-1", &[(rice, rice_v, 3)]);
        let second = payload("C-2", &[(rice, rice_v, 3)]);
        let (a, b) = tokio::join!(place(&pool, &ctx, &first), place(&pool, &ctx, &second));

        let successes = [a.is_ok(), b.is_ok()].iter().filter(|ok| **ok).count();
        assert_eq!(successes, 1);
        for result in [a, b] {
            if let Err(e) = result {
                assert!(matches!(e, AppError::OutOfStock { .. }), "unexpected error: {e}");
            }
        }
        assert_eq!(stock_of(&pool, rice_v).await, Some(2));
        assert_eq!(count_rows(&pool, "orders").await, 1);
    }
}
