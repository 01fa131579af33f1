use std::sync::Arc;

use axum::extract::{Path, Query, State};
use sqlx::SqliteConnection;

use crate::audit::{log_activity, ActivityEntry, AuditAction};
use crate::auth::guard::{CurrentSession, OwnerSession};
use crate::errors::{ApiJson, ApiResponse, ApiResult, AppError, AppResult};
use crate::inventory::{self, Direction, Movement, Reason};
use crate::models::product::{
    Category, CategoryWithCount, CreateCategoryPayload, CreateProductPayload, Product,
    ProductDetail, ProductQuery, ProductWithCategory, UpdateProductPayload, UpdateVariantPayload,
    Variant, VariantPayload,
};
use crate::validation::{
    sanitize_string, validate_amount, validate_cents, validate_measuring_unit, validate_product_name,
    validate_quantity,
};
use crate::AppState;

fn check_variant_fields(
    label: &str,
    measuring_unit: &str,
    cost: f64,
    discounted_cost: Option<f64>,
) -> AppResult<()> {
    let label = label.trim();
    if label.is_empty() || label.chars().count() > 50 {
        return Err(AppError::Validation(
            "Variant label must be 1-50 characters".into(),
        ));
    }
    validate_measuring_unit(measuring_unit)?;
    validate_amount("cost", cost, None, None)?;
    validate_cents("cost", cost)?;
    if let Some(discounted) = discounted_cost {
        validate_amount("discounted_cost", discounted, None, Some(cost))?;
        validate_cents("discounted_cost", discounted)?;
    }
    Ok(())
}

fn check_variant_payload(v: &VariantPayload) -> AppResult<()> {
    check_variant_fields(&v.label, &v.measuring_unit, v.cost, v.discounted_cost)?;
    if let Some(stock) = v.stock {
        validate_quantity(stock, Some(0), None)?;
    }
    Ok(())
}

/// Category must belong to the caller's company.
async fn ensure_category(state: &AppState, company_id: i64, category_id: Option<i64>) -> AppResult<()> {
    let Some(category_id) = category_id else {
        return Ok(());
    };

    let found: Option<(i64,)> =
        sqlx::query_as("SELECT id FROM categories WHERE id = ? AND company_id = ?")
            .bind(category_id)
            .bind(company_id)
            .fetch_optional(&state.db)
            .await?;

    found
        .map(|_| ())
        .ok_or_else(|| AppError::NotFound(format!("Category {}", category_id)))
}

/// Insert one variant on an open transaction. Initial stock goes to the ledger as a restock.
async fn insert_variant(
    conn: &mut SqliteConnection,
    product_id: i64,
    employee_id: i64,
    v: &VariantPayload,
) -> AppResult<i64> {
    let variant_id = sqlx::query(
        "INSERT INTO variants (product_id, label, measuring_unit, cost, discounted_cost, stock)
         VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(product_id)
    .bind(v.label.trim())
    .bind(v.measuring_unit.trim())
    .bind(v.cost)
    .bind(v.discounted_cost)
    .bind(v.stock)
    .execute(&mut *conn)
    .await?
    .last_insert_rowid();

    if let Some(stock) = v.stock.filter(|s| *s > 0) {
        inventory::record_movement(
            conn,
            Movement {
                product_id,
                variant_id,
                employee_id,
                direction: Direction::In,
                quantity: stock,
                reason: Reason::Restock,
                reference: Some("Initial stock"),
            },
        )
        .await?;
    }

    Ok(variant_id)
}

async fn load_detail(state: &AppState, company_id: i64, product_id: i64) -> AppResult<ProductDetail> {
    let product = sqlx::query_as::<_, Product>(
        "SELECT * FROM products WHERE id = ? AND company_id = ?",
    )
    .bind(product_id)
    .bind(company_id)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Product {}", product_id)))?;

    let category_name: Option<(String,)> = match product.category_id {
        Some(category_id) => {
            sqlx::query_as("SELECT name FROM categories WHERE id = ?")
                .bind(category_id)
                .fetch_optional(&state.db)
                .await?
        }
        None => None,
    };

    let variants = sqlx::query_as::<_, Variant>(
        "SELECT * FROM variants WHERE product_id = ? ORDER BY id ASC",
    )
    .bind(product_id)
    .fetch_all(&state.db)
    .await?;

    Ok(ProductDetail {
        product,
        category_name: category_name.map(|(name,)| name),
        variants,
    })
}

/// Categories with the number of active products in each.
pub async fn get_categories(
    State(state): State<Arc<AppState>>,
    session: CurrentSession,
) -> ApiResult<Vec<CategoryWithCount>> {
    let counts = sqlx::query_as::<_, CategoryWithCount>(
        "SELECT c.id, c.name, COUNT(p.id) AS product_count
         FROM categories c
         LEFT JOIN products p ON p.category_id = c.id AND p.is_active = 1
         WHERE c.company_id = ?
         GROUP BY c.id
         ORDER BY c.name ASC",
    )
    .bind(session.data.company_id)
    .fetch_all(&state.db)
    .await?;

    Ok(ApiResponse::ok(counts))
}

/// Add a category (owner only)
pub async fn create_category(
    State(state): State<Arc<AppState>>,
    OwnerSession(session): OwnerSession,
    ApiJson(payload): ApiJson<CreateCategoryPayload>,
) -> ApiResult<Category> {
    let name = sanitize_string(&payload.name);
    if name.is_empty() || name.chars().count() > 100 {
        return Err(AppError::Validation(
            "Category name must be 1-100 characters".into(),
        ));
    }

    let result = sqlx::query("INSERT INTO categories (company_id, name) VALUES (?, ?)")
        .bind(session.company_id)
        .bind(&name)
        .execute(&state.db)
        .await;

    match result {
        Ok(res) => {
            log_activity(
                &state,
                ActivityEntry {
                    company_id: Some(session.company_id),
                    employee_id: Some(session.employee_id),
                    action: AuditAction::CreateCategory,
                    description: &format!("Created category {}", name),
                    metadata: None,
                },
            )
            .await;

            Ok(ApiResponse::ok(Category {
                id: res.last_insert_rowid(),
                name,
            }))
        }
        Err(sqlx::Error::Database(err)) if err.is_unique_violation() => {
            Err(AppError::Conflict(format!("Category '{}' already exists", name)))
        }
        Err(e) => Err(e.into()),
    }
}

/// Products of the company. Staff always see active products only;
/// owners see inactive ones too unless `show_inactive=false`.
pub async fn get_products(
    State(state): State<Arc<AppState>>,
    session: CurrentSession,
    Query(query): Query<ProductQuery>,
) -> ApiResult<Vec<ProductWithCategory>> {
    let active_only = if session.data.is_owner() {
        !query.show_inactive.unwrap_or(true)
    } else {
        true
    };

    let mut sql = String::from(
        "SELECT p.id, p.category_id, c.name AS category_name, p.name, p.description,
                p.image, p.is_active,
                (SELECT COUNT(*) FROM variants v WHERE v.product_id = p.id) AS variant_count
         FROM products p
         LEFT JOIN categories c ON c.id = p.category_id
         WHERE p.company_id = ?",
    );

    if active_only {
        sql.push_str(" AND p.is_active = 1");
    }
    if query.category_id.is_some() {
        sql.push_str(" AND p.category_id = ?");
    }

    let term = query
        .search
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| format!("%{}%", s.to_lowercase()));
    if term.is_some() {
        sql.push_str(" AND (LOWER(p.name) LIKE ? OR LOWER(COALESCE(p.description, '')) LIKE ?)");
    }

    sql.push_str(" ORDER BY p.name ASC");

    let mut q = sqlx::query_as::<_, ProductWithCategory>(&sql).bind(session.data.company_id);
    if let Some(category_id) = query.category_id {
        q = q.bind(category_id);
    }
    if let Some(term) = &term {
        q = q.bind(term).bind(term);
    }

    let products = q.fetch_all(&state.db).await?;
    Ok(ApiResponse::ok(products))
}

/// One product with its variants.
pub async fn get_product(
    State(state): State<Arc<AppState>>,
    session: CurrentSession,
    Path(id): Path<i64>,
) -> ApiResult<ProductDetail> {
    let detail = load_detail(&state, session.data.company_id, id).await?;

    if !detail.product.is_active && !session.data.is_owner() {
        return Err(AppError::NotFound(format!("Product {}", id)));
    }

    Ok(ApiResponse::ok(detail))
}

/// Create a product with its initial variants (owner only)
pub async fn create_product(
    State(state): State<Arc<AppState>>,
    OwnerSession(session): OwnerSession,
    ApiJson(payload): ApiJson<CreateProductPayload>,
) -> ApiResult<ProductDetail> {
    let name = sanitize_string(&payload.name);
    validate_product_name(&name)?;
    for v in &payload.variants {
        check_variant_payload(v)?;
    }
    ensure_category(&state, session.company_id, payload.category_id).await?;

    let mut tx = state.db.begin().await?;

    let product_id = match sqlx::query(
        "INSERT INTO products (company_id, category_id, name, description, image) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(session.company_id)
    .bind(payload.category_id)
    .bind(&name)
    .bind(&payload.description)
    .bind(&payload.image)
    .execute(&mut *tx)
    .await
    {
        Ok(res) => res.last_insert_rowid(),
        Err(sqlx::Error::Database(err)) if err.is_unique_violation() => {
            return Err(AppError::Conflict(format!("Product '{}' already exists", name)));
        }
        Err(e) => return Err(e.into()),
    };

    for v in &payload.variants {
        insert_variant(&mut tx, product_id, session.employee_id, v).await?;
    }

    tx.commit().await?;

    log_activity(
        &state,
        ActivityEntry {
            company_id: Some(session.company_id),
            employee_id: Some(session.employee_id),
            action: AuditAction::CreateProduct,
            description: &format!(
                "Created product {} with {} variant(s)",
                name,
                payload.variants.len()
            ),
            metadata: None,
        },
    )
    .await;

    let detail = load_detail(&state, session.company_id, product_id).await?;
    Ok(ApiResponse::ok(detail))
}

/// Update product fields (owner only)
pub async fn update_product(
    State(state): State<Arc<AppState>>,
    OwnerSession(session): OwnerSession,
    Path(id): Path<i64>,
    ApiJson(payload): ApiJson<UpdateProductPayload>,
) -> ApiResult<ProductDetail> {
    let name = sanitize_string(&payload.name);
    validate_product_name(&name)?;
    ensure_category(&state, session.company_id, payload.category_id).await?;

    let result = sqlx::query(
        "UPDATE products
         SET name = ?, description = ?, category_id = ?, image = ?, is_active = ?,
             updated_at = CURRENT_TIMESTAMP
         WHERE id = ? AND company_id = ?",
    )
    .bind(&name)
    .bind(&payload.description)
    .bind(payload.category_id)
    .bind(&payload.image)
    .bind(payload.is_active)
    .bind(id)
    .bind(session.company_id)
    .execute(&state.db)
    .await;

    match result {
        Ok(res) if res.rows_affected() == 0 => {
            return Err(AppError::NotFound(format!("Product {}", id)));
        }
        Ok(_) => {}
        Err(sqlx::Error::Database(err)) if err.is_unique_violation() => {
            return Err(AppError::Conflict(format!("Product '{}' already exists", name)));
        }
        Err(e) => return Err(e.into()),
    }

    log_activity(
        &state,
        ActivityEntry {
            company_id: Some(session.company_id),
            employee_id: Some(session.employee_id),
            action: AuditAction::UpdateProduct,
            description: &format!("Updated product {}: {}", id, name),
            metadata: None,
        },
    )
    .await;

    let detail = load_detail(&state, session.company_id, id).await?;
    Ok(ApiResponse::ok(detail))
}

/// Soft delete: the product stops being listed and orderable; past orders keep their snapshots.
pub async fn delete_product(
    State(state): State<Arc<AppState>>,
    OwnerSession(session): OwnerSession,
    Path(id): Path<i64>,
) -> ApiResult<()> {
    let affected = sqlx::query(
        "UPDATE products SET is_active = 0, updated_at = CURRENT_TIMESTAMP WHERE id = ? AND company_id = ?",
    )
    .bind(id)
    .bind(session.company_id)
    .execute(&state.db)
    .await?
    .rows_affected();

    if affected == 0 {
        return Err(AppError::NotFound(format!("Product {}", id)));
    }

    log_activity(
        &state,
        ActivityEntry {
            company_id: Some(session.company_id),
            employee_id: Some(session.employee_id),
            action: AuditAction::DeleteProduct,
            description: &format!("Deactivated product {}", id),
            metadata: None,
        },
    )
    .await;

    Ok(ApiResponse::ok(()))
}

/// Add a variant to an existing product (owner only)
pub async fn create_variant(
    State(state): State<Arc<AppState>>,
    OwnerSession(session): OwnerSession,
    Path(product_id): Path<i64>,
    ApiJson(payload): ApiJson<VariantPayload>,
) -> ApiResult<Variant> {
    check_variant_payload(&payload)?;

    let mut tx = state.db.begin().await?;

    let owned: Option<(i64,)> =
        sqlx::query_as("SELECT id FROM products WHERE id = ? AND company_id = ?")
            .bind(product_id)
            .bind(session.company_id)
            .fetch_optional(&mut *tx)
            .await?;
    if owned.is_none() {
        return Err(AppError::NotFound(format!("Product {}", product_id)));
    }

    let variant_id = insert_variant(&mut tx, product_id, session.employee_id, &payload).await?;

    let variant = sqlx::query_as::<_, Variant>("SELECT * FROM variants WHERE id = ?")
        .bind(variant_id)
        .fetch_one(&mut *tx)
        .await?;

    tx.commit().await?;

    log_activity(
        &state,
        ActivityEntry {
            company_id: Some(session.company_id),
            employee_id: Some(session.employee_id),
            action: AuditAction::CreateVariant,
            description: &format!("Added variant {} to product {}", variant.label, product_id),
            metadata: None,
        },
    )
    .await;

    Ok(ApiResponse::ok(variant))
}

/// Edit label, unit and prices of a variant (owner only). Stock is untouched.
pub async fn update_variant(
    State(state): State<Arc<AppState>>,
    OwnerSession(session): OwnerSession,
    Path((product_id, variant_id)): Path<(i64, i64)>,
    ApiJson(payload): ApiJson<UpdateVariantPayload>,
) -> ApiResult<Variant> {
    check_variant_fields(
        &payload.label,
        &payload.measuring_unit,
        payload.cost,
        payload.discounted_cost,
    )?;

    let affected = sqlx::query(
        "UPDATE variants
         SET label = ?, measuring_unit = ?, cost = ?, discounted_cost = ?,
             updated_at = CURRENT_TIMESTAMP
         WHERE id = ? AND product_id = ?
           AND EXISTS (SELECT 1 FROM products p WHERE p.id = ? AND p.company_id = ?)",
    )
    .bind(payload.label.trim())
    .bind(payload.measuring_unit.trim())
    .bind(payload.cost)
    .bind(payload.discounted_cost)
    .bind(variant_id)
    .bind(product_id)
    .bind(product_id)
    .bind(session.company_id)
    .execute(&state.db)
    .await?
    .rows_affected();

    if affected == 0 {
        return Err(AppError::NotFound(format!(
            "Variant {} of product {}",
            variant_id, product_id
        )));
    }

    log_activity(
        &state,
        ActivityEntry {
            company_id: Some(session.company_id),
            employee_id: Some(session.employee_id),
            action: AuditAction::UpdateVariant,
            description: &format!("Updated variant {} of product {}", variant_id, product_id),
            metadata: None,
        },
    )
    .await;

    let variant = sqlx::query_as::<_, Variant>("SELECT * FROM variants WHERE id = ?")
        .bind(variant_id)
        .fetch_one(&state.db)
        .await?;

    Ok(ApiResponse::ok(variant))
}
