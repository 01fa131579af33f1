//! Fixtures shared by the unit tests.

use sqlx::SqlitePool;

use crate::checkout::OrderContext;

pub struct Tenant {
    pub company_id: i64,
    pub branch_id: i64,
    pub employee_id: i64,
}

impl Tenant {
    pub fn context(&self) -> OrderContext {
        OrderContext {
            company_id: self.company_id,
            branch_id: self.branch_id,
            employee_id: self.employee_id,
        }
    }
}

/// Company with one branch and one owner (password hash is a placeholder).
pub async fn seed_tenant(pool: &SqlitePool, name: &str) -> Tenant {
    let company_id = sqlx::query("INSERT INTO companies (name) VALUES (?)")
        .bind(name)
        .execute(pool)
        .await
        .unwrap()
        .last_insert_rowid();

    let branch_id = sqlx::query("INSERT INTO branches (company_id, name) VALUES (?, 'Head Office')")
        .bind(company_id)
        .execute(pool)
        .await
        .unwrap()
        .last_insert_rowid();

    let employee_id = sqlx::query(
        "INSERT INTO employees (company_id, branch_id, name, username, password_hash, role)
         VALUES (?, ?, 'Owner', ?, 'x', 'OWNER')",
    )
    .bind(company_id)
    .bind(branch_id)
    .bind(format!("owner_{}", name.to_lowercase()))
    .execute(pool)
    .await
    .unwrap()
    .last_insert_rowid();

    Tenant {
        company_id,
        branch_id,
        employee_id,
    }
}

/// Product with a single variant. Returns (product_id, variant_id).
pub async fn seed_variant(
    pool: &SqlitePool,
    company_id: i64,
    name: &str,
    cost: f64,
    stock: Option<i64>,
) -> (i64, i64) {
    let product_id = sqlx::query("INSERT INTO products (company_id, name, image) VALUES (?, ?, ?)")
        .bind(company_id)
        .bind(name)
        .bind(format!("/img/{}.png", name.to_lowercase()))
        .execute(pool)
        .await
        .unwrap()
        .last_insert_rowid();

    let variant_id = sqlx::query(
        "INSERT INTO variants (product_id, label, measuring_unit, cost, stock) VALUES (?, 'Regular', 'pcs', ?, ?)",
    )
    .bind(product_id)
    .bind(cost)
    .bind(stock)
    .execute(pool)
    .await
    .unwrap()
    .last_insert_rowid();

    (product_id, variant_id)
}

pub async fn stock_of(pool: &SqlitePool, variant_id: i64) -> Option<i64> {
    let (stock,): (Option<i64>,) = sqlx::query_as("SELECT stock FROM variants WHERE id = ?")
        .bind(variant_id)
        .fetch_one(pool)
        .await
        .unwrap();
    stock
}

pub async fn count_rows(pool: &SqlitePool, table: &str) -> i64 {
    let (n,): (i64,) = sqlx::query_as(&format!("SELECT COUNT(*) FROM {}", table))
        .fetch_one(pool)
        .await
        .unwrap();
    n
}
