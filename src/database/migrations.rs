use sqlx::SqlitePool;

/// Run every schema migration (CREATE ... IF NOT EXISTS, safe to repeat).
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    // ═══════════════════════════════════════
    // TABLE: companies (tenant root)
    // ═══════════════════════════════════════
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS companies (
            id          INTEGER  PRIMARY KEY AUTOINCREMENT,
            name        TEXT     NOT NULL UNIQUE,
            email       TEXT,
            phone       TEXT,
            created_at  DATETIME DEFAULT CURRENT_TIMESTAMP
        )",
    )
    .execute(pool)
    .await?;

    // ═══════════════════════════════════════
    // TABLE: branches
    // ═══════════════════════════════════════
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS branches (
            id          INTEGER  PRIMARY KEY AUTOINCREMENT,
            company_id  INTEGER  NOT NULL REFERENCES companies(id) ON DELETE CASCADE,
            name        TEXT     NOT NULL,
            address     TEXT,
            phone       TEXT,
            created_at  DATETIME DEFAULT CURRENT_TIMESTAMP,
            UNIQUE (company_id, name)
        )",
    )
    .execute(pool)
    .await?;

    // ═══════════════════════════════════════
    // TABLE: employees
    // ═══════════════════════════════════════
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS employees (
            id              INTEGER  PRIMARY KEY AUTOINCREMENT,
            company_id      INTEGER  NOT NULL REFERENCES companies(id) ON DELETE CASCADE,
            branch_id       INTEGER  NOT NULL REFERENCES branches(id),
            name            TEXT     NOT NULL,
            username        TEXT     NOT NULL UNIQUE,
            password_hash   TEXT     NOT NULL,
            role            TEXT     NOT NULL CHECK(role IN ('OWNER', 'STAFF')),
            is_active       INTEGER  NOT NULL DEFAULT 1,
            created_at      DATETIME DEFAULT CURRENT_TIMESTAMP,
            created_by      INTEGER  REFERENCES employees(id) ON DELETE SET NULL,
            last_login_at   DATETIME
        )",
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_employees_company ON employees(company_id)")
        .execute(pool)
        .await?;

    // ═══════════════════════════════════════
    // TABLE: categories
    // ═══════════════════════════════════════
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS categories (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            company_id  INTEGER NOT NULL REFERENCES companies(id) ON DELETE CASCADE,
            name        TEXT    NOT NULL,
            UNIQUE (company_id, name)
        )",
    )
    .execute(pool)
    .await?;

    // ═══════════════════════════════════════
    // TABLE: products
    // ═══════════════════════════════════════
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS products (
            id          INTEGER  PRIMARY KEY AUTOINCREMENT,
            company_id  INTEGER  NOT NULL REFERENCES companies(id) ON DELETE CASCADE,
            category_id INTEGER  REFERENCES categories(id) ON DELETE SET NULL,
            name        TEXT     NOT NULL,
            description TEXT,
            image       TEXT,
            is_active   INTEGER  NOT NULL DEFAULT 1,
            created_at  DATETIME DEFAULT CURRENT_TIMESTAMP,
            updated_at  DATETIME DEFAULT CURRENT_TIMESTAMP
        )",
    )
    .execute(pool)
    .await?;

    // Names are unique among a company's active products only
    sqlx::query(
        "CREATE UNIQUE INDEX IF NOT EXISTS idx_products_name_active
         ON products(company_id, name) WHERE is_active = 1",
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_products_company ON products(company_id)")
        .execute(pool)
        .await?;

    // ═══════════════════════════════════════
    // TABLE: variants
    // ═══════════════════════════════════════
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS variants (
            id              INTEGER  PRIMARY KEY AUTOINCREMENT,
            product_id      INTEGER  NOT NULL REFERENCES products(id) ON DELETE CASCADE,
            label           TEXT     NOT NULL,
            measuring_unit  TEXT     NOT NULL,
            cost            REAL     NOT NULL CHECK(cost >= 0),
            discounted_cost REAL     CHECK(discounted_cost IS NULL OR discounted_cost >= 0),
            stock           INTEGER  CHECK(stock IS NULL OR stock >= 0),
            created_at      DATETIME DEFAULT CURRENT_TIMESTAMP,
            updated_at      DATETIME DEFAULT CURRENT_TIMESTAMP
        )",
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_variants_product ON variants(product_id)")
        .execute(pool)
        .await?;

    // ═══════════════════════════════════════
    // TABLE: orders
    // ═══════════════════════════════════════
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS orders (
            id                  INTEGER  PRIMARY KEY AUTOINCREMENT,
            company_id          INTEGER  NOT NULL REFERENCES companies(id),
            branch_id           INTEGER  NOT NULL REFERENCES branches(id),
            employee_id         INTEGER  NOT NULL REFERENCES employees(id),
            order_no            TEXT     NOT NULL,
            customer_contact    TEXT,
            total_order         REAL     NOT NULL CHECK(total_order >= 0),
            gst_charges         REAL     NOT NULL DEFAULT 0,
            additional_charges  REAL     NOT NULL DEFAULT 0,
            to_pay              REAL     NOT NULL,
            created_at          DATETIME DEFAULT CURRENT_TIMESTAMP,
            UNIQUE (company_id, order_no)
        )",
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_orders_created ON orders(company_id, created_at)")
        .execute(pool)
        .await?;

    // ═══════════════════════════════════════
    // TABLE: order_items (snapshot, never references live prices)
    // ═══════════════════════════════════════
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS order_items (
            id              INTEGER PRIMARY KEY AUTOINCREMENT,
            order_id        INTEGER NOT NULL REFERENCES orders(id) ON DELETE CASCADE,
            position        INTEGER NOT NULL,
            product_id      INTEGER NOT NULL,
            variant_id      INTEGER NOT NULL,
            item_count      INTEGER NOT NULL CHECK(item_count > 0),
            unit_cost       REAL    NOT NULL,
            product_name    TEXT    NOT NULL,
            measuring_unit  TEXT    NOT NULL,
            discounted_cost REAL,
            image           TEXT
        )",
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_order_items_order ON order_items(order_id)")
        .execute(pool)
        .await?;

    // ═══════════════════════════════════════
    // TABLE: payments (one per order)
    // ═══════════════════════════════════════
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS payments (
            id            INTEGER  PRIMARY KEY AUTOINCREMENT,
            order_id      INTEGER  NOT NULL UNIQUE REFERENCES orders(id) ON DELETE CASCADE,
            payment_type  TEXT     NOT NULL,
            amount        REAL     NOT NULL,
            created_at    DATETIME DEFAULT CURRENT_TIMESTAMP
        )",
    )
    .execute(pool)
    .await?;

    // ═══════════════════════════════════════
    // TABLE: stock_movements
    // ═══════════════════════════════════════
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS stock_movements (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            product_id  INTEGER NOT NULL REFERENCES products(id) ON DELETE CASCADE,
            variant_id  INTEGER NOT NULL REFERENCES variants(id) ON DELETE CASCADE,
            employee_id INTEGER NOT NULL REFERENCES employees(id),
            direction   TEXT    NOT NULL CHECK(direction IN ('IN', 'OUT')),
            quantity    INTEGER NOT NULL CHECK(quantity > 0),
            reason      TEXT    NOT NULL, -- 'SALE', 'RESTOCK', 'ADJUSTMENT'
            reference   TEXT,             -- order number or free-text note
            created_at  DATETIME DEFAULT CURRENT_TIMESTAMP
        )",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_stock_movements_product ON stock_movements(product_id)",
    )
    .execute(pool)
    .await?;

    // ═══════════════════════════════════════
    // TABLE: activity_logs (audit trail)
    // ═══════════════════════════════════════
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS activity_logs (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            company_id  INTEGER REFERENCES companies(id) ON DELETE CASCADE,
            employee_id INTEGER REFERENCES employees(id) ON DELETE SET NULL,
            action      TEXT    NOT NULL, -- 'LOGIN', 'PLACE_ORDER', 'RESTOCK', ...
            description TEXT    NOT NULL,
            metadata    TEXT,             -- JSON string for extra data
            created_at  DATETIME DEFAULT CURRENT_TIMESTAMP
        )",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_activity_logs_company ON activity_logs(company_id, created_at)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::database::connection::test_pool;

    #[tokio::test]
    async fn migrations_are_idempotent() {
        let pool = test_pool().await;
        super::run_migrations(&pool).await.unwrap();

        let tables: Vec<(String,)> = sqlx::query_as(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
        )
        .fetch_all(&pool)
        .await
        .unwrap();
        let names: Vec<&str> = tables.iter().map(|(n,)| n.as_str()).collect();

        for expected in [
            "activity_logs",
            "branches",
            "categories",
            "companies",
            "employees",
            "order_items",
            "orders",
            "payments",
            "products",
            "stock_movements",
            "variants",
        ] {
            assert!(names.contains(&expected), "missing table {expected}");
        }
    }

    #[tokio::test]
    async fn negative_stock_violates_check() {
        let pool = test_pool().await;
        sqlx::query("INSERT INTO companies (name) VALUES ('Acme')")
            .execute(&pool)
            .await
            .unwrap();
        sqlx::query("INSERT INTO products (company_id, name) VALUES (1, 'Rice')")
            .execute(&pool)
            .await
            .unwrap();

        let result = sqlx::query(
            "INSERT INTO variants (product_id, label, measuring_unit, cost, stock) VALUES (1, '1kg', 'kg', 10, -1)",
        )
        .execute(&pool)
        .await;
        assert!(result.is_err());
    }
}
