use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ActivityLogWithEmployee {
    pub id: i64,
    pub employee_id: Option<i64>,
    pub employee_name: Option<String>,
    pub action: String,
    pub description: String,
    pub metadata: Option<String>,
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct StockMovementWithDetail {
    pub id: i64,
    pub product_id: i64,
    pub product_name: String,
    pub variant_id: i64,
    pub employee_id: i64,
    pub employee_name: String,
    pub direction: String, // "IN" | "OUT"
    pub quantity: i64,
    pub reason: String,
    pub reference: Option<String>,
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ActivityQuery {
    pub limit: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StockHistoryQuery {
    pub product_id: Option<i64>,
    pub limit: Option<i64>,
}
