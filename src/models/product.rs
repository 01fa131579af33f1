use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Product {
    pub id: i64,
    pub company_id: i64,
    pub category_id: Option<i64>,
    pub name: String,
    pub description: Option<String>,
    pub image: Option<String>,
    pub is_active: bool,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

/// Product with its category name (JOIN result).
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ProductWithCategory {
    pub id: i64,
    pub category_id: Option<i64>,
    pub category_name: Option<String>,
    pub name: String,
    pub description: Option<String>,
    pub image: Option<String>,
    pub is_active: bool,
    pub variant_count: i64,
}

/// A purchasable configuration of a product with its own price and stock.
/// `stock = None` means the variant is not stock-tracked.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Variant {
    pub id: i64,
    pub product_id: i64,
    pub label: String,
    pub measuring_unit: String,
    pub cost: f64,
    pub discounted_cost: Option<f64>,
    pub stock: Option<i64>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductDetail {
    pub product: Product,
    pub category_name: Option<String>,
    pub variants: Vec<Variant>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Category {
    pub id: i64,
    pub name: String,
}

/// Category with its product count.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct CategoryWithCount {
    pub id: i64,
    pub name: String,
    pub product_count: i64,
}

/// Tracked variant at or below the low-stock threshold.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct LowStockVariant {
    pub product_id: i64,
    pub product_name: String,
    pub variant_id: i64,
    pub label: String,
    pub measuring_unit: String,
    pub stock: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateCategoryPayload {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VariantPayload {
    pub label: String,
    pub measuring_unit: String,
    pub cost: f64,
    pub discounted_cost: Option<f64>,
    /// Initial stock; omit for an untracked variant.
    pub stock: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateProductPayload {
    pub name: String,
    pub description: Option<String>,
    pub category_id: Option<i64>,
    pub image: Option<String>,
    #[serde(default)]
    pub variants: Vec<VariantPayload>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateProductPayload {
    pub name: String,
    pub description: Option<String>,
    pub category_id: Option<i64>,
    pub image: Option<String>,
    pub is_active: bool,
}

/// Price and label edits; stock only moves through inventory operations.
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateVariantPayload {
    pub label: String,
    pub measuring_unit: String,
    pub cost: f64,
    pub discounted_cost: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProductQuery {
    pub search: Option<String>,
    pub category_id: Option<i64>,
    pub show_inactive: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RestockPayload {
    pub quantity: i64,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AdjustStockPayload {
    pub delta: i64,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LowStockQuery {
    pub threshold: Option<i64>,
}
