use serde::{Deserialize, Deserializer, Serialize};

/// One (product, variant, count) tuple in an order request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineItem {
    pub product_id: i64,
    pub variant_id: i64,
    pub item_count: i64,
}

/// Payload for placing an order.
/// The caller computes the charges and the payable amount; the server computes `total_order`.
#[derive(Debug, Clone, Deserialize)]
pub struct PlaceOrderPayload {
    #[serde(deserialize_with = "string_or_number")]
    pub order_no: String,
    pub customer_contact: Option<String>,
    pub line_items: Vec<LineItem>,
    #[serde(default)]
    pub gst_charges: f64,
    #[serde(default)]
    pub additional_charges: f64,
    pub to_pay: f64,
    pub payment_type: Option<String>,
}

/// Price and display fields copied at order time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct ItemSnapshot {
    pub product_id: i64,
    pub variant_id: i64,
    pub item_count: i64,
    pub unit_cost: f64,
    pub product_name: String,
    pub measuring_unit: String,
    pub discounted_cost: Option<f64>,
    pub image: Option<String>,
}

impl ItemSnapshot {
    pub fn line_total(&self) -> f64 {
        self.unit_cost * self.item_count as f64
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderReceipt {
    pub order_no: String,
    pub product_list: Vec<ItemSnapshot>,
    pub total_order: f64,
    pub gst_charges: f64,
    pub additional_charges: f64,
    pub to_pay: f64,
    pub payment_type: Option<String>,
}

/// Order row joined with the payment and the employee who placed it.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct OrderSummary {
    pub id: i64,
    pub order_no: String,
    pub branch_id: i64,
    pub employee_id: i64,
    pub employee_name: Option<String>,
    pub customer_contact: Option<String>,
    pub total_order: f64,
    pub gst_charges: f64,
    pub additional_charges: f64,
    pub to_pay: f64,
    pub payment_type: Option<String>,
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginatedOrders {
    pub data: Vec<OrderSummary>,
    pub total: i64,
    pub page: i64,
    pub per_page: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OrderListQuery {
    pub page: Option<i64>,
    /// `YYYY-MM-DD`
    pub date: Option<String>,
}

/// Order numbers arrive as either JSON strings or integers.
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Int(i64),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Text(s) => s.trim().to_string(),
        Raw::Int(n) => n.to_string(),
    })
}
