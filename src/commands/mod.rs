pub mod activity_cmd;
pub mod auth_cmd;
pub mod company_cmd;
pub mod employee_cmd;
pub mod order_cmd;
pub mod product_cmd;
pub mod stock_cmd;
pub mod system_cmd;
