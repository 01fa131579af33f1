use serde::{Deserialize, Serialize};

use super::employee::AuthEmployeeData;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Company {
    pub id: i64,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Branch {
    pub id: i64,
    pub company_id: i64,
    pub name: String,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub created_at: Option<String>,
}

/// Branch with its employee headcount.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct BranchWithCount {
    pub id: i64,
    pub name: String,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub employee_count: i64,
}

/// Public sign-up: company, its first branch and the owner account.
#[derive(Debug, Clone, Deserialize)]
pub struct RegisterCompanyPayload {
    pub company_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub branch_name: Option<String>,
    pub branch_address: Option<String>,
    pub owner_name: String,
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterCompanyResult {
    pub company: Company,
    pub branch: Branch,
    pub owner: AuthEmployeeData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateBranchPayload {
    pub name: String,
    pub address: Option<String>,
    pub phone: Option<String>,
}
