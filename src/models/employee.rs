use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "UPPERCASE")]
#[sqlx(rename_all = "UPPERCASE")]
pub enum Role {
    Owner,
    Staff,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Owner => "OWNER",
            Role::Staff => "STAFF",
        }
    }
}

/// Row as stored, for query_as only.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct DbEmployee {
    pub id: i64,
    pub company_id: i64,
    pub branch_id: i64,
    pub name: String,
    pub username: String,
    pub password_hash: String,
    pub role: Role,
    pub is_active: bool,
    pub created_at: Option<String>,
    pub created_by: Option<i64>,
    pub last_login_at: Option<String>,
}

/// What the API returns (no password_hash).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Employee {
    pub id: i64,
    pub branch_id: i64,
    pub name: String,
    pub username: String,
    pub role: Role,
    pub is_active: bool,
    pub created_at: Option<String>,
    pub last_login_at: Option<String>,
}

impl From<DbEmployee> for Employee {
    fn from(e: DbEmployee) -> Self {
        Self {
            id: e.id,
            branch_id: e.branch_id,
            name: e.name,
            username: e.username,
            role: e.role,
            is_active: e.is_active,
            created_at: e.created_at,
            last_login_at: e.last_login_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthEmployeeData {
    pub id: i64,
    pub company_id: i64,
    pub branch_id: i64,
    pub name: String,
    pub username: String,
    pub role: Role,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResult {
    pub employee: AuthEmployeeData,
    pub session_token: String,
    pub expires_at: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginPayload {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateEmployeePayload {
    pub name: String,
    pub username: String,
    pub password: String,
    /// Defaults to the creator's branch.
    pub branch_id: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateEmployeePayload {
    pub name: String,
    pub username: String,
    pub branch_id: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResetPasswordPayload {
    pub new_password: String,
}
