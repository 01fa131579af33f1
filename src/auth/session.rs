use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::models::employee::Role;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SessionData {
    pub employee_id: i64,
    pub company_id: i64,
    pub branch_id: i64,
    pub username: String,
    pub name: String,
    pub role: Role,
    pub login_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl SessionData {
    pub fn is_owner(&self) -> bool {
        self.role == Role::Owner
    }
}

/// Identity fields copied into a new session.
#[derive(Clone, Debug)]
pub struct SessionIdentity {
    pub employee_id: i64,
    pub company_id: i64,
    pub branch_id: i64,
    pub username: String,
    pub name: String,
    pub role: Role,
}

pub struct SessionStore {
    sessions: HashMap<String, SessionData>,
    ttl: Duration,
}

impl SessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: HashMap::new(),
            ttl,
        }
    }

    /// Creates a session and returns its token (UUID v4).
    pub fn create(&mut self, identity: SessionIdentity) -> String {
        self.purge_expired();

        let token = uuid::Uuid::new_v4().to_string();
        let now = Utc::now();
        self.sessions.insert(
            token.clone(),
            SessionData {
                employee_id: identity.employee_id,
                company_id: identity.company_id,
                branch_id: identity.branch_id,
                username: identity.username,
                name: identity.name,
                role: identity.role,
                login_at: now,
                expires_at: now + self.ttl,
            },
        );
        token
    }

    /// Validate a token: it must exist and not be expired.
    pub fn validate(&self, token: &str) -> Result<&SessionData, String> {
        match self.sessions.get(token) {
            None => Err("Invalid session, please log in again".into()),
            Some(s) if Utc::now() > s.expires_at => Err("Session expired, please log in again".into()),
            Some(s) => Ok(s),
        }
    }

    /// Drop a session (logout).
    pub fn destroy(&mut self, token: &str) {
        self.sessions.remove(token);
    }

    /// Drop every session of one employee (deactivation, password reset).
    pub fn destroy_for_employee(&mut self, employee_id: i64) {
        self.sessions.retain(|_, s| s.employee_id != employee_id);
    }

    fn purge_expired(&mut self) {
        let now = Utc::now();
        self.sessions.retain(|_, s| s.expires_at >= now);
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity(employee_id: i64, role: Role) -> SessionIdentity {
        SessionIdentity {
            employee_id,
            company_id: 1,
            branch_id: 1,
            username: format!("user{employee_id}"),
            name: "Test User".into(),
            role,
        }
    }

    #[test]
    fn create_validate_destroy() {
        let mut store = SessionStore::new(Duration::hours(8));
        let token = store.create(identity(1, Role::Staff));

        let session = store.validate(&token).unwrap();
        assert_eq!(session.employee_id, 1);
        assert!(!session.is_owner());

        store.destroy(&token);
        assert!(store.validate(&token).is_err());
    }

    #[test]
    fn owner_check() {
        let mut store = SessionStore::new(Duration::hours(8));
        let token = store.create(identity(2, Role::Owner));
        assert!(store.validate(&token).unwrap().is_owner());
    }

    #[test]
    fn expired_sessions_are_rejected_and_purged() {
        let mut store = SessionStore::new(Duration::seconds(-1));
        let token = store.create(identity(3, Role::Staff));
        assert!(store.validate(&token).unwrap_err().contains("expired"));

        store.create(identity(4, Role::Staff));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn destroy_for_employee_drops_all_tokens() {
        let mut store = SessionStore::new(Duration::hours(1));
        let a = store.create(identity(5, Role::Staff));
        let b = store.create(identity(5, Role::Staff));
        let c = store.create(identity(6, Role::Staff));

        store.destroy_for_employee(5);
        assert!(store.validate(&a).is_err());
        assert!(store.validate(&b).is_err());
        assert!(store.validate(&c).is_ok());
    }
}
