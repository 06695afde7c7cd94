use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Role::User),
            "admin" => Ok(Role::Admin),
            other => Err(format!("unknown role: {}", other)),
        }
    }
}

/// A registered account. Joined and created groups are derived from the
/// group collection, not stored here.
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    /// Always lowercase.
    pub email: String,
    pub contact_number: String,
    pub password_hash: String,
    pub role: Role,
    pub is_blocked: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn new(
        name: &str,
        email: &str,
        contact_number: &str,
        password_hash: String,
        role: Role,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: name.trim().to_string(),
            email: normalize_email(email),
            contact_number: contact_number.trim().to_string(),
            password_hash,
            role,
            is_blocked: false,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn set_blocked(&mut self, blocked: bool) {
        self.is_blocked = blocked;
        self.updated_at = Utc::now();
    }

    pub fn update_profile(&mut self, name: Option<&str>, contact_number: Option<&str>) {
        if let Some(name) = name {
            self.name = name.trim().to_string();
        }
        if let Some(contact) = contact_number {
            self.contact_number = contact.trim().to_string();
        }
        self.updated_at = Utc::now();
    }
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_user_normalizes_email_and_starts_unblocked() {
        let user = User::new(" Ada ", " Ada@Example.COM ", "555", "hash".into(), Role::User);
        assert_eq!(user.name, "Ada");
        assert_eq!(user.email, "ada@example.com");
        assert!(!user.is_blocked);
        assert!(!user.is_admin());
    }

    #[test]
    fn role_parses_from_its_wire_name() {
        assert_eq!("admin".parse::<Role>(), Ok(Role::Admin));
        assert_eq!(Role::User.to_string(), "user");
        assert!("root".parse::<Role>().is_err());
    }

    #[test]
    fn profile_update_keeps_unset_fields() {
        let mut user = User::new("Ada", "ada@example.com", "555", "hash".into(), Role::User);
        user.update_profile(None, Some("777"));
        assert_eq!(user.name, "Ada");
        assert_eq!(user.contact_number, "777");
    }
}
