use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Account role, fixed at registration.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Student,
    Faculty,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Student => "student",
            Role::Faculty => "faculty",
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
        match s.trim().to_ascii_lowercase().as_str() {
            "student" => Ok(Role::Student),
            "faculty" => Ok(Role::Faculty),
            other => Err(format!("unknown role `{other}`")),
        }
    }
}

/// User record in the database.
#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub full_name: String,
    pub role: Role,
    #[serde(skip_serializing)]
    pub password_hash: String, // Argon2 PHC string
    pub is_active: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// Fields needed to insert an account; id and timestamps come from the store.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub full_name: String,
    pub role: Role,
    pub password_hash: String,
}

/// Raw `users` row; `role` is stored as text.
#[derive(Debug, sqlx::FromRow)]
pub struct UserRow {
    pub id: i64,
    pub email: String,
    pub full_name: String,
    pub role: String,
    pub hashed_password: String,
    pub is_active: bool,
    pub created_at: OffsetDateTime,
}

impl TryFrom<UserRow> for User {
    type Error = String;

    fn try_from(r: UserRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: r.id,
            email: r.email,
            full_name: r.full_name,
            role: r.role.parse()?,
            password_hash: r.hashed_password,
            is_active: r.is_active,
            created_at: r.created_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_parses_case_insensitively() {
        assert_eq!("Student".parse::<Role>(), Ok(Role::Student));
        assert_eq!(" faculty ".parse::<Role>(), Ok(Role::Faculty));
        assert!("admin".parse::<Role>().is_err());
    }

    #[test]
    fn user_json_hides_password_hash() {
        let user = User {
            id: 7,
            email: "alice@inst.edu".into(),
            full_name: "Alice".into(),
            role: Role::Student,
            password_hash: "$argon2id$secret".into(),
            is_active: true,
            created_at: OffsetDateTime::UNIX_EPOCH,
        };
        let json = serde_json::to_value(&user).unwrap();
        assert_eq!(json["role"], "student");
        assert!(json.get("password_hash").is_none());
    }
}
