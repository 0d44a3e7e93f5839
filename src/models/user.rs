//! # User Types
//!
//! This module defines the account model together with the [`Role`] and
//! [`Provider`] enums, which correspond to the PostgreSQL `user_role` and
//! `auth_provider` enum types.

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

use super::Address;
use crate::error::{AppError, AppResult};

/// Authorization level of an account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type, Serialize, Deserialize)]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let role_str = match self {
            Role::User => "user",
            Role::Admin => "admin",
        };
        write!(f, "{role_str}")
    }
}

impl std::str::FromStr for Role {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Role::User),
            "admin" => Ok(Role::Admin),
            _ => Err(()),
        }
    }
}

impl Role {
    #[inline]
    pub fn is_admin(&self) -> bool {
        matches!(self, Role::Admin)
    }
}

/// How an account signs in.
///
/// `Local` accounts always carry a password hash; `Google` accounts never
/// have one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type, Serialize, Deserialize)]
#[sqlx(type_name = "auth_provider", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Local,
    Google,
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    #[serde(skip)]
    pub password_hash: Option<String>,
    pub provider: Provider,
    pub google_id: Option<String>,
    pub role: Role,
    #[serde(with = "time::serde::rfc3339::option")]
    pub last_login: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl User {
    pub async fn find_by_id(db_pool: &PgPool, user_id: Uuid) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(db_pool)
            .await?;
        Ok(user)
    }

    pub async fn find_by_email(db_pool: &PgPool, email: &str) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(db_pool)
            .await?;
        Ok(user)
    }

    /// Like [`User::find_by_id`], mapping absence to `404`.
    pub async fn get(db_pool: &PgPool, user_id: Uuid) -> AppResult<User> {
        Self::find_by_id(db_pool, user_id)
            .await?
            .ok_or(AppError::NotFound("User not found"))
    }

    pub async fn touch_last_login(db_pool: &PgPool, user_id: Uuid) -> AppResult<()> {
        sqlx::query("UPDATE users SET last_login = now() WHERE id = $1")
            .bind(user_id)
            .execute(db_pool)
            .await?;
        Ok(())
    }
}

/// A user together with their saved addresses.
#[derive(Debug, Serialize)]
pub struct UserProfile {
    #[serde(flatten)]
    pub user: User,
    pub addresses: Vec<Address>,
}

impl UserProfile {
    pub async fn load(db_pool: &PgPool, user_id: Uuid) -> AppResult<UserProfile> {
        let user = User::get(db_pool, user_id).await?;
        let addresses = Address::list_for_user(db_pool, user_id).await?;
        Ok(UserProfile { user, addresses })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roles_parse_only_known_values() {
        assert_eq!("user".parse::<Role>(), Ok(Role::User));
        assert_eq!("admin".parse::<Role>(), Ok(Role::Admin));
        assert!("Admin".parse::<Role>().is_err());
        assert!("root".parse::<Role>().is_err());
    }

    #[test]
    fn password_hash_is_never_serialized() {
        let now = OffsetDateTime::now_utc();
        let user = User {
            id: Uuid::new_v4(),
            name: "Ann".into(),
            email: "ann@example.com".into(),
            phone: None,
            password_hash: Some("$argon2id$secret".into()),
            provider: Provider::Local,
            google_id: None,
            role: Role::User,
            last_login: None,
            created_at: now,
            updated_at: now,
        };

        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("passwordHash").is_none());
        assert_eq!(json["role"], "user");
        assert_eq!(json["provider"], "local");
        assert!(json["_id"].is_string());
    }
}
