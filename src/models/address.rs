//! # Address Book
//!
//! Saved shipping/billing addresses. At most one address per user carries each
//! default flag; writes that set a flag clear it on the user's other
//! addresses in the same transaction.

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgConnection, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;
use validator::Validate;

use crate::error::AppResult;

/// Maps to the PostgreSQL `address_label` enum, whose values are capitalized.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, sqlx::Type, Serialize, Deserialize)]
#[sqlx(type_name = "address_label")]
pub enum AddressLabel {
    #[default]
    Home,
    Office,
    Other,
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    #[serde(rename = "_id")]
    pub id: Uuid,
    #[serde(skip)]
    pub user_id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub country: String,
    pub company_name: Option<String>,
    pub street_address: String,
    pub apt_suite: Option<String>,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub phone: String,
    pub delivery_instruction: Option<String>,
    pub label: AddressLabel,
    pub is_default_shipping: bool,
    pub is_default_billing: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// A complete address as submitted by a client
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AddressInput {
    #[validate(length(min = 1))]
    pub first_name: String,
    #[validate(length(min = 1))]
    pub last_name: String,
    #[validate(length(min = 1))]
    pub country: String,
    pub company_name: Option<String>,
    #[validate(length(min = 1))]
    pub street_address: String,
    pub apt_suite: Option<String>,
    #[validate(length(min = 1))]
    pub city: String,
    #[validate(length(min = 1))]
    pub state: String,
    #[validate(length(min = 1))]
    pub postal_code: String,
    #[validate(length(min = 1))]
    pub phone: String,
    pub delivery_instruction: Option<String>,
    #[serde(default)]
    pub label: AddressLabel,
    #[serde(default)]
    pub is_default_shipping: bool,
    #[serde(default)]
    pub is_default_billing: bool,
}

/// Partial address update; absent fields keep their value
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AddressPatch {
    #[validate(length(min = 1))]
    pub first_name: Option<String>,
    #[validate(length(min = 1))]
    pub last_name: Option<String>,
    #[validate(length(min = 1))]
    pub country: Option<String>,
    pub company_name: Option<String>,
    #[validate(length(min = 1))]
    pub street_address: Option<String>,
    pub apt_suite: Option<String>,
    #[validate(length(min = 1))]
    pub city: Option<String>,
    #[validate(length(min = 1))]
    pub state: Option<String>,
    #[validate(length(min = 1))]
    pub postal_code: Option<String>,
    #[validate(length(min = 1))]
    pub phone: Option<String>,
    pub delivery_instruction: Option<String>,
    pub label: Option<AddressLabel>,
    pub is_default_shipping: Option<bool>,
    pub is_default_billing: Option<bool>,
}

impl Address {
    pub async fn list_for_user(db_pool: &PgPool, user_id: Uuid) -> AppResult<Vec<Address>> {
        let addresses = sqlx::query_as::<_, Address>(
            "SELECT * FROM addresses WHERE user_id = $1 ORDER BY created_at, id",
        )
        .bind(user_id)
        .fetch_all(db_pool)
        .await?;
        Ok(addresses)
    }

    pub async fn insert(
        conn: &mut PgConnection,
        user_id: Uuid,
        input: &AddressInput,
    ) -> AppResult<Address> {
        let address = sqlx::query_as::<_, Address>(
            r#"
            INSERT INTO addresses (
                user_id, first_name, last_name, country, company_name, street_address,
                apt_suite, city, state, postal_code, phone, delivery_instruction, label,
                is_default_shipping, is_default_billing
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(&input.first_name)
        .bind(&input.last_name)
        .bind(&input.country)
        .bind(&input.company_name)
        .bind(&input.street_address)
        .bind(&input.apt_suite)
        .bind(&input.city)
        .bind(&input.state)
        .bind(&input.postal_code)
        .bind(&input.phone)
        .bind(&input.delivery_instruction)
        .bind(input.label)
        .bind(input.is_default_shipping)
        .bind(input.is_default_billing)
        .fetch_one(&mut *conn)
        .await?;

        address.clear_other_defaults(conn).await?;
        Ok(address)
    }

    /// Applies `patch` to the user's address, returning `None` when the
    /// address does not exist or belongs to someone else.
    pub async fn update(
        conn: &mut PgConnection,
        user_id: Uuid,
        address_id: Uuid,
        patch: &AddressPatch,
    ) -> AppResult<Option<Address>> {
        let address = sqlx::query_as::<_, Address>(
            r#"
            UPDATE addresses SET
                first_name = COALESCE($3, first_name),
                last_name = COALESCE($4, last_name),
                country = COALESCE($5, country),
                company_name = COALESCE($6, company_name),
                street_address = COALESCE($7, street_address),
                apt_suite = COALESCE($8, apt_suite),
                city = COALESCE($9, city),
                state = COALESCE($10, state),
                postal_code = COALESCE($11, postal_code),
                phone = COALESCE($12, phone),
                delivery_instruction = COALESCE($13, delivery_instruction),
                label = COALESCE($14, label),
                is_default_shipping = COALESCE($15, is_default_shipping),
                is_default_billing = COALESCE($16, is_default_billing),
                updated_at = now()
            WHERE id = $1 AND user_id = $2
            RETURNING *
            "#,
        )
        .bind(address_id)
        .bind(user_id)
        .bind(&patch.first_name)
        .bind(&patch.last_name)
        .bind(&patch.country)
        .bind(&patch.company_name)
        .bind(&patch.street_address)
        .bind(&patch.apt_suite)
        .bind(&patch.city)
        .bind(&patch.state)
        .bind(&patch.postal_code)
        .bind(&patch.phone)
        .bind(&patch.delivery_instruction)
        .bind(patch.label)
        .bind(patch.is_default_shipping)
        .bind(patch.is_default_billing)
        .fetch_optional(&mut *conn)
        .await?;

        if let Some(address) = &address {
            address.clear_other_defaults(conn).await?;
        }
        Ok(address)
    }

    /// Replaces the user's whole address book. When several entries claim a
    /// default flag the last one keeps it.
    pub async fn replace_all(
        conn: &mut PgConnection,
        user_id: Uuid,
        inputs: &[AddressInput],
    ) -> AppResult<()> {
        sqlx::query("DELETE FROM addresses WHERE user_id = $1")
            .bind(user_id)
            .execute(&mut *conn)
            .await?;

        for input in inputs {
            Self::insert(conn, user_id, input).await?;
        }
        Ok(())
    }

    pub async fn delete(db_pool: &PgPool, user_id: Uuid, address_id: Uuid) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM addresses WHERE id = $1 AND user_id = $2")
            .bind(address_id)
            .bind(user_id)
            .execute(db_pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn clear_other_defaults(&self, conn: &mut PgConnection) -> AppResult<()> {
        if self.is_default_shipping {
            sqlx::query(
                "UPDATE addresses SET is_default_shipping = FALSE WHERE user_id = $1 AND id <> $2",
            )
            .bind(self.user_id)
            .bind(self.id)
            .execute(&mut *conn)
            .await?;
        }
        if self.is_default_billing {
            sqlx::query(
                "UPDATE addresses SET is_default_billing = FALSE WHERE user_id = $1 AND id <> $2",
            )
            .bind(self.user_id)
            .bind(self.id)
            .execute(&mut *conn)
            .await?;
        }
        Ok(())
    }
}
