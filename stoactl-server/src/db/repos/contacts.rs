//! Banking-specific details layered on a core person.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{FromRow, PgPool};

use crate::db::{DbError, OrNotFound};
use crate::models::banking::ContactUpsert;

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "PascalCase")]
pub struct BankingContact {
    pub person_id: i32,
    pub full_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub role: Option<String>,
    pub is_banking_contact: bool,
    pub notes: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
}

pub struct ContactRepo<'a> {
    pool: &'a PgPool,
}

impl<'a> ContactRepo<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// The person with their extension; a person without one reads as a
    /// non-banking contact.
    pub async fn get(&self, person_id: i32) -> Result<BankingContact, DbError> {
        sqlx::query_as::<_, BankingContact>(
            r#"
            SELECT p.person_id, p.full_name, p.email, p.phone, x.role,
                   COALESCE(x.is_banking_contact, FALSE) AS is_banking_contact,
                   x.notes, x.updated_at
            FROM core.person p
            LEFT JOIN banking.banking_contact_extension x ON x.person_id = p.person_id
            WHERE p.person_id = $1
            "#,
        )
        .bind(person_id)
        .fetch_optional(self.pool)
        .await?
        .or_not_found("person", person_id)
    }

    pub async fn upsert(&self, person_id: i32, c: ContactUpsert) -> Result<BankingContact, DbError> {
        // 404 rather than a foreign-key 400 when the person is unknown
        self.get(person_id).await?;
        sqlx::query(
            r#"
            INSERT INTO banking.banking_contact_extension (person_id, role, is_banking_contact, notes)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (person_id) DO UPDATE
            SET role = EXCLUDED.role,
                is_banking_contact = EXCLUDED.is_banking_contact,
                notes = EXCLUDED.notes,
                updated_at = NOW()
            "#,
        )
        .bind(person_id)
        .bind(c.role)
        .bind(c.is_banking_contact.unwrap_or(true))
        .bind(c.notes)
        .execute(self.pool)
        .await?;
        self.get(person_id).await
    }
}
