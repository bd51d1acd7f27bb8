use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{FromRow, PgPool};

use crate::db::update::Assignments;
use crate::db::{DbError, OrNotFound};
use crate::models::core_entities::{NewPerson, PersonPatch};

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "PascalCase")]
pub struct Person {
    pub person_id: i32,
    pub full_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub title: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub struct PersonRepo<'a> {
    pool: &'a PgPool,
}

impl<'a> PersonRepo<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    pub async fn list(&self) -> Result<Vec<Person>, DbError> {
        Ok(sqlx::query_as::<_, Person>("SELECT * FROM core.person ORDER BY full_name")
            .fetch_all(self.pool)
            .await?)
    }

    pub async fn get(&self, id: i32) -> Result<Person, DbError> {
        sqlx::query_as::<_, Person>("SELECT * FROM core.person WHERE person_id = $1")
            .bind(id)
            .fetch_optional(self.pool)
            .await?
            .or_not_found("person", id)
    }

    pub async fn create(&self, p: NewPerson) -> Result<Person, DbError> {
        Ok(sqlx::query_as::<_, Person>(
            "INSERT INTO core.person (full_name, email, phone, title) VALUES ($1, $2, $3, $4) RETURNING *",
        )
        .bind(p.full_name)
        .bind(p.email)
        .bind(p.phone)
        .bind(p.title)
        .fetch_one(self.pool)
        .await?)
    }

    pub async fn update(&self, id: i32, p: PersonPatch) -> Result<Person, DbError> {
        let mut set = Assignments::new("core.person");
        set.set_opt("full_name", p.full_name)
            .set_opt("email", p.email)
            .set_opt("phone", p.phone)
            .set_opt("title", p.title);
        let mut query = set.finish("person_id", id, true, "*")?;
        query
            .build_query_as::<Person>()
            .fetch_optional(self.pool)
            .await?
            .or_not_found("person", id)
    }

    /// Removes the banking contact extension with the person; anything else
    /// still referencing them blocks the delete (409).
    pub async fn delete(&self, id: i32) -> Result<(), DbError> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM banking.banking_contact_extension WHERE person_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        let result = sqlx::query("DELETE FROM core.person WHERE person_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(|e| DbError::from(e).on_delete())?;
        if result.rows_affected() == 0 {
            return Err(DbError::not_found("person", id));
        }
        tx.commit().await?;
        Ok(())
    }
}
