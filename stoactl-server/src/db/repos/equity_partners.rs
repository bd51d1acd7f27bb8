use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{FromRow, PgPool};

use crate::db::update::Assignments;
use crate::db::{DbError, OrNotFound};
use crate::models::core_entities::{EquityPartnerPatch, NewEquityPartner};

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "PascalCase")]
pub struct EquityPartner {
    pub equity_partner_id: i32,
    pub partner_name: String,
    pub partner_type: Option<String>,
    pub contact_person_id: Option<i32>,
    pub contact_name: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

const SELECT: &str = r#"
    SELECT ep.equity_partner_id, ep.partner_name, ep.partner_type, ep.contact_person_id,
           pe.full_name AS contact_name, ep.notes, ep.created_at, ep.updated_at
    FROM core.equity_partner ep
    LEFT JOIN core.person pe ON pe.person_id = ep.contact_person_id
"#;

pub struct EquityPartnerRepo<'a> {
    pool: &'a PgPool,
}

impl<'a> EquityPartnerRepo<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    pub async fn list(&self) -> Result<Vec<EquityPartner>, DbError> {
        let sql = format!("{SELECT} ORDER BY ep.partner_name");
        Ok(sqlx::query_as::<_, EquityPartner>(&sql).fetch_all(self.pool).await?)
    }

    pub async fn get(&self, id: i32) -> Result<EquityPartner, DbError> {
        let sql = format!("{SELECT} WHERE ep.equity_partner_id = $1");
        sqlx::query_as::<_, EquityPartner>(&sql)
            .bind(id)
            .fetch_optional(self.pool)
            .await?
            .or_not_found("equity partner", id)
    }

    pub async fn create(&self, p: NewEquityPartner) -> Result<EquityPartner, DbError> {
        let id: i32 = sqlx::query_scalar(
            "INSERT INTO core.equity_partner (partner_name, partner_type, contact_person_id, notes) \
             VALUES ($1, $2, $3, $4) RETURNING equity_partner_id",
        )
        .bind(p.partner_name)
        .bind(p.partner_type)
        .bind(p.contact_person_id)
        .bind(p.notes)
        .fetch_one(self.pool)
        .await?;
        self.get(id).await
    }

    pub async fn update(&self, id: i32, p: EquityPartnerPatch) -> Result<EquityPartner, DbError> {
        let mut set = Assignments::new("core.equity_partner");
        set.set_opt("partner_name", p.partner_name)
            .set_opt("partner_type", p.partner_type)
            .set_opt("contact_person_id", p.contact_person_id)
            .set_opt("notes", p.notes);
        let mut query = set.finish("equity_partner_id", id, true, "equity_partner_id")?;
        query
            .build_query_scalar::<i32>()
            .fetch_optional(self.pool)
            .await?
            .or_not_found("equity partner", id)?;
        self.get(id).await
    }

    pub async fn delete(&self, id: i32) -> Result<(), DbError> {
        let result = sqlx::query("DELETE FROM core.equity_partner WHERE equity_partner_id = $1")
            .bind(id)
            .execute(self.pool)
            .await
            .map_err(|e| DbError::from(e).on_delete())?;
        if result.rows_affected() == 0 {
            return Err(DbError::not_found("equity partner", id));
        }
        Ok(())
    }
}
