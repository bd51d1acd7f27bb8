//! Lookup tables sharing one shape: regions, product types, loan types.
//!
//! Deletes are soft (`is_active = FALSE`) so historical rows keep their labels.

use serde::Serialize;
use sqlx::{FromRow, PgPool};

use crate::db::update::Assignments;
use crate::db::{DbError, OrNotFound};
use crate::models::core_entities::{NewReferenceItem, ReferenceItemPatch};

/// Which lookup table a repo instance works on
#[derive(Debug, Clone, Copy)]
pub struct ReferenceTable {
    pub table: &'static str,
    pub key: &'static str,
    pub resource: &'static str,
}

pub const REGIONS: ReferenceTable = ReferenceTable {
    table: "core.region",
    key: "region_id",
    resource: "region",
};

pub const PRODUCT_TYPES: ReferenceTable = ReferenceTable {
    table: "core.product_type",
    key: "product_type_id",
    resource: "product type",
};

pub const LOAN_TYPES: ReferenceTable = ReferenceTable {
    table: "banking.loan_type",
    key: "loan_type_id",
    resource: "loan type",
};

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "PascalCase")]
pub struct ReferenceItem {
    pub id: i32,
    pub name: String,
    pub display_order: i32,
    pub is_active: bool,
}

pub struct ReferenceRepo<'a> {
    pool: &'a PgPool,
    table: ReferenceTable,
}

impl<'a> ReferenceRepo<'a> {
    pub fn new(pool: &'a PgPool, table: ReferenceTable) -> Self {
        Self { pool, table }
    }

    fn columns(&self) -> String {
        format!("{} AS id, name, display_order, is_active", self.table.key)
    }

    pub async fn list(&self, include_inactive: bool) -> Result<Vec<ReferenceItem>, DbError> {
        let sql = format!(
            "SELECT {} FROM {} WHERE is_active OR $1 ORDER BY display_order, name",
            self.columns(),
            self.table.table
        );
        Ok(sqlx::query_as::<_, ReferenceItem>(&sql)
            .bind(include_inactive)
            .fetch_all(self.pool)
            .await?)
    }

    pub async fn create(&self, item: NewReferenceItem) -> Result<ReferenceItem, DbError> {
        let sql = format!(
            "INSERT INTO {} (name, display_order, is_active) VALUES ($1, $2, $3) RETURNING {}",
            self.table.table,
            self.columns()
        );
        Ok(sqlx::query_as::<_, ReferenceItem>(&sql)
            .bind(item.name)
            .bind(item.display_order.unwrap_or(0))
            .bind(item.is_active.unwrap_or(true))
            .fetch_one(self.pool)
            .await?)
    }

    pub async fn update(&self, id: i32, patch: ReferenceItemPatch) -> Result<ReferenceItem, DbError> {
        let mut set = Assignments::new(self.table.table);
        set.set_opt("name", patch.name)
            .set_opt("display_order", patch.display_order)
            .set_opt("is_active", patch.is_active);
        let returning = self.columns();
        let mut query = set.finish(self.table.key, id, false, &returning)?;
        query
            .build_query_as::<ReferenceItem>()
            .fetch_optional(self.pool)
            .await?
            .or_not_found(self.table.resource, id)
    }

    /// Mark inactive; returns the updated row.
    pub async fn deactivate(&self, id: i32) -> Result<ReferenceItem, DbError> {
        let sql = format!(
            "UPDATE {} SET is_active = FALSE WHERE {} = $1 RETURNING {}",
            self.table.table,
            self.table.key,
            self.columns()
        );
        sqlx::query_as::<_, ReferenceItem>(&sql)
            .bind(id)
            .fetch_optional(self.pool)
            .await?
            .or_not_found(self.table.resource, id)
    }
}
