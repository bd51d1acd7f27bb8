//! Partial `UPDATE ... SET` built from whichever fields a request supplied.

use serde::{Deserialize, Deserializer};
use sqlx::{Encode, Postgres, QueryBuilder, Type};
use stoactl_core::ValidationError;

/// Deserialize a field that distinguishes "absent" from explicit `null`.
///
/// Use with `#[serde(default, deserialize_with = "double_option")]`:
/// absent → `None`, `null` → `Some(None)`, value → `Some(Some(v))`.
pub fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Accumulates `col = $n` assignments for one table.
pub struct Assignments<'args> {
    builder: QueryBuilder<'args, Postgres>,
    count: usize,
}

impl<'args> Assignments<'args> {
    pub fn new(table: &str) -> Self {
        Self {
            builder: QueryBuilder::new(format!("UPDATE {table} SET ")),
            count: 0,
        }
    }

    /// Unconditionally assign `column`.
    pub fn set<T>(&mut self, column: &str, value: T) -> &mut Self
    where
        T: 'args + Encode<'args, Postgres> + Type<Postgres> + Send,
    {
        if self.count > 0 {
            self.builder.push(", ");
        }
        self.builder.push(column).push(" = ").push_bind(value);
        self.count += 1;
        self
    }

    /// Assign `column` when the request supplied a value.
    pub fn set_opt<T>(&mut self, column: &str, value: Option<T>) -> &mut Self
    where
        T: 'args + Encode<'args, Postgres> + Type<Postgres> + Send,
    {
        if let Some(v) = value {
            self.set(column, v);
        }
        self
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Close the statement: optional `updated_at` touch, the key predicate
    /// and the `RETURNING` list.
    pub fn finish(
        mut self,
        key_column: &str,
        id: i32,
        touch_updated_at: bool,
        returning: &str,
    ) -> Result<QueryBuilder<'args, Postgres>, ValidationError> {
        if self.count == 0 {
            return Err(ValidationError::NoFieldsToUpdate);
        }
        if touch_updated_at {
            self.builder.push(", updated_at = NOW()");
        }
        self.builder
            .push(" WHERE ")
            .push(key_column)
            .push(" = ")
            .push_bind(id)
            .push(" RETURNING ")
            .push(returning);
        Ok(self.builder)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Deserialize)]
    struct Patch {
        #[serde(default, deserialize_with = "double_option")]
        notes: Option<Option<String>>,
    }

    #[test]
    fn double_option_distinguishes_null_from_absent() {
        let absent: Patch = serde_json::from_str("{}").unwrap();
        assert_eq!(absent.notes, None);

        let null: Patch = serde_json::from_str(r#"{"notes": null}"#).unwrap();
        assert_eq!(null.notes, Some(None));

        let value: Patch = serde_json::from_str(r#"{"notes": "hi"}"#).unwrap();
        assert_eq!(value.notes, Some(Some("hi".into())));
    }

    #[test]
    fn builds_set_clause_in_order() {
        let mut a = Assignments::new("core.bank");
        a.set("bank_name", "First".to_string())
            .set_opt::<String>("city", None)
            .set_opt("notes", Some(None::<String>));
        assert_eq!(a.len(), 2);

        let builder = a.finish("bank_id", 4, true, "*").unwrap();
        assert_eq!(
            builder.sql(),
            "UPDATE core.bank SET bank_name = $1, notes = $2, updated_at = NOW() WHERE bank_id = $3 RETURNING *"
        );
    }

    #[test]
    fn empty_update_is_rejected() {
        let a = Assignments::new("core.bank");
        assert!(a.is_empty());
        assert_eq!(a.finish("bank_id", 1, true, "*").err(), Some(ValidationError::NoFieldsToUpdate));
    }
}
