//! Validation helpers for partial-update fields.

use stoactl_core::validation::optional_text;
use stoactl_core::ValidationError;

/// Optional-and-nullable text: absent stays absent, blank or `null` clears.
pub fn patch_text(
    field: &'static str,
    value: Option<Option<String>>,
    max: usize,
) -> Result<Option<Option<String>>, ValidationError> {
    match value {
        None => Ok(None),
        Some(inner) => optional_text(field, inner.as_deref(), max).map(Some),
    }
}

/// Apply `check` to a supplied, non-null value.
pub fn patch_with<T, U>(
    value: Option<Option<T>>,
    check: impl FnOnce(T) -> Result<Option<U>, ValidationError>,
) -> Result<Option<Option<U>>, ValidationError> {
    match value {
        None => Ok(None),
        Some(None) => Ok(Some(None)),
        Some(Some(v)) => check(v).map(Some),
    }
}

/// Reject negative amounts/counts.
pub fn non_negative<T>(field: &'static str, value: Option<T>) -> Result<Option<T>, ValidationError>
where
    T: PartialOrd + Default,
{
    match value {
        Some(v) if v < T::default() => Err(ValidationError::out_of_range(field, "must not be negative")),
        other => Ok(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    #[test]
    fn patch_text_keeps_absence_and_clears_blank() {
        assert_eq!(patch_text("City", None, 10).unwrap(), None);
        assert_eq!(patch_text("City", Some(None), 10).unwrap(), Some(None));
        assert_eq!(patch_text("City", Some(Some("  ".into())), 10).unwrap(), Some(None));
        assert_eq!(
            patch_text("City", Some(Some(" Raleigh ".into())), 10).unwrap(),
            Some(Some("Raleigh".into()))
        );
        assert!(patch_text("City", Some(Some("x".repeat(11))), 10).is_err());
    }

    #[test]
    fn negative_values_rejected() {
        assert!(non_negative("Units", Some(-1)).is_err());
        assert_eq!(non_negative("Units", Some(0)).unwrap(), Some(0));
        assert!(non_negative("LoanAmount", Some(Decimal::new(-5, 0))).is_err());
        assert_eq!(non_negative::<i32>("Units", None).unwrap(), None);
    }
}
