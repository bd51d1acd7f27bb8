//! US state abbreviation normalization.

use crate::validation::ValidationError;

const STATES: &[(&str, &str)] = &[
    ("AL", "alabama"),
    ("AK", "alaska"),
    ("AZ", "arizona"),
    ("AR", "arkansas"),
    ("CA", "california"),
    ("CO", "colorado"),
    ("CT", "connecticut"),
    ("DE", "delaware"),
    ("DC", "district of columbia"),
    ("FL", "florida"),
    ("GA", "georgia"),
    ("HI", "hawaii"),
    ("ID", "idaho"),
    ("IL", "illinois"),
    ("IN", "indiana"),
    ("IA", "iowa"),
    ("KS", "kansas"),
    ("KY", "kentucky"),
    ("LA", "louisiana"),
    ("ME", "maine"),
    ("MD", "maryland"),
    ("MA", "massachusetts"),
    ("MI", "michigan"),
    ("MN", "minnesota"),
    ("MS", "mississippi"),
    ("MO", "missouri"),
    ("MT", "montana"),
    ("NE", "nebraska"),
    ("NV", "nevada"),
    ("NH", "new hampshire"),
    ("NJ", "new jersey"),
    ("NM", "new mexico"),
    ("NY", "new york"),
    ("NC", "north carolina"),
    ("ND", "north dakota"),
    ("OH", "ohio"),
    ("OK", "oklahoma"),
    ("OR", "oregon"),
    ("PA", "pennsylvania"),
    ("PR", "puerto rico"),
    ("RI", "rhode island"),
    ("SC", "south carolina"),
    ("SD", "south dakota"),
    ("TN", "tennessee"),
    ("TX", "texas"),
    ("UT", "utah"),
    ("VT", "vermont"),
    ("VA", "virginia"),
    ("WA", "washington"),
    ("WV", "west virginia"),
    ("WI", "wisconsin"),
    ("WY", "wyoming"),
];

/// Resolve a state code or name to its two-letter abbreviation.
///
/// Accepts `"NC"`, `"n.c."`, `"North Carolina"`, `"  north   carolina "`.
pub fn lookup_state(input: &str) -> Option<&'static str> {
    let cleaned: String = input
        .chars()
        .filter(|c| *c != '.')
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_ascii_lowercase();

    if cleaned.is_empty() {
        return None;
    }

    STATES
        .iter()
        .find(|(code, name)| {
            cleaned.eq_ignore_ascii_case(code) || cleaned == *name || cleaned.replace(' ', "") == code.to_ascii_lowercase()
        })
        .map(|(code, _)| *code)
}

/// Normalize an optional state field for storage.
///
/// Blank → `Ok(None)`; unknown → validation error.
pub fn normalize_state(
    field: &'static str,
    input: Option<&str>,
) -> Result<Option<&'static str>, ValidationError> {
    match input.map(str::trim) {
        None | Some("") => Ok(None),
        Some(raw) => lookup_state(raw).map(Some).ok_or_else(|| {
            ValidationError::invalid_format(field, format!("unrecognized state '{}'", raw))
        }),
    }
}
