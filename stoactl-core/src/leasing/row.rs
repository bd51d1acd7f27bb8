//! Tolerant access to raw dataset rows.
//!
//! Domo exports are wide and their headers drift ("Unit Number",
//! "unit_number", "UnitNumber"), so every logical field is looked up through
//! a list of aliases against keys folded to lowercase alphanumerics.

use std::collections::HashMap;

use chrono::NaiveDate;
use serde_json::{Map, Value};

/// A dataset row exactly as received
pub type RawRow = Map<String, Value>;

/// Field aliases, most specific first
pub mod fields {
    pub const PROPERTY: &[&str] = &["Property", "PropertyName", "Community", "ProjectName", "Project"];
    pub const UNIT: &[&str] = &["UnitNumber", "Unit", "UnitCode", "UnitId"];
    pub const UNIT_STATUS: &[&str] = &["UnitStatus", "Status", "OccupancyStatus"];
    pub const SIGNED_DATE: &[&str] = &["LeaseSignedDate", "SignedDate", "DateSigned", "LeaseSigned", "ApplicationDate", "Date"];
    pub const MONTH: &[&str] = &["Month", "ReportMonth", "Period", "MonthEnding", "Date"];
    pub const BUDGETED_OCCUPANCY: &[&str] = &["BudgetedOccupancy", "BudgetOccupancy", "BudgetedOccupancyPct", "BudgetedOccupancyPercent"];
    pub const BUDGETED_LEASED: &[&str] = &["BudgetedLeased", "BudgetLeased", "BudgetedLeasedPct", "BudgetedLeasedPercent"];
    pub const PRIOR_RENT: &[&str] = &["PriorRent", "PreviousRent", "OldRent", "PriorLeaseRent"];
    pub const NEW_RENT: &[&str] = &["NewRent", "NewLeaseRent", "LeaseRent", "CurrentRent"];
    pub const LEASE_TYPE: &[&str] = &["LeaseType", "TradeoutType", "Type"];
    pub const TRADEOUT_DATE: &[&str] = &["SignedDate", "LeaseSignedDate", "LeaseStartDate", "MoveInDate", "Date"];
    pub const ASKING_RENT: &[&str] = &["AskingRent", "MarketRent", "Price", "Rent"];
    pub const RECENT_RENT: &[&str] = &["EffectiveRent", "Rent", "LeaseRent", "NetRent"];
    pub const UNIT_COUNT: &[&str] = &["UnitCount", "TotalUnits", "Units", "Count"];
}

fn fold_key(key: &str) -> String {
    key.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

/// Indexed, read-only view over a raw row
pub struct RowView<'a> {
    index: HashMap<String, &'a Value>,
}

impl<'a> RowView<'a> {
    pub fn new(row: &'a RawRow) -> Self {
        let mut index = HashMap::with_capacity(row.len());
        for (k, v) in row {
            // First spelling wins when two headers fold to the same key
            index.entry(fold_key(k)).or_insert(v);
        }
        Self { index }
    }

    fn raw(&self, aliases: &[&str]) -> Option<&'a Value> {
        aliases
            .iter()
            .filter_map(|a| self.index.get(&fold_key(a)).copied())
            .find(|v| !is_blank(v))
    }

    /// Text value, trimmed; numbers are rendered.
    pub fn text(&self, aliases: &[&str]) -> Option<String> {
        match self.raw(aliases)? {
            Value::String(s) => Some(s.trim().to_owned()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    /// Numeric value; strings may carry `$`, `,` and `%`.
    pub fn number(&self, aliases: &[&str]) -> Option<f64> {
        match self.raw(aliases)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => parse_number(s),
            _ => None,
        }
    }

    /// Date value from ISO or US-style text.
    pub fn date(&self, aliases: &[&str]) -> Option<NaiveDate> {
        match self.raw(aliases)? {
            Value::String(s) => parse_date(s),
            _ => None,
        }
    }

    /// Property name, the join key across datasets.
    pub fn property(&self) -> Option<String> {
        self.text(fields::PROPERTY).filter(|p| !p.is_empty())
    }
}

fn is_blank(v: &Value) -> bool {
    match v {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

/// Parse `"$1,234.50"`, `"95.2%"`, `"(120)"` style cells.
pub fn parse_number(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    let (negative, body) = match trimmed.strip_prefix('(').and_then(|s| s.strip_suffix(')')) {
        Some(inner) => (true, inner),
        None => (false, trimmed),
    };
    let cleaned: String = body
        .chars()
        .filter(|c| !matches!(c, '$' | ',' | '%' | ' '))
        .collect();
    if cleaned.is_empty() {
        return None;
    }
    let value: f64 = cleaned.parse().ok()?;
    if !value.is_finite() {
        return None;
    }
    Some(if negative { -value } else { value })
}

/// Parse `YYYY-MM-DD[...]`, `MM/DD/YYYY[ ...]`.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    if let Some(prefix) = trimmed.get(..10) {
        if let Ok(d) = NaiveDate::parse_from_str(prefix, "%Y-%m-%d") {
            return Some(d);
        }
    }
    let first_token = trimmed.split([' ', 'T']).next().unwrap_or(trimmed);
    NaiveDate::parse_from_str(first_token, "%m/%d/%Y")
        .or_else(|_| NaiveDate::parse_from_str(first_token, "%Y-%m-%d"))
        .ok()
}

/// Percent cells arrive as either `0.95` or `95`; normalize to 0-100.
pub fn as_percent(value: f64) -> f64 {
    if value.abs() <= 1.0 {
        value * 100.0
    } else {
        value
    }
}
