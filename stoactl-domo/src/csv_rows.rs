//! CSV exports into raw rows.

use serde_json::{Map, Value};
use stoactl_core::leasing::RawRow;

use crate::error::Result;

/// Parse a CSV export with a header row. Every cell stays a string; short
/// records fill missing columns with `null`.
pub fn parse_csv(text: &str) -> Result<Vec<RawRow>> {
    let text = text.trim_start_matches('\u{feff}');
    if text.trim().is_empty() {
        return Ok(Vec::new());
    }

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(text.as_bytes());
    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.trim().to_owned())
        .collect();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        let mut row = Map::with_capacity(headers.len());
        for (i, header) in headers.iter().enumerate() {
            let value = record
                .get(i)
                .map(|cell| Value::String(cell.to_owned()))
                .unwrap_or(Value::Null);
            row.insert(header.clone(), value);
        }
        rows.push(row);
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_row_keys_each_record() {
        let rows = parse_csv("Property,Unit,Rent\nHeights,101,\"1,450\"\nHeights,102,1500\n").unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["Property"], "Heights");
        assert_eq!(rows[0]["Rent"], "1,450");
        assert_eq!(rows[1]["Unit"], "102");
    }

    #[test]
    fn short_records_pad_with_null() {
        let rows = parse_csv("A,B,C\n1,2\n").unwrap();
        assert_eq!(rows[0]["B"], "2");
        assert!(rows[0]["C"].is_null());
    }

    #[test]
    fn bom_and_blank_input() {
        let rows = parse_csv("\u{feff}Property\nHeights\n").unwrap();
        assert_eq!(rows[0]["Property"], "Heights");
        assert!(parse_csv("").unwrap().is_empty());
        assert!(parse_csv("A,B\n").unwrap().is_empty());
    }
}
