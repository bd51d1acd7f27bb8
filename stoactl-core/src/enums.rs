//! Enumerated column values.
//!
//! The database keeps these as TEXT behind CHECK constraints; requests carry
//! free-form strings that are parsed here so a bad value is a 400 with the
//! allowed list, not a constraint violation.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::validation::ValidationError;

macro_rules! text_enum {
    (
        $(#[$meta:meta])*
        $name:ident, field = $field:literal {
            $($variant:ident => $text:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(
                #[serde(rename = $text)]
                $variant,
            )+
        }

        impl $name {
            /// Canonical spellings, in declaration order.
            pub const ALL: &'static [&'static str] = &[$($text),+];

            /// Canonical database/JSON spelling.
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $text,)+
                }
            }

            /// Parse case-insensitively, ignoring surrounding whitespace.
            pub fn parse(value: &str) -> Result<Self, ValidationError> {
                let needle = value.trim();
                $(
                    if needle.eq_ignore_ascii_case($text) {
                        return Ok(Self::$variant);
                    }
                )+
                Err(ValidationError::InvalidVariant {
                    field: $field,
                    value: value.to_owned(),
                    allowed: Self::ALL,
                })
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

text_enum! {
    /// Rate structure of a loan
    FixedOrFloating, field = "FixedOrFloating" {
        Fixed => "Fixed",
        Floating => "Floating",
    }
}

text_enum! {
    /// Benchmark a floating rate is quoted against
    IndexName, field = "IndexName" {
        Sofr => "SOFR",
        Prime => "Prime",
        WsjPrime => "WSJ Prime",
        Treasury => "Treasury",
        Bsby => "BSBY",
    }
}

text_enum! {
    /// Kind of covenant tracked against a loan
    CovenantType, field = "CovenantType" {
        Dscr => "DSCR",
        Occupancy => "Occupancy",
        Liquidity => "Liquidity",
        NetWorth => "Net Worth",
        Other => "Other",
    }
}

text_enum! {
    /// Phase/product of a financing
    FinancingType, field = "FinancingType" {
        Construction => "Construction",
        Permanent => "Permanent",
        Bridge => "Bridge",
        MiniPerm => "Mini-Perm",
        Land => "Land",
    }
}

text_enum! {
    /// Position of an equity commitment in the capital stack
    EquityType, field = "EquityType" {
        PreferredEquity => "Preferred Equity",
        CommonEquity => "Common Equity",
        ProfitsInterest => "Profits Interest",
        StoaLoan => "Stoa Loan",
    }
}

text_enum! {
    /// Legal shape of an equity partner
    PartnerType, field = "PartnerType" {
        Entity => "Entity",
        Individual => "Individual",
    }
}

/// Parse an optional enum field, passing blank strings through as `None`.
pub fn parse_optional<T>(
    value: Option<&str>,
    parse: impl Fn(&str) -> Result<T, ValidationError>,
) -> Result<Option<T>, ValidationError> {
    match value.map(str::trim) {
        None | Some("") => Ok(None),
        Some(v) => parse(v).map(Some),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_case_insensitively() {
        assert_eq!(FixedOrFloating::parse("floating").unwrap(), FixedOrFloating::Floating);
        assert_eq!(IndexName::parse(" wsj prime ").unwrap(), IndexName::WsjPrime);
        assert_eq!(CovenantType::parse("NET WORTH").unwrap(), CovenantType::NetWorth);
        assert_eq!(FinancingType::parse("mini-perm").unwrap(), FinancingType::MiniPerm);
    }

    #[test]
    fn rejects_unknown_values_with_allowed_list() {
        let err = CovenantType::parse("LTV").unwrap_err();
        match err {
            ValidationError::InvalidVariant { field, value, allowed } => {
                assert_eq!(field, "CovenantType");
                assert_eq!(value, "LTV");
                assert!(allowed.contains(&"DSCR"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn serde_uses_canonical_spelling() {
        let json = serde_json::to_string(&EquityType::PreferredEquity).unwrap();
        assert_eq!(json, "\"Preferred Equity\"");
        let parsed: IndexName = serde_json::from_str("\"SOFR\"").unwrap();
        assert_eq!(parsed, IndexName::Sofr);
    }

    #[test]
    fn optional_blank_is_none() {
        assert_eq!(parse_optional(Some("  "), IndexName::parse).unwrap(), None);
        assert_eq!(
            parse_optional(Some("prime"), IndexName::parse).unwrap(),
            Some(IndexName::Prime)
        );
        assert!(parse_optional(Some("libor"), IndexName::parse).is_err());
    }
}
