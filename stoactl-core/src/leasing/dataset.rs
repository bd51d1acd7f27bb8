//! Leasing dataset keys.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::StoaError;

/// One of the leasing datasets accepted by the sync endpoint.
///
/// The string form is the exact payload key the push client sends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DatasetKey {
    #[serde(rename = "leasing")]
    Leasing,
    #[serde(rename = "MMRData")]
    MmrData,
    #[serde(rename = "unitbyunittradeout")]
    UnitByUnitTradeout,
    #[serde(rename = "portfolioUnitDetails")]
    PortfolioUnitDetails,
    #[serde(rename = "units")]
    Units,
    #[serde(rename = "unitmix")]
    UnitMix,
    #[serde(rename = "pricing")]
    Pricing,
    #[serde(rename = "recentrents")]
    RecentRents,
}

impl DatasetKey {
    pub const ALL: [DatasetKey; 8] = [
        DatasetKey::Leasing,
        DatasetKey::MmrData,
        DatasetKey::UnitByUnitTradeout,
        DatasetKey::PortfolioUnitDetails,
        DatasetKey::Units,
        DatasetKey::UnitMix,
        DatasetKey::Pricing,
        DatasetKey::RecentRents,
    ];

    /// Payload key used on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Leasing => "leasing",
            Self::MmrData => "MMRData",
            Self::UnitByUnitTradeout => "unitbyunittradeout",
            Self::PortfolioUnitDetails => "portfolioUnitDetails",
            Self::Units => "units",
            Self::UnitMix => "unitmix",
            Self::Pricing => "pricing",
            Self::RecentRents => "recentrents",
        }
    }

    /// Backing table, schema-qualified.
    pub fn table(&self) -> &'static str {
        match self {
            Self::Leasing => "leasing.leasing",
            Self::MmrData => "leasing.mmr_data",
            Self::UnitByUnitTradeout => "leasing.unit_by_unit_tradeout",
            Self::PortfolioUnitDetails => "leasing.portfolio_unit_details",
            Self::Units => "leasing.units",
            Self::UnitMix => "leasing.unit_mix",
            Self::Pricing => "leasing.pricing",
            Self::RecentRents => "leasing.recent_rents",
        }
    }

    /// Environment variable naming the Domo dataset id.
    pub fn domo_env_var(&self) -> &'static str {
        match self {
            Self::Leasing => "DOMO_DATASET_LEASING",
            Self::MmrData => "DOMO_DATASET_MMR",
            Self::UnitByUnitTradeout => "DOMO_DATASET_TRADEOUT",
            Self::PortfolioUnitDetails => "DOMO_DATASET_PUD",
            Self::Units => "DOMO_DATASET_UNITS",
            Self::UnitMix => "DOMO_DATASET_UNITMIX",
            Self::Pricing => "DOMO_DATASET_PRICING",
            Self::RecentRents => "DOMO_DATASET_RECENTRENTS",
        }
    }
}

impl fmt::Display for DatasetKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DatasetKey {
    type Err = StoaError;

    /// Exact match first, then case-insensitive.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Self::ALL
            .iter()
            .find(|k| k.as_str() == s)
            .or_else(|| Self::ALL.iter().find(|k| k.as_str().eq_ignore_ascii_case(s)))
            .copied()
            .ok_or_else(|| StoaError::unknown_dataset(s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_wire_keys() {
        for key in DatasetKey::ALL {
            assert_eq!(key.as_str().parse::<DatasetKey>().unwrap(), key);
        }
    }

    #[test]
    fn case_insensitive_fallback() {
        assert_eq!("mmrdata".parse::<DatasetKey>().unwrap(), DatasetKey::MmrData);
        assert_eq!(
            "PortfolioUnitDetails".parse::<DatasetKey>().unwrap(),
            DatasetKey::PortfolioUnitDetails
        );
    }

    #[test]
    fn unknown_key_errors() {
        assert!(matches!(
            "rentroll".parse::<DatasetKey>(),
            Err(StoaError::UnknownDataset { .. })
        ));
    }

    #[test]
    fn tables_are_distinct() {
        let mut tables: Vec<_> = DatasetKey::ALL.iter().map(|k| k.table()).collect();
        tables.sort();
        tables.dedup();
        assert_eq!(tables.len(), 8);
    }
}
