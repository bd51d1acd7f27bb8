//! Per-property leasing KPIs.
//!
//! Joins the eight leasing datasets on property name and folds them into
//! occupancy, leased and availability counts, leasing velocity, budget
//! variance, trade-outs and rent averages. Pure and deterministic: the same
//! rows and `as_of` always yield the same dashboard.

use std::collections::{BTreeMap, HashMap};

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use super::dataset::DatasetKey;
use super::row::{as_percent, fields, RawRow, RowView};

/// Yardi-style unit status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum UnitStatus {
    OccupiedNoNotice,
    NoticeRented,
    NoticeUnrented,
    VacantRented,
    VacantUnrented,
    Model,
    Down,
    Admin,
    Unknown,
}

impl UnitStatus {
    pub fn parse(raw: &str) -> Self {
        let folded: String = raw
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .map(|c| c.to_ascii_lowercase())
            .collect();
        match folded.as_str() {
            "occupiednonotice" | "occupied" | "occupiednotice" => Self::OccupiedNoNotice,
            "noticerented" | "occupiedntvl" | "ntvl" | "noticeleased" => Self::NoticeRented,
            "noticeunrented" | "occupiedntv" | "ntv" | "notice" => Self::NoticeUnrented,
            "vacantrented" | "vacantleased" | "preleased" => Self::VacantRented,
            "vacantunrented" | "vacant" | "vacantready" | "vacantnotready" => Self::VacantUnrented,
            "model" => Self::Model,
            "down" | "offline" => Self::Down,
            "admin" | "employee" => Self::Admin,
            _ => Self::Unknown,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::OccupiedNoNotice => "Occupied No Notice",
            Self::NoticeRented => "Notice Rented",
            Self::NoticeUnrented => "Notice Unrented",
            Self::VacantRented => "Vacant Rented",
            Self::VacantUnrented => "Vacant Unrented",
            Self::Model => "Model",
            Self::Down => "Down",
            Self::Admin => "Admin",
            Self::Unknown => "Unknown",
        }
    }

    pub fn is_occupied(&self) -> bool {
        matches!(
            self,
            Self::OccupiedNoNotice | Self::NoticeRented | Self::NoticeUnrented
        )
    }

    pub fn is_leased(&self) -> bool {
        matches!(
            self,
            Self::OccupiedNoNotice | Self::NoticeRented | Self::VacantRented
        )
    }

    pub fn is_available(&self) -> bool {
        matches!(self, Self::VacantUnrented | Self::NoticeUnrented)
    }
}

/// Look-back windows, in days
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KpiWindows {
    pub velocity_days: i64,
    pub tradeout_days: i64,
}

impl Default for KpiWindows {
    fn default() -> Self {
        Self {
            velocity_days: 28,
            tradeout_days: 90,
        }
    }
}

/// Rows for every dataset, keyed by dataset
#[derive(Debug, Clone, Default)]
pub struct DashboardInputs {
    rows: HashMap<DatasetKey, Vec<RawRow>>,
}

impl DashboardInputs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: DatasetKey, rows: Vec<RawRow>) -> Self {
        self.rows.insert(key, rows);
        self
    }

    pub fn insert(&mut self, key: DatasetKey, rows: Vec<RawRow>) {
        self.rows.insert(key, rows);
    }

    fn get(&self, key: DatasetKey) -> &[RawRow] {
        self.rows.get(&key).map(Vec::as_slice).unwrap_or(&[])
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PropertyKpi {
    pub property: String,
    pub total_units: usize,
    pub occupied: usize,
    pub leased: usize,
    pub available: usize,
    pub occupancy_pct: Option<f64>,
    pub leased_pct: Option<f64>,
    pub leases_last_window: usize,
    pub weekly_velocity: f64,
    pub budget_month: Option<NaiveDate>,
    pub budgeted_occupancy_pct: Option<f64>,
    pub budgeted_leased_pct: Option<f64>,
    pub occupancy_delta_to_budget: Option<f64>,
    pub leased_delta_to_budget: Option<f64>,
    pub avg_trade_out_pct: Option<f64>,
    pub avg_new_lease_trade_out_pct: Option<f64>,
    pub avg_renewal_trade_out_pct: Option<f64>,
    pub avg_asking_rent: Option<f64>,
    pub avg_recent_rent: Option<f64>,
    pub status_counts: BTreeMap<String, usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PortfolioKpi {
    pub property_count: usize,
    pub total_units: usize,
    pub occupied: usize,
    pub leased: usize,
    pub available: usize,
    pub occupancy_pct: Option<f64>,
    pub leased_pct: Option<f64>,
    pub leases_last_window: usize,
    pub weekly_velocity: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Dashboard {
    pub as_of: NaiveDate,
    pub velocity_window_days: i64,
    pub tradeout_window_days: i64,
    pub portfolio: PortfolioKpi,
    pub properties: Vec<PropertyKpi>,
}

impl Dashboard {
    /// Case-insensitive lookup of one property's KPIs.
    pub fn property(&self, name: &str) -> Option<&PropertyKpi> {
        let needle = name.trim();
        self.properties
            .iter()
            .find(|p| p.property.eq_ignore_ascii_case(needle))
    }
}

#[derive(Default)]
struct Accumulator {
    name: String,
    units: HashMap<String, UnitStatus>,
    unit_mix_total: f64,
    leases: usize,
    budget: Option<(NaiveDate, Option<f64>, Option<f64>)>,
    tradeouts_new: Vec<f64>,
    tradeouts_renewal: Vec<f64>,
    asking_rents: Vec<f64>,
    recent_rents: Vec<f64>,
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

fn ratio_pct(part: usize, whole: usize) -> Option<f64> {
    (whole > 0).then(|| round2(part as f64 / whole as f64 * 100.0))
}

fn mean(values: &[f64]) -> Option<f64> {
    (!values.is_empty()).then(|| round2(values.iter().sum::<f64>() / values.len() as f64))
}

fn within(date: Option<NaiveDate>, as_of: NaiveDate, days: i64) -> bool {
    match date {
        Some(d) => d <= as_of && d > as_of - Duration::days(days),
        None => false,
    }
}

struct Properties(BTreeMap<String, Accumulator>);

impl Properties {
    fn entry(&mut self, name: &str) -> &mut Accumulator {
        let acc = self.0.entry(name.to_lowercase()).or_default();
        if acc.name.is_empty() {
            acc.name = name.to_owned();
        }
        acc
    }
}

/// Build the dashboard from raw dataset rows.
pub fn compute_dashboard(inputs: &DashboardInputs, as_of: NaiveDate, windows: KpiWindows) -> Dashboard {
    let mut props = Properties(BTreeMap::new());

    // Unit master list, then detailed statuses layered on top
    for key in [DatasetKey::Units, DatasetKey::PortfolioUnitDetails] {
        for row in inputs.get(key) {
            let view = RowView::new(row);
            let Some(property) = view.property() else { continue };
            let acc = props.entry(&property);
            let Some(unit) = view.text(fields::UNIT) else { continue };
            let status = view
                .text(fields::UNIT_STATUS)
                .map(|s| UnitStatus::parse(&s))
                .unwrap_or(UnitStatus::Unknown);
            let slot = acc.units.entry(unit).or_insert(UnitStatus::Unknown);
            if status != UnitStatus::Unknown {
                *slot = status;
            }
        }
    }

    for row in inputs.get(DatasetKey::UnitMix) {
        let view = RowView::new(row);
        let Some(property) = view.property() else { continue };
        let count = view.number(fields::UNIT_COUNT).unwrap_or(0.0).max(0.0);
        props.entry(&property).unit_mix_total += count;
    }

    for row in inputs.get(DatasetKey::Leasing) {
        let view = RowView::new(row);
        let Some(property) = view.property() else { continue };
        let acc = props.entry(&property);
        if within(view.date(fields::SIGNED_DATE), as_of, windows.velocity_days) {
            acc.leases += 1;
        }
    }

    for row in inputs.get(DatasetKey::MmrData) {
        let view = RowView::new(row);
        let Some(property) = view.property() else { continue };
        let Some(month) = view.date(fields::MONTH) else { continue };
        if month > as_of {
            continue;
        }
        let occ = view.number(fields::BUDGETED_OCCUPANCY).map(as_percent);
        let leased = view.number(fields::BUDGETED_LEASED).map(as_percent);
        let acc = props.entry(&property);
        let newer = acc.budget.map_or(true, |(current, _, _)| month > current);
        if newer {
            acc.budget = Some((month, occ, leased));
        }
    }

    for row in inputs.get(DatasetKey::UnitByUnitTradeout) {
        let view = RowView::new(row);
        let Some(property) = view.property() else { continue };
        let (Some(prior), Some(new)) = (view.number(fields::PRIOR_RENT), view.number(fields::NEW_RENT)) else {
            continue;
        };
        if prior <= 0.0 {
            continue;
        }
        if let Some(date) = view.date(fields::TRADEOUT_DATE) {
            if !within(Some(date), as_of, windows.tradeout_days) {
                continue;
            }
        }
        let pct = (new - prior) / prior * 100.0;
        let renewal = view
            .text(fields::LEASE_TYPE)
            .is_some_and(|t| t.to_ascii_lowercase().contains("renew"));
        let acc = props.entry(&property);
        if renewal {
            acc.tradeouts_renewal.push(pct);
        } else {
            acc.tradeouts_new.push(pct);
        }
    }

    for row in inputs.get(DatasetKey::Pricing) {
        let view = RowView::new(row);
        let Some(property) = view.property() else { continue };
        if let Some(rent) = view.number(fields::ASKING_RENT).filter(|r| *r > 0.0) {
            props.entry(&property).asking_rents.push(rent);
        }
    }

    for row in inputs.get(DatasetKey::RecentRents) {
        let view = RowView::new(row);
        let Some(property) = view.property() else { continue };
        if let Some(rent) = view.number(fields::RECENT_RENT).filter(|r| *r > 0.0) {
            props.entry(&property).recent_rents.push(rent);
        }
    }

    let weeks = windows.velocity_days.max(1) as f64 / 7.0;
    let properties: Vec<PropertyKpi> = props
        .0
        .into_values()
        .map(|acc| finish_property(acc, weeks))
        .collect();

    let portfolio = roll_up(&properties, weeks);

    Dashboard {
        as_of,
        velocity_window_days: windows.velocity_days,
        tradeout_window_days: windows.tradeout_days,
        portfolio,
        properties,
    }
}

fn finish_property(acc: Accumulator, weeks: f64) -> PropertyKpi {
    let mut status_counts = BTreeMap::new();
    let (mut occupied, mut leased, mut available) = (0, 0, 0);
    for status in acc.units.values() {
        *status_counts.entry(status.label().to_owned()).or_insert(0) += 1;
        occupied += usize::from(status.is_occupied());
        leased += usize::from(status.is_leased());
        available += usize::from(status.is_available());
    }

    let has_statuses = !acc.units.is_empty();
    let total_units = if has_statuses {
        acc.units.len()
    } else {
        acc.unit_mix_total.round() as usize
    };

    let occupancy_pct = if has_statuses { ratio_pct(occupied, total_units) } else { None };
    let leased_pct = if has_statuses { ratio_pct(leased, total_units) } else { None };

    let (budget_month, budgeted_occupancy_pct, budgeted_leased_pct) = match acc.budget {
        Some((month, occ, leased)) => (Some(month), occ.map(round2), leased.map(round2)),
        None => (None, None, None),
    };

    let delta = |actual: Option<f64>, budget: Option<f64>| match (actual, budget) {
        (Some(a), Some(b)) => Some(round2(a - b)),
        _ => None,
    };

    let all_tradeouts: Vec<f64> = acc
        .tradeouts_new
        .iter()
        .chain(acc.tradeouts_renewal.iter())
        .copied()
        .collect();

    PropertyKpi {
        property: acc.name,
        total_units,
        occupied,
        leased,
        available,
        occupancy_pct,
        leased_pct,
        leases_last_window: acc.leases,
        weekly_velocity: round2(acc.leases as f64 / weeks),
        budget_month,
        budgeted_occupancy_pct,
        budgeted_leased_pct,
        occupancy_delta_to_budget: delta(occupancy_pct, budgeted_occupancy_pct),
        leased_delta_to_budget: delta(leased_pct, budgeted_leased_pct),
        avg_trade_out_pct: mean(&all_tradeouts),
        avg_new_lease_trade_out_pct: mean(&acc.tradeouts_new),
        avg_renewal_trade_out_pct: mean(&acc.tradeouts_renewal),
        avg_asking_rent: mean(&acc.asking_rents),
        avg_recent_rent: mean(&acc.recent_rents),
        status_counts,
    }
}

fn roll_up(properties: &[PropertyKpi], weeks: f64) -> PortfolioKpi {
    let with_statuses: Vec<&PropertyKpi> = properties
        .iter()
        .filter(|p| p.occupancy_pct.is_some())
        .collect();
    let status_units: usize = with_statuses.iter().map(|p| p.total_units).sum();
    let occupied: usize = with_statuses.iter().map(|p| p.occupied).sum();
    let leased: usize = with_statuses.iter().map(|p| p.leased).sum();
    let available: usize = with_statuses.iter().map(|p| p.available).sum();
    let leases: usize = properties.iter().map(|p| p.leases_last_window).sum();

    PortfolioKpi {
        property_count: properties.len(),
        total_units: properties.iter().map(|p| p.total_units).sum(),
        occupied,
        leased,
        available,
        occupancy_pct: ratio_pct(occupied, status_units),
        leased_pct: ratio_pct(leased, status_units),
        leases_last_window: leases,
        weekly_velocity: round2(leases as f64 / weeks),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn rows(values: Vec<Value>) -> Vec<RawRow> {
        values
            .into_iter()
            .map(|v| v.as_object().cloned().unwrap())
            .collect()
    }

    fn as_of() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 30).unwrap()
    }

    fn sample_inputs() -> DashboardInputs {
        DashboardInputs::new()
            .with(
                DatasetKey::Units,
                rows(vec![
                    json!({"Property": "Heights", "Unit": "101", "Status": "Occupied"}),
                    json!({"Property": "Heights", "Unit": "102", "Status": "Vacant"}),
                    json!({"Property": "Heights", "Unit": "103", "Status": "Vacant"}),
                    json!({"Property": "Heights", "Unit": "104", "Status": "Notice"}),
                ]),
            )
            .with(
                DatasetKey::PortfolioUnitDetails,
                rows(vec![
                    // PUD refines 102 to pre-leased and adds a model unit
                    json!({"Property Name": "heights", "Unit Number": "102", "Unit Status": "Vacant Rented"}),
                    json!({"Property Name": "Heights", "Unit Number": "105", "Unit Status": "Model"}),
                ]),
            )
            .with(
                DatasetKey::Leasing,
                rows(vec![
                    json!({"Property": "Heights", "LeaseSignedDate": "2024-06-20"}),
                    json!({"Property": "Heights", "LeaseSignedDate": "06/03/2024"}),
                    json!({"Property": "Heights", "LeaseSignedDate": "2024-05-01"}),
                ]),
            )
            .with(
                DatasetKey::MmrData,
                rows(vec![
                    json!({"Property": "Heights", "Month": "2024-05-01", "BudgetedOccupancy": 0.90}),
                    json!({"Property": "Heights", "Month": "2024-06-01", "BudgetedOccupancy": "92%", "BudgetedLeased": 95}),
                    json!({"Property": "Heights", "Month": "2024-07-01", "BudgetedOccupancy": 0.99}),
                ]),
            )
            .with(
                DatasetKey::UnitByUnitTradeout,
                rows(vec![
                    json!({"Property": "Heights", "PriorRent": 1000, "NewRent": 1100, "LeaseType": "New Lease", "SignedDate": "2024-06-01"}),
                    json!({"Property": "Heights", "PriorRent": "$1,000", "NewRent": "1,050", "LeaseType": "Renewal", "SignedDate": "2024-06-10"}),
                    json!({"Property": "Heights", "PriorRent": 0, "NewRent": 1200}),
                    json!({"Property": "Heights", "PriorRent": 1000, "NewRent": 2000, "SignedDate": "2023-01-01"}),
                ]),
            )
            .with(
                DatasetKey::Pricing,
                rows(vec![
                    json!({"Property": "Heights", "FloorPlan": "A1", "AskingRent": 1400}),
                    json!({"Property": "Heights", "FloorPlan": "B1", "AskingRent": 1800}),
                ]),
            )
            .with(
                DatasetKey::RecentRents,
                rows(vec![json!({"Property": "Heights", "EffectiveRent": "1,525.50"})]),
            )
            .with(
                DatasetKey::UnitMix,
                rows(vec![
                    json!({"Property": "Lakeside", "FloorPlan": "A1", "UnitCount": 120}),
                    json!({"Property": "Lakeside", "FloorPlan": "B1", "UnitCount": "80"}),
                ]),
            )
    }

    #[test]
    fn status_parsing() {
        assert_eq!(UnitStatus::parse("Occupied No Notice"), UnitStatus::OccupiedNoNotice);
        assert_eq!(UnitStatus::parse("vacant-unrented"), UnitStatus::VacantUnrented);
        assert_eq!(UnitStatus::parse("Notice Rented"), UnitStatus::NoticeRented);
        assert_eq!(UnitStatus::parse("???"), UnitStatus::Unknown);
    }

    #[test]
    fn occupancy_leased_available() {
        let dash = compute_dashboard(&sample_inputs(), as_of(), KpiWindows::default());
        let heights = dash.property("HEIGHTS").unwrap();

        // 101 occupied, 102 vacant rented, 103 vacant unrented, 104 notice unrented, 105 model
        assert_eq!(heights.total_units, 5);
        assert_eq!(heights.occupied, 2);
        assert_eq!(heights.leased, 2);
        assert_eq!(heights.available, 2);
        assert_eq!(heights.occupancy_pct, Some(40.0));
        assert_eq!(heights.leased_pct, Some(40.0));
        assert_eq!(heights.status_counts.get("Model"), Some(&1));
    }

    #[test]
    fn velocity_counts_window_only() {
        let dash = compute_dashboard(&sample_inputs(), as_of(), KpiWindows::default());
        let heights = dash.property("Heights").unwrap();
        assert_eq!(heights.leases_last_window, 2);
        assert_eq!(heights.weekly_velocity, 0.5);
    }

    #[test]
    fn budget_uses_latest_month_not_after_as_of() {
        let dash = compute_dashboard(&sample_inputs(), as_of(), KpiWindows::default());
        let heights = dash.property("Heights").unwrap();
        assert_eq!(heights.budget_month, NaiveDate::from_ymd_opt(2024, 6, 1));
        assert_eq!(heights.budgeted_occupancy_pct, Some(92.0));
        assert_eq!(heights.budgeted_leased_pct, Some(95.0));
        assert_eq!(heights.occupancy_delta_to_budget, Some(-52.0));
        assert_eq!(heights.leased_delta_to_budget, Some(-55.0));
    }

    #[test]
    fn tradeouts_split_and_filter() {
        let dash = compute_dashboard(&sample_inputs(), as_of(), KpiWindows::default());
        let heights = dash.property("Heights").unwrap();
        assert_eq!(heights.avg_new_lease_trade_out_pct, Some(10.0));
        assert_eq!(heights.avg_renewal_trade_out_pct, Some(5.0));
        assert_eq!(heights.avg_trade_out_pct, Some(7.5));
    }

    #[test]
    fn rent_averages() {
        let dash = compute_dashboard(&sample_inputs(), as_of(), KpiWindows::default());
        let heights = dash.property("Heights").unwrap();
        assert_eq!(heights.avg_asking_rent, Some(1600.0));
        assert_eq!(heights.avg_recent_rent, Some(1525.5));
    }

    #[test]
    fn unit_mix_fallback_has_no_percentages() {
        let dash = compute_dashboard(&sample_inputs(), as_of(), KpiWindows::default());
        let lakeside = dash.property("Lakeside").unwrap();
        assert_eq!(lakeside.total_units, 200);
        assert_eq!(lakeside.occupancy_pct, None);
        assert_eq!(lakeside.weekly_velocity, 0.0);
    }

    #[test]
    fn portfolio_rollup_is_unit_weighted() {
        let dash = compute_dashboard(&sample_inputs(), as_of(), KpiWindows::default());
        assert_eq!(dash.portfolio.property_count, 2);
        assert_eq!(dash.portfolio.total_units, 205);
        assert_eq!(dash.portfolio.occupancy_pct, Some(40.0));
        assert_eq!(dash.portfolio.leases_last_window, 2);
    }

    #[test]
    fn properties_sorted_and_deterministic() {
        let a = compute_dashboard(&sample_inputs(), as_of(), KpiWindows::default());
        let b = compute_dashboard(&sample_inputs(), as_of(), KpiWindows::default());
        assert_eq!(a, b);
        let names: Vec<_> = a.properties.iter().map(|p| p.property.as_str()).collect();
        assert_eq!(names, vec!["Heights", "Lakeside"]);
    }

    #[test]
    fn empty_inputs_produce_empty_dashboard() {
        let dash = compute_dashboard(&DashboardInputs::new(), as_of(), KpiWindows::default());
        assert!(dash.properties.is_empty());
        assert_eq!(dash.portfolio.occupancy_pct, None);
    }
}
