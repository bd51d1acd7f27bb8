//! Loan, participation and capital-stack arithmetic.
//!
//! All money is `Decimal`. Percentages are on a 0-100 scale rounded to four
//! decimal places; a zero denominator yields `None` instead of a division.

use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use serde::Serialize;

const PERCENT_DP: u32 = 4;
const MONEY_DP: u32 = 2;

/// Calendar month boundaries crossed between two dates.
///
/// Day of month is ignored: Jan 31 → Feb 1 is one month.
pub fn months_between(from: NaiveDate, to: NaiveDate) -> i32 {
    (to.year() - from.year()) * 12 + to.month() as i32 - from.month() as i32
}

/// Months remaining until maturity; negative once matured.
pub fn months_to_maturity(maturity: Option<NaiveDate>, today: NaiveDate) -> Option<i32> {
    maturity.map(|m| months_between(today, m))
}

/// `part / whole * 100`, or `None` when `whole` is zero.
pub fn percent_of(part: Decimal, whole: Decimal) -> Option<Decimal> {
    if whole.is_zero() {
        return None;
    }
    part.checked_div(whole)
        .and_then(|ratio| ratio.checked_mul(Decimal::ONE_HUNDRED))
        .map(|p| p.round_dp(PERCENT_DP))
}

/// Dollar amount of a percentage guarantee on a loan.
pub fn guarantee_amount(loan_amount: Decimal, percent: Decimal) -> Decimal {
    (loan_amount * percent / Decimal::ONE_HUNDRED).round_dp(MONEY_DP)
}

/// One bank's slice of a syndicated loan
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParticipationShare {
    pub participation_id: i32,
    pub exposure: Decimal,
    pub paid_off: bool,
}

/// Share of total active exposure held by each participation.
///
/// Paid-off participations carry no share. Output order matches input order.
pub fn participation_percents(shares: &[ParticipationShare]) -> Vec<(i32, Option<Decimal>)> {
    let active_total: Decimal = shares
        .iter()
        .filter(|s| !s.paid_off)
        .map(|s| s.exposure)
        .sum();

    shares
        .iter()
        .map(|s| {
            let pct = if s.paid_off {
                None
            } else {
                percent_of(s.exposure, active_total)
            };
            (s.participation_id, pct)
        })
        .collect()
}

/// Exposure a bank carries across all participations
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct BankExposure {
    pub bank_id: i32,
    pub active_participations: usize,
    pub total_active_exposure: Decimal,
    pub hold_limit: Option<Decimal>,
    pub percent_of_hold_limit: Option<Decimal>,
    pub remaining_capacity: Option<Decimal>,
}

/// Roll up a bank's participations against its hold limit.
pub fn bank_exposure(
    bank_id: i32,
    hold_limit: Option<Decimal>,
    participations: &[ParticipationShare],
) -> BankExposure {
    let active: Vec<_> = participations.iter().filter(|p| !p.paid_off).collect();
    let total: Decimal = active.iter().map(|p| p.exposure).sum();

    BankExposure {
        bank_id,
        active_participations: active.len(),
        total_active_exposure: total,
        hold_limit,
        percent_of_hold_limit: hold_limit.and_then(|limit| percent_of(total, limit)),
        remaining_capacity: hold_limit.map(|limit| limit - total),
    }
}

/// Debt line of a project's capital stack
#[derive(Debug, Clone, PartialEq)]
pub struct DebtLine {
    pub loan_id: i32,
    pub amount: Decimal,
    pub is_active: bool,
}

/// Equity line of a project's capital stack
#[derive(Debug, Clone, PartialEq)]
pub struct EquityLine {
    pub equity_commitment_id: i32,
    pub equity_type: Option<String>,
    pub amount: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct EquityShare {
    pub equity_commitment_id: i32,
    pub equity_type: Option<String>,
    pub amount: Decimal,
    pub percent_of_equity: Option<Decimal>,
    pub percent_of_capitalization: Option<Decimal>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct CapitalStack {
    pub project_id: i32,
    pub total_debt: Decimal,
    pub total_equity: Decimal,
    pub total_capitalization: Decimal,
    pub debt_percent: Option<Decimal>,
    pub equity_percent: Option<Decimal>,
    pub equity: Vec<EquityShare>,
}

/// Summarize a project's active debt and committed equity.
pub fn capital_stack(project_id: i32, loans: &[DebtLine], equity: &[EquityLine]) -> CapitalStack {
    let total_debt: Decimal = loans.iter().filter(|l| l.is_active).map(|l| l.amount).sum();
    let total_equity: Decimal = equity.iter().map(|e| e.amount).sum();
    let total_capitalization = total_debt + total_equity;

    let equity = equity
        .iter()
        .map(|e| EquityShare {
            equity_commitment_id: e.equity_commitment_id,
            equity_type: e.equity_type.clone(),
            amount: e.amount,
            percent_of_equity: percent_of(e.amount, total_equity),
            percent_of_capitalization: percent_of(e.amount, total_capitalization),
        })
        .collect();

    CapitalStack {
        project_id,
        total_debt,
        total_equity,
        total_capitalization,
        debt_percent: percent_of(total_debt, total_capitalization),
        equity_percent: percent_of(total_equity, total_capitalization),
        equity,
    }
}

/// Whether a DSCR test result meets its requirement.
pub fn dscr_passed(requirement: Option<Decimal>, actual: Option<Decimal>) -> Option<bool> {
    match (requirement, actual) {
        (Some(req), Some(act)) => Some(act >= req),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::prelude::*;

    fn d(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn date(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn months_between_counts_boundaries() {
        assert_eq!(months_between(date(2024, 1, 31), date(2024, 2, 1)), 1);
        assert_eq!(months_between(date(2024, 1, 1), date(2024, 1, 31)), 0);
        assert_eq!(months_between(date(2023, 11, 15), date(2025, 2, 1)), 15);
        assert_eq!(months_between(date(2025, 2, 1), date(2023, 11, 15)), -15);
    }

    #[test]
    fn months_to_maturity_handles_missing_date() {
        assert_eq!(months_to_maturity(None, date(2024, 1, 1)), None);
        assert_eq!(
            months_to_maturity(Some(date(2026, 6, 30)), date(2024, 6, 1)),
            Some(24)
        );
    }

    #[test]
    fn percent_of_zero_whole_is_none() {
        assert_eq!(percent_of(d("5"), Decimal::ZERO), None);
        assert_eq!(percent_of(d("1"), d("3")), Some(d("33.3333")));
    }

    #[test]
    fn participation_percents_skip_paid_off() {
        let shares = [
            ParticipationShare { participation_id: 1, exposure: d("6000000"), paid_off: false },
            ParticipationShare { participation_id: 2, exposure: d("4000000"), paid_off: false },
            ParticipationShare { participation_id: 3, exposure: d("9000000"), paid_off: true },
        ];
        let pcts = participation_percents(&shares);
        assert_eq!(pcts[0], (1, Some(d("60"))));
        assert_eq!(pcts[1], (2, Some(d("40"))));
        assert_eq!(pcts[2], (3, None));
    }

    #[test]
    fn guarantee_amount_rounds_to_cents() {
        assert_eq!(guarantee_amount(d("12345678.91"), d("25")), d("3086419.73"));
    }

    #[test]
    fn bank_exposure_against_hold_limit() {
        let parts = [
            ParticipationShare { participation_id: 1, exposure: d("5000000"), paid_off: false },
            ParticipationShare { participation_id: 2, exposure: d("2500000"), paid_off: true },
            ParticipationShare { participation_id: 3, exposure: d("2500000"), paid_off: false },
        ];
        let exp = bank_exposure(7, Some(d("20000000")), &parts);
        assert_eq!(exp.active_participations, 2);
        assert_eq!(exp.total_active_exposure, d("7500000"));
        assert_eq!(exp.percent_of_hold_limit, Some(d("37.5")));
        assert_eq!(exp.remaining_capacity, Some(d("12500000")));

        let no_limit = bank_exposure(7, None, &parts);
        assert_eq!(no_limit.percent_of_hold_limit, None);
    }

    #[test]
    fn capital_stack_percentages() {
        let loans = [
            DebtLine { loan_id: 1, amount: d("30000000"), is_active: true },
            DebtLine { loan_id: 2, amount: d("99000000"), is_active: false },
        ];
        let equity = [
            EquityLine { equity_commitment_id: 10, equity_type: Some("Preferred Equity".into()), amount: d("7500000") },
            EquityLine { equity_commitment_id: 11, equity_type: None, amount: d("2500000") },
        ];
        let stack = capital_stack(42, &loans, &equity);
        assert_eq!(stack.total_debt, d("30000000"));
        assert_eq!(stack.total_equity, d("10000000"));
        assert_eq!(stack.debt_percent, Some(d("75")));
        assert_eq!(stack.equity[0].percent_of_equity, Some(d("75")));
        assert_eq!(stack.equity[1].percent_of_capitalization, Some(d("6.25")));
    }

    #[test]
    fn empty_capital_stack_has_no_percentages() {
        let stack = capital_stack(1, &[], &[]);
        assert_eq!(stack.total_capitalization, Decimal::ZERO);
        assert_eq!(stack.debt_percent, None);
    }

    #[test]
    fn dscr_pass_fail() {
        assert_eq!(dscr_passed(Some(d("1.25")), Some(d("1.30"))), Some(true));
        assert_eq!(dscr_passed(Some(d("1.25")), Some(d("1.10"))), Some(false));
        assert_eq!(dscr_passed(None, Some(d("1.10"))), None);
    }
}
