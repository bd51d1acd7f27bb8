//! Request bodies for `/api/banking`.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;
use stoactl_core::enums::{parse_optional, CovenantType, EquityType, FinancingType, FixedOrFloating, IndexName};
use stoactl_core::validation::optional_text;
use stoactl_core::ValidationError;

use super::core_entities::check_email;
use super::patch::{non_negative, patch_text, patch_with};
use crate::db::update::double_option;

const SHORT_MAX: usize = 255;
const TEXT_MAX: usize = 4000;

/// A foreign key the body must carry.
pub fn required_id(field: &'static str, value: Option<i32>) -> Result<i32, ValidationError> {
    match value {
        Some(id) if id > 0 => Ok(id),
        Some(_) => Err(ValidationError::out_of_range(field, "must be a positive id")),
        None => Err(ValidationError::Missing { field }),
    }
}

fn percent(field: &'static str, value: Option<Decimal>) -> Result<Option<Decimal>, ValidationError> {
    match value {
        Some(v) if v < Decimal::ZERO || v > Decimal::ONE_HUNDRED => {
            Err(ValidationError::out_of_range(field, "must be between 0 and 100"))
        }
        other => Ok(other),
    }
}

fn canonical<T: Copy>(
    value: Option<String>,
    parse: impl Fn(&str) -> Result<T, ValidationError>,
    render: impl Fn(T) -> &'static str,
) -> Result<Option<String>, ValidationError> {
    Ok(parse_optional(value.as_deref(), parse)?.map(|v| render(v).to_owned()))
}

/// Cross-field loan rules, checked against the effective (merged) values.
pub fn check_loan_terms(
    fixed_or_floating: Option<&str>,
    index_name: Option<&str>,
    closing: Option<NaiveDate>,
    maturity: Option<NaiveDate>,
) -> Result<(), ValidationError> {
    if index_name.is_some() && fixed_or_floating != Some(FixedOrFloating::Floating.as_str()) {
        return Err(ValidationError::conflict(
            "IndexName is only allowed on Floating loans",
        ));
    }
    if let (Some(c), Some(m)) = (closing, maturity) {
        if m < c {
            return Err(ValidationError::conflict(
                "MaturityDate must not precede LoanClosingDate",
            ));
        }
    }
    Ok(())
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct NewLoan {
    pub project_id: Option<i32>,
    pub loan_type_id: Option<i32>,
    pub lender_id: Option<i32>,
    pub financing_type: Option<String>,
    pub loan_amount: Option<Decimal>,
    pub loan_closing_date: Option<NaiveDate>,
    pub maturity_date: Option<NaiveDate>,
    pub fixed_or_floating: Option<String>,
    pub index_name: Option<String>,
    pub spread: Option<Decimal>,
    pub interest_rate: Option<Decimal>,
    pub is_active: Option<bool>,
    pub dscr_requirement: Option<Decimal>,
    pub dscr_test_date: Option<NaiveDate>,
    pub occupancy_requirement: Option<Decimal>,
    pub occupancy_test_date: Option<NaiveDate>,
    pub notes: Option<String>,
}

impl NewLoan {
    pub fn validate(self) -> Result<Self, ValidationError> {
        let loan = Self {
            project_id: Some(required_id("ProjectId", self.project_id)?),
            financing_type: canonical(self.financing_type, FinancingType::parse, |v| v.as_str())?,
            loan_amount: non_negative("LoanAmount", self.loan_amount)?,
            fixed_or_floating: canonical(self.fixed_or_floating, FixedOrFloating::parse, |v| v.as_str())?,
            index_name: canonical(self.index_name, IndexName::parse, |v| v.as_str())?,
            occupancy_requirement: percent("OccupancyRequirement", self.occupancy_requirement)?,
            notes: optional_text("Notes", self.notes.as_deref(), TEXT_MAX)?,
            ..self
        };
        check_loan_terms(
            loan.fixed_or_floating.as_deref(),
            loan.index_name.as_deref(),
            loan.loan_closing_date,
            loan.maturity_date,
        )?;
        Ok(loan)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct LoanPatch {
    pub project_id: Option<i32>,
    #[serde(default, deserialize_with = "double_option")]
    pub loan_type_id: Option<Option<i32>>,
    #[serde(default, deserialize_with = "double_option")]
    pub lender_id: Option<Option<i32>>,
    #[serde(default, deserialize_with = "double_option")]
    pub financing_type: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub loan_amount: Option<Option<Decimal>>,
    #[serde(default, deserialize_with = "double_option")]
    pub loan_closing_date: Option<Option<NaiveDate>>,
    #[serde(default, deserialize_with = "double_option")]
    pub maturity_date: Option<Option<NaiveDate>>,
    #[serde(default, deserialize_with = "double_option")]
    pub fixed_or_floating: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub index_name: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub spread: Option<Option<Decimal>>,
    #[serde(default, deserialize_with = "double_option")]
    pub interest_rate: Option<Option<Decimal>>,
    pub is_active: Option<bool>,
    #[serde(default, deserialize_with = "double_option")]
    pub dscr_requirement: Option<Option<Decimal>>,
    #[serde(default, deserialize_with = "double_option")]
    pub dscr_test_date: Option<Option<NaiveDate>>,
    #[serde(default, deserialize_with = "double_option")]
    pub occupancy_requirement: Option<Option<Decimal>>,
    #[serde(default, deserialize_with = "double_option")]
    pub occupancy_test_date: Option<Option<NaiveDate>>,
    #[serde(default, deserialize_with = "double_option")]
    pub notes: Option<Option<String>>,
}

impl LoanPatch {
    pub fn validate(self) -> Result<Self, ValidationError> {
        Ok(Self {
            project_id: self
                .project_id
                .map(|id| required_id("ProjectId", Some(id)))
                .transpose()?,
            financing_type: patch_with(self.financing_type, |v| {
                canonical(Some(v), FinancingType::parse, |t| t.as_str())
            })?,
            loan_amount: patch_with(self.loan_amount, |v| non_negative("LoanAmount", Some(v)))?,
            fixed_or_floating: patch_with(self.fixed_or_floating, |v| {
                canonical(Some(v), FixedOrFloating::parse, |t| t.as_str())
            })?,
            index_name: patch_with(self.index_name, |v| {
                canonical(Some(v), IndexName::parse, |t| t.as_str())
            })?,
            occupancy_requirement: patch_with(self.occupancy_requirement, |v| {
                percent("OccupancyRequirement", Some(v))
            })?,
            notes: patch_text("Notes", self.notes, TEXT_MAX)?,
            ..self
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct NewParticipation {
    pub loan_id: Option<i32>,
    pub bank_id: Option<i32>,
    pub exposure_amount: Option<Decimal>,
    pub paid_off: Option<bool>,
    pub notes: Option<String>,
}

impl NewParticipation {
    pub fn validate(self) -> Result<Self, ValidationError> {
        Ok(Self {
            loan_id: Some(required_id("LoanId", self.loan_id)?),
            bank_id: Some(required_id("BankId", self.bank_id)?),
            exposure_amount: Some(
                non_negative("ExposureAmount", self.exposure_amount)?.unwrap_or(Decimal::ZERO),
            ),
            notes: optional_text("Notes", self.notes.as_deref(), TEXT_MAX)?,
            ..self
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ParticipationPatch {
    pub bank_id: Option<i32>,
    pub exposure_amount: Option<Decimal>,
    pub paid_off: Option<bool>,
    #[serde(default, deserialize_with = "double_option")]
    pub notes: Option<Option<String>>,
}

impl ParticipationPatch {
    pub fn validate(self) -> Result<Self, ValidationError> {
        Ok(Self {
            bank_id: self
                .bank_id
                .map(|id| required_id("BankId", Some(id)))
                .transpose()?,
            exposure_amount: non_negative("ExposureAmount", self.exposure_amount)?,
            notes: patch_text("Notes", self.notes, TEXT_MAX)?,
            ..self
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct NewGuarantee {
    pub project_id: Option<i32>,
    pub loan_id: Option<i32>,
    pub person_id: Option<i32>,
    pub guarantee_percent: Option<Decimal>,
    pub guarantee_amount: Option<Decimal>,
    pub notes: Option<String>,
}

impl NewGuarantee {
    pub fn validate(self) -> Result<Self, ValidationError> {
        Ok(Self {
            project_id: Some(required_id("ProjectId", self.project_id)?),
            person_id: Some(required_id("PersonId", self.person_id)?),
            guarantee_percent: percent("GuaranteePercent", self.guarantee_percent)?,
            guarantee_amount: non_negative("GuaranteeAmount", self.guarantee_amount)?,
            notes: optional_text("Notes", self.notes.as_deref(), TEXT_MAX)?,
            ..self
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct GuaranteePatch {
    #[serde(default, deserialize_with = "double_option")]
    pub loan_id: Option<Option<i32>>,
    pub person_id: Option<i32>,
    #[serde(default, deserialize_with = "double_option")]
    pub guarantee_percent: Option<Option<Decimal>>,
    #[serde(default, deserialize_with = "double_option")]
    pub guarantee_amount: Option<Option<Decimal>>,
    #[serde(default, deserialize_with = "double_option")]
    pub notes: Option<Option<String>>,
}

impl GuaranteePatch {
    pub fn validate(self) -> Result<Self, ValidationError> {
        Ok(Self {
            person_id: self
                .person_id
                .map(|id| required_id("PersonId", Some(id)))
                .transpose()?,
            guarantee_percent: patch_with(self.guarantee_percent, |v| {
                percent("GuaranteePercent", Some(v))
            })?,
            guarantee_amount: patch_with(self.guarantee_amount, |v| {
                non_negative("GuaranteeAmount", Some(v))
            })?,
            notes: patch_text("Notes", self.notes, TEXT_MAX)?,
            ..self
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct NewBurndown {
    pub burndown_date: Option<NaiveDate>,
    pub remaining_percent: Option<Decimal>,
    pub remaining_amount: Option<Decimal>,
    pub notes: Option<String>,
}

impl NewBurndown {
    pub fn validate(self) -> Result<Self, ValidationError> {
        Ok(Self {
            burndown_date: Some(self.burndown_date.ok_or(ValidationError::Missing {
                field: "BurndownDate",
            })?),
            remaining_percent: percent("RemainingPercent", self.remaining_percent)?,
            remaining_amount: non_negative("RemainingAmount", self.remaining_amount)?,
            notes: optional_text("Notes", self.notes.as_deref(), TEXT_MAX)?,
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct BurndownPatch {
    pub burndown_date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "double_option")]
    pub remaining_percent: Option<Option<Decimal>>,
    #[serde(default, deserialize_with = "double_option")]
    pub remaining_amount: Option<Option<Decimal>>,
    #[serde(default, deserialize_with = "double_option")]
    pub notes: Option<Option<String>>,
}

impl BurndownPatch {
    pub fn validate(self) -> Result<Self, ValidationError> {
        Ok(Self {
            remaining_percent: patch_with(self.remaining_percent, |v| {
                percent("RemainingPercent", Some(v))
            })?,
            remaining_amount: patch_with(self.remaining_amount, |v| {
                non_negative("RemainingAmount", Some(v))
            })?,
            notes: patch_text("Notes", self.notes, TEXT_MAX)?,
            ..self
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct NewCovenant {
    pub project_id: Option<i32>,
    pub loan_id: Option<i32>,
    pub covenant_type: Option<String>,
    pub requirement: Option<String>,
    pub threshold: Option<Decimal>,
    pub compliance_date: Option<NaiveDate>,
    pub is_completed: Option<bool>,
    pub reminder_email: Option<String>,
    pub reminder_days_before: Option<i32>,
    pub notes: Option<String>,
}

impl NewCovenant {
    pub fn validate(self) -> Result<Self, ValidationError> {
        let covenant_type = canonical(self.covenant_type, CovenantType::parse, |v| v.as_str())?
            .ok_or(ValidationError::Missing {
                field: "CovenantType",
            })?;
        Ok(Self {
            project_id: Some(required_id("ProjectId", self.project_id)?),
            covenant_type: Some(covenant_type),
            requirement: optional_text("Requirement", self.requirement.as_deref(), SHORT_MAX)?,
            reminder_email: check_email("ReminderEmail", self.reminder_email)?,
            reminder_days_before: non_negative("ReminderDaysBefore", self.reminder_days_before)?,
            notes: optional_text("Notes", self.notes.as_deref(), TEXT_MAX)?,
            ..self
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CovenantPatch {
    #[serde(default, deserialize_with = "double_option")]
    pub loan_id: Option<Option<i32>>,
    pub covenant_type: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub requirement: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub threshold: Option<Option<Decimal>>,
    #[serde(default, deserialize_with = "double_option")]
    pub compliance_date: Option<Option<NaiveDate>>,
    pub is_completed: Option<bool>,
    #[serde(default, deserialize_with = "double_option")]
    pub reminder_email: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub reminder_days_before: Option<Option<i32>>,
    #[serde(default, deserialize_with = "double_option")]
    pub notes: Option<Option<String>>,
}

impl CovenantPatch {
    pub fn validate(self) -> Result<Self, ValidationError> {
        Ok(Self {
            covenant_type: self
                .covenant_type
                .map(|t| CovenantType::parse(&t).map(|v| v.as_str().to_owned()))
                .transpose()?,
            requirement: patch_text("Requirement", self.requirement, SHORT_MAX)?,
            reminder_email: patch_with(self.reminder_email, |e| check_email("ReminderEmail", Some(e)))?,
            reminder_days_before: patch_with(self.reminder_days_before, |d| {
                non_negative("ReminderDaysBefore", Some(d))
            })?,
            notes: patch_text("Notes", self.notes, TEXT_MAX)?,
            ..self
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct NewDscrTest {
    pub project_id: Option<i32>,
    pub loan_id: Option<i32>,
    pub test_number: Option<i32>,
    pub test_date: Option<NaiveDate>,
    pub requirement: Option<Decimal>,
    pub projected_value: Option<Decimal>,
    pub actual_value: Option<Decimal>,
}

impl NewDscrTest {
    pub fn validate(self) -> Result<Self, ValidationError> {
        Ok(Self {
            project_id: Some(required_id("ProjectId", self.project_id)?),
            test_number: non_negative("TestNumber", self.test_number)?,
            requirement: non_negative("Requirement", self.requirement)?,
            ..self
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DscrTestPatch {
    #[serde(default, deserialize_with = "double_option")]
    pub loan_id: Option<Option<i32>>,
    #[serde(default, deserialize_with = "double_option")]
    pub test_number: Option<Option<i32>>,
    #[serde(default, deserialize_with = "double_option")]
    pub test_date: Option<Option<NaiveDate>>,
    #[serde(default, deserialize_with = "double_option")]
    pub requirement: Option<Option<Decimal>>,
    #[serde(default, deserialize_with = "double_option")]
    pub projected_value: Option<Option<Decimal>>,
    #[serde(default, deserialize_with = "double_option")]
    pub actual_value: Option<Option<Decimal>>,
}

impl DscrTestPatch {
    pub fn validate(self) -> Result<Self, ValidationError> {
        Ok(Self {
            test_number: patch_with(self.test_number, |n| non_negative("TestNumber", Some(n)))?,
            requirement: patch_with(self.requirement, |r| non_negative("Requirement", Some(r)))?,
            ..self
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct NewLiquidityRequirement {
    pub project_id: Option<i32>,
    pub loan_id: Option<i32>,
    pub total_amount: Option<Decimal>,
    pub lending_bank_amount: Option<Decimal>,
    pub notes: Option<String>,
}

impl NewLiquidityRequirement {
    pub fn validate(self) -> Result<Self, ValidationError> {
        Ok(Self {
            project_id: Some(required_id("ProjectId", self.project_id)?),
            total_amount: non_negative("TotalAmount", self.total_amount)?,
            lending_bank_amount: non_negative("LendingBankAmount", self.lending_bank_amount)?,
            notes: optional_text("Notes", self.notes.as_deref(), TEXT_MAX)?,
            ..self
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct LiquidityRequirementPatch {
    #[serde(default, deserialize_with = "double_option")]
    pub loan_id: Option<Option<i32>>,
    #[serde(default, deserialize_with = "double_option")]
    pub total_amount: Option<Option<Decimal>>,
    #[serde(default, deserialize_with = "double_option")]
    pub lending_bank_amount: Option<Option<Decimal>>,
    #[serde(default, deserialize_with = "double_option")]
    pub notes: Option<Option<String>>,
}

impl LiquidityRequirementPatch {
    pub fn validate(self) -> Result<Self, ValidationError> {
        Ok(Self {
            total_amount: patch_with(self.total_amount, |v| non_negative("TotalAmount", Some(v)))?,
            lending_bank_amount: patch_with(self.lending_bank_amount, |v| {
                non_negative("LendingBankAmount", Some(v))
            })?,
            notes: patch_text("Notes", self.notes, TEXT_MAX)?,
            ..self
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct NewEquityCommitment {
    pub project_id: Option<i32>,
    pub equity_partner_id: Option<i32>,
    pub equity_type: Option<String>,
    pub amount: Option<Decimal>,
    pub funding_date: Option<NaiveDate>,
    pub interest_rate: Option<Decimal>,
    pub notes: Option<String>,
    #[serde(default)]
    pub related_party_ids: Vec<i32>,
}

impl NewEquityCommitment {
    pub fn validate(self) -> Result<Self, ValidationError> {
        let mut related = self.related_party_ids;
        related.sort_unstable();
        related.dedup();
        Ok(Self {
            project_id: Some(required_id("ProjectId", self.project_id)?),
            equity_type: canonical(self.equity_type, EquityType::parse, |v| v.as_str())?,
            amount: non_negative("Amount", self.amount)?,
            notes: optional_text("Notes", self.notes.as_deref(), TEXT_MAX)?,
            related_party_ids: related,
            ..self
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct EquityCommitmentPatch {
    #[serde(default, deserialize_with = "double_option")]
    pub equity_partner_id: Option<Option<i32>>,
    #[serde(default, deserialize_with = "double_option")]
    pub equity_type: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub amount: Option<Option<Decimal>>,
    #[serde(default, deserialize_with = "double_option")]
    pub funding_date: Option<Option<NaiveDate>>,
    #[serde(default, deserialize_with = "double_option")]
    pub interest_rate: Option<Option<Decimal>>,
    #[serde(default, deserialize_with = "double_option")]
    pub notes: Option<Option<String>>,
}

impl EquityCommitmentPatch {
    pub fn validate(self) -> Result<Self, ValidationError> {
        Ok(Self {
            equity_type: patch_with(self.equity_type, |v| {
                canonical(Some(v), EquityType::parse, |t| t.as_str())
            })?,
            amount: patch_with(self.amount, |v| non_negative("Amount", Some(v)))?,
            notes: patch_text("Notes", self.notes, TEXT_MAX)?,
            ..self
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct NewRelatedParty {
    pub related_party_id: Option<i32>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct NewLoanProceeds {
    pub loan_id: Option<i32>,
    pub project_id: Option<i32>,
    pub proceeds_date: Option<NaiveDate>,
    pub amount: Option<Decimal>,
    pub draw_number: Option<i32>,
    pub notes: Option<String>,
}

impl NewLoanProceeds {
    pub fn validate(self) -> Result<Self, ValidationError> {
        Ok(Self {
            loan_id: Some(required_id("LoanId", self.loan_id)?),
            amount: non_negative("Amount", self.amount)?,
            draw_number: non_negative("DrawNumber", self.draw_number)?,
            notes: optional_text("Notes", self.notes.as_deref(), TEXT_MAX)?,
            ..self
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct LoanProceedsPatch {
    #[serde(default, deserialize_with = "double_option")]
    pub proceeds_date: Option<Option<NaiveDate>>,
    #[serde(default, deserialize_with = "double_option")]
    pub amount: Option<Option<Decimal>>,
    #[serde(default, deserialize_with = "double_option")]
    pub draw_number: Option<Option<i32>>,
    #[serde(default, deserialize_with = "double_option")]
    pub notes: Option<Option<String>>,
}

impl LoanProceedsPatch {
    pub fn validate(self) -> Result<Self, ValidationError> {
        Ok(Self {
            amount: patch_with(self.amount, |v| non_negative("Amount", Some(v)))?,
            draw_number: patch_with(self.draw_number, |v| non_negative("DrawNumber", Some(v)))?,
            notes: patch_text("Notes", self.notes, TEXT_MAX)?,
            ..self
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct NewLoanModification {
    pub loan_id: Option<i32>,
    pub project_id: Option<i32>,
    pub modification_type: Option<String>,
    pub effective_date: Option<NaiveDate>,
    pub description: Option<String>,
}

impl NewLoanModification {
    pub fn validate(self) -> Result<Self, ValidationError> {
        Ok(Self {
            loan_id: Some(required_id("LoanId", self.loan_id)?),
            modification_type: optional_text("ModificationType", self.modification_type.as_deref(), SHORT_MAX)?,
            description: optional_text("Description", self.description.as_deref(), TEXT_MAX)?,
            ..self
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct LoanModificationPatch {
    #[serde(default, deserialize_with = "double_option")]
    pub modification_type: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub effective_date: Option<Option<NaiveDate>>,
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
}

impl LoanModificationPatch {
    pub fn validate(self) -> Result<Self, ValidationError> {
        Ok(Self {
            modification_type: patch_text("ModificationType", self.modification_type, SHORT_MAX)?,
            description: patch_text("Description", self.description, TEXT_MAX)?,
            ..self
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct NewBankTarget {
    pub bank_id: Option<i32>,
    pub assets: Option<String>,
    pub contact_name: Option<String>,
    pub comments: Option<String>,
}

impl NewBankTarget {
    pub fn validate(self) -> Result<Self, ValidationError> {
        Ok(Self {
            bank_id: Some(required_id("BankId", self.bank_id)?),
            assets: optional_text("Assets", self.assets.as_deref(), SHORT_MAX)?,
            contact_name: optional_text("ContactName", self.contact_name.as_deref(), SHORT_MAX)?,
            comments: optional_text("Comments", self.comments.as_deref(), TEXT_MAX)?,
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct BankTargetPatch {
    #[serde(default, deserialize_with = "double_option")]
    pub assets: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub contact_name: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub comments: Option<Option<String>>,
}

impl BankTargetPatch {
    pub fn validate(self) -> Result<Self, ValidationError> {
        Ok(Self {
            assets: patch_text("Assets", self.assets, SHORT_MAX)?,
            contact_name: patch_text("ContactName", self.contact_name, SHORT_MAX)?,
            comments: patch_text("Comments", self.comments, TEXT_MAX)?,
        })
    }
}

/// `PUT /contacts/{personId}` replaces the whole extension row.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ContactUpsert {
    pub role: Option<String>,
    pub is_banking_contact: Option<bool>,
    pub notes: Option<String>,
}

impl ContactUpsert {
    pub fn validate(self) -> Result<Self, ValidationError> {
        Ok(Self {
            role: optional_text("Role", self.role.as_deref(), SHORT_MAX)?,
            notes: optional_text("Notes", self.notes.as_deref(), TEXT_MAX)?,
            ..self
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SettingValue {
    pub setting_value: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loan(json: &str) -> NewLoan {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn loan_requires_project() {
        let err = loan(r#"{"LoanAmount": 100}"#).validate().unwrap_err();
        assert_eq!(err, ValidationError::Missing { field: "ProjectId" });
    }

    #[test]
    fn loan_enums_canonicalized() {
        let l = loan(r#"{"ProjectId": 1, "FixedOrFloating": "floating", "IndexName": "sofr", "FinancingType": "mini-perm"}"#)
            .validate()
            .unwrap();
        assert_eq!(l.fixed_or_floating.as_deref(), Some("Floating"));
        assert_eq!(l.index_name.as_deref(), Some("SOFR"));
        assert_eq!(l.financing_type.as_deref(), Some("Mini-Perm"));
    }

    #[test]
    fn index_requires_floating() {
        let err = loan(r#"{"ProjectId": 1, "FixedOrFloating": "Fixed", "IndexName": "SOFR"}"#)
            .validate()
            .unwrap_err();
        assert!(matches!(err, ValidationError::Conflict { .. }));
    }

    #[test]
    fn maturity_after_closing() {
        let err = loan(r#"{"ProjectId": 1, "LoanClosingDate": "2024-06-01", "MaturityDate": "2024-01-01"}"#)
            .validate()
            .unwrap_err();
        assert!(err.to_string().contains("MaturityDate"));
    }

    #[test]
    fn bad_enum_lists_allowed_values() {
        let err = loan(r#"{"ProjectId": 1, "FixedOrFloating": "Variable"}"#)
            .validate()
            .unwrap_err();
        assert!(err.to_string().contains("Fixed, Floating"));
    }

    #[test]
    fn covenant_type_required_and_parsed() {
        let c: NewCovenant = serde_json::from_str(r#"{"ProjectId": 2}"#).unwrap();
        assert_eq!(c.validate().unwrap_err(), ValidationError::Missing { field: "CovenantType" });

        let c: NewCovenant =
            serde_json::from_str(r#"{"ProjectId": 2, "CovenantType": "net worth"}"#).unwrap();
        assert_eq!(c.validate().unwrap().covenant_type.as_deref(), Some("Net Worth"));
    }

    #[test]
    fn guarantee_percent_bounds() {
        let g: NewGuarantee =
            serde_json::from_str(r#"{"ProjectId": 1, "PersonId": 2, "GuaranteePercent": 120}"#).unwrap();
        assert!(g.validate().is_err());
    }

    #[test]
    fn participation_defaults_exposure_to_zero() {
        let p: NewParticipation = serde_json::from_str(r#"{"LoanId": 1, "BankId": 2}"#).unwrap();
        assert_eq!(p.validate().unwrap().exposure_amount, Some(Decimal::ZERO));
    }

    #[test]
    fn related_parties_deduplicated() {
        let e: NewEquityCommitment =
            serde_json::from_str(r#"{"ProjectId": 1, "RelatedPartyIds": [3, 1, 3]}"#).unwrap();
        assert_eq!(e.validate().unwrap().related_party_ids, vec![1, 3]);
    }

    #[test]
    fn loan_terms_rule_on_merged_values() {
        assert!(check_loan_terms(Some("Floating"), Some("SOFR"), None, None).is_ok());
        assert!(check_loan_terms(None, Some("SOFR"), None, None).is_err());
    }
}
