//! Request bodies for `/api/core`.
//!
//! `New*` bodies are creates; `*Patch` bodies are partial updates where
//! `Option<Option<T>>` separates "not sent" from "set to null".

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;
use stoactl_core::enums::{parse_optional, PartnerType};
use stoactl_core::states::normalize_state;
use stoactl_core::validation::{optional_text, required_text};
use stoactl_core::ValidationError;

use super::patch::{non_negative, patch_text, patch_with};
use crate::db::update::double_option;

const NAME_MAX: usize = 255;
const TEXT_MAX: usize = 4000;

fn state_code(value: Option<String>) -> Result<Option<String>, ValidationError> {
    Ok(normalize_state("State", value.as_deref())?.map(str::to_owned))
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct NewProject {
    #[serde(default)]
    pub project_name: String,
    pub city: Option<String>,
    pub state: Option<String>,
    pub region_id: Option<i32>,
    pub product_type_id: Option<i32>,
    pub units: Option<i32>,
    pub stage: Option<String>,
    pub estimated_construction_start: Option<NaiveDate>,
}

impl NewProject {
    pub fn validate(self) -> Result<Self, ValidationError> {
        Ok(Self {
            project_name: required_text("ProjectName", &self.project_name, NAME_MAX)?,
            city: optional_text("City", self.city.as_deref(), NAME_MAX)?,
            state: state_code(self.state)?,
            units: non_negative("Units", self.units)?,
            stage: optional_text("Stage", self.stage.as_deref(), NAME_MAX)?,
            ..self
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ProjectPatch {
    pub project_name: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub city: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub state: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub region_id: Option<Option<i32>>,
    #[serde(default, deserialize_with = "double_option")]
    pub product_type_id: Option<Option<i32>>,
    #[serde(default, deserialize_with = "double_option")]
    pub units: Option<Option<i32>>,
    #[serde(default, deserialize_with = "double_option")]
    pub stage: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub estimated_construction_start: Option<Option<NaiveDate>>,
}

impl ProjectPatch {
    pub fn validate(self) -> Result<Self, ValidationError> {
        Ok(Self {
            project_name: self
                .project_name
                .map(|n| required_text("ProjectName", &n, NAME_MAX))
                .transpose()?,
            city: patch_text("City", self.city, NAME_MAX)?,
            state: patch_with(self.state, |s| state_code(Some(s)))?,
            units: patch_with(self.units, |u| non_negative("Units", Some(u)))?,
            stage: patch_text("Stage", self.stage, NAME_MAX)?,
            ..self
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct NewBank {
    #[serde(default)]
    pub bank_name: String,
    pub city: Option<String>,
    pub state: Option<String>,
    pub hold_limit: Option<Decimal>,
    pub per_deal_limit: Option<Decimal>,
    pub notes: Option<String>,
}

impl NewBank {
    pub fn validate(self) -> Result<Self, ValidationError> {
        Ok(Self {
            bank_name: required_text("BankName", &self.bank_name, NAME_MAX)?,
            city: optional_text("City", self.city.as_deref(), NAME_MAX)?,
            state: state_code(self.state)?,
            hold_limit: non_negative("HoldLimit", self.hold_limit)?,
            per_deal_limit: non_negative("PerDealLimit", self.per_deal_limit)?,
            notes: optional_text("Notes", self.notes.as_deref(), TEXT_MAX)?,
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct BankPatch {
    pub bank_name: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub city: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub state: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub hold_limit: Option<Option<Decimal>>,
    #[serde(default, deserialize_with = "double_option")]
    pub per_deal_limit: Option<Option<Decimal>>,
    #[serde(default, deserialize_with = "double_option")]
    pub notes: Option<Option<String>>,
}

impl BankPatch {
    pub fn validate(self) -> Result<Self, ValidationError> {
        Ok(Self {
            bank_name: self
                .bank_name
                .map(|n| required_text("BankName", &n, NAME_MAX))
                .transpose()?,
            city: patch_text("City", self.city, NAME_MAX)?,
            state: patch_with(self.state, |s| state_code(Some(s)))?,
            hold_limit: patch_with(self.hold_limit, |v| non_negative("HoldLimit", Some(v)))?,
            per_deal_limit: patch_with(self.per_deal_limit, |v| {
                non_negative("PerDealLimit", Some(v))
            })?,
            notes: patch_text("Notes", self.notes, TEXT_MAX)?,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct NewPerson {
    #[serde(default)]
    pub full_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub title: Option<String>,
}

/// Loose email sanity check: one `@` with text on both sides.
pub fn check_email(field: &'static str, email: Option<String>) -> Result<Option<String>, ValidationError> {
    let email = optional_text(field, email.as_deref(), NAME_MAX)?;
    if let Some(e) = &email {
        let valid = e
            .split_once('@')
            .is_some_and(|(local, domain)| !local.is_empty() && domain.contains('.') && !domain.contains('@'));
        if !valid {
            return Err(ValidationError::invalid_format(field, "not an email address"));
        }
    }
    Ok(email)
}

impl NewPerson {
    pub fn validate(self) -> Result<Self, ValidationError> {
        Ok(Self {
            full_name: required_text("FullName", &self.full_name, NAME_MAX)?,
            email: check_email("Email", self.email)?,
            phone: optional_text("Phone", self.phone.as_deref(), 50)?,
            title: optional_text("Title", self.title.as_deref(), NAME_MAX)?,
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PersonPatch {
    pub full_name: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub email: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub phone: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub title: Option<Option<String>>,
}

impl PersonPatch {
    pub fn validate(self) -> Result<Self, ValidationError> {
        Ok(Self {
            full_name: self
                .full_name
                .map(|n| required_text("FullName", &n, NAME_MAX))
                .transpose()?,
            email: patch_with(self.email, |e| check_email("Email", Some(e)))?,
            phone: patch_text("Phone", self.phone, 50)?,
            title: patch_text("Title", self.title, NAME_MAX)?,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct NewEquityPartner {
    #[serde(default)]
    pub partner_name: String,
    pub partner_type: Option<String>,
    pub contact_person_id: Option<i32>,
    pub notes: Option<String>,
}

impl NewEquityPartner {
    pub fn validate(self) -> Result<Self, ValidationError> {
        Ok(Self {
            partner_name: required_text("PartnerName", &self.partner_name, NAME_MAX)?,
            partner_type: parse_optional(self.partner_type.as_deref(), PartnerType::parse)?
                .map(|t| t.as_str().to_owned()),
            notes: optional_text("Notes", self.notes.as_deref(), TEXT_MAX)?,
            ..self
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct EquityPartnerPatch {
    pub partner_name: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub partner_type: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub contact_person_id: Option<Option<i32>>,
    #[serde(default, deserialize_with = "double_option")]
    pub notes: Option<Option<String>>,
}

impl EquityPartnerPatch {
    pub fn validate(self) -> Result<Self, ValidationError> {
        Ok(Self {
            partner_name: self
                .partner_name
                .map(|n| required_text("PartnerName", &n, NAME_MAX))
                .transpose()?,
            partner_type: patch_with(self.partner_type, |t| {
                Ok(parse_optional(Some(&t), PartnerType::parse)?.map(|t| t.as_str().to_owned()))
            })?,
            notes: patch_text("Notes", self.notes, TEXT_MAX)?,
            ..self
        })
    }
}

/// Body for region / product type / loan type rows
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct NewReferenceItem {
    #[serde(default)]
    pub name: String,
    pub display_order: Option<i32>,
    pub is_active: Option<bool>,
}

impl NewReferenceItem {
    pub fn validate(self) -> Result<Self, ValidationError> {
        Ok(Self {
            name: required_text("Name", &self.name, NAME_MAX)?,
            ..self
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ReferenceItemPatch {
    pub name: Option<String>,
    pub display_order: Option<i32>,
    pub is_active: Option<bool>,
}

impl ReferenceItemPatch {
    pub fn validate(self) -> Result<Self, ValidationError> {
        Ok(Self {
            name: self
                .name
                .map(|n| required_text("Name", &n, NAME_MAX))
                .transpose()?,
            ..self
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn project_state_is_normalized() {
        let p: NewProject =
            serde_json::from_str(r#"{"ProjectName": " The Heights ", "State": "north carolina"}"#).unwrap();
        let p = p.validate().unwrap();
        assert_eq!(p.project_name, "The Heights");
        assert_eq!(p.state.as_deref(), Some("NC"));
    }

    #[test]
    fn project_name_required() {
        let p: NewProject = serde_json::from_str(r#"{"City": "Raleigh"}"#).unwrap();
        assert_eq!(p.validate().unwrap_err(), ValidationError::Empty { field: "ProjectName" });
    }

    #[test]
    fn unknown_state_rejected() {
        let p: ProjectPatch = serde_json::from_str(r#"{"State": "Narnia"}"#).unwrap();
        assert!(p.validate().is_err());
    }

    #[test]
    fn patch_null_state_clears() {
        let p: ProjectPatch = serde_json::from_str(r#"{"State": null}"#).unwrap();
        assert_eq!(p.validate().unwrap().state, Some(None));
    }

    #[test]
    fn partner_type_canonicalized() {
        let p: NewEquityPartner =
            serde_json::from_str(r#"{"PartnerName": "Acme LP", "PartnerType": "entity"}"#).unwrap();
        assert_eq!(p.validate().unwrap().partner_type.as_deref(), Some("Entity"));

        let bad: NewEquityPartner =
            serde_json::from_str(r#"{"PartnerName": "Acme LP", "PartnerType": "Trust"}"#).unwrap();
        assert!(matches!(bad.validate(), Err(ValidationError::InvalidVariant { .. })));
    }

    #[test]
    fn email_checked() {
        assert!(check_email("Email", Some("a@b.com".into())).is_ok());
        assert!(check_email("Email", Some("nope".into())).is_err());
        assert_eq!(check_email("Email", Some("  ".into())).unwrap(), None);
    }

    #[test]
    fn negative_hold_limit_rejected() {
        let b: NewBank = serde_json::from_str(r#"{"BankName": "First", "HoldLimit": -1}"#).unwrap();
        assert!(b.validate().is_err());
    }
}
