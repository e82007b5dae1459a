use chrono::{DateTime, Local, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::utils::format::age_on;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeniorStatus {
    Active,
    Inactive,
    Deceased,
    #[serde(other)]
    Unknown,
}

impl SeniorStatus {
    pub const SETTABLE: [SeniorStatus; 3] =
        [SeniorStatus::Active, SeniorStatus::Inactive, SeniorStatus::Deceased];

    pub fn as_str(&self) -> &'static str {
        match self {
            SeniorStatus::Active => "active",
            SeniorStatus::Inactive => "inactive",
            SeniorStatus::Deceased => "deceased",
            SeniorStatus::Unknown => "unknown",
        }
    }

    /// Next settable status, for cycling in a status picker.
    pub fn next(&self) -> Self {
        match self {
            SeniorStatus::Active => SeniorStatus::Inactive,
            SeniorStatus::Inactive => SeniorStatus::Deceased,
            SeniorStatus::Deceased | SeniorStatus::Unknown => SeniorStatus::Active,
        }
    }
}

impl std::fmt::Display for SeniorStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SeniorStatus::Active => write!(f, "Active"),
            SeniorStatus::Inactive => write!(f, "Inactive"),
            SeniorStatus::Deceased => write!(f, "Deceased"),
            SeniorStatus::Unknown => write!(f, "Unknown"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
    #[serde(other)]
    Unspecified,
}

impl Gender {
    pub fn parse(input: &str) -> Option<Self> {
        match input.trim().to_lowercase().as_str() {
            "male" | "m" => Some(Gender::Male),
            "female" | "f" => Some(Gender::Female),
            _ => None,
        }
    }
}

impl std::fmt::Display for Gender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Gender::Male => write!(f, "Male"),
            Gender::Female => write!(f, "Female"),
            Gender::Unspecified => write!(f, "-"),
        }
    }
}

/// A row of `senior_citizens`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SeniorCitizen {
    pub id: String,
    #[serde(default)]
    pub osca_id: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
    pub first_name: String,
    #[serde(default)]
    pub middle_name: Option<String>,
    pub last_name: String,
    #[serde(default)]
    pub extension_name: Option<String>,
    #[serde(default)]
    pub birth_date: Option<NaiveDate>,
    #[serde(default = "default_gender")]
    pub gender: Gender,
    #[serde(default)]
    pub civil_status: Option<String>,
    #[serde(default)]
    pub barangay: String,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub contact_number: Option<String>,
    #[serde(default)]
    pub emergency_contact_name: Option<String>,
    #[serde(default)]
    pub emergency_contact_number: Option<String>,
    #[serde(default = "default_status")]
    pub status: SeniorStatus,
    #[serde(default)]
    pub registration_date: Option<NaiveDate>,
    #[serde(default)]
    pub created_by: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

fn default_gender() -> Gender {
    Gender::Unspecified
}

fn default_status() -> SeniorStatus {
    SeniorStatus::Active
}

impl SeniorCitizen {
    /// "Last, First M. Jr." as printed on OSCA lists.
    pub fn display_name(&self) -> String {
        let mut name = format!("{}, {}", self.last_name, self.first_name);
        if let Some(initial) = self
            .middle_name
            .as_deref()
            .and_then(|m| m.trim().chars().next())
        {
            name.push_str(&format!(" {}.", initial));
        }
        if let Some(ext) = self.extension_name.as_deref().filter(|e| !e.trim().is_empty()) {
            name.push(' ');
            name.push_str(ext.trim());
        }
        name
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    pub fn age_on(&self, today: NaiveDate) -> Option<i32> {
        self.birth_date.map(|b| age_on(b, today))
    }

    pub fn age(&self) -> Option<i32> {
        self.age_on(Local::now().date_naive())
    }
}

/// The registry columns behind the per-barangay and this-month breakdowns.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RegistrationRow {
    #[serde(default)]
    pub barangay: String,
    #[serde(default)]
    pub registration_date: Option<NaiveDate>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl RegistrationRow {
    pub const COLUMNS: &'static str = "barangay,registration_date,created_at";

    /// Registered in the same calendar month as `today`. Falls back to
    /// `created_at` when no registration date was recorded.
    pub fn registered_in_month_of(&self, today: NaiveDate) -> bool {
        use chrono::Datelike;
        let date = self
            .registration_date
            .or_else(|| self.created_at.map(|c| c.date_naive()));
        date.map(|d| d.year() == today.year() && d.month() == today.month())
            .unwrap_or(false)
    }
}

/// Insert/update payload for `senior_citizens`.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct NewSeniorCitizen {
    pub osca_id: Option<String>,
    pub first_name: String,
    pub middle_name: Option<String>,
    pub last_name: String,
    pub extension_name: Option<String>,
    pub birth_date: NaiveDate,
    pub gender: Gender,
    pub civil_status: Option<String>,
    pub barangay: String,
    pub address: Option<String>,
    pub contact_number: Option<String>,
    pub emergency_contact_name: Option<String>,
    pub emergency_contact_number: Option<String>,
    pub status: SeniorStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub registration_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
}

/// A row of `beneficiaries`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Beneficiary {
    pub id: String,
    pub senior_citizen_id: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub relationship: String,
    #[serde(default)]
    pub birth_date: Option<NaiveDate>,
    #[serde(default)]
    pub contact_number: Option<String>,
    #[serde(default)]
    pub is_primary: bool,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl Beneficiary {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// Insert/update payload for `beneficiaries`.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct NewBeneficiary {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub senior_citizen_id: Option<String>,
    pub first_name: String,
    pub last_name: String,
    pub relationship: String,
    pub birth_date: Option<NaiveDate>,
    pub contact_number: Option<String>,
    pub is_primary: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_json() -> &'static str {
        r#"{
            "id": "3b8c5a0e-7d1f-4a0b-9c44-0e2f4a6b8c10",
            "osca_id": "OSCA-2024-0153",
            "first_name": "Nena",
            "middle_name": "Reyes",
            "last_name": "Dela Cruz",
            "extension_name": null,
            "birth_date": "1948-03-15",
            "gender": "female",
            "barangay": "San Isidro",
            "contact_number": "09171234567",
            "status": "active",
            "registration_date": "2024-05-02",
            "created_at": "2024-05-02T01:00:00+00:00"
        }"#
    }

    #[test]
    fn test_parse_senior_row() {
        let senior: SeniorCitizen = serde_json::from_str(sample_json()).expect("parse");
        assert_eq!(senior.display_name(), "Dela Cruz, Nena R.");
        assert_eq!(senior.gender, Gender::Female);
        assert_eq!(senior.status, SeniorStatus::Active);
        let today = NaiveDate::from_ymd_opt(2024, 3, 14).unwrap();
        assert_eq!(senior.age_on(today), Some(75));
        let today = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
        assert_eq!(senior.age_on(today), Some(76));
    }

    #[test]
    fn test_unknown_status_and_gender_do_not_fail() {
        let json = r#"{"id": "1", "first_name": "A", "last_name": "B", "status": "transferred", "gender": "x"}"#;
        let senior: SeniorCitizen = serde_json::from_str(json).expect("parse");
        assert_eq!(senior.status, SeniorStatus::Unknown);
        assert_eq!(senior.gender, Gender::Unspecified);
        assert_eq!(senior.age_on(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()), None);
    }

    #[test]
    fn test_registered_in_month() {
        let row: RegistrationRow = serde_json::from_str(sample_json()).expect("parse");
        assert!(row.registered_in_month_of(NaiveDate::from_ymd_opt(2024, 5, 30).unwrap()));
        assert!(!row.registered_in_month_of(NaiveDate::from_ymd_opt(2025, 5, 1).unwrap()));

        let unregistered: RegistrationRow =
            serde_json::from_str(r#"{"barangay": "Poblacion", "created_at": "2024-05-02T01:00:00+00:00"}"#)
                .expect("parse");
        assert!(unregistered.registered_in_month_of(NaiveDate::from_ymd_opt(2024, 5, 1).unwrap()));
        assert!(!RegistrationRow::default().registered_in_month_of(NaiveDate::from_ymd_opt(2024, 5, 1).unwrap()));
    }

    #[test]
    fn test_status_cycle() {
        assert_eq!(SeniorStatus::Active.next(), SeniorStatus::Inactive);
        assert_eq!(SeniorStatus::Deceased.next(), SeniorStatus::Active);
        assert_eq!(SeniorStatus::Unknown.next(), SeniorStatus::Active);
    }

    #[test]
    fn test_gender_parse() {
        assert_eq!(Gender::parse(" Female "), Some(Gender::Female));
        assert_eq!(Gender::parse("m"), Some(Gender::Male));
        assert_eq!(Gender::parse(""), None);
    }
}
