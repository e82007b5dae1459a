//! Raw form inputs and their validation schemas.

use chrono::{Local, NaiveDate};

use super::rules::{
    is_blank, is_strong_password, is_valid_email, len_between, normalize_ph_mobile, parse_date,
    SENIOR_MIN_AGE,
};
use super::{Validate, ValidationErrors};
use crate::auth::Role;
use crate::models::{
    Beneficiary, DifficultyLevel, Gender, LearningStyle, NewBeneficiary, NewClass, NewProfile,
    NewSeniorCitizen, NewVarkModule, SeniorCitizen, SeniorStatus, VarkModule,
};
use crate::utils::format::age_on;

pub const MIN_PASSWORD_LENGTH: usize = 8;
pub const MAX_NAME_LENGTH: usize = 50;
pub const MAX_DESCRIPTION_LENGTH: usize = 2000;
pub const MAX_MODULE_MINUTES: i32 = 600;

/// Trimmed value, or `None` when blank.
fn opt(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

fn check_name(errors: &mut ValidationErrors, field: &'static str, label: &str, value: &str) {
    if is_blank(value) {
        errors.add(field, format!("{} is required", label));
    } else if !len_between(value, 1, MAX_NAME_LENGTH) {
        errors.add(field, format!("{} must be at most {} characters", label, MAX_NAME_LENGTH));
    }
}

fn check_optional_mobile(errors: &mut ValidationErrors, field: &'static str, value: &str) {
    if !is_blank(value) && normalize_ph_mobile(value).is_none() {
        errors.add(field, "Enter a mobile number like 09171234567 or +639171234567");
    }
}

// ============================================================================
// Login / Register
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
    pub role: Option<Role>,
}

impl Validate for LoginForm {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if is_blank(&self.email) {
            errors.add("email", "Email is required");
        } else if !is_valid_email(&self.email) {
            errors.add("email", "Enter a valid email address");
        }
        errors.check(self.password.is_empty(), "password", "Password is required");
        errors.check(self.role.is_none(), "role", "Select a portal to sign in to");
        errors.into_result()
    }
}

#[derive(Debug, Clone, Default)]
pub struct RegisterForm {
    pub email: String,
    pub password: String,
    pub confirm_password: String,
    pub first_name: String,
    pub last_name: String,
    pub role: Option<Role>,
    pub barangay: String,
    pub learning_style: Option<LearningStyle>,
}

impl Validate for RegisterForm {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if is_blank(&self.email) {
            errors.add("email", "Email is required");
        } else if !is_valid_email(&self.email) {
            errors.add("email", "Enter a valid email address");
        }

        if !is_strong_password(&self.password, MIN_PASSWORD_LENGTH) {
            errors.add(
                "password",
                format!(
                    "Password must be at least {} characters with a letter and a number",
                    MIN_PASSWORD_LENGTH
                ),
            );
        }
        errors.check(
            self.password != self.confirm_password,
            "confirm_password",
            "Passwords do not match",
        );

        check_name(&mut errors, "first_name", "First name", &self.first_name);
        check_name(&mut errors, "last_name", "Last name", &self.last_name);

        match self.role {
            None => errors.add("role", "Select a role"),
            Some(role) => errors.check(
                role.requires_barangay() && is_blank(&self.barangay),
                "barangay",
                "Barangay is required for this role",
            ),
        }
        errors.into_result()
    }
}

impl RegisterForm {
    /// Metadata stored on the auth user so a database trigger can create the
    /// profile when signup does not return a session.
    pub fn metadata(&self) -> serde_json::Value {
        serde_json::json!({
            "first_name": self.first_name.trim(),
            "last_name": self.last_name.trim(),
            "role": self.role,
            "barangay": opt(&self.barangay),
            "learning_style": self.learning_style,
        })
    }

    /// Profile row for a freshly created account. Call after `validate`.
    pub fn to_profile(&self, user_id: &str) -> Option<NewProfile> {
        let role = self.role?;
        Some(NewProfile {
            id: user_id.to_string(),
            email: self.email.trim().to_lowercase(),
            first_name: self.first_name.trim().to_string(),
            last_name: self.last_name.trim().to_string(),
            role,
            barangay: opt(&self.barangay),
            learning_style: if role == Role::Student {
                self.learning_style
            } else {
                None
            },
        })
    }
}

// ============================================================================
// Senior affairs
// ============================================================================

#[derive(Debug, Clone)]
pub struct SeniorCitizenForm {
    pub osca_id: String,
    pub first_name: String,
    pub middle_name: String,
    pub last_name: String,
    pub extension_name: String,
    pub birth_date: String,
    pub gender: String,
    pub civil_status: String,
    pub barangay: String,
    pub address: String,
    pub contact_number: String,
    pub emergency_contact_name: String,
    pub emergency_contact_number: String,
    pub status: SeniorStatus,
}

impl Default for SeniorCitizenForm {
    fn default() -> Self {
        Self {
            osca_id: String::new(),
            first_name: String::new(),
            middle_name: String::new(),
            last_name: String::new(),
            extension_name: String::new(),
            birth_date: String::new(),
            gender: String::new(),
            civil_status: String::new(),
            barangay: String::new(),
            address: String::new(),
            contact_number: String::new(),
            emergency_contact_name: String::new(),
            emergency_contact_number: String::new(),
            status: SeniorStatus::Active,
        }
    }
}

impl SeniorCitizenForm {
    /// Pre-fill from an existing record for editing.
    pub fn from_record(senior: &SeniorCitizen) -> Self {
        let text = |v: &Option<String>| v.clone().unwrap_or_default();
        Self {
            osca_id: text(&senior.osca_id),
            first_name: senior.first_name.clone(),
            middle_name: text(&senior.middle_name),
            last_name: senior.last_name.clone(),
            extension_name: text(&senior.extension_name),
            birth_date: senior
                .birth_date
                .map(|d| d.format("%Y-%m-%d").to_string())
                .unwrap_or_default(),
            gender: match senior.gender {
                Gender::Male => "male".to_string(),
                Gender::Female => "female".to_string(),
                Gender::Unspecified => String::new(),
            },
            civil_status: text(&senior.civil_status),
            barangay: senior.barangay.clone(),
            address: text(&senior.address),
            contact_number: text(&senior.contact_number),
            emergency_contact_name: text(&senior.emergency_contact_name),
            emergency_contact_number: text(&senior.emergency_contact_number),
            status: senior.status,
        }
    }

    pub fn validate_on(&self, today: NaiveDate) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        check_name(&mut errors, "first_name", "First name", &self.first_name);
        check_name(&mut errors, "last_name", "Last name", &self.last_name);

        if is_blank(&self.birth_date) {
            errors.add("birth_date", "Birth date is required");
        } else {
            match parse_date(&self.birth_date) {
                None => errors.add("birth_date", "Use the format YYYY-MM-DD"),
                Some(date) if date >= today => {
                    errors.add("birth_date", "Birth date must be in the past")
                }
                Some(date) => errors.check(
                    age_on(date, today) < SENIOR_MIN_AGE,
                    "birth_date",
                    "Senior citizens must be at least 60 years old",
                ),
            }
        }

        errors.check(
            Gender::parse(&self.gender).is_none(),
            "gender",
            "Gender must be male or female",
        );
        errors.check(is_blank(&self.barangay), "barangay", "Barangay is required");
        check_optional_mobile(&mut errors, "contact_number", &self.contact_number);
        check_optional_mobile(
            &mut errors,
            "emergency_contact_number",
            &self.emergency_contact_number,
        );
        errors.check(
            self.status == SeniorStatus::Unknown,
            "status",
            "Choose active, inactive or deceased",
        );
        errors.into_result()
    }

    /// Validate and convert into the insert/update payload.
    pub fn to_payload_on(&self, today: NaiveDate) -> Result<NewSeniorCitizen, ValidationErrors> {
        self.validate_on(today)?;
        let mut errors = ValidationErrors::new();
        let (Some(birth_date), Some(gender)) =
            (parse_date(&self.birth_date), Gender::parse(&self.gender))
        else {
            errors.add("birth_date", "Invalid birth date");
            return Err(errors);
        };

        Ok(NewSeniorCitizen {
            osca_id: opt(&self.osca_id),
            first_name: self.first_name.trim().to_string(),
            middle_name: opt(&self.middle_name),
            last_name: self.last_name.trim().to_string(),
            extension_name: opt(&self.extension_name),
            birth_date,
            gender,
            civil_status: opt(&self.civil_status),
            barangay: self.barangay.trim().to_string(),
            address: opt(&self.address),
            contact_number: normalize_ph_mobile(&self.contact_number),
            emergency_contact_name: opt(&self.emergency_contact_name),
            emergency_contact_number: normalize_ph_mobile(&self.emergency_contact_number),
            status: self.status,
            registration_date: None,
            created_by: None,
        })
    }

    pub fn to_payload(&self) -> Result<NewSeniorCitizen, ValidationErrors> {
        self.to_payload_on(today())
    }
}

impl Validate for SeniorCitizenForm {
    fn validate(&self) -> Result<(), ValidationErrors> {
        self.validate_on(today())
    }
}

#[derive(Debug, Clone, Default)]
pub struct BeneficiaryForm {
    pub first_name: String,
    pub last_name: String,
    pub relationship: String,
    pub birth_date: String,
    pub contact_number: String,
    pub is_primary: bool,
}

impl BeneficiaryForm {
    pub fn from_record(beneficiary: &Beneficiary) -> Self {
        Self {
            first_name: beneficiary.first_name.clone(),
            last_name: beneficiary.last_name.clone(),
            relationship: beneficiary.relationship.clone(),
            birth_date: beneficiary
                .birth_date
                .map(|d| d.format("%Y-%m-%d").to_string())
                .unwrap_or_default(),
            contact_number: beneficiary.contact_number.clone().unwrap_or_default(),
            is_primary: beneficiary.is_primary,
        }
    }

    pub fn validate_on(&self, today: NaiveDate) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        check_name(&mut errors, "first_name", "First name", &self.first_name);
        check_name(&mut errors, "last_name", "Last name", &self.last_name);
        errors.check(
            is_blank(&self.relationship),
            "relationship",
            "Relationship is required",
        );
        if !is_blank(&self.birth_date) {
            match parse_date(&self.birth_date) {
                None => errors.add("birth_date", "Use the format YYYY-MM-DD"),
                Some(date) => errors.check(
                    date > today,
                    "birth_date",
                    "Birth date cannot be in the future",
                ),
            }
        }
        check_optional_mobile(&mut errors, "contact_number", &self.contact_number);
        errors.into_result()
    }

    pub fn to_payload_on(&self, today: NaiveDate) -> Result<NewBeneficiary, ValidationErrors> {
        self.validate_on(today)?;
        Ok(NewBeneficiary {
            senior_citizen_id: None,
            first_name: self.first_name.trim().to_string(),
            last_name: self.last_name.trim().to_string(),
            relationship: self.relationship.trim().to_string(),
            birth_date: parse_date(&self.birth_date),
            contact_number: normalize_ph_mobile(&self.contact_number),
            is_primary: self.is_primary,
        })
    }

    pub fn to_payload(&self) -> Result<NewBeneficiary, ValidationErrors> {
        self.to_payload_on(today())
    }
}

impl Validate for BeneficiaryForm {
    fn validate(&self) -> Result<(), ValidationErrors> {
        self.validate_on(today())
    }
}

// ============================================================================
// Learning
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct VarkModuleForm {
    pub title: String,
    pub description: String,
    pub subject: String,
    pub grade_level: String,
    pub learning_style: Option<LearningStyle>,
    pub difficulty_level: Option<DifficultyLevel>,
    pub estimated_duration_minutes: String,
    pub class_id: Option<String>,
    pub is_published: bool,
}

impl VarkModuleForm {
    pub fn from_record(module: &VarkModule) -> Self {
        Self {
            title: module.title.clone(),
            description: module.description.clone().unwrap_or_default(),
            subject: module.subject.clone(),
            grade_level: module.grade_level.clone().unwrap_or_default(),
            learning_style: module.learning_style,
            difficulty_level: module.difficulty_level,
            estimated_duration_minutes: module
                .estimated_duration_minutes
                .map(|m| m.to_string())
                .unwrap_or_default(),
            class_id: module.class_id.clone(),
            is_published: module.is_published,
        }
    }

    fn duration(&self) -> Result<Option<i32>, ()> {
        if is_blank(&self.estimated_duration_minutes) {
            return Ok(None);
        }
        match self.estimated_duration_minutes.trim().parse::<i32>() {
            Ok(m) if (1..=MAX_MODULE_MINUTES).contains(&m) => Ok(Some(m)),
            _ => Err(()),
        }
    }

    pub fn to_payload(&self) -> Result<NewVarkModule, ValidationErrors> {
        self.validate()?;
        let mut errors = ValidationErrors::new();
        let (Some(learning_style), Some(difficulty_level), Ok(duration)) =
            (self.learning_style, self.difficulty_level, self.duration())
        else {
            errors.add("learning_style", "Incomplete module form");
            return Err(errors);
        };

        Ok(NewVarkModule {
            title: self.title.trim().to_string(),
            description: opt(&self.description),
            subject: self.subject.trim().to_string(),
            grade_level: opt(&self.grade_level),
            learning_style,
            difficulty_level,
            estimated_duration_minutes: duration,
            class_id: self.class_id.clone().filter(|c| !c.trim().is_empty()),
            is_published: self.is_published,
            created_by: None,
        })
    }
}

impl Validate for VarkModuleForm {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        errors.check(
            !len_between(&self.title, 3, 200),
            "title",
            "Title must be 3 to 200 characters",
        );
        errors.check(is_blank(&self.subject), "subject", "Subject is required");
        errors.check(
            self.description.trim().chars().count() > MAX_DESCRIPTION_LENGTH,
            "description",
            "Description must be at most 2000 characters",
        );
        errors.check(
            self.learning_style.is_none(),
            "learning_style",
            "Choose a VARK learning style",
        );
        errors.check(
            self.difficulty_level.is_none(),
            "difficulty_level",
            "Choose a difficulty level",
        );
        errors.check(
            self.duration().is_err(),
            "estimated_duration_minutes",
            "Duration must be a whole number of minutes from 1 to 600",
        );
        errors.into_result()
    }
}

#[derive(Debug, Clone, Default)]
pub struct ClassForm {
    pub name: String,
    pub subject: String,
    pub grade_level: String,
}

impl ClassForm {
    pub fn to_payload(&self) -> Result<NewClass, ValidationErrors> {
        self.validate()?;
        Ok(NewClass {
            name: self.name.trim().to_string(),
            subject: self.subject.trim().to_string(),
            grade_level: opt(&self.grade_level),
            class_code: None,
            teacher_id: None,
        })
    }
}

impl Validate for ClassForm {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        errors.check(
            !len_between(&self.name, 2, 100),
            "name",
            "Class name must be 2 to 100 characters",
        );
        errors.check(is_blank(&self.subject), "subject", "Subject is required");
        errors.into_result()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn senior_form() -> SeniorCitizenForm {
        SeniorCitizenForm {
            first_name: "Nena".to_string(),
            last_name: "Dela Cruz".to_string(),
            birth_date: "1948-03-15".to_string(),
            gender: "Female".to_string(),
            barangay: "San Isidro".to_string(),
            contact_number: "+63 917 123 4567".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_login_form() {
        let form = LoginForm {
            email: "lola@example.ph".to_string(),
            password: "secret".to_string(),
            role: Some(Role::Senior),
        };
        assert!(form.validate().is_ok());

        let errors = LoginForm::default().validate().unwrap_err();
        assert!(errors.has("email"));
        assert!(errors.has("password"));
        assert!(errors.has("role"));

        let bad_email = LoginForm {
            email: "not-an-email".to_string(),
            ..form
        };
        assert_eq!(
            bad_email.validate().unwrap_err().for_field("email"),
            Some("Enter a valid email address")
        );
    }

    #[test]
    fn test_register_form_rules() {
        let form = RegisterForm {
            email: "guro@school.edu.ph".to_string(),
            password: "Kalinga2024".to_string(),
            confirm_password: "Kalinga2024".to_string(),
            first_name: "Maria".to_string(),
            last_name: "Santos".to_string(),
            role: Some(Role::Teacher),
            ..Default::default()
        };
        assert!(form.validate().is_ok());

        let mismatch = RegisterForm {
            confirm_password: "Kalinga2025".to_string(),
            ..form.clone()
        };
        assert!(mismatch.validate().unwrap_err().has("confirm_password"));

        let weak = RegisterForm {
            password: "password".to_string(),
            confirm_password: "password".to_string(),
            ..form.clone()
        };
        assert!(weak.validate().unwrap_err().has("password"));

        let basca_without_barangay = RegisterForm {
            role: Some(Role::Basca),
            ..form.clone()
        };
        assert!(basca_without_barangay.validate().unwrap_err().has("barangay"));

        let long_name = RegisterForm {
            first_name: "x".repeat(51),
            ..form
        };
        assert!(long_name.validate().unwrap_err().has("first_name"));
    }

    #[test]
    fn test_register_profile_payload() {
        let form = RegisterForm {
            email: " Juan@Example.PH ".to_string(),
            first_name: " Juan ".to_string(),
            last_name: "Cruz".to_string(),
            role: Some(Role::Student),
            learning_style: Some(LearningStyle::Auditory),
            ..Default::default()
        };
        let profile = form.to_profile("u-1").expect("profile");
        assert_eq!(profile.email, "juan@example.ph");
        assert_eq!(profile.first_name, "Juan");
        assert_eq!(profile.learning_style, Some(LearningStyle::Auditory));

        let teacher = RegisterForm {
            role: Some(Role::Teacher),
            ..form.clone()
        };
        assert_eq!(teacher.to_profile("u-2").unwrap().learning_style, None);

        let metadata = form.metadata();
        assert_eq!(metadata["role"], "student");
        assert_eq!(metadata["learning_style"], "auditory");
        assert!(metadata["barangay"].is_null());
    }

    #[test]
    fn test_senior_form_accepts_valid_record() {
        let payload = senior_form().to_payload_on(day(2024, 6, 1)).expect("valid");
        assert_eq!(payload.gender, Gender::Female);
        assert_eq!(payload.contact_number.as_deref(), Some("09171234567"));
        assert_eq!(payload.middle_name, None);
        assert_eq!(payload.birth_date, day(1948, 3, 15));
    }

    #[test]
    fn test_senior_form_rejects_under_sixty() {
        let form = SeniorCitizenForm {
            birth_date: "1965-06-02".to_string(),
            ..senior_form()
        };
        let errors = form.validate_on(day(2025, 6, 1)).unwrap_err();
        assert_eq!(
            errors.for_field("birth_date"),
            Some("Senior citizens must be at least 60 years old")
        );
        // Turns 60 the next day
        assert!(form.validate_on(day(2025, 6, 2)).is_ok());
    }

    #[test]
    fn test_senior_form_reports_every_field() {
        let form = SeniorCitizenForm {
            birth_date: "15/03/1948".to_string(),
            gender: "unknown".to_string(),
            contact_number: "12345".to_string(),
            emergency_contact_number: "0917".to_string(),
            status: SeniorStatus::Unknown,
            ..Default::default()
        };
        let errors = form.validate_on(day(2024, 1, 1)).unwrap_err();
        for field in [
            "first_name",
            "last_name",
            "birth_date",
            "gender",
            "barangay",
            "contact_number",
            "emergency_contact_number",
            "status",
        ] {
            assert!(errors.has(field), "missing error for {}", field);
        }
    }

    #[test]
    fn test_senior_form_future_birth_date() {
        let form = SeniorCitizenForm {
            birth_date: "2030-01-01".to_string(),
            ..senior_form()
        };
        assert_eq!(
            form.validate_on(day(2024, 1, 1)).unwrap_err().for_field("birth_date"),
            Some("Birth date must be in the past")
        );
    }

    #[test]
    fn test_senior_form_round_trips_record() {
        let payload = senior_form().to_payload_on(day(2024, 6, 1)).unwrap();
        let mut value = serde_json::to_value(&payload).unwrap();
        value["id"] = serde_json::json!("s-1");
        let record: SeniorCitizen = serde_json::from_value(value).unwrap();
        let form = SeniorCitizenForm::from_record(&record);
        assert_eq!(form.birth_date, "1948-03-15");
        assert_eq!(form.gender, "female");
        assert!(form.validate_on(day(2024, 6, 1)).is_ok());
    }

    #[test]
    fn test_beneficiary_form() {
        let today = day(2024, 6, 1);
        let form = BeneficiaryForm {
            first_name: "Ana".to_string(),
            last_name: "Dela Cruz".to_string(),
            relationship: "Daughter".to_string(),
            birth_date: "1975-01-20".to_string(),
            contact_number: "09181234567".to_string(),
            is_primary: true,
        };
        let payload = form.to_payload_on(today).expect("valid");
        assert!(payload.is_primary);
        assert_eq!(payload.birth_date, Some(day(1975, 1, 20)));

        let future = BeneficiaryForm {
            birth_date: "2025-01-01".to_string(),
            relationship: " ".to_string(),
            ..form
        };
        let errors = future.validate_on(today).unwrap_err();
        assert!(errors.has("birth_date"));
        assert!(errors.has("relationship"));
    }

    #[test]
    fn test_module_form() {
        let form = VarkModuleForm {
            title: "Sound Waves by Ear".to_string(),
            subject: "Science".to_string(),
            learning_style: Some(LearningStyle::Auditory),
            difficulty_level: Some(DifficultyLevel::Intermediate),
            estimated_duration_minutes: "40".to_string(),
            ..Default::default()
        };
        let payload = form.to_payload().expect("valid");
        assert_eq!(payload.estimated_duration_minutes, Some(40));
        assert_eq!(payload.description, None);

        let no_duration = VarkModuleForm {
            estimated_duration_minutes: String::new(),
            ..form.clone()
        };
        assert_eq!(no_duration.to_payload().unwrap().estimated_duration_minutes, None);

        let bad = VarkModuleForm {
            title: "Hi".to_string(),
            estimated_duration_minutes: "601".to_string(),
            learning_style: None,
            description: "x".repeat(2001),
            ..form
        };
        let errors = bad.validate().unwrap_err();
        for field in ["title", "estimated_duration_minutes", "learning_style", "description"] {
            assert!(errors.has(field), "missing error for {}", field);
        }
    }

    #[test]
    fn test_class_form() {
        let form = ClassForm {
            name: "5-Rizal".to_string(),
            subject: "Mathematics".to_string(),
            grade_level: String::new(),
        };
        let payload = form.to_payload().expect("valid");
        assert_eq!(payload.grade_level, None);

        let errors = ClassForm::default().validate().unwrap_err();
        assert!(errors.has("name"));
        assert!(errors.has("subject"));
    }
}
