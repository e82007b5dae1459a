//! Editable form overlays.
//!
//! A `FormState` is a flat list of labelled fields keyed by the same names
//! the validation layer reports errors under, so a `ValidationErrors` value
//! can be shown next to the field it belongs to.

use oscavark_core::auth::Role;
use oscavark_core::models::{
    Beneficiary, DifficultyLevel, LearningStyle, SeniorCitizen, SeniorStatus, VarkModule,
};
use oscavark_core::validation::{
    BeneficiaryForm, ClassForm, RegisterForm, SeniorCitizenForm, ValidationErrors, VarkModuleForm,
};

/// Longest value accepted in a single-line field.
const MAX_FIELD_LENGTH: usize = 200;

/// Module descriptions may be longer.
const MAX_DESCRIPTION_LENGTH: usize = 2000;

const ROLE_CHOICES: &[&str] = &["osca", "basca", "senior", "teacher", "student"];
const GENDER_CHOICES: &[&str] = &["male", "female"];
const STATUS_CHOICES: &[&str] = &["active", "inactive", "deceased"];
const STYLE_CHOICES: &[&str] = &["", "visual", "auditory", "reading_writing", "kinesthetic"];
const DIFFICULTY_CHOICES: &[&str] = &["", "beginner", "intermediate", "advanced"];
const YES_NO: &[&str] = &["no", "yes"];

/// What a form creates or edits. Ids are present when editing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormKind {
    Register,
    Senior { id: Option<String> },
    Beneficiary { senior_id: String, id: Option<String> },
    Module { id: Option<String>, class_id: Option<String> },
    Class,
    JoinClass,
}

impl FormKind {
    pub fn title(&self) -> &'static str {
        match self {
            FormKind::Register => "Create Account",
            FormKind::Senior { id: None } => "Register Senior Citizen",
            FormKind::Senior { id: Some(_) } => "Edit Senior Citizen",
            FormKind::Beneficiary { id: None, .. } => "Add Beneficiary",
            FormKind::Beneficiary { id: Some(_), .. } => "Edit Beneficiary",
            FormKind::Module { id: None, .. } => "New VARK Module",
            FormKind::Module { id: Some(_), .. } => "Edit VARK Module",
            FormKind::Class => "New Class",
            FormKind::JoinClass => "Join a Class",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldInput {
    Text,
    Secret,
    Choice(&'static [&'static str]),
}

#[derive(Debug, Clone)]
pub struct FormField {
    pub key: &'static str,
    pub label: &'static str,
    pub value: String,
    pub input: FieldInput,
}

impl FormField {
    fn text(key: &'static str, label: &'static str, value: impl Into<String>) -> Self {
        Self {
            key,
            label,
            value: value.into(),
            input: FieldInput::Text,
        }
    }

    fn secret(key: &'static str, label: &'static str) -> Self {
        Self {
            key,
            label,
            value: String::new(),
            input: FieldInput::Secret,
        }
    }

    /// A picker; values outside `options` fall back to the first option.
    fn choice(
        key: &'static str,
        label: &'static str,
        options: &'static [&'static str],
        value: &str,
    ) -> Self {
        let value = if options.contains(&value) {
            value
        } else {
            options.first().copied().unwrap_or("")
        };
        Self {
            key,
            label,
            value: value.to_string(),
            input: FieldInput::Choice(options),
        }
    }

    fn yes_no(key: &'static str, label: &'static str, value: bool) -> Self {
        Self::choice(key, label, YES_NO, if value { "yes" } else { "no" })
    }

    pub fn is_choice(&self) -> bool {
        matches!(self.input, FieldInput::Choice(_))
    }

    fn max_len(&self) -> usize {
        if self.key == "description" {
            MAX_DESCRIPTION_LENGTH
        } else {
            MAX_FIELD_LENGTH
        }
    }

    /// Step a picker forwards or backwards, wrapping around.
    pub fn cycle(&mut self, forward: bool) {
        let FieldInput::Choice(options) = self.input else {
            return;
        };
        if options.is_empty() {
            return;
        }
        let current = options.iter().position(|o| *o == self.value).unwrap_or(0);
        let next = if forward {
            (current + 1) % options.len()
        } else {
            (current + options.len() - 1) % options.len()
        };
        self.value = options[next].to_string();
    }

    /// Text shown in the form; secrets are masked.
    pub fn display_value(&self) -> String {
        match self.input {
            FieldInput::Secret => "*".repeat(self.value.chars().count()),
            FieldInput::Choice(_) if self.value.is_empty() => "(none)".to_string(),
            FieldInput::Choice(_) => format!("< {} >", self.value),
            FieldInput::Text => self.value.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct FormState {
    pub kind: FormKind,
    pub fields: Vec<FormField>,
    pub focus: usize,
    pub errors: ValidationErrors,
    /// Error that belongs to no single field, e.g. a server rejection.
    pub message: Option<String>,
}

impl FormState {
    fn new(kind: FormKind, fields: Vec<FormField>) -> Self {
        Self {
            kind,
            fields,
            focus: 0,
            errors: ValidationErrors::new(),
            message: None,
        }
    }

    pub fn register(role: Role, email: &str) -> Self {
        Self::new(
            FormKind::Register,
            vec![
                FormField::text("email", "Email", email),
                FormField::secret("password", "Password"),
                FormField::secret("confirm_password", "Confirm password"),
                FormField::text("first_name", "First name", ""),
                FormField::text("last_name", "Last name", ""),
                FormField::choice("role", "Role", ROLE_CHOICES, role.as_str()),
                FormField::text("barangay", "Barangay", ""),
                FormField::choice("learning_style", "Learning style", STYLE_CHOICES, ""),
            ],
        )
    }

    fn senior_fields(kind: FormKind, form: &SeniorCitizenForm) -> Self {
        Self::new(
            kind,
            vec![
                FormField::text("osca_id", "OSCA ID", &form.osca_id),
                FormField::text("first_name", "First name", &form.first_name),
                FormField::text("middle_name", "Middle name", &form.middle_name),
                FormField::text("last_name", "Last name", &form.last_name),
                FormField::text("extension_name", "Extension", &form.extension_name),
                FormField::text("birth_date", "Birth date (YYYY-MM-DD)", &form.birth_date),
                FormField::choice("gender", "Gender", GENDER_CHOICES, &form.gender),
                FormField::text("civil_status", "Civil status", &form.civil_status),
                FormField::text("barangay", "Barangay", &form.barangay),
                FormField::text("address", "Address", &form.address),
                FormField::text("contact_number", "Contact number", &form.contact_number),
                FormField::text(
                    "emergency_contact_name",
                    "Emergency contact",
                    &form.emergency_contact_name,
                ),
                FormField::text(
                    "emergency_contact_number",
                    "Emergency number",
                    &form.emergency_contact_number,
                ),
                FormField::choice("status", "Status", STATUS_CHOICES, form.status.as_str()),
            ],
        )
    }

    /// New registry entry. A BASCA officer's barangay is filled in.
    pub fn new_senior(barangay: Option<&str>) -> Self {
        let form = SeniorCitizenForm {
            barangay: barangay.unwrap_or_default().to_string(),
            ..Default::default()
        };
        Self::senior_fields(FormKind::Senior { id: None }, &form)
    }

    pub fn edit_senior(senior: &SeniorCitizen) -> Self {
        Self::senior_fields(
            FormKind::Senior {
                id: Some(senior.id.clone()),
            },
            &SeniorCitizenForm::from_record(senior),
        )
    }

    fn beneficiary_fields(kind: FormKind, form: &BeneficiaryForm) -> Self {
        Self::new(
            kind,
            vec![
                FormField::text("first_name", "First name", &form.first_name),
                FormField::text("last_name", "Last name", &form.last_name),
                FormField::text("relationship", "Relationship", &form.relationship),
                FormField::text("birth_date", "Birth date (YYYY-MM-DD)", &form.birth_date),
                FormField::text("contact_number", "Contact number", &form.contact_number),
                FormField::yes_no("is_primary", "Primary beneficiary", form.is_primary),
            ],
        )
    }

    pub fn new_beneficiary(senior_id: &str) -> Self {
        Self::beneficiary_fields(
            FormKind::Beneficiary {
                senior_id: senior_id.to_string(),
                id: None,
            },
            &BeneficiaryForm::default(),
        )
    }

    pub fn edit_beneficiary(beneficiary: &Beneficiary) -> Self {
        Self::beneficiary_fields(
            FormKind::Beneficiary {
                senior_id: beneficiary.senior_citizen_id.clone(),
                id: Some(beneficiary.id.clone()),
            },
            &BeneficiaryForm::from_record(beneficiary),
        )
    }

    fn module_fields(kind: FormKind, form: &VarkModuleForm) -> Self {
        Self::new(
            kind,
            vec![
                FormField::text("title", "Title", &form.title),
                FormField::text("subject", "Subject", &form.subject),
                FormField::text("grade_level", "Grade level", &form.grade_level),
                FormField::choice(
                    "learning_style",
                    "Learning style",
                    STYLE_CHOICES,
                    form.learning_style.map(|s| s.as_str()).unwrap_or(""),
                ),
                FormField::choice(
                    "difficulty_level",
                    "Difficulty",
                    DIFFICULTY_CHOICES,
                    form.difficulty_level.map(|d| d.as_str()).unwrap_or(""),
                ),
                FormField::text(
                    "estimated_duration_minutes",
                    "Duration (minutes)",
                    &form.estimated_duration_minutes,
                ),
                FormField::text("description", "Description", &form.description),
                FormField::yes_no("is_published", "Published", form.is_published),
            ],
        )
    }

    pub fn new_module() -> Self {
        Self::module_fields(
            FormKind::Module {
                id: None,
                class_id: None,
            },
            &VarkModuleForm::default(),
        )
    }

    pub fn edit_module(module: &VarkModule) -> Self {
        Self::module_fields(
            FormKind::Module {
                id: Some(module.id.clone()),
                class_id: module.class_id.clone(),
            },
            &VarkModuleForm::from_record(module),
        )
    }

    pub fn new_class() -> Self {
        Self::new(
            FormKind::Class,
            vec![
                FormField::text("name", "Class name", ""),
                FormField::text("subject", "Subject", ""),
                FormField::text("grade_level", "Grade level", ""),
            ],
        )
    }

    pub fn join_class() -> Self {
        Self::new(
            FormKind::JoinClass,
            vec![FormField::text("class_code", "Class code", "")],
        )
    }

    // ===== Editing =====

    pub fn value(&self, key: &str) -> &str {
        self.fields
            .iter()
            .find(|f| f.key == key)
            .map(|f| f.value.as_str())
            .unwrap_or("")
    }

    fn flag(&self, key: &str) -> bool {
        self.value(key) == "yes"
    }

    pub fn next_field(&mut self) {
        if !self.fields.is_empty() {
            self.focus = (self.focus + 1) % self.fields.len();
        }
    }

    pub fn prev_field(&mut self) {
        if !self.fields.is_empty() {
            self.focus = (self.focus + self.fields.len() - 1) % self.fields.len();
        }
    }

    /// Type into the focused field. Pickers ignore typing except space,
    /// which steps them forward.
    pub fn push_char(&mut self, c: char) {
        let Some(field) = self.fields.get_mut(self.focus) else {
            return;
        };
        if field.is_choice() {
            if c == ' ' {
                field.cycle(true);
            }
            return;
        }
        if field.value.chars().count() < field.max_len() && !c.is_control() {
            field.value.push(c);
        }
    }

    pub fn pop_char(&mut self) {
        if let Some(field) = self.fields.get_mut(self.focus) {
            if !field.is_choice() {
                field.value.pop();
            }
        }
    }

    pub fn cycle_choice(&mut self, forward: bool) {
        if let Some(field) = self.fields.get_mut(self.focus) {
            field.cycle(forward);
        }
    }

    pub fn error_for(&self, key: &str) -> Option<&str> {
        self.errors.for_field(key)
    }

    /// Show field errors and move focus to the first field that has one.
    pub fn set_errors(&mut self, errors: ValidationErrors) {
        if let Some(index) = self.fields.iter().position(|f| errors.has(f.key)) {
            self.focus = index;
        }
        self.errors = errors;
        self.message = None;
    }

    pub fn set_message(&mut self, message: impl Into<String>) {
        self.errors = ValidationErrors::new();
        self.message = Some(message.into());
    }

    // ===== Conversion into validated forms =====

    pub fn to_register_form(&self) -> RegisterForm {
        RegisterForm {
            email: self.value("email").to_string(),
            password: self.value("password").to_string(),
            confirm_password: self.value("confirm_password").to_string(),
            first_name: self.value("first_name").to_string(),
            last_name: self.value("last_name").to_string(),
            role: Role::parse(self.value("role")),
            barangay: self.value("barangay").to_string(),
            learning_style: LearningStyle::parse(self.value("learning_style")),
        }
    }

    pub fn to_senior_form(&self) -> SeniorCitizenForm {
        SeniorCitizenForm {
            osca_id: self.value("osca_id").to_string(),
            first_name: self.value("first_name").to_string(),
            middle_name: self.value("middle_name").to_string(),
            last_name: self.value("last_name").to_string(),
            extension_name: self.value("extension_name").to_string(),
            birth_date: self.value("birth_date").to_string(),
            gender: self.value("gender").to_string(),
            civil_status: self.value("civil_status").to_string(),
            barangay: self.value("barangay").to_string(),
            address: self.value("address").to_string(),
            contact_number: self.value("contact_number").to_string(),
            emergency_contact_name: self.value("emergency_contact_name").to_string(),
            emergency_contact_number: self.value("emergency_contact_number").to_string(),
            status: SeniorStatus::SETTABLE
                .into_iter()
                .find(|s| s.as_str() == self.value("status"))
                .unwrap_or(SeniorStatus::Active),
        }
    }

    pub fn to_beneficiary_form(&self) -> BeneficiaryForm {
        BeneficiaryForm {
            first_name: self.value("first_name").to_string(),
            last_name: self.value("last_name").to_string(),
            relationship: self.value("relationship").to_string(),
            birth_date: self.value("birth_date").to_string(),
            contact_number: self.value("contact_number").to_string(),
            is_primary: self.flag("is_primary"),
        }
    }

    pub fn to_module_form(&self) -> VarkModuleForm {
        let class_id = match &self.kind {
            FormKind::Module { class_id, .. } => class_id.clone(),
            _ => None,
        };
        VarkModuleForm {
            title: self.value("title").to_string(),
            description: self.value("description").to_string(),
            subject: self.value("subject").to_string(),
            grade_level: self.value("grade_level").to_string(),
            learning_style: LearningStyle::parse(self.value("learning_style")),
            difficulty_level: DifficultyLevel::parse(self.value("difficulty_level")),
            estimated_duration_minutes: self.value("estimated_duration_minutes").to_string(),
            class_id,
            is_published: self.flag("is_published"),
        }
    }

    pub fn to_class_form(&self) -> ClassForm {
        ClassForm {
            name: self.value("name").to_string(),
            subject: self.value("subject").to_string(),
            grade_level: self.value("grade_level").to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use oscavark_core::validation::Validate;

    fn type_text(form: &mut FormState, text: &str) {
        for c in text.chars() {
            form.push_char(c);
        }
    }

    #[test]
    fn test_choice_cycles_and_wraps() {
        let mut field = FormField::choice("status", "Status", STATUS_CHOICES, "deceased");
        field.cycle(true);
        assert_eq!(field.value, "active");
        field.cycle(false);
        assert_eq!(field.value, "deceased");

        let unknown = FormField::choice("gender", "Gender", GENDER_CHOICES, "other");
        assert_eq!(unknown.value, "male");
    }

    #[test]
    fn test_display_value_masks_secrets() {
        let mut field = FormField::secret("password", "Password");
        field.value = "hunter22".to_string();
        assert_eq!(field.display_value(), "********");

        let none = FormField::choice("learning_style", "Style", STYLE_CHOICES, "");
        assert_eq!(none.display_value(), "(none)");
    }

    #[test]
    fn test_typing_into_fields() {
        let mut form = FormState::join_class();
        type_text(&mut form, "ab3k9z");
        assert_eq!(form.value("class_code"), "ab3k9z");
        form.pop_char();
        assert_eq!(form.value("class_code"), "ab3k9");
        form.push_char('\n');
        assert_eq!(form.value("class_code"), "ab3k9");
    }

    #[test]
    fn test_space_steps_a_picker() {
        let mut form = FormState::new_beneficiary("s-1");
        form.focus = form.fields.iter().position(|f| f.key == "is_primary").unwrap();
        form.push_char('x');
        assert_eq!(form.value("is_primary"), "no");
        form.push_char(' ');
        assert_eq!(form.value("is_primary"), "yes");
        assert!(form.to_beneficiary_form().is_primary);
    }

    #[test]
    fn test_field_navigation_wraps() {
        let mut form = FormState::new_class();
        form.prev_field();
        assert_eq!(form.focus, 2);
        form.next_field();
        assert_eq!(form.focus, 0);
    }

    #[test]
    fn test_errors_move_focus_to_first_bad_field() {
        let mut form = FormState::new_class();
        form.focus = 0;
        let errors = form.to_class_form().validate().unwrap_err();
        form.set_errors(errors);
        assert_eq!(form.fields[form.focus].key, "name");
        assert!(form.error_for("subject").is_some());

        form.set_message("Server said no");
        assert!(form.errors.is_empty());
        assert_eq!(form.message.as_deref(), Some("Server said no"));
    }

    #[test]
    fn test_register_form_conversion() {
        let mut form = FormState::register(Role::Basca, "officer@example.com");
        for (key, value) in [
            ("password", "secret123"),
            ("confirm_password", "secret123"),
            ("first_name", "Rosa"),
            ("last_name", "Reyes"),
            ("barangay", "San Roque"),
        ] {
            form.focus = form.fields.iter().position(|f| f.key == key).unwrap();
            type_text(&mut form, value);
        }
        let register = form.to_register_form();
        assert_eq!(register.role, Some(Role::Basca));
        assert_eq!(register.learning_style, None);
        assert!(register.validate().is_ok());
    }

    #[test]
    fn test_new_senior_prefills_barangay() {
        let form = FormState::new_senior(Some("Poblacion"));
        assert_eq!(form.value("barangay"), "Poblacion");
        assert_eq!(form.value("status"), "active");
        assert_eq!(form.to_senior_form().status, SeniorStatus::Active);
        assert_eq!(form.kind.title(), "Register Senior Citizen");
    }

    #[test]
    fn test_module_form_keeps_class() {
        let mut form = FormState::new_module();
        form.kind = FormKind::Module {
            id: Some("m-1".to_string()),
            class_id: Some("c-1".to_string()),
        };
        form.focus = form.fields.iter().position(|f| f.key == "learning_style").unwrap();
        form.cycle_choice(true);
        let module = form.to_module_form();
        assert_eq!(module.class_id.as_deref(), Some("c-1"));
        assert_eq!(module.learning_style, Some(LearningStyle::Visual));
        assert_eq!(module.difficulty_level, None);
    }
}
