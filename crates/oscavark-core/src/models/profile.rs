use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::lenient;
use super::vark::LearningStyle;
use crate::auth::Role;

/// A row of `profiles`, keyed by the auth user id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Profile {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub role: Option<Role>,
    #[serde(default)]
    pub barangay: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub learning_style: Option<LearningStyle>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Profile {
    pub fn full_name(&self) -> String {
        let name = format!(
            "{} {}",
            self.first_name.as_deref().unwrap_or(""),
            self.last_name.as_deref().unwrap_or("")
        );
        let name = name.trim();
        if name.is_empty() {
            self.email.clone().unwrap_or_else(|| "Unnamed user".to_string())
        } else {
            name.to_string()
        }
    }
}

/// Payload for creating or merging a profile row.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct NewProfile {
    pub id: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub role: Role,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub barangay: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub learning_style: Option<LearningStyle>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_profile_row() {
        let json = r#"{
            "id": "6a1f3c1e-1b7e-4f9d-9a55-6f0b2c9d1e11",
            "email": "guro@school.edu.ph",
            "first_name": "Maria",
            "last_name": "Santos",
            "role": "teacher",
            "barangay": null,
            "learning_style": null,
            "created_at": "2024-06-01T08:30:00.123456+00:00"
        }"#;
        let profile: Profile = serde_json::from_str(json).expect("parse");
        assert_eq!(profile.role, Some(Role::Teacher));
        assert_eq!(profile.full_name(), "Maria Santos");
        assert!(profile.created_at.is_some());
    }

    #[test]
    fn test_unknown_role_is_none() {
        let json = r#"{"id": "x", "role": "superadmin", "learning_style": "telepathic"}"#;
        let profile: Profile = serde_json::from_str(json).expect("parse");
        assert_eq!(profile.role, None);
        assert_eq!(profile.learning_style, None);
        assert_eq!(profile.full_name(), "Unnamed user");
    }

    #[test]
    fn test_new_profile_skips_empty_optionals() {
        let payload = NewProfile {
            id: "u1".to_string(),
            email: "s@example.ph".to_string(),
            first_name: "Juan".to_string(),
            last_name: "Cruz".to_string(),
            role: Role::Student,
            barangay: None,
            learning_style: Some(LearningStyle::Kinesthetic),
        };
        let value = serde_json::to_value(&payload).expect("serialize");
        assert_eq!(value["role"], "student");
        assert_eq!(value["learning_style"], "kinesthetic");
        assert!(value.get("barangay").is_none());
    }
}
