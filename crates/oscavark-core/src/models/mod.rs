//! Data models for the senior-citizen and VARK learning tables.
//!
//! This module contains the typed rows read from and written to the
//! backend:
//!
//! - `Profile`: the application-level user record
//! - `SeniorCitizen`, `Beneficiary`: senior affairs registry
//! - `VarkModule`, `ModuleProgress`: learning modules tagged by VARK style
//! - `Class`, `ClassStudent`, `Submission`, `QuizResult`: classroom records
//! - Dashboard statistics computed from the rows above
//!
//! `New*` structs are insert/update payloads; they never carry server-owned
//! columns such as `id` or `created_at`.

pub mod classroom;
pub mod dashboard;
pub mod profile;
pub mod senior;
pub mod vark;

pub use classroom::{Class, ClassStudent, NewClass, QuizResult, Submission, SubmissionStatus};
pub use dashboard::{
    BarangayCount, RegistryCounts, SeniorAffairsStats, StudentDashboardStats, TeacherDashboardStats,
};
pub use profile::{NewProfile, Profile};
pub use senior::{
    Beneficiary, Gender, NewBeneficiary, NewSeniorCitizen, RegistrationRow, SeniorCitizen, SeniorStatus,
};
pub use vark::{
    DifficultyLevel, LearningStyle, ModuleProgress, NewVarkModule, ProgressStatus, ProgressUpdate,
    VarkModule,
};

use serde::{de::DeserializeOwned, Deserialize, Deserializer};

/// Deserialize an optional value, turning anything unparseable into `None`
/// instead of failing the whole row.
pub(crate) fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| serde_json::from_value(v).ok()))
}
