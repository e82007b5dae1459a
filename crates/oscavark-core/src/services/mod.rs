//! Feature APIs over the Supabase tables.
//!
//! Each API owns a `SupabaseClient` carrying the signed-in user's token
//! (`SupabaseClient::with_token`), so row-level policies on the server
//! decide what every query can see.

pub mod classes;
pub mod dashboard;
pub mod seniors;
pub mod vark;

pub use classes::{generate_class_code, normalize_class_code, ClassesApi, CLASS_CODE_LENGTH};
pub use dashboard::{
    SeniorAffairsDashboardApi, SeniorRecord, StudentDashboardApi, TeacherDashboardApi,
};
pub use seniors::{BeneficiariesApi, RegistryScope, SeniorCitizensApi, SeniorFilters};
pub use vark::{ModuleFilters, VarkModulesApi};
