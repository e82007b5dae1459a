//! Senior citizen registry and beneficiaries.

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::api::{ApiError, Query, SupabaseClient};
use crate::auth::{AuthContext, Role};
use crate::models::{Beneficiary, NewBeneficiary, SeniorCitizen, SeniorStatus};
use crate::validation::{BeneficiaryForm, SeniorCitizenForm};

pub(crate) const SENIORS_TABLE: &str = "senior_citizens";
const BENEFICIARIES_TABLE: &str = "beneficiaries";

const SEARCH_COLUMNS: [&str; 4] = ["first_name", "middle_name", "last_name", "osca_id"];

/// The part of the registry a senior-affairs user may see.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryScope {
    /// OSCA sees every barangay.
    All,
    /// A BASCA officer sees their own barangay.
    Barangay(String),
    /// A BASCA profile with no barangay sees nothing.
    Unassigned,
}

impl RegistryScope {
    /// Scope for a signed-in user; `None` for roles outside senior affairs.
    pub fn for_context(ctx: &AuthContext) -> Option<Self> {
        match ctx.role {
            Role::Osca => Some(RegistryScope::All),
            Role::Basca => Some(match ctx.barangay() {
                Some(barangay) => RegistryScope::Barangay(barangay.to_string()),
                None => RegistryScope::Unassigned,
            }),
            _ => None,
        }
    }

    pub fn barangay(&self) -> Option<&str> {
        match self {
            RegistryScope::Barangay(barangay) => Some(barangay),
            _ => None,
        }
    }

    /// List filters for this scope, `None` when nothing may be listed.
    pub fn filters(&self) -> Option<SeniorFilters> {
        match self {
            RegistryScope::All => Some(SeniorFilters::default()),
            RegistryScope::Barangay(barangay) => Some(SeniorFilters::for_barangay(barangay)),
            RegistryScope::Unassigned => None,
        }
    }
}

/// Optional narrowing for the registry list. Unset fields add nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeniorFilters {
    pub barangay: Option<String>,
    pub status: Option<SeniorStatus>,
    pub search: Option<String>,
}

impl SeniorFilters {
    /// Filters for a BASCA officer, who only sees their own barangay.
    pub fn for_barangay(barangay: &str) -> Self {
        Self {
            barangay: Some(barangay.to_string()),
            ..Default::default()
        }
    }

    pub fn query(&self) -> Query {
        let mut query = Query::table(SENIORS_TABLE)
            .select("*")
            .eq_opt("barangay", self.barangay.as_deref().map(str::trim).filter(|b| !b.is_empty()))
            .eq_opt("status", self.status.map(|s| s.as_str()));
        if let Some(ref needle) = self.search {
            query = query.search_any(&SEARCH_COLUMNS, needle);
        }
        query.order("last_name", true).order("first_name", true)
    }
}

pub struct SeniorCitizensApi {
    client: SupabaseClient,
}

impl SeniorCitizensApi {
    pub fn new(client: SupabaseClient) -> Self {
        Self { client }
    }

    pub async fn list(&self, filters: &SeniorFilters) -> Result<Vec<SeniorCitizen>> {
        let seniors: Vec<SeniorCitizen> = self.client.select(&filters.query()).await?;
        debug!(count = seniors.len(), barangay = ?filters.barangay, "Loaded senior citizens");
        Ok(seniors)
    }

    pub async fn get(&self, id: &str) -> Result<Option<SeniorCitizen>> {
        let query = Query::table(SENIORS_TABLE).select("*").eq("id", id);
        self.client.select_one(&query).await
    }

    /// The registry record linked to a senior's own account.
    pub async fn for_user(&self, user_id: &str) -> Result<Option<SeniorCitizen>> {
        let query = Query::table(SENIORS_TABLE).select("*").eq("user_id", user_id);
        self.client.select_one(&query).await
    }

    pub async fn create(&self, form: &SeniorCitizenForm, created_by: &str) -> Result<SeniorCitizen> {
        let mut payload = form.to_payload()?;
        payload.created_by = Some(created_by.to_string());
        let senior: SeniorCitizen = self
            .client
            .insert(SENIORS_TABLE, &payload)
            .await
            .context("Failed to register senior citizen")?;
        info!(id = %senior.id, barangay = %senior.barangay, "Registered senior citizen");
        Ok(senior)
    }

    pub async fn update(&self, id: &str, form: &SeniorCitizenForm) -> Result<SeniorCitizen> {
        let payload = form.to_payload()?;
        let query = Query::table(SENIORS_TABLE).eq("id", id);
        let rows: Vec<SeniorCitizen> = self.client.update(&query, &payload).await?;
        first_row(rows, "senior citizen", id)
    }

    pub async fn set_status(&self, id: &str, status: SeniorStatus) -> Result<SeniorCitizen> {
        let query = Query::table(SENIORS_TABLE).eq("id", id);
        let patch = serde_json::json!({ "status": status });
        let rows: Vec<SeniorCitizen> = self.client.update(&query, &patch).await?;
        info!(id, status = status.as_str(), "Updated senior status");
        first_row(rows, "senior citizen", id)
    }

    pub async fn delete(&self, id: &str) -> Result<()> {
        self.client
            .delete(&Query::table(SENIORS_TABLE).eq("id", id))
            .await?;
        info!(id, "Deleted senior citizen");
        Ok(())
    }
}

pub struct BeneficiariesApi {
    client: SupabaseClient,
}

impl BeneficiariesApi {
    pub fn new(client: SupabaseClient) -> Self {
        Self { client }
    }

    /// Beneficiaries of one senior, primary first.
    pub async fn list_for_senior(&self, senior_id: &str) -> Result<Vec<Beneficiary>> {
        let query = Query::table(BENEFICIARIES_TABLE)
            .select("*")
            .eq("senior_citizen_id", senior_id)
            .order("is_primary", false)
            .order("last_name", true);
        self.client.select(&query).await
    }

    pub async fn create(&self, senior_id: &str, form: &BeneficiaryForm) -> Result<Beneficiary> {
        let mut payload: NewBeneficiary = form.to_payload()?;
        payload.senior_citizen_id = Some(senior_id.to_string());
        if payload.is_primary {
            self.clear_primary(senior_id, None).await?;
        }
        self.client
            .insert(BENEFICIARIES_TABLE, &payload)
            .await
            .context("Failed to add beneficiary")
    }

    pub async fn update(&self, id: &str, form: &BeneficiaryForm) -> Result<Beneficiary> {
        let payload = form.to_payload()?;
        if payload.is_primary {
            let existing: Beneficiary = self
                .client
                .select_one(&Query::table(BENEFICIARIES_TABLE).select("*").eq("id", id))
                .await?
                .ok_or_else(|| ApiError::NotFound(format!("beneficiary {}", id)))?;
            self.clear_primary(&existing.senior_citizen_id, Some(id)).await?;
        }
        let rows: Vec<Beneficiary> = self
            .client
            .update(&Query::table(BENEFICIARIES_TABLE).eq("id", id), &payload)
            .await?;
        first_row(rows, "beneficiary", id)
    }

    pub async fn delete(&self, id: &str) -> Result<()> {
        self.client
            .delete(&Query::table(BENEFICIARIES_TABLE).eq("id", id))
            .await
    }

    async fn clear_primary(&self, senior_id: &str, except: Option<&str>) -> Result<()> {
        let query = primary_reset_query(senior_id, except);
        let cleared: Vec<Beneficiary> = self
            .client
            .update(&query, &serde_json::json!({ "is_primary": false }))
            .await?;
        if !cleared.is_empty() {
            debug!(senior_id, cleared = cleared.len(), "Cleared previous primary beneficiary");
        }
        Ok(())
    }
}

/// Rows of `senior_id` currently flagged primary, other than `except`.
fn primary_reset_query(senior_id: &str, except: Option<&str>) -> Query {
    let query = Query::table(BENEFICIARIES_TABLE)
        .eq("senior_citizen_id", senior_id)
        .eq("is_primary", true);
    match except {
        Some(id) => query.neq("id", id),
        None => query,
    }
}

fn first_row<T>(rows: Vec<T>, what: &str, id: &str) -> Result<T> {
    rows.into_iter()
        .next()
        .ok_or_else(|| ApiError::NotFound(format!("{} {}", what, id)).into())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(query: &Query) -> Vec<(String, String)> {
        query.params()
    }

    #[test]
    fn test_unfiltered_list_is_sorted_by_name() {
        let query = SeniorFilters::default().query();
        assert_eq!(query.table_name(), "senior_citizens");
        assert_eq!(
            pairs(&query),
            vec![
                ("select".to_string(), "*".to_string()),
                ("order".to_string(), "last_name.asc,first_name.asc".to_string()),
            ]
        );
    }

    #[test]
    fn test_barangay_status_and_search_filters() {
        let filters = SeniorFilters {
            barangay: Some("San Roque".to_string()),
            status: Some(SeniorStatus::Active),
            search: Some("cruz".to_string()),
        };
        let params = pairs(&filters.query());
        assert!(params.contains(&("barangay".to_string(), "eq.San Roque".to_string())));
        assert!(params.contains(&("status".to_string(), "eq.active".to_string())));
        assert!(params.contains(&(
            "or".to_string(),
            "(first_name.ilike.*cruz*,middle_name.ilike.*cruz*,last_name.ilike.*cruz*,osca_id.ilike.*cruz*)"
                .to_string()
        )));
    }

    fn context(role: Role, barangay: Option<&str>) -> AuthContext {
        let profile: crate::models::Profile = serde_json::from_value(serde_json::json!({
            "id": "user-1",
            "first_name": "Ligaya",
            "last_name": "Ramos",
            "role": role,
            "barangay": barangay,
        }))
        .expect("profile");
        AuthContext {
            session: crate::auth::SessionData {
                access_token: "jwt".to_string(),
                refresh_token: "refresh".to_string(),
                user_id: "user-1".to_string(),
                email: "basca@example.ph".to_string(),
                expires_at: chrono::Utc::now() + chrono::Duration::hours(1),
                role: Some(role),
            },
            profile,
            role,
        }
    }

    #[test]
    fn test_registry_scope_per_role() {
        let osca = RegistryScope::for_context(&context(Role::Osca, None));
        assert_eq!(osca, Some(RegistryScope::All));
        assert_eq!(osca.and_then(|s| s.filters()), Some(SeniorFilters::default()));

        let basca = RegistryScope::for_context(&context(Role::Basca, Some(" San Roque ")))
            .expect("scope");
        assert_eq!(basca.barangay(), Some("San Roque"));
        let params = pairs(&basca.filters().expect("filters").query());
        assert!(params.contains(&("barangay".to_string(), "eq.San Roque".to_string())));

        assert_eq!(RegistryScope::for_context(&context(Role::Teacher, None)), None);
    }

    #[test]
    fn test_basca_without_barangay_lists_nothing() {
        for barangay in [None, Some(""), Some("   ")] {
            let scope = RegistryScope::for_context(&context(Role::Basca, barangay)).expect("scope");
            assert_eq!(scope, RegistryScope::Unassigned);
            assert_eq!(scope.barangay(), None);
            assert!(scope.filters().is_none());
        }
    }

    #[test]
    fn test_blank_barangay_adds_nothing() {
        let filters = SeniorFilters::for_barangay("  ");
        assert!(!filters.query().has_filters());
        assert_eq!(
            SeniorFilters::for_barangay("Poblacion").barangay.as_deref(),
            Some("Poblacion")
        );
    }

    #[test]
    fn test_primary_reset_skips_edited_row() {
        let query = primary_reset_query("senior-1", Some("ben-2"));
        assert_eq!(
            pairs(&query),
            vec![
                ("senior_citizen_id".to_string(), "eq.senior-1".to_string()),
                ("is_primary".to_string(), "eq.true".to_string()),
                ("id".to_string(), "neq.ben-2".to_string()),
            ]
        );
        assert_eq!(pairs(&primary_reset_query("senior-1", None)).len(), 2);
    }

    #[test]
    fn test_first_row_missing_is_not_found() {
        let err = first_row::<u8>(Vec::new(), "beneficiary", "b1").unwrap_err();
        assert!(matches!(err.downcast_ref::<ApiError>(), Some(ApiError::NotFound(_))));
        assert_eq!(first_row(vec![7u8, 8], "x", "y").unwrap(), 7);
    }
}
