//! Role dashboards.
//!
//! Each dashboard runs its independent queries concurrently and folds the
//! rows into a stats value. A failing query is logged and contributes
//! nothing, so a dashboard call always produces something to show.

use anyhow::Result;
use chrono::Local;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::api::{Query, SupabaseClient};
use crate::models::{
    Beneficiary, Class, ClassStudent, ModuleProgress, Profile, QuizResult, RegistrationRow,
    RegistryCounts, SeniorAffairsStats, SeniorCitizen, SeniorStatus, StudentDashboardStats,
    TeacherDashboardStats, VarkModule,
};

use super::seniors::{RegistryScope, SENIORS_TABLE};

/// Rows per request when paging, matching Supabase's default row cap.
const PAGE_SIZE: usize = 1000;

/// Log a failed dashboard query and fall back to its empty value.
fn or_default<T: Default>(what: &str, result: Result<T>) -> T {
    match result {
        Ok(value) => value,
        Err(e) => {
            warn!(query = what, error = %format!("{:#}", e), "Dashboard query failed");
            T::default()
        }
    }
}

pub struct StudentDashboardApi {
    client: SupabaseClient,
}

impl StudentDashboardApi {
    pub fn new(client: SupabaseClient) -> Self {
        Self { client }
    }

    pub async fn stats(&self, student_id: &str) -> StudentDashboardStats {
        let profile_q = Query::table("profiles").select("*").eq("id", student_id);
        let published_q = Query::table("vark_modules").eq("is_published", true);
        let progress_q = Query::table("vark_module_progress")
            .select("*")
            .eq("student_id", student_id);
        let quiz_q = Query::table("quiz_results")
            .select("*")
            .eq("student_id", student_id);

        let (profile, published, progress, quizzes) = tokio::join!(
            self.client.select_one::<Profile>(&profile_q),
            self.client.count(&published_q),
            self.client.select::<ModuleProgress>(&progress_q),
            self.client.select::<QuizResult>(&quiz_q),
        );

        let profile = or_default("student profile", profile);
        let progress = or_default("module progress", progress);
        let quizzes = or_default("quiz results", quizzes);
        let stats = StudentDashboardStats::from_rows(
            profile.as_ref(),
            or_default("published modules", published),
            &progress,
            &quizzes,
        );
        debug!(student_id, completed = stats.completed_modules, "Student dashboard loaded");
        stats
    }
}

pub struct TeacherDashboardApi {
    client: SupabaseClient,
}

impl TeacherDashboardApi {
    pub fn new(client: SupabaseClient) -> Self {
        Self { client }
    }

    pub async fn stats(&self, teacher_id: &str) -> TeacherDashboardStats {
        let classes_q = Query::table("classes").select("*").eq("teacher_id", teacher_id);
        let modules_q = Query::table("vark_modules")
            .select("*")
            .eq("created_by", teacher_id);

        let (classes, modules) = tokio::join!(
            self.client.select::<Class>(&classes_q),
            self.client.select::<VarkModule>(&modules_q),
        );
        let classes: Vec<Class> = or_default("teacher classes", classes);
        let modules: Vec<VarkModule> = or_default("teacher modules", modules);

        let class_ids: Vec<&str> = classes.iter().map(|c| c.id.as_str()).collect();
        let module_ids: Vec<&str> = modules.iter().map(|m| m.id.as_str()).collect();

        // The second round depends on the ids above; skip queries with
        // nothing to match.
        let enrollments_fut = async {
            if class_ids.is_empty() {
                return Ok(Vec::new());
            }
            let query = Query::table("class_students")
                .select("*")
                .in_list("class_id", &class_ids);
            self.client.select::<ClassStudent>(&query).await
        };
        let pending_fut = async {
            if class_ids.is_empty() {
                return Ok(0);
            }
            let query = Query::table("submissions")
                .in_list("class_id", &class_ids)
                .eq("status", "submitted");
            self.client.count(&query).await
        };
        let quizzes_fut = async {
            if module_ids.is_empty() {
                return Ok(Vec::new());
            }
            let query = Query::table("quiz_results")
                .select("*")
                .in_list("module_id", &module_ids);
            self.client.select::<QuizResult>(&query).await
        };
        let (enrollments, pending, quizzes) = tokio::join!(enrollments_fut, pending_fut, quizzes_fut);

        let stats = TeacherDashboardStats::from_rows(
            &classes,
            &or_default("class enrollments", enrollments),
            &modules,
            or_default("pending submissions", pending),
            &or_default("quiz results", quizzes),
        );
        debug!(teacher_id, classes = stats.total_classes, "Teacher dashboard loaded");
        stats
    }
}

/// A senior's own registry entry and beneficiaries.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SeniorRecord {
    pub senior: Option<SeniorCitizen>,
    pub beneficiaries: Vec<Beneficiary>,
}

pub struct SeniorAffairsDashboardApi {
    client: SupabaseClient,
}

impl SeniorAffairsDashboardApi {
    pub fn new(client: SupabaseClient) -> Self {
        Self { client }
    }

    /// Registry statistics for `scope`. Totals are exact server-side counts;
    /// only the columns behind the breakdowns are downloaded.
    pub async fn stats(&self, scope: &RegistryScope) -> SeniorAffairsStats {
        if *scope == RegistryScope::Unassigned {
            warn!("No barangay on the BASCA profile, registry stats withheld");
            return SeniorAffairsStats::default();
        }
        let barangay = scope.barangay();
        let seniors_q = scoped_seniors_query(barangay);
        let status_q = |status: SeniorStatus| seniors_q.clone().eq("status", status.as_str());
        let (active_q, inactive_q, deceased_q) = (
            status_q(SeniorStatus::Active),
            status_q(SeniorStatus::Inactive),
            status_q(SeniorStatus::Deceased),
        );
        let registrations_q = seniors_q.clone().select(RegistrationRow::COLUMNS);
        let beneficiaries_q = beneficiary_count_query(barangay);

        let (total, active, inactive, deceased, beneficiaries, registrations) = tokio::join!(
            self.client.count(&seniors_q),
            self.client.count(&active_q),
            self.client.count(&inactive_q),
            self.client.count(&deceased_q),
            self.client.count(&beneficiaries_q),
            self.registrations(&registrations_q),
        );

        let counts = RegistryCounts {
            total: or_default("senior count", total),
            active: or_default("active count", active),
            inactive: or_default("inactive count", inactive),
            deceased: or_default("deceased count", deceased),
            beneficiaries: or_default("beneficiary count", beneficiaries),
        };
        let registrations = or_default("registrations", registrations);
        let stats = SeniorAffairsStats::from_counts(
            barangay,
            counts,
            &registrations,
            Local::now().date_naive(),
        );
        debug!(barangay = ?barangay, total = stats.total_seniors, "Senior affairs dashboard loaded");
        stats
    }

    /// Every registration row, paged so the server's row cap cannot cut the
    /// breakdowns short.
    async fn registrations(&self, query: &Query) -> Result<Vec<RegistrationRow>> {
        let mut rows: Vec<RegistrationRow> = Vec::new();
        loop {
            let page_q = query.clone().order("id", true).limit(PAGE_SIZE).offset(rows.len());
            let page: Vec<RegistrationRow> = self.client.select(&page_q).await?;
            let last = page.len() < PAGE_SIZE;
            rows.extend(page);
            if last {
                return Ok(rows);
            }
        }
    }

    /// The record linked to a senior's account, with beneficiaries.
    pub async fn my_record(&self, user_id: &str) -> SeniorRecord {
        let query = Query::table("senior_citizens").select("*").eq("user_id", user_id);
        let senior: Option<SeniorCitizen> =
            or_default("own senior record", self.client.select_one(&query).await);

        let beneficiaries = match senior {
            Some(ref s) => {
                let query = Query::table("beneficiaries")
                    .select("*")
                    .eq("senior_citizen_id", &s.id)
                    .order("is_primary", false);
                or_default("own beneficiaries", self.client.select(&query).await)
            }
            None => Vec::new(),
        };
        SeniorRecord {
            senior,
            beneficiaries,
        }
    }
}

/// Seniors in one barangay, or the whole registry.
fn scoped_seniors_query(barangay: Option<&str>) -> Query {
    let query = Query::table(SENIORS_TABLE);
    match barangay {
        Some(b) => query.eq("barangay", b),
        None => query,
    }
}

/// Beneficiary count, scoped through the owning senior's barangay.
fn beneficiary_count_query(barangay: Option<&str>) -> Query {
    match barangay {
        Some(b) => Query::table("beneficiaries")
            .select("id,senior_citizens!inner(barangay)")
            .eq("senior_citizens.barangay", b),
        None => Query::table("beneficiaries"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failed_query_degrades_to_zero() {
        let count: u64 = or_default("count", Err(anyhow::anyhow!("offline")));
        assert_eq!(count, 0);
        let rows: Vec<Class> = or_default("rows", Err(anyhow::anyhow!("offline")));
        assert!(rows.is_empty());
        assert_eq!(or_default("ok", Ok(3u64)), 3);
    }

    #[test]
    fn test_beneficiary_count_scoping() {
        let all = beneficiary_count_query(None);
        assert!(all.params().is_empty());

        let scoped = beneficiary_count_query(Some("San Roque"));
        assert_eq!(
            scoped.params(),
            vec![
                ("select".to_string(), "id,senior_citizens!inner(barangay)".to_string()),
                ("senior_citizens.barangay".to_string(), "eq.San Roque".to_string()),
            ]
        );
    }

    #[test]
    fn test_status_counts_share_the_barangay_scope() {
        let scoped = scoped_seniors_query(Some("San Roque"));
        assert_eq!(scoped.table_name(), "senior_citizens");
        let active = scoped.clone().eq("status", SeniorStatus::Active.as_str());
        assert_eq!(
            active.params(),
            vec![
                ("barangay".to_string(), "eq.San Roque".to_string()),
                ("status".to_string(), "eq.active".to_string()),
            ]
        );
        assert!(scoped_seniors_query(None).params().is_empty());

        let registrations = scoped.select(RegistrationRow::COLUMNS);
        assert!(registrations
            .params()
            .contains(&("select".to_string(), "barangay,registration_date,created_at".to_string())));
    }

    #[tokio::test]
    async fn test_unassigned_scope_returns_empty_stats_without_querying() {
        // Nothing listens on this port; any request would fail and warn
        let settings = crate::config::SupabaseSettings {
            url: "http://127.0.0.1:9".to_string(),
            anon_key: "anon".to_string(),
        };
        let client = SupabaseClient::new(&settings).expect("client");
        let stats = SeniorAffairsDashboardApi::new(client)
            .stats(&RegistryScope::Unassigned)
            .await;
        assert_eq!(stats, SeniorAffairsStats::default());
        assert_eq!(stats.barangay, None);
    }

    #[test]
    fn test_zero_state_stats() {
        let student = StudentDashboardStats::from_rows(None, 0, &[], &[]);
        assert_eq!(student, StudentDashboardStats::default());
        assert_eq!(student.completion_rate(), 0.0);
        assert!(SeniorRecord::default().senior.is_none());
    }
}
