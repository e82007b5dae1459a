//! VARK learning modules and per-student progress.

use anyhow::{Context, Result};
use chrono::Utc;
use tracing::{debug, info};

use crate::api::{ApiError, Query, SupabaseClient};
use crate::models::{DifficultyLevel, LearningStyle, ModuleProgress, ProgressUpdate, VarkModule};
use crate::validation::VarkModuleForm;

const MODULES_TABLE: &str = "vark_modules";
const PROGRESS_TABLE: &str = "vark_module_progress";

/// Conflict target for progress upserts; one row per student and module.
const PROGRESS_CONFLICT: &str = "student_id,module_id";

/// Optional filters for the module list. Each set field becomes one
/// PostgREST filter; unset fields add nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModuleFilters {
    pub learning_style: Option<LearningStyle>,
    pub difficulty_level: Option<DifficultyLevel>,
    pub subject: Option<String>,
    pub class_id: Option<String>,
    pub created_by: Option<String>,
    pub published_only: bool,
    pub search: Option<String>,
}

impl ModuleFilters {
    /// What a student browses: published modules only.
    pub fn published() -> Self {
        Self {
            published_only: true,
            ..Default::default()
        }
    }

    /// A teacher's own modules, drafts included.
    pub fn created_by(teacher_id: &str) -> Self {
        Self {
            created_by: Some(teacher_id.to_string()),
            ..Default::default()
        }
    }

    pub fn query(&self) -> Query {
        let mut query = Query::table(MODULES_TABLE)
            .select("*")
            .eq_opt("learning_style", self.learning_style.map(|s| s.as_str()))
            .eq_opt("difficulty_level", self.difficulty_level.map(|d| d.as_str()))
            .eq_opt("subject", self.subject.as_deref())
            .eq_opt("class_id", self.class_id.as_deref())
            .eq_opt("created_by", self.created_by.as_deref());
        if self.published_only {
            query = query.eq("is_published", true);
        }
        if let Some(needle) = self.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            query = query.ilike("title", needle);
        }
        query.order("created_at", false)
    }
}

pub struct VarkModulesApi {
    client: SupabaseClient,
}

impl VarkModulesApi {
    pub fn new(client: SupabaseClient) -> Self {
        Self { client }
    }

    pub async fn list(&self, filters: &ModuleFilters) -> Result<Vec<VarkModule>> {
        let modules: Vec<VarkModule> = self.client.select(&filters.query()).await?;
        debug!(count = modules.len(), "Loaded VARK modules");
        Ok(modules)
    }

    pub async fn get(&self, id: &str) -> Result<Option<VarkModule>> {
        let query = Query::table(MODULES_TABLE).select("*").eq("id", id);
        self.client.select_one(&query).await
    }

    pub async fn create(&self, form: &VarkModuleForm, created_by: &str) -> Result<VarkModule> {
        let mut payload = form.to_payload()?;
        payload.created_by = Some(created_by.to_string());
        let module: VarkModule = self
            .client
            .insert(MODULES_TABLE, &payload)
            .await
            .context("Failed to create module")?;
        info!(id = %module.id, style = ?module.learning_style, "Created VARK module");
        Ok(module)
    }

    pub async fn update(&self, id: &str, form: &VarkModuleForm) -> Result<VarkModule> {
        let payload = form.to_payload()?;
        let rows: Vec<VarkModule> = self
            .client
            .update(&Query::table(MODULES_TABLE).eq("id", id), &payload)
            .await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| ApiError::NotFound(format!("module {}", id)).into())
    }

    pub async fn set_published(&self, id: &str, published: bool) -> Result<VarkModule> {
        let rows: Vec<VarkModule> = self
            .client
            .update(
                &Query::table(MODULES_TABLE).eq("id", id),
                &serde_json::json!({ "is_published": published }),
            )
            .await?;
        info!(id, published, "Changed module visibility");
        rows.into_iter()
            .next()
            .ok_or_else(|| ApiError::NotFound(format!("module {}", id)).into())
    }

    pub async fn delete(&self, id: &str) -> Result<()> {
        self.client
            .delete(&Query::table(MODULES_TABLE).eq("id", id))
            .await?;
        info!(id, "Deleted VARK module");
        Ok(())
    }

    pub async fn progress_for_student(&self, student_id: &str) -> Result<Vec<ModuleProgress>> {
        let query = Query::table(PROGRESS_TABLE)
            .select("*")
            .eq("student_id", student_id)
            .order("last_accessed_at", false);
        self.client.select(&query).await
    }

    /// Record how far a student has got through a module.
    pub async fn record_progress(
        &self,
        student_id: &str,
        module_id: &str,
        percentage: f64,
        time_spent_minutes: i64,
    ) -> Result<ModuleProgress> {
        let update = ProgressUpdate::new(student_id, module_id, percentage, time_spent_minutes, Utc::now());
        let query = Query::table(PROGRESS_TABLE).on_conflict(PROGRESS_CONFLICT);
        let progress: ModuleProgress = self.client.upsert(&query, &update).await?;
        debug!(student_id, module_id, status = %progress.status, "Recorded module progress");
        Ok(progress)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn has(query: &Query, key: &str, value: &str) -> bool {
        query
            .params()
            .iter()
            .any(|(k, v)| k == key && v == value)
    }

    #[test]
    fn test_absent_filters_add_nothing() {
        let query = ModuleFilters::default().query();
        assert!(!query.has_filters());
        assert_eq!(
            query.params(),
            vec![
                ("select".to_string(), "*".to_string()),
                ("order".to_string(), "created_at.desc".to_string()),
            ]
        );
    }

    #[test]
    fn test_each_filter_passes_through() {
        let filters = ModuleFilters {
            learning_style: Some(LearningStyle::Kinesthetic),
            difficulty_level: Some(DifficultyLevel::Beginner),
            subject: Some("Science".to_string()),
            class_id: Some("class-1".to_string()),
            created_by: Some("teacher-1".to_string()),
            published_only: true,
            search: Some(" photosynthesis ".to_string()),
        };
        let query = filters.query();
        assert!(has(&query, "learning_style", "eq.kinesthetic"));
        assert!(has(&query, "difficulty_level", "eq.beginner"));
        assert!(has(&query, "subject", "eq.Science"));
        assert!(has(&query, "class_id", "eq.class-1"));
        assert!(has(&query, "created_by", "eq.teacher-1"));
        assert!(has(&query, "is_published", "eq.true"));
        assert!(has(&query, "title", "ilike.*photosynthesis*"));
    }

    #[test]
    fn test_preset_filters() {
        assert!(has(&ModuleFilters::published().query(), "is_published", "eq.true"));
        let own = ModuleFilters::created_by("t-9").query();
        assert!(has(&own, "created_by", "eq.t-9"));
        assert!(!has(&own, "is_published", "eq.true"));
    }

    #[test]
    fn test_blank_search_is_ignored() {
        let filters = ModuleFilters {
            search: Some("   ".to_string()),
            ..Default::default()
        };
        assert!(!filters.query().has_filters());
    }
}
