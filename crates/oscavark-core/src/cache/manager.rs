use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::debug;

use crate::models::{
    Beneficiary, Class, ModuleProgress, SeniorAffairsStats, SeniorCitizen, StudentDashboardStats,
    TeacherDashboardStats, VarkModule,
};
use crate::services::SeniorRecord;

/// Consider cache stale after 1 hour.
const CACHE_STALE_MINUTES: i64 = 60;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedData<T> {
    pub data: T,
    pub cached_at: DateTime<Utc>,
}

impl<T> CachedData<T> {
    pub fn new(data: T) -> Self {
        Self {
            data,
            cached_at: Utc::now(),
        }
    }

    pub fn age_minutes(&self) -> i64 {
        (Utc::now() - self.cached_at).num_minutes()
    }

    pub fn age_display(&self) -> String {
        let minutes = self.age_minutes();
        if minutes < 1 {
            // Includes negative ages from clock skew
            "just now".to_string()
        } else if minutes < 60 {
            format!("{}m ago", minutes)
        } else if minutes < 1440 {
            let hours = minutes / 60;
            if minutes % 60 >= 30 {
                format!("{}h ago", hours + 1)
            } else {
                format!("{}h ago", hours)
            }
        } else {
            let days = minutes / 1440;
            if (minutes % 1440) / 60 >= 12 {
                format!("{}d ago", days + 1)
            } else {
                format!("{}d ago", days)
            }
        }
    }

    pub fn is_stale(&self) -> bool {
        self.age_minutes() > CACHE_STALE_MINUTES
    }
}

/// JSON snapshots of the last loaded data, one directory per user.
pub struct CacheManager {
    cache_dir: PathBuf,
}

impl CacheManager {
    pub fn new(cache_dir: PathBuf) -> Result<Self> {
        std::fs::create_dir_all(&cache_dir)?;
        Ok(Self { cache_dir })
    }

    fn cache_path(&self, name: &str) -> PathBuf {
        self.cache_dir.join(format!("{}.json", name))
    }

    fn load<T: DeserializeOwned>(&self, name: &str) -> Result<Option<CachedData<T>>> {
        let path = self.cache_path(name);
        if !path.exists() {
            return Ok(None);
        }

        let contents = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read cache file: {}", name))?;
        let cached: CachedData<T> = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse cache file: {}", name))?;
        Ok(Some(cached))
    }

    fn save<T: Serialize + ?Sized>(&self, name: &str, data: &T) -> Result<()> {
        let cached = CachedData::new(data);
        let contents = serde_json::to_string_pretty(&cached)?;
        std::fs::write(self.cache_path(name), contents)
            .with_context(|| format!("Failed to write cache file: {}", name))?;
        Ok(())
    }

    /// Remove every cached file, e.g. on logout.
    pub fn clear(&self) -> Result<()> {
        for entry in std::fs::read_dir(&self.cache_dir)? {
            let path = entry?.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                std::fs::remove_file(&path)?;
            }
        }
        debug!(dir = %self.cache_dir.display(), "Cleared cache");
        Ok(())
    }

    // ===== Senior citizens =====

    pub fn load_seniors(&self) -> Result<Option<CachedData<Vec<SeniorCitizen>>>> {
        self.load("seniors")
    }

    pub fn save_seniors(&self, seniors: &[SeniorCitizen]) -> Result<()> {
        self.save("seniors", seniors)
    }

    pub fn load_beneficiaries(&self, senior_id: &str) -> Result<Option<CachedData<Vec<Beneficiary>>>> {
        self.load(&format!("beneficiaries_{}", senior_id))
    }

    pub fn save_beneficiaries(&self, senior_id: &str, beneficiaries: &[Beneficiary]) -> Result<()> {
        self.save(&format!("beneficiaries_{}", senior_id), beneficiaries)
    }

    pub fn load_senior_record(&self) -> Result<Option<CachedData<SeniorRecord>>> {
        self.load("senior_record")
    }

    pub fn save_senior_record(&self, record: &SeniorRecord) -> Result<()> {
        self.save("senior_record", record)
    }

    // ===== Learning =====

    pub fn load_modules(&self) -> Result<Option<CachedData<Vec<VarkModule>>>> {
        self.load("modules")
    }

    pub fn save_modules(&self, modules: &[VarkModule]) -> Result<()> {
        self.save("modules", modules)
    }

    pub fn load_progress(&self) -> Result<Option<CachedData<Vec<ModuleProgress>>>> {
        self.load("progress")
    }

    pub fn save_progress(&self, progress: &[ModuleProgress]) -> Result<()> {
        self.save("progress", progress)
    }

    pub fn load_classes(&self) -> Result<Option<CachedData<Vec<Class>>>> {
        self.load("classes")
    }

    pub fn save_classes(&self, classes: &[Class]) -> Result<()> {
        self.save("classes", classes)
    }

    // ===== Dashboards =====

    pub fn load_senior_affairs_stats(&self) -> Result<Option<CachedData<SeniorAffairsStats>>> {
        self.load("senior_affairs_stats")
    }

    pub fn save_senior_affairs_stats(&self, stats: &SeniorAffairsStats) -> Result<()> {
        self.save("senior_affairs_stats", stats)
    }

    pub fn load_student_stats(&self) -> Result<Option<CachedData<StudentDashboardStats>>> {
        self.load("student_stats")
    }

    pub fn save_student_stats(&self, stats: &StudentDashboardStats) -> Result<()> {
        self.save("student_stats", stats)
    }

    pub fn load_teacher_stats(&self) -> Result<Option<CachedData<TeacherDashboardStats>>> {
        self.load("teacher_stats")
    }

    pub fn save_teacher_stats(&self, stats: &TeacherDashboardStats) -> Result<()> {
        self.save("teacher_stats", stats)
    }

    // ===== Cache age information =====

    fn load_age<T>(&self, name: &str, loader: impl FnOnce() -> Result<Option<CachedData<T>>>) -> Option<(i64, String)> {
        match loader() {
            Ok(Some(cached)) => Some((cached.age_minutes(), cached.age_display())),
            Ok(None) => None,
            Err(e) => {
                debug!(cache = name, error = %e, "Failed to load cache for age display");
                None
            }
        }
    }

    /// Age of the freshest dashboard snapshot, e.g. "5m ago", or "never".
    pub fn last_updated(&self) -> String {
        let ages = [
            self.load_age("senior_affairs_stats", || self.load_senior_affairs_stats()),
            self.load_age("student_stats", || self.load_student_stats()),
            self.load_age("teacher_stats", || self.load_teacher_stats()),
            self.load_age("senior_record", || self.load_senior_record()),
        ];
        ages.into_iter()
            .flatten()
            .min_by_key(|(minutes, _)| *minutes)
            .map(|(_, display)| display)
            .unwrap_or_else(|| "never".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn temp_cache(name: &str) -> CacheManager {
        let dir = std::env::temp_dir().join(format!("oscavark-cache-{}-{}", name, std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        CacheManager::new(dir).expect("cache dir")
    }

    #[test]
    fn test_cached_data_age_display() {
        let mut cached = CachedData::new(vec![1, 2, 3]);
        assert_eq!(cached.age_display(), "just now");

        cached.cached_at = Utc::now() - Duration::minutes(5);
        assert_eq!(cached.age_display(), "5m ago");

        cached.cached_at = Utc::now() - Duration::minutes(95);
        assert_eq!(cached.age_display(), "2h ago");

        cached.cached_at = Utc::now() - Duration::hours(30);
        assert_eq!(cached.age_display(), "1d ago");

        cached.cached_at = Utc::now() + Duration::minutes(10);
        assert_eq!(cached.age_display(), "just now");
    }

    #[test]
    fn test_cached_data_is_stale() {
        let fresh = CachedData::new(vec![1]);
        assert!(!fresh.is_stale());

        let mut old = CachedData::new(vec![1]);
        old.cached_at = Utc::now() - Duration::minutes(61);
        assert!(old.is_stale());
    }

    #[test]
    fn test_stats_snapshot_and_clear() {
        let cache = temp_cache("stats");
        assert_eq!(cache.last_updated(), "never");
        assert!(cache.load_teacher_stats().expect("load").is_none());

        let stats = TeacherDashboardStats {
            total_classes: 2,
            ..Default::default()
        };
        cache.save_teacher_stats(&stats).expect("save");
        let loaded = cache.load_teacher_stats().expect("load").expect("cached");
        assert_eq!(loaded.data.total_classes, 2);
        assert_eq!(cache.last_updated(), "just now");

        cache.clear().expect("clear");
        assert!(cache.load_teacher_stats().expect("load").is_none());
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let cache = temp_cache("corrupt");
        std::fs::write(cache.cache_path("modules"), "{not json").expect("write");
        assert!(cache.load_modules().is_err());
        assert_eq!(cache.last_updated(), "never");
    }
}
