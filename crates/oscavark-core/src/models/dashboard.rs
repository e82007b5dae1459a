//! Dashboard statistics.
//!
//! Each stats type is computed from the rows and counts fetched by the
//! dashboard APIs. `Default` is the zero state shown when nothing could be loaded.

use std::collections::{HashMap, HashSet};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::classroom::{Class, ClassStudent, QuizResult};
use super::profile::Profile;
use super::senior::RegistrationRow;
use super::vark::{LearningStyle, ModuleProgress, ProgressStatus, VarkModule};

/// Number of recent progress rows shown on the student dashboard.
pub const RECENT_PROGRESS_LIMIT: usize = 5;

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, count) = values.fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StudentDashboardStats {
    pub total_modules: u64,
    pub completed_modules: u64,
    pub in_progress_modules: u64,
    pub average_score: f64,
    pub total_time_spent_minutes: i64,
    pub learning_style: Option<LearningStyle>,
    pub recent_progress: Vec<ModuleProgress>,
}

impl StudentDashboardStats {
    pub fn from_rows(
        profile: Option<&Profile>,
        published_modules: u64,
        progress: &[ModuleProgress],
        quiz_results: &[QuizResult],
    ) -> Self {
        let completed = progress
            .iter()
            .filter(|p| p.status == ProgressStatus::Completed)
            .count() as u64;
        let in_progress = progress
            .iter()
            .filter(|p| p.status == ProgressStatus::InProgress)
            .count() as u64;

        let mut recent: Vec<ModuleProgress> = progress.to_vec();
        // Most recent first; rows never accessed sink to the bottom
        recent.sort_by(|a, b| b.last_accessed_at.cmp(&a.last_accessed_at));
        recent.truncate(RECENT_PROGRESS_LIMIT);

        Self {
            total_modules: published_modules,
            completed_modules: completed,
            in_progress_modules: in_progress,
            average_score: mean(quiz_results.iter().filter_map(QuizResult::percentage)),
            total_time_spent_minutes: progress.iter().map(|p| p.time_spent_minutes).sum(),
            learning_style: profile.and_then(|p| p.learning_style),
            recent_progress: recent,
        }
    }

    /// Completed modules as a percentage of the published catalog.
    pub fn completion_rate(&self) -> f64 {
        if self.total_modules == 0 {
            0.0
        } else {
            (self.completed_modules as f64 / self.total_modules as f64 * 100.0).min(100.0)
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TeacherDashboardStats {
    pub total_classes: u64,
    pub total_students: u64,
    pub total_modules: u64,
    pub published_modules: u64,
    pub pending_submissions: u64,
    pub average_student_score: f64,
    pub modules_by_style: Vec<(LearningStyle, u64)>,
}

impl TeacherDashboardStats {
    pub fn from_rows(
        classes: &[Class],
        enrollments: &[ClassStudent],
        modules: &[VarkModule],
        pending_submissions: u64,
        quiz_results: &[QuizResult],
    ) -> Self {
        let class_ids: HashSet<&str> = classes.iter().map(|c| c.id.as_str()).collect();
        let students: HashSet<&str> = enrollments
            .iter()
            .filter(|e| class_ids.contains(e.class_id.as_str()))
            .map(|e| e.student_id.as_str())
            .collect();

        let module_ids: HashSet<&str> = modules.iter().map(|m| m.id.as_str()).collect();
        let average = mean(
            quiz_results
                .iter()
                .filter(|q| module_ids.contains(q.module_id.as_str()))
                .filter_map(QuizResult::percentage),
        );

        let modules_by_style = LearningStyle::ALL
            .iter()
            .map(|style| {
                let count = modules
                    .iter()
                    .filter(|m| m.learning_style == Some(*style))
                    .count() as u64;
                (*style, count)
            })
            .collect();

        Self {
            total_classes: classes.len() as u64,
            total_students: students.len() as u64,
            total_modules: modules.len() as u64,
            published_modules: modules.iter().filter(|m| m.is_published).count() as u64,
            pending_submissions,
            average_student_score: average,
            modules_by_style,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BarangayCount {
    pub barangay: String,
    pub count: u64,
}

/// OSCA (all barangays) or BASCA (one barangay) registry statistics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SeniorAffairsStats {
    pub barangay: Option<String>,
    pub total_seniors: u64,
    pub active: u64,
    pub inactive: u64,
    pub deceased: u64,
    pub registered_this_month: u64,
    pub total_beneficiaries: u64,
    pub by_barangay: Vec<BarangayCount>,
}

/// Exact row counts for one registry scope, taken server-side so they are
/// not limited by the response row cap.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RegistryCounts {
    pub total: u64,
    pub active: u64,
    pub inactive: u64,
    pub deceased: u64,
    pub beneficiaries: u64,
}

impl SeniorAffairsStats {
    pub fn from_counts(
        barangay: Option<&str>,
        counts: RegistryCounts,
        registrations: &[RegistrationRow],
        today: NaiveDate,
    ) -> Self {
        let mut per_barangay: HashMap<&str, u64> = HashMap::new();
        for row in registrations {
            let name = row.barangay.trim();
            let key = if name.is_empty() { "Unassigned" } else { name };
            *per_barangay.entry(key).or_default() += 1;
        }
        let mut by_barangay: Vec<BarangayCount> = per_barangay
            .into_iter()
            .map(|(barangay, count)| BarangayCount {
                barangay: barangay.to_string(),
                count,
            })
            .collect();
        by_barangay.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.barangay.cmp(&b.barangay)));

        Self {
            barangay: barangay.map(str::to_string),
            total_seniors: counts.total,
            active: counts.active,
            inactive: counts.inactive,
            deceased: counts.deceased,
            registered_this_month: registrations
                .iter()
                .filter(|r| r.registered_in_month_of(today))
                .count() as u64,
            total_beneficiaries: counts.beneficiaries,
            by_barangay,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn progress(module: &str, status: ProgressStatus, minutes: i64, hours_ago: Option<i64>) -> ModuleProgress {
        ModuleProgress {
            id: None,
            student_id: "s1".to_string(),
            module_id: module.to_string(),
            status,
            progress_percentage: 0.0,
            time_spent_minutes: minutes,
            last_accessed_at: hours_ago.map(|h| Utc::now() - Duration::hours(h)),
            completed_at: None,
        }
    }

    fn quiz(module: &str, score: f64, max: f64) -> QuizResult {
        QuizResult {
            id: format!("q-{}-{}", module, score),
            student_id: "s1".to_string(),
            module_id: module.to_string(),
            score,
            max_score: max,
            passed: None,
            completed_at: None,
        }
    }

    fn module(id: &str, style: Option<LearningStyle>, published: bool) -> VarkModule {
        VarkModule {
            id: id.to_string(),
            title: id.to_string(),
            description: None,
            subject: "Science".to_string(),
            grade_level: None,
            learning_style: style,
            difficulty_level: None,
            estimated_duration_minutes: None,
            class_id: None,
            is_published: published,
            created_by: Some("t1".to_string()),
            created_at: None,
            updated_at: None,
        }
    }

    fn registration(barangay: &str, registered: Option<NaiveDate>) -> RegistrationRow {
        RegistrationRow {
            barangay: barangay.to_string(),
            registration_date: registered,
            created_at: None,
        }
    }

    #[test]
    fn test_student_zero_state() {
        let stats = StudentDashboardStats::from_rows(None, 0, &[], &[]);
        assert_eq!(stats, StudentDashboardStats::default());
        assert_eq!(stats.completion_rate(), 0.0);
    }

    #[test]
    fn test_student_aggregates() {
        let rows = vec![
            progress("m1", ProgressStatus::Completed, 30, Some(48)),
            progress("m2", ProgressStatus::InProgress, 15, Some(1)),
            progress("m3", ProgressStatus::NotStarted, 0, None),
        ];
        let quizzes = vec![quiz("m1", 9.0, 10.0), quiz("m2", 7.0, 10.0), quiz("m3", 1.0, 0.0)];
        let stats = StudentDashboardStats::from_rows(None, 4, &rows, &quizzes);

        assert_eq!(stats.total_modules, 4);
        assert_eq!(stats.completed_modules, 1);
        assert_eq!(stats.in_progress_modules, 1);
        assert!((stats.average_score - 80.0).abs() < 1e-9);
        assert_eq!(stats.total_time_spent_minutes, 45);
        assert_eq!(stats.completion_rate(), 25.0);
        let order: Vec<&str> = stats.recent_progress.iter().map(|p| p.module_id.as_str()).collect();
        assert_eq!(order, vec!["m2", "m1", "m3"]);
    }

    #[test]
    fn test_student_recent_is_capped() {
        let rows: Vec<ModuleProgress> = (0..8)
            .map(|i| progress(&format!("m{}", i), ProgressStatus::InProgress, 1, Some(i)))
            .collect();
        let stats = StudentDashboardStats::from_rows(None, 8, &rows, &[]);
        assert_eq!(stats.recent_progress.len(), RECENT_PROGRESS_LIMIT);
        assert_eq!(stats.recent_progress[0].module_id, "m0");
    }

    #[test]
    fn test_teacher_aggregates() {
        let classes: Vec<Class> = serde_json::from_str(
            r#"[{"id": "c1", "name": "5-Rizal", "teacher_id": "t1"},
                {"id": "c2", "name": "5-Mabini", "teacher_id": "t1"}]"#,
        )
        .unwrap();
        let enrollments: Vec<ClassStudent> = serde_json::from_str(
            r#"[{"class_id": "c1", "student_id": "s1"},
                {"class_id": "c2", "student_id": "s1"},
                {"class_id": "c2", "student_id": "s2"},
                {"class_id": "other", "student_id": "s9"}]"#,
        )
        .unwrap();
        let modules = vec![
            module("m1", Some(LearningStyle::Visual), true),
            module("m2", Some(LearningStyle::Visual), false),
            module("m3", Some(LearningStyle::Kinesthetic), true),
        ];
        let quizzes = vec![quiz("m1", 5.0, 10.0), quiz("m3", 10.0, 10.0), quiz("elsewhere", 0.0, 10.0)];

        let stats = TeacherDashboardStats::from_rows(&classes, &enrollments, &modules, 3, &quizzes);
        assert_eq!(stats.total_classes, 2);
        assert_eq!(stats.total_students, 2);
        assert_eq!(stats.total_modules, 3);
        assert_eq!(stats.published_modules, 2);
        assert_eq!(stats.pending_submissions, 3);
        assert!((stats.average_student_score - 75.0).abs() < 1e-9);
        assert_eq!(stats.modules_by_style[0], (LearningStyle::Visual, 2));
        assert_eq!(stats.modules_by_style[3], (LearningStyle::Kinesthetic, 1));
    }

    #[test]
    fn test_teacher_zero_state() {
        let stats = TeacherDashboardStats::from_rows(&[], &[], &[], 0, &[]);
        assert_eq!(stats.total_students, 0);
        assert_eq!(stats.average_student_score, 0.0);
        assert!(stats.modules_by_style.iter().all(|(_, c)| *c == 0));
    }

    #[test]
    fn test_senior_affairs_aggregates() {
        let today = NaiveDate::from_ymd_opt(2024, 6, 20).unwrap();
        let rows = vec![
            registration("San Isidro", NaiveDate::from_ymd_opt(2024, 6, 3)),
            registration("San Isidro", NaiveDate::from_ymd_opt(2023, 6, 3)),
            registration("Poblacion", None),
            registration("Bagong Silang", NaiveDate::from_ymd_opt(2024, 6, 1)),
            registration("", None),
        ];
        let counts = RegistryCounts {
            total: 5,
            active: 3,
            inactive: 1,
            deceased: 1,
            beneficiaries: 7,
        };
        let stats = SeniorAffairsStats::from_counts(None, counts, &rows, today);
        assert_eq!(stats.total_seniors, 5);
        assert_eq!(stats.active, 3);
        assert_eq!(stats.inactive, 1);
        assert_eq!(stats.deceased, 1);
        assert_eq!(stats.registered_this_month, 2);
        assert_eq!(stats.total_beneficiaries, 7);
        assert_eq!(stats.by_barangay[0].barangay, "San Isidro");
        assert_eq!(stats.by_barangay[0].count, 2);
        // Ties sort by name
        let rest: Vec<&str> = stats.by_barangay[1..].iter().map(|b| b.barangay.as_str()).collect();
        assert_eq!(rest, vec!["Bagong Silang", "Poblacion", "Unassigned"]);
    }

    #[test]
    fn test_senior_affairs_totals_come_from_counts() {
        // A registry larger than one response page keeps its exact totals
        let today = NaiveDate::from_ymd_opt(2024, 6, 20).unwrap();
        let counts = RegistryCounts {
            total: 2_450,
            active: 2_100,
            inactive: 200,
            deceased: 150,
            beneficiaries: 3_020,
        };
        let rows = vec![registration("Poblacion", None)];
        let stats = SeniorAffairsStats::from_counts(Some("Poblacion"), counts, &rows, today);
        assert_eq!(stats.total_seniors, 2_450);
        assert_eq!(stats.active, 2_100);
        assert_eq!(stats.total_beneficiaries, 3_020);
        assert_eq!(stats.by_barangay.len(), 1);
    }

    #[test]
    fn test_senior_affairs_zero_state() {
        let today = NaiveDate::from_ymd_opt(2024, 6, 20).unwrap();
        let stats = SeniorAffairsStats::from_counts(Some("Poblacion"), RegistryCounts::default(), &[], today);
        assert_eq!(stats.barangay.as_deref(), Some("Poblacion"));
        assert_eq!(stats.total_seniors, 0);
        assert!(stats.by_barangay.is_empty());
    }
}
