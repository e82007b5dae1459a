use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::lenient;

/// VARK learning style used to tag modules and student profiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LearningStyle {
    Visual,
    Auditory,
    ReadingWriting,
    Kinesthetic,
}

impl LearningStyle {
    pub const ALL: [LearningStyle; 4] = [
        LearningStyle::Visual,
        LearningStyle::Auditory,
        LearningStyle::ReadingWriting,
        LearningStyle::Kinesthetic,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LearningStyle::Visual => "visual",
            LearningStyle::Auditory => "auditory",
            LearningStyle::ReadingWriting => "reading_writing",
            LearningStyle::Kinesthetic => "kinesthetic",
        }
    }

    /// Single-letter VARK code.
    pub fn code(&self) -> char {
        match self {
            LearningStyle::Visual => 'V',
            LearningStyle::Auditory => 'A',
            LearningStyle::ReadingWriting => 'R',
            LearningStyle::Kinesthetic => 'K',
        }
    }

    /// Accepts the stored value, the display label or the VARK letter.
    pub fn parse(input: &str) -> Option<Self> {
        let normalized = input.trim().to_lowercase().replace(['-', '/', ' '], "_");
        match normalized.as_str() {
            "visual" | "v" => Some(LearningStyle::Visual),
            "auditory" | "a" => Some(LearningStyle::Auditory),
            "reading_writing" | "reading_and_writing" | "reading" | "r" => {
                Some(LearningStyle::ReadingWriting)
            }
            "kinesthetic" | "k" => Some(LearningStyle::Kinesthetic),
            _ => None,
        }
    }

    /// Cycle through `None -> Visual -> ... -> Kinesthetic -> None` for filters.
    pub fn cycle(current: Option<Self>) -> Option<Self> {
        match current {
            None => Some(LearningStyle::Visual),
            Some(LearningStyle::Visual) => Some(LearningStyle::Auditory),
            Some(LearningStyle::Auditory) => Some(LearningStyle::ReadingWriting),
            Some(LearningStyle::ReadingWriting) => Some(LearningStyle::Kinesthetic),
            Some(LearningStyle::Kinesthetic) => None,
        }
    }
}

impl std::fmt::Display for LearningStyle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LearningStyle::Visual => write!(f, "Visual"),
            LearningStyle::Auditory => write!(f, "Auditory"),
            LearningStyle::ReadingWriting => write!(f, "Reading/Writing"),
            LearningStyle::Kinesthetic => write!(f, "Kinesthetic"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DifficultyLevel {
    Beginner,
    Intermediate,
    Advanced,
}

impl DifficultyLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            DifficultyLevel::Beginner => "beginner",
            DifficultyLevel::Intermediate => "intermediate",
            DifficultyLevel::Advanced => "advanced",
        }
    }

    pub fn parse(input: &str) -> Option<Self> {
        match input.trim().to_lowercase().as_str() {
            "beginner" | "easy" => Some(DifficultyLevel::Beginner),
            "intermediate" | "medium" => Some(DifficultyLevel::Intermediate),
            "advanced" | "hard" => Some(DifficultyLevel::Advanced),
            _ => None,
        }
    }
}

impl std::fmt::Display for DifficultyLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DifficultyLevel::Beginner => write!(f, "Beginner"),
            DifficultyLevel::Intermediate => write!(f, "Intermediate"),
            DifficultyLevel::Advanced => write!(f, "Advanced"),
        }
    }
}

/// A row of `vark_modules`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VarkModule {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub grade_level: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub learning_style: Option<LearningStyle>,
    #[serde(default, deserialize_with = "lenient")]
    pub difficulty_level: Option<DifficultyLevel>,
    #[serde(default)]
    pub estimated_duration_minutes: Option<i32>,
    #[serde(default)]
    pub class_id: Option<String>,
    #[serde(default)]
    pub is_published: bool,
    #[serde(default)]
    pub created_by: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Insert/update payload for `vark_modules`.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct NewVarkModule {
    pub title: String,
    pub description: Option<String>,
    pub subject: String,
    pub grade_level: Option<String>,
    pub learning_style: LearningStyle,
    pub difficulty_level: DifficultyLevel,
    pub estimated_duration_minutes: Option<i32>,
    pub class_id: Option<String>,
    pub is_published: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressStatus {
    NotStarted,
    InProgress,
    Completed,
    #[serde(other)]
    Unknown,
}

impl ProgressStatus {
    /// Status implied by a completion percentage.
    pub fn from_percentage(percentage: f64) -> Self {
        if percentage >= 100.0 {
            ProgressStatus::Completed
        } else if percentage > 0.0 {
            ProgressStatus::InProgress
        } else {
            ProgressStatus::NotStarted
        }
    }
}

impl std::fmt::Display for ProgressStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProgressStatus::NotStarted => write!(f, "Not started"),
            ProgressStatus::InProgress => write!(f, "In progress"),
            ProgressStatus::Completed => write!(f, "Completed"),
            ProgressStatus::Unknown => write!(f, "Unknown"),
        }
    }
}

/// A row of `vark_module_progress`, one per (student, module).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModuleProgress {
    #[serde(default)]
    pub id: Option<String>,
    pub student_id: String,
    pub module_id: String,
    #[serde(default = "default_progress_status")]
    pub status: ProgressStatus,
    #[serde(default)]
    pub progress_percentage: f64,
    #[serde(default)]
    pub time_spent_minutes: i64,
    #[serde(default)]
    pub last_accessed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
}

fn default_progress_status() -> ProgressStatus {
    ProgressStatus::NotStarted
}

/// Upsert payload for `vark_module_progress`.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ProgressUpdate {
    pub student_id: String,
    pub module_id: String,
    pub status: ProgressStatus,
    pub progress_percentage: f64,
    pub time_spent_minutes: i64,
    pub last_accessed_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl ProgressUpdate {
    /// Build an update stamped at `now`. The percentage is clamped to 0-100
    /// and `completed_at` is set only on completion.
    pub fn new(
        student_id: &str,
        module_id: &str,
        percentage: f64,
        time_spent_minutes: i64,
        now: DateTime<Utc>,
    ) -> Self {
        let percentage = if percentage.is_finite() {
            percentage.clamp(0.0, 100.0)
        } else {
            0.0
        };
        let status = ProgressStatus::from_percentage(percentage);
        Self {
            student_id: student_id.to_string(),
            module_id: module_id.to_string(),
            status,
            progress_percentage: percentage,
            time_spent_minutes: time_spent_minutes.max(0),
            last_accessed_at: now,
            completed_at: (status == ProgressStatus::Completed).then_some(now),
        }
    }
}
