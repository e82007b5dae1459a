use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A row of `classes`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Class {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub grade_level: Option<String>,
    #[serde(default)]
    pub class_code: Option<String>,
    pub teacher_id: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct NewClass {
    pub name: String,
    pub subject: String,
    pub grade_level: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub class_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub teacher_id: Option<String>,
}

/// A row of `class_students` (enrollment join table).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClassStudent {
    pub class_id: String,
    pub student_id: String,
    #[serde(default)]
    pub joined_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubmissionStatus {
    Submitted,
    Graded,
    Returned,
    #[serde(other)]
    Unknown,
}

/// A row of `submissions`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Submission {
    pub id: String,
    pub student_id: String,
    #[serde(default)]
    pub module_id: Option<String>,
    #[serde(default)]
    pub class_id: Option<String>,
    pub status: SubmissionStatus,
    #[serde(default)]
    pub score: Option<f64>,
    #[serde(default)]
    pub submitted_at: Option<DateTime<Utc>>,
}

/// A row of `quiz_results`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QuizResult {
    pub id: String,
    pub student_id: String,
    pub module_id: String,
    pub score: f64,
    pub max_score: f64,
    #[serde(default)]
    pub passed: Option<bool>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
}

impl QuizResult {
    /// Score as a percentage of the maximum; `None` for a zero maximum.
    pub fn percentage(&self) -> Option<f64> {
        if self.max_score > 0.0 {
            Some(self.score / self.max_score * 100.0)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quiz_percentage() {
        let json = r#"{"id": "q", "student_id": "s", "module_id": "m", "score": 8, "max_score": 10}"#;
        let result: QuizResult = serde_json::from_str(json).expect("parse");
        assert_eq!(result.percentage(), Some(80.0));

        let zero = QuizResult {
            max_score: 0.0,
            ..result
        };
        assert_eq!(zero.percentage(), None);
    }

    #[test]
    fn test_submission_status_fallback() {
        let json = r#"{"id": "1", "student_id": "s", "status": "late"}"#;
        let submission: Submission = serde_json::from_str(json).expect("parse");
        assert_eq!(submission.status, SubmissionStatus::Unknown);
    }
}
