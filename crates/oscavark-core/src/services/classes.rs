//! Classes, enrollments and join codes.

use anyhow::{Context, Result};
use rand::Rng;
use serde::Serialize;
use tracing::{info, warn};

use crate::api::{ApiError, Query, SupabaseClient};
use crate::models::{Class, ClassStudent, Profile};
use crate::validation::ClassForm;

const CLASSES_TABLE: &str = "classes";
const ENROLLMENTS_TABLE: &str = "class_students";
const PROFILES_TABLE: &str = "profiles";

pub const CLASS_CODE_LENGTH: usize = 6;

/// Letters and digits that cannot be misread (no 0/O or 1/I/L).
const CLASS_CODE_ALPHABET: &[u8] = b"ABCDEFGHJKMNPQRSTUVWXYZ23456789";

/// Attempts before giving up on finding an unused class code.
const MAX_CODE_ATTEMPTS: u32 = 3;

pub fn generate_class_code<R: Rng + ?Sized>(rng: &mut R) -> String {
    (0..CLASS_CODE_LENGTH)
        .map(|_| CLASS_CODE_ALPHABET[rng.gen_range(0..CLASS_CODE_ALPHABET.len())] as char)
        .collect()
}

/// Codes are entered by hand; ignore case and surrounding spaces.
pub fn normalize_class_code(input: &str) -> String {
    input
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '-')
        .collect::<String>()
        .to_uppercase()
}

#[derive(Debug, Serialize)]
struct NewEnrollment<'a> {
    class_id: &'a str,
    student_id: &'a str,
}

pub struct ClassesApi {
    client: SupabaseClient,
}

impl ClassesApi {
    pub fn new(client: SupabaseClient) -> Self {
        Self { client }
    }

    pub async fn for_teacher(&self, teacher_id: &str) -> Result<Vec<Class>> {
        let query = Query::table(CLASSES_TABLE)
            .select("*")
            .eq("teacher_id", teacher_id)
            .order("name", true);
        self.client.select(&query).await
    }

    /// Classes the student is enrolled in.
    pub async fn for_student(&self, student_id: &str) -> Result<Vec<Class>> {
        let enrollments: Vec<ClassStudent> = self
            .client
            .select(&Query::table(ENROLLMENTS_TABLE).select("*").eq("student_id", student_id))
            .await?;
        if enrollments.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<&str> = enrollments.iter().map(|e| e.class_id.as_str()).collect();
        let query = Query::table(CLASSES_TABLE)
            .select("*")
            .in_list("id", &ids)
            .order("name", true);
        self.client.select(&query).await
    }

    /// Create a class owned by `teacher_id` with a fresh join code.
    pub async fn create(&self, form: &ClassForm, teacher_id: &str) -> Result<Class> {
        let mut payload = form.to_payload()?;
        payload.teacher_id = Some(teacher_id.to_string());

        let mut attempt = 0;
        loop {
            attempt += 1;
            payload.class_code = Some(generate_class_code(&mut rand::thread_rng()));
            match self.client.insert::<Class, _>(CLASSES_TABLE, &payload).await {
                Ok(class) => {
                    info!(id = %class.id, code = ?class.class_code, "Created class");
                    return Ok(class);
                }
                Err(e) if attempt < MAX_CODE_ATTEMPTS && is_conflict(&e) => {
                    warn!(attempt, "Class code already taken, generating another");
                }
                Err(e) => return Err(e.context("Failed to create class")),
            }
        }
    }

    pub async fn delete(&self, id: &str) -> Result<()> {
        self.client
            .delete(&Query::table(CLASSES_TABLE).eq("id", id))
            .await?;
        info!(id, "Deleted class");
        Ok(())
    }

    /// Profiles of the students enrolled in a class.
    pub async fn students(&self, class_id: &str) -> Result<Vec<Profile>> {
        let enrollments: Vec<ClassStudent> = self
            .client
            .select(&Query::table(ENROLLMENTS_TABLE).select("*").eq("class_id", class_id))
            .await?;
        if enrollments.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<&str> = enrollments.iter().map(|e| e.student_id.as_str()).collect();
        let query = Query::table(PROFILES_TABLE)
            .select("*")
            .in_list("id", &ids)
            .order("last_name", true);
        self.client.select(&query).await
    }

    /// Enroll a student using a class code. Joining twice is not an error.
    pub async fn join_by_code(&self, code: &str, student_id: &str) -> Result<Class> {
        let code = normalize_class_code(code);
        if code.len() != CLASS_CODE_LENGTH {
            return Err(ApiError::BadRequest(format!(
                "Class codes are {} characters long",
                CLASS_CODE_LENGTH
            ))
            .into());
        }

        let class: Class = self
            .client
            .select_one(&Query::table(CLASSES_TABLE).select("*").eq("class_code", &code))
            .await?
            .ok_or_else(|| ApiError::NotFound(format!("No class with code {}", code)))?;

        let enrollment = NewEnrollment {
            class_id: &class.id,
            student_id,
        };
        match self
            .client
            .insert::<ClassStudent, _>(ENROLLMENTS_TABLE, &enrollment)
            .await
        {
            Ok(_) => info!(class_id = %class.id, student_id, "Joined class"),
            Err(e) if is_conflict(&e) => info!(class_id = %class.id, student_id, "Already enrolled"),
            Err(e) => return Err(e).context("Failed to join class"),
        }
        Ok(class)
    }
}

fn is_conflict(err: &anyhow::Error) -> bool {
    matches!(err.downcast_ref::<ApiError>(), Some(ApiError::Conflict(_)))
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;

    #[test]
    fn test_generated_codes_use_unambiguous_alphabet() {
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..200 {
            let code = generate_class_code(&mut rng);
            assert_eq!(code.len(), CLASS_CODE_LENGTH);
            assert!(code.bytes().all(|b| CLASS_CODE_ALPHABET.contains(&b)));
            assert!(!code.contains('O') && !code.contains('0') && !code.contains('I'));
        }
    }

    #[test]
    fn test_codes_vary() {
        let mut rng = StdRng::seed_from_u64(7);
        let first = generate_class_code(&mut rng);
        let second = generate_class_code(&mut rng);
        assert_ne!(first, second);
    }

    #[test]
    fn test_normalize_class_code() {
        assert_eq!(normalize_class_code(" ab3-k9z "), "AB3K9Z");
        assert_eq!(normalize_class_code("XYZ 234"), "XYZ234");
    }

    #[test]
    fn test_conflict_detection() {
        let dup = anyhow::Error::from(ApiError::Conflict("duplicate key".into()));
        assert!(is_conflict(&dup));
        assert!(is_conflict(&dup.context("Failed to join class")));
        assert!(!is_conflict(&anyhow::anyhow!("other")));
    }
}
