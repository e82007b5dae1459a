use thiserror::Error;

use super::Role;
use crate::api::ApiError;
use crate::validation::ValidationErrors;

/// Login and registration outcomes shown to the user.
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("{0}")]
    Validation(ValidationErrors),

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Please confirm your email address before signing in")]
    EmailNotConfirmed,

    #[error("{}", mismatch_message(.requested, .actual))]
    RoleMismatch {
        requested: Role,
        actual: Option<Role>,
    },

    #[error("No profile found for this account. Please contact an administrator.")]
    ProfileMissing,

    #[error("An account with this email already exists")]
    AlreadyRegistered,

    #[error("Login timed out. Please try again.")]
    Timeout,

    #[error("Unable to connect to server. Check your internet connection.")]
    Network,

    #[error("{0}")]
    Service(String),
}

fn mismatch_message(requested: &Role, actual: &Option<Role>) -> String {
    match actual {
        Some(actual) => format!(
            "Access denied. This account is registered as {}, not {}.",
            actual, requested
        ),
        None => format!(
            "Access denied. This account is not registered as {}.",
            requested
        ),
    }
}

impl AuthError {
    /// Classify a failed password grant.
    pub fn from_sign_in(err: anyhow::Error) -> Self {
        match err.downcast_ref::<ApiError>() {
            Some(ApiError::BadRequest(m)) | Some(ApiError::AccessDenied(m))
                if m.to_lowercase().contains("confirm") =>
            {
                AuthError::EmailNotConfirmed
            }
            Some(ApiError::BadRequest(_)) | Some(ApiError::Unauthorized) => {
                AuthError::InvalidCredentials
            }
            _ => Self::from_service(err),
        }
    }

    /// Classify a failed signup.
    pub fn from_sign_up(err: anyhow::Error) -> Self {
        match err.downcast_ref::<ApiError>() {
            Some(ApiError::Conflict(_)) => AuthError::AlreadyRegistered,
            Some(ApiError::BadRequest(m)) if m.to_lowercase().contains("already") => {
                AuthError::AlreadyRegistered
            }
            _ => Self::from_service(err),
        }
    }

    /// Classify any other backend failure.
    pub fn from_service(err: anyhow::Error) -> Self {
        match err.downcast_ref::<ApiError>() {
            Some(ApiError::NetworkError(e)) if e.is_timeout() => AuthError::Timeout,
            Some(ApiError::NetworkError(_)) => AuthError::Network,
            Some(ApiError::RateLimited) => {
                AuthError::Service("Too many attempts. Please wait a moment and try again.".to_string())
            }
            Some(api) => AuthError::Service(api.user_message()),
            None => AuthError::Service(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mismatch_messages() {
        let err = AuthError::RoleMismatch {
            requested: Role::Osca,
            actual: Some(Role::Senior),
        };
        assert_eq!(
            err.to_string(),
            "Access denied. This account is registered as Senior Citizen, not OSCA Administrator."
        );
        let err = AuthError::RoleMismatch {
            requested: Role::Teacher,
            actual: None,
        };
        assert_eq!(
            err.to_string(),
            "Access denied. This account is not registered as Teacher."
        );
    }

    #[test]
    fn test_classify_sign_in_errors() {
        let invalid = anyhow::Error::from(ApiError::BadRequest("Invalid login credentials".into()));
        assert!(matches!(AuthError::from_sign_in(invalid), AuthError::InvalidCredentials));

        let unconfirmed = anyhow::Error::from(ApiError::BadRequest("Email not confirmed".into()));
        assert!(matches!(AuthError::from_sign_in(unconfirmed), AuthError::EmailNotConfirmed));

        let wrapped = anyhow::Error::from(ApiError::Unauthorized).context("Failed to send request");
        assert!(matches!(AuthError::from_sign_in(wrapped), AuthError::InvalidCredentials));

        let server = anyhow::Error::from(ApiError::ServerError("boom".into()));
        assert!(matches!(AuthError::from_sign_in(server), AuthError::Service(ref m) if m == "boom"));
    }

    #[test]
    fn test_classify_sign_up_errors() {
        let dup = anyhow::Error::from(ApiError::BadRequest("User already registered".into()));
        assert!(matches!(AuthError::from_sign_up(dup), AuthError::AlreadyRegistered));

        let other = anyhow::anyhow!("disk full");
        assert!(matches!(AuthError::from_sign_up(other), AuthError::Service(ref m) if m == "disk full"));
    }
}
