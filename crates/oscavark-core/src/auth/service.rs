//! Login, registration and session restore.
//!
//! `AuthApi` layers the portal rules on top of a raw account backend: a
//! login only succeeds when the account has a profile whose role matches
//! the portal the user picked. Any other outcome signs the fresh session
//! out again so no half-authenticated state survives.

use std::future::Future;
use std::time::Duration;

use anyhow::Result;
use tracing::{debug, info, warn};

use super::error::AuthError;
use super::role::Role;
use super::session::{Session, SessionData};
use crate::api::{Query, SignUpOutcome, SupabaseClient};
use crate::models::{NewProfile, Profile};
use crate::validation::{LoginForm, RegisterForm, Validate};

/// Upper bound on the whole login exchange.
pub const LOGIN_TIMEOUT: Duration = Duration::from_secs(10);

const PROFILES_TABLE: &str = "profiles";

/// Account operations the auth flow depends on.
pub trait AuthBackend {
    fn sign_in(&self, email: &str, password: &str) -> impl Future<Output = Result<SessionData>> + Send;

    fn sign_up(
        &self,
        email: &str,
        password: &str,
        metadata: &serde_json::Value,
    ) -> impl Future<Output = Result<SignUpOutcome>> + Send;

    fn sign_out(&self, access_token: &str) -> impl Future<Output = Result<()>> + Send;

    fn refresh(&self, refresh_token: &str) -> impl Future<Output = Result<SessionData>> + Send;

    fn fetch_profile(
        &self,
        access_token: &str,
        user_id: &str,
    ) -> impl Future<Output = Result<Option<Profile>>> + Send;

    fn save_profile(
        &self,
        access_token: &str,
        profile: &NewProfile,
    ) -> impl Future<Output = Result<Profile>> + Send;
}

impl AuthBackend for SupabaseClient {
    async fn sign_in(&self, email: &str, password: &str) -> Result<SessionData> {
        self.sign_in_with_password(email, password).await
    }

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        metadata: &serde_json::Value,
    ) -> Result<SignUpOutcome> {
        SupabaseClient::sign_up(self, email, password, metadata).await
    }

    async fn sign_out(&self, access_token: &str) -> Result<()> {
        let client = self.with_token(access_token.to_string());
        SupabaseClient::sign_out(&client).await
    }

    async fn refresh(&self, refresh_token: &str) -> Result<SessionData> {
        self.refresh_session(refresh_token).await
    }

    async fn fetch_profile(&self, access_token: &str, user_id: &str) -> Result<Option<Profile>> {
        let client = self.with_token(access_token.to_string());
        let query = Query::table(PROFILES_TABLE).select("*").eq("id", user_id);
        client.select_one(&query).await
    }

    async fn save_profile(&self, access_token: &str, profile: &NewProfile) -> Result<Profile> {
        let client = self.with_token(access_token.to_string());
        let query = Query::table(PROFILES_TABLE).on_conflict("id");
        client.upsert(&query, profile).await
    }
}

/// A signed-in user whose role has been checked against their profile.
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub session: SessionData,
    pub profile: Profile,
    pub role: Role,
}

impl AuthContext {
    pub fn user_id(&self) -> &str {
        &self.session.user_id
    }

    pub fn display_name(&self) -> String {
        self.profile.full_name()
    }

    /// Barangay a BASCA officer or senior is attached to.
    pub fn barangay(&self) -> Option<&str> {
        self.profile
            .barangay
            .as_deref()
            .map(str::trim)
            .filter(|b| !b.is_empty())
    }
}

#[derive(Debug, Clone)]
pub enum RegisterOutcome {
    SignedIn(AuthContext),
    /// The account exists but the user must confirm their email first.
    ConfirmationRequired { email: String },
}

/// Check that `profile` may enter the portal for `requested`.
pub fn check_role(requested: Role, profile: Option<&Profile>) -> Result<Role, AuthError> {
    let profile = profile.ok_or(AuthError::ProfileMissing)?;
    match profile.role {
        Some(actual) if actual == requested => Ok(actual),
        actual => Err(AuthError::RoleMismatch { requested, actual }),
    }
}

pub struct AuthApi<B = SupabaseClient> {
    backend: B,
    login_timeout: Duration,
}

impl<B: AuthBackend> AuthApi<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            login_timeout: LOGIN_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.login_timeout = timeout;
        self
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Sign in to the portal chosen on the form.
    pub async fn login(&self, form: &LoginForm) -> Result<AuthContext, AuthError> {
        form.validate().map_err(AuthError::Validation)?;
        let Some(role) = form.role else {
            return Err(AuthError::ProfileMissing);
        };
        let email = form.email.trim().to_lowercase();
        let deadline = tokio::time::Instant::now() + self.login_timeout;

        let sign_in = self.backend.sign_in(&email, &form.password);
        let session = match tokio::time::timeout_at(deadline, sign_in).await {
            Ok(result) => result.map_err(AuthError::from_sign_in)?,
            Err(_) => return Err(self.timed_out(&email)),
        };
        debug!(user_id = %session.user_id, "Password grant accepted");

        // The account is signed in from here on, so running out of time
        // must revoke the session it just got.
        let access_token = session.access_token.clone();
        match tokio::time::timeout_at(deadline, self.enter_portal(session, role)).await {
            Ok(result) => result,
            Err(_) => {
                self.sign_out_quietly(&access_token).await;
                Err(self.timed_out(&email))
            }
        }
    }

    fn timed_out(&self, email: &str) -> AuthError {
        warn!(email = %email, timeout_secs = self.login_timeout.as_secs(), "Login timed out");
        AuthError::Timeout
    }

    /// Check the signed-in account's profile against the requested portal.
    async fn enter_portal(&self, mut session: SessionData, role: Role) -> Result<AuthContext, AuthError> {
        let profile = match self
            .backend
            .fetch_profile(&session.access_token, &session.user_id)
            .await
        {
            Ok(profile) => profile,
            Err(e) => {
                self.sign_out_quietly(&session.access_token).await;
                return Err(AuthError::from_service(e));
            }
        };

        match check_role(role, profile.as_ref()) {
            Ok(role) => {
                session.role = Some(role);
                let profile = profile.ok_or(AuthError::ProfileMissing)?;
                info!(user_id = %session.user_id, role = role.as_str(), "Signed in");
                Ok(AuthContext { session, profile, role })
            }
            Err(e) => {
                warn!(user_id = %session.user_id, requested = role.as_str(), "Portal check failed: {}", e);
                self.sign_out_quietly(&session.access_token).await;
                Err(e)
            }
        }
    }

    /// Create an account and, when a session comes back, its profile row.
    pub async fn register(&self, form: &RegisterForm) -> Result<RegisterOutcome, AuthError> {
        form.validate().map_err(AuthError::Validation)?;
        let email = form.email.trim().to_lowercase();

        let outcome = self
            .backend
            .sign_up(&email, &form.password, &form.metadata())
            .await
            .map_err(AuthError::from_sign_up)?;

        match outcome {
            SignUpOutcome::SignedIn(mut session) => {
                let new_profile = form
                    .to_profile(&session.user_id)
                    .ok_or(AuthError::ProfileMissing)?;
                let role = new_profile.role;
                let profile = self
                    .backend
                    .save_profile(&session.access_token, &new_profile)
                    .await
                    .map_err(AuthError::from_service)?;
                session.role = Some(role);
                info!(user_id = %session.user_id, role = role.as_str(), "Registered");
                Ok(RegisterOutcome::SignedIn(AuthContext { session, profile, role }))
            }
            SignUpOutcome::ConfirmationRequired { user_id } => {
                info!(user_id = %user_id, "Registered, awaiting email confirmation");
                Ok(RegisterOutcome::ConfirmationRequired { email })
            }
        }
    }

    /// Revoke the session server-side (best effort) and forget it locally.
    pub async fn logout(&self, session: &mut Session) -> Result<()> {
        if let Some(token) = session.token().map(str::to_string) {
            self.sign_out_quietly(&token).await;
        }
        session.clear()?;
        info!("Signed out");
        Ok(())
    }

    /// Resume a stored session, refreshing the token when it is close to
    /// expiring. Returns `None` when the user has to sign in again.
    pub async fn restore(&self, session: &mut Session) -> Result<Option<AuthContext>> {
        let Some(mut data) = self.ensure_fresh(session).await? else {
            return Ok(None);
        };

        let profile = self
            .backend
            .fetch_profile(&data.access_token, &data.user_id)
            .await?;

        match profile {
            Some(profile) => match profile.role {
                Some(role) if data.role.is_none() || data.role == Some(role) => {
                    if data.role.is_none() {
                        data.role = Some(role);
                        session.update(data.clone());
                        session.save()?;
                    }
                    Ok(Some(AuthContext { session: data, profile, role }))
                }
                _ => {
                    warn!(user_id = %data.user_id, "Stored session no longer matches profile role");
                    session.clear()?;
                    Ok(None)
                }
            },
            None => {
                session.clear()?;
                Ok(None)
            }
        }
    }

    /// Renew the stored token when it is close to expiring and save the
    /// result. Returns the session to use from now on, or `None` (after
    /// clearing it) once it has expired and cannot be renewed.
    pub async fn ensure_fresh(&self, session: &mut Session) -> Result<Option<SessionData>> {
        let Some(data) = session.data.clone() else {
            return Ok(None);
        };
        if !data.needs_refresh() {
            return Ok(Some(data));
        }
        if !data.can_refresh() {
            session.clear()?;
            return Ok(None);
        }

        match self.backend.refresh(&data.refresh_token).await {
            Ok(mut fresh) => {
                fresh.role = data.role;
                session.update(fresh.clone());
                session.save()?;
                debug!(minutes = fresh.minutes_until_expiry(), "Session refreshed");
                Ok(Some(fresh))
            }
            Err(e) if data.is_expired() => {
                warn!("Session refresh failed: {}", e);
                session.clear()?;
                Ok(None)
            }
            Err(e) => {
                warn!("Session refresh failed, using current token: {}", e);
                Ok(Some(data))
            }
        }
    }

    async fn sign_out_quietly(&self, access_token: &str) {
        if let Err(e) = self.backend.sign_out(access_token).await {
            warn!("Sign out failed: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use chrono::Utc;

    use super::*;
    use crate::api::ApiError;

    fn session_data(minutes: i64) -> SessionData {
        SessionData {
            access_token: "jwt".to_string(),
            refresh_token: "refresh".to_string(),
            user_id: "user-1".to_string(),
            email: "osca@example.ph".to_string(),
            expires_at: Utc::now() + chrono::Duration::minutes(minutes),
            role: None,
        }
    }

    fn profile(role: Option<Role>) -> Profile {
        Profile {
            id: "user-1".to_string(),
            email: Some("osca@example.ph".to_string()),
            first_name: Some("Jose".to_string()),
            last_name: Some("Rizal".to_string()),
            role,
            barangay: Some(" Poblacion ".to_string()),
            learning_style: None,
            created_at: None,
            updated_at: None,
        }
    }

    #[derive(Default)]
    struct FakeBackend {
        accept_password: bool,
        profile: Option<Profile>,
        sign_up_session: bool,
        refresh_ok: bool,
        delay: Option<Duration>,
        profile_delay: Option<Duration>,
        refreshed: Mutex<u32>,
        signed_out: Mutex<Vec<String>>,
        saved: Mutex<Vec<NewProfile>>,
    }

    impl FakeBackend {
        fn sign_out_count(&self) -> usize {
            self.signed_out.lock().unwrap().len()
        }
    }

    impl AuthBackend for FakeBackend {
        async fn sign_in(&self, _email: &str, _password: &str) -> Result<SessionData> {
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            if self.accept_password {
                Ok(session_data(60))
            } else {
                Err(ApiError::BadRequest("Invalid login credentials".into()).into())
            }
        }

        async fn sign_up(&self, _email: &str, _password: &str, _metadata: &serde_json::Value) -> Result<SignUpOutcome> {
            if self.sign_up_session {
                Ok(SignUpOutcome::SignedIn(session_data(60)))
            } else {
                Ok(SignUpOutcome::ConfirmationRequired { user_id: "user-1".into() })
            }
        }

        async fn sign_out(&self, access_token: &str) -> Result<()> {
            self.signed_out.lock().unwrap().push(access_token.to_string());
            Ok(())
        }

        async fn refresh(&self, _refresh_token: &str) -> Result<SessionData> {
            *self.refreshed.lock().unwrap() += 1;
            if self.refresh_ok {
                let mut fresh = session_data(60);
                fresh.access_token = "jwt-2".to_string();
                Ok(fresh)
            } else {
                Err(ApiError::Unauthorized.into())
            }
        }

        async fn fetch_profile(&self, _access_token: &str, _user_id: &str) -> Result<Option<Profile>> {
            if let Some(delay) = self.profile_delay {
                tokio::time::sleep(delay).await;
            }
            Ok(self.profile.clone())
        }

        async fn save_profile(&self, _access_token: &str, new: &NewProfile) -> Result<Profile> {
            self.saved.lock().unwrap().push(new.clone());
            let mut stored = profile(Some(new.role));
            stored.id = new.id.clone();
            Ok(stored)
        }
    }

    fn login_form(role: Role) -> LoginForm {
        LoginForm {
            email: " OSCA@example.ph ".to_string(),
            password: "secret123".to_string(),
            role: Some(role),
        }
    }

    fn temp_session(name: &str) -> Session {
        let dir = std::env::temp_dir().join(format!("oscavark-auth-{}-{}", name, std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        Session::new(dir)
    }

    #[test]
    fn test_check_role() {
        let osca = profile(Some(Role::Osca));
        assert_eq!(check_role(Role::Osca, Some(&osca)).unwrap(), Role::Osca);
        assert!(matches!(
            check_role(Role::Basca, Some(&osca)),
            Err(AuthError::RoleMismatch { requested: Role::Basca, actual: Some(Role::Osca) })
        ));
        assert!(matches!(check_role(Role::Osca, None), Err(AuthError::ProfileMissing)));
        assert!(matches!(
            check_role(Role::Student, Some(&profile(None))),
            Err(AuthError::RoleMismatch { actual: None, .. })
        ));
    }

    #[test]
    fn test_context_barangay_is_trimmed() {
        let ctx = AuthContext {
            session: session_data(60),
            profile: profile(Some(Role::Basca)),
            role: Role::Basca,
        };
        assert_eq!(ctx.barangay(), Some("Poblacion"));
        assert_eq!(ctx.display_name(), "Jose Rizal");
    }

    #[tokio::test]
    async fn test_login_success_sets_role() {
        let api = AuthApi::new(FakeBackend {
            accept_password: true,
            profile: Some(profile(Some(Role::Osca))),
            ..Default::default()
        });
        let ctx = api.login(&login_form(Role::Osca)).await.expect("login");
        assert_eq!(ctx.role, Role::Osca);
        assert_eq!(ctx.session.role, Some(Role::Osca));
        assert_eq!(api.backend().sign_out_count(), 0);
    }

    #[tokio::test]
    async fn test_login_role_mismatch_signs_out() {
        let api = AuthApi::new(FakeBackend {
            accept_password: true,
            profile: Some(profile(Some(Role::Senior))),
            ..Default::default()
        });
        let err = api.login(&login_form(Role::Osca)).await.unwrap_err();
        assert!(matches!(err, AuthError::RoleMismatch { .. }));
        assert_eq!(api.backend().signed_out.lock().unwrap().as_slice(), ["jwt"]);
    }

    #[tokio::test]
    async fn test_login_missing_profile_signs_out() {
        let api = AuthApi::new(FakeBackend {
            accept_password: true,
            ..Default::default()
        });
        let err = api.login(&login_form(Role::Teacher)).await.unwrap_err();
        assert!(matches!(err, AuthError::ProfileMissing));
        assert_eq!(api.backend().sign_out_count(), 1);
    }

    #[tokio::test]
    async fn test_login_bad_password() {
        let api = AuthApi::new(FakeBackend::default());
        let err = api.login(&login_form(Role::Osca)).await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials));
        assert_eq!(api.backend().sign_out_count(), 0);
    }

    #[tokio::test]
    async fn test_login_validation_runs_first() {
        let api = AuthApi::new(FakeBackend::default());
        let form = LoginForm {
            email: "not-an-email".to_string(),
            password: String::new(),
            role: None,
        };
        match api.login(&form).await {
            Err(AuthError::Validation(errors)) => {
                assert!(errors.has("email"));
                assert!(errors.has("password"));
                assert!(errors.has("role"));
            }
            other => panic!("unexpected {:?}", other.map(|c| c.role)),
        }
    }

    #[tokio::test]
    async fn test_login_times_out() {
        let api = AuthApi::new(FakeBackend {
            accept_password: true,
            profile: Some(profile(Some(Role::Osca))),
            delay: Some(Duration::from_millis(500)),
            ..Default::default()
        })
        .with_timeout(Duration::from_millis(20));
        let err = api.login(&login_form(Role::Osca)).await.unwrap_err();
        assert!(matches!(err, AuthError::Timeout));
        // No session was handed out, so there is nothing to revoke
        assert_eq!(api.backend().sign_out_count(), 0);
    }

    #[tokio::test]
    async fn test_login_timeout_after_sign_in_revokes_session() {
        let api = AuthApi::new(FakeBackend {
            accept_password: true,
            profile: Some(profile(Some(Role::Osca))),
            profile_delay: Some(Duration::from_millis(500)),
            ..Default::default()
        })
        .with_timeout(Duration::from_millis(20));
        let err = api.login(&login_form(Role::Osca)).await.unwrap_err();
        assert!(matches!(err, AuthError::Timeout));
        assert_eq!(api.backend().signed_out.lock().unwrap().as_slice(), ["jwt"]);
    }

    #[tokio::test]
    async fn test_register_with_session_saves_profile() {
        let api = AuthApi::new(FakeBackend {
            sign_up_session: true,
            ..Default::default()
        });
        let form = RegisterForm {
            email: "Guro@School.edu.ph".to_string(),
            password: "passw0rd".to_string(),
            confirm_password: "passw0rd".to_string(),
            first_name: "Maria".to_string(),
            last_name: "Santos".to_string(),
            role: Some(Role::Teacher),
            barangay: String::new(),
            learning_style: None,
        };
        match api.register(&form).await.expect("register") {
            RegisterOutcome::SignedIn(ctx) => assert_eq!(ctx.role, Role::Teacher),
            other => panic!("unexpected {:?}", other),
        }
        let saved = api.backend().saved.lock().unwrap();
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].email, "guro@school.edu.ph");
    }

    #[tokio::test]
    async fn test_register_needs_confirmation() {
        let api = AuthApi::new(FakeBackend::default());
        let form = RegisterForm {
            email: "lola@example.ph".to_string(),
            password: "passw0rd".to_string(),
            confirm_password: "passw0rd".to_string(),
            first_name: "Lola".to_string(),
            last_name: "Basyang".to_string(),
            role: Some(Role::Senior),
            barangay: "San Roque".to_string(),
            learning_style: None,
        };
        match api.register(&form).await.expect("register") {
            RegisterOutcome::ConfirmationRequired { email } => assert_eq!(email, "lola@example.ph"),
            other => panic!("unexpected {:?}", other),
        }
        assert!(api.backend().saved.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_restore_refreshes_expiring_token() {
        let api = AuthApi::new(FakeBackend {
            refresh_ok: true,
            profile: Some(profile(Some(Role::Osca))),
            ..Default::default()
        });
        let mut session = temp_session("refresh");
        let mut stale = session_data(2);
        stale.role = Some(Role::Osca);
        session.update(stale);

        let ctx = api.restore(&mut session).await.expect("restore").expect("context");
        assert_eq!(ctx.session.access_token, "jwt-2");
        assert_eq!(session.token(), Some("jwt-2"));
        session.clear().expect("clear");
    }

    #[tokio::test]
    async fn test_ensure_fresh_leaves_valid_token_alone() {
        let api = AuthApi::new(FakeBackend::default());
        let mut session = temp_session("fresh-valid");
        session.update(session_data(60));

        let data = api.ensure_fresh(&mut session).await.expect("fresh").expect("data");
        assert_eq!(data.access_token, "jwt");
        assert_eq!(*api.backend().refreshed.lock().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_ensure_fresh_renews_and_saves_expiring_token() {
        let api = AuthApi::new(FakeBackend {
            refresh_ok: true,
            ..Default::default()
        });
        let mut session = temp_session("fresh-renew");
        let mut expiring = session_data(3);
        expiring.role = Some(Role::Basca);
        session.update(expiring);

        let data = api.ensure_fresh(&mut session).await.expect("fresh").expect("data");
        assert_eq!(data.access_token, "jwt-2");
        assert_eq!(data.role, Some(Role::Basca));
        assert!(!data.needs_refresh());

        // The renewed token is what a restart would load
        let dir = std::env::temp_dir().join(format!("oscavark-auth-fresh-renew-{}", std::process::id()));
        let mut reloaded = Session::new(dir);
        reloaded.load().expect("load");
        assert_eq!(reloaded.token(), Some("jwt-2"));
        session.clear().expect("clear");
    }

    #[tokio::test]
    async fn test_ensure_fresh_keeps_unexpired_token_when_refresh_fails() {
        let api = AuthApi::new(FakeBackend::default());
        let mut session = temp_session("fresh-fail");
        session.update(session_data(2));

        let data = api.ensure_fresh(&mut session).await.expect("fresh").expect("data");
        assert_eq!(data.access_token, "jwt");
        assert_eq!(*api.backend().refreshed.lock().unwrap(), 1);
        assert!(session.data.is_some());
    }

    #[tokio::test]
    async fn test_ensure_fresh_drops_expired_session_when_refresh_fails() {
        let api = AuthApi::new(FakeBackend::default());
        let mut session = temp_session("fresh-expired");
        session.update(session_data(-1));

        assert!(api.ensure_fresh(&mut session).await.expect("fresh").is_none());
        assert!(session.data.is_none());
    }

    #[tokio::test]
    async fn test_restore_drops_expired_unrefreshable_session() {
        let api = AuthApi::new(FakeBackend {
            profile: Some(profile(Some(Role::Osca))),
            ..Default::default()
        });
        let mut session = temp_session("expired");
        session.update(session_data(-5));

        assert!(api.restore(&mut session).await.expect("restore").is_none());
        assert!(session.data.is_none());
    }

    #[tokio::test]
    async fn test_logout_clears_session() {
        let api = AuthApi::new(FakeBackend::default());
        let mut session = temp_session("logout");
        session.update(session_data(60));
        session.save().expect("save");

        api.logout(&mut session).await.expect("logout");
        assert!(session.data.is_none());
        assert_eq!(api.backend().sign_out_count(), 1);
    }
}
