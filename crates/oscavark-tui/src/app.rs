//! Application state management for the OSCA/VARK terminal client.
//!
//! This module contains the core `App` struct that manages all application state,
//! including the signed-in user, cached data, form overlays and background
//! refresh coordination.

use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use oscavark_core::api::{ApiError, SupabaseClient};
use oscavark_core::auth::{
    landing_route, AuthApi, AuthContext, AuthError, CredentialStore, RegisterOutcome, Role, Route,
    Session, View,
};
use oscavark_core::cache::CacheManager;
use oscavark_core::config::Config;
use oscavark_core::models::{
    Beneficiary, Class, LearningStyle, ModuleProgress, Profile, SeniorAffairsStats,
    SeniorCitizen, SeniorStatus, StudentDashboardStats, TeacherDashboardStats, VarkModule,
};
use oscavark_core::services::{
    BeneficiariesApi, ClassesApi, ModuleFilters, RegistryScope, SeniorAffairsDashboardApi,
    SeniorCitizensApi, SeniorFilters, SeniorRecord, StudentDashboardApi, TeacherDashboardApi,
    VarkModulesApi,
};
use oscavark_core::utils::contains_ignore_case;
use oscavark_core::validation::{LoginForm, ValidationErrors};

use crate::forms::{FormKind, FormState};

// ============================================================================
// Constants
// ============================================================================

/// Buffer size for the background task message channel.
const CHANNEL_BUFFER_SIZE: usize = 32;

/// Maximum length for email input.
const MAX_EMAIL_LENGTH: usize = 100;

/// Maximum length for password input.
const MAX_PASSWORD_LENGTH: usize = 128;

/// Number of items to scroll on page up/down.
pub const PAGE_SCROLL_SIZE: usize = 10;

/// Percentage a student advances a module by with one key press.
pub const PROGRESS_STEP: f64 = 25.0;

/// Wait before retrying a token refresh that failed.
const TOKEN_RETRY_INTERVAL: Duration = Duration::from_secs(30);

/// Shown to a BASCA officer whose profile names no barangay.
pub const NO_BARANGAY_MESSAGE: &str = "No barangay on your profile; ask the OSCA office to assign one";

// ============================================================================
// UI enums
// ============================================================================

/// Current UI focus area (list panel or detail panel)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    List,
    Detail,
}

/// Overall application state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppState {
    Normal,
    Searching,
    ShowingHelp,
    LoggingIn,
    EditingForm,
    ConfirmingDelete,
    ConfirmingLogout,
    ConfirmingQuit,
    Quitting,
}

/// Login form focus state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginFocus {
    Email,
    Password,
    Role,
    Remember,
    Button,
}

impl LoginFocus {
    pub fn next(&self) -> Self {
        match self {
            LoginFocus::Email => LoginFocus::Password,
            LoginFocus::Password => LoginFocus::Role,
            LoginFocus::Role => LoginFocus::Remember,
            LoginFocus::Remember => LoginFocus::Button,
            LoginFocus::Button => LoginFocus::Email,
        }
    }

    pub fn prev(&self) -> Self {
        match self {
            LoginFocus::Email => LoginFocus::Button,
            LoginFocus::Password => LoginFocus::Email,
            LoginFocus::Role => LoginFocus::Password,
            LoginFocus::Remember => LoginFocus::Role,
            LoginFocus::Button => LoginFocus::Remember,
        }
    }
}

/// A record the user asked to delete, waiting for confirmation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PendingDelete {
    Senior { id: String, name: String },
    Beneficiary { id: String, senior_id: String, name: String },
    Module { id: String, title: String },
    Class { id: String, name: String },
}

impl PendingDelete {
    pub fn description(&self) -> String {
        match self {
            PendingDelete::Senior { name, .. } => format!("senior citizen {}", name),
            PendingDelete::Beneficiary { name, .. } => format!("beneficiary {}", name),
            PendingDelete::Module { title, .. } => format!("module \"{}\"", title),
            PendingDelete::Class { name, .. } => format!("class {}", name),
        }
    }
}

/// Step through a role's views, wrapping at either end.
pub fn cycle_view(views: &[View], current: View, forward: bool) -> View {
    let Some(index) = views.iter().position(|v| *v == current) else {
        return views.first().copied().unwrap_or(View::Dashboard);
    };
    let len = views.len();
    let next = if forward {
        (index + 1) % len
    } else {
        (index + len - 1) % len
    };
    views[next]
}

/// Message for an error from a service call: the server's own wording when
/// there is one.
pub fn describe_error(err: &anyhow::Error) -> String {
    match err.downcast_ref::<ApiError>() {
        Some(api) => api.user_message(),
        None => format!("{:#}", err),
    }
}

// ============================================================================
// Background Task Results
// ============================================================================

/// Results sent from background refresh tasks back to the main loop.
enum RefreshResult {
    SeniorAffairsStats(SeniorAffairsStats),
    SeniorRecord(SeniorRecord),
    StudentStats(StudentDashboardStats),
    TeacherStats(TeacherDashboardStats),
    Seniors(Vec<SeniorCitizen>),
    /// Beneficiaries of one senior (senior_id, rows)
    Beneficiaries(String, Vec<Beneficiary>),
    Modules(Vec<VarkModule>),
    Progress(Vec<ModuleProgress>),
    Classes(Vec<Class>),
    /// Students enrolled in one class (class_id, profiles)
    ClassStudents(String, Vec<Profile>),
    RefreshComplete,
    Error(String),
}

/// Sending half handed to a background task. Every result carries the
/// generation the task was started under.
#[derive(Clone)]
struct ResultSender {
    tx: mpsc::Sender<(u64, RefreshResult)>,
    generation: u64,
}

impl ResultSender {
    /// Send a result, logging any channel errors
    async fn send(&self, result: RefreshResult) {
        if let Err(e) = self.tx.send((self.generation, result)).await {
            error!(error = %e, "Failed to send refresh result - channel closed");
        }
    }

    /// Send a successful fetch result or an error
    async fn send_fetch<T, F>(&self, name: &str, result: Result<T>, wrapper: F)
    where
        F: FnOnce(T) -> RefreshResult,
    {
        match result {
            Ok(data) => {
                debug!("{} fetched successfully", name);
                self.send(wrapper(data)).await;
            }
            Err(e) => {
                error!(error = %e, "{} fetch failed", name);
                self.send(RefreshResult::Error(format!("{}: {}", name, describe_error(&e)))).await;
            }
        }
    }
}

/// Result channel for background tasks. Signing in or out starts a new
/// generation; results from older ones are dropped on arrival so they never
/// reach another user's view or cache.
struct Background {
    tx: mpsc::Sender<(u64, RefreshResult)>,
    rx: mpsc::Receiver<(u64, RefreshResult)>,
    generation: u64,
}

impl Background {
    fn new() -> Self {
        let (tx, rx) = mpsc::channel(CHANNEL_BUFFER_SIZE);
        Self { tx, rx, generation: 0 }
    }

    fn sender(&self) -> ResultSender {
        ResultSender {
            tx: self.tx.clone(),
            generation: self.generation,
        }
    }

    /// Orphan every task started so far.
    fn advance(&mut self) {
        self.generation += 1;
    }

    /// Next result of the current generation that has arrived.
    fn try_next(&mut self) -> Option<RefreshResult> {
        while let Ok((generation, result)) = self.rx.try_recv() {
            if generation == self.generation {
                return Some(result);
            }
            debug!(generation, current = self.generation, "Dropping result from an earlier sign-in");
        }
        None
    }
}

// ============================================================================
// Main Application Struct
// ============================================================================

pub struct App {
    // Core services
    pub config: Config,
    pub session: Session,
    client: SupabaseClient,
    pub auth: Option<AuthContext>,
    cache: Option<CacheManager>,

    // UI State
    pub state: AppState,
    pub current_view: View,
    pub focus: Focus,
    pub search_query: String,
    pub status_message: Option<String>,
    pub last_updated: String,
    pub is_refreshing: bool,

    // Login form
    pub login_email: String,
    pub login_password: String,
    pub login_role: Role,
    pub login_remember: bool,
    pub login_focus: LoginFocus,
    pub login_error: Option<String>,

    // Overlays
    pub form: Option<FormState>,
    pub pending_delete: Option<PendingDelete>,

    // Senior affairs
    pub senior_stats: SeniorAffairsStats,
    pub seniors: Vec<SeniorCitizen>,
    pub senior_selection: usize,
    pub senior_status_filter: Option<SeniorStatus>,
    pub beneficiaries: Vec<Beneficiary>,
    beneficiaries_for: Option<String>,
    pub beneficiary_selection: usize,
    pub senior_record: SeniorRecord,

    // Learning
    pub student_stats: StudentDashboardStats,
    pub teacher_stats: TeacherDashboardStats,
    pub modules: Vec<VarkModule>,
    pub module_selection: usize,
    pub module_style_filter: Option<LearningStyle>,
    pub progress: Vec<ModuleProgress>,
    pub classes: Vec<Class>,
    pub class_selection: usize,
    pub class_students: Vec<Profile>,
    class_students_for: Option<String>,
    pub student_selection: usize,

    // Background tasks
    background: Background,
    token_retry_at: Option<Instant>,
}

impl App {
    pub fn new() -> Result<Self> {
        let config = Config::load().unwrap_or_else(|e| {
            warn!(error = %e, "Failed to load config, using defaults");
            Config::default()
        });
        let settings = config
            .supabase_settings()
            .context("Supabase is not configured")?;
        let client = SupabaseClient::new(&settings)?;

        let mut session = Session::new(config.cache_dir()?);
        if let Err(e) = session.load() {
            warn!(error = %e, "Failed to load saved session");
        }

        let login_email = config.last_email.clone().unwrap_or_default();
        let login_role = config.last_role.unwrap_or(Role::Osca);

        Ok(Self {
            config,
            session,
            client,
            auth: None,
            cache: None,

            state: AppState::Normal,
            current_view: View::Dashboard,
            focus: Focus::List,
            search_query: String::new(),
            status_message: None,
            last_updated: "never".to_string(),
            is_refreshing: false,

            login_email,
            login_password: String::new(),
            login_role,
            login_remember: false,
            login_focus: LoginFocus::Email,
            login_error: None,

            form: None,
            pending_delete: None,

            senior_stats: SeniorAffairsStats::default(),
            seniors: Vec::new(),
            senior_selection: 0,
            senior_status_filter: None,
            beneficiaries: Vec::new(),
            beneficiaries_for: None,
            beneficiary_selection: 0,
            senior_record: SeniorRecord::default(),

            student_stats: StudentDashboardStats::default(),
            teacher_stats: TeacherDashboardStats::default(),
            modules: Vec::new(),
            module_selection: 0,
            module_style_filter: None,
            progress: Vec::new(),
            classes: Vec::new(),
            class_selection: 0,
            class_students: Vec::new(),
            class_students_for: None,
            student_selection: 0,

            background: Background::new(),
            token_retry_at: None,
        })
    }

    fn auth_api(&self) -> AuthApi {
        AuthApi::new(self.client.clone())
    }

    /// Client carrying the signed-in user's token.
    fn user_client(&self) -> Option<SupabaseClient> {
        self.auth
            .as_ref()
            .map(|a| self.client.with_token(a.session.access_token.clone()))
    }

    pub fn role(&self) -> Option<Role> {
        self.auth.as_ref().map(|a| a.role)
    }

    pub fn views(&self) -> &'static [View] {
        match self.role() {
            Some(role) => role.views(),
            None => &[View::Dashboard],
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.auth.is_some()
    }

    // =========================================================================
    // Authentication
    // =========================================================================

    /// Resume the saved session, if it is still good.
    pub async fn restore_session(&mut self) -> bool {
        let api = self.auth_api();
        match api.restore(&mut self.session).await {
            Ok(Some(ctx)) => {
                info!(user_id = %ctx.user_id(), role = ctx.role.as_str(), "Session restored");
                self.enter(ctx);
                true
            }
            Ok(None) => false,
            Err(e) => {
                warn!(error = %e, "Could not restore session");
                false
            }
        }
    }

    /// Renew the access token once it is close to expiring, so background
    /// fetches and saves keep working through a long session. Called every
    /// loop tick; between renewals this is only a clock check.
    pub async fn keep_session_fresh(&mut self) {
        let due = self
            .auth
            .as_ref()
            .is_some_and(|ctx| ctx.session.needs_refresh());
        if !due || self.token_retry_at.is_some_and(|at| Instant::now() < at) {
            return;
        }

        let api = self.auth_api();
        match api.ensure_fresh(&mut self.session).await {
            Ok(Some(fresh)) => {
                self.token_retry_at = fresh
                    .needs_refresh()
                    .then(|| Instant::now() + TOKEN_RETRY_INTERVAL);
                if let Some(ctx) = self.auth.as_mut() {
                    ctx.session = fresh;
                }
            }
            Ok(None) => {
                warn!("Session expired and could not be renewed");
                self.reset_data();
                self.start_login();
                self.login_error = Some("Your session expired, please sign in again".to_string());
            }
            Err(e) => {
                warn!(error = %e, "Token refresh failed");
                self.token_retry_at = Some(Instant::now() + TOKEN_RETRY_INTERVAL);
            }
        }
    }

    /// Install a signed-in user and land on the page their role starts on.
    fn enter(&mut self, ctx: AuthContext) {
        self.background.advance();
        self.token_retry_at = None;
        self.cache = match self
            .config
            .user_cache_dir(ctx.user_id())
            .and_then(CacheManager::new)
        {
            Ok(cache) => Some(cache),
            Err(e) => {
                warn!(error = %e, "Cache unavailable, continuing without it");
                None
            }
        };
        self.current_view = match landing_route(&Route::Login, Some(&ctx.profile)) {
            Route::Page { view, .. } => view,
            _ => View::Dashboard,
        };
        if ctx.role == Role::Student {
            self.module_style_filter = ctx.profile.learning_style;
        }
        self.focus = Focus::List;
        self.auth = Some(ctx);
        self.load_from_cache();
    }

    /// Jump to a path such as `/teacher/classes`, following the same
    /// redirects a browser visit would.
    pub fn open_route(&mut self, path: &str) {
        let route = Route::parse(path);
        let profile = self.auth.as_ref().map(|a| &a.profile);
        match landing_route(&route, profile) {
            Route::Page { view, .. } => {
                self.current_view = view;
                self.focus = Focus::List;
            }
            Route::Register if self.auth.is_none() => self.start_register(),
            _ if self.auth.is_none() => self.start_login(),
            _ => {}
        }
    }

    /// Show the login overlay.
    pub fn start_login(&mut self) {
        self.state = AppState::LoggingIn;
        self.login_error = None;
        if self.login_password.is_empty() && !self.login_email.is_empty() {
            if let Ok(password) = CredentialStore::get_password(&self.login_email) {
                self.login_password = password;
                self.login_remember = true;
            }
        }
        self.login_focus = if self.login_email.is_empty() {
            LoginFocus::Email
        } else if self.login_password.is_empty() {
            LoginFocus::Password
        } else {
            LoginFocus::Button
        };
    }

    /// Attempt login with the credentials from the login form.
    pub async fn attempt_login(&mut self) -> Result<()> {
        let form = LoginForm {
            email: self.login_email.clone(),
            password: self.login_password.clone(),
            role: Some(self.login_role),
        };
        self.login_error = None;

        match self.auth_api().login(&form).await {
            Ok(ctx) => {
                let email = ctx.session.email.clone();
                if self.login_remember {
                    if let Err(e) = CredentialStore::store(&email, &self.login_password) {
                        warn!(error = %e, "Failed to store credentials");
                    }
                } else if CredentialStore::has_credentials(&email) {
                    let _ = CredentialStore::delete(&email);
                }

                self.config.last_email = Some(email);
                self.config.last_role = Some(ctx.role);
                if let Err(e) = self.config.save() {
                    warn!(error = %e, "Failed to save config");
                }

                self.session.update(ctx.session.clone());
                if let Err(e) = self.session.save() {
                    warn!(error = %e, "Failed to save session");
                }

                self.login_password.clear();
                self.state = AppState::Normal;
                self.enter(ctx);
                Ok(())
            }
            Err(e) => {
                error!(error = %e, "Login failed");
                self.login_error = Some(match &e {
                    AuthError::Validation(errors) => errors
                        .errors()
                        .first()
                        .map(|f| f.message.clone())
                        .unwrap_or_else(|| e.to_string()),
                    _ => e.to_string(),
                });
                Err(e.into())
            }
        }
    }

    pub fn start_register(&mut self) {
        self.form = Some(FormState::register(self.login_role, &self.login_email));
        self.state = AppState::EditingForm;
    }

    async fn submit_register(&mut self, form: &mut FormState) -> bool {
        let register = form.to_register_form();
        match self.auth_api().register(&register).await {
            Ok(RegisterOutcome::SignedIn(ctx)) => {
                self.config.last_email = Some(ctx.session.email.clone());
                self.config.last_role = Some(ctx.role);
                if let Err(e) = self.config.save() {
                    warn!(error = %e, "Failed to save config");
                }
                self.session.update(ctx.session.clone());
                if let Err(e) = self.session.save() {
                    warn!(error = %e, "Failed to save session");
                }
                self.enter(ctx);
                self.state = AppState::Normal;
                self.refresh_all_background();
                true
            }
            Ok(RegisterOutcome::ConfirmationRequired { email }) => {
                self.login_email = email.clone();
                if let Some(role) = register.role {
                    self.login_role = role;
                }
                self.start_login();
                self.login_error = Some(format!("Check {} to confirm your account", email));
                true
            }
            Err(AuthError::Validation(errors)) => {
                form.set_errors(errors);
                false
            }
            Err(e) => {
                form.set_message(e.to_string());
                false
            }
        }
    }

    /// Sign out, forget the stored password and drop this user's cache.
    pub async fn logout(&mut self) {
        let api = self.auth_api();
        if let Err(e) = api.logout(&mut self.session).await {
            warn!(error = %e, "Failed to clear session");
        }
        if let Some(ref cache) = self.cache {
            if let Err(e) = cache.clear() {
                warn!(error = %e, "Failed to clear cache");
            }
        }
        if let Some(email) = self.auth.as_ref().map(|a| a.session.email.clone()) {
            if CredentialStore::has_credentials(&email) {
                let _ = CredentialStore::delete(&email);
            }
        }
        self.reset_data();
        self.login_password.clear();
        self.login_remember = false;
        self.start_login();
    }

    fn reset_data(&mut self) {
        self.background.advance();
        self.token_retry_at = None;
        self.is_refreshing = false;
        self.auth = None;
        self.cache = None;
        self.current_view = View::Dashboard;
        self.focus = Focus::List;
        self.search_query.clear();
        self.status_message = None;
        self.last_updated = "never".to_string();
        self.form = None;
        self.pending_delete = None;
        self.senior_stats = SeniorAffairsStats::default();
        self.seniors.clear();
        self.senior_selection = 0;
        self.senior_status_filter = None;
        self.beneficiaries.clear();
        self.beneficiaries_for = None;
        self.senior_record = SeniorRecord::default();
        self.student_stats = StudentDashboardStats::default();
        self.teacher_stats = TeacherDashboardStats::default();
        self.modules.clear();
        self.module_selection = 0;
        self.module_style_filter = None;
        self.progress.clear();
        self.classes.clear();
        self.class_selection = 0;
        self.class_students.clear();
        self.class_students_for = None;
    }

    // =========================================================================
    // Cache Management
    // =========================================================================

    /// Show the last saved snapshot for the signed-in user.
    pub fn load_from_cache(&mut self) {
        let (Some(cache), Some(role)) = (self.cache.as_ref(), self.role()) else {
            return;
        };

        match role {
            Role::Osca | Role::Basca if self.senior_filters().is_none() => {
                self.status_message = Some(NO_BARANGAY_MESSAGE.to_string());
            }
            Role::Osca | Role::Basca => {
                if let Ok(Some(cached)) = cache.load_senior_affairs_stats() {
                    self.senior_stats = cached.data;
                }
                if let Ok(Some(cached)) = cache.load_seniors() {
                    self.seniors = cached.data;
                }
            }
            Role::Senior => {
                if let Ok(Some(cached)) = cache.load_senior_record() {
                    self.senior_record = cached.data;
                }
            }
            Role::Teacher => {
                if let Ok(Some(cached)) = cache.load_teacher_stats() {
                    self.teacher_stats = cached.data;
                }
                if let Ok(Some(cached)) = cache.load_modules() {
                    self.modules = cached.data;
                }
                if let Ok(Some(cached)) = cache.load_classes() {
                    self.classes = cached.data;
                }
            }
            Role::Student => {
                if let Ok(Some(cached)) = cache.load_student_stats() {
                    self.student_stats = cached.data;
                }
                if let Ok(Some(cached)) = cache.load_modules() {
                    self.modules = cached.data;
                }
                if let Ok(Some(cached)) = cache.load_progress() {
                    self.progress = cached.data;
                }
                if let Ok(Some(cached)) = cache.load_classes() {
                    self.classes = cached.data;
                }
            }
        }
        self.last_updated = cache.last_updated();
    }

    /// True when the role's dashboard snapshot is missing or old.
    pub fn is_cache_stale(&self) -> bool {
        let (Some(cache), Some(role)) = (self.cache.as_ref(), self.role()) else {
            return true;
        };
        let stale = match role {
            Role::Osca | Role::Basca => cache.load_senior_affairs_stats().ok().flatten().map(|c| c.is_stale()),
            Role::Senior => cache.load_senior_record().ok().flatten().map(|c| c.is_stale()),
            Role::Teacher => cache.load_teacher_stats().ok().flatten().map(|c| c.is_stale()),
            Role::Student => cache.load_student_stats().ok().flatten().map(|c| c.is_stale()),
        };
        stale.unwrap_or(true)
    }

    // =========================================================================
    // Background Data Refresh
    // =========================================================================

    /// Registry list filters for the signed-in user, `None` when their
    /// scope allows no rows at all.
    fn senior_filters(&self) -> Option<SeniorFilters> {
        let mut filters = match self.auth.as_ref().and_then(RegistryScope::for_context) {
            Some(scope) => scope.filters()?,
            None => SeniorFilters::default(),
        };
        filters.status = self.senior_status_filter;
        Some(filters)
    }

    fn module_filters(&self) -> ModuleFilters {
        let mut filters = match self.auth.as_ref() {
            Some(ctx) if ctx.role == Role::Teacher => ModuleFilters::created_by(ctx.user_id()),
            _ => ModuleFilters::published(),
        };
        filters.learning_style = self.module_style_filter;
        filters
    }

    /// Spawn a background task that reloads everything the role shows.
    pub fn refresh_all_background(&mut self) {
        let (Some(ctx), Some(client)) = (self.auth.clone(), self.user_client()) else {
            return;
        };
        info!(role = ctx.role.as_str(), "Starting background refresh");
        self.is_refreshing = true;
        self.status_message = Some("Refreshing...".to_string());

        let sender = self.background.sender();
        let senior_filters = self.senior_filters();
        let module_filters = self.module_filters();
        tokio::spawn(async move {
            Self::execute_background_refresh(sender, client, ctx, senior_filters, module_filters).await;
        });
    }

    /// Reload only the module list, e.g. after a filter change.
    pub fn refresh_modules_background(&mut self) {
        let Some(client) = self.user_client() else {
            return;
        };
        let sender = self.background.sender();
        let filters = self.module_filters();
        tokio::spawn(async move {
            let result = VarkModulesApi::new(client).list(&filters).await;
            sender.send_fetch("Modules", result, RefreshResult::Modules).await;
        });
    }

    /// Reload only the senior list, e.g. after a filter change.
    pub fn refresh_seniors_background(&mut self) {
        let Some(client) = self.user_client() else {
            return;
        };
        let Some(filters) = self.senior_filters() else {
            self.seniors.clear();
            self.senior_selection = 0;
            self.status_message = Some(NO_BARANGAY_MESSAGE.to_string());
            return;
        };
        let sender = self.background.sender();
        tokio::spawn(async move {
            let result = SeniorCitizensApi::new(client).list(&filters).await;
            sender.send_fetch("Senior citizens", result, RefreshResult::Seniors).await;
        });
    }

    /// Runs in a spawned task. Dashboards never fail (their queries degrade
    /// to zero values), lists report errors individually.
    async fn execute_background_refresh(
        sender: ResultSender,
        client: SupabaseClient,
        ctx: AuthContext,
        senior_filters: Option<SeniorFilters>,
        module_filters: ModuleFilters,
    ) {
        let user_id = ctx.user_id().to_string();
        match ctx.role {
            Role::Osca | Role::Basca => {
                let scope = RegistryScope::for_context(&ctx).unwrap_or(RegistryScope::Unassigned);
                match senior_filters {
                    Some(filters) => {
                        let dashboard = SeniorAffairsDashboardApi::new(client.clone());
                        let seniors = SeniorCitizensApi::new(client);
                        let (stats, list) =
                            tokio::join!(dashboard.stats(&scope), seniors.list(&filters));
                        sender.send(RefreshResult::SeniorAffairsStats(stats)).await;
                        sender.send_fetch("Senior citizens", list, RefreshResult::Seniors).await;
                    }
                    None => {
                        warn!(user_id = %user_id, "No barangay on the BASCA profile, registry withheld");
                        sender.send(RefreshResult::SeniorAffairsStats(SeniorAffairsStats::default())).await;
                        sender.send(RefreshResult::Seniors(Vec::new())).await;
                        sender.send(RefreshResult::Error(NO_BARANGAY_MESSAGE.to_string())).await;
                    }
                }
            }
            Role::Senior => {
                let record = SeniorAffairsDashboardApi::new(client).my_record(&user_id).await;
                sender.send(RefreshResult::SeniorRecord(record)).await;
            }
            Role::Teacher => {
                let dashboard = TeacherDashboardApi::new(client.clone());
                let modules = VarkModulesApi::new(client.clone());
                let classes = ClassesApi::new(client);
                let (stats, module_list, class_list) = tokio::join!(
                    dashboard.stats(&user_id),
                    modules.list(&module_filters),
                    classes.for_teacher(&user_id),
                );
                sender.send(RefreshResult::TeacherStats(stats)).await;
                sender.send_fetch("Modules", module_list, RefreshResult::Modules).await;
                sender.send_fetch("Classes", class_list, RefreshResult::Classes).await;
            }
            Role::Student => {
                let dashboard = StudentDashboardApi::new(client.clone());
                let modules = VarkModulesApi::new(client.clone());
                let classes = ClassesApi::new(client);
                let (stats, module_list, progress, class_list) = tokio::join!(
                    dashboard.stats(&user_id),
                    modules.list(&module_filters),
                    modules.progress_for_student(&user_id),
                    classes.for_student(&user_id),
                );
                sender.send(RefreshResult::StudentStats(stats)).await;
                sender.send_fetch("Modules", module_list, RefreshResult::Modules).await;
                sender.send_fetch("Progress", progress, RefreshResult::Progress).await;
                sender.send_fetch("Classes", class_list, RefreshResult::Classes).await;
            }
        }
        sender.send(RefreshResult::RefreshComplete).await;
        info!("Background refresh task finished");
    }

    /// Load beneficiaries for the selected senior, cache first.
    pub fn fetch_beneficiaries(&mut self) {
        let Some(senior_id) = self.selected_senior().map(|s| s.id.clone()) else {
            return;
        };
        if self.beneficiaries_for.as_deref() != Some(senior_id.as_str()) {
            self.beneficiaries = self
                .cache
                .as_ref()
                .and_then(|c| c.load_beneficiaries(&senior_id).ok().flatten())
                .map(|c| c.data)
                .unwrap_or_default();
            self.beneficiaries_for = Some(senior_id.clone());
            self.beneficiary_selection = 0;
        }

        let Some(client) = self.user_client() else {
            return;
        };
        let sender = self.background.sender();
        tokio::spawn(async move {
            let result = BeneficiariesApi::new(client).list_for_senior(&senior_id).await;
            sender
                .send_fetch("Beneficiaries", result, |rows| RefreshResult::Beneficiaries(senior_id, rows))
                .await;
        });
    }

    /// Load the roster of the selected class.
    pub fn fetch_class_students(&mut self) {
        let Some(class_id) = self.selected_class().map(|c| c.id.clone()) else {
            return;
        };
        if self.class_students_for.as_deref() != Some(class_id.as_str()) {
            self.class_students.clear();
            self.class_students_for = Some(class_id.clone());
            self.student_selection = 0;
        }
        let Some(client) = self.user_client() else {
            return;
        };
        let sender = self.background.sender();
        tokio::spawn(async move {
            let result = ClassesApi::new(client).students(&class_id).await;
            sender
                .send_fetch("Class roster", result, |rows| RefreshResult::ClassStudents(class_id, rows))
                .await;
        });
    }

    /// Check for completed background tasks and process results
    pub fn check_background_tasks(&mut self) {
        while let Some(result) = self.background.try_next() {
            self.process_refresh_result(result);
        }
    }

    fn process_refresh_result(&mut self, result: RefreshResult) {
        match result {
            RefreshResult::SeniorAffairsStats(stats) => {
                if let Some(ref cache) = self.cache {
                    if let Err(e) = cache.save_senior_affairs_stats(&stats) {
                        warn!(error = %e, "Failed to cache senior affairs stats");
                    }
                }
                self.senior_stats = stats;
            }
            RefreshResult::SeniorRecord(record) => {
                if let Some(ref cache) = self.cache {
                    if let Err(e) = cache.save_senior_record(&record) {
                        warn!(error = %e, "Failed to cache senior record");
                    }
                }
                self.senior_record = record;
            }
            RefreshResult::StudentStats(stats) => {
                if let Some(ref cache) = self.cache {
                    if let Err(e) = cache.save_student_stats(&stats) {
                        warn!(error = %e, "Failed to cache student stats");
                    }
                }
                self.student_stats = stats;
            }
            RefreshResult::TeacherStats(stats) => {
                if let Some(ref cache) = self.cache {
                    if let Err(e) = cache.save_teacher_stats(&stats) {
                        warn!(error = %e, "Failed to cache teacher stats");
                    }
                }
                self.teacher_stats = stats;
            }
            RefreshResult::Seniors(data) => {
                if let Some(ref cache) = self.cache {
                    if let Err(e) = cache.save_seniors(&data) {
                        warn!(error = %e, "Failed to cache senior citizens");
                    }
                }
                self.seniors = data;
                self.senior_selection = clamp_selection(self.senior_selection, self.filtered_seniors().len());
            }
            RefreshResult::Beneficiaries(senior_id, data) => {
                if let Some(ref cache) = self.cache {
                    if let Err(e) = cache.save_beneficiaries(&senior_id, &data) {
                        warn!(error = %e, "Failed to cache beneficiaries");
                    }
                }
                if self.beneficiaries_for.as_deref() == Some(senior_id.as_str()) {
                    self.beneficiary_selection = clamp_selection(self.beneficiary_selection, data.len());
                    self.beneficiaries = data;
                }
            }
            RefreshResult::Modules(data) => {
                if let Some(ref cache) = self.cache {
                    if let Err(e) = cache.save_modules(&data) {
                        warn!(error = %e, "Failed to cache modules");
                    }
                }
                self.modules = data;
                self.module_selection = clamp_selection(self.module_selection, self.visible_modules().len());
            }
            RefreshResult::Progress(data) => {
                if let Some(ref cache) = self.cache {
                    if let Err(e) = cache.save_progress(&data) {
                        warn!(error = %e, "Failed to cache progress");
                    }
                }
                self.progress = data;
            }
            RefreshResult::Classes(data) => {
                if let Some(ref cache) = self.cache {
                    if let Err(e) = cache.save_classes(&data) {
                        warn!(error = %e, "Failed to cache classes");
                    }
                }
                self.classes = data;
                self.class_selection = clamp_selection(self.class_selection, self.classes.len());
            }
            RefreshResult::ClassStudents(class_id, data) => {
                if self.class_students_for.as_deref() == Some(class_id.as_str()) {
                    self.class_students = data;
                    self.student_selection = clamp_selection(self.student_selection, self.class_students.len());
                }
            }
            RefreshResult::RefreshComplete => {
                self.is_refreshing = false;
                if let Some(ref cache) = self.cache {
                    self.last_updated = cache.last_updated();
                }
                if self.status_message.as_deref() == Some("Refreshing...") {
                    self.status_message = None;
                }
            }
            RefreshResult::Error(msg) => {
                self.status_message = Some(msg);
            }
        }
    }

    // =========================================================================
    // Selections and filtering
    // =========================================================================

    fn senior_matches_search(senior: &SeniorCitizen, query: &str) -> bool {
        contains_ignore_case(&senior.first_name, query)
            || contains_ignore_case(&senior.last_name, query)
            || senior
                .middle_name
                .as_deref()
                .is_some_and(|m| contains_ignore_case(m, query))
            || senior
                .osca_id
                .as_deref()
                .is_some_and(|id| contains_ignore_case(id, query))
            || contains_ignore_case(&senior.barangay, query)
    }

    /// Seniors matching the search box, in list order.
    pub fn filtered_seniors(&self) -> Vec<&SeniorCitizen> {
        let query = self.search_query.trim();
        self.seniors
            .iter()
            .filter(|s| query.is_empty() || Self::senior_matches_search(s, query))
            .collect()
    }

    pub fn selected_senior(&self) -> Option<&SeniorCitizen> {
        self.filtered_seniors().get(self.senior_selection).copied()
    }

    pub fn selected_beneficiary(&self) -> Option<&Beneficiary> {
        self.beneficiaries.get(self.beneficiary_selection)
    }

    /// Modules matching the search box, in list order.
    pub fn visible_modules(&self) -> Vec<&VarkModule> {
        let query = self.search_query.trim();
        self.modules
            .iter()
            .filter(|m| {
                query.is_empty()
                    || contains_ignore_case(&m.title, query)
                    || contains_ignore_case(&m.subject, query)
            })
            .collect()
    }

    pub fn selected_module(&self) -> Option<&VarkModule> {
        self.visible_modules().get(self.module_selection).copied()
    }

    pub fn selected_class(&self) -> Option<&Class> {
        self.classes.get(self.class_selection)
    }

    pub fn progress_for(&self, module_id: &str) -> Option<&ModuleProgress> {
        self.progress.iter().find(|p| p.module_id == module_id)
    }

    pub fn module_title(&self, module_id: &str) -> String {
        self.modules
            .iter()
            .find(|m| m.id == module_id)
            .map(|m| m.title.clone())
            .unwrap_or_else(|| "Untitled module".to_string())
    }

    pub fn next_view(&mut self) {
        self.current_view = cycle_view(self.views(), self.current_view, true);
        self.focus = Focus::List;
    }

    pub fn prev_view(&mut self) {
        self.current_view = cycle_view(self.views(), self.current_view, false);
        self.focus = Focus::List;
    }

    /// Select a view by its 1-based tab number.
    pub fn select_view(&mut self, number: usize) {
        if let Some(view) = number.checked_sub(1).and_then(|i| self.views().get(i)) {
            self.current_view = *view;
            self.focus = Focus::List;
        }
    }

    pub fn cycle_status_filter(&mut self) {
        self.senior_status_filter = match self.senior_status_filter {
            None => Some(SeniorStatus::Active),
            Some(SeniorStatus::Active) => Some(SeniorStatus::Inactive),
            Some(SeniorStatus::Inactive) => Some(SeniorStatus::Deceased),
            Some(_) => None,
        };
        self.senior_selection = 0;
        self.refresh_seniors_background();
    }

    pub fn cycle_style_filter(&mut self) {
        self.module_style_filter = LearningStyle::cycle(self.module_style_filter);
        self.module_selection = 0;
        self.refresh_modules_background();
    }

    // =========================================================================
    // Forms
    // =========================================================================

    fn open_form(&mut self, form: FormState) {
        self.form = Some(form);
        self.state = AppState::EditingForm;
    }

    pub fn open_new_senior(&mut self) {
        let barangay = match self.auth.as_ref() {
            Some(ctx) if ctx.role == Role::Basca => ctx.barangay().map(str::to_string),
            _ => None,
        };
        self.open_form(FormState::new_senior(barangay.as_deref()));
    }

    pub fn open_edit_senior(&mut self) {
        if let Some(form) = self.selected_senior().map(FormState::edit_senior) {
            self.open_form(form);
        }
    }

    pub fn open_new_beneficiary(&mut self) {
        if let Some(form) = self.selected_senior().map(|s| FormState::new_beneficiary(&s.id)) {
            self.open_form(form);
        }
    }

    pub fn open_edit_beneficiary(&mut self) {
        if let Some(form) = self.selected_beneficiary().map(FormState::edit_beneficiary) {
            self.open_form(form);
        }
    }

    pub fn open_new_module(&mut self) {
        self.open_form(FormState::new_module());
    }

    pub fn open_edit_module(&mut self) {
        if let Some(form) = self.selected_module().map(FormState::edit_module) {
            self.open_form(form);
        }
    }

    pub fn open_new_class(&mut self) {
        self.open_form(FormState::new_class());
    }

    pub fn open_join_class(&mut self) {
        self.open_form(FormState::join_class());
    }

    pub fn cancel_form(&mut self) {
        let was_register = matches!(self.form.as_ref().map(|f| &f.kind), Some(FormKind::Register));
        self.form = None;
        if was_register {
            self.start_login();
        } else {
            self.state = AppState::Normal;
        }
    }

    /// Save the open form. On failure the form stays open with its errors.
    pub async fn submit_form(&mut self) {
        let Some(mut form) = self.form.take() else {
            return;
        };

        if form.kind == FormKind::Register {
            if !self.submit_register(&mut form).await {
                self.form = Some(form);
            }
            return;
        }

        let (Some(client), Some(user_id)) = (
            self.user_client(),
            self.auth.as_ref().map(|a| a.user_id().to_string()),
        ) else {
            return;
        };

        let result: Result<String> = match form.kind.clone() {
            FormKind::Register => {
                self.form = Some(form);
                return;
            }
            FormKind::Senior { id } => {
                let api = SeniorCitizensApi::new(client);
                let senior_form = form.to_senior_form();
                match id {
                    Some(id) => api.update(&id, &senior_form).await,
                    None => api.create(&senior_form, &user_id).await,
                }
                .map(|s| format!("Saved {}", s.display_name()))
            }
            FormKind::Beneficiary { senior_id, id } => {
                let api = BeneficiariesApi::new(client);
                let beneficiary = form.to_beneficiary_form();
                match id {
                    Some(id) => api.update(&id, &beneficiary).await,
                    None => api.create(&senior_id, &beneficiary).await,
                }
                .map(|b| format!("Saved beneficiary {}", b.full_name()))
            }
            FormKind::Module { id, .. } => {
                let api = VarkModulesApi::new(client);
                let module = form.to_module_form();
                match id {
                    Some(id) => api.update(&id, &module).await,
                    None => api.create(&module, &user_id).await,
                }
                .map(|m| format!("Saved module \"{}\"", m.title))
            }
            FormKind::Class => ClassesApi::new(client)
                .create(&form.to_class_form(), &user_id)
                .await
                .map(|c| {
                    format!(
                        "Created {} (code {})",
                        c.name,
                        c.class_code.as_deref().unwrap_or("-")
                    )
                }),
            FormKind::JoinClass => ClassesApi::new(client)
                .join_by_code(form.value("class_code"), &user_id)
                .await
                .map(|c| format!("Joined {}", c.name)),
        };

        match result {
            Ok(message) => {
                info!(form = form.kind.title(), "Form saved");
                self.status_message = Some(message);
                self.state = AppState::Normal;
                if let FormKind::Beneficiary { .. } = form.kind {
                    self.fetch_beneficiaries();
                }
                self.refresh_all_background();
            }
            Err(e) => {
                match e.downcast_ref::<ValidationErrors>() {
                    Some(errors) => form.set_errors(errors.clone()),
                    None => {
                        warn!(error = %e, form = form.kind.title(), "Save failed");
                        form.set_message(describe_error(&e));
                    }
                }
                self.form = Some(form);
            }
        }
    }

    // =========================================================================
    // Record actions
    // =========================================================================

    /// Move the selected senior to the next status.
    pub async fn cycle_selected_status(&mut self) {
        let (Some(client), Some(senior)) = (self.user_client(), self.selected_senior().cloned()) else {
            return;
        };
        let status = senior.status.next();
        match SeniorCitizensApi::new(client).set_status(&senior.id, status).await {
            Ok(updated) => {
                self.status_message = Some(format!("{} is now {}", updated.display_name(), updated.status));
                if let Some(row) = self.seniors.iter_mut().find(|s| s.id == updated.id) {
                    *row = updated;
                }
                self.refresh_all_background();
            }
            Err(e) => self.status_message = Some(describe_error(&e)),
        }
    }

    pub async fn toggle_selected_published(&mut self) {
        let (Some(client), Some(module)) = (self.user_client(), self.selected_module().cloned()) else {
            return;
        };
        match VarkModulesApi::new(client)
            .set_published(&module.id, !module.is_published)
            .await
        {
            Ok(updated) => {
                self.status_message = Some(if updated.is_published {
                    format!("Published \"{}\"", updated.title)
                } else {
                    format!("Unpublished \"{}\"", updated.title)
                });
                if let Some(row) = self.modules.iter_mut().find(|m| m.id == updated.id) {
                    *row = updated;
                }
            }
            Err(e) => self.status_message = Some(describe_error(&e)),
        }
    }

    /// Record another step of progress on the selected module.
    pub async fn advance_selected_progress(&mut self) {
        let (Some(client), Some(module), Some(student_id)) = (
            self.user_client(),
            self.selected_module().cloned(),
            self.auth.as_ref().map(|a| a.user_id().to_string()),
        ) else {
            return;
        };
        let (percentage, minutes) = next_progress(
            self.progress_for(&module.id),
            module.estimated_duration_minutes,
        );
        match VarkModulesApi::new(client)
            .record_progress(&student_id, &module.id, percentage, minutes)
            .await
        {
            Ok(progress) => {
                self.status_message = Some(format!(
                    "\"{}\": {} ({:.0}%)",
                    module.title, progress.status, progress.progress_percentage
                ));
                match self.progress.iter_mut().find(|p| p.module_id == progress.module_id) {
                    Some(row) => *row = progress,
                    None => self.progress.push(progress),
                }
            }
            Err(e) => self.status_message = Some(describe_error(&e)),
        }
    }

    pub fn request_delete(&mut self) {
        let pending = match self.current_view {
            View::Seniors if self.focus == Focus::Detail => {
                self.selected_beneficiary().map(|b| PendingDelete::Beneficiary {
                    id: b.id.clone(),
                    senior_id: b.senior_citizen_id.clone(),
                    name: b.full_name(),
                })
            }
            View::Seniors => self.selected_senior().map(|s| PendingDelete::Senior {
                id: s.id.clone(),
                name: s.display_name(),
            }),
            View::Modules => self.selected_module().map(|m| PendingDelete::Module {
                id: m.id.clone(),
                title: m.title.clone(),
            }),
            View::Classes => self.selected_class().map(|c| PendingDelete::Class {
                id: c.id.clone(),
                name: c.name.clone(),
            }),
            View::Dashboard => None,
        };
        if let Some(pending) = pending {
            self.pending_delete = Some(pending);
            self.state = AppState::ConfirmingDelete;
        }
    }

    pub async fn confirm_delete(&mut self) {
        self.state = AppState::Normal;
        let (Some(pending), Some(client)) = (self.pending_delete.take(), self.user_client()) else {
            return;
        };
        let result = match &pending {
            PendingDelete::Senior { id, .. } => SeniorCitizensApi::new(client).delete(id).await,
            PendingDelete::Beneficiary { id, .. } => BeneficiariesApi::new(client).delete(id).await,
            PendingDelete::Module { id, .. } => VarkModulesApi::new(client).delete(id).await,
            PendingDelete::Class { id, .. } => ClassesApi::new(client).delete(id).await,
        };
        match result {
            Ok(()) => {
                self.status_message = Some(format!("Deleted {}", pending.description()));
                match pending {
                    PendingDelete::Senior { id, .. } => self.seniors.retain(|s| s.id != id),
                    PendingDelete::Beneficiary { id, .. } => self.beneficiaries.retain(|b| b.id != id),
                    PendingDelete::Module { id, .. } => self.modules.retain(|m| m.id != id),
                    PendingDelete::Class { id, .. } => self.classes.retain(|c| c.id != id),
                }
                self.senior_selection = clamp_selection(self.senior_selection, self.filtered_seniors().len());
                self.beneficiary_selection = clamp_selection(self.beneficiary_selection, self.beneficiaries.len());
                self.module_selection = clamp_selection(self.module_selection, self.visible_modules().len());
                self.class_selection = clamp_selection(self.class_selection, self.classes.len());
                self.refresh_all_background();
            }
            Err(e) => {
                warn!(error = %e, "Delete failed");
                self.status_message = Some(describe_error(&e));
            }
        }
    }
}

/// Keep a selection index inside a list that may have shrunk.
fn clamp_selection(selection: usize, len: usize) -> usize {
    selection.min(len.saturating_sub(1))
}

/// Progress after one more step: percentage capped at 100, time grown by
/// the matching share of the module's estimated duration.
pub fn next_progress(current: Option<&ModuleProgress>, duration_minutes: Option<i32>) -> (f64, i64) {
    let (percentage, minutes) = current
        .map(|p| (p.progress_percentage, p.time_spent_minutes))
        .unwrap_or((0.0, 0));
    let next = (percentage + PROGRESS_STEP).min(100.0);
    let step_minutes = duration_minutes
        .map(|d| (d as f64 * (next - percentage) / 100.0).round() as i64)
        .unwrap_or(0);
    (next, minutes + step_minutes)
}

// ============================================================================
// Input validation helpers (exported for use in input.rs)
// ============================================================================

/// Check if a character is valid for input (no control characters)
fn is_valid_input_char(c: char) -> bool {
    !c.is_control()
}

pub fn can_add_email_char(current_len: usize, c: char) -> bool {
    current_len < MAX_EMAIL_LENGTH && is_valid_input_char(c) && !c.is_whitespace()
}

pub fn can_add_password_char(current_len: usize, c: char) -> bool {
    current_len < MAX_PASSWORD_LENGTH && is_valid_input_char(c)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use oscavark_core::models::ProgressStatus;

    // -------------------------------------------------------------------------
    // View Tests
    // -------------------------------------------------------------------------

    #[test]
    fn test_cycle_view_wraps() {
        let views = Role::Teacher.views();
        assert_eq!(cycle_view(views, View::Dashboard, true), View::Modules);
        assert_eq!(cycle_view(views, View::Classes, true), View::Dashboard);
        assert_eq!(cycle_view(views, View::Dashboard, false), View::Classes);
    }

    #[test]
    fn test_cycle_view_single_and_foreign() {
        let senior = Role::Senior.views();
        assert_eq!(cycle_view(senior, View::Dashboard, true), View::Dashboard);
        // A view the role does not have falls back to home
        assert_eq!(cycle_view(senior, View::Classes, false), View::Dashboard);
    }

    #[test]
    fn test_login_focus_cycle() {
        let mut focus = LoginFocus::Email;
        for _ in 0..5 {
            focus = focus.next();
        }
        assert_eq!(focus, LoginFocus::Email);
        assert_eq!(LoginFocus::Email.prev(), LoginFocus::Button);
        assert_eq!(LoginFocus::Remember.next(), LoginFocus::Button);
    }

    // -------------------------------------------------------------------------
    // Background results
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_results_from_previous_sign_in_are_dropped() {
        let mut background = Background::new();
        let first_user = background.sender();

        // User signs out and another signs in while a refresh is in flight
        background.advance();
        let second_user = background.sender();

        first_user.send(RefreshResult::Seniors(Vec::new())).await;
        second_user.send(RefreshResult::Error("second".to_string())).await;
        first_user.send(RefreshResult::RefreshComplete).await;

        assert!(matches!(background.try_next(), Some(RefreshResult::Error(ref m)) if m == "second"));
        assert!(background.try_next().is_none());
    }

    #[tokio::test]
    async fn test_current_results_arrive_in_order() {
        let mut background = Background::new();
        background.advance();
        let sender = background.sender();
        sender
            .send_fetch("Classes", Err(anyhow::anyhow!("offline")), RefreshResult::Classes)
            .await;
        sender.send(RefreshResult::RefreshComplete).await;

        assert!(matches!(background.try_next(), Some(RefreshResult::Error(ref m)) if m == "Classes: offline"));
        assert!(matches!(background.try_next(), Some(RefreshResult::RefreshComplete)));
        assert!(background.try_next().is_none());
    }

    // -------------------------------------------------------------------------
    // Action helpers
    // -------------------------------------------------------------------------

    #[test]
    fn test_pending_delete_description() {
        let pending = PendingDelete::Module {
            id: "m".to_string(),
            title: "Water Cycle".to_string(),
        };
        assert_eq!(pending.description(), "module \"Water Cycle\"");
    }

    #[test]
    fn test_describe_error_prefers_server_message() {
        let err = anyhow::Error::from(ApiError::Conflict("duplicate key value".to_string()));
        assert_eq!(describe_error(&err), "duplicate key value");

        let err = anyhow::anyhow!("offline").context("Failed to create class");
        assert_eq!(describe_error(&err), "Failed to create class: offline");
    }

    #[test]
    fn test_clamp_selection() {
        assert_eq!(clamp_selection(5, 3), 2);
        assert_eq!(clamp_selection(1, 3), 1);
        assert_eq!(clamp_selection(4, 0), 0);
    }

    #[test]
    fn test_next_progress_steps_and_caps() {
        assert_eq!(next_progress(None, Some(40)), (25.0, 10));
        assert_eq!(next_progress(None, None), (25.0, 0));

        let nearly = ModuleProgress {
            id: None,
            student_id: "s".to_string(),
            module_id: "m".to_string(),
            status: ProgressStatus::InProgress,
            progress_percentage: 90.0,
            time_spent_minutes: 30,
            last_accessed_at: None,
            completed_at: None,
        };
        assert_eq!(next_progress(Some(&nearly), Some(60)), (100.0, 36));
    }

    // -------------------------------------------------------------------------
    // Input Validation Tests
    // -------------------------------------------------------------------------

    #[test]
    fn test_can_add_email_char() {
        assert!(can_add_email_char(0, 'a'));
        assert!(can_add_email_char(99, '@'));
        assert!(!can_add_email_char(100, 'a'));
        assert!(!can_add_email_char(0, ' '));
        assert!(!can_add_email_char(0, '\x00'));
        assert!(!can_add_email_char(0, '\n'));
    }

    #[test]
    fn test_can_add_password_char() {
        assert!(can_add_password_char(0, 'a'));
        assert!(can_add_password_char(127, '!'));
        assert!(can_add_password_char(3, ' '));
        assert!(!can_add_password_char(128, 'a'));
        assert!(!can_add_password_char(0, '\r'));
    }
}
