//! Non-interactive commands: `--stats`, `--register` and `--logout`.
//!
//! These run before the terminal UI takes over, prompt on stdin/stderr and
//! log to stderr.

use std::io::{self, BufRead, Write};

use anyhow::{anyhow, Context, Result};
use tracing::{info, warn};

use oscavark_core::api::SupabaseClient;
use oscavark_core::auth::{AuthApi, AuthContext, AuthError, CredentialStore, RegisterOutcome, Role, Session};
use oscavark_core::cache::CacheManager;
use oscavark_core::config::Config;
use oscavark_core::models::LearningStyle;
use oscavark_core::services::{
    RegistryScope, SeniorAffairsDashboardApi, StudentDashboardApi, TeacherDashboardApi,
};
use oscavark_core::validation::{LoginForm, RegisterForm};

use crate::app::NO_BARANGAY_MESSAGE;

/// A command-line action picked from the first argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Stats,
    Register,
    Logout,
}

impl Command {
    pub fn parse(arg: &str) -> Option<Self> {
        match arg {
            "--stats" => Some(Command::Stats),
            "--register" => Some(Command::Register),
            "--logout" => Some(Command::Logout),
            _ => None,
        }
    }
}

pub async fn run(command: Command) -> Result<()> {
    let mut config = Config::load().unwrap_or_default();
    let settings = config
        .supabase_settings()
        .context("Supabase is not configured")?;
    let client = SupabaseClient::new(&settings)?;
    let mut session = Session::new(config.cache_dir()?);
    if let Err(e) = session.load() {
        warn!(error = %e, "Failed to load saved session");
    }
    let api = AuthApi::new(client.clone());

    match command {
        Command::Stats => {
            let ctx = match api.restore(&mut session).await? {
                Some(ctx) => ctx,
                None => prompt_login(&api, &mut config, &mut session).await?,
            };
            print_stats(&client, &ctx).await
        }
        Command::Register => register(&api, &mut config).await,
        Command::Logout => logout(&api, &config, &mut session).await,
    }
}

fn prompt(label: &str, default: Option<&str>) -> Result<String> {
    match default {
        Some(value) if !value.is_empty() => eprint!("{} [{}]: ", label, value),
        _ => eprint!("{}: ", label),
    }
    io::stderr().flush()?;

    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    let line = line.trim().to_string();
    if line.is_empty() {
        Ok(default.unwrap_or_default().to_string())
    } else {
        Ok(line)
    }
}

fn prompt_role(default: Option<Role>) -> Result<Role> {
    let input = prompt(
        "Portal (osca/basca/senior/teacher/student)",
        default.map(|r| r.as_str()),
    )?;
    Role::parse(&input).ok_or_else(|| anyhow!("Unknown portal: {}", input))
}

async fn prompt_login(
    api: &AuthApi,
    config: &mut Config,
    session: &mut Session,
) -> Result<AuthContext> {
    let email = prompt("Email", config.last_email.as_deref())?;
    let role = prompt_role(config.last_role)?;
    let password = match CredentialStore::get_password(&email) {
        Ok(password) => password,
        Err(_) => rpassword::prompt_password("Password: ")?,
    };

    let form = LoginForm {
        email,
        password,
        role: Some(role),
    };
    let ctx = api.login(&form).await?;

    session.update(ctx.session.clone());
    if let Err(e) = session.save() {
        warn!(error = %e, "Failed to save session");
    }
    config.last_email = Some(ctx.session.email.clone());
    config.last_role = Some(ctx.role);
    if let Err(e) = config.save() {
        warn!(error = %e, "Failed to save config");
    }
    info!(user_id = %ctx.user_id(), role = ctx.role.as_str(), "Signed in from the command line");
    Ok(ctx)
}

async fn print_stats(client: &SupabaseClient, ctx: &AuthContext) -> Result<()> {
    let client = client.with_token(ctx.session.access_token.clone());
    eprintln!("{} ({})", ctx.display_name(), ctx.role.display_name());

    let json = match ctx.role {
        Role::Osca | Role::Basca => {
            let scope = RegistryScope::for_context(ctx).unwrap_or(RegistryScope::Unassigned);
            if scope == RegistryScope::Unassigned {
                eprintln!("{}", NO_BARANGAY_MESSAGE);
            }
            serde_json::to_string_pretty(&SeniorAffairsDashboardApi::new(client).stats(&scope).await)?
        }
        Role::Senior => serde_json::to_string_pretty(
            &SeniorAffairsDashboardApi::new(client)
                .my_record(ctx.user_id())
                .await,
        )?,
        Role::Teacher => {
            serde_json::to_string_pretty(&TeacherDashboardApi::new(client).stats(ctx.user_id()).await)?
        }
        Role::Student => {
            serde_json::to_string_pretty(&StudentDashboardApi::new(client).stats(ctx.user_id()).await)?
        }
    };
    println!("{}", json);
    Ok(())
}

async fn register(api: &AuthApi, config: &mut Config) -> Result<()> {
    let email = prompt("Email", None)?;
    let password = rpassword::prompt_password("Password: ")?;
    let confirm_password = rpassword::prompt_password("Confirm password: ")?;
    let first_name = prompt("First name", None)?;
    let last_name = prompt("Last name", None)?;
    let role = prompt_role(None)?;
    let barangay = if role.requires_barangay() {
        prompt("Barangay", None)?
    } else {
        String::new()
    };
    let learning_style = if role == Role::Student {
        LearningStyle::parse(&prompt(
            "Learning style (visual/auditory/reading_writing/kinesthetic, blank to skip)",
            None,
        )?)
    } else {
        None
    };

    let form = RegisterForm {
        email,
        password,
        confirm_password,
        first_name,
        last_name,
        role: Some(role),
        barangay,
        learning_style,
    };

    match api.register(&form).await {
        Ok(RegisterOutcome::SignedIn(ctx)) => {
            config.last_email = Some(ctx.session.email.clone());
            config.last_role = Some(ctx.role);
            if let Err(e) = config.save() {
                warn!(error = %e, "Failed to save config");
            }
            eprintln!("Account created for {}. Run `oscavark` to sign in.", ctx.display_name());
            Ok(())
        }
        Ok(RegisterOutcome::ConfirmationRequired { email }) => {
            config.last_email = Some(email.clone());
            config.last_role = Some(role);
            if let Err(e) = config.save() {
                warn!(error = %e, "Failed to save config");
            }
            eprintln!("Check {} to confirm your account before signing in.", email);
            Ok(())
        }
        Err(AuthError::Validation(errors)) => {
            for error in errors.errors() {
                eprintln!("  {}: {}", error.field, error.message);
            }
            Err(anyhow!("Registration form has {} problem(s)", errors.len()))
        }
        Err(e) => Err(e.into()),
    }
}

async fn logout(api: &AuthApi, config: &Config, session: &mut Session) -> Result<()> {
    let user = session
        .data
        .as_ref()
        .map(|d| (d.user_id.clone(), d.email.clone()));
    api.logout(session).await?;

    let Some((user_id, email)) = user else {
        eprintln!("No saved session.");
        return Ok(());
    };
    match config.user_cache_dir(&user_id).and_then(CacheManager::new) {
        Ok(cache) => {
            if let Err(e) = cache.clear() {
                warn!(error = %e, "Failed to clear cache");
            }
        }
        Err(e) => warn!(error = %e, "Cache unavailable"),
    }
    if CredentialStore::has_credentials(&email) {
        CredentialStore::delete(&email)?;
    }
    eprintln!("Signed out {}.", email);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_parse() {
        assert_eq!(Command::parse("--stats"), Some(Command::Stats));
        assert_eq!(Command::parse("--register"), Some(Command::Register));
        assert_eq!(Command::parse("--logout"), Some(Command::Logout));
        assert_eq!(Command::parse("/osca/seniors"), None);
        assert_eq!(Command::parse("--help"), None);
    }
}
