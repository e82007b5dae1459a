use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::Role;

/// Session file name in cache directory
const SESSION_FILE: &str = "session.json";

/// Treat tokens as expired this many seconds early to absorb clock skew.
const EXPIRY_SKEW_SECONDS: i64 = 30;

/// Refresh when fewer than this many minutes remain.
const TOKEN_REFRESH_BUFFER_MINUTES: i64 = 5;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionData {
    pub access_token: String,
    pub refresh_token: String,
    pub user_id: String,
    pub email: String,
    pub expires_at: DateTime<Utc>,
    /// Role confirmed at login, kept so offline starts can route.
    #[serde(default)]
    pub role: Option<Role>,
}

impl SessionData {
    pub fn is_expired(&self) -> bool {
        Utc::now() + Duration::seconds(EXPIRY_SKEW_SECONDS) > self.expires_at
    }

    /// Check if the session will expire soon and should be refreshed
    pub fn needs_refresh(&self) -> bool {
        Utc::now() + Duration::minutes(TOKEN_REFRESH_BUFFER_MINUTES) > self.expires_at
    }

    pub fn time_until_expiry(&self) -> Duration {
        self.expires_at - Utc::now()
    }

    /// Get minutes remaining until expiry (for display)
    pub fn minutes_until_expiry(&self) -> i64 {
        self.time_until_expiry().num_minutes().max(0)
    }

    pub fn can_refresh(&self) -> bool {
        !self.refresh_token.is_empty()
    }
}

pub struct Session {
    cache_dir: PathBuf,
    pub data: Option<SessionData>,
}

impl Session {
    pub fn new(cache_dir: PathBuf) -> Self {
        Self {
            cache_dir,
            data: None,
        }
    }

    /// Load session from disk. Expired sessions are kept when they can still
    /// be refreshed. Returns whether usable data was loaded.
    pub fn load(&mut self) -> Result<bool> {
        let path = self.session_path();
        if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .context("Failed to read session file")?;
            let data: SessionData = serde_json::from_str(&contents)
                .context("Failed to parse session file")?;

            if !data.is_expired() || data.can_refresh() {
                self.data = Some(data);
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Save session to disk
    pub fn save(&self) -> Result<()> {
        if let Some(ref data) = self.data {
            let path = self.session_path();
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let contents = serde_json::to_string_pretty(data)?;
            std::fs::write(path, contents)?;
        }
        Ok(())
    }

    /// Clear session data
    pub fn clear(&mut self) -> Result<()> {
        self.data = None;
        let path = self.session_path();
        if path.exists() {
            std::fs::remove_file(path)?;
        }
        Ok(())
    }

    /// Update session with new data
    pub fn update(&mut self, data: SessionData) {
        self.data = Some(data);
    }

    /// Get the bearer token if a session exists
    pub fn token(&self) -> Option<&str> {
        self.data.as_ref().map(|d| d.access_token.as_str())
    }

    pub fn user_id(&self) -> Option<&str> {
        self.data.as_ref().map(|d| d.user_id.as_str())
    }

    /// Check if session is valid (exists and not expired)
    pub fn is_valid(&self) -> bool {
        self.data.as_ref().map(|d| !d.is_expired()).unwrap_or(false)
    }

    fn session_path(&self) -> PathBuf {
        self.cache_dir.join(SESSION_FILE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data(expires_in_minutes: i64, refresh: &str) -> SessionData {
        SessionData {
            access_token: "jwt".to_string(),
            refresh_token: refresh.to_string(),
            user_id: "u1".to_string(),
            email: "osca@example.ph".to_string(),
            expires_at: Utc::now() + Duration::minutes(expires_in_minutes),
            role: Some(Role::Osca),
        }
    }

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "oscavark-session-{}-{}",
            name,
            std::process::id()
        ));
        let _ = std::fs::remove_dir_all(&dir);
        dir
    }

    #[test]
    fn test_expiry_checks() {
        let fresh = data(60, "r");
        assert!(!fresh.is_expired());
        assert!(!fresh.needs_refresh());
        assert!(fresh.minutes_until_expiry() >= 59);

        let soon = data(3, "r");
        assert!(!soon.is_expired());
        assert!(soon.needs_refresh());

        let gone = data(-1, "r");
        assert!(gone.is_expired());
        assert_eq!(gone.minutes_until_expiry(), 0);
    }

    #[test]
    fn test_save_load_clear() {
        let dir = temp_dir("roundtrip");
        let mut session = Session::new(dir.clone());
        session.update(data(60, "r"));
        session.save().expect("save");

        let mut loaded = Session::new(dir.clone());
        assert!(loaded.load().expect("load"));
        assert_eq!(loaded.token(), Some("jwt"));
        assert_eq!(loaded.user_id(), Some("u1"));
        assert!(loaded.is_valid());

        loaded.clear().expect("clear");
        assert!(loaded.data.is_none());
        let mut again = Session::new(dir.clone());
        assert!(!again.load().expect("load"));
        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn test_expired_session_kept_only_if_refreshable() {
        let dir = temp_dir("expired");
        let mut session = Session::new(dir.clone());
        session.update(data(-10, "refresh"));
        session.save().expect("save");
        let mut loaded = Session::new(dir.clone());
        assert!(loaded.load().expect("load"));
        assert!(!loaded.is_valid());

        session.update(data(-10, ""));
        session.save().expect("save");
        let mut loaded = Session::new(dir.clone());
        assert!(!loaded.load().expect("load"));
        let _ = std::fs::remove_dir_all(dir);
    }
}
