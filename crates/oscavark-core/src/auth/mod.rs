//! Authentication module for accounts, roles and sessions.
//!
//! This module provides:
//! - `AuthApi`: login, registration, logout and session restore with the
//!   portal role check
//! - `Role` and the role-based `Route` table
//! - `Session`: token persistence with refresh before expiry
//! - `CredentialStore`: remembered passwords via the OS keyring

pub mod credentials;
pub mod error;
pub mod role;
pub mod routing;
pub mod service;
pub mod session;

pub use credentials::CredentialStore;
pub use error::AuthError;
pub use role::{Portal, Role};
pub use routing::{landing_route, resolve, Decision, Route, View};
pub use service::{check_role, AuthApi, AuthBackend, AuthContext, RegisterOutcome, LOGIN_TIMEOUT};
pub use session::{Session, SessionData};
