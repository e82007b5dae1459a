//! REST client module for the hosted Supabase backend.
//!
//! This module provides the `SupabaseClient` for talking to the auth
//! service (GoTrue) and the table API (PostgREST), plus the `Query`
//! builder used by every feature API to express filters.
//!
//! Requests carry the project's anon key as `apikey` and, once signed in,
//! the user's JWT as the bearer token so row-level policies apply.

pub mod client;
pub mod error;
pub mod query;

pub use client::{AuthUser, SignUpOutcome, SupabaseClient};
pub use error::ApiError;
pub use query::Query;
