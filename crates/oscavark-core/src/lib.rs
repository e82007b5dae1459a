//! Core library for the OSCA senior-citizen registry and the VARK learning
//! portal, both backed by one Supabase project.

pub mod api;
pub mod auth;
pub mod cache;
pub mod config;
pub mod models;
pub mod services;
pub mod utils;
pub mod validation;
