//! Local caching module for offline data access.
//!
//! This module provides the `CacheManager` for storing and retrieving the
//! last loaded registry, module and dashboard data. Data is cached as JSON
//! per user and considered stale after 60 minutes.
//!
//! Cached data types include:
//! - Senior citizens, beneficiaries and a senior's own record
//! - VARK modules, module progress and classes
//! - Dashboard statistics for every role

pub mod manager;

pub use manager::{CacheManager, CachedData};
