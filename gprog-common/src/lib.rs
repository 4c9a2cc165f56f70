//! # GPROG Common Library
//!
//! Shared code for the GPROG programming catalog:
//! - Error kinds used by the store and the HTTP layer
//! - Configuration loading and root folder resolution
//! - Database initialization, schema and seed data
//! - Date/time parsing helpers

pub mod config;
pub mod db;
pub mod error;
pub mod time;

pub use error::{map_unique_violation, Error, Result};
