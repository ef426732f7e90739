//! # TaskDesk Shared Library
//!
//! Domain types, persistence and business logic behind the TaskDesk API.
//!
//! ## Module Organization
//!
//! - `auth`: Password hashing, JWT issuance/validation, bearer middleware
//! - `db`: Connection pool, migrations, seed data, repositories, unit of work
//! - `models`: Users and tasks, plus their task-specific queries
//! - `services`: `AuthService` and `TaskService`

pub mod auth;
pub mod db;
pub mod models;
pub mod services;

/// Current version of the TaskDesk shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
