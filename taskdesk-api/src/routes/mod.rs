/// API route handlers
///
/// - `health`: Health check endpoint
/// - `auth`: Registration and login
/// - `tasks`: Task CRUD and search

pub mod auth;
pub mod health;
pub mod tasks;
