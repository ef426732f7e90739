/// Database models for TaskDesk
///
/// Each model is a plain row struct implementing
/// [`Entity`](crate::db::repository::Entity), plus the entity-specific
/// repository queries that go with it.
///
/// # Models
///
/// - `user`: User accounts
/// - `task`: Tasks, the joined `TaskDetails` read model, and search filters

pub mod task;
pub mod user;

use chrono::{DateTime, SubsecRound, Utc};

/// Current time at the precision PostgreSQL stores (microseconds)
///
/// Values written with this timestamp compare equal after a round trip.
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}
