use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A bot user. `fake_id` is the only identifier ever shown outside
/// admin channels; `tg_id` stays private to the ledger and refund flow.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub tg_id: i64,
    pub fake_id: i64,
    pub created_at: DateTime<Utc>,
}
