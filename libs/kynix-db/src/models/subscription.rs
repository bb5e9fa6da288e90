use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One access grant. Immutable after creation except for `active` and
/// `closed_at`. `expires_at = NULL` means the grant never expires.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Subscription {
    pub id: i64,
    pub user_id: i64,
    pub active: bool,
    pub expires_at: Option<DateTime<Utc>>,
    /// Opaque identifier the panel assigned to the credential.
    pub xui_client_id: String,
    /// Panel-side tag of the credential (the user's fake id).
    pub xui_email: String,
    /// Connection URI handed to the user verbatim.
    pub xui_config: String,
    pub created_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
}

impl Subscription {
    pub fn is_permanent(&self) -> bool {
        self.expires_at.is_none()
    }
}

/// Credential details carried from the panel into a new ledger row.
#[derive(Debug, Clone)]
pub struct NewCredential {
    pub client_id: String,
    pub email: String,
    pub config: String,
}
