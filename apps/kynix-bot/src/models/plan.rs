use chrono::{DateTime, Utc};

/// What kind of access grant is being provisioned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanKind {
    TimeBoxed { days: i64 },
    Permanent,
}

impl PlanKind {
    /// Plan label embedded in the connection URI fragment.
    pub fn tag(&self) -> &'static str {
        match self {
            PlanKind::TimeBoxed { .. } => "Plus",
            PlanKind::Permanent => "Inf",
        }
    }

    /// Credential expiry in epoch milliseconds; 0 means never expires.
    pub fn expiry_millis(&self, now: DateTime<Utc>) -> i64 {
        match self {
            PlanKind::TimeBoxed { days } => now.timestamp_millis() + days * 86_400_000,
            PlanKind::Permanent => 0,
        }
    }
}
