use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Wisp status marking a work item currently held by an agent.
pub const WISP_STATUS_IN_PROGRESS: &str = "in_progress";

/// A tracked work item as served by a rig's wisp store.
///
/// Wisps are owned externally; boomtown diagnostics only read them. Status
/// is an open string set decided by the store, so it is kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wisp {
    pub id: String,
    #[serde(default)]
    pub title: String,
    pub status: String,
    pub updated_at: DateTime<Utc>,
}

impl Wisp {
    pub fn is_in_progress(&self) -> bool {
        self.status == WISP_STATUS_IN_PROGRESS
    }

    /// Time elapsed since the wisp was last updated.
    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        now.signed_duration_since(self.updated_at)
    }
}

/// Render an age as a compact human-readable string, e.g. `2h05m` or `42m`.
pub fn format_age(age: Duration) -> String {
    let mins = age.num_minutes().max(0);
    if mins >= 60 {
        format!("{}h{:02}m", mins / 60, mins % 60)
    } else {
        format!("{}m", mins)
    }
}
