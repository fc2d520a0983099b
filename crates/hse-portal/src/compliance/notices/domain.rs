use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::directory::domain::{EmployeeId, IdentityId};
use crate::targeting::{AudienceScope, Broadcast, ScopeDraft};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NoticeId(pub u64);

/// Announcement broadcast to an audience, optionally requiring acknowledgement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub id: NoticeId,
    pub title: String,
    pub content: String,
    pub scope: AudienceScope,
    pub requires_acknowledgement: bool,
    pub created_by: IdentityId,
    pub created_at: DateTime<Utc>,
    pub is_active: bool,
}

impl Broadcast for Notice {
    fn record_id(&self) -> u64 {
        self.id.0
    }

    fn audience(&self) -> &AudienceScope {
        &self.scope
    }

    fn is_active(&self) -> bool {
        self.is_active
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoticeDraft {
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(flatten)]
    pub scope: ScopeDraft,
    #[serde(default)]
    pub requires_acknowledgement: bool,
    #[serde(default = "active_by_default")]
    pub is_active: bool,
}

fn active_by_default() -> bool {
    true
}

/// Per-employee notice state: created on first view, acknowledged at most once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoticeRead {
    pub employee: EmployeeId,
    pub notice: NoticeId,
    pub read_at: DateTime<Utc>,
    pub acknowledged_at: Option<DateTime<Utc>>,
}

/// Entry of an employee's personal notice feed, as it looked before this view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NoticeItem {
    pub notice: Notice,
    pub read_at: Option<DateTime<Utc>>,
    pub is_unread: bool,
    pub is_acknowledged: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct NoticeMetrics {
    pub total_notices: usize,
    pub unread_notices: usize,
    pub unacknowledged_notices: usize,
}
