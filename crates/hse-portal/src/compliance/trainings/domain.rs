use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::directory::domain::{EmployeeId, IdentityId};
use crate::targeting::{AudienceScope, Broadcast, ScopeDraft};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrainingId(pub u64);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Training {
    pub id: TrainingId,
    pub title: String,
    pub description: String,
    pub scope: AudienceScope,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub trainer_name: String,
    pub required: bool,
    pub created_by: IdentityId,
    pub created_at: DateTime<Utc>,
    pub is_active: bool,
    pub materials: Vec<TrainingMaterial>,
}

impl Broadcast for Training {
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
pub struct TrainingMaterial {
    pub title: String,
    #[serde(flatten)]
    pub body: MaterialBody,
}

/// Uploaded files are referenced by storage key; text materials carry their content inline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MaterialBody {
    Image { file_key: String },
    Pdf { file_key: String },
    Text { content: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainingDraft {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(flatten)]
    pub scope: ScopeDraft,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default)]
    pub trainer_name: String,
    #[serde(default = "enabled")]
    pub required: bool,
    #[serde(default = "enabled")]
    pub is_active: bool,
    #[serde(default)]
    pub materials: Vec<TrainingMaterial>,
}

fn enabled() -> bool {
    true
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParticipationStatus {
    Assigned,
    Attended,
    Completed,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainingParticipation {
    pub training: TrainingId,
    pub employee: EmployeeId,
    pub status: ParticipationStatus,
    pub score: Option<u32>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl TrainingParticipation {
    pub fn assigned(training: TrainingId, employee: EmployeeId, now: DateTime<Utc>) -> Self {
        Self {
            training,
            employee,
            status: ParticipationStatus::Assigned,
            score: None,
            completed_at: None,
            created_at: now,
        }
    }

    /// Moves to `status`; `completed_at` is kept only while the status is `completed`.
    pub fn transition(&mut self, status: ParticipationStatus, now: DateTime<Utc>) {
        self.status = status;
        if status == ParticipationStatus::Completed {
            self.completed_at.get_or_insert(now);
        } else {
            self.completed_at = None;
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusUpdate {
    pub status: ParticipationStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultUpdate {
    pub status: ParticipationStatus,
    #[serde(default)]
    pub score: Option<u32>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SyncOutcome {
    pub created: usize,
    pub total_targets: usize,
}

/// A training with the participations visible to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrainingDetail {
    pub training: Training,
    pub participations: Vec<TrainingParticipation>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SavedTraining {
    pub training: Training,
    pub sync: SyncOutcome,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MyTraining {
    pub training: Training,
    pub participation: TrainingParticipation,
}
