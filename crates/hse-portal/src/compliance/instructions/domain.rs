use chrono::{DateTime, Days, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::directory::domain::EmployeeId;
use crate::targeting::ScopeDraft;

/// Longest re-briefing interval an instruction may carry.
pub const MAX_VALIDITY_DAYS: u32 = 36_500;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InstructionId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InstructionRecordId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstructionKind {
    Organization,
    Department,
    Position,
}

/// Safety instruction that employees must be briefed on again every `validity_days`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instruction {
    pub id: InstructionId,
    pub title: String,
    pub description: String,
    pub kind: InstructionKind,
    pub file_key: Option<String>,
    pub validity_days: u32,
    pub created_at: DateTime<Utc>,
}

impl Instruction {
    /// Due date counted from the completion date, or from `today` when none was recorded.
    /// `None` when the result falls past the last representable date.
    pub fn next_due(&self, completed: Option<NaiveDate>, today: NaiveDate) -> Option<NaiveDate> {
        completed
            .unwrap_or(today)
            .checked_add_days(Days::new(u64::from(self.validity_days)))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstructionDraft {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub kind: InstructionKind,
    #[serde(default)]
    pub file_key: Option<String>,
    #[serde(default = "default_validity")]
    pub validity_days: u32,
}

fn default_validity() -> u32 {
    365
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstructionRecord {
    pub id: InstructionRecordId,
    pub employee: EmployeeId,
    pub instruction: InstructionId,
    pub completed_date: Option<NaiveDate>,
    pub next_due_date: NaiveDate,
    pub acknowledged_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
}

impl InstructionRecord {
    pub fn status(&self, today: NaiveDate, due_soon_days: i64) -> ComplianceStatus {
        if self.next_due_date < today {
            return ComplianceStatus::Overdue;
        }
        // A window reaching past the calendar's end covers every remaining date.
        let within_window = match u64::try_from(due_soon_days) {
            Ok(days) => today
                .checked_add_days(Days::new(days))
                .map_or(true, |limit| self.next_due_date <= limit),
            Err(_) => false,
        };
        if within_window {
            ComplianceStatus::DueSoon
        } else {
            ComplianceStatus::Valid
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComplianceStatus {
    Valid,
    DueSoon,
    Overdue,
}

/// Briefing handed to everyone a scope reaches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignmentDraft {
    #[serde(flatten)]
    pub scope: ScopeDraft,
    #[serde(default)]
    pub completed_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AssignmentOutcome {
    pub created: usize,
    pub updated: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordView {
    pub record: InstructionRecord,
    pub instruction_title: String,
    pub status: ComplianceStatus,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct InstructionMetrics {
    pub valid: usize,
    pub due_soon: usize,
    pub overdue: usize,
}
