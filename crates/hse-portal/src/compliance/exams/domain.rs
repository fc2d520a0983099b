use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::directory::domain::{EmployeeId, IdentityId};
use crate::targeting::{AudienceScope, Broadcast, ScopeDraft};

/// Highest score a single question may award.
pub const MAX_QUESTION_SCORE: u32 = 1_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExamId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QuestionId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChoiceId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AttemptId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExamKind {
    /// Scored once per employee and stored.
    Official,
    /// Repeatable self-check; never stored as an attempt.
    Practice,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Exam {
    pub id: ExamId,
    pub title: String,
    pub description: String,
    pub kind: ExamKind,
    pub scope: AudienceScope,
    pub duration_minutes: u32,
    pub pass_score: u32,
    pub is_active: bool,
    pub created_by: IdentityId,
    pub created_at: DateTime<Utc>,
    /// Kept sorted by `order`.
    pub questions: Vec<Question>,
}

impl Exam {
    pub fn max_score(&self) -> u32 {
        self.questions
            .iter()
            .fold(0, |total: u32, question| total.saturating_add(question.score))
    }

    pub fn expires_at(&self, started_at: DateTime<Utc>) -> DateTime<Utc> {
        started_at + Duration::minutes(i64::from(self.duration_minutes))
    }

    /// Sum of the scores of correctly answered questions.
    pub fn score(&self, responses: &BTreeMap<QuestionId, ChoiceId>) -> u32 {
        self.questions
            .iter()
            .filter(|question| {
                responses
                    .get(&question.id)
                    .is_some_and(|choice| question.correct_choice() == Some(*choice))
            })
            .fold(0, |total: u32, question| total.saturating_add(question.score))
    }

    /// Every question offers at least two choices with exactly one correct.
    pub fn is_ready(&self) -> bool {
        self.questions.iter().all(|question| {
            question.choices.len() >= 2
                && question.choices.iter().filter(|choice| choice.is_correct).count() == 1
        })
    }
}

impl Broadcast for Exam {
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
pub struct Question {
    pub id: QuestionId,
    pub text: String,
    pub image_key: Option<String>,
    pub score: u32,
    pub order: u32,
    pub choices: Vec<Choice>,
}

impl Question {
    pub fn correct_choice(&self) -> Option<ChoiceId> {
        self.choices
            .iter()
            .find(|choice| choice.is_correct)
            .map(|choice| choice.id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Choice {
    pub id: ChoiceId,
    pub text: String,
    pub is_correct: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExamDraft {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub kind: ExamKind,
    #[serde(flatten)]
    pub scope: ScopeDraft,
    #[serde(default = "default_duration")]
    pub duration_minutes: u32,
    #[serde(default = "default_pass_score")]
    pub pass_score: u32,
    #[serde(default = "active_by_default")]
    pub is_active: bool,
}

fn default_duration() -> u32 {
    30
}

fn default_pass_score() -> u32 {
    60
}

fn active_by_default() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionDraft {
    pub text: String,
    #[serde(default)]
    pub image_key: Option<String>,
    #[serde(default = "default_question_score")]
    pub score: u32,
    pub order: u32,
    pub choices: Vec<ChoiceDraft>,
}

fn default_question_score() -> u32 {
    1
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChoiceDraft {
    pub text: String,
    #[serde(default)]
    pub is_correct: bool,
}

/// Stored official attempt; one per (exam, employee).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExamAttempt {
    pub id: AttemptId,
    pub exam: ExamId,
    pub employee: EmployeeId,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub responses: BTreeMap<QuestionId, ChoiceId>,
    pub total_score: u32,
    pub is_passed: bool,
}

/// Transient practice quiz bound to its owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PracticeSession {
    pub token: u64,
    pub exam: ExamId,
    pub employee: EmployeeId,
    pub started_at: DateTime<Utc>,
    pub responses: BTreeMap<QuestionId, ChoiceId>,
}

/// Public reference to an attempt in progress: `<id>` for official attempts and
/// `practice-<token>` for practice sessions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttemptHandle {
    Official(AttemptId),
    Practice(u64),
}

impl fmt::Display for AttemptHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttemptHandle::Official(id) => write!(f, "{}", id.0),
            AttemptHandle::Practice(token) => write!(f, "practice-{token}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("'{0}' is not an attempt handle")]
pub struct InvalidHandle(pub String);

impl FromStr for AttemptHandle {
    type Err = InvalidHandle;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let parsed = match raw.strip_prefix("practice-") {
            Some(token) => token.parse().map(AttemptHandle::Practice),
            None => raw.parse().map(|id| AttemptHandle::Official(AttemptId(id))),
        };
        parsed.map_err(|_| InvalidHandle(raw.to_string()))
    }
}

impl Serialize for AttemptHandle {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StartedAttempt {
    pub handle: AttemptHandle,
    pub exam: ExamId,
    pub kind: ExamKind,
    pub started_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub total_questions: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChoiceView {
    pub id: ChoiceId,
    pub text: String,
}

/// A question as shown to the examinee; correctness is never exposed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuestionView {
    pub handle: AttemptHandle,
    pub number: usize,
    pub total_questions: usize,
    pub text: String,
    pub image_key: Option<String>,
    pub score: u32,
    pub choices: Vec<ChoiceView>,
    pub selected: Option<ChoiceId>,
    pub remaining_seconds: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum QuestionStep {
    Question(QuestionView),
    /// The number is past the last question or the time ran out.
    FinishRequired { handle: AttemptHandle },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerDraft {
    pub choice: ChoiceId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExamResult {
    pub exam: ExamId,
    pub exam_title: String,
    pub total_score: u32,
    pub max_score: u32,
    pub pass_score: u32,
    pub is_passed: bool,
    pub is_practice: bool,
    pub completed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExamRemoval {
    Deleted,
    /// Official exams with stored attempts are only switched off.
    Deactivated,
}
