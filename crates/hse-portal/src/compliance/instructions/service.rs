use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use tracing::info;

use super::domain::{
    AssignmentDraft, AssignmentOutcome, ComplianceStatus, Instruction, InstructionDraft,
    InstructionId, InstructionMetrics, InstructionRecord, InstructionRecordId, RecordView,
    MAX_VALIDITY_DAYS,
};
use super::repository::InstructionRepository;
use crate::access::{Caller, Role};
use crate::directory::DirectoryRepository;
use crate::error::ServiceError;
use crate::store::Sequence;
use crate::targeting::OrgSnapshot;
use crate::validation::{require_text, ValidationErrors};

static INSTRUCTION_IDS: Sequence = Sequence::new();
static RECORD_IDS: Sequence = Sequence::new();

pub struct InstructionService<S> {
    store: Arc<S>,
    due_soon_days: i64,
}

impl<S> InstructionService<S>
where
    S: InstructionRepository + DirectoryRepository + 'static,
{
    pub fn new(store: Arc<S>, due_soon_days: i64) -> Self {
        Self {
            store,
            due_soon_days,
        }
    }

    pub fn list(&self, caller: &Caller) -> Result<Vec<Instruction>, ServiceError> {
        caller.require_manager()?;
        let mut instructions = self.store.instructions()?;
        instructions.sort_by(|a, b| a.title.cmp(&b.title));
        Ok(instructions)
    }

    pub fn create(
        &self,
        caller: &Caller,
        draft: InstructionDraft,
        now: DateTime<Utc>,
    ) -> Result<Instruction, ServiceError> {
        caller.require_manager()?;
        let mut errors = ValidationErrors::new();
        let title = draft.title.trim().to_string();
        require_text(&mut errors, "title", &title);
        if !(1..=MAX_VALIDITY_DAYS).contains(&draft.validity_days) {
            errors.add(
                "validity_days",
                format!("validity must be between 1 and {MAX_VALIDITY_DAYS} days"),
            );
        }
        let instruction = errors.finish(Instruction {
            id: InstructionId(INSTRUCTION_IDS.next()),
            title,
            description: draft.description,
            kind: draft.kind,
            file_key: draft.file_key.filter(|key| !key.trim().is_empty()),
            validity_days: draft.validity_days,
            created_at: now,
        })?;
        let stored = self.store.insert_instruction(instruction)?;
        info!(instruction = stored.id.0, "instruction created");
        Ok(stored)
    }

    /// Every record with its status, soonest due first.
    pub fn records(
        &self,
        caller: &Caller,
        today: NaiveDate,
    ) -> Result<Vec<RecordView>, ServiceError> {
        caller.require_manager()?;
        let records = self.store.records()?;
        self.views(records, today)
    }

    /// Briefs everyone the scope reaches: new records are created, existing ones get the new
    /// completion date, a recomputed due date, and a cleared acknowledgement.
    pub fn assign(
        &self,
        caller: &Caller,
        id: InstructionId,
        draft: AssignmentDraft,
        now: DateTime<Utc>,
    ) -> Result<AssignmentOutcome, ServiceError> {
        caller.require_manager()?;
        let instruction = self
            .store
            .instruction(id)?
            .ok_or(ServiceError::NotFound("instruction"))?;
        let org = OrgSnapshot::load(self.store.as_ref())?;
        let mut errors = ValidationErrors::new();
        let scope = draft.scope.resolve(&org, &mut errors);
        let scope = match scope {
            Some(scope) if errors.is_empty() => scope,
            _ => return Err(errors.into()),
        };

        let today = now.date_naive();
        let next_due_date = instruction
            .next_due(draft.completed_date, today)
            .ok_or_else(out_of_calendar)?;
        let records: Vec<InstructionRecord> = org
            .employees_for(&scope)
            .into_iter()
            .map(|employee| InstructionRecord {
                id: InstructionRecordId(RECORD_IDS.next()),
                employee,
                instruction: id,
                completed_date: draft.completed_date,
                next_due_date,
                acknowledged_date: None,
                created_at: now,
            })
            .collect();

        let outcome = self.store.upsert_records(records)?;
        info!(
            instruction = id.0,
            created = outcome.created,
            updated = outcome.updated,
            "instruction assigned"
        );
        Ok(outcome)
    }

    pub fn my_records(
        &self,
        caller: &Caller,
        today: NaiveDate,
    ) -> Result<Vec<RecordView>, ServiceError> {
        caller.require(Role::EMPLOYEES)?;
        let Some(employee) = caller.employee else {
            return Ok(Vec::new());
        };
        let records = self.store.records_for_employee(employee)?;
        self.views(records, today)
    }

    pub fn acknowledge(
        &self,
        caller: &Caller,
        id: InstructionRecordId,
        today: NaiveDate,
    ) -> Result<InstructionRecord, ServiceError> {
        caller.require(Role::EMPLOYEES)?;
        let employee = caller.employee.ok_or(ServiceError::NotFound("record"))?;
        let record = self
            .store
            .records_for_employee(employee)?
            .into_iter()
            .find(|record| record.id == id)
            .ok_or(ServiceError::NotFound("record"))?;
        if record.acknowledged_date.is_some() {
            return Ok(record);
        }
        let instruction = self
            .store
            .instruction(record.instruction)?
            .ok_or(ServiceError::NotFound("instruction"))?;
        let next_due_date = instruction
            .next_due(record.completed_date, today)
            .ok_or_else(out_of_calendar)?;
        Ok(self.store.acknowledge_record(id, today, next_due_date)?)
    }

    pub fn metrics(
        &self,
        caller: &Caller,
        today: NaiveDate,
    ) -> Result<InstructionMetrics, ServiceError> {
        caller.require_manager()?;
        let records = self.store.records()?;
        Ok(self.tally(&records, today))
    }

    /// Status counts over the given records.
    pub fn tally(&self, records: &[InstructionRecord], today: NaiveDate) -> InstructionMetrics {
        let mut metrics = InstructionMetrics::default();
        for record in records {
            match record.status(today, self.due_soon_days) {
                ComplianceStatus::Valid => metrics.valid += 1,
                ComplianceStatus::DueSoon => metrics.due_soon += 1,
                ComplianceStatus::Overdue => metrics.overdue += 1,
            }
        }
        metrics
    }

    fn views(
        &self,
        mut records: Vec<InstructionRecord>,
        today: NaiveDate,
    ) -> Result<Vec<RecordView>, ServiceError> {
        let titles: HashMap<InstructionId, String> = self
            .store
            .instructions()?
            .into_iter()
            .map(|instruction| (instruction.id, instruction.title))
            .collect();
        records.sort_by(|a, b| {
            a.next_due_date
                .cmp(&b.next_due_date)
                .then(b.created_at.cmp(&a.created_at))
        });

        Ok(records
            .into_iter()
            .map(|record| RecordView {
                instruction_title: titles.get(&record.instruction).cloned().unwrap_or_default(),
                status: record.status(today, self.due_soon_days),
                record,
            })
            .collect())
    }
}

fn out_of_calendar() -> ServiceError {
    ValidationErrors::single("completed_date", "due date falls past the supported calendar").into()
}
