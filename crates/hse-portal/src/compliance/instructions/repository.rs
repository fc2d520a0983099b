use chrono::NaiveDate;

use super::domain::{
    AssignmentOutcome, Instruction, InstructionId, InstructionRecord, InstructionRecordId,
};
use crate::directory::domain::EmployeeId;
use crate::store::RepositoryError;

pub trait InstructionRepository: Send + Sync {
    fn instructions(&self) -> Result<Vec<Instruction>, RepositoryError>;
    fn instruction(&self, id: InstructionId) -> Result<Option<Instruction>, RepositoryError>;
    fn insert_instruction(&self, instruction: Instruction) -> Result<Instruction, RepositoryError>;

    fn records(&self) -> Result<Vec<InstructionRecord>, RepositoryError>;
    fn records_for_employee(
        &self,
        employee: EmployeeId,
    ) -> Result<Vec<InstructionRecord>, RepositoryError>;
    /// Writes every record in one batch. A record whose (employee, instruction) pair already
    /// exists refreshes the stored row, keeping its id and creation time.
    fn upsert_records(
        &self,
        records: Vec<InstructionRecord>,
    ) -> Result<AssignmentOutcome, RepositoryError>;
    /// Stamps the acknowledgement date and the recomputed due date. Records that are already
    /// acknowledged are returned unchanged.
    fn acknowledge_record(
        &self,
        id: InstructionRecordId,
        on: NaiveDate,
        next_due_date: NaiveDate,
    ) -> Result<InstructionRecord, RepositoryError>;
}
