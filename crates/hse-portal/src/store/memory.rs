use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, NaiveDate, Utc};
use tracing::warn;

use super::RepositoryError;
use crate::compliance::exams::{
    AttemptId, Exam, ExamAttempt, ExamId, ExamRepository, PracticeSession,
};
use crate::compliance::instructions::{
    AssignmentOutcome, Instruction, InstructionId, InstructionRecord, InstructionRecordId,
    InstructionRepository,
};
use crate::compliance::notices::{Notice, NoticeId, NoticeRead, NoticeRepository};
use crate::compliance::trainings::{
    Training, TrainingId, TrainingParticipation, TrainingRepository,
};
use crate::directory::domain::{
    Department, DepartmentId, Employee, EmployeeId, Identity, IdentityId, Location, LocationId,
    Position, PositionId,
};
use crate::directory::DirectoryRepository;

#[derive(Debug, Default)]
struct PortalState {
    departments: BTreeMap<DepartmentId, Department>,
    positions: BTreeMap<PositionId, Position>,
    locations: BTreeMap<LocationId, Location>,
    identities: BTreeMap<IdentityId, Identity>,
    employees: BTreeMap<EmployeeId, Employee>,
    notices: BTreeMap<NoticeId, Notice>,
    notice_reads: BTreeMap<(NoticeId, EmployeeId), NoticeRead>,
    trainings: BTreeMap<TrainingId, Training>,
    participations: BTreeMap<(TrainingId, EmployeeId), TrainingParticipation>,
    exams: BTreeMap<ExamId, Exam>,
    attempts: BTreeMap<AttemptId, ExamAttempt>,
    practice_sessions: BTreeMap<u64, PracticeSession>,
    instructions: BTreeMap<InstructionId, Instruction>,
    instruction_records: BTreeMap<InstructionRecordId, InstructionRecord>,
}

/// Process-local store backing every repository trait. Each call takes the lock once, so batch
/// writes are applied entirely or not at all.
#[derive(Debug, Default)]
pub struct InMemoryPortalStore {
    state: Mutex<PortalState>,
}

impl InMemoryPortalStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> Result<MutexGuard<'_, PortalState>, RepositoryError> {
        self.state.lock().map_err(|_| {
            warn!("portal store lock poisoned");
            RepositoryError::Unavailable("portal store lock poisoned".to_string())
        })
    }
}

/// Inserts participations whose (training, employee) pair is new; returns how many were added.
fn add_participations(
    state: &mut PortalState,
    participations: Vec<TrainingParticipation>,
) -> usize {
    let mut created = 0;
    for participation in participations {
        let key = (participation.training, participation.employee);
        if !state.participations.contains_key(&key) {
            state.participations.insert(key, participation);
            created += 1;
        }
    }
    created
}

fn replace<K: Ord, V>(map: &mut BTreeMap<K, V>, key: K, value: V) -> Result<(), RepositoryError> {
    match map.get_mut(&key) {
        Some(slot) => {
            *slot = value;
            Ok(())
        }
        None => Err(RepositoryError::NotFound),
    }
}

impl DirectoryRepository for InMemoryPortalStore {
    fn departments(&self) -> Result<Vec<Department>, RepositoryError> {
        Ok(self.state()?.departments.values().cloned().collect())
    }

    fn insert_department(&self, department: Department) -> Result<Department, RepositoryError> {
        let mut state = self.state()?;
        if state.departments.contains_key(&department.id)
            || state
                .departments
                .values()
                .any(|existing| existing.name == department.name)
        {
            return Err(RepositoryError::Conflict);
        }
        state.departments.insert(department.id, department.clone());
        Ok(department)
    }

    fn update_department(&self, department: Department) -> Result<(), RepositoryError> {
        let mut state = self.state()?;
        if state
            .departments
            .values()
            .any(|existing| existing.name == department.name && existing.id != department.id)
        {
            return Err(RepositoryError::Conflict);
        }
        replace(&mut state.departments, department.id, department)
    }

    fn remove_department(&self, id: DepartmentId) -> Result<(), RepositoryError> {
        let mut state = self.state()?;
        if state.departments.remove(&id).is_none() {
            return Err(RepositoryError::NotFound);
        }
        for department in state.departments.values_mut() {
            if department.parent == Some(id) {
                department.parent = None;
            }
        }
        for employee in state.employees.values_mut() {
            if employee.department == Some(id) {
                employee.department = None;
            }
        }
        for notice in state.notices.values_mut() {
            notice.scope.without_department(id);
        }
        for training in state.trainings.values_mut() {
            training.scope.without_department(id);
        }
        for exam in state.exams.values_mut() {
            exam.scope.without_department(id);
        }
        Ok(())
    }

    fn positions(&self) -> Result<Vec<Position>, RepositoryError> {
        Ok(self.state()?.positions.values().cloned().collect())
    }

    fn insert_position(&self, position: Position) -> Result<Position, RepositoryError> {
        let mut state = self.state()?;
        if state.positions.contains_key(&position.id)
            || state
                .positions
                .values()
                .any(|existing| existing.name == position.name)
        {
            return Err(RepositoryError::Conflict);
        }
        state.positions.insert(position.id, position.clone());
        Ok(position)
    }

    fn locations(&self) -> Result<Vec<Location>, RepositoryError> {
        Ok(self.state()?.locations.values().cloned().collect())
    }

    fn insert_location(&self, location: Location) -> Result<Location, RepositoryError> {
        let mut state = self.state()?;
        if state.locations.contains_key(&location.id)
            || state
                .locations
                .values()
                .any(|existing| existing.name == location.name && existing.kind == location.kind)
        {
            return Err(RepositoryError::Conflict);
        }
        state.locations.insert(location.id, location.clone());
        Ok(location)
    }

    fn identity(&self, id: IdentityId) -> Result<Option<Identity>, RepositoryError> {
        Ok(self.state()?.identities.get(&id).cloned())
    }

    fn identity_by_username(&self, username: &str) -> Result<Option<Identity>, RepositoryError> {
        Ok(self
            .state()?
            .identities
            .values()
            .find(|identity| identity.username == username)
            .cloned())
    }

    fn insert_identity(&self, identity: Identity) -> Result<Identity, RepositoryError> {
        let mut state = self.state()?;
        if state.identities.contains_key(&identity.id)
            || state
                .identities
                .values()
                .any(|existing| existing.username == identity.username)
        {
            return Err(RepositoryError::Conflict);
        }
        state.identities.insert(identity.id, identity.clone());
        Ok(identity)
    }

    fn employees(&self) -> Result<Vec<Employee>, RepositoryError> {
        Ok(self.state()?.employees.values().cloned().collect())
    }

    fn employee(&self, id: EmployeeId) -> Result<Option<Employee>, RepositoryError> {
        Ok(self.state()?.employees.get(&id).cloned())
    }

    fn employee_for_identity(
        &self,
        identity: IdentityId,
    ) -> Result<Option<Employee>, RepositoryError> {
        Ok(self
            .state()?
            .employees
            .values()
            .find(|employee| employee.identity == identity)
            .cloned())
    }

    fn insert_employee(&self, employee: Employee) -> Result<Employee, RepositoryError> {
        let mut state = self.state()?;
        let clash = state.employees.contains_key(&employee.id)
            || state.employees.values().any(|existing| {
                existing.identity == employee.identity
                    || (employee.register.is_some() && existing.register == employee.register)
            });
        if clash {
            return Err(RepositoryError::Conflict);
        }
        state.employees.insert(employee.id, employee.clone());
        Ok(employee)
    }

    fn update_employee(&self, employee: Employee) -> Result<(), RepositoryError> {
        let mut state = self.state()?;
        let clash = state.employees.values().any(|existing| {
            existing.id != employee.id
                && employee.register.is_some()
                && existing.register == employee.register
        });
        if clash {
            return Err(RepositoryError::Conflict);
        }
        replace(&mut state.employees, employee.id, employee)
    }
}

impl NoticeRepository for InMemoryPortalStore {
    fn notices(&self) -> Result<Vec<Notice>, RepositoryError> {
        Ok(self.state()?.notices.values().cloned().collect())
    }

    fn notice(&self, id: NoticeId) -> Result<Option<Notice>, RepositoryError> {
        Ok(self.state()?.notices.get(&id).cloned())
    }

    fn insert_notice(&self, notice: Notice) -> Result<Notice, RepositoryError> {
        let mut state = self.state()?;
        if state.notices.contains_key(&notice.id) {
            return Err(RepositoryError::Conflict);
        }
        state.notices.insert(notice.id, notice.clone());
        Ok(notice)
    }

    fn update_notice(&self, notice: Notice) -> Result<(), RepositoryError> {
        replace(&mut self.state()?.notices, notice.id, notice)
    }

    fn remove_notice(&self, id: NoticeId) -> Result<(), RepositoryError> {
        let mut state = self.state()?;
        if state.notices.remove(&id).is_none() {
            return Err(RepositoryError::NotFound);
        }
        state.notice_reads.retain(|(notice, _), _| *notice != id);
        Ok(())
    }

    fn reads(&self) -> Result<Vec<NoticeRead>, RepositoryError> {
        Ok(self.state()?.notice_reads.values().cloned().collect())
    }

    fn reads_for_employee(&self, employee: EmployeeId) -> Result<Vec<NoticeRead>, RepositoryError> {
        Ok(self
            .state()?
            .notice_reads
            .values()
            .filter(|read| read.employee == employee)
            .cloned()
            .collect())
    }

    fn insert_reads(&self, reads: Vec<NoticeRead>) -> Result<usize, RepositoryError> {
        let mut state = self.state()?;
        let mut created = 0;
        for read in reads {
            let key = (read.notice, read.employee);
            if !state.notice_reads.contains_key(&key) {
                state.notice_reads.insert(key, read);
                created += 1;
            }
        }
        Ok(created)
    }

    fn acknowledge(
        &self,
        employee: EmployeeId,
        notice: NoticeId,
        at: DateTime<Utc>,
    ) -> Result<NoticeRead, RepositoryError> {
        let mut state = self.state()?;
        let read = state
            .notice_reads
            .entry((notice, employee))
            .or_insert_with(|| NoticeRead {
                employee,
                notice,
                read_at: at,
                acknowledged_at: None,
            });
        read.acknowledged_at.get_or_insert(at);
        Ok(read.clone())
    }
}

impl TrainingRepository for InMemoryPortalStore {
    fn trainings(&self) -> Result<Vec<Training>, RepositoryError> {
        Ok(self.state()?.trainings.values().cloned().collect())
    }

    fn training(&self, id: TrainingId) -> Result<Option<Training>, RepositoryError> {
        Ok(self.state()?.trainings.get(&id).cloned())
    }

    fn insert_training(
        &self,
        training: Training,
        participations: Vec<TrainingParticipation>,
    ) -> Result<usize, RepositoryError> {
        let mut state = self.state()?;
        if state.trainings.contains_key(&training.id) {
            return Err(RepositoryError::Conflict);
        }
        state.trainings.insert(training.id, training);
        Ok(add_participations(&mut state, participations))
    }

    fn update_training(
        &self,
        training: Training,
        participations: Vec<TrainingParticipation>,
    ) -> Result<usize, RepositoryError> {
        let mut state = self.state()?;
        replace(&mut state.trainings, training.id, training)?;
        Ok(add_participations(&mut state, participations))
    }

    fn remove_training(&self, id: TrainingId) -> Result<(), RepositoryError> {
        let mut state = self.state()?;
        if state.trainings.remove(&id).is_none() {
            return Err(RepositoryError::NotFound);
        }
        state.participations.retain(|(training, _), _| *training != id);
        Ok(())
    }

    fn participations(&self) -> Result<Vec<TrainingParticipation>, RepositoryError> {
        Ok(self.state()?.participations.values().cloned().collect())
    }

    fn participations_for_training(
        &self,
        training: TrainingId,
    ) -> Result<Vec<TrainingParticipation>, RepositoryError> {
        Ok(self
            .state()?
            .participations
            .values()
            .filter(|participation| participation.training == training)
            .cloned()
            .collect())
    }

    fn participations_for_employee(
        &self,
        employee: EmployeeId,
    ) -> Result<Vec<TrainingParticipation>, RepositoryError> {
        Ok(self
            .state()?
            .participations
            .values()
            .filter(|participation| participation.employee == employee)
            .cloned()
            .collect())
    }

    fn update_participation(
        &self,
        participation: TrainingParticipation,
    ) -> Result<(), RepositoryError> {
        let key = (participation.training, participation.employee);
        replace(&mut self.state()?.participations, key, participation)
    }
}

impl ExamRepository for InMemoryPortalStore {
    fn exams(&self) -> Result<Vec<Exam>, RepositoryError> {
        Ok(self.state()?.exams.values().cloned().collect())
    }

    fn exam(&self, id: ExamId) -> Result<Option<Exam>, RepositoryError> {
        Ok(self.state()?.exams.get(&id).cloned())
    }

    fn insert_exam(&self, exam: Exam) -> Result<Exam, RepositoryError> {
        let mut state = self.state()?;
        if state.exams.contains_key(&exam.id) {
            return Err(RepositoryError::Conflict);
        }
        state.exams.insert(exam.id, exam.clone());
        Ok(exam)
    }

    fn update_exam(&self, exam: Exam) -> Result<(), RepositoryError> {
        replace(&mut self.state()?.exams, exam.id, exam)
    }

    fn remove_exam(&self, id: ExamId) -> Result<(), RepositoryError> {
        let mut state = self.state()?;
        if state.exams.remove(&id).is_none() {
            return Err(RepositoryError::NotFound);
        }
        state.attempts.retain(|_, attempt| attempt.exam != id);
        state.practice_sessions.retain(|_, session| session.exam != id);
        Ok(())
    }

    fn attempts_for_exam(&self, exam: ExamId) -> Result<Vec<ExamAttempt>, RepositoryError> {
        Ok(self
            .state()?
            .attempts
            .values()
            .filter(|attempt| attempt.exam == exam)
            .cloned()
            .collect())
    }

    fn attempt(&self, id: AttemptId) -> Result<Option<ExamAttempt>, RepositoryError> {
        Ok(self.state()?.attempts.get(&id).cloned())
    }

    fn insert_attempt(&self, attempt: ExamAttempt) -> Result<ExamAttempt, RepositoryError> {
        let mut state = self.state()?;
        let duplicate = state.attempts.values().any(|existing| {
            existing.id == attempt.id
                || (existing.exam == attempt.exam && existing.employee == attempt.employee)
        });
        if duplicate {
            return Err(RepositoryError::Conflict);
        }
        state.attempts.insert(attempt.id, attempt.clone());
        Ok(attempt)
    }

    fn update_attempt(&self, attempt: ExamAttempt) -> Result<(), RepositoryError> {
        replace(&mut self.state()?.attempts, attempt.id, attempt)
    }

    fn attempt_exists(&self, exam: ExamId, employee: EmployeeId) -> Result<bool, RepositoryError> {
        Ok(self
            .state()?
            .attempts
            .values()
            .any(|attempt| attempt.exam == exam && attempt.employee == employee))
    }

    fn insert_practice_session(&self, session: PracticeSession) -> Result<(), RepositoryError> {
        let mut state = self.state()?;
        if state.practice_sessions.contains_key(&session.token) {
            return Err(RepositoryError::Conflict);
        }
        state.practice_sessions.insert(session.token, session);
        Ok(())
    }

    fn practice_session(&self, token: u64) -> Result<Option<PracticeSession>, RepositoryError> {
        Ok(self.state()?.practice_sessions.get(&token).cloned())
    }

    fn update_practice_session(&self, session: PracticeSession) -> Result<(), RepositoryError> {
        replace(&mut self.state()?.practice_sessions, session.token, session)
    }

    fn remove_practice_session(&self, token: u64) -> Result<(), RepositoryError> {
        self.state()?
            .practice_sessions
            .remove(&token)
            .map(|_| ())
            .ok_or(RepositoryError::NotFound)
    }
}

impl InstructionRepository for InMemoryPortalStore {
    fn instructions(&self) -> Result<Vec<Instruction>, RepositoryError> {
        Ok(self.state()?.instructions.values().cloned().collect())
    }

    fn instruction(&self, id: InstructionId) -> Result<Option<Instruction>, RepositoryError> {
        Ok(self.state()?.instructions.get(&id).cloned())
    }

    fn insert_instruction(&self, instruction: Instruction) -> Result<Instruction, RepositoryError> {
        let mut state = self.state()?;
        if state.instructions.contains_key(&instruction.id) {
            return Err(RepositoryError::Conflict);
        }
        state.instructions.insert(instruction.id, instruction.clone());
        Ok(instruction)
    }

    fn records(&self) -> Result<Vec<InstructionRecord>, RepositoryError> {
        Ok(self.state()?.instruction_records.values().cloned().collect())
    }

    fn records_for_employee(
        &self,
        employee: EmployeeId,
    ) -> Result<Vec<InstructionRecord>, RepositoryError> {
        Ok(self
            .state()?
            .instruction_records
            .values()
            .filter(|record| record.employee == employee)
            .cloned()
            .collect())
    }

    fn upsert_records(
        &self,
        records: Vec<InstructionRecord>,
    ) -> Result<AssignmentOutcome, RepositoryError> {
        let mut state = self.state()?;
        let mut outcome = AssignmentOutcome::default();
        for record in records {
            let existing = state
                .instruction_records
                .values()
                .find(|existing| {
                    existing.employee == record.employee
                        && existing.instruction == record.instruction
                })
                .map(|existing| existing.id);
            match existing.and_then(|id| state.instruction_records.get_mut(&id)) {
                Some(existing) => {
                    existing.completed_date = record.completed_date;
                    existing.next_due_date = record.next_due_date;
                    existing.acknowledged_date = None;
                    outcome.updated += 1;
                }
                None => {
                    state.instruction_records.insert(record.id, record);
                    outcome.created += 1;
                }
            }
        }
        Ok(outcome)
    }

    fn acknowledge_record(
        &self,
        id: InstructionRecordId,
        on: NaiveDate,
        next_due_date: NaiveDate,
    ) -> Result<InstructionRecord, RepositoryError> {
        let mut state = self.state()?;
        let record = state
            .instruction_records
            .get_mut(&id)
            .ok_or(RepositoryError::NotFound)?;
        if record.acknowledged_date.is_none() {
            record.acknowledged_date = Some(on);
            record.next_due_date = next_due_date;
        }
        Ok(record.clone())
    }
}
