use super::domain::{Training, TrainingId, TrainingParticipation};
use crate::directory::domain::EmployeeId;
use crate::store::RepositoryError;

pub trait TrainingRepository: Send + Sync {
    fn trainings(&self) -> Result<Vec<Training>, RepositoryError>;
    fn training(&self, id: TrainingId) -> Result<Option<Training>, RepositoryError>;
    /// Stores a new training together with its participations in one write. Fails with
    /// `Conflict` when the id is taken. Returns how many participations were created.
    fn insert_training(
        &self,
        training: Training,
        participations: Vec<TrainingParticipation>,
    ) -> Result<usize, RepositoryError>;
    /// Rewrites the training and adds every participation whose (training, employee) pair is
    /// new, in one write. Existing participations are left untouched.
    fn update_training(
        &self,
        training: Training,
        participations: Vec<TrainingParticipation>,
    ) -> Result<usize, RepositoryError>;
    /// Removes the training and its participations.
    fn remove_training(&self, id: TrainingId) -> Result<(), RepositoryError>;

    fn participations(&self) -> Result<Vec<TrainingParticipation>, RepositoryError>;
    fn participations_for_training(
        &self,
        training: TrainingId,
    ) -> Result<Vec<TrainingParticipation>, RepositoryError>;
    fn participations_for_employee(
        &self,
        employee: EmployeeId,
    ) -> Result<Vec<TrainingParticipation>, RepositoryError>;
    fn update_participation(
        &self,
        participation: TrainingParticipation,
    ) -> Result<(), RepositoryError>;
}
