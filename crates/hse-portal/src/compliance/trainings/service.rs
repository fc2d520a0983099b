use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use super::domain::{
    MaterialBody, MyTraining, ParticipationStatus, ResultUpdate, SavedTraining, StatusUpdate,
    SyncOutcome, Training, TrainingDetail, TrainingDraft, TrainingId, TrainingMaterial,
    TrainingParticipation,
};
use super::repository::TrainingRepository;
use crate::access::{Caller, Role};
use crate::directory::domain::EmployeeId;
use crate::directory::DirectoryRepository;
use crate::error::ServiceError;
use crate::store::Sequence;
use crate::targeting::{reconcile, Engagement, OrgSnapshot};
use crate::validation::{require_text, ValidationErrors};

static TRAINING_IDS: Sequence = Sequence::new();

pub struct TrainingService<S> {
    store: Arc<S>,
}

impl<S> TrainingService<S>
where
    S: TrainingRepository + DirectoryRepository + 'static,
{
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Trainings ordered by start date, latest first.
    pub fn list(&self, caller: &Caller) -> Result<Vec<Training>, ServiceError> {
        caller.require_manager()?;
        let mut trainings = self.store.trainings()?;
        sort_latest_first(&mut trainings);
        Ok(trainings)
    }

    pub fn create(
        &self,
        caller: &Caller,
        draft: TrainingDraft,
        now: DateTime<Utc>,
    ) -> Result<SavedTraining, ServiceError> {
        caller.require_manager()?;
        let org = OrgSnapshot::load(self.store.as_ref())?;
        let training = build_training(&org, TrainingId(TRAINING_IDS.next()), draft, caller, now)?;
        let participations = assignments(&org, &training, now);
        let total_targets = participations.len();
        let created = self.store.insert_training(training.clone(), participations)?;
        let sync = SyncOutcome {
            created,
            total_targets,
        };
        info!(
            training = training.id.0,
            created = sync.created,
            targets = sync.total_targets,
            "training saved"
        );
        Ok(SavedTraining { training, sync })
    }

    /// Rewrites the training and assigns any newly eligible employees. Existing participations
    /// are kept even when their employee falls out of scope.
    pub fn update(
        &self,
        caller: &Caller,
        id: TrainingId,
        draft: TrainingDraft,
        now: DateTime<Utc>,
    ) -> Result<SavedTraining, ServiceError> {
        caller.require_manager()?;
        let existing = self
            .store
            .training(id)?
            .ok_or(ServiceError::NotFound("training"))?;
        let org = OrgSnapshot::load(self.store.as_ref())?;
        let mut training = build_training(&org, id, draft, caller, existing.created_at)?;
        training.created_by = existing.created_by;
        let participations = assignments(&org, &training, now);
        let total_targets = participations.len();
        let created = self.store.update_training(training.clone(), participations)?;
        info!(training = id.0, created, "training updated");
        Ok(SavedTraining {
            training,
            sync: SyncOutcome {
                created,
                total_targets,
            },
        })
    }

    pub fn delete(&self, caller: &Caller, id: TrainingId) -> Result<(), ServiceError> {
        caller.require_manager()?;
        if self.store.training(id)?.is_none() {
            return Err(ServiceError::NotFound("training"));
        }
        self.store.remove_training(id)?;
        info!(training = id.0, "training removed");
        Ok(())
    }

    /// Managers see every participation; employees only reach trainings they take part in.
    pub fn detail(&self, caller: &Caller, id: TrainingId) -> Result<TrainingDetail, ServiceError> {
        let training = self
            .store
            .training(id)?
            .ok_or(ServiceError::NotFound("training"))?;
        let participations = self.store.participations_for_training(id)?;

        if caller.is_manager() {
            return Ok(TrainingDetail {
                training,
                participations,
            });
        }

        let own: Vec<TrainingParticipation> = participations
            .into_iter()
            .filter(|participation| Some(participation.employee) == caller.employee)
            .collect();
        if own.is_empty() {
            return Err(ServiceError::NotFound("training"));
        }
        Ok(TrainingDetail {
            training,
            participations: own,
        })
    }

    /// Self-service status change, limited to reporting attendance or completion.
    pub fn update_status(
        &self,
        caller: &Caller,
        id: TrainingId,
        update: StatusUpdate,
        now: DateTime<Utc>,
    ) -> Result<TrainingParticipation, ServiceError> {
        caller.require(Role::EMPLOYEES)?;
        if !matches!(
            update.status,
            ParticipationStatus::Attended | ParticipationStatus::Completed
        ) {
            return Err(ValidationErrors::single(
                "status",
                "only attended or completed can be reported",
            )
            .into());
        }
        let employee = caller.employee.ok_or(ServiceError::NotFound("training"))?;
        let mut participation = self.participation(id, employee)?;
        participation.transition(update.status, now);
        self.store.update_participation(participation.clone())?;
        Ok(participation)
    }

    pub fn record_result(
        &self,
        caller: &Caller,
        id: TrainingId,
        employee: EmployeeId,
        update: ResultUpdate,
        now: DateTime<Utc>,
    ) -> Result<TrainingParticipation, ServiceError> {
        caller.require_manager()?;
        if self.store.training(id)?.is_none() {
            return Err(ServiceError::NotFound("training"));
        }
        let mut participation = self.participation(id, employee)?;
        participation.transition(update.status, now);
        participation.score = update.score;
        self.store.update_participation(participation.clone())?;
        info!(
            training = id.0,
            employee = employee.0,
            status = ?update.status,
            "training result recorded"
        );
        Ok(participation)
    }

    /// The caller's participations on active trainings, latest start date first.
    pub fn my_trainings(&self, caller: &Caller) -> Result<Vec<MyTraining>, ServiceError> {
        let Some(employee) = caller.employee else {
            return Ok(Vec::new());
        };
        let mut trainings = self.store.trainings()?;
        sort_latest_first(&mut trainings);
        let participations = self.store.participations_for_employee(employee)?;

        Ok(trainings
            .into_iter()
            .filter(|training| training.is_active)
            .filter_map(|training| {
                participations
                    .iter()
                    .find(|participation| participation.training == training.id)
                    .cloned()
                    .map(|participation| MyTraining {
                        training,
                        participation,
                    })
            })
            .collect())
    }

    /// Eligible employees without a completed participation, over active required trainings.
    pub fn pending_participations(&self, caller: &Caller) -> Result<usize, ServiceError> {
        caller.require_manager()?;
        let org = OrgSnapshot::load(self.store.as_ref())?;
        let participations = self.store.participations()?;

        let mut pending = 0;
        for training in self
            .store
            .trainings()?
            .iter()
            .filter(|training| training.is_active && training.required)
        {
            let completions: Vec<Engagement> = participations
                .iter()
                .filter(|participation| participation.training == training.id)
                .map(|participation| Engagement {
                    employee: participation.employee,
                    acknowledged: participation.status == ParticipationStatus::Completed,
                })
                .collect();
            pending += reconcile(&org.employees_for(&training.scope), &completions, true)
                .unacknowledged;
        }
        Ok(pending)
    }

    fn participation(
        &self,
        training: TrainingId,
        employee: EmployeeId,
    ) -> Result<TrainingParticipation, ServiceError> {
        self.store
            .participations_for_training(training)?
            .into_iter()
            .find(|participation| participation.employee == employee)
            .ok_or(ServiceError::NotFound("participation"))
    }
}

fn sort_latest_first(trainings: &mut [Training]) {
    trainings.sort_by(|a, b| b.start_date.cmp(&a.start_date).then(b.id.cmp(&a.id)));
}

/// A fresh `assigned` participation for everyone the training's scope reaches. The store keeps
/// existing rows and only adds the new pairs.
fn assignments(
    org: &OrgSnapshot,
    training: &Training,
    now: DateTime<Utc>,
) -> Vec<TrainingParticipation> {
    org.employees_for(&training.scope)
        .into_iter()
        .map(|employee| TrainingParticipation::assigned(training.id, employee, now))
        .collect()
}

fn build_training(
    org: &OrgSnapshot,
    id: TrainingId,
    draft: TrainingDraft,
    caller: &Caller,
    created_at: DateTime<Utc>,
) -> Result<Training, ValidationErrors> {
    let mut errors = ValidationErrors::new();
    let title = draft.title.trim().to_string();
    require_text(&mut errors, "title", &title);
    if draft.end_date < draft.start_date {
        errors.add("end_date", "end date cannot be before the start date");
    }
    for (index, material) in draft.materials.iter().enumerate() {
        check_material(index, material, &mut errors);
    }
    let scope = draft.scope.resolve(org, &mut errors);

    match scope {
        Some(scope) if errors.is_empty() => Ok(Training {
            id,
            title,
            description: draft.description,
            scope,
            start_date: draft.start_date,
            end_date: draft.end_date,
            trainer_name: draft.trainer_name.trim().to_string(),
            required: draft.required,
            created_by: caller.identity,
            created_at,
            is_active: draft.is_active,
            materials: draft.materials,
        }),
        _ => Err(errors),
    }
}

fn check_material(index: usize, material: &TrainingMaterial, errors: &mut ValidationErrors) {
    let position = index + 1;
    if material.title.trim().is_empty() {
        errors.add("materials", format!("material {position}: title is required"));
    }

    match &material.body {
        MaterialBody::Text { content } => {
            if content.trim().is_empty() {
                errors.add("materials", format!("material {position}: text is empty"));
            }
        }
        MaterialBody::Image { file_key } | MaterialBody::Pdf { file_key } => {
            if file_key.trim().is_empty() {
                errors.add("materials", format!("material {position}: file key is required"));
                return;
            }
            let guessed = mime_guess::from_path(file_key.trim()).first();
            let matches = match (&material.body, guessed.as_ref()) {
                (MaterialBody::Image { .. }, Some(mime)) => mime.type_() == mime::IMAGE,
                (MaterialBody::Pdf { .. }, Some(mime)) => *mime == mime::APPLICATION_PDF,
                _ => false,
            };
            if !matches {
                warn!(file_key = %file_key, "training material type mismatch");
                errors.add(
                    "materials",
                    format!("material {position}: '{file_key}' does not match its declared kind"),
                );
            }
        }
    }
}
