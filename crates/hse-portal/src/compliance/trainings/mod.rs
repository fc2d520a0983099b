//! Trainings assigned to an audience and the participation status of each employee.

pub mod domain;
pub mod repository;
pub mod router;
pub mod service;

pub use domain::{
    MaterialBody, MyTraining, ParticipationStatus, ResultUpdate, SavedTraining, StatusUpdate,
    SyncOutcome, Training, TrainingDetail, TrainingDraft, TrainingId, TrainingMaterial,
    TrainingParticipation,
};
pub use repository::TrainingRepository;
pub use router::training_router;
pub use service::TrainingService;
