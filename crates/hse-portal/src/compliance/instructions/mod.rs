//! Safety instructions and per-employee briefing records with expiry tracking.

pub mod domain;
pub mod repository;
pub mod router;
pub mod service;

pub use domain::{
    AssignmentDraft, AssignmentOutcome, ComplianceStatus, Instruction, InstructionDraft,
    InstructionId, InstructionKind, InstructionMetrics, InstructionRecord, InstructionRecordId,
    RecordView, MAX_VALIDITY_DAYS,
};
pub use repository::InstructionRepository;
pub use router::instruction_router;
pub use service::InstructionService;
