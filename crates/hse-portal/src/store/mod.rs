//! Persistence seams shared by every feature module.
//!
//! Each feature defines its own repository trait next to its domain types; the in-memory store
//! in [`memory`] implements all of them behind a single lock so multi-row writes commit
//! atomically.

pub mod memory;

use std::sync::atomic::{AtomicU64, Ordering};

pub use memory::InMemoryPortalStore;

use crate::compliance::exams::ExamRepository;
use crate::compliance::instructions::InstructionRepository;
use crate::compliance::notices::NoticeRepository;
use crate::compliance::trainings::TrainingRepository;
use crate::directory::DirectoryRepository;

/// Every repository the portal needs, served by one backing store.
pub trait PortalRepository:
    DirectoryRepository + NoticeRepository + TrainingRepository + ExamRepository + InstructionRepository
{
}

impl<T> PortalRepository for T where
    T: DirectoryRepository
        + NoticeRepository
        + TrainingRepository
        + ExamRepository
        + InstructionRepository
{
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Monotonic identifier source used by services when minting new records.
#[derive(Debug)]
pub struct Sequence(AtomicU64);

impl Sequence {
    pub const fn new() -> Self {
        Self(AtomicU64::new(1))
    }

    pub fn next(&self) -> u64 {
        self.0.fetch_add(1, Ordering::Relaxed)
    }
}

impl Default for Sequence {
    fn default() -> Self {
        Self::new()
    }
}
