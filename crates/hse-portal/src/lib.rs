//! Occupational health & safety compliance portal.
//!
//! The crate is organised around a shared targeting engine: notices, trainings, and exams all
//! carry an [`targeting::AudienceScope`] that is resolved against the department tree to decide
//! which employees a record applies to.

pub mod access;
pub mod compliance;
pub mod config;
pub mod directory;
pub mod error;
pub mod store;
pub mod targeting;
pub mod telemetry;
pub mod validation;
