//! Audience targeting shared by notices, trainings, and exams.
//!
//! Two directions are supported over the same [`AudienceScope`]: from a record to the employees
//! it reaches ([`OrgSnapshot::employees_for`], descending the department tree) and from an
//! employee to the records reaching them ([`OrgSnapshot::records_for`], ascending it).

mod engine;
mod scope;

#[cfg(test)]
mod tests;

pub use engine::{reconcile, Broadcast, Engagement, OrgSnapshot, Reconciliation};
pub use scope::{AudienceScope, ScopeDraft, ScopeKind};
