//! Compliance records broadcast to employees and the per-employee state tracked against them.

pub mod dashboard;
pub mod exams;
pub mod instructions;
pub mod notices;
pub mod trainings;

#[cfg(test)]
mod tests;

pub use dashboard::{dashboard_router, Dashboard, DashboardService};
