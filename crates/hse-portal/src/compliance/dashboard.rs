use std::sync::Arc;

use axum::{extract::State, response::IntoResponse, response::Response, routing::get, Json, Router};
use chrono::{DateTime, Utc};
use serde::Serialize;

use super::instructions::{ComplianceStatus, InstructionMetrics, InstructionService};
use super::notices::{NoticeMetrics, NoticeService};
use super::trainings::{ParticipationStatus, TrainingService};
use crate::access::Caller;
use crate::error::ServiceError;
use crate::store::PortalRepository;

/// Landing summary: organization-wide figures for managers, personal ones for employees.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "view", rename_all = "snake_case")]
pub enum Dashboard {
    Organization {
        notices: NoticeMetrics,
        instructions: InstructionMetrics,
        pending_trainings: usize,
    },
    Personal {
        unread_notices: usize,
        overdue_instructions: usize,
        pending_trainings: usize,
    },
}

pub struct DashboardService<S> {
    notices: Arc<NoticeService<S>>,
    trainings: Arc<TrainingService<S>>,
    instructions: Arc<InstructionService<S>>,
}

impl<S> DashboardService<S>
where
    S: PortalRepository + 'static,
{
    pub fn new(
        notices: Arc<NoticeService<S>>,
        trainings: Arc<TrainingService<S>>,
        instructions: Arc<InstructionService<S>>,
    ) -> Self {
        Self {
            notices,
            trainings,
            instructions,
        }
    }

    pub fn summary(&self, caller: &Caller, now: DateTime<Utc>) -> Result<Dashboard, ServiceError> {
        let today = now.date_naive();
        if caller.is_manager() {
            return Ok(Dashboard::Organization {
                notices: self.notices.metrics(caller)?,
                instructions: self.instructions.metrics(caller, today)?,
                pending_trainings: self.trainings.pending_participations(caller)?,
            });
        }

        let overdue_instructions = self
            .instructions
            .my_records(caller, today)?
            .iter()
            .filter(|view| view.status == ComplianceStatus::Overdue)
            .count();
        let pending_trainings = self
            .trainings
            .my_trainings(caller)?
            .iter()
            .filter(|item| {
                item.training.required
                    && item.participation.status != ParticipationStatus::Completed
            })
            .count();

        Ok(Dashboard::Personal {
            unread_notices: self.notices.unread_count(caller)?,
            overdue_instructions,
            pending_trainings,
        })
    }
}

pub fn dashboard_router<S>(service: Arc<DashboardService<S>>) -> Router
where
    S: PortalRepository + 'static,
{
    Router::new()
        .route("/api/v1/dashboard", get(summary::<S>))
        .with_state(service)
}

async fn summary<S>(
    State(service): State<Arc<DashboardService<S>>>,
    caller: Caller,
) -> Result<Response, ServiceError>
where
    S: PortalRepository + 'static,
{
    Ok(Json(service.summary(&caller, Utc::now())?).into_response())
}
