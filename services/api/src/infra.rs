use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use hse_portal::access::CallerResolver;
use hse_portal::compliance::exams::ExamService;
use hse_portal::compliance::instructions::InstructionService;
use hse_portal::compliance::notices::NoticeService;
use hse_portal::compliance::trainings::TrainingService;
use hse_portal::compliance::DashboardService;
use hse_portal::config::PortalConfig;
use hse_portal::directory::DirectoryService;
use hse_portal::store::PortalRepository;
use metrics_exporter_prometheus::PrometheusHandle;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Every feature service wired over one shared store.
pub(crate) struct Portal<S> {
    pub(crate) directory: Arc<DirectoryService<S>>,
    pub(crate) notices: Arc<NoticeService<S>>,
    pub(crate) trainings: Arc<TrainingService<S>>,
    pub(crate) exams: Arc<ExamService<S>>,
    pub(crate) instructions: Arc<InstructionService<S>>,
    pub(crate) dashboard: Arc<DashboardService<S>>,
    pub(crate) resolver: CallerResolver,
}

impl<S> Portal<S>
where
    S: PortalRepository + 'static,
{
    pub(crate) fn new(store: Arc<S>, config: &PortalConfig) -> Self {
        let notices = Arc::new(NoticeService::new(store.clone()));
        let trainings = Arc::new(TrainingService::new(store.clone()));
        let instructions = Arc::new(InstructionService::new(
            store.clone(),
            config.due_soon_days,
        ));
        let dashboard = Arc::new(DashboardService::new(
            notices.clone(),
            trainings.clone(),
            instructions.clone(),
        ));

        Self {
            directory: Arc::new(DirectoryService::new(store.clone())),
            exams: Arc::new(ExamService::new(store.clone())),
            resolver: CallerResolver::new(store),
            notices,
            trainings,
            instructions,
            dashboard,
        }
    }
}
