use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use chrono::Utc;
use hse_portal::config::AppConfig;
use hse_portal::directory::EmployeeImporter;
use hse_portal::error::AppError;
use hse_portal::store::InMemoryPortalStore;
use hse_portal::telemetry;
use tracing::{info, warn};

use crate::cli::ServeArgs;
use crate::infra::{AppState, Portal};
use crate::routes::with_portal_routes;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let store = Arc::new(InMemoryPortalStore::new());
    let portal = Portal::new(store.clone(), &config.portal);

    if let Err(err) = portal.directory.ensure_superuser(&config.portal.admin_username) {
        warn!(error = %err, "could not create the bootstrap superuser");
    }
    if let Some(path) = &config.portal.seed_csv {
        let summary = EmployeeImporter::new(store.as_ref()).from_path(path, Utc::now())?;
        info!(
            path = %path.display(),
            created = summary.created,
            rejected = summary.rejected.len(),
            "directory seeded"
        );
    }

    let app = with_portal_routes(&portal)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "hse portal ready");

    axum::serve(listener, app).await?;
    Ok(())
}
