use crate::access::AccessGuard;
use crate::cli::ServeArgs;
use crate::infra::{seed_sample, AppState};
use crate::routes::with_pass_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::info;
use workpass::config::AppConfig;
use workpass::error::AppError;
use workpass::passes::{Clock, InMemoryPassStore, SystemClock, WorkPassService};
use workpass::telemetry;

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
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let store = Arc::new(InMemoryPassStore::with_lock_timeout(
        config.store.lock_timeout,
    ));
    let service = Arc::new(WorkPassService::new(store));
    if config.store.seed_sample {
        seed_sample(&service, clock.today())?;
    }

    let guard = Arc::new(AccessGuard::new(&config.access));
    let app = with_pass_routes(service, clock, guard)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        require_api_key = config.access.require_api_key,
        "work pass extension api ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
