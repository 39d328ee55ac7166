use crate::cli::ServeArgs;
use crate::infra::{load_directory, AppState};
use crate::routes::with_allocation_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use hostel::allocation::{AllocationState, RoomAllocator};
use hostel::config::AppConfig;
use hostel::error::AppError;
use hostel::telemetry;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::info;

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

    let directory = load_directory(args.rooms.as_deref(), args.occupants.as_deref())?;
    let allocator = Arc::new(RoomAllocator::new(
        Arc::new(directory),
        config.allocation.settings(),
    ));

    let settings = allocator.settings();

    let app = with_allocation_routes(AllocationState::new(allocator))
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        store_timeout_ms = settings.store_timeout.as_millis() as u64,
        snapshot_order = ?settings.snapshot_order,
        "hostel allocation service ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
