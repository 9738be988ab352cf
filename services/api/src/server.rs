use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use recruit_intake::config::AppConfig;
use recruit_intake::error::AppError;
use recruit_intake::telemetry;
use recruit_intake::workflows::intake::CandidateIntakeService;
use tracing::{debug, info};

use crate::cli::ServeArgs;
use crate::infra::{
    intake_config, AppState, InMemoryCandidateStore, KeywordAtsScorer, LoggingMailer,
    TextResumeParser,
};
use crate::routes::with_intake_routes;

const REAPER_INTERVAL: Duration = Duration::from_secs(60);

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

    let service = Arc::new(CandidateIntakeService::new(
        Arc::new(TextResumeParser),
        Arc::new(KeywordAtsScorer),
        Arc::new(LoggingMailer::new(config.intake.reviewer_email.clone())),
        Arc::new(InMemoryCandidateStore::default()),
        intake_config(&config.intake),
    ));

    // Periodic reclamation of expired OTP records and idle rate-limit windows.
    let reaper_service = service.clone();
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(REAPER_INTERVAL);
        loop {
            ticker.tick().await;
            let reclaimed = reaper_service.sweep();
            if reclaimed > 0 {
                debug!(reclaimed, "reaped stale intake state");
            }
        }
    });

    let app = with_intake_routes(service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "candidate intake service ready");

    axum::serve(listener, app).await?;
    Ok(())
}
