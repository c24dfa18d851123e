use std::sync::atomic::Ordering;
use std::sync::Arc;

use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use chrono::Utc;
use tracing::info;

use staffvote::config::AppConfig;
use staffvote::error::AppError;
use staffvote::scheduler::{JobCadence, JobError, JobReport, JobScheduler};
use staffvote::telemetry;
use staffvote::workflows::attendance::{AttendanceAggregator, InMemoryAttendanceStore};
use staffvote::workflows::governance::{
    AutoTrigger, BallotService, GovernanceStore, InMemoryEmployeeDirectory,
    InMemoryGovernanceStore, InMemoryOutbox, NullNotifier, OutboxRelay, ResolutionEngine,
};

use crate::cli::ServeArgs;
use crate::infra::{seed_roster, AppState};
use crate::routes;

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

    let governance = config.governance.clone();
    let store = Arc::new(InMemoryGovernanceStore::default());
    let directory = Arc::new(InMemoryEmployeeDirectory::seeded(seed_roster(
        Utc::now().date_naive(),
    )));
    let outbox = Arc::new(InMemoryOutbox::default());
    let attendance_store = Arc::new(InMemoryAttendanceStore::default());
    let aggregator = Arc::new(AttendanceAggregator::new(
        attendance_store,
        governance.clone(),
    ));

    let trigger = Arc::new(AutoTrigger::new(
        store.clone(),
        directory.clone(),
        aggregator.clone(),
        outbox.clone(),
        governance.clone(),
    ));
    let resolution = Arc::new(ResolutionEngine::new(
        store.clone(),
        directory.clone(),
        outbox.clone(),
    ));
    let ballots = Arc::new(BallotService::new(store.clone(), directory.clone()));
    let relay = Arc::new(OutboxRelay::new(outbox.clone(), Arc::new(NullNotifier)));

    let scheduler = Arc::new(standard_jobs(
        trigger.clone(),
        resolution.clone(),
        aggregator.clone(),
        store.clone(),
        relay,
        governance.expiry_backlog_threshold,
    ));

    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
        scheduler: scheduler.clone(),
        store,
        trigger,
        resolution,
        aggregator,
        outbox,
        config: governance,
    };

    // Scheduled ticks run off the request path; job handlers are blocking.
    let tick_scheduler = scheduler.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(60));
        loop {
            interval.tick().await;
            let scheduler = tick_scheduler.clone();
            let _ = tokio::task::spawn_blocking(move || scheduler.run_due(Utc::now())).await;
        }
    });

    let app = routes::router(ballots)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "staff voting orchestrator ready");

    axum::serve(listener, app).await?;
    Ok(())
}

/// The standard job set: daily trigger sweeps and period rollover, hourly
/// expiry/position-change sweeps, sub-hourly urgent demotion recheck,
/// notification delivery, and a backlog health check.
fn standard_jobs(
    trigger: Arc<crate::infra::Trigger>,
    resolution: Arc<crate::infra::Resolution>,
    aggregator: Arc<crate::infra::Aggregator>,
    store: Arc<crate::infra::Store>,
    relay: Arc<OutboxRelay<InMemoryOutbox, NullNotifier>>,
    backlog_threshold: usize,
) -> JobScheduler {
    let mut scheduler = JobScheduler::new();

    {
        let trigger = trigger.clone();
        scheduler.register("promotion-check", JobCadence::Daily, move || {
            let report = trigger
                .check_promotions(Utc::now())
                .map_err(JobError::from_error)?;
            Ok(JobReport::new(
                report.created.len(),
                format!("examined {} employees", report.examined),
            ))
        });
    }
    {
        let trigger = trigger.clone();
        scheduler.register("demotion-check", JobCadence::Daily, move || {
            let report = trigger
                .check_demotions(Utc::now())
                .map_err(JobError::from_error)?;
            Ok(JobReport::new(
                report.created.len(),
                format!("examined {} statistics rows", report.examined),
            ))
        });
    }
    {
        let aggregator = aggregator.clone();
        scheduler.register("attendance-period-reset", JobCadence::Daily, move || {
            match aggregator.roll_period(Utc::now()).map_err(JobError::from_error)? {
                Some(rollover) => Ok(JobReport::new(
                    rollover.reset_rows,
                    format!("period rolled, {} stale rows pruned", rollover.pruned_rows),
                )),
                None => Ok(JobReport::new(0, "period unchanged")),
            }
        });
    }
    {
        let resolution = resolution.clone();
        scheduler.register("campaign-expiry", JobCadence::Hourly, move || {
            let report = resolution
                .process_expired(Utc::now())
                .map_err(JobError::from_error)?;
            Ok(JobReport::new(
                report.closed.len(),
                format!("{} passed, {} failed", report.passed, report.failed),
            ))
        });
    }
    {
        let resolution = resolution.clone();
        scheduler.register("position-change-sweep", JobCadence::Hourly, move || {
            let executed = resolution
                .sweep_unexecuted(Utc::now())
                .map_err(JobError::from_error)?;
            Ok(JobReport::new(executed, "pending position changes applied"))
        });
    }
    {
        let trigger = trigger.clone();
        scheduler.register(
            "urgent-demotion-recheck",
            JobCadence::EveryMinutes(10),
            move || {
                let report = trigger
                    .check_demotions(Utc::now())
                    .map_err(JobError::from_error)?;
                Ok(JobReport::new(report.created.len(), "urgent recheck"))
            },
        );
    }
    {
        scheduler.register(
            "notification-delivery",
            JobCadence::EveryMinutes(5),
            move || {
                let delivered = relay.drain(Utc::now()).map_err(JobError::from_error)?;
                Ok(JobReport::new(delivered, "outbox drained"))
            },
        );
    }
    {
        scheduler.register("health-check", JobCadence::EveryMinutes(5), move || {
            let backlog = store
                .expired_active(Utc::now())
                .map_err(JobError::from_error)?
                .len();
            if backlog > backlog_threshold {
                return Err(JobError(format!(
                    "resolution backlog: {backlog} expired campaigns unprocessed"
                )));
            }
            Ok(JobReport::new(backlog, "store reachable, backlog nominal"))
        });
    }

    scheduler
}
