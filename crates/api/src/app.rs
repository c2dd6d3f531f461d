use axum::{
    middleware,
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tower_http::{
    compression::CompressionLayer,
    cors::{AllowOrigin, Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::Config;
use crate::middleware::{
    metrics_handler, metrics_middleware, require_admin, security_headers_middleware, trace_id,
};
use crate::routes::{admin, dashboard, health, participants, scans};
use crate::services::{QrError, QrLinks, QrRenderer};
use domain::models::ScanContext;
use domain::services::{CheckInLedger, LedgerStore};

#[derive(Clone)]
pub struct AppState {
    pub ledger: CheckInLedger,
    pub config: Arc<Config>,
    /// Day and slot this deployment's stations are serving.
    pub scan_context: Arc<RwLock<ScanContext>>,
    pub qr_links: Arc<QrLinks>,
    pub qr_renderer: Arc<dyn QrRenderer>,
}

impl AppState {
    pub fn new(
        config: Config,
        store: Arc<dyn LedgerStore>,
        qr_renderer: Arc<dyn QrRenderer>,
    ) -> Result<Self, QrError> {
        let qr_links = QrLinks::new(&config.qr)?;
        let ledger = CheckInLedger::new(store).with_retry_policy(config.ledger.retry_policy());
        let scan_context = initial_scan_context(&config);

        Ok(Self {
            ledger,
            config: Arc::new(config),
            scan_context: Arc::new(RwLock::new(scan_context)),
            qr_links: Arc::new(qr_links),
            qr_renderer,
        })
    }
}

/// Configured default day, with the configured slot or the one open right now.
fn initial_scan_context(config: &Config) -> ScanContext {
    let day = config.default_day();
    match config.event.default_slot {
        Some(slot) => ScanContext::new(day, slot),
        None => ScanContext::for_time(day, chrono::Local::now().time()),
    }
}

pub fn create_app(state: AppState) -> Router {
    let config = state.config.clone();

    let cors = if config.security.cors_origins.is_empty() {
        // Development default: any origin
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<_> = config
            .security
            .cors_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods(Any)
            .allow_headers(Any)
    };

    let admin_guard = middleware::from_fn_with_state(state.clone(), require_admin);

    // Station and dashboard routes run unauthenticated on the event network;
    // destructive operations require the admin key.
    let ledger_routes = Router::new()
        .route("/scan", get(scans::scan_from_link))
        .route(
            "/api/v1/scans",
            post(scans::record_scan).get(scans::list_scans),
        )
        .route(
            "/api/v1/scan-context",
            get(scans::get_scan_context).put(scans::set_scan_context),
        )
        .route("/api/v1/slots", get(scans::list_slots))
        .route(
            "/api/v1/participants",
            get(participants::search_participants).post(participants::create_participant),
        )
        .route(
            "/api/v1/participants/import",
            post(participants::import_participants),
        )
        .route(
            "/api/v1/participants/:id",
            get(participants::get_participant).merge(
                delete(participants::delete_participant).route_layer(admin_guard.clone()),
            ),
        )
        .route(
            "/api/v1/participants/:id/qr.png",
            get(participants::get_participant_qr),
        )
        .route("/api/v1/dashboard", get(dashboard::get_dashboard))
        .route("/api/v1/dashboard/events", get(dashboard::dashboard_events))
        .route(
            "/api/v1/admin/reset",
            post(admin::reset).route_layer(admin_guard),
        );

    let public_routes = Router::new()
        .route("/api/health", get(health::health_check))
        .route("/api/health/live", get(health::live))
        .route("/api/health/ready", get(health::ready))
        .route("/metrics", get(metrics_handler));

    Router::new()
        .merge(public_routes)
        .merge(ledger_routes)
        // Global middleware (order matters: bottom layers run first)
        .layer(middleware::from_fn(security_headers_middleware))
        .layer(CompressionLayer::new())
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.server.request_timeout_secs,
        )))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(trace_id))
        .layer(cors)
        .with_state(state)
}
