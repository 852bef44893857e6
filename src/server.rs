//! HTTP server bootstrap for the Proclusive workflow service.
//!
//! This module wires together:
//! - configuration
//! - database connection pool
//! - workflow engines and their side-effect dispatcher
//! - the Axum router

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::http::{HeaderValue, Method};
use axum::routing::get;
use axum::Router;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tower_http::cors::AllowOrigin;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::api::handlers::health::{health_check, metrics_handler, readiness_check};
use crate::auth::{AuthMiddlewareState, Authenticator, JwtValidator};
use crate::infra::{
    AuditLog, EventPublisher, HttpNotifier, LogOnlyPublisher, NotifierConfig, PgAuditLog,
};
use crate::metrics::MetricsRegistry;
use crate::telemetry::{init_telemetry, TelemetryConfig};
use crate::workflow::{
    ApplicationIntake, ApprovalReconciler, MembershipService, ReferralWorkflow, Repositories,
    SideEffectDispatcher, VerificationEngine,
};

/// Server configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// PostgreSQL connection URL.
    pub database_url: String,
    /// Server listen address.
    pub listen_addr: SocketAddr,
    /// Maximum database connections.
    pub max_connections: u32,
    /// Apply embedded migrations before serving.
    pub migrate_on_startup: bool,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| "postgres://localhost/proclusive".to_string());

        let port: u16 = std::env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(8080);

        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());

        let listen_addr: SocketAddr = format!("{host}:{port}")
            .parse()
            .with_context(|| format!("Invalid listen address {host}:{port}"))?;

        let max_connections: u32 = std::env::var("MAX_DB_CONNECTIONS")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(10);

        let migrate_on_startup = std::env::var("DB_MIGRATE_ON_STARTUP")
            .ok()
            .map(|v| {
                !matches!(
                    v.trim().to_ascii_lowercase().as_str(),
                    "0" | "false" | "off"
                )
            })
            .unwrap_or(true);

        Ok(Self {
            database_url,
            listen_addr,
            max_connections,
            migrate_on_startup,
        })
    }
}

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub verification: Arc<VerificationEngine>,
    pub intake: Arc<ApplicationIntake>,
    pub referrals: Arc<ReferralWorkflow>,
    pub membership: Arc<MembershipService>,
    pub reconciler: Arc<ApprovalReconciler>,
    pub audit: Arc<dyn AuditLog>,
    pub metrics: Arc<MetricsRegistry>,
    /// `None` when running on in-memory repositories
    pub pool: Option<PgPool>,
}

impl AppState {
    /// Wire every engine to the same repositories and dispatcher
    pub fn new(
        repos: Repositories,
        audit: Arc<dyn AuditLog>,
        publisher: Arc<dyn EventPublisher>,
        metrics: Arc<MetricsRegistry>,
        pool: Option<PgPool>,
    ) -> Self {
        let dispatcher = Arc::new(SideEffectDispatcher::new(
            audit.clone(),
            publisher,
            metrics.clone(),
        ));

        Self {
            verification: Arc::new(VerificationEngine::new(
                repos.clone(),
                dispatcher.clone(),
                metrics.clone(),
            )),
            intake: Arc::new(ApplicationIntake::new(repos.clone(), metrics.clone())),
            referrals: Arc::new(ReferralWorkflow::new(
                repos.clone(),
                dispatcher.clone(),
                metrics.clone(),
            )),
            membership: Arc::new(MembershipService::new(repos.clone(), dispatcher.clone())),
            reconciler: Arc::new(ApprovalReconciler::new(repos, dispatcher, metrics.clone())),
            audit,
            metrics,
            pool,
        }
    }
}

/// Notification publisher from `NOTIFY_*`; log-only when unconfigured.
pub fn publisher_from_env() -> anyhow::Result<Arc<dyn EventPublisher>> {
    match NotifierConfig::from_env() {
        Some(config) => {
            info!(base_url = %config.base_url, "HTTP notifier configured");
            Ok(Arc::new(HttpNotifier::new(config)?))
        }
        None => {
            info!("Notifications are log-only (set NOTIFY_BASE_URL to enable delivery)");
            Ok(Arc::new(LogOnlyPublisher))
        }
    }
}

/// Auth middleware state from `AUTH_MODE` and `JWT_*`.
pub fn auth_state_from_env() -> anyhow::Result<AuthMiddlewareState> {
    let auth_mode = std::env::var("AUTH_MODE").unwrap_or_else(|_| "required".to_string());
    let require_auth = auth_mode != "disabled";

    let authenticator = match std::env::var("JWT_SECRET") {
        Ok(secret) if !secret.is_empty() => {
            let issuer =
                std::env::var("JWT_ISSUER").unwrap_or_else(|_| "proclusive-auth".to_string());
            let audience =
                std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "proclusive-admin".to_string());
            Authenticator::new().with_jwt(Arc::new(JwtValidator::new(
                secret.as_bytes(),
                &issuer,
                &audience,
            )))
        }
        _ if require_auth => anyhow::bail!(
            "AUTH_MODE=required but JWT_SECRET is not set (or set AUTH_MODE=disabled for local dev)"
        ),
        _ => Authenticator::new(),
    };

    if !require_auth {
        warn!("AUTH_MODE=disabled: every request is treated as an admin");
    }

    Ok(AuthMiddlewareState {
        authenticator: Arc::new(authenticator),
        require_auth,
    })
}

/// Start the HTTP server.
pub async fn run() -> anyhow::Result<()> {
    init_telemetry(&TelemetryConfig::from_env())
        .map_err(|e| anyhow::anyhow!("failed to initialize telemetry: {e}"))?;

    info!("Starting Proclusive workflow v{}", env!("CARGO_PKG_VERSION"));

    let auth_state = auth_state_from_env()?;

    // Load configuration
    let config = Config::from_env()?;
    info!("Configuration loaded");
    info!("  Listen address: {}", config.listen_addr);
    info!("  Max connections: {}", config.max_connections);

    // Connect to PostgreSQL
    info!("Connecting to PostgreSQL...");
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.database_url)
        .await?;
    info!("Connected to PostgreSQL");

    if config.migrate_on_startup {
        info!("Running database migrations...");
        crate::migrations::run_postgres(&pool).await?;
        info!("Database migrations applied");
    } else {
        info!("DB migrations skipped (DB_MIGRATE_ON_STARTUP=0)");
    }

    let state = AppState::new(
        Repositories::postgres(pool.clone()),
        Arc::new(PgAuditLog::new(pool.clone())),
        publisher_from_env()?,
        Arc::new(MetricsRegistry::new()),
        Some(pool),
    );

    // Build router
    let app = build_router(auth_state)?.with_state(state);

    // Start server
    info!("Starting HTTP server on {}", config.listen_addr);
    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;

    info!("Proclusive workflow is ready to accept connections");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

/// Router with every route; state is supplied by the caller.
pub fn build_router(auth_state: AuthMiddlewareState) -> anyhow::Result<Router<AppState>> {
    let mut router = Router::new()
        .nest("/api", crate::api::router(auth_state))
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check))
        .route("/metrics", get(metrics_handler))
        .layer(TraceLayer::new_for_http());

    if let Some(cors_layer) = cors_layer_from_env()? {
        router = router.layer(cors_layer);
    }

    Ok(router)
}

fn cors_layer_from_env() -> anyhow::Result<Option<CorsLayer>> {
    let origins = match std::env::var("CORS_ALLOW_ORIGINS") {
        Ok(v) => v,
        Err(_) => return Ok(None),
    };

    let origins = origins.trim();
    if origins.is_empty() {
        return Ok(None);
    }

    let allow_origin = if origins == "*" {
        AllowOrigin::any()
    } else {
        let origins: Vec<HeaderValue> = origins
            .split(',')
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .map(|s| {
                s.parse::<HeaderValue>()
                    .map_err(|e| anyhow::anyhow!("Invalid CORS origin {s:?}: {e}"))
            })
            .collect::<anyhow::Result<_>>()?;
        AllowOrigin::list(origins)
    };

    Ok(Some(
        CorsLayer::new()
            .allow_origin(allow_origin)
            .allow_methods([Method::GET, Method::POST, Method::PUT, Method::PATCH])
            .allow_headers([
                axum::http::header::AUTHORIZATION,
                axum::http::header::CONTENT_TYPE,
            ]),
    ))
}

/// Resolves on Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down"),
        _ = terminate => info!("Received SIGTERM, shutting down"),
    }
}
