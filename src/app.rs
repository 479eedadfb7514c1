use std::sync::Arc;

use axum::routing::{delete, get, post};
use axum::{Router, middleware};
use sea_orm::{DatabaseConnection, DbErr};
use tower::ServiceBuilder;
use tower_http::request_id::MakeRequestUuid;
use tower_http::trace::TraceLayer;
use tower_http::{ServiceBuilderExt, cors::CorsLayer};
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable};

use crate::auth::{
    Blacklist, CredentialStore, JwtCodec, RefreshTokenLedger, SessionRegistry, require_auth,
};
use crate::cleanup::CleanupScheduler;
use crate::config::Config;
use crate::controllers::{auth as auth_controller, sessions as sessions_controller};
use crate::mail::{LogMailer, Mailer};
use crate::openapi::ApiDoc;
use crate::db;
use crate::response::{ApiResponse, stamp_path};

/// Explicitly assembled dependencies, shared by every handler. No framework
/// wiring: the constructor is the dependency graph.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub codec: JwtCodec,
    pub credentials: CredentialStore,
    pub ledger: RefreshTokenLedger,
    pub blacklist: Blacklist,
    pub sessions: SessionRegistry,
    pub mailer: Arc<dyn Mailer>,
}

impl AppState {
    pub fn assemble(
        db: DatabaseConnection,
        mailer: Arc<dyn Mailer>,
        config: Arc<Config>,
    ) -> Self {
        Self {
            codec: JwtCodec::new(&config.jwt_secret, config.access_ttl()),
            credentials: CredentialStore::new(db.clone()),
            ledger: RefreshTokenLedger::new(db.clone()),
            blacklist: Blacklist::new(db.clone()),
            sessions: SessionRegistry::new(db),
            mailer,
            config,
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    let public = Router::new()
        .route("/auth/register", post(auth_controller::register))
        .route("/auth/login", post(auth_controller::login))
        .route("/auth/refresh", post(auth_controller::refresh))
        .route("/auth/forgot-password", post(auth_controller::forgot_password))
        .route("/auth/reset-password", post(auth_controller::reset_password))
        .route("/auth/verify-email", post(auth_controller::verify_email));

    let protected = Router::new()
        .route("/auth/logout", post(auth_controller::logout))
        .route(
            "/auth/resend-verification",
            post(auth_controller::resend_verification),
        )
        .route("/auth/sessions", get(sessions_controller::list_sessions))
        .route(
            "/auth/sessions/revoke",
            delete(sessions_controller::revoke_session),
        )
        .route(
            "/auth/sessions/revoke-others",
            delete(sessions_controller::revoke_other_sessions),
        )
        .route(
            "/auth/sessions/logout-all",
            delete(sessions_controller::logout_all_sessions),
        )
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    let is_dev = state.config.is_dev();
    let mut router = Router::new()
        .merge(public)
        .merge(protected)
        .route("/health", get(health))
        .layer(middleware::from_fn(stamp_path))
        .layer(CorsLayer::permissive())
        .with_state(state)
        .merge(Scalar::with_url("/api-docs", ApiDoc::openapi()));

    if is_dev {
        router = router.layer(
            ServiceBuilder::new()
                .set_x_request_id(MakeRequestUuid)
                .layer(TraceLayer::new_for_http())
                .propagate_x_request_id(),
        );
    }
    router
}

async fn health() -> ApiResponse<()> {
    ApiResponse::message("ok")
}

/// The assembled service: database connected and migrated, router built,
/// cleanup scheduler ready to spawn.
pub struct App {
    state: AppState,
    router: Router,
}

impl App {
    pub async fn new(config: Config) -> Result<Self, DbErr> {
        let db = db::connect(&config.database_url).await?;
        let config = Arc::new(config);
        let state = AppState::assemble(db, Arc::new(LogMailer), config);
        let router = build_router(state.clone());
        Ok(Self { state, router })
    }

    pub async fn run(self) -> std::io::Result<()> {
        CleanupScheduler::new(
            self.state.ledger.clone(),
            self.state.blacklist.clone(),
            self.state.sessions.clone(),
            self.state.config.clone(),
        )
        .spawn();

        let listener = tokio::net::TcpListener::bind(self.state.config.server_addr()).await?;
        tracing::info!(addr = %listener.local_addr()?, "doorman listening");
        axum::serve(
            listener,
            self.router
                .into_make_service_with_connect_info::<std::net::SocketAddr>(),
        )
            .with_graceful_shutdown(shutdown_signal())
            .await
    }
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        tracing::info!("shutdown signal received");
    }
}
