use axum::{
    Router,
    http::HeaderValue,
    middleware,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tower_sessions::{Expiry, MemoryStore, SessionManagerLayer};

use crate::clients::email::Mailer;
use crate::config::Config;
use crate::state::SharedState;

pub mod auth;
mod error;
pub mod events;
mod extract;
mod moderation;
mod observability;
mod parental;
mod system;
mod types;
mod users;
mod validation;

pub use error::ApiError;
pub use types::*;

use crate::services::{
    AccountService, EventService, ModerationService, ParentalService, SocialService,
};
use metrics_exporter_prometheus::PrometheusHandle;

#[derive(Clone)]
pub struct AppState {
    pub shared: Arc<SharedState>,

    pub start_time: std::time::Instant,

    pub prometheus_handle: Option<PrometheusHandle>,
}

impl AppState {
    #[must_use]
    pub fn config(&self) -> &Arc<Config> {
        &self.shared.config
    }

    #[must_use]
    pub fn store(&self) -> &crate::db::Store {
        &self.shared.store
    }

    #[must_use]
    pub fn parental(&self) -> &Arc<dyn ParentalService> {
        &self.shared.parental
    }

    #[must_use]
    pub fn accounts(&self) -> &Arc<dyn AccountService> {
        &self.shared.accounts
    }

    #[must_use]
    pub fn social(&self) -> &Arc<dyn SocialService> {
        &self.shared.social
    }

    #[must_use]
    pub fn moderation(&self) -> &Arc<dyn ModerationService> {
        &self.shared.moderation
    }

    #[must_use]
    pub fn events(&self) -> &Arc<dyn EventService> {
        &self.shared.events
    }
}

#[must_use]
pub fn create_app_state(
    shared: Arc<SharedState>,
    prometheus_handle: Option<PrometheusHandle>,
) -> Arc<AppState> {
    Arc::new(AppState {
        shared,
        start_time: std::time::Instant::now(),
        prometheus_handle,
    })
}

pub async fn create_app_state_from_config(
    config: Config,
    prometheus_handle: Option<PrometheusHandle>,
) -> anyhow::Result<Arc<AppState>> {
    let shared = Arc::new(SharedState::new(config).await?);
    Ok(create_app_state(shared, prometheus_handle))
}

/// Same as [`create_app_state_from_config`] with an explicit mail transport.
pub async fn create_app_state_with_mailer(
    config: Config,
    mailer: Arc<dyn Mailer>,
    prometheus_handle: Option<PrometheusHandle>,
) -> anyhow::Result<Arc<AppState>> {
    let shared = Arc::new(SharedState::with_mailer(config, mailer).await?);
    Ok(create_app_state(shared, prometheus_handle))
}

pub fn router(state: Arc<AppState>) -> Router {
    let server = state.config().server.clone();

    let session_store = MemoryStore::default();
    let session_layer = SessionManagerLayer::new(session_store)
        .with_secure(server.secure_cookies)
        .with_same_site(tower_sessions::cookie::SameSite::Lax)
        .with_expiry(Expiry::OnInactivity(time::Duration::minutes(
            server.session_minutes,
        )));

    let api_router = Router::new()
        .merge(auth_routes())
        .merge(parental_routes())
        .merge(user_routes())
        .merge(moderation_routes())
        .merge(events::router())
        .route("/health", get(system::health))
        .route("/metrics", get(observability::get_metrics))
        .layer(session_layer)
        .with_state(state);

    let cors_layer = if server.cors_allowed_origins.iter().any(|o| o == "*") {
        CorsLayer::new().allow_origin(Any)
    } else {
        let origins: Vec<HeaderValue> = server
            .cors_allowed_origins
            .iter()
            .filter_map(|s| s.parse().ok())
            .collect();
        CorsLayer::new().allow_origin(origins)
    };

    Router::new()
        .nest("/api", api_router)
        .layer(cors_layer.allow_methods(Any).allow_headers(Any))
        .layer(middleware::from_fn(observability::security_headers_middleware))
        .layer(middleware::from_fn(observability::logging_middleware))
        .layer(TraceLayer::new_for_http())
}

fn auth_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/logout", post(auth::logout))
        .route("/auth/me", get(auth::me))
        .route("/auth/forgot-password", post(auth::forgot_password))
        .route(
            "/auth/reset-password",
            get(auth::validate_reset_token).post(auth::reset_password),
        )
}

fn parental_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/parental-controls/setup-pin", post(parental::setup_pin))
        .route("/parental-controls/verify-pin", post(parental::verify_pin))
        .route(
            "/parental-controls/settings",
            get(parental::get_settings).put(parental::update_settings),
        )
        .route("/parental-controls/reset-pin", post(parental::request_reset))
        .route(
            "/parental-controls/complete-reset",
            post(parental::complete_reset),
        )
        .route("/parental-controls/disable", post(parental::disable))
        .route("/parental-controls/can-message", get(parental::can_message))
}

fn user_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/users/follow", post(users::follow).delete(users::unfollow))
        .route("/users/{id}", get(users::get_user).delete(users::delete_user))
        .route("/users/{id}/followers", get(users::followers))
        .route("/users/{id}/following", get(users::following))
        .route(
            "/users/{id}/is-following/{other}",
            get(users::is_following),
        )
}

fn moderation_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/moderation/block",
            get(moderation::blocked)
                .post(moderation::block)
                .delete(moderation::unblock),
        )
        .route(
            "/moderation/report",
            get(moderation::list_reports).post(moderation::report),
        )
}
