//! Application state and the route table.

use axum::{
    extract::{DefaultBodyLimit, State},
    http::{HeaderValue, Method, StatusCode},
    middleware,
    response::{IntoResponse, Json},
    routing::{get, post, put},
    Router,
};
use chrono::{NaiveDate, Utc};
use serde_json::json;
use std::sync::Arc;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::warn;

use crate::auth::TokenCodec;
use crate::config::AppConfig;
use crate::database::{Page, Store};
use crate::handlers::validate::Pagination;
use crate::handlers::{elevated, protected, public};
use crate::middleware::{authenticate, expose_error_detail, rate_limit, require_roles, RateLimiter};
use crate::services::{FileStorage, Mailer};
use crate::types::Role;

const ADMIN_ONLY: &[Role] = &[Role::Admin];
const MOTHERS_ONLY: &[Role] = &[Role::Mother];

/// Multipart framing on top of the file itself
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// Everything a handler can reach; cheap to clone per request
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub tokens: TokenCodec,
    pub files: Arc<dyn FileStorage>,
    pub mailer: Arc<dyn Mailer>,
    pub limiter: RateLimiter,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, files: Arc<dyn FileStorage>, mailer: Arc<dyn Mailer>, config: AppConfig) -> Self {
        Self {
            store,
            tokens: TokenCodec::from_config(&config.security),
            files,
            mailer,
            limiter: RateLimiter::from_config(&config.api),
            config: Arc::new(config),
        }
    }

    pub fn page(&self, paging: &Pagination) -> Page {
        paging.page(self.config.api.page_max_limit)
    }

    pub fn today(&self) -> NaiveDate {
        Utc::now().date_naive()
    }
}

pub fn router(state: AppState) -> Router {
    let config = state.config.clone();

    let api = Router::new()
        .merge(public_routes())
        .merge(protected_routes(&state))
        .merge(admin_routes(&state));

    let app = Router::new().route("/", get(root)).route("/health", get(health));
    let app = if config.server.base_path.is_empty() {
        app.merge(api)
    } else {
        app.nest(&config.server.base_path, api)
    };

    app.layer(middleware::from_fn_with_state(state.clone(), rate_limit))
        .layer(middleware::from_fn_with_state(state.clone(), expose_error_detail))
        .layer(DefaultBodyLimit::max(config.api.max_upload_bytes + MULTIPART_OVERHEAD))
        .layer(cors_layer(&config.security.cors_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn public_routes() -> Router<AppState> {
    use public::{auth, catalog};

    Router::new()
        .route("/auth/register", post(auth::register_post))
        .route("/auth/login", post(auth::login_post))
        .route("/classes", get(catalog::classes_get))
        .route("/classes/:id", get(catalog::class_get))
        .route("/classes/:id/reviews", get(catalog::class_reviews_get))
        .route("/events", get(catalog::events_get))
        .route("/events/:id", get(catalog::event_get))
        .route("/pregnancy/weeks/:week", get(catalog::week_guide_get))
}

fn protected_routes(state: &AppState) -> Router<AppState> {
    use protected::{account, classes, community, events, media, notifications, reports};

    Router::new()
        .route("/auth/me", get(account::me_get))
        .route("/users/profile", get(account::profile_get).put(account::profile_put))
        .route("/users/password", put(account::password_put))
        .route("/users/onboarding", post(account::onboarding_post))
        // Community
        .route("/community/groups", get(community::groups_get).post(community::group_post))
        .route(
            "/community/groups/:id",
            get(community::group_get)
                .put(community::group_put)
                .delete(community::group_delete),
        )
        .route("/community/groups/:id/join", post(community::group_join_post))
        .route("/community/groups/:id/leave", post(community::group_leave_post))
        .route("/community/posts", get(community::posts_get).post(community::post_post))
        .route(
            "/community/posts/:id",
            get(community::post_get)
                .put(community::post_put)
                .delete(community::post_delete),
        )
        .route(
            "/community/posts/:id/comments",
            get(community::comments_get).post(community::comment_post),
        )
        .route("/community/posts/:id/reactions", post(community::reaction_post))
        .route("/community/comments/:id", axum::routing::delete(community::comment_delete))
        // Classes
        .route("/classes", post(classes::class_post))
        .route("/classes/mine", get(classes::classes_mine_get))
        .route("/classes/enrolled", get(classes::enrolled_get))
        .route("/classes/:id", put(classes::class_put).delete(classes::class_delete))
        .route("/classes/:id/videos", post(classes::video_post))
        .route(
            "/classes/:id/videos/:video_id",
            put(classes::video_put).delete(classes::video_delete),
        )
        .route("/classes/:id/enroll", post(classes::enroll_post))
        .route("/classes/:id/progress", put(classes::progress_put))
        .route("/classes/:id/reviews", post(classes::review_post))
        // Events
        .route("/events", post(events::event_post))
        .route("/events/mine", get(events::events_mine_get))
        .route("/events/registered", get(events::registered_get))
        .route("/events/:id", put(events::event_put).delete(events::event_delete))
        .route(
            "/events/:id/register",
            post(events::register_post).delete(events::register_delete),
        )
        .route("/events/:id/registrations", get(events::registrations_get))
        // Media, notifications, reports
        .route("/media/upload", post(media::upload_post))
        .route("/media", get(media::media_get))
        .route("/media/:id", axum::routing::delete(media::media_delete))
        .route("/notifications", get(notifications::notifications_get))
        .route("/notifications/read-all", put(notifications::notifications_read_all_put))
        .route("/notifications/:id/read", put(notifications::notification_read_put))
        .route("/reports", post(reports::report_post))
        .merge(pregnancy_routes())
        .route_layer(middleware::from_fn_with_state(state.clone(), authenticate))
}

/// Mothers only; runs inside the protected router's authentication layer
fn pregnancy_routes() -> Router<AppState> {
    use protected::pregnancy;

    Router::new()
        .route("/pregnancy", post(pregnancy::pregnancy_post))
        .route("/pregnancy/current", get(pregnancy::pregnancy_current_get))
        .route(
            "/pregnancy/symptoms",
            get(pregnancy::symptoms_get).post(pregnancy::symptom_post),
        )
        .route(
            "/pregnancy/:id",
            get(pregnancy::pregnancy_get).put(pregnancy::pregnancy_put),
        )
        .route_layer(middleware::from_fn_with_state(MOTHERS_ONLY, require_roles))
}

fn admin_routes(state: &AppState) -> Router<AppState> {
    use elevated::admin;

    Router::new()
        .route("/admin/stats", get(admin::stats_get))
        .route("/admin/users", get(admin::users_get))
        .route("/admin/reports", get(admin::reports_get))
        .route("/admin/reports/:id", put(admin::report_put))
        .route("/admin/collaborators/:id/verify", put(admin::verify_collaborator_put))
        .route("/admin/classes/:id/publish", put(admin::class_publish_put))
        .route("/admin/events/:id/publish", put(admin::event_publish_put))
        .route("/admin/weeks/:week", put(admin::week_put))
        .route_layer(middleware::from_fn_with_state(ADMIN_ONLY, require_roles))
        .route_layer(middleware::from_fn_with_state(state.clone(), authenticate))
}

/// `*` anywhere in the list allows every origin
fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers(Any);

    if origins.iter().any(|o| o == "*") {
        return layer.allow_origin(Any);
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    layer.allow_origin(AllowOrigin::list(allowed))
}

async fn root(State(state): State<AppState>) -> Json<serde_json::Value> {
    let base = &state.config.server.base_path;

    Json(json!({
        "success": true,
        "data": {
            "name": "Nurture API",
            "version": env!("CARGO_PKG_VERSION"),
            "description": "Pregnancy tracking, community, classes and events",
            "environment": format!("{:?}", state.config.environment).to_lowercase(),
            "endpoints": {
                "health": "/health (public)",
                "auth": format!("{}/auth/* (public: register, login; protected: me)", base),
                "users": format!("{}/users/* (protected)", base),
                "pregnancy": format!("{}/pregnancy/* (mothers; weeks/:week public)", base),
                "community": format!("{}/community/* (protected)", base),
                "classes": format!("{}/classes[/:id] (public catalog, protected authoring)", base),
                "events": format!("{}/events[/:id] (public catalog, protected authoring)", base),
                "media": format!("{}/media/* (protected)", base),
                "notifications": format!("{}/notifications/* (protected)", base),
                "reports": format!("{}/reports (protected)", base),
                "admin": format!("{}/admin/* (administrators)", base),
            }
        }
    }))
}

async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let now = Utc::now();

    match state.store.ping().await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "data": {
                    "status": "ok",
                    "timestamp": now,
                    "database": "ok"
                }
            })),
        ),
        Err(e) => {
            warn!(error = %e, "Health check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "success": false,
                    "message": "Database unavailable",
                    "code": "SERVICE_UNAVAILABLE",
                    "data": {
                        "status": "degraded",
                        "timestamp": now
                    }
                })),
            )
        }
    }
}

/// Wire the store and providers chosen by configuration
pub async fn bootstrap(config: AppConfig) -> anyhow::Result<AppState> {
    use crate::config::DatabaseBackend;
    use crate::database::{DatabaseManager, MemoryStore, PgStore};
    use crate::services::{mailer, storage};

    if config.security.jwt_secret.is_empty() {
        anyhow::bail!("JWT_SECRET must be set");
    }

    let store: Arc<dyn Store> = match config.database.backend {
        DatabaseBackend::Postgres => {
            let pool = DatabaseManager::connect(&config.database).await?;
            DatabaseManager::apply_schema(&pool).await?;
            Arc::new(PgStore::new(pool))
        }
        DatabaseBackend::Memory => {
            if config.is_production() {
                warn!("Running production with the in-memory store; data is lost on restart");
            }
            Arc::new(MemoryStore::new())
        }
    };

    let files = storage::from_config(&config.storage);
    let mailer = mailer::from_config(&config.email);
    Ok(AppState::new(store, files, mailer, config))
}
