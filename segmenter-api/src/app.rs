/// Application state and router builder
///
/// This module defines the shared application state and provides
/// a function to build the Axum router with all routes and middleware.
///
/// # Example
///
/// ```no_run
/// use segmenter_api::{app::{build_router, AppState}, config::Config};
/// use segmenter_shared::db::pool::create_pool;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let pool = create_pool(config.pool_config()).await?;
/// let app = build_router(AppState::new(pool, config));
/// # Ok(())
/// # }
/// ```

use crate::config::Config;
use axum::{
    routing::{get, patch, post},
    Router,
};
use segmenter_shared::store::MembershipStore;
use sqlx::PgPool;
use std::sync::Arc;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

/// Shared application state
///
/// This is cloned for each request handler via Axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    /// Membership store (owns the connection pool)
    pub store: MembershipStore,

    /// Application configuration
    pub config: Arc<Config>,
}

impl AppState {
    /// Creates new application state
    pub fn new(db: PgPool, config: Config) -> Self {
        Self {
            store: MembershipStore::new(db),
            config: Arc::new(config),
        }
    }

    /// Database connection pool
    pub fn db(&self) -> &PgPool {
        self.store.pool()
    }
}

/// Builds the complete Axum router with all routes and middleware
///
/// # Architecture
///
/// ```text
/// /
/// ├── GET /health
/// └── /v1/
///     ├── /users
///     │   ├── POST   /                   # Create user
///     │   ├── GET    /                   # List users with segments
///     │   ├── DELETE /:id                # Delete user
///     │   ├── GET    /:id/segments       # Segments of a user
///     │   ├── POST   /add_segment        # Add membership
///     │   └── POST   /remove_segment     # Remove membership
///     └── /segments
///         ├── POST   /                   # Create segment
///         ├── GET    /                   # List segments with members
///         ├── POST   /distribute         # Distribute to a percentage of users
///         ├── PATCH  /:name              # Rename segment
///         ├── DELETE /:name              # Delete segment
///         └── GET    /:name/users        # Members of a segment
/// ```
///
/// Every request and response is logged by tower-http's `TraceLayer`.
pub fn build_router(state: AppState) -> Router {
    use crate::routes;

    let health_routes = Router::new().route("/health", get(routes::health::health_check));

    let user_routes = Router::new()
        .route(
            "/",
            post(routes::users::create_user).get(routes::users::list_users),
        )
        .route("/add_segment", post(routes::users::add_segment))
        .route("/remove_segment", post(routes::users::remove_segment))
        .route("/:id", axum::routing::delete(routes::users::delete_user))
        .route("/:id/segments", get(routes::users::get_user_segments));

    let segment_routes = Router::new()
        .route(
            "/",
            post(routes::segments::create_segment).get(routes::segments::list_segments),
        )
        .route("/distribute", post(routes::segments::distribute_segment))
        .route(
            "/:name",
            patch(routes::segments::rename_segment).delete(routes::segments::delete_segment),
        )
        .route("/:name/users", get(routes::segments::get_segment_users));

    let v1_routes = Router::new()
        .nest("/users", user_routes)
        .nest("/segments", segment_routes);

    Router::new()
        .merge(health_routes)
        .nest("/v1", v1_routes)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .with_state(state)
}
