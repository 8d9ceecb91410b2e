//! cinescope-web library - movie discovery web service
//!
//! Serves the browsing UI and a JSON API over three external
//! collaborators: the TMDB movie catalog, the Firebase Auth identity
//! provider, and the Cloud Firestore document store holding per-user
//! ratings. Sessions and the catalog cache live in local SQLite.

use std::sync::Arc;

use axum::Router;
use sqlx::SqlitePool;

pub mod api;
pub mod error;
pub mod firebase;
pub mod genres;
pub mod session;
pub mod tmdb;

use firebase::auth::FirebaseAuthClient;
use firebase::firestore::FirestoreClient;
use tmdb::TmdbClient;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Local database: sessions, settings, catalog cache
    pub db: SqlitePool,
    /// Movie catalog client
    pub tmdb: Arc<TmdbClient>,
    /// Identity provider client
    pub auth: Arc<FirebaseAuthClient>,
    /// Document store client for ratings
    pub firestore: Arc<FirestoreClient>,
}

impl AppState {
    /// Create new application state
    pub fn new(
        db: SqlitePool,
        tmdb: TmdbClient,
        auth: FirebaseAuthClient,
        firestore: FirestoreClient,
    ) -> Self {
        Self {
            db,
            tmdb: Arc::new(tmdb),
            auth: Arc::new(auth),
            firestore: Arc::new(firestore),
        }
    }
}

/// Build application router
///
/// Browsing and account creation are public; rating endpoints and
/// session introspection require a valid session cookie.
pub fn build_router(state: AppState) -> Router {
    use axum::middleware;
    use axum::routing::{get, post, put};

    // Protected routes (require a session)
    let protected = Router::new()
        .route("/api/auth/session", get(api::auth::current_session))
        .route("/api/auth/logout", post(api::auth::logout))
        .route("/api/ratings", get(api::ratings::list_ratings))
        .route(
            "/api/ratings/:movie_id",
            put(api::ratings::set_rating)
                .get(api::ratings::get_rating)
                .delete(api::ratings::delete_rating),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            api::session_middleware,
        ));

    // Public routes (no session required)
    let public = Router::new()
        .route("/", get(api::ui::serve_index))
        .route("/static/app.js", get(api::ui::serve_app_js))
        .route("/api/auth/register", post(api::auth::register))
        .route("/api/auth/login", post(api::auth::login))
        .route("/api/movies/popular", get(api::movies::popular))
        .route("/api/movies/now-playing", get(api::movies::now_playing))
        .route("/api/movies/top-rated", get(api::movies::top_rated))
        .route("/api/movies/discover", get(api::movies::discover))
        .route("/api/movies/:id", get(api::movies::details))
        .route("/api/search", get(api::movies::search))
        .route("/api/people/trending", get(api::movies::trending_people))
        .route("/api/genres", get(api::movies::list_genres))
        .merge(api::health_routes());

    // Combine routers
    Router::new()
        .merge(protected)
        .merge(public)
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .layer(cors_layer())
        .with_state(state)
}

/// CORS policy for the JSON API
fn cors_layer() -> tower_http::cors::CorsLayer {
    use axum::http::{header, Method};

    tower_http::cors::CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE])
}
