//! Movie browsing, discovery, and search endpoints
//!
//! These endpoints are public: browsing the catalog never requires a
//! session. List responses are cached in SQLite for a short TTL so
//! page refreshes and back-navigation don't re-query the catalog.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::future::Future;
use tracing::warn;

use cinescope_common::db::settings;

use crate::error::{ApiError, ApiResult};
use crate::genres::{self, Genre};
use crate::tmdb::{self, cache, MovieDetails, MovieSummary, Page, Person, TmdbError};
use crate::AppState;

/// Pagination query for list endpoints
#[derive(Debug, Deserialize)]
pub struct PageQuery {
    pub page: Option<i64>,
}

/// Query for genre discovery
#[derive(Debug, Deserialize)]
pub struct DiscoverQuery {
    pub genre_id: u32,
    pub page: Option<i64>,
}

/// Query for title search
#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub query: String,
    pub page: Option<i64>,
}

/// GET /api/movies/popular
pub async fn popular(
    State(state): State<AppState>,
    Query(params): Query<PageQuery>,
) -> ApiResult<Json<Page<MovieSummary>>> {
    let page = tmdb::clamp_page(params.page.unwrap_or(1));
    let page_param = format!("page={}", page);
    let parts = ["/movie/popular", page_param.as_str()];

    with_cache(&state, &parts, || state.tmdb.popular_movies(page)).await
}

/// GET /api/movies/now-playing
pub async fn now_playing(
    State(state): State<AppState>,
    Query(params): Query<PageQuery>,
) -> ApiResult<Json<Page<MovieSummary>>> {
    let page = tmdb::clamp_page(params.page.unwrap_or(1));
    let page_param = format!("page={}", page);
    let parts = ["/movie/now_playing", page_param.as_str()];

    with_cache(&state, &parts, || state.tmdb.now_playing(page)).await
}

/// GET /api/movies/top-rated
pub async fn top_rated(
    State(state): State<AppState>,
    Query(params): Query<PageQuery>,
) -> ApiResult<Json<Page<MovieSummary>>> {
    let page = tmdb::clamp_page(params.page.unwrap_or(1));
    let page_param = format!("page={}", page);
    let parts = ["/movie/top_rated", page_param.as_str()];

    with_cache(&state, &parts, || state.tmdb.top_rated(page)).await
}

/// GET /api/movies/discover?genre_id=&page=
///
/// Rejects genre ids outside the fixed catalog before touching the
/// upstream service.
pub async fn discover(
    State(state): State<AppState>,
    Query(params): Query<DiscoverQuery>,
) -> ApiResult<Json<Page<MovieSummary>>> {
    let genre = genres::by_id(params.genre_id)
        .ok_or_else(|| ApiError::BadRequest(format!("Unknown genre id: {}", params.genre_id)))?;

    let page = tmdb::clamp_page(params.page.unwrap_or(1));
    let genre_param = format!("with_genres={}", genre.id);
    let page_param = format!("page={}", page);
    let parts = ["/discover/movie", genre_param.as_str(), page_param.as_str()];

    with_cache(&state, &parts, || state.tmdb.discover_by_genre(genre.id, page)).await
}

/// GET /api/search?query=&page=
///
/// Search results are not cached; queries rarely repeat within the
/// cache TTL.
pub async fn search(
    State(state): State<AppState>,
    Query(params): Query<SearchQuery>,
) -> ApiResult<Json<Page<MovieSummary>>> {
    let query = params.query.trim();
    if query.is_empty() {
        return Err(ApiError::BadRequest(
            "Search query must not be empty".to_string(),
        ));
    }

    let page = tmdb::clamp_page(params.page.unwrap_or(1));
    let results = state.tmdb.search_movies(query, page).await?;

    Ok(Json(results))
}

/// GET /api/movies/:id
pub async fn details(
    State(state): State<AppState>,
    Path(movie_id): Path<u64>,
) -> ApiResult<Json<MovieDetails>> {
    let path = format!("/movie/{}", movie_id);
    let parts = [path.as_str()];

    with_cache(&state, &parts, || state.tmdb.movie_details(movie_id)).await
}

/// GET /api/people/trending
pub async fn trending_people(
    State(state): State<AppState>,
    Query(params): Query<PageQuery>,
) -> ApiResult<Json<Page<Person>>> {
    let page = tmdb::clamp_page(params.page.unwrap_or(1));
    let page_param = format!("page={}", page);
    let parts = ["/trending/person/week", page_param.as_str()];

    with_cache(&state, &parts, || state.tmdb.trending_people(page)).await
}

/// GET /api/genres
pub async fn list_genres() -> Json<&'static [Genre]> {
    Json(genres::GENRES)
}

/// Serve a catalog response through the cache
///
/// On a miss (or an unreadable cached body) the fetch runs and its
/// result is stored. Cache write failures are logged, not surfaced:
/// the response in hand is still good.
async fn with_cache<T, F, Fut>(state: &AppState, parts: &[&str], fetch: F) -> ApiResult<Json<T>>
where
    T: Serialize + DeserializeOwned,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, TmdbError>>,
{
    let hash = cache::request_hash(parts);
    let ttl = settings::get_catalog_cache_ttl_seconds(&state.db).await?;

    if let Some(body) = cache::lookup(&state.db, &hash, ttl).await? {
        match serde_json::from_str(&body) {
            Ok(value) => return Ok(Json(value)),
            Err(e) => warn!(hash = %hash, "Discarding unreadable cache entry: {}", e),
        }
    }

    let value = fetch().await?;

    match serde_json::to_string(&value) {
        Ok(body) => {
            if let Err(e) = cache::store(&state.db, &hash, &body).await {
                warn!(hash = %hash, "Failed to cache catalog response: {}", e);
            }
        }
        Err(e) => warn!("Failed to serialize catalog response for cache: {}", e),
    }

    Ok(Json(value))
}
