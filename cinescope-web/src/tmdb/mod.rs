//! TMDB (The Movie Database) API client
//!
//! Typed client for the movie-catalog HTTP API with request rate
//! limiting. The catalog itself is an external collaborator; this
//! module only speaks its existing interface.

pub mod cache;

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::Mutex;

const TMDB_BASE_URL: &str = "https://api.themoviedb.org/3";
const USER_AGENT: &str = "Cinescope/0.1.0 (+https://github.com/cinescope/cinescope)";
const RATE_LIMIT_MS: u64 = 100;

/// TMDB caps list pagination at 500 pages
pub const MAX_PAGE: u32 = 500;

/// TMDB client errors
#[derive(Debug, Error)]
pub enum TmdbError {
    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Movie not found: {0}")]
    MovieNotFound(u64),

    #[error("Invalid API key")]
    InvalidApiKey,

    #[error("Rate limit exceeded")]
    RateLimited,

    #[error("API error {0}: {1}")]
    ApiError(u16, String),

    #[error("Parse error: {0}")]
    ParseError(String),
}

/// One page of catalog results
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Page<T> {
    pub page: u32,
    pub results: Vec<T>,
    pub total_pages: u32,
    pub total_results: u64,
}

/// Movie fields used by list views
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MovieSummary {
    pub id: u64,
    pub title: String,
    pub poster_path: Option<String>,
    #[serde(default)]
    pub overview: String,
    pub release_date: Option<String>,
    #[serde(default)]
    pub vote_average: f64,
}

/// Full movie details
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MovieDetails {
    pub id: u64,
    pub title: String,
    pub poster_path: Option<String>,
    #[serde(default)]
    pub overview: String,
    pub release_date: Option<String>,
    #[serde(default)]
    pub vote_average: f64,
    #[serde(default)]
    pub genres: Vec<MovieGenre>,
    pub runtime: Option<u32>,
    pub tagline: Option<String>,
}

/// Genre entry as returned inside movie details
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MovieGenre {
    pub id: u32,
    pub name: String,
}

/// A person from the trending feed
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Person {
    pub id: u64,
    pub name: String,
    pub profile_path: Option<String>,
    #[serde(default)]
    pub known_for_department: String,
}

/// Clamp a requested page into TMDB's accepted range [1, 500]
pub fn clamp_page(requested: i64) -> u32 {
    requested.clamp(1, MAX_PAGE as i64) as u32
}

/// Rate limiter enforcing a minimum interval between requests
struct RateLimiter {
    last_request: Mutex<Option<Instant>>,
    min_interval: Duration,
}

impl RateLimiter {
    fn new(min_interval_ms: u64) -> Self {
        Self {
            last_request: Mutex::new(None),
            min_interval: Duration::from_millis(min_interval_ms),
        }
    }

    /// Wait if necessary to comply with rate limit
    async fn wait(&self) {
        let mut last = self.last_request.lock().await;

        if let Some(last_time) = *last {
            let elapsed = last_time.elapsed();
            if elapsed < self.min_interval {
                let wait_time = self.min_interval - elapsed;
                tracing::debug!("Rate limiting: waiting {:?}", wait_time);
                tokio::time::sleep(wait_time).await;
            }
        }

        *last = Some(Instant::now());
    }
}

/// TMDB API client
pub struct TmdbClient {
    http_client: reqwest::Client,
    api_key: String,
    language: String,
    rate_limiter: Arc<RateLimiter>,
}

impl TmdbClient {
    pub fn new(api_key: String, language: String, timeout: Duration) -> Result<Self, TmdbError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| TmdbError::NetworkError(e.to_string()))?;

        Ok(Self {
            http_client,
            api_key,
            language,
            rate_limiter: Arc::new(RateLimiter::new(RATE_LIMIT_MS)),
        })
    }

    /// GET /movie/popular
    pub async fn popular_movies(&self, page: u32) -> Result<Page<MovieSummary>, TmdbError> {
        self.get_page("/movie/popular", &[("page", page.to_string())])
            .await
    }

    /// GET /movie/now_playing
    pub async fn now_playing(&self, page: u32) -> Result<Page<MovieSummary>, TmdbError> {
        self.get_page("/movie/now_playing", &[("page", page.to_string())])
            .await
    }

    /// GET /movie/top_rated
    pub async fn top_rated(&self, page: u32) -> Result<Page<MovieSummary>, TmdbError> {
        self.get_page("/movie/top_rated", &[("page", page.to_string())])
            .await
    }

    /// GET /trending/person/week
    pub async fn trending_people(&self, page: u32) -> Result<Page<Person>, TmdbError> {
        self.get_page("/trending/person/week", &[("page", page.to_string())])
            .await
    }

    /// GET /discover/movie?with_genres=
    pub async fn discover_by_genre(
        &self,
        genre_id: u32,
        page: u32,
    ) -> Result<Page<MovieSummary>, TmdbError> {
        self.get_page(
            "/discover/movie",
            &[
                ("with_genres", genre_id.to_string()),
                ("page", page.to_string()),
            ],
        )
        .await
    }

    /// GET /search/movie?query=
    pub async fn search_movies(
        &self,
        query: &str,
        page: u32,
    ) -> Result<Page<MovieSummary>, TmdbError> {
        self.get_page(
            "/search/movie",
            &[("query", query.to_string()), ("page", page.to_string())],
        )
        .await
    }

    /// GET /movie/{id}
    pub async fn movie_details(&self, movie_id: u64) -> Result<MovieDetails, TmdbError> {
        self.rate_limiter.wait().await;

        let url = format!("{}/movie/{}", TMDB_BASE_URL, movie_id);

        tracing::debug!(movie_id, url = %url, "Querying TMDB movie details");

        let response = self
            .http_client
            .get(&url)
            .query(&[
                ("api_key", self.api_key.as_str()),
                ("language", self.language.as_str()),
            ])
            .send()
            .await
            .map_err(|e| TmdbError::NetworkError(e.to_string()))?;

        let status = response.status();

        if status == 404 {
            return Err(TmdbError::MovieNotFound(movie_id));
        }

        Self::check_status(status, response).await?.json().await.map_err(|e| {
            TmdbError::ParseError(e.to_string())
        })
    }

    /// Fetch one paginated list endpoint
    async fn get_page<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<Page<T>, TmdbError> {
        self.rate_limiter.wait().await;

        let url = format!("{}{}", TMDB_BASE_URL, path);

        tracing::debug!(url = %url, "Querying TMDB");

        let mut request = self.http_client.get(&url).query(&[
            ("api_key", self.api_key.as_str()),
            ("language", self.language.as_str()),
        ]);
        for (key, value) in params {
            request = request.query(&[(key, value.as_str())]);
        }

        let response = request
            .send()
            .await
            .map_err(|e| TmdbError::NetworkError(e.to_string()))?;

        let status = response.status();
        let response = Self::check_status(status, response).await?;

        let page: Page<T> = response
            .json()
            .await
            .map_err(|e| TmdbError::ParseError(e.to_string()))?;

        tracing::debug!(
            path,
            page = page.page,
            results = page.results.len(),
            "Retrieved catalog page"
        );

        Ok(page)
    }

    async fn check_status(
        status: reqwest::StatusCode,
        response: reqwest::Response,
    ) -> Result<reqwest::Response, TmdbError> {
        if status == 401 {
            return Err(TmdbError::InvalidApiKey);
        }

        if status == 429 {
            return Err(TmdbError::RateLimited);
        }

        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(TmdbError::ApiError(status.as_u16(), error_text));
        }

        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_page_bounds() {
        assert_eq!(clamp_page(0), 1);
        assert_eq!(clamp_page(-5), 1);
        assert_eq!(clamp_page(1), 1);
        assert_eq!(clamp_page(250), 250);
        assert_eq!(clamp_page(500), 500);
        assert_eq!(clamp_page(9999), 500);
    }

    #[test]
    fn test_client_creation() {
        let client = TmdbClient::new(
            "test-key".to_string(),
            "en-US".to_string(),
            Duration::from_secs(30),
        );
        assert!(client.is_ok());
    }

    #[test]
    fn test_movie_page_deserializes() {
        // Shape matches a real /movie/popular response, trimmed
        let body = r#"{
            "page": 1,
            "results": [
                {
                    "id": 550,
                    "title": "Fight Club",
                    "poster_path": "/pB8BM7pdSp6B6Ih7QZ4DrQ3PmJK.jpg",
                    "overview": "A ticking-time-bomb insomniac...",
                    "release_date": "1999-10-15",
                    "vote_average": 8.438
                },
                {
                    "id": 27205,
                    "title": "Inception",
                    "poster_path": null,
                    "overview": "",
                    "release_date": null
                }
            ],
            "total_pages": 500,
            "total_results": 10000
        }"#;

        let page: Page<MovieSummary> = serde_json::from_str(body).expect("should deserialize");
        assert_eq!(page.page, 1);
        assert_eq!(page.results.len(), 2);
        assert_eq!(page.results[0].id, 550);
        assert_eq!(page.results[1].poster_path, None);
        assert_eq!(page.results[1].vote_average, 0.0);
        assert_eq!(page.total_pages, 500);
    }

    #[test]
    fn test_movie_details_deserializes() {
        let body = r#"{
            "id": 550,
            "title": "Fight Club",
            "poster_path": "/pB8BM7pdSp6B6Ih7QZ4DrQ3PmJK.jpg",
            "overview": "A ticking-time-bomb insomniac...",
            "release_date": "1999-10-15",
            "vote_average": 8.438,
            "genres": [{"id": 18, "name": "Drama"}, {"id": 53, "name": "Thriller"}],
            "runtime": 139,
            "tagline": "Mischief. Mayhem. Soap."
        }"#;

        let details: MovieDetails = serde_json::from_str(body).expect("should deserialize");
        assert_eq!(details.genres.len(), 2);
        assert_eq!(details.genres[0].name, "Drama");
        assert_eq!(details.runtime, Some(139));
    }

    #[test]
    fn test_person_page_deserializes() {
        let body = r#"{
            "page": 1,
            "results": [
                {
                    "id": 500,
                    "name": "Tom Cruise",
                    "profile_path": "/eOh4ubpOm2Igdg0QH2ghj0mFtC.jpg",
                    "known_for_department": "Acting"
                }
            ],
            "total_pages": 1,
            "total_results": 1
        }"#;

        let page: Page<Person> = serde_json::from_str(body).expect("should deserialize");
        assert_eq!(page.results[0].name, "Tom Cruise");
        assert_eq!(page.results[0].known_for_department, "Acting");
    }

    #[tokio::test]
    async fn test_rate_limiter_timing() {
        let limiter = RateLimiter::new(50);

        let start = Instant::now();
        limiter.wait().await;
        let first_elapsed = start.elapsed();

        limiter.wait().await;
        let second_elapsed = start.elapsed();

        assert!(first_elapsed < Duration::from_millis(30));
        assert!(second_elapsed >= Duration::from_millis(45));
    }
}
