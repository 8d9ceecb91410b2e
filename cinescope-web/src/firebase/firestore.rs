//! Cloud Firestore REST client
//!
//! Per-user movie ratings live in the hosted document store at
//! `userRatings/{uid}/ratings/{movieId}`, exactly the layout the
//! original application used. This module maps between that store's
//! typed JSON values and plain rating records; it implements no
//! storage of its own.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{json, Value};
use std::time::Duration;
use thiserror::Error;

const FIRESTORE_BASE_URL: &str = "https://firestore.googleapis.com/v1";

/// Document store client errors
#[derive(Debug, Error)]
pub enum FirestoreError {
    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Permission denied by document store")]
    PermissionDenied,

    #[error("Document store error {0}: {1}")]
    ApiError(u16, String),

    #[error("Parse error: {0}")]
    ParseError(String),
}

/// A user's rating for one movie
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserRating {
    pub movie_id: u64,
    pub rating: i64,
    pub timestamp: Option<DateTime<Utc>>,
}

/// Cloud Firestore client
pub struct FirestoreClient {
    http_client: reqwest::Client,
    project_id: String,
}

impl FirestoreClient {
    pub fn new(project_id: String, timeout: Duration) -> Result<Self, FirestoreError> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FirestoreError::NetworkError(e.to_string()))?;

        Ok(Self {
            http_client,
            project_id,
        })
    }

    fn document_url(&self, uid: &str, movie_id: u64) -> String {
        format!(
            "{}/projects/{}/databases/(default)/documents/userRatings/{}/ratings/{}",
            FIRESTORE_BASE_URL, self.project_id, uid, movie_id
        )
    }

    fn collection_url(&self, uid: &str) -> String {
        format!(
            "{}/projects/{}/databases/(default)/documents/userRatings/{}/ratings",
            FIRESTORE_BASE_URL, self.project_id, uid
        )
    }

    /// Create or replace the rating document for a movie
    pub async fn set_rating(
        &self,
        id_token: &str,
        uid: &str,
        movie_id: u64,
        rating: i64,
    ) -> Result<UserRating, FirestoreError> {
        let now = Utc::now();
        let body = json!({ "fields": encode_rating_fields(movie_id, rating, now) });

        let response = self
            .http_client
            .patch(self.document_url(uid, movie_id))
            .bearer_auth(id_token)
            .json(&body)
            .send()
            .await
            .map_err(|e| FirestoreError::NetworkError(e.to_string()))?;

        let response = check_status(response).await?;

        let document: Value = response
            .json()
            .await
            .map_err(|e| FirestoreError::ParseError(e.to_string()))?;

        decode_rating_document(&document)
    }

    /// Fetch the rating document for a movie; None if absent
    pub async fn get_rating(
        &self,
        id_token: &str,
        uid: &str,
        movie_id: u64,
    ) -> Result<Option<UserRating>, FirestoreError> {
        let response = self
            .http_client
            .get(self.document_url(uid, movie_id))
            .bearer_auth(id_token)
            .send()
            .await
            .map_err(|e| FirestoreError::NetworkError(e.to_string()))?;

        if response.status() == 404 {
            return Ok(None);
        }

        let response = check_status(response).await?;

        let document: Value = response
            .json()
            .await
            .map_err(|e| FirestoreError::ParseError(e.to_string()))?;

        decode_rating_document(&document).map(Some)
    }

    /// Delete the rating document for a movie (idempotent: the store
    /// treats deleting an absent document as success)
    pub async fn delete_rating(
        &self,
        id_token: &str,
        uid: &str,
        movie_id: u64,
    ) -> Result<(), FirestoreError> {
        let response = self
            .http_client
            .delete(self.document_url(uid, movie_id))
            .bearer_auth(id_token)
            .send()
            .await
            .map_err(|e| FirestoreError::NetworkError(e.to_string()))?;

        check_status(response).await?;
        Ok(())
    }

    /// List all rating documents for a user
    ///
    /// The store pages its list responses; collections larger than one
    /// page carry a `nextPageToken`, which is followed until absent so
    /// the full collection comes back.
    pub async fn list_ratings(
        &self,
        id_token: &str,
        uid: &str,
    ) -> Result<Vec<UserRating>, FirestoreError> {
        let mut ratings = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut request = self
                .http_client
                .get(self.collection_url(uid))
                .bearer_auth(id_token)
                .query(&[("pageSize", "300")]);

            if let Some(token) = &page_token {
                request = request.query(&[("pageToken", token.as_str())]);
            }

            let response = request
                .send()
                .await
                .map_err(|e| FirestoreError::NetworkError(e.to_string()))?;

            let response = check_status(response).await?;

            let body: Value = response
                .json()
                .await
                .map_err(|e| FirestoreError::ParseError(e.to_string()))?;

            let (mut page, next_token) = decode_list_page(&body)?;
            ratings.append(&mut page);

            match next_token {
                Some(token) => page_token = Some(token),
                None => return Ok(ratings),
            }
        }
    }
}

/// Decode one page of a collection listing: the documents plus the
/// continuation token, if any
///
/// An empty collection comes back as {} with no documents array.
fn decode_list_page(body: &Value) -> Result<(Vec<UserRating>, Option<String>), FirestoreError> {
    let ratings = match body.get("documents").and_then(|d| d.as_array()) {
        Some(docs) => docs
            .iter()
            .map(decode_rating_document)
            .collect::<Result<Vec<_>, _>>()?,
        None => Vec::new(),
    };

    let next_token = body
        .get("nextPageToken")
        .and_then(|t| t.as_str())
        .filter(|t| !t.is_empty())
        .map(String::from);

    Ok((ratings, next_token))
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, FirestoreError> {
    let status = response.status();

    if status == 401 || status == 403 {
        return Err(FirestoreError::PermissionDenied);
    }

    if !status.is_success() {
        let text = response.text().await.unwrap_or_default();
        return Err(FirestoreError::ApiError(status.as_u16(), text));
    }

    Ok(response)
}

/// Encode a rating as Firestore typed fields
///
/// Firestore represents 64-bit integers as strings inside
/// `integerValue`; timestamps are RFC3339 `timestampValue`.
fn encode_rating_fields(movie_id: u64, rating: i64, timestamp: DateTime<Utc>) -> Value {
    json!({
        "movieId": { "integerValue": movie_id.to_string() },
        "rating": { "integerValue": rating.to_string() },
        "timestamp": { "timestampValue": timestamp.to_rfc3339_opts(chrono::SecondsFormat::Millis, true) },
    })
}

/// Decode a Firestore document into a UserRating
///
/// `movie_id` comes from the document name suffix (the original app
/// used the movie id as the document id); the `movieId` field is a
/// fallback for documents written by other clients.
fn decode_rating_document(document: &Value) -> Result<UserRating, FirestoreError> {
    let fields = document
        .get("fields")
        .ok_or_else(|| FirestoreError::ParseError("document has no fields".to_string()))?;

    let movie_id = document
        .get("name")
        .and_then(|n| n.as_str())
        .and_then(parse_document_id)
        .or_else(|| {
            fields
                .get("movieId")
                .and_then(decode_integer)
                .and_then(|v| u64::try_from(v).ok())
        })
        .ok_or_else(|| FirestoreError::ParseError("cannot determine movie id".to_string()))?;

    let rating = fields
        .get("rating")
        .and_then(decode_integer)
        .ok_or_else(|| FirestoreError::ParseError("document has no rating value".to_string()))?;

    let timestamp = fields
        .get("timestamp")
        .and_then(|v| v.get("timestampValue"))
        .and_then(|v| v.as_str())
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc));

    Ok(UserRating {
        movie_id,
        rating,
        timestamp,
    })
}

/// Parse the numeric document id off a full document name
/// (`projects/.../ratings/603`)
fn parse_document_id(name: &str) -> Option<u64> {
    name.rsplit('/').next()?.parse().ok()
}

/// Decode a Firestore number: `integerValue` is a decimal string,
/// `doubleValue` a JSON number
fn decode_integer(value: &Value) -> Option<i64> {
    if let Some(s) = value.get("integerValue").and_then(|v| v.as_str()) {
        return s.parse().ok();
    }
    if let Some(f) = value.get("doubleValue").and_then(|v| v.as_f64()) {
        return Some(f.round() as i64);
    }
    None
}
