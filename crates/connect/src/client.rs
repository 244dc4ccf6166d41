//! HTTP client for the Deckmatch challenge API.
//!
//! Implements the engine's collaborator traits over the REST endpoints so the
//! session engine never sees the wire format.

use async_trait::async_trait;
use log::debug;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::de::DeserializeOwned;
use std::time::Duration;

use deckmatch_core::feed::{CandidateItem, CandidateSource, ImageResolver};
use deckmatch_core::join::{EligibilityDecision, JoinBackend, JoinResponse};
use deckmatch_core::session::{EligibilityBucket, UserProfile};

use crate::error::{ConnectError, Result};
use crate::types::{ApiErrorResponse, CandidatesResponse, JoinRequest, ResolveImageResponse};
use crate::ProfileFetcher;

/// Default timeout for API requests.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Default base URL of the challenge API.
pub const DEFAULT_API_URL: &str = "https://api.deckmatch.app";

/// HTTP client for the challenge API.
///
/// # Example
///
/// ```ignore
/// let client = DeckmatchApiClient::new("https://api.deckmatch.app", "your-token")?;
/// let decision = client.can_join("user-1").await?;
/// ```
#[derive(Debug, Clone)]
pub struct DeckmatchApiClient {
    client: reqwest::Client,
    base_url: String,
    auth_header: HeaderValue,
}

impl DeckmatchApiClient {
    /// Create a new client.
    ///
    /// # Arguments
    ///
    /// * `base_url` - The base URL of the API (e.g., "https://api.deckmatch.app")
    /// * `access_token` - A valid access token
    ///
    /// # Errors
    ///
    /// Returns an error if the access token format is invalid or the HTTP client
    /// cannot be initialized.
    pub fn new(base_url: &str, access_token: &str) -> Result<Self> {
        let auth_header = HeaderValue::from_str(&format!("Bearer {}", access_token))
            .map_err(|_| ConnectError::auth("Invalid access token format"))?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            auth_header,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Create default headers for API requests.
    fn headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(AUTHORIZATION, self.auth_header.clone());
        headers
    }

    /// Make a GET request and parse the response.
    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        debug!("[DeckmatchApi] GET {}", url);

        let response = self
            .client
            .get(&url)
            .headers(self.headers())
            .send()
            .await?;

        Self::parse_response(response).await
    }

    /// Make a POST request with a JSON body and parse the response.
    async fn post<B: serde::Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        debug!("[DeckmatchApi] POST {}", url);

        let response = self
            .client
            .post(&url)
            .headers(self.headers())
            .json(body)
            .send()
            .await?;

        Self::parse_response(response).await
    }

    /// Parse a JSON response body, mapping error statuses to structured
    /// errors.
    async fn parse_response<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
        let status = response.status();
        let body = response.text().await?;
        debug!("[DeckmatchApi] Response ({}): {}", status, body);

        if !status.is_success() {
            return Err(api_error(status.as_u16(), &body));
        }

        serde_json::from_str(&body).map_err(|e| {
            log::error!("Failed to deserialize response. Body: {}, Error: {}", body, e);
            ConnectError::api(status.as_u16(), format!("Failed to parse response: {}", e))
        })
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Endpoints
    // ─────────────────────────────────────────────────────────────────────────

    /// GET /api/v1/challenges/eligible
    pub async fn get_eligible_candidates(
        &self,
        user_id: &str,
        bucket: &EligibilityBucket,
    ) -> Result<Vec<CandidateItem>> {
        let path = format!("/api/v1/challenges/eligible?{}", eligible_query(user_id, bucket));
        let response: CandidatesResponse = self.get(&path).await?;
        Ok(response.into_items())
    }

    /// GET /api/v1/challenges/expanded
    pub async fn get_expanded_candidates(&self, user_id: &str) -> Result<Vec<CandidateItem>> {
        let path = format!(
            "/api/v1/challenges/expanded?userId={}",
            urlencoding::encode(user_id)
        );
        let response: CandidatesResponse = self.get(&path).await?;
        Ok(response.into_items())
    }

    /// GET /api/v1/users/{id}/can-join
    pub async fn get_can_join(&self, user_id: &str) -> Result<EligibilityDecision> {
        let path = format!("/api/v1/users/{}/can-join", urlencoding::encode(user_id));
        self.get(&path).await
    }

    /// POST /api/v1/challenges/{id}/join
    ///
    /// A refusal the backend reports with an error status is folded into a
    /// failed [`JoinResponse`] when the body has that shape.
    pub async fn post_join(
        &self,
        candidate_id: &str,
        user_id: &str,
        display_name: &str,
    ) -> Result<JoinResponse> {
        let path = format!("/api/v1/challenges/{}/join", urlencoding::encode(candidate_id));
        let body = JoinRequest {
            user_id: user_id.to_string(),
            display_name: display_name.to_string(),
        };

        match self.post::<_, JoinResponse>(&path, &body).await {
            Err(ConnectError::Api { status, error }) => {
                match error
                    .body
                    .clone()
                    .and_then(|b| serde_json::from_value::<JoinResponse>(b).ok())
                {
                    Some(refusal) if !refusal.success => Ok(refusal),
                    _ => Err(ConnectError::Api { status, error }),
                }
            }
            other => other,
        }
    }

    /// GET /api/v1/users/{id}/profile
    ///
    /// Returns `None` for an unknown user.
    pub async fn get_profile(&self, user_id: &str) -> Result<Option<UserProfile>> {
        let path = format!("/api/v1/users/{}/profile", urlencoding::encode(user_id));
        match self.get::<UserProfile>(&path).await {
            Ok(profile) => Ok(Some(profile)),
            Err(ConnectError::Api { status: 404, .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// GET /api/v1/images/resolve?ref=
    pub async fn get_resolved_image(&self, raw_ref: &str) -> Result<Option<String>> {
        let path = format!("/api/v1/images/resolve?ref={}", urlencoding::encode(raw_ref));
        let response: ResolveImageResponse = self.get(&path).await?;
        Ok(response.url.filter(|url| !url.is_empty()))
    }
}

/// Build a structured error from a non-success response body.
pub(crate) fn api_error(status: u16, body: &str) -> ConnectError {
    let json = serde_json::from_str::<serde_json::Value>(body).ok();
    let error = match json
        .clone()
        .and_then(|v| serde_json::from_value::<ApiErrorResponse>(v).ok())
    {
        Some(parsed) => parsed.into_remote(status, json),
        None => {
            let mut error = deckmatch_core::errors::RemoteError {
                status: Some(status),
                ..Default::default()
            };
            let text = body.trim();
            if !text.is_empty() {
                error.message = Some(text.chars().take(200).collect());
            }
            error
        }
    };
    ConnectError::Api { status, error }
}

pub(crate) fn eligible_query(user_id: &str, bucket: &EligibilityBucket) -> String {
    let mut params = vec![
        format!("userId={}", urlencoding::encode(user_id)),
        format!("winstreak={}", bucket.winstreak),
    ];
    if let Some(zipcode) = bucket.zipcode.as_deref() {
        params.push(format!("zipcode={}", urlencoding::encode(zipcode)));
    }
    if let Some(city) = bucket.city.as_deref() {
        params.push(format!("city={}", urlencoding::encode(city)));
    }
    params.join("&")
}

// ─────────────────────────────────────────────────────────────────────────────
// Engine collaborator implementations
// ─────────────────────────────────────────────────────────────────────────────

#[async_trait]
impl CandidateSource for DeckmatchApiClient {
    async fn fetch_eligible_candidates(
        &self,
        user_id: &str,
        bucket: &EligibilityBucket,
    ) -> deckmatch_core::Result<Vec<CandidateItem>> {
        Ok(self.get_eligible_candidates(user_id, bucket).await?)
    }

    async fn fetch_expanded_candidates(
        &self,
        user_id: &str,
    ) -> deckmatch_core::Result<Vec<CandidateItem>> {
        Ok(self.get_expanded_candidates(user_id).await?)
    }
}

#[async_trait]
impl ImageResolver for DeckmatchApiClient {
    async fn resolve_image(&self, raw_ref: &str) -> deckmatch_core::Result<Option<String>> {
        Ok(self.get_resolved_image(raw_ref).await?)
    }
}

#[async_trait]
impl JoinBackend for DeckmatchApiClient {
    async fn can_join(&self, user_id: &str) -> deckmatch_core::Result<EligibilityDecision> {
        Ok(self.get_can_join(user_id).await?)
    }

    async fn join(
        &self,
        candidate_id: &str,
        user_id: &str,
        display_name: &str,
    ) -> deckmatch_core::Result<JoinResponse> {
        Ok(self.post_join(candidate_id, user_id, display_name).await?)
    }
}

#[async_trait]
impl ProfileFetcher for DeckmatchApiClient {
    async fn fetch_profile(&self, user_id: &str) -> deckmatch_core::Result<Option<UserProfile>> {
        Ok(self.get_profile(user_id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_trims_trailing_slash() {
        let client = DeckmatchApiClient::new("https://api.example.test/", "token").unwrap();
        assert_eq!(client.base_url(), "https://api.example.test");
    }

    #[test]
    fn test_new_rejects_invalid_token() {
        let result = DeckmatchApiClient::new(DEFAULT_API_URL, "bad\ntoken");
        assert!(matches!(result, Err(ConnectError::Auth(_))));
    }

    #[test]
    fn test_eligible_query_encodes_bucket() {
        let bucket = EligibilityBucket {
            winstreak: 4,
            zipcode: Some("94110".to_string()),
            city: Some("San Francisco".to_string()),
        };
        assert_eq!(
            eligible_query("user 1", &bucket),
            "userId=user%201&winstreak=4&zipcode=94110&city=San%20Francisco"
        );
        assert_eq!(
            eligible_query("u", &EligibilityBucket::default()),
            "userId=u&winstreak=0"
        );
    }

    #[test]
    fn test_api_error_keeps_structured_fields() {
        let body = r#"{"code":"SLOT_TAKEN","message":"Spot already taken","hint":"Pick another"}"#;
        match api_error(409, body) {
            ConnectError::Api { status, error } => {
                assert_eq!(status, 409);
                assert_eq!(error.code.as_deref(), Some("SLOT_TAKEN"));
                assert_eq!(error.message.as_deref(), Some("Spot already taken"));
                assert_eq!(error.hint.as_deref(), Some("Pick another"));
                assert!(error.body.is_some());
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_api_error_falls_back_to_error_field_and_raw_text() {
        match api_error(400, r#"{"error":"Bad request"}"#) {
            ConnectError::Api { error, .. } => {
                assert_eq!(error.message.as_deref(), Some("Bad request"))
            }
            other => panic!("unexpected error: {:?}", other),
        }

        match api_error(502, "<html>Bad Gateway</html>") {
            ConnectError::Api { error, .. } => {
                assert_eq!(error.message.as_deref(), Some("<html>Bad Gateway</html>"));
                assert!(error.body.is_none());
            }
            other => panic!("unexpected error: {:?}", other),
        }

        match api_error(500, "") {
            ConnectError::Api { error, .. } => {
                assert!(error.message.is_none());
                assert!(error.human_message().contains("500"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_candidates_response_accepts_both_shapes() {
        let item = r#"{
            "id": "c1",
            "title": "Friday Finals",
            "host": {"userId": "h1", "displayName": "Sam"},
            "location": "Court 3",
            "startsAt": "2026-05-01T18:00:00Z",
            "rules": "Best of three",
            "description": "Doubles",
            "winCondition": "Most sets",
            "ticketPrice": 12.5,
            "challengeType": "team",
            "hostImageRef": "hosts/h1.jpg"
        }"#;

        let bare: CandidatesResponse = serde_json::from_str(&format!("[{}]", item)).unwrap();
        let wrapped: CandidatesResponse =
            serde_json::from_str(&format!(r#"{{"candidates":[{}]}}"#, item)).unwrap();

        let bare = bare.into_items();
        assert_eq!(bare.len(), 1);
        assert_eq!(bare[0].host_image_ref.as_deref(), Some("hosts/h1.jpg"));
        assert_eq!(wrapped.into_items(), bare);
    }
}
