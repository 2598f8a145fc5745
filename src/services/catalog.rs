use async_trait::async_trait;
use reqwest::Client as HttpClient;
use std::time::Duration;

use crate::{
    config::Config,
    error::{AppError, AppResult},
    models::{
        CreatedUser, FeedbackAck, FeedbackEvent, NewRemoteUser, RecommendationSet,
        RemoteRatingRecord, RemoteUserRecord,
    },
};

/// Read-mostly gateway to the external recommendation service.
///
/// Pure I/O adapter: every method is one bounded HTTP round trip that
/// validates the payload into a typed record before anything downstream
/// sees it. No business logic lives here.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CatalogClient: Send + Sync {
    /// Full remote user snapshot
    async fn list_users(&self) -> AppResult<Vec<RemoteUserRecord>>;

    /// Full remote rating snapshot
    async fn list_ratings(&self) -> AppResult<Vec<RemoteRatingRecord>>;

    /// Registers a user remotely; returns the external key the service assigned
    async fn create_user(&self, user: &NewRemoteUser) -> AppResult<i64>;

    /// Recommendation set for one external user id
    async fn recommend(&self, external_id: i64) -> AppResult<RecommendationSet>;

    /// Forwards one rating fact
    async fn submit_feedback(&self, event: &FeedbackEvent) -> AppResult<FeedbackAck>;
}

/// HTTP implementation of [`CatalogClient`] against the ML service
#[derive(Clone)]
pub struct HttpCatalogClient {
    http_client: HttpClient,
    base_url: String,
}

impl HttpCatalogClient {
    pub fn new(config: &Config) -> AppResult<Self> {
        let http_client = HttpClient::builder()
            .timeout(Duration::from_secs(config.remote_timeout_secs))
            .build()?;

        Ok(Self {
            http_client,
            base_url: config.ml_service_url.trim_end_matches('/').to_string(),
        })
    }

    /// Turns a non-2xx response into a transport error with the body attached
    async fn check_status(response: reqwest::Response) -> AppResult<reqwest::Response> {
        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        Err(AppError::RemoteUnavailable(format!(
            "remote service returned status {}: {}",
            status, body
        )))
    }
}

#[async_trait]
impl CatalogClient for HttpCatalogClient {
    async fn list_users(&self) -> AppResult<Vec<RemoteUserRecord>> {
        let url = format!("{}/ml/users", self.base_url);
        let response = self.http_client.get(&url).send().await?;
        let users: Vec<RemoteUserRecord> = Self::check_status(response).await?.json().await?;

        tracing::debug!(users = users.len(), "Fetched remote user snapshot");

        Ok(users)
    }

    async fn list_ratings(&self) -> AppResult<Vec<RemoteRatingRecord>> {
        let url = format!("{}/ml/ratings", self.base_url);
        let response = self.http_client.get(&url).send().await?;
        let ratings: Vec<RemoteRatingRecord> = Self::check_status(response).await?.json().await?;

        tracing::debug!(ratings = ratings.len(), "Fetched remote rating snapshot");

        Ok(ratings)
    }

    async fn create_user(&self, user: &NewRemoteUser) -> AppResult<i64> {
        let url = format!("{}/ml/users/create", self.base_url);
        let response = self.http_client.post(&url).json(user).send().await?;
        let created: CreatedUser = Self::check_status(response).await?.json().await?;

        tracing::info!(external_id = created.user_id, "Registered user with remote service");

        Ok(created.user_id)
    }

    async fn recommend(&self, external_id: i64) -> AppResult<RecommendationSet> {
        let url = format!("{}/ml/recommend/{}", self.base_url, external_id);
        let response = self.http_client.get(&url).send().await?;
        let set: RecommendationSet = Self::check_status(response).await?.json().await?;

        Ok(set)
    }

    async fn submit_feedback(&self, event: &FeedbackEvent) -> AppResult<FeedbackAck> {
        let url = format!("{}/ml/feedback", self.base_url);
        let response = self.http_client.post(&url).json(event).send().await?;
        let ack: FeedbackAck = Self::check_status(response).await?.json().await?;

        Ok(ack)
    }
}
