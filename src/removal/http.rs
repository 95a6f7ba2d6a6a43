//! reqwest-backed [`LeaderDataService`] talking to the field-ops API.

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use super::service::{LeaderDataService, ServiceError};
use crate::auth::API_KEY_HEADER;
use crate::errors::ErrorResponse;
use crate::models::{
    DelegatePeopleRequest, DelegatePeopleResponse, Leader, LeaderStatus, PeopleCount,
    RemoveLeaderRequest, RemoveLeaderResponse, UpdateLeaderStatusRequest,
};

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: T,
}

/// HTTP client for the field-ops data service.
#[derive(Debug, Clone)]
pub struct HttpDataService {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl HttpDataService {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Result<Self, ServiceError> {
        let client = Client::builder().build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
        })
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let request = self
            .client
            .request(method, format!("{}{}", self.base_url, path));
        match &self.api_key {
            Some(key) => request.header(API_KEY_HEADER, key),
            None => request,
        }
    }

    /// Decode an enveloped resource response.
    async fn data<T: DeserializeOwned>(response: Response) -> Result<T, ServiceError> {
        let response = Self::check_status(response).await?;
        let envelope: Envelope<T> = response.json().await?;
        Ok(envelope.data)
    }

    /// Turn a non-2xx response into [`ServiceError::Api`].
    async fn check_status(response: Response) -> Result<Response, ServiceError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let (code, message) = match response.json::<ErrorResponse>().await {
            Ok(body) => (body.error.code, body.error.message),
            Err(_) => (
                "HTTP_ERROR".to_string(),
                status
                    .canonical_reason()
                    .unwrap_or("request failed")
                    .to_string(),
            ),
        };
        Err(ServiceError::Api {
            status: status.as_u16(),
            code,
            message,
        })
    }
}

#[async_trait]
impl LeaderDataService for HttpDataService {
    async fn count_people(&self, owner_id: &str) -> Result<i64, ServiceError> {
        let response = self
            .request(Method::GET, "/api/people/count")
            .query(&[("owner_id", owner_id)])
            .send()
            .await?;
        let count: PeopleCount = Self::data(response).await?;
        Ok(count.count)
    }

    async fn list_active_leaders(&self, exclude: &str) -> Result<Vec<Leader>, ServiceError> {
        let response = self
            .request(Method::GET, "/api/leaders/active")
            .query(&[("exclude", exclude)])
            .send()
            .await?;
        Self::data(response).await
    }

    async fn delegate_people(
        &self,
        request: &DelegatePeopleRequest,
    ) -> Result<DelegatePeopleResponse, ServiceError> {
        let response = self
            .request(Method::POST, "/api/rpc/delegate_people")
            .json(request)
            .send()
            .await?;
        Ok(Self::check_status(response).await?.json().await?)
    }

    async fn remove_leader(
        &self,
        request: &RemoveLeaderRequest,
    ) -> Result<RemoveLeaderResponse, ServiceError> {
        let response = self
            .request(Method::POST, "/api/rpc/remove_leader")
            .json(request)
            .send()
            .await?;
        Ok(Self::check_status(response).await?.json().await?)
    }

    async fn update_leader_status(
        &self,
        leader_id: &str,
        status: LeaderStatus,
    ) -> Result<(), ServiceError> {
        let response = self
            .request(Method::PATCH, &format!("/api/leaders/{}/status", leader_id))
            .json(&UpdateLeaderStatusRequest { status })
            .send()
            .await?;
        let _: Leader = Self::data(response).await?;
        Ok(())
    }
}
