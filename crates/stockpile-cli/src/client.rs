//! HTTP client for the Stockpile API

use std::time::Duration;

use serde::de::DeserializeOwned;
use serde_json::json;
use stockpile_core::envelope::ErrorEnvelope;
use stockpile_core::models::{Product, ProductDraft, ProductId, UpdateRequest};

use crate::error::CliError;

pub struct ApiClient {
    client: reqwest::Client,
    base_url: String,
    token: String,
}

impl ApiClient {
    pub fn new(
        base_url: impl Into<String>,
        token: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, CliError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|error| CliError::Network(error.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
        })
    }

    pub async fn create(&self, draft: &ProductDraft) -> Result<Product, CliError> {
        let response = self
            .client
            .post(format!("{}/v1/products", self.base_url))
            .bearer_auth(&self.token)
            .json(draft)
            .send()
            .await
            .map_err(map_send_error)?;
        decode(response).await
    }

    pub async fn list(&self, limit: usize, offset: usize) -> Result<Vec<Product>, CliError> {
        let response = self
            .client
            .get(format!(
                "{}/v1/products?limit={limit}&offset={offset}",
                self.base_url
            ))
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(map_send_error)?;
        decode(response).await
    }

    pub async fn get(&self, id: ProductId) -> Result<Product, CliError> {
        let response = self
            .client
            .get(format!("{}/v1/products/{id}", self.base_url))
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(map_send_error)?;
        decode(response).await
    }

    pub async fn update(
        &self,
        id: ProductId,
        request: &UpdateRequest,
    ) -> Result<Product, CliError> {
        let response = self
            .client
            .put(format!("{}/v1/products/{id}", self.base_url))
            .bearer_auth(&self.token)
            .json(request)
            .send()
            .await
            .map_err(map_send_error)?;
        decode(response).await
    }

    pub async fn delete(&self, id: ProductId, version: i64) -> Result<(), CliError> {
        let response = self
            .client
            .delete(format!("{}/v1/products/{id}", self.base_url))
            .bearer_auth(&self.token)
            .json(&json!({ "version": version }))
            .send()
            .await
            .map_err(map_send_error)?;

        if response.status().is_success() {
            return Ok(());
        }
        Err(rejection(response).await)
    }
}

fn map_send_error(error: reqwest::Error) -> CliError {
    if error.is_timeout() {
        CliError::Timeout
    } else {
        CliError::Network(error.to_string())
    }
}

async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, CliError> {
    if response.status().is_success() {
        return response
            .json::<T>()
            .await
            .map_err(|error| CliError::Network(error.to_string()));
    }
    Err(rejection(response).await)
}

async fn rejection(response: reqwest::Response) -> CliError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    match serde_json::from_str::<ErrorEnvelope>(&body) {
        Ok(envelope) => CliError::Api(envelope),
        Err(_) => CliError::Network(format!("HTTP {status}: {}", body.trim())),
    }
}
