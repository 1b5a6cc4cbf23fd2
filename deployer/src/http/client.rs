//! HTTP client implementation

use std::time::Duration;

use http::StatusCode;
use reqwest::{header, Client, RequestBuilder, Response};
use rpc_models::ErrorResponse;
use secrecy::{ExposeSecret, SecretString};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, error};

use crate::clients::RequestContext;
use crate::errors::DeployError;

const REQUEST_ID_HEADER: &str = "X-Request-ID";
const TENANT_HEADER: &str = "X-Project-ID";

/// HTTP client for the deployment backend
pub struct HttpClient {
    client: Client,
    base_url: String,
    token: SecretString,
}

impl HttpClient {
    /// Create a new HTTP client
    pub fn new(base_url: &str, token: SecretString, timeout: Duration) -> Result<Self, DeployError> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        })
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorize(&self, request: RequestBuilder, ctx: &RequestContext) -> RequestBuilder {
        request
            .header(
                header::AUTHORIZATION,
                format!("Bearer {}", self.token.expose_secret()),
            )
            .header(REQUEST_ID_HEADER, &ctx.request_id)
            .header(TENANT_HEADER, &ctx.tenant_id)
    }

    async fn check(method: &str, url: &str, response: Response) -> Result<Response, DeployError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        if status == StatusCode::NOT_FOUND {
            debug!("HTTP {} {} not found", method, url);
            return Err(DeployError::NotFound(url.to_string()));
        }
        let message = match serde_json::from_str::<ErrorResponse>(&body) {
            Ok(err) => err.message,
            Err(_) => body,
        };
        error!("HTTP {} failed: {} - {}", method, status, message);
        Err(DeployError::Backend(format!("{}: {}", status, message)))
    }

    /// Make a GET request
    pub async fn get<T: DeserializeOwned>(
        &self,
        ctx: &RequestContext,
        path: &str,
    ) -> Result<T, DeployError> {
        let url = self.url(path);
        debug!("GET {}", url);

        let response = self.authorize(self.client.get(&url), ctx).send().await?;
        let response = Self::check("GET", &url, response).await?;
        Ok(response.json().await?)
    }

    /// Make a POST request
    pub async fn post<T: DeserializeOwned, B: Serialize>(
        &self,
        ctx: &RequestContext,
        path: &str,
        body: &B,
    ) -> Result<T, DeployError> {
        let url = self.url(path);
        debug!("POST {}", url);

        let response = self
            .authorize(self.client.post(&url), ctx)
            .json(body)
            .send()
            .await?;
        let response = Self::check("POST", &url, response).await?;
        Ok(response.json().await?)
    }

    /// Make a PUT request
    pub async fn put<T: DeserializeOwned, B: Serialize>(
        &self,
        ctx: &RequestContext,
        path: &str,
        body: &B,
    ) -> Result<T, DeployError> {
        let url = self.url(path);
        debug!("PUT {}", url);

        let response = self
            .authorize(self.client.put(&url), ctx)
            .json(body)
            .send()
            .await?;
        let response = Self::check("PUT", &url, response).await?;
        Ok(response.json().await?)
    }

    /// Make a DELETE request
    pub async fn delete(&self, ctx: &RequestContext, path: &str) -> Result<(), DeployError> {
        let url = self.url(path);
        debug!("DELETE {}", url);

        let response = self.authorize(self.client.delete(&url), ctx).send().await?;
        Self::check("DELETE", &url, response).await?;
        Ok(())
    }
}
