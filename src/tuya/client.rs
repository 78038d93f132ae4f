use std::future::Future;
use std::time::Duration;

use anyhow::{Context as _, Result, bail};
use chrono::Utc;
use log::{debug, info};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::tuya::{Credentials, StatusPoint, device_status_path, sign_request};

pub const DEFAULT_ENDPOINT: &str = "https://openapi.tuyaeu.com";

const TOKEN_PATH: &str = "/v1.0/token?grant_type=1";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Vendor reply, split on the envelope's `success` flag.
#[derive(Debug, Clone, PartialEq)]
pub enum ApiResponse<T> {
    Success(T),
    Failure { message: String, raw: String },
}

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    success: bool,

    #[serde(default)]
    result: Value,

    #[serde(default)]
    msg: Option<String>,

    #[serde(default)]
    code: Option<Value>,
}

impl<T: DeserializeOwned> ApiResponse<T> {
    pub fn from_body(body: &str) -> Self {
        match serde_json::from_str::<Value>(body) {
            Ok(value) => Self::from_value(value),
            Err(e) => ApiResponse::Failure {
                message: format!("invalid response: {e}"),
                raw: body.to_owned(),
            },
        }
    }

    pub fn from_value(value: Value) -> Self {
        let raw = value.to_string();

        let envelope: Envelope = match serde_json::from_value(value) {
            Ok(envelope) => envelope,
            Err(e) => {
                return ApiResponse::Failure {
                    message: format!("unexpected response shape: {e}"),
                    raw,
                };
            }
        };

        if !envelope.success {
            let message = match (envelope.msg, envelope.code) {
                (Some(msg), Some(code)) => format!("{msg} (code {code})"),
                (Some(msg), None) => msg,
                (None, Some(code)) => format!("request failed (code {code})"),
                (None, None) => "request failed".to_owned(),
            };
            return ApiResponse::Failure { message, raw };
        }

        match serde_json::from_value(envelope.result) {
            Ok(result) => ApiResponse::Success(result),
            Err(e) => ApiResponse::Failure {
                message: format!("unexpected result: {e}"),
                raw,
            },
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct TokenResult {
    pub access_token: String,

    #[serde(default)]
    pub expire_time: Option<u64>,
}

/// Operations the run loop needs from the vendor API.
pub trait TuyaApi {
    fn connect(&mut self) -> impl Future<Output = Result<()>>;

    fn device_status(
        &self,
        device_id: &str,
    ) -> impl Future<Output = Result<ApiResponse<Vec<StatusPoint>>>>;
}

#[derive(Debug)]
pub struct TuyaClient {
    http: reqwest::Client,
    endpoint: String,
    credentials: Credentials,
    token: Option<String>,
}

impl TuyaClient {
    pub fn new(endpoint: &str, credentials: Credentials) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self {
            http,
            endpoint: endpoint.trim_end_matches('/').to_owned(),
            credentials,
            token: None,
        })
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// Fetches the access token used by every later call.
    pub async fn connect(&mut self) -> Result<()> {
        self.token = None;

        let body = self
            .signed_get(TOKEN_PATH, None)
            .await
            .context("token request failed")?;

        match ApiResponse::<TokenResult>::from_body(&body) {
            ApiResponse::Success(result) => {
                debug!(
                    "token acquired, expires in {}s",
                    result.expire_time.unwrap_or_default()
                );
                self.token = Some(result.access_token);
                Ok(())
            }
            ApiResponse::Failure { message, raw } => {
                bail!("token call failed: {message}: {raw}")
            }
        }
    }

    /// Signed GET with the stored token. A non-JSON body comes back as a failure.
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<ApiResponse<T>> {
        let body = self.signed_get(path, self.token.as_deref()).await?;
        Ok(ApiResponse::from_body(&body))
    }

    pub async fn device_status(&self, device_id: &str) -> Result<ApiResponse<Vec<StatusPoint>>> {
        self.get::<Vec<StatusPoint>>(&device_status_path(device_id))
            .await
            .with_context(|| format!("status request failed for {device_id}"))
    }

    async fn signed_get(&self, path: &str, token: Option<&str>) -> Result<String> {
        let headers = sign_request(
            &self.credentials,
            token,
            "GET",
            path,
            None,
            Utc::now().timestamp_millis(),
        )
        .context("failed to sign request")?
        .to_header_map()?;

        let url = format!("{}{path}", self.endpoint);
        let response = self
            .http
            .get(&url)
            .headers(headers)
            .send()
            .await
            .with_context(|| format!("failed to send request: GET {path}"))?;

        let status = response.status();
        debug!("GET {path} -> {status}");

        response
            .text()
            .await
            .with_context(|| format!("failed to read response body: GET {path}"))
    }
}

impl TuyaApi for TuyaClient {
    async fn connect(&mut self) -> Result<()> {
        TuyaClient::connect(self).await?;
        info!("connected to {}", self.endpoint);
        Ok(())
    }

    async fn device_status(&self, device_id: &str) -> Result<ApiResponse<Vec<StatusPoint>>> {
        TuyaClient::device_status(self, device_id).await
    }
}
