// services/triage-dash/src/gateway.rs
//
// Remote data gateway for the triage backend API

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use tracing::debug;

use svckit::config::ApiConfig;
use svckit::errors::DashError;
use svckit::types::{
    CreatedPatient, Patient, PatientInput, PatientPatch, Resource, ResourceUpsert, Stats,
};

/// Backend operations the dashboard depends on. Every failure comes back as
/// a `DashError`; nothing here panics on a bad response.
#[async_trait]
pub trait TriageGateway: Send + Sync {
    async fn fetch_patients(&self) -> Result<Vec<Patient>, DashError>;
    async fn fetch_resources(&self) -> Result<Vec<Resource>, DashError>;
    async fn fetch_stats(&self) -> Result<Stats, DashError>;

    async fn create_patient(&self, input: &PatientInput) -> Result<CreatedPatient, DashError>;
    async fn patch_patient(&self, id: i64, patch: &PatientPatch) -> Result<(), DashError>;
    async fn upsert_resource(&self, upsert: &ResourceUpsert) -> Result<(), DashError>;

    fn name(&self) -> &str;
}

pub struct HttpGateway {
    client: reqwest::Client,
    base_url: String,
    auth_token: Option<String>,
    timeout: Duration,
}

impl HttpGateway {
    pub fn new(config: &ApiConfig) -> Result<Self, DashError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .connect_timeout(config.connect_timeout())
            .build()
            .map_err(|e| DashError::Config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            auth_token: config.auth_token.clone(),
            timeout: config.request_timeout(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        let request = self.client.request(method, url);
        match &self.auth_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn send(&self, label: &str, request: RequestBuilder) -> Result<Response, DashError> {
        let response = request
            .send()
            .await
            .map_err(|e| self.transport_error(label, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DashError::Network(format!("{} failed: HTTP {}", label, status)));
        }
        debug!("{} -> {}", label, status);
        Ok(response)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, DashError> {
        let label = format!("GET {}", path);
        let response = self.send(&label, self.request(Method::GET, path)).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| DashError::Network(format!("{}: parse error: {}", label, e)))
    }

    fn transport_error(&self, label: &str, err: reqwest::Error) -> DashError {
        if err.is_timeout() {
            DashError::Network(format!("{} timed out after {:?}", label, self.timeout))
        } else if err.is_connect() {
            DashError::Network(format!("{}: connection error: {}", label, err))
        } else {
            DashError::Network(format!("{}: {}", label, err))
        }
    }
}

#[async_trait]
impl TriageGateway for HttpGateway {
    async fn fetch_patients(&self) -> Result<Vec<Patient>, DashError> {
        self.get_json("/api/patients").await
    }

    async fn fetch_resources(&self) -> Result<Vec<Resource>, DashError> {
        self.get_json("/api/resources").await
    }

    async fn fetch_stats(&self) -> Result<Stats, DashError> {
        self.get_json("/api/stats").await
    }

    async fn create_patient(&self, input: &PatientInput) -> Result<CreatedPatient, DashError> {
        let label = "POST /api/patients";
        let request = self.request(Method::POST, "/api/patients").json(input);
        let response = self.send(label, request).await?;
        response
            .json::<CreatedPatient>()
            .await
            .map_err(|e| DashError::Network(format!("{}: parse error: {}", label, e)))
    }

    async fn patch_patient(&self, id: i64, patch: &PatientPatch) -> Result<(), DashError> {
        let path = format!("/api/patients/{}", id);
        let label = format!("PATCH {}", path);
        let request = self.request(Method::PATCH, &path).json(patch);
        self.send(&label, request).await.map(|_| ())
    }

    async fn upsert_resource(&self, upsert: &ResourceUpsert) -> Result<(), DashError> {
        let request = self.request(Method::POST, "/api/resources").json(upsert);
        self.send("POST /api/resources", request).await.map(|_| ())
    }

    fn name(&self) -> &str {
        "http"
    }
}
