use async_trait::async_trait;
use log::{debug, warn};
use reqwest::header::{ACCEPT, CONTENT_TYPE, HeaderMap, HeaderValue};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::{
    AcuerdosApi, Agent, AgreementPage, ApiError, AssignedRate, FieldErrors, Rate, RateAssignment,
};
use crate::config::AppConfig;

/// `reqwest`-backed [`AcuerdosApi`] rooted at one base URL.
#[derive(Clone)]
pub struct HttpApi {
    client: Client,
    base_url: String,
}

/// Body of a 400 response carrying per-field messages.
#[derive(Deserialize)]
struct ValidationBody {
    errors: FieldErrors,
}

impl HttpApi {
    pub fn new(config: &AppConfig) -> Result<Self, ApiError> {
        let mut builder = Client::builder().default_headers(default_headers());
        if let Some(timeout) = config.request_timeout() {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|err| ApiError::Config(err.to_string()))?;
        Ok(Self {
            client,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ApiError> {
        let response = ensure_success(request.send().await?).await?;
        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn execute(&self, request: RequestBuilder) -> Result<(), ApiError> {
        ensure_success(request.send().await?).await?;
        Ok(())
    }
}

fn default_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers
}

async fn ensure_success(response: Response) -> Result<Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let url = response.url().clone();
    let body = response.text().await.unwrap_or_default();
    warn!("{} failed with {}: {}", url, status, excerpt(&body));
    Err(classify_failure(status, &body))
}

/// Log-sized prefix of a response body.
fn excerpt(body: &str) -> String {
    body.chars().take(200).collect()
}

/// Maps a non-2xx response onto the error taxonomy: 400 with an `errors`
/// object is a validation failure, everything else is a plain status error.
pub(crate) fn classify_failure(status: StatusCode, body: &str) -> ApiError {
    if status == StatusCode::BAD_REQUEST
        && let Ok(parsed) = serde_json::from_str::<ValidationBody>(body)
    {
        return ApiError::Validation(parsed.errors);
    }
    ApiError::Status {
        status: status.as_u16(),
        body: body.to_string(),
    }
}

#[async_trait]
impl AcuerdosApi for HttpApi {
    async fn list_agreements(&self, page: u32, page_size: u32) -> Result<AgreementPage, ApiError> {
        debug!("GET /Acuerdos page={} pageSize={}", page, page_size);
        let request = self
            .client
            .get(self.url("/Acuerdos"))
            .query(&[("page", page), ("pageSize", page_size)]);
        self.get_json(request).await
    }

    async fn list_agents(&self) -> Result<Vec<Agent>, ApiError> {
        debug!("GET /Acuerdos/AgenteComercial");
        let request = self.client.get(self.url("/Acuerdos/AgenteComercial"));
        let agents: Option<Vec<Agent>> = self.get_json(request).await?;
        Ok(agents.unwrap_or_default())
    }

    async fn create_agreement(&self, payload: &Value) -> Result<(), ApiError> {
        debug!("POST /Acuerdos");
        let request = self.client.post(self.url("/Acuerdos")).json(payload);
        self.execute(request).await
    }

    async fn update_agreement(&self, id: i64, payload: &Value) -> Result<(), ApiError> {
        debug!("PUT /Acuerdos/{}", id);
        let request = self
            .client
            .put(self.url(&format!("/Acuerdos/{}", id)))
            .json(payload);
        self.execute(request).await
    }

    async fn delete_agreement(&self, id: i64) -> Result<(), ApiError> {
        debug!("DELETE /Acuerdos/{}", id);
        let request = self.client.delete(self.url(&format!("/Acuerdos/{}", id)));
        self.execute(request).await
    }

    async fn assigned_rates(&self, agreement_id: i64) -> Result<Vec<AssignedRate>, ApiError> {
        debug!("GET /Acuerdos/{}/tarifas", agreement_id);
        let request = self
            .client
            .get(self.url(&format!("/Acuerdos/{}/tarifas", agreement_id)));
        let rates: Option<Vec<AssignedRate>> = self.get_json(request).await?;
        Ok(rates.unwrap_or_default())
    }

    async fn rate_catalog(&self) -> Result<Vec<Rate>, ApiError> {
        debug!("GET /Acuerdos/tarifas");
        let request = self.client.get(self.url("/Acuerdos/tarifas"));
        let rates: Option<Vec<Rate>> = self.get_json(request).await?;
        Ok(rates.unwrap_or_default())
    }

    async fn replace_rates(
        &self,
        agreement_id: i64,
        assignments: &[RateAssignment],
    ) -> Result<(), ApiError> {
        debug!(
            "PUT /Acuerdos/{}/tarifas ({} entries)",
            agreement_id,
            assignments.len()
        );
        let request = self
            .client
            .put(self.url(&format!("/Acuerdos/{}/tarifas", agreement_id)))
            .json(assignments);
        self.execute(request).await
    }
}
