use std::env;
use std::time::{Duration, Instant};

use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::{Client as ReqwestClient, Response};
use serde::Deserialize;
use url::Url;

use crate::error::{Error, Result};
use crate::observability::{
    PROVIDER_EMPTY_RESPONSES, PROVIDER_REQUEST_DURATION, PROVIDER_REQUEST_ERRORS,
    PROVIDER_REQUESTS,
};
use crate::types::{GenerateContentRequest, GenerateContentResponse, Model};

const DEFAULT_API_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models/";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Environment variable consulted when no API key is configured.
pub const API_KEY_ENV: &str = "AIDSNAP_API_KEY";

/// A stateless text-generation endpoint.
///
/// One call is one request/response round trip. The chat session only talks
/// to the provider through this trait, so tests can script replies.
#[async_trait::async_trait]
pub trait Provider: Send + Sync {
    /// Send the request and return the reply text.
    async fn generate(&self, request: &GenerateContentRequest) -> Result<String>;
}

#[async_trait::async_trait]
impl<P: Provider + ?Sized> Provider for std::sync::Arc<P> {
    async fn generate(&self, request: &GenerateContentRequest) -> Result<String> {
        (**self).generate(request).await
    }
}

/// Client for the Gemini `generateContent` API.
#[derive(Debug, Clone)]
pub struct Gemini {
    api_key: String,
    model: Model,
    client: ReqwestClient,
    base_url: Url,
    timeout: Duration,
}

impl Gemini {
    /// Create a new Gemini client.
    ///
    /// The API key can be provided directly or read from the AIDSNAP_API_KEY
    /// environment variable.
    pub fn new(api_key: Option<String>, model: Model) -> Result<Self> {
        Self::with_options(api_key, model, None, None)
    }

    /// Create a new client with custom settings.
    pub fn with_options(
        api_key: Option<String>,
        model: Model,
        base_url: Option<String>,
        timeout: Option<Duration>,
    ) -> Result<Self> {
        let api_key = match api_key {
            Some(key) => key,
            None => env::var(API_KEY_ENV).map_err(|_| {
                Error::authentication(format!(
                    "API key not provided and {API_KEY_ENV} environment variable not set"
                ))
            })?,
        };
        if api_key.trim().is_empty() {
            return Err(Error::authentication("API key is empty"));
        }

        let base_url = base_url.unwrap_or_else(|| DEFAULT_API_URL.to_string());
        let base_url = if base_url.ends_with('/') {
            Url::parse(&base_url)?
        } else {
            Url::parse(&format!("{base_url}/"))?
        };

        let timeout = timeout.unwrap_or(DEFAULT_TIMEOUT);
        let client = ReqwestClient::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| {
                Error::http_client(
                    format!("Failed to build HTTP client: {}", e),
                    Some(Box::new(e)),
                )
            })?;

        Ok(Self {
            api_key,
            model,
            client,
            base_url,
            timeout,
        })
    }

    /// The model requests are sent to.
    pub fn model(&self) -> &Model {
        &self.model
    }

    /// Change the model requests are sent to.
    pub fn set_model(&mut self, model: Model) {
        self.model = model;
    }

    /// The URL of the `generateContent` endpoint for the current model.
    ///
    /// The API key travels in a header, not in the URL.
    pub fn endpoint(&self) -> Result<Url> {
        Ok(self
            .base_url
            .join(&format!("./{}:generateContent", self.model))?)
    }

    /// Create and return default headers for API requests.
    fn default_headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        headers.insert(header::ACCEPT, HeaderValue::from_static("application/json"));
        let key = HeaderValue::from_str(&self.api_key)
            .map_err(|_| Error::authentication("API key contains invalid header characters"))?;
        headers.insert("x-goog-api-key", key);
        Ok(headers)
    }

    /// Process API response errors and convert to our Error type
    async fn process_error_response(response: Response) -> Error {
        let status_code = response.status().as_u16();

        let retry_after = response
            .headers()
            .get("retry-after")
            .and_then(|val| val.to_str().ok())
            .and_then(|val| val.parse::<u64>().ok());

        let error_body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                return Error::http_client(
                    format!("Failed to read error response: {}", e),
                    Some(Box::new(e)),
                );
            }
        };

        let (status, message) = parse_error_body(&error_body);
        map_status(status_code, status, message, retry_after)
    }

    /// Send a request and return the parsed reply.
    pub async fn send(&self, request: &GenerateContentRequest) -> Result<GenerateContentResponse> {
        let url = self.endpoint()?;
        tracing::debug!(model = %self.model, "sending generateContent request");

        let response = self
            .client
            .post(url)
            .headers(self.default_headers()?)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    Error::timeout(
                        format!("Request timed out: {}", e),
                        Some(self.timeout.as_secs_f64()),
                    )
                } else if e.is_connect() {
                    Error::connection(format!("Connection error: {}", e), Some(Box::new(e)))
                } else {
                    Error::http_client(format!("Request failed: {}", e), Some(Box::new(e)))
                }
            })?;

        if !response.status().is_success() {
            return Err(Self::process_error_response(response).await);
        }

        response.json::<GenerateContentResponse>().await.map_err(|e| {
            Error::serialization(
                format!("Failed to parse response: {}", e),
                Some(Box::new(e)),
            )
        })
    }
}

#[async_trait::async_trait]
impl Provider for Gemini {
    async fn generate(&self, request: &GenerateContentRequest) -> Result<String> {
        PROVIDER_REQUESTS.click();
        let start = Instant::now();
        let result = self.send(request).await.and_then(reply_text);
        PROVIDER_REQUEST_DURATION.add(start.elapsed().as_secs_f64());
        if let Err(err) = &result {
            PROVIDER_REQUEST_ERRORS.click();
            tracing::warn!(error = %err, "generateContent request failed");
        }
        result
    }
}

/// Extract the reply text, turning blocked or empty replies into errors.
pub fn reply_text(response: GenerateContentResponse) -> Result<String> {
    if let Some(text) = response.text() {
        return Ok(text.to_string());
    }
    PROVIDER_EMPTY_RESPONSES.click();
    match response.block_reason() {
        Some(reason) => Err(Error::empty_response(format!(
            "prompt was blocked ({reason})"
        ))),
        None => Err(Error::empty_response(
            "no text in the response candidates",
        )),
    }
}

fn parse_error_body(body: &str) -> (Option<String>, String) {
    #[derive(Deserialize)]
    struct ErrorWrapper {
        error: ErrorBody,
    }

    #[derive(Deserialize)]
    struct ErrorBody {
        message: Option<String>,
        status: Option<String>,
    }

    match serde_json::from_str::<ErrorWrapper>(body) {
        Ok(wrapper) => (
            wrapper.error.status,
            wrapper.error.message.unwrap_or_else(|| body.to_string()),
        ),
        Err(_) => (None, body.to_string()),
    }
}

/// Map an HTTP status code to the crate error type.
fn map_status(
    status_code: u16,
    status: Option<String>,
    message: String,
    retry_after: Option<u64>,
) -> Error {
    match status_code {
        400 => Error::bad_request(message),
        401 => Error::authentication(message),
        403 => Error::permission(message),
        404 => Error::not_found(message, Some("model".to_string()), None),
        408 => Error::timeout(message, None),
        429 => Error::rate_limit(message, retry_after),
        500 => Error::internal_server(message),
        502..=504 => Error::service_unavailable(message, retry_after),
        _ => Error::api(status_code, status, message),
    }
}
