use crate::api::model::FetchOutcome;
use crate::config::{self, FetchSettings};
use crate::error::{AppError, AppResult};
use crate::logging::{log, LogLevel};
use bytes::Bytes;
use reqwest::{Client, StatusCode};

/// Thin HTTP layer: one request, classified into a [`FetchOutcome`].
/// Retrying and concurrency limits live in the executor.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(settings: &FetchSettings) -> AppResult<Self> {
        let client = Client::builder()
            .timeout(settings.timeout)
            .connect_timeout(settings.connect_timeout)
            .default_headers(config::BASE_UA_HEADERS.clone())
            .pool_max_idle_per_host(settings.max_concurrent * 2)
            .build()
            .map_err(AppError::from)?;

        let base_url = settings.base_url.trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return Err(AppError::ConfigError("Base URL must not be empty".into()));
        }

        Ok(ApiClient { client, base_url })
    }

    pub fn url_for(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    pub async fn get(&self, path: &str) -> FetchOutcome<Bytes> {
        let url = self.url_for(path);

        let resp = match self.client.get(&url).send().await {
            Ok(resp) => resp,
            Err(e) => return classify_transport_error(&e),
        };

        let status = resp.status();
        if status.is_success() {
            return match resp.bytes().await {
                Ok(body) => FetchOutcome::Success(body),
                Err(e) => {
                    log(
                        LogLevel::Warning,
                        &format!("GET {} - Error reading success body: {}", path, e),
                    );
                    classify_transport_error(&e)
                }
            };
        }

        classify_status(status)
    }
}

fn classify_status<T>(status: StatusCode) -> FetchOutcome<T> {
    match status {
        StatusCode::NOT_FOUND => FetchOutcome::NotFound,
        StatusCode::TOO_MANY_REQUESTS => FetchOutcome::RateLimited,
        other => FetchOutcome::UnexpectedStatus(other.as_u16()),
    }
}

fn classify_transport_error<T>(e: &reqwest::Error) -> FetchOutcome<T> {
    if e.is_timeout() {
        FetchOutcome::Timeout
    } else if e.is_connect() {
        FetchOutcome::TransportError(format!("Connection error: {}", e))
    } else {
        FetchOutcome::TransportError(format!("Request error: {}", e))
    }
}
