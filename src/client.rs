//! Directions service clients.

use std::future::Future;

use reqwest::header::CONTENT_TYPE;
use reqwest::Client;

use crate::directions;
use crate::error::{NavError, NavResult};
use crate::options::{DirectionsRequest, HttpMethod};

/// Something that can answer directions requests with a raw JSON body.
///
/// The returned future must not borrow the service so the driver can run
/// it on its own task and abort it.
pub trait DirectionsService {
    fn calculate(
        &self,
        request: DirectionsRequest,
    ) -> impl Future<Output = NavResult<String>> + Send + 'static;
}

/// Directions service reached over HTTP.
#[derive(Debug, Clone)]
pub struct HttpDirections {
    client: Client,
    base_url: String,
}

impl HttpDirections {
    pub fn new(base_url: impl Into<String>) -> Self {
        HttpDirections::with_client(Client::new(), base_url)
    }

    /// Uses a preconfigured client, e.g. one with timeouts or auth headers.
    pub fn with_client(client: Client, base_url: impl Into<String>) -> Self {
        HttpDirections {
            client,
            base_url: base_url.into(),
        }
    }

    pub fn url_for(&self, request: &DirectionsRequest) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), request.path)
    }
}

impl DirectionsService for HttpDirections {
    fn calculate(
        &self,
        request: DirectionsRequest,
    ) -> impl Future<Output = NavResult<String>> + Send + 'static {
        let client = self.client.clone();
        let url = self.url_for(&request);

        async move {
            let builder = match request.method {
                HttpMethod::Get => client.get(&url),
                HttpMethod::Post => client.post(&url),
            };
            let mut builder = builder.query(&request.query);
            if let Some(content_type) = request.content_type {
                builder = builder.header(CONTENT_TYPE, content_type);
            }
            if let Some(body) = request.body {
                builder = builder.body(body);
            }

            let response = builder.send().await?;
            let status = response.status();
            let body = response.text().await?;
            if status.is_success() {
                return Ok(body);
            }

            log::warn!("directions service answered {status}");
            Err(directions::parse_service_error(&body)
                .unwrap_or_else(|| NavError::NetworkFailure(format!("HTTP {status}"))))
        }
    }
}
