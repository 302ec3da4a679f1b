//! Signed HTTP transport.

use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Method, StatusCode};
use tracing::{debug, warn};

use super::ApiError;
use crate::credentials::Credentials;
use crate::signing::sign_request;

const HTTP_TIMEOUT: Duration = Duration::from_secs(30);
const X_DATE: &str = "X-Date";

/// Issues signed calls against one region's API.
///
/// Each call stamps a fresh `X-Date` and recomputes the signature. Nothing
/// is retried here; retry policy belongs to callers that know whether the
/// operation is idempotent.
#[derive(Clone, Debug)]
pub struct ApiTransport {
    http: reqwest::Client,
    credentials: Credentials,
    base_url: String,
    clock: fn() -> DateTime<Utc>,
}

impl ApiTransport {
    /// Creates a transport targeting the credentials' region.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Transport`] when the HTTP client cannot be built.
    pub fn new(credentials: Credentials) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder().timeout(HTTP_TIMEOUT).build()?;
        let base_url = credentials.region().base_url();
        Ok(Self {
            http,
            credentials,
            base_url,
            clock: Utc::now,
        })
    }

    /// Points the transport at another base URL, for example a mock server.
    /// A trailing slash is added when missing.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        let mut url = base_url.into();
        if !url.ends_with('/') {
            url.push('/');
        }
        self.base_url = url;
        self
    }

    /// Replaces the clock used to stamp `X-Date`.
    #[must_use]
    pub const fn with_clock(mut self, clock: fn() -> DateTime<Utc>) -> Self {
        self.clock = clock;
        self
    }

    /// Base URL every path is appended to.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Credentials used for signing.
    #[must_use]
    pub const fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// Sends a signed request and returns the raw `200 OK` body.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Signing`] without sending when the URL cannot be
    /// canonicalised, [`ApiError::Transport`] on connection failures and
    /// [`ApiError::Api`] for any other status than `200`.
    pub async fn send(
        &self,
        method: Method,
        path: &str,
        body: Vec<u8>,
    ) -> Result<Vec<u8>, ApiError> {
        let url = format!("{}{path}", self.base_url);
        let signature = sign_request(
            self.credentials.api_key(),
            self.credentials.api_secret(),
            method.as_str(),
            &url,
            &body,
            (self.clock)(),
        )?;

        debug!(%method, %url, "sending signed request");
        let mut request = self
            .http
            .request(method.clone(), &url)
            .header(CONTENT_TYPE, "application/json")
            .header(X_DATE, &signature.x_date)
            .header(AUTHORIZATION, &signature.authorization);
        if !body.is_empty() {
            request = request.body(body);
        }

        let response = request.send().await?;
        let status = response.status();
        let bytes = response.bytes().await?;

        if status != StatusCode::OK {
            let text = String::from_utf8_lossy(&bytes).into_owned();
            warn!(%method, %url, status = status.as_u16(), "e24cloud request failed");
            return Err(ApiError::Api {
                status: status.as_u16(),
                body: text,
            });
        }

        Ok(bytes.to_vec())
    }
}
