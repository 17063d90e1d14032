//! HTTP client for the Shock object store.
//!
//! [`ApiClient`] exposes one method per remote action (node CRUD, ACLs,
//! indexing, queries, downloads) and unwraps the service's
//! `{status, data, error}` envelope into typed results or a [`ShockError`].
//! Uploads and downloads go through a [`Transport`], which is either plain
//! HTTP or the external `shock-client` helper, chosen once at construction.
//! The location directory sub-API lives in [`LocationClient`].

pub mod api;
pub mod locations;
pub mod payload;
pub mod transport;

use std::sync::Arc;

use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use shock_core::{AuthToken, Envelope, ErrorMetadata, LogLevel, ShockConfig, ShockError, ShockResult};

pub use api::attributes_json;
pub use locations::LocationClient;
pub use payload::{Payload, UploadFile};
pub use transport::{
    DownloadOptions, ExternalToolTransport, HttpTransport, Transport, TransportKind,
};

/// Connection to the Shock service shared by the client and its transports.
#[derive(Clone, Debug)]
pub struct HttpCore {
    client: Client,
    base_url: String,
    auth: Option<AuthToken>,
    timeout: std::time::Duration,
}

impl HttpCore {
    pub fn new(config: &ShockConfig) -> ShockResult<Self> {
        // JSON calls get the timeout as an overall deadline. Streaming calls
        // are bounded per read so long healthy transfers can finish.
        let client = Client::builder()
            .connect_timeout(config.timeout)
            .read_timeout(config.timeout)
            .build()
            .map_err(|e| ShockError::transport(&config.base_url, e))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            auth: config.auth.clone(),
            timeout: config.timeout,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn auth(&self) -> Option<&AuthToken> {
        self.auth.as_ref()
    }

    pub fn build_url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// URL of `/node/{id}` followed by `rest`, with the id percent-encoded.
    pub fn node_url(&self, node_id: &str, rest: &str) -> String {
        format!("{}/node/{}{}", self.base_url, urlencoding::encode(node_id), rest)
    }

    /// Request with the auth header applied; only the per-read timeout holds.
    pub fn streaming_request(&self, method: Method, url: &str) -> RequestBuilder {
        let request = self.client.request(method, url);
        match &self.auth {
            Some(auth) => request.header(reqwest::header::AUTHORIZATION, auth.header_value()),
            None => request,
        }
    }

    /// Request with the auth header and the configured timeout applied.
    pub fn request(&self, method: Method, url: &str) -> RequestBuilder {
        self.streaming_request(method, url).timeout(self.timeout)
    }

    /// Send a request and return the raw response, mapping network failures
    /// to `Transport`.
    pub async fn send(&self, request: RequestBuilder, url: &str) -> ShockResult<Response> {
        request.send().await.map_err(|e| {
            tracing::warn!(error = %e, url = %url, "Shock request failed");
            ShockError::transport(url, e)
        })
    }

    /// Send a request and unwrap the envelope's `data` field.
    pub async fn send_value(&self, request: RequestBuilder, url: &str) -> ShockResult<Value> {
        let response = self.send(request, url).await?;
        decode_response(url, response).await
    }

    /// Send a request and decode the envelope's `data` field into `T`.
    pub async fn send_data<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        url: &str,
    ) -> ShockResult<T> {
        let data = self.send_value(request, url).await?;
        serde_json::from_value(data)
            .map_err(|e| ShockError::MalformedResponse(format!("unexpected data shape: {}", e)))
    }
}

/// Turn an HTTP response into the envelope's `data`, or the matching error.
pub(crate) async fn decode_response(url: &str, response: Response) -> ShockResult<Value> {
    let status = response.status();
    let body = response
        .bytes()
        .await
        .map_err(|e| ShockError::transport(url, e))?;

    error_for_status(status, &body)
        .and_then(|()| Envelope::parse(&body)?.into_result())
        .inspect_err(|e| log_error(url, e))
}

pub(crate) fn log_error(url: &str, error: &ShockError) {
    let code = error.error_code();
    match error.log_level() {
        LogLevel::Debug => tracing::debug!(error = %error, code, url = %url, "Shock request rejected"),
        LogLevel::Warn => tracing::warn!(error = %error, code, url = %url, "Shock request rejected"),
        LogLevel::Error => tracing::error!(error = %error, code, url = %url, "Shock request rejected"),
    }
}

/// Map a non-success HTTP status to an error, using the envelope's first
/// error message when the body carries one.
pub(crate) fn error_for_status(status: StatusCode, body: &[u8]) -> ShockResult<()> {
    if status.is_success() {
        return Ok(());
    }
    Err(status_error(status, body))
}

/// Error for a response whose status is not a success.
pub(crate) fn status_error(status: StatusCode, body: &[u8]) -> ShockError {
    let message = Envelope::parse(body)
        .ok()
        .and_then(|env| env.first_error().map(str::to_string))
        .unwrap_or_else(|| format!("request error: {}", status));

    match status {
        StatusCode::UNAUTHORIZED => ShockError::Auth(message),
        StatusCode::NOT_FOUND => ShockError::NotFound(message),
        other => ShockError::service(other.as_u16(), message),
    }
}

/// Client for the Shock service.
#[derive(Clone)]
pub struct ApiClient {
    http: HttpCore,
    transport: Arc<dyn Transport>,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.http.base_url)
            .field("transport", &self.transport.kind())
            .finish()
    }
}

impl ApiClient {
    /// Build a client and select its transport according to `config.transport`.
    pub fn new(config: &ShockConfig) -> ShockResult<Self> {
        let http = HttpCore::new(config)?;
        let transport = transport::select(config.transport, http.clone())?;
        Ok(Self { http, transport })
    }

    /// Build a client with an explicit transport.
    pub fn with_transport(config: &ShockConfig, transport: Arc<dyn Transport>) -> ShockResult<Self> {
        Ok(Self {
            http: HttpCore::new(config)?,
            transport,
        })
    }

    /// Build a client and register the configured token with its transport.
    pub async fn connect(config: &ShockConfig) -> ShockResult<Self> {
        let client = Self::new(config)?;
        if let Some(auth) = &config.auth {
            client.transport.set_auth(auth).await?;
        }
        tracing::debug!(
            base_url = %client.http.base_url,
            transport = %client.transport.kind(),
            "Shock client ready"
        );
        Ok(client)
    }

    pub fn base_url(&self) -> &str {
        self.http.base_url()
    }

    pub fn http(&self) -> &HttpCore {
        &self.http
    }

    pub fn transport_kind(&self) -> TransportKind {
        self.transport.kind()
    }

    /// Client for the `/location` sub-API sharing this connection.
    pub fn locations(&self) -> LocationClient {
        LocationClient::new(self.http.clone())
    }
}
