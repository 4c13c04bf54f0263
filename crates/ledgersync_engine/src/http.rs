//! HTTP remote authority.
//!
//! The actual HTTP client is abstracted via a trait to allow different
//! implementations (reqwest, hyper, etc.). Bodies are CBOR both ways.

use crate::remote::RemoteAuthority;
use ledgersync_protocol::{
    FetchRequest, FetchResponse, RemoteAck, RemoteFailure, RemoteRecord, RemoteRequest,
    WireMessage,
};
use parking_lot::RwLock;
use std::future::Future;
use tracing::debug;

/// A raw HTTP response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    /// Status code.
    pub status: u16,
    /// Response body.
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// A 200 response.
    pub fn ok(body: Vec<u8>) -> Self {
        Self { status: 200, body }
    }

    /// Returns true for 2xx statuses.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// HTTP client abstraction.
///
/// Implement this trait to provide the actual HTTP transport. An `Err` means
/// the request never got a response (connection refused, DNS, TLS, ...).
pub trait HttpClient: Send + Sync {
    /// Sends a POST request.
    fn post(
        &self,
        url: &str,
        body: Vec<u8>,
    ) -> impl Future<Output = Result<HttpResponse, String>> + Send;
}

/// A remote authority reached over HTTP.
///
/// Each request is posted to `{base_url}/{request_type}`.
pub struct HttpAuthority<C: HttpClient> {
    base_url: String,
    client: C,
    last_error: RwLock<Option<String>>,
}

impl<C: HttpClient> HttpAuthority<C> {
    /// Creates a new HTTP authority.
    pub fn new(base_url: impl Into<String>, client: C) -> Self {
        Self {
            base_url: base_url.into(),
            client,
            last_error: RwLock::new(None),
        }
    }

    /// Returns the base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Returns the last transport error message.
    pub fn last_error(&self) -> Option<String> {
        self.last_error.read().clone()
    }

    /// The URL a request type is posted to.
    pub fn endpoint(&self, request_type: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), request_type)
    }

    async fn post_cbor<Req, Res>(&self, request_type: &str, request: &Req) -> Result<Res, RemoteFailure>
    where
        Req: WireMessage + Sync,
        Res: WireMessage,
    {
        let body = request
            .encode()
            .map_err(|e| RemoteFailure::Rejected(e.to_string()))?;

        let url = self.endpoint(request_type);
        debug!(%url, bytes = body.len(), "posting");
        let response = match self.client.post(&url, body).await {
            Ok(response) => response,
            Err(e) => {
                *self.last_error.write() = Some(e.clone());
                return Err(RemoteFailure::Transport(e));
            }
        };
        *self.last_error.write() = None;

        if !response.is_success() {
            return Err(RemoteFailure::status(
                response.status,
                String::from_utf8_lossy(&response.body).into_owned(),
            ));
        }

        Res::decode(&response.body).map_err(|e| RemoteFailure::Rejected(e.to_string()))
    }
}

impl<C: HttpClient> RemoteAuthority for HttpAuthority<C> {
    async fn send(&self, request: RemoteRequest) -> Result<RemoteAck, RemoteFailure> {
        self.post_cbor(&request.request_type, &request).await
    }

    async fn fetch_all(&self, request: FetchRequest) -> Result<Vec<RemoteRecord>, RemoteFailure> {
        let response: FetchResponse = self.post_cbor(&request.request_type, &request).await?;
        Ok(response.records)
    }
}
