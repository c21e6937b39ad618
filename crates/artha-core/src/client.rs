//! Request dispatch: classify the endpoint, resolve a credential, issue the
//! request, normalize the response.
//!
//! The dispatcher only ever reads the credential store. Writing tokens
//! belongs to the login flow in [`crate::session`]; clearing them belongs
//! to logout. No retries happen here: a blanket retry on
//! `AuthorizationExpired` would be wrong, the caller must act on it.

use std::sync::Arc;

use anyhow::{Context, Result};
use reqwest::Method;
use reqwest::StatusCode;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use serde_json::Value;

use crate::config::ApiConfig;
use crate::credentials::CredentialStore;
use crate::endpoint::{EndpointClass, classify};
use crate::error::{ApiError, ApiResult};

/// Standard User-Agent header for artha API requests.
pub const USER_AGENT: &str = concat!("artha/", env!("CARGO_PKG_VERSION"));

/// Request body accepted by [`ApiClient::send`].
pub enum RequestBody {
    /// Serialized as JSON text.
    Json(Value),
    /// Passed through untouched; the transport sets its own boundary
    /// headers and no default Content-Type is applied.
    Multipart(reqwest::multipart::Form),
}

/// Decoded response payload.
#[derive(Debug, Clone, PartialEq)]
pub enum ApiPayload {
    /// 2xx with a JSON content type.
    Json(Value),
    /// 2xx with any other content type. The body is never JSON-decoded
    /// when the content type does not declare JSON.
    Text(String),
    /// HTTP 204. Distinct from an empty JSON object.
    NoContent,
}

impl ApiPayload {
    /// Returns the JSON value for a JSON payload.
    pub fn as_json(&self) -> Option<&Value> {
        match self {
            ApiPayload::Json(value) => Some(value),
            _ => None,
        }
    }

    pub fn into_json(self) -> Option<Value> {
        match self {
            ApiPayload::Json(value) => Some(value),
            _ => None,
        }
    }
}

/// HTTP client bound to the backend origin and a credential store.
///
/// Cheap to share behind an `Arc`; concurrent `send` calls are independent
/// and only read the store.
pub struct ApiClient {
    base_url: String,
    http: reqwest::Client,
    store: Arc<CredentialStore>,
}

impl ApiClient {
    /// Creates a client from configuration and a credential store.
    ///
    /// # Errors
    /// Returns an error for a malformed base URL or an unbuildable
    /// transport.
    pub fn new(config: &ApiConfig, store: Arc<CredentialStore>) -> Result<Self> {
        let base_url = config.resolved_base_url()?;
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(config.timeout())
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            base_url,
            http,
            store,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn store(&self) -> &Arc<CredentialStore> {
        &self.store
    }

    /// Walks the precedence table for the class and returns the first
    /// populated slot's token.
    fn resolve_token(&self, class: EndpointClass) -> Option<String> {
        class
            .slot_chain()
            .iter()
            .find_map(|slot| self.store.get(*slot))
    }

    /// Issues a request and normalizes the outcome.
    ///
    /// Caller-supplied headers win over defaults. A missing credential is
    /// not an error: the request proceeds unauthenticated and the server
    /// makes its own authorization decision.
    ///
    /// # Errors
    /// `NetworkUnavailable` when no response arrived at all,
    /// `AuthorizationExpired` for 401/403, `RequestFailed` for any other
    /// non-2xx status.
    pub async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<RequestBody>,
        headers: Option<HeaderMap>,
    ) -> ApiResult<ApiPayload> {
        let class = classify(path);
        let token = if class == EndpointClass::Public {
            None
        } else {
            self.resolve_token(class)
        };

        let is_multipart = matches!(body, Some(RequestBody::Multipart(_)));
        let mut header_map = headers.unwrap_or_default();
        if !is_multipart && !header_map.contains_key(CONTENT_TYPE) {
            header_map.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        }
        if let Some(token) = &token
            && !header_map.contains_key(AUTHORIZATION)
        {
            let value = HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(|_| ApiError::invalid_credential("stored token is not a valid header value"))?;
            header_map.insert(AUTHORIZATION, value);
        }

        tracing::debug!(
            %method,
            path,
            ?class,
            authenticated = token.is_some(),
            "dispatching request"
        );

        let url = format!("{}{}", self.base_url, path);
        let mut builder = self.http.request(method, &url).headers(header_map);
        builder = match body {
            Some(RequestBody::Json(value)) => builder.body(value.to_string()),
            Some(RequestBody::Multipart(form)) => builder.multipart(form),
            None => builder,
        };

        let response = builder.send().await.map_err(from_transport)?;
        normalize(response).await
    }

    /// GET a path.
    ///
    /// # Errors
    /// See [`ApiClient::send`].
    pub async fn get(&self, path: &str) -> ApiResult<ApiPayload> {
        self.send(Method::GET, path, None, None).await
    }

    /// POST a JSON body.
    ///
    /// # Errors
    /// See [`ApiClient::send`].
    pub async fn post(&self, path: &str, body: Value) -> ApiResult<ApiPayload> {
        self.send(Method::POST, path, Some(RequestBody::Json(body)), None)
            .await
    }

    /// POST a multipart form (the one binary upload path).
    ///
    /// # Errors
    /// See [`ApiClient::send`].
    pub async fn post_multipart(
        &self,
        path: &str,
        form: reqwest::multipart::Form,
    ) -> ApiResult<ApiPayload> {
        self.send(Method::POST, path, Some(RequestBody::Multipart(form)), None)
            .await
    }

    /// PUT a JSON body.
    ///
    /// # Errors
    /// See [`ApiClient::send`].
    pub async fn put(&self, path: &str, body: Value) -> ApiResult<ApiPayload> {
        self.send(Method::PUT, path, Some(RequestBody::Json(body)), None)
            .await
    }

    /// PUT a multipart form.
    ///
    /// # Errors
    /// See [`ApiClient::send`].
    pub async fn put_multipart(
        &self,
        path: &str,
        form: reqwest::multipart::Form,
    ) -> ApiResult<ApiPayload> {
        self.send(Method::PUT, path, Some(RequestBody::Multipart(form)), None)
            .await
    }

    /// DELETE a path.
    ///
    /// # Errors
    /// See [`ApiClient::send`].
    pub async fn delete(&self, path: &str) -> ApiResult<ApiPayload> {
        self.send(Method::DELETE, path, None, None).await
    }
}

/// Maps a transport-level reqwest failure (no response at all).
fn from_transport(err: reqwest::Error) -> ApiError {
    if err.is_timeout() {
        ApiError::timeout(err.to_string())
    } else {
        ApiError::network(err.to_string())
    }
}

/// Turns a received response into a payload or a classified failure.
async fn normalize(response: reqwest::Response) -> ApiResult<ApiPayload> {
    let status = response.status();

    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        let message = error_message(response).await;
        return Err(ApiError::AuthorizationExpired {
            status: status.as_u16(),
            message,
        });
    }

    if !status.is_success() {
        let message = error_message(response).await;
        return Err(ApiError::RequestFailed {
            status: status.as_u16(),
            message,
        });
    }

    if status == StatusCode::NO_CONTENT {
        return Ok(ApiPayload::NoContent);
    }

    let json = declares_json(response.headers());
    let text = response.text().await.map_err(from_transport)?;
    if json {
        serde_json::from_str(&text)
            .map(ApiPayload::Json)
            .map_err(|err| ApiError::RequestFailed {
                status: status.as_u16(),
                message: format!("response declared JSON but did not parse: {err}"),
            })
    } else {
        Ok(ApiPayload::Text(text))
    }
}

/// Error body contract: an optional JSON object with a `message` field.
/// Anything else falls back to the status canonical reason.
async fn error_message(response: reqwest::Response) -> String {
    let status = response.status();
    let fallback = || {
        status
            .canonical_reason()
            .unwrap_or("An API error occurred")
            .to_string()
    };

    if !declares_json(response.headers()) {
        return fallback();
    }

    match response.json::<Value>().await {
        Ok(body) => body
            .get("message")
            .and_then(Value::as_str)
            .filter(|msg| !msg.is_empty())
            .map_or_else(fallback, str::to_string),
        Err(_) => fallback(),
    }
}

/// Matches the literal `application/json` only; `application/*+json`
/// types intentionally fall through to the raw-text path, per the
/// backend's body contract.
fn declares_json(headers: &HeaderMap) -> bool {
    headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.contains("application/json"))
}
