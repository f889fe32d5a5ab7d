//! API client with bearer auth and one-shot refresh-and-retry
//!
//! Every request goes through the same pipeline:
//!
//! 1. Preflight: obtain a valid token from the [`TokenManager`], refreshing
//!    proactively when it is about to expire.
//! 2. Send with the configured timeout.
//! 3. On 401, refresh once through the shared coordinator and retry once.
//! 4. Map non-2xx responses to [`ApiError::Http`]; parse 2xx bodies as JSON.
//!
//! Unrecoverable auth failures clear the stored session and broadcast
//! [`SessionEvent::Expired`] before `ApiError::SessionExpired` is returned.

use std::sync::Arc;
use std::time::Duration;

use reqwest::header::ACCEPT;
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use riskreg_common::auth::{
    Preflight, RefreshError, SessionCredentials, SessionEvent, TokenManager, TokenStore,
    VerifyResponse,
};
use riskreg_common::storage::ClientStorage;
use riskreg_domain::ClientConfig;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::{debug, info, instrument, warn};
use url::Url;

use super::auth::AuthClient;
use super::errors::ApiError;
use crate::config::open_storage;
use crate::http::HttpClient;

/// Authenticated client for the risk register REST API
///
/// Cheap to clone; clones share the token store, the refresh coordinator and
/// the session event channel.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: HttpClient,
    base_url: String,
    tokens: Arc<TokenManager>,
    auth: Arc<AuthClient>,
}

impl ApiClient {
    /// Create a new API client over the given credential storage
    ///
    /// # Arguments
    ///
    /// * `config` - Client configuration (base URL, timeout, lookahead)
    /// * `storage` - Backend holding the session credentials
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Config` if the configuration is invalid or the
    /// HTTP client cannot be created
    pub fn new(
        config: &ClientConfig,
        storage: impl ClientStorage + 'static,
    ) -> Result<Self, ApiError> {
        config.validate()?;
        let base_url = normalize_base_url(&config.base_url)?;

        let http = HttpClient::builder().timeout(config.request_timeout()).build()?;
        let auth = Arc::new(AuthClient::new(http.clone(), base_url.clone()));

        let store = Arc::new(TokenStore::new(storage));
        let tokens = Arc::new(
            TokenManager::new(store, auth.clone()).with_lookahead(config.refresh_lookahead()),
        );

        debug!(base_url = %base_url, timeout = ?config.request_timeout(), "API client created");
        Ok(Self { http, base_url, tokens, auth })
    }

    /// Create an API client using the storage backend named in `config`
    ///
    /// # Errors
    ///
    /// Returns error if the configuration is invalid or the storage backend
    /// cannot be opened
    pub fn from_config(config: &ClientConfig) -> Result<Self, ApiError> {
        let storage = open_storage(&config.storage)?;
        Self::new(config, storage)
    }

    /// Create a builder for fluent configuration
    pub fn builder() -> ApiClientBuilder {
        ApiClientBuilder::default()
    }

    /// Token manager shared by this client and its clones
    pub fn tokens(&self) -> &Arc<TokenManager> {
        &self.tokens
    }

    /// Subscribe to session transitions (login, logout, expiry)
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.tokens.subscribe()
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Log in and store the new session
    ///
    /// # Errors
    ///
    /// Returns `ApiError::InvalidCredentials` if the backend rejects the
    /// credentials, or a transport/storage error
    pub async fn login(&self, username: &str, password: &str) -> Result<(), ApiError> {
        let tokens = self.auth.login(username, password).await?;
        self.tokens.start_session(&SessionCredentials::new(
            tokens.access_token,
            tokens.refresh_token,
            username,
        ))?;
        Ok(())
    }

    /// Ask the backend whether the current session is valid
    ///
    /// # Errors
    ///
    /// Same as [`Self::get`]
    pub async fn verify(&self) -> Result<VerifyResponse, ApiError> {
        self.get("/auth/verify").await
    }

    /// End the session
    ///
    /// The backend call is best-effort; local credentials are cleared and
    /// [`SessionEvent::LoggedOut`] is emitted regardless of its outcome.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Storage` only if the local credentials could not be
    /// cleared
    pub async fn logout(&self) -> Result<(), ApiError> {
        match self.tokens.store().access_token() {
            Ok(Some(token)) => {
                if let Err(err) = self.auth.logout(&token).await {
                    warn!(error = %err, "Logout request failed, clearing session anyway");
                }
            }
            Ok(None) => debug!("Logout without a stored token"),
            Err(err) => warn!(error = %err, "Could not read token for logout"),
        }

        self.tokens.end_session()?;
        Ok(())
    }

    /// Refresh the access token now, joining an in-flight refresh if any
    ///
    /// # Errors
    ///
    /// Returns `ApiError::RefreshFailed` if no refresh token is stored or the
    /// backend rejects it; the session is cleared in that case
    pub async fn refresh(&self) -> Result<String, ApiError> {
        Ok(self.tokens.refresh().await?)
    }

    /// Execute a GET request
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or the response cannot be
    /// deserialized
    pub async fn get<R: DeserializeOwned>(&self, path: &str) -> Result<R, ApiError> {
        self.request(Method::GET, path, None::<&()>).await
    }

    /// Execute a POST request with a JSON body
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or the response cannot be
    /// deserialized
    pub async fn post<B: Serialize + ?Sized, R: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<R, ApiError> {
        self.request(Method::POST, path, Some(body)).await
    }

    /// Execute a PUT request with a JSON body
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or the response cannot be
    /// deserialized
    pub async fn put<B: Serialize + ?Sized, R: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<R, ApiError> {
        self.request(Method::PUT, path, Some(body)).await
    }

    /// Execute a PATCH request with a JSON body
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or the response cannot be
    /// deserialized
    pub async fn patch<B: Serialize + ?Sized, R: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<R, ApiError> {
        self.request(Method::PATCH, path, Some(body)).await
    }

    /// Execute a DELETE request
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or the response cannot be
    /// deserialized
    pub async fn delete<R: DeserializeOwned>(&self, path: &str) -> Result<R, ApiError> {
        self.request(Method::DELETE, path, None::<&()>).await
    }

    /// Run one request through the auth pipeline
    ///
    /// # Errors
    ///
    /// - `ApiError::SessionExpired` when the session could not be kept valid
    /// - `ApiError::RequestTimeout` when the bound elapsed (session kept)
    /// - `ApiError::Http` for non-2xx responses other than handled 401s
    /// - `ApiError::Decode` when the body is not the expected JSON
    #[instrument(skip(self, body))]
    pub async fn request<B: Serialize + ?Sized, R: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<R, ApiError> {
        let url = join_url(&self.base_url, path);
        let body = body
            .map(serde_json::to_value)
            .transpose()
            .map_err(|e| ApiError::Decode(format!("Failed to serialize body: {e}")))?;

        let token = match self.tokens.preflight().await? {
            Preflight::Token(token) => Some(token),
            Preflight::Anonymous => None,
            Preflight::Expired => {
                warn!("Access token could not be refreshed before request");
                return Err(self.session_expired());
            }
            Preflight::Superseded => {
                debug!("Session replaced during proactive refresh; not clearing");
                return Err(ApiError::SessionExpired);
            }
        };

        let response = self.send_once(&method, &url, token.as_deref(), body.as_ref()).await?;

        let response = if response.status() == StatusCode::UNAUTHORIZED {
            debug!("Request unauthorized, refreshing token");
            let token = self.refresh_after_unauthorized(token.as_deref()).await?;
            let retried = self.send_once(&method, &url, Some(&token), body.as_ref()).await?;
            if retried.status() == StatusCode::UNAUTHORIZED {
                warn!("Request unauthorized after refresh");
                return Err(self.session_expired());
            }
            retried
        } else {
            response
        };

        let result = parse_response(response, self.http.timeout()).await?;
        debug!("Request successful");
        Ok(result)
    }

    /// Health check for API
    ///
    /// Calls `/health` on the server root, outside the auth pipeline.
    ///
    /// # Returns
    ///
    /// `true` if API is reachable and healthy
    ///
    /// # Errors
    ///
    /// Returns error if the server cannot be reached
    #[instrument(skip(self))]
    pub async fn health_check(&self) -> Result<bool, ApiError> {
        let url = Url::parse(&self.base_url)
            .and_then(|base| base.join("/health"))
            .map_err(|e| ApiError::Config(e.to_string()))?;

        debug!(url = %url, "Health check");
        let response = send_bounded(&self.http, self.http.request(Method::GET, url)).await?;

        if response.status().is_success() {
            info!("API is healthy");
            Ok(true)
        } else {
            warn!(status = %response.status(), "API returned non-success status");
            Ok(false)
        }
    }

    async fn send_once(
        &self,
        method: &Method,
        url: &str,
        token: Option<&str>,
        body: Option<&serde_json::Value>,
    ) -> Result<Response, ApiError> {
        let mut request = self.http.request(method.clone(), url).header(ACCEPT, "application/json");
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        if let Some(body) = body {
            request = request.json(body);
        }
        send_bounded(&self.http, request).await
    }

    async fn refresh_after_unauthorized(&self, sent: Option<&str>) -> Result<String, ApiError> {
        if self.tokens.store().refresh_token()?.is_none() {
            debug!("No refresh token to recover with");
            return Err(self.session_expired());
        }

        // A concurrent request already replaced the token we were refused with.
        if let Some(current) = self.tokens.store().access_token()? {
            if sent.is_some_and(|sent| sent != current) {
                debug!("Token already refreshed by another request");
                return Ok(current);
            }
        }

        match self.tokens.refresh().await {
            Ok(token) => Ok(token),
            // Logout or a new login won the race; that session is not ours to end.
            Err(RefreshError::Superseded) => Err(ApiError::SessionExpired),
            Err(err) => {
                warn!(error = %err, "Reactive refresh failed");
                Err(self.session_expired())
            }
        }
    }

    fn session_expired(&self) -> ApiError {
        self.tokens.expire_session();
        ApiError::SessionExpired
    }
}

/// Send with the client's timeout as a hard bound on time to response
pub(super) async fn send_bounded(
    http: &HttpClient,
    request: RequestBuilder,
) -> Result<Response, ApiError> {
    let timeout = http.timeout();
    match tokio::time::timeout(timeout, http.send(request)).await {
        Ok(Ok(response)) => Ok(response),
        Ok(Err(err)) => Err(ApiError::from_transport(&err, timeout)),
        Err(_) => {
            warn!(timeout = ?timeout, "Request timed out");
            Err(ApiError::RequestTimeout(timeout))
        }
    }
}

/// Join an API path onto the base URL
pub(super) fn join_url(base_url: &str, path: &str) -> String {
    let path = path.trim_start_matches('/');
    format!("{}/{}", base_url.trim_end_matches('/'), path)
}

fn normalize_base_url(base_url: &str) -> Result<String, ApiError> {
    let parsed = Url::parse(base_url.trim())
        .map_err(|e| ApiError::Config(format!("Invalid base URL {base_url}: {e}")))?;
    Ok(parsed.as_str().trim_end_matches('/').to_string())
}

async fn parse_response<R: DeserializeOwned>(
    response: Response,
    timeout: Duration,
) -> Result<R, ApiError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(ApiError::Http { status, body });
    }

    // These status codes have no body by RFC
    if status == StatusCode::NO_CONTENT || status == StatusCode::RESET_CONTENT {
        return decode_null(status);
    }

    let bytes = response.bytes().await.map_err(|e| ApiError::from_transport(&e, timeout))?;
    if bytes.is_empty() {
        return decode_null(status);
    }
    serde_json::from_slice(&bytes).map_err(|e| ApiError::Decode(e.to_string()))
}

fn decode_null<R: DeserializeOwned>(status: StatusCode) -> Result<R, ApiError> {
    serde_json::from_value(serde_json::Value::Null).map_err(|_| {
        ApiError::Decode(format!(
            "No content response ({}), but response type cannot be deserialized from empty body",
            status.as_u16()
        ))
    })
}

/// Builder for API client
#[derive(Default)]
pub struct ApiClientBuilder {
    config: Option<ClientConfig>,
    storage: Option<Arc<dyn ClientStorage>>,
}

impl ApiClientBuilder {
    /// Set the client configuration
    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the credential storage, overriding the configured backend
    pub fn storage(mut self, storage: Arc<dyn ClientStorage>) -> Self {
        self.storage = Some(storage);
        self
    }

    /// Build the API client
    ///
    /// # Errors
    ///
    /// Returns error if the configuration is invalid or storage cannot be
    /// opened
    pub fn build(self) -> Result<ApiClient, ApiError> {
        let config = self.config.unwrap_or_default();
        match self.storage {
            Some(storage) => ApiClient::new(&config, storage),
            None => ApiClient::from_config(&config),
        }
    }
}

#[cfg(test)]
mod tests {
    use riskreg_common::storage::MemoryStorage;
    use riskreg_common::testing::token_expiring_in;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    #[derive(Debug, serde::Serialize, serde::Deserialize, PartialEq)]
    struct TestResponse {
        message: String,
    }

    #[derive(Debug, serde::Serialize)]
    struct TestRequest {
        data: String,
    }

    fn config_for(server: &MockServer) -> ClientConfig {
        ClientConfig { base_url: format!("{}/api/v1", server.uri()), ..Default::default() }
    }

    fn logged_in_client(server: &MockServer) -> (ApiClient, String) {
        let client = ApiClient::new(&config_for(server), MemoryStorage::new()).unwrap();
        let token = token_expiring_in(chrono::Duration::hours(1));
        client
            .tokens()
            .start_session(&SessionCredentials::new(token.clone(), "refresh", "analyst"))
            .unwrap();
        (client, token)
    }

    #[test]
    fn test_join_url() {
        assert_eq!(join_url("http://h/api/v1", "/risks"), "http://h/api/v1/risks");
        assert_eq!(join_url("http://h/api/v1/", "risks"), "http://h/api/v1/risks");
    }

    #[test]
    fn test_new_rejects_invalid_base_url() {
        let config = ClientConfig { base_url: "not a url".into(), ..Default::default() };
        assert!(matches!(ApiClient::new(&config, MemoryStorage::new()), Err(ApiError::Config(_))));
    }

    #[tokio::test]
    async fn test_builder_defaults_to_memory_storage() {
        let client = ApiClient::builder().build().unwrap();
        assert_eq!(client.base_url(), "http://localhost:8000/api/v1");
        assert!(!client.tokens().is_authenticated().unwrap());
    }

    #[tokio::test]
    async fn test_get_with_json_response() {
        let server = MockServer::start().await;
        let (client, token) = logged_in_client(&server);

        Mock::given(method("GET"))
            .and(path("/api/v1/risks/1"))
            .and(header("authorization", format!("Bearer {token}").as_str()))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(TestResponse { message: "success".to_string() }),
            )
            .expect(1)
            .mount(&server)
            .await;

        let result: TestResponse = client.get("/risks/1").await.unwrap();
        assert_eq!(result.message, "success");
    }

    #[tokio::test]
    async fn test_anonymous_request_has_no_auth_header() {
        let server = MockServer::start().await;
        let client = ApiClient::new(&config_for(&server), MemoryStorage::new()).unwrap();

        Mock::given(method("GET"))
            .and(path("/api/v1/public"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
            .expect(1)
            .mount(&server)
            .await;

        let result: Vec<TestResponse> = client.get("/public").await.unwrap();
        assert!(result.is_empty());

        let requests = server.received_requests().await.unwrap();
        assert!(requests[0].headers.get("authorization").is_none());
    }

    #[tokio::test]
    async fn test_post_put_patch_delete() {
        let server = MockServer::start().await;
        let (client, _) = logged_in_client(&server);

        for verb in ["POST", "PUT", "PATCH"] {
            Mock::given(method(verb))
                .and(path("/api/v1/risks/1"))
                .respond_with(
                    ResponseTemplate::new(200)
                        .set_body_json(TestResponse { message: verb.to_lowercase() }),
                )
                .expect(1)
                .mount(&server)
                .await;
        }
        Mock::given(method("DELETE"))
            .and(path("/api/v1/risks/1"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let request = TestRequest { data: "test".to_string() };
        let created: TestResponse = client.post("/risks/1", &request).await.unwrap();
        let replaced: TestResponse = client.put("/risks/1", &request).await.unwrap();
        let patched: TestResponse = client.patch("/risks/1", &request).await.unwrap();
        client.delete::<()>("/risks/1").await.unwrap();

        assert_eq!(created.message, "post");
        assert_eq!(replaced.message, "put");
        assert_eq!(patched.message, "patch");
    }

    #[tokio::test]
    async fn test_get_with_205_reset_content() {
        let server = MockServer::start().await;
        let (client, _) = logged_in_client(&server);

        Mock::given(method("GET"))
            .and(path("/api/v1/reset"))
            .respond_with(ResponseTemplate::new(205))
            .mount(&server)
            .await;

        let result: Option<TestResponse> = client.get("/reset").await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_404_is_http_error_without_retry() {
        let server = MockServer::start().await;
        let (client, _) = logged_in_client(&server);

        Mock::given(method("GET"))
            .and(path("/api/v1/risks/99"))
            .respond_with(ResponseTemplate::new(404).set_body_string("Risk not found"))
            .expect(1)
            .mount(&server)
            .await;

        let err = client.get::<TestResponse>("/risks/99").await.unwrap_err();
        match err {
            ApiError::Http { status, body } => {
                assert_eq!(status, StatusCode::NOT_FOUND);
                assert_eq!(body, "Risk not found");
            }
            other => panic!("expected HTTP error, got {other:?}"),
        }
        assert!(client.tokens().is_authenticated().unwrap());
    }

    #[tokio::test]
    async fn test_unexpected_body_is_decode_error() {
        let server = MockServer::start().await;
        let (client, _) = logged_in_client(&server);

        Mock::given(method("GET"))
            .and(path("/api/v1/dashboard"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
            .mount(&server)
            .await;

        let err = client.get::<TestResponse>("/dashboard").await.unwrap_err();
        assert!(matches!(err, ApiError::Decode(_)));
    }

    #[tokio::test]
    async fn test_health_check_uses_server_root() {
        let server = MockServer::start().await;
        let client = ApiClient::new(&config_for(&server), MemoryStorage::new()).unwrap();

        Mock::given(method("GET"))
            .and(path("/health"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "status": "healthy"
            })))
            .mount(&server)
            .await;

        assert!(client.health_check().await.unwrap());
    }

    #[tokio::test]
    async fn test_health_check_failure() {
        let server = MockServer::start().await;
        let client = ApiClient::new(&config_for(&server), MemoryStorage::new()).unwrap();

        Mock::given(method("GET"))
            .and(path("/health"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        assert!(!client.health_check().await.unwrap()); // Unhealthy but no error
    }
}
