//! FlowTTS API client.

use std::sync::Arc;

use crate::error::{Error, Result};
use crate::session::StreamTtsService;

/// Default FlowTTS WebSocket endpoint.
pub const DEFAULT_WS_URL: &str = "wss://flowtts.cloud.tencent.com";

/// FlowTTS API client.
///
/// All configuration is held by the client value; there is no process-wide
/// state. Credentials are validated when the client is built, before any
/// network attempt.
///
/// # Example
///
/// ```rust,no_run
/// use flowtts::Client;
///
/// # fn example() -> flowtts::Result<()> {
/// let client = Client::builder(1300000000)
///     .secret_id("your-secret-id")
///     .secret_key("your-secret-key")
///     .sdk_app_id(1400000000)
///     .build()?;
///
/// let service = client.stream_tts();
/// # Ok(())
/// # }
/// ```
pub struct Client {
    config: Arc<ClientConfig>,
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client").finish_non_exhaustive()
    }
}

/// Client configuration.
#[derive(Clone)]
pub(crate) struct ClientConfig {
    pub(crate) secret_id: String,
    pub(crate) secret_key: String,
    pub(crate) app_id: i64,
    pub(crate) sdk_app_id: i64,
    pub(crate) ws_url: String,
}

impl Client {
    /// Creates a new client builder.
    pub fn builder(app_id: i64) -> ClientBuilder {
        ClientBuilder::new(app_id)
    }

    /// Returns the configured app ID.
    pub fn app_id(&self) -> i64 {
        self.config.app_id
    }

    /// Returns the configured WebSocket endpoint.
    pub fn ws_url(&self) -> &str {
        &self.config.ws_url
    }

    /// Returns the bidirectional streaming TTS service.
    pub fn stream_tts(&self) -> StreamTtsService {
        StreamTtsService::new(self.config.clone())
    }

    /// Builds a signed connection URL for a fresh connection ID without
    /// connecting. Returns the URL and the connection ID it was signed for.
    pub fn signed_stream_url(&self) -> (String, String) {
        let connection_id = generate_message_id();
        let url = crate::signing::signed_url(
            &self.config,
            &connection_id,
            crate::signing::unix_timestamp(),
        );
        (url, connection_id)
    }
}

/// Builder for creating a FlowTTS client.
pub struct ClientBuilder {
    secret_id: String,
    secret_key: String,
    app_id: i64,
    sdk_app_id: i64,
    ws_url: String,
}

impl ClientBuilder {
    /// Creates a new client builder.
    pub fn new(app_id: i64) -> Self {
        Self {
            secret_id: String::new(),
            secret_key: String::new(),
            app_id,
            sdk_app_id: 0,
            ws_url: DEFAULT_WS_URL.to_string(),
        }
    }

    /// Sets the secret ID used to identify the signing credential.
    pub fn secret_id(mut self, secret_id: impl Into<String>) -> Self {
        self.secret_id = secret_id.into();
        self
    }

    /// Sets the secret key used to sign connection URLs.
    pub fn secret_key(mut self, secret_key: impl Into<String>) -> Self {
        self.secret_key = secret_key.into();
        self
    }

    /// Sets the SDK application ID.
    pub fn sdk_app_id(mut self, sdk_app_id: i64) -> Self {
        self.sdk_app_id = sdk_app_id;
        self
    }

    /// Sets a custom WebSocket endpoint (e.g., `ws://127.0.0.1:9090` for a
    /// local test server).
    pub fn ws_url(mut self, url: impl Into<String>) -> Self {
        self.ws_url = url.into();
        self
    }

    /// Builds the client, validating the configuration.
    pub fn build(self) -> Result<Client> {
        if self.secret_id.is_empty() {
            return Err(Error::Config("secret_id must be non-empty".to_string()));
        }
        if self.secret_key.is_empty() {
            return Err(Error::Config("secret_key must be non-empty".to_string()));
        }
        if !self.ws_url.starts_with("wss://") && !self.ws_url.starts_with("ws://") {
            return Err(Error::Config(format!(
                "ws_url must be a ws:// or wss:// URL, got {:?}",
                self.ws_url
            )));
        }

        Ok(Client {
            config: Arc::new(ClientConfig {
                secret_id: self.secret_id,
                secret_key: self.secret_key,
                app_id: self.app_id,
                sdk_app_id: self.sdk_app_id,
                ws_url: self.ws_url,
            }),
        })
    }
}

/// Generates a unique message ID.
pub fn generate_message_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_requires_credentials() {
        let err = Client::builder(1300000000).build().unwrap_err();
        assert!(matches!(err, Error::Config(_)));

        let err = Client::builder(1300000000)
            .secret_id("AKIDtest")
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_build_rejects_bad_endpoint() {
        let err = Client::builder(1300000000)
            .secret_id("AKIDtest")
            .secret_key("secret")
            .ws_url("https://flowtts.cloud.tencent.com")
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_build_defaults() {
        let client = Client::builder(1300000000)
            .secret_id("AKIDtest")
            .secret_key("secret")
            .build()
            .unwrap();
        assert_eq!(client.ws_url(), DEFAULT_WS_URL);
        assert_eq!(client.app_id(), 1300000000);
    }
}
