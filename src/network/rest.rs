use crate::messages::wire::{get_str, object};
use crate::messages::{ApiError, DecodeError};
use crate::network::error::{ClientError, Result};
use crate::session::Session;
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::{debug, instrument, warn};

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(20);

const PUBLIC_KEY_ENDPOINT: &str = "/rsa_key";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Patch,
    Delete,
}

impl Method {
    /// POST and PATCH send a JSON body; GET and DELETE use the query string
    pub fn carries_body(self) -> bool {
        matches!(self, Method::Post | Method::Patch)
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
        };
        f.write_str(name)
    }
}

/// One stateless call to the API
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    pub endpoint: String,
    pub params: Map<String, Value>,
}

impl ApiRequest {
    pub fn new(method: Method, endpoint: impl Into<String>, params: Map<String, Value>) -> Self {
        Self {
            method,
            endpoint: endpoint.into(),
            params,
        }
    }

    /// Parameters flattened for a query string; strings are not quoted
    pub fn query_pairs(&self) -> Vec<(String, String)> {
        self.params
            .iter()
            .filter(|(_, v)| !v.is_null())
            .map(|(k, v)| {
                let value = match v {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                (k.clone(), value)
            })
            .collect()
    }
}

/// Sends one request and returns the decoded JSON body. Error envelopes are
/// turned into `ClientError::Application`.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn send(&self, request: ApiRequest) -> Result<Value>;
}

/// Encrypts request bodies with the server's public key
pub trait RequestEncryptor: Send + Sync {
    fn encrypt(&self, public_key: &str, plaintext: &[u8]) -> Result<String>;
}

/// `HttpTransport` over reqwest
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    http: reqwest::Client,
    base_url: String,
}

impl ReqwestTransport {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        if base_url.is_empty() {
            return Err(ClientError::InvalidRequest("base_url is empty".into()));
        }
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}{}", self.base_url, endpoint)
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    #[instrument(level = "debug", skip(self, request), fields(method = %request.method, endpoint = %request.endpoint))]
    async fn send(&self, request: ApiRequest) -> Result<Value> {
        let url = self.url(&request.endpoint);
        let builder = match request.method {
            Method::Get => self.http.get(&url).query(&request.query_pairs()),
            Method::Delete => self.http.delete(&url).query(&request.query_pairs()),
            Method::Post => self.http.post(&url).json(&request.params),
            Method::Patch => self.http.patch(&url).json(&request.params),
        };

        let response = builder.send().await?;
        let status = response.status();
        let bytes = response.bytes().await?;
        debug!("{} {} -> {} ({} bytes)", request.method, url, status, bytes.len());

        let body = if bytes.is_empty() {
            Value::Null
        } else {
            match serde_json::from_slice::<Value>(&bytes) {
                Ok(body) => body,
                Err(e) if status.is_success() => {
                    return Err(DecodeError::invalid_value("response body", e.to_string()).into())
                }
                Err(_) => return Err(ClientError::HttpStatus { status: status.as_u16() }),
            }
        };

        match ApiError::from_envelope(&body) {
            Some(Ok(err)) => {
                debug!("Server reported {}", err);
                return Err(err.into());
            }
            Some(Err(e)) => {
                warn!("{} {} returned a malformed error: {}", request.method, url, e);
                return Err(e.into());
            }
            None => {}
        }
        if !status.is_success() {
            warn!("{} {} failed with status {}", request.method, url, status);
            return Err(ClientError::HttpStatus {
                status: status.as_u16(),
            });
        }
        Ok(body)
    }
}

/// Client for the stateless API endpoints
#[derive(Clone)]
pub struct RestClient {
    transport: Arc<dyn HttpTransport>,
    session: Session,
    encryptor: Option<Arc<dyn RequestEncryptor>>,
    public_key: Arc<OnceCell<String>>,
}

impl RestClient {
    pub fn new(transport: Arc<dyn HttpTransport>, session: Session) -> Self {
        Self {
            transport,
            session,
            encryptor: None,
            public_key: Arc::new(OnceCell::new()),
        }
    }

    /// Client over HTTP(S) at `base_url`
    pub fn connect(base_url: &str, timeout: Duration, session: Session) -> Result<Self> {
        let transport = ReqwestTransport::new(base_url, timeout)?;
        Ok(Self::new(Arc::new(transport), session))
    }

    pub fn with_encryptor(mut self, encryptor: Arc<dyn RequestEncryptor>) -> Self {
        self.encryptor = Some(encryptor);
        self
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Issue a request, adding session fields when `authenticated`
    #[instrument(level = "debug", skip(self, params))]
    pub async fn request(
        &self,
        method: Method,
        endpoint: &str,
        mut params: Map<String, Value>,
        authenticated: bool,
    ) -> Result<Value> {
        if authenticated {
            self.append_auth(&mut params)?;
        }
        self.transport
            .send(ApiRequest::new(method, endpoint, params))
            .await
    }

    pub async fn get(&self, endpoint: &str, params: Map<String, Value>, authenticated: bool) -> Result<Value> {
        self.request(Method::Get, endpoint, params, authenticated).await
    }

    pub async fn post(&self, endpoint: &str, params: Map<String, Value>, authenticated: bool) -> Result<Value> {
        self.request(Method::Post, endpoint, params, authenticated).await
    }

    pub async fn patch(&self, endpoint: &str, params: Map<String, Value>, authenticated: bool) -> Result<Value> {
        self.request(Method::Patch, endpoint, params, authenticated).await
    }

    pub async fn delete(&self, endpoint: &str, params: Map<String, Value>, authenticated: bool) -> Result<Value> {
        self.request(Method::Delete, endpoint, params, authenticated).await
    }

    /// Send a body encrypted with the server's public key as `{"data": ...}`
    #[instrument(level = "debug", skip(self, params))]
    pub async fn request_encrypted(
        &self,
        method: Method,
        endpoint: &str,
        mut params: Map<String, Value>,
        authenticated: bool,
    ) -> Result<Value> {
        if !method.carries_body() {
            return Err(ClientError::InvalidRequest(format!(
                "{} requests cannot carry an encrypted body",
                method
            )));
        }
        let encryptor = self
            .encryptor
            .as_ref()
            .ok_or_else(|| ClientError::Encryption("no encryptor configured".to_string()))?;
        if authenticated {
            self.append_auth(&mut params)?;
        }

        let public_key = self.public_key().await?;
        let plaintext = serde_json::to_vec(&params)
            .map_err(|e| ClientError::Encryption(e.to_string()))?;
        let ciphertext = encryptor.encrypt(public_key, &plaintext)?;

        let mut body = Map::new();
        body.insert("data".to_string(), Value::String(ciphertext));
        self.transport
            .send(ApiRequest::new(method, endpoint, body))
            .await
    }

    pub async fn post_encrypted(&self, endpoint: &str, params: Map<String, Value>, authenticated: bool) -> Result<Value> {
        self.request_encrypted(Method::Post, endpoint, params, authenticated)
            .await
    }

    async fn public_key(&self) -> Result<&str> {
        let key = self
            .public_key
            .get_or_try_init(|| async {
                let body = self
                    .transport
                    .send(ApiRequest::new(Method::Get, PUBLIC_KEY_ENDPOINT, Map::new()))
                    .await?;
                let obj = object(&body, "public key response")?;
                Ok::<_, ClientError>(get_str(obj, "public_key")?.to_string())
            })
            .await?;
        Ok(key.as_str())
    }

    fn append_auth(&self, params: &mut Map<String, Value>) -> Result<()> {
        let identity = self.session.current_identity()?;
        for (name, value) in identity.auth_fields() {
            params.insert(name.to_string(), value);
        }
        Ok(())
    }
}

impl fmt::Debug for RestClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RestClient")
            .field("session", &self.session)
            .field("encrypts", &self.encryptor.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_query_pairs_unquote_strings() {
        let params = json!({"page": 2, "account": "artemis", "skip": null});
        let request = ApiRequest::new(
            Method::Get,
            "/games/completed",
            params.as_object().cloned().unwrap(),
        );
        let mut pairs = request.query_pairs();
        pairs.sort();
        assert_eq!(
            pairs,
            vec![
                ("account".to_string(), "artemis".to_string()),
                ("page".to_string(), "2".to_string())
            ]
        );
    }

    #[test]
    fn test_body_methods() {
        assert!(Method::Post.carries_body());
        assert!(Method::Patch.carries_body());
        assert!(!Method::Get.carries_body());
        assert!(!Method::Delete.carries_body());
    }
}
