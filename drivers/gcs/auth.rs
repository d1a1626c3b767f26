//! OAuth access tokens for the GCS JSON API

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use super::config::GcsConfig;

const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
/// Tokens are refreshed this long before they expire
const EXPIRY_MARGIN_SECS: i64 = 60;
const READ_ONLY_SCOPE: &str = "https://www.googleapis.com/auth/devstorage.read_only";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
/// Lifetime of a signed assertion (the maximum Google accepts)
const ASSERTION_LIFETIME_SECS: i64 = 3600;

/// Where access tokens come from / 令牌来源
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenSource {
    /// No Authorization header
    Anonymous,
    /// A fixed bearer token
    Static(String),
    /// authorized_user credentials exchanged at the OAuth token endpoint
    AuthorizedUser {
        client_id: String,
        client_secret: String,
        refresh_token: String,
    },
    /// service_account key file, exchanged with a signed JWT assertion
    ServiceAccount {
        client_email: String,
        private_key_id: Option<String>,
        private_key: String,
        token_uri: String,
    },
    /// GCE / Cloud Run metadata server
    MetadataServer { host: String },
}

/// Credential file (`GOOGLE_APPLICATION_CREDENTIALS`)
#[derive(Debug, Deserialize)]
struct CredentialsFile {
    #[serde(rename = "type")]
    kind: String,
    client_id: Option<String>,
    client_secret: Option<String>,
    refresh_token: Option<String>,
    client_email: Option<String>,
    private_key_id: Option<String>,
    private_key: Option<String>,
    token_uri: Option<String>,
}

/// JWT-bearer assertion claims / 服务账号断言
#[derive(Debug, Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

/// Token endpoint / metadata server response
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: Option<i64>,
}

/// Token错误
#[derive(Debug, Deserialize)]
struct TokenError {
    error: String,
    error_description: Option<String>,
}

#[derive(Debug, Clone)]
struct CachedToken {
    token: String,
    expires_at: DateTime<Utc>,
}

impl CachedToken {
    fn is_fresh(&self) -> bool {
        self.expires_at - Duration::seconds(EXPIRY_MARGIN_SECS) > Utc::now()
    }
}

impl TokenSource {
    /// Pick the token source for a configuration / 选择令牌来源
    pub fn from_config(config: &GcsConfig) -> Result<Self> {
        if config.anonymous {
            return Ok(TokenSource::Anonymous);
        }
        if !config.access_token.trim().is_empty() {
            return Ok(TokenSource::Static(config.access_token.trim().to_string()));
        }
        if !config.credentials_file.trim().is_empty() {
            let path = config.credentials_file.trim();
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read credentials file {}", path))?;
            return Self::from_credentials_json(&content)
                .with_context(|| format!("Invalid credentials file {}", path));
        }
        Ok(TokenSource::MetadataServer {
            host: config.metadata_host.clone(),
        })
    }

    fn from_credentials_json(content: &str) -> Result<Self> {
        let creds: CredentialsFile = serde_json::from_str(content)?;
        let kind = creds.kind.clone();
        let field = |value: Option<String>, name: &str| {
            value
                .filter(|v| !v.is_empty())
                .ok_or_else(|| anyhow!("{} credentials missing {}", kind, name))
        };
        match creds.kind.as_str() {
            "authorized_user" => {
                Ok(TokenSource::AuthorizedUser {
                    client_id: field(creds.client_id, "client_id")?,
                    client_secret: field(creds.client_secret, "client_secret")?,
                    refresh_token: field(creds.refresh_token, "refresh_token")?,
                })
            }
            "service_account" => {
                let private_key = field(creds.private_key, "private_key")?;
                // A bad key fails here, at startup
                EncodingKey::from_rsa_pem(private_key.as_bytes())
                    .context("service_account private_key is not a valid RSA PEM key")?;
                Ok(TokenSource::ServiceAccount {
                    client_email: field(creds.client_email, "client_email")?,
                    private_key_id: creds.private_key_id.filter(|v| !v.is_empty()),
                    private_key,
                    token_uri: creds
                        .token_uri
                        .filter(|v| !v.is_empty())
                        .unwrap_or_else(|| TOKEN_URL.to_string()),
                })
            }
            other => Err(anyhow!(
                "unsupported credential type {:?}; use authorized_user or service_account",
                other
            )),
        }
    }
}

/// Issues Authorization headers, caching tokens until shortly before expiry
pub struct Authenticator {
    source: TokenSource,
    client: Client,
    cached: RwLock<Option<CachedToken>>,
}

impl Authenticator {
    pub fn new(source: TokenSource, client: Client) -> Self {
        Self {
            source,
            client,
            cached: RwLock::new(None),
        }
    }

    pub fn source(&self) -> &TokenSource {
        &self.source
    }

    /// Authorization header value, or None for anonymous access
    pub async fn authorization(&self) -> Result<Option<String>> {
        match &self.source {
            TokenSource::Anonymous => Ok(None),
            TokenSource::Static(token) => Ok(Some(format!("Bearer {}", token))),
            _ => Ok(Some(format!("Bearer {}", self.access_token().await?))),
        }
    }

    /// 获取访问令牌
    async fn access_token(&self) -> Result<String> {
        {
            let cached = self.cached.read().await;
            if let Some(ref t) = *cached {
                if t.is_fresh() {
                    return Ok(t.token.clone());
                }
            }
        }

        let mut cached = self.cached.write().await;
        // Another request may have refreshed while we waited for the lock
        if let Some(ref t) = *cached {
            if t.is_fresh() {
                return Ok(t.token.clone());
            }
        }

        let response = self.fetch_token().await?;
        let token = CachedToken {
            token: response.access_token,
            expires_at: Utc::now() + Duration::seconds(response.expires_in.unwrap_or(3600)),
        };
        tracing::debug!("GCS access token refreshed, expires at {}", token.expires_at.to_rfc3339());
        *cached = Some(token.clone());
        Ok(token.token)
    }

    async fn fetch_token(&self) -> Result<TokenResponse> {
        let response = match &self.source {
            TokenSource::AuthorizedUser { client_id, client_secret, refresh_token } => {
                let params = [
                    ("client_id", client_id.as_str()),
                    ("client_secret", client_secret.as_str()),
                    ("refresh_token", refresh_token.as_str()),
                    ("grant_type", "refresh_token"),
                ];
                self.client.post(TOKEN_URL).form(&params).send().await?
            }
            TokenSource::ServiceAccount { token_uri, .. } => {
                let assertion = self.sign_assertion()?;
                let params = [("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())];
                self.client.post(token_uri).form(&params).send().await?
            }
            TokenSource::MetadataServer { host } => {
                let url = format!(
                    "http://{}/computeMetadata/v1/instance/service-accounts/default/token",
                    host
                );
                self.client
                    .get(&url)
                    .header("Metadata-Flavor", "Google")
                    .send()
                    .await
                    .map_err(|e| anyhow!("Metadata server unreachable ({}): {}", host, e))?
            }
            TokenSource::Anonymous | TokenSource::Static(_) => {
                return Err(anyhow!("token source does not issue tokens"));
            }
        };

        if response.status().is_success() {
            Ok(response.json::<TokenResponse>().await?)
        } else {
            let status = response.status();
            let error: TokenError = response.json().await.unwrap_or_else(|_| TokenError {
                error: status.to_string(),
                error_description: None,
            });
            Err(anyhow!("Token刷新失败: {}", error.error_description.unwrap_or(error.error)))
        }
    }
}

impl Authenticator {
    /// RS256 assertion for the service_account JWT-bearer grant
    fn sign_assertion(&self) -> Result<String> {
        let (client_email, private_key_id, private_key, token_uri) = match &self.source {
            TokenSource::ServiceAccount {
                client_email,
                private_key_id,
                private_key,
                token_uri,
            } => (client_email, private_key_id, private_key, token_uri),
            _ => return Err(anyhow!("token source is not a service account")),
        };

        let mut header = Header::new(Algorithm::RS256);
        header.kid = private_key_id.clone();
        let now = Utc::now().timestamp();
        let claims = AssertionClaims {
            iss: client_email,
            scope: READ_ONLY_SCOPE,
            aud: token_uri,
            iat: now,
            exp: now + ASSERTION_LIFETIME_SECS,
        };
        let key = EncodingKey::from_rsa_pem(private_key.as_bytes())?;
        Ok(jsonwebtoken::encode(&header, &claims, &key)?)
    }
}
