//! OAuth identity provider seam and the Google implementation

use async_trait::async_trait;
use jsonwebtoken::{
    decode, decode_header,
    jwk::{AlgorithmParameters, JwkSet},
    Algorithm, DecodingKey, Validation,
};
use reqwest::Client;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, error, info};

use super::models::{IdTokenClaims, ProviderTokenResponse};
use crate::common::config::GoogleConfig;

pub const GOOGLE_ISSUERS: [&str; 2] = ["accounts.google.com", "https://accounts.google.com"];
pub const OAUTH_SCOPES: &str = "openid email profile";

const JWKS_CACHE_TTL: Duration = Duration::from_secs(3600);

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Provider returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Signing key lookup failed: {0}")]
    Jwks(String),

    #[error("Invalid token: {0}")]
    InvalidToken(String),

    #[error("JWT verification failed: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),
}

/// Operations the login flow needs from an OAuth/OpenID provider
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Authorization endpoint URL for a PKCE (S256) login
    fn authorization_url(&self, state: &str, code_challenge: &str) -> String;

    /// Exchanges an authorization code; non-2xx responses are errors
    async fn exchange_code(
        &self,
        code: &str,
        code_verifier: &str,
    ) -> Result<ProviderTokenResponse, ProviderError>;

    /// Verifies the ID token signature against the provider's published keys
    async fn verify_id_token_signature(&self, id_token: &str) -> Result<IdTokenClaims, ProviderError>;

    async fn revoke_token(&self, token: &str) -> Result<(), ProviderError>;
}

#[derive(Debug, Clone)]
pub struct GoogleEndpoints {
    pub auth_url: String,
    pub token_url: String,
    pub jwks_url: String,
    pub revoke_url: String,
}

impl Default for GoogleEndpoints {
    fn default() -> Self {
        Self {
            auth_url: "https://accounts.google.com/o/oauth2/v2/auth".to_string(),
            token_url: "https://oauth2.googleapis.com/token".to_string(),
            jwks_url: "https://www.googleapis.com/oauth2/v3/certs".to_string(),
            revoke_url: "https://oauth2.googleapis.com/revoke".to_string(),
        }
    }
}

impl GoogleEndpoints {
    /// All endpoints under one base URL (used against mock servers)
    pub fn with_base(base: &str) -> Self {
        let base = base.trim_end_matches('/');
        Self {
            auth_url: format!("{}/auth", base),
            token_url: format!("{}/token", base),
            jwks_url: format!("{}/certs", base),
            revoke_url: format!("{}/revoke", base),
        }
    }
}

struct CachedJwks {
    keys: JwkSet,
    fetched_at: Instant,
}

pub struct GoogleOAuthClient {
    http: Client,
    config: GoogleConfig,
    endpoints: GoogleEndpoints,
    jwks: RwLock<Option<CachedJwks>>,
}

impl GoogleOAuthClient {
    pub fn new(http: Client, config: GoogleConfig, endpoints: GoogleEndpoints) -> Self {
        info!(redirect_uri = %config.redirect_uri, "GoogleOAuthClient initialized");
        Self {
            http,
            config,
            endpoints,
            jwks: RwLock::new(None),
        }
    }

    async fn fetch_jwks(&self) -> Result<JwkSet, ProviderError> {
        debug!("Fetching Google JWKS");
        let response = self.http.get(&self.endpoints.jwks_url).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(status = %status, "JWKS fetch failed");
            return Err(ProviderError::Status {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json::<JwkSet>()
            .await
            .map_err(|e| ProviderError::Jwks(e.to_string()))
    }

    /// Returns the key for `kid`, refreshing the cached set when it is stale
    /// or doesn't contain the key (Google rotates keys regularly).
    async fn decoding_key(&self, kid: &str) -> Result<DecodingKey, ProviderError> {
        {
            let cache = self.jwks.read().await;
            if let Some(cached) = cache.as_ref() {
                if cached.fetched_at.elapsed() < JWKS_CACHE_TTL {
                    if let Some(jwk) = cached.keys.find(kid) {
                        return rsa_key(&jwk.algorithm);
                    }
                }
            }
        }

        let keys = self.fetch_jwks().await?;
        let key = keys
            .find(kid)
            .map(|jwk| rsa_key(&jwk.algorithm))
            .unwrap_or_else(|| Err(ProviderError::Jwks(format!("no key with kid {}", kid))));

        *self.jwks.write().await = Some(CachedJwks {
            keys,
            fetched_at: Instant::now(),
        });

        key
    }
}

fn rsa_key(params: &AlgorithmParameters) -> Result<DecodingKey, ProviderError> {
    match params {
        AlgorithmParameters::RSA(rsa) => Ok(DecodingKey::from_rsa_components(&rsa.n, &rsa.e)?),
        _ => Err(ProviderError::Jwks("signing key is not an RSA key".to_string())),
    }
}

#[async_trait]
impl IdentityProvider for GoogleOAuthClient {
    fn authorization_url(&self, state: &str, code_challenge: &str) -> String {
        let params = [
            ("client_id", self.config.client_id.as_str()),
            ("redirect_uri", self.config.redirect_uri.as_str()),
            ("response_type", "code"),
            ("scope", OAUTH_SCOPES),
            ("state", state),
            ("code_challenge", code_challenge),
            ("code_challenge_method", "S256"),
            ("access_type", "offline"),
            ("prompt", "select_account"),
        ];

        let query = params
            .iter()
            .map(|(k, v)| format!("{}={}", k, urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&");

        format!("{}?{}", self.endpoints.auth_url, query)
    }

    async fn exchange_code(
        &self,
        code: &str,
        code_verifier: &str,
    ) -> Result<ProviderTokenResponse, ProviderError> {
        let params = [
            ("code", code),
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
            ("redirect_uri", self.config.redirect_uri.as_str()),
            ("grant_type", "authorization_code"),
            ("code_verifier", code_verifier),
        ];

        debug!("Exchanging authorization code for tokens");

        let response = self
            .http
            .post(&self.endpoints.token_url)
            .form(&params)
            .send()
            .await?;

        let status = response.status();

        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            error!(status = %status, "Token exchange failed");
            return Err(ProviderError::Status {
                status: status.as_u16(),
                body,
            });
        }

        Ok(response.json::<ProviderTokenResponse>().await?)
    }

    async fn verify_id_token_signature(&self, id_token: &str) -> Result<IdTokenClaims, ProviderError> {
        let header = decode_header(id_token)?;

        if header.alg != Algorithm::RS256 {
            return Err(ProviderError::InvalidToken(format!(
                "unexpected algorithm {:?}",
                header.alg
            )));
        }

        let kid = header
            .kid
            .ok_or_else(|| ProviderError::InvalidToken("missing kid".to_string()))?;

        let key = self.decoding_key(&kid).await?;

        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_audience(&[self.config.client_id.as_str()]);
        validation.set_issuer(&GOOGLE_ISSUERS);

        let data = decode::<IdTokenClaims>(id_token, &key, &validation)?;
        Ok(data.claims)
    }

    async fn revoke_token(&self, token: &str) -> Result<(), ProviderError> {
        let response = self
            .http
            .post(&self.endpoints.revoke_url)
            .form(&[("token", token)])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Status {
                status: status.as_u16(),
                body,
            });
        }

        info!("Provider token revoked");
        Ok(())
    }
}
