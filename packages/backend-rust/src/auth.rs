use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::http::{header, HeaderMap};
use jsonwebtoken::jwk::JwkSet;
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::KeycloakConfig;

const JWKS_TIMEOUT: Duration = Duration::from_secs(5);
/// Minimum gap between refetches triggered by an unknown key id
const MIN_REFETCH_INTERVAL: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Serialize)]
pub struct AuthUser {
    pub id: String,
    pub email: String,
    pub name: String,
}

impl AuthUser {
    /// Identity used when no identity provider is configured
    pub fn local() -> Self {
        Self {
            id: "local".to_string(),
            email: "local@localhost".to_string(),
            name: "local_user".to_string(),
        }
    }
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("missing token")]
    MissingToken,
    #[error("invalid token: {0}")]
    InvalidToken(String),
    #[error("unknown token signing key")]
    UnknownKey,
    #[error("authentication service unavailable: {0}")]
    Unavailable(String),
}

pub fn extract_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())?
        .strip_prefix("Bearer ")
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Signing keys of the identity provider, fetched on first use. Unknown key ids refetch at most once per
/// `MIN_REFETCH_INTERVAL`.
pub struct JwksCache {
    url: String,
    client: reqwest::Client,
    keys: RwLock<Option<Arc<JwkSet>>>,
    fetched_at: Mutex<Option<Instant>>,
}

fn refetch_allowed(last_fetch: Option<Instant>, now: Instant) -> bool {
    match last_fetch {
        Some(at) => now.saturating_duration_since(at) >= MIN_REFETCH_INTERVAL,
        None => true,
    }
}

impl JwksCache {
    pub fn new(url: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(JWKS_TIMEOUT)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            url,
            client,
            keys: RwLock::new(None),
            fetched_at: Mutex::new(None),
        }
    }

    pub async fn get(&self) -> Result<Arc<JwkSet>, AuthError> {
        let cached = self.keys.read().clone();
        match cached {
            Some(keys) => Ok(keys),
            None => self.fetch().await,
        }
    }

    /// Downloads the key set and replaces the cached one. A failed fetch
    /// leaves the previous keys in place.
    async fn fetch(&self) -> Result<Arc<JwkSet>, AuthError> {
        let fetched = self
            .client
            .get(&self.url)
            .send()
            .await
            .and_then(|resp| resp.error_for_status())
            .map_err(|e| {
                tracing::warn!(error = %e, url = %self.url, "failed to fetch JWKS");
                AuthError::Unavailable(e.to_string())
            })?
            .json::<JwkSet>()
            .await
            .map_err(|e| AuthError::Unavailable(e.to_string()))?;

        let keys = Arc::new(fetched);
        *self.keys.write() = Some(Arc::clone(&keys));
        *self.fetched_at.lock() = Some(Instant::now());
        Ok(keys)
    }

    /// Reserves the next refetch slot if the interval has elapsed.
    fn claim_refetch(&self) -> bool {
        let now = Instant::now();
        let mut last = self.fetched_at.lock();
        if refetch_allowed(*last, now) {
            *last = Some(now);
            true
        } else {
            false
        }
    }

    /// Looks up a key by id, refetching once in case keys were rotated.
    pub async fn decoding_key(&self, kid: &str) -> Result<DecodingKey, AuthError> {
        let keys = self.get().await?;
        if let Some(jwk) = keys.find(kid) {
            return DecodingKey::from_jwk(jwk).map_err(|e| AuthError::InvalidToken(e.to_string()));
        }

        if !self.claim_refetch() {
            tracing::debug!(kid, "unknown key id, refetch throttled");
            return Err(AuthError::UnknownKey);
        }
        let keys = self.fetch().await?;
        let jwk = keys.find(kid).ok_or(AuthError::UnknownKey)?;
        DecodingKey::from_jwk(jwk).map_err(|e| AuthError::InvalidToken(e.to_string()))
    }
}

#[derive(Debug, Deserialize)]
struct KeycloakClaims {
    sub: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    preferred_username: Option<String>,
}

/// Verifies RS256 bearer tokens issued by a Keycloak realm
pub struct KeycloakVerifier {
    client_id: String,
    jwks: JwksCache,
}

impl KeycloakVerifier {
    pub fn new(config: &KeycloakConfig) -> Self {
        Self {
            client_id: config.client_id.clone(),
            jwks: JwksCache::new(config.jwks_url()),
        }
    }

    pub async fn verify(&self, token: &str) -> Result<AuthUser, AuthError> {
        let header = decode_header(token).map_err(|e| AuthError::InvalidToken(e.to_string()))?;
        let kid = header
            .kid
            .ok_or_else(|| AuthError::InvalidToken("token header has no kid".to_string()))?;
        let key = self.jwks.decoding_key(&kid).await?;

        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_audience(&[&self.client_id]);
        let data = decode::<KeycloakClaims>(token, &key, &validation)
            .map_err(|e| AuthError::InvalidToken(e.to_string()))?;

        let claims = data.claims;
        Ok(AuthUser {
            id: claims.sub,
            email: claims.email.unwrap_or_default(),
            name: claims.name.or(claims.preferred_username).unwrap_or_default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_extract_bearer_token() {
        let mut headers = HeaderMap::new();
        assert_eq!(extract_token(&headers), None);

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer abc.def.ghi"));
        assert_eq!(extract_token(&headers).as_deref(), Some("abc.def.ghi"));

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic dXNlcg=="));
        assert_eq!(extract_token(&headers), None);
    }

    #[tokio::test]
    async fn test_garbage_token_is_rejected_before_fetching_keys() {
        let verifier = KeycloakVerifier::new(&KeycloakConfig {
            url: "http://127.0.0.1:9".to_string(),
            realm: "eyeradar".to_string(),
            client_id: "eyeradar-backend".to_string(),
        });
        let err = verifier.verify("not-a-jwt").await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidToken(_)));
    }

    #[test]
    fn test_refetch_allowed_after_interval() {
        let now = Instant::now();
        assert!(refetch_allowed(None, now));
        assert!(!refetch_allowed(Some(now), now));
        assert!(refetch_allowed(Some(now), now + MIN_REFETCH_INTERVAL));
        // a fetch stamped after `now` never underflows
        assert!(!refetch_allowed(Some(now + Duration::from_secs(1)), now));
    }

    #[tokio::test]
    async fn test_unknown_kid_refetch_is_throttled() {
        // nothing listens here, so any fetch fails as Unavailable
        let cache = JwksCache::new("http://127.0.0.1:9/certs".to_string());
        *cache.keys.write() = Some(Arc::new(JwkSet { keys: vec![] }));
        *cache.fetched_at.lock() = Some(Instant::now());

        for _ in 0..3 {
            let err = cache.decoding_key("rotated").await.err().unwrap();
            assert!(matches!(err, AuthError::UnknownKey));
        }
        assert!(cache.keys.read().is_some());

        // once the interval has passed the cache tries the provider again
        *cache.fetched_at.lock() = None;
        let err = cache.decoding_key("rotated").await.err().unwrap();
        assert!(matches!(err, AuthError::Unavailable(_)));
        assert!(cache.keys.read().is_some());
        assert!(!cache.claim_refetch());
    }
}
