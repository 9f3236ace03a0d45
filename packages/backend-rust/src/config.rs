use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;

use crate::db::sqlite_primary::default_sqlite_db_path;

#[derive(Debug, Clone)]
pub struct KeycloakConfig {
    pub url: String,
    pub realm: String,
    pub client_id: String,
}

impl KeycloakConfig {
    pub fn jwks_url(&self) -> String {
        format!(
            "{}/realms/{}/protocol/openid-connect/certs",
            self.url.trim_end_matches('/'),
            self.realm
        )
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: IpAddr,
    pub port: u16,
    pub log_level: String,
    pub database_path: PathBuf,
    pub tts_cache_dir: PathBuf,
    pub tts_endpoint: Option<String>,
    /// Bearer tokens are checked only when this is set
    pub keycloak: Option<KeycloakConfig>,
}

impl Config {
    pub fn from_env() -> Self {
        let port = std::env::var("PORT")
            .ok()
            .and_then(|value| value.parse::<u16>().ok())
            .unwrap_or(8000);

        let host = std::env::var("HOST")
            .ok()
            .and_then(|value| value.parse::<IpAddr>().ok())
            .unwrap_or(IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0)));

        let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        let database_path = non_empty_env("DATABASE_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(default_sqlite_db_path);

        let tts_cache_dir = non_empty_env("TTS_CACHE_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("./.tts_cache"));

        let keycloak = non_empty_env("KEYCLOAK_URL").map(|url| KeycloakConfig {
            url,
            realm: non_empty_env("KEYCLOAK_REALM").unwrap_or_else(|| "eyeradar".to_string()),
            client_id: non_empty_env("KEYCLOAK_CLIENT_ID").unwrap_or_else(|| "eyeradar-backend".to_string()),
        });

        Self {
            host,
            port,
            log_level,
            database_path,
            tts_cache_dir,
            tts_endpoint: non_empty_env("TTS_ENDPOINT"),
            keycloak,
        }
    }

    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    pub fn auth_enabled(&self) -> bool {
        self.keycloak.is_some()
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_jwks_url() {
        let kc = KeycloakConfig {
            url: "https://auth.example.com/".to_string(),
            realm: "eyeradar".to_string(),
            client_id: "eyeradar-backend".to_string(),
        };
        assert_eq!(
            kc.jwks_url(),
            "https://auth.example.com/realms/eyeradar/protocol/openid-connect/certs"
        );
    }
}
