use crate::constants::{
    DEFAULT_ACCESS_SCOPE, DEFAULT_API_HOST, DEFAULT_AUTHORIZE_PATH, DEFAULT_AUTH_HOST,
    DEFAULT_OAUTH_PATH, DEFAULT_PER_PAGE, DEFAULT_PHOTOS_PATH, DEFAULT_REDIRECT_PATH,
    DEFAULT_REDIRECT_URI, DEFAULT_REST_TIMEOUT, DEFAULT_SCHEME, DEFAULT_TOKEN_PATH,
};
use crate::storage::config::StorageConfig;
use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use std::fmt::Debug;
use std::str::FromStr;
use tracing::error;

const REDACTED: &str = "[REDACTED]";

/// OAuth application credentials registered with the photo API.
#[derive(Debug, Deserialize, Clone)]
pub struct Credentials {
    pub access_key: String,
    pub secret_key: String,
    pub redirect_uri: String,
    /// Scopes joined with `+`, e.g. `public+read_user+write_likes`.
    pub access_scope: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub credentials: Credentials,
    pub rest_api: RestApiConfig,
    pub storage: StorageConfig,
}

/// Hosts and paths of the authorization server and the REST API.
///
/// Hosts may include a port, which is how tests point the client at a local server.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RestApiConfig {
    pub scheme: String,
    pub auth_host: String,
    pub api_host: String,
    pub authorize_path: String,
    pub redirect_path: String,
    pub oauth_path: String,
    pub photos_path: String,
    pub per_page: u32,
    pub timeout: u64,
}

impl RestApiConfig {
    pub fn auth_base_url(&self) -> String {
        format!("{}://{}", self.scheme, self.auth_host)
    }

    pub fn api_base_url(&self) -> String {
        format!("{}://{}", self.scheme, self.api_host)
    }
}

#[derive(Serialize)]
struct RedactedCredentials<'a> {
    access_key: &'a str,
    secret_key: &'a str,
    redirect_uri: &'a str,
    access_scope: &'a str,
}

impl fmt::Display for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redacted = RedactedCredentials {
            access_key: REDACTED,
            secret_key: REDACTED,
            redirect_uri: &self.redirect_uri,
            access_scope: &self.access_scope,
        };
        let s = serde_json::to_string(&redacted).map_err(|_| fmt::Error)?;
        write!(f, "{}", s)
    }
}

impl fmt::Display for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{{\"credentials\":{},\"rest_api\":{},\"storage\":{}}}",
            self.credentials, self.rest_api, self.storage
        )
    }
}

impl fmt::Display for RestApiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = serde_json::to_string(self).map_err(|_| fmt::Error)?;
        write!(f, "{}", s)
    }
}

pub fn get_env_or_default<T: FromStr>(env_var: &str, default: T) -> T
where
    <T as FromStr>::Err: Debug,
{
    match env::var(env_var) {
        Ok(val) => val.parse::<T>().unwrap_or_else(|_| {
            error!("Failed to parse {}: {}, using default", env_var, val);
            default
        }),
        Err(_) => default,
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    pub fn new() -> Self {
        Config {
            credentials: Credentials {
                access_key: get_env_or_default(
                    "IMAGEFEED_ACCESS_KEY",
                    String::from("default_access_key"),
                ),
                secret_key: get_env_or_default(
                    "IMAGEFEED_SECRET_KEY",
                    String::from("default_secret_key"),
                ),
                redirect_uri: get_env_or_default(
                    "IMAGEFEED_REDIRECT_URI",
                    String::from(DEFAULT_REDIRECT_URI),
                ),
                access_scope: get_env_or_default(
                    "IMAGEFEED_ACCESS_SCOPE",
                    String::from(DEFAULT_ACCESS_SCOPE),
                ),
            },
            rest_api: RestApiConfig {
                scheme: get_env_or_default("IMAGEFEED_SCHEME", String::from(DEFAULT_SCHEME)),
                auth_host: get_env_or_default(
                    "IMAGEFEED_AUTH_HOST",
                    String::from(DEFAULT_AUTH_HOST),
                ),
                api_host: get_env_or_default("IMAGEFEED_API_HOST", String::from(DEFAULT_API_HOST)),
                authorize_path: get_env_or_default(
                    "IMAGEFEED_AUTHORIZE_PATH",
                    String::from(DEFAULT_AUTHORIZE_PATH),
                ),
                redirect_path: get_env_or_default(
                    "IMAGEFEED_REDIRECT_PATH",
                    String::from(DEFAULT_REDIRECT_PATH),
                ),
                oauth_path: get_env_or_default(
                    "IMAGEFEED_OAUTH_PATH",
                    String::from(DEFAULT_OAUTH_PATH),
                ),
                photos_path: get_env_or_default(
                    "IMAGEFEED_PHOTOS_PATH",
                    String::from(DEFAULT_PHOTOS_PATH),
                ),
                per_page: get_env_or_default("IMAGEFEED_PER_PAGE", DEFAULT_PER_PAGE),
                timeout: get_env_or_default("IMAGEFEED_REST_TIMEOUT", DEFAULT_REST_TIMEOUT),
            },
            storage: StorageConfig {
                token_path: get_env_or_default(
                    "IMAGEFEED_TOKEN_PATH",
                    String::from(DEFAULT_TOKEN_PATH),
                ),
            },
        }
    }

    /// Points both the authorization server and the API at `base_url`
    /// (`http://127.0.0.1:1234` style), keeping every path.
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        let (scheme, host) = base_url
            .split_once("://")
            .unwrap_or((DEFAULT_SCHEME, base_url));
        let host = host.trim_end_matches('/');
        self.rest_api.scheme = scheme.to_string();
        self.rest_api.auth_host = host.to_string();
        self.rest_api.api_host = host.to_string();
        self
    }
}
