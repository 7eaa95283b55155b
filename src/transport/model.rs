use crate::constants::{ACCEPT_HEADER_KEY, AUTHORIZATION_HEADER_KEY, JSON_CONTENT_TYPE};
use crate::error::TransportError;
use crate::session::interface::BearerToken;
use crate::utils::security::mask_token;
use reqwest::{Method, Url};
use std::fmt;

const SENSITIVE_QUERY_KEYS: [&str; 2] = ["client_secret", "code"];

/// A fully built HTTP request, independent of the client that will execute it.
#[derive(Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub url: Url,
    pub headers: Vec<(String, String)>,
}

impl ApiRequest {
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            headers: Vec::new(),
        }
    }

    pub fn get(url: Url) -> Self {
        Self::new(Method::GET, url)
    }

    pub fn post(url: Url) -> Self {
        Self::new(Method::POST, url)
    }

    pub fn delete(url: Url) -> Self {
        Self::new(Method::DELETE, url)
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    pub fn bearer(self, token: &BearerToken) -> Self {
        let value = format!("Bearer {}", token.as_str());
        self.with_header(AUTHORIZATION_HEADER_KEY, &value)
    }

    pub fn accept_json(self) -> Self {
        self.with_header(ACCEPT_HEADER_KEY, JSON_CONTENT_TYPE)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn query_value(&self, name: &str) -> Option<String> {
        self.url
            .query_pairs()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.into_owned())
    }

    /// The URL with secret query values masked, for log lines.
    pub fn redacted_url(&self) -> String {
        if self.url.query().is_none() {
            return self.url.to_string();
        }
        let mut url = self.url.clone();
        let pairs: Vec<(String, String)> = self
            .url
            .query_pairs()
            .map(|(key, value)| {
                let value = if SENSITIVE_QUERY_KEYS.contains(&key.as_ref()) {
                    mask_token(&value)
                } else {
                    value.into_owned()
                };
                (key.into_owned(), value)
            })
            .collect();
        url.query_pairs_mut().clear().extend_pairs(pairs);
        url.to_string()
    }
}

impl fmt::Debug for ApiRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let headers: Vec<(&str, String)> = self
            .headers
            .iter()
            .map(|(key, value)| {
                if key.eq_ignore_ascii_case(AUTHORIZATION_HEADER_KEY) {
                    (key.as_str(), mask_token(value))
                } else {
                    (key.as_str(), value.clone())
                }
            })
            .collect();
        f.debug_struct("ApiRequest")
            .field("method", &self.method)
            .field("url", &self.redacted_url())
            .field("headers", &headers)
            .finish()
    }
}

impl fmt::Display for ApiRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.redacted_url())
    }
}

/// Joins `base` (`scheme://host[:port]`) and `path`, then appends `query` in order.
pub(crate) fn build_url(
    base: &str,
    path: &str,
    query: &[(&str, &str)],
) -> Result<Url, TransportError> {
    let raw = format!("{}{}", base.trim_end_matches('/'), path);
    let mut url = Url::parse(&raw)
        .map_err(|e| TransportError::InvalidRequest(format!("{raw}: {e}")))?;
    if url.cannot_be_a_base() {
        return Err(TransportError::InvalidRequest(format!(
            "{raw}: not a hierarchical url"
        )));
    }
    if !query.is_empty() {
        url.query_pairs_mut().extend_pairs(query);
    }
    Ok(url)
}
