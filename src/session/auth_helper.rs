/******************************************************************************
    Author: Joaquín Béjar García
    Email: jb@taunais.com
    Date: 19/10/26
 ******************************************************************************/
use crate::config::Config;
use crate::transport::model::ApiRequest;
use reqwest::Url;
use std::sync::Arc;
use tracing::{debug, warn};

/// Builds the authorization page request and reads the code back out of the redirect.
#[derive(Debug, Clone)]
pub struct AuthHelper {
    config: Arc<Config>,
}

impl AuthHelper {
    pub fn new(config: Arc<Config>) -> Self {
        Self { config }
    }

    /// The authorization page URL for the configured client.
    ///
    /// # Panics
    ///
    /// If the configured scheme, host or authorize path do not form a URL. That is a
    /// static configuration mistake, not a runtime condition.
    pub fn authorization_url(&self) -> Url {
        build_authorization_url(&self.config)
    }

    /// A `GET` of [`authorization_url`](Self::authorization_url), ready to hand to a web view.
    pub fn authorization_request(&self) -> ApiRequest {
        ApiRequest::get(self.authorization_url())
    }

    /// The `code` query value when `redirect_url` is on the redirect path.
    pub fn code_from(&self, redirect_url: &str) -> Option<String> {
        extract_code(&self.config.rest_api.redirect_path, redirect_url)
    }
}

/// See [`AuthHelper::authorization_url`].
pub fn build_authorization_url(config: &Config) -> Url {
    let raw = format!(
        "{}{}",
        config.rest_api.auth_base_url(),
        config.rest_api.authorize_path
    );
    let mut url = Url::parse(&raw)
        .unwrap_or_else(|e| panic!("authorization endpoint {raw} is not a valid URL: {e}"));

    // scopes are `+` separated; a space is form-encoded back to `+`
    let scope = config.credentials.access_scope.replace('+', " ");
    url.query_pairs_mut()
        .append_pair("client_id", &config.credentials.access_key)
        .append_pair("redirect_uri", &config.credentials.redirect_uri)
        .append_pair("response_type", "code")
        .append_pair("scope", &scope);

    debug!("Authorization URL built for {}", url.path());
    url
}

/// Never fails loudly: anything unexpected yields `None`.
pub fn extract_code(redirect_path: &str, redirect_url: &str) -> Option<String> {
    let url = match Url::parse(redirect_url) {
        Ok(url) => url,
        Err(e) => {
            warn!("Ignoring unparsable redirect url: {}", e);
            return None;
        }
    };

    if !url.path().starts_with(redirect_path) {
        debug!("Redirect path {} is not {}", url.path(), redirect_path);
        return None;
    }

    url.query_pairs()
        .find(|(key, _)| key == "code")
        .map(|(_, value)| value.into_owned())
        .filter(|code| !code.is_empty())
}
