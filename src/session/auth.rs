use crate::config::Config;
use crate::constants::AUTHORIZATION_CODE_GRANT;
use crate::error::{AppError, TransportError};
use crate::session::interface::{BearerToken, TokenExchanger};
use crate::session::logout::Resettable;
use crate::storage::token_store::TokenStore;
use crate::transport::http_client::PhotoHttpClient;
use crate::transport::model::{build_url, ApiRequest};
use crate::utils::sync::{MutexExt, ReleaseOnDrop};
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::{Arc, Mutex};
use tokio::task::AbortHandle;
use tracing::{debug, error, info, instrument, warn};

/// Token endpoint response. Only `access_token` is relied upon.
#[derive(Debug, Clone, Deserialize)]
pub struct OAuthTokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
    #[serde(default)]
    pub created_at: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExchangePhase {
    Idle,
    Exchanging,
}

#[derive(Debug)]
enum ExchangeState {
    Idle,
    Exchanging {
        code: String,
        attempt: u64,
        handle: AbortHandle,
    },
}

#[derive(Debug)]
struct ExchangeSlot {
    state: ExchangeState,
    last_attempt: u64,
}

struct AuthInner<T, S: ?Sized> {
    config: Arc<Config>,
    client: Arc<T>,
    token_store: Arc<S>,
    slot: Mutex<ExchangeSlot>,
}

/// Exchanges an authorization code for a bearer token and persists it.
///
/// At most one exchange runs at a time. Asking again for the code already in
/// flight fails with [`AppError::DuplicateRequest`]; asking for a different
/// code abandons the running exchange, whose caller sees [`AppError::Cancelled`].
pub struct OAuth2Service<T, S: ?Sized> {
    inner: Arc<AuthInner<T, S>>,
}

impl<T, S: ?Sized> Clone for OAuth2Service<T, S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T, S> OAuth2Service<T, S>
where
    T: PhotoHttpClient + 'static,
    S: TokenStore + ?Sized + 'static,
{
    pub fn new(config: Arc<Config>, client: Arc<T>, token_store: Arc<S>) -> Self {
        Self {
            inner: Arc::new(AuthInner {
                config,
                client,
                token_store,
                slot: Mutex::new(ExchangeSlot {
                    state: ExchangeState::Idle,
                    last_attempt: 0,
                }),
            }),
        }
    }

    pub fn phase(&self) -> ExchangePhase {
        match self.inner.slot.lock_or_recover().state {
            ExchangeState::Idle => ExchangePhase::Idle,
            ExchangeState::Exchanging { .. } => ExchangePhase::Exchanging,
        }
    }

    #[instrument(skip(self, code))]
    pub async fn fetch_token(&self, code: &str) -> Result<BearerToken, AppError> {
        let task = {
            let mut slot = self.inner.slot.lock_or_recover();

            if let ExchangeState::Exchanging { code: current, .. } = &slot.state {
                if current == code {
                    warn!("Token exchange for this code is already running");
                    return Err(AppError::DuplicateRequest);
                }
            }

            if let ExchangeState::Exchanging {
                attempt, handle, ..
            } = std::mem::replace(&mut slot.state, ExchangeState::Idle)
            {
                info!("Abandoning token exchange attempt {} for a newer code", attempt);
                handle.abort();
            }

            let request = self.inner.token_request(code).map_err(|e| {
                error!("Cannot build token request: {}", e);
                AppError::from(e)
            })?;

            slot.last_attempt = slot.last_attempt.wrapping_add(1);
            let attempt = slot.last_attempt;
            debug!("Starting token exchange attempt {}: {}", attempt, request);

            let inner = Arc::clone(&self.inner);
            let task = tokio::spawn(async move {
                let _release = {
                    let inner = Arc::clone(&inner);
                    ReleaseOnDrop::new(move || inner.release(attempt))
                };
                let result = inner
                    .client
                    .perform_decoding::<OAuthTokenResponse>(request)
                    .await;
                inner.complete(attempt, result)
            });
            slot.state = ExchangeState::Exchanging {
                code: code.to_string(),
                attempt,
                handle: task.abort_handle(),
            };
            task
        };

        task.await?
    }

    /// Abandons any running exchange. Its caller sees [`AppError::Cancelled`].
    pub fn cancel(&self) {
        let mut slot = self.inner.slot.lock_or_recover();
        if let ExchangeState::Exchanging {
            attempt, handle, ..
        } = std::mem::replace(&mut slot.state, ExchangeState::Idle)
        {
            debug!("Cancelling token exchange attempt {}", attempt);
            handle.abort();
        }
    }
}

impl<T, S> AuthInner<T, S>
where
    T: PhotoHttpClient,
    S: TokenStore + ?Sized,
{
    fn token_request(&self, code: &str) -> Result<ApiRequest, TransportError> {
        if code.trim().is_empty() {
            return Err(TransportError::InvalidRequest(
                "empty authorization code".to_string(),
            ));
        }
        let credentials = &self.config.credentials;
        let url = build_url(
            &self.config.rest_api.auth_base_url(),
            &self.config.rest_api.oauth_path,
            &[
                ("client_id", credentials.access_key.as_str()),
                ("client_secret", credentials.secret_key.as_str()),
                ("redirect_uri", credentials.redirect_uri.as_str()),
                ("code", code),
                ("grant_type", AUTHORIZATION_CODE_GRANT),
            ],
        )?;
        Ok(ApiRequest::post(url).accept_json())
    }

    /// Returns the slot to `Idle` if `attempt` still owns it.
    fn release(&self, attempt: u64) {
        let mut slot = self.slot.lock_or_recover();
        let owned = matches!(
            slot.state,
            ExchangeState::Exchanging { attempt: current, .. } if current == attempt
        );
        if owned {
            warn!("Token exchange attempt {} ended without a result", attempt);
            slot.state = ExchangeState::Idle;
        }
    }

    fn complete(
        &self,
        attempt: u64,
        result: Result<OAuthTokenResponse, TransportError>,
    ) -> Result<BearerToken, AppError> {
        let mut slot = self.slot.lock_or_recover();
        match &slot.state {
            ExchangeState::Exchanging { attempt: current, .. } if *current == attempt => {}
            _ => {
                debug!("Discarding result of superseded token exchange attempt {}", attempt);
                return Err(AppError::Cancelled);
            }
        }
        slot.state = ExchangeState::Idle;

        let response = result.map_err(|e| {
            error!("Token exchange failed: {}", e);
            AppError::from(e)
        })?;

        if response.access_token.trim().is_empty() {
            error!("Token endpoint returned an empty access_token");
            return Err(AppError::Decoding("empty access_token".to_string()));
        }

        let token = BearerToken::new(response.access_token);
        self.token_store.set_token(&token).map_err(|e| {
            error!("Failed to persist bearer token: {}", e);
            e
        })?;
        info!("Token exchange succeeded, stored {}", token);
        Ok(token)
    }
}

#[async_trait]
impl<T, S> TokenExchanger for OAuth2Service<T, S>
where
    T: PhotoHttpClient + 'static,
    S: TokenStore + ?Sized + 'static,
{
    async fn fetch_token(&self, code: &str) -> Result<BearerToken, AppError> {
        OAuth2Service::fetch_token(self, code).await
    }
}

impl<T, S> Resettable for OAuth2Service<T, S>
where
    T: PhotoHttpClient + 'static,
    S: TokenStore + ?Sized + 'static,
{
    fn reset(&self) {
        self.cancel();
    }
}
