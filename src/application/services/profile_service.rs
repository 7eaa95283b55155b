use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::{
    application::events::{ChangeEvent, ChangeNotifier},
    application::models::profile::{Profile, ProfileResult, UserResult},
    config::Config,
    constants::{PROFILE_PATH, USERS_PATH},
    error::{AppError, TransportError},
    session::interface::BearerToken,
    session::logout::Resettable,
    storage::token_store::TokenStore,
    transport::http_client::PhotoHttpClient,
    transport::model::{build_url, ApiRequest},
    utils::sync::{InFlightGuard, MutexExt, ReleaseOnDrop},
};

#[derive(Debug, Default)]
struct ProfileState {
    profile: Option<Profile>,
    request: InFlightGuard,
}

struct ProfileInner<T> {
    config: Arc<Config>,
    client: Arc<T>,
    state: Mutex<ProfileState>,
}

/// Loads the signed-in user's profile. A new call supersedes the one in flight.
pub struct ProfileService<T> {
    inner: Arc<ProfileInner<T>>,
}

impl<T> Clone for ProfileService<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> ProfileService<T>
where
    T: PhotoHttpClient + 'static,
{
    pub fn new(config: Arc<Config>, client: Arc<T>) -> Self {
        Self {
            inner: Arc::new(ProfileInner {
                config,
                client,
                state: Mutex::new(ProfileState::default()),
            }),
        }
    }

    /// The last profile successfully loaded, if any.
    pub fn profile(&self) -> Option<Profile> {
        self.inner.state.lock_or_recover().profile.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.inner.state.lock_or_recover().request.is_busy()
    }

    #[instrument(skip(self, token))]
    pub async fn fetch_profile(&self, token: &BearerToken) -> Result<Profile, AppError> {
        let task = {
            let mut state = self.inner.state.lock_or_recover();
            if state.request.is_busy() {
                debug!("Superseding profile request in flight");
            }
            state.request.cancel();
            let ticket = state.request.begin();

            let request = match self.inner.profile_request(token) {
                Ok(request) => request,
                Err(e) => {
                    state.request.finish(ticket);
                    error!("Cannot build profile request: {}", e);
                    return Err(e.into());
                }
            };

            let inner = Arc::clone(&self.inner);
            let task = tokio::spawn(async move {
                let _release = {
                    let inner = Arc::clone(&inner);
                    ReleaseOnDrop::new(move || {
                        if inner.state.lock_or_recover().request.finish(ticket) {
                            warn!("Profile request ended without a result");
                        }
                    })
                };
                let result = inner.client.perform_decoding::<ProfileResult>(request).await;
                inner.apply(ticket, result)
            });
            state.request.attach(ticket, task.abort_handle());
            task
        };

        task.await?
    }

    pub fn reset(&self) {
        let mut state = self.inner.state.lock_or_recover();
        state.request.cancel();
        state.profile = None;
    }
}

impl<T: PhotoHttpClient> ProfileInner<T> {
    fn profile_request(&self, token: &BearerToken) -> Result<ApiRequest, TransportError> {
        let url = build_url(&self.config.rest_api.api_base_url(), PROFILE_PATH, &[])?;
        Ok(ApiRequest::get(url).bearer(token).accept_json())
    }

    fn apply(
        &self,
        ticket: u64,
        result: Result<ProfileResult, TransportError>,
    ) -> Result<Profile, AppError> {
        let mut state = self.state.lock_or_recover();
        if !state.request.finish(ticket) {
            debug!("Discarding superseded profile response");
            return Err(AppError::Cancelled);
        }
        let profile = Profile::from(result.map_err(|e| {
            error!("Failed to load profile: {}", e);
            AppError::from(e)
        })?);
        info!("Loaded profile {}", profile.login_name);
        state.profile = Some(profile.clone());
        Ok(profile)
    }
}

impl<T: PhotoHttpClient + 'static> Resettable for ProfileService<T> {
    fn reset(&self) {
        ProfileService::reset(self);
    }
}

#[derive(Debug, Default)]
struct AvatarState {
    avatar_url: Option<String>,
    request: InFlightGuard,
}

struct AvatarInner<T, S: ?Sized> {
    config: Arc<Config>,
    client: Arc<T>,
    token_store: Arc<S>,
    state: Mutex<AvatarState>,
    notifier: ChangeNotifier,
}

/// Resolves a user's small avatar URL and announces it with a [`ChangeEvent`].
pub struct ProfileImageService<T, S: ?Sized> {
    inner: Arc<AvatarInner<T, S>>,
}

impl<T, S: ?Sized> Clone for ProfileImageService<T, S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T, S> ProfileImageService<T, S>
where
    T: PhotoHttpClient + 'static,
    S: TokenStore + ?Sized + 'static,
{
    pub fn new(config: Arc<Config>, client: Arc<T>, token_store: Arc<S>) -> Self {
        Self {
            inner: Arc::new(AvatarInner {
                config,
                client,
                token_store,
                state: Mutex::new(AvatarState::default()),
                notifier: ChangeNotifier::new(),
            }),
        }
    }

    pub fn id(&self) -> Uuid {
        self.inner.notifier.source()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.inner.notifier.subscribe()
    }

    pub fn avatar_url(&self) -> Option<String> {
        self.inner.state.lock_or_recover().avatar_url.clone()
    }

    #[instrument(skip(self), fields(service = %self.id()))]
    pub async fn fetch_profile_image_url(&self, username: &str) -> Result<String, AppError> {
        let Some(token) = self.inner.token_store.token() else {
            warn!("No bearer token, cannot load avatar of {}", username);
            return Err(AppError::AuthRequired);
        };

        let task = {
            let mut state = self.inner.state.lock_or_recover();

            let request = match self.inner.user_request(&token, username) {
                Ok(request) => request,
                Err(e) => {
                    error!("Cannot build user request: {}", e);
                    return Err(e.into());
                }
            };

            state.request.cancel();
            let ticket = state.request.begin();

            let inner = Arc::clone(&self.inner);
            let task = tokio::spawn(async move {
                let _release = {
                    let inner = Arc::clone(&inner);
                    ReleaseOnDrop::new(move || {
                        if inner.state.lock_or_recover().request.finish(ticket) {
                            warn!("Avatar request ended without a result");
                        }
                    })
                };
                let result = inner.client.perform_decoding::<UserResult>(request).await;
                inner.apply(ticket, result)
            });
            state.request.attach(ticket, task.abort_handle());
            task
        };

        task.await?
    }

    pub fn reset(&self) {
        let mut state = self.inner.state.lock_or_recover();
        state.request.cancel();
        state.avatar_url = None;
    }
}

impl<T, S> AvatarInner<T, S>
where
    T: PhotoHttpClient,
    S: TokenStore + ?Sized,
{
    fn user_request(&self, token: &BearerToken, username: &str) -> Result<ApiRequest, TransportError> {
        if username.trim().is_empty() {
            return Err(TransportError::InvalidRequest("empty username".to_string()));
        }
        let mut url = build_url(&self.config.rest_api.api_base_url(), USERS_PATH, &[])?;
        url.path_segments_mut()
            .map_err(|_| TransportError::InvalidRequest("base url cannot take path segments".to_string()))?
            .pop_if_empty()
            .push(username);
        Ok(ApiRequest::get(url).bearer(token).accept_json())
    }

    fn apply(&self, ticket: u64, result: Result<UserResult, TransportError>) -> Result<String, AppError> {
        let mut state = self.state.lock_or_recover();
        if !state.request.finish(ticket) {
            debug!("Discarding superseded avatar response");
            return Err(AppError::Cancelled);
        }
        let user = result.map_err(|e| {
            error!("Failed to load avatar: {}", e);
            AppError::from(e)
        })?;
        let url = user.profile_image.small;
        state.avatar_url = Some(url.clone());
        self.notifier.notify();
        Ok(url)
    }
}

impl<T, S> Resettable for ProfileImageService<T, S>
where
    T: PhotoHttpClient + 'static,
    S: TokenStore + ?Sized + 'static,
{
    fn reset(&self) {
        ProfileImageService::reset(self);
    }
}

#[cfg(test)]
mod tests_profile_service {
    use super::*;
    use crate::test_support::{test_config, ScriptedClient};
    use crate::utils::logger::setup_logger;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn profile_body(username: &str) -> Vec<u8> {
        json!({
            "username": username,
            "first_name": "Jane",
            "last_name": "Doe",
            "bio": "Shooting film"
        })
        .to_string()
        .into_bytes()
    }

    fn service() -> (ProfileService<ScriptedClient>, Arc<ScriptedClient>) {
        setup_logger();
        let client = Arc::new(ScriptedClient::new());
        let service = ProfileService::new(
            Arc::new(test_config("https://api.example.com")),
            Arc::clone(&client),
        );
        (service, client)
    }

    #[tokio::test]
    async fn test_fetch_profile() {
        let (service, client) = service();
        client.reply_ok(profile_body("jdoe"));

        let profile = service.fetch_profile(&BearerToken::new("tok")).await.unwrap();

        assert_eq!(profile.name, "Jane Doe");
        assert_eq!(profile.login_name, "@jdoe");
        assert_eq!(service.profile(), Some(profile));

        let request = &client.requests()[0];
        assert_eq!(request.url.path(), "/me");
        assert_eq!(request.header("Authorization"), Some("Bearer tok"));
    }

    #[tokio::test]
    async fn test_latest_call_wins() {
        let (service, client) = service();
        let _first_gate = client.gated_reply();

        let background = service.clone();
        let first =
            tokio::spawn(async move { background.fetch_profile(&BearerToken::new("tok")).await });
        client.wait_for_requests(1).await;

        client.reply_ok(profile_body("second"));
        let second = service.fetch_profile(&BearerToken::new("tok")).await.unwrap();

        assert_eq!(second.username, "second");
        assert_eq!(first.await.unwrap(), Err(AppError::Cancelled));
        assert_eq!(service.profile().unwrap().username, "second");
        assert!(!service.is_loading());
    }

    #[tokio::test]
    async fn test_crashed_request_releases_the_guard() {
        let (service, client) = service();
        client.panic_once();
        client.reply_ok(profile_body("jdoe"));

        assert!(matches!(
            service.fetch_profile(&BearerToken::new("tok")).await,
            Err(AppError::Transport(_))
        ));
        assert!(!service.is_loading());

        let profile = service.fetch_profile(&BearerToken::new("tok")).await.unwrap();
        assert_eq!(profile.username, "jdoe");
    }

    #[tokio::test]
    async fn test_failure_keeps_previous_profile() {
        let (service, client) = service();
        client.reply_ok(profile_body("jdoe"));
        service.fetch_profile(&BearerToken::new("tok")).await.unwrap();

        client.reply(Err(TransportError::HttpStatus {
            status: 401,
            body: String::new(),
        }));
        assert_eq!(
            service.fetch_profile(&BearerToken::new("tok")).await,
            Err(AppError::Http(401))
        );
        assert_eq!(service.profile().unwrap().username, "jdoe");

        service.reset();
        assert_eq!(service.profile(), None);
    }
}
