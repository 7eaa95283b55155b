use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::{
    application::events::{ChangeEvent, ChangeNotifier},
    application::models::photo::{LikeResponse, Photo, PhotoCollection, PhotoResult},
    config::Config,
    error::{AppError, TransportError},
    session::interface::BearerToken,
    session::logout::Resettable,
    storage::token_store::TokenStore,
    transport::http_client::PhotoHttpClient,
    transport::model::{build_url, ApiRequest},
    utils::sync::{InFlightGuard, MutexExt, ReleaseOnDrop},
};

/// Result of [`ImagesListService::fetch_next_page`] when nothing failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageOutcome {
    /// `page` was fetched; `appended` counts the ids that were not in the feed yet.
    Loaded { page: u32, appended: usize },
    /// Nothing was requested.
    Skipped(SkipReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    InFlight,
    NoToken,
    InvalidRequest,
}

/// Result of [`ImagesListService::change_like`] when nothing failed.
#[derive(Debug, Clone, PartialEq)]
pub enum LikeOutcome {
    /// The server-confirmed record. It has replaced the feed entry if that was still present.
    Updated(Photo),
    /// Another like change was in flight; nothing was requested.
    Skipped,
}

#[derive(Debug, Default)]
struct FeedState {
    photos: PhotoCollection,
    last_loaded_page: Option<u32>,
    next_page: InFlightGuard,
    like: InFlightGuard,
}

struct FeedInner<T, S: ?Sized> {
    config: Arc<Config>,
    client: Arc<T>,
    token_store: Arc<S>,
    state: Mutex<FeedState>,
    notifier: ChangeNotifier,
}

/// The photo feed: pages fetched in order, likes confirmed by the server.
///
/// Network I/O runs on spawned tasks. Their results are applied to the feed
/// under the state lock, and only when the request they serve is still the
/// current one; a request cancelled by [`reset`](Self::reset) is discarded and
/// its caller sees [`AppError::Cancelled`]. Every applied mutation emits one
/// [`ChangeEvent`].
pub struct ImagesListService<T, S: ?Sized> {
    inner: Arc<FeedInner<T, S>>,
}

impl<T, S: ?Sized> Clone for ImagesListService<T, S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T, S> ImagesListService<T, S>
where
    T: PhotoHttpClient + 'static,
    S: TokenStore + ?Sized + 'static,
{
    pub fn new(config: Arc<Config>, client: Arc<T>, token_store: Arc<S>) -> Self {
        Self {
            inner: Arc::new(FeedInner {
                config,
                client,
                token_store,
                state: Mutex::new(FeedState::default()),
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

    /// A copy of the whole feed, in server order.
    pub fn photos(&self) -> Vec<Photo> {
        self.inner.state.lock_or_recover().photos.as_slice().to_vec()
    }

    pub fn photo(&self, id: &str) -> Option<Photo> {
        self.inner.state.lock_or_recover().photos.get(id).cloned()
    }

    pub fn photo_count(&self) -> usize {
        self.inner.state.lock_or_recover().photos.len()
    }

    pub fn last_loaded_page(&self) -> Option<u32> {
        self.inner.state.lock_or_recover().last_loaded_page
    }

    pub fn is_loading_next_page(&self) -> bool {
        self.inner.state.lock_or_recover().next_page.is_busy()
    }

    pub fn is_changing_like(&self) -> bool {
        self.inner.state.lock_or_recover().like.is_busy()
    }

    /// Loads the page after the last loaded one and appends its unseen photos.
    ///
    /// A call while a page is loading, without a token, or with a request that
    /// cannot be built is a silent skip. Failures leave the cursor where it was.
    #[instrument(skip(self), fields(service = %self.id()))]
    pub async fn fetch_next_page(&self) -> Result<PageOutcome, AppError> {
        let token = self.inner.token_store.token();

        let task = {
            let mut state = self.inner.state.lock_or_recover();
            if state.next_page.is_busy() {
                debug!("Next page already loading, ignoring request");
                return Ok(PageOutcome::Skipped(SkipReason::InFlight));
            }

            let page = state.last_loaded_page.map_or(1, |last| last + 1);

            let Some(token) = token else {
                debug!("No bearer token, not loading page {}", page);
                return Ok(PageOutcome::Skipped(SkipReason::NoToken));
            };

            let request = match self.inner.photos_request(&token, page) {
                Ok(request) => request,
                Err(e) => {
                    warn!("Cannot build request for page {}: {}", page, e);
                    return Ok(PageOutcome::Skipped(SkipReason::InvalidRequest));
                }
            };

            let ticket = state.next_page.begin();
            debug!("Loading page {}", page);
            let inner = Arc::clone(&self.inner);
            let task = tokio::spawn(async move {
                let _release = {
                    let inner = Arc::clone(&inner);
                    ReleaseOnDrop::new(move || {
                        if inner.state.lock_or_recover().next_page.finish(ticket) {
                            warn!("Request for page {} ended without a result", page);
                        }
                    })
                };
                let result = inner
                    .client
                    .perform_decoding::<Vec<PhotoResult>>(request)
                    .await;
                inner.apply_page(ticket, page, result)
            });
            state.next_page.attach(ticket, task.abort_handle());
            task
        };

        task.await?
    }

    /// Likes (`is_like`) or unlikes a photo and stores the record the server sends back.
    ///
    /// Only one change runs at a time across all photos; a call while one is
    /// running is skipped. Nothing is applied before the server confirms.
    #[instrument(skip(self), fields(service = %self.id()))]
    pub async fn change_like(&self, photo_id: &str, is_like: bool) -> Result<LikeOutcome, AppError> {
        let token = self.inner.token_store.token();

        let task = {
            let mut state = self.inner.state.lock_or_recover();
            if state.like.is_busy() {
                debug!("Like change already running, ignoring request");
                return Ok(LikeOutcome::Skipped);
            }

            let Some(token) = token else {
                warn!("No bearer token, cannot change like");
                return Err(AppError::AuthRequired);
            };

            let request = match self.inner.like_request(&token, photo_id, is_like) {
                Ok(request) => request,
                Err(e) => {
                    error!("Cannot build like request: {}", e);
                    return Err(e.into());
                }
            };

            let ticket = state.like.begin();
            let inner = Arc::clone(&self.inner);
            let photo_id = photo_id.to_string();
            let task = tokio::spawn(async move {
                let _release = {
                    let inner = Arc::clone(&inner);
                    let photo_id = photo_id.clone();
                    ReleaseOnDrop::new(move || {
                        if inner.state.lock_or_recover().like.finish(ticket) {
                            warn!("Like change for {} ended without a result", photo_id);
                        }
                    })
                };
                let result = inner.client.perform_decoding::<LikeResponse>(request).await;
                inner.apply_like(ticket, &photo_id, is_like, result)
            });
            state.like.attach(ticket, task.abort_handle());
            task
        };

        task.await?
    }

    /// Cancels both in-flight paths, forgets the cursor and empties the feed.
    /// Always emits one change event.
    pub fn reset(&self) {
        let mut state = self.inner.state.lock_or_recover();
        state.next_page.cancel();
        state.like.cancel();
        state.last_loaded_page = None;
        state.photos.clear();
        self.inner.notifier.notify();
        info!("Photo feed {} reset", self.id());
    }
}

impl<T, S> FeedInner<T, S>
where
    T: PhotoHttpClient,
    S: TokenStore + ?Sized,
{
    fn photos_request(&self, token: &BearerToken, page: u32) -> Result<ApiRequest, TransportError> {
        let page = page.to_string();
        let per_page = self.config.rest_api.per_page.to_string();
        let url = build_url(
            &self.config.rest_api.api_base_url(),
            &self.config.rest_api.photos_path,
            &[("page", page.as_str()), ("per_page", per_page.as_str())],
        )?;
        Ok(ApiRequest::get(url).bearer(token).accept_json())
    }

    fn like_request(
        &self,
        token: &BearerToken,
        photo_id: &str,
        is_like: bool,
    ) -> Result<ApiRequest, TransportError> {
        if photo_id.trim().is_empty() {
            return Err(TransportError::InvalidRequest("empty photo id".to_string()));
        }
        let mut url = build_url(
            &self.config.rest_api.api_base_url(),
            &self.config.rest_api.photos_path,
            &[],
        )?;
        url.path_segments_mut()
            .map_err(|_| TransportError::InvalidRequest("base url cannot take path segments".to_string()))?
            .pop_if_empty()
            .push(photo_id)
            .push("like");

        let request = if is_like {
            ApiRequest::post(url)
        } else {
            ApiRequest::delete(url)
        };
        Ok(request.bearer(token).accept_json())
    }

    fn apply_page(
        &self,
        ticket: u64,
        page: u32,
        result: Result<Vec<PhotoResult>, TransportError>,
    ) -> Result<PageOutcome, AppError> {
        let mut state = self.state.lock_or_recover();
        if !state.next_page.finish(ticket) {
            debug!("Discarding stale response for page {}", page);
            return Err(AppError::Cancelled);
        }

        let results = result.map_err(|e| {
            error!("Failed to load page {}: {}", page, e);
            AppError::from(e)
        })?;

        let received = results.len();
        let appended = state
            .photos
            .append_unique(results.into_iter().map(Photo::from));
        state.last_loaded_page = Some(page);
        self.notifier.notify();

        info!(
            "Loaded page {}: {} photos received, {} new, {} in feed",
            page,
            received,
            appended,
            state.photos.len()
        );
        Ok(PageOutcome::Loaded { page, appended })
    }

    fn apply_like(
        &self,
        ticket: u64,
        photo_id: &str,
        is_like: bool,
        result: Result<LikeResponse, TransportError>,
    ) -> Result<LikeOutcome, AppError> {
        let mut state = self.state.lock_or_recover();
        if !state.like.finish(ticket) {
            debug!("Discarding stale like response for {}", photo_id);
            return Err(AppError::Cancelled);
        }

        let response = result.map_err(|e| {
            error!("Failed to change like for {} (like={}): {}", photo_id, is_like, e);
            AppError::from(e)
        })?;

        let photo = Photo::from(response.photo);
        if photo.is_liked != is_like {
            warn!(
                "Server reports isLiked={} for {} after requesting {}",
                photo.is_liked, photo_id, is_like
            );
        }

        if state.photos.replace(photo_id, photo.clone()) {
            self.notifier.notify();
        } else {
            debug!("Photo {} is no longer in the feed", photo_id);
        }
        Ok(LikeOutcome::Updated(photo))
    }
}

impl<T, S> Resettable for ImagesListService<T, S>
where
    T: PhotoHttpClient + 'static,
    S: TokenStore + ?Sized + 'static,
{
    fn reset(&self) {
        ImagesListService::reset(self);
    }
}
