//! Helpers shared by the in-crate unit tests.

use crate::config::{Config, Credentials, RestApiConfig};
use crate::error::TransportError;
use crate::storage::config::StorageConfig;
use crate::transport::http_client::PhotoHttpClient;
use crate::transport::model::ApiRequest;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::Mutex;
use tokio::sync::oneshot;

/// A config built without touching the environment, pointed at `base_url`.
pub(crate) fn test_config(base_url: &str) -> Config {
    Config {
        credentials: Credentials {
            access_key: "test_access_key".to_string(),
            secret_key: "test_secret_key".to_string(),
            redirect_uri: "urn:ietf:wg:oauth:2.0:oob".to_string(),
            access_scope: "public+read_user+write_likes".to_string(),
        },
        rest_api: RestApiConfig {
            scheme: "https".to_string(),
            auth_host: "unsplash.com".to_string(),
            api_host: "api.unsplash.com".to_string(),
            authorize_path: "/oauth/authorize".to_string(),
            redirect_path: "/oauth/authorize/native".to_string(),
            oauth_path: "/oauth/token".to_string(),
            photos_path: "/photos".to_string(),
            per_page: 10,
            timeout: 5,
        },
        storage: StorageConfig {
            token_path: "unused.json".to_string(),
        },
    }
    .with_base_url(base_url)
}

pub(crate) fn photo_json(id: &str, liked: bool) -> Value {
    json!({
        "id": id,
        "created_at": "2016-05-03T11:00:28-04:00",
        "width": 5245,
        "height": 3497,
        "likes": 12,
        "liked_by_user": liked,
        "description": format!("photo {id}"),
        "urls": {
            "raw": format!("https://images.example.com/{id}/raw"),
            "full": format!("https://images.example.com/{id}/full"),
            "regular": format!("https://images.example.com/{id}/regular"),
            "small": format!("https://images.example.com/{id}/small"),
            "thumb": format!("https://images.example.com/{id}/thumb")
        }
    })
}

pub(crate) fn page_body(ids: &[&str]) -> Vec<u8> {
    let photos: Vec<Value> = ids.iter().map(|id| photo_json(id, false)).collect();
    Value::Array(photos).to_string().into_bytes()
}

pub(crate) fn like_body(id: &str, liked: bool) -> Vec<u8> {
    json!({ "photo": photo_json(id, liked) }).to_string().into_bytes()
}

type Reply = Result<Vec<u8>, TransportError>;

enum Scripted {
    Ready(Reply),
    Gated(oneshot::Receiver<Reply>),
    Panic,
}

/// Replays queued replies in order and records every request it saw.
///
/// A gated reply keeps its request in flight until the test sends the result.
#[derive(Default)]
pub(crate) struct ScriptedClient {
    replies: Mutex<VecDeque<Scripted>>,
    requests: Mutex<Vec<ApiRequest>>,
}

impl ScriptedClient {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn reply(&self, reply: Reply) {
        self.replies.lock().unwrap().push_back(Scripted::Ready(reply));
    }

    pub(crate) fn reply_ok(&self, body: Vec<u8>) {
        self.reply(Ok(body));
    }

    pub(crate) fn gated_reply(&self) -> oneshot::Sender<Reply> {
        let (tx, rx) = oneshot::channel();
        self.replies.lock().unwrap().push_back(Scripted::Gated(rx));
        tx
    }

    /// The next request panics inside the client.
    pub(crate) fn panic_once(&self) {
        self.replies.lock().unwrap().push_back(Scripted::Panic);
    }

    pub(crate) fn requests(&self) -> Vec<ApiRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub(crate) fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    /// Yields until at least `count` requests reached the client.
    pub(crate) async fn wait_for_requests(&self, count: usize) {
        for _ in 0..1000 {
            if self.request_count() >= count {
                return;
            }
            tokio::task::yield_now().await;
        }
        panic!(
            "expected {count} requests, saw {}",
            self.request_count()
        );
    }
}

#[async_trait]
impl PhotoHttpClient for ScriptedClient {
    async fn perform(&self, request: ApiRequest) -> Result<Vec<u8>, TransportError> {
        self.requests.lock().unwrap().push(request);
        let next = self.replies.lock().unwrap().pop_front();
        match next {
            Some(Scripted::Ready(reply)) => reply,
            Some(Scripted::Gated(rx)) => rx
                .await
                .unwrap_or_else(|_| Err(TransportError::Transport("gate dropped".to_string()))),
            Some(Scripted::Panic) => panic!("scripted client failure"),
            None => Err(TransportError::Transport("no scripted reply".to_string())),
        }
    }
}
