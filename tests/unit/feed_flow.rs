use crate::{config_for, page, photo};
use imagefeed_client::application::services::images_list_service::{
    ImagesListService, LikeOutcome, PageOutcome, SkipReason,
};
use imagefeed_client::session::interface::BearerToken;
use imagefeed_client::session::logout::{LogoutService, Resettable};
use imagefeed_client::storage::token_store::{FileTokenStore, TokenStore};
use imagefeed_client::transport::http_client::ReqwestHttpClient;
use imagefeed_client::utils::logger::setup_logger;
use mockito::{Matcher, Server};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::Arc;
use tempfile::tempdir;

fn page_query(page: &str) -> Matcher {
    Matcher::AllOf(vec![
        Matcher::UrlEncoded("page".into(), page.into()),
        Matcher::UrlEncoded("per_page".into(), "2".into()),
    ])
}

#[tokio::test]
async fn test_feed_pages_like_and_logout() {
    setup_logger();
    let mut server = Server::new_async().await;
    let first = server
        .mock("GET", "/photos")
        .match_query(page_query("1"))
        .match_header("authorization", "Bearer feed-token")
        .match_header("accept", "application/json")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(page(&["a", "b"]))
        .expect(1)
        .create_async()
        .await;
    let second = server
        .mock("GET", "/photos")
        .match_query(page_query("2"))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(page(&["b", "c"]))
        .expect(1)
        .create_async()
        .await;
    let like = server
        .mock("POST", "/photos/c/like")
        .match_header("authorization", "Bearer feed-token")
        .with_status(201)
        .with_header("content-type", "application/json")
        .with_body(json!({ "photo": photo("c", true) }).to_string())
        .expect(1)
        .create_async()
        .await;

    let dir = tempdir().unwrap();
    let token_path = dir.path().join("token.json");
    let config = Arc::new(config_for(&server.url(), &token_path.to_string_lossy()));
    let store = Arc::new(FileTokenStore::from_config(&config.storage));
    store.set_token(&BearerToken::new("feed-token")).unwrap();

    let client = Arc::new(ReqwestHttpClient::new(&config.rest_api).unwrap());
    let feed = Arc::new(ImagesListService::new(
        Arc::clone(&config),
        client,
        Arc::clone(&store),
    ));
    let mut events = feed.subscribe();

    assert_eq!(
        feed.fetch_next_page().await.unwrap(),
        PageOutcome::Loaded { page: 1, appended: 2 }
    );
    assert_eq!(
        feed.fetch_next_page().await.unwrap(),
        PageOutcome::Loaded { page: 2, appended: 1 }
    );
    let ids: Vec<String> = feed.photos().into_iter().map(|p| p.id).collect();
    assert_eq!(ids, vec!["a", "b", "c"]);

    let outcome = feed.change_like("c", true).await.unwrap();
    assert!(matches!(outcome, LikeOutcome::Updated(ref p) if p.is_liked));
    assert!(feed.photo("c").unwrap().is_liked);

    let mut seen = 0;
    while events.try_recv().is_ok() {
        seen += 1;
    }
    assert_eq!(seen, 3);

    let resettable: Arc<dyn Resettable> = feed.clone();
    let logout = LogoutService::new(store.clone()).with_service(resettable);
    logout.logout().unwrap();

    assert_eq!(feed.photo_count(), 0);
    assert_eq!(feed.last_loaded_page(), None);
    assert!(!token_path.exists());
    assert!(events.try_recv().is_ok());

    // signed out: nothing goes over the wire
    assert_eq!(
        feed.fetch_next_page().await.unwrap(),
        PageOutcome::Skipped(SkipReason::NoToken)
    );

    first.assert_async().await;
    second.assert_async().await;
    like.assert_async().await;
}

#[tokio::test]
async fn test_server_error_keeps_cursor() {
    setup_logger();
    let mut server = Server::new_async().await;
    let failing = server
        .mock("GET", "/photos")
        .match_query(page_query("1"))
        .with_status(503)
        .with_body("unavailable")
        .expect(2)
        .create_async()
        .await;

    let dir = tempdir().unwrap();
    let token_path = dir.path().join("token.json");
    let config = Arc::new(config_for(&server.url(), &token_path.to_string_lossy()));
    let store = Arc::new(FileTokenStore::from_config(&config.storage));
    store.set_token(&BearerToken::new("feed-token")).unwrap();
    let client = Arc::new(ReqwestHttpClient::new(&config.rest_api).unwrap());
    let feed = ImagesListService::new(Arc::clone(&config), client, store);

    for _ in 0..2 {
        assert!(feed.fetch_next_page().await.is_err());
        assert_eq!(feed.last_loaded_page(), None);
        assert!(!feed.is_loading_next_page());
    }
    failing.assert_async().await;
}
