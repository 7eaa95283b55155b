use crate::config_for;
use imagefeed_client::error::AppError;
use imagefeed_client::session::auth::OAuth2Service;
use imagefeed_client::session::auth_helper::AuthHelper;
use imagefeed_client::session::interface::TokenExchanger;
use imagefeed_client::storage::token_store::{FileTokenStore, TokenStore};
use imagefeed_client::transport::http_client::ReqwestHttpClient;
use imagefeed_client::utils::logger::setup_logger;
use mockito::{Matcher, Server};
use pretty_assertions::assert_eq;
use std::sync::Arc;
use tempfile::tempdir;

#[tokio::test]
async fn test_code_from_redirect_is_exchanged_and_persisted() {
    setup_logger();
    let mut server = Server::new_async().await;
    let token_mock = server
        .mock("POST", "/oauth/token")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("client_id".into(), "integration_key".into()),
            Matcher::UrlEncoded("client_secret".into(), "integration_secret".into()),
            Matcher::UrlEncoded("redirect_uri".into(), "urn:ietf:wg:oauth:2.0:oob".into()),
            Matcher::UrlEncoded("code".into(), "redirect-code".into()),
            Matcher::UrlEncoded("grant_type".into(), "authorization_code".into()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"access_token":"persisted-token","token_type":"bearer","scope":"public","created_at":1436544465}"#)
        .expect(1)
        .create_async()
        .await;

    let dir = tempdir().unwrap();
    let token_path = dir.path().join("token.json");
    let config = Arc::new(config_for(&server.url(), &token_path.to_string_lossy()));

    let helper = AuthHelper::new(Arc::clone(&config));
    let redirect = format!(
        "{}/oauth/authorize/native?code=redirect-code",
        server.url()
    );
    let code = helper.code_from(&redirect).unwrap();

    let client = Arc::new(ReqwestHttpClient::new(&config.rest_api).unwrap());
    let store = Arc::new(FileTokenStore::from_config(&config.storage));
    let exchanger: Arc<dyn TokenExchanger> =
        Arc::new(OAuth2Service::new(Arc::clone(&config), client, store));

    let token = exchanger.fetch_token(&code).await.unwrap();
    assert_eq!(token.as_str(), "persisted-token");

    // a fresh store over the same file sees the token
    let reopened = FileTokenStore::new(&token_path);
    assert_eq!(reopened.token(), Some(token));
    token_mock.assert_async().await;
}

#[tokio::test]
async fn test_rejected_code_reports_status() {
    setup_logger();
    let mut server = Server::new_async().await;
    let token_mock = server
        .mock("POST", "/oauth/token")
        .match_query(Matcher::Any)
        .with_status(401)
        .with_body(r#"{"error":"invalid_grant"}"#)
        .create_async()
        .await;

    let dir = tempdir().unwrap();
    let token_path = dir.path().join("token.json");
    let config = Arc::new(config_for(&server.url(), &token_path.to_string_lossy()));
    let client = Arc::new(ReqwestHttpClient::new(&config.rest_api).unwrap());
    let store = Arc::new(FileTokenStore::from_config(&config.storage));
    let service = OAuth2Service::new(Arc::clone(&config), client, Arc::clone(&store));

    assert_eq!(service.fetch_token("bad-code").await, Err(AppError::Http(401)));
    assert_eq!(store.token(), None);
    token_mock.assert_async().await;
}
