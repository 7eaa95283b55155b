use imagefeed_client::config::{Config, Credentials, RestApiConfig};
use imagefeed_client::storage::config::StorageConfig;
use serde_json::{json, Value};

mod auth_flow;

mod feed_flow;

pub(crate) fn config_for(server_url: &str, token_path: &str) -> Config {
    Config {
        credentials: Credentials {
            access_key: "integration_key".to_string(),
            secret_key: "integration_secret".to_string(),
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
            per_page: 2,
            timeout: 5,
        },
        storage: StorageConfig {
            token_path: token_path.to_string(),
        },
    }
    .with_base_url(server_url)
}

pub(crate) fn photo(id: &str, liked: bool) -> Value {
    json!({
        "id": id,
        "created_at": "2016-05-03T11:00:28-04:00",
        "width": 4000,
        "height": 3000,
        "likes": 3,
        "liked_by_user": liked,
        "description": null,
        "urls": {
            "raw": format!("https://images.example.com/{id}/raw"),
            "full": format!("https://images.example.com/{id}/full"),
            "regular": format!("https://images.example.com/{id}/regular"),
            "small": format!("https://images.example.com/{id}/small"),
            "thumb": format!("https://images.example.com/{id}/thumb")
        }
    })
}

pub(crate) fn page(ids: &[&str]) -> String {
    Value::Array(ids.iter().map(|id| photo(id, false)).collect()).to_string()
}
