/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 19/10/26
******************************************************************************/

pub(crate) const DEFAULT_SCHEME: &str = "https";
pub(crate) const DEFAULT_AUTH_HOST: &str = "unsplash.com";
pub(crate) const DEFAULT_API_HOST: &str = "api.unsplash.com";
pub(crate) const DEFAULT_AUTHORIZE_PATH: &str = "/oauth/authorize";
pub(crate) const DEFAULT_REDIRECT_PATH: &str = "/oauth/authorize/native";
pub(crate) const DEFAULT_OAUTH_PATH: &str = "/oauth/token";
pub(crate) const DEFAULT_PHOTOS_PATH: &str = "/photos";
pub(crate) const DEFAULT_REDIRECT_URI: &str = "urn:ietf:wg:oauth:2.0:oob";
pub(crate) const DEFAULT_ACCESS_SCOPE: &str = "public+read_user+write_likes";

pub(crate) const DEFAULT_PER_PAGE: u32 = 10;
pub(crate) const DEFAULT_REST_TIMEOUT: u64 = 30;
pub(crate) const DEFAULT_TOKEN_PATH: &str = "imagefeed_token.json";

pub(crate) const PROFILE_PATH: &str = "/me";
pub(crate) const USERS_PATH: &str = "/users";

pub(crate) const AUTHORIZATION_HEADER_KEY: &str = "Authorization";
pub(crate) const ACCEPT_HEADER_KEY: &str = "Accept";
pub(crate) const JSON_CONTENT_TYPE: &str = "application/json";

pub(crate) const AUTHORIZATION_CODE_GRANT: &str = "authorization_code";
pub(crate) const TOKEN_STORAGE_KEY: &str = "BearerToken";

pub(crate) const CHANGE_CHANNEL_CAPACITY: usize = 64;
