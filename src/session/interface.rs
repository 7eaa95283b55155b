use crate::error::AppError;
use crate::utils::security::mask_token;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque OAuth access token sent as `Authorization: Bearer ...`.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BearerToken(String);

impl BearerToken {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for BearerToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BearerToken({})", mask_token(&self.0))
    }
}

impl fmt::Display for BearerToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", mask_token(&self.0))
    }
}

/// Exchanges an authorization code for a bearer token.
#[async_trait::async_trait]
pub trait TokenExchanger: Send + Sync {
    async fn fetch_token(&self, code: &str) -> Result<BearerToken, AppError>;
}
