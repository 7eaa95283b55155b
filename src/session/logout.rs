use crate::error::AppError;
use crate::storage::token_store::TokenStore;
use std::sync::Arc;
use tracing::{error, info};

/// Something holding per-user state that must be dropped on logout.
pub trait Resettable: Send + Sync {
    fn reset(&self);
}

/// Signs the user out: forgets the stored token and resets every registered service.
pub struct LogoutService {
    token_store: Arc<dyn TokenStore>,
    services: Vec<Arc<dyn Resettable>>,
}

impl LogoutService {
    pub fn new(token_store: Arc<dyn TokenStore>) -> Self {
        Self {
            token_store,
            services: Vec::new(),
        }
    }

    pub fn with_service(mut self, service: Arc<dyn Resettable>) -> Self {
        self.services.push(service);
        self
    }

    pub fn register(&mut self, service: Arc<dyn Resettable>) {
        self.services.push(service);
    }

    /// Services are reset even when clearing the token fails; that failure is returned.
    pub fn logout(&self) -> Result<(), AppError> {
        let cleared = self.token_store.clear();
        if let Err(e) = &cleared {
            error!("Failed to clear bearer token: {}", e);
        }

        for service in &self.services {
            service.reset();
        }

        info!("Logged out, {} services reset", self.services.len());
        cleared
    }
}
