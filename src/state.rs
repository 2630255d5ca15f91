use std::sync::Arc;

use crate::auth::PasswordService;
use crate::config::AppConfig;
use crate::database::Store;

/// Shared by every handler. Cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub config: Arc<AppConfig>,
    pub passwords: PasswordService,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, config: Arc<AppConfig>) -> Self {
        Self { store, config, passwords: PasswordService::new() }
    }

    pub fn with_passwords(mut self, passwords: PasswordService) -> Self {
        self.passwords = passwords;
        self
    }

    pub fn store(&self) -> &dyn Store {
        self.store.as_ref()
    }
}
