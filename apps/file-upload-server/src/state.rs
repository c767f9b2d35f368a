//! Application state management

use std::sync::Arc;

use crate::config::Config;
use crate::upload::{StorageRoot, UploadCoordinator, UploadOptions};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    coordinator: UploadCoordinator,
}

impl AppState {
    /// Create a new application state over an already validated storage root
    pub fn new(config: &Config, root: StorageRoot) -> Self {
        let coordinator = UploadCoordinator::new(root, UploadOptions::from(&config.storage));

        Self {
            inner: Arc::new(AppStateInner { coordinator }),
        }
    }

    /// Get the upload coordinator
    pub fn coordinator(&self) -> &UploadCoordinator {
        &self.inner.coordinator
    }
}
