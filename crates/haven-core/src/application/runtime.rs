//! Instance slot for the page's consent manager
//!
//! A page is expected to run one consent manager. Hosts that need a
//! well-known place to reach it keep a [`ConsentRuntime`]; creating a second
//! manager replaces the first with a warning.

use std::sync::Arc;
use tracing::{error, warn};

use super::ConsentManager;
use crate::cookies::CookieStore;
use crate::domain::ConsentOptions;

#[derive(Default)]
pub struct ConsentRuntime {
    current: Option<Arc<ConsentManager>>,
}

impl ConsentRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create and initialize a manager, replacing any existing one
    pub fn create(
        &mut self,
        options: ConsentOptions,
        cookie_store: Arc<dyn CookieStore>,
    ) -> anyhow::Result<Arc<ConsentManager>> {
        let manager = Arc::new(ConsentManager::create(options, cookie_store)?);
        self.install(manager.clone());
        Ok(manager)
    }

    /// Store an already built manager, replacing any existing one
    pub fn install(&mut self, manager: Arc<ConsentManager>) {
        if let Some(previous) = self.current.replace(manager) {
            warn!(
                prefix = previous.cookies().prefix(),
                "[ConsentManager] Replacing an existing consent manager instance"
            );
        }
    }

    /// The current manager, if one was created
    pub fn instance(&self) -> Option<Arc<ConsentManager>> {
        if self.current.is_none() {
            error!("[ConsentManager] No consent manager instance has been created");
        }
        self.current.clone()
    }

    pub fn has_instance(&self) -> bool {
        self.current.is_some()
    }
}
