//! Application layer - assembly and the public consent manager API
//!
//! The builder wires one consent context together. Every component receives
//! the same event bus, cookie manager and store at construction; nothing is
//! process-wide.
//!
//! # Architecture
//!
//! ```text
//! Host page / UI collaborators (notification, preferences panel)
//!         │
//!         ▼
//! ┌──────────────────────────────────────────┐
//! │            ConsentManager                │
//! │  ┌──────────────┐   ┌────────────────┐   │
//! │  │CookieManager │──▶│   Event Bus    │   │
//! │  └──────┬───────┘   └───────┬────────┘   │
//! │         │                   ▼            │
//! │         │       ┌──────────────────────┐ │
//! │         │       │ ConsentStore         │ │
//! │         │       │ ServiceLoader        │ │
//! │         │       │ ConsentRevoke        │ │
//! │         │       └──────────────────────┘ │
//! └─────────┼────────────────────────────────┘
//!           ▼
//!      CookieStore / ScriptHost
//! ```
//!
//! # Usage
//!
//! ```ignore
//! let manager = ConsentManagerBuilder::new(options)
//!     .with_cookie_store(Arc::new(MemoryCookieJar::new()))
//!     .build()?;
//! manager.init();
//!
//! manager.on("analytics-enabled", |_| Ok(()));
//! manager.accept_all();
//! // -> Emits functional-enabled, analytics-enabled, marketing-enabled
//! ```

mod consent;
mod runtime;

pub use consent::ConsentManager;
pub use runtime::ConsentRuntime;

use anyhow::anyhow;
use std::sync::Arc;

use crate::cookies::{CookieManager, CookieStore};
use crate::domain::{ConfigurationResolver, ConsentOptions};
use crate::event_bus::EventBus;
use crate::service::{
    AdapterRegistry, AnalyticsAdapter, ConsentRevoke, MemoryScriptHost, ScriptHost, ServiceLoader,
};
use crate::store::ConsentStore;

/// Builder for a consent manager and its shared collaborators
pub struct ConsentManagerBuilder {
    options: ConsentOptions,
    cookie_store: Option<Arc<dyn CookieStore>>,
    script_host: Option<Arc<dyn ScriptHost>>,
    adapters: AdapterRegistry,
}

impl ConsentManagerBuilder {
    pub fn new(options: ConsentOptions) -> Self {
        Self {
            options,
            cookie_store: None,
            script_host: None,
            adapters: AdapterRegistry::default(),
        }
    }

    pub fn with_cookie_store(mut self, store: Arc<dyn CookieStore>) -> Self {
        self.cookie_store = Some(store);
        self
    }

    pub fn with_script_host(mut self, host: Arc<dyn ScriptHost>) -> Self {
        self.script_host = Some(host);
        self
    }

    /// Add or replace a default injector
    pub fn with_adapter(mut self, adapter: Arc<dyn AnalyticsAdapter>) -> Self {
        self.adapters.register(adapter);
        self
    }

    /// Replace the whole set of default injectors
    pub fn with_adapters(mut self, adapters: AdapterRegistry) -> Self {
        self.adapters = adapters;
        self
    }

    /// Build the manager. Listeners are not registered until `init`.
    pub fn build(self) -> anyhow::Result<ConsentManager> {
        let cookie_store = self
            .cookie_store
            .ok_or_else(|| anyhow!("Cookie store required"))?;
        let host = self
            .script_host
            .unwrap_or_else(|| Arc::new(MemoryScriptHost::new()));
        let config = ConfigurationResolver::resolve(self.options)?;

        let bus = EventBus::new();
        let cookies = CookieManager::new(&config, cookie_store, bus.clone());
        let store = Arc::new(ConsentStore::new(config, cookies.clone()));
        let adapters = Arc::new(self.adapters);

        let loader = Arc::new(ServiceLoader::new(
            store.clone(),
            cookies.clone(),
            bus.clone(),
            adapters.clone(),
            host.clone(),
        ));
        let revoke = Arc::new(ConsentRevoke::new(
            store.clone(),
            cookies.clone(),
            adapters,
            host.clone(),
        ));

        Ok(ConsentManager::new(bus, cookies, store, loader, revoke, host))
    }
}
