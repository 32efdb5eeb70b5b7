//! Consent Manager - the top-level object a host page creates
//!
//! Owns one consent context and exposes the public API: event subscription,
//! runtime service registration, cookie helpers and the visitor actions the
//! notification banner and preferences panel trigger.

use parking_lot::Mutex;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::ConsentManagerBuilder;
use crate::cookies::{CookieAttributes, CookieManager, CookieStore};
use crate::domain::{
    disabled_event, enabled_event, Configuration, ConsentEvent, ConsentOptions, ConsentStatus,
    Event, Injector, Purpose, ServiceDescriptor, ServiceError, FUNCTIONAL_ENABLED,
};
use crate::event_bus::{EventBus, Subscription};
use crate::service::{ConsentRevoke, InjectOutcome, ScriptHost, ServiceLoader};
use crate::store::{ConsentStore, Mutation};

pub struct ConsentManager {
    bus: EventBus,
    cookies: CookieManager,
    store: Arc<ConsentStore>,
    loader: Arc<ServiceLoader>,
    revoke: Arc<ConsentRevoke>,
    host: Arc<dyn ScriptHost>,
    default_listeners: Mutex<Vec<Subscription>>,
}

impl ConsentManager {
    pub(super) fn new(
        bus: EventBus,
        cookies: CookieManager,
        store: Arc<ConsentStore>,
        loader: Arc<ServiceLoader>,
        revoke: Arc<ConsentRevoke>,
        host: Arc<dyn ScriptHost>,
    ) -> Self {
        Self {
            bus,
            cookies,
            store,
            loader,
            revoke,
            host,
            default_listeners: Mutex::new(Vec::new()),
        }
    }

    /// Build a manager over `cookie_store` and initialize it
    pub fn create(options: ConsentOptions, cookie_store: Arc<dyn CookieStore>) -> anyhow::Result<Self> {
        let manager = ConsentManagerBuilder::new(options)
            .with_cookie_store(cookie_store)
            .build()?;
        manager.init();
        Ok(manager)
    }

    /// Register the default listeners, then replay the persisted consent.
    ///
    /// Emits: `functional-enabled` (when set), then `{purpose}-enabled` or
    /// `{purpose}-disabled` for every known purpose
    pub fn init(&self) {
        {
            let mut listeners = self.default_listeners.lock();
            if !listeners.is_empty() {
                warn!("[ConsentManager] Already initialized");
                return;
            }
            *listeners = self.register_default_listeners();
        }
        self.check_initial_state();
    }

    fn register_default_listeners(&self) -> Vec<Subscription> {
        let mut subscriptions = Vec::new();

        for purpose in self.store.purposes() {
            let store = Arc::downgrade(&self.store);
            let loader = Arc::downgrade(&self.loader);
            let enabled = purpose.clone();
            subscriptions.push(self.bus.subscribe(enabled_event(&purpose), move |_| {
                let (Some(store), Some(loader)) = (store.upgrade(), loader.upgrade()) else {
                    return Ok(());
                };
                store.commit(Mutation::SetConsent {
                    purpose: enabled.clone(),
                    status: true,
                });
                loader.inject_services();
                Ok(())
            }));

            let store = Arc::downgrade(&self.store);
            let revoke = Arc::downgrade(&self.revoke);
            let disabled = purpose.clone();
            subscriptions.push(self.bus.subscribe(disabled_event(&purpose), move |_| {
                let (Some(store), Some(revoke)) = (store.upgrade(), revoke.upgrade()) else {
                    return Ok(());
                };
                store.commit(Mutation::SetConsent {
                    purpose: disabled.clone(),
                    status: false,
                });
                revoke.destroy_services_for(&disabled);
                Ok(())
            }));
        }

        // Services gated on functional consent become eligible once it is given
        let loader = Arc::downgrade(&self.loader);
        subscriptions.push(self.bus.subscribe(FUNCTIONAL_ENABLED, move |_| {
            if let Some(loader) = loader.upgrade() {
                loader.inject_services();
            }
            Ok(())
        }));

        debug!(count = subscriptions.len(), "[ConsentManager] Registered default listeners");
        subscriptions
    }

    fn check_initial_state(&self) {
        if self.cookies.has_functional_cookie() {
            self.bus.emit_event(&ConsentEvent::FunctionalEnabled);
        }

        let consents = self.store.init();
        info!(
            enabled = consents.values().filter(|e| **e).count(),
            purposes = consents.len(),
            "[ConsentManager] Replaying persisted consent"
        );
        for (purpose, enabled) in consents {
            let event = if enabled {
                ConsentEvent::Enabled { purpose }
            } else {
                ConsentEvent::Disabled { purpose }
            };
            self.bus.emit_event(&event);
        }
    }

    // =========================================================================
    // Public API
    // =========================================================================

    /// Subscribe to a lifecycle event
    pub fn on<F>(&self, event: impl Into<String>, callback: F) -> Subscription
    where
        F: Fn(&Event) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.bus.subscribe(event, callback)
    }

    /// Resolved configuration, including services registered at runtime
    pub fn options(&self) -> Configuration {
        self.store.config()
    }

    /// Register a service at runtime and inject it if consent allows.
    ///
    /// A rejected descriptor is logged and leaves the configuration untouched.
    pub fn register_service(
        &self,
        name: &str,
        purposes: Vec<Purpose>,
        inject: Injector,
        options: Map<String, Value>,
    ) -> Result<InjectOutcome, ServiceError> {
        let result = self.loader.register_service(name, purposes, inject, options);
        if let Err(e) = &result {
            warn!(service = name, error = %e, "[ConsentManager] Service rejected");
        }
        result
    }

    /// Typed form of [`ConsentManager::register_service`]
    pub fn register_descriptor(&self, service: ServiceDescriptor) -> Result<InjectOutcome, ServiceError> {
        let name = service.name.clone();
        let result = self.loader.register_descriptor(service);
        if let Err(e) = &result {
            warn!(service = %name, error = %e, "[ConsentManager] Service rejected");
        }
        result
    }

    /// Remove the named cookies; falls back to the configured attributes
    pub fn remove_cookies<I, S>(&self, names: I, attributes: Option<&CookieAttributes>)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for name in names {
            self.cookies.remove_cookie(name.as_ref(), attributes);
        }
    }

    pub fn cookies(&self) -> &CookieManager {
        &self.cookies
    }

    pub fn store(&self) -> &ConsentStore {
        &self.store
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    pub fn script_host(&self) -> &Arc<dyn ScriptHost> {
        &self.host
    }

    // =========================================================================
    // Visitor actions
    // =========================================================================

    /// "Accept all" on the notification banner
    pub fn accept_all(&self) {
        info!("[ConsentManager] Visitor accepted all purposes");
        self.cookies.enable_all_cookies();
    }

    /// "Decline" on the notification banner; functional consent is still recorded
    pub fn decline_all(&self) {
        info!("[ConsentManager] Visitor declined all purposes");
        self.cookies.disable_all_cookies();
        self.cookies.enable_functional_cookie();
    }

    /// Save the preferences panel. Purposes missing from `choices` are disabled.
    pub fn save_preferences(&self, choices: &ConsentStatus) {
        self.cookies.enable_functional_cookie();
        for purpose in self.store.purposes() {
            if choices.get(&purpose).copied().unwrap_or(false) {
                self.cookies.enable_cookies(&purpose);
            } else {
                self.cookies.disable_cookies(&purpose);
            }
        }
    }

    /// A single preferences toggle applied immediately, without a save step.
    ///
    /// Purposes without a recorded decision are denied first.
    pub fn toggle_preference(&self, purpose: &Purpose, enabled: bool) {
        self.preferences_changed();
        self.cookies.enable_functional_cookie();
        self.cookies.set_cookies_default();
        if enabled {
            self.cookies.enable_cookies(purpose);
        } else {
            self.cookies.disable_cookies(purpose);
        }
    }

    /// Emits: `preferences-change`
    pub fn preferences_changed(&self) {
        self.bus.emit_event(&ConsentEvent::PreferencesChange);
    }

    /// Whether the notification banner should be shown
    pub fn should_show_notification(&self) -> bool {
        !self.cookies.has_all_cookies_set()
    }
}
