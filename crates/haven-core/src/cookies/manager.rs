//! Cookie Manager
//!
//! Reads and writes consent as `{prefix}-{purpose}` cookies holding the
//! literal strings `"true"` / `"false"`, and announces every transition on
//! the event bus. Cookies are written before the event is emitted, so
//! listeners always observe persisted state.

use regex::Regex;
use std::sync::Arc;
use tracing::{debug, info};

use super::{CookieAttributes, CookieStore};
use crate::domain::{ConsentEvent, ConsentStatus, ConsentType, Configuration, Purpose};
use crate::event_bus::EventBus;

const ENABLED: &str = "true";
const DISABLED: &str = "false";

/// Consent persistence over a [`CookieStore`]
#[derive(Clone)]
pub struct CookieManager {
    prefix: String,
    consent_type: ConsentType,
    attributes: CookieAttributes,
    purposes: Vec<Purpose>,
    store: Arc<dyn CookieStore>,
    bus: EventBus,
}

impl CookieManager {
    pub fn new(config: &Configuration, store: Arc<dyn CookieStore>, bus: EventBus) -> Self {
        Self {
            prefix: config.prefix.clone(),
            consent_type: config.consent_type,
            attributes: config.cookie_attributes.clone(),
            purposes: config.purposes.clone(),
            store,
            bus,
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn consent_type(&self) -> ConsentType {
        self.consent_type
    }

    pub fn attributes(&self) -> &CookieAttributes {
        &self.attributes
    }

    pub fn purposes(&self) -> &[Purpose] {
        &self.purposes
    }

    /// Cookie name storing consent for a purpose
    pub fn cookie_name(&self, purpose: &Purpose) -> String {
        format!("{}-{}", self.prefix, purpose)
    }

    // =========================================================================
    // Cookie primitives
    // =========================================================================

    pub fn get_cookie(&self, name: &str) -> Option<String> {
        self.store.get(name)
    }

    /// Write a cookie; falls back to the configured attributes
    pub fn set_cookie(&self, name: &str, value: &str, attributes: Option<&CookieAttributes>) {
        self.store
            .set(name, value, attributes.unwrap_or(&self.attributes));
    }

    /// Remove a cookie; falls back to the configured attributes
    pub fn remove_cookie(&self, name: &str, attributes: Option<&CookieAttributes>) {
        self.store.remove(name, attributes.unwrap_or(&self.attributes));
    }

    /// Remove every visible cookie whose name matches `pattern`.
    ///
    /// Returns the names that matched.
    pub fn remove_cookies_matching(&self, pattern: &Regex, attributes: &CookieAttributes) -> Vec<String> {
        let matched: Vec<String> = self
            .store
            .names()
            .into_iter()
            .filter(|name| pattern.is_match(name))
            .collect();
        for name in &matched {
            self.store.remove(name, attributes);
        }
        matched
    }

    /// An empty value counts as absent
    pub fn cookie_exists(&self, name: &str) -> bool {
        self.store
            .get(name)
            .map(|value| !value.is_empty())
            .unwrap_or(false)
    }

    // =========================================================================
    // Consent
    // =========================================================================

    /// Whether consent for a purpose is currently granted.
    ///
    /// Opt-in requires an explicit `"true"`; opt-out also allows a missing cookie.
    /// Functional consent always needs the explicit `"true"`, whatever the type.
    pub fn has_cookies_enabled(&self, purpose: &Purpose) -> bool {
        let cookie = self.store.get(&self.cookie_name(purpose));
        if purpose.is_functional() {
            return cookie.as_deref() == Some(ENABLED);
        }
        match self.consent_type {
            ConsentType::OptIn => cookie.as_deref() == Some(ENABLED),
            ConsentType::OptOut => cookie.map(|v| v == ENABLED).unwrap_or(true),
        }
    }

    /// Whether every purpose in the set is enabled (an empty set is)
    pub fn has_all_necessary_cookies_enabled(&self, purposes: &[Purpose]) -> bool {
        purposes.iter().all(|p| self.has_cookies_enabled(p))
    }

    /// Whether every known purpose has a recorded decision, whatever its value
    pub fn has_all_cookies_set(&self) -> bool {
        self.purposes
            .iter()
            .all(|p| self.cookie_exists(&self.cookie_name(p)))
    }

    /// Current consent for every known purpose
    pub fn consent_snapshot(&self) -> ConsentStatus {
        self.purposes
            .iter()
            .map(|p| (p.clone(), self.has_cookies_enabled(p)))
            .collect()
    }

    /// Emits: `{purpose}-enabled`
    pub fn enable_cookies(&self, purpose: &Purpose) {
        self.set_cookie(&self.cookie_name(purpose), ENABLED, None);
        info!(purpose = %purpose, "[CookieManager] Enabled cookies");
        self.bus.emit_event(&ConsentEvent::Enabled {
            purpose: purpose.clone(),
        });
    }

    /// Emits: `{purpose}-disabled`
    pub fn disable_cookies(&self, purpose: &Purpose) {
        self.set_cookie(&self.cookie_name(purpose), DISABLED, None);
        info!(purpose = %purpose, "[CookieManager] Disabled cookies");
        self.bus.emit_event(&ConsentEvent::Disabled {
            purpose: purpose.clone(),
        });
    }

    /// Emits: `functional-enabled`
    pub fn enable_functional_cookie(&self) {
        self.set_cookie(&self.cookie_name(&Purpose::functional()), ENABLED, None);
        debug!("[CookieManager] Enabled functional cookie");
        self.bus.emit_event(&ConsentEvent::FunctionalEnabled);
    }

    pub fn has_functional_cookie(&self) -> bool {
        self.cookie_exists(&self.cookie_name(&Purpose::functional()))
    }

    /// Deny every known purpose that has no recorded decision yet
    pub fn set_cookies_default(&self) {
        for purpose in &self.purposes {
            if !self.cookie_exists(&self.cookie_name(purpose)) {
                self.disable_cookies(purpose);
            }
        }
    }

    /// Enable the functional cookie and every known purpose
    pub fn enable_all_cookies(&self) {
        self.enable_functional_cookie();
        for purpose in &self.purposes {
            self.enable_cookies(purpose);
        }
    }

    /// Disable every known purpose; functional is left alone
    pub fn disable_all_cookies(&self) {
        for purpose in &self.purposes {
            self.disable_cookies(purpose);
        }
    }
}
