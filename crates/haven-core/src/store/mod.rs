//! Consent Store - single authoritative state container
//!
//! State is changed only by committing a [`Mutation`]; commits are applied
//! one at a time behind a write lock, so there is exactly one writer at any
//! moment. Getters are read-only projections.

mod mutation;

pub use mutation::{reduce, Mutation, State, StateSnapshot};

use parking_lot::RwLock;
use tracing::debug;

use crate::cookies::CookieManager;
use crate::domain::{ConsentState, ConsentStatus, Configuration, Purpose, ServiceDescriptor};

pub struct ConsentStore {
    state: RwLock<State>,
    cookies: CookieManager,
}

impl ConsentStore {
    /// Create the store and commit the resolved configuration
    pub fn new(config: Configuration, cookies: CookieManager) -> Self {
        let store = Self {
            state: RwLock::new(State::default()),
            cookies,
        };
        store.commit(Mutation::SetInitialState(config));
        store
    }

    /// Apply a mutation
    pub fn commit(&self, mutation: Mutation) {
        debug!(mutation = mutation.type_name(), "[ConsentStore] Commit");
        let mut state = self.state.write();
        let current = std::mem::take(&mut *state);
        *state = reduce(current, mutation);
    }

    /// Load consent for every known purpose from cookies.
    ///
    /// Returns the committed snapshot.
    pub fn init(&self) -> ConsentStatus {
        let consents: ConsentStatus = self
            .purposes()
            .into_iter()
            .map(|p| {
                let enabled = self.has_cookies_enabled(&p);
                (p, enabled)
            })
            .collect();
        self.commit(Mutation::SetConsents(consents.clone()));
        consents
    }

    // =========================================================================
    // Getters
    // =========================================================================

    /// Known purposes
    pub fn purposes(&self) -> Vec<Purpose> {
        self.state.read().config.purposes.clone()
    }

    /// Persisted consent for a purpose, read through the cookie manager
    pub fn has_cookies_enabled(&self, purpose: &Purpose) -> bool {
        self.cookies.has_cookies_enabled(purpose)
    }

    /// In-memory consent map
    pub fn consent(&self) -> ConsentStatus {
        self.state.read().consent.clone()
    }

    pub fn consent_for(&self, purpose: &Purpose) -> Option<bool> {
        self.state.read().consent.get(purpose).copied()
    }

    /// Where a purpose stands: unset until a decision has been persisted
    pub fn consent_state(&self, purpose: &Purpose) -> ConsentState {
        match self.cookies.get_cookie(&self.cookies.cookie_name(purpose)) {
            None => ConsentState::Unset,
            Some(value) if value.is_empty() => ConsentState::Unset,
            Some(value) if value == "true" => ConsentState::Enabled,
            Some(_) => ConsentState::Disabled,
        }
    }

    pub fn is_injected(&self, name: &str) -> bool {
        self.state
            .read()
            .injected
            .get(name)
            .copied()
            .unwrap_or(false)
    }

    pub fn config(&self) -> Configuration {
        self.state.read().config.clone()
    }

    pub fn services(&self) -> Vec<ServiceDescriptor> {
        self.state.read().config.services.clone()
    }

    pub fn service(&self, name: &str) -> Option<ServiceDescriptor> {
        self.state.read().config.service(name).cloned()
    }

    pub fn snapshot(&self) -> StateSnapshot {
        StateSnapshot::from(&*self.state.read())
    }
}
