//! Store mutations and the reducer that applies them

use serde::Serialize;
use std::collections::HashMap;

use crate::domain::{Configuration, ConsentStatus, Purpose, ServiceDescriptor};

/// Authoritative in-memory consent state
#[derive(Debug, Clone, Default)]
pub struct State {
    pub config: Configuration,
    pub consent: ConsentStatus,
    /// Service name -> injected during this session
    pub injected: HashMap<String, bool>,
}

/// Read-only view of the state, handed to UI collaborators
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StateSnapshot {
    pub prefix: String,
    pub purposes: Vec<Purpose>,
    pub consent: ConsentStatus,
    pub injected: Vec<String>,
}

impl From<&State> for StateSnapshot {
    fn from(state: &State) -> Self {
        let mut injected: Vec<String> = state
            .injected
            .iter()
            .filter(|(_, done)| **done)
            .map(|(name, _)| name.clone())
            .collect();
        injected.sort();
        Self {
            prefix: state.config.prefix.clone(),
            purposes: state.config.purposes.clone(),
            consent: state.consent.clone(),
            injected,
        }
    }
}

/// Every permitted state change
#[derive(Debug, Clone)]
pub enum Mutation {
    /// Install the resolved configuration
    SetInitialState(Configuration),
    /// Replace the whole consent map
    SetConsents(ConsentStatus),
    /// Update one purpose
    SetConsent { purpose: Purpose, status: bool },
    /// Mark a service as injected
    SetInjected(String),
    /// Append a service registered at runtime
    AddService(ServiceDescriptor),
}

impl Mutation {
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::SetInitialState(_) => "set_initial_state",
            Self::SetConsents(_) => "set_consents",
            Self::SetConsent { .. } => "set_consent",
            Self::SetInjected(_) => "set_injected",
            Self::AddService(_) => "add_service",
        }
    }
}

/// Apply a mutation. Total: inputs were validated by the caller.
pub fn reduce(mut state: State, mutation: Mutation) -> State {
    match mutation {
        Mutation::SetInitialState(config) => {
            state.config = config;
        }
        Mutation::SetConsents(consents) => {
            state.consent = consents;
        }
        Mutation::SetConsent { purpose, status } => {
            state.consent.insert(purpose, status);
        }
        Mutation::SetInjected(name) => {
            state.injected.insert(name, true);
        }
        Mutation::AddService(service) => {
            state.config.services.push(service);
        }
    }
    state
}
