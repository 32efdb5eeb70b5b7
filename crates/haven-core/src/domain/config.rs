//! Consent manager configuration
//!
//! [`ConsentOptions`] is what the host supplies (usually JSON with camelCase
//! keys). [`ConfigurationResolver`] turns it into the immutable
//! [`Configuration`] every component reads for the rest of the session.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;
use tracing::{debug, warn};

use super::{ConsentType, Purpose, ServiceConfig, ServiceDescriptor};
use crate::cookies::CookieAttributes;

/// Default cookie namespace
pub const DEFAULT_PREFIX: &str = "cookies";

/// Errors raised while resolving configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Cookie prefix must not be empty")]
    EmptyPrefix,

    #[error("Invalid configuration JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

fn default_purposes() -> Vec<Purpose> {
    vec![Purpose::analytics(), Purpose::marketing()]
}

/// Options recognized by the consent manager
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConsentOptions {
    /// Cookie namespace: consent is stored as `{prefix}-{purpose}`
    pub prefix: String,

    /// Default-allow (`opt-out`) or default-deny (`opt-in`) policy
    #[serde(rename = "type")]
    pub consent_type: ConsentType,

    /// Known purposes, in display order
    pub purposes: Vec<Purpose>,

    /// Attributes passed through to every cookie write
    pub cookie_attributes: CookieAttributes,

    /// Initial service descriptors
    pub services: Vec<ServiceConfig>,

    /// Domains consent-related cookies may live on, searched on revocation
    pub domains: Vec<String>,

    /// Services eligible for automatic injection (empty = all services)
    pub inject: Vec<String>,

    /// Services defined in code, e.g. with a custom injector
    #[serde(skip)]
    pub extra_services: Vec<ServiceDescriptor>,
}

impl Default for ConsentOptions {
    fn default() -> Self {
        Self {
            prefix: DEFAULT_PREFIX.to_string(),
            consent_type: ConsentType::default(),
            purposes: default_purposes(),
            cookie_attributes: CookieAttributes::default(),
            services: Vec::new(),
            domains: Vec::new(),
            inject: Vec::new(),
            extra_services: Vec::new(),
        }
    }
}

impl ConsentOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse options from JSON; missing keys take their defaults
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub fn with_type(mut self, consent_type: ConsentType) -> Self {
        self.consent_type = consent_type;
        self
    }

    pub fn with_purposes<I, P>(mut self, purposes: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<Purpose>,
    {
        self.purposes = purposes.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_cookie_attributes(mut self, attributes: CookieAttributes) -> Self {
        self.cookie_attributes = attributes;
        self
    }

    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domains.push(domain.into());
        self
    }

    pub fn with_service(mut self, service: ServiceDescriptor) -> Self {
        self.extra_services.push(service);
        self
    }

    pub fn with_auto_inject(mut self, name: impl Into<String>) -> Self {
        self.inject.push(name.into());
        self
    }
}

/// Resolved, validated configuration
#[derive(Debug, Clone)]
pub struct Configuration {
    pub prefix: String,
    pub consent_type: ConsentType,
    /// Known purposes; never contains `functional`
    pub purposes: Vec<Purpose>,
    pub cookie_attributes: CookieAttributes,
    pub services: Vec<ServiceDescriptor>,
    pub domains: Vec<String>,
    pub inject: Vec<String>,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            prefix: DEFAULT_PREFIX.to_string(),
            consent_type: ConsentType::default(),
            purposes: default_purposes(),
            cookie_attributes: CookieAttributes::default(),
            services: Vec::new(),
            domains: Vec::new(),
            inject: Vec::new(),
        }
    }
}

impl Configuration {
    /// Cookie name storing consent for a purpose
    pub fn cookie_name(&self, purpose: &Purpose) -> String {
        format!("{}-{}", self.prefix, purpose)
    }

    pub fn service(&self, name: &str) -> Option<&ServiceDescriptor> {
        self.services.iter().find(|s| s.name == name)
    }

    pub fn service_names(&self) -> HashSet<String> {
        self.services.iter().map(|s| s.name.clone()).collect()
    }

    /// Whether a service takes part in automatic injection passes
    pub fn is_auto_injected(&self, name: &str) -> bool {
        self.inject.is_empty() || self.inject.iter().any(|n| n == name)
    }

    pub fn is_known_purpose(&self, purpose: &Purpose) -> bool {
        self.purposes.contains(purpose)
    }
}

/// Turns raw options into a [`Configuration`]
pub struct ConfigurationResolver;

impl ConfigurationResolver {
    /// Resolve options once at construction.
    ///
    /// Purposes referenced by services are added to the known set. Invalid
    /// service descriptors are logged and dropped.
    pub fn resolve(options: ConsentOptions) -> Result<Configuration, ConfigError> {
        let prefix = options.prefix.trim().to_string();
        if prefix.is_empty() {
            return Err(ConfigError::EmptyPrefix);
        }

        let descriptors: Vec<ServiceDescriptor> = options
            .services
            .into_iter()
            .map(ServiceDescriptor::from)
            .chain(options.extra_services)
            .collect();

        let mut purposes: Vec<Purpose> = Vec::new();
        let referenced = descriptors.iter().flat_map(|s| s.purposes.iter());
        for purpose in options.purposes.iter().chain(referenced) {
            if !purpose.is_functional() && !purposes.contains(purpose) {
                purposes.push(purpose.clone());
            }
        }

        let mut services: Vec<ServiceDescriptor> = Vec::with_capacity(descriptors.len());
        let mut taken: HashSet<String> = HashSet::new();
        for service in descriptors {
            match service.validate(&purposes, &taken) {
                Ok(()) => {
                    taken.insert(service.name.clone());
                    services.push(service);
                }
                Err(e) => {
                    warn!(service = %service.name, error = %e, "[Config] Dropping invalid service");
                }
            }
        }

        debug!(
            prefix = %prefix,
            consent_type = options.consent_type.as_str(),
            purposes = purposes.len(),
            services = services.len(),
            "[Config] Resolved configuration"
        );

        Ok(Configuration {
            prefix,
            consent_type: options.consent_type,
            purposes,
            cookie_attributes: options.cookie_attributes,
            services,
            domains: options.domains,
            inject: options.inject,
        })
    }
}
