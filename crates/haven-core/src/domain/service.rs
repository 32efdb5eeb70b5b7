//! Service descriptor - one third-party integration gated by consent

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

use super::Purpose;

/// Callable that activates a third-party integration.
///
/// Invoked with the service `id` when one is configured.
pub type InjectFn = Arc<dyn Fn(Option<&str>) + Send + Sync>;

/// How a service gets activated once gating passes
#[derive(Clone, Default)]
pub enum Injector {
    /// Nothing to run; the service only tracks consent
    #[default]
    None,
    /// A built-in integration looked up by name
    Default(String),
    /// A host-supplied callable
    Custom(InjectFn),
}

impl Injector {
    pub fn custom<F>(f: F) -> Self
    where
        F: Fn(Option<&str>) + Send + Sync + 'static,
    {
        Self::Custom(Arc::new(f))
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }
}

impl fmt::Debug for Injector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str("None"),
            Self::Default(name) => f.debug_tuple("Default").field(name).finish(),
            Self::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// Errors raised while validating a service descriptor
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ServiceError {
    #[error("Service name must not be empty")]
    EmptyName,

    #[error("Service '{0}' is already registered")]
    Duplicate(String),

    #[error("Service '{service}' depends on unknown purpose '{purpose}'")]
    UnknownPurpose { service: String, purpose: String },

    #[error("Service '{service}' has an invalid cookie pattern '{pattern}': {reason}")]
    InvalidCookiePattern {
        service: String,
        pattern: String,
        reason: String,
    },
}

/// Validated description of a third-party integration
#[derive(Debug, Clone)]
pub struct ServiceDescriptor {
    /// Unique name; also the lookup key for default injectors
    pub name: String,

    /// Purposes that must all be consented to before injection
    pub purposes: Vec<Purpose>,

    /// Required services ignore consent and are always injected
    pub required: bool,

    pub inject: Injector,

    /// Identifier handed to the injector (tracking id, container id, ...)
    pub id: Option<String>,

    /// Cookie name patterns this service sets, removed on revocation
    pub cookies: Vec<String>,

    /// Extra host-defined options carried along untouched
    pub options: Map<String, Value>,
}

impl ServiceDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            purposes: Vec::new(),
            required: false,
            inject: Injector::None,
            id: None,
            cookies: Vec::new(),
            options: Map::new(),
        }
    }

    pub fn with_purposes<I, P>(mut self, purposes: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<Purpose>,
    {
        self.purposes = purposes.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_injector(mut self, inject: Injector) -> Self {
        self.inject = inject;
        self
    }

    /// Use the built-in integration registered under this service's name
    pub fn with_default_injector(mut self) -> Self {
        self.inject = Injector::Default(self.name.clone());
        self
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_cookie_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.cookies.push(pattern.into());
        self
    }

    pub fn with_option(mut self, key: impl Into<String>, value: Value) -> Self {
        self.options.insert(key.into(), value);
        self
    }

    pub fn set_required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Whether this service is gated on the given purpose
    pub fn depends_on(&self, purpose: &Purpose) -> bool {
        self.purposes.iter().any(|p| p == purpose)
    }

    /// Check the descriptor against the known purposes and the names already taken.
    pub fn validate(
        &self,
        known_purposes: &[Purpose],
        taken_names: &HashSet<String>,
    ) -> Result<(), ServiceError> {
        if self.name.trim().is_empty() {
            return Err(ServiceError::EmptyName);
        }
        if taken_names.contains(&self.name) {
            return Err(ServiceError::Duplicate(self.name.clone()));
        }
        for purpose in &self.purposes {
            if !purpose.is_functional() && !known_purposes.contains(purpose) {
                return Err(ServiceError::UnknownPurpose {
                    service: self.name.clone(),
                    purpose: purpose.to_string(),
                });
            }
        }
        for pattern in &self.cookies {
            if let Err(e) = Regex::new(pattern) {
                return Err(ServiceError::InvalidCookiePattern {
                    service: self.name.clone(),
                    pattern: pattern.clone(),
                    reason: e.to_string(),
                });
            }
        }
        Ok(())
    }
}

/// Service entry as written in JSON configuration
///
/// `inject: true` selects the built-in integration named after the service.
/// Unrecognized keys are kept in `options`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
    #[serde(default)]
    pub purposes: Vec<Purpose>,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub inject: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cookies: Vec<String>,
    #[serde(flatten)]
    pub options: Map<String, Value>,
}

impl From<ServiceConfig> for ServiceDescriptor {
    fn from(config: ServiceConfig) -> Self {
        let inject = if config.inject {
            Injector::Default(config.name.clone())
        } else {
            Injector::None
        };
        Self {
            name: config.name,
            purposes: config.purposes,
            required: config.required,
            inject,
            id: config.id,
            cookies: config.cookies,
            options: config.options,
        }
    }
}
