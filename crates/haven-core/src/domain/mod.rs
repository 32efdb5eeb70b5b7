//! Domain value objects, service descriptors, configuration and events
//!
//! This module contains all domain-level types for Haven:
//! - Value objects (Purpose, ConsentType, ConsentState)
//! - Service descriptors and their injectors
//! - Configuration (raw options and the resolved form)
//! - Consent events (ConsentEvent enum and the delivered Event)

pub mod config;
mod event;
mod purpose;
mod service;

pub use config::{ConfigError, Configuration, ConfigurationResolver, ConsentOptions, DEFAULT_PREFIX};
pub use event::{
    disabled_event, enabled_event, ConsentEvent, Event, FUNCTIONAL_ENABLED, PREFERENCES_CHANGE,
    SERVICES_LOADED, SERVICE_LOADED,
};
pub use purpose::{ConsentState, ConsentStatus, ConsentType, Purpose};
pub use service::{InjectFn, Injector, ServiceConfig, ServiceDescriptor, ServiceError};
