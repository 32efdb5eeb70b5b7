//! Consent events - lifecycle notifications emitted on the event bus
//!
//! Every consent transition is announced as `{purpose}-enabled` or
//! `{purpose}-disabled`. The remaining events describe service injection and
//! visitor interaction with the preferences UI.
//!
//! | Event                | Payload       |
//! |----------------------|---------------|
//! | `{purpose}-enabled`  | none          |
//! | `{purpose}-disabled` | none          |
//! | `functional-enabled` | none          |
//! | `service-loaded`     | service name  |
//! | `services-loaded`    | none          |
//! | `preferences-change` | none          |

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::Purpose;

/// Wire name of the per-service injection event
pub const SERVICE_LOADED: &str = "service-loaded";
/// Wire name of the end-of-pass injection event
pub const SERVICES_LOADED: &str = "services-loaded";
/// Wire name of the preferences UI change event
pub const PREFERENCES_CHANGE: &str = "preferences-change";
/// Wire name of the functional cookie event
pub const FUNCTIONAL_ENABLED: &str = "functional-enabled";

/// Name of the event fired when a purpose is enabled
pub fn enabled_event(purpose: &Purpose) -> String {
    format!("{}-enabled", purpose)
}

/// Name of the event fired when a purpose is disabled
pub fn disabled_event(purpose: &Purpose) -> String {
    format!("{}-disabled", purpose)
}

/// Typed form of the events emitted by the consent engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ConsentEvent {
    /// Consent for a purpose was granted
    Enabled { purpose: Purpose },
    /// Consent for a purpose was withdrawn or defaulted to deny
    Disabled { purpose: Purpose },
    /// The functional cookie was written
    FunctionalEnabled,
    /// A service passed gating and its injector ran
    ServiceLoaded { name: String },
    /// A full injection pass finished
    ServicesLoaded,
    /// The visitor toggled a preference in the UI
    PreferencesChange,
}

impl ConsentEvent {
    /// Event name as seen by subscribers
    pub fn name(&self) -> String {
        match self {
            Self::Enabled { purpose } => enabled_event(purpose),
            Self::Disabled { purpose } => disabled_event(purpose),
            Self::FunctionalEnabled => FUNCTIONAL_ENABLED.to_string(),
            Self::ServiceLoaded { .. } => SERVICE_LOADED.to_string(),
            Self::ServicesLoaded => SERVICES_LOADED.to_string(),
            Self::PreferencesChange => PREFERENCES_CHANGE.to_string(),
        }
    }

    /// Payload delivered alongside the event, if any
    pub fn payload(&self) -> Option<Value> {
        match self {
            Self::ServiceLoaded { name } => Some(Value::String(name.clone())),
            _ => None,
        }
    }

    /// Short type name for logging
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Enabled { .. } => "enabled",
            Self::Disabled { .. } => "disabled",
            Self::FunctionalEnabled => "functional_enabled",
            Self::ServiceLoaded { .. } => "service_loaded",
            Self::ServicesLoaded => "services_loaded",
            Self::PreferencesChange => "preferences_change",
        }
    }

    /// Purpose the event refers to, if any
    pub fn purpose(&self) -> Option<&Purpose> {
        match self {
            Self::Enabled { purpose } | Self::Disabled { purpose } => Some(purpose),
            _ => None,
        }
    }
}

/// An event as delivered to subscribers
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub name: String,
    pub payload: Option<Value>,
}

impl Event {
    pub fn new(name: impl Into<String>, payload: Option<Value>) -> Self {
        Self {
            name: name.into(),
            payload,
        }
    }

    /// Payload as a string slice (e.g. the service name of `service-loaded`)
    pub fn payload_str(&self) -> Option<&str> {
        self.payload.as_ref().and_then(|p| p.as_str())
    }
}

impl From<&ConsentEvent> for Event {
    fn from(event: &ConsentEvent) -> Self {
        Self::new(event.name(), event.payload())
    }
}
