//! Purpose and consent-type value objects

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A category of data processing that needs its own consent.
///
/// Examples: "analytics", "marketing". The set of known purposes comes from
/// configuration; `functional` is reserved and always handled explicitly.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Purpose(String);

impl Purpose {
    /// Reserved purpose for strictly functional cookies
    pub const FUNCTIONAL: &'static str = "functional";

    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn functional() -> Self {
        Self::new(Self::FUNCTIONAL)
    }

    pub fn analytics() -> Self {
        Self::new("analytics")
    }

    pub fn marketing() -> Self {
        Self::new("marketing")
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_functional(&self) -> bool {
        self.0 == Self::FUNCTIONAL
    }
}

impl fmt::Display for Purpose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Purpose {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for Purpose {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl AsRef<str> for Purpose {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Default-deny vs default-allow policy when no decision is recorded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum ConsentType {
    /// Nothing is allowed until the visitor says so
    #[default]
    OptIn,
    /// Everything is allowed until the visitor says otherwise
    OptOut,
}

impl ConsentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OptIn => "opt-in",
            Self::OptOut => "opt-out",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "opt-in" => Some(Self::OptIn),
            "opt-out" => Some(Self::OptOut),
            _ => None,
        }
    }
}

/// Current consent decision per known purpose
pub type ConsentStatus = BTreeMap<Purpose, bool>;

/// Lifecycle of a single purpose within a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsentState {
    /// No decision has been persisted yet
    Unset,
    Enabled,
    Disabled,
}

impl ConsentState {
    pub fn is_enabled(&self) -> bool {
        matches!(self, Self::Enabled)
    }
}
