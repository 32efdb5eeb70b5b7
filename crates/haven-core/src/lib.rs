//! # Haven Core Library
//!
//! Cookie consent engine: tracks a visitor's consent per purpose, persists it
//! as cookies and gates third-party services on it.
//!
//! ## Modules
//!
//! - `domain` - Core types (Purpose, ServiceDescriptor, Configuration, events)
//! - `event_bus` - Synchronous publish/subscribe between components
//! - `cookies` - Cookie codec, stores and the consent cookie manager
//! - `store` - Single-writer consent state with typed mutations
//! - `service` - Script host, vendor adapters, injection and revocation
//! - `application` - Assembly and the public consent manager API

pub mod application;
pub mod cookies;
pub mod domain;
pub mod event_bus;
pub mod service;
pub mod store;

// Re-export commonly used types
pub use domain::*;

pub use application::{ConsentManager, ConsentManagerBuilder, ConsentRuntime};
pub use cookies::{CookieAttributes, CookieManager, CookieStore, MemoryCookieJar};
pub use event_bus::{EventBus, Subscription, SubscriptionId};
pub use service::{
    AdapterRegistry, AnalyticsAdapter, InjectOutcome, MemoryScriptHost, RevokeReport, ScriptHost,
};
pub use store::{ConsentStore, Mutation, StateSnapshot};
