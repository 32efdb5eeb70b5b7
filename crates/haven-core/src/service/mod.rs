//! Third-party services
//!
//! - `host` - the page surface scripts and globals are installed into
//! - `adapters` - built-in vendor integrations (default injectors)
//! - `loader` - consent-gated, at-most-once injection
//! - `revoke` - teardown and cookie cleanup when consent is withdrawn

mod adapters;
mod host;
mod loader;
mod revoke;

pub use adapters::{
    AdapterRegistry, AdobeAudienceManager, AnalyticsAdapter, FacebookPixel, GoogleAnalytics,
    GoogleTagManager, Navitas,
};
pub use host::{MemoryScriptHost, ScriptHost};
pub use loader::{InjectOutcome, ServiceLoader};
pub use revoke::{ConsentRevoke, RevokeReport};
