//! Analytics adapters - built-in vendor integrations
//!
//! Each adapter knows how to install its vendor into a [`ScriptHost`] (global
//! command queue + script tag) and how to tear it down again, and which
//! cookies the vendor sets. The [`AdapterRegistry`] is the closed set of
//! default injectors a service selects with `inject: true`.
//!
//! Some vendors are loaded by the site itself and only need cleaning up on
//! revocation (Adobe Audience Manager, Navitas). Their adapters report
//! `installable() == false` and are never used as injectors.

use chrono::Utc;
use lazy_static::lazy_static;
use regex::Regex;
use serde_json::json;
use std::sync::Arc;
use tracing::debug;

use super::ScriptHost;
use crate::domain::Purpose;

lazy_static! {
    static ref GOOGLE_ANALYTICS_COOKIES: Vec<Regex> = vec![
        Regex::new(r"^_ga($|_)").unwrap(),
        Regex::new(r"^_gid$").unwrap(),
        Regex::new(r"^_gat").unwrap(),
        Regex::new(r"^__utm[abcztv]$").unwrap(),
    ];
    static ref GOOGLE_TAG_MANAGER_COOKIES: Vec<Regex> = vec![
        Regex::new(r"^_ga($|_)").unwrap(),
        Regex::new(r"^_gid$").unwrap(),
        Regex::new(r"^_gat").unwrap(),
        Regex::new(r"^_gcl_").unwrap(),
    ];
    static ref FACEBOOK_PIXEL_COOKIES: Vec<Regex> = vec![
        Regex::new(r"^_fbp$").unwrap(),
        Regex::new(r"^_fbc$").unwrap(),
        Regex::new(r"^fr$").unwrap(),
    ];
    static ref ADOBE_AUDIENCE_MANAGER_COOKIES: Vec<Regex> = vec![
        Regex::new(r"^aam_uuid$").unwrap(),
        Regex::new(r"^demdex$").unwrap(),
        Regex::new(r"^dextp$").unwrap(),
        Regex::new(r"^dst$").unwrap(),
        Regex::new(r"^aam_").unwrap(),
    ];
    static ref NAVITAS_COOKIES: Vec<Regex> = vec![
        Regex::new(r"(?i)^navitas").unwrap(),
    ];
}

/// Capability interface for one vendor integration
pub trait AnalyticsAdapter: Send + Sync {
    /// Default-injector name services refer to
    fn name(&self) -> &str;

    /// Purpose whose revocation tears this vendor down
    fn purpose(&self) -> Purpose;

    /// Cookie name patterns the vendor sets
    fn cookie_patterns(&self) -> &[Regex];

    /// Globals the vendor installs on the page
    fn globals(&self) -> &[&'static str];

    /// Source prefix of the vendor's scripts, empty when the site loads them itself
    fn script_prefix(&self) -> &str;

    /// Whether `install` needs a service id (tracking id, container id)
    fn requires_id(&self) -> bool {
        true
    }

    /// Whether this adapter can load its vendor, or only tears it down
    fn installable(&self) -> bool {
        true
    }

    fn install(&self, host: &dyn ScriptHost, id: Option<&str>);

    /// Remove the vendor's globals and scripts.
    ///
    /// Returns `false` when nothing was installed.
    fn teardown(&self, host: &dyn ScriptHost) -> bool {
        let mut removed = false;
        for global in self.globals() {
            removed |= host.remove_global(global);
        }
        if !self.script_prefix().is_empty() {
            removed |= host.remove_scripts(self.script_prefix()) > 0;
        }
        removed
    }
}

/// Google Analytics (analytics.js)
pub struct GoogleAnalytics;

impl GoogleAnalytics {
    pub const NAME: &'static str = "google-analytics";
    const SCRIPT: &'static str = "https://www.google-analytics.com/analytics.js";
}

impl AnalyticsAdapter for GoogleAnalytics {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn purpose(&self) -> Purpose {
        Purpose::analytics()
    }

    fn cookie_patterns(&self) -> &[Regex] {
        &GOOGLE_ANALYTICS_COOKIES
    }

    fn globals(&self) -> &[&'static str] {
        &["ga", "GoogleAnalyticsObject"]
    }

    fn script_prefix(&self) -> &str {
        Self::SCRIPT
    }

    fn install(&self, host: &dyn ScriptHost, id: Option<&str>) {
        host.set_global("GoogleAnalyticsObject", json!("ga"));
        host.set_global(
            "ga",
            json!([
                ["create", id, "auto"],
                ["set", "anonymizeIp", true],
                ["send", "pageview"]
            ]),
        );
        host.inject_script(Self::SCRIPT);
        debug!(id = ?id, "[GoogleAnalytics] Installed");
    }
}

/// Google Tag Manager (gtm.js)
pub struct GoogleTagManager;

impl GoogleTagManager {
    pub const NAME: &'static str = "google-tag-manager";
    const SCRIPT: &'static str = "https://www.googletagmanager.com/gtm.js";
}

impl AnalyticsAdapter for GoogleTagManager {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn purpose(&self) -> Purpose {
        Purpose::analytics()
    }

    fn cookie_patterns(&self) -> &[Regex] {
        &GOOGLE_TAG_MANAGER_COOKIES
    }

    fn globals(&self) -> &[&'static str] {
        &["dataLayer", "google_tag_manager"]
    }

    fn script_prefix(&self) -> &str {
        Self::SCRIPT
    }

    fn install(&self, host: &dyn ScriptHost, id: Option<&str>) {
        host.set_global(
            "dataLayer",
            json!([{ "gtm.start": Utc::now().timestamp_millis(), "event": "gtm.js" }]),
        );
        let src = match id {
            Some(id) => format!("{}?id={}", Self::SCRIPT, urlencoding::encode(id)),
            None => Self::SCRIPT.to_string(),
        };
        host.inject_script(&src);
        debug!(id = ?id, "[GoogleTagManager] Installed");
    }
}

/// Facebook Pixel (fbevents.js)
pub struct FacebookPixel;

impl FacebookPixel {
    pub const NAME: &'static str = "facebook-pixel";
    const SCRIPT: &'static str = "https://connect.facebook.net/en_US/fbevents.js";
}

impl AnalyticsAdapter for FacebookPixel {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn purpose(&self) -> Purpose {
        Purpose::marketing()
    }

    fn cookie_patterns(&self) -> &[Regex] {
        &FACEBOOK_PIXEL_COOKIES
    }

    fn globals(&self) -> &[&'static str] {
        &["fbq", "_fbq"]
    }

    fn script_prefix(&self) -> &str {
        Self::SCRIPT
    }

    fn install(&self, host: &dyn ScriptHost, id: Option<&str>) {
        let queue = json!([["init", id], ["track", "PageView"]]);
        host.set_global("fbq", queue.clone());
        host.set_global("_fbq", queue);
        host.inject_script(Self::SCRIPT);
        debug!(id = ?id, "[FacebookPixel] Installed");
    }
}

/// Adobe Audience Manager (DIL), revocation only
pub struct AdobeAudienceManager;

impl AdobeAudienceManager {
    pub const NAME: &'static str = "adobe-audience-manager";
}

impl AnalyticsAdapter for AdobeAudienceManager {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn purpose(&self) -> Purpose {
        Purpose::analytics()
    }

    fn cookie_patterns(&self) -> &[Regex] {
        &ADOBE_AUDIENCE_MANAGER_COOKIES
    }

    fn globals(&self) -> &[&'static str] {
        &["DIL"]
    }

    fn script_prefix(&self) -> &str {
        ""
    }

    fn requires_id(&self) -> bool {
        false
    }

    fn installable(&self) -> bool {
        false
    }

    fn install(&self, _host: &dyn ScriptHost, _id: Option<&str>) {
        debug!("[AdobeAudienceManager] Revocation only, nothing to install");
    }
}

/// Navitas analytics, revocation only
pub struct Navitas;

impl Navitas {
    pub const NAME: &'static str = "navitas";
}

impl AnalyticsAdapter for Navitas {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn purpose(&self) -> Purpose {
        Purpose::analytics()
    }

    fn cookie_patterns(&self) -> &[Regex] {
        &NAVITAS_COOKIES
    }

    fn globals(&self) -> &[&'static str] {
        &["navitas"]
    }

    fn script_prefix(&self) -> &str {
        ""
    }

    fn requires_id(&self) -> bool {
        false
    }

    fn installable(&self) -> bool {
        false
    }

    fn install(&self, _host: &dyn ScriptHost, _id: Option<&str>) {
        debug!("[Navitas] Revocation only, nothing to install");
    }
}

/// Named vendor integrations available as default injectors
#[derive(Clone)]
pub struct AdapterRegistry {
    adapters: Vec<Arc<dyn AnalyticsAdapter>>,
}

impl AdapterRegistry {
    pub fn empty() -> Self {
        Self {
            adapters: Vec::new(),
        }
    }

    /// Register an adapter, replacing any adapter with the same name
    pub fn register(&mut self, adapter: Arc<dyn AnalyticsAdapter>) {
        self.adapters.retain(|a| a.name() != adapter.name());
        self.adapters.push(adapter);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn AnalyticsAdapter>> {
        self.adapters.iter().find(|a| a.name() == name).cloned()
    }

    /// Adapters torn down when `purpose` is revoked
    pub fn for_purpose(&self, purpose: &Purpose) -> Vec<Arc<dyn AnalyticsAdapter>> {
        self.adapters
            .iter()
            .filter(|a| a.purpose() == *purpose)
            .cloned()
            .collect()
    }

    pub fn names(&self) -> Vec<String> {
        self.adapters.iter().map(|a| a.name().to_string()).collect()
    }
}

impl Default for AdapterRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register(Arc::new(GoogleAnalytics));
        registry.register(Arc::new(GoogleTagManager));
        registry.register(Arc::new(FacebookPixel));
        registry.register(Arc::new(AdobeAudienceManager));
        registry.register(Arc::new(Navitas));
        registry
    }
}
