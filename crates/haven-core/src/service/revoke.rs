//! Consent revocation
//!
//! When a purpose is disabled, vendor integrations serving it are torn down
//! and the cookies they left behind are removed. Vendors write cookies on the
//! page host and on parent domains, so removal is attempted in every scope
//! the configuration knows about.

use regex::Regex;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::{AdapterRegistry, ScriptHost};
use crate::cookies::{CookieAttributes, CookieManager};
use crate::domain::Purpose;
use crate::store::ConsentStore;

/// What a revocation pass removed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RevokeReport {
    /// Cookie names removed, without duplicates
    pub removed_cookies: Vec<String>,
    /// Adapters that had something installed
    pub torn_down: Vec<String>,
}

impl RevokeReport {
    fn record_cookies(&mut self, names: Vec<String>) {
        for name in names {
            if !self.removed_cookies.contains(&name) {
                self.removed_cookies.push(name);
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.removed_cookies.is_empty() && self.torn_down.is_empty()
    }
}

pub struct ConsentRevoke {
    store: Arc<ConsentStore>,
    cookies: CookieManager,
    adapters: Arc<AdapterRegistry>,
    host: Arc<dyn ScriptHost>,
}

impl ConsentRevoke {
    pub fn new(
        store: Arc<ConsentStore>,
        cookies: CookieManager,
        adapters: Arc<AdapterRegistry>,
        host: Arc<dyn ScriptHost>,
    ) -> Self {
        Self {
            store,
            cookies,
            adapters,
            host,
        }
    }

    /// Tear down every analytics vendor and remove its cookies
    pub fn destroy_analytics_services(&self) -> RevokeReport {
        self.destroy_services_for(&Purpose::analytics())
    }

    /// Tear down vendors serving `purpose` and remove their cookies.
    ///
    /// Non-required services gated on `purpose` also lose the cookies matching
    /// their declared patterns. Already-injected scripts that hold their own
    /// state are not guaranteed to stop.
    pub fn destroy_services_for(&self, purpose: &Purpose) -> RevokeReport {
        let scopes = self.cookie_scopes();
        let mut report = RevokeReport::default();

        for adapter in self.adapters.for_purpose(purpose) {
            for pattern in adapter.cookie_patterns() {
                for scope in &scopes {
                    report.record_cookies(self.cookies.remove_cookies_matching(pattern, scope));
                }
            }
            if adapter.teardown(self.host.as_ref()) {
                report.torn_down.push(adapter.name().to_string());
            }
        }

        for service in self.store.services() {
            if service.required || !service.depends_on(purpose) {
                continue;
            }
            for pattern in &service.cookies {
                let regex = match Regex::new(pattern) {
                    Ok(regex) => regex,
                    Err(e) => {
                        warn!(service = %service.name, error = %e, "[ConsentRevoke] Skipping cookie pattern");
                        continue;
                    }
                };
                for scope in &scopes {
                    report.record_cookies(self.cookies.remove_cookies_matching(&regex, scope));
                }
            }
        }

        if report.is_empty() {
            debug!(purpose = %purpose, "[ConsentRevoke] Nothing to revoke");
        } else {
            info!(
                purpose = %purpose,
                cookies = report.removed_cookies.len(),
                torn_down = ?report.torn_down,
                "[ConsentRevoke] Revoked services"
            );
        }
        report
    }

    /// Attribute sets covering the page host and every configured domain
    fn cookie_scopes(&self) -> Vec<CookieAttributes> {
        let config = self.store.config();
        let path = config.cookie_attributes.effective_path().to_string();
        let host_only = CookieAttributes::session().with_path(path);

        let mut scopes = vec![host_only.clone()];
        let mut domains: Vec<String> = config.domains.clone();
        if let Some(domain) = &config.cookie_attributes.domain {
            if !domains.contains(domain) {
                domains.push(domain.clone());
            }
        }
        scopes.extend(domains.iter().map(|d| host_only.with_domain(d.as_str())));
        scopes
    }
}
