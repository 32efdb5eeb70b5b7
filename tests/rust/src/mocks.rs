//! Mock collaborators for testing
//!
//! A browser-like `document.cookie` and a counting vendor adapter.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use regex::Regex;
use std::sync::atomic::{AtomicUsize, Ordering};

use haven_core::cookies::CookieDocument;
use haven_core::domain::Purpose;
use haven_core::service::{AnalyticsAdapter, ScriptHost};

// ============================================================================
// MockDocument
// ============================================================================

#[derive(Debug, Clone)]
struct DocumentCookie {
    name: String,
    raw_value: String,
    domain: Option<String>,
    path: String,
    expires: Option<DateTime<Utc>>,
}

/// Emulates the page's `document.cookie`: writes carry attributes, reads
/// return every live `name=value` pair.
#[derive(Default)]
pub struct MockDocument {
    cookies: Mutex<Vec<DocumentCookie>>,
    writes: Mutex<Vec<String>>,
}

impl MockDocument {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a host-only session cookie from a raw `name=value` pair
    pub fn with_cookie(self, pair: &str) -> Self {
        self.write_cookie(&format!("{}; path=/", pair));
        self.writes.lock().clear();
        self
    }

    /// Seed a cookie scoped to a domain
    pub fn with_domain_cookie(self, pair: &str, domain: &str) -> Self {
        self.write_cookie(&format!("{}; path=/; domain={}", pair, domain));
        self.writes.lock().clear();
        self
    }

    /// Every raw cookie write, in order
    pub fn writes(&self) -> Vec<String> {
        self.writes.lock().clone()
    }

    /// Domains the named cookie currently lives on (`None` = host-only)
    pub fn domains_of(&self, name: &str) -> Vec<Option<String>> {
        let now = Utc::now();
        self.cookies
            .lock()
            .iter()
            .filter(|c| c.name == name && c.expires.map(|at| at > now).unwrap_or(true))
            .map(|c| c.domain.clone())
            .collect()
    }
}

impl CookieDocument for MockDocument {
    fn cookie_header(&self) -> String {
        let now = Utc::now();
        self.cookies
            .lock()
            .iter()
            .filter(|c| c.expires.map(|at| at > now).unwrap_or(true))
            .map(|c| format!("{}={}", c.name, c.raw_value))
            .collect::<Vec<_>>()
            .join("; ")
    }

    fn write_cookie(&self, cookie: &str) {
        self.writes.lock().push(cookie.to_string());

        let mut parts = cookie.split(';');
        let Some((name, value)) = parts.next().and_then(|p| p.split_once('=')) else {
            return;
        };
        let mut written = DocumentCookie {
            name: name.trim().to_string(),
            raw_value: value.trim().to_string(),
            domain: None,
            path: "/".to_string(),
            expires: None,
        };
        for attribute in parts {
            let (key, val) = attribute.split_once('=').unwrap_or((attribute, ""));
            match key.trim().to_ascii_lowercase().as_str() {
                "domain" => {
                    written.domain = Some(val.trim().trim_start_matches('.').to_ascii_lowercase())
                }
                "path" => written.path = val.trim().to_string(),
                "expires" => {
                    written.expires = DateTime::parse_from_rfc2822(val.trim())
                        .ok()
                        .map(|at| at.with_timezone(&Utc))
                }
                _ => {}
            }
        }

        let mut cookies = self.cookies.lock();
        cookies.retain(|c| {
            !(c.name == written.name && c.domain == written.domain && c.path == written.path)
        });
        if written.expires.map(|at| at > Utc::now()).unwrap_or(true) {
            cookies.push(written);
        }
    }
}

// ============================================================================
// CountingAdapter
// ============================================================================

/// Vendor integration that records installs and teardowns
pub struct CountingAdapter {
    name: String,
    purpose: Purpose,
    patterns: Vec<Regex>,
    pub installs: AtomicUsize,
    pub teardowns: AtomicUsize,
    pub last_id: Mutex<Option<String>>,
}

impl CountingAdapter {
    pub fn new(name: &str, purpose: Purpose, patterns: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            purpose,
            patterns: patterns.iter().map(|p| Regex::new(p).unwrap()).collect(),
            installs: AtomicUsize::new(0),
            teardowns: AtomicUsize::new(0),
            last_id: Mutex::new(None),
        }
    }

    pub fn install_count(&self) -> usize {
        self.installs.load(Ordering::SeqCst)
    }

    pub fn teardown_count(&self) -> usize {
        self.teardowns.load(Ordering::SeqCst)
    }
}

impl AnalyticsAdapter for CountingAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    fn purpose(&self) -> Purpose {
        self.purpose.clone()
    }

    fn cookie_patterns(&self) -> &[Regex] {
        &self.patterns
    }

    fn globals(&self) -> &[&'static str] {
        &[]
    }

    fn script_prefix(&self) -> &str {
        "https://counting.example/"
    }

    fn requires_id(&self) -> bool {
        false
    }

    fn install(&self, host: &dyn ScriptHost, id: Option<&str>) {
        self.installs.fetch_add(1, Ordering::SeqCst);
        *self.last_id.lock() = id.map(String::from);
        host.inject_script(&format!("https://counting.example/{}.js", self.name));
    }

    fn teardown(&self, host: &dyn ScriptHost) -> bool {
        self.teardowns.fetch_add(1, Ordering::SeqCst);
        host.remove_scripts(self.script_prefix()) > 0
    }
}
