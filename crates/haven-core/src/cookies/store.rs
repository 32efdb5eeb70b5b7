//! Cookie store - the durable key/value backend consent is persisted in
//!
//! The engine never touches a browser directly. Hosts hand it a
//! [`CookieStore`]: either the in-memory [`MemoryCookieJar`] (headless use,
//! tests) or a [`DocumentCookieStore`] wrapping whatever exposes the page's
//! raw cookie string.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use super::codec;
use super::CookieAttributes;

/// Backend the cookie manager reads and writes through.
///
/// Implementations must be `Send + Sync`; the engine shares one store between
/// all of its components.
pub trait CookieStore: Send + Sync {
    /// Value of the named cookie visible to the page, if any
    fn get(&self, name: &str) -> Option<String>;

    /// Write a cookie with the given attributes
    fn set(&self, name: &str, value: &str, attributes: &CookieAttributes);

    /// Remove a cookie. Domain and path must match the ones it was written with.
    fn remove(&self, name: &str, attributes: &CookieAttributes);

    /// Names of all cookies currently visible to the page
    fn names(&self) -> Vec<String>;
}

/// A cookie held by [`MemoryCookieJar`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredCookie {
    pub name: String,
    pub value: String,
    /// `None` for host-only cookies
    pub domain: Option<String>,
    pub path: String,
    pub secure: bool,
    pub expires: Option<DateTime<Utc>>,
}

impl StoredCookie {
    fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.expires.map(|at| at > now).unwrap_or(true)
    }

    fn same_slot(&self, name: &str, domain: &Option<String>, path: &str) -> bool {
        self.name == name && self.domain == *domain && self.path == path
    }
}

/// Browsers treat `.example.com` and `example.com` as the same cookie domain
fn normalize_domain(domain: Option<&str>) -> Option<String> {
    domain
        .map(|d| d.trim_start_matches('.').to_ascii_lowercase())
        .filter(|d| !d.is_empty())
}

/// In-memory cookie jar keyed by name, domain and path
#[derive(Debug, Default)]
pub struct MemoryCookieJar {
    cookies: RwLock<Vec<StoredCookie>>,
}

impl MemoryCookieJar {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a host-only cookie (e.g. a returning visitor's consent)
    pub fn with_cookie(self, name: &str, value: &str) -> Self {
        self.set(name, value, &CookieAttributes::session());
        self
    }

    /// Seed a cookie scoped to a domain
    pub fn with_domain_cookie(self, name: &str, value: &str, domain: &str) -> Self {
        self.set(name, value, &CookieAttributes::session().with_domain(domain));
        self
    }

    /// Snapshot of every live cookie, including duplicates across domains
    pub fn cookies(&self) -> Vec<StoredCookie> {
        let now = Utc::now();
        self.cookies
            .read()
            .iter()
            .filter(|c| c.is_live(now))
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.cookies().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Write as of `now`. Cookies that expired since the last write are dropped.
    fn write_at(&self, name: &str, value: &str, attributes: &CookieAttributes, now: DateTime<Utc>) {
        let domain = normalize_domain(attributes.domain.as_deref());
        let path = attributes.effective_path().to_string();
        let mut cookies = self.cookies.write();

        cookies.retain(|c| c.is_live(now) && !c.same_slot(name, &domain, &path));
        if attributes.is_expired_at(now) {
            return;
        }

        cookies.push(StoredCookie {
            name: name.to_string(),
            value: value.to_string(),
            domain,
            path,
            secure: attributes.secure,
            expires: attributes.expires.map(|e| e.resolve(now)),
        });
    }
}

impl CookieStore for MemoryCookieJar {
    fn get(&self, name: &str) -> Option<String> {
        let now = Utc::now();
        self.cookies
            .read()
            .iter()
            .find(|c| c.name == name && c.is_live(now))
            .map(|c| c.value.clone())
    }

    fn set(&self, name: &str, value: &str, attributes: &CookieAttributes) {
        self.write_at(name, value, attributes, Utc::now());
    }

    fn remove(&self, name: &str, attributes: &CookieAttributes) {
        self.set(name, "", &attributes.expired());
    }

    fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for cookie in self.cookies() {
            if !names.contains(&cookie.name) {
                names.push(cookie.name);
            }
        }
        names
    }
}

/// Raw cookie access exposed by a page (the `document.cookie` contract).
///
/// Reading returns every visible cookie as `a=b; c=d`; writing takes one
/// serialized cookie with its attributes.
pub trait CookieDocument: Send + Sync {
    fn cookie_header(&self) -> String;

    fn write_cookie(&self, cookie: &str);
}

/// [`CookieStore`] over a raw [`CookieDocument`], encoding through the cookie codec
pub struct DocumentCookieStore<D: CookieDocument> {
    document: D,
}

impl<D: CookieDocument> DocumentCookieStore<D> {
    pub fn new(document: D) -> Self {
        Self { document }
    }

    pub fn document(&self) -> &D {
        &self.document
    }
}

impl<D: CookieDocument> CookieStore for DocumentCookieStore<D> {
    fn get(&self, name: &str) -> Option<String> {
        codec::parse_cookie_header(&self.document.cookie_header())
            .into_iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    fn set(&self, name: &str, value: &str, attributes: &CookieAttributes) {
        let cookie = codec::serialize(name, value, attributes, Utc::now());
        self.document.write_cookie(&cookie);
    }

    fn remove(&self, name: &str, attributes: &CookieAttributes) {
        self.set(name, "", &attributes.expired());
    }

    fn names(&self) -> Vec<String> {
        codec::parse_cookie_header(&self.document.cookie_header())
            .into_iter()
            .map(|(n, _)| n)
            .collect()
    }
}
