//! Cookie attributes passed through to every cookie write

use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Default lifetime of consent cookies, in days
pub const DEFAULT_EXPIRY_DAYS: i64 = 365;

/// Latest expiry written to a cookie; HTTP dates carry a four-digit year
pub fn latest_expiry() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(9999, 12, 31, 23, 59, 59)
        .single()
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// When a cookie expires
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Expiry {
    /// Relative lifetime in days from the moment of writing
    Days(i64),
    /// Absolute expiry instant
    At(DateTime<Utc>),
}

impl Expiry {
    /// Resolve to an absolute instant relative to `now`.
    ///
    /// Lifetimes past [`latest_expiry`] are clamped to it. Negative lifetimes
    /// out of range resolve to the earliest instant, which is still expired.
    pub fn resolve(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let latest = latest_expiry();
        match self {
            Self::Days(days) => match Duration::try_days(*days)
                .and_then(|lifetime| now.checked_add_signed(lifetime))
            {
                Some(at) => at.min(latest),
                None if *days < 0 => DateTime::<Utc>::MIN_UTC,
                None => {
                    warn!(days = *days, "[CookieAttributes] Cookie lifetime out of range, clamping");
                    latest
                }
            },
            Self::At(at) => (*at).min(latest),
        }
    }
}

/// SameSite cookie policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SameSite {
    Strict,
    Lax,
    None,
}

impl SameSite {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Strict => "strict",
            Self::Lax => "lax",
            Self::None => "none",
        }
    }
}

/// Attributes applied when writing or removing a cookie
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CookieAttributes {
    pub domain: Option<String>,
    pub path: Option<String>,
    pub expires: Option<Expiry>,
    pub secure: bool,
    pub same_site: Option<SameSite>,
}

impl Default for CookieAttributes {
    fn default() -> Self {
        Self {
            domain: None,
            path: Some("/".to_string()),
            expires: Some(Expiry::Days(DEFAULT_EXPIRY_DAYS)),
            secure: false,
            same_site: None,
        }
    }
}

impl CookieAttributes {
    /// Attributes of a cookie that lives for the browser session only
    pub fn session() -> Self {
        Self {
            expires: None,
            ..Self::default()
        }
    }

    pub fn with_domain(&self, domain: impl Into<String>) -> Self {
        Self {
            domain: Some(domain.into()),
            ..self.clone()
        }
    }

    pub fn with_path(&self, path: impl Into<String>) -> Self {
        Self {
            path: Some(path.into()),
            ..self.clone()
        }
    }

    /// Copy of these attributes with an expiry in the past, used for removal
    pub fn expired(&self) -> Self {
        Self {
            expires: Some(Expiry::Days(-1)),
            ..self.clone()
        }
    }

    /// Path the cookie is scoped to (`/` when unset)
    pub fn effective_path(&self) -> &str {
        self.path.as_deref().unwrap_or("/")
    }

    /// Whether a cookie written with these attributes is already expired at `now`
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires
            .map(|e| e.resolve(now) <= now)
            .unwrap_or(false)
    }

    /// Render as the attribute suffix of a cookie write, e.g. `; path=/; secure`
    pub fn to_cookie_suffix(&self, now: DateTime<Utc>) -> String {
        let mut out = String::new();
        if let Some(expires) = &self.expires {
            let at = expires.resolve(now);
            out.push_str("; expires=");
            out.push_str(&at.format("%a, %d %b %Y %H:%M:%S GMT").to_string());
        }
        if let Some(path) = &self.path {
            out.push_str("; path=");
            out.push_str(path);
        }
        if let Some(domain) = &self.domain {
            out.push_str("; domain=");
            out.push_str(domain);
        }
        if self.secure {
            out.push_str("; secure");
        }
        if let Some(same_site) = &self.same_site {
            out.push_str("; samesite=");
            out.push_str(same_site.as_str());
        }
        out
    }
}
