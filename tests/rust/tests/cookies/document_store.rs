//! Tests for DocumentCookieStore over a browser-like document
//!
//! Validates the raw cookie strings written and how they read back.

use pretty_assertions::assert_eq;
use std::sync::Arc;

use haven_core::cookies::{CookieAttributes, CookieStore, DocumentCookieStore, SameSite};
use haven_core::domain::{ConsentOptions, Purpose};
use haven_core::ConsentManager;
use tests::MockDocument;

#[test]
fn consent_write_carries_configured_attributes() {
    let attributes = CookieAttributes {
        domain: Some("example.com".to_string()),
        secure: true,
        same_site: Some(SameSite::Lax),
        ..CookieAttributes::default()
    };
    let store = Arc::new(DocumentCookieStore::new(MockDocument::new()));
    let manager = ConsentManager::create(
        ConsentOptions::new()
            .with_prefix("hv")
            .with_cookie_attributes(attributes),
        store.clone(),
    )
    .unwrap();

    manager.cookies().enable_cookies(&Purpose::analytics());

    let writes = store.document().writes();
    let last = writes.last().unwrap();
    assert!(last.starts_with("hv-analytics=true; expires="));
    assert!(last.ends_with("; path=/; domain=example.com; secure; samesite=lax"));
    assert_eq!(store.get("hv-analytics").as_deref(), Some("true"));
}

#[test]
fn values_are_encoded_and_decoded() {
    let store = DocumentCookieStore::new(MockDocument::new());
    store.set("note", "a b;c", &CookieAttributes::session());

    assert_eq!(store.document().writes(), vec!["note=a%20b%3Bc; path=/".to_string()]);
    assert_eq!(store.get("note").as_deref(), Some("a b;c"));
}

#[test]
fn remove_expires_cookie_in_matching_scope() {
    let document = MockDocument::new()
        .with_cookie("_ga=GA1.2.3")
        .with_domain_cookie("_ga=GA1.2.3", "example.com");
    let store = DocumentCookieStore::new(document);

    store.remove("_ga", &CookieAttributes::session().with_domain("example.com"));
    assert_eq!(store.document().domains_of("_ga"), vec![None]);

    store.remove("_ga", &CookieAttributes::session());
    assert_eq!(store.get("_ga"), None);
    assert!(store.names().is_empty());
}

#[test]
fn returning_visitor_is_read_from_header() {
    let document = MockDocument::new()
        .with_cookie("hv-functional=true")
        .with_cookie("hv-analytics=true")
        .with_cookie("hv-marketing=false");
    let store = Arc::new(DocumentCookieStore::new(document));
    let manager = ConsentManager::create(ConsentOptions::new().with_prefix("hv"), store.clone()).unwrap();

    assert!(!manager.should_show_notification());
    assert_eq!(manager.store().consent_for(&Purpose::analytics()), Some(true));
    assert_eq!(manager.store().consent_for(&Purpose::marketing()), Some(false));
    // Replay alone never writes consent cookies
    assert!(store.document().writes().iter().all(|w| !w.starts_with("hv-")));
}
