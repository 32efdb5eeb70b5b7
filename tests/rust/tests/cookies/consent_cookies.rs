//! Tests for CookieManager consent semantics
//!
//! Validates opt-in/opt-out defaults, bulk operations and event emission.

use parking_lot::Mutex;
use pretty_assertions::assert_eq;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use haven_core::cookies::{CookieManager, MemoryCookieJar};
use haven_core::domain::{ConfigurationResolver, ConsentOptions, ConsentType, Purpose};
use haven_core::event_bus::{EventBus, Subscription};
use tests::events::EventRecorder;
use tests::fixtures;

fn make_manager(consent_type: ConsentType, jar: Arc<MemoryCookieJar>) -> (CookieManager, EventBus) {
    let config = ConfigurationResolver::resolve(fixtures::options(consent_type)).unwrap();
    let bus = EventBus::new();
    (CookieManager::new(&config, jar, bus.clone()), bus)
}

#[test]
fn opt_in_enable_writes_cookie_and_emits_once() {
    let jar = Arc::new(MemoryCookieJar::new());
    let (cookies, bus) = make_manager(ConsentType::OptIn, jar.clone());
    let events = EventRecorder::attach_bus(&bus, &["analytics-enabled", "analytics-disabled"]);

    assert!(!cookies.has_cookies_enabled(&Purpose::analytics()));
    cookies.enable_cookies(&Purpose::analytics());

    assert_eq!(cookies.get_cookie("hv-analytics").as_deref(), Some("true"));
    assert!(cookies.has_cookies_enabled(&Purpose::analytics()));
    assert_eq!(events.names(), vec!["analytics-enabled"]);
    assert_eq!(events.payloads("analytics-enabled"), vec![None]);
}

#[test]
fn opt_out_defaults_to_allowed_until_disabled() {
    let jar = Arc::new(MemoryCookieJar::new());
    let (cookies, _bus) = make_manager(ConsentType::OptOut, jar);

    assert!(cookies.has_cookies_enabled(&Purpose::analytics()));
    cookies.disable_cookies(&Purpose::analytics());
    assert!(!cookies.has_cookies_enabled(&Purpose::analytics()));
    assert_eq!(cookies.get_cookie("hv-analytics").as_deref(), Some("false"));
}

#[test]
fn opt_in_rejects_anything_but_true() {
    let jar = Arc::new(
        MemoryCookieJar::new()
            .with_cookie("hv-analytics", "TRUE")
            .with_cookie("hv-marketing", "yes"),
    );
    let (cookies, _bus) = make_manager(ConsentType::OptIn, jar);

    assert!(!cookies.has_cookies_enabled(&Purpose::analytics()));
    assert!(!cookies.has_cookies_enabled(&Purpose::marketing()));
}

#[test]
fn bulk_enable_and_disable() {
    let jar = Arc::new(MemoryCookieJar::new());
    let (cookies, bus) = make_manager(ConsentType::OptIn, jar);
    let all = cookies.purposes().to_vec();
    let events = EventRecorder::attach_bus(
        &bus,
        &["functional-enabled", "analytics-disabled", "marketing-disabled"],
    );

    cookies.enable_all_cookies();
    assert!(cookies.has_all_necessary_cookies_enabled(&all));
    assert!(cookies.has_functional_cookie());

    cookies.disable_all_cookies();
    assert!(!cookies.has_all_necessary_cookies_enabled(&all));
    // Functional consent survives a bulk disable
    assert!(cookies.has_functional_cookie());
    assert_eq!(
        events.names(),
        vec!["functional-enabled", "analytics-disabled", "marketing-disabled"]
    );
}

#[test]
fn all_cookies_set_ignores_values() {
    let jar = Arc::new(MemoryCookieJar::new().with_cookie("hv-analytics", "false"));
    let (cookies, _bus) = make_manager(ConsentType::OptIn, jar);
    assert!(!cookies.has_all_cookies_set());

    cookies.set_cookies_default();
    assert!(cookies.has_all_cookies_set());
    assert_eq!(cookies.get_cookie("hv-marketing").as_deref(), Some("false"));
}

#[test]
fn empty_purpose_set_is_satisfied() {
    let jar = Arc::new(MemoryCookieJar::new());
    let (cookies, _bus) = make_manager(ConsentType::OptIn, jar);
    assert!(cookies.has_all_necessary_cookies_enabled(&[]));
}

#[test]
fn unsubscribe_during_dispatch_stops_later_listener() {
    let jar = Arc::new(MemoryCookieJar::new());
    let (cookies, bus) = make_manager(ConsentType::OptIn, jar);

    let slot: Arc<Mutex<Option<Subscription>>> = Arc::new(Mutex::new(None));
    let to_cancel = slot.clone();
    bus.subscribe("analytics-enabled", move |_| {
        if let Some(sub) = to_cancel.lock().take() {
            sub.unsubscribe();
        }
        Ok(())
    });

    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let sub = bus.subscribe("analytics-enabled", move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(())
    });
    *slot.lock() = Some(sub);

    cookies.enable_cookies(&Purpose::analytics());
    cookies.enable_cookies(&Purpose::analytics());
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert_eq!(bus.subscriber_count("analytics-enabled"), 1);
}

#[test]
fn options_from_json_drive_cookie_names() {
    let options = ConsentOptions::from_json(r#"{ "prefix": "site", "purposes": ["statistics"] }"#).unwrap();
    let config = ConfigurationResolver::resolve(options).unwrap();
    let jar = Arc::new(MemoryCookieJar::new());
    let cookies = CookieManager::new(&config, jar.clone(), EventBus::new());

    cookies.enable_cookies(&Purpose::new("statistics"));
    assert_eq!(jar.cookies()[0].name, "site-statistics");
}
