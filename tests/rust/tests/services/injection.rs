//! Tests for consent-gated service injection
//!
//! Validates gating, default and custom injectors, runtime registration and
//! the at-most-once guarantee.

use pretty_assertions::assert_eq;
use serde_json::{json, Map, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use haven_core::domain::{ConsentType, Injector, Purpose, ServiceDescriptor, ServiceError};
use haven_core::service::InjectOutcome;
use haven_core::{ConsentManagerBuilder, MemoryCookieJar, ScriptHost};
use tests::events::EventRecorder;
use tests::fixtures::{self, harness, harness_with};
use tests::CountingAdapter;

fn counting_ga() -> Arc<CountingAdapter> {
    Arc::new(CountingAdapter::new("ga", Purpose::analytics(), &["^_ga"]))
}

#[test]
fn disabled_purpose_skips_injection() {
    tests::logging::init();
    let adapter = counting_ga();
    let options = fixtures::options(ConsentType::OptIn)
        .with_service(fixtures::ga_service().with_default_injector());
    let h = harness_with(
        ConsentManagerBuilder::new(options).with_adapter(adapter.clone()),
        MemoryCookieJar::new().with_cookie("hv-analytics", "false"),
    );
    let events = EventRecorder::attach(&h.manager, &["service-loaded"]);

    h.manager.init();

    assert_eq!(adapter.install_count(), 0);
    assert_eq!(events.count("service-loaded"), 0);
    assert!(!h.manager.store().is_injected("ga"));
}

#[test]
fn enabled_purpose_injects_once_with_payload() {
    let adapter = counting_ga();
    let options = fixtures::options(ConsentType::OptIn)
        .with_service(fixtures::ga_service().with_default_injector());
    let h = harness_with(
        ConsentManagerBuilder::new(options).with_adapter(adapter.clone()),
        MemoryCookieJar::new(),
    );
    h.manager.init();
    let events = EventRecorder::attach(&h.manager, &["service-loaded", "services-loaded"]);

    h.manager.cookies().enable_cookies(&Purpose::analytics());

    assert_eq!(adapter.install_count(), 1);
    assert_eq!(adapter.last_id.lock().as_deref(), Some("UA-0000-1"));
    assert_eq!(events.payloads("service-loaded"), vec![Some("ga".to_string())]);
    assert_eq!(events.names(), vec!["service-loaded", "services-loaded"]);
}

#[test]
fn returning_visitor_services_load_at_init() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let options = fixtures::options(ConsentType::OptIn).with_service(
        ServiceDescriptor::new("pixel")
            .with_purposes(["marketing"])
            .with_injector(Injector::custom(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            })),
    );
    let h = harness(options, MemoryCookieJar::new().with_cookie("hv-marketing", "true"));

    h.manager.init();
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(h.manager.store().is_injected("pixel"));
}

#[test]
fn opt_out_loads_services_without_any_cookie() {
    let h = harness(
        fixtures::options(ConsentType::OptOut).with_service(
            ServiceDescriptor::new("google-tag-manager")
                .with_purposes(["analytics"])
                .with_default_injector()
                .with_id("GTM-TEST"),
        ),
        MemoryCookieJar::new(),
    );

    h.manager.init();
    assert_eq!(
        h.host.scripts(),
        vec!["https://www.googletagmanager.com/gtm.js?id=GTM-TEST".to_string()]
    );
    assert!(h.host.global("dataLayer").is_some());
}

#[test]
fn opt_out_functional_service_waits_for_a_decision() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let h = harness(
        fixtures::options(ConsentType::OptOut).with_service(
            ServiceDescriptor::new("chat")
                .with_purposes(["functional"])
                .with_injector(Injector::custom(move |_| {
                    counter.fetch_add(1, Ordering::SeqCst);
                })),
        ),
        MemoryCookieJar::new(),
    );

    h.manager.init();
    assert!(!h.manager.cookies().has_functional_cookie());
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert!(!h.manager.store().is_injected("chat"));

    // Declining still records functional consent
    h.manager.decline_all();
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn multi_purpose_service_waits_for_every_purpose() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let options = fixtures::options(ConsentType::OptIn).with_service(
        ServiceDescriptor::new("retargeting")
            .with_purposes(["analytics", "marketing"])
            .with_injector(Injector::custom(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            })),
    );
    let h = harness(options, MemoryCookieJar::new());
    h.manager.init();

    h.manager.cookies().enable_cookies(&Purpose::analytics());
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    h.manager.cookies().enable_cookies(&Purpose::marketing());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn toggling_consent_never_reinjects() {
    let adapter = counting_ga();
    let options = fixtures::options(ConsentType::OptIn)
        .with_service(fixtures::ga_service().with_default_injector());
    let h = harness_with(
        ConsentManagerBuilder::new(options).with_adapter(adapter.clone()),
        MemoryCookieJar::new(),
    );
    h.manager.init();
    // The initial replay already revoked analytics once
    let teardowns = adapter.teardown_count();

    let cookies = h.manager.cookies();
    cookies.enable_cookies(&Purpose::analytics());
    cookies.disable_cookies(&Purpose::analytics());
    cookies.enable_cookies(&Purpose::analytics());
    h.manager.accept_all();

    assert_eq!(adapter.install_count(), 1);
    assert_eq!(adapter.teardown_count(), teardowns + 1);
}

#[test]
fn unknown_default_injector_is_skipped() {
    let h = harness(
        fixtures::options(ConsentType::OptIn).with_service(
            ServiceDescriptor::new("matomo")
                .with_purposes(["analytics"])
                .with_default_injector(),
        ),
        MemoryCookieJar::new(),
    );
    h.manager.init();
    let events = EventRecorder::attach(&h.manager, &["service-loaded", "services-loaded"]);

    h.manager.cookies().enable_cookies(&Purpose::analytics());

    assert_eq!(events.names(), vec!["services-loaded"]);
    assert!(!h.manager.store().is_injected("matomo"));
}

#[test]
fn auto_inject_list_limits_passes() {
    let h = harness(
        fixtures::options(ConsentType::OptIn)
            .with_service(
                ServiceDescriptor::new("google-analytics")
                    .with_purposes(["analytics"])
                    .with_default_injector()
                    .with_id("UA-1"),
            )
            .with_service(
                ServiceDescriptor::new("facebook-pixel")
                    .with_purposes(["analytics"])
                    .with_default_injector()
                    .with_id("42"),
            )
            .with_auto_inject("facebook-pixel"),
        MemoryCookieJar::new(),
    );
    h.manager.init();
    h.manager.cookies().enable_cookies(&Purpose::analytics());

    assert!(h.manager.store().is_injected("facebook-pixel"));
    assert!(!h.manager.store().is_injected("google-analytics"));
    assert!(h.host.global("ga").is_none());
}

#[test]
fn runtime_registration_injects_when_consented() {
    let h = harness(
        fixtures::options(ConsentType::OptIn),
        MemoryCookieJar::new().with_cookie("hv-marketing", "true"),
    );
    h.manager.init();
    let events = EventRecorder::attach(&h.manager, &["service-loaded"]);

    let mut options = Map::new();
    options.insert("id".to_string(), Value::from("123456789"));
    let outcome = h
        .manager
        .register_service(
            "facebook-pixel",
            vec![Purpose::marketing()],
            Injector::Default("facebook-pixel".to_string()),
            options,
        )
        .unwrap();

    assert_eq!(outcome, InjectOutcome::Injected);
    assert_eq!(events.payloads("service-loaded"), vec![Some("facebook-pixel".to_string())]);
    assert_eq!(
        h.host.global("fbq"),
        Some(json!([["init", "123456789"], ["track", "PageView"]]))
    );
    assert!(h.manager.options().service("facebook-pixel").is_some());
}

#[test]
fn runtime_registration_waits_for_consent() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let h = harness(fixtures::options(ConsentType::OptIn), MemoryCookieJar::new());
    h.manager.init();

    let outcome = h
        .manager
        .register_descriptor(
            ServiceDescriptor::new("chat")
                .with_purposes(["analytics"])
                .with_injector(Injector::custom(move |_| {
                    counter.fetch_add(1, Ordering::SeqCst);
                })),
        )
        .unwrap();
    assert_eq!(outcome, InjectOutcome::NotConsented);

    // Registered services join later injection passes
    h.manager.cookies().enable_cookies(&Purpose::analytics());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn runtime_registration_rejects_invalid_services() {
    let h = harness(
        fixtures::options(ConsentType::OptIn).with_service(fixtures::ga_service()),
        MemoryCookieJar::new(),
    );
    h.manager.init();

    let dup = h
        .manager
        .register_service("ga", vec![Purpose::analytics()], Injector::None, Map::new());
    assert_eq!(dup, Err(ServiceError::Duplicate("ga".to_string())));

    let unknown = h.manager.register_service(
        "widget",
        vec![Purpose::new("social")],
        Injector::None,
        Map::new(),
    );
    assert!(matches!(unknown, Err(ServiceError::UnknownPurpose { .. })));
    assert_eq!(h.manager.options().services.len(), 1);
}
