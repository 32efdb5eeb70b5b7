//! Cookie persistence tests
//!
//! Consent cookie semantics and the `document.cookie` backed store.

mod consent_cookies;
mod document_store;
