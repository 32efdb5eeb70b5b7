//! Cookie persistence
//!
//! - `attributes` - domain/path/expiry/secure options for cookie writes
//! - `codec` - encoding of cookie writes and decoding of cookie headers
//! - `store` - the [`CookieStore`] backend trait and its implementations
//! - `manager` - consent persistence on top of a store

mod attributes;
pub mod codec;
mod manager;
mod store;

pub use attributes::{latest_expiry, CookieAttributes, Expiry, SameSite, DEFAULT_EXPIRY_DAYS};
pub use manager::CookieManager;
pub use store::{CookieDocument, CookieStore, DocumentCookieStore, MemoryCookieJar, StoredCookie};
