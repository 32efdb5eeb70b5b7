//! Cookie string codec
//!
//! Encodes cookie writes (`name=value; path=/; ...`) and decodes the
//! `name=value; name2=value2` strings a browser hands back. Names and values
//! are percent-encoded except for the characters RFC 6265 lets through
//! unescaped, matching what the common browser cookie libraries produce.

use chrono::{DateTime, Utc};
use lazy_static::lazy_static;
use regex::{Captures, Regex};
use std::borrow::Cow;

use super::CookieAttributes;

lazy_static! {
    static ref PERCENT_ESCAPE: Regex = Regex::new(r"%[0-9A-Fa-f]{2}").unwrap();
}

/// Characters left unescaped in cookie values
const VALUE_SAFE: &str = "!#$&'()*+/:<=>?@[]^`{|}";

/// Characters left unescaped in cookie names
const NAME_SAFE: &str = "!#$&'*+^`|";

fn encode_with(input: &str, safe: &str) -> String {
    let encoded = urlencoding::encode(input);
    PERCENT_ESCAPE
        .replace_all(&encoded, |caps: &Captures| {
            let escape = &caps[0];
            match u8::from_str_radix(&escape[1..], 16) {
                Ok(byte) if byte.is_ascii() && safe.contains(byte as char) => {
                    (byte as char).to_string()
                }
                _ => escape.to_string(),
            }
        })
        .into_owned()
}

/// Percent-encode a cookie name
pub fn encode_name(name: &str) -> String {
    encode_with(name, NAME_SAFE)
}

/// Percent-encode a cookie value
pub fn encode_value(value: &str) -> String {
    encode_with(value, VALUE_SAFE)
}

/// Decode a percent-encoded name or value; malformed input is returned as-is
pub fn decode(input: &str) -> String {
    match urlencoding::decode(input) {
        Ok(Cow::Borrowed(s)) => s.to_string(),
        Ok(Cow::Owned(s)) => s,
        Err(_) => input.to_string(),
    }
}

/// Build the string for a single cookie write
pub fn serialize(name: &str, value: &str, attributes: &CookieAttributes, now: DateTime<Utc>) -> String {
    format!(
        "{}={}{}",
        encode_name(name),
        encode_value(value),
        attributes.to_cookie_suffix(now)
    )
}

/// Parse a `document.cookie`-style header into decoded `(name, value)` pairs.
///
/// Pairs without `=` are skipped. When a name occurs more than once the first
/// occurrence wins, which is the most specific cookie in browser order.
pub fn parse_cookie_header(header: &str) -> Vec<(String, String)> {
    let mut cookies: Vec<(String, String)> = Vec::new();

    for pair in header.split(';') {
        let Some((raw_name, raw_value)) = pair.split_once('=') else {
            continue;
        };
        let name = decode(raw_name.trim());
        if name.is_empty() || cookies.iter().any(|(n, _)| *n == name) {
            continue;
        }

        let mut value = raw_value.trim();
        if value.len() >= 2 && value.starts_with('"') && value.ends_with('"') {
            value = &value[1..value.len() - 1];
        }
        cookies.push((name, decode(value)));
    }

    cookies
}
