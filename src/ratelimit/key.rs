//! Client identity keys.

use std::fmt;

use http::HeaderMap;

/// Key used when no client address can be determined.
pub const UNKNOWN_CLIENT: &str = "unknown";

/// Derives the identity a request is counted against.
pub trait KeyGenerator: Send + Sync {
    /// The key for a request with these headers.
    fn key(&self, headers: &HeaderMap) -> String;
}

/// Keys requests by client address.
///
/// Uses the first entry of `X-Forwarded-For` (the originating client when
/// behind proxies), then `X-Real-IP`, and finally [`UNKNOWN_CLIENT`].
#[derive(Debug, Default, Clone, Copy)]
pub struct ClientAddressKey;

impl KeyGenerator for ClientAddressKey {
    fn key(&self, headers: &HeaderMap) -> String {
        forwarded_for(headers)
            .or_else(|| header_str(headers, "x-real-ip"))
            .map_or_else(|| UNKNOWN_CLIENT.to_string(), str::to_string)
    }
}

/// Adapts a closure into a [`KeyGenerator`].
pub struct KeyFn<F>(pub F);

impl<F> KeyGenerator for KeyFn<F>
where
    F: Fn(&HeaderMap) -> String + Send + Sync,
{
    fn key(&self, headers: &HeaderMap) -> String {
        (self.0)(headers)
    }
}

impl<F> fmt::Debug for KeyFn<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("KeyFn(..)")
    }
}

fn forwarded_for(headers: &HeaderMap) -> Option<&str> {
    header_str(headers, "x-forwarded-for")?
        .split(',')
        .map(str::trim)
        .find(|entry| !entry.is_empty())
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
}
