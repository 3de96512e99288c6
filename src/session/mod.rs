//! Session identification and sticky routing.

use std::net::SocketAddr;

use http::header::COOKIE;
use http::HeaderMap;

pub mod affinity;

pub use affinity::AffinityTable;

pub const SESSION_COOKIE: &str = "session_id";

/// Derives the key used for sticky routing: the `session_id` cookie when it
/// carries a value, otherwise the client's IP address.
pub fn session_id(headers: &HeaderMap, client_addr: Option<SocketAddr>) -> Option<String> {
    session_cookie(headers).or_else(|| client_addr.map(|addr| addr.ip().to_string()))
}

fn session_cookie(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| name.trim() == SESSION_COOKIE)
        .map(|(_, value)| value.trim().trim_matches('"'))
        .filter(|value| !value.is_empty())
        .map(str::to_owned)
}
