//! Client identity extraction.

use axum::http::HeaderMap;
use std::net::IpAddr;

/// Header carrying the proxy chain of client addresses.
pub const X_FORWARDED_FOR: &str = "x-forwarded-for";

const IPV6_LOOPBACK: &str = "::1";
const IPV4_LOOPBACK: &str = "127.0.0.1";

/// How a client identity is derived from a request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IdentityPolicy {
    /// Trim whitespace around the first forwarded entry.
    ///
    /// Off by default: `"a, b"` yields `"a"` either way, but `" a,b"` only
    /// yields `"a"` with trimming enabled.
    pub trim_forwarded_for: bool,
}

/// Derive the client identity for a request.
///
/// The first comma-separated entry of `X-Forwarded-For` wins when the header
/// is present; otherwise the transport peer address is used. The IPv6
/// loopback literal is folded into its IPv4 form so that a local client has a
/// single identity. Without either source the identity is the empty string.
pub fn client_identity(headers: &HeaderMap, peer: Option<IpAddr>, policy: IdentityPolicy) -> String {
    let forwarded = headers
        .get(X_FORWARDED_FOR)
        .and_then(|value| value.to_str().ok())
        .map(|value| {
            let first = value.split(',').next().unwrap_or_default();
            if policy.trim_forwarded_for {
                first.trim()
            } else {
                first
            }
        });

    let identity = match forwarded {
        Some(first) => first.to_string(),
        None => peer.map(|ip| ip.to_string()).unwrap_or_default(),
    };

    normalize_loopback(identity)
}

fn normalize_loopback(identity: String) -> String {
    if identity == IPV6_LOOPBACK {
        IPV4_LOOPBACK.to_string()
    } else {
        identity
    }
}
