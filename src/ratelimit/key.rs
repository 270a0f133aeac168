//! Request key derivation.

use std::fmt;

/// A key that identifies one independently counted stream of requests.
///
/// The key is the pair of client identity and request path. It is kept as a
/// structured tuple so that no choice of separator can make two distinct pairs
/// collide.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestKey {
    /// The client identity, usually an IP address
    pub client: String,
    /// The request path
    pub path: String,
}

impl RequestKey {
    /// Create a new request key from a client identity and a path.
    pub fn new(client: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            client: client.into(),
            path: path.into(),
        }
    }
}

/// Renders `client:path`. Only meant for logging.
impl fmt::Display for RequestKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.client, self.path)
    }
}
