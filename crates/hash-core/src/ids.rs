//! Session identifiers.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Longest token accepted from an upstream caller.
const MAX_TOKEN_LEN: usize = 128;

/// Opaque token identifying one downstream stream.
///
/// Minted once per connection and never reused within a process run.
#[derive(Clone, Debug, Hash, Eq, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Mint a fresh, time-ordered id.
    pub fn new() -> Self {
        Self(format!("sess_{}", Uuid::now_v7().simple()))
    }

    /// Parse a caller-supplied token.
    ///
    /// Returns `None` unless the token is non-empty, at most 128 bytes and
    /// made only of ASCII alphanumerics, `-` and `_`.
    pub fn parse(raw: &str) -> Option<Self> {
        is_well_formed(raw).then(|| Self(raw.to_owned()))
    }

    /// Wrap a raw string without validation.
    pub fn from_raw(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Borrow the token.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for SessionId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

fn is_well_formed(raw: &str) -> bool {
    !raw.is_empty()
        && raw.len() <= MAX_TOKEN_LEN
        && raw
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}
