// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Subscription tokens and their allocator.

use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};

/// Textual prefix of a rendered token.
const TOKEN_PREFIX: &str = "uid_";

/// Opaque identifier for exactly one subscription.
///
/// Tokens are issued in increasing order from one process-wide counter and
/// are never reused, even after the subscription is removed or its bus is
/// cleared. A token from one bus never names a subscription on another. Removing a token twice is harmless: the second attempt simply
/// finds nothing.
///
/// A token renders as `uid_<n>` and parses back from that form, so it can
/// round-trip through scripts or configuration.
///
/// # Examples
///
/// ```
/// use topicbus::SubscriptionToken;
///
/// let token: SubscriptionToken = "uid_12".parse().unwrap();
/// assert_eq!(token.value(), 12);
/// assert_eq!(token.to_string(), "uid_12");
/// assert!("vehicle.charge".parse::<SubscriptionToken>().is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionToken(u64);

impl SubscriptionToken {
    /// Creates a token with the given value.
    #[must_use]
    pub(crate) fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw token value.
    #[must_use]
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for SubscriptionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{TOKEN_PREFIX}{}", self.0)
    }
}

/// The string is not a rendered [`SubscriptionToken`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("not a subscription token: {0}")]
pub struct ParseTokenError(String);

impl FromStr for SubscriptionToken {
    type Err = ParseTokenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.strip_prefix(TOKEN_PREFIX)
            .filter(|digits| digits.bytes().all(|b| b.is_ascii_digit()))
            .and_then(|digits| digits.parse().ok())
            .map(Self)
            .ok_or_else(|| ParseTokenError(s.to_string()))
    }
}

/// Next token value, shared by every bus in the process.
static NEXT_TOKEN: AtomicU64 = AtomicU64::new(0);

/// Returns a token that has never been issued in this process.
pub(crate) fn next_token() -> SubscriptionToken {
    SubscriptionToken::new(NEXT_TOKEN.fetch_add(1, Ordering::Relaxed))
}
