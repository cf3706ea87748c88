// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Hierarchical topic names.
//!
//! A topic is a period-separated string such as `vehicle.charge.stop`.
//! Topics form an implicit hierarchy: `vehicle.charge.stop` is a descendant
//! of `vehicle.charge` and of `vehicle`. Nothing is declared up front; any
//! non-empty string is a valid topic.
//!
//! # Delivery chain
//!
//! ```text
//! publish("vehicle.charge.stop")
//!        │
//!        ├─► vehicle.charge.stop   (exact)
//!        ├─► vehicle.charge        (truncate at last '.')
//!        ├─► vehicle               (truncate again)
//!        └─► *                     (catch-all)
//! ```
//!
//! Truncation always happens at a `.`, so `a.bc` is never delivered to the
//! subscribers of `a.b`. Subscribers of [`CATCH_ALL`] receive every publish
//! after the rest of the chain.

use std::fmt;

use crate::config::PrefixMatch;
use crate::error::TopicError;

/// Separator between topic segments.
pub const SEPARATOR: char = '.';

/// Topic whose subscribers receive every publish.
pub const CATCH_ALL: &str = "*";

/// A validated, non-empty topic name.
///
/// # Examples
///
/// ```
/// use topicbus::Topic;
///
/// let topic = Topic::new("vehicle.charge.stop").unwrap();
/// let chain: Vec<&str> = topic.ancestors().collect();
/// assert_eq!(chain, ["vehicle.charge.stop", "vehicle.charge", "vehicle"]);
///
/// assert!(Topic::new("").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Topic(String);

impl Topic {
    /// Creates a topic, rejecting the empty string.
    ///
    /// # Errors
    ///
    /// Returns [`TopicError::Empty`] if `name` is empty.
    pub fn new(name: impl Into<String>) -> Result<Self, TopicError> {
        let name = name.into();
        validate(&name)?;
        Ok(Self(name))
    }

    /// Returns the topic as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the parent topic, or `None` for a single-segment topic.
    #[must_use]
    pub fn parent(&self) -> Option<&str> {
        parent(&self.0)
    }

    /// Iterates the topic itself followed by each of its ancestors.
    pub fn ancestors(&self) -> DeliveryChain<'_> {
        delivery_chain(&self.0)
    }

    /// Returns `true` if this topic lies at or below `prefix`.
    #[must_use]
    pub fn is_under(&self, prefix: &str, mode: PrefixMatch) -> bool {
        is_descendant(&self.0, prefix, mode)
    }

    /// Consumes the topic and returns the inner string.
    #[must_use]
    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Topic {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<&str> for Topic {
    type Error = TopicError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<String> for Topic {
    type Error = TopicError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// Checks that a raw topic string is acceptable.
pub(crate) fn validate(topic: &str) -> Result<(), TopicError> {
    if topic.is_empty() {
        Err(TopicError::Empty)
    } else {
        Ok(())
    }
}

/// Returns everything before the last separator, if there is one.
#[must_use]
pub fn parent(topic: &str) -> Option<&str> {
    topic.rfind(SEPARATOR).map(|pos| &topic[..pos])
}

/// Iterates `topic` and then each truncation at the rightmost separator.
///
/// The empty string is never yielded, even for topics that begin with `.`.
pub fn delivery_chain(topic: &str) -> DeliveryChain<'_> {
    DeliveryChain {
        next: (!topic.is_empty()).then_some(topic),
    }
}

/// Iterator returned by [`delivery_chain`] and [`Topic::ancestors`].
#[derive(Debug, Clone)]
pub struct DeliveryChain<'a> {
    next: Option<&'a str>,
}

impl<'a> Iterator for DeliveryChain<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = parent(current).filter(|p| !p.is_empty());
        Some(current)
    }
}

/// Levels a publish on `topic` reaches: the delivery chain, then
/// [`CATCH_ALL`] unless the chain already ends there.
pub(crate) fn dispatch_levels(topic: &str) -> impl Iterator<Item = &str> {
    let catch_all = (!topic.is_empty() && topic.split(SEPARATOR).next() != Some(CATCH_ALL))
        .then_some(CATCH_ALL);
    delivery_chain(topic).chain(catch_all)
}

/// Returns `true` if `candidate` is selected by `prefix` under `mode`.
///
/// # Examples
///
/// ```
/// use topicbus::PrefixMatch;
/// use topicbus::topic::is_descendant;
///
/// assert!(is_descendant("a.b", "a", PrefixMatch::Segment));
/// assert!(!is_descendant("abc", "a", PrefixMatch::Segment));
/// assert!(is_descendant("abc", "a", PrefixMatch::Raw));
/// assert!(is_descendant("chg.start", "chg.", PrefixMatch::Segment));
/// ```
#[must_use]
pub fn is_descendant(candidate: &str, prefix: &str, mode: PrefixMatch) -> bool {
    match mode {
        PrefixMatch::Raw => candidate.starts_with(prefix),
        PrefixMatch::Segment => {
            let Some(rest) = candidate.strip_prefix(prefix) else {
                return false;
            };
            rest.is_empty() || prefix.ends_with(SEPARATOR) || rest.starts_with(SEPARATOR)
        }
    }
}
