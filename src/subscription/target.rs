// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! What to unsubscribe, and what was removed.

use super::{Subscriber, SubscriptionToken};

/// Selects the subscriptions removed by [`PubSub::unsubscribe`](crate::PubSub::unsubscribe).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnsubscribeTarget<T> {
    /// One specific subscription.
    Token(SubscriptionToken),
    /// Every registration of this callback, on any topic.
    Callback(Subscriber<T>),
    /// A topic and all of its descendants.
    Topic(String),
}

impl<T> From<SubscriptionToken> for UnsubscribeTarget<T> {
    fn from(token: SubscriptionToken) -> Self {
        Self::Token(token)
    }
}

impl<T> From<Subscriber<T>> for UnsubscribeTarget<T> {
    fn from(subscriber: Subscriber<T>) -> Self {
        Self::Callback(subscriber)
    }
}

impl<T> From<&Subscriber<T>> for UnsubscribeTarget<T> {
    fn from(subscriber: &Subscriber<T>) -> Self {
        Self::Callback(subscriber.clone())
    }
}

impl<T> From<&str> for UnsubscribeTarget<T> {
    fn from(topic: &str) -> Self {
        Self::Topic(topic.to_string())
    }
}

impl<T> From<String> for UnsubscribeTarget<T> {
    fn from(topic: String) -> Self {
        Self::Topic(topic)
    }
}

/// Outcome of an unsubscribe call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub enum Unsubscribed {
    /// A topic hierarchy was removed.
    Topic {
        /// Number of topics that were dropped from the registry.
        topics: usize,
    },
    /// The subscription with this token was removed.
    Token(SubscriptionToken),
    /// Registrations of a callback were removed.
    Callback {
        /// Number of registrations removed.
        removed: usize,
    },
    /// Registrations made on behalf of an owner were removed.
    Owner {
        /// Number of registrations removed.
        removed: usize,
    },
    /// Nothing matched.
    NotFound,
}

impl Unsubscribed {
    /// Returns `true` if anything was removed.
    #[must_use]
    pub fn is_removed(&self) -> bool {
        !matches!(self, Self::NotFound)
    }
}
