// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Topic registry: topic → token → subscriber.

use std::collections::{BTreeMap, HashMap};

use crate::config::PrefixMatch;
use crate::subscription::{Subscriber, SubscriptionToken};
use crate::topic;

/// One stored subscription.
struct Registration<T> {
    subscriber: Subscriber<T>,
    owner: Option<String>,
}

/// Subscriptions of one topic, ordered by token (and so by registration).
type TopicSubscribers<T> = BTreeMap<SubscriptionToken, Registration<T>>;

/// Storage for every live subscription of a bus.
///
/// The registry itself is not synchronized; [`PubSub`](crate::PubSub) wraps
/// it in a lock. Topics whose last subscription is removed are pruned, and
/// every query also ignores empty entries, so an empty topic is never
/// observable.
pub(crate) struct TopicRegistry<T> {
    topics: HashMap<String, TopicSubscribers<T>>,
}

impl<T> TopicRegistry<T> {
    pub(crate) fn new() -> Self {
        Self {
            topics: HashMap::new(),
        }
    }

    pub(crate) fn insert(
        &mut self,
        topic: &str,
        token: SubscriptionToken,
        subscriber: Subscriber<T>,
    ) {
        self.insert_owned(topic, token, subscriber, None);
    }

    /// Stores a subscription tagged with `owner`, if any.
    pub(crate) fn insert_owned(
        &mut self,
        topic: &str,
        token: SubscriptionToken,
        subscriber: Subscriber<T>,
        owner: Option<&str>,
    ) {
        self.topics.entry(topic.to_string()).or_default().insert(
            token,
            Registration {
                subscriber,
                owner: owner.map(str::to_string),
            },
        );
    }

    /// Returns `true` if `topic` itself has at least one subscription.
    pub(crate) fn has_direct(&self, topic: &str) -> bool {
        self.topics.get(topic).is_some_and(|subs| !subs.is_empty())
    }

    /// Returns `true` if a publish on `topic` would reach any subscription,
    /// catch-all included.
    pub(crate) fn has_subscribers(&self, topic: &str) -> bool {
        topic::dispatch_levels(topic).any(|level| self.has_direct(level))
    }

    /// Returns `true` if any live topic is selected by `prefix`.
    pub(crate) fn has_match(&self, prefix: &str, mode: PrefixMatch) -> bool {
        self.topics
            .iter()
            .any(|(name, subs)| !subs.is_empty() && topic::is_descendant(name, prefix, mode))
    }

    /// Copies the subscribers of exactly `topic`, in registration order.
    pub(crate) fn snapshot(&self, topic: &str) -> Vec<(SubscriptionToken, Subscriber<T>)> {
        self.topics
            .get(topic)
            .map(|subs| {
                subs.iter()
                    .map(|(token, reg)| (*token, reg.subscriber.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Drops every topic selected by `prefix`.
    ///
    /// Returns the number of topics that still had subscriptions.
    pub(crate) fn remove_matching(&mut self, prefix: &str, mode: PrefixMatch) -> usize {
        let mut removed = 0;
        self.topics.retain(|name, subs| {
            if topic::is_descendant(name, prefix, mode) {
                if !subs.is_empty() {
                    removed += 1;
                }
                false
            } else {
                true
            }
        });
        removed
    }

    /// Removes the subscription with `token`, returning its topic.
    pub(crate) fn remove_token(&mut self, token: SubscriptionToken) -> Option<String> {
        let topic = self
            .topics
            .iter()
            .find(|(_, subs)| subs.contains_key(&token))
            .map(|(name, _)| name.clone())?;
        if let Some(subs) = self.topics.get_mut(&topic) {
            subs.remove(&token);
            if subs.is_empty() {
                self.topics.remove(&topic);
            }
        }
        Some(topic)
    }

    /// Removes every registration of `subscriber` on any topic.
    pub(crate) fn remove_subscriber(&mut self, subscriber: &Subscriber<T>) -> usize {
        self.remove_where(|reg| reg.subscriber.same_as(subscriber))
    }

    /// Removes every registration tagged with `owner`.
    pub(crate) fn remove_owner(&mut self, owner: &str) -> usize {
        self.remove_where(|reg| reg.owner.as_deref() == Some(owner))
    }

    pub(crate) fn clear(&mut self) {
        self.topics.clear();
    }

    /// Total number of live subscriptions.
    pub(crate) fn subscription_count(&self) -> usize {
        self.topics.values().map(BTreeMap::len).sum()
    }

    /// Number of topics with at least one subscription.
    pub(crate) fn topic_count(&self) -> usize {
        self.topics.values().filter(|subs| !subs.is_empty()).count()
    }

    /// Names of topics with at least one subscription, sorted.
    pub(crate) fn topics(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .topics
            .iter()
            .filter(|(_, subs)| !subs.is_empty())
            .map(|(name, _)| name.clone())
            .collect();
        names.sort();
        names
    }

    /// Removes registrations selected by `pred` on every topic and prunes
    /// topics left empty. Returns how many were removed.
    fn remove_where(&mut self, pred: impl Fn(&Registration<T>) -> bool) -> usize {
        let mut removed = 0;
        self.topics.retain(|_, subs| {
            let before = subs.len();
            subs.retain(|_, reg| !pred(reg));
            removed += before - subs.len();
            !subs.is_empty()
        });
        removed
    }
}
