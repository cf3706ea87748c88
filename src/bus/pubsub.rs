// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The publish/subscribe bus.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

use super::registry::TopicRegistry;
use crate::config::{BusConfig, FaultPolicy};
use crate::error::{Error, Result};
use crate::subscription::{
    Subscriber, SubscriptionToken, UnsubscribeTarget, Unsubscribed, next_token,
};
use crate::topic;

/// Topics under this prefix are left out of event tracing.
const TICKER_PREFIX: &str = "ticker.";

/// Hierarchical topic bus with synchronous delivery.
///
/// `publish("a.b.c", data)` invokes the subscribers of `a.b.c`, then those of
/// `a.b`, then those of `a`. Within one topic, subscribers run in the order
/// they subscribed. Every subscriber receives the full published topic, not
/// the level it matched on.
///
/// # Re-entrancy
///
/// No lock is held while a callback runs, so callbacks may subscribe,
/// unsubscribe or publish on the same bus. Each topic level is snapshotted
/// right before its subscribers are invoked: changes to a level made while
/// that level is being delivered take effect from the next publish.
///
/// # Faults
///
/// See [`FaultPolicy`]. Under the default `Propagate` policy the first
/// failing subscriber stops delivery for the rest of that publish.
///
/// # Examples
///
/// ```
/// use serde_json::json;
/// use topicbus::{PubSub, Subscriber};
///
/// # fn main() -> topicbus::Result<()> {
/// let bus = PubSub::new();
/// let charge = Subscriber::new(|topic, data: &serde_json::Value| {
///     println!("{topic}: {data}");
/// });
/// bus.subscribe("vehicle.charge", &charge)?;
///
/// assert!(bus.publish("vehicle.charge.stop", &json!({"soc": 80}))?);
/// assert!(!bus.publish("vehicle.on", &json!(null))?);
/// # Ok(())
/// # }
/// ```
pub struct PubSub<T = serde_json::Value> {
    config: BusConfig,
    registry: RwLock<TopicRegistry<T>>,
}

impl<T> PubSub<T> {
    /// Creates an empty bus with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(BusConfig::default())
    }

    /// Creates an empty bus with the given configuration.
    #[must_use]
    pub fn with_config(config: BusConfig) -> Self {
        Self {
            config,
            registry: RwLock::new(TopicRegistry::new()),
        }
    }

    /// Returns the bus configuration.
    #[must_use]
    pub fn config(&self) -> &BusConfig {
        &self.config
    }

    // =========================================================================
    // Subscription
    // =========================================================================

    /// Registers `subscriber` for `topic` and everything below it.
    ///
    /// Subscribing the same handle twice creates two independent
    /// subscriptions, each with its own token, and both fire.
    ///
    /// # Errors
    ///
    /// Returns [`TopicError::Empty`](crate::TopicError::Empty) for an empty
    /// topic; nothing is registered in that case.
    pub fn subscribe(&self, topic: &str, subscriber: &Subscriber<T>) -> Result<SubscriptionToken> {
        topic::validate(topic)?;
        let token = next_token();
        self.registry.write().insert(topic, token, subscriber.clone());
        tracing::debug!(topic = %topic, token = %token, "Subscribed");
        Ok(token)
    }

    /// Registers `subscriber` for `topic` on behalf of `owner`.
    ///
    /// Everything registered under one owner, a plugin for instance, can be
    /// removed at once with [`unsubscribe_owner`](Self::unsubscribe_owner).
    ///
    /// # Errors
    ///
    /// Returns [`TopicError::Empty`](crate::TopicError::Empty) for an empty topic.
    pub fn subscribe_owned(
        &self,
        owner: &str,
        topic: &str,
        subscriber: &Subscriber<T>,
    ) -> Result<SubscriptionToken> {
        topic::validate(topic)?;
        let token = next_token();
        self.registry
            .write()
            .insert_owned(topic, token, subscriber.clone(), Some(owner));
        tracing::debug!(owner = %owner, topic = %topic, token = %token, "Subscribed");
        Ok(token)
    }

    /// Wraps `callback` in a new [`Subscriber`] and registers it.
    ///
    /// The returned handle can later be passed to
    /// [`unsubscribe_callback`](Self::unsubscribe_callback).
    ///
    /// # Errors
    ///
    /// Returns [`TopicError::Empty`](crate::TopicError::Empty) for an empty topic.
    pub fn subscribe_fn<F>(
        &self,
        topic: &str,
        callback: F,
    ) -> Result<(SubscriptionToken, Subscriber<T>)>
    where
        F: Fn(&str, &T) + Send + Sync + 'static,
    {
        let subscriber = Subscriber::new(callback);
        let token = self.subscribe(topic, &subscriber)?;
        Ok((token, subscriber))
    }

    /// Registers `callback` for a single delivery.
    ///
    /// The subscription removes itself before the callback runs, so a
    /// re-entrant publish from inside the callback does not reach it again.
    ///
    /// # Errors
    ///
    /// Returns [`TopicError::Empty`](crate::TopicError::Empty) for an empty topic.
    pub fn subscribe_once<F>(self: &Arc<Self>, topic: &str, callback: F) -> Result<SubscriptionToken>
    where
        F: Fn(&str, &T) + Send + Sync + 'static,
        T: 'static,
    {
        topic::validate(topic)?;

        // The token exists before the subscription is visible to publishers.
        let token = next_token();
        let bus = Arc::downgrade(self);
        let fired = AtomicBool::new(false);
        let subscriber = Subscriber::new(move |topic: &str, data: &T| {
            if fired.swap(true, Ordering::AcqRel) {
                return;
            }
            if let Some(bus) = bus.upgrade() {
                let _ = bus.unsubscribe_token(token);
            }
            callback(topic, data);
        });

        self.registry.write().insert(topic, token, subscriber);
        tracing::debug!(topic = %topic, token = %token, "Subscribed once");
        Ok(token)
    }

    // =========================================================================
    // Publishing
    // =========================================================================

    /// Delivers `data` to the subscribers of `topic`, of its ancestors, and
    /// of the catch-all topic [`CATCH_ALL`](crate::topic::CATCH_ALL).
    ///
    /// Returns `Ok(true)` if any subscriber existed anywhere in the chain and
    /// `Ok(false)` otherwise, in which case no callback runs.
    ///
    /// # Errors
    ///
    /// - [`TopicError::Empty`](crate::TopicError::Empty) for an empty topic.
    /// - [`Error::Subscriber`] under [`FaultPolicy::Propagate`] when a
    ///   subscriber fails; subscribers after it were not invoked.
    pub fn publish(&self, topic: &str, data: &T) -> Result<bool> {
        topic::validate(topic)?;

        if self.config.trace_events && !topic.starts_with(TICKER_PREFIX) {
            tracing::info!(topic = %topic, "Signal");
        }

        if !self.registry.read().has_subscribers(topic) {
            tracing::trace!(topic = %topic, "No subscribers");
            return Ok(false);
        }

        for level in topic::dispatch_levels(topic) {
            let subscribers = self.registry.read().snapshot(level);
            if subscribers.is_empty() {
                continue;
            }
            tracing::trace!(
                topic = %topic,
                level = %level,
                count = subscribers.len(),
                "Delivering to topic level"
            );
            for (token, subscriber) in subscribers {
                self.deliver(topic, data, token, &subscriber)?;
            }
        }

        Ok(true)
    }

    /// Invokes one subscriber according to the fault policy.
    fn deliver(
        &self,
        topic: &str,
        data: &T,
        token: SubscriptionToken,
        subscriber: &Subscriber<T>,
    ) -> Result<()> {
        match self.config.fault_policy {
            FaultPolicy::Propagate => {
                subscriber
                    .call(topic, data)
                    .map_err(|source| Error::Subscriber {
                        topic: topic.to_string(),
                        token,
                        source,
                    })
            }
            FaultPolicy::Isolate => {
                match panic::catch_unwind(AssertUnwindSafe(|| subscriber.call(topic, data))) {
                    Ok(Ok(())) => {}
                    Ok(Err(err)) => {
                        tracing::warn!(
                            topic = %topic,
                            token = %token,
                            error = %err,
                            "Subscriber failed, continuing delivery"
                        );
                    }
                    Err(payload) => {
                        tracing::warn!(
                            topic = %topic,
                            token = %token,
                            panic = %panic_message(payload.as_ref()),
                            "Subscriber panicked, continuing delivery"
                        );
                    }
                }
                Ok(())
            }
        }
    }

    // =========================================================================
    // Unsubscription
    // =========================================================================

    /// Removes subscriptions by token, callback, or topic.
    ///
    /// ```
    /// use topicbus::{PubSub, Unsubscribed};
    ///
    /// # fn main() -> topicbus::Result<()> {
    /// let bus: PubSub<()> = PubSub::new();
    /// let (token, _) = bus.subscribe_fn("config.changed", |_, _| {})?;
    ///
    /// assert_eq!(bus.unsubscribe(token), Unsubscribed::Token(token));
    /// assert_eq!(bus.unsubscribe(token), Unsubscribed::NotFound);
    /// # Ok(())
    /// # }
    /// ```
    pub fn unsubscribe(&self, target: impl Into<UnsubscribeTarget<T>>) -> Unsubscribed {
        match target.into() {
            UnsubscribeTarget::Token(token) => self.unsubscribe_token(token),
            UnsubscribeTarget::Callback(subscriber) => self.unsubscribe_callback(&subscriber),
            UnsubscribeTarget::Topic(prefix) => self.unsubscribe_topic(&prefix),
        }
    }

    /// Removes subscriptions named by a string.
    ///
    /// The string is a topic if some live topic is selected by it as a
    /// prefix (including an exact match); the whole hierarchy is removed.
    /// Otherwise it is tried as a rendered token (`uid_<n>`).
    pub fn unsubscribe_str(&self, value: &str) -> Unsubscribed {
        if !value.is_empty()
            && self
                .registry
                .read()
                .has_match(value, self.config.prefix_match)
        {
            return self.unsubscribe_topic(value);
        }
        match value.parse::<SubscriptionToken>() {
            Ok(token) => self.unsubscribe_token(token),
            Err(_) => Unsubscribed::NotFound,
        }
    }

    /// Removes `prefix` and every topic below it.
    ///
    /// Which topics count as "below" follows [`BusConfig::prefix_match`].
    pub fn unsubscribe_topic(&self, prefix: &str) -> Unsubscribed {
        match self.clear_subscriptions(prefix) {
            0 => Unsubscribed::NotFound,
            topics => Unsubscribed::Topic { topics },
        }
    }

    /// Removes the single subscription identified by `token`.
    pub fn unsubscribe_token(&self, token: SubscriptionToken) -> Unsubscribed {
        match self.registry.write().remove_token(token) {
            Some(topic) => {
                tracing::debug!(topic = %topic, token = %token, "Unsubscribed token");
                Unsubscribed::Token(token)
            }
            None => Unsubscribed::NotFound,
        }
    }

    /// Removes every registration of `subscriber`, on any topic.
    pub fn unsubscribe_callback(&self, subscriber: &Subscriber<T>) -> Unsubscribed {
        match self.registry.write().remove_subscriber(subscriber) {
            0 => Unsubscribed::NotFound,
            removed => {
                tracing::debug!(removed, "Unsubscribed callback");
                Unsubscribed::Callback { removed }
            }
        }
    }

    /// Removes every subscription registered through
    /// [`subscribe_owned`](Self::subscribe_owned) by `owner`, on any topic.
    pub fn unsubscribe_owner(&self, owner: &str) -> Unsubscribed {
        match self.registry.write().remove_owner(owner) {
            0 => Unsubscribed::NotFound,
            removed => {
                tracing::debug!(owner = %owner, removed, "Unsubscribed owner");
                Unsubscribed::Owner { removed }
            }
        }
    }

    /// Removes every topic selected by `prefix`.
    ///
    /// Returns the number of topics removed. An empty prefix selects nothing.
    pub fn clear_subscriptions(&self, prefix: &str) -> usize {
        if prefix.is_empty() {
            return 0;
        }
        let removed = self
            .registry
            .write()
            .remove_matching(prefix, self.config.prefix_match);
        if removed > 0 {
            tracing::debug!(prefix = %prefix, topics = removed, "Cleared topic subscriptions");
        }
        removed
    }

    /// Removes every subscription.
    ///
    /// Tokens issued afterwards still never repeat earlier ones.
    pub fn clear_all_subscriptions(&self) {
        self.registry.write().clear();
        tracing::debug!("Cleared all subscriptions");
    }

    // =========================================================================
    // Statistics
    // =========================================================================

    /// Returns `true` if a publish to `topic` would reach any subscriber.
    #[must_use]
    pub fn has_subscribers(&self, topic: &str) -> bool {
        self.registry.read().has_subscribers(topic)
    }

    /// Returns the total number of live subscriptions.
    #[must_use]
    pub fn subscription_count(&self) -> usize {
        self.registry.read().subscription_count()
    }

    /// Returns the number of topics with at least one subscription.
    #[must_use]
    pub fn topic_count(&self) -> usize {
        self.registry.read().topic_count()
    }

    /// Returns the subscribed topics, sorted.
    #[must_use]
    pub fn topics(&self) -> Vec<String> {
        self.registry.read().topics()
    }

    /// Returns `true` if there are no subscriptions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.subscription_count() == 0
    }
}

impl<T> Default for PubSub<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> std::fmt::Debug for PubSub<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PubSub")
            .field("config", &self.config)
            .field("subscription_count", &self.subscription_count())
            .finish_non_exhaustive()
    }
}

/// Extracts a readable message from a panic payload.
fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&'static str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}
