// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for the topic bus.
//!
//! Most bus outcomes are not errors: publishing to a topic nobody listens to
//! returns `Ok(false)`, and removing an unknown subscription reports
//! [`Unsubscribed::NotFound`](crate::Unsubscribed::NotFound). The errors here
//! cover invalid topics, subscriber faults surfaced by `publish`, and
//! configuration loading.

use thiserror::Error;

use crate::subscription::SubscriptionToken;

/// Boxed error type a subscriber may attach as the cause of its failure.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// The main error type for this library.
#[derive(Debug, Error)]
pub enum Error {
    /// The topic string was rejected.
    #[error("topic error: {0}")]
    Topic(#[from] TopicError),

    /// A subscriber failed while a message was being delivered.
    ///
    /// Only produced under [`FaultPolicy::Propagate`](crate::FaultPolicy::Propagate).
    /// Subscribers after the failing one did not receive the message.
    #[error("subscriber {token} failed on topic '{topic}': {source}")]
    Subscriber {
        /// The full topic that was being published.
        topic: String,
        /// The subscription whose callback failed.
        token: SubscriptionToken,
        /// The failure reported by the callback.
        #[source]
        source: SubscriberError,
    },

    /// Bus configuration could not be loaded.
    #[error("config error: {0}")]
    Config(#[from] serde_json::Error),
}

/// Errors related to topic validation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TopicError {
    /// Topics must contain at least one character.
    #[error("topic must not be empty")]
    Empty,
}

/// Failure reported by a subscriber callback.
///
/// # Examples
///
/// ```
/// use topicbus::SubscriberError;
///
/// let err = SubscriberError::new("GPIO write failed");
/// assert_eq!(err.to_string(), "GPIO write failed");
/// ```
#[derive(Debug, Error)]
#[error("{message}")]
pub struct SubscriberError {
    message: String,
    #[source]
    source: Option<BoxError>,
}

impl SubscriberError {
    /// Creates an error with the given message.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    /// Creates an error that wraps an underlying cause.
    #[must_use]
    pub fn with_source(message: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Returns the error message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<String> for SubscriberError {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}

impl From<&str> for SubscriberError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

/// A specialized Result type for this library.
pub type Result<T> = std::result::Result<T, Error>;
