// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Callback handles.

use std::fmt;
use std::sync::Arc;

use crate::error::SubscriberError;

/// Shared callback signature stored by the bus.
type Callback<T> = Arc<dyn Fn(&str, &T) -> Result<(), SubscriberError> + Send + Sync>;

/// A cloneable handle to a subscriber callback.
///
/// The callback receives the full published topic and the payload. Handle
/// identity is what [`PubSub::unsubscribe_callback`](crate::PubSub::unsubscribe_callback)
/// matches on: clones of one handle are the same subscriber, while two
/// handles built from separate closures are always different, even if the
/// closures are textually identical.
///
/// # Examples
///
/// ```
/// use topicbus::Subscriber;
///
/// let log = Subscriber::<u32>::new(|topic, value| println!("{topic}: {value}"));
/// let same = log.clone();
/// assert_eq!(log, same);
///
/// let other = Subscriber::<u32>::new(|topic, value| println!("{topic}: {value}"));
/// assert_ne!(log, other);
/// ```
pub struct Subscriber<T> {
    callback: Callback<T>,
}

impl<T> Subscriber<T> {
    /// Wraps an infallible callback.
    pub fn new<F>(callback: F) -> Self
    where
        F: Fn(&str, &T) + Send + Sync + 'static,
    {
        Self {
            callback: Arc::new(move |topic: &str, data: &T| {
                callback(topic, data);
                Ok(())
            }),
        }
    }

    /// Wraps a callback that can report failure.
    ///
    /// What happens to a failure is decided by the bus's
    /// [`FaultPolicy`](crate::FaultPolicy).
    pub fn fallible<F>(callback: F) -> Self
    where
        F: Fn(&str, &T) -> Result<(), SubscriberError> + Send + Sync + 'static,
    {
        Self {
            callback: Arc::new(callback),
        }
    }

    /// Invokes the callback.
    ///
    /// # Errors
    ///
    /// Returns whatever the callback reports.
    pub fn call(&self, topic: &str, data: &T) -> Result<(), SubscriberError> {
        (self.callback)(topic, data)
    }

    /// Returns `true` if both handles refer to the same callback.
    #[must_use]
    pub fn same_as(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.callback, &other.callback)
    }
}

impl<T> Clone for Subscriber<T> {
    fn clone(&self) -> Self {
        Self {
            callback: Arc::clone(&self.callback),
        }
    }
}

impl<T> PartialEq for Subscriber<T> {
    fn eq(&self, other: &Self) -> bool {
        self.same_as(other)
    }
}

impl<T> Eq for Subscriber<T> {}

impl<T> fmt::Debug for Subscriber<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscriber")
            .field("handles", &Arc::strong_count(&self.callback))
            .finish_non_exhaustive()
    }
}
