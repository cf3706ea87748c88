// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Subscription handles.
//!
//! # Overview
//!
//! - [`SubscriptionToken`] - Identifies one subscription, used to unsubscribe it
//! - [`Subscriber`] - Cloneable callback handle; its identity selects every
//!   registration of the same callback
//! - [`UnsubscribeTarget`] - Token, callback, or topic to remove
//! - [`Unsubscribed`] - What an unsubscribe call removed
//!
//! # Usage
//!
//! ```
//! use topicbus::{PubSub, Subscriber, Unsubscribed};
//!
//! # fn main() -> topicbus::Result<()> {
//! let bus: PubSub<u32> = PubSub::new();
//! let on_tick = Subscriber::new(|topic: &str, n: &u32| println!("{topic} #{n}"));
//!
//! let token = bus.subscribe("ticker.10", &on_tick)?;
//! bus.subscribe("ticker.60", &on_tick)?;
//!
//! // Remove one registration precisely...
//! assert_eq!(bus.unsubscribe(token), Unsubscribed::Token(token));
//! // ...or every registration of the callback.
//! assert_eq!(bus.unsubscribe(&on_tick), Unsubscribed::Callback { removed: 1 });
//! # Ok(())
//! # }
//! ```

mod subscriber;
mod target;
mod token;

pub use subscriber::Subscriber;
pub use target::{UnsubscribeTarget, Unsubscribed};
pub(crate) use token::next_token;
pub use token::{ParseTokenError, SubscriptionToken};
