// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! `topicbus` - hierarchical publish/subscribe for vehicle scripting.
//!
//! Event sources (timer ticks, vehicle state changes, incoming messages)
//! publish on period-separated topics such as `vehicle.charge.stop`.
//! Plugins and UI receivers subscribe to a topic and receive everything
//! published on it and below it.
//!
//! # Topic conventions
//!
//! - `ticker.<seconds>` - periodic ticks (see [`ticker`])
//! - `vehicle.<event>` and `vehicle.<event>.<phase>` - lifecycle events
//! - `config.changed` - configuration updates
//! - `usr.<plugin>.<status>` - plugin notifications
//!
//! # Quick Start
//!
//! ```
//! use serde_json::json;
//! use topicbus::{PubSub, Subscriber, Unsubscribed};
//!
//! # fn main() -> topicbus::Result<()> {
//! let bus = PubSub::new();
//!
//! // Receives vehicle.charge.start, vehicle.charge.stop, ...
//! let on_charge = Subscriber::new(|topic, data: &serde_json::Value| {
//!     println!("{topic}: {data}");
//! });
//! let token = bus.subscribe("vehicle.charge", &on_charge)?;
//!
//! assert!(bus.publish("vehicle.charge.stop", &json!({"kwh": 12.5}))?);
//! assert!(!bus.publish("config.changed", &json!(null))?);
//!
//! assert_eq!(bus.unsubscribe(token), Unsubscribed::Token(token));
//! # Ok(())
//! # }
//! ```
//!
//! # Delivery contract
//!
//! - Exact topic first, then each ancestor, shortest last, then the
//!   catch-all topic `*`.
//! - Within a topic, registration order.
//! - Subscribers receive the full published topic.
//! - Delivery is synchronous; `publish` returns after every subscriber ran.
//! - By default a failing subscriber aborts the rest of the delivery and
//!   its error is returned from `publish`. Configure
//!   [`FaultPolicy::Isolate`] to log and continue instead.

mod bus;
pub mod config;
pub mod error;
pub mod global;
pub mod subscription;
#[cfg(feature = "ticker")]
pub mod ticker;
pub mod topic;

pub use bus::PubSub;
pub use config::{BusConfig, FaultPolicy, PrefixMatch};
pub use error::{BoxError, Error, Result, SubscriberError, TopicError};
pub use subscription::{
    ParseTokenError, Subscriber, SubscriptionToken, UnsubscribeTarget, Unsubscribed,
};
pub use topic::Topic;
