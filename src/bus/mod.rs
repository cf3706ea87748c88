// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Topic registry and dispatcher.
//!
//! # Architecture
//!
//! ```text
//! publish("vehicle.charge.stop", data)
//!              │
//!     registry.has_subscribers()  ── none ──► Ok(false)
//!              │
//!     for level in delivery_chain, then "*":
//!         snapshot(level)          (read lock, released before calling)
//!              │
//!         subscriber.call("vehicle.charge.stop", data)
//!              │
//!         FaultPolicy decides on Err / panic
//!              ↓
//!           Ok(true)
//! ```

mod pubsub;
mod registry;

pub use pubsub::PubSub;
