// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Process-wide default bus.
//!
//! Plugins and event sources that are wired together at application start
//! can share this instance instead of passing a bus around. Libraries and
//! tests should create their own [`PubSub`] instead.
//!
//! ```
//! use serde_json::json;
//!
//! # fn main() -> topicbus::Result<()> {
//! let bus = topicbus::global::bus();
//! let (token, _) = bus.subscribe_fn("usr.abrp.status", |_, _| {})?;
//! bus.publish("usr.abrp.status", &json!("sent"))?;
//! let _ = bus.unsubscribe(token);
//! # Ok(())
//! # }
//! ```

use std::sync::{Arc, LazyLock};

use crate::PubSub;

static BUS: LazyLock<Arc<PubSub>> = LazyLock::new(|| Arc::new(PubSub::new()));

/// Returns the shared bus, creating it with the default configuration on
/// first use.
#[must_use]
pub fn bus() -> Arc<PubSub> {
    Arc::clone(&BUS)
}
