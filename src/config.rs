// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Bus configuration.

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// How a topic prefix selects topics for bulk removal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrefixMatch {
    /// The prefix must end on a segment boundary.
    ///
    /// `"a"` matches `"a"` and `"a.b"` but not `"ab"`. A prefix that already
    /// ends in `.` (such as `"chg."`) matches every topic starting with it.
    #[default]
    Segment,
    /// Literal string prefix. `"a"` also matches the unrelated `"abc"`.
    ///
    /// Kept for scripts written against the legacy bus.
    Raw,
}

/// What `publish` does when a subscriber fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FaultPolicy {
    /// Stop delivering and return the failure from `publish`.
    ///
    /// One faulty subscriber prevents delivery to every subscriber after it,
    /// on the same topic and on all ancestor topics. Panics unwind through
    /// `publish` untouched.
    #[default]
    Propagate,
    /// Log the failure (errors and panics) and continue with the next
    /// subscriber.
    Isolate,
}

/// Configuration for a [`PubSub`](crate::PubSub) bus.
///
/// # Examples
///
/// ```
/// use topicbus::{BusConfig, FaultPolicy, PrefixMatch};
///
/// let config = BusConfig::default()
///     .with_fault_policy(FaultPolicy::Isolate)
///     .with_trace_events(true);
/// assert_eq!(config.prefix_match, PrefixMatch::Segment);
///
/// let config = BusConfig::from_json(r#"{"prefix_match":"raw"}"#).unwrap();
/// assert_eq!(config.prefix_match, PrefixMatch::Raw);
/// assert_eq!(config.fault_policy, FaultPolicy::Propagate);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BusConfig {
    /// Prefix semantics for topic-based removal.
    pub prefix_match: PrefixMatch,
    /// Subscriber failure handling during `publish`.
    pub fault_policy: FaultPolicy,
    /// Log every published topic at info level, except `ticker.*`.
    pub trace_events: bool,
}

impl BusConfig {
    /// Parses a configuration from JSON. Missing fields take their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`](crate::Error::Config) if the JSON is malformed
    /// or contains unknown enum values.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Sets the prefix matching mode.
    #[must_use]
    pub fn with_prefix_match(mut self, prefix_match: PrefixMatch) -> Self {
        self.prefix_match = prefix_match;
        self
    }

    /// Sets the subscriber fault policy.
    #[must_use]
    pub fn with_fault_policy(mut self, fault_policy: FaultPolicy) -> Self {
        self.fault_policy = fault_policy;
        self
    }

    /// Enables or disables event tracing.
    #[must_use]
    pub fn with_trace_events(mut self, enabled: bool) -> Self {
        self.trace_events = enabled;
        self
    }
}
