// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! End-to-end behaviour of the topic bus.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use parking_lot::Mutex;
use serde_json::{Value, json};
use topicbus::{
    BusConfig, Error, FaultPolicy, PrefixMatch, PubSub, Subscriber, SubscriptionToken,
    Unsubscribed,
};

/// Shared log of `(label, topic, data)` deliveries.
type Log = Arc<Mutex<Vec<(String, String, Value)>>>;

fn new_log() -> Log {
    Arc::new(Mutex::new(Vec::new()))
}

fn recorder(log: &Log, label: &str) -> Subscriber<Value> {
    let log = Arc::clone(log);
    let label = label.to_string();
    Subscriber::new(move |topic: &str, data: &Value| {
        log.lock()
            .push((label.clone(), topic.to_string(), data.clone()));
    })
}

fn labels(log: &Log) -> Vec<String> {
    log.lock().iter().map(|(label, _, _)| label.clone()).collect()
}

fn counter() -> (Arc<AtomicU32>, Subscriber<Value>) {
    let count = Arc::new(AtomicU32::new(0));
    let count_clone = Arc::clone(&count);
    let sub = Subscriber::new(move |_: &str, _: &Value| {
        count_clone.fetch_add(1, Ordering::SeqCst);
    });
    (count, sub)
}

// ============================================================================
// Delivery
// ============================================================================

mod delivery {
    use super::*;

    #[test]
    fn ancestor_receives_descendant_publish() {
        let bus = PubSub::new();
        let log = new_log();
        bus.subscribe("a.b", &recorder(&log, "ab")).unwrap();

        assert!(bus.publish("a.b.c", &json!("X")).unwrap());
        assert_eq!(
            *log.lock(),
            [("ab".to_string(), "a.b.c".to_string(), json!("X"))]
        );
    }

    #[test]
    fn segment_boundary_is_respected() {
        let bus = PubSub::new();
        let (count, sub) = counter();
        bus.subscribe("a.b", &sub).unwrap();

        assert!(!bus.publish("a.bc", &json!("X")).unwrap());
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn ancestors_in_order() {
        let bus = PubSub::new();
        let log = new_log();
        bus.subscribe("a", &recorder(&log, "a")).unwrap();
        bus.subscribe("a.b.c", &recorder(&log, "a.b.c")).unwrap();
        bus.subscribe("a.b", &recorder(&log, "a.b")).unwrap();

        bus.publish("a.b.c", &Value::Null).unwrap();
        assert_eq!(labels(&log), ["a.b.c", "a.b", "a"]);
    }

    #[test]
    fn registration_order_within_topic() {
        let bus = PubSub::new();
        let log = new_log();
        for label in ["one", "two", "three"] {
            bus.subscribe("vehicle.on", &recorder(&log, label)).unwrap();
        }

        bus.publish("vehicle.on", &Value::Null).unwrap();
        assert_eq!(labels(&log), ["one", "two", "three"]);
    }

    #[test]
    fn no_subscribers_returns_false() {
        let bus = PubSub::new();
        assert!(!bus.publish("x.y.z", &json!(1)).unwrap());
    }

    #[test]
    fn unrelated_topics_are_not_called() {
        let bus = PubSub::new();
        let (count, sub) = counter();
        bus.subscribe("vehicle.charge", &sub).unwrap();

        assert!(!bus.publish("vehicle", &Value::Null).unwrap());
        assert!(!bus.publish("config.changed", &Value::Null).unwrap());
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn independent_buses_do_not_share_subscribers() {
        let bus1 = PubSub::new();
        let bus2 = PubSub::new();
        let (count, sub) = counter();
        bus1.subscribe("metrics", &sub).unwrap();

        assert!(!bus2.publish("metrics", &Value::Null).unwrap());
        assert!(bus1.publish("metrics", &Value::Null).unwrap());
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn catch_all_sees_every_topic_last() {
        let bus = PubSub::new();
        let log = new_log();
        bus.subscribe("*", &recorder(&log, "trace")).unwrap();
        bus.subscribe("vehicle.charge", &recorder(&log, "charge")).unwrap();

        assert!(bus.publish("vehicle.charge.stop", &json!(1)).unwrap());
        assert!(bus.publish("ticker.1", &json!(2)).unwrap());
        assert_eq!(
            *log.lock(),
            [
                ("charge".to_string(), "vehicle.charge.stop".to_string(), json!(1)),
                ("trace".to_string(), "vehicle.charge.stop".to_string(), json!(1)),
                ("trace".to_string(), "ticker.1".to_string(), json!(2)),
            ]
        );
    }
}

// ============================================================================
// Tokens and unsubscription
// ============================================================================

mod unsubscription {
    use super::*;

    #[test]
    fn same_callback_twice_then_remove_one() {
        let bus = PubSub::new();
        let (count, sub) = counter();
        let t1 = bus.subscribe("a", &sub).unwrap();
        let t2 = bus.subscribe("a", &sub).unwrap();
        assert_ne!(t1, t2);

        assert_eq!(bus.unsubscribe(t1), Unsubscribed::Token(t1));
        bus.publish("a", &Value::Null).unwrap();
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn callback_removed_from_every_topic() {
        let bus = PubSub::new();
        let (count, sub) = counter();
        for topic in ["ticker.60", "vehicle.on", "config.changed"] {
            bus.subscribe(topic, &sub).unwrap();
        }

        assert_eq!(bus.unsubscribe(&sub), Unsubscribed::Callback { removed: 3 });
        for topic in ["ticker.60", "vehicle.on", "config.changed"] {
            assert!(!bus.publish(topic, &Value::Null).unwrap());
        }
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn callback_removal_leaves_other_callbacks() {
        let bus = PubSub::new();
        let (removed_count, removed) = counter();
        let (kept_count, kept) = counter();
        bus.subscribe("a", &removed).unwrap();
        bus.subscribe("a", &kept).unwrap();

        let _ = bus.unsubscribe(&removed);
        assert!(bus.publish("a", &Value::Null).unwrap());
        assert_eq!(removed_count.load(Ordering::SeqCst), 0);
        assert_eq!(kept_count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn topic_prefix_removes_hierarchy() {
        let bus = PubSub::new();
        let (_, sub) = counter();
        bus.subscribe("chg.start", &sub).unwrap();
        bus.subscribe("chg.stop", &sub).unwrap();

        assert_eq!(bus.unsubscribe("chg."), Unsubscribed::Topic { topics: 2 });
        assert!(!bus.publish("chg.start", &Value::Null).unwrap());
        assert!(!bus.publish("chg.stop", &Value::Null).unwrap());
    }

    #[test]
    fn topic_root_removes_descendants() {
        let bus = PubSub::new();
        let (_, sub) = counter();
        bus.subscribe("chg.start", &sub).unwrap();
        bus.subscribe("chg.stop", &sub).unwrap();
        bus.subscribe("chgx", &sub).unwrap();

        assert_eq!(bus.unsubscribe("chg"), Unsubscribed::Topic { topics: 2 });
        assert_eq!(bus.topics(), ["chgx"]);
    }

    #[test]
    fn raw_prefix_compatibility_mode() {
        let config = BusConfig::default().with_prefix_match(PrefixMatch::Raw);
        let bus = PubSub::with_config(config);
        let (_, sub) = counter();
        bus.subscribe("chg.start", &sub).unwrap();
        bus.subscribe("chgx", &sub).unwrap();

        assert_eq!(bus.unsubscribe("chg"), Unsubscribed::Topic { topics: 2 });
        assert!(bus.is_empty());
    }

    #[test]
    fn double_unsubscribe_returns_not_found() {
        let bus = PubSub::new();
        let (_, sub) = counter();
        let token = bus.subscribe("a", &sub).unwrap();

        assert!(bus.unsubscribe(token).is_removed());
        assert_eq!(bus.unsubscribe(token), Unsubscribed::NotFound);
    }

    #[test]
    fn unknown_targets_return_not_found() {
        let bus = PubSub::new();
        let (_, sub) = counter();

        assert_eq!(bus.unsubscribe("nothing"), Unsubscribed::NotFound);
        assert_eq!(bus.unsubscribe(&sub), Unsubscribed::NotFound);
        assert_eq!(bus.unsubscribe_str("uid_999"), Unsubscribed::NotFound);
    }

    #[test]
    fn string_token_from_a_script() {
        let bus = PubSub::new();
        let (count, sub) = counter();
        let token = bus.subscribe("ticker.60", &sub).unwrap();
        let stored = token.to_string();

        assert_eq!(bus.unsubscribe_str(&stored), Unsubscribed::Token(token));
        assert!(!bus.publish("ticker.60", &Value::Null).unwrap());
        assert_eq!(count.load(Ordering::SeqCst), 0);
        assert_eq!(stored.parse::<SubscriptionToken>().unwrap(), token);
    }

    #[test]
    fn token_from_another_bus_is_not_found() {
        let bus1 = PubSub::new();
        let bus2 = PubSub::new();
        let (count, sub) = counter();
        let t1 = bus1.subscribe("vehicle.on", &sub).unwrap();
        let t2 = bus2.subscribe("vehicle.on", &sub).unwrap();
        assert_ne!(t1.to_string(), t2.to_string());

        assert_eq!(bus2.unsubscribe(t1), Unsubscribed::NotFound);
        assert!(bus2.publish("vehicle.on", &Value::Null).unwrap());
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn plugin_teardown_by_owner() {
        let bus = PubSub::new();
        let (count, _) = counter();
        for topic in ["ticker.60", "vehicle.charge.stop", "config.changed"] {
            let count = Arc::clone(&count);
            let handler = Subscriber::new(move |_: &str, _: &Value| {
                count.fetch_add(1, Ordering::SeqCst);
            });
            bus.subscribe_owned("usr.abrp", topic, &handler).unwrap();
        }
        let (other_count, other) = counter();
        bus.subscribe_owned("usr.leds", "vehicle.charge", &other).unwrap();

        assert_eq!(bus.unsubscribe_owner("usr.abrp"), Unsubscribed::Owner { removed: 3 });
        bus.publish("vehicle.charge.stop", &Value::Null).unwrap();
        assert!(!bus.publish("ticker.60", &Value::Null).unwrap());
        assert_eq!(count.load(Ordering::SeqCst), 0);
        assert_eq!(other_count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn clear_all_then_resubscribe() {
        let bus = PubSub::new();
        let (count, sub) = counter();
        let old = bus.subscribe("a", &sub).unwrap();
        bus.subscribe("b", &sub).unwrap();

        bus.clear_all_subscriptions();
        assert!(bus.is_empty());
        assert!(!bus.publish("a", &Value::Null).unwrap());

        let new = bus.subscribe("a", &sub).unwrap();
        assert_ne!(old, new);
        assert_eq!(bus.unsubscribe(old), Unsubscribed::NotFound);
        assert!(bus.publish("a", &Value::Null).unwrap());
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }
}

// ============================================================================
// Faults
// ============================================================================

mod faults {
    use super::*;

    fn failing() -> Subscriber<Value> {
        Subscriber::fallible(|topic, _| Err(format!("cannot handle {topic}").into()))
    }

    #[test]
    fn propagate_aborts_remaining_levels() {
        let bus = PubSub::new();
        let log = new_log();
        bus.subscribe("vehicle.charge.stop", &failing()).unwrap();
        bus.subscribe("vehicle.charge", &recorder(&log, "parent")).unwrap();

        let err = bus.publish("vehicle.charge.stop", &Value::Null).unwrap_err();
        assert!(matches!(err, Error::Subscriber { .. }));
        assert!(err.to_string().contains("cannot handle vehicle.charge.stop"));
        assert!(log.lock().is_empty());
    }

    #[test]
    fn isolate_delivers_to_everyone_else() {
        let config = BusConfig::default().with_fault_policy(FaultPolicy::Isolate);
        let bus = PubSub::with_config(config);
        let log = new_log();
        bus.subscribe("vehicle.charge.stop", &failing()).unwrap();
        bus.subscribe("vehicle.charge.stop", &recorder(&log, "sibling")).unwrap();
        bus.subscribe("vehicle.charge", &recorder(&log, "parent")).unwrap();

        assert!(bus.publish("vehicle.charge.stop", &Value::Null).unwrap());
        assert_eq!(labels(&log), ["sibling", "parent"]);
    }

    #[test]
    fn propagate_lets_panics_unwind() {
        let bus = Arc::new(PubSub::new());
        bus.subscribe("boom", &Subscriber::new(|_, _: &Value| panic!("subscriber bug")))
            .unwrap();

        let bus_clone = Arc::clone(&bus);
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(move || {
            bus_clone.publish("boom", &Value::Null)
        }));
        assert!(result.is_err());

        // The registry is still usable afterwards.
        assert_eq!(bus.subscription_count(), 1);
    }
}

// ============================================================================
// Re-entrancy
// ============================================================================

mod reentrancy {
    use super::*;

    #[test]
    fn subscribe_during_delivery_applies_next_publish() {
        let bus = Arc::new(PubSub::new());
        let log = new_log();

        let weak = Arc::downgrade(&bus);
        let late = recorder(&log, "late");
        bus.subscribe_fn("vehicle.on", move |_, _| {
            if let Some(bus) = weak.upgrade() {
                bus.subscribe("vehicle.on", &late).unwrap();
            }
        })
        .unwrap();

        bus.publish("vehicle.on", &Value::Null).unwrap();
        assert!(log.lock().is_empty());

        bus.publish("vehicle.on", &Value::Null).unwrap();
        assert_eq!(labels(&log), ["late"]);
    }

    #[test]
    fn unsubscribe_of_later_sibling_does_not_skip_it() {
        let bus = Arc::new(PubSub::new());
        let log = new_log();

        let weak = Arc::downgrade(&bus);
        let victim = recorder(&log, "victim");
        let victim_clone = victim.clone();
        bus.subscribe_fn("a", move |_, _| {
            if let Some(bus) = weak.upgrade() {
                let _ = bus.unsubscribe(&victim_clone);
            }
        })
        .unwrap();
        bus.subscribe("a", &victim).unwrap();

        bus.publish("a", &Value::Null).unwrap();
        assert_eq!(labels(&log), ["victim"]);

        bus.publish("a", &Value::Null).unwrap();
        assert_eq!(labels(&log), ["victim"]);
    }

    #[test]
    fn subscriber_republishes_derived_event() {
        let bus = Arc::new(PubSub::new());
        let log = new_log();
        bus.subscribe("usr.abrp", &recorder(&log, "status")).unwrap();

        let weak = Arc::downgrade(&bus);
        bus.subscribe_fn("ticker.60", move |_, _| {
            if let Some(bus) = weak.upgrade() {
                bus.publish("usr.abrp.status", &json!("sent")).unwrap();
            }
        })
        .unwrap();

        assert!(bus.publish("ticker.60", &json!({"monotonic": 60})).unwrap());
        assert_eq!(
            *log.lock(),
            [(
                "status".to_string(),
                "usr.abrp.status".to_string(),
                json!("sent")
            )]
        );
    }

    #[test]
    fn subscribe_once_across_levels() {
        let bus = Arc::new(PubSub::new());
        let count = Arc::new(AtomicU32::new(0));
        let count_clone = Arc::clone(&count);
        bus.subscribe_once("vehicle", move |_, _: &Value| {
            count_clone.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();

        assert!(bus.publish("vehicle.charge.start", &Value::Null).unwrap());
        assert!(!bus.publish("vehicle.charge.stop", &Value::Null).unwrap());
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }
}

// ============================================================================
// Threads
// ============================================================================

#[test]
fn concurrent_subscribe_issues_unique_tokens() {
    use std::collections::HashSet;

    let bus = Arc::new(PubSub::<Value>::new());
    let handles: Vec<_> = (0..4)
        .map(|i| {
            let bus = Arc::clone(&bus);
            std::thread::spawn(move || {
                (0..50)
                    .map(|_| {
                        bus.subscribe_fn(&format!("worker.{i}"), |_, _| {})
                            .unwrap()
                            .0
                    })
                    .collect::<Vec<_>>()
            })
        })
        .collect();

    let tokens: HashSet<_> = handles
        .into_iter()
        .flat_map(|h| h.join().unwrap())
        .collect();
    assert_eq!(tokens.len(), 200);
    assert_eq!(bus.subscription_count(), 200);
    assert_eq!(bus.topic_count(), 4);
}
