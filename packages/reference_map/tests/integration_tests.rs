//! Integration tests for the reference map, through its public API only.

use std::collections::HashMap;
use std::num::NonZero;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use reference_map::{DuplicatePolicy, FullnessListener, ReferenceMap};
use testing::{CallCounter, Recorder, with_watchdog};

fn item(name: &str) -> Arc<String> {
    Arc::new(name.to_string())
}

fn recording_map(edges: &Recorder<bool>) -> ReferenceMap<&'static str, String> {
    let edges = edges.clone();

    ReferenceMap::builder()
        .fullness_listener(move |_map, is_full| edges.record(is_full))
        .build()
}

#[test]
fn walkthrough_of_a_single_key() {
    let map = ReferenceMap::new();
    let a = item("a");
    let b = item("b");

    assert!(map.add("k1", &a));
    assert!(map.has("k1"));

    assert!(!map.add("k1", &b));

    map.remove("k1", &*a);
    assert!(map.has("k1"));

    map.remove("k1", &*b);
    assert!(!map.has("k1"));
    assert_eq!(map.pooled(), 1);
    assert!(map.lock().keys().next().is_none());
}

#[test]
fn has_tracks_outstanding_registrations() {
    const KEYS: [&str; 3] = ["a", "b", "c"];

    let map = ReferenceMap::<&str, String>::new();
    let items = (0..5).map(|i| item(&i.to_string())).collect::<Vec<_>>();

    // Model: key -> registered item indexes.
    let mut model: HashMap<&str, Vec<usize>> = HashMap::new();

    // Small deterministic generator, enough to shuffle the operations around.
    let mut seed: u32 = 0x9e37_79b9;
    let mut next = move || {
        seed ^= seed << 13;
        seed ^= seed >> 17;
        seed ^= seed << 5;
        seed as usize
    };

    for _ in 0..2000 {
        let key = KEYS[next() % KEYS.len()];
        let index = next() % items.len();
        let registered = model.entry(key).or_default();

        if next() % 2 == 0 {
            let was_empty = registered.is_empty();
            let newly_populated = map.add(key, &items[index]);

            assert_eq!(newly_populated, was_empty);

            if !registered.contains(&index) {
                registered.push(index);
            }
        } else {
            map.remove(key, &*items[index]);
            registered.retain(|registered_index| *registered_index != index);
        }

        for key in KEYS {
            let expected = model.get(key).is_some_and(|registered| !registered.is_empty());
            assert_eq!(map.has(key), expected, "key {key}");
        }
    }

    let populated = model.values().filter(|registered| !registered.is_empty()).count();
    assert_eq!(map.len(), populated);
    assert_eq!(map.len() + map.pooled(), map.capacity());
}

#[test]
fn emptied_group_is_reused_by_a_different_key() {
    let map = ReferenceMap::new();
    let a = item("a");

    map.add("first", &a);
    let first_id = map.lock().group_id("first");

    map.remove("first", &*a);
    assert!(!map.lock().keys().any(|key| *key == "first"));

    map.add("second", &a);

    assert_eq!(map.lock().group_id("second"), first_id);
    assert_eq!(map.capacity(), 1);
}

#[test]
fn group_memory_is_bounded_by_peak_population() {
    let map = ReferenceMap::new();
    let a = item("a");

    for round in 0..100_u32 {
        map.add(round, &a);
        map.add(round.wrapping_add(1000), &a);
        map.remove(&round, &*a);
        map.remove(&round.wrapping_add(1000), &*a);
    }

    assert_eq!(map.capacity(), 2);
    assert_eq!(map.pooled(), 2);
}

#[test]
fn move_to_absent_key_keeps_items() {
    let map = ReferenceMap::new();
    let a = item("a");
    let b = item("b");

    map.add("old", &a);
    map.add("old", &b);

    map.move_key("old", "new");

    assert!(!map.has("old"));
    let moved = map
        .iterator("new")
        .unwrap()
        .map(|s| (*s).clone())
        .collect::<Vec<_>>();
    assert_eq!(moved, ["b", "a"]);
}

#[test]
fn move_to_occupied_key_unions_items() {
    let map = ReferenceMap::<&str, String>::builder()
        .duplicates(DuplicatePolicy::Allow)
        .build();
    let a = item("a");
    let b = item("b");
    let c = item("c");

    map.add("old", &a);
    map.add("old", &b);
    map.add("new", &b);
    map.add("new", &c);

    map.move_key("old", "new");

    assert!(!map.has("old"));

    let mut merged = map
        .iterator("new")
        .unwrap()
        .map(|s| (*s).clone())
        .collect::<Vec<_>>();
    merged.sort();
    assert_eq!(merged, ["a", "b", "b", "c"]);

    assert_eq!(map.len(), 1);
    assert_eq!(map.pooled(), 1);
}

#[test]
fn move_between_full_groups_keeps_map_full() {
    let edges = Recorder::new();
    let map = recording_map(&edges);
    let a = item("a");
    let b = item("b");

    map.add("old", &a);
    map.add("new", &b);
    map.move_key("old", "new");

    assert_eq!(edges.take(), [true]);
    assert_eq!(map.full_groups(), 1);
}

#[test]
fn fullness_edges_only_on_aggregate_transitions() {
    let edges = Recorder::new();
    let map = recording_map(&edges);
    let a = item("a");
    let b = item("b");

    map.add("x", &a);
    map.add("y", &b);
    map.add("x", &b);
    assert_eq!(edges.take(), [true]);

    map.remove("x", &*a);
    map.remove("x", &*b);
    assert!(edges.is_empty());

    map.remove("y", &*b);
    assert_eq!(edges.take(), [false]);
}

#[test]
fn clear_twice_is_quiet_the_second_time() {
    let edges = Recorder::new();
    let map = recording_map(&edges);
    let a = item("a");

    map.add("x", &a);
    map.add("y", &a);
    _ = edges.take();

    map.clear();
    assert_eq!(edges.take(), [false]);

    map.clear();
    assert!(edges.is_empty());
    assert!(map.is_empty());

    // Everything was pooled, nothing leaked from the counter.
    map.add("z", &a);
    assert_eq!(edges.take(), [true]);
    assert_eq!(map.capacity(), 2);
}

#[test]
fn custom_listener_type() {
    struct CountingListener {
        became_full: CallCounter,
        became_empty: CallCounter,
    }

    impl FullnessListener<u32, str> for CountingListener {
        fn on_fullness_changed(&self, _map: &ReferenceMap<u32, str>, is_full: bool) {
            if is_full {
                self.became_full.increment();
            } else {
                self.became_empty.increment();
            }
        }
    }

    let became_full = CallCounter::new();
    let became_empty = CallCounter::new();

    let map = ReferenceMap::<u32, str>::builder()
        .fullness_threshold(NonZero::new(2).unwrap())
        .fullness_listener_impl(CountingListener {
            became_full: became_full.clone(),
            became_empty: became_empty.clone(),
        })
        .build();

    let a: Arc<str> = Arc::from("a");
    let b: Arc<str> = Arc::from("b");

    map.add(1, &a);
    assert_eq!(became_full.count(), 0);

    map.add(1, &b);
    assert_eq!(became_full.count(), 1);

    map.remove(&1, &*a);
    assert_eq!(became_empty.count(), 1);
}

#[test]
fn dropped_listener_items_disappear() {
    let map = ReferenceMap::new();
    let kept = item("kept");

    {
        let transient = item("transient");
        map.add("x", &transient);
        map.add("x", &kept);
    }

    let remaining = map
        .iterator("x")
        .unwrap()
        .map(|s| (*s).clone())
        .collect::<Vec<_>>();
    assert_eq!(remaining, ["kept"]);

    drop(kept);
    assert!(!map.has("x"));
    assert!(!map.is_full());
}

#[test]
fn live_iterator_follows_rekeyed_group() {
    let map = ReferenceMap::<&str, String>::builder()
        .cache_iterator(false)
        .build();
    let a = item("a");
    let b = item("b");

    map.add("old", &a);
    map.add("old", &b);

    let mut iter = map.iterator("old").unwrap();
    assert_eq!(*iter.next().unwrap(), "b");

    map.move_key("old", "new");

    assert_eq!(*iter.next().unwrap(), "a");
    assert!(iter.next().is_none());
}

#[test]
fn live_iterator_ends_when_group_is_merged_away() {
    let map = ReferenceMap::<&str, String>::builder()
        .cache_iterator(false)
        .build();
    let a = item("a");
    let b = item("b");
    let c = item("c");

    map.add("old", &a);
    map.add("old", &b);
    map.add("new", &c);

    let mut iter = map.iterator("old").unwrap();
    assert_eq!(*iter.next().unwrap(), "b");

    map.move_key("old", "new");

    // The items now live in the group of "new". The group being walked was pooled.
    assert!(iter.next().is_none());
    assert_eq!(map.pooled(), 1);
}

#[test]
#[cfg_attr(miri, ignore)] // Too slow under Miri.
fn concurrent_churn_delivers_each_edge_once() {
    with_watchdog(|| {
        const THREADS: usize = 8;
        const ROUNDS: usize = 2000;

        let edges = Recorder::new();
        let map = Arc::new(recording_map(&edges));

        thread::scope(|s| {
            for thread_index in 0..THREADS {
                let map = Arc::clone(&map);

                s.spawn(move || {
                    let own = item("own");
                    let key = ["a", "b", "c", "d"][thread_index % 4];

                    for _ in 0..ROUNDS {
                        map.add(key, &own);
                        map.remove(key, &*own);
                    }
                });
            }
        });

        let edges = edges.take();

        assert!(!edges.is_empty());
        assert_eq!(edges.first(), Some(&true));
        assert_eq!(edges.last(), Some(&false));

        // Strict alternation means no edge was lost or duplicated.
        for pair in edges.windows(2) {
            assert_ne!(pair[0], pair[1]);
        }

        assert!(map.is_empty());
        assert_eq!(map.full_groups(), 0);
    });
}

#[test]
#[cfg_attr(miri, ignore)] // Too slow under Miri.
fn serialized_iteration_blocks_other_threads() {
    with_watchdog(|| {
        let map = Arc::new(
            ReferenceMap::<&str, String>::builder()
                .thread_safe(true)
                .build(),
        );
        let a = item("a");
        map.add("x", &a);

        let first = map.iterator("x").unwrap();
        let second_started = Arc::new(AtomicBool::new(false));

        thread::scope(|s| {
            s.spawn({
                let map = Arc::clone(&map);
                let second_started = Arc::clone(&second_started);

                move || {
                    let second = map.iterator("x").unwrap();
                    second_started.store(true, Ordering::SeqCst);
                    assert_eq!(second.count(), 1);
                }
            });

            thread::sleep(Duration::from_millis(50));
            assert!(!second_started.load(Ordering::SeqCst));

            // Other operations are not blocked by an iteration in progress.
            map.add("y", &a);

            drop(first);
        });

        assert!(second_started.load(Ordering::SeqCst));
    });
}
