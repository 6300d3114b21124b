//! Destruction of unreferenced objects and reference cycles

use asrun::{Heap, ObjectId, RuntimeConfig, Value};

#[test]
fn test_two_object_cycle_torn_down_on_release() {
    let mut heap = Heap::new();
    let survivor = heap.create_object();
    let baseline = heap.stats().live_objects;

    let a = heap.create_object();
    let b = heap.create_object();
    heap.set(a, "peer", Value::Object(b));
    heap.set(b, "peer", Value::Object(a));
    heap.set(survivor, "note", Value::from("unrelated"));

    heap.release(b);
    assert!(heap.is_alive(b), "still held by a");

    heap.release(a);
    assert!(!heap.is_alive(a));
    assert!(!heap.is_alive(b));
    assert_eq!(heap.stats().live_objects, baseline);

    // Nothing left in the graph points at either
    for name in heap.own_keys(survivor) {
        let value = heap.get(survivor, name.as_str()).map(|p| p.value);
        assert_ne!(value, Some(Value::Object(a)));
        assert_ne!(value, Some(Value::Object(b)));
    }
    assert_eq!(heap.get(a, "peer"), None);
}

#[test]
fn test_self_reference_torn_down() {
    let mut heap = Heap::new();
    let obj = heap.create_object();
    heap.set(obj, "self", Value::Object(obj));
    heap.release(obj);
    assert!(!heap.is_alive(obj));
    assert_eq!(heap.stats().live_objects, 0);
}

#[test]
fn test_cycle_reachable_from_root_survives() {
    let mut heap = Heap::new();
    let root = heap.create_object();
    let a = heap.create_object();
    let b = heap.create_object();
    heap.set(a, "peer", Value::Object(b));
    heap.set(b, "peer", Value::Object(a));
    heap.set(root, "child", Value::Object(a));
    heap.release(a);
    heap.release(b);

    assert!(heap.is_alive(a));
    assert!(heap.is_alive(b));

    // Dropping the last link from the root orphans the cycle
    assert!(heap.delete(root, "child"));
    assert!(!heap.is_alive(a));
    assert!(!heap.is_alive(b));
    assert!(heap.is_alive(root));
}

#[test]
fn test_deferred_collection_when_cycle_collection_disabled() {
    let config = RuntimeConfig {
        collect_cycles: false,
        ..RuntimeConfig::default()
    };
    let mut heap = Heap::with_config(&config);
    let a = heap.create_object();
    let b = heap.create_object();
    heap.set(a, "peer", Value::Object(b));
    heap.set(b, "peer", Value::Object(a));
    heap.release(a);
    heap.release(b);

    assert!(heap.is_alive(a), "cycle waits for an explicit collection");
    assert_eq!(heap.collect(), 2);
    assert!(!heap.is_alive(a));
    assert!(!heap.is_alive(b));
    assert_eq!(heap.collect(), 0);
}

#[test]
fn test_long_ring_released_without_recursion() {
    const N: u64 = 10_000;
    let mut heap = Heap::new();
    let head = heap.create_object();
    let mut tail = head;
    for _ in 0..N {
        let next = heap.create_object();
        heap.set(tail, "next", Value::Object(next));
        if tail != head {
            heap.release(tail);
        }
        tail = next;
    }
    // Close the ring
    heap.set(tail, "next", Value::Object(head));
    heap.release(tail);
    assert_eq!(heap.stats().live_objects as u64, N + 1);

    heap.release(head);
    assert_eq!(heap.stats().live_objects, 0);
    assert!(heap.stats().traversed <= 5 * N);
}

/// Build a chain of `n` objects hanging off a rooted head
fn chain(heap: &mut Heap, n: u64) -> ObjectId {
    let head = heap.create_object();
    let mut tail = head;
    for _ in 0..n {
        let next = heap.create_object();
        heap.set(tail, "next", Value::Object(next));
        heap.release(next);
        tail = next;
    }
    head
}

#[test]
fn test_chain_release_work_is_linear() {
    for n in [1_000, 8_000] {
        let mut heap = Heap::new();
        let head = chain(&mut heap, n);
        let built = heap.stats().traversed;
        assert!(built <= 2 * n, "building {n} visited {built}");

        heap.release(head);
        assert_eq!(heap.stats().live_objects, 0);
        // Unreferenced objects are freed without any graph walk
        assert_eq!(heap.stats().traversed, built);
    }
}

#[test]
fn test_temporaries_referencing_shared_world() {
    const N: u64 = 4_000;
    let mut heap = Heap::new();
    let world = heap.create_object();
    for i in 0..N {
        let child = heap.create_object();
        heap.set(world, &format!("child{i}"), Value::Object(child));
        heap.release(child);
    }
    let built = heap.stats().traversed;

    for _ in 0..N {
        let temp = heap.create_object();
        heap.set(temp, "world", Value::Object(world));
        heap.release(temp);
    }

    assert_eq!(heap.stats().traversed, built);
    assert_eq!(heap.stats().live_objects as u64, N + 1);
    assert!(heap.is_alive(world));
}

#[test]
fn test_cycle_teardown_visits_only_garbage() {
    let mut heap = Heap::new();
    let world = chain(&mut heap, 1_000);
    let a = heap.create_object();
    let b = heap.create_object();
    heap.set(a, "peer", Value::Object(b));
    heap.set(b, "peer", Value::Object(a));
    heap.set(a, "world", Value::Object(world));
    heap.set(b, "world", Value::Object(world));
    heap.release(b);

    let before = heap.stats().traversed;
    heap.release(a);
    assert!(!heap.is_alive(a));
    assert!(!heap.is_alive(b));
    assert_eq!(heap.stats().live_objects, 1_001);
    // Detection and teardown stay inside the pair
    assert!(heap.stats().traversed - before <= 4);
    assert!(matches!(
        heap.get(world, "next").map(|p| p.value),
        Some(Value::Object(_))
    ));
}

#[test]
fn test_prototype_kept_alive_by_child() {
    let mut heap = Heap::new();
    let proto = heap.create_object();
    let child = heap.create_with_prototype(proto);
    heap.release(proto);
    assert!(heap.is_alive(proto));

    heap.release(child);
    assert!(!heap.is_alive(proto));
    assert_eq!(heap.stats().rooted_objects, 0);
}

#[test]
fn test_retain_balances_release() {
    let mut heap = Heap::new();
    let obj = heap.create_object();
    assert!(heap.retain(obj));
    assert_eq!(heap.root_count(obj), 2);
    heap.release(obj);
    assert!(heap.is_alive(obj));
    heap.release(obj);
    assert!(!heap.is_alive(obj));
    assert!(!heap.retain(obj));
}
