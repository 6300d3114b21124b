//! Property store, flags and prototype lookup

use super::keys;
use asrun::{Heap, PropertyFlags, Value};

#[test]
fn test_read_only_property_rejects_writes() {
    let mut heap = Heap::new();
    let obj = heap.create_object();
    heap.define_property(obj, "version", Value::from(8), PropertyFlags::READ_ONLY);

    assert!(!heap.set(obj, "version", Value::from(9)));
    assert!(!heap.set(obj, "VERSION", Value::from("nine")));
    assert_eq!(heap.get(obj, "version").map(|p| p.value), Some(Value::from(8)));

    // Clearing the flag makes it writable again
    assert!(heap.update_flags(obj, "version", PropertyFlags::empty(), PropertyFlags::READ_ONLY));
    assert!(heap.set(obj, "version", Value::from(9)));
    assert_eq!(heap.get(obj, "version").map(|p| p.value), Some(Value::from(9)));
}

#[test]
fn test_names_are_case_insensitive_and_keep_first_spelling() {
    let mut heap = Heap::new();
    let obj = heap.create_object();
    heap.set(obj, "onEnterFrame", Value::from(1));
    heap.set(obj, "ONENTERFRAME", Value::from(2));

    assert_eq!(keys(&heap, obj), vec!["onEnterFrame"]);
    assert_eq!(heap.get(obj, "onenterframe").map(|p| p.value), Some(Value::from(2)));
    assert!(heap.has_own_property(obj, "OnEnterFrame"));
}

#[test]
fn test_insertion_order_survives_updates_and_deletes() {
    let mut heap = Heap::new();
    let obj = heap.create_object();
    for name in ["a", "b", "c", "d"] {
        heap.set(obj, name, Value::from(name));
    }
    heap.set(obj, "b", Value::from(0));
    assert!(heap.delete(obj, "c"));
    heap.set(obj, "c", Value::Null);

    assert_eq!(keys(&heap, obj), vec!["a", "b", "d", "c"]);
}

#[test]
fn test_non_deletable_property() {
    let mut heap = Heap::new();
    let obj = heap.create_object();
    heap.set(obj, "stage", Value::Null);
    assert!(heap.set_flags(obj, "stage", PropertyFlags::NON_DELETABLE));

    assert!(!heap.delete(obj, "stage"));
    assert!(heap.has_own_property(obj, "stage"));
    assert!(!heap.delete(obj, "missing"));
}

#[test]
fn test_set_flags_on_missing_property_fails() {
    let mut heap = Heap::new();
    let obj = heap.create_object();
    assert!(!heap.set_flags(obj, "nope", PropertyFlags::READ_ONLY));
    assert_eq!(heap.flags(obj, "nope"), None);
}

#[test]
fn test_lookup_falls_through_prototype_chain() {
    let mut heap = Heap::new();
    let base = heap.create_object();
    heap.set(base, "color", Value::from("red"));
    let mid = heap.create_with_prototype(base);
    let leaf = heap.create_with_prototype(mid);

    assert_eq!(heap.get(leaf, "color").map(|p| p.value), Some(Value::from("red")));
    assert!(!heap.has_own_property(leaf, "color"));

    // Writing on the leaf shadows without touching the base
    heap.set(leaf, "color", Value::from("blue"));
    assert_eq!(heap.get(base, "color").map(|p| p.value), Some(Value::from("red")));
    assert_eq!(heap.get(leaf, "color").map(|p| p.value), Some(Value::from("blue")));
}

#[test]
fn test_prototype_cycle_refused() {
    let mut heap = Heap::new();
    let a = heap.create_object();
    let b = heap.create_with_prototype(a);
    assert!(!heap.set_prototype(a, Some(b)));
    assert!(!heap.set_prototype(a, Some(a)));
    assert_eq!(heap.prototype(a), None);
    assert!(heap.set_prototype(b, None));
}

#[test]
fn test_watch_rewrites_assigned_value() {
    let mut heap = Heap::new();
    let obj = heap.create_object();
    heap.set(obj, "volume", Value::from(50));

    // Clamp to the limit passed as user data
    let clamp = heap.create_function("clamp", |_heap, _this, args| {
        let new = args.get(2).map_or(0.0, Value::to_number);
        let limit = args.get(3).map_or(0.0, Value::to_number);
        Value::from(new.min(limit))
    });
    assert!(heap.watch(obj, "volume", clamp, Value::from(100)));
    heap.release(clamp);

    heap.set(obj, "volume", Value::from(250));
    assert_eq!(heap.get(obj, "volume").map(|p| p.value), Some(Value::from(100)));

    assert!(heap.unwatch(obj, "volume"));
    heap.set(obj, "volume", Value::from(250));
    assert_eq!(heap.get(obj, "volume").map(|p| p.value), Some(Value::from(250)));
    assert!(!heap.is_alive(clamp));
}

#[test]
fn test_copy_to_and_find_target() {
    let mut heap = Heap::new();
    let root = heap.create_object();
    let clip = heap.create_object();
    let inner = heap.create_object();
    heap.set(root, "clip", Value::Object(clip));
    heap.set(clip, "inner", Value::Object(inner));

    assert_eq!(heap.find_target(root, "clip.inner"), Some(inner));
    assert_eq!(heap.find_target(root, "clip/inner"), Some(inner));
    assert_eq!(heap.find_target(root, "clip..inner"), None);
    assert_eq!(heap.find_target(root, "clip.missing"), None);

    heap.set(clip, "x", Value::from(10));
    let copy = heap.create_object();
    assert!(heap.copy_to(clip, copy));
    assert_eq!(heap.find_target(copy, "inner"), Some(inner));
    assert_eq!(heap.get(copy, "x").map(|p| p.value), Some(Value::from(10)));
}

#[test]
fn test_stale_handle_fails_safely() {
    let mut heap = Heap::new();
    let obj = heap.create_object();
    heap.set(obj, "x", Value::from(1));
    heap.release(obj);

    assert!(!heap.is_alive(obj));
    assert_eq!(heap.get(obj, "x"), None);
    assert!(!heap.set(obj, "x", Value::from(2)));
    assert_eq!(heap.enumerate(obj).count(), 0);

    // The slot is reused under a new generation
    let fresh = heap.create_object();
    assert_eq!(fresh.index(), obj.index());
    assert_ne!(fresh, obj);
    assert_eq!(heap.get(obj, "x"), None);
}
