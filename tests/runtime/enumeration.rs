//! Enumeration order across the prototype chain

use asrun::{Heap, PropertyFlags, Value};

fn names(heap: &Heap, id: asrun::ObjectId) -> Vec<String> {
    heap.enumerate(id).map(|n| n.as_str().to_string()).collect()
}

#[test]
fn test_own_then_prototype_without_dedup() {
    let mut heap = Heap::new();
    let proto = heap.create_object();
    heap.set(proto, "x", Value::from(1));
    heap.set(proto, "y", Value::from(2));

    let child = heap.create_with_prototype(proto);
    heap.set(child, "y", Value::from(3));
    heap.set(child, "z", Value::from(4));

    // "y" shows up once per level
    assert_eq!(names(&heap, child), vec!["y", "z", "x", "y"]);
}

#[test]
fn test_non_enumerable_skipped_at_every_level() {
    let mut heap = Heap::new();
    let proto = heap.create_object();
    heap.define_property(proto, "hidden", Value::Null, PropertyFlags::NON_ENUMERABLE);
    heap.set(proto, "shown", Value::Null);

    let child = heap.create_with_prototype(proto);
    heap.set(child, "a", Value::Null);
    heap.set(child, "b", Value::Null);
    heap.set_flags(child, "a", PropertyFlags::NON_ENUMERABLE);

    assert_eq!(names(&heap, child), vec!["b", "shown"]);
    // Hidden names are still readable
    assert!(heap.get(child, "hidden").is_some());
}

#[test]
fn test_enumeration_is_lazy() {
    let mut heap = Heap::new();
    let obj = heap.create_object();
    for i in 0..100 {
        heap.set(obj, &format!("p{i}"), Value::from(i));
    }
    let first: Vec<String> = heap.enumerate(obj).take(2).map(|n| n.as_str().to_string()).collect();
    assert_eq!(first, vec!["p0", "p1"]);
}

#[test]
fn test_empty_chain() {
    let mut heap = Heap::new();
    let proto = heap.create_object();
    let child = heap.create_with_prototype(proto);
    assert!(names(&heap, child).is_empty());
}
