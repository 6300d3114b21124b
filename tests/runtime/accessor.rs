//! Accessor properties and receiver binding

use super::keys;
use asrun::{Heap, ObjectId, PropertyFlags, Value};

/// Setter that records its receiver and the written value on the receiver
fn recording_setter(heap: &mut Heap) -> ObjectId {
    heap.create_function("set_x", |heap, this, args| {
        if let Some(this) = this {
            let value = args.first().cloned().unwrap_or_default();
            heap.define_property(this, "_x", value, PropertyFlags::empty());
            heap.define_property(this, "receiver", Value::Object(this), PropertyFlags::empty());
        }
        Value::Undefined
    })
}

fn backing_getter(heap: &mut Heap) -> ObjectId {
    heap.create_function("get_x", |heap, this, _| match this {
        Some(this) => heap.get(this, "_x").map(|p| p.value).unwrap_or_default(),
        None => Value::Undefined,
    })
}

#[test]
fn test_inherited_setter_binds_to_child() {
    let mut heap = Heap::new();
    let proto = heap.create_object();
    let getter = backing_getter(&mut heap);
    let setter = recording_setter(&mut heap);
    heap.define_accessor(proto, "x", Some(getter), Some(setter));

    let child = heap.create_with_prototype(proto);
    assert!(heap.set(child, "x", Value::from(42)));

    assert_eq!(heap.get(child, "receiver").map(|p| p.value), Some(Value::Object(child)));
    assert_eq!(heap.get_member(child, "x"), Some(Value::from(42)));

    // The prototype only holds its accessor
    assert_eq!(keys(&heap, proto), vec!["x"]);
    assert_eq!(heap.get_member(proto, "x"), Some(Value::Undefined));
    assert!(!heap.has_own_property(child, "x"));
}

#[test]
fn test_accessor_without_setter_rejects_write() {
    let mut heap = Heap::new();
    let obj = heap.create_object();
    let getter = heap.create_function("get_answer", |_, _, _| Value::from(42));
    heap.define_accessor(obj, "answer", Some(getter), None);

    assert!(!heap.set(obj, "answer", Value::from(0)));
    assert_eq!(heap.get_member(obj, "answer"), Some(Value::from(42)));
}

#[test]
fn test_read_only_accessor_rejects_write() {
    let mut heap = Heap::new();
    let obj = heap.create_object();
    let setter = recording_setter(&mut heap);
    heap.define_accessor(obj, "x", None, Some(setter));
    heap.set_flags(obj, "x", PropertyFlags::READ_ONLY);

    assert!(!heap.set(obj, "x", Value::from(1)));
    assert!(heap.get(obj, "_x").is_none());
}

#[test]
fn test_get_binds_accessor_to_receiver() {
    let mut heap = Heap::new();
    let proto = heap.create_object();
    let getter = backing_getter(&mut heap);
    heap.define_accessor(proto, "x", Some(getter), None);
    let child = heap.create_with_prototype(proto);

    let property = heap.get(child, "x").unwrap();
    let accessor = property.value.as_accessor().unwrap();
    assert_eq!(accessor.target, Some(child));
}

#[test]
fn test_redefining_keeps_position_and_flags() {
    let mut heap = Heap::new();
    let obj = heap.create_object();
    heap.set(obj, "a", Value::Null);
    heap.define_property(obj, "x", Value::from(1), PropertyFlags::NON_ENUMERABLE);
    heap.set(obj, "b", Value::Null);

    let getter = heap.create_function("get_x", |_, _, _| Value::from(2));
    heap.define_accessor(obj, "x", Some(getter), None);

    assert_eq!(keys(&heap, obj), vec!["a", "x", "b"]);
    assert_eq!(heap.flags(obj, "x"), Some(PropertyFlags::NON_ENUMERABLE));
    assert_eq!(heap.get_member(obj, "x"), Some(Value::from(2)));
}

#[test]
fn test_accessor_functions_kept_alive_by_holder() {
    let mut heap = Heap::new();
    let obj = heap.create_object();
    let getter = heap.create_function("get", |_, _, _| Value::from(1));
    heap.define_accessor(obj, "v", Some(getter), None);
    heap.release(getter);
    assert!(heap.is_alive(getter));

    assert!(heap.delete(obj, "v"));
    assert!(!heap.is_alive(getter));
}
