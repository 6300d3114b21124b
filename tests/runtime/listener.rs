//! Listener registry delivery semantics

use std::sync::{Arc, PoisonError};

use super::{counting_object, hits};
use asrun::{Event, EventId, Heap, ListenerRegistry, Runtime, Value};

#[test]
fn test_self_removal_during_notify() {
    let mut heap = Heap::new();
    let registry = Arc::new(ListenerRegistry::new());

    let first = counting_object(&mut heap, "onPress");
    let quitter = heap.create_object();
    let third = counting_object(&mut heap, "onPress");

    let handle = Arc::clone(&registry);
    let unregister = heap.create_function("onPress", move |heap, this, _| {
        if let Some(this) = this {
            handle.remove(this);
            heap.set(this, "hits", Value::from(1));
        }
        Value::Undefined
    });
    heap.set(quitter, "onPress", Value::Object(unregister));
    heap.release(unregister);

    for id in [first, quitter, third] {
        assert!(registry.add(&heap, id));
    }

    let press = Event::new(EventId::Press);
    assert_eq!(registry.notify(&mut heap, &press), 3);
    assert_eq!(hits(&heap, first), 1.0);
    assert_eq!(hits(&heap, quitter), 1.0);
    assert_eq!(hits(&heap, third), 1.0);

    assert!(!registry.contains(quitter));
    assert_eq!(registry.len(&heap), 2);

    assert_eq!(registry.notify(&mut heap, &press), 2);
    assert_eq!(hits(&heap, first), 2.0);
    assert_eq!(hits(&heap, quitter), 1.0);
    assert_eq!(hits(&heap, third), 2.0);
}

#[test]
fn test_listener_added_during_notify_waits_for_next_pass() {
    let mut heap = Heap::new();
    let registry = Arc::new(ListenerRegistry::new());
    let late = counting_object(&mut heap, "onData");

    let adder = heap.create_object();
    let handle = Arc::clone(&registry);
    let add_late = heap.create_function("onData", move |heap, _, _| {
        handle.add(heap, late);
        Value::Undefined
    });
    heap.set(adder, "onData", Value::Object(add_late));
    heap.release(add_late);
    registry.add(&heap, adder);

    let data = Event::new(EventId::Data);
    assert_eq!(registry.notify(&mut heap, &data), 1);
    assert_eq!(hits(&heap, late), 0.0);

    assert_eq!(registry.notify(&mut heap, &data), 2);
    assert_eq!(hits(&heap, late), 1.0);
}

#[test]
fn test_destroyed_listener_skipped_and_swept() {
    let mut heap = Heap::new();
    let registry = ListenerRegistry::new();
    let keep = counting_object(&mut heap, "onKeyDown");
    let gone = counting_object(&mut heap, "onKeyDown");
    registry.add(&heap, keep);
    registry.add(&heap, gone);

    heap.release(gone);
    assert!(!heap.is_alive(gone));

    let key = Event::new(EventId::KeyDown).with_args(vec![Value::from(65)]);
    assert_eq!(registry.notify(&mut heap, &key), 1);
    assert_eq!(registry.len(&heap), 1);
    assert_eq!(registry.get(&heap, 0), Some(keep));
}

#[test]
fn test_event_args_reach_handler() {
    let mut heap = Heap::new();
    let registry = ListenerRegistry::new();
    let obj = heap.create_object();
    let handler = heap.create_function("onKeyPress", |heap, this, args| {
        if let (Some(this), Some(code)) = (this, args.first()) {
            heap.set(this, "lastKey", code.clone());
        }
        Value::Undefined
    });
    heap.set(obj, "onKeyPress", Value::Object(handler));
    registry.add(&heap, obj);

    let event = Event::new(EventId::KeyPress).with_args(vec![Value::from(13)]);
    registry.notify(&mut heap, &event);
    assert_eq!(heap.get(obj, "lastKey").map(|p| p.value), Some(Value::from(13)));
}

#[test]
fn test_notify_method_broadcasts_custom_member() {
    let mut heap = Heap::new();
    let registry = ListenerRegistry::new();
    let a = counting_object(&mut heap, "onStatus");
    let b = heap.create_object();
    registry.add(&heap, a);
    registry.add(&heap, b);

    assert_eq!(registry.notify_method(&mut heap, "onStatus", &[]), 1);
    assert_eq!(hits(&heap, a), 1.0);

    let custom = Event::new(EventId::Custom("onStatus".into()));
    assert_eq!(registry.notify(&mut heap, &custom), 1);
    assert_eq!(hits(&heap, a), 2.0);
}

#[test]
fn test_add_is_idempotent_and_reuses_holes() {
    let mut heap = Heap::new();
    let registry = ListenerRegistry::with_capacity(2);
    let a = heap.create_object();
    let b = heap.create_object();
    let c = heap.create_object();

    assert!(registry.add(&heap, a));
    assert!(!registry.add(&heap, a));
    assert!(registry.add(&heap, b));
    assert!(registry.remove(a));
    assert!(registry.add(&heap, c));
    assert_eq!(registry.get(&heap, 0), Some(c));
    assert_eq!(registry.get(&heap, 1), Some(b));
}

#[test]
fn test_destroyed_listener_does_not_count_toward_capacity() {
    let mut heap = Heap::new();
    let registry = ListenerRegistry::with_capacity(2);
    let a = counting_object(&mut heap, "onLoad");
    let b = counting_object(&mut heap, "onLoad");
    registry.add(&heap, a);
    registry.add(&heap, b);

    heap.release(a);
    assert_eq!(registry.len(&heap), 1);
    assert_eq!(registry.get(&heap, 0), Some(b));

    let c = counting_object(&mut heap, "onLoad");
    assert!(registry.add(&heap, c));
    assert_eq!(registry.notify(&mut heap, &Event::new(EventId::Load)), 2);
    assert_eq!(hits(&heap, c), 1.0);
}

#[test]
fn test_registry_shared_with_worker_thread() {
    let runtime = Runtime::new();
    let (steady, churn) = {
        let mut heap = runtime.lock();
        let steady = counting_object(&mut heap, "onEnterFrame");
        let churn = counting_object(&mut heap, "onEnterFrame");
        (steady, churn)
    };
    assert!(runtime.add_listener(steady));

    let heap = runtime.heap();
    let registry = runtime.listeners();
    let worker = std::thread::spawn(move || {
        for _ in 0..200 {
            {
                let heap = heap.lock().unwrap_or_else(PoisonError::into_inner);
                registry.add(&heap, churn);
            }
            // No heap lock needed, so this can land mid-notification
            registry.remove(churn);
        }
        let heap = heap.lock().unwrap_or_else(PoisonError::into_inner);
        registry.add(&heap, churn)
    });

    let frame = Event::new(EventId::EnterFrame);
    for _ in 0..200 {
        let delivered = runtime.notify(&frame);
        assert!((1..=2).contains(&delivered));
    }
    assert!(worker.join().unwrap());

    assert_eq!(runtime.notify(&frame), 2);
    let heap = runtime.lock();
    assert_eq!(hits(&heap, steady), 201.0);
    assert!(hits(&heap, churn) >= 1.0);
    assert_eq!(runtime.listeners().len(&heap), 2);
}

#[test]
#[should_panic(expected = "listener registry overflow")]
fn test_overflow_is_fatal() {
    let mut heap = Heap::new();
    let registry = ListenerRegistry::with_capacity(1);
    let a = heap.create_object();
    let b = heap.create_object();
    registry.add(&heap, a);
    registry.add(&heap, b);
}
