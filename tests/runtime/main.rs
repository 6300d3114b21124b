//! Integration tests for the object runtime, organized by feature
//!
//! Every test builds its own [`Heap`]; nothing is shared between tests.

mod accessor;
mod enumeration;
mod listener;
mod object;
mod teardown;
mod timer;

use asrun::{Heap, ObjectId, Value};

/// Function object that bumps `hits` on its receiver
pub fn counting_function(heap: &mut Heap, name: &str) -> ObjectId {
    heap.create_function(name, |heap, this, _args| {
        if let Some(this) = this {
            let hits = hits(heap, this);
            heap.set(this, "hits", Value::from(hits + 1.0));
        }
        Value::Undefined
    })
}

/// Object whose member `handler` counts its calls. The function's host
/// handle is released; the object keeps it alive.
pub fn counting_object(heap: &mut Heap, handler: &str) -> ObjectId {
    let obj = heap.create_object();
    let func = counting_function(heap, handler);
    heap.set(obj, handler, Value::Object(func));
    heap.release(func);
    obj
}

pub fn hits(heap: &Heap, id: ObjectId) -> f64 {
    heap.get(id, "hits").map_or(0.0, |p| p.value.to_number())
}

/// Own keys of an object as plain strings
pub fn keys(heap: &Heap, id: ObjectId) -> Vec<String> {
    heap.own_keys(id).iter().map(|k| k.as_str().to_string()).collect()
}
