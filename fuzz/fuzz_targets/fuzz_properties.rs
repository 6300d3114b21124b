#![no_main]

use asrun::{Heap, ObjectId, PropertyFlags, Value};
use libfuzzer_sys::fuzz_target;

const NAMES: [&str; 4] = ["a", "B", "peer", "PEER"];

// Each input byte is one operation on a small pool of objects
fuzz_target!(|data: &[u8]| {
    let mut heap = Heap::new();
    let mut live: Vec<ObjectId> = Vec::new();

    for &byte in data.iter().take(4096) {
        let name = NAMES[(byte >> 4) as usize % NAMES.len()];
        let pick = |live: &[ObjectId], n: u8| live.get(n as usize % live.len().max(1)).copied();
        match byte & 0x07 {
            0 => live.push(heap.create_object()),
            1 => {
                if let (Some(a), Some(b)) = (pick(&live, byte >> 3), pick(&live, byte >> 5)) {
                    heap.set(a, name, Value::Object(b));
                }
            }
            2 => {
                if let Some(a) = pick(&live, byte >> 3) {
                    heap.delete(a, name);
                }
            }
            3 => {
                if let Some(a) = pick(&live, byte >> 3) {
                    heap.set_flags(a, name, PropertyFlags::from_bits_truncate(byte >> 4));
                }
            }
            4 => {
                if let (Some(a), Some(b)) = (pick(&live, byte >> 3), pick(&live, byte >> 5)) {
                    heap.set_prototype(a, Some(b));
                }
            }
            5 => {
                if let Some(a) = pick(&live, byte >> 3) {
                    let _ = heap.enumerate(a).count();
                }
            }
            _ => {
                if !live.is_empty() {
                    let id = live.swap_remove(byte as usize % live.len());
                    heap.release(id);
                }
            }
        }
    }

    for id in live {
        heap.release(id);
    }
    heap.collect();
    assert_eq!(heap.stats().live_objects, 0);
});
