//! Time-driven objects: timers and media

use super::{counting_function, hits};
use asrun::{Heap, ListenerRegistry, MediaState, ObjectKind};

#[test]
fn test_timer_fires_once_per_elapsed_interval() {
    let mut heap = Heap::new();
    let handler = counting_function(&mut heap, "tick");
    let timer = heap.create_timer(0.5, Some(handler));
    heap.release(handler);

    assert!(!heap.advance(timer, 0.25));
    assert_eq!(hits(&heap, timer), 0.0);

    // 0.25 + 1.5 = 1.75: three intervals elapsed
    assert!(heap.advance(timer, 1.5));
    assert_eq!(hits(&heap, timer), 3.0);

    assert!(heap.advance(timer, 0.25));
    assert_eq!(hits(&heap, timer), 4.0);
}

#[test]
fn test_zero_interval_fires_every_frame() {
    let mut heap = Heap::new();
    let handler = counting_function(&mut heap, "tick");
    let timer = heap.create_timer(0.0, Some(handler));
    for _ in 0..3 {
        assert!(heap.advance(timer, 0.01));
    }
    assert_eq!(hits(&heap, timer), 3.0);
}

#[test]
fn test_timer_keeps_handler_alive() {
    let mut heap = Heap::new();
    let handler = counting_function(&mut heap, "tick");
    let timer = heap.create_timer(1.0, Some(handler));
    heap.release(handler);
    assert!(heap.is_alive(handler));
    assert_eq!(heap.timer(timer).and_then(|t| t.handler), Some(handler));

    heap.release(timer);
    assert!(!heap.is_alive(handler));
}

#[test]
fn test_media_stops_at_duration() {
    let mut heap = Heap::new();
    let sound = heap.alloc(ObjectKind::Sound(MediaState::new(Some(2.0))));
    if let Some(media) = heap.media_mut(sound) {
        media.playing = true;
    }

    assert!(heap.advance(sound, 1.5));
    assert!(heap.advance(sound, 1.5));
    let media = heap.media(sound).unwrap();
    assert_eq!(media.position, 2.0);
    assert!(!media.playing);
    assert!(!heap.advance(sound, 1.0));
}

#[test]
fn test_registry_advance_skips_plain_objects() {
    let mut heap = Heap::new();
    let registry = ListenerRegistry::new();
    let handler = counting_function(&mut heap, "tick");
    let timer = heap.create_timer(0.1, Some(handler));
    heap.release(handler);
    let plain = heap.create_object();
    registry.add(&heap, timer);
    registry.add(&heap, plain);

    assert_eq!(registry.advance(&mut heap, 0.15), 1);
    assert_eq!(hits(&heap, timer), 1.0);
    assert_eq!(hits(&heap, plain), 0.0);
}
