//! Event listener registry
//!
//! A registry holds non-owning handles to objects that want events. Each
//! notification works on a snapshot of the registration list, so listeners
//! may add or remove themselves (or each other) from inside their callbacks
//! without disturbing the pass in flight. Removal only empties a slot; the
//! slot is dropped by the garbage pass that follows each notification. A
//! slot whose object was destroyed counts as empty from that moment on, swept
//! or not.

use std::borrow::Cow;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::trace;

use crate::config::{DEFAULT_MAX_LISTENERS, RuntimeConfig};
use crate::gc::{Heap, ObjectId};
use crate::value::{AsString, Value};

// ============================================================================
// Events
// ============================================================================

/// Identifies an event and the handler member that receives it
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EventId {
    Press,
    Release,
    ReleaseOutside,
    RollOver,
    RollOut,
    DragOver,
    DragOut,
    KeyPress,
    Initialize,
    Load,
    Unload,
    EnterFrame,
    MouseDown,
    MouseUp,
    MouseMove,
    KeyDown,
    KeyUp,
    Data,
    Construct,
    SetFocus,
    KillFocus,
    LoadComplete,
    LoadError,
    LoadInit,
    LoadProgress,
    LoadStart,
    Timer,
    /// Handler name given verbatim
    Custom(AsString),
}

impl EventId {
    /// Name of the member invoked for this event
    pub fn function_name(&self) -> Cow<'_, str> {
        let name = match self {
            EventId::Press => "onPress",
            EventId::Release => "onRelease",
            EventId::ReleaseOutside => "onRelease_Outside",
            EventId::RollOver => "onRoll_Over",
            EventId::RollOut => "onRoll_Out",
            EventId::DragOver => "onDrag_Over",
            EventId::DragOut => "onDrag_Out",
            EventId::KeyPress => "onKeyPress",
            EventId::Initialize => "onInitialize",
            EventId::Load => "onLoad",
            EventId::Unload => "onUnload",
            EventId::EnterFrame => "onEnterFrame",
            EventId::MouseDown => "onMouseDown",
            EventId::MouseUp => "onMouseUp",
            EventId::MouseMove => "onMouseMove",
            EventId::KeyDown => "onKeyDown",
            EventId::KeyUp => "onKeyUp",
            EventId::Data => "onData",
            EventId::Construct => "onConstruct",
            EventId::SetFocus => "onSetFocus",
            EventId::KillFocus => "onKillFocus",
            EventId::LoadComplete => "onLoadComplete",
            EventId::LoadError => "onLoadError",
            EventId::LoadInit => "onLoadInit",
            EventId::LoadProgress => "onLoadProgress",
            EventId::LoadStart => "onLoadStart",
            EventId::Timer => "onTimer",
            EventId::Custom(name) => return Cow::Borrowed(name.as_str()),
        };
        Cow::Borrowed(name)
    }
}

/// An event with its handler arguments
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub id: EventId,
    pub args: Vec<Value>,
}

impl Event {
    pub fn new(id: EventId) -> Self {
        Self {
            id,
            args: Vec::new(),
        }
    }

    pub fn with_args(mut self, args: Vec<Value>) -> Self {
        self.args = args;
        self
    }
}

// ============================================================================
// ListenerRegistry
// ============================================================================

/// Ordered set of weak listener handles.
///
/// The registry never keeps a listener alive; a destroyed listener is
/// skipped and later swept. All methods take `&self` and lock internally so
/// a registry can be shared with a media worker thread, and so a listener
/// callback holding an `Arc` to the registry can unregister itself.
#[derive(Debug)]
pub struct ListenerRegistry {
    slots: Mutex<Vec<Option<ObjectId>>>,
    max: usize,
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_MAX_LISTENERS)
    }

    /// Registry that accepts at most `max` live listeners
    pub fn with_capacity(max: usize) -> Self {
        Self {
            slots: Mutex::new(Vec::new()),
            max,
        }
    }

    pub fn from_config(config: &RuntimeConfig) -> Self {
        Self::with_capacity(config.max_listeners)
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Option<ObjectId>>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a listener. Returns false if it was already registered.
    ///
    /// The first empty or expired slot is reused before the list grows.
    ///
    /// # Panics
    ///
    /// Registering past the configured maximum is an integration error and
    /// panics.
    pub fn add(&self, heap: &Heap, id: ObjectId) -> bool {
        let mut slots = self.lock();
        if slots.contains(&Some(id)) {
            return false;
        }
        let live = live_ids(&slots, heap).count();
        assert!(
            live < self.max,
            "listener registry overflow: {} listeners registered",
            live
        );
        let expired = |slot: &Option<ObjectId>| !slot.is_some_and(|id| heap.is_alive(id));
        match slots.iter_mut().find(|slot| expired(&**slot)) {
            Some(slot) => *slot = Some(id),
            None => slots.push(Some(id)),
        }
        true
    }

    /// Unregister a listener. Safe to call during a notification pass.
    pub fn remove(&self, id: ObjectId) -> bool {
        let mut slots = self.lock();
        match slots.iter_mut().find(|slot| **slot == Some(id)) {
            Some(slot) => {
                *slot = None;
                true
            }
            None => false,
        }
    }

    pub fn contains(&self, id: ObjectId) -> bool {
        self.lock().contains(&Some(id))
    }

    /// Number of registered listeners still alive
    pub fn len(&self, heap: &Heap) -> usize {
        live_ids(&self.lock(), heap).count()
    }

    pub fn is_empty(&self, heap: &Heap) -> bool {
        self.len(heap) == 0
    }

    /// The `n`th live listener in registration order
    pub fn get(&self, heap: &Heap, n: usize) -> Option<ObjectId> {
        live_ids(&self.lock(), heap).nth(n)
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    fn snapshot(&self) -> Vec<Option<ObjectId>> {
        self.lock().clone()
    }

    /// Run `deliver` for every live listener in a snapshot of the list,
    /// then sweep. Returns how many deliveries succeeded.
    fn for_each_live(&self, heap: &mut Heap, mut deliver: impl FnMut(&mut Heap, ObjectId) -> bool) -> usize {
        let snapshot = self.snapshot();
        let mut delivered = 0;
        for id in snapshot.into_iter().flatten() {
            if heap.is_alive(id) && deliver(heap, id) {
                delivered += 1;
            }
        }
        self.clear_garbage(heap);
        delivered
    }

    /// Deliver `event` to every listener registered when the call began.
    ///
    /// Returns how many listeners had a handler for it.
    pub fn notify(&self, heap: &mut Heap, event: &Event) -> usize {
        let delivered = self.for_each_live(heap, |heap, id| heap.on_event(id, event));
        trace!(event = %event.id.function_name(), delivered, "notify");
        delivered
    }

    /// Broadcast a call of member `name` to every listener
    pub fn notify_method(&self, heap: &mut Heap, name: &str, args: &[Value]) -> usize {
        let delivered =
            self.for_each_live(heap, |heap, id| heap.call_method(id, name, args).is_some());
        trace!(method = name, delivered, "broadcast");
        delivered
    }

    /// Advance every time-driven listener by `delta` seconds
    pub fn advance(&self, heap: &mut Heap, delta: f64) -> usize {
        self.for_each_live(heap, |heap, id| heap.advance(id, delta))
    }

    /// Drop emptied slots and slots whose object has been destroyed
    pub fn clear_garbage(&self, heap: &Heap) {
        self.lock()
            .retain(|slot| slot.is_some_and(|id| heap.is_alive(id)));
    }
}

fn live_ids<'a>(slots: &'a [Option<ObjectId>], heap: &'a Heap) -> impl Iterator<Item = ObjectId> + 'a {
    slots.iter().flatten().copied().filter(|id| heap.is_alive(*id))
}

impl Default for ListenerRegistry {
    fn default() -> Self {
        Self::new()
    }
}
