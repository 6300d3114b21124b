//! ActionScript object runtime and ABC module decoder
//!
//! Two pieces an embedding player builds on:
//!
//! - the object model: a [`Heap`] of prototype-based script objects with
//!   case-insensitive, insertion-ordered properties, accessors, watchers,
//!   flags, and deterministic destruction including orphaned cycles
//! - the [`abc`] decoder: turns a compiled ActionScript 3 module into an
//!   immutable [`ModuleGraph`] of constant pool, methods, classes, scripts
//!   and method bodies
//!
//! # Example
//!
//! ```
//! use asrun::{Event, EventId, Runtime, Value};
//!
//! let runtime = Runtime::new();
//! let listener = {
//!     let mut heap = runtime.lock();
//!     let obj = heap.create_object();
//!     let handler = heap.create_function("onEnterFrame", |heap, this, _args| {
//!         if let Some(this) = this {
//!             heap.set(this, "frames", Value::from(1));
//!         }
//!         Value::Undefined
//!     });
//!     heap.set(obj, "onEnterFrame", Value::Object(handler));
//!     heap.release(handler);
//!     obj
//! };
//! assert!(runtime.add_listener(listener));
//!
//! assert_eq!(runtime.notify(&Event::new(EventId::EnterFrame)), 1);
//! assert_eq!(runtime.lock().get(listener, "frames").map(|p| p.value), Some(Value::from(1)));
//! ```

pub mod abc;
pub mod config;
pub mod error;
pub mod gc;
pub mod listener;
pub mod object;
pub mod property;
pub mod value;

pub use abc::{DecodeOptions, Decoder, ModuleGraph};
pub use config::RuntimeConfig;
pub use error::{ConfigError, DecodeError};
pub use gc::{GcStats, Heap, ObjectId};
pub use listener::{Event, EventId, ListenerRegistry};
pub use object::{MediaState, NativeFn, ObjectKind, TimerState};
pub use property::{Property, PropertyFlags};
pub use value::{Accessor, AsString, CheapClone, Value};

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Heap shared with a media worker thread
pub type SharedHeap = Arc<Mutex<Heap>>;

/// A heap, its listener registry and a module decoder wired to one config.
///
/// Every method locks the heap for the duration of the call. Callbacks run
/// under that lock and receive the heap directly; they must not call back
/// into the `Runtime`.
pub struct Runtime {
    heap: SharedHeap,
    listeners: Arc<ListenerRegistry>,
    decoder: Decoder,
    config: RuntimeConfig,
}

impl Runtime {
    /// Create a new runtime instance
    pub fn new() -> Self {
        Self::with_config(RuntimeConfig::default())
    }

    pub fn with_config(config: RuntimeConfig) -> Self {
        Self {
            heap: Arc::new(Mutex::new(Heap::with_config(&config))),
            listeners: Arc::new(ListenerRegistry::from_config(&config)),
            decoder: Decoder::new(DecodeOptions::from(&config)),
            config,
        }
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// Handle to the heap for another thread
    pub fn heap(&self) -> SharedHeap {
        self.heap.cheap_clone()
    }

    /// Lock the heap
    pub fn lock(&self) -> MutexGuard<'_, Heap> {
        self.heap.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn listeners(&self) -> Arc<ListenerRegistry> {
        self.listeners.cheap_clone()
    }

    /// Register a listener. Returns false if it was already registered.
    pub fn add_listener(&self, id: ObjectId) -> bool {
        let heap = self.lock();
        self.listeners.add(&heap, id)
    }

    pub fn remove_listener(&self, id: ObjectId) -> bool {
        self.listeners.remove(id)
    }

    /// Decode a compiled module
    pub fn load_module(&self, bytes: &[u8]) -> Result<ModuleGraph, DecodeError> {
        self.decoder.decode(bytes)
    }

    /// Deliver an event to every registered listener
    pub fn notify(&self, event: &Event) -> usize {
        let mut heap = self.lock();
        self.listeners.notify(&mut heap, event)
    }

    /// Advance every registered listener by `delta` seconds
    pub fn advance(&self, delta: f64) -> usize {
        let mut heap = self.lock();
        self.listeners.advance(&mut heap, delta)
    }
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new()
    }
}
