//! Script objects: property lookup, mutation, enumeration and dispatch
//!
//! Object state lives in the [`Heap`]; every operation here is a `Heap`
//! method taking the receiver's [`ObjectId`]. Operations never fail with an
//! error. A write to a read-only slot, a lookup of a missing name, or any
//! operation on a stale handle reports `false` / `None`.

use std::fmt;
use std::sync::Arc;

use rustc_hash::FxHashMap;
use tracing::{debug, warn};

use crate::gc::{Heap, ObjectId};
use crate::listener::Event;
use crate::property::{Property, PropertyFlags, PropertyMap, PropertyName};
use crate::value::{Accessor, AsString, CheapClone, Value};

// ============================================================================
// Object kinds
// ============================================================================

/// Native function body: `(heap, this, args) -> result`
pub type NativeFn = Arc<dyn Fn(&mut Heap, Option<ObjectId>, &[Value]) -> Value + Send + Sync>;

/// A callable host function
#[derive(Clone)]
pub struct NativeFunction {
    pub name: AsString,
    pub func: NativeFn,
}

impl fmt::Debug for NativeFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NativeFunction({})", self.name)
    }
}

/// Interval timer state
#[derive(Debug, Clone, PartialEq)]
pub struct TimerState {
    /// Seconds between firings; zero or less fires once per advance
    pub interval: f64,
    /// Time accumulated since the last firing
    pub elapsed: f64,
    /// Function invoked with the timer as `this`
    pub handler: Option<ObjectId>,
    /// Total number of firings
    pub fired: u64,
}

impl TimerState {
    pub fn new(interval: f64, handler: Option<ObjectId>) -> Self {
        Self {
            interval,
            elapsed: 0.0,
            handler,
            fired: 0,
        }
    }

    /// Accumulate `delta` and return how many intervals elapsed
    fn tick(&mut self, delta: f64) -> u64 {
        let due = if self.interval <= 0.0 {
            self.elapsed = 0.0;
            1
        } else {
            self.elapsed += delta.max(0.0);
            let due = (self.elapsed / self.interval).floor();
            self.elapsed -= due * self.interval;
            due as u64
        };
        self.fired += due;
        due
    }
}

/// Play state shared by sound and video objects
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MediaState {
    /// Play position in seconds
    pub position: f64,
    pub duration: Option<f64>,
    pub playing: bool,
}

impl MediaState {
    pub fn new(duration: Option<f64>) -> Self {
        Self {
            position: 0.0,
            duration,
            playing: false,
        }
    }

    fn advance(&mut self, delta: f64) -> bool {
        if !self.playing {
            return false;
        }
        self.position += delta.max(0.0);
        if let Some(duration) = self.duration {
            if self.position >= duration {
                self.position = duration;
                self.playing = false;
            }
        }
        true
    }
}

/// Host plugin descriptor
#[derive(Debug, Clone, PartialEq)]
pub struct PluginInfo {
    pub name: AsString,
}

/// Specialization of an object.
///
/// Code that behaves differently per specialization matches on this tag.
#[derive(Debug, Clone)]
pub enum ObjectKind {
    Plain,
    Function(NativeFunction),
    Timer(TimerState),
    Sound(MediaState),
    Video(MediaState),
    Transform,
    Plugin(PluginInfo),
}

impl ObjectKind {
    pub fn name(&self) -> &'static str {
        match self {
            ObjectKind::Plain => "Object",
            ObjectKind::Function(_) => "Function",
            ObjectKind::Timer(_) => "Timer",
            ObjectKind::Sound(_) => "Sound",
            ObjectKind::Video(_) => "Video",
            ObjectKind::Transform => "Transform",
            ObjectKind::Plugin(_) => "Plugin",
        }
    }

    pub fn is_callable(&self) -> bool {
        matches!(self, ObjectKind::Function(_))
    }

    fn for_each_ref(&self, mut visitor: impl FnMut(ObjectId)) {
        match self {
            ObjectKind::Timer(timer) => {
                if let Some(handler) = timer.handler {
                    visitor(handler);
                }
            }
            ObjectKind::Plain
            | ObjectKind::Function(_)
            | ObjectKind::Sound(_)
            | ObjectKind::Video(_)
            | ObjectKind::Transform
            | ObjectKind::Plugin(_) => {}
        }
    }
}

// ============================================================================
// ObjectData
// ============================================================================

#[derive(Debug, Clone)]
pub(crate) struct Watch {
    callback: ObjectId,
    user_data: Value,
}

/// Per-object state stored in a heap slot
#[derive(Debug)]
pub(crate) struct ObjectData {
    pub(crate) properties: PropertyMap,
    pub(crate) prototype: Option<ObjectId>,
    pub(crate) kind: ObjectKind,
    watches: FxHashMap<PropertyName, Watch>,
}

impl ObjectData {
    pub(crate) fn new(kind: ObjectKind) -> Self {
        Self {
            properties: PropertyMap::new(),
            prototype: None,
            kind,
            watches: FxHashMap::default(),
        }
    }

    /// Visit every object this one keeps alive
    pub(crate) fn for_each_ref(&self, mut visitor: impl FnMut(ObjectId)) {
        for (_, property) in self.properties.iter() {
            property.value.for_each_ref(&mut visitor);
        }
        if let Some(prototype) = self.prototype {
            visitor(prototype);
        }
        self.kind.for_each_ref(&mut visitor);
        for watch in self.watches.values() {
            visitor(watch.callback);
            watch.user_data.for_each_ref(&mut visitor);
        }
    }
}

// ============================================================================
// Enumeration
// ============================================================================

/// Lazy iterator over enumerable property names.
///
/// Yields the receiver's own enumerable names in insertion order, then those
/// of each prototype in turn. A name shadowed by a child is yielded again at
/// the prototype level.
pub struct Enumerate<'a> {
    heap: &'a Heap,
    current: Option<ObjectId>,
    index: usize,
}

impl Iterator for Enumerate<'_> {
    type Item = AsString;

    fn next(&mut self) -> Option<AsString> {
        loop {
            let data = self.heap.data(self.current?);
            let Some(data) = data else {
                self.current = None;
                return None;
            };
            match data.properties.get_index(self.index) {
                Some((name, property)) => {
                    self.index += 1;
                    if property.flags.is_enumerable() {
                        return Some(name.as_string().cheap_clone());
                    }
                }
                None => {
                    self.current = data.prototype;
                    self.index = 0;
                }
            }
        }
    }
}

// ============================================================================
// Heap object operations
// ============================================================================

impl Heap {
    /// Allocate a plain object (one host handle)
    pub fn create_object(&mut self) -> ObjectId {
        self.alloc(ObjectKind::Plain)
    }

    /// Allocate a plain object inheriting from `prototype`
    pub fn create_with_prototype(&mut self, prototype: ObjectId) -> ObjectId {
        let id = self.alloc(ObjectKind::Plain);
        self.set_prototype(id, Some(prototype));
        id
    }

    /// Allocate a function object wrapping a native closure
    pub fn create_function<F>(&mut self, name: &str, func: F) -> ObjectId
    where
        F: Fn(&mut Heap, Option<ObjectId>, &[Value]) -> Value + Send + Sync + 'static,
    {
        self.alloc(ObjectKind::Function(NativeFunction {
            name: AsString::from(name),
            func: Arc::new(func),
        }))
    }

    /// Allocate a timer firing `handler` every `interval` seconds
    pub fn create_timer(&mut self, interval: f64, handler: Option<ObjectId>) -> ObjectId {
        self.alloc(ObjectKind::Timer(TimerState::new(interval, handler)))
    }

    pub fn kind(&self, id: ObjectId) -> Option<&ObjectKind> {
        self.data(id).map(|data| &data.kind)
    }

    pub fn is_callable(&self, id: ObjectId) -> bool {
        self.kind(id).is_some_and(ObjectKind::is_callable)
    }

    pub fn timer(&self, id: ObjectId) -> Option<&TimerState> {
        match self.kind(id)? {
            ObjectKind::Timer(timer) => Some(timer),
            _ => None,
        }
    }

    /// Play state of a sound or video object
    pub fn media(&self, id: ObjectId) -> Option<&MediaState> {
        match self.kind(id)? {
            ObjectKind::Sound(media) | ObjectKind::Video(media) => Some(media),
            _ => None,
        }
    }

    pub fn media_mut(&mut self, id: ObjectId) -> Option<&mut MediaState> {
        match &mut self.data_mut(id)?.kind {
            ObjectKind::Sound(media) | ObjectKind::Video(media) => Some(media),
            _ => None,
        }
    }

    pub fn prototype(&self, id: ObjectId) -> Option<ObjectId> {
        self.data(id)?.prototype
    }

    /// Replace the prototype link.
    ///
    /// Refuses (returns false) a link that would make the chain circular.
    pub fn set_prototype(&mut self, id: ObjectId, prototype: Option<ObjectId>) -> bool {
        if !self.is_alive(id) {
            return false;
        }
        if let Some(proto) = prototype {
            if !self.is_alive(proto) {
                return false;
            }
            let mut cursor = Some(proto);
            while let Some(current) = cursor {
                if current == id {
                    return false;
                }
                cursor = self.prototype(current);
            }
        }
        let Some(data) = self.data_mut(id) else {
            return false;
        };
        let old = std::mem::replace(&mut data.prototype, prototype);
        if let Some(proto) = prototype {
            self.link(proto);
        }
        if let Some(old) = old {
            self.unlink(old);
        }
        self.flush();
        true
    }

    /// Number of own properties
    pub fn own_len(&self, id: ObjectId) -> usize {
        self.data(id).map_or(0, |data| data.properties.len())
    }

    /// Own property names in insertion order, enumerable or not
    pub fn own_keys(&self, id: ObjectId) -> Vec<AsString> {
        self.data(id).map_or_else(Vec::new, |data| {
            data.properties
                .iter()
                .map(|(name, _)| name.as_string().cheap_clone())
                .collect()
        })
    }

    pub fn has_own_property(&self, id: ObjectId, name: &str) -> bool {
        self.data(id)
            .is_some_and(|data| data.properties.contains(name))
    }

    /// Look up a property on the receiver or its prototype chain.
    ///
    /// An accessor is returned bound to `id`, whichever level declared it.
    pub fn get(&self, id: ObjectId, name: &str) -> Option<Property> {
        let mut current = id;
        loop {
            let data = self.data(current)?;
            if let Some(property) = data.properties.get(name) {
                let mut property = property.clone();
                if let Value::Accessor(accessor) = property.value {
                    property.value = Value::Accessor(accessor.bind(id));
                }
                return Some(property);
            }
            current = data.prototype?;
        }
    }

    /// Look up a property and resolve accessors through their getter
    pub fn get_member(&mut self, id: ObjectId, name: &str) -> Option<Value> {
        let property = self.get(id, name)?;
        Some(self.resolve(&property.value))
    }

    /// Materialize a value: accessors run their getter, everything else is returned as is
    pub fn resolve(&mut self, value: &Value) -> Value {
        match value {
            Value::Accessor(accessor) => match accessor.getter {
                Some(getter) => self.call(getter, accessor.target, &[]).unwrap_or_default(),
                None => Value::Undefined,
            },
            other => other.cheap_clone(),
        }
    }

    /// Assign a property.
    ///
    /// An accessor found anywhere on the chain takes the write through its
    /// setter, bound to `id`; without a setter (or when read-only) the
    /// write is dropped. Otherwise the own property is updated in place or
    /// appended. Returns false when the write was dropped.
    pub fn set(&mut self, id: ObjectId, name: &str, value: Value) -> bool {
        let Some(data) = self.data(id) else {
            return false;
        };
        if let Some(own) = data.properties.get(name) {
            if !own.value.is_accessor() && own.flags.is_read_only() {
                return false;
            }
        }

        if let Some(found) = self.get(id, name) {
            if let Value::Accessor(accessor) = found.value {
                if found.flags.is_read_only() {
                    return false;
                }
                let Some(setter) = accessor.setter else {
                    return false;
                };
                return self.call(setter, accessor.target, &[value]).is_some();
            }
        }

        let value = self.apply_watch(id, name, value);
        let stored = self.write_own(id, name, value);
        self.flush();
        stored
    }

    /// Insert or replace an own data property with explicit flags,
    /// bypassing accessors, watchers and read-only checks.
    pub fn define_property(&mut self, id: ObjectId, name: &str, value: Value, flags: PropertyFlags) -> bool {
        let Some(data) = self.data_mut(id) else {
            return false;
        };
        let old = data
            .properties
            .insert(PropertyName::from(name), Property::with_flags(value.clone(), flags));
        self.link_value(&value);
        if let Some(old) = old {
            self.unlink_value(&old.value);
        }
        self.flush();
        true
    }

    /// Install an accessor as an own property.
    ///
    /// Replacing an existing own property keeps its position and flags.
    pub fn define_accessor(
        &mut self,
        id: ObjectId,
        name: &str,
        getter: Option<ObjectId>,
        setter: Option<ObjectId>,
    ) -> bool {
        let value = Value::Accessor(Accessor::new(getter, setter));
        let Some(data) = self.data_mut(id) else {
            return false;
        };
        let old = match data.properties.get_mut(name) {
            Some(property) => std::mem::replace(&mut property.value, value.clone()),
            None => {
                data.properties
                    .insert(PropertyName::from(name), Property::new(value.clone()));
                Value::Undefined
            }
        };
        self.link_value(&value);
        self.unlink_value(&old);
        self.flush();
        true
    }

    /// Own property flags
    pub fn flags(&self, id: ObjectId, name: &str) -> Option<PropertyFlags> {
        Some(self.data(id)?.properties.get(name)?.flags)
    }

    /// Add flags to an existing own property.
    ///
    /// Returns false if the property does not exist.
    pub fn set_flags(&mut self, id: ObjectId, name: &str, flags: PropertyFlags) -> bool {
        self.update_flags(id, name, flags, PropertyFlags::empty())
    }

    /// Set and clear flags on an existing own property; protected flags stay as they are
    pub fn update_flags(
        &mut self,
        id: ObjectId,
        name: &str,
        set_true: PropertyFlags,
        set_false: PropertyFlags,
    ) -> bool {
        let Some(property) = self
            .data_mut(id)
            .and_then(|data| data.properties.get_mut(name))
        else {
            return false;
        };
        property.flags.update(set_true, set_false);
        true
    }

    /// Remove an own property. Fails when absent or non-deletable.
    pub fn delete(&mut self, id: ObjectId, name: &str) -> bool {
        let Some(data) = self.data_mut(id) else {
            return false;
        };
        match data.properties.get(name) {
            Some(property) if property.flags.is_deletable() => {}
            _ => return false,
        }
        let Some(removed) = data.properties.remove(name) else {
            return false;
        };
        self.unlink_value(&removed.value);
        self.flush();
        true
    }

    /// Enumerable property names, own first, then along the prototype chain
    pub fn enumerate(&self, id: ObjectId) -> Enumerate<'_> {
        Enumerate {
            heap: self,
            current: self.is_alive(id).then_some(id),
            index: 0,
        }
    }

    /// Register a watcher on `name`.
    ///
    /// Before each data write the callback runs with
    /// `(name, old, new, user_data)` and `this` set to the object; the value
    /// it returns is what gets stored. Replaces any previous watcher.
    pub fn watch(&mut self, id: ObjectId, name: &str, callback: ObjectId, user_data: Value) -> bool {
        if !self.is_callable(callback) {
            return false;
        }
        let Some(data) = self.data_mut(id) else {
            return false;
        };
        let old = data.watches.insert(
            PropertyName::from(name),
            Watch {
                callback,
                user_data: user_data.clone(),
            },
        );
        self.link(callback);
        self.link_value(&user_data);
        if let Some(old) = old {
            self.release_watch(&old);
        }
        self.flush();
        true
    }

    pub fn unwatch(&mut self, id: ObjectId, name: &str) -> bool {
        let Some(data) = self.data_mut(id) else {
            return false;
        };
        let Some(old) = data.watches.remove(&PropertyName::from(name)) else {
            return false;
        };
        self.release_watch(&old);
        self.flush();
        true
    }

    fn release_watch(&mut self, watch: &Watch) {
        self.unlink(watch.callback);
        self.unlink_value(&watch.user_data);
    }

    fn apply_watch(&mut self, id: ObjectId, name: &str, value: Value) -> Value {
        let watch = match self.data(id) {
            Some(data) if !data.watches.is_empty() => {
                data.watches.get(&PropertyName::from(name)).cloned()
            }
            _ => None,
        };
        let Some(watch) = watch else {
            return value;
        };
        let old = self.get(id, name).map(|p| p.value).unwrap_or_default();
        let args = [Value::from(name), old, value.cheap_clone(), watch.user_data];
        self.call(watch.callback, Some(id), &args).unwrap_or(value)
    }

    fn write_own(&mut self, id: ObjectId, name: &str, value: Value) -> bool {
        let Some(data) = self.data_mut(id) else {
            return false;
        };
        let old = match data.properties.get_mut(name) {
            Some(property) => {
                // A watcher may have locked the slot
                if property.flags.is_read_only() {
                    return false;
                }
                std::mem::replace(&mut property.value, value.cheap_clone())
            }
            None => {
                data.properties
                    .insert(PropertyName::from(name), Property::new(value.cheap_clone()));
                Value::Undefined
            }
        };
        self.link_value(&value);
        self.unlink_value(&old);
        true
    }

    /// Invoke a function object. Returns `None` if `function` is not callable.
    pub fn call(&mut self, function: ObjectId, this: Option<ObjectId>, args: &[Value]) -> Option<Value> {
        let func = match &self.data(function)?.kind {
            ObjectKind::Function(native) => native.func.cheap_clone(),
            _ => return None,
        };
        Some(func(self, this, args))
    }

    /// Call the function-valued member `name` with `this` bound to the receiver
    pub fn call_method(&mut self, this: ObjectId, name: &str, args: &[Value]) -> Option<Value> {
        let function = self.get_member(this, name)?.as_object()?;
        self.call(function, Some(this), args)
    }

    /// Deliver an event to the object's handler member.
    ///
    /// Returns whether a handler ran.
    pub fn on_event(&mut self, id: ObjectId, event: &Event) -> bool {
        let name = event.id.function_name();
        self.call_method(id, &name, &event.args).is_some()
    }

    /// Advance time-driven objects by `delta` seconds.
    ///
    /// Timers fire their handler once per elapsed interval and media move
    /// their play position; other kinds ignore time. Returns whether the
    /// object did anything.
    pub fn advance(&mut self, id: ObjectId, delta: f64) -> bool {
        let Some(data) = self.data_mut(id) else {
            return false;
        };
        let (handler, due) = match &mut data.kind {
            ObjectKind::Timer(timer) => (timer.handler, timer.tick(delta)),
            ObjectKind::Sound(media) | ObjectKind::Video(media) => return media.advance(delta),
            ObjectKind::Plain
            | ObjectKind::Function(_)
            | ObjectKind::Transform
            | ObjectKind::Plugin(_) => return false,
        };
        if let Some(handler) = handler {
            for _ in 0..due {
                if self.call(handler, Some(id), &[]).is_none() {
                    break;
                }
            }
        }
        due > 0
    }

    /// Copy every own property of `src` onto `target` through [`Heap::set`]
    pub fn copy_to(&mut self, src: ObjectId, target: ObjectId) -> bool {
        if !self.is_alive(src) || !self.is_alive(target) {
            return false;
        }
        for name in self.own_keys(src) {
            if let Some(value) = self.get_member(src, name.as_str()) {
                self.set(target, name.as_str(), value);
            }
        }
        true
    }

    /// Resolve a dotted or slash-separated member path from `root`
    pub fn find_target(&mut self, root: ObjectId, path: &str) -> Option<ObjectId> {
        let mut current = root;
        for segment in path.split(['.', '/']) {
            if segment.is_empty() {
                warn!(path, "invalid target path");
                return None;
            }
            current = self.get_member(current, segment)?.as_object()?;
        }
        Some(current)
    }

    /// Log an object's own members at debug level
    pub fn dump(&self, id: ObjectId) {
        let Some(data) = self.data(id) else {
            debug!(object = %id, "dump of a dead object");
            return;
        };
        debug!(object = %id, kind = data.kind.name(), members = data.properties.len(), "dump");
        for (name, property) in data.properties.iter() {
            debug!(object = %id, name = %name, value = ?property.value, flags = ?property.flags, "member");
        }
        if let Some(prototype) = data.prototype {
            debug!(object = %id, prototype = %prototype, "prototype");
        }
    }
}
