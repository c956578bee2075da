//! Object wrappers and the generational heap that hands out their handles.

use std::any::Any;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use tracing::trace;

use crate::ids::ClassId;

/// Destruction routine for a wrapped native instance.
pub type Deleter = Arc<dyn Fn(Box<dyn Any + Send + Sync>) + Send + Sync>;

/// Handle to a wrapped object.
///
/// This is the caller-visible reference to an [`ObjectWrapper`] stored in a
/// [`WrapperHeap`]. The generation detects handles that outlived their
/// wrapper.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct WrapperHandle {
    /// Index into WrapperHeap.slots
    pub index: u32,
    /// Generation for use-after-free detection
    pub generation: u32,
}

impl WrapperHandle {
    /// Create a new wrapper handle.
    pub fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }
}

/// Owns one native instance on behalf of the caller.
///
/// The ownership flag is checked and cleared atomically on release, so the
/// destruction routine runs at most once no matter how many times (or from
/// how many paths) release is requested.
pub struct ObjectWrapper {
    class: ClassId,
    instance: Mutex<Option<Box<dyn Any + Send + Sync>>>,
    owned: AtomicBool,
    deleter: Option<Deleter>,
}

impl ObjectWrapper {
    /// Wrap a native instance of `class`.
    pub fn new(
        class: ClassId,
        instance: Box<dyn Any + Send + Sync>,
        deleter: Option<Deleter>,
    ) -> Self {
        Self {
            class,
            instance: Mutex::new(Some(instance)),
            owned: AtomicBool::new(true),
            deleter,
        }
    }

    /// The class this wrapper belongs to.
    pub fn class(&self) -> ClassId {
        self.class
    }

    /// Whether the wrapper still owns its instance.
    pub fn is_owned(&self) -> bool {
        self.owned.load(Ordering::Acquire)
    }

    /// Destroy the instance.
    ///
    /// Returns true if this call performed the destruction; every later call
    /// is a no-op returning false.
    pub fn release(&self) -> bool {
        if !self.owned.swap(false, Ordering::AcqRel) {
            return false;
        }
        let instance = self.instance.lock().take();
        if let Some(instance) = instance {
            match &self.deleter {
                Some(deleter) => deleter(instance),
                None => drop(instance),
            }
        }
        trace!(class = %self.class, "released wrapped instance");
        true
    }

    /// Run `f` against the wrapped instance.
    ///
    /// Blocks while another caller holds the instance. Returns `None` once
    /// the wrapper has been released.
    pub fn with_instance<R>(
        &self,
        f: impl FnOnce(&mut (dyn Any + Send + Sync + 'static)) -> R,
    ) -> Option<R> {
        let mut guard = self.instance.lock();
        guard.as_deref_mut().map(f)
    }

    /// Like [`with_instance`](Self::with_instance) but gives up instead of
    /// blocking when the instance is already in use.
    pub fn try_with_instance<R>(
        &self,
        f: impl FnOnce(&mut (dyn Any + Send + Sync + 'static)) -> R,
    ) -> Option<R> {
        let mut guard = self.instance.try_lock()?;
        guard.as_deref_mut().map(f)
    }

    /// Typed access to the wrapped instance.
    pub fn with<T: Any, R>(&self, f: impl FnOnce(&mut T) -> R) -> Option<R> {
        self.with_instance(|instance| instance.downcast_mut::<T>().map(f))
            .flatten()
    }
}

impl Drop for ObjectWrapper {
    fn drop(&mut self) {
        self.release();
    }
}

impl fmt::Debug for ObjectWrapper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectWrapper")
            .field("class", &self.class)
            .field("owned", &self.is_owned())
            .field("has_deleter", &self.deleter.is_some())
            .finish()
    }
}

/// Storage for live wrappers with generational indices.
///
/// When a wrapper is removed its slot is reused but the generation is
/// incremented, so stale handles are detected instead of aliasing a newer
/// object.
pub struct WrapperHeap {
    slots: Vec<WrapperSlot>,
    free_list: Vec<u32>,
}

struct WrapperSlot {
    generation: u32,
    wrapper: Option<Arc<ObjectWrapper>>,
}

impl WrapperHeap {
    /// Create a new empty heap.
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free_list: Vec::new(),
        }
    }

    /// Store a wrapper and hand out its handle.
    pub fn insert(&mut self, wrapper: ObjectWrapper) -> WrapperHandle {
        let wrapper = Arc::new(wrapper);

        if let Some(index) = self.free_list.pop()
            && let Some(slot) = self.slots.get_mut(index as usize)
        {
            slot.wrapper = Some(wrapper);
            return WrapperHandle::new(index, slot.generation);
        }

        let index = self.slots.len() as u32;
        self.slots.push(WrapperSlot {
            generation: 0,
            wrapper: Some(wrapper),
        });
        WrapperHandle::new(index, 0)
    }

    /// Look up a live wrapper.
    ///
    /// Returns None if the handle is stale.
    pub fn get(&self, handle: WrapperHandle) -> Option<&Arc<ObjectWrapper>> {
        let slot = self.slots.get(handle.index as usize)?;
        if slot.generation != handle.generation {
            return None;
        }
        slot.wrapper.as_ref()
    }

    /// Whether the handle refers to a live wrapper.
    pub fn contains(&self, handle: WrapperHandle) -> bool {
        self.get(handle).is_some()
    }

    /// Detach a wrapper from the heap, invalidating its handle.
    ///
    /// The wrapper is returned unreleased; dropping the last reference to it
    /// releases the instance.
    pub fn remove(&mut self, handle: WrapperHandle) -> Option<Arc<ObjectWrapper>> {
        let slot = self.slots.get_mut(handle.index as usize)?;
        if slot.generation != handle.generation {
            return None;
        }
        let wrapper = slot.wrapper.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free_list.push(handle.index);
        Some(wrapper)
    }

    /// Number of live wrappers.
    pub fn len(&self) -> usize {
        self.slots.len() - self.free_list.len()
    }

    /// Whether the heap holds no live wrappers.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for WrapperHeap {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for WrapperHeap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WrapperHeap")
            .field("slot_count", &self.slots.len())
            .field("free_count", &self.free_list.len())
            .finish()
    }
}
