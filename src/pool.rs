//! Generic object pool for chunk buffers, column-buffer value vectors and
//! JSON parser buffers. Correctness never depends on reuse actually
//! happening; the pool only exists to cut allocator churn. Shared free
//! state is guarded with `parking_lot::Mutex` rather than the standard
//! library's mutex.

use parking_lot::Mutex;

/// Anything a pool can hand back into circulation. `reset` must leave the
/// value indistinguishable from freshly constructed: truncated to zero
/// length but still holding onto its allocated capacity.
pub trait Resettable {
    fn reset(&mut self);
}

/// A single-threaded-cooperative-per-user free list, safe to share across
/// readers/writers that don't overlap in time.
pub struct Pool<T> {
    free: Mutex<Vec<T>>,
    make: Box<dyn Fn() -> T + Send + Sync>,
}

impl<T: Resettable> Pool<T> {
    pub fn new(make: impl Fn() -> T + Send + Sync + 'static) -> Self {
        Pool { free: Mutex::new(Vec::new()), make: Box::new(make) }
    }

    /// Takes an item out of the pool, resetting it first; builds a fresh one
    /// if the pool is empty.
    pub fn acquire(&self) -> T {
        let item = self.free.lock().pop();
        match item {
            Some(mut v) => {
                v.reset();
                v
            }
            None => (self.make)(),
        }
    }

    /// Returns an item for future reuse. Does not reset eagerly — reset
    /// happens on the next `acquire`, so a released item never exposes
    /// stale state between release and the next acquire because nothing
    /// reads it in that window.
    pub fn release(&self, item: T) {
        self.free.lock().push(item);
    }

    pub fn len(&self) -> usize {
        self.free.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
