use crate::counted::Counted;
use crate::refcount::{AtomicCount, MutexCount, RefCount, SyncRefCount, UnsyncCount};

/// A shared-ownership pointer parameterized by the lock policy guarding its
/// reference count.
///
/// Every live `Shared` referencing the same control block co-owns the
/// resource; the resource is destroyed exactly once, by whichever owner is
/// dropped last. The handle keeps a cached copy of the raw resource pointer
/// so access never goes through the block.
///
/// Moving a `Shared` transfers ownership without touching the count; only
/// cloning and dropping do.
pub struct Shared<T, C: RefCount = MutexCount> {
    cnt: *mut Counted<T, C>,
    ptr: *mut T,
}

/// Single-threaded handle, counted without synchronization.
pub type LocalShared<T> = Shared<T, UnsyncCount>;
/// Thread-safe handle with a lock-free count.
pub type AtomicShared<T> = Shared<T, AtomicCount>;
/// Thread-safe handle with a mutex-guarded count. Same as the default.
pub type MutexShared<T> = Shared<T, MutexCount>;

unsafe impl<T: Send + Sync, C: SyncRefCount> Send for Shared<T, C> {}
unsafe impl<T: Send + Sync, C: SyncRefCount> Sync for Shared<T, C> {}

impl<T, C: RefCount> Shared<T, C> {
    /// An empty handle: no control block, no resource.
    #[inline]
    pub fn null() -> Self {
        Self {
            cnt: std::ptr::null_mut(),
            ptr: std::ptr::null_mut(),
        }
    }

    /// Moves `obj` to the heap and takes sole ownership of it.
    #[inline]
    pub fn new(obj: T) -> Self {
        unsafe { Self::from_raw(Box::into_raw(Box::new(obj))) }
    }

    /// Adopts a raw pointer, to be destroyed as a `Box` on the final
    /// release. `ptr` may be null; such a handle counts owners but never
    /// yields a reference.
    ///
    /// The pointer is owned from the moment this is entered: should the
    /// control-block allocation unwind, the half-built block is dropped and
    /// destroys the pointee, so a failed construction leaks nothing.
    ///
    /// # Safety
    ///
    /// `ptr` must be null or originate from `Box::into_raw`, and nothing
    /// else may free it afterwards.
    #[inline]
    pub unsafe fn from_raw(ptr: *mut T) -> Self {
        let cnt = Counted::new(ptr).into_raw();
        Self { cnt, ptr }
    }

    /// Adopts a raw pointer together with the callable that will destroy it.
    ///
    /// The deleter is moved into the control block and invoked exactly once,
    /// with `ptr`, on the final release; it is also the cleanup path should
    /// the block allocation unwind, so deleter semantics hold even for a
    /// construction that never completes. Deleters must not panic. `Send` is
    /// required because the final release may run on any owning thread.
    ///
    /// # Safety
    ///
    /// `ptr` must stay valid until the deleter runs, and nothing else may
    /// free it.
    #[inline]
    pub unsafe fn from_raw_with<F>(ptr: *mut T, mut deleter: F) -> Self
    where
        F: FnMut(*mut T) + Send + 'static,
    {
        let erased: Box<dyn FnMut(*mut ()) + Send> = Box::new(move |raw| deleter(raw.cast()));
        let cnt = Counted::with_deleter(ptr, erased).into_raw();
        Self { cnt, ptr }
    }

    /// True when no resource sits behind this handle, either because it is
    /// empty or because it was adopted from a null pointer.
    #[inline]
    pub fn is_null(&self) -> bool {
        self.ptr.is_null()
    }

    /// The cached raw resource pointer. Null for empty handles. The pointee
    /// stays valid for as long as this handle is alive.
    #[inline]
    pub fn as_ptr(&self) -> *mut T {
        self.ptr
    }

    /// Borrows the resource, if there is one.
    #[inline]
    pub fn as_ref(&self) -> Option<&T> {
        if self.cnt.is_null() {
            None
        } else {
            // A live handle pins the count at >= 1, so a non-null resource
            // cannot have been disposed yet.
            unsafe { self.ptr.as_ref() }
        }
    }

    /// Number of live owners of the resource; 0 for an empty handle.
    #[inline]
    pub fn ref_count(&self) -> u32 {
        unsafe { self.cnt.as_ref() }.map_or(0, Counted::ref_count)
    }
}

impl<T, C: RefCount> Clone for Shared<T, C> {
    #[inline]
    fn clone(&self) -> Self {
        if let Some(cnt) = unsafe { self.cnt.as_ref() } {
            cnt.acquire();
        }
        Self {
            cnt: self.cnt,
            ptr: self.ptr,
        }
    }

    /// The copy-assignment of the handle: releases whatever `self` owns
    /// (possibly disposing it right here) and then co-owns `source`'s
    /// resource.
    ///
    /// Identity is checked first, so assigning a handle a block it already
    /// references, itself included, is a complete no-op: no release, no
    /// acquire, no disposal.
    #[inline]
    fn clone_from(&mut self, source: &Self) {
        if self.cnt == source.cnt {
            return;
        }
        if !self.cnt.is_null() {
            unsafe { Counted::release(self.cnt) };
        }
        self.cnt = source.cnt;
        self.ptr = source.ptr;
        if let Some(cnt) = unsafe { self.cnt.as_ref() } {
            cnt.acquire();
        }
    }
}

impl<T, C: RefCount> Drop for Shared<T, C> {
    #[inline]
    fn drop(&mut self) {
        if !self.cnt.is_null() {
            unsafe { Counted::release(self.cnt) };
        }
    }
}

impl<T, C: RefCount> Default for Shared<T, C> {
    #[inline]
    fn default() -> Self {
        Self::null()
    }
}

impl<T, C: RefCount> PartialEq for Shared<T, C> {
    /// Two handles are equal when they reference the same control block.
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.cnt == other.cnt
    }
}
