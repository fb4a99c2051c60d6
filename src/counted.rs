use crate::refcount::RefCount;

/// How the managed resource is destroyed on the final release.
///
/// A closed set of variants replaces the classic virtual `dispose` hook;
/// the custom deleter is stored type-erased so one block type serves every
/// deleter. The constructor in `strong` re-applies the concrete pointee
/// type before the callable sees the pointer.
pub(crate) enum Disposer {
    /// Reconstitute the `Box` behind the pointer and drop it.
    Default,
    /// Hand the pointer to a caller-supplied callable. Must not panic.
    Deleter(Box<dyn FnMut(*mut ()) + Send>),
}

/// The control block: one reference count, the raw resource pointer and the
/// disposal strategy, shared by every handle that owns the resource.
///
/// A block is created with a count of one by the first handle and lives
/// until the release that observes the 1 -> 0 edge; that release frees the
/// block, and dropping it runs the disposer exactly once. Nothing but the
/// acquire/release protocol ever touches a block's lifetime, and no block
/// is reused after disposal.
///
/// The resource pointer is opaque here: a null resource is a valid thing to
/// count, and the block only inspects it to avoid reconstituting a `Box`
/// from null.
pub(crate) struct Counted<T, C: RefCount> {
    count: C,
    ptr: *mut T,
    disposer: Disposer,
}

impl<T, C: RefCount> Counted<T, C> {
    #[inline]
    pub(crate) fn new(ptr: *mut T) -> Self {
        Self {
            count: C::one(),
            ptr,
            disposer: Disposer::Default,
        }
    }

    #[inline]
    pub(crate) fn with_deleter(ptr: *mut T, deleter: Box<dyn FnMut(*mut ()) + Send>) -> Self {
        Self {
            count: C::one(),
            ptr,
            disposer: Disposer::Deleter(deleter),
        }
    }

    /// Registers one more owner.
    #[inline]
    pub(crate) fn acquire(&self) {
        self.count.increment();
    }

    /// Drops one owner. On the 1 -> 0 edge the block reclaims itself, which
    /// disposes the resource and then frees the block's own allocation.
    ///
    /// # Safety
    ///
    /// `block` must have been obtained from [`Counted::into_raw`] and the
    /// caller must hold an owner registered via construction or
    /// [`acquire`](Counted::acquire). An unmatched release can drive the
    /// count negative or dispose twice.
    #[inline]
    pub(crate) unsafe fn release(block: *mut Self) {
        if (*block).count.decrement() {
            drop(Box::from_raw(block));
        }
    }

    /// Moves the block to the heap and leaks it to the acquire/release
    /// protocol. From here on only [`release`](Counted::release) may free it.
    #[inline]
    pub(crate) fn into_raw(self) -> *mut Self {
        Box::into_raw(Box::new(self))
    }

    #[inline]
    pub(crate) fn ref_count(&self) -> u32 {
        self.count.load()
    }
}

impl<T, C: RefCount> Drop for Counted<T, C> {
    fn drop(&mut self) {
        match &mut self.disposer {
            Disposer::Default => {
                if !self.ptr.is_null() {
                    drop(unsafe { Box::from_raw(self.ptr) });
                }
            }
            Disposer::Deleter(deleter) => deleter(self.ptr.cast()),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use super::Counted;
    use crate::refcount::UnsyncCount;

    struct Token(Arc<AtomicUsize>);

    impl Drop for Token {
        fn drop(&mut self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn releases_dispose_on_the_final_edge_only() {
        let drops = Arc::new(AtomicUsize::new(0));
        let raw = Box::into_raw(Box::new(Token(drops.clone())));
        let block = Counted::<_, UnsyncCount>::new(raw).into_raw();
        unsafe {
            (*block).acquire();
            (*block).acquire();
            Counted::release(block);
            Counted::release(block);
            assert_eq!(drops.load(Ordering::SeqCst), 0);
            Counted::release(block);
        }
        assert_eq!(drops.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn null_resource_is_countable() {
        let block = Counted::<Token, UnsyncCount>::new(std::ptr::null_mut()).into_raw();
        unsafe { Counted::release(block) };
    }
}
