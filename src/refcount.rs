use std::{cell::Cell, mem, sync::atomic::fence, sync::Mutex};

use atomic::{Atomic, Ordering};
use static_assertions::const_assert;

/// A reference counter guarded by one particular lock policy.
///
/// The counter starts at one and is mutated only through [`increment`] and
/// [`decrement`]. `decrement` reports whether it observed the final owner
/// leaving, i.e. the 1 -> 0 transition.
///
/// # Safety
///
/// The control block frees itself and disposes the managed resource on the
/// release that observes the 1 -> 0 edge. An implementation must therefore
/// report that edge exactly once, and must make every write performed by an
/// owner before its final `decrement` visible to the thread that receives
/// `true`. Counter overflow is not detected; more than `u32::MAX` live
/// owners is a caller bug.
///
/// [`increment`]: RefCount::increment
/// [`decrement`]: RefCount::decrement
pub unsafe trait RefCount {
    /// A fresh counter representing a single owner.
    fn one() -> Self;

    fn increment(&self);

    /// Returns `true` if this call dropped the count to zero.
    fn decrement(&self) -> bool;

    fn load(&self) -> u32;
}

/// Marker for counters that may be mutated from several threads at once.
///
/// # Safety
///
/// Implementing this for a counter without internal synchronization makes
/// [`Shared`](crate::Shared) hand out `Send`/`Sync` impls it cannot honor.
pub unsafe trait SyncRefCount: RefCount {}

/// Plain counter with no synchronization at all.
///
/// Correct only while every handle sharing a control block stays on one
/// thread; handles built over this policy are `!Send` and `!Sync`, so the
/// type system enforces that confinement.
pub struct UnsyncCount(Cell<u32>);

// The unsynchronized policy must cost exactly a bare integer.
const_assert!(mem::size_of::<UnsyncCount>() == mem::size_of::<u32>());

unsafe impl RefCount for UnsyncCount {
    #[inline(always)]
    fn one() -> Self {
        Self(Cell::new(1))
    }

    #[inline(always)]
    fn increment(&self) {
        self.0.set(self.0.get() + 1);
    }

    #[inline(always)]
    fn decrement(&self) -> bool {
        let remaining = self.0.get() - 1;
        self.0.set(remaining);
        remaining == 0
    }

    #[inline(always)]
    fn load(&self) -> u32 {
        self.0.get()
    }
}

/// Lock-free counter. Never blocks.
pub struct AtomicCount(Atomic<u32>);

const_assert!(Atomic::<u32>::is_lock_free());

unsafe impl RefCount for AtomicCount {
    #[inline(always)]
    fn one() -> Self {
        Self(Atomic::new(1))
    }

    #[inline(always)]
    fn increment(&self) {
        // A new owner can only be created from a live handle, which already
        // pins the count above zero, so a relaxed increment suffices.
        self.0.fetch_add(1, Ordering::Relaxed);
    }

    #[inline(always)]
    fn decrement(&self) -> bool {
        // A decrement-release + an acquire fence on the zero branch, as
        // recommended by Boost's atomic usage examples: the releasing
        // decrements of every other owner synchronize with the fence, so
        // the disposing thread sees all of their writes to the resource.
        if self.0.fetch_sub(1, Ordering::Release) == 1 {
            fence(Ordering::Acquire);
            return true;
        }
        false
    }

    #[inline(always)]
    fn load(&self) -> u32 {
        self.0.load(Ordering::SeqCst)
    }
}

unsafe impl SyncRefCount for AtomicCount {}

/// Mutex-guarded counter. The lock is scoped around one whole
/// increment or decrement-and-test, so the zero check is part of the same
/// critical section as the decrement that produced it.
pub struct MutexCount(Mutex<u32>);

impl MutexCount {
    #[inline]
    fn locked(&self) -> std::sync::MutexGuard<'_, u32> {
        // The count is a plain integer; a panic elsewhere cannot leave it
        // half-updated, so a poisoned lock is recovered rather than
        // unwinding out of a destructor-driven release.
        self.0.lock().unwrap_or_else(|e| e.into_inner())
    }
}

unsafe impl RefCount for MutexCount {
    #[inline]
    fn one() -> Self {
        Self(Mutex::new(1))
    }

    #[inline]
    fn increment(&self) {
        *self.locked() += 1;
    }

    #[inline]
    fn decrement(&self) -> bool {
        let mut count = self.locked();
        *count -= 1;
        *count == 0
    }

    #[inline]
    fn load(&self) -> u32 {
        *self.locked()
    }
}

unsafe impl SyncRefCount for MutexCount {}

#[cfg(test)]
mod tests {
    use super::*;

    fn count_to_three<C: RefCount>() {
        let count = C::one();
        assert_eq!(count.load(), 1);
        count.increment();
        count.increment();
        assert_eq!(count.load(), 3);
        assert!(!count.decrement());
        assert!(!count.decrement());
        assert_eq!(count.load(), 1);
        assert!(count.decrement());
    }

    #[test]
    fn unsync_counts_to_three() {
        count_to_three::<UnsyncCount>();
    }

    #[test]
    fn atomic_counts_to_three() {
        count_to_three::<AtomicCount>();
    }

    #[test]
    fn mutex_counts_to_three() {
        count_to_three::<MutexCount>();
    }

    #[test]
    fn zero_edge_is_reported_once() {
        let count = AtomicCount::one();
        count.increment();
        assert!(!count.decrement());
        assert!(count.decrement());
    }
}
