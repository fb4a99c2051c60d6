//! Reference-counted shared pointers with a selectable lock policy.
//!
//! [`Shared<T, C>`] owns its pointee through a heap-allocated control block
//! and destroys it exactly once, when the last owner is dropped. The second
//! type parameter picks how the reference count is guarded: unsynchronized
//! ([`UnsyncCount`]), lock-free ([`AtomicCount`]) or mutex-guarded
//! ([`MutexCount`], the default).
//!
//! ```
//! use polrc::Shared;
//!
//! let a: Shared<i32> = Shared::new(7);
//! let b = a.clone();
//! assert_eq!(b.as_ref(), Some(&7));
//! assert_eq!(b.ref_count(), 2);
//! ```

mod counted;
mod refcount;
mod strong;

pub use refcount::{AtomicCount, MutexCount, RefCount, SyncRefCount, UnsyncCount};
pub use strong::{AtomicShared, LocalShared, MutexShared, Shared};
