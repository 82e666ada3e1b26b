//! Process-wide allocator instances.
//!
//! Rust has no per-type statics for generic code, so each process-wide
//! instance is declared once with [`global_instance!`](crate::global_instance)
//! and then reached through the zero-sized [`GlobalAllocator`] facade.
//!
//! The instance is built on first use and never dropped. Statics must be
//! `Sync`, so the instance sits behind a lock; that serialises callers but is
//! not a substitute for a per-thread allocator on hot paths.
//!
//! Prefer passing an allocator (or `&mut` to one, or a
//! [`SharedAllocator`](crate::SharedAllocator)) where the call graph allows.

use std::marker::PhantomData;

#[doc(hidden)]
pub use parking_lot::Mutex;

use crate::block::Block;
use crate::traits::{Allocator, Owns};

/// A named, lazily built, process-wide allocator instance.
///
/// # Deadlocks
///
/// Every call locks the instance and the lock is not re-entrant. The
/// instance must not reach itself while serving a call: a policy stored in
/// `G` whose parent (at any depth) is `GlobalAllocator<G>` deadlocks on its
/// first growth. Parenting on a different instance is fine.
pub trait GlobalInstance: 'static {
  type Alloc: Allocator + Send + 'static;

  /// Returns the instance, building it on the first call.
  fn instance() -> &'static Mutex<Self::Alloc>;
}

/// Declares a [`GlobalInstance`].
///
/// ```rust
/// use stratalloc::{Allocator, FreeListAllocator, GlobalAllocator, Mallocator, global_instance};
///
/// global_instance!(pub Heap: FreeListAllocator<Mallocator, 4096> = FreeListAllocator::new(););
///
/// let mut heap = GlobalAllocator::<Heap>::new();
/// let block = heap.allocate(64, 8);
/// assert!(!block.is_empty());
/// heap.deallocate(block);
/// ```
#[macro_export]
macro_rules! global_instance {
  ($(#[$meta:meta])* $vis:vis $name:ident : $ty:ty = $init:expr ;) => {
    $(#[$meta])*
    #[derive(Debug, Default, Clone, Copy)]
    $vis struct $name;

    impl $crate::GlobalInstance for $name {
      type Alloc = $ty;

      fn instance() -> &'static $crate::global::Mutex<$ty> {
        static INSTANCE: ::std::sync::OnceLock<$crate::global::Mutex<$ty>> = ::std::sync::OnceLock::new();

        INSTANCE.get_or_init(|| $crate::global::Mutex::new($init))
      }
    }
  };
}

/// Stateless handle forwarding to `G`'s process-wide instance.
pub struct GlobalAllocator<G: GlobalInstance> {
  _instance: PhantomData<G>,
}

impl<G: GlobalInstance> GlobalAllocator<G> {
  pub const fn new() -> Self {
    Self {
      _instance: PhantomData,
    }
  }

  /// Runs `f` with exclusive access to the instance.
  pub fn with<R>(f: impl FnOnce(&mut G::Alloc) -> R) -> R {
    f(&mut G::instance().lock())
  }
}

impl<G: GlobalInstance> Default for GlobalAllocator<G> {
  fn default() -> Self {
    Self::new()
  }
}

impl<G: GlobalInstance> Clone for GlobalAllocator<G> {
  fn clone(&self) -> Self {
    *self
  }
}

impl<G: GlobalInstance> Copy for GlobalAllocator<G> {}

impl<G: GlobalInstance> Allocator for GlobalAllocator<G> {
  const ALIGNMENT: usize = <G::Alloc as Allocator>::ALIGNMENT;

  fn allocate(
    &mut self,
    size: usize,
    alignment: usize,
  ) -> Block {
    G::instance().lock().allocate(size, alignment)
  }

  fn deallocate(
    &mut self,
    block: Block,
  ) {
    G::instance().lock().deallocate(block)
  }
}

impl<G: GlobalInstance> Owns for GlobalAllocator<G>
where
  G::Alloc: Owns,
{
  fn owns(
    &self,
    block: Block,
  ) -> bool {
    G::instance().lock().owns(block)
  }
}
