//! The allocator contract.
//!
//! Two tiers:
//!
//! - [`Allocator`] and [`Owns`] are the static tier. Policies are composed as
//!   type parameters and every call is resolved at compile time.
//! - [`DynAllocator`] is the object-safe tier for places that need to swap the
//!   allocator at runtime. Every `Allocator` is a `DynAllocator`.
//!
//! # Safety
//!
//! The methods are safe to call, but the memory they hand out is raw. A block
//! passed to `deallocate` must have come from `allocate` on the same
//! allocator (or one it owns) and must not be used afterwards. Breaking that
//! rule is caught by debug assertions at best.

use std::alloc::Layout;
use std::mem;
use std::ptr::{self, NonNull};

use crate::block::Block;
use crate::error::{AllocError, AllocResult};

/// A composable allocation policy.
pub trait Allocator {
  /// Alignment every successful allocation is guaranteed to meet, whatever
  /// the caller asked for.
  const ALIGNMENT: usize;

  /// Returns a block of at least `size` bytes aligned to `alignment`, or
  /// [`Block::empty`] when the request cannot be served.
  ///
  /// `size` must be non-zero and `alignment` a power of two.
  fn allocate(
    &mut self,
    size: usize,
    alignment: usize,
  ) -> Block;

  /// Gives back a block previously returned by [`Allocator::allocate`].
  fn deallocate(
    &mut self,
    block: Block,
  );
}

/// Ownership query, required wherever a policy is a routing target.
pub trait Owns {
  fn owns(
    &self,
    block: Block,
  ) -> bool;
}

impl<A: Allocator> Allocator for &mut A {
  const ALIGNMENT: usize = A::ALIGNMENT;

  #[inline]
  fn allocate(
    &mut self,
    size: usize,
    alignment: usize,
  ) -> Block {
    <A as Allocator>::allocate(*self, size, alignment)
  }

  #[inline]
  fn deallocate(
    &mut self,
    block: Block,
  ) {
    <A as Allocator>::deallocate(*self, block)
  }
}

impl<A: Owns> Owns for &mut A {
  #[inline]
  fn owns(
    &self,
    block: Block,
  ) -> bool {
    A::owns(*self, block)
  }
}

/// Object-safe view of an [`Allocator`].
pub trait DynAllocator {
  fn allocate(
    &mut self,
    size: usize,
    alignment: usize,
  ) -> Block;

  fn deallocate(
    &mut self,
    block: Block,
  );

  fn alignment(&self) -> usize;
}

impl<A: Allocator> DynAllocator for A {
  #[inline]
  fn allocate(
    &mut self,
    size: usize,
    alignment: usize,
  ) -> Block {
    Allocator::allocate(self, size, alignment)
  }

  #[inline]
  fn deallocate(
    &mut self,
    block: Block,
  ) {
    Allocator::deallocate(self, block)
  }

  fn alignment(&self) -> usize {
    A::ALIGNMENT
  }
}

/// Typed construction on top of allocate/deallocate.
pub trait AllocatorExt: Allocator {
  /// Moves `value` into freshly allocated memory.
  fn create<T>(
    &mut self,
    value: T,
  ) -> AllocResult<NonNull<T>> {
    let layout = Layout::new::<T>();

    if layout.size() == 0 {
      mem::forget(value);
      return Ok(NonNull::dangling());
    }

    let block = Allocator::allocate(self, layout.size(), layout.align());
    unsafe { place(block, layout, value) }
  }

  /// Drops the value behind `ptr` and releases its memory.
  ///
  /// # Safety
  ///
  /// `ptr` must come from [`AllocatorExt::create`] on this allocator and must
  /// not be used afterwards.
  unsafe fn destroy<T>(
    &mut self,
    ptr: NonNull<T>,
  ) {
    unsafe { ptr::drop_in_place(ptr.as_ptr()) };

    if mem::size_of::<T>() != 0 {
      Allocator::deallocate(self, Block::new(ptr.as_ptr().cast(), mem::size_of::<T>()));
    }
  }
}

impl<A: Allocator> AllocatorExt for A {}

impl dyn DynAllocator + '_ {
  /// Same as [`AllocatorExt::create`] for a runtime-selected allocator.
  pub fn create<T>(
    &mut self,
    value: T,
  ) -> AllocResult<NonNull<T>> {
    let layout = Layout::new::<T>();

    if layout.size() == 0 {
      mem::forget(value);
      return Ok(NonNull::dangling());
    }

    let block = DynAllocator::allocate(self, layout.size(), layout.align());
    unsafe { place(block, layout, value) }
  }

  /// Same as [`AllocatorExt::destroy`] for a runtime-selected allocator.
  ///
  /// # Safety
  ///
  /// `ptr` must come from `create` on this allocator and must not be used
  /// afterwards.
  pub unsafe fn destroy<T>(
    &mut self,
    ptr: NonNull<T>,
  ) {
    unsafe { ptr::drop_in_place(ptr.as_ptr()) };

    if mem::size_of::<T>() != 0 {
      DynAllocator::deallocate(self, Block::new(ptr.as_ptr().cast(), mem::size_of::<T>()));
    }
  }
}

/// Writes `value` into `block`.
///
/// # Safety
///
/// A non-empty `block` must be valid for writes of `layout.size()` bytes.
unsafe fn place<T>(
  block: Block,
  layout: Layout,
  value: T,
) -> AllocResult<NonNull<T>> {
  let Some(ptr) = NonNull::new(block.ptr.cast::<T>()) else {
    return Err(AllocError::OutOfMemory {
      size: layout.size(),
      alignment: layout.align(),
    });
  };

  debug_assert!(block.size >= layout.size());
  debug_assert_eq!(ptr.as_ptr() as usize % layout.align(), 0);

  unsafe { ptr.as_ptr().write(value) };
  Ok(ptr)
}
