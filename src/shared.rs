use std::cell::RefCell;
use std::rc::Rc;

use crate::block::Block;
use crate::traits::{Allocator, Owns};

/// Cloneable handle to one allocator shared by several single-threaded
/// consumers.
///
/// Every clone forwards to the same instance, so two containers (or two
/// composed policies) can be handed the same parent explicitly.
pub struct SharedAllocator<A> {
  inner: Rc<RefCell<A>>,
}

impl<A: Allocator> SharedAllocator<A> {
  pub fn new(allocator: A) -> Self {
    Self {
      inner: Rc::new(RefCell::new(allocator)),
    }
  }

  /// Runs `f` with exclusive access to the allocator.
  ///
  /// # Panics
  ///
  /// Panics if called re-entrantly from inside another `with` or an
  /// allocation on the same instance.
  pub fn with<R>(
    &self,
    f: impl FnOnce(&mut A) -> R,
  ) -> R {
    f(&mut self.inner.borrow_mut())
  }

  /// Number of handles to this allocator.
  pub fn handles(&self) -> usize {
    Rc::strong_count(&self.inner)
  }
}

impl<A> Clone for SharedAllocator<A> {
  fn clone(&self) -> Self {
    Self {
      inner: Rc::clone(&self.inner),
    }
  }
}

impl<A: Allocator> Allocator for SharedAllocator<A> {
  const ALIGNMENT: usize = A::ALIGNMENT;

  fn allocate(
    &mut self,
    size: usize,
    alignment: usize,
  ) -> Block {
    self.inner.borrow_mut().allocate(size, alignment)
  }

  fn deallocate(
    &mut self,
    block: Block,
  ) {
    self.inner.borrow_mut().deallocate(block)
  }
}

impl<A: Allocator + Owns> Owns for SharedAllocator<A> {
  fn owns(
    &self,
    block: Block,
  ) -> bool {
    self.inner.borrow().owns(block)
  }
}
