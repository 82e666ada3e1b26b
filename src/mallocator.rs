//! Leaf policies: the system allocator and the allocator that never succeeds.

use std::mem;

use libc::{c_void, free, malloc, posix_memalign};
use tracing::trace;

use crate::block::Block;
use crate::traits::{Allocator, Owns};

/// Delegates to the C allocator.
///
/// It keeps no bookkeeping, so it cannot answer ownership queries and does not
/// implement [`Owns`]. Use it as a parent or as the last stage of a chain.
#[derive(Debug, Default, Clone, Copy)]
pub struct Mallocator;

impl Allocator for Mallocator {
  const ALIGNMENT: usize = mem::size_of::<usize>();

  fn allocate(
    &mut self,
    size: usize,
    alignment: usize,
  ) -> Block {
    debug_assert!(size > 0, "allocate: size must be > 0");
    debug_assert!(alignment.is_power_of_two());

    let ptr = if alignment <= mem::size_of::<usize>() {
      unsafe { malloc(size) }
    } else {
      let mut out: *mut c_void = std::ptr::null_mut();

      match unsafe { posix_memalign(&mut out, alignment, size) } {
        0 => out,
        _ => std::ptr::null_mut(),
      }
    };

    if ptr.is_null() {
      trace!(size, alignment, "system allocator refused request");
      return Block::empty();
    }

    Block::new(ptr.cast(), size)
  }

  fn deallocate(
    &mut self,
    block: Block,
  ) {
    if block.is_empty() {
      return;
    }

    unsafe { free(block.ptr.cast()) }
  }
}

/// Always fails. Terminates a chain explicitly.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoAllocator;

impl Allocator for NoAllocator {
  const ALIGNMENT: usize = 1;

  fn allocate(
    &mut self,
    _size: usize,
    _alignment: usize,
  ) -> Block {
    Block::empty()
  }

  fn deallocate(
    &mut self,
    block: Block,
  ) {
    debug_assert!(block.is_empty(), "NoAllocator never hands out memory");
  }
}

impl Owns for NoAllocator {
  fn owns(
    &self,
    _block: Block,
  ) -> bool {
    false
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn mallocator_serves_word_alignment() {
    let mut allocator = Mallocator;

    let block = allocator.allocate(24, 8);

    assert!(!block.is_empty());
    assert_eq!(block.size, 24);
    assert_eq!(block.ptr as usize % 8, 0);

    unsafe { block.ptr.write_bytes(0xAB, block.size) };

    allocator.deallocate(block);
  }

  #[test]
  fn mallocator_serves_over_alignment() {
    let mut allocator = Mallocator;

    for alignment in [16, 64, 256, 4096] {
      let block = allocator.allocate(100, alignment);

      assert!(!block.is_empty());
      assert_eq!(block.ptr as usize % alignment, 0);

      allocator.deallocate(block);
    }
  }

  #[test]
  fn no_allocator_always_fails() {
    let mut allocator = NoAllocator;

    assert!(allocator.allocate(1, 1).is_empty());
    assert!(allocator.allocate(4096, 64).is_empty());
    assert!(!allocator.owns(Block::new(0x1000 as *mut u8, 8)));

    allocator.deallocate(Block::empty());
  }
}
