use tracing::{debug, trace};

use crate::align::alignment_adjustment;
use crate::block::Block;
use crate::error::{AllocError, AllocResult};
use crate::traits::{Allocator, Owns};

/// Bump allocator over one block of `S` bytes taken from `P` at construction.
///
/// ```text
///   ┌─────┬───┬─────┬─────┬──────────────────────────────┐
///   │ A1  │pad│ A2  │ A3  │          free                │
///   └─────┴───┴─────┴─────┴──────────────────────────────┘
///   ▲                     ▲                              ▲
///   start               cursor                     start + S
/// ```
///
/// It never grows. Only the most recent allocation can be given back
/// individually; everything else is reclaimed by [`deallocate_all`].
///
/// [`deallocate_all`]: LinearAllocator::deallocate_all
pub struct LinearAllocator<P: Allocator, const S: usize> {
  parent: P,
  memory: Block,
  used: usize,
  last: Option<Rollback>,
}

#[derive(Debug, Clone, Copy)]
struct Rollback {
  start: usize,
  cursor: usize,
}

// The block is exclusively owned; moving the allocator moves that ownership.
unsafe impl<P: Allocator + Send, const S: usize> Send for LinearAllocator<P, S> {}

impl<P: Allocator + Default, const S: usize> LinearAllocator<P, S> {
  pub fn new() -> AllocResult<Self> {
    Self::with_parent(P::default())
  }
}

impl<P: Allocator, const S: usize> LinearAllocator<P, S> {
  /// Takes `S` bytes from `parent`, failing if it cannot provide them.
  pub fn with_parent(mut parent: P) -> AllocResult<Self> {
    const { assert!(S > 0, "LinearAllocator needs a non-empty block") };

    let memory = parent.allocate(S, P::ALIGNMENT);

    if memory.is_empty() {
      debug!(size = S, alignment = P::ALIGNMENT, "linear allocator could not reserve its block");
      return Err(AllocError::ParentExhausted {
        size: S,
        alignment: P::ALIGNMENT,
      });
    }

    Ok(Self {
      parent,
      memory,
      used: 0,
      last: None,
    })
  }

  pub const fn capacity(&self) -> usize {
    S
  }

  /// Bytes consumed so far, alignment padding included.
  pub fn used(&self) -> usize {
    self.used
  }

  pub fn remaining(&self) -> usize {
    S - self.used
  }

  /// Resets the cursor to the start of the block.
  ///
  /// Every block handed out before this call is invalid afterwards.
  pub fn deallocate_all(&mut self) {
    self.used = 0;
    self.last = None;
  }
}

impl<P: Allocator, const S: usize> Allocator for LinearAllocator<P, S> {
  const ALIGNMENT: usize = P::ALIGNMENT;

  fn allocate(
    &mut self,
    size: usize,
    alignment: usize,
  ) -> Block {
    debug_assert!(size > 0, "allocate: size must be > 0");
    debug_assert!(alignment.is_power_of_two());

    if size == 0 {
      return Block::empty();
    }

    let alignment = alignment.max(Self::ALIGNMENT);
    let cursor = self.memory.ptr.wrapping_add(self.used);
    let start = self.used + alignment_adjustment(cursor, alignment);

    let end = match start.checked_add(size) {
      Some(end) if end <= S => end,
      _ => {
        trace!(size, alignment, remaining = self.remaining(), "linear allocator exhausted");
        return Block::empty();
      }
    };

    self.last = Some(Rollback {
      start,
      cursor: self.used,
    });
    self.used = end;

    // `start + size <= S`, so the pointer stays inside the owned block.
    Block::new(unsafe { self.memory.ptr.add(start) }, size)
  }

  /// Rolls the cursor back if `block` ends at the cursor, otherwise does
  /// nothing. Freeing in LIFO order reclaims every block.
  fn deallocate(
    &mut self,
    block: Block,
  ) {
    if block.is_empty() {
      return;
    }

    debug_assert!(self.owns(block), "deallocate: block not owned by this allocator");

    let offset = block.ptr as usize - self.memory.ptr as usize;

    if offset + block.size != self.used {
      return;
    }

    // The newest block also gives back the padding in front of it.
    self.used = match self.last.take() {
      Some(last) if last.start == offset => last.cursor,
      _ => offset,
    };
  }
}

impl<P: Allocator, const S: usize> Owns for LinearAllocator<P, S> {
  fn owns(
    &self,
    block: Block,
  ) -> bool {
    self.memory.contains(block)
  }
}

impl<P: Allocator, const S: usize> Drop for LinearAllocator<P, S> {
  fn drop(&mut self) {
    self.parent.deallocate(self.memory);
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::mallocator::{Mallocator, NoAllocator};

  type Arena = LinearAllocator<Mallocator, 256>;

  #[test]
  fn test_alloc() {
    let mut allocator = Arena::new().unwrap();

    let first = allocator.allocate(8, 8);
    let first_addr = first.ptr as *mut u64;

    unsafe {
      *first_addr = 3u64;
      assert_eq!(*first_addr, 3);
    }

    let size: usize = 6;
    let second = allocator.allocate(size * 2, 2);
    let second_addr = second.ptr as *mut u16;

    unsafe {
      for i in 0..size {
        *(second_addr.add(i)) = (i + 1) as u16;
      }

      assert_eq!(*first_addr, 3);

      for i in 0..size {
        assert_eq!((i + 1) as u16, *(second_addr.add(i)))
      }
    }

    assert!(second.ptr >= first.end());
    assert!(allocator.owns(first));
    assert!(allocator.owns(second));
  }

  #[test]
  fn rollback_restores_cursor() {
    let mut allocator = Arena::new().unwrap();

    allocator.allocate(3, 1);
    let before = allocator.used();

    let block = allocator.allocate(16, 16);
    assert!(allocator.used() > before);

    allocator.deallocate(block);
    assert_eq!(allocator.used(), before);

    let again = allocator.allocate(16, 16);
    assert_eq!(again.ptr, block.ptr);
  }

  #[test]
  fn deallocating_non_last_block_is_noop() {
    let mut allocator = Arena::new().unwrap();

    let first = allocator.allocate(16, 8);
    allocator.allocate(16, 8);
    let used = allocator.used();

    allocator.deallocate(first);

    assert_eq!(allocator.used(), used);
  }

  #[test]
  fn lifo_frees_reclaim_every_block() {
    let mut allocator = Arena::new().unwrap();

    allocator.allocate(3, 1);
    let before = allocator.used();

    let a = allocator.allocate(16, 8);
    let b = allocator.allocate(16, 8);

    allocator.deallocate(b);
    assert_eq!(allocator.used(), a.end() as usize - allocator.memory.ptr as usize);

    allocator.deallocate(a);
    assert!(allocator.used() >= before);
    assert_eq!(allocator.used(), a.ptr as usize - allocator.memory.ptr as usize);

    let c = allocator.allocate(16, 8);
    assert_eq!(c.ptr, a.ptr);

    allocator.deallocate(c);
    assert_eq!(allocator.used(), a.ptr as usize - allocator.memory.ptr as usize);
  }

  #[test]
  fn deallocate_all_resets() {
    let mut allocator = Arena::new().unwrap();

    let first = allocator.allocate(100, 8);
    allocator.allocate(100, 8);
    allocator.deallocate_all();

    assert_eq!(allocator.used(), 0);
    assert_eq!(allocator.remaining(), 256);
    assert_eq!(allocator.allocate(100, 8).ptr, first.ptr);
  }

  #[test]
  fn exhaustion_returns_empty_block() {
    let mut allocator = Arena::new().unwrap();

    assert!(!allocator.allocate(200, 8).is_empty());
    assert!(allocator.allocate(64, 8).is_empty());
    assert!(allocator.allocate(usize::MAX, 1).is_empty());
    assert!(!allocator.allocate(56, 8).is_empty());
    assert!(allocator.allocate(1, 1).is_empty());
  }

  #[test]
  fn honours_alignment_and_floor() {
    let mut allocator = Arena::new().unwrap();

    allocator.allocate(1, 1);

    for alignment in [1, 2, 4, 8, 16, 32] {
      let block = allocator.allocate(1, alignment);

      assert!(!block.is_empty());
      assert_eq!(block.ptr as usize % alignment, 0);
      assert_eq!(block.ptr as usize % Arena::ALIGNMENT, 0);
    }
  }

  #[test]
  fn construction_fails_without_parent_memory() {
    let result = LinearAllocator::<NoAllocator, 64>::new();

    assert_eq!(
      result.err(),
      Some(AllocError::ParentExhausted {
        size: 64,
        alignment: 1
      })
    );
  }
}
