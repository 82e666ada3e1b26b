//! Fixed-size slot allocator.
//!
//! ```text
//!   chunk (CHUNK_SIZE bytes from the parent)
//!   ┌────────────┬────────┬────────┬────────┬─────┬────────┐
//!   │ chunk node │ slot 0 │ slot 1 │ slot 2 │ ... │ slot N │
//!   └────────────┴────────┴────────┴────────┴─────┴────────┘
//!                 ◄──────►
//!                 SLOT_SIZE
//! ```
//!
//! Free slots hold a [`Node`] in their first word. One free list threads
//! through the free slots of every chunk.
//!
//! # Invariants
//!
//! - Every chunk holds exactly `BUCKET_COUNT` slots of `SLOT_SIZE` bytes,
//!   starting `SLOTS_OFFSET` bytes into the chunk.
//! - A slot is either on the free list or live, never both.
//! - `free` is null or points at a slot inside one of `chunks`.

use std::{mem, ptr};

use tracing::{debug, trace};

use crate::align;
use crate::block::Block;
use crate::chunk::{CHUNK_HEADER_SIZE, ChunkList};
use crate::traits::{Allocator, Owns};

/// Upper bound on the alignment a slot advertises.
const MAX_SLOT_ALIGNMENT: usize = 64;

#[repr(C)]
struct Node {
  next: *mut Node,
}

/// Serves requests of `MIN..=MAX` bytes from slots of `MAX` bytes, growing by
/// `BUCKET_COUNT` slots at a time.
///
/// Requests outside the size range, or asking for more alignment than a slot
/// has, get an empty block so an enclosing router can try elsewhere.
pub struct PoolAllocator<P: Allocator, const MIN: usize, const MAX: usize, const BUCKET_COUNT: usize> {
  parent: P,
  chunks: ChunkList,
  free: *mut Node,
}

// Chunks are exclusively owned; moving the pool moves that ownership.
unsafe impl<P: Allocator + Send, const MIN: usize, const MAX: usize, const BUCKET_COUNT: usize> Send
  for PoolAllocator<P, MIN, MAX, BUCKET_COUNT>
{
}

impl<P: Allocator, const MIN: usize, const MAX: usize, const BUCKET_COUNT: usize>
  PoolAllocator<P, MIN, MAX, BUCKET_COUNT>
{
  /// Distance between two slots.
  pub const SLOT_SIZE: usize = align!(if MAX > mem::size_of::<Node>() {
    MAX
  } else {
    mem::size_of::<Node>()
  });

  /// Alignment every slot starts on.
  pub const SLOT_ALIGNMENT: usize = {
    let natural = 1usize << Self::SLOT_SIZE.trailing_zeros();

    if natural > MAX_SLOT_ALIGNMENT {
      MAX_SLOT_ALIGNMENT
    } else {
      natural
    }
  };

  const SLOTS_OFFSET: usize = align!(CHUNK_HEADER_SIZE, Self::SLOT_ALIGNMENT);

  /// Bytes requested from the parent per growth.
  pub const CHUNK_SIZE: usize = Self::SLOTS_OFFSET + Self::SLOT_SIZE * BUCKET_COUNT;

  const VALID: () = {
    assert!(MIN > 0, "pool minimum size must be non-zero");
    assert!(MIN <= MAX, "pool minimum size exceeds its maximum");
    assert!(BUCKET_COUNT > 0, "pool needs at least one slot per chunk");
  };

  pub fn new() -> Self
  where
    P: Default,
  {
    Self::with_parent(P::default())
  }

  pub fn with_parent(parent: P) -> Self {
    let () = Self::VALID;

    Self {
      parent,
      chunks: ChunkList::new(),
      free: ptr::null_mut(),
    }
  }

  pub fn chunk_count(&self) -> usize {
    self.chunks.len()
  }

  /// Number of slots currently on the free list.
  pub fn free_count(&self) -> usize {
    let mut count = 0;
    let mut current = self.free;

    while !current.is_null() {
      count += 1;
      current = unsafe { (*current).next };
    }

    count
  }

  /// Takes one chunk from the parent and pushes its slots onto the free list.
  fn grow(&mut self) -> bool {
    let memory = self.parent.allocate(Self::CHUNK_SIZE, Self::SLOT_ALIGNMENT);

    if memory.is_empty() {
      debug!(
        size = Self::CHUNK_SIZE,
        alignment = Self::SLOT_ALIGNMENT,
        "pool could not grow"
      );
      return false;
    }

    debug_assert_eq!(memory.ptr as usize % Self::SLOT_ALIGNMENT, 0);

    unsafe {
      self.chunks.append(memory);

      let slots = memory.ptr.add(Self::SLOTS_OFFSET);

      // Pushed back to front so the lowest address is handed out first.
      for index in (0..BUCKET_COUNT).rev() {
        let node = slots.add(index * Self::SLOT_SIZE).cast::<Node>();
        node.write(Node { next: self.free });
        self.free = node;
      }
    }

    debug!(
      chunks = self.chunks.len(),
      slots = BUCKET_COUNT,
      slot_size = Self::SLOT_SIZE,
      "pool grew"
    );

    true
  }

  fn is_slot_start(
    &self,
    block: Block,
  ) -> bool {
    self.chunks.iter().any(|chunk| {
      let first = chunk.ptr as usize + Self::SLOTS_OFFSET;
      let address = block.ptr as usize;

      address >= first && address < chunk.end() as usize && (address - first) % Self::SLOT_SIZE == 0
    })
  }
}

impl<P: Allocator + Default, const MIN: usize, const MAX: usize, const BUCKET_COUNT: usize> Default
  for PoolAllocator<P, MIN, MAX, BUCKET_COUNT>
{
  fn default() -> Self {
    Self::new()
  }
}

impl<P: Allocator, const MIN: usize, const MAX: usize, const BUCKET_COUNT: usize> Allocator
  for PoolAllocator<P, MIN, MAX, BUCKET_COUNT>
{
  const ALIGNMENT: usize = Self::SLOT_ALIGNMENT;

  fn allocate(
    &mut self,
    size: usize,
    alignment: usize,
  ) -> Block {
    debug_assert!(alignment.is_power_of_two());

    if size < MIN || size > MAX {
      trace!(size, min = MIN, max = MAX, "pool rejected size");
      return Block::empty();
    }

    if alignment > Self::SLOT_ALIGNMENT {
      trace!(alignment, slot_alignment = Self::SLOT_ALIGNMENT, "pool rejected alignment");
      return Block::empty();
    }

    if self.free.is_null() && !self.grow() {
      return Block::empty();
    }

    let node = self.free;
    self.free = unsafe { (*node).next };

    Block::new(node.cast(), size)
  }

  fn deallocate(
    &mut self,
    block: Block,
  ) {
    if block.is_empty() {
      return;
    }

    debug_assert!(self.is_slot_start(block), "deallocate: not a slot of this pool");

    let node = block.ptr.cast::<Node>();

    unsafe { node.write(Node { next: self.free }) };
    self.free = node;
  }
}

impl<P: Allocator, const MIN: usize, const MAX: usize, const BUCKET_COUNT: usize> Owns
  for PoolAllocator<P, MIN, MAX, BUCKET_COUNT>
{
  fn owns(
    &self,
    block: Block,
  ) -> bool {
    self.chunks.contains(block)
  }
}

impl<P: Allocator, const MIN: usize, const MAX: usize, const BUCKET_COUNT: usize> Drop
  for PoolAllocator<P, MIN, MAX, BUCKET_COUNT>
{
  fn drop(&mut self) {
    self.chunks.release(&mut self.parent);
  }
}
