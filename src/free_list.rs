//! General purpose first-fit allocator with an address-ordered, coalescing
//! free list.
//!
//! ```text
//!   chunk (S bytes from the parent)
//!   ┌────────────┬─────────────────────┬──────────────┬──────────────────┐
//!   │ chunk node │ pad │ header │ live  │ FreeBlock .. │ pad │hdr│ live   │
//!   └────────────┴─────────────────────┴──────────────┴──────────────────┘
//!                      ◄──────►
//!                      adjustment ends at the pointer handed out
//! ```
//!
//! # Invariants
//!
//! - The free list is sorted by address and no two free blocks touch; a freed
//!   extent is merged with its neighbours on insertion.
//! - Every free extent starts with a [`FreeBlock`] and is word aligned and a
//!   whole number of words long.
//! - A live block's [`AllocationHeader`] sits in the `HEADER` bytes right
//!   before the address handed out, and `adjustment` bytes back from that
//!   address is the start of the extent it was carved from.
//! - Free extents never span two chunks; each chunk's node separates them.

use std::marker::PhantomData;
use std::{mem, ptr};

use tracing::{debug, trace};

use crate::align;
use crate::align::{WORD, alignment_adjustment_with_header};
use crate::block::Block;
use crate::chunk::{CHUNK_HEADER_SIZE, ChunkList};
use crate::traits::{Allocator, Owns};

#[repr(C)]
struct FreeBlock {
  size: usize,
  next: *mut FreeBlock,
}

#[repr(C)]
struct AllocationHeader {
  size: usize,
  adjustment: usize,
}

const HEADER: usize = mem::size_of::<AllocationHeader>();

/// Smallest tail worth splitting off; anything shorter stays with the block.
const MIN_SPLIT: usize = if HEADER > mem::size_of::<FreeBlock>() {
  HEADER
} else {
  mem::size_of::<FreeBlock>()
};

/// Carves arbitrary requests out of `S` byte chunks taken from `P`.
pub struct FreeListAllocator<P: Allocator, const S: usize> {
  parent: P,
  chunks: ChunkList,
  free: *mut FreeBlock,
}

// Chunks are exclusively owned; moving the allocator moves that ownership.
unsafe impl<P: Allocator + Send, const S: usize> Send for FreeListAllocator<P, S> {}

impl<P: Allocator, const S: usize> FreeListAllocator<P, S> {
  /// Usable bytes per chunk once the chunk node is carved off.
  pub const REGION_SIZE: usize = (S - CHUNK_HEADER_SIZE) & !(WORD - 1);

  /// Largest request a single chunk can satisfy at word alignment.
  pub const MAX_REQUEST: usize = Self::REGION_SIZE - HEADER;

  const VALID: () = assert!(
    S >= CHUNK_HEADER_SIZE + HEADER + MIN_SPLIT,
    "free list chunk is too small to hold a single allocation"
  );

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

  /// Number of free extents.
  pub fn free_count(&self) -> usize {
    self.free_blocks().count()
  }

  /// Total bytes across all free extents.
  pub fn free_bytes(&self) -> usize {
    self.free_blocks().map(|block| block.size).sum()
  }

  /// The free extents, lowest address first.
  pub fn free_blocks(&self) -> FreeBlocks<'_> {
    FreeBlocks {
      current: self.free,
      _list: PhantomData,
    }
  }

  fn grow(&mut self) -> bool {
    let memory = self.parent.allocate(S, WORD);

    if memory.is_empty() {
      debug!(size = S, "free list could not grow");
      return false;
    }

    unsafe {
      let region = self.chunks.append(memory);
      self.insert(region, Self::REGION_SIZE);
    }

    debug!(chunks = self.chunks.len(), size = S, "free list grew");

    true
  }

  /// Largest header plus padding a word aligned extent may need to reach
  /// `alignment`.
  const fn worst_adjustment(alignment: usize) -> usize {
    if alignment > WORD {
      HEADER + alignment - WORD
    } else {
      HEADER
    }
  }

  /// First-fit scan. `size` is already word rounded.
  fn first_fit(
    &mut self,
    size: usize,
    alignment: usize,
  ) -> Option<*mut u8> {
    let mut prev: *mut FreeBlock = ptr::null_mut();
    let mut current = self.free;

    unsafe {
      while !current.is_null() {
        let FreeBlock { size: available, next } = current.read();
        let adjustment = alignment_adjustment_with_header(current as *const u8, alignment, HEADER);

        let fits = match adjustment.checked_add(size) {
          Some(needed) if needed <= available => Some(needed),
          _ => None,
        };

        let Some(needed) = fits else {
          prev = current;
          current = next;
          continue;
        };

        let start = current.cast::<u8>();
        let remainder = available - needed;

        let (extent, replacement) = if remainder < MIN_SPLIT {
          (available, next)
        } else {
          let tail = start.add(needed).cast::<FreeBlock>();
          tail.write(FreeBlock {
            size: remainder,
            next,
          });
          (needed, tail)
        };

        if prev.is_null() {
          self.free = replacement;
        } else {
          (*prev).next = replacement;
        }

        let aligned = start.add(adjustment);
        aligned.sub(HEADER).cast::<AllocationHeader>().write(AllocationHeader {
          size: extent,
          adjustment,
        });

        return Some(aligned);
      }
    }

    None
  }

  /// Puts the extent `[start, start + size)` back in address order and merges
  /// it with whichever neighbours it touches.
  ///
  /// # Safety
  ///
  /// The extent must lie in one of this allocator's chunks, be word aligned,
  /// and overlap neither a live block nor the free list.
  unsafe fn insert(
    &mut self,
    start: *mut u8,
    size: usize,
  ) {
    let node = start.cast::<FreeBlock>();
    let mut prev: *mut FreeBlock = ptr::null_mut();
    let mut current = self.free;

    unsafe {
      while !current.is_null() && current < node {
        prev = current;
        current = (*current).next;
      }

      debug_assert!(current != node, "deallocate: double free");

      node.write(FreeBlock {
        size,
        next: current,
      });

      if prev.is_null() {
        self.free = node;
      } else {
        (*prev).next = node;
      }

      if !current.is_null() && start.add(size) == current.cast::<u8>() {
        (*node).size += (*current).size;
        (*node).next = (*current).next;
      }

      if !prev.is_null() && prev.cast::<u8>().add((*prev).size) == start {
        (*prev).size += (*node).size;
        (*prev).next = (*node).next;
      }
    }
  }
}

impl<P: Allocator + Default, const S: usize> Default for FreeListAllocator<P, S> {
  fn default() -> Self {
    Self::new()
  }
}

impl<P: Allocator, const S: usize> Allocator for FreeListAllocator<P, S> {
  const ALIGNMENT: usize = WORD;

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

    if size > Self::MAX_REQUEST {
      trace!(size, max = Self::MAX_REQUEST, "request larger than a chunk");
      return Block::empty();
    }

    let alignment = alignment.max(Self::ALIGNMENT);
    let rounded = align!(size);

    if let Some(ptr) = self.first_fit(rounded, alignment) {
      return Block::new(ptr, size);
    }

    // A fresh region is only known to be word aligned.
    if rounded + Self::worst_adjustment(alignment) > Self::REGION_SIZE {
      trace!(size, alignment, "padded request larger than a chunk");
      return Block::empty();
    }

    trace!(size, alignment, "no free block fits, growing");

    if !self.grow() {
      return Block::empty();
    }

    match self.first_fit(rounded, alignment) {
      Some(ptr) => Block::new(ptr, size),
      None => Block::empty(),
    }
  }

  fn deallocate(
    &mut self,
    block: Block,
  ) {
    if block.is_empty() {
      return;
    }

    #[cfg(debug_assertions)]
    assert!(self.owns(block), "deallocate: block not owned by this allocator");

    unsafe {
      let header = block.ptr.sub(HEADER).cast::<AllocationHeader>().read();
      let start = block.ptr.sub(header.adjustment);

      debug_assert!(block.size + header.adjustment <= header.size);

      self.insert(start, header.size);
    }
  }
}

impl<P: Allocator, const S: usize> Owns for FreeListAllocator<P, S> {
  fn owns(
    &self,
    block: Block,
  ) -> bool {
    self.chunks.contains(block)
  }
}

impl<P: Allocator, const S: usize> Drop for FreeListAllocator<P, S> {
  fn drop(&mut self) {
    self.free = ptr::null_mut();
    self.chunks.release(&mut self.parent);
  }
}

/// Iterator over the free extents of a [`FreeListAllocator`].
pub struct FreeBlocks<'a> {
  current: *mut FreeBlock,
  _list: PhantomData<&'a ()>,
}

impl Iterator for FreeBlocks<'_> {
  type Item = Block;

  fn next(&mut self) -> Option<Block> {
    if self.current.is_null() {
      return None;
    }

    let node = unsafe { &*self.current };
    let block = Block::new(self.current.cast(), node.size);
    self.current = node.next;

    Some(block)
  }
}
