//! Intrusive record of the chunks a growing allocator took from its parent.
//!
//! Each chunk starts with a [`MemoryChunk`] node describing the whole extent
//! and linking to the next chunk. The list is append-only; chunks go back to
//! the parent all at once when the owner is dropped.
//!
//! # Invariants
//!
//! - Every node sits at the first byte of the extent it describes.
//! - A node is written once by [`ChunkList::append`] and read until
//!   [`ChunkList::release`]; nothing else touches the first
//!   [`CHUNK_HEADER_SIZE`] bytes of a chunk.
//! - `tail` is the last node reachable from `head`, and `len` counts them.

use std::marker::PhantomData;
use std::{mem, ptr};

use tracing::debug;

use crate::align;
use crate::block::Block;
use crate::traits::Allocator;

#[repr(C)]
struct MemoryChunk {
  memory: Block,
  next: *mut MemoryChunk,
}

/// Bytes reserved at the start of every chunk for its node.
pub const CHUNK_HEADER_SIZE: usize = align!(mem::size_of::<MemoryChunk>());

pub(crate) struct ChunkList {
  head: *mut MemoryChunk,
  tail: *mut MemoryChunk,
  len: usize,
}

impl ChunkList {
  pub(crate) const fn new() -> Self {
    Self {
      head: ptr::null_mut(),
      tail: ptr::null_mut(),
      len: 0,
    }
  }

  /// Records `memory` as the newest chunk and returns the first byte after
  /// its header.
  ///
  /// # Safety
  ///
  /// `memory` must be exclusively owned by the caller, word aligned and at
  /// least [`CHUNK_HEADER_SIZE`] bytes long.
  pub(crate) unsafe fn append(
    &mut self,
    memory: Block,
  ) -> *mut u8 {
    debug_assert!(!memory.is_empty());
    debug_assert!(memory.size >= CHUNK_HEADER_SIZE);
    debug_assert_eq!(memory.ptr as usize % mem::align_of::<MemoryChunk>(), 0);

    let node = memory.ptr.cast::<MemoryChunk>();

    unsafe {
      node.write(MemoryChunk {
        memory,
        next: ptr::null_mut(),
      });

      if self.tail.is_null() {
        self.head = node;
      } else {
        (*self.tail).next = node;
      }
    }

    self.tail = node;
    self.len += 1;

    memory.ptr.wrapping_add(CHUNK_HEADER_SIZE)
  }

  pub(crate) fn len(&self) -> usize {
    self.len
  }

  pub(crate) fn iter(&self) -> Chunks<'_> {
    Chunks {
      current: self.head,
      _list: PhantomData,
    }
  }

  /// Whether `block` lies inside one of the chunks.
  pub(crate) fn contains(
    &self,
    block: Block,
  ) -> bool {
    self.iter().any(|chunk| chunk.contains(block))
  }

  /// Hands every chunk back to `parent`, walking the list once.
  pub(crate) fn release<P: Allocator>(
    &mut self,
    parent: &mut P,
  ) {
    if self.len > 0 {
      debug!(chunks = self.len, "releasing chunks to parent");
    }

    let mut current = self.head;

    while !current.is_null() {
      // The node lives inside the memory being returned, so copy it out first.
      let chunk = unsafe { ptr::read(current) };
      parent.deallocate(chunk.memory);
      current = chunk.next;
    }

    *self = Self::new();
  }
}

/// Iterator over the extents of a [`ChunkList`], oldest first.
pub(crate) struct Chunks<'a> {
  current: *mut MemoryChunk,
  _list: PhantomData<&'a ChunkList>,
}

impl Iterator for Chunks<'_> {
  type Item = Block;

  fn next(&mut self) -> Option<Block> {
    if self.current.is_null() {
      return None;
    }

    let chunk = unsafe { &*self.current };
    self.current = chunk.next;

    Some(chunk.memory)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[derive(Default)]
  struct Recorder {
    released: Vec<Block>,
  }

  impl Allocator for Recorder {
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
      self.released.push(block);
    }
  }

  fn buffer(words: usize) -> Vec<usize> {
    vec![0usize; words]
  }

  #[test]
  fn append_links_in_order() {
    let mut first = buffer(16);
    let mut second = buffer(16);
    let first = Block::new(first.as_mut_ptr().cast(), 16 * align::WORD);
    let second = Block::new(second.as_mut_ptr().cast(), 16 * align::WORD);

    let mut list = ChunkList::new();

    let usable = unsafe { list.append(first) };
    assert_eq!(usable, first.ptr.wrapping_add(CHUNK_HEADER_SIZE));

    unsafe { list.append(second) };

    assert_eq!(list.len(), 2);
    assert_eq!(list.iter().collect::<Vec<_>>(), vec![first, second]);

    list.release(&mut Recorder::default());
  }

  #[test]
  fn contains_matches_exactly_one_chunk() {
    let mut memory = buffer(32);
    let chunk = Block::new(memory.as_mut_ptr().cast(), 32 * align::WORD);

    let mut list = ChunkList::new();
    unsafe { list.append(chunk) };

    let inside = Block::new(chunk.ptr.wrapping_add(CHUNK_HEADER_SIZE), 16);
    let straddling = Block::new(chunk.end().wrapping_sub(8), 16);

    assert!(list.contains(inside));
    assert!(!list.contains(straddling));
    assert!(!list.contains(Block::empty()));

    list.release(&mut Recorder::default());
  }

  #[test]
  fn release_returns_every_chunk_once() {
    let mut buffers: Vec<Vec<usize>> = (0..3).map(|_| buffer(8)).collect();
    let blocks: Vec<Block> = buffers
      .iter_mut()
      .map(|b| Block::new(b.as_mut_ptr().cast(), 8 * align::WORD))
      .collect();

    let mut list = ChunkList::new();

    for block in &blocks {
      unsafe { list.append(*block) };
    }

    let mut parent = Recorder::default();
    list.release(&mut parent);

    assert_eq!(parent.released, blocks);
    assert_eq!(list.len(), 0);
    assert_eq!(list.iter().count(), 0);
  }
}
