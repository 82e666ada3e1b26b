//! Usage counters around any policy.
//!
//! `Tracked` changes nothing about where memory comes from; it only counts
//! what passes through it. Failed allocations bump `failures` and leave the
//! byte counters alone.

use crate::block::Block;
use crate::traits::{Allocator, Owns};

/// Snapshot of a [`Tracked`] allocator's counters.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TrackedStats {
  pub allocations: usize,
  pub deallocations: usize,
  pub failures: usize,
  pub live_bytes: usize,
  pub peak_bytes: usize,
}

impl TrackedStats {
  pub fn live_blocks(&self) -> usize {
    self.allocations - self.deallocations
  }
}

#[derive(Debug, Default)]
pub struct Tracked<A> {
  inner: A,
  stats: TrackedStats,
}

impl<A: Allocator> Tracked<A> {
  pub fn new(inner: A) -> Self {
    Self {
      inner,
      stats: TrackedStats::default(),
    }
  }

  pub fn stats(&self) -> TrackedStats {
    self.stats
  }

  pub fn inner(&self) -> &A {
    &self.inner
  }

  pub fn into_inner(self) -> A {
    self.inner
  }
}

impl<A: Allocator> Allocator for Tracked<A> {
  const ALIGNMENT: usize = A::ALIGNMENT;

  fn allocate(
    &mut self,
    size: usize,
    alignment: usize,
  ) -> Block {
    let block = self.inner.allocate(size, alignment);

    if block.is_empty() {
      self.stats.failures += 1;
    } else {
      self.stats.allocations += 1;
      self.stats.live_bytes += block.size;
      self.stats.peak_bytes = self.stats.peak_bytes.max(self.stats.live_bytes);
    }

    block
  }

  fn deallocate(
    &mut self,
    block: Block,
  ) {
    if !block.is_empty() {
      self.stats.deallocations += 1;
      self.stats.live_bytes -= block.size;
    }

    self.inner.deallocate(block)
  }
}

impl<A: Owns> Owns for Tracked<A> {
  fn owns(
    &self,
    block: Block,
  ) -> bool {
    self.inner.owns(block)
  }
}
