use crate::block::Block;
use crate::traits::{Allocator, Owns};

/// Sends requests of at most `THRESHOLD` bytes to `Small` and everything
/// larger to `Large`.
///
/// The size alone picks the side, for allocation, deallocation and ownership
/// alike, so a failure on one side is never retried on the other.
#[derive(Debug, Default)]
pub struct Segregator<const THRESHOLD: usize, Small, Large> {
  small: Small,
  large: Large,
}

impl<const THRESHOLD: usize, Small: Allocator, Large: Allocator> Segregator<THRESHOLD, Small, Large> {
  pub fn new(
    small: Small,
    large: Large,
  ) -> Self {
    Self { small, large }
  }

  pub fn small(&self) -> &Small {
    &self.small
  }

  pub fn large(&self) -> &Large {
    &self.large
  }
}

impl<const THRESHOLD: usize, Small: Allocator, Large: Allocator> Allocator
  for Segregator<THRESHOLD, Small, Large>
{
  const ALIGNMENT: usize = if Small::ALIGNMENT < Large::ALIGNMENT {
    Small::ALIGNMENT
  } else {
    Large::ALIGNMENT
  };

  fn allocate(
    &mut self,
    size: usize,
    alignment: usize,
  ) -> Block {
    if size <= THRESHOLD {
      self.small.allocate(size, alignment)
    } else {
      self.large.allocate(size, alignment)
    }
  }

  fn deallocate(
    &mut self,
    block: Block,
  ) {
    if block.size <= THRESHOLD {
      self.small.deallocate(block)
    } else {
      self.large.deallocate(block)
    }
  }
}

impl<const THRESHOLD: usize, Small: Owns, Large: Owns> Owns for Segregator<THRESHOLD, Small, Large> {
  fn owns(
    &self,
    block: Block,
  ) -> bool {
    if block.size <= THRESHOLD {
      self.small.owns(block)
    } else {
      self.large.owns(block)
    }
  }
}
