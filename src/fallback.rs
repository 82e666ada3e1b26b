use crate::block::Block;
use crate::traits::{Allocator, Owns};

/// Tries `Primary` first and only asks `Fallback` when it fails.
///
/// Deallocation is routed with `Primary::owns`, which is why the primary has
/// to implement [`Owns`].
#[derive(Debug, Default)]
pub struct FallbackAllocator<Primary, Fallback> {
  primary: Primary,
  fallback: Fallback,
}

impl<Primary: Allocator + Owns, Fallback: Allocator> FallbackAllocator<Primary, Fallback> {
  pub fn new(
    primary: Primary,
    fallback: Fallback,
  ) -> Self {
    Self { primary, fallback }
  }

  pub fn primary(&self) -> &Primary {
    &self.primary
  }

  pub fn fallback(&self) -> &Fallback {
    &self.fallback
  }
}

impl<Primary: Allocator + Owns, Fallback: Allocator> Allocator for FallbackAllocator<Primary, Fallback> {
  const ALIGNMENT: usize = if Primary::ALIGNMENT < Fallback::ALIGNMENT {
    Primary::ALIGNMENT
  } else {
    Fallback::ALIGNMENT
  };

  fn allocate(
    &mut self,
    size: usize,
    alignment: usize,
  ) -> Block {
    let block = self.primary.allocate(size, alignment);

    if !block.is_empty() {
      return block;
    }

    self.fallback.allocate(size, alignment)
  }

  fn deallocate(
    &mut self,
    block: Block,
  ) {
    if self.primary.owns(block) {
      self.primary.deallocate(block);
    } else {
      self.fallback.deallocate(block);
    }
  }
}

impl<Primary: Allocator + Owns, Fallback: Allocator + Owns> Owns for FallbackAllocator<Primary, Fallback> {
  fn owns(
    &self,
    block: Block,
  ) -> bool {
    self.primary.owns(block) || self.fallback.owns(block)
  }
}
