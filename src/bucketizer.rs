use tracing::trace;

use crate::block::Block;
use crate::traits::{Allocator, Owns};

/// Splits `MIN..=MAX` into ranges of `STEP` bytes and gives each range its own
/// instance of `A`.
///
/// Bucket `i` serves sizes `MIN + i * STEP ..= MIN + (i + 1) * STEP - 1`; the
/// last bucket may be narrower when the range does not divide evenly. Sizes
/// outside `MIN..=MAX` get an empty block.
pub struct Bucketizer<A, const MIN: usize, const MAX: usize, const STEP: usize> {
  buckets: Box<[A]>,
}

impl<A: Allocator, const MIN: usize, const MAX: usize, const STEP: usize> Bucketizer<A, MIN, MAX, STEP> {
  pub const BUCKET_COUNT: usize = (MAX - MIN + 1).div_ceil(STEP);

  const VALID: () = {
    assert!(MIN > 0, "bucketizer minimum size must be non-zero");
    assert!(MIN <= MAX, "bucketizer minimum size exceeds its maximum");
    assert!(STEP > 0, "bucketizer step must be non-zero");
  };

  pub fn new() -> Self
  where
    A: Default,
  {
    Self::with(|_| A::default())
  }

  /// Builds each bucket from its index.
  pub fn with(make: impl FnMut(usize) -> A) -> Self {
    let () = Self::VALID;

    Self {
      buckets: (0..Self::BUCKET_COUNT).map(make).collect(),
    }
  }

  pub fn bucket_count(&self) -> usize {
    self.buckets.len()
  }

  /// Index of the bucket serving `size`, if any.
  pub fn bucket_index(size: usize) -> Option<usize> {
    if !(MIN..=MAX).contains(&size) {
      return None;
    }

    Some((size - MIN) / STEP)
  }

  pub fn bucket(
    &self,
    index: usize,
  ) -> Option<&A> {
    self.buckets.get(index)
  }
}

impl<A: Allocator + Default, const MIN: usize, const MAX: usize, const STEP: usize> Default
  for Bucketizer<A, MIN, MAX, STEP>
{
  fn default() -> Self {
    Self::new()
  }
}

impl<A: Allocator, const MIN: usize, const MAX: usize, const STEP: usize> Allocator
  for Bucketizer<A, MIN, MAX, STEP>
{
  const ALIGNMENT: usize = A::ALIGNMENT;

  fn allocate(
    &mut self,
    size: usize,
    alignment: usize,
  ) -> Block {
    match Self::bucket_index(size) {
      Some(index) => self.buckets[index].allocate(size, alignment),
      None => {
        trace!(size, min = MIN, max = MAX, "no bucket for size");
        Block::empty()
      }
    }
  }

  fn deallocate(
    &mut self,
    block: Block,
  ) {
    if block.is_empty() {
      return;
    }

    match Self::bucket_index(block.size) {
      Some(index) => self.buckets[index].deallocate(block),
      None => debug_assert!(false, "deallocate: size {} has no bucket", block.size),
    }
  }
}

impl<A: Allocator + Owns, const MIN: usize, const MAX: usize, const STEP: usize> Owns
  for Bucketizer<A, MIN, MAX, STEP>
{
  fn owns(
    &self,
    block: Block,
  ) -> bool {
    match Self::bucket_index(block.size) {
      Some(index) => self.buckets[index].owns(block),
      None => false,
    }
  }
}
