use std::ptr;

/// One memory extent: a pointer and the number of bytes behind it.
///
/// A `Block` does not own anything. It belongs to the allocator that returned
/// it until it is handed back to that allocator's `deallocate`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Block {
  pub ptr: *mut u8,
  pub size: usize,
}

impl Block {
  pub const fn new(
    ptr: *mut u8,
    size: usize,
  ) -> Self {
    Self { ptr, size }
  }

  /// The failure value: `{null, 0}`.
  pub const fn empty() -> Self {
    Self {
      ptr: ptr::null_mut(),
      size: 0,
    }
  }

  pub fn is_empty(&self) -> bool {
    self.ptr.is_null()
  }

  /// One past the last byte of the extent.
  pub fn end(&self) -> *mut u8 {
    self.ptr.wrapping_add(self.size)
  }

  /// Whether `other` lies entirely inside this extent.
  pub fn contains(
    &self,
    other: Block,
  ) -> bool {
    if self.is_empty() || other.is_empty() {
      return false;
    }

    let start = self.ptr as usize;
    let end = start + self.size;
    let other_start = other.ptr as usize;

    other_start >= start && other_start <= end && other.size <= end - other_start
  }
}

impl Default for Block {
  fn default() -> Self {
    Self::empty()
  }
}
