//! Alignment math shared by every policy.
//!
//! All alignments handled here are powers of two. The functions are `const`
//! so policies can derive their chunk and slot geometry at compile time.

use std::mem;

/// Machine word size, the alignment floor for every intrusive header.
pub const WORD: usize = mem::size_of::<usize>();

/// Rounds `value` up to the machine word, or to an explicit alignment.
///
/// # Examples
///
/// ```rust
/// use stratalloc::align;
///
/// match std::mem::size_of::<usize>() {
///     8 => assert_eq!(align!(13), 16), // 64 bit machine.
///     4 => assert_eq!(align!(11), 12), // 32 bit machine.
///     _ => {},
/// };
///
/// assert_eq!(align!(33, 32), 64);
/// ```
#[macro_export]
macro_rules! align {
  ($value:expr) => {
    $crate::align::round_to_alignment($value, $crate::align::WORD)
  };
  ($value:expr, $alignment:expr) => {
    $crate::align::round_to_alignment($value, $alignment)
  };
}

/// Smallest multiple of `alignment` that is greater than or equal to `size`.
#[inline]
pub const fn round_to_alignment(
  size: usize,
  alignment: usize,
) -> usize {
  debug_assert!(alignment.is_power_of_two());
  (size + alignment - 1) & !(alignment - 1)
}

/// Bytes to add to `ptr` to reach the next `alignment` boundary, 0 if it is
/// already aligned.
#[inline]
pub fn alignment_adjustment(
  ptr: *const u8,
  alignment: usize,
) -> usize {
  debug_assert!(alignment.is_power_of_two());
  let misalignment = (ptr as usize) & (alignment - 1);

  if misalignment == 0 {
    0
  } else {
    alignment - misalignment
  }
}

/// Like [`alignment_adjustment`], but grows the adjustment in whole
/// `alignment` steps until at least `header_size` bytes precede the aligned
/// address.
#[inline]
pub fn alignment_adjustment_with_header(
  ptr: *const u8,
  alignment: usize,
  header_size: usize,
) -> usize {
  let mut adjustment = alignment_adjustment(ptr, alignment);

  if adjustment < header_size {
    let missing = header_size - adjustment;
    adjustment += alignment * (missing / alignment);

    if missing % alignment > 0 {
      adjustment += alignment;
    }
  }

  adjustment
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_align() {
    let mut alignments = Vec::new();

    for i in 0..10 {
      let sizes = (WORD * i + 1)..=(WORD * (i + 1));

      let expected_alignment = WORD * (i + 1);

      alignments.push((sizes, expected_alignment));
    }

    for (sizes, expected) in alignments {
      for size in sizes {
        assert_eq!(expected, align!(size));
      }
    }
  }

  #[test]
  fn round_to_explicit_alignment() {
    assert_eq!(round_to_alignment(0, 16), 0);
    assert_eq!(round_to_alignment(1, 16), 16);
    assert_eq!(round_to_alignment(16, 16), 16);
    assert_eq!(round_to_alignment(17, 16), 32);
    assert_eq!(round_to_alignment(5, 1), 5);
  }

  #[test]
  fn adjustment_is_zero_when_aligned() {
    for alignment in [1, 2, 4, 8, 16, 64, 4096] {
      assert_eq!(alignment_adjustment(alignment as *const u8, alignment), 0);
      assert_eq!(alignment_adjustment((alignment * 3) as *const u8, alignment), 0);
    }
  }

  #[test]
  fn adjustment_reaches_next_boundary() {
    assert_eq!(alignment_adjustment(0x1001 as *const u8, 16), 15);
    assert_eq!(alignment_adjustment(0x100f as *const u8, 16), 1);
    assert_eq!(alignment_adjustment(0x1004 as *const u8, 8), 4);

    for address in 0x2000usize..0x2100 {
      for alignment in [1, 2, 4, 8, 16, 32] {
        let adjustment = alignment_adjustment(address as *const u8, alignment);

        assert!(adjustment < alignment);
        assert_eq!((address + adjustment) % alignment, 0);
      }
    }
  }

  #[test]
  fn header_adjustment_leaves_room_for_header() {
    // Already aligned: a full header-sized step is still needed.
    assert_eq!(alignment_adjustment_with_header(0x1000 as *const u8, 8, 16), 16);
    // The natural padding is already enough.
    assert_eq!(alignment_adjustment_with_header(0x1000 as *const u8, 64, 16), 64);
    // Padding of 4 grows in 8 byte steps until 16 bytes fit.
    assert_eq!(alignment_adjustment_with_header(0x1004 as *const u8, 8, 16), 20);

    for address in 0x3000usize..0x3080 {
      for alignment in [8, 16, 32, 64] {
        for header in [8, 16, 24] {
          let adjustment = alignment_adjustment_with_header(address as *const u8, alignment, header);

          assert!(adjustment >= header);
          assert!(adjustment < header + alignment);
          assert_eq!((address + adjustment) % alignment, 0);
        }
      }
    }
  }
}
