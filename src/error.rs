use thiserror::Error;

/// Errors reported by fallible constructors and the typed helpers.
///
/// The `allocate` hot path never returns this; it signals failure with an
/// empty [`Block`](crate::Block).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AllocError {
  #[error("parent allocator could not provide {size} bytes aligned to {alignment}")]
  ParentExhausted { size: usize, alignment: usize },

  #[error("out of memory allocating {size} bytes aligned to {alignment}")]
  OutOfMemory { size: usize, alignment: usize },
}

pub type AllocResult<T> = Result<T, AllocError>;
