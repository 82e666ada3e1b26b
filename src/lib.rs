//! # stratalloc - Composable Allocator Building Blocks
//!
//! Small allocation policies that all speak one contract and nest into
//! purpose-built strategies: bump allocation, fixed-size pools, a coalescing
//! free list, size routing and primary/fallback chains.
//!
//! ## Overview
//!
//! Every policy implements [`Allocator`]:
//!
//! ```text
//!   allocate(size, alignment) -> Block     empty Block on failure
//!   deallocate(Block)                      only blocks it handed out
//!   ALIGNMENT                              guaranteed alignment floor
//! ```
//!
//! Policies that can answer "is this block mine?" also implement [`Owns`];
//! routers need that to send a block back where it came from.
//!
//! Policies take their parent as a type parameter, so a composition is a
//! type:
//!
//! ```text
//!   Segregator<256,
//!   │   PoolAllocator<Mallocator, 1, 256, 64>,          ── size <= 256
//!   │   FallbackAllocator<
//!   │   │   FreeListAllocator<Mallocator, 65536>,       ── size > 256
//!   │   │   Mallocator>>                                ── too big for a chunk
//!   │
//!   └── every layer passes an empty Block up when it cannot serve
//! ```
//!
//! ## Crate Structure
//!
//! ```text
//!   stratalloc
//!   ├── align       - Alignment math and the align! macro
//!   ├── block       - Block (pointer, size)
//!   ├── traits      - Allocator, Owns, DynAllocator, AllocatorExt
//!   ├── chunk       - Intrusive list of chunks taken from a parent (internal)
//!   ├── mallocator  - Mallocator, NoAllocator
//!   ├── bump        - LinearAllocator
//!   ├── pool        - PoolAllocator
//!   ├── free_list   - FreeListAllocator
//!   ├── fallback    - FallbackAllocator
//!   ├── segregator  - Segregator
//!   ├── bucketizer  - Bucketizer
//!   ├── global      - GlobalAllocator and global_instance!
//!   ├── shared      - SharedAllocator
//!   └── tracked     - Tracked
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use stratalloc::{Allocator, FallbackAllocator, LinearAllocator, Mallocator, PoolAllocator};
//!
//! let frame = LinearAllocator::<Mallocator, 4096>::new().unwrap();
//! let mut allocator = FallbackAllocator::new(frame, PoolAllocator::<Mallocator, 1, 128, 32>::new());
//!
//! let block = allocator.allocate(64, 8);
//! assert!(!block.is_empty());
//! assert_eq!(block.ptr as usize % 8, 0);
//!
//! allocator.deallocate(block);
//! ```
//!
//! ## Limitations
//!
//! - **Single-threaded**: no policy synchronises itself. Use one instance per
//!   thread or put a lock around a shared one.
//! - **No compaction**: chunks go back to the parent only when their owner is
//!   dropped.
//! - **Unix-only**: `Mallocator` uses `libc`.
//!
//! ## Safety
//!
//! Handing a block to the wrong allocator, freeing it twice or using it after
//! [`LinearAllocator::deallocate_all`] is undefined behaviour. Debug builds
//! catch most of these with assertions; release builds do not check.

pub mod align;
mod block;
mod bucketizer;
mod bump;
mod chunk;
mod error;
mod fallback;
mod free_list;
#[doc(hidden)]
pub mod global;
mod mallocator;
mod pool;
mod segregator;
mod shared;
mod tracked;
mod traits;

pub use block::Block;
pub use bucketizer::Bucketizer;
pub use bump::LinearAllocator;
pub use chunk::CHUNK_HEADER_SIZE;
pub use error::{AllocError, AllocResult};
pub use fallback::FallbackAllocator;
pub use free_list::{FreeBlocks, FreeListAllocator};
pub use global::{GlobalAllocator, GlobalInstance};
pub use mallocator::{Mallocator, NoAllocator};
pub use pool::PoolAllocator;
pub use segregator::Segregator;
pub use shared::SharedAllocator;
pub use tracked::{Tracked, TrackedStats};
pub use traits::{Allocator, AllocatorExt, DynAllocator, Owns};
