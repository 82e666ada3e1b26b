use stratalloc::{
  Allocator, Block, FallbackAllocator, FreeListAllocator, LinearAllocator, Mallocator, Owns, PoolAllocator,
  Segregator,
};

/// Small requests go to a pool, larger ones to a free list, and anything a
/// free list chunk cannot hold falls through to the system allocator.
type Small = PoolAllocator<Mallocator, 1, 64, 32>;
type Large = FallbackAllocator<FreeListAllocator<Mallocator, 16384>, Mallocator>;
type Composed = Segregator<64, Small, Large>;

fn print_block(
  label: &str,
  size: usize,
  alignment: usize,
  block: Block,
) {
  println!(
    "[{}] requested {} bytes aligned to {}, address = {:?}, addr % align = {}",
    label,
    size,
    alignment,
    block.ptr,
    block.ptr as usize % alignment
  );
}

fn main() {
  let mut allocator = Composed::default();

  // --------------------------------------------------------------------
  // 1) A few small requests: all served by the pool, one chunk.
  // --------------------------------------------------------------------
  let small: Vec<Block> = [4, 12, 64]
    .iter()
    .map(|&size| {
      let block = allocator.allocate(size, 4);
      print_block("small", size, 4, block);
      block
    })
    .collect();

  println!("pool chunks = {}", allocator.small().chunk_count());

  // --------------------------------------------------------------------
  // 2) A medium request with a strict alignment: served by the free list.
  // --------------------------------------------------------------------
  let medium = allocator.allocate(1000, 64);
  print_block("medium", 1000, 64, medium);
  println!("free list owns it? {}", allocator.large().primary().owns(medium));

  // --------------------------------------------------------------------
  // 3) A request larger than a free list chunk falls back to malloc.
  // --------------------------------------------------------------------
  let huge = allocator.allocate(64 * 1024, 16);
  print_block("huge", 64 * 1024, 16, huge);
  println!("free list owns it? {}", allocator.large().primary().owns(huge));

  // --------------------------------------------------------------------
  // 4) Give everything back. The pool reuses the freed slot first.
  // --------------------------------------------------------------------
  allocator.deallocate(huge);
  allocator.deallocate(medium);

  allocator.deallocate(small[0]);
  let reused = allocator.allocate(8, 4);
  println!("reused freed slot? {}", reused.ptr == small[0].ptr);

  allocator.deallocate(reused);
  allocator.deallocate(small[1]);
  allocator.deallocate(small[2]);

  // --------------------------------------------------------------------
  // 5) A per-frame arena: bump, then reset in one go.
  // --------------------------------------------------------------------
  let mut frame = match LinearAllocator::<Mallocator, 4096>::new() {
    Ok(frame) => frame,
    Err(error) => {
      eprintln!("could not reserve frame arena: {error}");
      return;
    }
  };

  for size in [24, 100, 7] {
    let block = frame.allocate(size, 8);
    print_block("frame", size, 8, block);
  }

  println!("frame used = {} of {}", frame.used(), frame.capacity());
  frame.deallocate_all();
  println!("frame used after reset = {}", frame.used());
}
