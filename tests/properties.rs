use proptest::prelude::*;

use stratalloc::{Allocator, Block, FreeListAllocator, LinearAllocator, Mallocator, Owns, PoolAllocator};

type Heap = FreeListAllocator<Mallocator, 2048>;
type Pool = PoolAllocator<Mallocator, 1, 96, 8>;

#[derive(Debug, Clone)]
enum Op {
  Alloc { size: usize, alignment: usize },
  Free { index: usize },
}

fn alignment() -> impl Strategy<Value = usize> {
  (0u32..7).prop_map(|shift| 1usize << shift)
}

fn op_sequence(max_size: usize) -> impl Strategy<Value = Vec<Op>> {
  let op = prop_oneof![
    3 => (1..=max_size, alignment()).prop_map(|(size, alignment)| Op::Alloc { size, alignment }),
    2 => any::<usize>().prop_map(|index| Op::Free { index }),
  ];

  prop::collection::vec(op, 1..200)
}

fn disjoint(blocks: &[Block]) -> bool {
  let mut sorted: Vec<Block> = blocks.to_vec();
  sorted.sort_by_key(|block| block.ptr as usize);

  sorted.windows(2).all(|pair| pair[0].end() <= pair[1].ptr)
}

fn well_formed(
  block: Block,
  size: usize,
  alignment: usize,
) -> bool {
  !block.ptr.is_null() && block.size >= size && block.ptr as usize % alignment == 0
}

proptest! {
  #[test]
  fn free_list_keeps_live_blocks_apart(ops in op_sequence(Heap::MAX_REQUEST)) {
    let mut heap = Heap::new();
    let mut live: Vec<Block> = Vec::new();

    for op in ops {
      match op {
        Op::Alloc { size, alignment } => {
          let block = heap.allocate(size, alignment);

          if !block.is_empty() {
            prop_assert!(well_formed(block, size, alignment));
            prop_assert!(heap.owns(block));
            live.push(block);
          }
        }
        Op::Free { index } if !live.is_empty() => {
          let block = live.swap_remove(index % live.len());
          heap.deallocate(block);
        }
        Op::Free { .. } => {}
      }

      prop_assert!(disjoint(&live));

      let free: Vec<Block> = heap.free_blocks().collect();
      prop_assert!(free.windows(2).all(|pair| pair[0].end() < pair[1].ptr));
    }

    for block in live.drain(..) {
      heap.deallocate(block);
    }

    prop_assert_eq!(heap.free_count(), heap.chunk_count());
    prop_assert_eq!(heap.free_bytes(), heap.chunk_count() * Heap::REGION_SIZE);
  }

  #[test]
  fn pool_grows_only_for_peak_live_count(ops in op_sequence(96)) {
    let mut pool = Pool::new();
    let mut live: Vec<Block> = Vec::new();
    let mut peak = 0;

    for op in ops {
      match op {
        Op::Alloc { size, alignment } => {
          let block = pool.allocate(size, alignment);

          if alignment > Pool::SLOT_ALIGNMENT {
            prop_assert!(block.is_empty());
            continue;
          }

          prop_assert!(well_formed(block, size, alignment));
          live.push(block);
          peak = peak.max(live.len());
        }
        Op::Free { index } if !live.is_empty() => {
          let block = live.swap_remove(index % live.len());
          pool.deallocate(block);
        }
        Op::Free { .. } => {}
      }

      prop_assert!(disjoint(&live));
    }

    prop_assert!(pool.chunk_count() <= peak.div_ceil(8));
    prop_assert_eq!(pool.free_count() + live.len(), pool.chunk_count() * 8);
  }

  #[test]
  fn linear_blocks_are_aligned_and_in_bounds(
    requests in prop::collection::vec((1usize..64, alignment()), 1..64)
  ) {
    let mut frame = LinearAllocator::<Mallocator, 1024>::new().unwrap();
    let mut served = Vec::new();

    for (size, alignment) in requests {
      let before = frame.used();
      let block = frame.allocate(size, alignment);

      if block.is_empty() {
        prop_assert_eq!(frame.used(), before);
        continue;
      }

      prop_assert!(well_formed(block, size, alignment));
      prop_assert!(frame.owns(block));
      served.push(block);
    }

    prop_assert!(disjoint(&served));
  }

  #[test]
  fn linear_rollback_restores_cursor(prefix in 1usize..512, size in 1usize..256, align in alignment()) {
    let mut frame = LinearAllocator::<Mallocator, 1024>::new().unwrap();

    frame.allocate(prefix, 1);
    let before = frame.used();

    let block = frame.allocate(size, align);
    prop_assume!(!block.is_empty());

    frame.deallocate(block);
    prop_assert_eq!(frame.used(), before);
  }
}
