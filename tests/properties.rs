//! Trace-fuzzing property tests (§8): generate sequences of `Alloc` /
//! `Free` / `Realloc` operations over a `VecHeap`-backed allocator and
//! assert the consistency checker passes after every single one, plus
//! the per-payload invariants (alignment, minimum size, byte
//! preservation across realloc).

use proptest::prelude::*;
use seglloc::{Allocator, VecHeap};
use std::ptr::NonNull;

#[derive(Clone, Debug)]
enum Op {
  Alloc(usize),
  Free(usize),
  Realloc(usize, usize),
}

fn op_strategy() -> impl Strategy<Value = Op> {
  prop_oneof![
    (1usize..4096).prop_map(Op::Alloc),
    (0usize..32).prop_map(Op::Free),
    (0usize..32, 0usize..4096).prop_map(|(h, n)| Op::Realloc(h, n)),
  ]
}

/// A live handle: the byte pattern it was last stamped with, and how
/// many of its leading bytes are trusted to still hold that pattern.
struct Live {
  ptr: NonNull<u8>,
  pattern: u8,
  stamped_len: usize,
}

proptest! {
  #![proptest_config(ProptestConfig::with_cases(256))]

  #[test]
  fn traces_preserve_every_invariant(ops in prop::collection::vec(op_strategy(), 0..200)) {
    let mut allocator = Allocator::new(VecHeap::with_capacity(16 * 1024 * 1024));
    allocator.init().unwrap();
    prop_assert!(allocator.check());

    let mut live: Vec<Live> = Vec::new();
    let mut next_pattern: u8 = 1;

    for op in ops {
      match op {
        Op::Alloc(n) => {
          if let Some(p) = allocator.alloc(n) {
            prop_assert_eq!(p.as_ptr() as usize % 8, 0);
            let pattern = next_pattern;
            next_pattern = next_pattern.wrapping_add(1).max(1);
            unsafe { std::ptr::write_bytes(p.as_ptr(), pattern, n) };
            live.push(Live { ptr: p, pattern, stamped_len: n });
          }
        }
        Op::Free(idx) => {
          if !live.is_empty() {
            let entry = live.remove(idx % live.len());
            allocator.free(Some(entry.ptr));
          }
        }
        Op::Realloc(idx, n) => {
          if !live.is_empty() {
            let i = idx % live.len();
            let entry = &live[i];
            let preserved = entry.stamped_len.min(n);
            let pattern = entry.pattern;

            match allocator.realloc(Some(entry.ptr), n) {
              Some(new_ptr) => {
                prop_assert_eq!(new_ptr.as_ptr() as usize % 8, 0);
                let bytes = unsafe {
                  std::slice::from_raw_parts(new_ptr.as_ptr(), preserved)
                };
                prop_assert!(bytes.iter().all(|&b| b == pattern));
                live[i] = Live { ptr: new_ptr, pattern, stamped_len: preserved };
              }
              None => {
                // n == 0 behaves as free.
                live.remove(i);
              }
            }
          }
        }
      }

      prop_assert!(allocator.check());
    }
  }
}

#[test]
fn realloc_null_equals_alloc_and_realloc_zero_equals_free() {
  let mut allocator = Allocator::new(VecHeap::with_capacity(1 << 20));
  allocator.init().unwrap();

  let p = allocator.realloc(None, 64).unwrap();
  assert!(allocator.check());

  assert_eq!(allocator.realloc(Some(p), 0), None);
  assert!(allocator.check());

  assert_eq!(allocator.alloc(0), None);
  allocator.free(None);
  assert!(allocator.check());
}

#[test]
fn bucket_boundary_sizes_are_all_satisfiable() {
  let mut allocator = Allocator::new(VecHeap::with_capacity(1 << 20));
  allocator.init().unwrap();

  for n in [1usize, 7, 8, 9, 496, 504, 505, 512, 1023, 1024, 1025] {
    let p = allocator.alloc(n).unwrap();
    assert_eq!(p.as_ptr() as usize % 8, 0);
    allocator.free(Some(p));
    assert!(allocator.check());
  }
}
