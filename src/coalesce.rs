//! Eager boundary-tag coalescing.
//!
//! Run immediately whenever a block becomes free (on `free` and after
//! extending the heap), so no two physically adjacent free blocks ever
//! coexist. Four cases, keyed on whether the physical predecessor and
//! successor are themselves free:
//!
//! | prev  | next  | action                                          |
//! |-------|-------|--------------------------------------------------|
//! | alloc | alloc | no merge                                          |
//! | alloc | free  | merge with next                                   |
//! | free  | alloc | merge with prev                                   |
//! | free  | free  | merge prev + this + next                          |
//!
//! Returns the address of the resulting (possibly merged) free block, not
//! yet re-inserted into any free list; callers insert it themselves so
//! they can choose the resulting size's bucket once.

use std::ptr::NonNull;

use crate::block::BlockPtr;
use crate::freelist::FreeLists;

/// Merges `block` with any physically adjacent free neighbors.
///
/// `block` must already be tagged free and must NOT currently be linked
/// into `lists` (the caller inserts the final merged result itself). Any
/// neighbor absorbed by the merge is unlinked from `lists` here.
///
/// # Safety
/// `block` must be a valid, currently-free block in the arena at `base`,
/// physically bounded by the prologue and epilogue sentinels (so
/// `prev_block`/`next_block` are always in-bounds).
pub unsafe fn coalesce(base: NonNull<u8>, lists: &mut FreeLists, block: BlockPtr) -> BlockPtr {
  unsafe {
    let prev = block.prev_block(base);
    let next = block.next_block(base);
    let prev_free = !prev.is_allocated(base);
    let next_free = !next.is_allocated(base);

    let (start, merged_size) = match (prev_free, next_free) {
      (false, false) => (block, block.size(base)),
      (false, true) => {
        let size = next.size(base);
        lists.unlink(base, next, size);
        (block, block.size(base) + size)
      }
      (true, false) => {
        let size = prev.size(base);
        lists.unlink(base, prev, size);
        (prev, size + block.size(base))
      }
      (true, true) => {
        let prev_size = prev.size(base);
        let next_size = next.size(base);
        lists.unlink(base, prev, prev_size);
        lists.unlink(base, next, next_size);
        (prev, prev_size + block.size(base) + next_size)
      }
    };

    start.set_tags(base, merged_size, false);
    start
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  unsafe fn arena(len: usize) -> (Vec<u8>, NonNull<u8>) {
    let mut buf = vec![0u8; len];
    let base = NonNull::new(buf.as_mut_ptr()).unwrap();
    (buf, base)
  }

  #[test]
  fn alloc_alloc_does_not_merge() {
    unsafe {
      let (_buf, base) = arena(256);
      let mut lists = FreeLists::new();

      let sentinel_prev = BlockPtr::from_offset(0);
      sentinel_prev.set_tags(base, 16, true);
      let mid = BlockPtr::from_offset(16);
      mid.set_tags(base, 16, false);
      let next = BlockPtr::from_offset(32);
      next.set_tags(base, 16, true);

      let merged = coalesce(base, &mut lists, mid);
      assert_eq!(merged.offset(), mid.offset());
      assert_eq!(merged.size(base), 16);
    }
  }

  #[test]
  fn free_neighbors_on_both_sides_merge_into_one_block() {
    unsafe {
      let (_buf, base) = arena(256);
      let mut lists = FreeLists::new();

      let prev = BlockPtr::from_offset(0);
      prev.set_tags(base, 16, false);
      let mid = BlockPtr::from_offset(16);
      mid.set_tags(base, 16, false);
      let next = BlockPtr::from_offset(32);
      next.set_tags(base, 16, false);

      lists.insert(base, prev, 16);
      lists.insert(base, next, 16);

      let merged = coalesce(base, &mut lists, mid);
      assert_eq!(merged.offset(), prev.offset());
      assert_eq!(merged.size(base), 48);
      assert_eq!(lists.head(16), None);
    }
  }
}
