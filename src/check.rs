//! Consistency checker (§4.8): an optional, relatively expensive audit over
//! every bucket and the whole physical chain. Not on any hot path; meant
//! for tests and bring-up. Logs the specific invariant violated, and
//! where, rather than collapsing everything into a single boolean.

use std::collections::HashSet;
use std::ptr::NonNull;

use crate::bucket::{bucket_index, NUM_BUCKETS};
use crate::freelist::FreeLists;

/// Audits every invariant in §3 that the checker can observe cheaply.
/// Returns `true` if the heap is consistent.
///
/// # Safety
/// `base` must be the arena base; `high` must be the current one-past-end
/// address; the physical chain from the first real block (at
/// [`crate::block::FIRST_BLOCK_OFFSET`], immediately after the prologue)
/// must terminate at a zero-size allocated epilogue at or before `high`.
pub unsafe fn check(base: NonNull<u8>, high: NonNull<u8>, lists: &FreeLists) -> bool {
  let high_offset = unsafe { high.as_ptr().offset_from(base.as_ptr()) } as u32;

  let mut listed: HashSet<u32> = HashSet::new();
  for bucket in 0..NUM_BUCKETS {
    let mut cursor = lists.head_of_bucket(bucket);
    while let Some(block) = cursor {
      if block.offset() >= high_offset {
        tracing::error!(
          offset = block.offset(),
          high_offset,
          "free-list pointer out of heap bounds"
        );
        return false;
      }
      let expected_bucket = bucket_index(unsafe { block.size(base) });
      if expected_bucket != bucket {
        tracing::error!(
          offset = block.offset(),
          bucket,
          expected_bucket,
          "free block lives in the wrong bucket"
        );
        return false;
      }
      if unsafe { block.is_allocated(base) } {
        tracing::error!(
          offset = block.offset(),
          "block in free list is tagged allocated"
        );
        return false;
      }
      if !listed.insert(block.offset()) {
        tracing::error!(
          offset = block.offset(),
          "block appears in more than one free-list bucket"
        );
        return false;
      }
      cursor = unsafe { block.next_link(base) };
    }
  }

  let mut cursor = crate::block::BlockPtr::from_offset(crate::block::FIRST_BLOCK_OFFSET);
  let mut prev_free = false;
  loop {
    let size = unsafe { cursor.size(base) };
    if size == 0 {
      // Epilogue reached; chain integrity (invariant 3) holds.
      break;
    }
    let allocated = unsafe { cursor.is_allocated(base) };
    if !allocated {
      if prev_free {
        tracing::error!(
          offset = cursor.offset(),
          "two physically adjacent free blocks"
        );
        return false;
      }
      if !listed.remove(&cursor.offset()) {
        tracing::error!(
          offset = cursor.offset(),
          "free block in physical chain is missing from its bucket"
        );
        return false;
      }
    }
    prev_free = !allocated;
    cursor = unsafe { cursor.next_block(base) };
    if cursor.offset() > high_offset {
      tracing::error!(high_offset, "physical chain ran past the heap high address");
      return false;
    }
  }

  if !listed.is_empty() {
    tracing::error!(
      stale_count = listed.len(),
      "free-list entries do not correspond to any block in the physical chain"
    );
    return false;
  }

  true
}
