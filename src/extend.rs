//! Heap extension: growing the arena when no free block satisfies a request.

use std::ptr::NonNull;

use crate::align::W;
use crate::block::BlockPtr;
use crate::coalesce::coalesce;
use crate::freelist::FreeLists;
use crate::heap::HeapProvider;

/// Extends the arena by `words` machine words (rounded up to an even
/// count), installs a new free block plus a fresh epilogue, coalesces the
/// new block with its physical predecessor if free, and inserts the result
/// into its bucket.
///
/// Returns the (possibly coalesced) new free block, or `None` if the
/// provider refused the request (in which case the arena is unchanged).
///
/// # Safety
/// `base` must be the arena's stable base address; the byte immediately
/// before the region the provider returns must be this arena's current
/// epilogue header.
pub unsafe fn extend_heap<H: HeapProvider>(
  base: NonNull<u8>,
  lists: &mut FreeLists,
  provider: &mut H,
  words: usize,
) -> Option<BlockPtr> {
  let words = if words % 2 != 0 { words + 1 } else { words };
  let size = words * W;

  let region = provider.request_more(size)?;
  let bp_offset = unsafe { region.as_ptr().offset_from(base.as_ptr()) } as u32;
  let bp = BlockPtr::from_offset(bp_offset);

  unsafe {
    bp.set_tags(base, size, false);
    let epilogue = bp.next_block(base);
    epilogue.set_epilogue(base);
  }

  let merged = unsafe { coalesce(base, lists, bp) };
  let merged_size = unsafe { merged.size(base) };
  unsafe { lists.insert(base, merged, merged_size) };
  Some(merged)
}
