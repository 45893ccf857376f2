//! Heap providers: the out-of-scope collaborator that supplies raw bytes
//! for the arena to grow into (§6).
//!
//! The arena's addresses must stay stable once handed out: a client
//! holding a payload pointer into block N must see that pointer remain
//! valid after the heap grows to make room for block N+1, so every
//! provider here commits a fixed backing region up front and only moves a
//! logical high-water mark within it, the same shape `sunsided-os`'s
//! `static_heap` module uses for its fixed `.bss` array plus `mem_brk`-like
//! cursor, and the shape `sbrk(2)` gives for free on a real process heap.

use std::ptr::NonNull;

/// The heap-growth contract the core allocator consumes.
///
/// Implementors promise that any address previously returned by
/// [`Self::request_more`] (and everything below [`Self::current_high_address`])
/// remains valid and unmoved for the provider's lifetime.
pub trait HeapProvider {
  /// Extends the arena by exactly `size_bytes`, returning the address of
  /// the newly available, contiguous region. Returns `None` if the
  /// provider cannot satisfy the request; the arena is left unchanged.
  fn request_more(&mut self, size_bytes: usize) -> Option<NonNull<u8>>;

  /// The current one-past-end address of the arena, or `None` before the
  /// first successful [`Self::request_more`].
  fn current_high_address(&self) -> Option<NonNull<u8>>;

  /// The arena's base address, or `None` before the first successful
  /// [`Self::request_more`]. Not part of the out-of-scope contract
  /// proper, but every block offset in this crate is relative to it, so
  /// the allocator needs a stable way to recover it.
  fn base_address(&self) -> Option<NonNull<u8>>;
}

/// Default capacity reserved by a [`VecHeap`] with no explicit capacity.
pub const DEFAULT_VEC_HEAP_CAPACITY: usize = 64 * 1024 * 1024;

/// A deterministic, portable heap provider backed by a fixed-capacity byte
/// buffer allocated eagerly at construction. No OS dependency, reproducible
/// across platforms; the default choice for tests and for embedding the
/// allocator in a process that doesn't want `sbrk`.
pub struct VecHeap {
  storage: Box<[u8]>,
  high: usize,
}

impl VecHeap {
  /// Reserves a buffer of [`DEFAULT_VEC_HEAP_CAPACITY`] bytes.
  pub fn new() -> Self {
    Self::with_capacity(DEFAULT_VEC_HEAP_CAPACITY)
  }

  /// Reserves a buffer of exactly `capacity` bytes; the arena can never
  /// grow past this.
  pub fn with_capacity(capacity: usize) -> Self {
    Self {
      storage: vec![0u8; capacity].into_boxed_slice(),
      high: 0,
    }
  }

  fn base(&self) -> NonNull<u8> {
    NonNull::new(self.storage.as_ptr() as *mut u8).expect("boxed slice base is never null")
  }
}

impl Default for VecHeap {
  fn default() -> Self {
    Self::new()
  }
}

impl HeapProvider for VecHeap {
  fn request_more(&mut self, size_bytes: usize) -> Option<NonNull<u8>> {
    let new_high = self.high.checked_add(size_bytes)?;
    if new_high > self.storage.len() {
      return None;
    }
    let ptr = unsafe { self.base().as_ptr().add(self.high) };
    self.high = new_high;
    NonNull::new(ptr)
  }

  fn current_high_address(&self) -> Option<NonNull<u8>> {
    if self.high == 0 {
      return None;
    }
    NonNull::new(unsafe { self.base().as_ptr().add(self.high) })
  }

  fn base_address(&self) -> Option<NonNull<u8>> {
    (self.high > 0).then(|| self.base())
  }
}

/// A heap provider backed by the process's real `sbrk(2)` break, for
/// running the allocator against genuine process memory. Mirrors the
/// teacher crate's bump allocator, which grows and shrinks the same break
/// directly via `libc::sbrk`.
pub struct SbrkHeap {
  base: Option<NonNull<u8>>,
  high: Option<NonNull<u8>>,
}

impl SbrkHeap {
  pub fn new() -> Self {
    Self {
      base: None,
      high: None,
    }
  }
}

impl Default for SbrkHeap {
  fn default() -> Self {
    Self::new()
  }
}

impl HeapProvider for SbrkHeap {
  fn request_more(&mut self, size_bytes: usize) -> Option<NonNull<u8>> {
    let prev_brk = unsafe { libc::sbrk(size_bytes as libc::intptr_t) };
    if prev_brk == usize::MAX as *mut libc::c_void {
      return None;
    }
    let ptr = NonNull::new(prev_brk as *mut u8)?;
    if self.base.is_none() {
      self.base = Some(ptr);
    }
    self.high = NonNull::new(unsafe { ptr.as_ptr().add(size_bytes) });
    Some(ptr)
  }

  fn current_high_address(&self) -> Option<NonNull<u8>> {
    self.high
  }

  fn base_address(&self) -> Option<NonNull<u8>> {
    self.base
  }
}
