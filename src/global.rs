//! A process-wide convenience singleton over [`SbrkHeap`].
//!
//! The core [`Allocator`] takes no stance on how many instances exist or
//! where they live; that is the caller's business. This module is the
//! "single-instance convenience API" the design notes call for: a
//! `thread_local!` [`RefCell`], not a [`std::sync::Mutex`]-guarded global.
//! The allocator is single-threaded and non-reentrant by design (§5); a
//! `Mutex` would quietly promise cross-thread safety this crate does not
//! provide, so each thread gets its own independent `Allocator` value
//! instead of contending on one shared instance.
//!
//! This does not make concurrent use safe: [`SbrkHeap`] grows the one
//! real process break, so two threads calling into this module at the
//! same time still race on that shared OS resource even though each
//! holds its own [`Allocator`]. Use the singleton from a single thread,
//! or build a private [`Allocator`] per thread over a [`crate::heap::VecHeap`]
//! if true per-thread isolation is needed.

use std::cell::RefCell;
use std::ptr::NonNull;

use crate::allocator::Allocator;
use crate::error::AllocInitError;
use crate::heap::SbrkHeap;

thread_local! {
  static INSTANCE: RefCell<Allocator<SbrkHeap>> = RefCell::new(Allocator::new(SbrkHeap::new()));
}

/// Brings up this thread's singleton allocator. Must be called once
/// before [`alloc`]/[`free`]/[`realloc`]/[`check`]; calling it again
/// resets the thread's arena (see [`Allocator::init`]).
pub fn init() -> Result<(), AllocInitError> {
  INSTANCE.with(|cell| cell.borrow_mut().init())
}

/// Delegates to this thread's singleton [`Allocator::alloc`].
pub fn alloc(n: usize) -> Option<NonNull<u8>> {
  INSTANCE.with(|cell| cell.borrow_mut().alloc(n))
}

/// Delegates to this thread's singleton [`Allocator::free`].
pub fn free(p: Option<NonNull<u8>>) {
  INSTANCE.with(|cell| cell.borrow_mut().free(p));
}

/// Delegates to this thread's singleton [`Allocator::realloc`].
pub fn realloc(p: Option<NonNull<u8>>, n: usize) -> Option<NonNull<u8>> {
  INSTANCE.with(|cell| cell.borrow_mut().realloc(p, n))
}

/// Delegates to this thread's singleton [`Allocator::check`].
pub fn check() -> bool {
  INSTANCE.with(|cell| cell.borrow().check())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn singleton_round_trips_within_one_thread() {
    init().unwrap();
    let p = alloc(64).unwrap();
    assert_eq!(p.as_ptr() as usize % 8, 0);
    assert!(check());
    free(Some(p));
    assert!(check());
  }

  #[test]
  fn each_thread_gets_its_own_arena() {
    let handle = std::thread::spawn(|| {
      init().unwrap();
      let p = alloc(32).unwrap();
      free(Some(p));
      check()
    });
    assert!(handle.join().unwrap());
  }
}
