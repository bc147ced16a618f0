//! A [`Heap`] behind a mutex, usable as `#[global_allocator]`.
//!
//! ```rust,ignore
//! use segalloc::LockedHeap;
//!
//! #[global_allocator]
//! static HEAP: LockedHeap = LockedHeap::new();
//! ```
//!
//! When installed globally, any logger hooked into the `log` facade must not
//! allocate, or it will deadlock on the heap's lock.

use std::{
  alloc::{GlobalAlloc, Layout},
  ptr::{self, NonNull},
  sync::{Mutex, MutexGuard},
};

use crate::{align::ALIGNMENT, config::HeapConfig, heap::Heap};

#[derive(Debug)]
pub struct LockedHeap {
  heap: Mutex<Heap>,
}

impl LockedHeap {
  pub const fn new() -> Self {
    Self::with_config(HeapConfig::new())
  }

  pub const fn with_config(config: HeapConfig) -> Self {
    Self {
      heap: Mutex::new(Heap::with_config(config)),
    }
  }

  pub fn lock(&self) -> MutexGuard<'_, Heap> {
    self.heap.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
  }
}

impl Default for LockedHeap {
  fn default() -> Self {
    Self::new()
  }
}

unsafe impl GlobalAlloc for LockedHeap {
  unsafe fn alloc(
    &self,
    layout: Layout,
  ) -> *mut u8 {
    if layout.align() > ALIGNMENT {
      return ptr::null_mut();
    }

    self
      .lock()
      .allocate(layout.size())
      .map_or(ptr::null_mut(), NonNull::as_ptr)
  }

  unsafe fn dealloc(
    &self,
    ptr: *mut u8,
    _layout: Layout,
  ) {
    unsafe { self.lock().free(ptr) };
  }

  unsafe fn realloc(
    &self,
    ptr: *mut u8,
    layout: Layout,
    new_size: usize,
  ) -> *mut u8 {
    if layout.align() > ALIGNMENT {
      return ptr::null_mut();
    }

    unsafe { self.lock().reallocate(ptr, new_size) }.map_or(ptr::null_mut(), NonNull::as_ptr)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_global_alloc() {
    let heap = LockedHeap::new();
    let layout = Layout::array::<u64>(8).unwrap();

    unsafe {
      let ptr = heap.alloc(layout) as *mut u64;
      assert!(!ptr.is_null());
      assert_eq!(ptr as usize % ALIGNMENT, 0);

      for i in 0..8 {
        ptr.add(i).write(i as u64 * 3);
      }

      let grown = heap.realloc(ptr as *mut u8, layout, 4096) as *mut u64;
      assert!(!grown.is_null());

      for i in 0..8 {
        assert_eq!(grown.add(i).read(), i as u64 * 3);
      }

      heap.dealloc(grown as *mut u8, Layout::array::<u64>(512).unwrap());
    }

    assert_eq!(heap.lock().segment_count(), 0);
  }

  #[test]
  fn test_alloc_zeroed() {
    let heap = LockedHeap::new();
    let layout = Layout::array::<u8>(256).unwrap();

    unsafe {
      let dirty = heap.alloc(layout);
      dirty.write_bytes(0xff, 256);
      heap.dealloc(dirty, layout);

      let _keep = heap.alloc(Layout::new::<u8>());
      let zeroed = heap.alloc_zeroed(layout);
      let bytes = std::slice::from_raw_parts(zeroed, 256);
      assert!(bytes.iter().all(|b| *b == 0));
    }
  }

  #[test]
  fn test_over_aligned_layout_is_refused() {
    let heap = LockedHeap::new();
    let layout = Layout::from_size_align(64, 64).unwrap();

    assert!(unsafe { heap.alloc(layout) }.is_null());
    assert_eq!(heap.lock().segment_count(), 0);
  }
}
