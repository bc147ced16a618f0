//! Boundary-tagged chunks.
//!
//! ```text
//!   ┌──────────────┬───────────────────────────────┬──────────────┐
//!   │ header       │ user data                     │ footer       │
//!   │ size | inuse │ size - 2 * WORD bytes         │ size         │
//!   └──────────────┴───────────────────────────────┴──────────────┘
//!                  ▲
//!                  └── pointer returned to the caller (16-byte aligned)
//! ```
//!
//! The header packs the total chunk size (always a multiple of 16) with the
//! in-use flag in bit 0. The footer carries the plain size, so the chunk to
//! the left can always be found by reading the word in front of a header.
//! A zero word in header position is a sentinel: there is no chunk there.
//!
//! This module is the only place that touches tag words directly.

use std::ptr::NonNull;

use crate::align::{ALIGNMENT, WORD};

const IN_USE: usize = 1;
const TAG_BITS: usize = ALIGNMENT - 1;

/// Bytes of every chunk spent on its header and footer.
pub const OVERHEAD: usize = 2 * WORD;

/// A view over a chunk living inside a mapped segment.
///
/// A `Chunk` is only ever built over a valid header word: every safe method
/// relies on that, and on the segment keeping a zero word on either side of
/// its chunk sequence.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Chunk {
  header: NonNull<usize>,
}

impl Chunk {
  /// # Safety
  ///
  /// `header` must point at the header word of a chunk, or at the slot where
  /// one is about to be written with [`Chunk::write`], inside a live segment.
  pub unsafe fn from_header(header: NonNull<usize>) -> Self {
    debug_assert_eq!(header.as_ptr() as usize % WORD, 0);
    Self { header }
  }

  /// # Safety
  ///
  /// `ptr` must have been returned by [`Chunk::user_ptr`] for a chunk that is
  /// still part of a live segment.
  pub unsafe fn from_user_ptr(ptr: NonNull<u8>) -> Self {
    unsafe { Self::from_header(ptr.cast::<usize>().sub(1)) }
  }

  pub fn addr(self) -> usize {
    self.header.as_ptr() as usize
  }

  /// Total size including header and footer.
  pub fn size(self) -> usize {
    unsafe { self.header.read() & !TAG_BITS }
  }

  /// Size recorded in the footer.
  pub fn footer_size(self) -> usize {
    unsafe { self.footer().read() }
  }

  pub fn user_size(self) -> usize {
    self.size() - OVERHEAD
  }

  pub fn in_use(self) -> bool {
    unsafe { self.header.read() & IN_USE != 0 }
  }

  pub fn set_in_use(
    self,
    in_use: bool,
  ) {
    let size = self.size();
    unsafe { self.header.write(size | in_use as usize) };
  }

  pub fn user_ptr(self) -> NonNull<u8> {
    unsafe { self.header.add(1).cast() }
  }

  /// Rewrites both tags.
  ///
  /// # Safety
  ///
  /// `size` bytes starting at this chunk's header must lie inside the owning
  /// segment, in front of its trailing sentinel.
  pub unsafe fn write(
    self,
    size: usize,
    in_use: bool,
  ) {
    assert!(
      size % ALIGNMENT == 0 && size >= OVERHEAD,
      "corrupt chunk size {size} at {:#x}",
      self.addr()
    );

    unsafe {
      self.header.write(size | in_use as usize);
      self.footer().write(size);
    }
  }

  /// The slot directly after this chunk's footer, whether or not a chunk
  /// lives there yet.
  ///
  /// # Safety
  ///
  /// Same as [`Chunk::from_header`] for the returned slot.
  pub unsafe fn following(self) -> Chunk {
    unsafe { Self::from_header(self.header.byte_add(self.size())) }
  }

  /// The chunk to the right, or `None` at the end of the segment.
  pub fn next(self) -> Option<Chunk> {
    debug_assert_eq!(self.size(), self.footer_size(), "torn chunk at {:#x}", self.addr());

    let next = unsafe { self.following() };
    (unsafe { next.header.read() } != 0).then_some(next)
  }

  /// The chunk to the left, or `None` at the start of the segment.
  pub fn prev(self) -> Option<Chunk> {
    let prev_size = unsafe { self.header.sub(1).read() };

    if prev_size == 0 {
      return None;
    }

    let prev = unsafe { Self::from_header(self.header.byte_sub(prev_size)) };
    debug_assert_eq!(prev.size(), prev_size, "torn chunk at {:#x}", prev.addr());
    Some(prev)
  }

  /// Absorbs the right neighbour if it is free, keeping this chunk's in-use
  /// flag. Returns whether anything was merged.
  pub fn merge_next(self) -> bool {
    match self.next() {
      Some(next) if !next.in_use() => {
        unsafe { self.write(self.size() + next.size(), self.in_use()) };
        true
      }
      _ => false,
    }
  }

  /// Shrinks this chunk to `size` and turns the tail into a free chunk,
  /// provided the tail can stand on its own. The tail is merged with a free
  /// right neighbour. Returns the tail, if one was carved.
  pub fn split(
    self,
    size: usize,
  ) -> Option<Chunk> {
    let excess = self.size().checked_sub(size)?;

    if excess <= OVERHEAD {
      return None;
    }

    log::trace!("split chunk {:#x}: {} -> {} + {}", self.addr(), self.size(), size, excess);

    unsafe {
      self.write(size, self.in_use());
      let rest = self.following();
      rest.write(excess, false);
      while rest.merge_next() {}
      Some(rest)
    }
  }

  fn footer(self) -> NonNull<usize> {
    unsafe { self.header.byte_add(self.size() - WORD) }
  }
}
