//! Segments: anonymous mappings that carry a chain of chunks.
//!
//! ```text
//!   ┌──────┬──────┬──────┬────────┬────────┬─────┬──────────┐
//!   │ size │ next │  0   │ chunk  │ chunk  │ ... │ 0        │
//!   └──────┴──────┴──────┴────────┴────────┴─────┴──────────┘
//!    SegmentHeader        ▲                       sentinel
//!                         └── first chunk header
//! ```
//!
//! The zero word at the end of the header stands in for the footer of a
//! chunk that does not exist, so walking left from the first chunk stops
//! there. The trailing sentinel stops walks to the right.

use std::{io, iter, mem, ptr, ptr::NonNull};

use log::{trace, warn};

use crate::{
  align::{ALIGNMENT, WORD},
  chunk::Chunk,
  error::AllocError,
};

#[repr(C)]
struct SegmentHeader {
  size: usize,
  next: Option<Segment>,
  start_tag: usize,
}

/// Bytes in front of the first chunk header.
pub const SEGMENT_HEADER: usize = mem::size_of::<SegmentHeader>();

/// Bytes a segment spends besides its chunks: header and sentinel.
pub const SEGMENT_OVERHEAD: usize = SEGMENT_HEADER + WORD;

// Segments are page aligned, so this puts every user pointer on 16 bytes.
const _: () = assert!((SEGMENT_HEADER + WORD) % ALIGNMENT == 0);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(transparent)]
pub struct Segment {
  header: NonNull<SegmentHeader>,
}

impl Segment {
  /// Maps `size` zeroed bytes. The caller has to carve the first chunk.
  pub fn map(size: usize) -> Result<Self, AllocError> {
    let addr = unsafe {
      libc::mmap(
        ptr::null_mut(),
        size,
        libc::PROT_READ | libc::PROT_WRITE,
        libc::MAP_PRIVATE | libc::MAP_ANONYMOUS,
        -1,
        0,
      )
    };

    if addr == libc::MAP_FAILED {
      let source = io::Error::last_os_error();
      warn!("mmap of {size} bytes failed: {source}");
      return Err(AllocError::MapFailed { size, source });
    }

    let Some(header) = NonNull::new(addr.cast::<SegmentHeader>()) else {
      return Err(AllocError::MapFailed {
        size,
        source: io::Error::other("mmap returned null"),
      });
    };

    unsafe {
      header.write(SegmentHeader {
        size,
        next: None,
        start_tag: 0,
      })
    };

    trace!("mapped segment {:p} ({size} bytes)", header);

    Ok(Self { header })
  }

  /// Returns the mapping to the OS.
  ///
  /// # Safety
  ///
  /// The segment must be unlinked and none of its chunks used afterwards.
  pub unsafe fn unmap(self) {
    let size = self.size();
    let rc = unsafe { libc::munmap(self.header.as_ptr().cast(), size) };

    if rc != 0 {
      warn!("munmap of segment {:p} failed: {}", self.header, io::Error::last_os_error());
    } else {
      trace!("unmapped segment {:p} ({size} bytes)", self.header);
    }
  }

  /// The segment whose first chunk is `chunk`.
  ///
  /// # Safety
  ///
  /// `chunk` must be the first chunk of a live segment.
  pub unsafe fn containing(chunk: Chunk) -> Self {
    debug_assert!(chunk.prev().is_none());

    let addr = (chunk.addr() - SEGMENT_HEADER) as *mut SegmentHeader;
    Self {
      header: unsafe { NonNull::new_unchecked(addr) },
    }
  }

  pub fn addr(self) -> usize {
    self.header.as_ptr() as usize
  }

  pub fn size(self) -> usize {
    unsafe { (*self.header.as_ptr()).size }
  }

  pub fn next(self) -> Option<Segment> {
    unsafe { (*self.header.as_ptr()).next }
  }

  fn set_next(
    self,
    next: Option<Segment>,
  ) {
    unsafe { (*self.header.as_ptr()).next = next };
  }

  /// Slot of the first chunk header. Valid once the segment has been carved.
  pub fn first_chunk(self) -> Chunk {
    unsafe { Chunk::from_header(self.header.byte_add(SEGMENT_HEADER).cast()) }
  }

  /// Chunks in address order up to the sentinel.
  pub fn chunks(self) -> impl Iterator<Item = Chunk> {
    iter::successors(Some(self.first_chunk()), |chunk| chunk.next())
  }
}

/// Singly linked list of owned segments, newest first.
#[derive(Debug, Default)]
pub struct SegmentList {
  head: Option<Segment>,
}

impl SegmentList {
  pub const fn new() -> Self {
    Self { head: None }
  }

  pub fn is_empty(&self) -> bool {
    self.head.is_none()
  }

  pub fn iter(&self) -> impl Iterator<Item = Segment> + '_ {
    iter::successors(self.head, |segment| segment.next())
  }

  pub fn len(&self) -> usize {
    self.iter().count()
  }

  /// Maps a segment of `size` bytes and links it at the head.
  pub fn create(
    &mut self,
    size: usize,
  ) -> Result<Segment, AllocError> {
    let segment = Segment::map(size)?;
    segment.set_next(self.head);
    self.head = Some(segment);
    Ok(segment)
  }

  /// Unlinks `segment` and unmaps it.
  ///
  /// # Safety
  ///
  /// `segment` must belong to this list and none of its chunks may be used
  /// afterwards.
  pub unsafe fn destroy(
    &mut self,
    segment: Segment,
  ) {
    if self.head == Some(segment) {
      self.head = segment.next();
    } else {
      let mut node = self.head;
      while let Some(current) = node {
        if current.next() == Some(segment) {
          current.set_next(segment.next());
          break;
        }
        node = current.next();
      }
    }

    unsafe { segment.unmap() };
  }

  /// Unmaps every segment.
  ///
  /// # Safety
  ///
  /// No chunk of any segment may be used afterwards.
  pub unsafe fn destroy_all(&mut self) {
    while let Some(segment) = self.head {
      self.head = segment.next();
      unsafe { segment.unmap() };
    }
  }
}
