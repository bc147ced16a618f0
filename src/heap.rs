use std::ptr::{self, NonNull};

use log::debug;

use crate::{
  align::{ALIGNMENT, checked_align_to},
  chunk::{Chunk, OVERHEAD},
  config::HeapConfig,
  error::AllocError,
  inspect::{ChunkReport, HeapDump, SegmentReport},
  segment::{SEGMENT_OVERHEAD, Segment, SegmentList},
};

/// Chunk size able to hold `size` bytes of user data.
fn chunk_size_for(size: usize) -> Result<usize, AllocError> {
  checked_align_to(size, ALIGNMENT)
    .and_then(|size| size.checked_add(OVERHEAD))
    .ok_or(AllocError::SizeOverflow(size))
}

/// A boundary-tag heap over anonymous mappings.
///
/// Not thread safe; wrap it in a lock (see [`LockedHeap`](crate::LockedHeap))
/// to share it.
#[derive(Debug)]
pub struct Heap {
  segments: SegmentList,
  config: HeapConfig,
}

// The heap exclusively owns its mappings.
unsafe impl Send for Heap {}

impl Heap {
  /// An empty heap. Nothing is mapped until the first allocation.
  pub const fn new() -> Self {
    Self::with_config(HeapConfig::new())
  }

  pub const fn with_config(config: HeapConfig) -> Self {
    Self {
      segments: SegmentList::new(),
      config,
    }
  }

  pub fn config(&self) -> &HeapConfig {
    &self.config
  }

  pub fn segment_count(&self) -> usize {
    self.segments.len()
  }

  /// Unmaps every segment. The heap stays usable and starts out empty again.
  ///
  /// Every pointer handed out so far dangles afterwards.
  pub fn deinit(&mut self) {
    if !self.segments.is_empty() {
      debug!("releasing {} segments", self.segments.len());
    }

    unsafe { self.segments.destroy_all() };
  }

  /// Returns a 16-byte aligned pointer to at least `size` writable bytes.
  pub fn allocate(
    &mut self,
    size: usize,
  ) -> Result<NonNull<u8>, AllocError> {
    let chunk_size = chunk_size_for(size)?;

    let Some(chunk) = self.find_free_chunk(chunk_size) else {
      return self.allocate_in_new_segment(size, chunk_size);
    };

    chunk.split(chunk_size);
    chunk.set_in_use(true);

    Ok(chunk.user_ptr())
  }

  /// First fit, newest segment first, then address order.
  fn find_free_chunk(
    &self,
    chunk_size: usize,
  ) -> Option<Chunk> {
    self
      .segments
      .iter()
      .flat_map(Segment::chunks)
      .find(|chunk| !chunk.in_use() && chunk.size() >= chunk_size)
  }

  fn allocate_in_new_segment(
    &mut self,
    size: usize,
    chunk_size: usize,
  ) -> Result<NonNull<u8>, AllocError> {
    let needed = chunk_size
      .checked_add(SEGMENT_OVERHEAD)
      .ok_or(AllocError::SizeOverflow(size))?;
    let segment_size = self
      .config
      .segment_len(needed)
      .ok_or(AllocError::SizeOverflow(size))?;

    let segment = self.segments.create(segment_size)?;
    let chunk = segment.first_chunk();

    unsafe {
      chunk.write(chunk_size, true);

      let leftover = segment_size - needed;
      if leftover > OVERHEAD {
        chunk.following().write(leftover, false);
      }
    }

    Ok(chunk.user_ptr())
  }

  /// Releases the chunk behind `ptr`, merging it with free neighbours. A
  /// segment left with a single free chunk is unmapped.
  ///
  /// # Safety
  ///
  /// `ptr` must be null or a live pointer returned by this heap.
  pub unsafe fn free(
    &mut self,
    ptr: *mut u8,
  ) {
    let Some(ptr) = NonNull::new(ptr) else {
      return;
    };

    let mut chunk = unsafe { Chunk::from_user_ptr(ptr) };
    debug_assert!(chunk.in_use(), "double free of {ptr:p}");
    chunk.set_in_use(false);

    while chunk.merge_next() {}

    while let Some(prev) = chunk.prev().filter(|prev| !prev.in_use()) {
      prev.merge_next();
      chunk = prev;
    }

    if chunk.prev().is_none() && chunk.next().is_none() {
      unsafe {
        let segment = Segment::containing(chunk);
        debug!("reclaiming segment {:#x} ({} bytes)", segment.addr(), segment.size());
        self.segments.destroy(segment);
      }
    }
  }

  /// Resizes the allocation behind `ptr`, in place when the chunk or its
  /// free right neighbours have room, otherwise by moving it. The first
  /// `min(old, new_size)` bytes are preserved.
  ///
  /// On error `ptr` stays valid with its contents untouched.
  ///
  /// # Safety
  ///
  /// `ptr` must be null or a live pointer returned by this heap.
  pub unsafe fn reallocate(
    &mut self,
    ptr: *mut u8,
    new_size: usize,
  ) -> Result<NonNull<u8>, AllocError> {
    let Some(ptr) = NonNull::new(ptr) else {
      return self.allocate(new_size);
    };

    let chunk = unsafe { Chunk::from_user_ptr(ptr) };
    let old_size = chunk.size();
    let chunk_size = chunk_size_for(new_size)?;

    if chunk_size == old_size {
      return Ok(ptr);
    }

    if chunk_size > old_size {
      while chunk.size() < chunk_size && chunk.merge_next() {}

      if chunk.size() < chunk_size {
        debug!("moving {ptr:p}: {old_size} -> {chunk_size} bytes");

        let moved = self.allocate(new_size)?;
        let len = (old_size - OVERHEAD).min(new_size);

        unsafe {
          ptr::copy_nonoverlapping(ptr.as_ptr(), moved.as_ptr(), len);
          self.free(ptr.as_ptr());
        }

        return Ok(moved);
      }
    }

    chunk.split(chunk_size);

    Ok(ptr)
  }

  /// User-data capacity of a live allocation.
  ///
  /// # Safety
  ///
  /// `ptr` must be a live pointer returned by this heap.
  pub unsafe fn usable_size(
    &self,
    ptr: NonNull<u8>,
  ) -> usize {
    unsafe { Chunk::from_user_ptr(ptr) }.user_size()
  }

  /// Snapshot of every segment and chunk.
  pub fn dump(&self) -> HeapDump {
    let segments = self
      .segments
      .iter()
      .map(|segment| SegmentReport {
        addr: segment.addr(),
        size: segment.size(),
        chunks: segment
          .chunks()
          .map(|chunk| ChunkReport {
            addr: chunk.addr(),
            size: chunk.size(),
            in_use: chunk.in_use(),
          })
          .collect(),
      })
      .collect();

    HeapDump { segments }
  }
}

impl Default for Heap {
  fn default() -> Self {
    Self::new()
  }
}

impl Drop for Heap {
  fn drop(&mut self) {
    self.deinit();
  }
}
