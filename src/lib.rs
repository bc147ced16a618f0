//! # segalloc - A Segmented Boundary-Tag Allocator
//!
//! This crate provides a general purpose heap, [`Heap`], that takes memory
//! straight from the OS with `mmap(2)` and carves it into chunks tagged at
//! both ends.
//!
//! ## Overview
//!
//! Memory is requested in **segments**, each one an anonymous mapping. A
//! segment holds a chain of **chunks** that is walked left to right by size
//! and right to left through footers:
//!
//! ```text
//!   Heap:
//!
//!   head ──► ┌────────────────────────────────────────────────────────┐
//!            │ Segment (newest)                                       │
//!            │ ┌─────┬────────┬────────┬──────────────────────┬───┐   │
//!            │ │ hdr │ used   │ used   │ free                 │ 0 │   │
//!            │ └─────┴────────┴────────┴──────────────────────┴───┘   │
//!            └───────────┬────────────────────────────────────────────┘
//!                        ▼
//!            ┌────────────────────────────────────────────────────────┐
//!            │ Segment                                                │
//!            │ ┌─────┬────────────────────────────────────────┬───┐   │
//!            │ │ hdr │ used                                   │ 0 │   │
//!            │ └─────┴────────────────────────────────────────┴───┘   │
//!            └────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Crate Structure
//!
//! ```text
//!   segalloc
//!   ├── align      - Alignment macros (align!, align_to!) and constants
//!   ├── chunk      - Boundary tag view over a chunk (internal)
//!   ├── segment    - Mapped segments and the segment list (internal)
//!   ├── config     - HeapConfig
//!   ├── error      - AllocError, ConfigError
//!   ├── heap       - Heap: allocate, free, reallocate
//!   ├── inspect    - HeapDump for diagnostics
//!   └── global     - LockedHeap, a GlobalAlloc adapter
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use segalloc::Heap;
//!
//! let mut heap = Heap::new();
//!
//! let ptr = heap.allocate(8).unwrap().cast::<u64>();
//!
//! unsafe {
//!     ptr.write(42);
//!     assert_eq!(ptr.read(), 42);
//!
//!     heap.free(ptr.as_ptr().cast());
//! }
//!
//! assert_eq!(heap.segment_count(), 0);
//! ```
//!
//! ## How It Works
//!
//! - **Allocation** rounds the request up to 16 bytes and takes the first
//!   free chunk that fits, searching the newest segment first. Oversized
//!   chunks are split; a tail too small for a chunk of its own stays with the
//!   allocation. If nothing fits, a new segment is mapped.
//! - **Free** merges the chunk with free neighbours on both sides. When the
//!   result covers the whole segment, the segment is unmapped.
//! - **Reallocation** grows into free chunks to the right, shrinks by
//!   splitting, and otherwise moves the data to a fresh chunk.
//!
//! ## Limitations
//!
//! - **Single-threaded**: [`Heap`] has no locking; [`LockedHeap`] adds it.
//! - **16-byte alignment**: larger alignments are not supported.
//! - **Unix-only**: requires `libc` and anonymous `mmap`.
//!
//! ## Safety
//!
//! Freeing or reallocating a pointer that is not live in the same heap is
//! undefined behaviour, which is why [`Heap::free`] and
//! [`Heap::reallocate`] are `unsafe`.

pub mod align;
mod chunk;
mod config;
mod error;
mod global;
mod heap;
mod inspect;
mod segment;

pub use config::{HeapConfig, page_size};
pub use error::{AllocError, ConfigError};
pub use global::LockedHeap;
pub use heap::Heap;
pub use inspect::{ChunkReport, HeapDump, SegmentReport};
