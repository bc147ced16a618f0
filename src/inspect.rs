//! Read-only heap snapshots for diagnostics and tests.

use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChunkReport {
  /// Address of the chunk header.
  pub addr: usize,
  /// Total size including both tags.
  pub size: usize,
  pub in_use: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SegmentReport {
  pub addr: usize,
  pub size: usize,
  /// Chunks in address order.
  pub chunks: Vec<ChunkReport>,
}

/// Every segment of a heap, in search order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HeapDump {
  pub segments: Vec<SegmentReport>,
}

impl HeapDump {
  pub fn chunks(&self) -> impl Iterator<Item = &ChunkReport> {
    self.segments.iter().flat_map(|segment| &segment.chunks)
  }

  pub fn chunk_count(&self) -> usize {
    self.chunks().count()
  }

  pub fn free_chunks(&self) -> impl Iterator<Item = &ChunkReport> {
    self.chunks().filter(|chunk| !chunk.in_use)
  }

  /// Bytes held by in-use chunks, tags included.
  pub fn used_bytes(&self) -> usize {
    self.chunks().filter(|chunk| chunk.in_use).map(|chunk| chunk.size).sum()
  }

  /// Whether two free chunks sit next to each other anywhere. Should never
  /// be true once a free has returned.
  pub fn has_adjacent_free(&self) -> bool {
    self.segments.iter().any(|segment| {
      segment
        .chunks
        .windows(2)
        .any(|pair| !pair[0].in_use && !pair[1].in_use)
    })
  }
}

impl fmt::Display for HeapDump {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>,
  ) -> fmt::Result {
    writeln!(f, "--------------------")?;

    for segment in &self.segments {
      writeln!(f, "SEGMENT {:#x}", segment.addr)?;

      for chunk in &segment.chunks {
        let state = if chunk.in_use { "" } else { " (free)" };
        writeln!(f, "\tChunk of size {}{}", chunk.size, state)?;
      }
    }

    writeln!(f, "--------------------")
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn chunk(
    size: usize,
    in_use: bool,
  ) -> ChunkReport {
    ChunkReport {
      addr: 0,
      size,
      in_use,
    }
  }

  fn dump(chunks: Vec<ChunkReport>) -> HeapDump {
    HeapDump {
      segments: vec![SegmentReport {
        addr: 0x1000,
        size: 4096,
        chunks,
      }],
    }
  }

  #[test]
  fn test_display() {
    let dump = dump(vec![chunk(32, true), chunk(4032, false)]);

    assert_eq!(
      dump.to_string(),
      "--------------------\n\
       SEGMENT 0x1000\n\
       \tChunk of size 32\n\
       \tChunk of size 4032 (free)\n\
       --------------------\n"
    );
  }

  #[test]
  fn test_empty_display() {
    assert_eq!(
      HeapDump::default().to_string(),
      "--------------------\n--------------------\n"
    );
  }

  #[test]
  fn test_adjacent_free() {
    assert!(!dump(vec![chunk(32, false), chunk(32, true), chunk(32, false)]).has_adjacent_free());
    assert!(dump(vec![chunk(32, true), chunk(32, false), chunk(32, false)]).has_adjacent_free());
  }

  #[test]
  fn test_counters() {
    let dump = dump(vec![chunk(32, true), chunk(64, false), chunk(48, true)]);

    assert_eq!(dump.chunk_count(), 3);
    assert_eq!(dump.free_chunks().count(), 1);
    assert_eq!(dump.used_bytes(), 80);
  }
}
