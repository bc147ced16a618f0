use crate::{align::checked_align_to, error::ConfigError};

const FALLBACK_PAGE_SIZE: usize = 4096;

/// Queries the OS page size.
pub fn page_size() -> usize {
  let size = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };

  if size > 0 {
    size as usize
  } else {
    FALLBACK_PAGE_SIZE
  }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Granularity {
  Page,
  Bytes(usize),
}

/// Tuning for a [`Heap`](crate::Heap).
///
/// Segment lengths are rounded up to a multiple of the granularity, which
/// defaults to the OS page size. A coarser granularity means fewer, larger
/// mappings; the extra room becomes a free chunk.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HeapConfig {
  granularity: Granularity,
}

impl HeapConfig {
  pub const MIN_GRANULARITY: usize = 64;

  pub const fn new() -> Self {
    Self {
      granularity: Granularity::Page,
    }
  }

  pub fn with_granularity(granularity: usize) -> Result<Self, ConfigError> {
    if !granularity.is_power_of_two() || granularity < Self::MIN_GRANULARITY {
      return Err(ConfigError::InvalidGranularity(granularity));
    }

    Ok(Self {
      granularity: Granularity::Bytes(granularity),
    })
  }

  pub fn granularity(&self) -> usize {
    match self.granularity {
      Granularity::Page => page_size(),
      Granularity::Bytes(bytes) => bytes,
    }
  }

  /// Length of a segment able to hold `bytes`.
  pub(crate) fn segment_len(
    &self,
    bytes: usize,
  ) -> Option<usize> {
    checked_align_to(bytes, self.granularity())
  }
}

impl Default for HeapConfig {
  fn default() -> Self {
    Self::new()
  }
}
