use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AllocError {
  #[error("failed to map a segment of {size} bytes")]
  MapFailed {
    size: usize,
    #[source]
    source: io::Error,
  },
  #[error("request of {0} bytes does not fit in a segment")]
  SizeOverflow(usize),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum ConfigError {
  #[error("segment granularity {0} must be a power of two of at least 64 bytes")]
  InvalidGranularity(usize),
}
