use std::mem;

/// Size of one boundary tag: a chunk header or footer.
pub const WORD: usize = mem::size_of::<usize>();

/// Every chunk size, and every pointer handed out, is a multiple of this.
pub const ALIGNMENT: usize = 16;

/// Rounds `value` up to the next multiple of `align`, which must be a power
/// of two.
///
/// # Examples
///
/// ```rust
/// use segalloc::align_to;
///
/// assert_eq!(align_to!(13, 16), 16);
/// assert_eq!(align_to!(4097, 4096), 8192);
/// ```
#[macro_export]
macro_rules! align_to {
  ($value:expr, $align:expr) => {
    ($value + $align - 1) & !($align - 1)
  };
}

/// Rounds `value` up to the chunk alignment.
///
/// # Examples
///
/// ```rust
/// use segalloc::align;
///
/// assert_eq!(align!(0), 0);
/// assert_eq!(align!(4), 16);
/// assert_eq!(align!(400), 400);
/// ```
#[macro_export]
macro_rules! align {
  ($value:expr) => {
    $crate::align_to!($value, $crate::align::ALIGNMENT)
  };
}

/// Overflow-checked variant of [`align_to!`] for sizes that come from callers.
pub fn checked_align_to(
  value: usize,
  align: usize,
) -> Option<usize> {
  debug_assert!(align.is_power_of_two());
  Some(value.checked_add(align - 1)? & !(align - 1))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_align() {
    let mut alignments = Vec::new();

    for i in 0..10 {
      let sizes = (ALIGNMENT * i + 1)..=(ALIGNMENT * (i + 1));

      let expected_alignment = ALIGNMENT * (i + 1);

      alignments.push((sizes, expected_alignment));
    }

    for (sizes, expected) in alignments {
      for size in sizes {
        assert_eq!(expected, align!(size));
      }
    }
  }

  #[test]
  fn test_checked_align_to() {
    assert_eq!(checked_align_to(0, 4096), Some(0));
    assert_eq!(checked_align_to(4000, 4096), Some(4096));
    assert_eq!(checked_align_to(usize::MAX - 3, 16), None);
    assert_eq!(checked_align_to(usize::MAX - 15, 16), Some(usize::MAX - 15));
  }
}
