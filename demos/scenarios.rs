use std::{io::Read, ptr::NonNull};

use segalloc::Heap;

/// Waits until the user presses ENTER, when running with `--step`.
/// Useful to inspect the mappings with `pmap` between calls.
fn pause(step: bool) {
  if step {
    eprintln!("\n>>> Press ENTER to continue...");
    let _ = std::io::stdin().bytes().next();
  }
}

fn allocate(
  heap: &mut Heap,
  size: usize,
  step: bool,
) -> NonNull<u8> {
  let ptr = heap.allocate(size).expect("allocation failed");
  eprintln!("allocate({size}) = {ptr:p}");
  eprint!("{}", heap.dump());
  pause(step);
  ptr
}

fn free(
  heap: &mut Heap,
  ptr: NonNull<u8>,
  step: bool,
) {
  unsafe { heap.free(ptr.as_ptr()) };
  eprintln!("free({ptr:p})");
  eprint!("{}", heap.dump());
  pause(step);
}

/// Four requests, the last one too big for the first segment.
fn alloc_test(step: bool) {
  let mut heap = Heap::new();

  allocate(&mut heap, size_of::<[i32; 100]>(), step);
  allocate(&mut heap, size_of::<[i32; 900]>(), step);
  allocate(&mut heap, size_of::<i32>(), step);
  allocate(&mut heap, size_of::<[i32; 10000]>(), step);

  eprintln!("segments: {}", heap.segment_count());
}

/// Three small chunks freed middle, last, first: the segment goes away.
fn free_test(step: bool) {
  let mut heap = Heap::new();

  let x = allocate(&mut heap, size_of::<i32>(), step);
  let y = allocate(&mut heap, size_of::<i32>(), step);
  let z = allocate(&mut heap, size_of::<i32>(), step);

  free(&mut heap, y, step);
  free(&mut heap, z, step);
  free(&mut heap, x, step);

  eprintln!("segments: {}", heap.segment_count());
}

/// Doubles a 16 byte allocation up to 1 MiB.
fn realloc_test(step: bool) {
  let mut heap = Heap::new();

  let mut ptr = allocate(&mut heap, 16, step);
  unsafe { ptr.as_ptr().write_bytes(0xAB, 16) };

  let mut size = 16;
  while size < 1 << 20 {
    size *= 2;
    ptr = unsafe { heap.reallocate(ptr.as_ptr(), size) }.expect("reallocation failed");

    let intact = unsafe { std::slice::from_raw_parts(ptr.as_ptr(), 16) }
      .iter()
      .all(|b| *b == 0xAB);
    eprintln!("reallocate({size}) = {ptr:p}, prefix intact: {intact}");
  }

  eprint!("{}", heap.dump());
  free(&mut heap, ptr, step);
}

fn main() {
  let step = std::env::args().any(|arg| arg == "--step");

  eprintln!("== free test");
  free_test(step);

  eprintln!("\n== alloc test");
  alloc_test(step);

  eprintln!("\n== realloc test");
  realloc_test(step);
}
