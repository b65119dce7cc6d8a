//! In-memory page windowing over already-ordered derived sequences.
//!
//! Grouping and filtering change how many rows a view has, so totals are
//! always taken from the materialised sequence, never from the store.

use serde::{Deserialize, Serialize};

/// A 0-indexed page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
  pub page: usize,
  pub size: usize,
}

impl PageRequest {
  pub fn new(page: usize, size: usize) -> Self { Self { page, size } }

  /// Index of the first element on this page.
  pub fn start_index(&self) -> usize { self.page.saturating_mul(self.size) }
}

/// One window of a derived sequence plus the sequence's full length.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
  pub items:          Vec<T>,
  pub total_elements: usize,
  pub total_pages:    usize,
  pub page:           usize,
  pub size:           usize,
}

impl<T> Page<T> {
  /// Slice `items` to the requested window.
  ///
  /// A window starting at or past the end is empty but still reports the
  /// full `total_elements`.
  pub fn window(items: Vec<T>, request: PageRequest) -> Self {
    let total_elements = items.len();
    let start = request.start_index();

    let items = if start >= total_elements {
      Vec::new()
    } else {
      let end = start.saturating_add(request.size).min(total_elements);
      items.into_iter().skip(start).take(end - start).collect()
    };

    Self {
      items,
      total_elements,
      total_pages: total_pages(total_elements, request.size),
      page: request.page,
      size: request.size,
    }
  }

  pub fn empty(request: PageRequest) -> Self {
    Self::window(Vec::new(), request)
  }

  pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
    Page {
      items:          self.items.into_iter().map(f).collect(),
      total_elements: self.total_elements,
      total_pages:    self.total_pages,
      page:           self.page,
      size:           self.size,
    }
  }
}

fn total_pages(total_elements: usize, size: usize) -> usize {
  if size == 0 {
    return 0;
  }
  total_elements.div_ceil(size)
}
