//! Page-number pagination
//!
//! Out-of-range requests never fail: anything unparsable or below 1 maps to
//! the first page, anything past the end maps to the last page, and an
//! empty result set still has one (empty) page.

use serde::{Deserialize, Serialize};

/// Default number of items per page
pub const DEFAULT_PAGE_SIZE: usize = 10;

/// Splits `count` items into pages of `per_page`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Paginator {
    count: usize,
    per_page: usize,
}

impl Paginator {
    pub fn new(count: usize, per_page: usize) -> Self {
        Self {
            count,
            per_page: per_page.max(1),
        }
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn per_page(&self) -> usize {
        self.per_page
    }

    pub fn num_pages(&self) -> usize {
        self.count.div_ceil(self.per_page).max(1)
    }

    /// Resolve a raw `page` query value to a valid page number
    pub fn resolve(&self, requested: Option<&str>) -> usize {
        let last = self.num_pages();
        let Some(raw) = requested.map(str::trim) else {
            return 1;
        };
        match raw.parse::<i64>() {
            Ok(n) if n < 1 => 1,
            Ok(n) if n as u64 > last as u64 => last,
            Ok(n) => n as usize,
            // A positive number too large for i64 is still past the end
            Err(_) if is_unsigned_number(raw) => last,
            Err(_) => 1,
        }
    }

    /// SQL offset for a resolved page number
    pub fn offset(&self, number: usize) -> usize {
        (number.max(1) - 1) * self.per_page
    }

    /// Assemble a page from the items fetched for `number`
    pub fn page<T>(&self, number: usize, object_list: Vec<T>) -> Page<T> {
        let num_pages = self.num_pages();
        Page {
            number,
            num_pages,
            count: self.count,
            per_page: self.per_page,
            has_next: number < num_pages,
            has_previous: number > 1,
            object_list,
        }
    }
}

fn is_unsigned_number(raw: &str) -> bool {
    let digits = raw.strip_prefix('+').unwrap_or(raw);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}

/// One page of results
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub number: usize,
    pub num_pages: usize,
    /// Total items across all pages
    pub count: usize,
    pub per_page: usize,
    pub has_next: bool,
    pub has_previous: bool,
    pub object_list: Vec<T>,
}

impl<T> Page<T> {
    pub fn len(&self) -> usize {
        self.object_list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.object_list.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.object_list.iter()
    }

    pub fn next_page_number(&self) -> Option<usize> {
        self.has_next.then_some(self.number + 1)
    }

    pub fn previous_page_number(&self) -> Option<usize> {
        self.has_previous.then(|| self.number - 1)
    }
}

impl<'a, T> IntoIterator for &'a Page<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.object_list.iter()
    }
}
