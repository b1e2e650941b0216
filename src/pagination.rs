//! Fixed-size, 1-indexed pages over an ordered collection.
//!
//! Requested page numbers never fail: a missing or non-numeric number means
//! the first page, anything below 1 clamps to the first page and anything past
//! the end clamps to the last one. An empty collection still has one page.

use serde::Deserialize;

/// How many page links to show either side of the current one
const LINK_WINDOW: usize = 2;

/// `?page=N` query string, kept raw so bad input can fall back to page 1
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<String>,
}

impl PageQuery {
    pub fn requested(&self) -> Option<&str> {
        self.page.as_deref()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Paginator {
    total: usize,
    per_page: usize,
}

impl Paginator {
    pub fn new(total: usize, per_page: usize) -> Self {
        Self {
            total,
            per_page: per_page.max(1),
        }
    }

    pub fn num_pages(&self) -> usize {
        if self.total == 0 {
            1
        } else {
            self.total.div_ceil(self.per_page)
        }
    }

    /// Turn whatever the client sent into a valid page number
    pub fn resolve(&self, requested: Option<&str>) -> usize {
        let last = self.num_pages();
        let Some(raw) = requested.map(str::trim) else {
            return 1;
        };
        match raw.parse::<i64>() {
            Ok(n) => n.clamp(1, last as i64) as usize,
            // Integers too wide for i64 are still out of range on one side
            Err(_) => match raw.strip_prefix('+').unwrap_or(raw) {
                digits if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) => last,
                _ => 1,
            },
        }
    }

    pub fn offset(&self, number: usize) -> usize {
        (number.saturating_sub(1)) * self.per_page
    }

    /// Resolve `requested` and load that slice through `fetch(limit, offset)`
    pub fn page<T, E>(
        &self,
        requested: Option<&str>,
        fetch: impl FnOnce(usize, usize) -> Result<Vec<T>, E>,
    ) -> Result<Page<T>, E> {
        let number = self.resolve(requested);
        let items = fetch(self.per_page, self.offset(number))?;
        Ok(Page {
            items,
            number,
            num_pages: self.num_pages(),
            total: self.total,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageLink {
    pub number: usize,
    pub current: bool,
}

#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub number: usize,
    pub num_pages: usize,
    pub total: usize,
}

impl<T> Page<T> {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn has_previous(&self) -> bool {
        self.number > 1
    }

    pub fn has_next(&self) -> bool {
        self.number < self.num_pages
    }

    pub fn has_other_pages(&self) -> bool {
        self.num_pages > 1
    }

    pub fn previous_page_number(&self) -> usize {
        self.number.saturating_sub(1).max(1)
    }

    pub fn next_page_number(&self) -> usize {
        (self.number + 1).min(self.num_pages)
    }

    pub fn links(&self) -> Vec<PageLink> {
        let start = self.number.saturating_sub(LINK_WINDOW).max(1);
        let end = (self.number + LINK_WINDOW).min(self.num_pages);
        (start..=end)
            .map(|number| PageLink {
                number,
                current: number == self.number,
            })
            .collect()
    }
}
