//! Page arithmetic for the inline-keyboard lists

/// One page of a list of `total_items`. Pages are zero-based internally and
/// shown one-based to the admin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub page: u32,
    pub page_size: u32,
    pub total_items: u32,
}

impl Page {
    /// Builds a page, clamping `page` into the valid range.
    ///
    /// Buttons can outlive the data they were rendered for (an item deleted on
    /// the last page), so an out-of-range request lands on the last page.
    pub fn clamp(page: u32, total_items: u32, page_size: u32) -> Self {
        let page_size = page_size.max(1);
        let last = Self::pages_for(total_items, page_size) - 1;
        Self {
            page: page.min(last),
            page_size,
            total_items,
        }
    }

    fn pages_for(total_items: u32, page_size: u32) -> u32 {
        total_items.div_ceil(page_size).max(1)
    }

    /// Total number of pages, at least one even for an empty list
    pub fn total_pages(&self) -> u32 {
        Self::pages_for(self.total_items, self.page_size)
    }

    /// SQL OFFSET of the first row on this page
    pub fn offset(&self) -> u32 {
        self.page * self.page_size
    }

    /// SQL LIMIT
    pub fn limit(&self) -> u32 {
        self.page_size
    }

    pub fn has_prev(&self) -> bool {
        self.page > 0
    }

    pub fn has_next(&self) -> bool {
        self.page + 1 < self.total_pages()
    }

    pub fn is_empty(&self) -> bool {
        self.total_items == 0
    }

    /// "2/5"
    pub fn label(&self) -> String {
        format!("{}/{}", self.page + 1, self.total_pages())
    }
}
