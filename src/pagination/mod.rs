use serde::Serialize;

/// Requested page of a row list. Pages are 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pager {
    pub rows_per_page: usize,
    pub page: usize,
}

/// Concrete slice bounds for one page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageWindow {
    pub page: usize,
    pub total_pages: usize,
    pub start: usize,
    pub end: usize,
    pub total_rows: usize,
}

impl Pager {
    pub fn new(rows_per_page: usize) -> Self {
        Self {
            rows_per_page: rows_per_page.max(1),
            page: 1,
        }
    }

    pub fn at_page(mut self, page: usize) -> Self {
        self.page = page;
        self
    }

    /// Slice bounds for `total_rows`, with the requested page clamped into range.
    pub fn window(&self, total_rows: usize) -> PageWindow {
        let total_pages = total_rows.div_ceil(self.rows_per_page);
        let page = self.page.clamp(1, total_pages.max(1));
        let start = ((page - 1) * self.rows_per_page).min(total_rows);
        let end = (start + self.rows_per_page).min(total_rows);

        PageWindow {
            page,
            total_pages,
            start,
            end,
            total_rows,
        }
    }

    pub fn next(&mut self, total_rows: usize) {
        let window = self.window(total_rows);
        if window.has_next() {
            self.page = window.page + 1;
        }
    }

    pub fn previous(&mut self, total_rows: usize) {
        let window = self.window(total_rows);
        if window.has_previous() {
            self.page = window.page - 1;
        }
    }

    pub fn reset(&mut self) {
        self.page = 1;
    }
}

impl PageWindow {
    pub fn has_previous(&self) -> bool {
        self.page > 1
    }

    pub fn has_next(&self) -> bool {
        self.page < self.total_pages
    }

    pub fn slice<'s, T>(&self, rows: &'s [T]) -> &'s [T] {
        &rows[self.start.min(rows.len())..self.end.min(rows.len())]
    }

    /// Footer text, e.g. `Showing 26-50 of 120 records | Page 2 of 5`.
    pub fn summary(&self) -> String {
        if self.total_rows == 0 {
            return "No records match the current selection".to_string();
        }
        format!(
            "Showing {}-{} of {} records | Page {} of {}",
            self.start + 1,
            self.end,
            self.total_rows,
            self.page,
            self.total_pages
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_bounds() {
        let window = Pager::new(25).at_page(2).window(60);
        assert_eq!(window.total_pages, 3);
        assert_eq!((window.start, window.end), (25, 50));
        assert_eq!(window.summary(), "Showing 26-50 of 60 records | Page 2 of 3");
        assert!(window.has_previous() && window.has_next());
    }

    #[test]
    fn test_last_page_is_partial_and_clamped() {
        let window = Pager::new(25).at_page(9).window(60);
        assert_eq!(window.page, 3);
        assert_eq!((window.start, window.end), (50, 60));
        assert!(!window.has_next());
    }

    #[test]
    fn test_empty_rows() {
        let window = Pager::new(10).at_page(4).window(0);
        assert_eq!(window.total_pages, 0);
        assert_eq!(window.page, 1);
        assert_eq!((window.start, window.end), (0, 0));
        assert!(!window.has_next() && !window.has_previous());
        assert_eq!(window.summary(), "No records match the current selection");
    }

    #[test]
    fn test_navigation_stops_at_edges() {
        let mut pager = Pager::new(10);
        pager.previous(25);
        assert_eq!(pager.page, 1);
        pager.next(25);
        pager.next(25);
        pager.next(25);
        assert_eq!(pager.page, 3);
        pager.reset();
        assert_eq!(pager.page, 1);
    }

    #[test]
    fn test_slice() {
        let rows: Vec<usize> = (0..12).collect();
        let window = Pager::new(5).at_page(3).window(rows.len());
        assert_eq!(window.slice(&rows), &[10, 11]);
    }
}
