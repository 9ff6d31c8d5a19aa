use serde::Serialize;

use crate::query::total_pages;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PagerPhase {
    Idle,
    Loading,
    Loaded,
}

/// Handle for one in-flight page request.
///
/// A ticket is only honoured by the pager that issued it, and only until the
/// next reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageTicket {
    generation: u64,
    page: u32,
}

impl PageTicket {
    #[must_use]
    pub fn page(&self) -> u32 {
        self.page
    }
}

/// Accumulates pages of a listing for "load more" style scrolling.
///
/// Page 1 replaces whatever was shown, later pages append. Any response for a
/// ticket issued before the last [`Pager::reset`] is dropped.
#[derive(Debug, Clone)]
pub struct Pager<T> {
    phase: PagerPhase,
    /// Highest page applied to `items`, 0 when nothing is loaded.
    loaded_page: u32,
    requested_page: u32,
    items: Vec<T>,
    total: u64,
    generation: u64,
    error: Option<String>,
}

impl<T> Default for Pager<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Pager<T> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            phase: PagerPhase::Idle,
            loaded_page: 0,
            requested_page: 1,
            items: Vec::new(),
            total: 0,
            generation: 0,
            error: None,
        }
    }

    /// Back to page 1 with nothing loaded. Outstanding tickets become stale.
    pub fn reset(&mut self) {
        self.generation += 1;
        self.phase = PagerPhase::Idle;
        self.loaded_page = 0;
        self.requested_page = 1;
        self.items.clear();
        self.total = 0;
        self.error = None;
    }

    /// Resets and requests page 1. Used on mount and whenever the table,
    /// search term or date range changes.
    pub fn start(&mut self) -> PageTicket {
        self.reset();
        self.phase = PagerPhase::Loading;
        self.ticket()
    }

    /// Requests the next page, or `None` when not loaded or already at the
    /// last page. The state is unchanged on `None`.
    pub fn load_more(&mut self) -> Option<PageTicket> {
        if self.phase != PagerPhase::Loaded || !self.has_more() {
            return None;
        }
        self.phase = PagerPhase::Loading;
        self.requested_page = self.loaded_page + 1;
        Some(self.ticket())
    }

    /// Applies a fetched page. Returns `false` if the ticket is stale.
    pub fn complete(&mut self, ticket: PageTicket, items: Vec<T>, total: u64) -> bool {
        if !self.accepts(ticket) {
            return false;
        }
        if ticket.page == 1 {
            self.items = items;
        } else {
            self.items.extend(items);
        }
        self.total = total;
        self.loaded_page = ticket.page;
        self.phase = PagerPhase::Loaded;
        self.error = None;
        true
    }

    /// Records a failed fetch and returns to the previous state. Returns
    /// `false` if the ticket is stale.
    pub fn fail(&mut self, ticket: PageTicket, message: impl Into<String>) -> bool {
        if !self.accepts(ticket) {
            return false;
        }
        self.phase = if self.loaded_page == 0 {
            PagerPhase::Idle
        } else {
            PagerPhase::Loaded
        };
        self.requested_page = self.loaded_page.max(1);
        self.error = Some(message.into());
        true
    }

    #[must_use]
    pub fn phase(&self) -> PagerPhase {
        self.phase
    }

    /// Page currently loading, or the last page loaded.
    #[must_use]
    pub fn page(&self) -> u32 {
        match self.phase {
            PagerPhase::Loading => self.requested_page,
            PagerPhase::Idle | PagerPhase::Loaded => self.loaded_page.max(1),
        }
    }

    #[must_use]
    pub fn items(&self) -> &[T] {
        &self.items
    }

    #[must_use]
    pub fn total(&self) -> u64 {
        self.total
    }

    #[must_use]
    pub fn total_pages(&self) -> u64 {
        total_pages(self.total)
    }

    #[must_use]
    pub fn has_more(&self) -> bool {
        self.loaded_page > 0 && u64::from(self.loaded_page) < self.total_pages()
    }

    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.phase == PagerPhase::Loading
    }

    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    fn ticket(&self) -> PageTicket {
        PageTicket {
            generation: self.generation,
            page: self.requested_page,
        }
    }

    fn accepts(&self, ticket: PageTicket) -> bool {
        self.phase == PagerPhase::Loading
            && ticket.generation == self.generation
            && ticket.page == self.requested_page
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows(range: std::ops::Range<u32>) -> Vec<u32> {
        range.collect()
    }

    #[test]
    fn test_pages_append_until_exhausted() {
        let mut pager = Pager::new();
        assert_eq!(pager.phase(), PagerPhase::Idle);
        assert_eq!(pager.page(), 1);

        let ticket = pager.start();
        assert_eq!(ticket.page(), 1);
        assert!(pager.complete(ticket, rows(0..10), 25));
        assert_eq!(pager.total_pages(), 3);

        let ticket = pager.load_more().unwrap();
        assert_eq!(ticket.page(), 2);
        assert!(pager.is_loading());
        assert!(pager.complete(ticket, rows(10..20), 25));

        let ticket = pager.load_more().unwrap();
        assert!(pager.complete(ticket, rows(20..25), 25));
        assert_eq!(pager.items().len(), 25);
        assert_eq!(pager.page(), 3);

        assert!(pager.load_more().is_none());
        assert_eq!(pager.phase(), PagerPhase::Loaded);
        assert_eq!(pager.page(), 3);
    }

    #[test]
    fn test_load_more_while_loading_is_ignored() {
        let mut pager: Pager<u32> = Pager::new();
        assert!(pager.load_more().is_none());
        pager.start();
        assert!(pager.load_more().is_none());
    }

    #[test]
    fn test_reset_drops_in_flight_response() {
        let mut pager = Pager::new();
        let first = pager.start();
        pager.complete(first, rows(0..10), 30);
        let stale = pager.load_more().unwrap();

        // Search changed while page 2 was in flight.
        let fresh = pager.start();
        assert!(!pager.complete(stale, rows(10..20), 30));
        assert!(pager.items().is_empty());

        assert!(pager.complete(fresh, rows(100..103), 3));
        assert_eq!(pager.items(), &[100, 101, 102]);
        assert!(!pager.has_more());
    }

    #[test]
    fn test_fail_keeps_loaded_items() {
        let mut pager = Pager::new();
        let ticket = pager.start();
        pager.complete(ticket, rows(0..10), 15);

        let ticket = pager.load_more().unwrap();
        assert!(pager.fail(ticket, "database is locked"));
        assert_eq!(pager.phase(), PagerPhase::Loaded);
        assert_eq!(pager.items().len(), 10);
        assert_eq!(pager.error(), Some("database is locked"));

        let retry = pager.load_more().unwrap();
        assert_eq!(retry.page(), 2);
    }

    #[test]
    fn test_fail_on_first_page_returns_to_idle() {
        let mut pager: Pager<u32> = Pager::new();
        let ticket = pager.start();
        pager.fail(ticket, "offline");
        assert_eq!(pager.phase(), PagerPhase::Idle);
        assert_eq!(pager.page(), 1);
        assert!(pager.load_more().is_none());
    }
}
