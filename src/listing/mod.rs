//! Running listing queries and tracking page-by-page loading.

mod pager;

pub use pager::{PageTicket, Pager, PagerPhase};

use serde::Serialize;
use tracing::debug;

use crate::access::AccessScope;
use crate::error::{Error, Result};
use crate::query::{DateFilterState, compose_listing, total_pages};
use crate::store::Store;
use crate::types::{Record, RecordTable};

/// One page of a listing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordPage {
    pub records: Vec<Record>,
    /// Rows matching scope, date range and search, across all pages.
    pub total: u64,
    pub page: u32,
    pub total_pages: u64,
}

/// Table, date range and search term of a listing screen. The page is
/// supplied per fetch.
#[derive(Debug, Clone)]
pub struct ListingQuery {
    pub table: RecordTable,
    pub date_filter: DateFilterState,
    pub search: String,
}

impl ListingQuery {
    #[must_use]
    pub fn new(table: RecordTable) -> Self {
        Self {
            table,
            date_filter: DateFilterState::inactive(),
            search: String::new(),
        }
    }

    #[must_use]
    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        self.search = search.into();
        self
    }

    #[must_use]
    pub fn with_date_filter(mut self, date_filter: DateFilterState) -> Self {
        self.date_filter = date_filter;
        self
    }

    pub fn fetch(&self, store: &dyn Store, scope: &AccessScope, page: u32) -> Result<RecordPage> {
        list_records(
            store,
            self.table,
            scope,
            &self.date_filter,
            &self.search,
            page,
        )
    }

    /// Fetches the page named by `ticket` and hands the outcome to `pager`.
    /// Returns whether the pager accepted it.
    pub fn fetch_into(
        &self,
        store: &dyn Store,
        scope: &AccessScope,
        pager: &mut Pager<Record>,
        ticket: PageTicket,
    ) -> bool {
        match self.fetch(store, scope, ticket.page()) {
            Ok(page) => pager.complete(ticket, page.records, page.total),
            Err(e) => pager.fail(ticket, e.user_message()),
        }
    }
}

/// Fetches one page of `table` visible under `scope`.
pub fn list_records(
    store: &dyn Store,
    table: RecordTable,
    scope: &AccessScope,
    date_filter: &DateFilterState,
    search: &str,
    page: u32,
) -> Result<RecordPage> {
    let spec = compose_listing(table, scope, date_filter, search, page)?;
    let rows = store.select_records(&spec)?;
    debug!(
        "Listed {} of {} rows from {} (page {page})",
        rows.rows.len(),
        rows.total,
        table
    );

    Ok(RecordPage {
        total_pages: total_pages(rows.total),
        records: rows.rows,
        total: rows.total,
        page,
    })
}

/// Loads one record, hiding rows outside the caller's scope as `NotFound`.
pub fn get_visible_record(
    store: &dyn Store,
    table: RecordTable,
    id: &str,
    scope: &AccessScope,
) -> Result<Record> {
    if !scope.is_resolved() {
        return Err(Error::ProfileResolution(
            "business unit not resolved; refusing to read rows".to_string(),
        ));
    }

    let record = store.get_record(table, id)?.ok_or(Error::NotFound)?;
    if table.is_scoped() && !scope.permits(record.meta.business_unit.as_deref()) {
        return Err(Error::NotFound);
    }
    Ok(record)
}
