use super::date_filter::DateFilterState;
use super::spec::{Predicate, QuerySpec, RowWindow};
use crate::access::AccessScope;
use crate::error::{Error, Result};
use crate::types::RecordTable;

/// Rows per listing page.
pub const PAGE_SIZE: u64 = 10;

/// Rows `(page-1)*PAGE_SIZE ..= page*PAGE_SIZE-1` for a 1-based page.
pub fn page_window(page: u32) -> Result<RowWindow> {
    if page == 0 {
        return Err(Error::BadRequest("page numbers start at 1".to_string()));
    }
    let from = u64::from(page - 1) * PAGE_SIZE;
    Ok(RowWindow {
        from,
        to: from + PAGE_SIZE - 1,
    })
}

#[must_use]
pub fn total_pages(total: u64) -> u64 {
    total.div_ceil(PAGE_SIZE)
}

/// Adds the business-unit restriction. Only scoped tables are filtered.
pub fn apply_scope(spec: QuerySpec, scope: &AccessScope) -> Result<QuerySpec> {
    match scope {
        AccessScope::Unresolved => Err(Error::ProfileResolution(
            "business unit not resolved; refusing to list rows".to_string(),
        )),
        AccessScope::All => Ok(spec),
        AccessScope::BusinessUnit(_) if !spec.table.is_scoped() => Ok(spec),
        AccessScope::BusinessUnit(unit) => Ok(spec.with(Predicate::Eq {
            column: "business_unit",
            value: unit.clone(),
        })),
    }
}

#[must_use]
pub fn apply_date_filter(mut spec: QuerySpec, filter: &DateFilterState) -> QuerySpec {
    let Some((start, end)) = filter.day_bounds() else {
        return spec;
    };
    let column = spec.table.date_column();
    if let Some(start) = start {
        spec = spec.with(Predicate::Gte {
            column,
            value: start,
        });
    }
    if let Some(end) = end {
        spec = spec.with(Predicate::Lte { column, value: end });
    }
    spec
}

#[must_use]
pub fn apply_search(spec: QuerySpec, search: &str) -> QuerySpec {
    let term = search.trim();
    if term.is_empty() {
        return spec;
    }
    let columns = spec.table.search_columns();
    spec.with(Predicate::AnyILike {
        columns,
        term: term.to_string(),
    })
}

/// Builds the listing query for one page: scope, then date range, then
/// search, newest first.
///
/// Fails with `ProfileResolution` when the scope is unresolved so that no
/// unscoped rows are ever fetched.
pub fn compose_listing(
    table: RecordTable,
    scope: &AccessScope,
    date_filter: &DateFilterState,
    search: &str,
    page: u32,
) -> Result<QuerySpec> {
    let window = page_window(page)?;
    let spec = apply_scope(QuerySpec::new(table), scope)?;
    let spec = apply_date_filter(spec, date_filter);
    let spec = apply_search(spec, search);
    Ok(spec.with_window(window))
}
