//! Listing queries as plain values.
//!
//! A [`QuerySpec`] is an ordered list of predicates plus ordering and a row
//! window. It is built by pure functions in [`compose`] and interpreted once by
//! the store, so composition order can be tested without a database.

pub mod compose;
pub mod date_filter;
mod spec;

pub use compose::{PAGE_SIZE, compose_listing, page_window, total_pages};
pub use date_filter::{DateFilterState, date_filter_summary, format_query_date};
pub use spec::{Order, Predicate, QuerySpec, RowWindow};
