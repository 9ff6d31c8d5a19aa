use serde::Serialize;

use crate::types::RecordTable;

/// A single row condition. Column names come from [`RecordTable`] metadata,
/// never from user input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Predicate {
    /// Exact, case-sensitive equality.
    Eq { column: &'static str, value: String },
    Gte { column: &'static str, value: String },
    Lte { column: &'static str, value: String },
    /// At least one column contains `term`, ignoring case.
    AnyILike {
        columns: &'static [&'static str],
        term: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Order {
    pub column: &'static str,
    pub descending: bool,
}

impl Order {
    #[must_use]
    pub const fn newest_first() -> Self {
        Self {
            column: "created_at",
            descending: true,
        }
    }
}

/// Inclusive row window `from..=to`, zero based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RowWindow {
    pub from: u64,
    pub to: u64,
}

impl RowWindow {
    #[must_use]
    pub const fn offset(self) -> u64 {
        self.from
    }

    #[must_use]
    pub const fn limit(self) -> u64 {
        self.to - self.from + 1
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuerySpec {
    pub table: RecordTable,
    pub predicates: Vec<Predicate>,
    pub order: Order,
    /// `None` selects every matching row.
    pub window: Option<RowWindow>,
}

impl QuerySpec {
    #[must_use]
    pub fn new(table: RecordTable) -> Self {
        Self {
            table,
            predicates: Vec::new(),
            order: Order::newest_first(),
            window: None,
        }
    }

    #[must_use]
    pub fn with(mut self, predicate: Predicate) -> Self {
        self.predicates.push(predicate);
        self
    }

    #[must_use]
    pub fn with_window(mut self, window: RowWindow) -> Self {
        self.window = Some(window);
        self
    }
}
