//! Query routing: picks the index access path for a filter combination and
//! runs one page of it against the store.
//!
//! | status | due date | path                                              |
//! |--------|----------|---------------------------------------------------|
//! | yes    | yes      | `StatusIndex` on status, filtered by due date     |
//! | yes    | no       | `StatusIndex` on status                           |
//! | no     | yes      | `DueDateIndex` on due date                        |
//! | no     | no       | `CreatedAtIndex` on the partition tag             |
//!
//! Filtered paths return newest first; the unfiltered path returns oldest
//! first.

use tracing::{debug, warn};

use crate::config::ServiceConfig;
use crate::error::Result;
use crate::mapper;
use crate::record::{Record, Status};
use crate::store::{Cursor, Equality, ItemStore, QueryRequest};
use crate::types::{Field, IndexName, PARTITION_TAG};

/// Filters a list request may carry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListFilter {
    pub status: Option<Status>,
    pub due_date: Option<String>,
}

impl ListFilter {
    pub fn status(mut self, status: Status) -> Self {
        self.status = Some(status);
        self
    }

    pub fn due_date(mut self, due_date: impl Into<String>) -> Self {
        self.due_date = Some(due_date.into());
        self
    }
}

/// The physical read a filter combination maps to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessPath {
    StatusAndDueDate { status: Status, due_date: String },
    Status(Status),
    DueDate(String),
    FullScan,
}

impl AccessPath {
    /// Decision table. Adding a filter dimension must extend this match.
    pub fn select(filter: &ListFilter) -> Self {
        match (filter.status, filter.due_date.as_deref()) {
            (Some(status), Some(due_date)) => AccessPath::StatusAndDueDate {
                status,
                due_date: due_date.to_string(),
            },
            (Some(status), None) => AccessPath::Status(status),
            (None, Some(due_date)) => AccessPath::DueDate(due_date.to_string()),
            (None, None) => AccessPath::FullScan,
        }
    }

    pub fn index(&self) -> IndexName {
        match self {
            AccessPath::StatusAndDueDate { .. } | AccessPath::Status(_) => IndexName::Status,
            AccessPath::DueDate(_) => IndexName::DueDate,
            AccessPath::FullScan => IndexName::CreatedAt,
        }
    }

    pub fn partition_value(&self) -> &str {
        match self {
            AccessPath::StatusAndDueDate { status, .. } | AccessPath::Status(status) => {
                status.as_str()
            }
            AccessPath::DueDate(due_date) => due_date,
            AccessPath::FullScan => PARTITION_TAG,
        }
    }

    /// Only the unfiltered listing reads in ascending creation order.
    pub fn scan_forward(&self) -> bool {
        matches!(self, AccessPath::FullScan)
    }

    /// Build the store request for one page starting after `cursor`.
    pub fn request(&self, limit: usize, cursor: Option<Cursor>) -> QueryRequest {
        let request = QueryRequest::new(self.index(), self.partition_value(), limit)
            .scan_forward(self.scan_forward())
            .exclusive_start_key(cursor);
        match self {
            AccessPath::StatusAndDueDate { due_date, .. } => {
                request.filter(Equality::new(Field::DueDate, due_date.as_str()))
            }
            _ => request,
        }
    }

    /// Whether `cursor` can position a read on this path: it must carry
    /// every key component of the index and belong to the same partition.
    pub fn accepts(&self, cursor: &Cursor) -> bool {
        let index = self.index();
        cursor.covers(&index.cursor_fields())
            && cursor.field(index.partition_key()) == Some(self.partition_value())
    }
}

/// One page of records and the cursor the next page starts after.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    pub items: Vec<Record>,
    pub next_cursor: Option<Cursor>,
    /// Whether the read resumed from the supplied cursor. False when no
    /// cursor was given or it was discarded, i.e. this is a first page.
    pub resumed: bool,
}

/// Routes list requests to the store.
pub struct QueryRouter<'a, S: ?Sized> {
    store: &'a S,
    config: &'a ServiceConfig,
}

impl<'a, S: ItemStore + ?Sized> QueryRouter<'a, S> {
    pub fn new(store: &'a S, config: &'a ServiceConfig) -> Self {
        Self { store, config }
    }

    /// Fetch one page for `filter`, resuming after `cursor`.
    ///
    /// A cursor that does not fit the selected path (for instance one issued
    /// under a different filter) is discarded and the read starts over.
    /// Store failures propagate unchanged; nothing is retried here.
    pub fn route(
        &self,
        filter: &ListFilter,
        page_size: i64,
        cursor: Option<Cursor>,
    ) -> Result<Page> {
        let path = AccessPath::select(filter);
        let limit = self.config.page_size(page_size);

        let cursor = cursor.filter(|c| !c.is_empty()).and_then(|c| {
            if path.accepts(&c) {
                Some(c)
            } else {
                warn!(index = %path.index(), "cursor does not match access path, starting over");
                None
            }
        });

        debug!(
            index = %path.index(),
            partition = path.partition_value(),
            limit,
            resumed = cursor.is_some(),
            "routing list query"
        );

        let resumed = cursor.is_some();
        let result = self.store.query(&path.request(limit, cursor))?;
        let items = result
            .items
            .iter()
            .map(mapper::to_record)
            .collect::<Result<Vec<_>>>()?;

        Ok(Page {
            items,
            next_cursor: result.last_evaluated_key.filter(|c| !c.is_empty()),
            resumed,
        })
    }
}
