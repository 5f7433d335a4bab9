//! Record service: CRUD plus paginated, filterable listing with
//! previous-page links.
//!
//! A list call runs the pipeline router -> store -> mapper -> token codec ->
//! token stack. All navigation state arrives with the request and leaves with
//! the response, so one service can be shared by any number of callers.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::ServiceConfig;
use crate::error::{Error, Result};
use crate::mapper;
use crate::pagination::TokenStack;
use crate::pagination::cursor;
use crate::record::{NewRecord, Record, RecordUpdate, Status};
use crate::router::{ListFilter, QueryRouter};
use crate::store::{ItemStore, ScanRequest};

/// Source of the current time for creation and update stamps.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A list request as supplied by an outer layer. Blank strings count as
/// absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListRequest {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub due_date: Option<String>,
    #[serde(default)]
    pub page_size: i64,
    /// Token of the page being requested; absent or empty for the first page.
    #[serde(default)]
    pub page_token: Option<String>,
    /// Stack text returned with the page the caller navigated from.
    #[serde(default)]
    pub token_stack: Option<String>,
}

/// One rendered page plus everything needed to navigate from it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListPage {
    pub items: Vec<Record>,
    /// Request this token (with `token_stack`) for the next page.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_page_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_stack: Option<String>,
    /// `None`: no previous page. `Some("")`: previous page is the first page.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_page_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_token_stack: Option<String>,
}

/// Record operations over an [`ItemStore`].
pub struct TodoService<S> {
    store: S,
    config: ServiceConfig,
    clock: Arc<dyn Clock>,
}

impl<S: ItemStore> TodoService<S> {
    pub fn new(store: S) -> Self {
        Self::with_config(store, ServiceConfig::default())
    }

    pub fn with_config(store: S, config: ServiceConfig) -> Self {
        Self {
            store,
            config,
            clock: Arc::new(SystemClock),
        }
    }

    /// Replace the clock used for timestamps.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// Create a pending record and return it as stored.
    pub fn create(&self, new: NewRecord) -> Result<Record> {
        let title = required_text("title", &new.title)?;
        let due_date = required_text("dueDate", &new.due_date)?;

        let record = Record {
            id: Uuid::new_v4().to_string(),
            title,
            description: new.description,
            due_date,
            status: Status::Pending,
            created_at: self.clock.now(),
            updated_at: None,
        };
        self.store.put(mapper::from_record(&record))?;
        info!(id = %record.id, "record created");
        Ok(record)
    }

    pub fn get(&self, id: &str) -> Result<Record> {
        match self.store.get(id)? {
            Some(item) => mapper::to_record(&item),
            None => Err(Error::NotFound(id.to_string())),
        }
    }

    /// Apply a partial update. `updatedAt` is refreshed even when `update`
    /// changes nothing; `createdAt` is never touched.
    pub fn update(&self, id: &str, update: RecordUpdate) -> Result<Record> {
        let mut record = self.get(id)?;

        if let Some(title) = update.title {
            record.title = required_text("title", &title)?;
        }
        if let Some(description) = update.description {
            record.description = description;
        }
        if let Some(due_date) = update.due_date {
            record.due_date = required_text("dueDate", &due_date)?;
        }
        if let Some(status) = update.status {
            record.status = status;
        }
        mapper::touch(&mut record, self.clock.now());

        self.store.put(mapper::from_record(&record))?;
        info!(id, status = %record.status, "record updated");
        Ok(record)
    }

    pub fn update_status(&self, id: &str, status: Status) -> Result<Record> {
        self.update(id, RecordUpdate::status(status))
    }

    /// Delete a record. Deleting an absent id succeeds.
    pub fn delete(&self, id: &str) -> Result<()> {
        self.store.delete(id)?;
        info!(id, "record deleted");
        Ok(())
    }

    /// List one page and derive its navigation links.
    pub fn list(&self, request: &ListRequest) -> Result<ListPage> {
        let filter = parse_filter(request.status.as_deref(), request.due_date.as_deref())?;
        let incoming = cursor::decode(request.page_token.as_deref());

        let page = QueryRouter::new(&self.store, &self.config).route(
            &filter,
            request.page_size,
            Some(incoming),
        )?;

        // The stack records the token that led into this page. A token the
        // router did not resume from (corrupt, or issued under another
        // filter) served the first page and is not recorded.
        let mut stack = TokenStack::parse(request.token_stack.as_deref());
        if page.resumed {
            stack.push(request.page_token.as_deref());
        }

        let (previous_page_token, previous_token_stack) = stack.previous().into_parts();
        debug!(
            items = page.items.len(),
            depth = stack.len(),
            has_next = page.next_cursor.is_some(),
            "list page"
        );

        Ok(ListPage {
            items: page.items,
            next_page_token: cursor::encode_opt(page.next_cursor.as_ref()),
            token_stack: stack.to_text(),
            previous_page_token,
            previous_token_stack,
        })
    }

    /// Every record in primary key order, read page by page.
    ///
    /// Used for exports; unlike [`TodoService::list`] it reads the table
    /// itself rather than an index, so records missing index attributes are
    /// included.
    pub fn export(&self) -> Result<Vec<Record>> {
        let mut records = Vec::new();
        let mut start = None;
        loop {
            let result = self.store.scan(&ScanRequest {
                limit: self.config.max_page_size.max(1),
                exclusive_start_key: start,
            })?;
            for item in &result.items {
                records.push(mapper::to_record(item)?);
            }
            match result.last_evaluated_key {
                Some(next) => start = Some(next),
                None => return Ok(records),
            }
        }
    }
}

/// Parse a caller-supplied status filter. Blank means no filter.
pub fn parse_status(raw: Option<&str>) -> Result<Option<Status>> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(s) => s
            .parse()
            .map(Some)
            .map_err(|e| Error::Validation(format!("{e}"))),
    }
}

fn parse_filter(status: Option<&str>, due_date: Option<&str>) -> Result<ListFilter> {
    Ok(ListFilter {
        status: parse_status(status)?,
        due_date: due_date
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .map(str::to_string),
    })
}

fn required_text(name: &str, value: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(Error::Validation(format!("{name} must not be empty")));
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use crate::store::{Item, MemoryStore, QueryRequest, QueryResult};
    use chrono::{Duration, TimeZone};
    use parking_lot::Mutex;
    use serde_json::json;

    /// Advances one second per reading.
    struct StepClock {
        next: Mutex<DateTime<Utc>>,
    }

    impl StepClock {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                next: Mutex::new(Utc.with_ymd_and_hms(2025, 1, 1, 9, 0, 0).unwrap()),
            })
        }
    }

    impl Clock for StepClock {
        fn now(&self) -> DateTime<Utc> {
            let mut next = self.next.lock();
            let now = *next;
            *next = now + Duration::seconds(1);
            now
        }
    }

    /// A clock stuck at one instant.
    struct FrozenClock(DateTime<Utc>);

    impl Clock for FrozenClock {
        fn now(&self) -> DateTime<Utc> {
            self.0
        }
    }

    fn service() -> TodoService<MemoryStore> {
        TodoService::new(MemoryStore::new()).with_clock(StepClock::new())
    }

    fn new_record(title: &str, due: &str) -> NewRecord {
        NewRecord {
            title: title.to_string(),
            description: format!("about {title}"),
            due_date: due.to_string(),
        }
    }

    fn titles(page: &ListPage) -> Vec<&str> {
        page.items.iter().map(|r| r.title.as_str()).collect()
    }

    fn request(page_size: i64) -> ListRequest {
        ListRequest {
            page_size,
            ..ListRequest::default()
        }
    }

    #[test]
    fn test_create_assigns_identity_and_defaults() {
        let svc = service();
        let record = svc.create(new_record("A", "2025-03-01")).unwrap();
        assert!(Uuid::parse_str(&record.id).is_ok());
        assert_eq!(record.status, Status::Pending);
        assert_eq!(record.updated_at, None);

        let stored = svc.store().get(&record.id).unwrap().unwrap();
        assert_eq!(stored["sortKey"], "TODOS");
        assert_eq!(svc.get(&record.id).unwrap(), record);
    }

    #[test]
    fn test_create_rejects_blank_title() {
        let svc = service();
        let err = svc.create(new_record("   ", "2025-03-01")).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert!(svc.store().is_empty());
    }

    #[test]
    fn test_get_missing_is_not_found() {
        let svc = service();
        let err = svc.get("nope").unwrap_err();
        assert!(matches!(err, Error::NotFound(ref id) if id == "nope"));
        assert!(err.is_item_unavailable());
    }

    #[test]
    fn test_end_to_end_pagination_scenario() {
        let svc = service();
        for title in ["A", "B", "C"] {
            svc.create(new_record(title, "2025-03-01")).unwrap();
        }

        // First page: no cursor, no stack, no previous link.
        let page1 = svc.list(&request(2)).unwrap();
        assert_eq!(titles(&page1), vec!["A", "B"]);
        let t1 = page1.next_page_token.clone().unwrap();
        assert_eq!(page1.token_stack, None);
        assert_eq!(page1.previous_page_token, None);
        assert_eq!(page1.previous_token_stack, None);

        // Second page via t1.
        let page2 = svc
            .list(&ListRequest {
                page_token: Some(t1.clone()),
                token_stack: page1.token_stack.clone(),
                ..request(2)
            })
            .unwrap();
        assert_eq!(titles(&page2), vec!["C"]);
        assert_eq!(page2.next_page_token, None);
        assert_eq!(page2.token_stack.as_deref(), Some(t1.as_str()));
        assert_eq!(page2.previous_page_token.as_deref(), Some(""));
        assert_eq!(page2.previous_token_stack, None);

        // Following the previous link lands back on page one.
        let back = svc
            .list(&ListRequest {
                page_token: page2.previous_page_token.clone(),
                token_stack: page2.previous_token_stack.clone(),
                ..request(2)
            })
            .unwrap();
        assert_eq!(back, page1);
    }

    #[test]
    fn test_previous_links_across_several_pages() {
        let svc = service();
        for n in 0..7 {
            svc.create(new_record(&format!("T{n}"), "2025-03-01")).unwrap();
        }

        // Walk forward to the last page, remembering every response.
        let mut pages = vec![svc.list(&request(2)).unwrap()];
        while let Some(token) = pages.last().unwrap().next_page_token.clone() {
            let prev = pages.last().unwrap();
            let next = svc
                .list(&ListRequest {
                    page_token: Some(token),
                    token_stack: prev.token_stack.clone(),
                    ..request(2)
                })
                .unwrap();
            pages.push(next);
        }
        assert_eq!(pages.len(), 4);
        assert_eq!(titles(&pages[3]), vec!["T6"]);

        // From each page, the previous link reproduces the page before it.
        for i in 1..pages.len() {
            let back = svc
                .list(&ListRequest {
                    page_token: pages[i].previous_page_token.clone(),
                    token_stack: pages[i].previous_token_stack.clone(),
                    ..request(2)
                })
                .unwrap();
            assert_eq!(back, pages[i - 1], "previous of page {i}");
        }
    }

    #[test]
    fn test_filtered_listing_is_newest_first() {
        let svc = service();
        let a = svc.create(new_record("A", "2025-03-01")).unwrap();
        svc.create(new_record("B", "2025-04-01")).unwrap();
        let c = svc.create(new_record("C", "2025-03-01")).unwrap();
        svc.update_status(&a.id, Status::Ongoing).unwrap();
        svc.update_status(&c.id, Status::Ongoing).unwrap();

        let by_status = svc
            .list(&ListRequest {
                status: Some("ONGOING".into()),
                ..request(10)
            })
            .unwrap();
        assert_eq!(titles(&by_status), vec!["C", "A"]);

        let by_due = svc
            .list(&ListRequest {
                due_date: Some("2025-03-01".into()),
                ..request(10)
            })
            .unwrap();
        assert_eq!(titles(&by_due), vec!["C", "A"]);

        let both = svc
            .list(&ListRequest {
                status: Some("PENDING".into()),
                due_date: Some("2025-04-01".into()),
                ..request(10)
            })
            .unwrap();
        assert_eq!(titles(&both), vec!["B"]);
    }

    #[test]
    fn test_blank_filters_mean_unfiltered() {
        let svc = service();
        svc.create(new_record("A", "2025-03-01")).unwrap();
        let page = svc
            .list(&ListRequest {
                status: Some("  ".into()),
                due_date: Some(String::new()),
                ..request(10)
            })
            .unwrap();
        assert_eq!(titles(&page), vec!["A"]);
    }

    #[test]
    fn test_unknown_status_filter_is_rejected() {
        let svc = service();
        let err = svc
            .list(&ListRequest {
                status: Some("DONE".into()),
                ..request(10)
            })
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn test_corrupt_page_token_restarts_from_first_page() {
        let svc = service();
        for title in ["A", "B", "C"] {
            svc.create(new_record(title, "2025-03-01")).unwrap();
        }
        let page = svc
            .list(&ListRequest {
                page_token: Some("not-valid-base64!!".into()),
                ..request(2)
            })
            .unwrap();
        assert_eq!(titles(&page), vec!["A", "B"]);
        assert_eq!(page.token_stack, None);
        assert_eq!(page.previous_page_token, None);
    }

    #[test]
    fn test_token_from_other_filter_serves_first_page_without_history() {
        let svc = service();
        for title in ["A", "B", "C"] {
            svc.create(new_record(title, "2025-03-01")).unwrap();
        }
        let unfiltered = svc.list(&request(2)).unwrap();
        let token = unfiltered.next_page_token.clone().unwrap();

        let pending = svc
            .list(&ListRequest {
                status: Some("PENDING".into()),
                page_token: Some(token),
                token_stack: unfiltered.token_stack.clone(),
                ..request(2)
            })
            .unwrap();
        assert_eq!(titles(&pending), vec!["C", "B"]);
        assert_eq!(pending.token_stack, None);
        assert_eq!(pending.previous_page_token, None);
        assert_eq!(pending.previous_token_stack, None);
    }

    #[test]
    fn test_update_keeps_created_at_and_advances_updated_at() {
        let svc = service();
        let created = svc.create(new_record("A", "2025-03-01")).unwrap();

        let first = svc
            .update(
                &created.id,
                RecordUpdate {
                    due_date: Some("2025-04-01".into()),
                    ..RecordUpdate::default()
                },
            )
            .unwrap();
        assert_eq!(first.created_at, created.created_at);
        assert_eq!(first.due_date, "2025-04-01");
        assert!(first.updated_at.unwrap() > created.created_at);

        let second = svc
            .update(
                &created.id,
                RecordUpdate {
                    due_date: Some("2025-05-01".into()),
                    ..RecordUpdate::default()
                },
            )
            .unwrap();
        assert_eq!(second.created_at, created.created_at);
        assert!(second.updated_at.unwrap() > first.updated_at.unwrap());
        assert_eq!(svc.get(&created.id).unwrap(), second);
    }

    #[test]
    fn test_empty_update_still_touches() {
        let frozen = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let svc = TodoService::new(MemoryStore::new()).with_clock(Arc::new(FrozenClock(frozen)));
        let created = svc.create(new_record("A", "2025-03-01")).unwrap();

        let first = svc.update(&created.id, RecordUpdate::default()).unwrap();
        let second = svc.update(&created.id, RecordUpdate::default()).unwrap();
        assert!(first.updated_at.unwrap() > created.created_at);
        assert!(second.updated_at.unwrap() > first.updated_at.unwrap());
    }

    #[test]
    fn test_update_missing_is_not_found() {
        let svc = service();
        let err = svc.update_status("ghost", Status::Completed).unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
        assert!(svc.store().is_empty());
    }

    #[test]
    fn test_status_change_moves_record_between_index_partitions() {
        let svc = service();
        let a = svc.create(new_record("A", "2025-03-01")).unwrap();
        svc.update_status(&a.id, Status::Completed).unwrap();

        let pending = svc
            .list(&ListRequest {
                status: Some("PENDING".into()),
                ..request(10)
            })
            .unwrap();
        assert!(pending.items.is_empty());

        let completed = svc
            .list(&ListRequest {
                status: Some("COMPLETED".into()),
                ..request(10)
            })
            .unwrap();
        assert_eq!(titles(&completed), vec!["A"]);
    }

    #[test]
    fn test_delete_is_idempotent() {
        let svc = service();
        let a = svc.create(new_record("A", "2025-03-01")).unwrap();
        svc.delete(&a.id).unwrap();
        svc.delete(&a.id).unwrap();
        assert!(matches!(svc.get(&a.id), Err(Error::NotFound(_))));
    }

    #[test]
    fn test_legacy_item_without_status_reads_as_pending() {
        let svc = service();
        let legacy = json!({
            "id": "legacy-1",
            "title": "Old task",
            "description": "",
            "dueDate": "2024-12-01",
            "createdAt": "2024-11-01T00:00:00Z",
            "sortKey": "TODOS",
        });
        svc.store()
            .put(legacy.as_object().unwrap().clone())
            .unwrap();

        let record = svc.get("legacy-1").unwrap();
        assert_eq!(record.status, Status::Pending);
        assert_eq!(record.updated_at, None);

        let exported = svc.export().unwrap();
        assert_eq!(exported.len(), 1);
    }

    #[test]
    fn test_export_reads_every_page() {
        let config = ServiceConfig {
            default_page_size: 2,
            max_page_size: 2,
        };
        let svc = TodoService::with_config(MemoryStore::new(), config).with_clock(StepClock::new());
        for n in 0..5 {
            svc.create(new_record(&format!("T{n}"), "2025-03-01")).unwrap();
        }
        assert_eq!(svc.export().unwrap().len(), 5);
    }

    struct DownStore;

    impl ItemStore for DownStore {
        fn get(&self, _id: &str) -> std::result::Result<Option<Item>, StoreError> {
            Err(StoreError::Unavailable("connection refused".into()))
        }
        fn put(&self, _item: Item) -> std::result::Result<(), StoreError> {
            Err(StoreError::Unavailable("connection refused".into()))
        }
        fn delete(&self, _id: &str) -> std::result::Result<(), StoreError> {
            Err(StoreError::Unavailable("connection refused".into()))
        }
        fn query(&self, _request: &QueryRequest) -> std::result::Result<QueryResult, StoreError> {
            Err(StoreError::Unavailable("connection refused".into()))
        }
        fn scan(&self, _request: &ScanRequest) -> std::result::Result<QueryResult, StoreError> {
            Err(StoreError::Unavailable("connection refused".into()))
        }
    }

    #[test]
    fn test_store_failures_are_distinct_from_not_found() {
        let svc = TodoService::new(DownStore);
        let err = svc.get("x").unwrap_err();
        assert!(matches!(err, Error::Store(StoreError::Unavailable(_))));
        assert!(!err.is_item_unavailable());

        assert!(matches!(
            svc.create(new_record("A", "2025-03-01")),
            Err(Error::Store(_))
        ));
        assert!(matches!(svc.list(&request(10)), Err(Error::Store(_))));
    }
}
