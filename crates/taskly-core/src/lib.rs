//! # Taskly
//!
//! To-do record storage with bidirectional pagination over a forward-only,
//! indexed item store.
//!
//! The store only hands out "continue after this key" cursors. Taskly turns
//! them into opaque page tokens and keeps a client-held stack of the tokens
//! that led to the current page, so a "previous page" link can be rebuilt
//! without any server-side session state.
//!
//! ## Quick Start
//!
//! ```no_run
//! use taskly_core::{ListRequest, MemoryStore, NewRecord, TodoService};
//!
//! let service = TodoService::new(MemoryStore::new());
//! service
//!     .create(NewRecord {
//!         title: "Write report".into(),
//!         description: String::new(),
//!         due_date: "2025-03-01".into(),
//!     })
//!     .unwrap();
//!
//! let page = service
//!     .list(&ListRequest { page_size: 10, ..ListRequest::default() })
//!     .unwrap();
//! assert_eq!(page.items.len(), 1);
//! assert!(page.previous_page_token.is_none());
//! ```

pub mod config;
pub mod error;
pub mod mapper;
pub mod pagination;
pub mod record;
pub mod router;
pub mod service;
pub mod store;
pub mod types;

pub use config::ServiceConfig;
pub use error::{Error, Result, StoreError};
pub use record::{NewRecord, Record, RecordUpdate, Status};
pub use router::{AccessPath, ListFilter, QueryRouter};
pub use service::{Clock, ListPage, ListRequest, SystemClock, TodoService};
pub use store::{ItemStore, MemoryStore};
