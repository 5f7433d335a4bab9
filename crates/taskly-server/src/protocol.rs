//! Wire protocol: JSON-over-newlines request/response types.
//!
//! Each request is a single JSON line; each response is a single JSON line.
//! Status values travel as plain strings so an unknown status is reported as
//! a validation failure rather than an unreadable request.

use serde::{Deserialize, Serialize};
use taskly_core::{ListPage, Record};

pub const NOT_FOUND: &str = "NotFound";
pub const ITEM_UNAVAILABLE: &str = "ItemUnavailable";
pub const VALIDATION_ERROR: &str = "ValidationError";
pub const PARSE_ERROR: &str = "ParseError";
pub const INTERNAL_ERROR: &str = "InternalError";

/// A request from a client.
#[derive(Debug, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Request {
    Create {
        title: String,
        #[serde(default)]
        description: String,
        due_date: String,
    },
    Get {
        id: String,
    },
    Update {
        id: String,
        #[serde(default)]
        title: Option<String>,
        #[serde(default)]
        description: Option<String>,
        #[serde(default)]
        due_date: Option<String>,
        #[serde(default)]
        status: Option<String>,
    },
    UpdateStatus {
        id: String,
        status: String,
    },
    Delete {
        id: String,
    },
    List {
        #[serde(default)]
        status: Option<String>,
        #[serde(default)]
        due_date: Option<String>,
        #[serde(default)]
        page_size: Option<i64>,
        #[serde(default)]
        page_token: Option<String>,
        #[serde(default)]
        token_stack: Option<String>,
    },
    Export,
}

/// A response sent back to the client.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum Response {
    Ok(OkResponse),
    Error(ErrorResponse),
}

/// Successful response variants.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum OkResponse {
    Record {
        ok: bool,
        record: Record,
    },
    Page {
        ok: bool,
        #[serde(flatten)]
        page: ListPage,
    },
    Records {
        ok: bool,
        records: Vec<Record>,
    },
    Empty {
        ok: bool,
    },
}

/// Error response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

impl Response {
    pub fn ok_empty() -> Self {
        Response::Ok(OkResponse::Empty { ok: true })
    }

    pub fn ok_record(record: Record) -> Self {
        Response::Ok(OkResponse::Record { ok: true, record })
    }

    pub fn ok_page(page: ListPage) -> Self {
        Response::Ok(OkResponse::Page { ok: true, page })
    }

    pub fn ok_records(records: Vec<Record>) -> Self {
        Response::Ok(OkResponse::Records { ok: true, records })
    }

    pub fn error(error: impl Into<String>, message: impl Into<String>) -> Self {
        Response::Error(ErrorResponse {
            error: error.into(),
            message: message.into(),
        })
    }
}
