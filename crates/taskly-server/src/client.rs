//! Client library for connecting to a `taskly-server` via Unix socket.
//!
//! Each method serializes a JSON-line request, sends it, reads a JSON-line
//! response, and returns the parsed result.

use std::path::Path;

use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, BufWriter};
use tokio::net::UnixStream;
use tokio::net::unix::{OwnedReadHalf, OwnedWriteHalf};

use taskly_core::{ListPage, ListRequest, NewRecord, Record, RecordUpdate, Status};

use crate::error::ClientError;
use crate::protocol::ErrorResponse;

/// Result type alias for client operations.
pub type Result<T> = std::result::Result<T, ClientError>;

/// Client for a Taskly server.
pub struct TasklyClient {
    reader: BufReader<OwnedReadHalf>,
    writer: BufWriter<OwnedWriteHalf>,
    line_buf: String,
}

impl TasklyClient {
    /// Connect to a Taskly server at the given Unix socket path.
    pub async fn connect(path: impl AsRef<Path>) -> Result<Self> {
        let stream = UnixStream::connect(path.as_ref()).await?;
        let (read_half, write_half) = stream.into_split();
        Ok(Self {
            reader: BufReader::new(read_half),
            writer: BufWriter::new(write_half),
            line_buf: String::new(),
        })
    }

    pub async fn create(&mut self, new: &NewRecord) -> Result<Record> {
        let req = json!({
            "op": "create",
            "title": new.title,
            "description": new.description,
            "due_date": new.due_date,
        });
        let resp = self.send_request(&req).await?;
        field_from_response(resp, "record")
    }

    pub async fn get(&mut self, id: &str) -> Result<Record> {
        let resp = self.send_request(&json!({"op": "get", "id": id})).await?;
        field_from_response(resp, "record")
    }

    pub async fn update(&mut self, id: &str, update: &RecordUpdate) -> Result<Record> {
        let req = json!({
            "op": "update",
            "id": id,
            "title": update.title,
            "description": update.description,
            "due_date": update.due_date,
            "status": update.status.map(|s| s.as_str()),
        });
        let resp = self.send_request(&req).await?;
        field_from_response(resp, "record")
    }

    pub async fn update_status(&mut self, id: &str, status: Status) -> Result<Record> {
        let req = json!({"op": "update_status", "id": id, "status": status.as_str()});
        let resp = self.send_request(&req).await?;
        field_from_response(resp, "record")
    }

    /// Delete a record. Succeeds whether or not it existed.
    pub async fn delete(&mut self, id: &str) -> Result<()> {
        let resp = self.send_request(&json!({"op": "delete", "id": id})).await?;
        check_ok(&resp)
    }

    /// Fetch one page. Pass back the returned tokens and stacks unchanged to
    /// navigate forward or backward.
    pub async fn list(&mut self, request: &ListRequest) -> Result<ListPage> {
        let req = json!({
            "op": "list",
            "status": request.status,
            "due_date": request.due_date,
            "page_size": request.page_size,
            "page_token": request.page_token,
            "token_stack": request.token_stack,
        });
        let resp = self.send_request(&req).await?;
        check_error(&resp)?;
        serde_json::from_value(resp).map_err(ClientError::Serialization)
    }

    /// Every stored record in primary key order.
    pub async fn export(&mut self) -> Result<Vec<Record>> {
        let resp = self.send_request(&json!({"op": "export"})).await?;
        field_from_response(resp, "records")
    }

    async fn send_request(&mut self, req: &Value) -> Result<Value> {
        let mut data = serde_json::to_vec(req).map_err(ClientError::Serialization)?;
        data.push(b'\n');
        self.writer.write_all(&data).await?;
        self.writer.flush().await?;

        self.line_buf.clear();
        let n = self.reader.read_line(&mut self.line_buf).await?;
        if n == 0 {
            return Err(ClientError::Disconnected);
        }

        let resp: Value =
            serde_json::from_str(self.line_buf.trim()).map_err(ClientError::Serialization)?;
        Ok(resp)
    }
}

// ---------------------------------------------------------------------------
// Response parsing helpers
// ---------------------------------------------------------------------------

fn check_error(resp: &Value) -> Result<()> {
    if let Some(err) = resp.get("error") {
        let error = err.as_str().unwrap_or("Unknown").to_string();
        let message = resp
            .get("message")
            .and_then(|m| m.as_str())
            .unwrap_or("")
            .to_string();
        return Err(ClientError::Server(ErrorResponse { error, message }));
    }
    Ok(())
}

fn check_ok(resp: &Value) -> Result<()> {
    check_error(resp)?;
    match resp.get("ok").and_then(Value::as_bool) {
        Some(true) => Ok(()),
        _ => Err(ClientError::Protocol("expected ok response".to_string())),
    }
}

fn field_from_response<T: DeserializeOwned>(mut resp: Value, field: &str) -> Result<T> {
    check_error(&resp)?;
    let value = resp
        .get_mut(field)
        .map(Value::take)
        .ok_or_else(|| ClientError::Protocol(format!("response is missing '{field}'")))?;
    serde_json::from_value(value).map_err(ClientError::Serialization)
}
