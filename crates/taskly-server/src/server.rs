//! Unix domain socket server that wraps a `TodoService`.
//!
//! Each connected client sends JSON-line requests and receives JSON-line
//! responses. The store serializes writes internally, so connections are
//! handled concurrently without further locking here.

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::UnixListener;
use tracing::{error, info, warn};

use taskly_core::{
    Error as CoreError, ListRequest, MemoryStore, NewRecord, RecordUpdate, ServiceConfig,
    TodoService, service::parse_status,
};

use crate::protocol::{
    INTERNAL_ERROR, ITEM_UNAVAILABLE, NOT_FOUND, PARSE_ERROR, Request, Response, VALIDATION_ERROR,
};

type Service = TodoService<Arc<MemoryStore>>;

/// A Taskly server listening on a Unix socket.
pub struct TasklyServer {
    service: Arc<Service>,
    store: Arc<MemoryStore>,
    socket_path: PathBuf,
    snapshot_path: Option<PathBuf>,
}

impl TasklyServer {
    pub fn new(store: Arc<MemoryStore>, config: ServiceConfig, socket_path: PathBuf) -> Self {
        Self {
            service: Arc::new(TodoService::with_config(Arc::clone(&store), config)),
            store,
            socket_path,
            snapshot_path: None,
        }
    }

    /// Write the store to `path` when the server shuts down.
    pub fn with_snapshot(mut self, path: PathBuf) -> Self {
        self.snapshot_path = Some(path);
        self
    }

    /// Run the server, accepting connections until a shutdown signal is received.
    pub async fn run(&self) -> std::io::Result<()> {
        self.run_until(shutdown_signal()).await
    }

    /// Run the server until `shutdown` completes.
    ///
    /// On startup, removes any stale socket file and binds a new one. On
    /// shutdown, removes the socket file and writes the snapshot, if any.
    pub async fn run_until(&self, shutdown: impl Future<Output = ()>) -> std::io::Result<()> {
        if self.socket_path.exists() {
            std::fs::remove_file(&self.socket_path)?;
        }

        let listener = UnixListener::bind(&self.socket_path)?;
        info!(path = %self.socket_path.display(), "server listening");

        let accept_loop = async {
            loop {
                match listener.accept().await {
                    Ok((stream, _addr)) => {
                        let service = Arc::clone(&self.service);
                        tokio::spawn(async move {
                            if let Err(e) = handle_connection(service, stream).await {
                                warn!(error = %e, "connection handler error");
                            }
                        });
                    }
                    Err(e) => {
                        error!(error = %e, "accept error");
                    }
                }
            }
        };

        tokio::select! {
            _ = accept_loop => {}
            _ = shutdown => {
                info!("shutdown requested");
            }
        }

        if self.socket_path.exists() {
            if let Err(e) = std::fs::remove_file(&self.socket_path) {
                warn!(error = %e, "failed to remove socket file on shutdown");
            } else {
                info!(path = %self.socket_path.display(), "socket file removed");
            }
        }

        if let Some(path) = &self.snapshot_path
            && let Err(e) = self.store.save(path)
        {
            error!(path = %path.display(), error = %e, "failed to save snapshot");
        }

        Ok(())
    }
}

async fn handle_connection(
    service: Arc<Service>,
    stream: tokio::net::UnixStream,
) -> std::io::Result<()> {
    let (reader, mut writer) = stream.into_split();
    let mut reader = BufReader::new(reader);
    let mut line = String::new();

    loop {
        line.clear();
        let n = reader.read_line(&mut line).await?;
        if n == 0 {
            // Client disconnected.
            break;
        }

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let response = match serde_json::from_str::<Request>(trimmed) {
            Ok(req) => dispatch(&service, req),
            Err(e) => Response::error(PARSE_ERROR, e.to_string()),
        };

        let mut resp_bytes = match serde_json::to_vec(&response) {
            Ok(bytes) => bytes,
            Err(e) => {
                error!(error = %e, "failed to serialize response");
                serde_json::to_vec(&Response::error(INTERNAL_ERROR, "internal error"))?
            }
        };
        resp_bytes.push(b'\n');

        writer.write_all(&resp_bytes).await?;
        writer.flush().await?;
    }

    Ok(())
}

fn dispatch(service: &Service, req: Request) -> Response {
    let result = match req {
        Request::Create {
            title,
            description,
            due_date,
        } => service
            .create(NewRecord {
                title,
                description,
                due_date,
            })
            .map(Response::ok_record),

        Request::Get { id } => service.get(&id).map(Response::ok_record),

        Request::Update {
            id,
            title,
            description,
            due_date,
            status,
        } => parse_status(status.as_deref()).and_then(|status| {
            service
                .update(
                    &id,
                    RecordUpdate {
                        title,
                        description,
                        due_date,
                        status,
                    },
                )
                .map(Response::ok_record)
        }),

        Request::UpdateStatus { id, status } => handle_update_status(service, &id, &status),

        Request::Delete { id } => service.delete(&id).map(|()| Response::ok_empty()),

        Request::List {
            status,
            due_date,
            page_size,
            page_token,
            token_stack,
        } => service
            .list(&ListRequest {
                status,
                due_date,
                page_size: page_size.unwrap_or_default(),
                page_token,
                token_stack,
            })
            .map(Response::ok_page),

        Request::Export => service.export().map(Response::ok_records),
    };

    result.unwrap_or_else(error_to_response)
}

fn handle_update_status(service: &Service, id: &str, status: &str) -> Result<Response, CoreError> {
    match parse_status(Some(status))? {
        Some(status) => service.update_status(id, status).map(Response::ok_record),
        None => Err(CoreError::Validation("status must not be empty".to_string())),
    }
}

/// Wait for SIGINT (Ctrl-C) or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => {}
                    _ = sigterm.recv() => {}
                }
            }
            Err(e) => {
                warn!(error = %e, "failed to register SIGTERM handler");
                ctrl_c.await.ok();
            }
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
    }
}

/// Map a service error to a response.
///
/// Missing and unreadable records both report as unavailable items; the
/// offending attribute of an unreadable record is only logged. Store
/// failures are logged in full but reported without their details.
fn error_to_response(err: CoreError) -> Response {
    match &err {
        CoreError::NotFound(id) => Response::error(NOT_FOUND, format!("record not found: {id}")),
        _ if err.is_item_unavailable() => {
            warn!(error = %err, "stored record is unreadable");
            Response::error(ITEM_UNAVAILABLE, "record is not available")
        }
        CoreError::Validation(message) => Response::error(VALIDATION_ERROR, message.clone()),
        _ => {
            error!(error = %err, "request failed");
            Response::error(INTERNAL_ERROR, "internal error")
        }
    }
}
