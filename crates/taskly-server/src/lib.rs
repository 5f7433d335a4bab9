//! Taskly server and client library.
//!
//! Serves one record store over a local Unix socket so several clients (a
//! web front end, CLI tools, hooks) can share it. Navigation state for list
//! paging travels inside requests and responses; the server keeps none.

pub mod client;
pub mod error;
pub mod protocol;
pub mod server;

pub use client::TasklyClient;
pub use server::TasklyServer;
