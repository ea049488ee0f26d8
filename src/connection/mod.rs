//! Client Connections
//!
//! One task per accepted socket. The task owns its read buffer and writer;
//! the only state it shares with other clients is the [`CommandHandler`]'s
//! store and the [`ConnectionStats`] counters.
//!
//! ```text
//! Server::serve ── accept() ──> tokio::spawn(handle_connection(..))
//!                                      │
//!                                      ▼
//!                  read ──> parse ──> dispatch ──> reply ──┐
//!                   ▲                                      │
//!                   └──────────────────────────────────────┘
//! ```
//!
//! Requests on one connection are answered strictly in arrival order,
//! including pipelined requests that arrive in a single read.
//!
//! [`CommandHandler`]: crate::commands::CommandHandler

pub mod handler;

pub use handler::{handle_connection, ConnectionError, ConnectionHandler, ConnectionStats};
