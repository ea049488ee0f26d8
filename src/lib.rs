//! # ferrokv
//!
//! A small Redis-compatible in-memory key-value server. Clients speak RESP
//! over TCP; values live in memory with optional expiry; a Redis RDB
//! snapshot can be loaded at startup.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                             ferrokv                              │
//! │                                                                  │
//! │  ┌────────────┐    ┌────────────┐    ┌────────────┐              │
//! │  │   Server   │───>│ Connection │───>│  Command   │              │
//! │  │ (Listener) │    │  Handler   │    │  Handler   │              │
//! │  └────────────┘    └─────┬──────┘    └─────┬──────┘              │
//! │                          │                 │                     │
//! │                          ▼                 ▼                     │
//! │                    ┌──────────┐    ┌──────────────────────────┐  │
//! │                    │   RESP   │    │      StorageEngine       │  │
//! │                    │  Parser  │    │  strings  │    hashes    │  │
//! │                    └──────────┘    └──────────────────────────┘  │
//! │                                        ▲               ▲         │
//! │                          ┌─────────────┘               │         │
//! │                  ┌───────┴───────┐           ┌─────────┴───────┐ │
//! │                  │ ExpirySweeper │           │ Snapshot loader │ │
//! │                  └───────────────┘           └─────────────────┘ │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```no_run
//! use ferrokv::config::Config;
//! use ferrokv::server::Server;
//! use ferrokv::snapshot::load_snapshot;
//! use ferrokv::storage::StorageEngine;
//! use std::sync::Arc;
//!
//! # async fn run() -> anyhow::Result<()> {
//! let config = Arc::new(Config::default());
//! let storage = Arc::new(StorageEngine::new());
//! load_snapshot(&config.snapshot_path(), &storage);
//!
//! let server = Server::bind(config, storage).await?;
//! server.serve(async { let _ = tokio::signal::ctrl_c().await; }).await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Supported Commands
//!
//! - `PING [message]`, `ECHO message`
//! - `SET key value [EX seconds | PX milliseconds]`, `GET key`
//! - `HSET key field value [field value ...]`, `HGET key field`, `HGETALL key`
//! - `KEYS pattern`
//! - `CONFIG GET parameter`
//!
//! ## Expiry
//!
//! Keys with a TTL are removed lazily when read after their deadline, and
//! actively by a background sweep once per second.

pub mod commands;
pub mod config;
pub mod connection;
pub mod logging;
pub mod protocol;
pub mod server;
pub mod snapshot;
pub mod storage;

pub use commands::CommandHandler;
pub use config::Config;
pub use connection::{handle_connection, ConnectionStats};
pub use protocol::{ParseError, RespParser, RespValue};
pub use server::{Server, ServerError};
pub use storage::{start_expiry_sweeper, ExpiryConfig, ExpirySweeper, StorageEngine};

/// Default listening port (same as Redis).
pub const DEFAULT_PORT: u16 = 6379;

/// Default bind host.
pub const DEFAULT_HOST: &str = "127.0.0.1";

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
