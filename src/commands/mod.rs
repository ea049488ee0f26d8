//! Command Handler Module
//!
//! ```text
//! RespValue::Array ──> Request { name, args } ──> CommandHandler::dispatch
//!                                                        │
//!                                                        ▼
//!                                                  StorageEngine
//! ```
//!
//! Supported: `PING`, `ECHO`, `SET`, `GET`, `HSET`, `HGET`, `HGETALL`,
//! `KEYS`, `CONFIG GET`.

pub mod handler;

pub use handler::{CommandHandler, Request, RequestError};
