//! Storage Engine Module
//!
//! The shared key-value store and its active expiry.
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │               StorageEngine                 │
//! │   strings (RwLock)      hashes (RwLock)     │
//! └─────────────────────────────────────────────┘
//!                     ▲
//!                     │ cleanup_expired() every second
//!        ┌────────────┴─────────────┐
//!        │      ExpirySweeper       │
//!        │  (background Tokio task) │
//!        └──────────────────────────┘
//! ```
//!
//! - **Lazy expiry**: reads never return an entry past its deadline
//! - **Active expiry**: the sweeper removes expired string entries

pub mod engine;
pub mod expiry;
pub mod pattern;

pub use engine::{Entry, StorageEngine, StorageStats, StoredValue};
pub use expiry::{start_expiry_sweeper, ExpiryConfig, ExpirySweeper, DEFAULT_SWEEP_INTERVAL};
