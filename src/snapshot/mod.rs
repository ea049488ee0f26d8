//! Snapshot Loading
//!
//! At startup, before the listener accepts anyone, the RDB file at
//! `<dir>/<dbfilename>` is decoded and every string pair is written into
//! the store with no expiry.
//!
//! Loading never aborts startup. A missing or empty file means an empty
//! store; a file that fails to decode part-way is logged and whatever was
//! decoded before the failure is kept.

pub mod decoder;

pub use decoder::{decode, decode_length, Length, PartialSnapshot, SnapshotDecoder, SnapshotError};

use crate::storage::StorageEngine;
use std::io::ErrorKind;
use std::path::Path;
use tracing::{info, warn};

/// Writes the pairs decoded from `data` into `engine`. Returns how many
/// entries were loaded.
pub fn load_bytes(data: &[u8], engine: &StorageEngine) -> usize {
    if data.is_empty() {
        return 0;
    }

    let pairs = match decode(data) {
        Ok(pairs) => pairs,
        Err(partial) => {
            warn!(
                error = %partial.source,
                recovered = partial.pairs.len(),
                "Snapshot could not be fully decoded"
            );
            partial.pairs
        }
    };

    let loaded = pairs.len();
    for (key, value) in pairs {
        engine.set(key, value);
    }
    loaded
}

/// Loads the snapshot at `path` into `engine`. Returns how many entries
/// were loaded.
pub fn load_snapshot(path: &Path, engine: &StorageEngine) -> usize {
    let data = match std::fs::read(path) {
        Ok(data) => data,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            info!(path = %path.display(), "No snapshot found, starting empty");
            return 0;
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Failed to read snapshot, starting empty");
            return 0;
        }
    };

    let loaded = load_bytes(&data, engine);
    info!(path = %path.display(), keys = loaded, "Snapshot loaded");
    loaded
}
