//! Persistence: the snapshot codec, the on-disk snapshot archive and the
//! per-actor retention history.
//!
//! # Invariants
//! - A snapshot's solid count always matches its recorded cells.
//! - Decoding verifies format version and SHA-256 before trusting a snapshot.
//! - Placement commits block writes before placing any fixture.
//! - History holds at most the configured number of ids per actor once
//!   enforced, and evicted ids lose their archive file.

pub mod history;
pub mod snapshot;
pub mod store;

pub use history::SnapshotHistory;
pub use snapshot::{
    CellRecord, CodecError, FixtureRecord, PlaceReport, SNAPSHOT_FORMAT_VERSION, Snapshot,
    SnapshotSummary,
};
pub use store::{ArchiveError, SnapshotArchive};
