//! Capability traits the pipeline is written against.
//!
//! Each trait is the narrowest surface the pipeline needs from the host:
//! block storage, claims, the actor's resource pool, messaging, markers,
//! highlights and a cancellable timer.

use packspace_common::{ActorId, Block, BlockPos, Region};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// Errors raised by world-side collaborators.
#[derive(Debug, thiserror::Error)]
pub enum WorldError {
    #[error("cell {0} is not loaded")]
    Unloaded(BlockPos),
    #[error("write rejected at {pos}: {reason}")]
    WriteRejected { pos: BlockPos, reason: String },
    #[error("marker service unavailable: {0}")]
    MarkerUnavailable(String),
}

/// How a block write reaches the world.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// Staged until the next [`BlockStore::commit`]; lighting and room
    /// metadata are recomputed once for the whole batch.
    Bulk,
    /// Applied at once with per-cell neighbour updates.
    Immediate,
}

/// Extra state anchored to a cell: container contents, sign text, etc.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fixture {
    pub kind: String,
    #[serde(default)]
    pub data: BTreeMap<String, String>,
}

impl Fixture {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            data: BTreeMap::new(),
        }
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }
}

/// Block storage of the host world.
pub trait BlockStore {
    /// Committed block at `pos`. Unset cells read as air.
    fn block_at(&self, pos: BlockPos) -> Block;

    fn set_block(&mut self, pos: BlockPos, block: &Block, mode: WriteMode)
    -> Result<(), WorldError>;

    /// Apply staged bulk writes. Returns how many were applied.
    fn commit(&mut self) -> Result<usize, WorldError>;

    /// Fixtures anchored inside `region`, in scan order.
    fn fixtures_in(&self, region: &Region) -> Vec<(BlockPos, Fixture)>;

    fn place_fixture(&mut self, pos: BlockPos, fixture: Fixture) -> Result<(), WorldError>;
}

/// Kind of access asked of the claim system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Access {
    Use,
    BuildOrBreak,
}

/// Land-claim and permission checks.
pub trait PermissionOracle {
    fn can_access(&self, actor: &ActorId, pos: BlockPos, access: Access) -> bool;
}

/// The actor's stamina-like pool that packing draws on.
pub trait ResourcePool {
    fn current_level(&self, actor: &ActorId) -> f32;

    fn reduce(&mut self, actor: &ActorId, amount: f32);

    /// Whether costs apply to this actor at all (survival vs. creative).
    fn is_gated(&self, actor: &ActorId) -> bool;
}

/// A user-facing message identified by a localisation key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub key: &'static str,
    pub args: Vec<String>,
    /// English fallback for hosts without a translation table.
    pub text: String,
}

/// Chat and error-toast delivery. Fire and forget.
pub trait Notifier {
    fn send_error(&mut self, actor: &ActorId, notice: &Notice);

    fn send_info(&mut self, actor: &ActorId, message: &str);
}

/// A map marker owned by one actor.
#[derive(Debug, Clone, PartialEq)]
pub struct Marker {
    pub title: String,
    pub position: BlockPos,
    pub icon: String,
    pub color: String,
    pub pinned: bool,
    pub owner: ActorId,
}

/// Map marker bookkeeping.
pub trait MarkerService {
    fn add_marker(&mut self, actor: &ActorId, marker: Marker) -> Result<(), WorldError>;

    /// Remove the actor's markers with `title`. Returns how many went.
    fn remove_marker(&mut self, actor: &ActorId, title: &str) -> Result<usize, WorldError>;

    fn list_owned_markers(&self, actor: &ActorId) -> Vec<Marker>;
}

/// Client-side cell highlighting. An empty `cells` slice clears the slot.
pub trait Highlighter {
    fn highlight(&mut self, actor: &ActorId, slot: u32, cells: &[BlockPos], colors: &[u32]);
}

/// Identity of a scheduled callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerHandle(pub u64);

/// Work the host hands back when a timer fires.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimerTask {
    ClearHighlight { actor: ActorId, slot: u32 },
}

/// Delayed, cancellable callbacks.
pub trait Scheduler {
    fn schedule(&mut self, delay: Duration, task: TimerTask) -> TimerHandle;

    /// Cancel a pending timer. Unknown or already fired handles are ignored
    /// and return `false`.
    fn cancel(&mut self, handle: TimerHandle) -> bool;
}
