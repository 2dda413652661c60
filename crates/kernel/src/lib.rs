//! World Kernel: the capability surface the pipeline talks to, the region
//! scanner, and in-memory implementations of every host collaborator.
//!
//! # Invariants
//! - All block reads during a scan go through `BlockStore::block_at`.
//! - Bulk writes are invisible until committed.
//! - Scans visit every cell exactly once in Z, Y, X order.

pub mod access;
pub mod host;
pub mod scan;
pub mod world;

pub use access::{
    Access, BlockStore, Fixture, Highlighter, Marker, MarkerService, Notice, Notifier,
    PermissionOracle, ResourcePool, Scheduler, TimerHandle, TimerTask, WorldError, WriteMode,
};
pub use host::{
    Channel, ClaimMap, Delivered, GameMode, HighlightBoard, ManualScheduler, MarkerBoard,
    MessageLog, SaturationPools,
};
pub use world::{VoxelWorld, WorldEvent};
