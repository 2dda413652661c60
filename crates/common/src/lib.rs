//! Shared types for packspace: cell positions, regions, block codes and the
//! pack/unpack configuration.
//!
//! # Invariants
//! - A `Region` always has `start <= end` component-wise.
//! - Block codes are `domain:path`; a missing domain means `game`.

pub mod block;
pub mod config;
pub mod types;

pub use block::{Block, BlockCode, CodeError, CodePattern};
pub use config::{ConfigError, PackConfig};
pub use types::{ActorId, BlockPos, Region, SnapshotId, box_volume};
