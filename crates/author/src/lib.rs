//! Pack/unpack pipeline: turns a bounded region into a carried snapshot and
//! back, gated by claims, block policy and the actor's resources.
//!
//! # Invariants
//! - A rejected invocation mutates nothing and sends exactly one notice.
//! - Every offending cell found by a validation is highlighted.
//! - The actor's pool is debited at most once per invocation, and only
//!   after the world and the item have been updated.

pub mod highlight;
pub mod item;
pub mod ledger;
pub mod notice;
pub mod pipeline;
pub mod policy;
pub mod validate;

pub use highlight::{HIGHLIGHT_CLEAR_DELAY, HIGHLIGHT_SLOT, HighlightFeedback};
pub use item::{AttrValue, CarriedItem, ItemState};
pub use ledger::Charge;
pub use notice::{Direction, FailureKind};
pub use pipeline::{Host, Outcome, PackPipeline, PipelineError, marker_title};
pub use policy::BlockPolicy;
pub use validate::{Surroundings, Validation, Validator};
