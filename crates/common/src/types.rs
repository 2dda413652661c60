use glam::IVec3;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Integer cell coordinate in world space.
pub type BlockPos = IVec3;

/// Identity of the actor (player) driving an interaction.
///
/// Used as the key for snapshot history and embedded in snapshot file names,
/// so it is kept as the host's stable player name rather than a session id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ActorId(pub String);

impl ActorId {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// File-name safe form of the actor name.
    pub fn file_key(&self) -> String {
        self.0
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                    c
                } else {
                    '_'
                }
            })
            .collect()
    }
}

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Unique identifier for an archived snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SnapshotId(pub Uuid);

impl SnapshotId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SnapshotId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SnapshotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for SnapshotId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// Cell count of a box with extents `size`. `None` for a negative extent or
/// when the product overflows.
pub fn box_volume(size: IVec3) -> Option<usize> {
    let x = usize::try_from(size.x).ok()?;
    let y = usize::try_from(size.y).ok()?;
    let z = usize::try_from(size.z).ok()?;
    x.checked_mul(y)?.checked_mul(z)
}

/// Axis-aligned box of cells with inclusive bounds.
///
/// # Invariants
/// - `start <= end` component-wise; [`Region::new`] normalises its corners.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Region {
    pub start: BlockPos,
    pub end: BlockPos,
}

impl Region {
    /// Build a region from two opposite corners in any order.
    pub fn new(a: BlockPos, b: BlockPos) -> Self {
        Self {
            start: a.min(b),
            end: a.max(b),
        }
    }

    /// Square column around `anchor`: `radius` cells out on X and Z,
    /// spanning `bottom..=top` relative to the anchor on Y.
    pub fn around(anchor: BlockPos, radius: i32, bottom: i32, top: i32) -> Self {
        Self::new(
            anchor + IVec3::new(-radius, bottom, -radius),
            anchor + IVec3::new(radius, top, radius),
        )
    }

    /// Extent in cells along each axis.
    pub fn size(&self) -> IVec3 {
        self.end - self.start + IVec3::ONE
    }

    /// Number of cells in the box, saturating at `usize::MAX`.
    pub fn volume(&self) -> usize {
        self.checked_volume().unwrap_or(usize::MAX)
    }

    /// Number of cells in the box, or `None` when it does not fit a `usize`.
    pub fn checked_volume(&self) -> Option<usize> {
        box_volume(self.size())
    }

    pub fn contains(&self, pos: BlockPos) -> bool {
        pos.cmpge(self.start).all() && pos.cmple(self.end).all()
    }

    /// Whether every cell of `other` lies inside this region.
    pub fn encloses(&self, other: &Region) -> bool {
        self.contains(other.start) && self.contains(other.end)
    }

    /// Whether `pos` lies on the lowest Y plane of the region.
    pub fn is_floor(&self, pos: BlockPos) -> bool {
        pos.y == self.start.y
    }

    /// Position relative to `start`.
    pub fn offset_of(&self, pos: BlockPos) -> IVec3 {
        pos - self.start
    }

    /// Every cell, Z slowest then Y then X fastest.
    pub fn positions(&self) -> impl Iterator<Item = BlockPos> + use<> {
        let (start, end) = (self.start, self.end);
        (start.z..=end.z).flat_map(move |z| {
            (start.y..=end.y)
                .flat_map(move |y| (start.x..=end.x).map(move |x| IVec3::new(x, y, z)))
        })
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({}, {}, {})..=({}, {}, {})",
            self.start.x, self.start.y, self.start.z, self.end.x, self.end.y, self.end.z
        )
    }
}
