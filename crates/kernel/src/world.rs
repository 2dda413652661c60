use crate::access::{BlockStore, Fixture, WorldError, WriteMode};
use packspace_common::{Block, BlockCode, BlockPos, Region};
use std::collections::BTreeMap;

/// An event record produced by every mutation to the world.
///
/// Lets tests and tools observe ordering: bulk writes only show up once
/// committed, and fixture placement can be checked against the commit.
#[derive(Debug, Clone, PartialEq)]
pub enum WorldEvent {
    /// A cell changed from `old` to `new`.
    BlockSet {
        pos: BlockPos,
        old: BlockCode,
        new: BlockCode,
    },
    /// Staged bulk writes were applied.
    Committed { writes: usize },
    FixturePlaced { pos: BlockPos, kind: String },
    /// A fixture was dropped because its cell was overwritten.
    FixtureRemoved { pos: BlockPos, kind: String },
}

/// Key ordering cells Z, then Y, then X, matching the scan order.
type CellKey = (i32, i32, i32);

fn key(pos: BlockPos) -> CellKey {
    (pos.z, pos.y, pos.x)
}

fn pos_of(key: &CellKey) -> BlockPos {
    BlockPos::new(key.2, key.1, key.0)
}

/// Sparse in-memory block world.
///
/// Unset cells are air. Bulk writes are staged and invisible to reads until
/// [`BlockStore::commit`]. Uses BTreeMap for deterministic iteration order.
#[derive(Debug, Clone, Default)]
pub struct VoxelWorld {
    blocks: BTreeMap<CellKey, Block>,
    fixtures: BTreeMap<CellKey, Fixture>,
    staged: Vec<(BlockPos, Block)>,
    /// When set, writes outside this box fail with [`WorldError::Unloaded`].
    loaded: Option<Region>,
    /// Append-only event log of all mutations.
    event_log: Vec<WorldEvent>,
}

impl VoxelWorld {
    /// Create an empty, unbounded world.
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict writes to `region`, simulating unloaded chunks outside it.
    pub fn with_loaded_area(region: Region) -> Self {
        Self {
            loaded: Some(region),
            ..Default::default()
        }
    }

    /// Number of non-air cells.
    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    pub fn fixture_count(&self) -> usize {
        self.fixtures.len()
    }

    /// Bulk writes waiting for a commit.
    pub fn staged_count(&self) -> usize {
        self.staged.len()
    }

    pub fn fixture_at(&self, pos: BlockPos) -> Option<&Fixture> {
        self.fixtures.get(&key(pos))
    }

    /// Drain and return the event log.
    pub fn drain_events(&mut self) -> Vec<WorldEvent> {
        std::mem::take(&mut self.event_log)
    }

    /// Read-only access to the event log.
    pub fn events(&self) -> &[WorldEvent] {
        &self.event_log
    }

    /// Set a block directly, bypassing staging. For world setup.
    pub fn put(&mut self, pos: BlockPos, block: Block) {
        self.apply(pos, block);
    }

    /// Fill every cell of `region` with `block`.
    pub fn fill(&mut self, region: &Region, block: &Block) {
        for pos in region.positions() {
            self.apply(pos, block.clone());
        }
    }

    /// Non-air cells inside `region` keyed by offset from `region.start`,
    /// in scan order.
    pub fn non_air_cells(&self, region: &Region) -> Vec<(BlockPos, BlockCode)> {
        region
            .positions()
            .filter_map(|pos| {
                self.blocks
                    .get(&key(pos))
                    .map(|b| (region.offset_of(pos), b.code.clone()))
            })
            .collect()
    }

    /// Deterministic FNV-1a hash over every non-air cell and fixture.
    pub fn state_hash(&self) -> u64 {
        let mut h: u64 = 0xcbf2_9ce4_8422_2325;
        let mix = |h: &mut u64, bytes: &[u8]| {
            for &b in bytes {
                *h ^= b as u64;
                *h = h.wrapping_mul(0x0100_0000_01b3);
            }
        };
        for (k, block) in &self.blocks {
            mix(&mut h, &k.0.to_le_bytes());
            mix(&mut h, &k.1.to_le_bytes());
            mix(&mut h, &k.2.to_le_bytes());
            mix(&mut h, block.code.to_string().as_bytes());
        }
        for (k, fixture) in &self.fixtures {
            mix(&mut h, &k.0.to_le_bytes());
            mix(&mut h, &k.1.to_le_bytes());
            mix(&mut h, &k.2.to_le_bytes());
            mix(&mut h, fixture.kind.as_bytes());
        }
        h
    }

    fn check_loaded(&self, pos: BlockPos) -> Result<(), WorldError> {
        match self.loaded {
            Some(area) if !area.contains(pos) => Err(WorldError::Unloaded(pos)),
            _ => Ok(()),
        }
    }

    fn apply(&mut self, pos: BlockPos, block: Block) {
        let k = key(pos);
        let unchanged = match self.blocks.get(&k) {
            Some(current) => *current == block,
            None => block.is_air(),
        };
        if unchanged {
            return;
        }
        let old = self
            .blocks
            .get(&k)
            .map(|b| b.code.clone())
            .unwrap_or_else(BlockCode::air);
        if let Some(fixture) = self.fixtures.remove(&k) {
            self.event_log.push(WorldEvent::FixtureRemoved {
                pos,
                kind: fixture.kind,
            });
        }
        let new = block.code.clone();
        if block.is_air() {
            self.blocks.remove(&k);
        } else {
            self.blocks.insert(k, block);
        }
        self.event_log.push(WorldEvent::BlockSet { pos, old, new });
    }
}

impl BlockStore for VoxelWorld {
    fn block_at(&self, pos: BlockPos) -> Block {
        self.blocks.get(&key(pos)).cloned().unwrap_or_default()
    }

    fn set_block(
        &mut self,
        pos: BlockPos,
        block: &Block,
        mode: WriteMode,
    ) -> Result<(), WorldError> {
        self.check_loaded(pos)?;
        match mode {
            WriteMode::Bulk => self.staged.push((pos, block.clone())),
            WriteMode::Immediate => self.apply(pos, block.clone()),
        }
        Ok(())
    }

    fn commit(&mut self) -> Result<usize, WorldError> {
        let staged = std::mem::take(&mut self.staged);
        let writes = staged.len();
        if writes == 0 {
            return Ok(0);
        }
        for (pos, block) in staged {
            self.apply(pos, block);
        }
        self.event_log.push(WorldEvent::Committed { writes });
        tracing::trace!(writes, "bulk commit");
        Ok(writes)
    }

    fn fixtures_in(&self, region: &Region) -> Vec<(BlockPos, Fixture)> {
        // BTreeMap order over (z, y, x) keys is the scan order.
        self.fixtures
            .iter()
            .map(|(k, f)| (pos_of(k), f))
            .filter(|(pos, _)| region.contains(*pos))
            .map(|(pos, f)| (pos, f.clone()))
            .collect()
    }

    fn place_fixture(&mut self, pos: BlockPos, fixture: Fixture) -> Result<(), WorldError> {
        self.check_loaded(pos)?;
        self.event_log.push(WorldEvent::FixturePlaced {
            pos,
            kind: fixture.kind.clone(),
        });
        self.fixtures.insert(key(pos), fixture);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::IVec3;

    fn planks() -> Block {
        Block::solid("game:planks-oak".parse().unwrap())
    }

    #[test]
    fn world_starts_empty() {
        let w = VoxelWorld::new();
        assert_eq!(w.block_count(), 0);
        assert!(w.block_at(IVec3::new(1, 2, 3)).is_air());
    }

    #[test]
    fn immediate_write_is_visible() {
        let mut w = VoxelWorld::new();
        w.set_block(IVec3::ZERO, &planks(), WriteMode::Immediate)
            .unwrap();
        assert_eq!(w.block_at(IVec3::ZERO), planks());
        assert_eq!(w.events().len(), 1);
    }

    #[test]
    fn bulk_write_waits_for_commit() {
        let mut w = VoxelWorld::new();
        w.set_block(IVec3::ZERO, &planks(), WriteMode::Bulk).unwrap();
        assert!(w.block_at(IVec3::ZERO).is_air());
        assert_eq!(w.staged_count(), 1);

        assert_eq!(w.commit().unwrap(), 1);
        assert_eq!(w.block_at(IVec3::ZERO), planks());
        assert_eq!(w.staged_count(), 0);
        assert_eq!(w.events().last(), Some(&WorldEvent::Committed { writes: 1 }));
    }

    #[test]
    fn empty_commit_logs_nothing() {
        let mut w = VoxelWorld::new();
        assert_eq!(w.commit().unwrap(), 0);
        assert!(w.events().is_empty());
    }

    #[test]
    fn writing_air_removes_cell_and_fixture() {
        let mut w = VoxelWorld::new();
        w.put(IVec3::ZERO, planks());
        w.place_fixture(IVec3::ZERO, Fixture::new("chest")).unwrap();
        assert_eq!(w.fixture_count(), 1);

        w.set_block(IVec3::ZERO, &Block::air(), WriteMode::Immediate)
            .unwrap();
        assert_eq!(w.block_count(), 0);
        assert_eq!(w.fixture_count(), 0);
        assert!(w.events().iter().any(|e| matches!(
            e,
            WorldEvent::FixtureRemoved { kind, .. } if kind == "chest"
        )));
    }

    #[test]
    fn same_code_with_new_properties_is_written() {
        let mut w = VoxelWorld::new();
        w.put(IVec3::ZERO, planks());
        let renamed = planks().with_name("Old planks");
        w.set_block(IVec3::ZERO, &renamed, WriteMode::Immediate)
            .unwrap();
        assert_eq!(w.block_at(IVec3::ZERO), renamed);
        assert_eq!(w.events().len(), 2);

        // An identical write is still a no-op.
        w.set_block(IVec3::ZERO, &renamed, WriteMode::Immediate)
            .unwrap();
        assert_eq!(w.events().len(), 2);
    }

    #[test]
    fn writes_outside_loaded_area_fail() {
        let area = Region::new(IVec3::ZERO, IVec3::splat(4));
        let mut w = VoxelWorld::with_loaded_area(area);
        assert!(
            w.set_block(IVec3::splat(2), &planks(), WriteMode::Bulk)
                .is_ok()
        );
        let err = w
            .set_block(IVec3::splat(9), &planks(), WriteMode::Immediate)
            .unwrap_err();
        assert!(matches!(err, WorldError::Unloaded(p) if p == IVec3::splat(9)));
    }

    #[test]
    fn fixtures_in_region_scan_order() {
        let mut w = VoxelWorld::new();
        w.place_fixture(IVec3::new(1, 0, 1), Fixture::new("b")).unwrap();
        w.place_fixture(IVec3::new(0, 0, 0), Fixture::new("a")).unwrap();
        w.place_fixture(IVec3::new(9, 9, 9), Fixture::new("far")).unwrap();

        let region = Region::new(IVec3::ZERO, IVec3::splat(2));
        let found = w.fixtures_in(&region);
        let kinds: Vec<_> = found.iter().map(|(_, f)| f.kind.as_str()).collect();
        assert_eq!(kinds, vec!["a", "b"]);
    }

    #[test]
    fn state_hash_tracks_content() {
        let mut w1 = VoxelWorld::new();
        let mut w2 = VoxelWorld::new();
        w1.put(IVec3::new(1, 2, 3), planks());
        w2.put(IVec3::new(1, 2, 3), planks());
        assert_eq!(w1.state_hash(), w2.state_hash());

        w2.put(IVec3::new(1, 2, 4), planks());
        assert_ne!(w1.state_hash(), w2.state_hash());
    }

    #[test]
    fn non_air_cells_are_offsets() {
        let mut w = VoxelWorld::new();
        w.put(IVec3::new(5, 5, 5), planks());
        let region = Region::new(IVec3::new(4, 4, 4), IVec3::new(6, 6, 6));
        let cells = w.non_air_cells(&region);
        assert_eq!(cells.len(), 1);
        assert_eq!(cells[0].0, IVec3::ONE);
    }
}
