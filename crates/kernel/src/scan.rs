//! Region scanning: the single iteration primitive over a box of cells.
//!
//! Every function visits each cell of the region exactly once, Z slowest
//! then Y then X, and never stops early. Callers that want to skip work
//! decide that inside their visitor.

use crate::access::{BlockStore, WorldError, WriteMode};
use packspace_common::{Block, BlockPos, Region};

/// Call `visit` for every cell of `region`. Read-only.
pub fn walk<S>(store: &S, region: &Region, mut visit: impl FnMut(BlockPos, &Block))
where
    S: BlockStore + ?Sized,
{
    for pos in region.positions() {
        let block = store.block_at(pos);
        visit(pos, &block);
    }
}

/// Thread an accumulator through every cell of `region`.
pub fn fold<S, A>(
    store: &S,
    region: &Region,
    init: A,
    mut f: impl FnMut(A, BlockPos, &Block) -> A,
) -> A
where
    S: BlockStore + ?Sized,
{
    region.positions().fold(init, |acc, pos| {
        let block = store.block_at(pos);
        f(acc, pos, &block)
    })
}

/// Write whatever `mutator` returns for each cell, then commit once.
///
/// Returns the number of cells written.
pub fn mutate<S>(
    store: &mut S,
    region: &Region,
    mode: WriteMode,
    mut mutator: impl FnMut(BlockPos, &Block) -> Option<Block>,
) -> Result<usize, WorldError>
where
    S: BlockStore + ?Sized,
{
    let mut written = 0;
    for pos in region.positions() {
        let current = store.block_at(pos);
        if let Some(next) = mutator(pos, &current) {
            store.set_block(pos, &next, mode)?;
            written += 1;
        }
    }
    store.commit()?;
    Ok(written)
}

/// Set every non-air cell of `region` to air.
///
/// Runs a bulk pass first so decor and multi-cell structures come down in
/// one batch, then an immediate pass so per-cell lighting and room updates
/// run for anything the batch left behind. Both passes complete before this
/// returns. Returns the total number of writes.
pub fn clear_area<S>(store: &mut S, region: &Region) -> Result<usize, WorldError>
where
    S: BlockStore + ?Sized,
{
    let air = Block::air();
    let clear = |_: BlockPos, block: &Block| (!block.is_air()).then(|| air.clone());
    let bulk = mutate(store, region, WriteMode::Bulk, clear)?;
    let immediate = mutate(store, region, WriteMode::Immediate, clear)?;
    tracing::debug!(%region, bulk, immediate, "area cleared");
    Ok(bulk + immediate)
}
