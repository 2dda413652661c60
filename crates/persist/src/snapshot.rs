use glam::IVec3;
use packspace_common::{Block, BlockPos, Region, box_volume};
use packspace_kernel::{BlockStore, Fixture, WorldError, WriteMode, scan};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fmt;
use std::io::{Read, Write};

/// Current snapshot encoding version.
pub const SNAPSHOT_FORMAT_VERSION: u32 = 1;

/// Errors from encoding or decoding snapshot bytes.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("compression error: {0}")]
    Compression(#[from] std::io::Error),
    #[error("CBOR serialization error: {0}")]
    CborEncode(String),
    #[error("CBOR deserialization error: {0}")]
    CborDecode(String),
    #[error("unsupported snapshot version v{found}, expected v{expected}")]
    Version { found: u32, expected: u32 },
    #[error("integrity check failed: expected {expected}, got {actual}")]
    IntegrityMismatch { expected: String, actual: String },
    #[error("malformed snapshot: {0}")]
    Malformed(String),
}

/// One cell of a snapshot: where it sits relative to the region start and
/// which palette entry occupies it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellRecord {
    pub offset: IVec3,
    pub block: u32,
}

/// A fixture anchored at an offset inside the snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixtureRecord {
    pub offset: IVec3,
    pub fixture: Fixture,
}

/// Origin-relative record of every cell of a region, air included.
///
/// # Invariants
/// - `cells` covers the full `size` box exactly once, in scan order.
/// - Every `CellRecord::block` indexes into `palette`.
/// - `solid_block_count` equals the number of non-air-like cells.
///
/// Only [`Snapshot::capture`] and [`Snapshot::decode`] build snapshots, and
/// decode checks all of the above.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    size: IVec3,
    palette: Vec<Block>,
    cells: Vec<CellRecord>,
    fixtures: Vec<FixtureRecord>,
    solid_block_count: u32,
}

/// Versioned, integrity-checked wrapper written to bytes.
#[derive(Serialize, Deserialize)]
struct Envelope {
    version: u32,
    sha256: String,
    snapshot: Snapshot,
}

/// What [`Snapshot::place`] wrote.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaceReport {
    pub cells_written: usize,
    pub commit_writes: usize,
    pub fixtures_placed: usize,
}

impl Snapshot {
    /// Record every cell of `region` plus the fixtures anchored inside it.
    pub fn capture<S>(store: &S, region: &Region) -> Self
    where
        S: BlockStore + ?Sized,
    {
        let mut palette = Vec::new();
        let mut index: HashMap<Block, u32> = HashMap::new();
        let mut cells = Vec::with_capacity(region.volume());
        let mut solid_block_count = 0u32;

        scan::walk(store, region, |pos, block| {
            if !block.is_air_like() {
                solid_block_count += 1;
            }
            let slot = *index.entry(block.clone()).or_insert_with(|| {
                palette.push(block.clone());
                (palette.len() - 1) as u32
            });
            cells.push(CellRecord {
                offset: region.offset_of(pos),
                block: slot,
            });
        });

        let fixtures = store
            .fixtures_in(region)
            .into_iter()
            .map(|(pos, fixture)| FixtureRecord {
                offset: region.offset_of(pos),
                fixture,
            })
            .collect();

        Self {
            size: region.size(),
            palette,
            cells,
            fixtures,
            solid_block_count,
        }
    }

    pub fn size(&self) -> IVec3 {
        self.size
    }

    pub fn solid_block_count(&self) -> u32 {
        self.solid_block_count
    }

    pub fn cells(&self) -> &[CellRecord] {
        &self.cells
    }

    pub fn palette(&self) -> &[Block] {
        &self.palette
    }

    pub fn fixtures(&self) -> &[FixtureRecord] {
        &self.fixtures
    }

    pub fn block_of(&self, cell: &CellRecord) -> &Block {
        &self.palette[cell.block as usize]
    }

    /// Offsets and blocks of every non-air cell, in scan order.
    pub fn solid_cells(&self) -> impl Iterator<Item = (IVec3, &Block)> + '_ {
        self.cells
            .iter()
            .map(|c| (c.offset, self.block_of(c)))
            .filter(|(_, b)| !b.is_air_like())
    }

    /// Start position that centres the snapshot's footprint on `anchor`
    /// with its bottom layer at `anchor.y`.
    pub fn bottom_center_origin(&self, anchor: BlockPos) -> BlockPos {
        anchor - IVec3::new(self.size.x / 2, 0, self.size.z / 2)
    }

    /// Write every recorded cell at `origin + offset`, replacing whatever
    /// is there, then commit, then place fixtures.
    ///
    /// Fixtures are only placed once the block commit has succeeded.
    pub fn place<S>(&self, store: &mut S, origin: BlockPos) -> Result<PlaceReport, WorldError>
    where
        S: BlockStore + ?Sized,
    {
        for cell in &self.cells {
            store.set_block(origin + cell.offset, self.block_of(cell), WriteMode::Bulk)?;
        }
        let commit_writes = store.commit()?;

        for record in &self.fixtures {
            store.place_fixture(origin + record.offset, record.fixture.clone())?;
        }

        Ok(PlaceReport {
            cells_written: self.cells.len(),
            commit_writes,
            fixtures_placed: self.fixtures.len(),
        })
    }

    /// Encode to CBOR, wrap with version and SHA-256, compress with zstd.
    pub fn encode(&self) -> Result<Vec<u8>, CodecError> {
        let body = cbor_serialize(self)?;
        let envelope = Envelope {
            version: SNAPSHOT_FORMAT_VERSION,
            sha256: sha256_hex(&body),
            snapshot: self.clone(),
        };
        let cbor_bytes = cbor_serialize(&envelope)?;
        zstd_compress(&cbor_bytes)
    }

    /// Inverse of [`Snapshot::encode`]. Fails closed on any mismatch.
    pub fn decode(bytes: &[u8]) -> Result<Self, CodecError> {
        let cbor_bytes = zstd_decompress(bytes)?;
        let envelope: Envelope = cbor_deserialize(&cbor_bytes)?;
        if envelope.version != SNAPSHOT_FORMAT_VERSION {
            return Err(CodecError::Version {
                found: envelope.version,
                expected: SNAPSHOT_FORMAT_VERSION,
            });
        }
        let actual = sha256_hex(&cbor_serialize(&envelope.snapshot)?);
        if actual != envelope.sha256 {
            return Err(CodecError::IntegrityMismatch {
                expected: envelope.sha256,
                actual,
            });
        }
        envelope.snapshot.check()?;
        Ok(envelope.snapshot)
    }

    fn check(&self) -> Result<(), CodecError> {
        if self.size.cmplt(IVec3::ONE).any() {
            return Err(CodecError::Malformed(format!("size {} is empty", self.size)));
        }
        let expected = box_volume(self.size).ok_or_else(|| {
            CodecError::Malformed(format!("size {} is too large", self.size))
        })?;
        if self.cells.len() != expected {
            return Err(CodecError::Malformed(format!(
                "{} cells recorded for a {} box",
                self.cells.len(),
                self.size
            )));
        }
        let bounds = Region::new(IVec3::ZERO, self.size - IVec3::ONE);
        let mut solid = 0u32;
        for cell in &self.cells {
            let block = self.palette.get(cell.block as usize).ok_or_else(|| {
                CodecError::Malformed(format!("palette index {} out of range", cell.block))
            })?;
            if !bounds.contains(cell.offset) {
                return Err(CodecError::Malformed(format!(
                    "cell offset {} outside {}",
                    cell.offset, self.size
                )));
            }
            if !block.is_air_like() {
                solid += 1;
            }
        }
        if solid != self.solid_block_count {
            return Err(CodecError::Malformed(format!(
                "solid count {} recorded, {} found",
                self.solid_block_count, solid
            )));
        }
        if let Some(f) = self.fixtures.iter().find(|f| !bounds.contains(f.offset)) {
            return Err(CodecError::Malformed(format!(
                "fixture offset {} outside {}",
                f.offset, self.size
            )));
        }
        Ok(())
    }

    pub fn summary(&self) -> SnapshotSummary {
        SnapshotSummary {
            size: [self.size.x, self.size.y, self.size.z],
            cells: self.cells.len(),
            solid_block_count: self.solid_block_count,
            palette_len: self.palette.len(),
            fixtures: self.fixtures.len(),
        }
    }
}

/// Summary of a snapshot for inspection tools.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotSummary {
    pub size: [i32; 3],
    pub cells: usize,
    pub solid_block_count: u32,
    pub palette_len: usize,
    pub fixtures: usize,
}

impl fmt::Display for SnapshotSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Snapshot: size={}x{}x{} cells={} solid={} palette={} fixtures={}",
            self.size[0],
            self.size[1],
            self.size[2],
            self.cells,
            self.solid_block_count,
            self.palette_len,
            self.fixtures
        )
    }
}

fn cbor_serialize<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, CodecError> {
    let mut buf = Vec::new();
    ciborium::into_writer(value, &mut buf).map_err(|e| CodecError::CborEncode(e.to_string()))?;
    Ok(buf)
}

fn cbor_deserialize<T: for<'de> Deserialize<'de>>(data: &[u8]) -> Result<T, CodecError> {
    ciborium::from_reader(data).map_err(|e| CodecError::CborDecode(e.to_string()))
}

fn zstd_compress(data: &[u8]) -> Result<Vec<u8>, CodecError> {
    let mut encoder = zstd::Encoder::new(Vec::new(), 3)?;
    encoder.write_all(data)?;
    Ok(encoder.finish()?)
}

fn zstd_decompress(data: &[u8]) -> Result<Vec<u8>, CodecError> {
    let mut decoder = zstd::Decoder::new(data)?;
    let mut buf = Vec::new();
    decoder.read_to_end(&mut buf)?;
    Ok(buf)
}

fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    format!("{:x}", hasher.finalize())
}
