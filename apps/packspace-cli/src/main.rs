use anyhow::Context;
use clap::{Parser, Subcommand};
use glam::IVec3;
use packspace_author::{CarriedItem, Host, Outcome, PackPipeline};
use packspace_common::{ActorId, Block, PackConfig, Region};
use packspace_kernel::{
    ClaimMap, GameMode, HighlightBoard, ManualScheduler, MarkerBoard, MarkerService, MessageLog,
    ResourcePool, SaturationPools, VoxelWorld,
};
use packspace_persist::{Snapshot, SnapshotArchive};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "packspace-cli", about = "CLI tool for packspace operations")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print version and default settings
    Info,
    /// Pack a small build and unpack it elsewhere in an in-memory world
    Demo {
        /// Config file; defaults are used when omitted
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Directory for archived snapshots
        #[arg(short, long)]
        archive: Option<PathBuf>,
        /// Starting saturation of the demo actor
        #[arg(short, long, default_value = "1500")]
        saturation: f32,
    },
    /// Decode an archived snapshot file and print its contents
    Inspect {
        /// Path to a .snapshot.cbor.zst file
        file: PathBuf,
    },
    /// Print the default config, or validate a config file
    Config {
        /// Config file to validate
        file: Option<PathBuf>,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    match cli.command {
        Commands::Info => {
            let config = PackConfig::default();
            println!("packspace-cli v{}", env!("CARGO_PKG_VERSION"));
            println!(
                "snapshot format: v{}",
                packspace_persist::SNAPSHOT_FORMAT_VERSION
            );
            println!(
                "defaults: radius={}, height={}, effort={}, history={}",
                config.max_radius, config.max_height, config.build_effort, config.max_history
            );
            println!("banned patterns: {}", config.banned_blocks.len());
        }
        Commands::Demo {
            config,
            archive,
            saturation,
        } => {
            let config = match config {
                Some(path) => PackConfig::load(&path)
                    .with_context(|| format!("loading config {}", path.display()))?,
                None => PackConfig::default(),
            };
            let archive_dir =
                archive.unwrap_or_else(|| std::env::temp_dir().join("packspace-demo"));
            run_demo(config, archive_dir, saturation)?;
        }
        Commands::Inspect { file } => {
            let bytes =
                std::fs::read(&file).with_context(|| format!("reading {}", file.display()))?;
            let snapshot = Snapshot::decode(&bytes)
                .with_context(|| format!("decoding {}", file.display()))?;
            println!("{}", snapshot.summary());
            for (i, block) in snapshot.palette().iter().enumerate() {
                println!("  [{i}] {} (replaceable {})", block.code, block.replaceable);
            }
            for record in snapshot.fixtures() {
                println!("  fixture {} at {}", record.fixture.kind, record.offset);
            }
        }
        Commands::Config { file } => match file {
            Some(path) => {
                PackConfig::load(&path)
                    .with_context(|| format!("validating {}", path.display()))?;
                println!("{}: OK", path.display());
            }
            None => println!("{}", PackConfig::default().to_json_pretty()?),
        },
    }

    Ok(())
}

/// In-memory host for the demo.
struct DemoHost {
    world: VoxelWorld,
    claims: ClaimMap,
    pools: SaturationPools,
    log: MessageLog,
    markers: MarkerBoard,
    board: HighlightBoard,
    sched: ManualScheduler,
}

impl DemoHost {
    fn host(&mut self) -> Host<'_> {
        Host {
            store: &mut self.world,
            permissions: &self.claims,
            pool: &mut self.pools,
            notifier: &mut self.log,
            markers: Some(&mut self.markers),
            highlighter: &mut self.board,
            scheduler: &mut self.sched,
        }
    }
}

fn run_demo(config: PackConfig, archive_dir: PathBuf, saturation: f32) -> anyhow::Result<()> {
    let radius = config.max_radius;
    let height = config.effective_height();
    let archive = SnapshotArchive::open(&archive_dir)
        .with_context(|| format!("opening archive {}", archive_dir.display()))?;
    let mut pipeline = PackPipeline::new(config, archive)?;

    let actor = ActorId::new("demo");
    let mut pools = SaturationPools::new();
    pools.set(actor.clone(), saturation, GameMode::Survival);
    let mut env = DemoHost {
        world: VoxelWorld::new(),
        claims: ClaimMap::new(),
        pools,
        log: MessageLog::new(),
        markers: MarkerBoard::new(),
        board: HighlightBoard::new(),
        sched: ManualScheduler::new(),
    };

    // Ground plane wide enough for both sites, and a small hut at the origin.
    let extent = radius + 24;
    env.world.fill(
        &Region::new(IVec3::new(-extent, 0, -extent), IVec3::new(extent, 0, extent)),
        &Block::solid("game:soil-medium-none".parse()?),
    );
    let planks = Block::solid("game:planks-oak".parse()?);
    let walls = Region::new(IVec3::new(-1, 1, -1), IVec3::new(1, height.min(3), 1));
    for pos in walls.positions() {
        if pos != IVec3::new(0, 1, 0) && pos != IVec3::new(0, 2, 0) {
            env.world.put(pos, planks.clone());
        }
    }
    let ground = (2 * extent as usize + 1).pow(2);
    println!("Built hut: {} blocks", env.world.block_count() - ground);

    let mut item = CarriedItem::empty();
    let sites = [IVec3::ZERO, IVec3::new(12, 0, 0)];

    let packed = pipeline.interact(&mut env.host(), &actor, sites[0], &mut item)?;
    report("pack", &packed);

    // Something in the way at the new site, then clear it.
    let obstacle = IVec3::new(12, 2, 0);
    env.world.put(obstacle, planks);
    let blocked = pipeline.interact(&mut env.host(), &actor, sites[1], &mut item)?;
    report("unpack (blocked)", &blocked);

    for (handle, task) in env.sched.advance(Duration::from_secs(3)) {
        pipeline.on_timer(&mut env.host(), handle, &task);
    }
    env.world.put(obstacle, Block::air());

    let unpacked = pipeline.interact(&mut env.host(), &actor, sites[1], &mut item)?;
    report("unpack", &unpacked);

    for message in env.log.all() {
        println!("  [{:?}] {}", message.channel, message.text);
    }
    println!(
        "Markers: {}, history: {}, saturation left: {}",
        env.markers.list_owned_markers(&actor).len(),
        pipeline.history().len(&actor),
        env.pools.current_level(&actor)
    );
    println!("Archive: {}", pipeline.archive().root().display());
    Ok(())
}

fn report(step: &str, outcome: &Outcome) {
    match outcome {
        Outcome::Packed {
            id,
            region,
            solid_block_count,
            charged,
        } => println!("{step}: packed {solid_block_count} blocks from {region} as {id} (charged {charged})"),
        Outcome::Unpacked {
            origin,
            solid_block_count,
            charged,
        } => println!("{step}: unpacked {solid_block_count} blocks at {origin} (charged {charged})"),
        Outcome::Rejected(kind) => println!("{step}: rejected ({kind})"),
    }
}
