//! The pack/unpack orchestrator.
//!
//! One call to [`PackPipeline::interact`] validates, then mutates. Nothing is
//! written to the world, the item or the actor's pool unless validation
//! passed, and a rejected call sends exactly one notice.

use crate::highlight::HighlightFeedback;
use crate::item::CarriedItem;
use crate::ledger::Charge;
use crate::notice::FailureKind;
use crate::policy::BlockPolicy;
use crate::validate::{Surroundings, Validation, Validator};
use glam::IVec3;
use packspace_common::{ActorId, BlockPos, ConfigError, PackConfig, Region, SnapshotId};
use packspace_kernel::{
    BlockStore, Highlighter, Marker, MarkerService, Notifier, PermissionOracle, ResourcePool,
    Scheduler, TimerHandle, TimerTask, WorldError, scan,
};
use packspace_persist::{ArchiveError, CodecError, Snapshot, SnapshotArchive, SnapshotHistory};

/// Errors that abort an invocation after validation passed.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("world error: {0}")]
    World(#[from] WorldError),
    #[error("snapshot encoding failed: {0}")]
    Codec(#[from] CodecError),
    #[error("archive error: {0}")]
    Archive(#[from] ArchiveError),
}

/// Host collaborators for one invocation.
pub struct Host<'a> {
    pub store: &'a mut dyn BlockStore,
    pub permissions: &'a dyn PermissionOracle,
    pub pool: &'a mut dyn ResourcePool,
    pub notifier: &'a mut dyn Notifier,
    /// Absent when the host has no map.
    pub markers: Option<&'a mut dyn MarkerService>,
    pub highlighter: &'a mut dyn Highlighter,
    pub scheduler: &'a mut dyn Scheduler,
}

/// What an invocation did.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Packed {
        id: SnapshotId,
        region: Region,
        solid_block_count: u32,
        charged: f32,
    },
    Unpacked {
        origin: BlockPos,
        solid_block_count: u32,
        charged: f32,
    },
    Rejected(FailureKind),
}

/// Marker title for an actor's unpacked snapshot.
pub fn marker_title(actor: &ActorId) -> String {
    format!("Tent {actor}")
}

/// Box validated before unpacking: the configured `region` grown to cover
/// every cell the snapshot writes at `origin`. Its lowest plane stays the
/// ground plane under the footprint.
fn footprint_check_region(region: &Region, origin: BlockPos, size: IVec3) -> Region {
    let footprint = Region::new(origin, origin + size - IVec3::ONE);
    Region::new(
        region.start.min(footprint.start - IVec3::Y),
        region.end.max(footprint.end),
    )
}

/// Owns everything that outlives a single invocation: config, archive,
/// per-actor history and highlight timers.
#[derive(Debug)]
pub struct PackPipeline {
    config: PackConfig,
    policy: BlockPolicy,
    archive: SnapshotArchive,
    history: SnapshotHistory,
    feedback: HighlightFeedback,
}

impl PackPipeline {
    pub fn new(config: PackConfig, archive: SnapshotArchive) -> Result<Self, ConfigError> {
        config.validate()?;
        let policy = BlockPolicy::from_config(&config)?;
        let feedback = HighlightFeedback::new(config.highlight_argb()?);
        Ok(Self {
            config,
            policy,
            archive,
            history: SnapshotHistory::new(),
            feedback,
        })
    }

    pub fn config(&self) -> &PackConfig {
        &self.config
    }

    pub fn archive(&self) -> &SnapshotArchive {
        &self.archive
    }

    pub fn history(&self) -> &SnapshotHistory {
        &self.history
    }

    pub fn highlight_pending(&self, actor: &ActorId) -> Option<TimerHandle> {
        self.feedback.pending(actor)
    }

    fn validator(&self) -> Validator<'_> {
        Validator {
            policy: &self.policy,
            build_effort: self.config.build_effort,
            require_solid_ground: self.config.require_solid_ground,
        }
    }

    /// Cells below the target's surface offset: 1 when the target itself is
    /// a plant or rock sitting on the ground.
    fn surface_offset(&self, store: &dyn BlockStore, target: BlockPos) -> i32 {
        i32::from(self.policy.is_plant_or_rock_like(&store.block_at(target)))
    }

    /// Region captured when packing at `target`.
    pub fn pack_region(&self, store: &dyn BlockStore, target: BlockPos) -> Region {
        let r = self.config.max_radius;
        let y = self.surface_offset(store, target);
        let floor_shift = if self.config.grab_floor { -1 } else { 0 };
        Region::around(target, r, 1 - y + floor_shift, self.config.effective_height())
    }

    /// Region checked when unpacking at `target`, before it is grown to the
    /// snapshot's footprint. Its lowest plane is the ground the snapshot will
    /// stand on.
    pub fn unpack_region(&self, store: &dyn BlockStore, target: BlockPos) -> Region {
        let r = self.config.max_radius;
        let y = self.surface_offset(store, target);
        Region::around(target, r, -y, self.config.effective_height())
    }

    /// Pack when the item carries no payload, unpack otherwise.
    pub fn interact(
        &mut self,
        host: &mut Host<'_>,
        actor: &ActorId,
        target: BlockPos,
        item: &mut CarriedItem,
    ) -> Result<Outcome, PipelineError> {
        match item.payload().map(<[u8]>::to_vec) {
            None => self.try_pack(host, actor, target, item),
            Some(payload) => self.try_unpack(host, actor, target, item, &payload),
        }
    }

    pub fn try_pack(
        &mut self,
        host: &mut Host<'_>,
        actor: &ActorId,
        target: BlockPos,
        item: &mut CarriedItem,
    ) -> Result<Outcome, PipelineError> {
        let _span = tracing::info_span!("pack", %actor, ?target).entered();
        let region = self.pack_region(&*host.store, target);

        let around = Surroundings {
            store: &*host.store,
            permissions: host.permissions,
            pool: &*host.pool,
        };
        let validation = self
            .validator()
            .can_pack(actor, &region, around, &mut *host.notifier);
        if let Some(rejected) = self.reject(host, actor, validation.clone()) {
            return Ok(rejected);
        }
        let solid = validation.solid_block_count;

        let snapshot = Snapshot::capture(&*host.store, &region);
        let bytes = snapshot.encode()?;

        let id = SnapshotId::new();
        self.archive.save(actor, id, &bytes)?;
        self.history.record(actor, id);
        let evicted = self
            .history
            .enforce_limit(actor, self.config.max_history, &self.archive);
        if !evicted.is_empty() {
            tracing::debug!(evicted = evicted.len(), "history trimmed");
        }

        if !self.config.copy_mode {
            scan::clear_area(&mut *host.store, &region)?;
        }

        *item = CarriedItem::packed(bytes, solid);

        let charge = Charge::new(actor, solid, self.config.build_effort);
        let cost = charge.amount();
        let charged = charge.settle(&mut *host.pool);

        if let Some(markers) = host.markers.as_deref_mut() {
            if let Err(e) = markers.remove_marker(actor, &marker_title(actor)) {
                tracing::warn!(error = %e, "could not remove location marker");
            }
        }

        self.chat(
            host,
            actor,
            &format!("Packed {solid} blocks, consumed {cost} saturation."),
        );
        tracing::info!(%id, %region, solid, charged, "packed");
        Ok(Outcome::Packed {
            id,
            region,
            solid_block_count: solid,
            charged,
        })
    }

    pub fn try_unpack(
        &mut self,
        host: &mut Host<'_>,
        actor: &ActorId,
        target: BlockPos,
        item: &mut CarriedItem,
        payload: &[u8],
    ) -> Result<Outcome, PipelineError> {
        let _span = tracing::info_span!("unpack", %actor, ?target).entered();
        let region = self.unpack_region(&*host.store, target);

        let snapshot = match Snapshot::decode(payload) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                tracing::warn!(error = %e, "payload could not be decoded");
                let kind = FailureKind::SnapshotDecodeFailure;
                host.notifier.send_error(actor, &kind.notice());
                return Ok(Outcome::Rejected(kind));
            }
        };
        let solid = snapshot.solid_block_count();
        if item.solid_block_count() != solid {
            tracing::warn!(
                carried = item.solid_block_count(),
                verified = solid,
                "carried solid count disagrees with snapshot"
            );
        }

        let anchor = IVec3::new(target.x, region.start.y + 1, target.z);
        let origin = snapshot.bottom_center_origin(anchor);
        let checked = footprint_check_region(&region, origin, snapshot.size());

        let around = Surroundings {
            store: &*host.store,
            permissions: host.permissions,
            pool: &*host.pool,
        };
        let validation = self
            .validator()
            .can_unpack(actor, &checked, solid, around, &mut *host.notifier);
        if let Some(rejected) = self.reject(host, actor, validation) {
            return Ok(rejected);
        }

        let report = snapshot.place(&mut *host.store, origin)?;
        tracing::debug!(?report, "snapshot placed");

        *item = CarriedItem::empty();

        if self.config.drop_marker_on_unpack {
            if let Some(markers) = host.markers.as_deref_mut() {
                let marker = Marker {
                    title: marker_title(actor),
                    position: target,
                    icon: self.config.marker_icon.clone(),
                    color: self.config.marker_color.clone(),
                    pinned: self.config.pin_marker,
                    owner: actor.clone(),
                };
                if let Err(e) = markers.add_marker(actor, marker) {
                    tracing::warn!(error = %e, "could not add location marker");
                }
            }
        }

        let charge = Charge::new(actor, solid, self.config.build_effort);
        let cost = charge.amount();
        let charged = charge.settle(&mut *host.pool);

        self.chat(
            host,
            actor,
            &format!("Unpacked {solid} blocks, consumed {cost} saturation."),
        );
        tracing::info!(?origin, solid, charged, "unpacked");
        Ok(Outcome::Unpacked {
            origin,
            solid_block_count: solid,
            charged,
        })
    }

    /// Route a fired timer. Returns whether it was still current.
    pub fn on_timer(&mut self, host: &mut Host<'_>, handle: TimerHandle, task: &TimerTask) -> bool {
        self.feedback.expire(handle, task, &mut *host.highlighter)
    }

    fn reject(
        &mut self,
        host: &mut Host<'_>,
        actor: &ActorId,
        validation: Validation,
    ) -> Option<Outcome> {
        self.feedback.show(
            actor,
            &validation.violations,
            &mut *host.highlighter,
            &mut *host.scheduler,
        );
        if validation.passed {
            return None;
        }
        // A failed validation always names a failure kind.
        let kind = validation.failure.unwrap_or(FailureKind::EmptyRegion);
        Some(Outcome::Rejected(kind))
    }

    fn chat(&self, host: &mut Host<'_>, actor: &ActorId, message: &str) {
        if self.config.show_chat_notification {
            host.notifier.send_info(actor, message);
        }
    }
}
