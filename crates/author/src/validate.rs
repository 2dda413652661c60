//! Pre-flight checks for pack and unpack.
//!
//! Both checks walk the whole region without stopping early so every
//! offending cell ends up in the violation set. At most one notice goes out
//! per call: the first failure detected wins.

use crate::ledger;
use crate::notice::{Direction, FailureKind};
use crate::policy::BlockPolicy;
use packspace_common::{ActorId, BlockPos, Region};
use packspace_kernel::{Access, BlockStore, Notifier, PermissionOracle, ResourcePool, scan};

/// Read-only view of the collaborators a validation needs.
#[derive(Clone, Copy)]
pub struct Surroundings<'a> {
    pub store: &'a dyn BlockStore,
    pub permissions: &'a dyn PermissionOracle,
    pub pool: &'a dyn ResourcePool,
}

/// Result of one validation pass.
#[derive(Debug, Clone, PartialEq)]
pub struct Validation {
    pub passed: bool,
    /// True count for pack, even on failure; the snapshot's count for unpack.
    pub solid_block_count: u32,
    /// Offending cells in scan order.
    pub violations: Vec<BlockPos>,
    pub failure: Option<FailureKind>,
}

/// Accumulator threaded through the scan.
#[derive(Debug, Default)]
struct Tally {
    solid: u32,
    violations: Vec<BlockPos>,
    failure: Option<FailureKind>,
    short_of_resources: bool,
}

impl Tally {
    fn flag(&mut self, kind: FailureKind) {
        if self.failure.is_none() {
            self.failure = Some(kind);
        }
    }

    fn violate(&mut self, pos: BlockPos, kind: FailureKind) {
        self.violations.push(pos);
        self.flag(kind);
    }
}

/// Applies [`BlockPolicy`] and resource rules to a region.
#[derive(Debug, Clone, Copy)]
pub struct Validator<'a> {
    pub policy: &'a BlockPolicy,
    pub build_effort: f32,
    pub require_solid_ground: bool,
}

impl Validator<'_> {
    /// Whether `region` may be packed by `actor`.
    ///
    /// Affordability is re-checked after every cell since the cost is only
    /// known once the solid blocks have been counted.
    pub fn can_pack(
        &self,
        actor: &ActorId,
        region: &Region,
        around: Surroundings<'_>,
        notifier: &mut dyn Notifier,
    ) -> Validation {
        let gated = around.pool.is_gated(actor);
        let level = around.pool.current_level(actor);

        let mut tally = scan::fold(around.store, region, Tally::default(), |mut t, pos, block| {
            if !around.permissions.can_access(actor, pos, Access::BuildOrBreak) {
                t.violate(pos, FailureKind::PermissionDenied);
            } else if self.policy.is_banned(block) {
                t.violate(
                    pos,
                    FailureKind::BannedContent {
                        name: block.display_name(),
                    },
                );
            }

            if !self.policy.is_air_like(block) {
                t.solid += 1;
            }

            if gated && !ledger::can_afford(level, ledger::cost(t.solid, self.build_effort)) {
                t.short_of_resources = true;
                t.flag(FailureKind::InsufficientResources(Direction::Pack));
            }
            t
        });

        if tally.solid == 0 {
            tally.flag(FailureKind::EmptyRegion);
        }
        let passed = !tally.short_of_resources && tally.solid > 0 && tally.violations.is_empty();
        finish(actor, passed, tally, notifier)
    }

    /// Whether a snapshot holding `solid_block_count` solid blocks may be
    /// unpacked into `region`.
    ///
    /// Affordability is known up front, so it is checked once before the
    /// walk and a failure skips the walk entirely.
    pub fn can_unpack(
        &self,
        actor: &ActorId,
        region: &Region,
        solid_block_count: u32,
        around: Surroundings<'_>,
        notifier: &mut dyn Notifier,
    ) -> Validation {
        let cost = ledger::cost(solid_block_count, self.build_effort);
        if around.pool.is_gated(actor) && !ledger::can_afford(around.pool.current_level(actor), cost)
        {
            let tally = Tally {
                solid: solid_block_count,
                failure: Some(FailureKind::InsufficientResources(Direction::Unpack)),
                short_of_resources: true,
                ..Tally::default()
            };
            return finish(actor, false, tally, notifier);
        }

        let seed = Tally {
            solid: solid_block_count,
            ..Tally::default()
        };
        let tally = scan::fold(around.store, region, seed, |mut t, pos, block| {
            if !around.permissions.can_access(actor, pos, Access::BuildOrBreak) {
                t.violate(pos, FailureKind::PermissionDenied);
            } else if region.is_floor(pos) {
                if self.require_solid_ground && !block.solid_top {
                    t.violate(pos, FailureKind::GroundRequirementUnmet);
                }
            } else if !self.policy.is_replaceable(block) {
                t.violate(pos, FailureKind::RegionNotClear);
            }
            t
        });
        let passed = tally.violations.is_empty();
        finish(actor, passed, tally, notifier)
    }
}

fn finish(actor: &ActorId, passed: bool, tally: Tally, notifier: &mut dyn Notifier) -> Validation {
    if let Some(kind) = &tally.failure {
        tracing::debug!(%actor, ?kind, violations = tally.violations.len(), "validation failed");
        notifier.send_error(actor, &kind.notice());
    }
    Validation {
        passed,
        solid_block_count: tally.solid,
        violations: tally.violations,
        failure: tally.failure,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::IVec3;
    use packspace_common::{Block, PackConfig};
    use packspace_kernel::{ClaimMap, GameMode, MessageLog, SaturationPools, VoxelWorld};

    struct Setup {
        world: VoxelWorld,
        claims: ClaimMap,
        pools: SaturationPools,
        log: MessageLog,
        policy: BlockPolicy,
        actor: ActorId,
    }

    impl Setup {
        fn new(level: f32) -> Self {
            let actor = ActorId::new("alice");
            let mut pools = SaturationPools::new();
            pools.set(actor.clone(), level, GameMode::Survival);
            Self {
                world: VoxelWorld::new(),
                claims: ClaimMap::new(),
                pools,
                log: MessageLog::new(),
                policy: BlockPolicy::from_config(&PackConfig::default()).unwrap(),
                actor,
            }
        }

        fn pack(&mut self, region: &Region) -> Validation {
            let around = Surroundings {
                store: &self.world,
                permissions: &self.claims,
                pool: &self.pools,
            };
            let validator = Validator {
                policy: &self.policy,
                build_effort: 2.0,
                require_solid_ground: false,
            };
            validator.can_pack(&self.actor, region, around, &mut self.log)
        }

        fn unpack(&mut self, region: &Region, solid: u32, ground: bool) -> Validation {
            let around = Surroundings {
                store: &self.world,
                permissions: &self.claims,
                pool: &self.pools,
            };
            let validator = Validator {
                policy: &self.policy,
                build_effort: 2.0,
                require_solid_ground: ground,
            };
            validator.can_unpack(&self.actor, region, solid, around, &mut self.log)
        }

        fn error_keys(&self) -> Vec<&'static str> {
            self.log
                .errors_for(&self.actor)
                .iter()
                .filter_map(|d| d.key)
                .collect()
        }
    }

    fn planks() -> Block {
        Block::solid("game:planks-oak".parse().unwrap())
    }

    fn cube() -> Region {
        Region::new(IVec3::ZERO, IVec3::splat(2))
    }

    #[test]
    fn empty_region_fails_with_zero_count() {
        let mut f = Setup::new(100.0);
        let v = f.pack(&cube());
        assert!(!v.passed);
        assert_eq!(v.solid_block_count, 0);
        assert_eq!(v.failure, Some(FailureKind::EmptyRegion));
        assert_eq!(f.error_keys(), vec!["tentbag:empty-build-error"]);
    }

    #[test]
    fn air_like_cells_are_not_solid() {
        let mut f = Setup::new(100.0);
        let mist = Block {
            replaceable: 9600,
            ..planks()
        };
        f.world.put(IVec3::ONE, mist);
        let v = f.pack(&cube());
        assert_eq!(v.failure, Some(FailureKind::EmptyRegion));
    }

    #[test]
    fn full_cube_passes_with_exact_count() {
        let mut f = Setup::new(100.0);
        f.world.fill(&cube(), &planks());
        let v = f.pack(&cube());
        assert!(v.passed);
        assert_eq!(v.solid_block_count, 27);
        assert!(v.violations.is_empty());
        assert!(f.log.all().is_empty());
    }

    #[test]
    fn partial_region_counts_only_solids() {
        let mut f = Setup::new(100.0);
        f.world.put(IVec3::new(0, 0, 0), planks());
        f.world.put(IVec3::new(2, 1, 0), planks());
        f.world
            .put(IVec3::new(1, 2, 1), Block::ground_cover("game:flower-horsetail".parse().unwrap()));
        let v = f.pack(&cube());
        assert!(v.passed);
        assert_eq!(v.solid_block_count, 3);
    }

    #[test]
    fn single_permission_violation_sends_one_notice() {
        let mut f = Setup::new(100.0);
        f.world.fill(&cube(), &planks());
        f.world.put(IVec3::new(2, 2, 2), Block::solid("game:forge".parse().unwrap()));
        let denied = IVec3::new(1, 0, 0);
        f.claims
            .claim(Region::new(denied, denied), ActorId::new("bob"));

        let v = f.pack(&cube());
        assert!(!v.passed);
        assert_eq!(v.failure, Some(FailureKind::PermissionDenied));
        // The forge is banned and highlighted too, but only one notice goes out.
        assert_eq!(v.violations, vec![denied, IVec3::new(2, 2, 2)]);
        assert_eq!(f.error_keys(), vec!["tentbag:permission-error"]);
        assert_eq!(v.solid_block_count, 27);
    }

    #[test]
    fn only_permission_violation_is_sole_cell() {
        let mut f = Setup::new(100.0);
        f.world.fill(&cube(), &planks());
        let denied = IVec3::new(0, 1, 2);
        f.claims
            .claim(Region::new(denied, denied), ActorId::new("bob"));
        let v = f.pack(&cube());
        assert_eq!(v.violations, vec![denied]);
        assert_eq!(f.log.all().len(), 1);
    }

    #[test]
    fn banned_block_names_the_block() {
        let mut f = Setup::new(100.0);
        f.world.put(
            IVec3::ONE,
            Block::solid("game:crop-wheat-3".parse().unwrap()).with_name("Wheat"),
        );
        let v = f.pack(&cube());
        assert_eq!(
            v.failure,
            Some(FailureKind::BannedContent {
                name: "Wheat".into()
            })
        );
        assert_eq!(f.log.errors_for(&f.actor)[0].text, "Cannot pack Wheat.");
    }

    #[test]
    fn pack_runs_out_of_resources_mid_scan() {
        let mut f = Setup::new(10.0);
        f.world.fill(&cube(), &planks());
        let v = f.pack(&cube());
        assert!(!v.passed);
        assert_eq!(
            v.failure,
            Some(FailureKind::InsufficientResources(Direction::Pack))
        );
        // Resource shortfall is not a cell violation, and the count is still true.
        assert!(v.violations.is_empty());
        assert_eq!(v.solid_block_count, 27);
        assert_eq!(f.error_keys(), vec!["tentbag:pack-hunger-error"]);
    }

    #[test]
    fn creative_actor_ignores_cost() {
        let mut f = Setup::new(0.0);
        f.pools.set(f.actor.clone(), 0.0, GameMode::Creative);
        f.world.fill(&cube(), &planks());
        assert!(f.pack(&cube()).passed);
    }

    #[test]
    fn unpack_into_clear_area_passes() {
        let mut f = Setup::new(100.0);
        let floor = Region::new(IVec3::ZERO, IVec3::new(2, 0, 2));
        f.world.fill(&floor, &planks());
        f.world
            .put(IVec3::new(1, 1, 1), Block::ground_cover("game:tallgrass-short".parse().unwrap()));
        let v = f.unpack(&cube(), 12, true);
        assert!(v.passed);
        assert_eq!(v.solid_block_count, 12);
        assert!(f.log.all().is_empty());
    }

    #[test]
    fn unpack_needs_solid_ground() {
        let mut f = Setup::new(100.0);
        let v = f.unpack(&cube(), 5, true);
        assert!(!v.passed);
        assert_eq!(v.failure, Some(FailureKind::GroundRequirementUnmet));
        assert_eq!(v.violations.len(), 9);
        assert!(v.violations.iter().all(|p| p.y == 0));
        assert_eq!(f.error_keys(), vec!["tentbag:solid-ground-error"]);

        // Without the requirement the floor plane is not checked at all.
        f.log.clear();
        assert!(f.unpack(&cube(), 5, false).passed);
    }

    #[test]
    fn unpack_blocked_by_solid() {
        let mut f = Setup::new(100.0);
        f.world.put(IVec3::new(1, 1, 1), planks());
        let v = f.unpack(&cube(), 5, false);
        assert_eq!(v.failure, Some(FailureKind::RegionNotClear));
        assert_eq!(v.violations, vec![IVec3::new(1, 1, 1)]);
    }

    #[test]
    fn unpack_plants_block_when_not_replaceable() {
        let mut f = Setup::new(100.0);
        f.policy = BlockPolicy::from_config(&PackConfig {
            replace_plants_and_rocks: false,
            ..PackConfig::default()
        })
        .unwrap();
        f.world
            .put(IVec3::new(0, 2, 0), Block::ground_cover("game:looseflints".parse().unwrap()));
        assert!(!f.unpack(&cube(), 5, false).passed);
    }

    #[test]
    fn unpack_affordability_short_circuits_walk() {
        let mut f = Setup::new(10.0);
        f.world.put(IVec3::new(1, 1, 1), planks());
        let v = f.unpack(&cube(), 27, true);
        assert!(!v.passed);
        assert_eq!(
            v.failure,
            Some(FailureKind::InsufficientResources(Direction::Unpack))
        );
        assert!(v.violations.is_empty());
        assert_eq!(f.error_keys(), vec!["tentbag:unpack-hunger-error"]);
    }
}
