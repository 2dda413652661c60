use packspace_common::ActorId;
use packspace_kernel::ResourcePool;

/// Resource cost of moving `solid_block_count` blocks.
pub fn cost(solid_block_count: u32, build_effort: f32) -> f32 {
    solid_block_count as f32 * build_effort
}

pub fn can_afford(pool: f32, cost: f32) -> bool {
    cost <= pool
}

/// A pending debit against an actor's pool.
///
/// Created once per invocation and consumed by [`Charge::settle`], so the
/// pool is reduced at most once.
#[derive(Debug)]
#[must_use = "a charge does nothing until settled"]
pub struct Charge {
    actor: ActorId,
    amount: f32,
}

impl Charge {
    pub fn new(actor: &ActorId, solid_block_count: u32, build_effort: f32) -> Self {
        Self {
            actor: actor.clone(),
            amount: cost(solid_block_count, build_effort),
        }
    }

    pub fn amount(&self) -> f32 {
        self.amount
    }

    /// Reduce the pool if the actor is cost-gated. Returns the amount taken.
    pub fn settle(self, pool: &mut dyn ResourcePool) -> f32 {
        if !pool.is_gated(&self.actor) {
            tracing::debug!(actor = %self.actor, "not gated, charge skipped");
            return 0.0;
        }
        pool.reduce(&self.actor, self.amount);
        tracing::debug!(actor = %self.actor, amount = self.amount, "charge settled");
        self.amount
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use packspace_kernel::{GameMode, SaturationPools};

    #[test]
    fn cost_is_monotonic() {
        let mut last = 0.0;
        for n in 0..200 {
            let c = cost(n, 1.5);
            assert!(c >= last);
            last = c;
        }
        assert_eq!(cost(27, 2.0), 54.0);
    }

    #[test]
    fn afford_boundary() {
        assert!(can_afford(54.0, 54.0));
        assert!(!can_afford(53.9, 54.0));
        assert!(can_afford(100.0, 0.0));
    }

    #[test]
    fn settle_debits_gated_actor() {
        let actor = ActorId::new("alice");
        let mut pools = SaturationPools::new();
        pools.set(actor.clone(), 100.0, GameMode::Survival);
        let charge = Charge::new(&actor, 27, 2.0);
        assert_eq!(charge.settle(&mut pools), 54.0);
        assert_eq!(pools.current_level(&actor), 46.0);
    }

    #[test]
    fn settle_skips_ungated_actor() {
        let actor = ActorId::new("admin");
        let mut pools = SaturationPools::new();
        pools.set(actor.clone(), 10.0, GameMode::Creative);
        assert_eq!(Charge::new(&actor, 500, 2.0).settle(&mut pools), 0.0);
        assert_eq!(pools.current_level(&actor), 10.0);
    }
}
