//! In-memory reference collaborators.
//!
//! Stand-ins for the host game services, used by the CLI demo and tests.

use crate::access::{
    Access, Highlighter, Marker, MarkerService, Notice, Notifier, PermissionOracle,
    ResourcePool, Scheduler, TimerHandle, TimerTask, WorldError,
};
use packspace_common::{ActorId, BlockPos, Region};
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

/// Land claims: a claimed box only admits its owner.
#[derive(Debug, Clone, Default)]
pub struct ClaimMap {
    claims: Vec<(Region, ActorId)>,
}

impl ClaimMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn claim(&mut self, region: Region, owner: ActorId) {
        self.claims.push((region, owner));
    }

    pub fn len(&self) -> usize {
        self.claims.len()
    }

    pub fn is_empty(&self) -> bool {
        self.claims.is_empty()
    }
}

impl PermissionOracle for ClaimMap {
    fn can_access(&self, actor: &ActorId, pos: BlockPos, _access: Access) -> bool {
        self.claims
            .iter()
            .filter(|(region, _)| region.contains(pos))
            .all(|(_, owner)| owner == actor)
    }
}

/// Game mode deciding whether costs apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GameMode {
    #[default]
    Survival,
    Creative,
}

#[derive(Debug, Clone, Copy)]
struct PoolState {
    level: f32,
    mode: GameMode,
}

/// Per-actor saturation levels.
///
/// Unknown actors read as an empty survival pool.
#[derive(Debug, Clone, Default)]
pub struct SaturationPools {
    pools: HashMap<ActorId, PoolState>,
}

impl SaturationPools {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, actor: ActorId, level: f32, mode: GameMode) {
        self.pools.insert(actor, PoolState { level, mode });
    }

    pub fn mode(&self, actor: &ActorId) -> GameMode {
        self.pools.get(actor).map(|p| p.mode).unwrap_or_default()
    }
}

impl ResourcePool for SaturationPools {
    fn current_level(&self, actor: &ActorId) -> f32 {
        self.pools.get(actor).map(|p| p.level).unwrap_or(0.0)
    }

    fn reduce(&mut self, actor: &ActorId, amount: f32) {
        if let Some(pool) = self.pools.get_mut(actor) {
            pool.level = (pool.level - amount).max(0.0);
        }
    }

    fn is_gated(&self, actor: &ActorId) -> bool {
        self.mode(actor) == GameMode::Survival
    }
}

/// Whether a delivered message was an error toast or a chat line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Error,
    Info,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivered {
    pub actor: ActorId,
    pub channel: Channel,
    /// Localisation key for errors, `None` for chat lines.
    pub key: Option<&'static str>,
    pub text: String,
}

/// Records every message sent.
#[derive(Debug, Clone, Default)]
pub struct MessageLog {
    delivered: Vec<Delivered>,
}

impl MessageLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn all(&self) -> &[Delivered] {
        &self.delivered
    }

    pub fn errors_for(&self, actor: &ActorId) -> Vec<&Delivered> {
        self.filtered(actor, Channel::Error)
    }

    pub fn infos_for(&self, actor: &ActorId) -> Vec<&Delivered> {
        self.filtered(actor, Channel::Info)
    }

    pub fn clear(&mut self) {
        self.delivered.clear();
    }

    fn filtered(&self, actor: &ActorId, channel: Channel) -> Vec<&Delivered> {
        self.delivered
            .iter()
            .filter(|d| &d.actor == actor && d.channel == channel)
            .collect()
    }
}

impl Notifier for MessageLog {
    fn send_error(&mut self, actor: &ActorId, notice: &Notice) {
        self.delivered.push(Delivered {
            actor: actor.clone(),
            channel: Channel::Error,
            key: Some(notice.key),
            text: notice.text.clone(),
        });
    }

    fn send_info(&mut self, actor: &ActorId, message: &str) {
        self.delivered.push(Delivered {
            actor: actor.clone(),
            channel: Channel::Info,
            key: None,
            text: message.to_string(),
        });
    }
}

/// Map markers for all actors.
#[derive(Debug, Clone, Default)]
pub struct MarkerBoard {
    markers: Vec<Marker>,
    /// Simulates the map service being down.
    pub offline: bool,
}

impl MarkerBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.markers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }

    fn ensure_online(&self) -> Result<(), WorldError> {
        if self.offline {
            return Err(WorldError::MarkerUnavailable("map layer offline".into()));
        }
        Ok(())
    }
}

impl MarkerService for MarkerBoard {
    fn add_marker(&mut self, _actor: &ActorId, marker: Marker) -> Result<(), WorldError> {
        self.ensure_online()?;
        self.markers.push(marker);
        Ok(())
    }

    fn remove_marker(&mut self, actor: &ActorId, title: &str) -> Result<usize, WorldError> {
        self.ensure_online()?;
        let before = self.markers.len();
        self.markers
            .retain(|m| !(&m.owner == actor && m.title == title));
        Ok(before - self.markers.len())
    }

    fn list_owned_markers(&self, actor: &ActorId) -> Vec<Marker> {
        self.markers
            .iter()
            .filter(|m| &m.owner == actor)
            .cloned()
            .collect()
    }
}

/// What each actor currently sees highlighted, per slot.
#[derive(Debug, Clone, Default)]
pub struct HighlightBoard {
    shown: HashMap<(ActorId, u32), (Vec<BlockPos>, Vec<u32>)>,
    render_calls: usize,
}

impl HighlightBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cells currently highlighted for `actor` in `slot`.
    pub fn cells(&self, actor: &ActorId, slot: u32) -> &[BlockPos] {
        self.shown
            .get(&(actor.clone(), slot))
            .map(|(cells, _)| cells.as_slice())
            .unwrap_or(&[])
    }

    pub fn colors(&self, actor: &ActorId, slot: u32) -> &[u32] {
        self.shown
            .get(&(actor.clone(), slot))
            .map(|(_, colors)| colors.as_slice())
            .unwrap_or(&[])
    }

    /// Number of highlight calls received, including clears.
    pub fn render_calls(&self) -> usize {
        self.render_calls
    }
}

impl Highlighter for HighlightBoard {
    fn highlight(&mut self, actor: &ActorId, slot: u32, cells: &[BlockPos], colors: &[u32]) {
        self.render_calls += 1;
        let k = (actor.clone(), slot);
        if cells.is_empty() {
            self.shown.remove(&k);
        } else {
            self.shown.insert(k, (cells.to_vec(), colors.to_vec()));
        }
    }
}

/// Timer queue driven by an explicit virtual clock.
///
/// Nothing fires on its own: [`ManualScheduler::advance`] moves the clock
/// and hands back every task that came due, oldest deadline first.
#[derive(Debug, Clone, Default)]
pub struct ManualScheduler {
    now: Duration,
    next_id: u64,
    pending: BTreeMap<TimerHandle, (Duration, TimerTask)>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn now(&self) -> Duration {
        self.now
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn advance(&mut self, elapsed: Duration) -> Vec<(TimerHandle, TimerTask)> {
        self.now += elapsed;
        let now = self.now;
        let mut due: Vec<(Duration, TimerHandle)> = self
            .pending
            .iter()
            .filter(|(_, (at, _))| *at <= now)
            .map(|(handle, (at, _))| (*at, *handle))
            .collect();
        due.sort();
        due.into_iter()
            .filter_map(|(_, handle)| {
                self.pending
                    .remove(&handle)
                    .map(|(_, task)| (handle, task))
            })
            .collect()
    }
}

impl Scheduler for ManualScheduler {
    fn schedule(&mut self, delay: Duration, task: TimerTask) -> TimerHandle {
        self.next_id += 1;
        let handle = TimerHandle(self.next_id);
        self.pending.insert(handle, (self.now + delay, task));
        handle
    }

    fn cancel(&mut self, handle: TimerHandle) -> bool {
        self.pending.remove(&handle).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::IVec3;

    fn alice() -> ActorId {
        ActorId::new("alice")
    }

    fn bob() -> ActorId {
        ActorId::new("bob")
    }

    #[test]
    fn claims_admit_owner_only() {
        let mut claims = ClaimMap::new();
        claims.claim(Region::new(IVec3::ZERO, IVec3::splat(3)), alice());
        let inside = IVec3::ONE;
        assert!(claims.can_access(&alice(), inside, Access::BuildOrBreak));
        assert!(!claims.can_access(&bob(), inside, Access::BuildOrBreak));
        assert!(claims.can_access(&bob(), IVec3::splat(10), Access::BuildOrBreak));
    }

    #[test]
    fn pools_gate_by_mode() {
        let mut pools = SaturationPools::new();
        pools.set(alice(), 50.0, GameMode::Survival);
        pools.set(bob(), 0.0, GameMode::Creative);
        assert!(pools.is_gated(&alice()));
        assert!(!pools.is_gated(&bob()));

        pools.reduce(&alice(), 20.0);
        assert_eq!(pools.current_level(&alice()), 30.0);
        pools.reduce(&alice(), 100.0);
        assert_eq!(pools.current_level(&alice()), 0.0);
    }

    #[test]
    fn message_log_separates_channels() {
        let mut log = MessageLog::new();
        log.send_error(
            &alice(),
            &Notice {
                key: "test:err",
                args: vec![],
                text: "nope".into(),
            },
        );
        log.send_info(&alice(), "hello");
        log.send_info(&bob(), "hi");
        assert_eq!(log.errors_for(&alice()).len(), 1);
        assert_eq!(log.errors_for(&alice())[0].key, Some("test:err"));
        assert_eq!(log.infos_for(&alice()).len(), 1);
        assert_eq!(log.infos_for(&bob()).len(), 1);
    }

    #[test]
    fn marker_board_scopes_by_owner() {
        let mut board = MarkerBoard::new();
        let marker = |owner: ActorId| Marker {
            title: "Tent".into(),
            position: IVec3::ZERO,
            icon: "home".into(),
            color: "dodgerblue".into(),
            pinned: false,
            owner,
        };
        board.add_marker(&alice(), marker(alice())).unwrap();
        board.add_marker(&bob(), marker(bob())).unwrap();

        assert_eq!(board.remove_marker(&alice(), "Tent").unwrap(), 1);
        assert!(board.list_owned_markers(&alice()).is_empty());
        assert_eq!(board.list_owned_markers(&bob()).len(), 1);

        board.offline = true;
        assert!(board.remove_marker(&bob(), "Tent").is_err());
    }

    #[test]
    fn highlight_board_clears_on_empty() {
        let mut board = HighlightBoard::new();
        board.highlight(&alice(), 7, &[IVec3::ZERO], &[0xFF]);
        assert_eq!(board.cells(&alice(), 7), &[IVec3::ZERO]);
        board.highlight(&alice(), 7, &[], &[]);
        assert!(board.cells(&alice(), 7).is_empty());
        assert_eq!(board.render_calls(), 2);
    }

    #[test]
    fn scheduler_fires_due_tasks_once() {
        let mut sched = ManualScheduler::new();
        let task = TimerTask::ClearHighlight {
            actor: alice(),
            slot: 1,
        };
        let h1 = sched.schedule(Duration::from_millis(100), task.clone());
        let h2 = sched.schedule(Duration::from_millis(50), task.clone());

        assert!(sched.advance(Duration::from_millis(10)).is_empty());
        let fired = sched.advance(Duration::from_millis(100));
        let handles: Vec<_> = fired.iter().map(|(h, _)| *h).collect();
        assert_eq!(handles, vec![h2, h1]);
        assert!(sched.advance(Duration::from_secs(10)).is_empty());
    }

    #[test]
    fn scheduler_cancel_is_safe() {
        let mut sched = ManualScheduler::new();
        let h = sched.schedule(
            Duration::from_millis(5),
            TimerTask::ClearHighlight {
                actor: alice(),
                slot: 1,
            },
        );
        assert!(sched.cancel(h));
        assert!(!sched.cancel(h));
        assert!(!sched.cancel(TimerHandle(999)));
        assert!(sched.advance(Duration::from_secs(1)).is_empty());
    }
}
