use packspace_common::{ActorId, BlockPos};
use packspace_kernel::{Highlighter, Scheduler, TimerHandle, TimerTask};
use std::collections::HashMap;
use std::time::Duration;

/// Highlight slot reserved for rejected cells.
pub const HIGHLIGHT_SLOT: u32 = 1337;

/// How long rejected cells stay highlighted.
pub const HIGHLIGHT_CLEAR_DELAY: Duration = Duration::from_millis(2500);

/// Shows offending cells to an actor and clears them after a delay.
///
/// Holds at most one pending clear per actor; a newer highlight cancels the
/// older clear first.
#[derive(Debug)]
pub struct HighlightFeedback {
    color: u32,
    pending: HashMap<ActorId, TimerHandle>,
}

impl HighlightFeedback {
    pub fn new(color: u32) -> Self {
        Self {
            color,
            pending: HashMap::new(),
        }
    }

    pub fn pending(&self, actor: &ActorId) -> Option<TimerHandle> {
        self.pending.get(actor).copied()
    }

    /// Highlight `cells` for `actor`. Returns `false` and does nothing when
    /// there is nothing to show.
    pub fn show(
        &mut self,
        actor: &ActorId,
        cells: &[BlockPos],
        highlighter: &mut dyn Highlighter,
        scheduler: &mut dyn Scheduler,
    ) -> bool {
        if cells.is_empty() {
            return false;
        }
        if let Some(previous) = self.pending.remove(actor) {
            scheduler.cancel(previous);
        }

        let colors = vec![self.color; cells.len()];
        highlighter.highlight(actor, HIGHLIGHT_SLOT, cells, &colors);

        let handle = scheduler.schedule(
            HIGHLIGHT_CLEAR_DELAY,
            TimerTask::ClearHighlight {
                actor: actor.clone(),
                slot: HIGHLIGHT_SLOT,
            },
        );
        self.pending.insert(actor.clone(), handle);
        tracing::debug!(%actor, cells = cells.len(), ?handle, "highlight shown");
        true
    }

    /// Handle a fired clear. Stale handles are ignored.
    pub fn expire(
        &mut self,
        handle: TimerHandle,
        task: &TimerTask,
        highlighter: &mut dyn Highlighter,
    ) -> bool {
        let TimerTask::ClearHighlight { actor, slot } = task;
        if self.pending.get(actor) != Some(&handle) {
            return false;
        }
        self.pending.remove(actor);
        highlighter.highlight(actor, *slot, &[], &[]);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::IVec3;
    use packspace_kernel::{HighlightBoard, ManualScheduler};

    fn alice() -> ActorId {
        ActorId::new("alice")
    }

    #[test]
    fn empty_cells_is_noop() {
        let mut fb = HighlightFeedback::new(0x2FFF_0000);
        let mut board = HighlightBoard::new();
        let mut sched = ManualScheduler::new();
        assert!(!fb.show(&alice(), &[], &mut board, &mut sched));
        assert_eq!(board.render_calls(), 0);
        assert_eq!(sched.pending_count(), 0);
    }

    #[test]
    fn show_then_clear_after_delay() {
        let mut fb = HighlightFeedback::new(0x2FFF_0000);
        let mut board = HighlightBoard::new();
        let mut sched = ManualScheduler::new();
        let cells = [IVec3::ZERO, IVec3::X];

        assert!(fb.show(&alice(), &cells, &mut board, &mut sched));
        assert_eq!(board.render_calls(), 1);
        assert_eq!(board.cells(&alice(), HIGHLIGHT_SLOT), &cells);
        assert_eq!(board.colors(&alice(), HIGHLIGHT_SLOT), &[0x2FFF_0000u32; 2]);

        assert!(sched.advance(Duration::from_millis(2499)).is_empty());
        let fired = sched.advance(Duration::from_millis(1));
        assert_eq!(fired.len(), 1);
        let (handle, task) = &fired[0];
        assert!(fb.expire(*handle, task, &mut board));
        assert!(board.cells(&alice(), HIGHLIGHT_SLOT).is_empty());
        assert_eq!(fb.pending(&alice()), None);
    }

    #[test]
    fn new_highlight_cancels_pending_clear() {
        let mut fb = HighlightFeedback::new(1);
        let mut board = HighlightBoard::new();
        let mut sched = ManualScheduler::new();

        fb.show(&alice(), &[IVec3::ZERO], &mut board, &mut sched);
        let first = fb.pending(&alice()).unwrap();
        sched.advance(Duration::from_secs(1));
        fb.show(&alice(), &[IVec3::Y], &mut board, &mut sched);

        assert_eq!(sched.pending_count(), 1);
        assert_ne!(fb.pending(&alice()), Some(first));

        // The old handle is stale even if a host delivers it late.
        let stale = TimerTask::ClearHighlight {
            actor: alice(),
            slot: HIGHLIGHT_SLOT,
        };
        assert!(!fb.expire(first, &stale, &mut board));
        assert_eq!(board.cells(&alice(), HIGHLIGHT_SLOT), &[IVec3::Y]);
    }

    #[test]
    fn actors_are_independent() {
        let mut fb = HighlightFeedback::new(1);
        let mut board = HighlightBoard::new();
        let mut sched = ManualScheduler::new();
        let bob = ActorId::new("bob");

        fb.show(&alice(), &[IVec3::ZERO], &mut board, &mut sched);
        fb.show(&bob, &[IVec3::ONE], &mut board, &mut sched);
        assert_eq!(sched.pending_count(), 2);
        assert!(fb.pending(&alice()).is_some());
        assert!(fb.pending(&bob).is_some());
    }
}
