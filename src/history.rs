use crate::action::{ActionCtx, ActionId, DispatchEffect, LongBehavior, ShortBehavior};
use crate::shortcut::Modifiers;

enum HistoryStep<S: 'static> {
    Short(Box<dyn ShortBehavior<S>>),
    Long(Box<dyn LongBehavior<S>>),
}

impl<S: 'static> HistoryStep<S> {
    fn revert(&mut self, ctx: &mut ActionCtx<'_, S>) {
        match self {
            HistoryStep::Short(behavior) => behavior.revert(ctx),
            HistoryStep::Long(behavior) => behavior.revert(ctx),
        }
    }

    fn reapply(&mut self, ctx: &mut ActionCtx<'_, S>) {
        match self {
            HistoryStep::Short(behavior) => behavior.reapply(ctx),
            HistoryStep::Long(behavior) => behavior.reapply(ctx),
        }
    }
}

/// One reversible record: the completed action instance itself, which
/// carries whatever data it needs to invert its own effect.
pub struct HistoryEntry<S: 'static> {
    pub id: ActionId,
    step: HistoryStep<S>,
}

impl<S: 'static> HistoryEntry<S> {
    pub fn short(id: ActionId, behavior: Box<dyn ShortBehavior<S>>) -> Self {
        Self { id, step: HistoryStep::Short(behavior) }
    }

    pub fn long(id: ActionId, behavior: Box<dyn LongBehavior<S>>) -> Self {
        Self { id, step: HistoryStep::Long(behavior) }
    }
}

/// Undo/redo stacks of reversible action records. Strict LIFO; entries
/// move between the stacks and are never duplicated.
pub struct ActionHistory<S: 'static> {
    undo_stack: Vec<HistoryEntry<S>>,
    redo_stack: Vec<HistoryEntry<S>>,
}

impl<S: 'static> Default for ActionHistory<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: 'static> ActionHistory<S> {
    pub fn new() -> Self {
        Self { undo_stack: Vec::new(), redo_stack: Vec::new() }
    }

    /// Records a completed undoable action. Any previously undone state
    /// is invalidated: the redo stack is cleared, there is no branching
    /// history.
    pub fn save_step(&mut self, entry: HistoryEntry<S>) {
        self.redo_stack.clear();
        self.undo_stack.push(entry);
    }

    /// Inverts the most recent entry and moves it to the redo stack.
    /// Silent no-op when empty. Effects requested during `revert` are
    /// dropped, not dispatched.
    pub fn undo(&mut self, state: &mut S) -> bool {
        let Some(mut entry) = self.undo_stack.pop() else {
            return false;
        };
        let mut effects: Vec<DispatchEffect> = Vec::new();
        let mut ctx = ActionCtx::new(state, &mut effects, None, Modifiers::empty(), None, false);
        entry.step.revert(&mut ctx);
        log::debug!("undid '{}'", entry.id);
        self.redo_stack.push(entry);
        true
    }

    /// Replays the most recently undone entry and moves it back to the
    /// undo stack. Silent no-op when empty.
    pub fn redo(&mut self, state: &mut S) -> bool {
        let Some(mut entry) = self.redo_stack.pop() else {
            return false;
        };
        let mut effects: Vec<DispatchEffect> = Vec::new();
        let mut ctx = ActionCtx::new(state, &mut effects, None, Modifiers::empty(), None, false);
        entry.step.reapply(&mut ctx);
        log::debug!("redid '{}'", entry.id);
        self.undo_stack.push(entry);
        true
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_len(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_len(&self) -> usize {
        self.redo_stack.len()
    }

    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }
}
