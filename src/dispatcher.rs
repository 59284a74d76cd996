use crate::action::{
    ActionCtx, ActionId, ActionPriority, BehaviorInstance, BehaviorKind, DescendantUsability,
    DispatchEffect, LongBehavior, TriggerSnapshot,
};
use crate::context::{ContextId, ContextTree};
use crate::history::{ActionHistory, HistoryEntry};
use crate::registry::ActionRegistry;
use crate::shortcut::{Modifiers, Shortcut};
use glam::Vec2;
use log::debug;
use smallvec::SmallVec;
use std::cmp::Reverse;
use std::collections::HashSet;
use std::sync::Arc;

/// Collaborator that knows which context currently has UI focus. Queried
/// once per tick by the dispatcher.
pub trait FocusTracker {
    fn current_context(&self) -> ContextId;
}

/// A fixed focus; convenient for tests and headless harnesses.
impl FocusTracker for ContextId {
    fn current_context(&self) -> ContextId {
        *self
    }
}

/// Modifier snapshot with edge state, refreshed once per tick after
/// resolution so the next tick's filtering sees fresh state.
#[derive(Debug, Clone, Copy, Default)]
pub struct ModifierState {
    pub held: Modifiers,
    pub pressed: Modifiers,
    pub released: Modifiers,
}

/// Per-tick input snapshot supplied by the host. Modifier state arrives
/// here as an explicit parameter; the dispatcher never polls a device.
#[derive(Debug, Clone, Copy, Default)]
pub struct TickFrame {
    pub modifiers: Modifiers,
    pub cursor: Option<Vec2>,
}

/// What a tick did, for hosts and tests.
#[derive(Debug, Clone, Default)]
pub struct TickReport {
    pub executed: Vec<ActionId>,
    pub began: Vec<ActionId>,
    pub finished: Vec<ActionId>,
    pub cancelled: Vec<ActionId>,
}

const RANK_FORCED: u8 = 3;

fn priority_rank(priority: ActionPriority) -> u8 {
    match priority {
        ActionPriority::Low => 0,
        ActionPriority::Normal => 1,
        ActionPriority::High => 2,
    }
}

struct Pending {
    id: ActionId,
    rank: u8,
    seq: u64,
}

struct ActiveLong<S: 'static> {
    id: ActionId,
    context: ContextId,
    kind: BehaviorKind,
    undoable: bool,
    /// Registered this tick; first update happens next tick.
    fresh: bool,
    trigger: TriggerSnapshot,
    behavior: Box<dyn LongBehavior<S>>,
}

enum Outcome {
    Update,
    Cancel,
    Finish,
}

/// The runtime engine: consumes shortcut press/release events, arbitrates
/// per tick between competing candidates, runs short actions, drives long
/// action lifecycles and feeds the undo history.
///
/// Single-threaded and tick-driven; the pending queues and the active
/// long-action table are owned exclusively by this struct.
pub struct Dispatcher<S: 'static> {
    registry: ActionRegistry<S>,
    tree: Arc<ContextTree>,
    history: ActionHistory<S>,
    current: ContextId,
    pending: Vec<(Shortcut, SmallVec<[Pending; 4]>)>,
    active: Vec<ActiveLong<S>>,
    held_bindings: HashSet<String>,
    modifiers: ModifierState,
    cursor: Option<Vec2>,
    seq: u64,
    effects: Vec<DispatchEffect>,
}

impl<S: 'static> Dispatcher<S> {
    pub fn new(registry: ActionRegistry<S>, initial_context: ContextId) -> Self {
        let tree = registry.tree().clone();
        Self {
            registry,
            tree,
            history: ActionHistory::new(),
            current: initial_context,
            pending: Vec::new(),
            active: Vec::new(),
            held_bindings: HashSet::new(),
            modifiers: ModifierState::default(),
            cursor: None,
            seq: 0,
            effects: Vec::new(),
        }
    }

    pub fn current_context(&self) -> ContextId {
        self.current
    }

    pub fn registry(&self) -> &ActionRegistry<S> {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut ActionRegistry<S> {
        &mut self.registry
    }

    pub fn history(&self) -> &ActionHistory<S> {
        &self.history
    }

    pub fn history_mut(&mut self) -> &mut ActionHistory<S> {
        &mut self.history
    }

    pub fn modifier_state(&self) -> ModifierState {
        self.modifiers
    }

    pub fn is_long_active(&self, id: ActionId) -> bool {
        self.active.iter().any(|active| active.id == id)
    }

    pub fn active_long_ids(&self) -> Vec<ActionId> {
        self.active.iter().map(|active| active.id).collect()
    }

    /// A physical binding went down. Candidates whose effective shortcut
    /// uses this binding and whose required modifiers are currently held
    /// are enqueued for the next tick's resolution.
    pub fn press(&mut self, binding: &str) {
        let binding = binding.to_lowercase();
        self.held_bindings.insert(binding.clone());
        let held = self.modifiers.held;
        let mut hits: Vec<(Shortcut, ActionId, u8)> = Vec::new();
        for desc in self.registry.iter() {
            let Some(shortcut) = desc.effective_shortcut() else { continue };
            if shortcut.binding != binding || !shortcut.satisfied_by(held) {
                continue;
            }
            let rank = if desc.forced_conflict {
                RANK_FORCED
            } else {
                priority_rank(desc.priority)
            };
            hits.push((shortcut.clone(), desc.id, rank));
        }
        for (shortcut, id, rank) in hits {
            self.enqueue(shortcut, id, rank);
        }
    }

    pub fn release(&mut self, binding: &str) {
        self.held_bindings.remove(&binding.to_lowercase());
    }

    /// Explicit invocation: enqueues in the forced lane, above High.
    /// Context reachability still applies at resolution time.
    pub fn force_execute(&mut self, id: ActionId) {
        if self.registry.lookup(id).is_none() {
            log::warn!("force_execute: unknown action '{id}'");
            return;
        }
        let key = Shortcut::key(&format!("force:{id}"));
        self.enqueue(key, id, RANK_FORCED);
    }

    fn enqueue(&mut self, shortcut: Shortcut, id: ActionId, rank: u8) {
        self.seq += 1;
        let seq = self.seq;
        debug!("enqueue '{id}' under {shortcut} rank={rank}");
        let slot = match self.pending.iter().position(|(key, _)| *key == shortcut) {
            Some(slot) => slot,
            None => {
                self.pending.push((shortcut, SmallVec::new()));
                self.pending.len() - 1
            }
        };
        self.pending[slot].1.push(Pending { id, rank, seq });
    }

    /// Runs one scheduler tick: refresh focus, resolve pending shortcut
    /// queues (highest rank wins, losers are discarded), drive active long
    /// actions, then latch the modifier snapshot for the next tick.
    pub fn tick(&mut self, focus: &dyn FocusTracker, frame: TickFrame, state: &mut S) -> TickReport {
        let mut report = TickReport::default();
        self.cursor = frame.cursor;

        let context = focus.current_context();
        if context != self.current {
            debug!(
                "focus moved: {} -> {}",
                self.tree.path(self.current),
                self.tree.path(context)
            );
            self.current = context;
            self.cancel_unreachable(state, &mut report);
            self.drain_effects(state, &mut report);
        }

        let queues = std::mem::take(&mut self.pending);
        for (shortcut, mut queue) in queues {
            queue.sort_by_key(|pending| (Reverse(pending.rank), pending.seq));
            for pending in &queue {
                if !self.eligible(pending.id) {
                    continue;
                }
                if self.run_candidate(pending.id, &shortcut, state, &mut report) {
                    break;
                }
            }
        }

        self.drive_active(state, &mut report);

        let held = frame.modifiers;
        self.modifiers = ModifierState {
            pressed: held & !self.modifiers.held,
            released: self.modifiers.held & !held,
            held,
        };
        report
    }

    /// Context filtering per the descriptor's descendant-usability rule.
    fn context_reachable(&self, usability: DescendantUsability, owner: ContextId) -> bool {
        let current = self.current;
        let global = self.tree.global();
        match usability {
            DescendantUsability::None => current == owner || owner == global,
            DescendantUsability::Limited => self.tree.can_access(current, owner),
            DescendantUsability::Full => {
                owner == global || current == owner || self.tree.is_raw_ancestor_of(owner, current)
            }
        }
    }

    fn eligible(&self, id: ActionId) -> bool {
        let Some(desc) = self.registry.lookup(id) else {
            return false;
        };
        if !self.context_reachable(desc.usability, desc.context) {
            return false;
        }
        if desc.usability == DescendantUsability::Limited {
            // an active long action narrows what Limited candidates reach
            if !self.active.iter().all(|active| self.tree.can_access(active.context, desc.context))
            {
                return false;
            }
        }
        true
    }

    /// Returns true when the candidate consumed the shortcut for this
    /// tick; false lets the next lower-rank candidate try.
    fn run_candidate(
        &mut self,
        id: ActionId,
        shortcut: &Shortcut,
        state: &mut S,
        report: &mut TickReport,
    ) -> bool {
        let Some(desc) = self.registry.lookup(id) else {
            return false;
        };
        let (context, kind, undoable) = (desc.context, desc.kind, desc.undoable);
        let instance = desc.instantiate();
        match instance {
            BehaviorInstance::Short(mut behavior) => {
                let ok = {
                    let mut ctx = ActionCtx::new(
                        state,
                        &mut self.effects,
                        None,
                        self.modifiers.held,
                        self.cursor,
                        false,
                    );
                    behavior.perform(&mut ctx)
                };
                self.drain_effects(state, report);
                if !ok {
                    return false;
                }
                debug!("executed '{id}'");
                report.executed.push(id);
                if undoable {
                    self.history.save_step(HistoryEntry::short(id, behavior));
                }
                true
            }
            BehaviorInstance::Long(mut behavior) => {
                let trigger = TriggerSnapshot { shortcut: shortcut.clone(), cursor: self.cursor };
                let held = self.held_bindings.contains(&trigger.shortcut.binding);
                let ok = {
                    let mut ctx = ActionCtx::new(
                        state,
                        &mut self.effects,
                        Some(&trigger),
                        self.modifiers.held,
                        self.cursor,
                        held,
                    );
                    behavior.begin(&mut ctx)
                };
                self.drain_effects(state, report);
                if !ok {
                    return false;
                }
                self.cancel_conflicting(id, context, state, report);
                self.drain_effects(state, report);
                debug!("began '{id}'");
                self.active.push(ActiveLong {
                    id,
                    context,
                    kind,
                    undoable,
                    fresh: true,
                    trigger,
                    behavior,
                });
                report.began.push(id);
                true
            }
        }
    }

    /// At most one active instance per identity; a begin also displaces
    /// actives sharing the new action's owning context. Actions owned by
    /// different contexts run concurrently.
    fn cancel_conflicting(
        &mut self,
        new_id: ActionId,
        new_context: ContextId,
        state: &mut S,
        report: &mut TickReport,
    ) {
        let mut i = 0;
        while i < self.active.len() {
            let active = &self.active[i];
            let conflict = active.id == new_id || active.context == new_context;
            if conflict {
                self.cancel_at(i, state, report);
            } else {
                i += 1;
            }
        }
    }

    /// Forced context exit: actives whose owning context the new focus no
    /// longer reaches are cancelled, unwinding their partial effect.
    fn cancel_unreachable(&mut self, state: &mut S, report: &mut TickReport) {
        let mut i = 0;
        while i < self.active.len() {
            let usability = self
                .registry
                .lookup(self.active[i].id)
                .map(|desc| desc.usability)
                .unwrap_or(DescendantUsability::None);
            if self.context_reachable(usability, self.active[i].context) {
                i += 1;
            } else {
                self.cancel_at(i, state, report);
            }
        }
    }

    fn cancel_at(&mut self, slot: usize, state: &mut S, report: &mut TickReport) {
        let mut active = self.active.remove(slot);
        let held = self.held_bindings.contains(&active.trigger.shortcut.binding);
        {
            let mut ctx = ActionCtx::new(
                state,
                &mut self.effects,
                Some(&active.trigger),
                self.modifiers.held,
                self.cursor,
                held,
            );
            active.behavior.cancel(&mut ctx);
        }
        debug!("cancelled '{}'", active.id);
        report.cancelled.push(active.id);
    }

    /// Step 4: cancel predicate first, then finish, else exactly one
    /// update. Cancel and finish are terminal; the instance is removed and
    /// never updated again. Hold actions finish on trigger release.
    fn drive_active(&mut self, state: &mut S, report: &mut TickReport) {
        let mut i = 0;
        while i < self.active.len() {
            if self.active[i].fresh {
                self.active[i].fresh = false;
                i += 1;
                continue;
            }
            let held = self.held_bindings.contains(&self.active[i].trigger.shortcut.binding);
            let outcome = {
                let active = &self.active[i];
                let mut scratch = std::mem::take(&mut self.effects);
                let ctx = ActionCtx::new(
                    state,
                    &mut scratch,
                    Some(&active.trigger),
                    self.modifiers.held,
                    self.cursor,
                    held,
                );
                let outcome = if active.behavior.should_cancel(&ctx) {
                    Outcome::Cancel
                } else if (active.kind == BehaviorKind::Hold && !held)
                    || active.behavior.should_finish(&ctx)
                {
                    Outcome::Finish
                } else {
                    Outcome::Update
                };
                drop(ctx);
                self.effects = scratch;
                outcome
            };
            match outcome {
                Outcome::Update => {
                    let active = &mut self.active[i];
                    let mut ctx = ActionCtx::new(
                        state,
                        &mut self.effects,
                        Some(&active.trigger),
                        self.modifiers.held,
                        self.cursor,
                        held,
                    );
                    active.behavior.update(&mut ctx);
                    i += 1;
                }
                Outcome::Cancel => {
                    self.cancel_at(i, state, report);
                }
                Outcome::Finish => {
                    let mut active = self.active.remove(i);
                    {
                        let mut ctx = ActionCtx::new(
                            state,
                            &mut self.effects,
                            Some(&active.trigger),
                            self.modifiers.held,
                            self.cursor,
                            held,
                        );
                        active.behavior.finish(&mut ctx);
                    }
                    debug!("finished '{}'", active.id);
                    report.finished.push(active.id);
                    if active.undoable {
                        self.history.save_step(HistoryEntry::long(active.id, active.behavior));
                    }
                }
            }
            self.drain_effects(state, report);
        }
    }

    /// Applies deferred behavior requests. Runs until the queue is dry so
    /// requests made while applying earlier ones are not lost.
    fn drain_effects(&mut self, state: &mut S, report: &mut TickReport) {
        while !self.effects.is_empty() {
            let batch: Vec<DispatchEffect> = self.effects.drain(..).collect();
            for effect in batch {
                match effect {
                    DispatchEffect::Undo => {
                        self.history.undo(state);
                    }
                    DispatchEffect::Redo => {
                        self.history.redo(state);
                    }
                    DispatchEffect::ForceExecute(id) => self.force_execute(id),
                    DispatchEffect::CancelLong(id) => {
                        if let Some(slot) = self.active.iter().position(|active| active.id == id) {
                            self.cancel_at(slot, state, report);
                        }
                    }
                }
            }
        }
    }
}
