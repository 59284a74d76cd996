use crate::shortcut::{Modifiers, Shortcut};
use glam::Vec2;
use std::fmt;

/// Unique identity of an action kind. Registered once, looked up for the
/// process lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ActionId(pub &'static str);

impl fmt::Display for ActionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionDuration {
    Short,
    Long,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputTrigger {
    Pressed,
    Held,
}

/// How an action runs, derived from duration x input trigger:
/// Instant = Short x Pressed, Toggle = Long x Pressed, Hold = Long x Held.
/// Hold actions finish automatically when their trigger binding is
/// released; Toggle actions run until a predicate or cancellation ends
/// them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BehaviorKind {
    Instant,
    Toggle,
    Hold,
}

impl BehaviorKind {
    pub fn duration(self) -> ActionDuration {
        match self {
            BehaviorKind::Instant => ActionDuration::Short,
            BehaviorKind::Toggle | BehaviorKind::Hold => ActionDuration::Long,
        }
    }

    pub fn trigger(self) -> InputTrigger {
        match self {
            BehaviorKind::Instant | BehaviorKind::Toggle => InputTrigger::Pressed,
            BehaviorKind::Hold => InputTrigger::Held,
        }
    }

    pub fn is_long(self) -> bool {
        self.duration() == ActionDuration::Long
    }
}

/// Whether descendant contexts may invoke an action owned by an ancestor.
///
/// - `None`: exact context match only (or the owner is `Global`).
/// - `Limited`: detachment-respecting ancestry; additionally blocked while
///   an active long action's context does not reach the owner.
/// - `Full`: raw ancestry, crossing detachment boundaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DescendantUsability {
    None,
    Limited,
    Full,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShortcutPolicy {
    /// Not shortcut-invocable; only reachable through `force_execute`.
    Unbound,
    Rebindable,
    Locked,
}

/// Tie-breaking rank when several actions share a physical shortcut.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ActionPriority {
    Low,
    Normal,
    High,
}

/// Input state captured when a long action begins.
#[derive(Debug, Clone)]
pub struct TriggerSnapshot {
    pub shortcut: Shortcut,
    pub cursor: Option<Vec2>,
}

/// Deferred requests a behavior hands back to the dispatcher. Drained
/// after every behavior call, so behaviors never re-enter the dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchEffect {
    Undo,
    Redo,
    ForceExecute(ActionId),
    CancelLong(ActionId),
}

/// Everything a behavior sees while it runs: the host editor state, the
/// trigger snapshot (long actions only), the current modifier/cursor view
/// and the deferred-effect queue.
pub struct ActionCtx<'a, S> {
    pub state: &'a mut S,
    pub trigger: Option<&'a TriggerSnapshot>,
    pub modifiers: Modifiers,
    pub cursor: Option<Vec2>,
    /// For long actions: whether the trigger binding is still held.
    pub trigger_held: bool,
    effects: &'a mut Vec<DispatchEffect>,
}

impl<'a, S> ActionCtx<'a, S> {
    pub(crate) fn new(
        state: &'a mut S,
        effects: &'a mut Vec<DispatchEffect>,
        trigger: Option<&'a TriggerSnapshot>,
        modifiers: Modifiers,
        cursor: Option<Vec2>,
        trigger_held: bool,
    ) -> Self {
        Self { state, trigger, modifiers, cursor, trigger_held, effects }
    }

    pub fn request_undo(&mut self) {
        self.effects.push(DispatchEffect::Undo);
    }

    pub fn request_redo(&mut self) {
        self.effects.push(DispatchEffect::Redo);
    }

    pub fn request_force_execute(&mut self, id: ActionId) {
        self.effects.push(DispatchEffect::ForceExecute(id));
    }

    pub fn request_cancel_long(&mut self, id: ActionId) {
        self.effects.push(DispatchEffect::CancelLong(id));
    }
}

/// Contract for `Instant` actions: run to completion within the dispatch
/// tick. Returning `false` from `perform` declines the dispatch and lets
/// the next lower-priority candidate try.
///
/// Undoable actions override `revert`/`reapply`; the completed instance
/// itself is the history record, so any data needed to invert the effect
/// belongs in the implementing struct.
pub trait ShortBehavior<S> {
    fn perform(&mut self, ctx: &mut ActionCtx<'_, S>) -> bool;

    fn revert(&mut self, _ctx: &mut ActionCtx<'_, S>) {}

    fn reapply(&mut self, ctx: &mut ActionCtx<'_, S>) {
        let _ = self.perform(ctx);
    }
}

/// Contract for `Toggle`/`Hold` actions: `begin` on dispatch, one `update`
/// per tick while active, then exactly one of `cancel` or `finish`.
///
/// `cancel` must fully unwind any partial effect before returning; the
/// dispatcher never updates an instance again after either terminal call.
pub trait LongBehavior<S> {
    fn begin(&mut self, ctx: &mut ActionCtx<'_, S>) -> bool;

    fn update(&mut self, _ctx: &mut ActionCtx<'_, S>) {}

    fn should_cancel(&self, _ctx: &ActionCtx<'_, S>) -> bool {
        false
    }

    /// Consulted every tick after the cancel predicate. Hold actions also
    /// finish when their trigger binding is released, whatever this says.
    fn should_finish(&self, _ctx: &ActionCtx<'_, S>) -> bool {
        false
    }

    fn cancel(&mut self, _ctx: &mut ActionCtx<'_, S>) {}

    fn finish(&mut self, _ctx: &mut ActionCtx<'_, S>) {}

    fn revert(&mut self, _ctx: &mut ActionCtx<'_, S>) {}

    fn reapply(&mut self, _ctx: &mut ActionCtx<'_, S>) {}
}

/// Constructs a fresh behavior instance per dispatch. The variant must
/// agree with the descriptor's `BehaviorKind`; the registry rejects
/// mismatches at registration time.
pub enum BehaviorFactory<S: 'static> {
    Short(Box<dyn Fn() -> Box<dyn ShortBehavior<S>>>),
    Long(Box<dyn Fn() -> Box<dyn LongBehavior<S>>>),
}

impl<S: 'static> BehaviorFactory<S> {
    pub fn short<B, F>(make: F) -> Self
    where
        B: ShortBehavior<S> + 'static,
        F: Fn() -> B + 'static,
    {
        BehaviorFactory::Short(Box::new(move || Box::new(make()) as Box<dyn ShortBehavior<S>>))
    }

    pub fn long<B, F>(make: F) -> Self
    where
        B: LongBehavior<S> + 'static,
        F: Fn() -> B + 'static,
    {
        BehaviorFactory::Long(Box::new(move || Box::new(make()) as Box<dyn LongBehavior<S>>))
    }

    pub fn is_long(&self) -> bool {
        matches!(self, BehaviorFactory::Long(_))
    }

    pub(crate) fn instantiate(&self) -> BehaviorInstance<S> {
        match self {
            BehaviorFactory::Short(make) => BehaviorInstance::Short(make()),
            BehaviorFactory::Long(make) => BehaviorInstance::Long(make()),
        }
    }
}

pub(crate) enum BehaviorInstance<S: 'static> {
    Short(Box<dyn ShortBehavior<S>>),
    Long(Box<dyn LongBehavior<S>>),
}
