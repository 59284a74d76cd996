pub mod action;
pub mod context;
pub mod dispatcher;
pub mod history;
pub mod registry;
pub mod shortcut;

pub use action::{
    ActionCtx, ActionDuration, ActionId, ActionPriority, BehaviorFactory, BehaviorKind,
    DescendantUsability, DispatchEffect, InputTrigger, LongBehavior, ShortBehavior,
    ShortcutPolicy, TriggerSnapshot,
};
pub use context::{ContextDecl, ContextId, ContextTree, GLOBAL_CONTEXT};
pub use dispatcher::{Dispatcher, FocusTracker, ModifierState, TickFrame, TickReport};
pub use history::{ActionHistory, HistoryEntry};
pub use registry::{ActionDescriptor, ActionRegistry, ActionSpec};
pub use shortcut::{Modifiers, RebindFile, Shortcut};
