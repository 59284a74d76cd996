use sable_core::{
    ActionCtx, ActionId, ActionPriority, ActionRegistry, ActionSpec, BehaviorFactory,
    BehaviorKind, ContextDecl, ContextId, ContextTree, DescendantUsability, Dispatcher,
    LongBehavior, Shortcut, ShortcutPolicy, TickFrame,
};
use std::sync::Arc;

#[derive(Default)]
struct Editor {
    events: Vec<String>,
    gauge: i32,
    abort_requested: bool,
}

impl Editor {
    fn count(&self, suffix: &str) -> usize {
        self.events.iter().filter(|event| event.ends_with(suffix)).count()
    }
}

/// Scripted long action that logs its lifecycle into the editor state.
struct Session {
    label: &'static str,
    accept: bool,
}

impl Session {
    fn new(label: &'static str) -> Self {
        Self { label, accept: true }
    }

    fn declining(label: &'static str) -> Self {
        Self { label, accept: false }
    }
}

impl LongBehavior<Editor> for Session {
    fn begin(&mut self, ctx: &mut ActionCtx<'_, Editor>) -> bool {
        ctx.state.events.push(format!("{}:begin", self.label));
        self.accept
    }

    fn update(&mut self, ctx: &mut ActionCtx<'_, Editor>) {
        ctx.state.events.push(format!("{}:update", self.label));
    }

    fn should_cancel(&self, ctx: &ActionCtx<'_, Editor>) -> bool {
        ctx.state.abort_requested
    }

    fn cancel(&mut self, ctx: &mut ActionCtx<'_, Editor>) {
        ctx.state.events.push(format!("{}:cancel", self.label));
    }

    fn finish(&mut self, ctx: &mut ActionCtx<'_, Editor>) {
        ctx.state.events.push(format!("{}:finish", self.label));
    }
}

/// Undoable long action accumulating into the gauge; the finished
/// instance knows how much to take back.
struct GaugeFill {
    added: i32,
}

impl GaugeFill {
    fn new() -> Self {
        Self { added: 0 }
    }
}

impl LongBehavior<Editor> for GaugeFill {
    fn begin(&mut self, _ctx: &mut ActionCtx<'_, Editor>) -> bool {
        true
    }

    fn update(&mut self, ctx: &mut ActionCtx<'_, Editor>) {
        ctx.state.gauge += 1;
        self.added += 1;
    }

    fn cancel(&mut self, ctx: &mut ActionCtx<'_, Editor>) {
        ctx.state.gauge -= self.added;
        self.added = 0;
    }

    fn revert(&mut self, ctx: &mut ActionCtx<'_, Editor>) {
        ctx.state.gauge -= self.added;
    }

    fn reapply(&mut self, ctx: &mut ActionCtx<'_, Editor>) {
        ctx.state.gauge += self.added;
    }
}

/// Toggle that runs for a fixed number of updates, then finishes on its
/// own.
struct TimedRun {
    remaining: u32,
}

impl LongBehavior<Editor> for TimedRun {
    fn begin(&mut self, ctx: &mut ActionCtx<'_, Editor>) -> bool {
        ctx.state.events.push("timed:begin".to_string());
        true
    }

    fn update(&mut self, ctx: &mut ActionCtx<'_, Editor>) {
        ctx.state.events.push("timed:update".to_string());
        self.remaining = self.remaining.saturating_sub(1);
    }

    fn should_finish(&self, _ctx: &ActionCtx<'_, Editor>) -> bool {
        self.remaining == 0
    }

    fn finish(&mut self, ctx: &mut ActionCtx<'_, Editor>) {
        ctx.state.events.push("timed:finish".to_string());
    }
}

fn editor_tree() -> Arc<ContextTree> {
    Arc::new(
        ContextTree::build(&[
            ContextDecl::new("Viewport")
                .with_children(vec![ContextDecl::new("DrawImage")]),
            ContextDecl::detached("Panel").with_children(vec![ContextDecl::new("Palette")]),
        ])
        .expect("tree builds"),
    )
}

struct LongSpec<F> {
    id: &'static str,
    context: ContextId,
    kind: BehaviorKind,
    usability: DescendantUsability,
    binding: &'static str,
    undoable: bool,
    make: F,
}

fn register_long<B, F>(registry: &mut ActionRegistry<Editor>, spec: LongSpec<F>)
where
    B: LongBehavior<Editor> + 'static,
    F: Fn() -> B + 'static,
{
    registry
        .register(ActionSpec {
            id: ActionId(spec.id),
            context: spec.context,
            kind: spec.kind,
            usability: spec.usability,
            shortcut_policy: ShortcutPolicy::Rebindable,
            priority: ActionPriority::Normal,
            forced_conflict: false,
            undoable: spec.undoable,
            shortcut: Some(Shortcut::key(spec.binding)),
            behavior: BehaviorFactory::long(spec.make),
        })
        .expect("long action registers");
}

fn idle() -> TickFrame {
    TickFrame::default()
}

#[test]
fn hold_action_updates_each_tick_until_release() {
    let tree = editor_tree();
    let draw = tree.find("Viewport/DrawImage").unwrap();
    let mut registry = ActionRegistry::new(tree);
    register_long(
        &mut registry,
        LongSpec {
            id: "stroke",
            context: draw,
            kind: BehaviorKind::Hold,
            usability: DescendantUsability::Limited,
            binding: "mouse_left",
            undoable: false,
            make: || Session::new("stroke"),
        },
    );
    let mut dispatcher = Dispatcher::new(registry, draw);
    let mut state = Editor::default();

    dispatcher.press("mouse_left");
    let report = dispatcher.tick(&draw, idle(), &mut state);
    assert_eq!(report.began, vec![ActionId("stroke")]);
    assert!(dispatcher.is_long_active(ActionId("stroke")));

    dispatcher.tick(&draw, idle(), &mut state);
    dispatcher.tick(&draw, idle(), &mut state);
    dispatcher.release("mouse_left");
    let report = dispatcher.tick(&draw, idle(), &mut state);

    assert_eq!(report.finished, vec![ActionId("stroke")]);
    assert!(!dispatcher.is_long_active(ActionId("stroke")));
    assert_eq!(
        state.events,
        vec!["stroke:begin", "stroke:update", "stroke:update", "stroke:finish"],
        "begin, one update per held tick, then finish on release"
    );

    // Terminal: nothing runs after finish.
    dispatcher.tick(&draw, idle(), &mut state);
    assert_eq!(state.count(":update"), 2);
}

#[test]
fn cancel_predicate_fires_before_update_and_is_terminal() {
    let tree = editor_tree();
    let draw = tree.find("Viewport/DrawImage").unwrap();
    let mut registry = ActionRegistry::new(tree);
    register_long(
        &mut registry,
        LongSpec {
            id: "stroke",
            context: draw,
            kind: BehaviorKind::Hold,
            usability: DescendantUsability::Limited,
            binding: "mouse_left",
            undoable: false,
            make: || Session::new("stroke"),
        },
    );
    let mut dispatcher = Dispatcher::new(registry, draw);
    let mut state = Editor::default();

    dispatcher.press("mouse_left");
    dispatcher.tick(&draw, idle(), &mut state);
    dispatcher.tick(&draw, idle(), &mut state);

    state.abort_requested = true;
    let report = dispatcher.tick(&draw, idle(), &mut state);
    assert_eq!(report.cancelled, vec![ActionId("stroke")]);
    assert_eq!(
        state.events,
        vec!["stroke:begin", "stroke:update", "stroke:cancel"],
        "the cancel tick runs no update"
    );

    dispatcher.tick(&draw, idle(), &mut state);
    assert_eq!(state.count(":cancel"), 1, "cancel is terminal and never repeats");
}

#[test]
fn restarting_an_identity_cancels_the_old_instance_exactly_once() {
    let tree = editor_tree();
    let draw = tree.find("Viewport/DrawImage").unwrap();
    let mut registry = ActionRegistry::new(tree);
    register_long(
        &mut registry,
        LongSpec {
            id: "stroke",
            context: draw,
            kind: BehaviorKind::Hold,
            usability: DescendantUsability::Limited,
            binding: "mouse_left",
            undoable: false,
            make: || Session::new("stroke"),
        },
    );
    let mut dispatcher = Dispatcher::new(registry, draw);
    let mut state = Editor::default();

    dispatcher.press("mouse_left");
    dispatcher.tick(&draw, idle(), &mut state);
    dispatcher.press("mouse_left");
    let report = dispatcher.tick(&draw, idle(), &mut state);

    assert_eq!(report.began, vec![ActionId("stroke")]);
    assert_eq!(report.cancelled, vec![ActionId("stroke")]);
    assert_eq!(state.count(":begin"), 2);
    assert_eq!(state.count(":cancel"), 1, "the displaced instance is cancelled exactly once");
    assert!(dispatcher.is_long_active(ActionId("stroke")), "the new instance stays active");
}

#[test]
fn a_declined_begin_leaves_the_active_instance_alone() {
    let tree = editor_tree();
    let draw = tree.find("Viewport/DrawImage").unwrap();
    let mut registry = ActionRegistry::new(tree);
    register_long(
        &mut registry,
        LongSpec {
            id: "stroke",
            context: draw,
            kind: BehaviorKind::Hold,
            usability: DescendantUsability::Limited,
            binding: "mouse_left",
            undoable: false,
            make: || Session::new("stroke"),
        },
    );
    register_long(
        &mut registry,
        LongSpec {
            id: "picky",
            context: draw,
            kind: BehaviorKind::Hold,
            usability: DescendantUsability::Limited,
            binding: "g",
            undoable: false,
            make: || Session::declining("picky"),
        },
    );
    let mut dispatcher = Dispatcher::new(registry, draw);
    let mut state = Editor::default();

    dispatcher.press("mouse_left");
    dispatcher.tick(&draw, idle(), &mut state);
    dispatcher.press("g");
    let report = dispatcher.tick(&draw, idle(), &mut state);

    assert!(report.began.is_empty());
    assert!(report.cancelled.is_empty(), "a failed begin displaces nothing");
    assert!(dispatcher.is_long_active(ActionId("stroke")));
    assert!(!dispatcher.is_long_active(ActionId("picky")));
}

#[test]
fn long_actions_in_different_contexts_run_concurrently() {
    let tree = editor_tree();
    let viewport = tree.find("Viewport").unwrap();
    let draw = tree.find("Viewport/DrawImage").unwrap();
    let mut registry = ActionRegistry::new(tree);
    register_long(
        &mut registry,
        LongSpec {
            id: "stroke",
            context: draw,
            kind: BehaviorKind::Hold,
            usability: DescendantUsability::Limited,
            binding: "mouse_left",
            undoable: false,
            make: || Session::new("stroke"),
        },
    );
    register_long(
        &mut registry,
        LongSpec {
            id: "pan",
            context: viewport,
            kind: BehaviorKind::Hold,
            usability: DescendantUsability::Full,
            binding: "space",
            undoable: false,
            make: || Session::new("pan"),
        },
    );
    let mut dispatcher = Dispatcher::new(registry, draw);
    let mut state = Editor::default();

    dispatcher.press("mouse_left");
    dispatcher.tick(&draw, idle(), &mut state);
    dispatcher.press("space");
    dispatcher.tick(&draw, idle(), &mut state);
    assert!(dispatcher.is_long_active(ActionId("stroke")));
    assert!(dispatcher.is_long_active(ActionId("pan")), "different contexts coexist");

    dispatcher.release("mouse_left");
    let report = dispatcher.tick(&draw, idle(), &mut state);
    assert_eq!(report.finished, vec![ActionId("stroke")]);
    assert!(dispatcher.is_long_active(ActionId("pan")), "the other instance keeps running");

    dispatcher.release("space");
    let report = dispatcher.tick(&draw, idle(), &mut state);
    assert_eq!(report.finished, vec![ActionId("pan")]);
}

#[test]
fn focus_leaving_the_owning_scope_cancels_the_action() {
    let tree = editor_tree();
    let draw = tree.find("Viewport/DrawImage").unwrap();
    let palette = tree.find("Panel/Palette").unwrap();
    let mut registry = ActionRegistry::new(tree);
    register_long(
        &mut registry,
        LongSpec {
            id: "stroke",
            context: draw,
            kind: BehaviorKind::Hold,
            usability: DescendantUsability::Limited,
            binding: "mouse_left",
            undoable: false,
            make: || Session::new("stroke"),
        },
    );
    let mut dispatcher = Dispatcher::new(registry, draw);
    let mut state = Editor::default();

    dispatcher.press("mouse_left");
    dispatcher.tick(&draw, idle(), &mut state);
    assert!(dispatcher.is_long_active(ActionId("stroke")));

    let report = dispatcher.tick(&palette, idle(), &mut state);
    assert_eq!(report.cancelled, vec![ActionId("stroke")], "forced context exit");
    assert_eq!(state.count(":cancel"), 1);
}

#[test]
fn toggle_runs_to_its_own_end_after_the_key_is_released() {
    let tree = editor_tree();
    let viewport = tree.find("Viewport").unwrap();
    let mut registry = ActionRegistry::new(tree);
    register_long(
        &mut registry,
        LongSpec {
            id: "timed",
            context: viewport,
            kind: BehaviorKind::Toggle,
            usability: DescendantUsability::Limited,
            binding: "p",
            undoable: false,
            make: || TimedRun { remaining: 2 },
        },
    );
    let mut dispatcher = Dispatcher::new(registry, viewport);
    let mut state = Editor::default();

    dispatcher.press("p");
    dispatcher.release("p");
    dispatcher.tick(&viewport, idle(), &mut state);
    assert!(dispatcher.is_long_active(ActionId("timed")), "toggles survive key release");

    dispatcher.tick(&viewport, idle(), &mut state);
    dispatcher.tick(&viewport, idle(), &mut state);
    let report = dispatcher.tick(&viewport, idle(), &mut state);
    assert_eq!(report.finished, vec![ActionId("timed")]);
    assert_eq!(
        state.events,
        vec!["timed:begin", "timed:update", "timed:update", "timed:finish"]
    );
}

#[test]
fn a_finished_undoable_long_action_lands_in_the_history() {
    let tree = editor_tree();
    let draw = tree.find("Viewport/DrawImage").unwrap();
    let mut registry = ActionRegistry::new(tree);
    register_long(
        &mut registry,
        LongSpec {
            id: "fill",
            context: draw,
            kind: BehaviorKind::Hold,
            usability: DescendantUsability::Limited,
            binding: "mouse_left",
            undoable: true,
            make: GaugeFill::new,
        },
    );
    let mut dispatcher = Dispatcher::new(registry, draw);
    let mut state = Editor::default();

    dispatcher.press("mouse_left");
    dispatcher.tick(&draw, idle(), &mut state);
    dispatcher.tick(&draw, idle(), &mut state);
    dispatcher.tick(&draw, idle(), &mut state);
    dispatcher.release("mouse_left");
    dispatcher.tick(&draw, idle(), &mut state);

    assert_eq!(state.gauge, 2, "two held ticks accumulated");
    assert!(dispatcher.history().can_undo());

    assert!(dispatcher.history_mut().undo(&mut state));
    assert_eq!(state.gauge, 0, "undo takes back the whole stroke");
    assert!(dispatcher.history_mut().redo(&mut state));
    assert_eq!(state.gauge, 2, "redo replays it");
}

#[test]
fn a_cancelled_undoable_action_records_no_history() {
    let tree = editor_tree();
    let draw = tree.find("Viewport/DrawImage").unwrap();
    let palette = tree.find("Panel/Palette").unwrap();
    let mut registry = ActionRegistry::new(tree);
    register_long(
        &mut registry,
        LongSpec {
            id: "fill",
            context: draw,
            kind: BehaviorKind::Hold,
            usability: DescendantUsability::Limited,
            binding: "mouse_left",
            undoable: true,
            make: GaugeFill::new,
        },
    );
    let mut dispatcher = Dispatcher::new(registry, draw);
    let mut state = Editor::default();

    dispatcher.press("mouse_left");
    dispatcher.tick(&draw, idle(), &mut state);
    dispatcher.tick(&draw, idle(), &mut state);
    dispatcher.tick(&palette, idle(), &mut state);

    assert_eq!(state.gauge, 0, "cancel unwound the partial effect");
    assert!(!dispatcher.history().can_undo(), "cancelled work leaves no record");
}
