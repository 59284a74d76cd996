//! The editor's declarative context table and action set. This is the
//! sole configuration surface: every context and every action is listed
//! here explicitly, attached to its owning context by id.

use crate::canvas::EditorState;
use crate::tools::{
    FlipSprite, OpenContextMenu, PaintStroke, PanViewport, PreviewRun, RedoLast, UndoLast,
};
use anyhow::{Context as _, Result};
use sable_core::{
    ActionId, ActionPriority, ActionRegistry, ActionSpec, BehaviorFactory, BehaviorKind,
    ContextDecl, ContextTree, DescendantUsability, Dispatcher, Modifiers, Shortcut,
    ShortcutPolicy,
};
use std::sync::Arc;

pub const UNDO: ActionId = ActionId("undo");
pub const REDO: ActionId = ActionId("redo");
pub const FLIP_HORIZONTAL: ActionId = ActionId("flip_horizontal");
pub const FLIP_VERTICAL: ActionId = ActionId("flip_vertical");
pub const PAINT_STROKE: ActionId = ActionId("paint_stroke");
pub const PAN_VIEWPORT: ActionId = ActionId("pan_viewport");
pub const PREVIEW: ActionId = ActionId("preview");
pub const OPEN_CONTEXT_MENU: ActionId = ActionId("open_context_menu");

pub const VIEWPORT: &str = "Viewport";
pub const DRAW_IMAGE: &str = "Viewport/DrawImage";
pub const FLIP_TOOL: &str = "Viewport/DrawImage/FlipTool";
pub const TIMELINE: &str = "Viewport/Timeline";
pub const PANEL: &str = "Panel";
pub const PALETTE: &str = "Panel/Palette";

const PREVIEW_FRAMES: u32 = 24;
const STROKE_INK: u8 = 255;

pub fn context_tree() -> Result<ContextTree> {
    ContextTree::build(&[
        ContextDecl::new("Viewport").with_children(vec![
            ContextDecl::new("DrawImage")
                .with_children(vec![ContextDecl::new("FlipTool")]),
            ContextDecl::new("Timeline"),
        ]),
        // Panels keep their own shortcut namespace: viewport tools must
        // not fire while a panel has focus.
        ContextDecl::detached("Panel").with_children(vec![ContextDecl::new("Palette")]),
    ])
}

pub fn build_registry(tree: Arc<ContextTree>) -> Result<ActionRegistry<EditorState>> {
    let viewport = tree.find(VIEWPORT).context("Viewport context missing")?;
    let draw_image = tree.find(DRAW_IMAGE).context("DrawImage context missing")?;
    let flip_tool = tree.find(FLIP_TOOL).context("FlipTool context missing")?;
    let global = tree.global();

    let mut registry = ActionRegistry::new(tree);

    registry.register(ActionSpec {
        id: UNDO,
        context: global,
        kind: BehaviorKind::Instant,
        usability: DescendantUsability::Full,
        shortcut_policy: ShortcutPolicy::Locked,
        priority: ActionPriority::High,
        forced_conflict: false,
        undoable: false,
        shortcut: Some(Shortcut::new(Modifiers::CTRL, "z")),
        behavior: BehaviorFactory::short(|| UndoLast),
    })?;

    registry.register(ActionSpec {
        id: REDO,
        context: global,
        kind: BehaviorKind::Instant,
        usability: DescendantUsability::Full,
        shortcut_policy: ShortcutPolicy::Locked,
        priority: ActionPriority::High,
        forced_conflict: false,
        undoable: false,
        shortcut: Some(Shortcut::new(Modifiers::CTRL, "y")),
        behavior: BehaviorFactory::short(|| RedoLast),
    })?;

    registry.register(ActionSpec {
        id: FLIP_HORIZONTAL,
        context: flip_tool,
        kind: BehaviorKind::Instant,
        usability: DescendantUsability::Limited,
        shortcut_policy: ShortcutPolicy::Rebindable,
        priority: ActionPriority::Normal,
        forced_conflict: false,
        undoable: true,
        shortcut: Some(Shortcut::key("f")),
        behavior: BehaviorFactory::short(FlipSprite::horizontal),
    })?;

    registry.register(ActionSpec {
        id: FLIP_VERTICAL,
        context: flip_tool,
        kind: BehaviorKind::Instant,
        usability: DescendantUsability::Limited,
        shortcut_policy: ShortcutPolicy::Rebindable,
        priority: ActionPriority::Normal,
        forced_conflict: false,
        undoable: true,
        shortcut: Some(Shortcut::new(Modifiers::SHIFT, "f")),
        behavior: BehaviorFactory::short(FlipSprite::vertical),
    })?;

    registry.register(ActionSpec {
        id: PAINT_STROKE,
        context: draw_image,
        kind: BehaviorKind::Hold,
        usability: DescendantUsability::Limited,
        shortcut_policy: ShortcutPolicy::Rebindable,
        priority: ActionPriority::Normal,
        forced_conflict: false,
        undoable: true,
        shortcut: Some(Shortcut::key("mouse_left")),
        behavior: BehaviorFactory::long(|| PaintStroke::new(STROKE_INK)),
    })?;

    registry.register(ActionSpec {
        id: PAN_VIEWPORT,
        context: viewport,
        kind: BehaviorKind::Hold,
        usability: DescendantUsability::Full,
        shortcut_policy: ShortcutPolicy::Rebindable,
        priority: ActionPriority::Low,
        forced_conflict: false,
        undoable: false,
        shortcut: Some(Shortcut::key("space")),
        behavior: BehaviorFactory::long(PanViewport::new),
    })?;

    registry.register(ActionSpec {
        id: PREVIEW,
        context: viewport,
        kind: BehaviorKind::Toggle,
        usability: DescendantUsability::Limited,
        shortcut_policy: ShortcutPolicy::Rebindable,
        priority: ActionPriority::Normal,
        forced_conflict: false,
        undoable: false,
        shortcut: Some(Shortcut::key("p")),
        behavior: BehaviorFactory::long(|| PreviewRun::new(PREVIEW_FRAMES)),
    })?;

    registry.register(ActionSpec {
        id: OPEN_CONTEXT_MENU,
        context: global,
        kind: BehaviorKind::Instant,
        usability: DescendantUsability::Limited,
        shortcut_policy: ShortcutPolicy::Rebindable,
        priority: ActionPriority::Low,
        forced_conflict: false,
        undoable: false,
        shortcut: Some(Shortcut::key("mouse_right")),
        behavior: BehaviorFactory::short(|| OpenContextMenu),
    })?;

    Ok(registry)
}

/// Wires the whole profile together: tree, registry, dispatcher starting
/// at the `Global` root.
pub fn build_dispatcher() -> Result<Dispatcher<EditorState>> {
    let tree = Arc::new(context_tree()?);
    let initial = tree.global();
    let registry = build_registry(tree)?;
    Ok(Dispatcher::new(registry, initial))
}
