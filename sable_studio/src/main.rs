use anyhow::{Context as _, Result};
use glam::Vec2;
use sable_core::{Modifiers, TickFrame};
use sable_studio::profile;
use sable_studio::{EditorState, PanelFocus};

/// Headless demo: drives the editor profile through a short scripted
/// session and prints what the dispatcher did.
fn main() -> Result<()> {
    env_logger::init();

    let mut dispatcher = profile::build_dispatcher()?;
    log::info!("editor profile ready: {} actions registered", dispatcher.registry().len());
    let tree = dispatcher.registry().tree().clone();
    let draw_image = tree.find(profile::DRAW_IMAGE).context("DrawImage context missing")?;
    let flip_tool = tree.find(profile::FLIP_TOOL).context("FlipTool context missing")?;

    let mut state = EditorState::new(16, 16);
    let mut focus = PanelFocus::new(draw_image);

    // Drag a short stroke across the canvas.
    dispatcher.press("mouse_left");
    for step in 0..4 {
        let cursor = Vec2::new(2.0 + step as f32, 5.0);
        dispatcher.tick(&focus, TickFrame { modifiers: Modifiers::empty(), cursor: Some(cursor) }, &mut state);
    }
    dispatcher.release("mouse_left");
    dispatcher.tick(&focus, TickFrame::default(), &mut state);
    println!("painted {} cells", state.canvas.painted_count());

    // Flip the sprite with the flip tool focused.
    focus.focus(flip_tool);
    dispatcher.press("f");
    let report = dispatcher.tick(&focus, TickFrame::default(), &mut state);
    println!("executed: {:?}", report.executed);

    // Undo twice (flip, then stroke), redo once.
    let ctrl = TickFrame { modifiers: Modifiers::CTRL, cursor: None };
    dispatcher.tick(&focus, ctrl, &mut state);
    for _ in 0..2 {
        dispatcher.press("z");
        dispatcher.tick(&focus, ctrl, &mut state);
    }
    println!("after undo: {} cells painted", state.canvas.painted_count());
    dispatcher.press("y");
    dispatcher.tick(&focus, ctrl, &mut state);
    println!(
        "after redo: {} cells painted, {} undos / {} redos available",
        state.canvas.painted_count(),
        dispatcher.history().undo_len(),
        dispatcher.history().redo_len()
    );

    Ok(())
}
