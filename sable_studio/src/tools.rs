use crate::canvas::EditorState;
use glam::Vec2;
use sable_core::{ActionCtx, LongBehavior, ShortBehavior};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlipAxis {
    Horizontal,
    Vertical,
}

/// Mirrors the whole canvas. A flip is its own inverse, so the history
/// record needs nothing beyond the axis.
pub struct FlipSprite {
    axis: FlipAxis,
}

impl FlipSprite {
    pub fn horizontal() -> Self {
        Self { axis: FlipAxis::Horizontal }
    }

    pub fn vertical() -> Self {
        Self { axis: FlipAxis::Vertical }
    }

    fn apply(&self, state: &mut EditorState) {
        match self.axis {
            FlipAxis::Horizontal => state.canvas.flip_horizontal(),
            FlipAxis::Vertical => state.canvas.flip_vertical(),
        }
    }
}

impl ShortBehavior<EditorState> for FlipSprite {
    fn perform(&mut self, ctx: &mut ActionCtx<'_, EditorState>) -> bool {
        self.apply(ctx.state);
        true
    }

    fn revert(&mut self, ctx: &mut ActionCtx<'_, EditorState>) {
        self.apply(ctx.state);
    }
}

pub struct OpenContextMenu;

impl ShortBehavior<EditorState> for OpenContextMenu {
    fn perform(&mut self, ctx: &mut ActionCtx<'_, EditorState>) -> bool {
        ctx.state.menu_openings += 1;
        true
    }
}

/// Pops the most recent reversible step. Not itself undoable.
pub struct UndoLast;

impl ShortBehavior<EditorState> for UndoLast {
    fn perform(&mut self, ctx: &mut ActionCtx<'_, EditorState>) -> bool {
        ctx.request_undo();
        true
    }
}

pub struct RedoLast;

impl ShortBehavior<EditorState> for RedoLast {
    fn perform(&mut self, ctx: &mut ActionCtx<'_, EditorState>) -> bool {
        ctx.request_redo();
        true
    }
}

/// Hold tool: paints the cell under the cursor each tick while the
/// pointer button stays down. Remembers the first overwritten value per
/// cell so cancel and undo restore the exact prior canvas.
pub struct PaintStroke {
    ink: u8,
    touched: Vec<(u32, u32, u8)>,
}

impl PaintStroke {
    pub fn new(ink: u8) -> Self {
        Self { ink, touched: Vec::new() }
    }

    fn stamp(&mut self, state: &mut EditorState, cursor: Vec2) -> bool {
        let Some((x, y)) = state.canvas.cell_at(cursor) else {
            return false;
        };
        if !self.touched.iter().any(|&(tx, ty, _)| tx == x && ty == y) {
            let previous = state.canvas.pixel(x, y).unwrap_or(0);
            self.touched.push((x, y, previous));
        }
        state.canvas.set_pixel(x, y, self.ink)
    }

    fn restore(&self, state: &mut EditorState) {
        for &(x, y, previous) in self.touched.iter().rev() {
            state.canvas.set_pixel(x, y, previous);
        }
    }
}

impl LongBehavior<EditorState> for PaintStroke {
    fn begin(&mut self, ctx: &mut ActionCtx<'_, EditorState>) -> bool {
        match ctx.cursor {
            Some(cursor) => self.stamp(ctx.state, cursor),
            None => false,
        }
    }

    fn update(&mut self, ctx: &mut ActionCtx<'_, EditorState>) {
        if let Some(cursor) = ctx.cursor {
            self.stamp(ctx.state, cursor);
        }
    }

    fn cancel(&mut self, ctx: &mut ActionCtx<'_, EditorState>) {
        self.restore(ctx.state);
        self.touched.clear();
    }

    fn revert(&mut self, ctx: &mut ActionCtx<'_, EditorState>) {
        self.restore(ctx.state);
    }

    fn reapply(&mut self, ctx: &mut ActionCtx<'_, EditorState>) {
        for &(x, y, _) in &self.touched {
            ctx.state.canvas.set_pixel(x, y, self.ink);
        }
    }
}

/// Hold tool: drags the viewport while the pan key stays down. Cancel
/// snaps back to where the grab started.
pub struct PanViewport {
    grabbed: Option<Vec2>,
    original: Vec2,
}

impl PanViewport {
    pub fn new() -> Self {
        Self { grabbed: None, original: Vec2::ZERO }
    }
}

impl Default for PanViewport {
    fn default() -> Self {
        Self::new()
    }
}

impl LongBehavior<EditorState> for PanViewport {
    fn begin(&mut self, ctx: &mut ActionCtx<'_, EditorState>) -> bool {
        let Some(cursor) = ctx.cursor else {
            return false;
        };
        self.grabbed = Some(cursor);
        self.original = ctx.state.view_offset;
        true
    }

    fn update(&mut self, ctx: &mut ActionCtx<'_, EditorState>) {
        if let (Some(grabbed), Some(cursor)) = (self.grabbed, ctx.cursor) {
            ctx.state.view_offset = self.original + (cursor - grabbed);
        }
    }

    fn cancel(&mut self, ctx: &mut ActionCtx<'_, EditorState>) {
        ctx.state.view_offset = self.original;
    }
}

/// Toggle tool: plays the animation preview for a fixed number of ticks.
/// Pressing the shortcut again restarts the run from frame zero.
pub struct PreviewRun {
    remaining: u32,
}

impl PreviewRun {
    pub fn new(frames: u32) -> Self {
        Self { remaining: frames }
    }
}

impl LongBehavior<EditorState> for PreviewRun {
    fn begin(&mut self, ctx: &mut ActionCtx<'_, EditorState>) -> bool {
        ctx.state.preview_playing = true;
        ctx.state.preview_frame = 0;
        true
    }

    fn update(&mut self, ctx: &mut ActionCtx<'_, EditorState>) {
        ctx.state.preview_frame += 1;
        self.remaining = self.remaining.saturating_sub(1);
    }

    fn should_finish(&self, _ctx: &ActionCtx<'_, EditorState>) -> bool {
        self.remaining == 0
    }

    fn finish(&mut self, ctx: &mut ActionCtx<'_, EditorState>) {
        ctx.state.preview_playing = false;
    }

    fn cancel(&mut self, ctx: &mut ActionCtx<'_, EditorState>) {
        ctx.state.preview_playing = false;
        ctx.state.preview_frame = 0;
    }
}
