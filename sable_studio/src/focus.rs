use sable_core::{ContextId, FocusTracker};

/// Tracks which panel owns UI focus. The host moves focus as panels are
/// clicked; the dispatcher reads it once per tick.
pub struct PanelFocus {
    current: ContextId,
}

impl PanelFocus {
    pub fn new(initial: ContextId) -> Self {
        Self { current: initial }
    }

    pub fn focus(&mut self, context: ContextId) {
        self.current = context;
    }

    pub fn current(&self) -> ContextId {
        self.current
    }
}

impl FocusTracker for PanelFocus {
    fn current_context(&self) -> ContextId {
        self.current
    }
}
