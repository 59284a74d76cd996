pub mod canvas;
pub mod focus;
pub mod profile;
pub mod tools;

pub use canvas::{EditorState, SpriteCanvas};
pub use focus::PanelFocus;
