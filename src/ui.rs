//! Terminal drawing for bb.
//!
//! [columns] places the configured columns, [render] paints the screen.

pub mod columns;
pub mod render;

pub use columns::{Column, ColumnSpec, Layout};
pub use render::Renderer;
