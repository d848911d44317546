//! Terminal UI module using ratatui.
//!
//! - `render`: frame layout, item grid/list and overlays
//! - `input`: keyboard event handling
//! - `styles`: color palette and text styling

pub mod input;
pub mod render;
pub mod styles;
