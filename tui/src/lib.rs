//! Babbel TUI
//!
//! Terminal surface for the babbel chat core. A thin client: it renders
//! the display state derived from [`babbel_core::ChatEvent`]s and
//! forwards submit/cancel/clear to the controller.

mod app;
mod display;
mod theme;

pub use app::App;
pub use display::{DisplayMessage, DisplayState, Notice};
