//! Theme and Colors
//!
//! Babbel's terminal palette. Muted, readable, no pixel art.

use ratatui::style::Color;

/// User message prefix
pub const USER_GREEN: Color = Color::Rgb(130, 220, 130);

/// Assistant accent (prefix, typing cursor)
pub const ASSISTANT_CYAN: Color = Color::Rgb(120, 200, 230);

/// System/dim text
pub const DIM_GRAY: Color = Color::Rgb(100, 100, 100);

/// Error red
pub const ERROR_RED: Color = Color::Rgb(255, 80, 80);

/// Warning amber
pub const WARNING_AMBER: Color = Color::Rgb(240, 190, 90);

/// Info blue
pub const INFO_BLUE: Color = Color::Rgb(150, 180, 255);
