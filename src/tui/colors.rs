//! Color constants for the terminal user interface.

use ratatui::style::Color;

/// Header, status bar and highlighted filter
pub const ACCENT: Color = Color::Rgb(0, 80, 0);
/// Progress bars and the completed badge
pub const DONE_GREEN: Color = Color::Rgb(80, 200, 120);
/// Due dates in the past
pub const OVERDUE_RED: Color = Color::Rgb(200, 40, 40);
/// Rows inside their deletion window
pub const PENDING_GREY: Color = Color::DarkGray;
/// Inline progress editor
pub const GOLD: Color = Color::Rgb(255, 215, 0);
