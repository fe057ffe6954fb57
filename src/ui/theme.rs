use ratatui::style::Color;

pub const BG_PRIMARY: Color = Color::Rgb(0, 0, 0);
pub const FG_PRIMARY: Color = Color::Rgb(190, 190, 190);
pub const FG_DIM: Color = Color::Rgb(128, 128, 128);

// Brand navy and mint.
pub const BAR_BG: Color = Color::Rgb(23, 38, 50);
pub const BAR_TEXT: Color = Color::Rgb(235, 240, 255);
pub const ACCENT: Color = Color::Rgb(69, 255, 175);

pub const MENU_BG: Color = Color::Rgb(40, 48, 56);
pub const MENU_BORDER: Color = Color::Rgb(208, 208, 208);

pub const BORDER_IDLE: Color = Color::Rgb(61, 120, 120);
pub const BORDER_FOCUS: Color = ACCENT;
pub const ROW_HIGHLIGHT_BG: Color = Color::Rgb(69, 255, 175);
pub const ROW_HIGHLIGHT_FG: Color = Color::Rgb(23, 38, 50);

pub const TOAST_SUCCESS: Color = Color::Rgb(46, 160, 67);
pub const TOAST_INFO: Color = Color::Rgb(56, 139, 253);
pub const TOAST_WARNING: Color = Color::Rgb(210, 153, 34);
pub const TOAST_ERROR: Color = Color::Rgb(218, 54, 51);
