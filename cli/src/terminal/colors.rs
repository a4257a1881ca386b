use colored::Color;

pub const PRIMARY: Color = Color::BrightGreen;
pub const ACCENT: Color = Color::BrightCyan;
pub const SEPARATOR: Color = Color::BrightBlack;
pub const TEXT_DEFAULT: Color = Color::White;
pub const MATCH: Color = Color::Green;
pub const MUTED: Color = Color::TrueColor {
    r: 128,
    g: 128,
    b: 140,
};
