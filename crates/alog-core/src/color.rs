//! Display palette and round-robin color assignment.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of colors in the palette.
pub const PALETTE_SIZE: usize = 12;

/// One of the twelve console colors used for device names and tags.
///
/// Colors are plain values; copying one never aliases shared state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaletteColor {
    Red,
    Green,
    Yellow,
    Blue,
    Magenta,
    Cyan,
    BrightRed,
    BrightGreen,
    BrightYellow,
    BrightBlue,
    BrightMagenta,
    BrightCyan,
}

impl PaletteColor {
    /// Palette in assignment order.
    pub const ALL: [PaletteColor; PALETTE_SIZE] = [
        Self::Red,
        Self::Green,
        Self::Yellow,
        Self::Blue,
        Self::Magenta,
        Self::Cyan,
        Self::BrightRed,
        Self::BrightGreen,
        Self::BrightYellow,
        Self::BrightBlue,
        Self::BrightMagenta,
        Self::BrightCyan,
    ];

    /// Position of this color in [`PaletteColor::ALL`].
    pub fn index(self) -> usize {
        match self {
            Self::Red => 0,
            Self::Green => 1,
            Self::Yellow => 2,
            Self::Blue => 3,
            Self::Magenta => 4,
            Self::Cyan => 5,
            Self::BrightRed => 6,
            Self::BrightGreen => 7,
            Self::BrightYellow => 8,
            Self::BrightBlue => 9,
            Self::BrightMagenta => 10,
            Self::BrightCyan => 11,
        }
    }

    /// Color at `index`, wrapping modulo the palette size.
    pub fn from_index(index: usize) -> Self {
        Self::ALL
            .get(index % PALETTE_SIZE)
            .copied()
            .unwrap_or(Self::Red)
    }

    /// Returns a human-readable name.
    pub fn name(self) -> &'static str {
        match self {
            Self::Red => "red",
            Self::Green => "green",
            Self::Yellow => "yellow",
            Self::Blue => "blue",
            Self::Magenta => "magenta",
            Self::Cyan => "cyan",
            Self::BrightRed => "bright red",
            Self::BrightGreen => "bright green",
            Self::BrightYellow => "bright yellow",
            Self::BrightBlue => "bright blue",
            Self::BrightMagenta => "bright magenta",
            Self::BrightCyan => "bright cyan",
        }
    }
}

impl fmt::Display for PaletteColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Round-robin cursor over the palette.
///
/// Starts at [`PaletteColor::Red`] and wraps after [`PaletteColor::BrightCyan`].
/// Not synchronized; owners wrap it in whatever lock guards their state.
#[derive(Debug, Clone, Default)]
pub struct ColorCycle {
    next: usize,
}

impl ColorCycle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the current color and moves the cursor forward.
    pub fn advance(&mut self) -> PaletteColor {
        let color = PaletteColor::from_index(self.next);
        self.next = (self.next + 1) % PALETTE_SIZE;
        color
    }
}
