//! Colorized record composition.
//!
//! A record is one console line:
//!
//! ```text
//! <device:16> <timestamp> <owner> <tag:20> < S > <message>
//! ```
//!
//! Device and tag columns are padded or cut to a fixed width. Styling uses
//! `crossterm::style`, which also honors `NO_COLOR`.

use alog_core::{DeviceId, LogLine, PaletteColor, Severity};
use crossterm::style::{Attribute, Color, Stylize};

/// Width of the device name column.
pub const DEVICE_FIELD_WIDTH: usize = 16;

/// Width of the tag column.
pub const TAG_FIELD_WIDTH: usize = 20;

/// Maps a palette color to its terminal color.
pub fn terminal_color(color: PaletteColor) -> Color {
    match color {
        PaletteColor::Red => Color::DarkRed,
        PaletteColor::Green => Color::DarkGreen,
        PaletteColor::Yellow => Color::DarkYellow,
        PaletteColor::Blue => Color::DarkBlue,
        PaletteColor::Magenta => Color::DarkMagenta,
        PaletteColor::Cyan => Color::DarkCyan,
        PaletteColor::BrightRed => Color::Red,
        PaletteColor::BrightGreen => Color::Green,
        PaletteColor::BrightYellow => Color::Yellow,
        PaletteColor::BrightBlue => Color::Blue,
        PaletteColor::BrightMagenta => Color::Magenta,
        PaletteColor::BrightCyan => Color::Cyan,
    }
}

/// Pads or cuts `s` to exactly `width` characters.
fn fit(s: &str, width: usize) -> String {
    format!("{s:<width$.width$}")
}

/// Renders the three-character severity badge.
///
/// D, I, W, E and F get a colored background (F also blinks); V is grey text;
/// anything else is left unstyled.
pub fn severity_badge(severity: Severity) -> String {
    let text = format!(" {} ", severity.letter());
    match severity {
        Severity::Debug => text.with(Color::Black).on(Color::DarkBlue).to_string(),
        Severity::Info => text.with(Color::Black).on(Color::DarkGreen).to_string(),
        Severity::Warn => text.with(Color::Black).on(Color::DarkYellow).to_string(),
        Severity::Error => text.with(Color::Black).on(Color::DarkRed).to_string(),
        Severity::Fatal => text
            .with(Color::Black)
            .on(Color::DarkRed)
            .attribute(Attribute::SlowBlink)
            .to_string(),
        Severity::Verbose => text.with(Color::Grey).to_string(),
        Severity::Other(_) => text,
    }
}

/// Composes one colorized record for `line` from `device`.
pub fn render_record(
    device: &DeviceId,
    device_color: PaletteColor,
    line: &LogLine,
    tag_color: PaletteColor,
) -> String {
    let device = fit(device.as_str(), DEVICE_FIELD_WIDTH).with(terminal_color(device_color));
    let timestamp = line.timestamp.as_str().with(Color::DarkBlue);
    let owner = line.owner.as_str().with(Color::Black).on(Color::DarkGrey);
    let tag = fit(&line.tag, TAG_FIELD_WIDTH).with(terminal_color(tag_color));
    let badge = severity_badge(line.severity);
    let message = line.message.as_str().with(Color::Black).bold();

    format!("{device} {timestamp} {owner} {tag} {badge} {message}")
}
