//! Shared styling utilities for terminal output.

use console::Style;

/// Create a success-styled string (green with checkmark).
pub fn success(msg: &str) -> String {
    let style = Style::new().green();
    format!("{} {}", style.apply_to("✓"), msg)
}

/// Create a warning-styled string (yellow).
pub fn warn(msg: &str) -> String {
    let style = Style::new().yellow();
    format!("{} {}", style.apply_to("⚠"), msg)
}

/// Create an informational string (blue).
pub fn info(msg: &str) -> String {
    let style = Style::new().blue();
    format!("{} {}", style.apply_to("ℹ"), msg)
}

/// Create a header-styled string (bold).
pub fn header(msg: &str) -> String {
    Style::new().bold().apply_to(msg).to_string()
}

/// Create a dim-styled string.
pub fn dim(msg: &str) -> String {
    Style::new().dim().apply_to(msg).to_string()
}

/// Label for the current (ours) side of a conflict.
pub fn current_label(label: &str) -> String {
    Style::new().green().bold().apply_to(label).to_string()
}

/// Label for the incoming (theirs) side of a conflict.
pub fn incoming_label(label: &str) -> String {
    Style::new().blue().bold().apply_to(label).to_string()
}
