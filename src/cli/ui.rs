use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Defines different styles for text elements.
pub enum StyleType {
    Title,
    Warning,
    Error,
    Subtle,
}

/// Applies a consistent style to a string.
pub fn style_text(text: &str, style_type: StyleType) -> String {
    let styled = match style_type {
        StyleType::Title => style(text).bold().underlined(),
        StyleType::Warning => style(text).yellow(),
        StyleType::Error => style(text).red(),
        StyleType::Subtle => style(text).dim(),
    };
    styled.to_string()
}

/// Creates a new `comfy_table::Table` with standard styling.
pub fn new_styled_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

/// Creates a styled header cell for a table.
pub fn header_cell(text: &str) -> Cell {
    Cell::new(text)
        .fg(Color::Cyan)
        .add_attribute(Attribute::Bold)
}

/// Formats an `Option<T>` into a `Cell`. `None` is displayed as "—".
pub fn format_optional_cell<T>(value: Option<T>, format_fn: impl Fn(T) -> String) -> Cell {
    value.map_or(
        Cell::new("—")
            .fg(Color::DarkGrey)
            .set_alignment(CellAlignment::Right),
        |v| Cell::new(format_fn(v)).set_alignment(CellAlignment::Right),
    )
}

/// Colors a correlation coefficient by sign and strength.
pub fn correlation_cell(value: Option<f64>) -> Cell {
    let Some(r) = value else {
        return Cell::new("—")
            .fg(Color::DarkGrey)
            .set_alignment(CellAlignment::Right);
    };
    let color = if r >= 0.0 { Color::Cyan } else { Color::Red };
    let cell = Cell::new(format!("{r:.3}"))
        .fg(color)
        .set_alignment(CellAlignment::Right);
    if r.abs() >= 0.7 {
        cell.add_attribute(Attribute::Bold)
    } else {
        cell
    }
}

/// Formats large values with K/M/B/T suffixes, e.g. `1_234_567.0` as `1.23M`.
pub fn format_compact(value: f64) -> String {
    let abs = value.abs();
    if abs >= 1e12 {
        format!("{:.2}T", value / 1e12)
    } else if abs >= 1e9 {
        format!("{:.2}B", value / 1e9)
    } else if abs >= 1e6 {
        format!("{:.2}M", value / 1e6)
    } else if abs >= 1e3 {
        format!("{:.1}K", value / 1e3)
    } else {
        format!("{value:.4}")
    }
}

/// Creates a spinner shown while remote data is being fetched.
pub fn new_spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg} [{elapsed_precise}]")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

/// Prints a separator line matching the terminal width.
pub fn print_separator() {
    let term_width = console::Term::stdout()
        .size_checked()
        .map(|(_, w)| w as usize)
        .unwrap_or(80);
    println!("\n{}", "─".repeat(term_width));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_compact() {
        assert_eq!(format_compact(1_234_567.0), "1.23M");
        assert_eq!(format_compact(37_621_450_000.0), "37.62B");
        assert_eq!(format_compact(-2_500.0), "-2.5K");
        assert_eq!(format_compact(2.0e12), "2.00T");
        assert_eq!(format_compact(0.4567), "0.4567");
    }

    #[test]
    fn test_optional_cell_placeholder() {
        let cell = format_optional_cell(None::<f64>, |v| format!("{v}"));
        assert_eq!(cell.content(), "—");
        let cell = format_optional_cell(Some(1.5), |v| format!("{v:.1}"));
        assert_eq!(cell.content(), "1.5");
    }

    #[test]
    fn test_correlation_cell() {
        assert_eq!(correlation_cell(Some(-0.12345)).content(), "-0.123");
        assert_eq!(correlation_cell(None).content(), "—");
    }
}
