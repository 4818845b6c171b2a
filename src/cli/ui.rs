use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};
use console::style;

/// Defines different styles for text elements.
pub enum StyleType {
    Title,
    TotalLabel,
    TotalValue,
    Error,
    Subtle,
}

/// Applies a consistent style to a string.
pub fn style_text(text: &str, style_type: StyleType) -> String {
    let styled = match style_type {
        StyleType::Title => style(text).bold().underlined(),
        StyleType::TotalLabel => style(text).bold(),
        StyleType::TotalValue => style(text).green().bold(),
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

/// Formats a dollar amount with thousands separators, e.g. `$12,345.67` or `-$5.00`.
pub fn format_money(value: f64) -> String {
    let sign = if value < 0.0 { "-" } else { "" };
    let cents = format!("{:.2}", value.abs());
    let (whole, fraction) = cents.split_once('.').unwrap_or((cents.as_str(), "00"));
    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, digit) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }
    format!("{sign}${grouped}.{fraction}")
}

/// Formats a ratio (0.25) as a percentage (`25.00%`).
pub fn format_ratio(value: f64) -> String {
    format!("{:.2}%", value * 100.0)
}

/// Right-aligned amount, red when negative.
pub fn money_cell(value: f64) -> Cell {
    let cell = Cell::new(format_money(value)).set_alignment(CellAlignment::Right);
    if value < 0.0 { cell.fg(Color::Red) } else { cell }
}

/// Formats a cell with bold and green text
pub fn format_percentage_cell(value: f64) -> Cell {
    Cell::new(format_ratio(value))
        .add_attribute(Attribute::Bold)
        .fg(Color::Green)
        .set_alignment(CellAlignment::Right)
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
    fn test_format_money() {
        assert_eq!(format_money(0.0), "$0.00");
        assert_eq!(format_money(999.5), "$999.50");
        assert_eq!(format_money(1234.567), "$1,234.57");
        assert_eq!(format_money(1_131_000.0), "$1,131,000.00");
        assert_eq!(format_money(-42.1), "-$42.10");
    }

    #[test]
    fn test_format_ratio() {
        assert_eq!(format_ratio(0.14876), "14.88%");
        assert_eq!(format_ratio(0.0), "0.00%");
    }
}
