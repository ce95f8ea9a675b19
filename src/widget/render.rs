//! Text rendering of widgets
//!
//! Produces the terminal view of a widget for each display mode. Missing
//! paths render as [`MISSING_PLACEHOLDER`] and never fail.

use crate::format::{display_value, display_value_opt, format_currency, numeric_value, MISSING_PLACEHOLDER};
use crate::json::path::resolve_opt;
use crate::widget::{DisplayMode, History, WidgetData};
use serde_json::Value;
use std::fmt::Write;

const TABLE_MAX_COLUMNS: usize = 4;
const TABLE_MAX_ROWS: usize = 10;
const SPARK_LEVELS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

/// Render a widget with its refresh state
///
/// `error` is the latest refresh failure, shown instead of content.
pub fn render_widget(widget: &WidgetData, error: Option<&str>, history: &History) -> String {
    let mut out = render_header(widget);

    if let Some(message) = error {
        out.push_str("  Failed to update\n");
        let _ = writeln!(out, "  {}", message);
        return out;
    }

    let Some(document) = widget.last_data.as_ref() else {
        out.push_str("  Initializing connection...\n");
        return out;
    };

    match widget.config.display_mode {
        DisplayMode::Card => render_card(widget, document, &mut out),
        DisplayMode::Table => render_table(widget, document, &mut out),
        DisplayMode::Chart => render_chart(widget, document, history, &mut out),
    }

    out
}

fn render_header(widget: &WidgetData) -> String {
    let mut header = format!(
        "{} [{} | {}s refresh",
        widget.config.name, widget.config.display_mode, widget.config.refresh_interval
    );
    if widget.is_loading {
        header.push_str(" | loading");
    }
    if !widget.last_updated.is_empty() {
        let _ = write!(header, " | updated {}", widget.last_updated);
    }
    header.push_str("]\n");
    header
}

fn render_card(widget: &WidgetData, document: &Value, out: &mut String) {
    for (i, field) in widget.config.selected_fields.iter().enumerate() {
        let value = resolve_opt(Some(document), &field.path);
        let shown = match value {
            Some(v) if numeric_value(v).is_some() => format_currency(v),
            other => display_value_opt(other),
        };

        let marker = if i == 0 { "  * Live" } else { "" };
        let _ = writeln!(out, "  {}: {}{}", field.display_label(), shown, marker);
    }
}

fn render_table(widget: &WidgetData, document: &Value, out: &mut String) {
    let rows = widget.config.selected_fields.iter().find_map(|f| {
        match resolve_opt(Some(document), &f.path) {
            Some(Value::Array(items)) => Some(items),
            _ => None,
        }
    });

    match rows {
        Some(rows) => render_rows(rows, out),
        None => {
            for field in &widget.config.selected_fields {
                let value = display_value_opt(resolve_opt(Some(document), &field.path));
                let _ = writeln!(out, "  {:<16} {}", field.display_label().to_uppercase(), value);
            }
        }
    }
}

fn render_rows(rows: &[Value], out: &mut String) {
    let keys: Vec<&String> = match rows.first() {
        Some(Value::Object(first)) => first.keys().take(TABLE_MAX_COLUMNS).collect(),
        _ => Vec::new(),
    };

    let (headers, cells): (Vec<String>, Vec<Vec<String>>) = if keys.is_empty() {
        (
            vec!["value".to_string()],
            rows.iter()
                .take(TABLE_MAX_ROWS)
                .map(|row| vec![display_value(row)])
                .collect(),
        )
    } else {
        (
            keys.iter().map(|k| k.replacen('_', " ", 1)).collect(),
            rows.iter()
                .take(TABLE_MAX_ROWS)
                .map(|row| {
                    keys.iter()
                        .map(|k| display_value_opt(row.get(k.as_str())))
                        .collect()
                })
                .collect(),
        )
    };

    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in &cells {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    write_row(out, &headers, &widths);
    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    write_row(out, &rule, &widths);
    for row in &cells {
        write_row(out, row, &widths);
    }
}

fn write_row(out: &mut String, cells: &[String], widths: &[usize]) {
    out.push(' ');
    for (cell, width) in cells.iter().zip(widths) {
        let pad = width.saturating_sub(cell.chars().count());
        let _ = write!(out, " {}{}", cell, " ".repeat(pad));
    }
    out.push('\n');
}

fn render_chart(widget: &WidgetData, document: &Value, history: &History, out: &mut String) {
    if history.len() > 1 {
        let values = history.values();
        let _ = writeln!(out, "  {}", sparkline(&values));
        if let (Some(first), Some(last)) = (history.iter().next(), history.latest()) {
            let _ = writeln!(out, "  {} .. {} ({} points)", first.time, last.time, history.len());
        }
    } else {
        out.push_str("  Collecting data points...\n");
    }

    let primary = widget.config.primary_field();
    let label = primary
        .map(|f| f.display_label())
        .unwrap_or_else(|| "Value".to_string());
    let value = primary
        .and_then(|f| resolve_opt(Some(document), &f.path))
        .map(format_currency)
        .unwrap_or_else(|| MISSING_PLACEHOLDER.to_string());

    let _ = writeln!(out, "  {}: {}", label.to_uppercase(), value);
}

/// One block character per value, scaled between the series min and max
pub fn sparkline(values: &[f64]) -> String {
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let span = max - min;
    let top = (SPARK_LEVELS.len() - 1) as f64;

    values
        .iter()
        .map(|v| {
            let level = if span > 0.0 {
                (((v - min) / span) * top).round() as usize
            } else {
                SPARK_LEVELS.len() / 2
            };
            SPARK_LEVELS[level.min(SPARK_LEVELS.len() - 1)]
        })
        .collect()
}
