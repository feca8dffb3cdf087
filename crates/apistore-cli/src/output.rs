//! Output formatting for the CLI.

use clap::ValueEnum;
use serde_json::Value;

/// Output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Print a JSON value, pretty in both formats.
pub fn print_value(value: &Value) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Print a success message, optionally carrying the id it produced.
pub fn print_success(message: &str, id: Option<&str>, format: &OutputFormat) {
    match format {
        OutputFormat::Text => match id {
            Some(id) => println!("{}: {}", message, id),
            None => println!("{}", message),
        },
        OutputFormat::Json => {
            let mut body = serde_json::json!({ "status": "success", "message": message });
            if let Some(id) = id {
                body["id"] = Value::String(id.to_string());
            }
            println!("{}", body);
        }
    }
}

/// Print an error message.
pub fn print_error(message: &str, format: &OutputFormat) {
    match format {
        OutputFormat::Text => eprintln!("Error: {}", message),
        OutputFormat::Json => {
            eprintln!(
                "{}",
                serde_json::json!({ "status": "error", "message": message })
            );
        }
    }
}

/// Print a table of `columns` read from each row object.
pub fn print_table(rows: &[Value], columns: &[(&str, usize)], empty: &str) {
    if rows.is_empty() {
        println!("{}", empty);
        return;
    }

    let header: Vec<String> = columns
        .iter()
        .map(|(name, width)| format!("{:<width$}", capitalize(name), width = width))
        .collect();
    println!("{}", header.join(" ").trim_end());
    println!("{}", "-".repeat(columns.iter().map(|(_, w)| w + 1).sum::<usize>()));

    for row in rows {
        let cells: Vec<String> = columns
            .iter()
            .map(|(name, width)| format!("{:<width$}", cell(row, name), width = width))
            .collect();
        println!("{}", cells.join(" ").trim_end());
    }
}

fn cell(row: &Value, name: &str) -> String {
    match row.get(name) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => "-".to_string(),
        Some(other) => other.to_string(),
    }
}

fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn cell_renders_strings_and_missing_values() {
        let row = json!({"id": "ep-1", "path": "/people", "name": null, "order": 2});
        assert_eq!(cell(&row, "id"), "ep-1");
        assert_eq!(cell(&row, "name"), "-");
        assert_eq!(cell(&row, "missing"), "-");
        assert_eq!(cell(&row, "order"), "2");
    }

    #[test]
    fn capitalize_header() {
        assert_eq!(capitalize("path"), "Path");
        assert_eq!(capitalize(""), "");
    }
}
