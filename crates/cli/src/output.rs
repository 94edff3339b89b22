//! Output formatting for CLI

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Default)]
pub enum OutputFormat {
    /// Human-readable table format
    #[default]
    Table,
    /// JSON format
    Json,
    /// YAML format
    Yaml,
    /// Plain text format
    Plain,
}

/// Trait for items that can be displayed in a table
pub trait TableDisplay {
    fn headers() -> Vec<&'static str>;
    fn row(&self) -> Vec<String>;
}

fn table<T: TableDisplay>(rows: impl IntoIterator<Item = Vec<String>>) -> String {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(T::headers());
    for row in rows {
        table.add_row(row);
    }
    table.to_string()
}

fn plain<T: TableDisplay>(item: &T) -> String {
    T::headers()
        .iter()
        .zip(item.row())
        .map(|(header, value)| format!("{}: {}", header, value))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Render a single item
pub fn render_item<T: Serialize + TableDisplay>(item: &T, format: OutputFormat) -> String {
    match format {
        OutputFormat::Table => table::<T>([item.row()]),
        OutputFormat::Json => serde_json::to_string_pretty(item).unwrap_or_default(),
        OutputFormat::Yaml => serde_yaml::to_string(item).unwrap_or_default(),
        OutputFormat::Plain => plain(item),
    }
}

/// Render a list of items
pub fn render_list<T: Serialize + TableDisplay>(items: &[T], format: OutputFormat) -> String {
    match format {
        OutputFormat::Table | OutputFormat::Plain if items.is_empty() => {
            "No items found.".to_string()
        }
        OutputFormat::Table => table::<T>(items.iter().map(T::row)),
        OutputFormat::Json => serde_json::to_string_pretty(items).unwrap_or_default(),
        OutputFormat::Yaml => serde_yaml::to_string(items).unwrap_or_default(),
        OutputFormat::Plain => items
            .iter()
            .map(plain)
            .collect::<Vec<_>>()
            .join("\n---\n"),
    }
}

/// Print a single item
pub fn print_item<T: Serialize + TableDisplay>(item: &T, format: OutputFormat) {
    println!("{}", render_item(item, format));
}

/// Print a list of items
pub fn print_list<T: Serialize + TableDisplay>(items: &[T], format: OutputFormat) {
    println!("{}", render_list(items, format));
}

/// Print a simple message
pub fn print_message(message: &str, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::json!({ "message": message }));
        }
        _ => {
            println!("{}", message);
        }
    }
}

/// Print success message
pub fn print_success(message: &str) {
    println!("✅ {}", message);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Serialize)]
    struct Row {
        name: String,
        count: usize,
    }

    impl TableDisplay for Row {
        fn headers() -> Vec<&'static str> {
            vec!["Name", "Count"]
        }

        fn row(&self) -> Vec<String> {
            vec![self.name.clone(), self.count.to_string()]
        }
    }

    fn rows() -> Vec<Row> {
        vec![
            Row {
                name: "cats".to_string(),
                count: 3,
            },
            Row {
                name: "dogs".to_string(),
                count: 0,
            },
        ]
    }

    #[test]
    fn test_plain_list() {
        assert_eq!(
            render_list(&rows(), OutputFormat::Plain),
            "Name: cats\nCount: 3\n---\nName: dogs\nCount: 0"
        );
    }

    #[test]
    fn test_json_list() {
        let value: serde_json::Value =
            serde_json::from_str(&render_list(&rows(), OutputFormat::Json)).unwrap();
        assert_eq!(value[1]["name"], "dogs");
    }

    #[test]
    fn test_yaml_item() {
        let yaml = render_item(&rows()[0], OutputFormat::Yaml);
        assert!(yaml.contains("name: cats"));
        assert!(yaml.contains("count: 3"));
    }

    #[test]
    fn test_table_has_headers_and_rows() {
        let table = render_list(&rows(), OutputFormat::Table);
        assert!(table.contains("Name"));
        assert!(table.contains("cats"));
        assert!(table.contains("dogs"));
    }

    #[test]
    fn test_empty_list() {
        let empty: Vec<Row> = Vec::new();
        assert_eq!(render_list(&empty, OutputFormat::Table), "No items found.");
        assert_eq!(render_list(&empty, OutputFormat::Json), "[]");
    }
}
