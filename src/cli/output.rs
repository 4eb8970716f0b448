//! Output formatting for CLI commands
//!
//! Records print either one at a time (`get`) as a field/value listing,
//! or as a sequence (`list`) with one row per record. Both paths honour
//! the same `--format` and `--fields` options.

use comfy_table::{presets, Table};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::domain::{display_value, Record};

/// Output format
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
    Csv,
    Yaml,
}

#[derive(Debug, Error)]
pub enum OutputError {
    #[error("Invalid field: {0}.")]
    InvalidField(String),

    #[error("Failed to encode JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to encode YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Output helper for consistent formatting
pub struct Output {
    format: OutputFormat,
    verbose: bool,
}

impl Output {
    pub fn new(format: OutputFormat, verbose: bool) -> Self {
        Self { format, verbose }
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }

    /// Prints a success message
    pub fn success(&self, message: &str) {
        println!("Success: {}", message);
    }

    /// Prints a bare line (porcelain ids, messages without a prefix)
    pub fn line(&self, message: &str) {
        println!("{}", message);
    }

    /// Prints one record
    pub fn record<R: Record>(&self, record: &R, fields: Option<&[String]>) -> Result<(), OutputError> {
        print_block(&render_one(record, fields, self.format)?);
        Ok(())
    }

    /// Prints one column of one record
    pub fn field<R: Record>(&self, record: &R, field: &str) -> Result<(), OutputError> {
        print_block(&render_field(record, field, self.format)?);
        Ok(())
    }

    /// Prints a sequence of records
    pub fn records<R: Record>(&self, records: &[R], fields: Option<&[String]>) -> Result<(), OutputError> {
        print_block(&render_many(records, fields, self.format)?);
        Ok(())
    }

    /// Returns true if verbose mode is enabled
    pub fn is_verbose(&self) -> bool {
        self.verbose
    }

    /// Prints a verbose debug message (only when --verbose is set)
    pub fn verbose(&self, message: &str) {
        if self.verbose {
            eprintln!("[verbose] {}", message);
        }
    }

    /// Prints a verbose debug message with context (only when --verbose is set)
    pub fn verbose_ctx(&self, context: &str, message: &str) {
        if self.verbose {
            eprintln!("[verbose:{}] {}", context, message);
        }
    }
}

fn print_block(text: &str) {
    if text.ends_with('\n') {
        print!("{}", text);
    } else {
        println!("{}", text);
    }
}

/// Columns to print: the projection if given (checked against the
/// records), otherwise the record's own columns
fn resolve_columns<R: Record>(
    sample: Option<&R>,
    fields: Option<&[String]>,
) -> Result<Vec<String>, OutputError> {
    match fields {
        Some(fields) => {
            for field in fields {
                let known = match sample {
                    Some(record) => record.value(field).is_some(),
                    None => R::COLUMNS.contains(&field.as_str()),
                };
                if !known {
                    return Err(OutputError::InvalidField(field.clone()));
                }
            }
            Ok(fields.to_vec())
        }
        None => {
            let columns = sample.map_or(R::COLUMNS, |r| r.columns());
            Ok(columns.iter().map(|c| c.to_string()).collect())
        }
    }
}

fn project<R: Record>(record: &R, columns: &[String]) -> Map<String, Value> {
    columns
        .iter()
        .map(|c| (c.clone(), record.value(c).unwrap_or(Value::Null)))
        .collect()
}

/// Renders a single record
pub fn render_one<R: Record>(
    record: &R,
    fields: Option<&[String]>,
    format: OutputFormat,
) -> Result<String, OutputError> {
    let columns = resolve_columns(Some(record), fields)?;
    let object = project(record, &columns);

    let text = match format {
        OutputFormat::Table => {
            let mut table = new_table();
            table.set_header(vec!["Field", "Value"]);
            for (key, value) in &object {
                table.add_row(vec![key.clone(), display_value(value)]);
            }
            table.to_string()
        }
        OutputFormat::Json => serde_json::to_string(&Value::Object(object))?,
        OutputFormat::Csv => {
            let mut lines = vec![csv_line(&["Field".to_string(), "Value".to_string()])];
            for (key, value) in &object {
                lines.push(csv_line(&[key.clone(), display_value(value)]));
            }
            lines.join("\n")
        }
        OutputFormat::Yaml => serde_yaml::to_string(&Value::Object(object))?,
    };
    Ok(text)
}

/// Renders one column of a record; JSON keeps the value's type
pub fn render_field<R: Record>(
    record: &R,
    field: &str,
    format: OutputFormat,
) -> Result<String, OutputError> {
    let value = record
        .value(field)
        .ok_or_else(|| OutputError::InvalidField(field.to_string()))?;

    Ok(match format {
        OutputFormat::Json => serde_json::to_string(&value)?,
        _ => display_value(&value),
    })
}

/// Renders a sequence of records; an empty sequence is still well-formed
pub fn render_many<R: Record>(
    records: &[R],
    fields: Option<&[String]>,
    format: OutputFormat,
) -> Result<String, OutputError> {
    let columns = resolve_columns(records.first(), fields)?;
    let rows: Vec<Map<String, Value>> = records.iter().map(|r| project(r, &columns)).collect();

    let text = match format {
        OutputFormat::Table => {
            let mut table = new_table();
            table.set_header(columns.clone());
            for row in &rows {
                table.add_row(row.values().map(display_value).collect::<Vec<_>>());
            }
            table.to_string()
        }
        OutputFormat::Json => {
            let items: Vec<Value> = rows.into_iter().map(Value::Object).collect();
            serde_json::to_string(&items)?
        }
        OutputFormat::Csv => {
            let mut lines = vec![csv_line(&columns)];
            for row in &rows {
                let cells: Vec<String> = row.values().map(display_value).collect();
                lines.push(csv_line(&cells));
            }
            lines.join("\n")
        }
        OutputFormat::Yaml => {
            let items: Vec<Value> = rows.into_iter().map(Value::Object).collect();
            serde_yaml::to_string(&items)?
        }
    };
    Ok(text)
}

fn new_table() -> Table {
    let mut table = Table::new();
    table.load_preset(presets::ASCII_FULL_CONDENSED);
    table
}

fn csv_line(cells: &[String]) -> String {
    cells
        .iter()
        .map(|cell| csv_escape(cell))
        .collect::<Vec<_>>()
        .join(",")
}

fn csv_escape(cell: &str) -> String {
    if cell.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", cell.replace('"', "\"\""))
    } else {
        cell.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Group, GroupStatus};

    fn group(id: u64, name: &str, slug: &str) -> Group {
        Group {
            id,
            creator_id: 1,
            name: name.to_string(),
            slug: slug.to_string(),
            description: String::new(),
            status: GroupStatus::Public,
            enable_forum: false,
            date_created: "2024-01-01 00:00:00".to_string(),
            url: Group::permalink("http://example.com", slug),
        }
    }

    fn fields(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn one_as_json_uses_default_columns() {
        let out = render_one(&group(1, "Alpha", "alpha"), None, OutputFormat::Json).unwrap();
        let value: Value = serde_json::from_str(&out).unwrap();
        let keys: Vec<_> = value.as_object().unwrap().keys().cloned().collect();
        assert_eq!(keys, Group::COLUMNS);
        assert_eq!(value["url"], "http://example.com/groups/alpha/");
    }

    #[test]
    fn one_as_table_lists_fields() {
        let out = render_one(&group(1, "Alpha", "alpha"), None, OutputFormat::Table).unwrap();
        assert!(out.contains("Field"));
        assert!(out.contains("Value"));
        assert!(out.contains("Alpha"));
        assert!(out.contains("http://example.com/groups/alpha/"));
    }

    #[test]
    fn projection_keeps_requested_order() {
        let records = vec![group(2, "Group 2", "group2"), group(1, "Group 1", "group1")];
        let out = render_many(
            &records,
            Some(&fields(&["slug", "id"])),
            OutputFormat::Json,
        )
        .unwrap();

        let value: Value = serde_json::from_str(&out).unwrap();
        for row in value.as_array().unwrap() {
            let keys: Vec<_> = row.as_object().unwrap().keys().cloned().collect();
            assert_eq!(keys, vec!["slug", "id"]);
        }
        assert_eq!(value[0]["slug"], "group2");
        assert_eq!(value[1]["id"], 1);
    }

    #[test]
    fn many_as_csv() {
        let records = vec![group(1, "One, Two", "one-two")];
        let out = render_many(&records, Some(&fields(&["id", "name"])), OutputFormat::Csv).unwrap();
        assert_eq!(out, "id,name\n1,\"One, Two\"");
    }

    #[test]
    fn many_as_yaml() {
        let records = vec![group(1, "Alpha", "alpha")];
        let out = render_many(&records, Some(&fields(&["id", "name"])), OutputFormat::Yaml).unwrap();
        assert_eq!(out, "- id: 1\n  name: Alpha\n");
    }

    #[test]
    fn empty_list_is_well_formed() {
        let records: Vec<Group> = vec![];
        assert_eq!(render_many(&records, None, OutputFormat::Json).unwrap(), "[]");
        assert_eq!(render_many(&records, None, OutputFormat::Yaml).unwrap(), "[]\n");

        let csv = render_many(&records, Some(&fields(&["id", "name"])), OutputFormat::Csv).unwrap();
        assert_eq!(csv, "id,name");

        let table = render_many(&records, None, OutputFormat::Table).unwrap();
        assert!(table.contains("creator_id"));
    }

    #[test]
    fn unknown_field_is_rejected() {
        let err = render_one(&group(1, "A", "a"), Some(&fields(&["bogus"])), OutputFormat::Table)
            .unwrap_err();
        assert_eq!(err.to_string(), "Invalid field: bogus.");

        let empty: Vec<Group> = vec![];
        assert!(render_many(&empty, Some(&fields(&["bogus"])), OutputFormat::Json).is_err());
    }

    #[test]
    fn single_field_extraction() {
        let g = group(7, "Alpha", "alpha");
        assert_eq!(render_field(&g, "name", OutputFormat::Table).unwrap(), "Alpha");
        assert_eq!(render_field(&g, "name", OutputFormat::Json).unwrap(), "\"Alpha\"");
        assert_eq!(render_field(&g, "id", OutputFormat::Json).unwrap(), "7");
        assert!(render_field(&g, "nope", OutputFormat::Table).is_err());
    }

    #[test]
    fn csv_escaping() {
        assert_eq!(csv_escape("plain"), "plain");
        assert_eq!(csv_escape("a,b"), "\"a,b\"");
        assert_eq!(csv_escape("say \"hi\""), "\"say \"\"hi\"\"\"");
        assert_eq!(csv_escape("two\nlines"), "\"two\nlines\"");
    }
}
