//! Column descriptors for printable records

use serde_json::Value;

/// A record the output formatter can print.
///
/// `COLUMNS` lists every column the type can show, in display order.
/// `columns` is the default projection for one instance; a type may
/// narrow it depending on what was loaded (e.g. a field row with or
/// without user data).
pub trait Record {
    const COLUMNS: &'static [&'static str];

    /// Ordered column names shown when no `--fields` projection is given
    fn columns(&self) -> &'static [&'static str] {
        Self::COLUMNS
    }

    /// Typed value for a column, or `None` if the record has no such column
    fn value(&self, column: &str) -> Option<Value>;
}

/// Renders a value for table and csv cells
pub fn display_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .map(display_value)
            .collect::<Vec<_>>()
            .join(", "),
        Value::Object(_) => value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn display_scalars() {
        assert_eq!(display_value(&json!(null)), "");
        assert_eq!(display_value(&json!(true)), "true");
        assert_eq!(display_value(&json!(42)), "42");
        assert_eq!(display_value(&json!("foo")), "foo");
    }

    #[test]
    fn display_list_joins_items() {
        assert_eq!(display_value(&json!(["a", "b", "c"])), "a, b, c");
        assert_eq!(display_value(&json!([])), "");
    }
}
