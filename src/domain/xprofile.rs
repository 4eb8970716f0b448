//! Extended profile (xprofile) domain model
//!
//! Field groups own fields; fields hold per-user data values. The value
//! shape depends on the field type: checkbox fields store a set of
//! options, everything else stores one string.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::record::Record;

/// Field types the site knows how to store and render
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum FieldType {
    #[serde(rename = "checkbox")]
    Checkbox,
    #[serde(rename = "checkbox_acceptance")]
    CheckboxAcceptance,
    #[serde(rename = "datebox")]
    Datebox,
    #[serde(rename = "multiselectbox")]
    MultiSelectBox,
    #[serde(rename = "number")]
    Number,
    #[serde(rename = "radio")]
    Radio,
    #[serde(rename = "selectbox")]
    SelectBox,
    #[serde(rename = "telephone")]
    Telephone,
    #[serde(rename = "textarea")]
    Textarea,
    #[default]
    #[serde(rename = "textbox")]
    Textbox,
    #[serde(rename = "url")]
    Url,
    #[serde(rename = "wp-biography")]
    WpBiography,
    #[serde(rename = "wp-textbox")]
    WpTextbox,
}

impl FieldType {
    /// Every accepted type, in the order the site lists them
    pub const ALL: &'static [FieldType] = &[
        FieldType::Checkbox,
        FieldType::CheckboxAcceptance,
        FieldType::Datebox,
        FieldType::MultiSelectBox,
        FieldType::Number,
        FieldType::Radio,
        FieldType::SelectBox,
        FieldType::Telephone,
        FieldType::Textarea,
        FieldType::Textbox,
        FieldType::Url,
        FieldType::WpBiography,
        FieldType::WpTextbox,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::Checkbox => "checkbox",
            FieldType::CheckboxAcceptance => "checkbox_acceptance",
            FieldType::Datebox => "datebox",
            FieldType::MultiSelectBox => "multiselectbox",
            FieldType::Number => "number",
            FieldType::Radio => "radio",
            FieldType::SelectBox => "selectbox",
            FieldType::Telephone => "telephone",
            FieldType::Textarea => "textarea",
            FieldType::Textbox => "textbox",
            FieldType::Url => "url",
            FieldType::WpBiography => "wp-biography",
            FieldType::WpTextbox => "wp-textbox",
        }
    }
}

impl std::fmt::Display for FieldType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for FieldType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FieldType::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| {
                let names: Vec<_> = FieldType::ALL.iter().map(|t| t.as_str()).collect();
                format!("Not a valid field type: {} (expected one of: {})", s, names.join(", "))
            })
    }
}

/// A group of profile fields
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldGroup {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub group_order: i64,
    pub can_delete: bool,
}

impl Record for FieldGroup {
    const COLUMNS: &'static [&'static str] =
        &["id", "name", "description", "group_order", "can_delete"];

    fn value(&self, column: &str) -> Option<Value> {
        let value = match column {
            "id" => json!(self.id),
            "name" => json!(self.name),
            "description" => json!(self.description),
            "group_order" => json!(self.group_order),
            "can_delete" => json!(self.can_delete),
            _ => return None,
        };
        Some(value)
    }
}

/// Input for creating a field group
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewFieldGroup {
    pub name: String,
    pub description: String,
    pub can_delete: bool,
}

/// A profile field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    pub id: u64,
    pub group_id: u64,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub is_required: bool,
    #[serde(default)]
    pub field_order: i64,
    pub can_delete: bool,
}

impl Field {
    /// A field without an identity was never stored
    pub fn has_identity(&self) -> bool {
        self.id != 0
    }
}

const FIELD_COLUMNS: &[&str] = &[
    "id",
    "group_id",
    "type",
    "name",
    "description",
    "is_required",
    "field_order",
    "can_delete",
];

impl Record for Field {
    const COLUMNS: &'static [&'static str] = FIELD_COLUMNS;

    fn value(&self, column: &str) -> Option<Value> {
        let value = match column {
            "id" => json!(self.id),
            "group_id" => json!(self.group_id),
            "type" => json!(self.field_type.as_str()),
            "name" => json!(self.name),
            "description" => json!(self.description),
            "is_required" => json!(self.is_required),
            "field_order" => json!(self.field_order),
            "can_delete" => json!(self.can_delete),
            _ => return None,
        };
        Some(value)
    }
}

/// Input for creating a field
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewField {
    pub group_id: u64,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    pub name: String,
    pub description: String,
    pub is_required: bool,
    pub can_delete: bool,
}

/// A stored profile value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DataValue {
    Single(String),
    Multi(Vec<String>),
}

impl DataValue {
    /// Converts raw input to the shape a field of `field_type` stores.
    ///
    /// Checkbox input is split on commas; empty items are dropped.
    pub fn for_field(field_type: FieldType, raw: &str) -> Self {
        match field_type {
            FieldType::Checkbox => DataValue::Multi(
                raw.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect(),
            ),
            _ => DataValue::Single(raw.to_string()),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            DataValue::Single(s) => s.is_empty(),
            DataValue::Multi(items) => items.is_empty(),
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            DataValue::Single(s) => json!(s),
            DataValue::Multi(items) => json!(items),
        }
    }
}

/// A field as listed, optionally carrying one user's value
#[derive(Debug, Clone)]
pub struct FieldRow {
    pub field: Field,
    pub data: Option<Option<DataValue>>,
}

impl FieldRow {
    pub fn new(field: Field) -> Self {
        Self { field, data: None }
    }

    pub fn with_data(field: Field, data: Option<DataValue>) -> Self {
        Self {
            field,
            data: Some(data),
        }
    }
}

const FIELD_ROW_COLUMNS_WITH_DATA: &[&str] = &[
    "id",
    "group_id",
    "type",
    "name",
    "description",
    "is_required",
    "field_order",
    "can_delete",
    "data",
];

impl Record for FieldRow {
    const COLUMNS: &'static [&'static str] = FIELD_ROW_COLUMNS_WITH_DATA;

    fn columns(&self) -> &'static [&'static str] {
        if self.data.is_some() {
            FIELD_ROW_COLUMNS_WITH_DATA
        } else {
            FIELD_COLUMNS
        }
    }

    fn value(&self, column: &str) -> Option<Value> {
        match (column, &self.data) {
            ("data", Some(data)) => Some(data.as_ref().map_or(Value::Null, DataValue::to_json)),
            _ => self.field.value(column),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn field(field_type: FieldType) -> Field {
        Field {
            id: 5,
            group_id: 1,
            field_type,
            name: "Hobbies".to_string(),
            description: String::new(),
            is_required: false,
            field_order: 0,
            can_delete: true,
        }
    }

    #[test]
    fn checkbox_value_splits() {
        let value = DataValue::for_field(FieldType::Checkbox, "a,b,c");
        assert_eq!(
            value,
            DataValue::Multi(vec!["a".into(), "b".into(), "c".into()])
        );
    }

    #[test]
    fn checkbox_value_trims_and_drops_empties() {
        let value = DataValue::for_field(FieldType::Checkbox, " a , ,b,");
        assert_eq!(value, DataValue::Multi(vec!["a".into(), "b".into()]));
    }

    #[test]
    fn other_types_keep_literal() {
        for field_type in FieldType::ALL.iter().filter(|t| **t != FieldType::Checkbox) {
            assert_eq!(
                DataValue::for_field(*field_type, "a,b,c"),
                DataValue::Single("a,b,c".into())
            );
        }
    }

    #[test]
    fn field_type_parse_round_trip() {
        for field_type in FieldType::ALL {
            assert_eq!(field_type.as_str().parse::<FieldType>().unwrap(), *field_type);
        }
        let err = "fancybox".parse::<FieldType>().unwrap_err();
        assert!(err.contains("Not a valid field type"));
    }

    #[test]
    fn field_type_default_is_textbox() {
        assert_eq!(FieldType::default(), FieldType::Textbox);
    }

    #[test]
    fn field_identity() {
        let mut f = field(FieldType::Textbox);
        assert!(f.has_identity());
        f.id = 0;
        assert!(!f.has_identity());
    }

    #[test]
    fn field_row_data_column() {
        let plain = FieldRow::new(field(FieldType::Textbox));
        assert!(!plain.columns().contains(&"data"));
        assert_eq!(plain.value("data"), None);

        let with = FieldRow::with_data(
            field(FieldType::Checkbox),
            Some(DataValue::Multi(vec!["x".into()])),
        );
        assert_eq!(with.columns().last(), Some(&"data"));
        assert_eq!(with.value("data"), Some(json!(["x"])));

        let missing = FieldRow::with_data(field(FieldType::Textbox), None);
        assert_eq!(missing.value("data"), Some(Value::Null));
    }

    #[test]
    fn data_value_json_shape() {
        let single: DataValue = serde_json::from_str("\"hi\"").unwrap();
        assert_eq!(single, DataValue::Single("hi".into()));
        let multi: DataValue = serde_json::from_str("[\"a\",\"b\"]").unwrap();
        assert_eq!(multi, DataValue::Multi(vec!["a".into(), "b".into()]));
    }

    proptest! {
        #[test]
        fn checkbox_item_count_matches_nonempty_segments(items in prop::collection::vec("[a-z]{1,6}", 1..8)) {
            let raw = items.join(",");
            match DataValue::for_field(FieldType::Checkbox, &raw) {
                DataValue::Multi(values) => prop_assert_eq!(values, items),
                DataValue::Single(_) => prop_assert!(false, "checkbox produced a single value"),
            }
        }
    }
}
