use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Column holding the remote use case identifier after normalisation.
pub const IDENTIFIER_COLUMN: &str = "use_case_id";
/// Raw column name renamed to [`IDENTIFIER_COLUMN`] on load.
pub const RAW_IDENTIFIER_COLUMN: &str = "id";
/// JSON:API resource type of the custom field update payload.
pub const PATCH_RESOURCE_TYPE: &str = "use_case_custom_fields";

/// A single input row, restricted to the identifier and requested fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    /// 0-based position of the row among the data rows of the input file.
    pub index: usize,
    /// Remote use case identifier.
    pub use_case_id: String,
    /// Field name → text value. Blank cells hold an empty string.
    pub values: BTreeMap<String, String>,
}

impl Record {
    /// Returns the value of `field`, or an empty string when the row has none.
    pub fn value(&self, field: &str) -> &str {
        self.values.get(field).map(String::as_str).unwrap_or_default()
    }
}

/// Ordered, prepared input rows.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RecordTable {
    /// Header row after the identifier rename, in file order.
    pub columns: Vec<String>,
    pub records: Vec<Record>,
}

impl RecordTable {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Record> {
        self.records.iter()
    }
}

/// A remote custom field definition as listed by the tenant catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomFieldDefinition {
    pub id: String,
    pub name: String,
}

/// Requested field name → remote custom field identifier.
///
/// Names that could not be resolved are simply absent.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FieldIdMap(BTreeMap<String, String>);

impl FieldIdMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Maps every name onto itself. Used as a stand-in when the catalog is
    /// not consulted.
    pub fn identity<S: AsRef<str>>(names: &[S]) -> Self {
        Self(
            names
                .iter()
                .map(|name| (name.as_ref().to_string(), name.as_ref().to_string()))
                .collect(),
        )
    }

    pub fn insert(&mut self, name: impl Into<String>, id: impl Into<String>) {
        self.0.insert(name.into(), id.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Body of a custom field update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatchPayload {
    pub data: PatchData,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatchData {
    #[serde(rename = "type")]
    pub kind: String,
    pub attributes: PatchAttributes,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatchAttributes {
    pub custom_field_id: String,
    pub value: String,
}

impl PatchPayload {
    pub fn new(custom_field_id: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            data: PatchData {
                kind: PATCH_RESOURCE_TYPE.to_string(),
                attributes: PatchAttributes {
                    custom_field_id: custom_field_id.into(),
                    value: value.into(),
                },
            },
        }
    }
}

/// One update call for a (row, field) pair. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchRequest {
    pub url: String,
    pub payload: PatchPayload,
}

/// Status and body of an answered update call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchReply {
    pub status: u16,
    pub body: String,
}

impl PatchReply {
    /// Statuses below 400 count as success, redirects included.
    pub fn is_success(&self) -> bool {
        self.status < 400
    }
}
