//! Wire types for tickets and ticket field definitions.

use chrono::{DateTime, Utc};
use safewrite_types::{FieldOption, Priority};
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Clone, Deserialize)]
pub struct Ticket {
    pub id: u64,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub priority: Option<String>,
    #[serde(default)]
    pub custom_fields: Vec<CustomFieldValue>,
}

impl Ticket {
    /// Current value of a custom field. Absent fields read as `Value::Null`.
    #[must_use]
    pub fn field_value(&self, field_id: u64) -> &Value {
        static NULL: Value = Value::Null;
        self.custom_fields
            .iter()
            .find(|field| field.id == field_id)
            .map_or(&NULL, |field| &field.value)
    }

    #[must_use]
    pub fn priority(&self) -> Option<Priority> {
        self.priority.as_deref().and_then(Priority::parse)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CustomFieldValue {
    pub id: u64,
    #[serde(default)]
    pub value: Value,
}

/// A custom field definition.
#[derive(Debug, Clone, Deserialize)]
pub struct TicketField {
    pub id: u64,
    /// `tagger`, `multiselect`, `checkbox`, `integer`, ...
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub tag: Option<String>,
    #[serde(default, deserialize_with = "options_or_empty")]
    pub custom_field_options: Vec<FieldOption>,
}

impl TicketField {
    pub(crate) fn title_is(&self, title: &str) -> bool {
        self.title.trim().eq_ignore_ascii_case(title)
    }

    pub(crate) fn is_dropdown(&self) -> bool {
        matches!(self.kind.as_str(), "tagger" | "multiselect")
    }
}

// Options are `null` on some field types.
fn options_or_empty<'de, D>(deserializer: D) -> Result<Vec<FieldOption>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<Vec<FieldOption>>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Deserialize)]
pub(crate) struct TicketEnvelope {
    pub ticket: Ticket,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TicketFieldPage {
    #[serde(default)]
    pub ticket_fields: Vec<TicketField>,
    #[serde(default)]
    pub next_page: Option<String>,
}
