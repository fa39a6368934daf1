//! Locating the score fields among the account's custom field definitions.
//!
//! Fields are matched by the tags their options carry first, and by title
//! only when no tagged field exists.

use safewrite_types::FieldOption;
use safewrite_types::score::default_impact_options;

use crate::model::TicketField;

const IMPACT_TAG_PREFIX: &str = "cps_impact_";
const OVERRIDE_TAG_PREFIX: &str = "cps_override_";
const SECURITY_TAG: &str = "cps_security_flag";
const SCORE_TITLE_MARKER: &str = "cps";

const IMPACT_TITLES: &[&str] = &["impact", "cps impact"];
const SECURITY_TITLES: &[&str] = &["cps security flag"];
const OVERRIDE_TITLES: &[&str] = &["cps manager override"];
const SCORE_TITLES: &[&str] = &["cps", "customer priority score"];

/// Custom field ids for each score input and for the score itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldMapping {
    pub impact: Option<u64>,
    pub security: Option<u64>,
    pub manager_override: Option<u64>,
    pub score: Option<u64>,
    /// Options of the impact field, or High/Medium/Low when it has none.
    pub impact_options: Vec<FieldOption>,
}

impl Default for FieldMapping {
    fn default() -> Self {
        Self {
            impact: None,
            security: None,
            manager_override: None,
            score: None,
            impact_options: default_impact_options(),
        }
    }
}

impl FieldMapping {
    #[must_use]
    pub fn discover(fields: &[TicketField]) -> Self {
        let impact = dropdown_with_tag_prefix(fields, IMPACT_TAG_PREFIX)
            .or_else(|| by_title(fields, IMPACT_TITLES));
        let manager_override = dropdown_with_tag_prefix(fields, OVERRIDE_TAG_PREFIX)
            .or_else(|| by_title(fields, OVERRIDE_TITLES));
        let security = fields
            .iter()
            .find(|f| f.kind == "checkbox" && f.tag.as_deref() == Some(SECURITY_TAG))
            .map(|f| f.id)
            .or_else(|| by_title(fields, SECURITY_TITLES));
        let score = fields
            .iter()
            .find(|f| f.kind == "integer" && f.title.to_lowercase().contains(SCORE_TITLE_MARKER))
            .map(|f| f.id)
            .or_else(|| by_title(fields, SCORE_TITLES));

        let impact_options = impact
            .and_then(|id| fields.iter().find(|f| f.id == id))
            .map(|f| f.custom_field_options.clone())
            .filter(|options| !options.is_empty())
            .unwrap_or_else(default_impact_options);

        let mapping = Self {
            impact,
            security,
            manager_override,
            score,
            impact_options,
        };
        tracing::debug!(?mapping, fields = fields.len(), "Discovered field mapping");
        mapping
    }

    /// Both fields a score cannot be computed or stored without.
    #[must_use]
    pub fn core_fields(&self) -> Option<(u64, u64)> {
        self.impact.zip(self.score)
    }
}

fn dropdown_with_tag_prefix(fields: &[TicketField], prefix: &str) -> Option<u64> {
    fields
        .iter()
        .find(|f| {
            f.is_dropdown()
                && f.custom_field_options
                    .iter()
                    .any(|option| option.value.starts_with(prefix))
        })
        .map(|f| f.id)
}

// Titles are tried in order; earlier titles win.
fn by_title(fields: &[TicketField], titles: &[&str]) -> Option<u64> {
    titles
        .iter()
        .find_map(|title| fields.iter().find(|f| f.title_is(title)))
        .map(|f| f.id)
}
