//! Customer priority score.
//!
//! The score is the sum of five independent components, each derived from a
//! ticket field:
//!
//! | Component | Source | Points |
//! |-----------|--------|--------|
//! | Impact | impact dropdown | 12 / 8 / 4 for high / medium / low |
//! | Priority | ticket priority | [`PriorityPoints`], 12 / 8 / 4 / 0 by default |
//! | Time open | creation timestamp | 6 after a week, 4 after 3 days, 2 after a day |
//! | Security | security checkbox | 4 when set |
//! | Override | manager override dropdown | 1-5 as selected |

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Points awarded per impact option position (high, medium, low).
const IMPACT_POINTS: [u32; 3] = [12, 8, 4];

const SECURITY_POINTS: u32 = 4;

const MAX_OVERRIDE: u32 = 5;

/// Ticket priority as reported by the remote system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Urgent,
    High,
    Normal,
    Low,
}

impl Priority {
    /// Parse a priority name, case-insensitively. Unknown names yield `None`.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "urgent" => Some(Self::Urgent),
            "high" => Some(Self::High),
            "normal" => Some(Self::Normal),
            "low" => Some(Self::Low),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Urgent => "urgent",
            Self::High => "high",
            Self::Normal => "normal",
            Self::Low => "low",
        }
    }
}

/// Points awarded per ticket priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriorityPoints {
    pub urgent: u32,
    pub high: u32,
    pub normal: u32,
    pub low: u32,
}

impl Default for PriorityPoints {
    fn default() -> Self {
        Self {
            urgent: 12,
            high: 8,
            normal: 4,
            low: 0,
        }
    }
}

impl PriorityPoints {
    #[must_use]
    pub const fn for_priority(&self, priority: Priority) -> u32 {
        match priority {
            Priority::Urgent => self.urgent,
            Priority::High => self.high,
            Priority::Normal => self.normal,
            Priority::Low => self.low,
        }
    }
}

/// One selectable option of a dropdown field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldOption {
    pub name: String,
    pub value: String,
}

impl FieldOption {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Impact options used when the impact field does not publish its own.
#[must_use]
pub fn default_impact_options() -> Vec<FieldOption> {
    vec![
        FieldOption::new("High", "cps_impact_high"),
        FieldOption::new("Medium", "cps_impact_medium"),
        FieldOption::new("Low", "cps_impact_low"),
    ]
}

/// Raw field values a score is computed from.
///
/// Field values are kept as JSON because custom fields report strings,
/// booleans, numbers or null depending on their type.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreInputs {
    pub impact: Value,
    pub impact_options: Vec<FieldOption>,
    pub priority: Option<Priority>,
    pub created_at: DateTime<Utc>,
    pub security: Value,
    pub manager_override: Value,
}

/// Every component of a computed score, plus the total.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub impact: u32,
    pub priority: u32,
    pub time_open: u32,
    pub security: u32,
    pub manager_override: u32,
    pub total: u32,
}

impl ScoreInputs {
    #[must_use]
    pub fn score(&self, points: &PriorityPoints, now: DateTime<Utc>) -> ScoreBreakdown {
        let impact = impact_points(&self.impact, &self.impact_options);
        let priority = self.priority.map_or(0, |p| points.for_priority(p));
        let time_open = time_open_points(self.created_at, now);
        let security = security_points(&self.security);
        let manager_override = override_points(&self.manager_override);
        ScoreBreakdown {
            impact,
            priority,
            time_open,
            security,
            manager_override,
            total: impact + priority + time_open + security + manager_override,
        }
    }
}

/// Points for the selected impact option.
///
/// Option tags like `cps_impact_high` are recognized without consulting the
/// option list. Anything else falls back to the option's position.
#[must_use]
pub fn impact_points(selected: &Value, options: &[FieldOption]) -> u32 {
    let Some(selected) = selected.as_str() else {
        return 0;
    };

    let lowered = selected.to_ascii_lowercase();
    if let Some(idx) = lowered.find("impact") {
        let rest = &lowered[idx + "impact".len()..];
        for (level, points) in ["high", "medium", "low"].iter().zip(IMPACT_POINTS) {
            if rest.contains(level) {
                return points;
            }
        }
    }

    options
        .iter()
        .position(|option| option.value == selected)
        .map_or(0, |idx| IMPACT_POINTS[idx.min(IMPACT_POINTS.len() - 1)])
}

#[must_use]
pub fn time_open_points(created_at: DateTime<Utc>, now: DateTime<Utc>) -> u32 {
    let days = (now - created_at).num_milliseconds() as f64 / 86_400_000.0;
    if days > 7.0 {
        6
    } else if days >= 3.0 {
        4
    } else if days >= 1.0 {
        2
    } else {
        0
    }
}

#[must_use]
pub fn security_points(flag: &Value) -> u32 {
    let set = match flag {
        Value::Bool(set) => *set,
        Value::String(text) => text.eq_ignore_ascii_case("yes"),
        _ => false,
    };
    if set { SECURITY_POINTS } else { 0 }
}

/// Points for a manager override: the first number in the value, if 1-5.
#[must_use]
pub fn override_points(value: &Value) -> u32 {
    let text = match value {
        Value::String(text) => text.clone(),
        Value::Number(n) => n.to_string(),
        _ => return 0,
    };

    let digits: String = text
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(char::is_ascii_digit)
        .collect();

    match digits.parse::<u32>() {
        Ok(n) if (1..=MAX_OVERRIDE).contains(&n) => n,
        _ => 0,
    }
}
