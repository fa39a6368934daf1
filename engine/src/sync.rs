use std::sync::Arc;

use chrono::Utc;
use futures_util::future::join_all;
use safewrite_config::{ConfigError, SafewriteConfig, WriteConfig};
use safewrite_coordinator::{ConflictMatcher, RetryClassifier, RetryPolicy, WriteCoordinator};
use safewrite_remote::{Credentials, FieldMapping, RecordClient, RemoteError, Ticket};
use safewrite_types::{PriorityPoints, ScoreBreakdown, ScoreInputs};
use serde::Serialize;
use serde_json::Value;

use crate::error::SyncError;

/// Field values reported by a change event, taking precedence over the
/// values fetched from the ticket.
#[derive(Debug, Clone, Default)]
pub struct FieldOverrides {
    pub impact: Option<Value>,
    pub security: Option<Value>,
    pub manager_override: Option<Value>,
}

impl FieldOverrides {
    // A null override means the event carried no value; the fetched one stands.
    fn pick(over: Option<&Value>, fetched: &Value) -> Value {
        match over {
            Some(value) if !value.is_null() => value.clone(),
            _ => fetched.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RefreshOutcome {
    /// The score field already held the computed score.
    Unchanged { breakdown: ScoreBreakdown },
    Written {
        previous: Option<u32>,
        breakdown: ScoreBreakdown,
    },
}

impl RefreshOutcome {
    #[must_use]
    pub fn breakdown(&self) -> &ScoreBreakdown {
        match self {
            RefreshOutcome::Unchanged { breakdown } | RefreshOutcome::Written { breakdown, .. } => {
                breakdown
            }
        }
    }
}

/// Build the coordinator retry policy from `[write]` settings.
pub fn retry_policy(write: &WriteConfig) -> Result<RetryPolicy, ConfigError> {
    let mut policy = RetryPolicy::new(write.retry_config()?);
    if let Some(patterns) = &write.conflict_patterns {
        let matcher = ConflictMatcher::patterns(patterns.as_slice()).map_err(|e| ConfigError::Invalid {
            section: "write",
            reason: format!("conflict_patterns: {e}"),
        })?;
        policy = policy.with_classifier(RetryClassifier::new(matcher));
    }
    Ok(policy)
}

/// Computes ticket scores and writes them back through one coordinator.
///
/// Cheap to clone; clones share the coordinator.
#[derive(Debug, Clone)]
pub struct ScoreSync {
    client: RecordClient,
    mapping: Arc<FieldMapping>,
    points: PriorityPoints,
    write: WriteConfig,
    coordinator: WriteCoordinator<ScoreBreakdown, RemoteError>,
}

impl ScoreSync {
    pub fn new(
        client: RecordClient,
        mapping: FieldMapping,
        write: WriteConfig,
        points: PriorityPoints,
    ) -> Result<Self, SyncError> {
        let coordinator = WriteCoordinator::new(retry_policy(&write)?);
        Ok(Self {
            client,
            mapping: Arc::new(mapping),
            points,
            write,
            coordinator,
        })
    }

    /// Build a client from `[remote]`, discover the field mapping and apply
    /// the `[write]` and `[scoring]` settings.
    pub async fn connect(config: &SafewriteConfig) -> Result<Self, SyncError> {
        let remote = config
            .remote
            .as_ref()
            .ok_or(SyncError::Unconfigured("[remote] section"))?;
        let base_url = remote
            .resolved_base_url()
            .ok_or(SyncError::Unconfigured("remote.base_url"))?;
        let credentials = match (remote.resolved_email(), remote.resolved_api_token()) {
            (Some(email), Some(token)) => Some(Credentials::new(email, token)),
            (None, None) => None,
            (Some(_), None) => return Err(SyncError::Unconfigured("remote.api_token")),
            (None, Some(_)) => return Err(SyncError::Unconfigured("remote.email")),
        };

        let client = RecordClient::new(&base_url, credentials)?;
        let fields = client.list_ticket_fields().await?;
        let mapping = FieldMapping::discover(&fields);
        Self::new(
            client,
            mapping,
            config.write_section(),
            config.priority_points(),
        )
    }

    #[must_use]
    pub fn mapping(&self) -> &FieldMapping {
        &self.mapping
    }

    /// Recompute the score of `ticket_id` and store it if it changed.
    ///
    /// Refreshes of one ticket that land in the same debounce burst share a
    /// single write; every caller reports the breakdown that was stored.
    pub async fn refresh(
        &self,
        ticket_id: u64,
        overrides: FieldOverrides,
    ) -> Result<RefreshOutcome, SyncError> {
        let Some((impact_field, score_field)) = self.mapping.core_fields() else {
            let missing = if self.mapping.impact.is_none() { "impact" } else { "score" };
            return Err(SyncError::MissingField(missing));
        };

        let ticket = self.client.fetch_ticket(ticket_id).await?;
        let inputs = self.inputs(&ticket, impact_field, &overrides);
        let breakdown = inputs.score(&self.points, Utc::now());
        let previous = stored_score(ticket.field_value(score_field));

        if previous == Some(breakdown.total) {
            tracing::debug!(ticket_id, total = breakdown.total, "Score unchanged");
            return Ok(RefreshOutcome::Unchanged { breakdown });
        }

        let client = self.client.clone();
        let options = self.write.write_options(ticket_id);
        let written = self
            .coordinator
            .safe_update(
                move || {
                    let client = client.clone();
                    async move {
                        client
                            .update_custom_field(ticket_id, score_field, Value::from(breakdown.total))
                            .await
                            .map(|()| breakdown)
                    }
                },
                &options,
            )
            .await?;

        if written != breakdown {
            tracing::debug!(
                ticket_id,
                computed = breakdown.total,
                written = written.total,
                "Refresh joined a later write"
            );
        }
        tracing::info!(ticket_id, ?previous, total = written.total, "Wrote priority score");
        Ok(RefreshOutcome::Written {
            previous,
            breakdown: written,
        })
    }

    /// Refresh every ticket concurrently. Results keep the input order.
    pub async fn refresh_many(
        &self,
        ticket_ids: &[u64],
    ) -> Vec<(u64, Result<RefreshOutcome, SyncError>)> {
        let refreshes = ticket_ids.iter().map(|&id| async move {
            (id, self.refresh(id, FieldOverrides::default()).await)
        });
        join_all(refreshes).await
    }

    fn inputs(&self, ticket: &Ticket, impact_field: u64, overrides: &FieldOverrides) -> ScoreInputs {
        let fetched = |field: Option<u64>| field.map_or(Value::Null, |id| ticket.field_value(id).clone());
        ScoreInputs {
            impact: FieldOverrides::pick(overrides.impact.as_ref(), ticket.field_value(impact_field)),
            impact_options: self.mapping.impact_options.clone(),
            priority: ticket.priority(),
            created_at: ticket.created_at,
            security: FieldOverrides::pick(
                overrides.security.as_ref(),
                &fetched(self.mapping.security),
            ),
            manager_override: FieldOverrides::pick(
                overrides.manager_override.as_ref(),
                &fetched(self.mapping.manager_override),
            ),
        }
    }
}

// Integer fields come back as numbers, or as strings on older records.
fn stored_score(value: &Value) -> Option<u32> {
    match value {
        Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
