//! Usage records
//!
//! Every template application the caller chooses to record becomes one
//! immutable `TemplateUsageRecord`. Append-only; the engine never mutates or
//! deletes a record, and referential checks belong to the persistence
//! collaborator.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// One recorded template application. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateUsageRecord {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub template_id: Uuid,
    pub medical_record_id: Uuid,
    pub user_id: Uuid,
    pub used_at: DateTime<Utc>,
    /// The caller-supplied overrides that went into the application.
    pub customizations: Map<String, Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completion_time_seconds: Option<u32>,
}

/// Input to `record_usage`; the engine stamps id and timestamp.
#[derive(Debug, Clone, Deserialize)]
pub struct RecordUsage {
    pub template_id: Uuid,
    pub medical_record_id: Uuid,
    pub user_id: Uuid,
    #[serde(default)]
    pub customizations: Map<String, Value>,
    #[serde(default)]
    pub completion_time_seconds: Option<u32>,
}

impl RecordUsage {
    /// Stamp the input into a persistable record.
    pub fn into_record(self, tenant_id: Uuid) -> TemplateUsageRecord {
        TemplateUsageRecord {
            id: Uuid::new_v4(),
            tenant_id,
            template_id: self.template_id,
            medical_record_id: self.medical_record_id,
            user_id: self.user_id,
            used_at: Utc::now(),
            customizations: self.customizations,
            completion_time_seconds: self.completion_time_seconds,
        }
    }
}

/// Per-template aggregates supplied by the statistics collaborator. The
/// engine treats these as an opaque precomputation and never derives them
/// from raw records itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateUsageStats {
    pub template_id: Uuid,
    pub usage_count: u64,
    pub unique_users: u64,
    pub avg_completion_time: Option<f64>,
    pub last_used: Option<DateTime<Utc>>,
}
