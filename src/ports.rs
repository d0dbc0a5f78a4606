//! Port traits to the external collaborators
//!
//! Persistence and statistics are out of scope for this engine; it consumes
//! them through these async traits. `memory::InMemoryStore` is the reference
//! implementation used in tests; production wires a relational store behind
//! the same seams.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::definition::{TemplateDefinition, TemplateType};
use crate::error::StoreError;
use crate::query::{TemplatePage, TemplateQuery};
use crate::usage::{TemplateUsageRecord, TemplateUsageStats};

/// The grouping key over which the single-default invariant holds.
/// `specialty = None` is its own bucket: None matches only None.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DefaultBucket {
    pub tenant_id: Uuid,
    pub template_type: TemplateType,
    pub specialty: Option<String>,
}

impl DefaultBucket {
    pub fn of(def: &TemplateDefinition) -> Self {
        DefaultBucket {
            tenant_id: def.tenant_id,
            template_type: def.template_type,
            specialty: def.specialty.clone(),
        }
    }

    /// None-safe bucket membership for a template.
    pub fn contains(&self, def: &TemplateDefinition) -> bool {
        def.tenant_id == self.tenant_id
            && def.template_type == self.template_type
            && def.specialty == self.specialty
    }
}

/// Updater identity and timestamp applied to rows a write touches.
#[derive(Debug, Clone, Copy)]
pub struct WriteStamp {
    pub updated_by: Uuid,
    pub updated_at: DateTime<Utc>,
}

impl WriteStamp {
    pub fn now(updated_by: Uuid) -> Self {
        WriteStamp {
            updated_by,
            updated_at: Utc::now(),
        }
    }
}

/// Tenant-scoped template persistence.
#[async_trait]
pub trait TemplateStore: Send + Sync {
    async fn get(&self, tenant_id: Uuid, id: Uuid)
        -> Result<Option<TemplateDefinition>, StoreError>;

    async fn list(
        &self,
        tenant_id: Uuid,
        query: &TemplateQuery,
    ) -> Result<TemplatePage, StoreError>;

    async fn insert(&self, def: TemplateDefinition) -> Result<(), StoreError>;

    async fn update(&self, def: TemplateDefinition) -> Result<(), StoreError>;

    /// Count active defaults in a bucket, optionally excluding one id.
    /// This is the invariant audit query.
    async fn count_bucket_defaults(
        &self,
        bucket: &DefaultBucket,
        exclude: Option<Uuid>,
    ) -> Result<usize, StoreError>;

    /// Open a transaction for the promotion manager's unset-then-write
    /// sequence. Implementations must either serialize concurrent
    /// transactions over the same bucket or fail one at commit with
    /// `StoreError::Conflict`.
    async fn begin(&self) -> Result<Box<dyn TemplateTxn>, StoreError>;
}

/// A write transaction over the template store. Dropped without commit means
/// rolled back.
#[async_trait]
pub trait TemplateTxn: Send {
    /// Unset `is_default` and stamp the updater on every *other* active
    /// template in the bucket. Returns how many rows were demoted.
    async fn clear_other_defaults(
        &mut self,
        bucket: &DefaultBucket,
        keep: Uuid,
        stamp: &WriteStamp,
    ) -> Result<usize, StoreError>;

    /// Stage an insert-or-update of one template row.
    async fn put(&mut self, def: TemplateDefinition) -> Result<(), StoreError>;

    async fn commit(self: Box<Self>) -> Result<(), StoreError>;

    async fn rollback(self: Box<Self>) -> Result<(), StoreError>;
}

/// Append-only usage record persistence.
#[async_trait]
pub trait UsageStore: Send + Sync {
    async fn append(&self, record: TemplateUsageRecord) -> Result<(), StoreError>;

    /// Per-template application counts for one user within a tenant.
    async fn user_usage_counts(
        &self,
        tenant_id: Uuid,
        user_id: Uuid,
    ) -> Result<HashMap<Uuid, u64>, StoreError>;

    async fn list_for_template(
        &self,
        tenant_id: Uuid,
        template_id: Uuid,
        limit: usize,
    ) -> Result<Vec<TemplateUsageRecord>, StoreError>;
}

/// Filter passed through to the statistics collaborator.
#[derive(Debug, Clone, Default)]
pub struct StatsFilter {
    pub template_type: Option<TemplateType>,
    pub specialty: Option<String>,
}

/// Opaque precomputed aggregation over usage history.
#[async_trait]
pub trait UsageStatsSource: Send + Sync {
    async fn template_usage_stats(
        &self,
        tenant_id: Uuid,
        filter: &StatsFilter,
    ) -> Result<Vec<TemplateUsageStats>, StoreError>;
}
