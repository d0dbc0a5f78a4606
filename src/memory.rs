//! In-memory reference implementation of the port traits
//!
//! Backs the test suite and local development. Transactions are optimistic:
//! a transaction records the revision of every row it reads or replaces plus
//! a version counter for every default bucket it scanned, and fails commit
//! with `StoreError::Conflict` when either changed underneath it. Observing
//! the bucket counter, not just touched rows, is what catches two promotions
//! racing into a bucket that held no default yet: both scans demote nothing,
//! so row revisions alone would let both commit.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::trace;
use uuid::Uuid;

use crate::definition::TemplateDefinition;
use crate::error::StoreError;
use crate::ports::{
    DefaultBucket, StatsFilter, TemplateStore, TemplateTxn, UsageStatsSource, UsageStore,
    WriteStamp,
};
use crate::query::{paginate, TemplatePage, TemplateQuery};
use crate::usage::{TemplateUsageRecord, TemplateUsageStats};

#[derive(Debug, Clone)]
struct Row {
    def: TemplateDefinition,
    revision: u64,
}

#[derive(Default)]
struct TemplateTable {
    rows: HashMap<Uuid, Row>,
    /// Bumped by any committed write that adds, moves or rewrites an active
    /// default in a bucket. Transactions verify the versions they observed
    /// at commit.
    bucket_versions: HashMap<DefaultBucket, u64>,
}

impl TemplateTable {
    fn bucket_version(&self, bucket: &DefaultBucket) -> u64 {
        self.bucket_versions.get(bucket).copied().unwrap_or(0)
    }

    fn bump_bucket(&mut self, bucket: DefaultBucket) {
        *self.bucket_versions.entry(bucket).or_insert(0) += 1;
    }

    /// Insert-or-update one row, advancing its revision and the version of
    /// every bucket whose active-default membership the write touches.
    fn apply_write(&mut self, def: TemplateDefinition) {
        let old_bucket = self
            .rows
            .get(&def.id)
            .filter(|row| row.def.is_active && row.def.is_default)
            .map(|row| DefaultBucket::of(&row.def));
        let new_bucket = (def.is_active && def.is_default).then(|| DefaultBucket::of(&def));

        match self.rows.get_mut(&def.id) {
            Some(row) => {
                row.def = def;
                row.revision += 1;
            }
            None => {
                self.rows.insert(def.id, Row { def, revision: 0 });
            }
        }

        match (old_bucket, new_bucket) {
            (Some(old), Some(new)) if old == new => self.bump_bucket(new),
            (old, new) => {
                if let Some(old) = old {
                    self.bump_bucket(old);
                }
                if let Some(new) = new {
                    self.bump_bucket(new);
                }
            }
        }
    }
}

#[derive(Default)]
struct Inner {
    templates: RwLock<TemplateTable>,
    usage: RwLock<Vec<TemplateUsageRecord>>,
}

/// Shared in-memory store implementing all three ports.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    inner: Arc<Inner>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TemplateStore for InMemoryStore {
    async fn get(
        &self,
        tenant_id: Uuid,
        id: Uuid,
    ) -> Result<Option<TemplateDefinition>, StoreError> {
        let templates = self.inner.templates.read().await;
        Ok(templates
            .rows
            .get(&id)
            .filter(|row| row.def.tenant_id == tenant_id)
            .map(|row| row.def.clone()))
    }

    async fn list(
        &self,
        tenant_id: Uuid,
        query: &TemplateQuery,
    ) -> Result<TemplatePage, StoreError> {
        let templates = self.inner.templates.read().await;
        let rows: Vec<TemplateDefinition> = templates
            .rows
            .values()
            .filter(|row| row.def.tenant_id == tenant_id && query.matches(&row.def))
            .map(|row| row.def.clone())
            .collect();
        Ok(paginate(rows, query))
    }

    async fn insert(&self, def: TemplateDefinition) -> Result<(), StoreError> {
        let mut templates = self.inner.templates.write().await;
        if templates.rows.contains_key(&def.id) {
            return Err(StoreError::Constraint(format!(
                "template {} already exists",
                def.id
            )));
        }
        templates.apply_write(def);
        Ok(())
    }

    async fn update(&self, def: TemplateDefinition) -> Result<(), StoreError> {
        let mut templates = self.inner.templates.write().await;
        if !templates.rows.contains_key(&def.id) {
            return Err(StoreError::Constraint(format!(
                "template {} does not exist",
                def.id
            )));
        }
        templates.apply_write(def);
        Ok(())
    }

    async fn count_bucket_defaults(
        &self,
        bucket: &DefaultBucket,
        exclude: Option<Uuid>,
    ) -> Result<usize, StoreError> {
        let templates = self.inner.templates.read().await;
        Ok(templates
            .rows
            .values()
            .filter(|row| {
                row.def.is_active
                    && row.def.is_default
                    && bucket.contains(&row.def)
                    && Some(row.def.id) != exclude
            })
            .count())
    }

    async fn begin(&self) -> Result<Box<dyn TemplateTxn>, StoreError> {
        Ok(Box::new(MemoryTxn {
            inner: Arc::clone(&self.inner),
            observed: HashMap::new(),
            observed_buckets: HashMap::new(),
            staged: Vec::new(),
        }))
    }
}

/// Optimistic transaction: stages writes locally, verifies observed row
/// revisions and bucket versions at commit.
struct MemoryTxn {
    inner: Arc<Inner>,
    /// id -> revision at first observation; None means the row did not exist.
    observed: HashMap<Uuid, Option<u64>>,
    /// Version of every bucket whose default set this transaction scanned.
    observed_buckets: HashMap<DefaultBucket, u64>,
    staged: Vec<TemplateDefinition>,
}

#[async_trait]
impl TemplateTxn for MemoryTxn {
    async fn clear_other_defaults(
        &mut self,
        bucket: &DefaultBucket,
        keep: Uuid,
        stamp: &WriteStamp,
    ) -> Result<usize, StoreError> {
        let templates = self.inner.templates.read().await;
        // Observing the bucket version pins the "no other default" read even
        // when the scan demotes nothing.
        self.observed_buckets
            .entry(bucket.clone())
            .or_insert_with(|| templates.bucket_version(bucket));
        let mut demoted = 0;
        for row in templates.rows.values() {
            if row.def.id != keep
                && row.def.is_active
                && row.def.is_default
                && bucket.contains(&row.def)
            {
                self.observed
                    .entry(row.def.id)
                    .or_insert(Some(row.revision));
                let mut def = row.def.clone();
                def.is_default = false;
                def.updated_by = stamp.updated_by;
                def.updated_at = stamp.updated_at;
                self.staged.push(def);
                demoted += 1;
            }
        }
        trace!(bucket = ?bucket, demoted, "staged bucket demotions");
        Ok(demoted)
    }

    async fn put(&mut self, def: TemplateDefinition) -> Result<(), StoreError> {
        let templates = self.inner.templates.read().await;
        self.observed
            .entry(def.id)
            .or_insert_with(|| templates.rows.get(&def.id).map(|row| row.revision));
        self.staged.push(def);
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        let mut templates = self.inner.templates.write().await;
        for (id, observed_revision) in &self.observed {
            let current = templates.rows.get(id).map(|row| row.revision);
            if current != *observed_revision {
                return Err(StoreError::Conflict(format!(
                    "template {} changed concurrently",
                    id
                )));
            }
        }
        for (bucket, observed_version) in &self.observed_buckets {
            if templates.bucket_version(bucket) != *observed_version {
                return Err(StoreError::Conflict(format!(
                    "defaults in bucket ({}, {}, {}) changed concurrently",
                    bucket.tenant_id,
                    bucket.template_type.as_str(),
                    bucket.specialty.as_deref().unwrap_or("-")
                )));
            }
        }
        for def in self.staged {
            templates.apply_write(def);
        }
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), StoreError> {
        // Nothing was applied; dropping the staged writes is the rollback.
        Ok(())
    }
}

#[async_trait]
impl UsageStore for InMemoryStore {
    async fn append(&self, record: TemplateUsageRecord) -> Result<(), StoreError> {
        // Mirrors the relational foreign-key constraint on template_id.
        let templates = self.inner.templates.read().await;
        let known = templates
            .rows
            .get(&record.template_id)
            .map(|row| row.def.tenant_id == record.tenant_id)
            .unwrap_or(false);
        if !known {
            return Err(StoreError::Constraint(format!(
                "usage references unknown template {}",
                record.template_id
            )));
        }
        drop(templates);
        self.inner.usage.write().await.push(record);
        Ok(())
    }

    async fn user_usage_counts(
        &self,
        tenant_id: Uuid,
        user_id: Uuid,
    ) -> Result<HashMap<Uuid, u64>, StoreError> {
        let usage = self.inner.usage.read().await;
        let mut counts: HashMap<Uuid, u64> = HashMap::new();
        for record in usage
            .iter()
            .filter(|r| r.tenant_id == tenant_id && r.user_id == user_id)
        {
            *counts.entry(record.template_id).or_default() += 1;
        }
        Ok(counts)
    }

    async fn list_for_template(
        &self,
        tenant_id: Uuid,
        template_id: Uuid,
        limit: usize,
    ) -> Result<Vec<TemplateUsageRecord>, StoreError> {
        let usage = self.inner.usage.read().await;
        let mut records: Vec<TemplateUsageRecord> = usage
            .iter()
            .filter(|r| r.tenant_id == tenant_id && r.template_id == template_id)
            .cloned()
            .collect();
        records.sort_by(|a, b| b.used_at.cmp(&a.used_at));
        records.truncate(limit);
        Ok(records)
    }
}

#[async_trait]
impl UsageStatsSource for InMemoryStore {
    async fn template_usage_stats(
        &self,
        tenant_id: Uuid,
        filter: &StatsFilter,
    ) -> Result<Vec<TemplateUsageStats>, StoreError> {
        let templates = self.inner.templates.read().await;
        let usage = self.inner.usage.read().await;

        let mut by_template: HashMap<Uuid, Vec<&TemplateUsageRecord>> = HashMap::new();
        for record in usage.iter().filter(|r| r.tenant_id == tenant_id) {
            let in_scope = templates.rows.get(&record.template_id).map_or(false, |row| {
                filter
                    .template_type
                    .map_or(true, |t| row.def.template_type == t)
                    && filter
                        .specialty
                        .as_deref()
                        .map_or(true, |s| row.def.specialty.as_deref() == Some(s))
            });
            if in_scope {
                by_template.entry(record.template_id).or_default().push(record);
            }
        }

        let mut stats: Vec<TemplateUsageStats> = by_template
            .into_iter()
            .map(|(template_id, records)| {
                let times: Vec<f64> = records
                    .iter()
                    .filter_map(|r| r.completion_time_seconds.map(f64::from))
                    .collect();
                let unique_users = records
                    .iter()
                    .map(|r| r.user_id)
                    .collect::<std::collections::HashSet<_>>()
                    .len() as u64;
                TemplateUsageStats {
                    template_id,
                    usage_count: records.len() as u64,
                    unique_users,
                    avg_completion_time: if times.is_empty() {
                        None
                    } else {
                        Some(times.iter().sum::<f64>() / times.len() as f64)
                    },
                    last_used: records.iter().map(|r| r.used_at).max(),
                }
            })
            .collect();
        stats.sort_by(|a, b| b.usage_count.cmp(&a.usage_count));
        Ok(stats)
    }
}
