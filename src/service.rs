//! Caller-facing template service
//!
//! The single façade wiring the definition model, validation engine,
//! promotion manager, applier, usage recorder and recommendation scorer over
//! the port traits. All operations are request-scoped and stateless; the
//! service holds only collaborator handles and the scoring policy.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use serde_json::{Map, Value};
use tracing::{debug, info};
use uuid::Uuid;

use crate::apply::{apply, AppliedTemplate};
use crate::definition::{CloneTemplate, CreateTemplate, TemplateDefinition, UpdateTemplate};
use crate::error::TemplateError;
use crate::ports::{StatsFilter, TemplateStore, UsageStatsSource, UsageStore, WriteStamp};
use crate::promotion;
use crate::query::{TemplatePage, TemplateQuery};
use crate::recommend::{rank, RecommendationEntry, RecommendationRequest, ScoringPolicy};
use crate::seeds::{SeedBundle, SeedOutcome};
use crate::usage::{RecordUsage, TemplateUsageRecord, TemplateUsageStats};

/// The template engine's caller-facing contract.
#[derive(Clone)]
pub struct TemplateService {
    templates: Arc<dyn TemplateStore>,
    usage: Arc<dyn UsageStore>,
    stats: Arc<dyn UsageStatsSource>,
    scoring: ScoringPolicy,
}

impl TemplateService {
    pub fn new(
        templates: Arc<dyn TemplateStore>,
        usage: Arc<dyn UsageStore>,
        stats: Arc<dyn UsageStatsSource>,
    ) -> Self {
        TemplateService {
            templates,
            usage,
            stats,
            scoring: ScoringPolicy::default(),
        }
    }

    pub fn with_scoring_policy(mut self, scoring: ScoringPolicy) -> Self {
        self.scoring = scoring;
        self
    }

    pub async fn list_templates(
        &self,
        tenant_id: Uuid,
        query: &TemplateQuery,
    ) -> Result<TemplatePage, TemplateError> {
        Ok(self.templates.list(tenant_id, query).await?)
    }

    pub async fn get_template(
        &self,
        tenant_id: Uuid,
        id: Uuid,
    ) -> Result<TemplateDefinition, TemplateError> {
        self.templates
            .get(tenant_id, id)
            .await?
            .ok_or(TemplateError::NotFound(id))
    }

    pub async fn create_template(
        &self,
        tenant_id: Uuid,
        actor: Uuid,
        input: CreateTemplate,
    ) -> Result<TemplateDefinition, TemplateError> {
        let now = Utc::now();
        let def = TemplateDefinition {
            id: Uuid::new_v4(),
            tenant_id,
            parent_template_id: None,
            name: input.name,
            description: input.description,
            template_type: input.template_type,
            specialty: input.specialty,
            fields: input.fields,
            default_values: input.default_values,
            validation_rules: input.validation_rules,
            is_default: input.is_default,
            is_active: true,
            version: input.version.unwrap_or(1),
            created_by: actor,
            updated_by: actor,
            created_at: now,
            updated_at: now,
        };
        info!(
            template_id = %def.id,
            tenant_id = %tenant_id,
            template_type = def.template_type.as_str(),
            is_default = def.is_default,
            "creating template"
        );
        if def.is_default {
            promotion::promote(self.templates.as_ref(), def.clone(), WriteStamp::now(actor))
                .await?;
        } else {
            promotion::write_plain(self.templates.as_ref(), def.clone(), true).await?;
        }
        Ok(def)
    }

    pub async fn update_template(
        &self,
        tenant_id: Uuid,
        id: Uuid,
        actor: Uuid,
        input: UpdateTemplate,
    ) -> Result<TemplateDefinition, TemplateError> {
        let mut def = self.get_template(tenant_id, id).await?;
        if !def.is_active {
            return Err(TemplateError::Inactive(id));
        }

        if let Some(name) = input.name {
            def.name = name;
        }
        if let Some(description) = input.description {
            def.description = description;
        }
        if let Some(specialty) = input.specialty {
            def.specialty = specialty;
        }
        if let Some(fields) = input.fields {
            def.fields = fields;
        }
        if let Some(default_values) = input.default_values {
            def.default_values = default_values;
        }
        if let Some(validation_rules) = input.validation_rules {
            def.validation_rules = validation_rules;
        }
        if let Some(version) = input.version {
            def.version = version;
        }
        if let Some(is_default) = input.is_default {
            def.is_default = is_default;
        }
        def.updated_by = actor;
        def.updated_at = Utc::now();

        // Promotion is decided on the resulting state, not the input flag:
        // an update that moves a current default into another bucket (e.g. a
        // specialty change) must demote that bucket's existing default too.
        info!(template_id = %id, tenant_id = %tenant_id, promote = def.is_default, "updating template");
        if def.is_default {
            promotion::promote(self.templates.as_ref(), def.clone(), WriteStamp::now(actor))
                .await?;
        } else {
            promotion::write_plain(self.templates.as_ref(), def.clone(), false).await?;
        }
        Ok(def)
    }

    /// Soft-delete: the template stays addressable by id for historical usage
    /// records but leaves active listings and default-bucket enforcement.
    pub async fn deactivate_template(
        &self,
        tenant_id: Uuid,
        id: Uuid,
        actor: Uuid,
    ) -> Result<TemplateDefinition, TemplateError> {
        let mut def = self.get_template(tenant_id, id).await?;
        if !def.is_active {
            return Err(TemplateError::Inactive(id));
        }
        def.is_active = false;
        def.updated_by = actor;
        def.updated_at = Utc::now();
        info!(template_id = %id, tenant_id = %tenant_id, "deactivating template");
        promotion::write_plain(self.templates.as_ref(), def.clone(), false).await?;
        Ok(def)
    }

    /// Copy a template, recording lineage in `parent_template_id`. The source
    /// may be inactive; cloning never mutates it. Clones never start as the
    /// bucket default.
    pub async fn clone_template(
        &self,
        tenant_id: Uuid,
        source_id: Uuid,
        actor: Uuid,
        input: CloneTemplate,
    ) -> Result<TemplateDefinition, TemplateError> {
        let source = self.get_template(tenant_id, source_id).await?;
        let now = Utc::now();
        let def = TemplateDefinition {
            id: Uuid::new_v4(),
            tenant_id,
            parent_template_id: Some(source.id),
            name: input.name,
            description: input.description.or(source.description),
            template_type: input.template_type.unwrap_or(source.template_type),
            specialty: input.specialty.unwrap_or(source.specialty),
            fields: input.fields.unwrap_or(source.fields),
            default_values: input.default_values.unwrap_or(source.default_values),
            validation_rules: source.validation_rules,
            is_default: false,
            is_active: true,
            version: 1,
            created_by: actor,
            updated_by: actor,
            created_at: now,
            updated_at: now,
        };
        info!(template_id = %def.id, source_id = %source_id, "cloning template");
        promotion::write_plain(self.templates.as_ref(), def.clone(), true).await?;
        Ok(def)
    }

    /// Populate a template with caller overrides and advisory validation.
    /// Validation feedback never blocks; only resolution can fail.
    pub async fn apply_template(
        &self,
        tenant_id: Uuid,
        id: Uuid,
        custom_values: &Map<String, Value>,
    ) -> Result<AppliedTemplate, TemplateError> {
        let def = self.get_template(tenant_id, id).await?;
        if !def.is_active {
            return Err(TemplateError::Inactive(id));
        }
        let applied = apply(&def, custom_values);
        debug!(
            template_id = %id,
            valid = applied.validation_errors.is_none(),
            "applied template"
        );
        Ok(applied)
    }

    pub async fn record_usage(
        &self,
        tenant_id: Uuid,
        input: RecordUsage,
    ) -> Result<TemplateUsageRecord, TemplateError> {
        let record = input.into_record(tenant_id);
        self.usage
            .append(record.clone())
            .await
            .map_err(TemplateError::Persistence)?;
        debug!(template_id = %record.template_id, user_id = %record.user_id, "recorded template usage");
        Ok(record)
    }

    /// Pass-through of the statistics collaborator's precomputed aggregates.
    pub async fn get_statistics(
        &self,
        tenant_id: Uuid,
        filter: &StatsFilter,
    ) -> Result<Vec<TemplateUsageStats>, TemplateError> {
        Ok(self.stats.template_usage_stats(tenant_id, filter).await?)
    }

    /// Rank the tenant's active templates for the requesting context.
    /// Specialty/type in the request are affinity boosts, not hard filters.
    pub async fn get_recommendations(
        &self,
        tenant_id: Uuid,
        req: &RecommendationRequest,
    ) -> Result<Vec<RecommendationEntry>, TemplateError> {
        let candidates = self
            .templates
            .list(tenant_id, &TemplateQuery::active())
            .await?;
        let stats = self
            .stats
            .template_usage_stats(tenant_id, &StatsFilter::default())
            .await?;
        let by_template: HashMap<Uuid, &TemplateUsageStats> =
            stats.iter().map(|s| (s.template_id, s)).collect();
        let personal: HashMap<Uuid, u64> = match req.user_id {
            Some(user_id) => self.usage.user_usage_counts(tenant_id, user_id).await?,
            None => HashMap::new(),
        };

        let entries: Vec<RecommendationEntry> = candidates
            .items
            .iter()
            .map(|template| {
                let aggregates = by_template.get(&template.id);
                let usage_count = aggregates.map(|s| s.usage_count).unwrap_or(0);
                let user_usage_count = personal.get(&template.id).copied().unwrap_or(0);
                RecommendationEntry {
                    template_id: template.id,
                    template_name: template.name.clone(),
                    usage_count,
                    user_usage_count,
                    avg_completion_time: aggregates.and_then(|s| s.avg_completion_time),
                    recommendation_score: self
                        .scoring
                        .score(template, usage_count, user_usage_count, req),
                }
            })
            .collect();
        Ok(rank(entries, req.limit))
    }

    /// Install a seed bundle for a tenant. Idempotent per template name.
    pub async fn bootstrap_seed_bundle(
        &self,
        tenant_id: Uuid,
        bundle: SeedBundle,
        actor: Uuid,
    ) -> Result<SeedOutcome, TemplateError> {
        let existing = self
            .templates
            .list(tenant_id, &TemplateQuery::default())
            .await?;
        let known: std::collections::HashSet<&str> =
            existing.items.iter().map(|t| t.name.as_str()).collect();

        let mut outcome = SeedOutcome::default();
        for seed in bundle.templates {
            if known.contains(seed.name.as_str()) {
                outcome.skipped += 1;
                continue;
            }
            self.create_template(tenant_id, actor, seed.into_create())
                .await?;
            outcome.created += 1;
        }
        info!(
            tenant_id = %tenant_id,
            created = outcome.created,
            skipped = outcome.skipped,
            "seed bundle bootstrapped"
        );
        Ok(outcome)
    }
}
