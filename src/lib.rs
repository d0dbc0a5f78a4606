//! Medical record template engine
//!
//! Schema-driven templates for structured medical-record entries: typed field
//! definitions, conditional validation, default-value population, a single
//! enforced default template per (tenant, type, specialty) bucket, immutable
//! usage records and usage-based recommendation ranking.
//!
//! Persistence, transport and statistics aggregation are external
//! collaborators consumed through the port traits in [`ports`];
//! [`memory::InMemoryStore`] is the reference implementation used in tests.
//!
//! Key behavioral notes:
//! - Validation is advisory: [`service::TemplateService::apply_template`]
//!   always returns populated data and attaches a [`ValidationResult`] only
//!   when checks failed. The caller decides whether to proceed.
//! - The default-value merge is shallow: nested objects and arrays supplied
//!   by the caller replace stored defaults wholesale.
//! - Templates are soft-deleted; inactive templates stay addressable by id
//!   for historical usage records.

pub mod apply;
pub mod definition;
pub mod error;
pub mod memory;
pub mod ports;
pub mod promotion;
pub mod query;
pub mod recommend;
pub mod seeds;
pub mod service;
pub mod usage;
pub mod validation;
pub mod value;

pub use apply::{apply, AppliedTemplate};
pub use definition::{
    CloneTemplate, Condition, ConditionOperator, ConditionalRules, CreateTemplate, FieldSpec,
    FieldType, FieldValidation, TemplateDefinition, TemplateType, UpdateTemplate,
};
pub use error::{StoreError, TemplateError};
pub use memory::InMemoryStore;
pub use ports::{
    DefaultBucket, StatsFilter, TemplateStore, TemplateTxn, UsageStatsSource, UsageStore,
    WriteStamp,
};
pub use query::{TemplatePage, TemplateQuery};
pub use recommend::{RecommendationEntry, RecommendationRequest, ScoringPolicy};
pub use seeds::{SeedBundle, SeedOutcome, SeedTemplate};
pub use service::TemplateService;
pub use usage::{RecordUsage, TemplateUsageRecord, TemplateUsageStats};
pub use validation::{validate, ValidationResult};
