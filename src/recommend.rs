//! Recommendation scoring
//!
//! Ranks a tenant's active templates for a requesting user. Raw aggregates
//! come from the statistics collaborator; this module owns only the scoring
//! policy. Hard contract: the score is monotone in both `usage_count` and
//! `user_usage_count` (all weights are non-negative), so more-used templates
//! never rank below an otherwise-identical less-used one.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::definition::{TemplateDefinition, TemplateType};

/// Configurable scoring weights. All weights must be non-negative to keep
/// the monotonicity contract; `Default` gives a sane starting policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringPolicy {
    /// Weight on ln(1 + global usage_count).
    pub popularity_weight: f64,
    /// Weight on ln(1 + the requesting user's own usage_count).
    pub personal_weight: f64,
    /// Flat boost when the template's specialty matches the request.
    pub specialty_boost: f64,
    /// Flat boost when the template's type matches the request.
    pub type_boost: f64,
}

impl Default for ScoringPolicy {
    fn default() -> Self {
        ScoringPolicy {
            popularity_weight: 1.0,
            personal_weight: 2.0,
            specialty_boost: 1.5,
            type_boost: 1.0,
        }
    }
}

/// Context for a recommendation request. Specialty and type act as affinity
/// boosts, not hard filters: a non-matching template still appears, ranked
/// lower.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RecommendationRequest {
    pub user_id: Option<Uuid>,
    pub specialty: Option<String>,
    pub template_type: Option<TemplateType>,
    pub limit: Option<usize>,
}

/// One ranked recommendation.
#[derive(Debug, Clone, Serialize)]
pub struct RecommendationEntry {
    pub template_id: Uuid,
    pub template_name: String,
    pub usage_count: u64,
    pub user_usage_count: u64,
    pub avg_completion_time: Option<f64>,
    pub recommendation_score: f64,
}

impl ScoringPolicy {
    /// Score one candidate. Log-dampened popularity terms plus flat affinity
    /// boosts.
    pub fn score(
        &self,
        template: &TemplateDefinition,
        usage_count: u64,
        user_usage_count: u64,
        req: &RecommendationRequest,
    ) -> f64 {
        let mut score = self.popularity_weight * (1.0 + usage_count as f64).ln()
            + self.personal_weight * (1.0 + user_usage_count as f64).ln();
        if let Some(ref specialty) = req.specialty {
            if template.specialty.as_deref() == Some(specialty.as_str()) {
                score += self.specialty_boost;
            }
        }
        if let Some(t) = req.template_type {
            if template.template_type == t {
                score += self.type_boost;
            }
        }
        score
    }
}

/// Sort entries by score descending, then usage_count descending, then
/// template id ascending for determinism; truncate to the request limit.
pub fn rank(mut entries: Vec<RecommendationEntry>, limit: Option<usize>) -> Vec<RecommendationEntry> {
    entries.sort_by(|a, b| {
        b.recommendation_score
            .total_cmp(&a.recommendation_score)
            .then_with(|| b.usage_count.cmp(&a.usage_count))
            .then_with(|| a.template_id.cmp(&b.template_id))
    });
    if let Some(limit) = limit {
        entries.truncate(limit);
    }
    entries
}
