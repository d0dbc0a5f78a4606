//! Listing filters, ordering and pagination
//!
//! Filter matching and the ordering comparator are pure functions so the
//! listing contract is testable without a store; store implementations apply
//! them over whatever rows they hold.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::definition::{TemplateDefinition, TemplateType};

/// Filters and pagination for template listing. All filter fields are
/// conjunctive; `None` means "no constraint".
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TemplateQuery {
    pub template_type: Option<TemplateType>,
    pub specialty: Option<String>,
    pub is_active: Option<bool>,
    pub is_default: Option<bool>,
    /// Case-insensitive substring over name and description.
    pub search: Option<String>,
    pub created_by: Option<Uuid>,
    #[serde(default)]
    pub offset: usize,
    pub limit: Option<usize>,
}

impl TemplateQuery {
    /// Shorthand for "active templates only".
    pub fn active() -> Self {
        TemplateQuery {
            is_active: Some(true),
            ..Default::default()
        }
    }

    pub fn matches(&self, def: &TemplateDefinition) -> bool {
        if let Some(t) = self.template_type {
            if def.template_type != t {
                return false;
            }
        }
        if let Some(ref s) = self.specialty {
            if def.specialty.as_deref() != Some(s.as_str()) {
                return false;
            }
        }
        if let Some(active) = self.is_active {
            if def.is_active != active {
                return false;
            }
        }
        if let Some(default) = self.is_default {
            if def.is_default != default {
                return false;
            }
        }
        if let Some(by) = self.created_by {
            if def.created_by != by {
                return false;
            }
        }
        if let Some(ref needle) = self.search {
            let needle = needle.to_lowercase();
            let in_name = def.name.to_lowercase().contains(&needle);
            let in_description = def
                .description
                .as_deref()
                .map(|d| d.to_lowercase().contains(&needle))
                .unwrap_or(false);
            if !in_name && !in_description {
                return false;
            }
        }
        true
    }
}

/// Stable listing order: defaults first, then name ascending
/// (case-insensitive), then id as the final tie-break.
pub fn listing_order(a: &TemplateDefinition, b: &TemplateDefinition) -> Ordering {
    b.is_default
        .cmp(&a.is_default)
        .then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
        .then_with(|| a.id.cmp(&b.id))
}

/// One page of templates plus the total matching count.
#[derive(Debug, Clone, Serialize)]
pub struct TemplatePage {
    pub items: Vec<TemplateDefinition>,
    pub total: usize,
    pub offset: usize,
    pub limit: Option<usize>,
}

/// Sort, paginate and wrap an already-filtered set of rows.
pub fn paginate(mut rows: Vec<TemplateDefinition>, query: &TemplateQuery) -> TemplatePage {
    rows.sort_by(listing_order);
    let total = rows.len();
    let items: Vec<TemplateDefinition> = rows
        .into_iter()
        .skip(query.offset)
        .take(query.limit.unwrap_or(usize::MAX))
        .collect();
    TemplatePage {
        items,
        total,
        offset: query.offset,
        limit: query.limit,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn def(name: &str, is_default: bool) -> TemplateDefinition {
        let actor = Uuid::new_v4();
        TemplateDefinition {
            id: Uuid::new_v4(),
            tenant_id: Uuid::new_v4(),
            parent_template_id: None,
            name: name.to_string(),
            description: Some(format!("{} template", name)),
            template_type: TemplateType::Consultation,
            specialty: None,
            fields: Default::default(),
            default_values: Default::default(),
            validation_rules: Default::default(),
            is_default,
            is_active: true,
            version: 1,
            created_by: actor,
            updated_by: actor,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn defaults_sort_before_names() {
        let rows = vec![def("Alpha", false), def("Zulu", true), def("Mike", false)];
        let page = paginate(rows, &TemplateQuery::default());
        let names: Vec<&str> = page.items.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["Zulu", "Alpha", "Mike"]);
    }

    #[test]
    fn search_is_case_insensitive_over_name_and_description() {
        let q = TemplateQuery {
            search: Some("ALPHA".to_string()),
            ..Default::default()
        };
        assert!(q.matches(&def("Alpha", false)));
        assert!(!q.matches(&def("Mike", false)));

        let mut by_description = def("Mike", false);
        by_description.description = Some("covers the alpha ward".to_string());
        assert!(q.matches(&by_description));
    }

    #[test]
    fn specialty_filter_is_exact() {
        let q = TemplateQuery {
            specialty: Some("cardiology".to_string()),
            ..Default::default()
        };
        let mut d = def("Alpha", false);
        assert!(!q.matches(&d));
        d.specialty = Some("cardiology".to_string());
        assert!(q.matches(&d));
    }

    #[test]
    fn pagination_reports_total_before_slicing() {
        let rows = vec![def("A", false), def("B", false), def("C", false)];
        let q = TemplateQuery {
            offset: 1,
            limit: Some(1),
            ..Default::default()
        };
        let page = paginate(rows, &q);
        assert_eq!(page.total, 3);
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].name, "B");
    }
}
