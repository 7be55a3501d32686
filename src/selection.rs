//! Template Selector - Fixed Priority, First Match Wins
//!
//! 1. The event's explicit template
//! 2. Newest active tenant template in the flyer category
//! 3. Newest active global template in the flyer category
//! 4. Nothing

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::projection::Event;
use crate::templates::{DesignTemplate, TemplateCategory};

/// Query surface the selector needs from template storage.
///
/// "Latest" means greatest `created_at`; equal timestamps are ordered by
/// the greater id so results never depend on storage iteration order.
pub trait TemplateStore {
    fn find_by_id(&self, id: Uuid) -> Option<DesignTemplate>;
    fn find_latest_active_by_tenant_and_category(
        &self,
        tenant_id: Uuid,
        category: &TemplateCategory,
    ) -> Option<DesignTemplate>;
    fn find_latest_active_global_by_category(&self, category: &TemplateCategory) -> Option<DesignTemplate>;
}

/// What to do when an event names a template that does not exist.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExplicitMissPolicy {
    /// No flyer for this event.
    #[default]
    Stop,
    /// Continue with tenant and global defaults.
    FallThrough,
}

/// Which tier produced the selected template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionSource {
    Explicit,
    Tenant,
    Global,
}

#[derive(Debug, Clone)]
pub struct Selection {
    pub template: DesignTemplate,
    pub source: SelectionSource,
}

/// Picks the template for `event`, or `None` when no tier matches.
pub fn select_template(
    store: &dyn TemplateStore,
    event: &Event,
    category: &TemplateCategory,
    on_explicit_miss: ExplicitMissPolicy,
) -> Option<Selection> {
    if let Some(template_id) = event.flyer_template_id {
        match store.find_by_id(template_id) {
            Some(template) => {
                return Some(Selection { template, source: SelectionSource::Explicit });
            }
            None => {
                log::warn!(
                    "event=template_missing event_id={} template_id={} policy={:?}",
                    event.id,
                    template_id,
                    on_explicit_miss
                );
                if on_explicit_miss == ExplicitMissPolicy::Stop {
                    return None;
                }
            }
        }
    }

    if let Some(template) = store.find_latest_active_by_tenant_and_category(event.tenant_id, category) {
        return Some(Selection { template, source: SelectionSource::Tenant });
    }

    store
        .find_latest_active_global_by_category(category)
        .map(|template| Selection { template, source: SelectionSource::Global })
}

/// Newest-first ordering shared by store implementations.
pub fn newest_first(a: &DesignTemplate, b: &DesignTemplate) -> std::cmp::Ordering {
    b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id))
}
