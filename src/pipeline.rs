//! Generation Pipeline - Event In, Draft Design Out
//!
//! `generate` is free of side effects apart from logging, so a failed run can
//! be retried freely. `handle_event_created` is the best-effort hook the
//! event store fires after an event commits: it never returns an error.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::canvas::CanvasDocument;
use crate::config::{ConfigError, StudioConfig};
use crate::hashing::content_hash;
use crate::placeholder::{resolve, unresolved};
use crate::projection::{project, Event, ProjectionError};
use crate::selection::{select_template, SelectionSource, TemplateStore};
use crate::store::{DesignStore, StoreError, TenantStore};
use crate::templates::TemplateId;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Tenant not found: {0}")]
    TenantNotFound(Uuid),

    #[error("Projection failed: {0}")]
    Projection(#[from] ProjectionError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Storage error: {0}")]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DesignStatus {
    /// Generated designs start here; approval states belong to the design store.
    #[default]
    Draft,
}

/// A flyer produced from a template, ready for the design store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedDesign {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub branch_id: Option<Uuid>,
    pub template_id: TemplateId,
    pub template_source: SelectionSource,
    pub event_id: Uuid,
    pub name: String,
    pub canvas_json: CanvasDocument,
    pub status: DesignStatus,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    /// SHA-256 of the canonical canvas JSON.
    pub content_hash: String,
}

/// The flyer pipeline: selection, projection, resolution.
pub struct FlyerGenerator<'a> {
    templates: &'a dyn TemplateStore,
    tenants: &'a dyn TenantStore,
    config: &'a StudioConfig,
}

impl<'a> FlyerGenerator<'a> {
    pub fn new(
        templates: &'a dyn TemplateStore,
        tenants: &'a dyn TenantStore,
        config: &'a StudioConfig,
    ) -> Self {
        Self { templates, tenants, config }
    }

    /// Builds the draft design for `event`, or `None` when no template applies.
    pub fn generate(&self, event: &Event, user_id: Uuid) -> Result<Option<GeneratedDesign>, PipelineError> {
        let offset = self.config.reference_offset()?;

        let Some(selection) = select_template(
            self.templates,
            event,
            &self.config.flyer_category,
            self.config.explicit_template_miss,
        ) else {
            return Ok(None);
        };

        let tenant = self
            .tenants
            .find_tenant(event.tenant_id)
            .ok_or(PipelineError::TenantNotFound(event.tenant_id))?;

        let bindings = project(event, &tenant, offset)?;
        let canvas_json = resolve(&selection.template.canvas_json, &bindings);

        let leftover = unresolved(&canvas_json, &bindings);
        if !leftover.is_empty() {
            log::debug!(
                "event=placeholders_unbound event_id={} keys={}",
                event.id,
                leftover.join(",")
            );
        }

        let design = GeneratedDesign {
            id: Uuid::new_v4(),
            tenant_id: event.tenant_id,
            branch_id: event.branch_id,
            template_id: selection.template.id,
            template_source: selection.source,
            event_id: event.id,
            name: format!("{}{}", self.config.design_name_prefix, event.title),
            content_hash: content_hash(&canvas_json)?,
            canvas_json,
            status: DesignStatus::Draft,
            created_by: user_id,
            created_at: Utc::now(),
        };
        Ok(Some(design))
    }

    /// Generates, stores and links a flyer for a newly created event.
    ///
    /// Returns the event's design id. Failures are logged with the event id
    /// and leave `generated_design_id` unset.
    pub fn handle_event_created(
        &self,
        designs: &mut dyn DesignStore,
        event: &mut Event,
        user_id: Uuid,
    ) -> Option<Uuid> {
        log::info!("event=event_created event_id={} title={:?}", event.id, event.title);

        if !event.auto_generate_flyer {
            log::debug!("event=flyer_skipped event_id={} reason=disabled", event.id);
            return None;
        }
        if let Some(existing) = event.generated_design_id {
            log::info!(
                "event=flyer_skipped event_id={} reason=already_generated design_id={}",
                event.id,
                existing
            );
            return Some(existing);
        }

        let outcome = self
            .generate(event, user_id)
            .and_then(|design| match design {
                Some(design) => Ok(Some((designs.save_design(&design)?, design.template_id))),
                None => Ok(None),
            });

        match outcome {
            Ok(Some((design_id, template_id))) => {
                event.generated_design_id = Some(design_id);
                log::info!(
                    "event=flyer_generated event_id={} design_id={} template_id={}",
                    event.id,
                    design_id,
                    template_id
                );
                Some(design_id)
            }
            Ok(None) => {
                log::warn!("event=flyer_skipped event_id={} reason=no_template", event.id);
                None
            }
            Err(err) => {
                log::error!("event=flyer_failed event_id={} error={}", event.id, err);
                None
            }
        }
    }
}
