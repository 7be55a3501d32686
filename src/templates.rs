//! Template System - Governed Canvases
//!
//! A template's canvas is normalized by the zone classifier on every create
//! and on every update that carries a canvas, before it is stored.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use thiserror::Error;
use uuid::Uuid;

use crate::canvas::{CanvasDocument, Unit};
use crate::selection::{newest_first, TemplateStore};
use crate::validation::{ValidationContext, ValidationResult, Validator};
use crate::zones;

pub type TemplateId = Uuid;

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("Template not found: {0}")]
    NotFound(TemplateId),

    #[error("Template {0} has been deleted")]
    Inactive(TemplateId),

    #[error("Template canvas rejected: {0}")]
    ValidationFailed(String),
}

fn default_true() -> bool { true }

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemplateCategory {
    Event,
    Flyer,
    Bulletin,
    SocialMedia,
    Banner,
    Certificate,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DesignTemplate {
    pub id: TemplateId,
    /// `None` marks a global template.
    #[serde(default)]
    pub tenant_id: Option<Uuid>,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub category: TemplateCategory,
    pub width: u32,
    pub height: u32,
    #[serde(default)]
    pub unit: Unit,
    pub canvas_json: CanvasDocument,
    #[serde(default)]
    pub thumbnail_url: Option<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub is_master: bool,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
}

impl DesignTemplate {
    /// A new active global template sized from its canvas.
    pub fn new(
        name: impl Into<String>,
        category: TemplateCategory,
        canvas_json: CanvasDocument,
        created_by: Uuid,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            tenant_id: None,
            name: name.into(),
            description: None,
            category,
            width: canvas_json.width.unwrap_or_default(),
            height: canvas_json.height.unwrap_or_default(),
            unit: canvas_json.unit(),
            canvas_json,
            thumbnail_url: None,
            is_active: true,
            is_master: false,
            created_by,
            created_at: Utc::now(),
        }
    }

    pub fn is_global(&self) -> bool {
        self.tenant_id.is_none()
    }
}

/// Input for authoring a template.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateDraft {
    #[serde(default)]
    pub tenant_id: Option<Uuid>,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub category: TemplateCategory,
    pub width: u32,
    pub height: u32,
    #[serde(default)]
    pub unit: Unit,
    pub canvas_json: CanvasDocument,
    #[serde(default)]
    pub thumbnail_url: Option<String>,
    #[serde(default)]
    pub is_master: bool,
}

/// Partial update; `None` leaves a field as it is.
#[derive(Debug, Clone, Default)]
pub struct TemplateUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub category: Option<TemplateCategory>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub canvas_json: Option<CanvasDocument>,
    pub thumbnail_url: Option<String>,
}

/// Normalizes a canvas and checks it before it is stored.
pub fn prepare_canvas(
    canvas_json: &CanvasDocument,
    width: u32,
    height: u32,
    validator: &Validator,
) -> Result<(CanvasDocument, ValidationResult), TemplateError> {
    let normalized = zones::normalize(canvas_json);
    let context = ValidationContext::default().with_declared_size(width, height);
    let result = validator.validate(&normalized, &context);
    if !result.valid {
        return Err(TemplateError::ValidationFailed(result.error_summary()));
    }
    Ok((normalized, result))
}

/// Template registry - in-memory template storage
pub struct TemplateRegistry {
    templates: HashMap<TemplateId, DesignTemplate>,
}

impl TemplateRegistry {
    pub fn new() -> Self {
        Self { templates: HashMap::new() }
    }

    /// Loads every `*.json` template record in `dir`. Unreadable records are
    /// logged and skipped.
    pub fn load_from_dir(dir: &Path) -> Result<Self, std::io::Error> {
        let mut registry = Self::new();
        if dir.exists() {
            for entry in fs::read_dir(dir)? {
                let entry = entry?;
                let path = entry.path();
                if path.extension().map_or(false, |e| e == "json") {
                    let content = match fs::read_to_string(&path) {
                        Ok(content) => content,
                        Err(err) => {
                            log::warn!(
                                "event=template_skipped path={} error={}",
                                path.display(),
                                err
                            );
                            continue;
                        }
                    };
                    match serde_json::from_str::<DesignTemplate>(&content) {
                        Ok(template) => registry.register(template),
                        Err(err) => log::warn!(
                            "event=template_skipped path={} error={}",
                            path.display(),
                            err
                        ),
                    }
                }
            }
        }
        log::info!("event=templates_loaded dir={} count={}", dir.display(), registry.templates.len());
        Ok(registry)
    }

    pub fn get(&self, id: TemplateId) -> Option<&DesignTemplate> {
        self.templates.get(&id)
    }

    /// Active templates, newest first.
    pub fn list(&self) -> Vec<&DesignTemplate> {
        let mut templates: Vec<_> = self.templates.values().filter(|t| t.is_active).collect();
        templates.sort_by(|a, b| newest_first(a, b));
        templates
    }

    /// Stores a record as-is.
    pub fn register(&mut self, template: DesignTemplate) {
        self.templates.insert(template.id, template);
    }

    /// Authors a new template; the canvas is normalized before storage.
    pub fn create(
        &mut self,
        draft: TemplateDraft,
        created_by: Uuid,
        validator: &Validator,
    ) -> Result<DesignTemplate, TemplateError> {
        let (canvas_json, _) = prepare_canvas(&draft.canvas_json, draft.width, draft.height, validator)?;
        let template = DesignTemplate {
            id: Uuid::new_v4(),
            tenant_id: draft.tenant_id,
            name: draft.name,
            description: draft.description,
            category: draft.category,
            width: draft.width,
            height: draft.height,
            unit: draft.unit,
            canvas_json,
            thumbnail_url: draft.thumbnail_url,
            is_active: true,
            is_master: draft.is_master,
            created_by,
            created_at: Utc::now(),
        };
        log::info!(
            "event=template_created template_id={} tenant_id={:?} objects={}",
            template.id,
            template.tenant_id,
            template.canvas_json.objects.len()
        );
        self.register(template.clone());
        Ok(template)
    }

    /// Applies an update; a new canvas is normalized before storage.
    pub fn update(
        &mut self,
        id: TemplateId,
        update: TemplateUpdate,
        validator: &Validator,
    ) -> Result<DesignTemplate, TemplateError> {
        let current = self.templates.get(&id).ok_or(TemplateError::NotFound(id))?;
        if !current.is_active {
            return Err(TemplateError::Inactive(id));
        }
        let mut template = current.clone();

        if let Some(name) = update.name {
            template.name = name;
        }
        if let Some(description) = update.description {
            template.description = Some(description);
        }
        if let Some(category) = update.category {
            template.category = category;
        }
        if let Some(width) = update.width {
            template.width = width;
        }
        if let Some(height) = update.height {
            template.height = height;
        }
        if let Some(thumbnail_url) = update.thumbnail_url {
            template.thumbnail_url = Some(thumbnail_url);
        }
        if let Some(canvas_json) = update.canvas_json {
            let (normalized, _) = prepare_canvas(&canvas_json, template.width, template.height, validator)?;
            template.canvas_json = normalized;
        }

        log::info!("event=template_updated template_id={}", id);
        self.register(template.clone());
        Ok(template)
    }

    /// Marks a template inactive. It stays resolvable by id.
    pub fn soft_delete(&mut self, id: TemplateId) -> Result<(), TemplateError> {
        let template = self.templates.get_mut(&id).ok_or(TemplateError::NotFound(id))?;
        template.is_active = false;
        log::info!("event=template_deleted template_id={}", id);
        Ok(())
    }

    fn latest_active(&self, tenant_id: Option<Uuid>, category: &TemplateCategory) -> Option<DesignTemplate> {
        self.templates
            .values()
            .filter(|t| t.is_active && t.tenant_id == tenant_id && &t.category == category)
            .min_by(|a, b| newest_first(a, b))
            .cloned()
    }
}

impl TemplateStore for TemplateRegistry {
    fn find_by_id(&self, id: Uuid) -> Option<DesignTemplate> {
        self.templates.get(&id).cloned()
    }

    fn find_latest_active_by_tenant_and_category(
        &self,
        tenant_id: Uuid,
        category: &TemplateCategory,
    ) -> Option<DesignTemplate> {
        self.latest_active(Some(tenant_id), category)
    }

    fn find_latest_active_global_by_category(&self, category: &TemplateCategory) -> Option<DesignTemplate> {
        self.latest_active(None, category)
    }
}

impl Default for TemplateRegistry {
    fn default() -> Self {
        Self::new()
    }
}
