//! Data Projection - Event And Tenant To Bindings
//!
//! Produces the fixed set of placeholder keys a flyer can reference. Every
//! optional source field has a documented fallback, so a generated flyer
//! never shows a dangling token for a known key.

use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::placeholder::{Bindings, PlaceholderError};

pub const DEFAULT_PRIMARY_COLOR: &str = "#1a365d";
pub const DEFAULT_SECONDARY_COLOR: &str = "#ed8936";
pub const DEFAULT_HEADING_FONT: &str = "Inter";
pub const DEFAULT_BODY_FONT: &str = "Open Sans";

/// Every key `project` emits.
pub const PROJECTION_KEYS: [&str; 14] = [
    "event.title",
    "event.description",
    "event.date",
    "event.time",
    "event.formatted_date",
    "event.venue",
    "event.venue_address",
    "event.online_url",
    "tenant.name",
    "tenant.logo_url",
    "tenant.brand_config.primary_color",
    "tenant.brand_config.secondary_color",
    "tenant.brand_config.fonts.heading",
    "tenant.brand_config.fonts.body",
];

#[derive(Debug, Error)]
pub enum ProjectionError {
    #[error("Required field `{0}` is missing")]
    MissingField(&'static str),

    #[error("Event {event_id} belongs to tenant {event_tenant}, not {tenant}")]
    TenantMismatch {
        event_id: Uuid,
        event_tenant: Uuid,
        tenant: Uuid,
    },

    #[error(transparent)]
    Binding(#[from] PlaceholderError),
}

fn default_true() -> bool { true }

/// Event record as handed over by the event store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: Uuid,
    pub tenant_id: Uuid,
    #[serde(default)]
    pub branch_id: Option<Uuid>,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub start_datetime: DateTime<Utc>,
    #[serde(default)]
    pub end_datetime: Option<DateTime<Utc>>,
    #[serde(default)]
    pub is_all_day: bool,
    #[serde(default)]
    pub venue_name: Option<String>,
    #[serde(default)]
    pub venue_address: Option<String>,
    #[serde(default)]
    pub is_online: bool,
    #[serde(default)]
    pub online_url: Option<String>,
    #[serde(default = "default_true")]
    pub auto_generate_flyer: bool,
    #[serde(default)]
    pub flyer_template_id: Option<Uuid>,
    #[serde(default)]
    pub generated_design_id: Option<Uuid>,
    pub created_by: Uuid,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BrandFonts {
    #[serde(default)]
    pub heading: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BrandConfig {
    #[serde(default)]
    pub primary_color: Option<String>,
    #[serde(default)]
    pub secondary_color: Option<String>,
    #[serde(default)]
    pub fonts: Option<BrandFonts>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tenant {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub logo_url: Option<String>,
    #[serde(default)]
    pub brand_config: Option<BrandConfig>,
}

// Empty strings count as absent, same as a null column.
fn present(value: Option<&str>) -> Option<&str> {
    value.filter(|s| !s.is_empty())
}

fn or_empty(value: &Option<String>) -> &str {
    present(value.as_deref()).unwrap_or("")
}

/// "Jan 5, 2027"
pub fn format_short_date(at: &DateTime<FixedOffset>) -> String {
    at.format("%b %-d, %Y").to_string()
}

/// "9:05 AM"
pub fn format_time(at: &DateTime<FixedOffset>) -> String {
    at.format("%-I:%M %p").to_string()
}

/// "Tuesday, January 5, 2027"
pub fn format_full_date(at: &DateTime<FixedOffset>) -> String {
    at.format("%A, %B %-d, %Y").to_string()
}

/// Builds the binding map for `event` under `tenant`'s branding.
///
/// Timestamps are formatted in `offset`, the configured reference zone.
pub fn project(event: &Event, tenant: &Tenant, offset: FixedOffset) -> Result<Bindings, ProjectionError> {
    if event.tenant_id != tenant.id {
        return Err(ProjectionError::TenantMismatch {
            event_id: event.id,
            event_tenant: event.tenant_id,
            tenant: tenant.id,
        });
    }
    let title = present(Some(event.title.as_str())).ok_or(ProjectionError::MissingField("event.title"))?;
    let tenant_name = present(Some(tenant.name.as_str())).ok_or(ProjectionError::MissingField("tenant.name"))?;

    let start = event.start_datetime.with_timezone(&offset);
    let brand = tenant.brand_config.clone().unwrap_or_default();
    let fonts = brand.fonts.clone().unwrap_or_default();

    let mut bindings = Bindings::new();
    bindings.insert("event.title", title)?;
    bindings.insert("event.description", or_empty(&event.description))?;
    bindings.insert("event.date", format_short_date(&start))?;
    bindings.insert("event.time", format_time(&start))?;
    bindings.insert("event.formatted_date", format_full_date(&start))?;
    bindings.insert("event.venue", or_empty(&event.venue_name))?;
    bindings.insert("event.venue_address", or_empty(&event.venue_address))?;
    bindings.insert("event.online_url", or_empty(&event.online_url))?;

    bindings.insert("tenant.name", tenant_name)?;
    bindings.insert("tenant.logo_url", or_empty(&tenant.logo_url))?;
    bindings.insert(
        "tenant.brand_config.primary_color",
        present(brand.primary_color.as_deref()).unwrap_or(DEFAULT_PRIMARY_COLOR),
    )?;
    bindings.insert(
        "tenant.brand_config.secondary_color",
        present(brand.secondary_color.as_deref()).unwrap_or(DEFAULT_SECONDARY_COLOR),
    )?;
    bindings.insert(
        "tenant.brand_config.fonts.heading",
        present(fonts.heading.as_deref()).unwrap_or(DEFAULT_HEADING_FONT),
    )?;
    bindings.insert(
        "tenant.brand_config.fonts.body",
        present(fonts.body.as_deref()).unwrap_or(DEFAULT_BODY_FONT),
    )?;

    Ok(bindings)
}
