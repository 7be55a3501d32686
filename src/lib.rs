//! Flyer Studio Core - Template Data Binding Engine
//!
//! # The Five Rules (Non-Negotiable)
//! 1. Stored Canvas Shape Is Truth
//! 2. Protection Is All Or Nothing
//! 3. Substitution Is Single Pass
//! 4. Selection Order Is Fixed
//! 5. Generation Never Blocks Event Creation

pub mod canvas;
pub mod config;
pub mod placeholder;
pub mod zones;
pub mod templates;
pub mod selection;
pub mod projection;
pub mod validation;
pub mod hashing;
pub mod store;
pub mod pipeline;

pub use canvas::{CanvasDocument, CanvasError, GraphicObject, ObjectKind, Unit, Zone};
pub use config::{ConfigError, StudioConfig};
pub use placeholder::{inject_template, resolve, Bindings, PlaceholderError};
pub use zones::{normalize, normalize_object};
pub use templates::{DesignTemplate, TemplateCategory, TemplateId, TemplateRegistry};
pub use selection::{select_template, ExplicitMissPolicy, Selection, SelectionSource, TemplateStore};
pub use projection::{project, BrandConfig, BrandFonts, Event, ProjectionError, Tenant};
pub use validation::{FailureMode, ValidationResult, ValidationRule, ValidationViolation, Validator, ViolationSeverity};
pub use hashing::{canonical_json, content_hash};
pub use store::{DesignStore, StoreError, TenantStore};
pub use pipeline::{DesignStatus, FlyerGenerator, GeneratedDesign, PipelineError};

pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");
