//! Validation System - Rule/Policy Separation
//!
//! Rules produce structured violations about a canvas.
//! Policy maps violations to actions.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::canvas::{CanvasDocument, Zone};
use crate::placeholder::placeholder_keys;
use crate::projection::PROJECTION_KEYS;
use crate::zones::is_fully_locked;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ViolationSeverity {
    Error,
    Warning,
    Info,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FailureMode {
    #[default]
    Block,
    Warn,
    Log,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationViolation {
    pub rule: String,
    pub severity: ViolationSeverity,
    pub message: String,
    #[serde(default)]
    pub object_index: Option<usize>,
    pub expected: Option<String>,
    pub actual: Option<String>,
    pub remediation: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationResult {
    pub valid: bool,
    pub violations: Vec<ValidationViolation>,
}

impl ValidationResult {
    pub fn success(violations: Vec<ValidationViolation>) -> Self {
        Self { valid: true, violations }
    }

    pub fn failure(violations: Vec<ValidationViolation>) -> Self {
        Self { valid: false, violations }
    }

    pub fn has_errors(&self) -> bool {
        self.violations.iter().any(|v| v.severity == ViolationSeverity::Error)
    }

    /// "rule: message" lines for error violations, joined for display.
    pub fn error_summary(&self) -> String {
        self.violations
            .iter()
            .filter(|v| v.severity == ViolationSeverity::Error)
            .map(|v| format!("{}: {}", v.rule, v.message))
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// What the rules know about the document beyond its own content.
#[derive(Debug, Clone)]
pub struct ValidationContext {
    /// Width and height declared on the owning template record.
    pub declared_size: Option<[u32; 2]>,
    /// Placeholder keys a generation run can bind.
    pub known_keys: BTreeSet<String>,
}

impl Default for ValidationContext {
    fn default() -> Self {
        Self {
            declared_size: None,
            known_keys: PROJECTION_KEYS.iter().map(|k| k.to_string()).collect(),
        }
    }
}

impl ValidationContext {
    pub fn with_declared_size(mut self, width: u32, height: u32) -> Self {
        self.declared_size = Some([width, height]);
        self
    }
}

/// Validation rule trait - produces violations
pub trait ValidationRule {
    fn name(&self) -> &'static str;
    fn validate(&self, document: &CanvasDocument, context: &ValidationContext) -> Vec<ValidationViolation>;
}

// --- Concrete Rules ---

pub struct DimensionsRule;

impl ValidationRule for DimensionsRule {
    fn name(&self) -> &'static str { "dimensions" }

    fn validate(&self, document: &CanvasDocument, context: &ValidationContext) -> Vec<ValidationViolation> {
        let Some([width, height]) = context.declared_size else {
            return vec![];
        };
        let (Some(canvas_w), Some(canvas_h)) = (document.width, document.height) else {
            return vec![];
        };

        if canvas_w != width || canvas_h != height {
            vec![ValidationViolation {
                rule: self.name().to_string(),
                severity: ViolationSeverity::Warning,
                message: "Canvas size differs from template size".to_string(),
                object_index: None,
                expected: Some(format!("{}x{}", width, height)),
                actual: Some(format!("{}x{}", canvas_w, canvas_h)),
                remediation: vec!["Resize the canvas or update the template record".to_string()],
            }]
        } else {
            vec![]
        }
    }
}

pub struct LockConsistencyRule;

impl ValidationRule for LockConsistencyRule {
    fn name(&self) -> &'static str { "lock_consistency" }

    fn validate(&self, document: &CanvasDocument, _context: &ValidationContext) -> Vec<ValidationViolation> {
        document
            .objects
            .iter()
            .enumerate()
            .filter(|(_, o)| o.governance.zone == Some(Zone::Protected) && !is_fully_locked(o))
            .map(|(index, _)| ValidationViolation {
                rule: self.name().to_string(),
                severity: ViolationSeverity::Error,
                message: format!("Protected object {} is only partially locked", index),
                object_index: Some(index),
                expected: Some("full lock set".to_string()),
                actual: Some("partial lock set".to_string()),
                remediation: vec!["Normalize the canvas before saving".to_string()],
            })
            .collect()
    }
}

pub struct PlaceholderKeyRule;

impl ValidationRule for PlaceholderKeyRule {
    fn name(&self) -> &'static str { "placeholder_keys" }

    fn validate(&self, document: &CanvasDocument, context: &ValidationContext) -> Vec<ValidationViolation> {
        let mut violations = vec![];
        for (index, object) in document.objects.iter().enumerate() {
            let mut unknown = BTreeSet::new();
            object.for_each_string(&mut |s| {
                for key in placeholder_keys(s) {
                    if !context.known_keys.contains(&key) {
                        unknown.insert(key);
                    }
                }
            });
            for key in unknown {
                violations.push(ValidationViolation {
                    rule: self.name().to_string(),
                    severity: ViolationSeverity::Warning,
                    message: format!("Placeholder `{{{{{}}}}}` will never be bound", key),
                    object_index: Some(index),
                    expected: None,
                    actual: Some(key),
                    remediation: vec!["Use one of the event.* or tenant.* keys".to_string()],
                });
            }
        }
        violations
    }
}

pub struct DataBindingRule;

impl ValidationRule for DataBindingRule {
    fn name(&self) -> &'static str { "data_binding" }

    fn validate(&self, document: &CanvasDocument, _context: &ValidationContext) -> Vec<ValidationViolation> {
        let mut violations = vec![];
        for (index, object) in document.objects.iter().enumerate() {
            let Some(binding) = &object.governance.data_binding else {
                continue;
            };
            let referenced = object
                .text
                .as_deref()
                .map(placeholder_keys)
                .unwrap_or_default();
            if !referenced.iter().any(|k| k == binding) {
                violations.push(ValidationViolation {
                    rule: self.name().to_string(),
                    severity: ViolationSeverity::Info,
                    message: format!("Declared binding `{}` does not appear in the text", binding),
                    object_index: Some(index),
                    expected: Some(binding.clone()),
                    actual: Some(referenced.join(", ")),
                    remediation: vec![],
                });
            }
        }
        violations
    }
}

/// Validator orchestrates rules and applies policy
pub struct Validator {
    rules: Vec<Box<dyn ValidationRule>>,
    failure_mode: FailureMode,
}

impl Validator {
    pub fn new(failure_mode: FailureMode) -> Self {
        Self {
            rules: vec![
                Box::new(DimensionsRule),
                Box::new(LockConsistencyRule),
                Box::new(PlaceholderKeyRule),
                Box::new(DataBindingRule),
            ],
            failure_mode,
        }
    }

    pub fn validate(&self, document: &CanvasDocument, context: &ValidationContext) -> ValidationResult {
        let mut all_violations = vec![];

        for rule in &self.rules {
            let violations = rule.validate(document, context);
            all_violations.extend(violations);
        }

        let has_errors = all_violations.iter()
            .any(|v| v.severity == ViolationSeverity::Error);

        match self.failure_mode {
            FailureMode::Block if has_errors => ValidationResult::failure(all_violations),
            FailureMode::Block => ValidationResult::success(all_violations),
            FailureMode::Warn => {
                for v in all_violations.iter().filter(|v| v.severity != ViolationSeverity::Info) {
                    log::warn!("event=canvas_violation rule={} message={}", v.rule, v.message);
                }
                ValidationResult::success(all_violations)
            }
            FailureMode::Log => {
                for v in &all_violations {
                    log::info!("event=canvas_violation rule={} message={}", v.rule, v.message);
                }
                ValidationResult::success(all_violations)
            }
        }
    }
}

impl Default for Validator {
    fn default() -> Self {
        Self::new(FailureMode::default())
    }
}
