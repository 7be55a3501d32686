//! Canvas Document Model - Storage Shape Is The Contract
//!
//! Mirrors the JSON stored in template and design records. Every field the
//! engine does not know about is kept in a residual bag so stored documents
//! round-trip unchanged.

use serde::de::{self, Deserializer};
use serde::ser::{self, Serializer};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};
use std::collections::BTreeSet;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CanvasError {
    #[error("Canvas document must be a JSON object")]
    NotAnObject,

    #[error("Canvas `objects` must be an array")]
    ObjectsNotArray,

    #[error("Canvas object {index} must be a JSON object")]
    ObjectNotAnObject { index: usize },

    #[error("Canvas object {index} is invalid: {source}")]
    InvalidObject {
        index: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("Canvas header is invalid: {0}")]
    InvalidHeader(#[source] serde_json::Error),

    #[error("Canvas {field} must be positive")]
    ZeroDimension { field: &'static str },

    #[error("Canvas is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Physical unit of the canvas size.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Unit {
    #[default]
    #[serde(rename = "px")]
    Pixel,
    #[serde(rename = "mm")]
    Millimeter,
    #[serde(rename = "in")]
    Inch,
}

/// Governance zone of a graphic object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Zone {
    /// End-user editable.
    Safe,
    /// Immutable in the editor.
    Protected,
}

/// Object type tag. Unknown tags are carried verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ObjectKind {
    Rect,
    Circle,
    Text,
    IText,
    Textbox,
    Image,
    Other(String),
}

impl From<String> for ObjectKind {
    fn from(tag: String) -> Self {
        match tag.as_str() {
            "rect" => Self::Rect,
            "circle" => Self::Circle,
            "text" => Self::Text,
            "i-text" => Self::IText,
            "textbox" => Self::Textbox,
            "image" => Self::Image,
            _ => Self::Other(tag),
        }
    }
}

impl From<ObjectKind> for String {
    fn from(kind: ObjectKind) -> Self {
        match kind {
            ObjectKind::Rect => "rect".to_string(),
            ObjectKind::Circle => "circle".to_string(),
            ObjectKind::Text => "text".to_string(),
            ObjectKind::IText => "i-text".to_string(),
            ObjectKind::Textbox => "textbox".to_string(),
            ObjectKind::Image => "image".to_string(),
            ObjectKind::Other(tag) => tag,
        }
    }
}

impl ObjectKind {
    pub fn is_text_like(&self) -> bool {
        matches!(self, Self::Text | Self::IText | Self::Textbox)
    }
}

/// Position and size. Numbers keep their stored JSON representation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Geometry {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub left: Option<Number>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top: Option<Number>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<Number>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<Number>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub angle: Option<Number>,
}

impl Geometry {
    pub fn position(&self) -> (f64, f64) {
        (as_f64(&self.left), as_f64(&self.top))
    }
}

fn as_f64(n: &Option<Number>) -> f64 {
    n.as_ref().and_then(Number::as_f64).unwrap_or(0.0)
}

/// Style keys the engine reads. Everything else stays in `GraphicObject::extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Style {
    /// A color string, or a gradient/pattern object.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fill: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font_family: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font_size: Option<Number>,
}

impl Style {
    pub fn fill_color(&self) -> Option<&str> {
        self.fill.as_ref().and_then(Value::as_str)
    }
}

/// Zone metadata and the editor lock flags derived from it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Governance {
    #[serde(
        rename = "_cp_zone",
        deserialize_with = "deserialize_zone",
        skip_serializing_if = "Option::is_none"
    )]
    pub zone: Option<Zone>,
    #[serde(rename = "_cp_locked", skip_serializing_if = "Option::is_none")]
    pub locked: Option<bool>,
    #[serde(rename = "_cp_role", skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    /// Key the object's text is expected to be driven by. Informational only.
    #[serde(rename = "_cp_data_binding", skip_serializing_if = "Option::is_none")]
    pub data_binding: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selectable: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub evented: Option<bool>,
    #[serde(rename = "hasControls", skip_serializing_if = "Option::is_none")]
    pub has_controls: Option<bool>,
    #[serde(rename = "lockMovementX", skip_serializing_if = "Option::is_none")]
    pub lock_movement_x: Option<bool>,
    #[serde(rename = "lockMovementY", skip_serializing_if = "Option::is_none")]
    pub lock_movement_y: Option<bool>,
    #[serde(rename = "lockScalingX", skip_serializing_if = "Option::is_none")]
    pub lock_scaling_x: Option<bool>,
    #[serde(rename = "lockScalingY", skip_serializing_if = "Option::is_none")]
    pub lock_scaling_y: Option<bool>,
    #[serde(rename = "lockRotation", skip_serializing_if = "Option::is_none")]
    pub lock_rotation: Option<bool>,
}

impl Governance {
    pub fn is_locked(&self) -> bool {
        self.locked.unwrap_or(false)
    }
}

// An empty zone string is how the editor writes "unset".
fn deserialize_zone<'de, D>(deserializer: D) -> Result<Option<Zone>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw.as_deref() {
        None | Some("") => Ok(None),
        Some("safe") => Ok(Some(Zone::Safe)),
        Some("protected") => Ok(Some(Zone::Protected)),
        Some(other) => Err(de::Error::custom(format!(
            "unknown zone `{other}`, expected `safe` or `protected`"
        ))),
    }
}

/// One drawable object. Paint order is its index in `CanvasDocument::objects`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphicObject {
    #[serde(rename = "type")]
    pub kind: ObjectKind,
    #[serde(flatten)]
    pub geometry: Geometry,
    #[serde(flatten)]
    pub style: Style,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(flatten)]
    pub governance: Governance,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
    /// Keys stored as explicit `null`; written back unless a value was set.
    #[serde(skip)]
    null_keys: BTreeSet<String>,
}

impl GraphicObject {
    pub fn new(kind: ObjectKind) -> Self {
        Self {
            kind,
            geometry: Geometry::default(),
            style: Style::default(),
            text: None,
            governance: Governance::default(),
            extra: Map::new(),
            null_keys: BTreeSet::new(),
        }
    }

    pub fn text(content: impl Into<String>) -> Self {
        Self {
            text: Some(content.into()),
            ..Self::new(ObjectKind::Text)
        }
    }

    pub fn is_text_like(&self) -> bool {
        self.kind.is_text_like()
    }

    fn from_value(index: usize, value: Value) -> Result<Self, CanvasError> {
        let Value::Object(mut map) = value else {
            return Err(CanvasError::ObjectNotAnObject { index });
        };
        let null_keys = take_null_keys(&mut map);
        let mut object: Self = serde_json::from_value(Value::Object(map))
            .map_err(|source| CanvasError::InvalidObject { index, source })?;
        object.null_keys = null_keys;
        Ok(object)
    }

    /// Stored form of the object, including keys that were stored as `null`.
    pub fn to_value(&self) -> Result<Value, serde_json::Error> {
        let mut value = serde_json::to_value(self)?;
        if let Value::Object(map) = &mut value {
            restore_null_keys(map, &self.null_keys);
        }
        Ok(value)
    }

    /// Visits every string leaf that may carry placeholders.
    pub fn for_each_string(&self, f: &mut impl FnMut(&str)) {
        if let Some(text) = &self.text {
            f(text);
        }
        if let Some(fill) = &self.style.fill {
            visit_value(fill, f);
        }
        if let Some(family) = &self.style.font_family {
            f(family);
        }
        for value in self.extra.values() {
            visit_value(value, f);
        }
    }

    pub fn for_each_string_mut(&mut self, f: &mut impl FnMut(&mut String)) {
        if let Some(text) = &mut self.text {
            f(text);
        }
        if let Some(fill) = &mut self.style.fill {
            visit_value_mut(fill, f);
        }
        if let Some(family) = &mut self.style.font_family {
            f(family);
        }
        for value in self.extra.values_mut() {
            visit_value_mut(value, f);
        }
    }
}

// Typed fields read `null` and absent alike, so explicit nulls are set aside
// before parsing. `type` stays so a null tag is still rejected.
fn take_null_keys(map: &mut Map<String, Value>) -> BTreeSet<String> {
    let keys: BTreeSet<String> = map
        .iter()
        .filter(|(key, value)| value.is_null() && key.as_str() != "type")
        .map(|(key, _)| key.clone())
        .collect();
    for key in &keys {
        map.remove(key);
    }
    keys
}

fn restore_null_keys(map: &mut Map<String, Value>, keys: &BTreeSet<String>) {
    for key in keys {
        map.entry(key.clone()).or_insert(Value::Null);
    }
}

fn put<T: Serialize>(map: &mut Map<String, Value>, key: &str, value: &Option<T>) -> Result<(), serde_json::Error> {
    if let Some(value) = value {
        map.insert(key.to_string(), serde_json::to_value(value)?);
    }
    Ok(())
}

fn visit_value(value: &Value, f: &mut impl FnMut(&str)) {
    match value {
        Value::String(s) => f(s),
        Value::Array(items) => items.iter().for_each(|item| visit_value(item, f)),
        Value::Object(map) => map.values().for_each(|item| visit_value(item, f)),
        _ => {}
    }
}

fn visit_value_mut(value: &mut Value, f: &mut impl FnMut(&mut String)) {
    match value {
        Value::String(s) => f(s),
        Value::Array(items) => items.iter_mut().for_each(|item| visit_value_mut(item, f)),
        Value::Object(map) => map.values_mut().for_each(|item| visit_value_mut(item, f)),
        _ => {}
    }
}

/// A flyer layout: header plus an ordered list of objects.
///
/// Serialization goes through [`CanvasDocument::from_value`] and
/// [`CanvasDocument::to_value`] in both directions.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CanvasDocument {
    /// Editor version that produced the document.
    pub version: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub unit: Option<Unit>,
    pub objects: Vec<GraphicObject>,
    pub extra: Map<String, Value>,
    has_objects_key: bool,
    null_keys: BTreeSet<String>,
}

#[derive(Deserialize)]
struct Header {
    #[serde(default)]
    version: Option<String>,
    #[serde(default)]
    width: Option<u32>,
    #[serde(default)]
    height: Option<u32>,
    #[serde(default)]
    unit: Option<Unit>,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

impl CanvasDocument {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width: Some(width),
            height: Some(height),
            has_objects_key: true,
            ..Self::default()
        }
    }

    pub fn with_objects(mut self, objects: Vec<GraphicObject>) -> Self {
        self.objects = objects;
        self
    }

    pub fn unit(&self) -> Unit {
        self.unit.unwrap_or_default()
    }

    /// Parses and checks a stored document.
    ///
    /// Errors name the offending object index so a broken template can be
    /// located. Unknown object kinds are not an error.
    pub fn from_value(value: Value) -> Result<Self, CanvasError> {
        let Value::Object(mut root) = value else {
            return Err(CanvasError::NotAnObject);
        };
        let null_keys = take_null_keys(&mut root);

        let raw_objects = root.remove("objects");
        let has_objects_key = raw_objects.is_some();
        let objects = match raw_objects {
            None => Vec::new(),
            Some(Value::Array(items)) => items
                .into_iter()
                .enumerate()
                .map(|(index, item)| GraphicObject::from_value(index, item))
                .collect::<Result<Vec<_>, _>>()?,
            Some(_) => return Err(CanvasError::ObjectsNotArray),
        };

        let header: Header =
            serde_json::from_value(Value::Object(root)).map_err(CanvasError::InvalidHeader)?;
        let document = CanvasDocument {
            version: header.version,
            width: header.width,
            height: header.height,
            unit: header.unit,
            objects,
            extra: header.extra,
            has_objects_key,
            null_keys,
        };
        document.check_dimensions()?;
        Ok(document)
    }

    pub fn from_json(json: &str) -> Result<Self, CanvasError> {
        let value: Value = serde_json::from_str(json)?;
        Self::from_value(value)
    }

    /// Stored form of the document. `objects` is written when it was
    /// stored or when the document has objects.
    pub fn to_value(&self) -> Result<Value, CanvasError> {
        let mut root = self.extra.clone();
        put(&mut root, "version", &self.version)?;
        put(&mut root, "width", &self.width)?;
        put(&mut root, "height", &self.height)?;
        put(&mut root, "unit", &self.unit)?;
        if self.has_objects_key || !self.objects.is_empty() {
            let objects = self
                .objects
                .iter()
                .map(GraphicObject::to_value)
                .collect::<Result<Vec<_>, _>>()?;
            root.insert("objects".to_string(), Value::Array(objects));
        }
        restore_null_keys(&mut root, &self.null_keys);
        Ok(Value::Object(root))
    }

    pub fn to_json(&self) -> Result<String, CanvasError> {
        Ok(serde_json::to_string(&self.to_value()?)?)
    }

    fn check_dimensions(&self) -> Result<(), CanvasError> {
        if self.width == Some(0) {
            return Err(CanvasError::ZeroDimension { field: "width" });
        }
        if self.height == Some(0) {
            return Err(CanvasError::ZeroDimension { field: "height" });
        }
        Ok(())
    }

    /// Placeholder keys referenced anywhere in the document, sorted.
    pub fn placeholders(&self) -> BTreeSet<String> {
        let mut keys = BTreeSet::new();
        self.for_each_string(&mut |s| keys.extend(crate::placeholder::placeholder_keys(s)));
        keys
    }

    pub fn for_each_string(&self, f: &mut impl FnMut(&str)) {
        for value in self.extra.values() {
            visit_value(value, f);
        }
        for object in &self.objects {
            object.for_each_string(f);
        }
    }

    pub fn for_each_string_mut(&mut self, f: &mut impl FnMut(&mut String)) {
        for value in self.extra.values_mut() {
            visit_value_mut(value, f);
        }
        for object in &mut self.objects {
            object.for_each_string_mut(f);
        }
    }
}

impl Serialize for CanvasDocument {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_value().map_err(ser::Error::custom)?.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for CanvasDocument {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        CanvasDocument::from_value(value).map_err(de::Error::custom)
    }
}
