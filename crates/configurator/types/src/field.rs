//! Dynamic fields: per-request form fields derived from attribute lines
//!
//! Dynamic fields are never stored. A field is identified by a typed key
//! (attribute id + kind) and described by a FieldDescriptor that is
//! recomputed whenever the session's selections or step change.

use crate::{AttributeId, AttachmentId, ConfiguratorError, CustomType, StepLineId, ValueId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::str::FromStr;

// ── Field Identifier ─────────────────────────────────────────────────

/// Which dynamic field of an attribute line a key refers to
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    /// The value selector of the line
    Attribute,
    /// Companion field holding a free-form custom value
    Custom,
    /// Read-only display mode of the line
    Mode,
}

impl FieldKind {
    pub fn prefix(&self) -> &'static str {
        match self {
            FieldKind::Attribute => "attribute",
            FieldKind::Custom => "custom",
            FieldKind::Mode => "mode",
        }
    }
}

/// Typed key of a dynamic field
///
/// Serialized as its stable name so maps keyed by field stay valid JSON.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct FieldId {
    pub attribute_id: AttributeId,
    pub kind: FieldKind,
}

impl FieldId {
    pub fn new(attribute_id: AttributeId, kind: FieldKind) -> Self {
        Self { attribute_id, kind }
    }

    pub fn attribute(attribute_id: AttributeId) -> Self {
        Self::new(attribute_id, FieldKind::Attribute)
    }

    pub fn custom(attribute_id: AttributeId) -> Self {
        Self::new(attribute_id, FieldKind::Custom)
    }

    pub fn mode(attribute_id: AttributeId) -> Self {
        Self::new(attribute_id, FieldKind::Mode)
    }

    /// Stable textual name used by hosts that need string field names
    pub fn name(&self) -> String {
        self.to_string()
    }
}

impl std::fmt::Display for FieldId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.kind.prefix(), self.attribute_id)
    }
}

impl FromStr for FieldId {
    type Err = ConfiguratorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (prefix, id) = s
            .split_once('-')
            .ok_or_else(|| ConfiguratorError::InvalidState(format!("not a field name: {s}")))?;
        let kind = match prefix {
            "attribute" => FieldKind::Attribute,
            "custom" => FieldKind::Custom,
            "mode" => FieldKind::Mode,
            _ => {
                return Err(ConfiguratorError::InvalidState(format!(
                    "unknown field prefix in {s}"
                )))
            }
        };
        let id: u64 = id
            .parse()
            .map_err(|_| ConfiguratorError::InvalidState(format!("bad attribute id in {s}")))?;
        Ok(Self::new(AttributeId(id), kind))
    }
}

impl From<FieldId> for String {
    fn from(id: FieldId) -> Self {
        id.to_string()
    }
}

impl TryFrom<String> for FieldId {
    type Error = ConfiguratorError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

// ── Field Values ─────────────────────────────────────────────────────

/// Value held by a dynamic field in the view
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum FieldValue {
    #[default]
    Empty,
    /// Single-select line
    Single(ValueId),
    /// Multi-select line
    Multi(BTreeSet<ValueId>),
    /// Custom text value, or the key of a display mode
    Text(String),
    /// Custom binary value stored as attachments
    Attachments(Vec<AttachmentId>),
}

impl FieldValue {
    pub fn is_empty(&self) -> bool {
        match self {
            FieldValue::Empty => true,
            FieldValue::Multi(ids) => ids.is_empty(),
            FieldValue::Attachments(ids) => ids.is_empty(),
            FieldValue::Single(_) | FieldValue::Text(_) => false,
        }
    }

    /// Selected value ids, if this is a selector value
    pub fn value_ids(&self) -> BTreeSet<ValueId> {
        match self {
            FieldValue::Single(id) => [*id].into_iter().collect(),
            FieldValue::Multi(ids) => ids.clone(),
            _ => BTreeSet::new(),
        }
    }

    pub fn contains(&self, value: ValueId) -> bool {
        match self {
            FieldValue::Single(id) => *id == value,
            FieldValue::Multi(ids) => ids.contains(&value),
            _ => false,
        }
    }

    pub fn shape(&self) -> &'static str {
        match self {
            FieldValue::Empty => "empty",
            FieldValue::Single(_) => "single value",
            FieldValue::Multi(_) => "value list",
            FieldValue::Text(_) => "text",
            FieldValue::Attachments(_) => "attachments",
        }
    }
}

// ── Field Descriptors ────────────────────────────────────────────────

/// Type of a dynamic field
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "custom_type", rename_all = "snake_case")]
pub enum FieldType {
    SingleSelect,
    MultiSelect,
    Custom(CustomType),
    Mode,
}

/// Metadata describing a dynamic field for the current request
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    pub id: FieldId,
    pub label: String,
    pub field_type: FieldType,
    /// Values the field may hold (selector fields only)
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub candidate_values: BTreeSet<ValueId>,
    pub required: bool,
    pub readonly: bool,
    pub visible: bool,
    pub sequence: i32,
    /// Steps owning the line (empty when the template has no steps)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub step_ids: Vec<StepLineId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub widget: Option<String>,
}

impl FieldDescriptor {
    pub fn new(id: FieldId, label: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            id,
            label: label.into(),
            field_type,
            candidate_values: BTreeSet::new(),
            required: false,
            readonly: false,
            visible: true,
            sequence: 0,
            step_ids: Vec::new(),
            widget: None,
        }
    }

    pub fn is_multi(&self) -> bool {
        self.field_type == FieldType::MultiSelect
    }

    /// Value a cleared field takes for this descriptor's type
    pub fn empty_value(&self) -> FieldValue {
        match self.field_type {
            FieldType::MultiSelect => FieldValue::Multi(BTreeSet::new()),
            _ => FieldValue::Empty,
        }
    }
}
