//! Product templates: the configurable blueprint behind every variant
//!
//! A ProductTemplate owns an ordered list of attribute lines (the
//! configurable dimensions) and an optional ordered list of step lines
//! that group those attribute lines into wizard pages.
//!
//! Templates are read-only to the wizard. They are validated once when
//! handed to a catalog and never mutated afterwards.

use crate::{
    AttributeId, ConfiguratorError, ConfiguratorResult, DisplayMode, StepLineId, TemplateId,
    ValueId,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};

// ── Attributes ───────────────────────────────────────────────────────

/// Type of the free-form value a custom attribute accepts
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CustomType {
    #[default]
    Char,
    Integer,
    Float,
    Text,
    Color,
    Date,
    Binary,
}

impl CustomType {
    /// Binary custom values are stored as attachments rather than text
    pub fn is_binary(&self) -> bool {
        matches!(self, CustomType::Binary)
    }

    /// Widget hint for the companion custom field
    pub fn widget(&self) -> Option<&'static str> {
        match self {
            CustomType::Color => Some("color"),
            _ => None,
        }
    }
}

/// A product attribute (e.g. "Color")
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Attribute {
    pub id: AttributeId,
    pub name: String,
    #[serde(default)]
    pub custom_type: CustomType,
    /// Whether new values may be created straight from the wizard
    #[serde(default)]
    pub create_on_the_fly: bool,
}

impl Attribute {
    pub fn new(id: AttributeId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            custom_type: CustomType::Char,
            create_on_the_fly: false,
        }
    }

    pub fn with_custom_type(mut self, custom_type: CustomType) -> Self {
        self.custom_type = custom_type;
        self
    }

    pub fn create_on_the_fly(mut self) -> Self {
        self.create_on_the_fly = true;
        self
    }
}

/// A selectable value of an attribute (e.g. "Red")
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AttributeValue {
    pub id: ValueId,
    pub attribute_id: AttributeId,
    pub name: String,
    #[serde(default)]
    pub sequence: i32,
}

impl AttributeValue {
    pub fn new(id: ValueId, attribute_id: AttributeId, name: impl Into<String>) -> Self {
        Self {
            id,
            attribute_id,
            name: name.into(),
            sequence: 0,
        }
    }
}

// ── Attribute Lines ──────────────────────────────────────────────────

/// A configurable dimension of a template with its allowed values
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AttributeLine {
    pub attribute: Attribute,
    /// Allowed value ids, in display order
    pub value_ids: Vec<ValueId>,
    /// Selects many values instead of one
    #[serde(default)]
    pub multi: bool,
    /// Permits a free-form value in place of a listed one
    #[serde(default)]
    pub custom: bool,
    #[serde(default)]
    pub required: bool,
    #[serde(default = "default_sequence")]
    pub sequence: i32,
    #[serde(default)]
    pub display_mode: DisplayMode,
}

fn default_sequence() -> i32 {
    10
}

impl AttributeLine {
    pub fn new(attribute: Attribute, value_ids: impl IntoIterator<Item = ValueId>) -> Self {
        Self {
            attribute,
            value_ids: value_ids.into_iter().collect(),
            multi: false,
            custom: false,
            required: false,
            sequence: default_sequence(),
            display_mode: DisplayMode::default(),
        }
    }

    pub fn multi(mut self) -> Self {
        self.multi = true;
        self
    }

    pub fn custom(mut self) -> Self {
        self.custom = true;
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn with_sequence(mut self, sequence: i32) -> Self {
        self.sequence = sequence;
        self
    }

    pub fn with_display_mode(mut self, mode: DisplayMode) -> Self {
        self.display_mode = mode;
        self
    }

    pub fn attribute_id(&self) -> AttributeId {
        self.attribute.id
    }

    pub fn allows(&self, value: ValueId) -> bool {
        self.value_ids.contains(&value)
    }

    pub fn value_set(&self) -> BTreeSet<ValueId> {
        self.value_ids.iter().copied().collect()
    }

    /// Total order used for display and field processing
    pub fn sort_key(&self) -> (i32, AttributeId) {
        (self.sequence, self.attribute.id)
    }
}

// ── Step Lines ───────────────────────────────────────────────────────

/// A wizard page grouping a subset of the template's attribute lines
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConfigStepLine {
    pub id: StepLineId,
    pub name: String,
    #[serde(default = "default_sequence")]
    pub sequence: i32,
    /// Attribute lines governed by this step, referenced by attribute
    pub attribute_ids: Vec<AttributeId>,
}

impl ConfigStepLine {
    pub fn new(id: StepLineId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            sequence: default_sequence(),
            attribute_ids: Vec::new(),
        }
    }

    pub fn with_attribute(mut self, attribute_id: AttributeId) -> Self {
        self.attribute_ids.push(attribute_id);
        self
    }

    pub fn with_sequence(mut self, sequence: i32) -> Self {
        self.sequence = sequence;
        self
    }

    pub fn governs(&self, attribute_id: AttributeId) -> bool {
        self.attribute_ids.contains(&attribute_id)
    }
}

// ── Product Template ─────────────────────────────────────────────────

/// A configurable product template
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProductTemplate {
    pub id: TemplateId,
    pub name: String,
    pub attribute_lines: Vec<AttributeLine>,
    #[serde(default)]
    pub step_lines: Vec<ConfigStepLine>,
}

impl ProductTemplate {
    pub fn new(id: TemplateId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            attribute_lines: Vec::new(),
            step_lines: Vec::new(),
        }
    }

    pub fn with_line(mut self, line: AttributeLine) -> Self {
        self.attribute_lines.push(line);
        self
    }

    pub fn with_step(mut self, step: ConfigStepLine) -> Self {
        self.step_lines.push(step);
        self
    }

    pub fn has_steps(&self) -> bool {
        !self.step_lines.is_empty()
    }

    /// Attribute lines in `(sequence, attribute id)` order
    pub fn sorted_lines(&self) -> Vec<&AttributeLine> {
        let mut lines: Vec<&AttributeLine> = self.attribute_lines.iter().collect();
        lines.sort_by_key(|l| l.sort_key());
        lines
    }

    /// Step lines in `(sequence, id)` order
    pub fn sorted_steps(&self) -> Vec<&ConfigStepLine> {
        let mut steps: Vec<&ConfigStepLine> = self.step_lines.iter().collect();
        steps.sort_by_key(|s| (s.sequence, s.id));
        steps
    }

    pub fn line(&self, attribute_id: AttributeId) -> Option<&AttributeLine> {
        self.attribute_lines
            .iter()
            .find(|l| l.attribute.id == attribute_id)
    }

    pub fn step(&self, step_id: StepLineId) -> Option<&ConfigStepLine> {
        self.step_lines.iter().find(|s| s.id == step_id)
    }

    /// Ids of every step governing the given attribute line
    pub fn steps_for(&self, attribute_id: AttributeId) -> Vec<StepLineId> {
        self.sorted_steps()
            .into_iter()
            .filter(|s| s.governs(attribute_id))
            .map(|s| s.id)
            .collect()
    }

    /// Attribute line owning a value id, if any
    pub fn line_of_value(&self, value: ValueId) -> Option<&AttributeLine> {
        self.attribute_lines.iter().find(|l| l.allows(value))
    }

    /// Every value id configurable on this template
    pub fn all_value_ids(&self) -> BTreeSet<ValueId> {
        self.attribute_lines
            .iter()
            .flat_map(|l| l.value_ids.iter().copied())
            .collect()
    }

    /// Value ids of the lines governed by a step
    pub fn step_value_ids(&self, step_id: StepLineId) -> BTreeSet<ValueId> {
        match self.step(step_id) {
            Some(step) => step
                .attribute_ids
                .iter()
                .filter_map(|a| self.line(*a))
                .flat_map(|l| l.value_ids.iter().copied())
                .collect(),
            None => BTreeSet::new(),
        }
    }

    /// Validate structural invariants
    pub fn validate(&self) -> ConfiguratorResult<()> {
        let mut seen_attributes = HashSet::new();
        let mut seen_values = HashSet::new();
        for line in &self.attribute_lines {
            if !seen_attributes.insert(line.attribute.id) {
                return Err(ConfiguratorError::TemplateValidation(format!(
                    "attribute {} appears on more than one line",
                    line.attribute.id
                )));
            }
            for value in &line.value_ids {
                if !seen_values.insert(*value) {
                    return Err(ConfiguratorError::TemplateValidation(format!(
                        "value {} is listed more than once",
                        value
                    )));
                }
            }
        }

        let mut seen_steps = HashSet::new();
        for step in &self.step_lines {
            if !seen_steps.insert(step.id) {
                return Err(ConfiguratorError::TemplateValidation(format!(
                    "duplicate step line id {}",
                    step.id
                )));
            }
            for attribute_id in &step.attribute_ids {
                if self.line(*attribute_id).is_none() {
                    return Err(ConfiguratorError::TemplateValidation(format!(
                        "step '{}' references attribute {} which is not on template {}",
                        step.name, attribute_id, self.id
                    )));
                }
            }
        }

        Ok(())
    }

    /// Reject templates listing `reserved` (the custom option marker) as a
    /// real value
    pub fn check_reserved_value(&self, reserved: ValueId) -> ConfiguratorResult<()> {
        match self.attribute_lines.iter().find(|l| l.allows(reserved)) {
            Some(line) => Err(ConfiguratorError::TemplateValidation(format!(
                "value {} of {} on template {} is reserved for the custom option",
                reserved, line.attribute.name, self.id
            ))),
            None => Ok(()),
        }
    }
}
