//! Configuration sessions: the mutable state of one wizard run
//!
//! A session records which template is being configured, where the user
//! is in the wizard, and the compact persisted form of the selections:
//! a set of value ids plus custom values for lines that allow them.

use crate::{
    AttachmentId, AttributeId, ConfiguratorError, ConfiguratorResult, CustomType, OrderId,
    OrderLineId, OrderTarget, ProductId, ProductTemplate, SessionId, StepLineId, TemplateId, ValueId,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::str::FromStr;

// ── Wizard State ─────────────────────────────────────────────────────

/// Where the wizard currently is.
///
/// The set of states is open: besides `select` and `configure`, any step
/// line id of the current template is a state. Step ids are accepted
/// as-is when parsed and only checked against a template by
/// [`WizardState::validate_for`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum WizardState {
    /// No template chosen yet
    #[default]
    Select,
    /// Every line on one page: templates without step lines, or stepped
    /// templates none of whose steps is open
    Configure,
    /// A step line of the template
    Step(StepLineId),
}

impl WizardState {
    pub fn step_id(&self) -> Option<StepLineId> {
        match self {
            WizardState::Step(id) => Some(*id),
            _ => None,
        }
    }

    pub fn is_select(&self) -> bool {
        matches!(self, WizardState::Select)
    }

    /// Check that a step state names a step of the template
    pub fn validate_for(&self, template: &ProductTemplate) -> ConfiguratorResult<()> {
        match self {
            WizardState::Step(id) if template.step(*id).is_none() => Err(
                ConfiguratorError::InvalidState(format!(
                    "step {} is not defined on template {}",
                    id, template.id
                )),
            ),
            _ => Ok(()),
        }
    }
}

impl std::fmt::Display for WizardState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WizardState::Select => write!(f, "select"),
            WizardState::Configure => write!(f, "configure"),
            WizardState::Step(id) => write!(f, "{}", id),
        }
    }
}

impl FromStr for WizardState {
    type Err = ConfiguratorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "select" => Ok(WizardState::Select),
            "configure" => Ok(WizardState::Configure),
            other => other
                .parse::<u64>()
                .map(|id| WizardState::Step(StepLineId(id)))
                .map_err(|_| ConfiguratorError::InvalidState(other.to_string())),
        }
    }
}

impl From<WizardState> for String {
    fn from(state: WizardState) -> Self {
        state.to_string()
    }
}

impl TryFrom<String> for WizardState {
    type Error = ConfiguratorError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

// ── Custom Values ────────────────────────────────────────────────────

/// A free-form value standing in for a listed attribute value
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomValue {
    pub attribute_id: AttributeId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachment_ids: Vec<AttachmentId>,
}

impl CustomValue {
    pub fn text(attribute_id: AttributeId, value: impl Into<String>) -> Self {
        Self {
            attribute_id,
            value: Some(value.into()),
            attachment_ids: Vec::new(),
        }
    }

    pub fn attachments(attribute_id: AttributeId, attachment_ids: Vec<AttachmentId>) -> Self {
        Self {
            attribute_id,
            value: None,
            attachment_ids,
        }
    }

    /// Whether nothing was entered for a custom value of `custom_type`
    pub fn is_blank(&self, custom_type: CustomType) -> bool {
        if custom_type.is_binary() {
            self.attachment_ids.is_empty()
        } else {
            self.value.as_deref().map_or(true, |v| v.trim().is_empty())
        }
    }
}

// ── Configuration Session ────────────────────────────────────────────

/// The persisted state of a configuration wizard
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConfigurationSession {
    pub id: SessionId,
    /// Set once; only cleared sessions may switch templates
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product_tmpl_id: Option<TemplateId>,
    pub state: WizardState,
    #[serde(default)]
    pub value_ids: BTreeSet<ValueId>,
    #[serde(default, rename = "custom_value_ids")]
    pub custom_values: Vec<CustomValue>,
    /// Variant being reconfigured, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product_id: Option<ProductId>,
    /// Order line to update on completion instead of adding a new one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_line_id: Option<OrderLineId>,
    /// Order the wizard was launched from; receives a new line on completion
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_id: Option<OrderId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ConfigurationSession {
    /// Create a fresh session in the `select` state
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            id: SessionId::generate(),
            product_tmpl_id: None,
            state: WizardState::Select,
            value_ids: BTreeSet::new(),
            custom_values: Vec::new(),
            product_id: None,
            order_line_id: None,
            order_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_order(mut self, order: OrderId) -> Self {
        self.order_id = Some(order);
        self
    }

    pub fn with_order_line(mut self, line: OrderLineId) -> Self {
        self.order_line_id = Some(line);
        self
    }

    /// Where the finished configuration should be attached, if anywhere
    pub fn order_target(&self) -> Option<OrderTarget> {
        match (self.order_line_id, self.order_id) {
            (Some(line), _) => Some(OrderTarget::Line(line)),
            (None, Some(order)) => Some(OrderTarget::Order(order)),
            (None, None) => None,
        }
    }

    pub fn has_selections(&self) -> bool {
        !self.value_ids.is_empty() || !self.custom_values.is_empty()
    }

    pub fn custom_value(&self, attribute_id: AttributeId) -> Option<&CustomValue> {
        self.custom_values
            .iter()
            .find(|c| c.attribute_id == attribute_id)
    }

    /// Replace the custom value of an attribute (or drop it with `None`)
    pub fn set_custom_value(&mut self, attribute_id: AttributeId, value: Option<CustomValue>) {
        self.custom_values.retain(|c| c.attribute_id != attribute_id);
        if let Some(value) = value {
            self.custom_values.push(value);
        }
        self.custom_values.sort_by_key(|c| c.attribute_id);
    }

    /// Remove every selection, keeping template and progress
    pub fn clear_selections(&mut self) {
        self.value_ids.clear();
        self.custom_values.clear();
        self.touch();
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

impl Default for ConfigurationSession {
    fn default() -> Self {
        Self::new()
    }
}
