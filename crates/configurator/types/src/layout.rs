//! Layout tree handed to the host's view renderer
//!
//! The wizard never produces markup. It builds a serializable tree of
//! groups, rows, labels and fields whose dynamic behaviour is expressed as
//! declarative predicates over the wizard state and other fields.

use crate::{FieldId, FieldValue, ValueId, WizardState};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

// ── Predicates ───────────────────────────────────────────────────────

/// A condition the renderer evaluates against the live form
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Condition {
    StateIn { states: Vec<WizardState> },
    StateNotIn { states: Vec<WizardState> },
    FieldIn { field: FieldId, values: BTreeSet<ValueId> },
    FieldNotIn { field: FieldId, values: BTreeSet<ValueId> },
    FieldEquals { field: FieldId, value: FieldValue },
    FieldNotEquals { field: FieldId, value: FieldValue },
}

impl Condition {
    /// Evaluate against a wizard state and the current field values
    pub fn holds(&self, state: &WizardState, fields: &BTreeMap<FieldId, FieldValue>) -> bool {
        let current = |field: &FieldId| fields.get(field).cloned().unwrap_or_default();
        match self {
            Condition::StateIn { states } => states.contains(state),
            Condition::StateNotIn { states } => !states.contains(state),
            Condition::FieldIn { field, values } => {
                current(field).value_ids().iter().any(|v| values.contains(v))
            }
            Condition::FieldNotIn { field, values } => {
                !current(field).value_ids().iter().any(|v| values.contains(v))
            }
            Condition::FieldEquals { field, value } => current(field) == *value,
            Condition::FieldNotEquals { field, value } => current(field) != *value,
        }
    }
}

/// Dynamic behaviour of a layout node.
///
/// `invisible` and `readonly` hold when ANY condition holds; `required`
/// holds when ALL conditions hold (and there is at least one).
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Modifiers {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub invisible: Vec<Condition>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub readonly: Vec<Condition>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required: Vec<Condition>,
}

impl Modifiers {
    pub fn is_invisible(&self, state: &WizardState, values: &BTreeMap<FieldId, FieldValue>) -> bool {
        self.invisible.iter().any(|c| c.holds(state, values))
    }

    pub fn is_readonly(&self, state: &WizardState, values: &BTreeMap<FieldId, FieldValue>) -> bool {
        self.readonly.iter().any(|c| c.holds(state, values))
    }

    pub fn is_required(&self, state: &WizardState, values: &BTreeMap<FieldId, FieldValue>) -> bool {
        !self.required.is_empty() && self.required.iter().all(|c| c.holds(state, values))
    }
}

// ── Nodes ────────────────────────────────────────────────────────────

/// Rendering options of a field node
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldOptions {
    #[serde(default)]
    pub no_create: bool,
    #[serde(default)]
    pub no_open: bool,
}

/// A field placed in the layout
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldNode {
    pub field: FieldId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub widget: Option<String>,
    #[serde(default)]
    pub modifiers: Modifiers,
    /// Statically required, independent of modifiers
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub readonly: bool,
    #[serde(default)]
    pub default_focus: bool,
    /// Whether edits to this field trigger propagation
    #[serde(default)]
    pub triggers_onchange: bool,
    #[serde(default)]
    pub options: FieldOptions,
}

impl FieldNode {
    pub fn new(field: FieldId) -> Self {
        Self {
            field,
            widget: None,
            modifiers: Modifiers::default(),
            required: false,
            readonly: false,
            default_focus: false,
            triggers_onchange: false,
            options: FieldOptions::default(),
        }
    }
}

/// A node of the layout tree
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "node", rename_all = "snake_case")]
pub enum LayoutNode {
    Group {
        name: String,
        #[serde(default)]
        colspan: u8,
        #[serde(default)]
        children: Vec<LayoutNode>,
    },
    /// Horizontal container keeping a field and its companions together
    Row { children: Vec<LayoutNode> },
    Label {
        #[serde(rename = "for")]
        for_field: FieldId,
        #[serde(default)]
        string: String,
        #[serde(default)]
        modifiers: Modifiers,
    },
    Field(FieldNode),
    /// Static content owned by the host (buttons, headers, ...)
    Static { name: String },
}

impl LayoutNode {
    pub fn group(name: impl Into<String>, children: Vec<LayoutNode>) -> Self {
        LayoutNode::Group {
            name: name.into(),
            colspan: 0,
            children,
        }
    }

    pub fn children(&self) -> &[LayoutNode] {
        match self {
            LayoutNode::Group { children, .. } | LayoutNode::Row { children } => children,
            _ => &[],
        }
    }

    /// Depth-first search for a group by name
    pub fn find_group(&self, wanted: &str) -> Option<&LayoutNode> {
        if let LayoutNode::Group { name, .. } = self {
            if name == wanted {
                return Some(self);
            }
        }
        self.children().iter().find_map(|c| c.find_group(wanted))
    }

    /// Insert `node` right after the group named `anchor`.
    ///
    /// Returns `false` when no such group exists below this node.
    pub fn insert_after_group(&mut self, anchor: &str, node: LayoutNode) -> bool {
        let children = match self {
            LayoutNode::Group { children, .. } | LayoutNode::Row { children } => children,
            _ => return false,
        };
        let position = children
            .iter()
            .position(|c| matches!(c, LayoutNode::Group { name, .. } if name == anchor));
        if let Some(index) = position {
            children.insert(index + 1, node);
            return true;
        }
        for child in children.iter_mut() {
            if child.contains_group(anchor) {
                return child.insert_after_group(anchor, node);
            }
        }
        false
    }

    fn contains_group(&self, wanted: &str) -> bool {
        self.find_group(wanted).is_some()
    }

    /// Every field node in document order
    pub fn fields(&self) -> Vec<&FieldNode> {
        let mut out = Vec::new();
        self.collect_fields(&mut out);
        out
    }

    fn collect_fields<'a>(&'a self, out: &mut Vec<&'a FieldNode>) {
        match self {
            LayoutNode::Field(field) => out.push(field),
            other => {
                for child in other.children() {
                    child.collect_fields(out);
                }
            }
        }
    }
}
