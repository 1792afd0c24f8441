//! Dependency rules: declarative compatibility constraints between lines
//!
//! A rule makes some values of a target attribute conditional on what is
//! selected for a source attribute:
//!
//! - `Requires`: the target values stay available only while the selected
//!   source values intersect `when_source_in`.
//! - `Excludes`: the target values are removed while the selected source
//!   values intersect `when_source_in`.

use crate::{AttributeId, ValueId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Kind of a dependency rule
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleKind {
    Requires,
    Excludes,
}

/// A compatibility rule between two attribute lines
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyRule {
    pub kind: RuleKind,
    /// Attribute whose values are restricted
    pub target_attribute: AttributeId,
    /// Values of the target attribute the rule applies to
    pub target_values: BTreeSet<ValueId>,
    /// Attribute whose selection triggers the rule
    pub source_attribute: AttributeId,
    /// Source values that satisfy (`Requires`) or trigger (`Excludes`) the rule
    pub when_source_in: BTreeSet<ValueId>,
}

impl DependencyRule {
    /// `target_values` require one of `source_values` to be selected
    pub fn requires(
        target_attribute: AttributeId,
        target_values: impl IntoIterator<Item = ValueId>,
        source_attribute: AttributeId,
        source_values: impl IntoIterator<Item = ValueId>,
    ) -> Self {
        Self {
            kind: RuleKind::Requires,
            target_attribute,
            target_values: target_values.into_iter().collect(),
            source_attribute,
            when_source_in: source_values.into_iter().collect(),
        }
    }

    /// `target_values` are excluded while one of `source_values` is selected
    pub fn excludes(
        target_attribute: AttributeId,
        target_values: impl IntoIterator<Item = ValueId>,
        source_attribute: AttributeId,
        source_values: impl IntoIterator<Item = ValueId>,
    ) -> Self {
        Self {
            kind: RuleKind::Excludes,
            target_attribute,
            target_values: target_values.into_iter().collect(),
            source_attribute,
            when_source_in: source_values.into_iter().collect(),
        }
    }

    /// Whether the current selection intersects the trigger set
    pub fn triggered_by(&self, selected: &BTreeSet<ValueId>) -> bool {
        !self.when_source_in.is_disjoint(selected)
    }

    /// A rule pointing a line at itself carries no information
    pub fn is_self_referential(&self) -> bool {
        self.target_attribute == self.source_attribute
    }
}
