//! Constraint propagation: reacts to a single field edit
//!
//! An edit can invalidate values held by other fields. Propagation walks
//! every attribute line in template order, drops values that fell out of
//! their domain, and falls back to a default where one exists on the
//! active step. Changes feed back into the working selection, so the walk
//! repeats until a pass changes nothing.
//!
//! Each field is adjusted during at most one pass. With `N` lines that
//! bounds the walk to `N` passes; the configured pass limit is a second,
//! explicit bound.

use crate::default_picker::DefaultPicker;
use crate::domain_resolver::{ConstraintSet, DomainResolver};
use crate::field_adapter::FieldAdapter;
use crate::state_machine::active_step;
use crate::synthesizer::line_is_active;
use configurator_types::{
    AttributeId, AttributeLine, ConfigurationSession, ConfiguratorError, ConfiguratorResult,
    FieldId, FieldKind, FieldValue, ProductTemplate, ValueId, WizardConfig,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Result of propagating one edit
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PropagationOutcome {
    /// Fields whose value changed as a consequence of the edit
    pub updated_values: BTreeMap<FieldId, FieldValue>,
    /// Available values of every selector field after propagation
    pub domains: BTreeMap<FieldId, BTreeSet<ValueId>>,
    /// Passes run before reaching a fixed point
    pub passes: usize,
}

impl PropagationOutcome {
    pub fn is_quiet(&self) -> bool {
        self.updated_values.is_empty()
    }
}

/// Runs propagation for a template
#[derive(Clone, Debug)]
pub struct Propagator {
    resolver: DomainResolver,
    picker: DefaultPicker,
    adapter: FieldAdapter,
    config: WizardConfig,
}

impl Propagator {
    pub fn new(config: &WizardConfig) -> Self {
        Self {
            resolver: DomainResolver::new(config.custom_option_id),
            picker: DefaultPicker::new(config.custom_option_id),
            adapter: FieldAdapter::new(config.custom_option_id),
            config: config.clone(),
        }
    }

    /// Propagate the edit of `edited_field` to `edited_value`.
    ///
    /// `view_values` holds what the view currently shows; for lines that are
    /// editable in the session's state it takes precedence over the stored
    /// session. The session
    /// itself is not modified.
    pub fn propagate(
        &self,
        template: &ProductTemplate,
        session: &ConfigurationSession,
        constraints: &ConstraintSet,
        view_values: &BTreeMap<FieldId, FieldValue>,
        edited_field: FieldId,
        edited_value: FieldValue,
    ) -> ConfiguratorResult<PropagationOutcome> {
        let edited_line =
            template
                .line(edited_field.attribute_id)
                .ok_or(ConfiguratorError::UnknownAttribute {
                    template: template.id,
                    attribute: edited_field.attribute_id,
                })?;

        let mut working = self.working_values(template, session, view_values)?;
        if edited_field.kind == FieldKind::Attribute {
            check_shape(edited_line, &edited_value)?;
            working.insert(edited_field.attribute_id, edited_value);
        }

        let outcome = self.settle(template, session, constraints, working);
        tracing::debug!(
            session_id = %session.id,
            field = %edited_field,
            updated = outcome.updated_values.len(),
            passes = outcome.passes,
            "Edit propagated"
        );
        Ok(outcome)
    }

    /// Bring the stored selection back in line with the current rules.
    ///
    /// Used when a session is rendered: values that are no longer
    /// available are dropped or defaulted just as if they had been edited.
    pub fn normalize(
        &self,
        template: &ProductTemplate,
        session: &ConfigurationSession,
        constraints: &ConstraintSet,
    ) -> PropagationOutcome {
        let working = self.stored_values(template, session);
        self.settle(template, session, constraints, working)
    }

    /// Selector values per line: stored values overlaid with the view
    fn working_values(
        &self,
        template: &ProductTemplate,
        session: &ConfigurationSession,
        view_values: &BTreeMap<FieldId, FieldValue>,
    ) -> ConfiguratorResult<BTreeMap<AttributeId, FieldValue>> {
        let mut working = self.stored_values(template, session);

        for (field, value) in view_values {
            if field.kind != FieldKind::Attribute {
                continue;
            }
            let Some(line) = template.line(field.attribute_id) else {
                continue;
            };
            if !line_is_active(template, &session.state, line) {
                continue;
            }
            check_shape(line, value)?;
            working.insert(field.attribute_id, value.clone());
        }
        Ok(working)
    }

    fn stored_values(
        &self,
        template: &ProductTemplate,
        session: &ConfigurationSession,
    ) -> BTreeMap<AttributeId, FieldValue> {
        let loaded = self.adapter.load(template, session);
        template
            .attribute_lines
            .iter()
            .map(|line| {
                let value = loaded
                    .get(&FieldId::attribute(line.attribute_id()))
                    .cloned()
                    .unwrap_or_else(|| empty_for(line));
                (line.attribute_id(), value)
            })
            .collect()
    }

    /// Repeat adjustment passes until nothing changes
    fn settle(
        &self,
        template: &ProductTemplate,
        session: &ConfigurationSession,
        constraints: &ConstraintSet,
        mut working: BTreeMap<AttributeId, FieldValue>,
    ) -> PropagationOutcome {
        let lines = template.sorted_lines();
        let limit = self.config.pass_limit(lines.len());
        let step_values = match active_step(template, &session.state) {
            Some(step) => template.step_value_ids(step),
            None => template.all_value_ids(),
        };

        let mut adjusted: BTreeSet<AttributeId> = BTreeSet::new();
        let mut updated_values = BTreeMap::new();
        let mut passes = 0;

        while adjusted.len() < lines.len() || passes == 0 {
            if passes >= limit {
                tracing::warn!(
                    session_id = %session.id,
                    limit,
                    "Propagation pass limit reached"
                );
                break;
            }
            passes += 1;

            let mut changed = Vec::new();
            for line in &lines {
                let attribute_id = line.attribute_id();
                if adjusted.contains(&attribute_id) {
                    continue;
                }
                let selection = selection_of(&working);
                let domain = self.resolver.available_values(line, &selection, constraints);
                let current = working
                    .get(&attribute_id)
                    .cloned()
                    .unwrap_or_else(|| empty_for(line));

                if let Some(next) = self.adjust(line, &current, &domain, &step_values, constraints) {
                    if next != current {
                        updated_values.insert(FieldId::attribute(attribute_id), next.clone());
                        working.insert(attribute_id, next);
                        changed.push(attribute_id);
                    }
                }
            }

            if changed.is_empty() {
                break;
            }
            adjusted.extend(changed);
        }

        let selection = selection_of(&working);
        PropagationOutcome {
            updated_values,
            domains: self.resolver.field_domains(template, &selection, constraints),
            passes,
        }
    }

    /// New value for a field, or `None` to keep it
    fn adjust(
        &self,
        line: &AttributeLine,
        current: &FieldValue,
        domain: &BTreeSet<ValueId>,
        step_values: &BTreeSet<ValueId>,
        constraints: &ConstraintSet,
    ) -> Option<FieldValue> {
        let on_step = !domain.is_disjoint(step_values);
        let default = || {
            if on_step {
                self.picker
                    .pick_default(domain, constraints.default_for(line.attribute_id()))
            } else {
                None
            }
        };

        match current {
            FieldValue::Multi(ids) if ids.is_empty() => {
                if self.config.fill_empty_defaults {
                    default().map(|v| FieldValue::Multi([v].into_iter().collect()))
                } else {
                    None
                }
            }
            FieldValue::Multi(ids) => {
                let kept: BTreeSet<ValueId> = ids.intersection(domain).copied().collect();
                (kept.len() != ids.len()).then_some(FieldValue::Multi(kept))
            }
            FieldValue::Single(id) if domain.contains(id) => None,
            FieldValue::Single(_) => {
                Some(default().map(FieldValue::Single).unwrap_or(FieldValue::Empty))
            }
            FieldValue::Empty if self.config.fill_empty_defaults => {
                let value = default()?;
                Some(if line.multi {
                    FieldValue::Multi([value].into_iter().collect())
                } else {
                    FieldValue::Single(value)
                })
            }
            _ => None,
        }
    }
}

/// Union of the selector values held by the working fields
fn selection_of(working: &BTreeMap<AttributeId, FieldValue>) -> BTreeSet<ValueId> {
    working.values().flat_map(FieldValue::value_ids).collect()
}

fn empty_for(line: &AttributeLine) -> FieldValue {
    if line.multi {
        FieldValue::Multi(BTreeSet::new())
    } else {
        FieldValue::Empty
    }
}

fn check_shape(line: &AttributeLine, value: &FieldValue) -> ConfiguratorResult<()> {
    let ok = match value {
        FieldValue::Empty => true,
        FieldValue::Single(_) => !line.multi,
        FieldValue::Multi(_) => line.multi,
        FieldValue::Text(_) | FieldValue::Attachments(_) => false,
    };
    if ok {
        Ok(())
    } else {
        Err(ConfiguratorError::malformed(
            FieldId::attribute(line.attribute_id()),
            format!(
                "{} line cannot hold a {}",
                if line.multi { "multi-valued" } else { "single-valued" },
                value.shape()
            ),
        ))
    }
}
