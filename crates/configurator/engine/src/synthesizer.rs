//! Field synthesizer: derives the dynamic form fields of a session
//!
//! Every attribute line yields a selector field, a companion custom field
//! when the line accepts custom input, and a read-only display mode field.
//! Fields of lines outside the active step are still emitted so the view
//! can hold their values, but they come out hidden and read-only.
//!
//! Field identity is typed ([`FieldId`]); no string prefixes are parsed.

use crate::domain_resolver::{ConstraintSet, DomainResolver};
use crate::state_machine::active_step;
use configurator_types::{
    AttributeLine, ConfigurationSession, FieldDescriptor, FieldId, FieldType, ProductTemplate,
    StepLineId, WizardState,
};
use std::collections::BTreeMap;

/// Whether a line is editable in `state`.
///
/// Templates without steps show every line. On stepped templates a step
/// state shows the lines that step governs, `select` shows none, and any
/// state naming no step of the template (`configure` once every step is
/// closed) shows every line.
pub(crate) fn line_is_active(
    template: &ProductTemplate,
    state: &WizardState,
    line: &AttributeLine,
) -> bool {
    if !template.has_steps() {
        return true;
    }
    match active_step(template, state).and_then(|step| template.step(step)) {
        Some(step) => step.governs(line.attribute_id()),
        None => !state.is_select(),
    }
}

/// States in which a line owned by `step_ids` is not editable.
///
/// Empty for templates without steps. Agrees with [`line_is_active`] for
/// every state.
pub(crate) fn inactive_states(template: &ProductTemplate, step_ids: &[StepLineId]) -> Vec<WizardState> {
    if !template.has_steps() {
        return Vec::new();
    }
    std::iter::once(WizardState::Select)
        .chain(
            template
                .sorted_steps()
                .into_iter()
                .filter(|step| !step_ids.contains(&step.id))
                .map(|step| WizardState::Step(step.id)),
        )
        .collect()
}

/// Builds field descriptors from a template and a session
#[derive(Clone, Copy, Debug)]
pub struct FieldSynthesizer {
    resolver: DomainResolver,
}

impl FieldSynthesizer {
    pub fn new(resolver: DomainResolver) -> Self {
        Self { resolver }
    }

    /// Descriptors for every dynamic field, keyed by field id.
    ///
    /// Pure: the same template and session always produce the same map.
    pub fn synthesize(
        &self,
        template: &ProductTemplate,
        session: &ConfigurationSession,
        constraints: &ConstraintSet,
    ) -> BTreeMap<FieldId, FieldDescriptor> {
        let mut fields = BTreeMap::new();

        for line in template.sorted_lines() {
            let attribute_id = line.attribute_id();
            let editable = line_is_active(template, &session.state, line);
            let step_ids = template.steps_for(attribute_id);

            let field_type = if line.multi {
                FieldType::MultiSelect
            } else {
                FieldType::SingleSelect
            };
            let mut selector = FieldDescriptor::new(
                FieldId::attribute(attribute_id),
                &line.attribute.name,
                field_type,
            );
            selector.candidate_values =
                self.resolver
                    .available_values(line, &session.value_ids, constraints);
            selector.visible = editable;
            selector.readonly = !editable;
            selector.required = line.required && editable;
            selector.sequence = line.sequence;
            selector.step_ids = step_ids.clone();
            selector.widget = line.multi.then(|| "many2many_tags".to_string());
            fields.insert(selector.id, selector);

            if line.custom {
                let chosen = session.custom_value(attribute_id).is_some();
                let shown = editable && chosen;
                let mut custom = FieldDescriptor::new(
                    FieldId::custom(attribute_id),
                    format!("{} (custom)", line.attribute.name),
                    FieldType::Custom(line.attribute.custom_type),
                );
                custom.visible = shown;
                custom.readonly = !shown;
                custom.required = shown;
                custom.sequence = line.sequence;
                custom.step_ids = step_ids.clone();
                custom.widget = line.attribute.custom_type.widget().map(str::to_string);
                fields.insert(custom.id, custom);
            }

            let mut mode = FieldDescriptor::new(
                FieldId::mode(attribute_id),
                format!("{} display", line.attribute.name),
                FieldType::Mode,
            );
            mode.visible = editable;
            mode.readonly = true;
            mode.sequence = line.sequence;
            mode.step_ids = step_ids;
            fields.insert(mode.id, mode);
        }

        fields
    }
}
