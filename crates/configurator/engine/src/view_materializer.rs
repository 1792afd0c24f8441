//! View materializer: hangs the dynamic form into the host layout
//!
//! The host supplies a base layout containing an anchor group (by default
//! `static_form`). The materializer turns the synthesized field
//! descriptors into one group holding a labelled row per attribute line,
//! and inserts it right after the anchor. Labels, widgets, row order and
//! step ownership come from the descriptors; whether a field is hidden,
//! read-only or required is expressed as conditions so the renderer can
//! re-evaluate them as the form changes.

use crate::domain_resolver::ConstraintSet;
use crate::synthesizer::inactive_states;
use configurator_types::{
    AttributeLine, Condition, ConfiguratorError, ConfiguratorResult, DependencyRule, FieldDescriptor,
    FieldId, FieldKind, FieldNode, FieldOptions, FieldValue, LayoutNode, Modifiers, ProductTemplate,
    RuleKind, ValueId, WizardConfig,
};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Clone, Debug)]
pub struct ViewMaterializer {
    config: WizardConfig,
}

impl ViewMaterializer {
    pub fn new(config: &WizardConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }

    /// Insert the dynamic form built from `fields` into `base`.
    ///
    /// Fails with [`ConfiguratorError::ViewRenderingError`] when the base
    /// layout has no anchor group, or when a descriptor names an attribute
    /// the template has no line for.
    pub fn materialize(
        &self,
        base: &LayoutNode,
        template: &ProductTemplate,
        fields: &BTreeMap<FieldId, FieldDescriptor>,
        constraints: &ConstraintSet,
    ) -> ConfiguratorResult<LayoutNode> {
        let mut selectors: Vec<&FieldDescriptor> = fields
            .values()
            .filter(|f| f.id.kind == FieldKind::Attribute)
            .collect();
        selectors.sort_by_key(|f| (f.sequence, f.id));

        let mut children = Vec::with_capacity(selectors.len());
        for (index, selector) in selectors.into_iter().enumerate() {
            let line = template.line(selector.id.attribute_id).ok_or_else(|| {
                ConfiguratorError::ViewRenderingError(format!(
                    "{} has no attribute line on template {}",
                    selector.id, template.id
                ))
            })?;
            children.push(self.line_row(template, line, selector, fields, constraints, index == 0));
        }

        let group = LayoutNode::Group {
            name: self.config.dynamic_form_name.clone(),
            colspan: self.config.dynamic_form_colspan,
            children,
        };

        let mut layout = base.clone();
        if !layout.insert_after_group(&self.config.static_form_anchor, group) {
            return Err(ConfiguratorError::ViewRenderingError(format!(
                "{} not found",
                self.config.static_form_anchor
            )));
        }
        Ok(layout)
    }

    fn line_row(
        &self,
        template: &ProductTemplate,
        line: &AttributeLine,
        descriptor: &FieldDescriptor,
        fields: &BTreeMap<FieldId, FieldDescriptor>,
        constraints: &ConstraintSet,
        first: bool,
    ) -> LayoutNode {
        let attribute_id = line.attribute_id();
        let inactive = inactive_states(template, &descriptor.step_ids);
        let off_step = (!inactive.is_empty()).then(|| Condition::StateIn {
            states: inactive.clone(),
        });
        let on_step = (!inactive.is_empty()).then(|| Condition::StateNotIn { states: inactive });

        // Selector field
        let mut selector = FieldNode::new(descriptor.id);
        selector.default_focus = first;
        selector.triggers_onchange = true;
        selector.widget = descriptor.widget.clone();
        selector.options = FieldOptions {
            no_create: !line.attribute.create_on_the_fly,
            no_open: true,
        };
        selector.modifiers.invisible.extend(off_step.clone());
        selector.modifiers.readonly.extend(off_step.clone());

        let mut required_when: Vec<Condition> = on_step.iter().cloned().collect();
        for rule in constraints.rules_for(attribute_id) {
            if !governs_whole_line(rule, line) {
                continue;
            }
            let (locked, unlocked) = rule_conditions(rule);
            selector.modifiers.readonly.push(locked);
            required_when.push(unlocked);
        }
        if line.required {
            if required_when.is_empty() {
                selector.required = true;
            } else {
                selector.modifiers.required = required_when;
            }
        }

        let label = LayoutNode::Label {
            for_field: descriptor.id,
            string: descriptor.label.clone(),
            modifiers: Modifiers {
                invisible: selector.modifiers.invisible.clone(),
                ..Modifiers::default()
            },
        };

        let mut row = vec![label, LayoutNode::Field(selector)];

        // Companion custom field
        if let Some(custom_descriptor) = fields.get(&FieldId::custom(attribute_id)) {
            let (not_custom, is_custom) = custom_conditions(
                descriptor.id,
                descriptor.is_multi(),
                self.config.custom_option_id,
            );
            let mut custom = FieldNode::new(custom_descriptor.id);
            custom.widget = custom_descriptor.widget.clone();
            custom.triggers_onchange = true;
            custom.modifiers.invisible.extend(off_step.clone());
            custom.modifiers.readonly.extend(off_step.clone());
            custom.modifiers.required.extend(on_step);
            custom.modifiers.invisible.push(not_custom.clone());
            custom.modifiers.readonly.push(not_custom);
            custom.modifiers.required.push(is_custom);
            row.push(LayoutNode::Field(custom));
        }

        // Display mode, shown read-only next to the selector
        if let Some(mode_descriptor) = fields.get(&FieldId::mode(attribute_id)) {
            let mut mode = FieldNode::new(mode_descriptor.id);
            mode.readonly = mode_descriptor.readonly;
            mode.widget = mode_descriptor.widget.clone();
            mode.modifiers.invisible.extend(off_step);
            row.push(LayoutNode::Field(mode));
        }

        LayoutNode::Row { children: row }
    }
}

/// A rule drives the line's modifiers only when it covers all its values
fn governs_whole_line(rule: &DependencyRule, line: &AttributeLine) -> bool {
    !rule.is_self_referential() && line.value_set().is_subset(&rule.target_values)
}

/// `(readonly condition, required condition)` for a whole-line rule
fn rule_conditions(rule: &DependencyRule) -> (Condition, Condition) {
    let field = FieldId::attribute(rule.source_attribute);
    let values = rule.when_source_in.clone();
    let source_in = Condition::FieldIn {
        field,
        values: values.clone(),
    };
    let source_not_in = Condition::FieldNotIn { field, values };
    match rule.kind {
        RuleKind::Requires => (source_not_in, source_in),
        RuleKind::Excludes => (source_in, source_not_in),
    }
}

/// `(custom not chosen, custom chosen)` conditions on a selector
fn custom_conditions(selector: FieldId, multi: bool, custom_id: ValueId) -> (Condition, Condition) {
    if multi {
        let values: BTreeSet<ValueId> = [custom_id].into_iter().collect();
        (
            Condition::FieldNotIn {
                field: selector,
                values: values.clone(),
            },
            Condition::FieldIn {
                field: selector,
                values,
            },
        )
    } else {
        let value = FieldValue::Single(custom_id);
        (
            Condition::FieldNotEquals {
                field: selector,
                value: value.clone(),
            },
            Condition::FieldEquals {
                field: selector,
                value,
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain_resolver::DomainResolver;
    use crate::synthesizer::FieldSynthesizer;
    use configurator_types::{
        Attribute, AttributeId, ConfigStepLine, ConfigurationSession, CustomType, StepLineId,
        TemplateId, WizardState,
    };

    fn base() -> LayoutNode {
        LayoutNode::group(
            "form",
            vec![
                LayoutNode::group("static_form", vec![]),
                LayoutNode::Static {
                    name: "buttons".into(),
                },
            ],
        )
    }

    fn template() -> ProductTemplate {
        ProductTemplate::new(TemplateId(1), "Bike")
            .with_line(
                AttributeLine::new(Attribute::new(AttributeId(1), "Frame"), [ValueId(1), ValueId(2)])
                    .required(),
            )
            .with_line(
                AttributeLine::new(
                    Attribute::new(AttributeId(2), "Paint").with_custom_type(CustomType::Color),
                    [ValueId(10), ValueId(11)],
                )
                .custom()
                .required(),
            )
            .with_step(ConfigStepLine::new(StepLineId(1), "Frame").with_attribute(AttributeId(1)))
            .with_step(
                ConfigStepLine::new(StepLineId(2), "Paint")
                    .with_sequence(20)
                    .with_attribute(AttributeId(2)),
            )
    }

    fn descriptors(
        tmpl: &ProductTemplate,
        state: WizardState,
        constraints: &ConstraintSet,
    ) -> BTreeMap<FieldId, FieldDescriptor> {
        let mut session = ConfigurationSession::new();
        session.product_tmpl_id = Some(tmpl.id);
        session.state = state;
        FieldSynthesizer::new(DomainResolver::new(ValueId(0))).synthesize(tmpl, &session, constraints)
    }

    fn materialize(tmpl: &ProductTemplate, constraints: &ConstraintSet) -> LayoutNode {
        let fields = descriptors(tmpl, WizardState::Step(StepLineId(1)), constraints);
        ViewMaterializer::new(&WizardConfig::default())
            .materialize(&base(), tmpl, &fields, constraints)
            .unwrap()
    }

    fn field(layout: &LayoutNode, id: FieldId) -> FieldNode {
        layout
            .fields()
            .into_iter()
            .find(|f| f.field == id)
            .cloned()
            .unwrap()
    }

    #[test]
    fn test_group_inserted_after_anchor() {
        let layout = materialize(&template(), &ConstraintSet::new());
        let names: Vec<String> = layout
            .children()
            .iter()
            .map(|c| match c {
                LayoutNode::Group { name, .. } => name.clone(),
                LayoutNode::Static { name } => name.clone(),
                _ => String::new(),
            })
            .collect();
        assert_eq!(names, vec!["static_form", "dynamic_form", "buttons"]);
        assert!(matches!(
            layout.find_group("dynamic_form").unwrap(),
            LayoutNode::Group { colspan: 3, .. }
        ));
    }

    #[test]
    fn test_missing_anchor_is_an_error() {
        let tmpl = template();
        let fields = descriptors(&tmpl, WizardState::Configure, &ConstraintSet::new());
        let err = ViewMaterializer::new(&WizardConfig::default())
            .materialize(&LayoutNode::group("form", vec![]), &tmpl, &fields, &ConstraintSet::new())
            .unwrap_err();
        assert!(matches!(err, ConfiguratorError::ViewRenderingError(_)));
        assert_eq!(err.to_string(), "There was a problem rendering the view: static_form not found");
    }

    #[test]
    fn test_descriptor_without_line_is_an_error() {
        let tmpl = template();
        let mut fields = descriptors(&tmpl, WizardState::Configure, &ConstraintSet::new());
        let stray = FieldDescriptor::new(
            FieldId::attribute(AttributeId(9)),
            "Stray",
            configurator_types::FieldType::SingleSelect,
        );
        fields.insert(stray.id, stray);
        let err = ViewMaterializer::new(&WizardConfig::default())
            .materialize(&base(), &tmpl, &fields, &ConstraintSet::new())
            .unwrap_err();
        assert!(matches!(err, ConfiguratorError::ViewRenderingError(_)));
    }

    #[test]
    fn test_rows_follow_descriptors() {
        let tmpl = template();
        let mut fields = descriptors(&tmpl, WizardState::Configure, &ConstraintSet::new());
        // Paint first, under its own label
        fields
            .get_mut(&FieldId::attribute(AttributeId(2)))
            .unwrap()
            .sequence = -1;
        fields.get_mut(&FieldId::attribute(AttributeId(2))).unwrap().label = "Finish".into();
        let layout = ViewMaterializer::new(&WizardConfig::default())
            .materialize(&base(), &tmpl, &fields, &ConstraintSet::new())
            .unwrap();

        let rows = layout.find_group("dynamic_form").unwrap().children();
        let LayoutNode::Label { for_field, string, .. } = &rows[0].children()[0] else {
            panic!("row must open with a label");
        };
        assert_eq!(*for_field, FieldId::attribute(AttributeId(2)));
        assert_eq!(string, "Finish");
        assert_eq!(rows[0].children().len(), 4);
        assert_eq!(rows[1].children().len(), 3);
        assert!(field(&layout, FieldId::attribute(AttributeId(2))).default_focus);
        assert_eq!(
            field(&layout, FieldId::custom(AttributeId(2))).widget.as_deref(),
            Some("color")
        );
    }

    #[test]
    fn test_fields_gated_by_step() {
        let layout = materialize(&template(), &ConstraintSet::new());
        let frame = field(&layout, FieldId::attribute(AttributeId(1)));
        assert!(frame.default_focus);
        assert!(frame.options.no_create);

        let values = BTreeMap::new();
        let on_step = WizardState::Step(StepLineId(1));
        let off_step = WizardState::Step(StepLineId(2));
        assert!(!frame.modifiers.is_invisible(&on_step, &values));
        assert!(frame.modifiers.is_required(&on_step, &values));
        assert!(frame.modifiers.is_invisible(&off_step, &values));
        assert!(!frame.modifiers.is_required(&off_step, &values));
        assert!(!frame.modifiers.is_invisible(&WizardState::Configure, &values));
        assert!(frame.modifiers.is_required(&WizardState::Configure, &values));
    }

    #[test]
    fn test_state_conditions_agree_with_descriptors() {
        let tmpl = template();
        let layout = materialize(&tmpl, &ConstraintSet::new());
        let values = BTreeMap::new();
        let states = [
            WizardState::Select,
            WizardState::Configure,
            WizardState::Step(StepLineId(1)),
            WizardState::Step(StepLineId(2)),
        ];
        for state in states {
            for descriptor in descriptors(&tmpl, state, &ConstraintSet::new()).values() {
                if descriptor.id.kind == FieldKind::Custom {
                    continue;
                }
                let node = field(&layout, descriptor.id);
                assert_eq!(
                    node.modifiers.is_invisible(&state, &values),
                    !descriptor.visible,
                    "{} in {}",
                    descriptor.id,
                    state
                );
            }
        }
    }

    #[test]
    fn test_custom_field_tracks_custom_option() {
        let layout = materialize(&template(), &ConstraintSet::new());
        let custom = field(&layout, FieldId::custom(AttributeId(2)));
        assert_eq!(custom.widget.as_deref(), Some("color"));

        let state = WizardState::Step(StepLineId(2));
        let mut values = BTreeMap::new();
        values.insert(FieldId::attribute(AttributeId(2)), FieldValue::Single(ValueId(10)));
        assert!(custom.modifiers.is_invisible(&state, &values));
        assert!(!custom.modifiers.is_required(&state, &values));

        values.insert(FieldId::attribute(AttributeId(2)), FieldValue::Single(ValueId(0)));
        assert!(!custom.modifiers.is_invisible(&state, &values));
        assert!(custom.modifiers.is_required(&state, &values));
    }

    #[test]
    fn test_whole_line_rule_drives_readonly() {
        let constraints = ConstraintSet::new().with_rule(DependencyRule::requires(
            AttributeId(2),
            [ValueId(10), ValueId(11)],
            AttributeId(1),
            [ValueId(2)],
        ));
        let layout = materialize(&template(), &constraints);
        let paint = field(&layout, FieldId::attribute(AttributeId(2)));

        let state = WizardState::Step(StepLineId(2));
        let mut values = BTreeMap::new();
        values.insert(FieldId::attribute(AttributeId(1)), FieldValue::Single(ValueId(1)));
        assert!(paint.modifiers.is_readonly(&state, &values));
        assert!(!paint.modifiers.is_required(&state, &values));

        values.insert(FieldId::attribute(AttributeId(1)), FieldValue::Single(ValueId(2)));
        assert!(!paint.modifiers.is_readonly(&state, &values));
        assert!(paint.modifiers.is_required(&state, &values));
    }

    #[test]
    fn test_unstepped_required_line_is_statically_required() {
        let tmpl = ProductTemplate::new(TemplateId(2), "Mug").with_line(
            AttributeLine::new(Attribute::new(AttributeId(1), "Size"), [ValueId(1)]).required(),
        );
        let fields = descriptors(&tmpl, WizardState::Configure, &ConstraintSet::new());
        let layout = ViewMaterializer::new(&WizardConfig::default())
            .materialize(&base(), &tmpl, &fields, &ConstraintSet::new())
            .unwrap();
        let fields = layout.fields();
        assert!(fields[0].required);
        assert!(fields[0].modifiers.invisible.is_empty());
    }
}
