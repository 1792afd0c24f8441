//! Domain resolver: which values an attribute line may take right now
//!
//! A line's domain starts as its allowed values. Each dependency rule
//! targeting the line then narrows it:
//!
//! - `Requires` keeps its target values only while the current selection
//!   intersects the rule's source values.
//! - `Excludes` removes its target values while the selection intersects
//!   the rule's source values.
//!
//! Rules whose source and target are the same line are ignored. Lines that
//! accept custom input always offer the custom option on top.

use crate::catalog::TemplateCatalog;
use configurator_types::{
    AttributeId, AttributeLine, DependencyRule, FieldId, ProductTemplate, RuleKind, ValueId,
};
use std::collections::{BTreeMap, BTreeSet};

// ── Constraint Set ───────────────────────────────────────────────────

/// Rules and defaults relevant to one template, fetched once per request
#[derive(Clone, Debug, Default)]
pub struct ConstraintSet {
    rules: BTreeMap<AttributeId, Vec<DependencyRule>>,
    defaults: BTreeMap<AttributeId, ValueId>,
}

impl ConstraintSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Gather the rules and defaults of every line of `template`
    pub fn load<C: TemplateCatalog + ?Sized>(catalog: &C, template: &ProductTemplate) -> Self {
        let mut set = Self::new();
        for line in &template.attribute_lines {
            let attribute_id = line.attribute_id();
            for rule in catalog.get_dependency_rules(attribute_id) {
                set = set.with_rule(rule);
            }
            if let Some(value) = catalog.get_default_value(attribute_id) {
                set = set.with_default(attribute_id, value);
            }
        }
        set
    }

    pub fn with_rule(mut self, rule: DependencyRule) -> Self {
        self.rules.entry(rule.target_attribute).or_default().push(rule);
        self
    }

    pub fn with_default(mut self, attribute_id: AttributeId, value: ValueId) -> Self {
        self.defaults.insert(attribute_id, value);
        self
    }

    /// Rules targeting an attribute
    pub fn rules_for(&self, attribute_id: AttributeId) -> &[DependencyRule] {
        self.rules
            .get(&attribute_id)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn default_for(&self, attribute_id: AttributeId) -> Option<ValueId> {
        self.defaults.get(&attribute_id).copied()
    }

    pub fn rule_count(&self) -> usize {
        self.rules.values().map(Vec::len).sum()
    }
}

// ── Resolution ───────────────────────────────────────────────────────

/// Listed values of `line` still compatible with `selected`.
///
/// Never contains the custom option.
pub fn restrict_line(
    line: &AttributeLine,
    selected: &BTreeSet<ValueId>,
    rules: &[DependencyRule],
) -> BTreeSet<ValueId> {
    let mut domain = line.value_set();
    for rule in rules {
        if rule.is_self_referential() || rule.target_attribute != line.attribute_id() {
            continue;
        }
        let triggered = rule.triggered_by(selected);
        let drop = match rule.kind {
            RuleKind::Requires => !triggered,
            RuleKind::Excludes => triggered,
        };
        if drop {
            domain.retain(|v| !rule.target_values.contains(v));
        }
    }
    domain
}

/// Computes available values per line for a given selection
#[derive(Clone, Copy, Debug)]
pub struct DomainResolver {
    custom_option_id: ValueId,
}

impl DomainResolver {
    pub fn new(custom_option_id: ValueId) -> Self {
        Self { custom_option_id }
    }

    pub fn custom_option_id(&self) -> ValueId {
        self.custom_option_id
    }

    /// Available values of one line, custom option included where allowed
    pub fn available_values(
        &self,
        line: &AttributeLine,
        selected: &BTreeSet<ValueId>,
        constraints: &ConstraintSet,
    ) -> BTreeSet<ValueId> {
        let mut domain = restrict_line(line, selected, constraints.rules_for(line.attribute_id()));
        if line.custom {
            domain.insert(self.custom_option_id);
        }
        domain
    }

    /// Available values of every line of the template, keyed by attribute
    pub fn domains(
        &self,
        template: &ProductTemplate,
        selected: &BTreeSet<ValueId>,
        constraints: &ConstraintSet,
    ) -> BTreeMap<AttributeId, BTreeSet<ValueId>> {
        template
            .attribute_lines
            .iter()
            .map(|line| {
                (
                    line.attribute_id(),
                    self.available_values(line, selected, constraints),
                )
            })
            .collect()
    }

    /// Same as [`DomainResolver::domains`], keyed by the attribute field
    pub fn field_domains(
        &self,
        template: &ProductTemplate,
        selected: &BTreeSet<ValueId>,
        constraints: &ConstraintSet,
    ) -> BTreeMap<FieldId, BTreeSet<ValueId>> {
        self.domains(template, selected, constraints)
            .into_iter()
            .map(|(attribute_id, domain)| (FieldId::attribute(attribute_id), domain))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use configurator_types::{Attribute, TemplateId};

    fn ids(values: &[u64]) -> BTreeSet<ValueId> {
        values.iter().map(|v| ValueId(*v)).collect()
    }

    fn template() -> ProductTemplate {
        ProductTemplate::new(TemplateId(1), "Car")
            .with_line(AttributeLine::new(
                Attribute::new(AttributeId(1), "Engine"),
                [ValueId(1), ValueId(2)],
            ))
            .with_line(
                AttributeLine::new(
                    Attribute::new(AttributeId(2), "Color"),
                    [ValueId(10), ValueId(11), ValueId(12)],
                )
                .custom(),
            )
    }

    #[test]
    fn test_no_rules_yields_all_values() {
        let tmpl = template();
        let resolver = DomainResolver::new(ValueId(0));
        let domains = resolver.domains(&tmpl, &BTreeSet::new(), &ConstraintSet::new());
        assert_eq!(domains[&AttributeId(1)], ids(&[1, 2]));
        assert_eq!(domains[&AttributeId(2)], ids(&[0, 10, 11, 12]));
    }

    #[test]
    fn test_requires_rule() {
        let tmpl = template();
        let constraints = ConstraintSet::new().with_rule(DependencyRule::requires(
            AttributeId(2),
            [ValueId(12)],
            AttributeId(1),
            [ValueId(2)],
        ));
        let resolver = DomainResolver::new(ValueId(0));

        let without = resolver.domains(&tmpl, &ids(&[1]), &constraints);
        assert_eq!(without[&AttributeId(2)], ids(&[0, 10, 11]));

        let with = resolver.domains(&tmpl, &ids(&[2]), &constraints);
        assert_eq!(with[&AttributeId(2)], ids(&[0, 10, 11, 12]));
    }

    #[test]
    fn test_excludes_rule() {
        let tmpl = template();
        let constraints = ConstraintSet::new().with_rule(DependencyRule::excludes(
            AttributeId(1),
            [ValueId(1)],
            AttributeId(2),
            [ValueId(10), ValueId(11)],
        ));
        let resolver = DomainResolver::new(ValueId(0));
        assert_eq!(
            resolver.domains(&tmpl, &ids(&[11]), &constraints)[&AttributeId(1)],
            ids(&[2])
        );
        assert_eq!(
            resolver.domains(&tmpl, &ids(&[12]), &constraints)[&AttributeId(1)],
            ids(&[1, 2])
        );
    }

    #[test]
    fn test_self_referential_rule_ignored() {
        let tmpl = template();
        let constraints = ConstraintSet::new().with_rule(DependencyRule::excludes(
            AttributeId(1),
            [ValueId(2)],
            AttributeId(1),
            [ValueId(1)],
        ));
        let domain = restrict_line(
            tmpl.line(AttributeId(1)).unwrap(),
            &ids(&[1]),
            constraints.rules_for(AttributeId(1)),
        );
        assert_eq!(domain, ids(&[1, 2]));
    }

    #[test]
    fn test_field_domains_keyed_by_attribute_field() {
        let tmpl = template();
        let domains = DomainResolver::new(ValueId(0)).field_domains(
            &tmpl,
            &BTreeSet::new(),
            &ConstraintSet::new(),
        );
        assert!(domains.contains_key(&FieldId::attribute(AttributeId(2))));
        assert_eq!(domains.len(), 2);
    }
}
