//! Template catalog: read-only access to configurable product metadata
//!
//! The engine never owns template data. It asks a [`TemplateCatalog`] for
//! templates, attribute values, dependency rules and default values, and
//! treats everything it gets back as immutable.

use crate::domain_resolver::{restrict_line, ConstraintSet};
use configurator_types::{
    AttributeId, AttributeLine, AttributeValue, ConfigStepLine, ConfiguratorError,
    ConfiguratorResult, DependencyRule, ProductTemplate, TemplateId, ValueId,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

// ── Catalog Trait ────────────────────────────────────────────────────

/// Source of template metadata for the wizard.
pub trait TemplateCatalog: Send + Sync {
    /// Fetch a template with its attribute and step lines.
    fn get_template(&self, id: TemplateId) -> ConfiguratorResult<ProductTemplate>;

    /// Attribute lines of a template in `(sequence, attribute id)` order.
    fn get_attribute_lines(&self, id: TemplateId) -> ConfiguratorResult<Vec<AttributeLine>> {
        let template = self.get_template(id)?;
        Ok(template.sorted_lines().into_iter().cloned().collect())
    }

    /// Step lines of a template in `(sequence, id)` order.
    fn get_step_lines(&self, id: TemplateId) -> ConfiguratorResult<Vec<ConfigStepLine>> {
        let template = self.get_template(id)?;
        Ok(template.sorted_steps().into_iter().cloned().collect())
    }

    /// Steps that still have something to configure given the selection.
    fn get_open_steps(
        &self,
        id: TemplateId,
        value_ids: &BTreeSet<ValueId>,
    ) -> ConfiguratorResult<Vec<ConfigStepLine>>;

    /// Rules restricting the values of an attribute.
    fn get_dependency_rules(&self, attribute_id: AttributeId) -> Vec<DependencyRule>;

    /// Designated default value of an attribute, if any.
    fn get_default_value(&self, attribute_id: AttributeId) -> Option<ValueId>;

    /// Look up a single attribute value.
    fn get_value(&self, value_id: ValueId) -> Option<AttributeValue>;

    /// Display name of a value, used when naming variants.
    fn value_name(&self, value_id: ValueId) -> Option<String> {
        self.get_value(value_id).map(|v| v.name)
    }
}

// ── Catalog Data ─────────────────────────────────────────────────────

/// Designated default for one attribute
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefaultValue {
    pub attribute_id: AttributeId,
    pub value_id: ValueId,
}

/// Serializable contents of an in-memory catalog
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CatalogData {
    #[serde(default)]
    pub templates: Vec<ProductTemplate>,
    #[serde(default)]
    pub values: Vec<AttributeValue>,
    #[serde(default)]
    pub rules: Vec<DependencyRule>,
    #[serde(default)]
    pub defaults: Vec<DefaultValue>,
}

// ── In-Memory Catalog ────────────────────────────────────────────────

/// Catalog backed by in-process maps.
///
/// Templates are validated when registered; values, rules and defaults
/// are taken as given.
#[derive(Clone, Debug, Default)]
pub struct InMemoryCatalog {
    templates: HashMap<TemplateId, ProductTemplate>,
    values: HashMap<ValueId, AttributeValue>,
    /// Rules indexed by target attribute
    rules: HashMap<AttributeId, Vec<DependencyRule>>,
    defaults: HashMap<AttributeId, ValueId>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a catalog from its serialized data
    pub fn from_data(data: CatalogData) -> ConfiguratorResult<Self> {
        let mut catalog = Self::new();
        for value in data.values {
            catalog.register_value(value);
        }
        for template in data.templates {
            catalog.register_template(template)?;
        }
        for rule in data.rules {
            catalog.register_rule(rule);
        }
        for default in data.defaults {
            catalog.set_default(default.attribute_id, default.value_id);
        }
        Ok(catalog)
    }

    /// Parse a catalog from JSON
    pub fn from_json(json: &str) -> ConfiguratorResult<Self> {
        let data: CatalogData = serde_json::from_str(json)
            .map_err(|e| ConfiguratorError::Config(format!("invalid catalog: {}", e)))?;
        Self::from_data(data)
    }

    /// Register a template after validating its structure
    pub fn register_template(&mut self, template: ProductTemplate) -> ConfiguratorResult<TemplateId> {
        template.validate()?;
        let id = template.id;
        tracing::info!(
            template_id = %id,
            lines = template.attribute_lines.len(),
            steps = template.step_lines.len(),
            "Product template registered"
        );
        self.templates.insert(id, template);
        Ok(id)
    }

    pub fn register_value(&mut self, value: AttributeValue) {
        self.values.insert(value.id, value);
    }

    pub fn register_rule(&mut self, rule: DependencyRule) {
        self.rules.entry(rule.target_attribute).or_default().push(rule);
    }

    pub fn set_default(&mut self, attribute_id: AttributeId, value_id: ValueId) {
        self.defaults.insert(attribute_id, value_id);
    }

    pub fn with_template(mut self, template: ProductTemplate) -> ConfiguratorResult<Self> {
        self.register_template(template)?;
        Ok(self)
    }

    pub fn with_value(mut self, value: AttributeValue) -> Self {
        self.register_value(value);
        self
    }

    pub fn with_rule(mut self, rule: DependencyRule) -> Self {
        self.register_rule(rule);
        self
    }

    pub fn with_default(mut self, attribute_id: AttributeId, value_id: ValueId) -> Self {
        self.set_default(attribute_id, value_id);
        self
    }

    pub fn template_count(&self) -> usize {
        self.templates.len()
    }
}

impl TemplateCatalog for InMemoryCatalog {
    fn get_template(&self, id: TemplateId) -> ConfiguratorResult<ProductTemplate> {
        self.templates
            .get(&id)
            .cloned()
            .ok_or(ConfiguratorError::TemplateNotFound(id))
    }

    /// A step is open while at least one of its lines can still take a
    /// listed value. Custom lines always count as open.
    fn get_open_steps(
        &self,
        id: TemplateId,
        value_ids: &BTreeSet<ValueId>,
    ) -> ConfiguratorResult<Vec<ConfigStepLine>> {
        let template = self.get_template(id)?;
        let constraints = ConstraintSet::load(self, &template);

        let open = template
            .sorted_steps()
            .into_iter()
            .filter(|step| {
                step.attribute_ids
                    .iter()
                    .filter_map(|a| template.line(*a))
                    .any(|line| {
                        line.custom
                            || !restrict_line(line, value_ids, constraints.rules_for(line.attribute_id()))
                                .is_empty()
                    })
            })
            .cloned()
            .collect();
        Ok(open)
    }

    fn get_dependency_rules(&self, attribute_id: AttributeId) -> Vec<DependencyRule> {
        self.rules.get(&attribute_id).cloned().unwrap_or_default()
    }

    fn get_default_value(&self, attribute_id: AttributeId) -> Option<ValueId> {
        self.defaults.get(&attribute_id).copied()
    }

    fn get_value(&self, value_id: ValueId) -> Option<AttributeValue> {
        self.values.get(&value_id).cloned()
    }
}
