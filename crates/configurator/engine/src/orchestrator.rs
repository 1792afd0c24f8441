//! Configurator engine: the entry point a host drives
//!
//! The engine owns the open configuration sessions and composes the
//! specialised components:
//! 1. Assigns templates and navigates steps
//! 2. Synthesizes dynamic fields and propagates edits
//! 3. Loads and saves field values
//! 4. Materializes the dynamic form into the host layout
//! 5. Finalizes sessions into variants attached to orders
//!
//! Template metadata is only ever read through the [`TemplateCatalog`].
//! Sessions are the only mutable state.

use crate::catalog::TemplateCatalog;
use crate::collaborators::{OrderSink, VariantFactory, VariantRequest, ViewRenderer};
use crate::domain_resolver::{ConstraintSet, DomainResolver};
use crate::field_adapter::FieldAdapter;
use crate::propagation::{PropagationOutcome, Propagator};
use crate::state_machine::{Direction, StepNavigator, Transition};
use crate::synthesizer::FieldSynthesizer;
use crate::view_materializer::ViewMaterializer;
use configurator_types::*;
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Result of an `advance` request
#[derive(Clone, Debug, PartialEq)]
pub enum AdvanceOutcome {
    /// The session moved to another page
    Moved(WizardState),
    /// The session was finalized and removed
    Completed(Completion),
}

/// A finalized configuration
#[derive(Clone, Debug, PartialEq)]
pub struct Completion {
    pub product: Product,
    /// Order line written, when the session was launched from an order
    pub order_line_id: Option<OrderLineId>,
}

/// The configurator engine
pub struct ConfiguratorEngine<C, V, O> {
    config: WizardConfig,
    catalog: C,
    variants: V,
    orders: O,
    sessions: HashMap<SessionId, ConfigurationSession>,
    resolver: DomainResolver,
    synthesizer: FieldSynthesizer,
    propagator: Propagator,
    adapter: FieldAdapter,
    navigator: StepNavigator,
    materializer: ViewMaterializer,
}

impl<C, V, O> ConfiguratorEngine<C, V, O>
where
    C: TemplateCatalog,
    V: VariantFactory,
    O: OrderSink,
{
    /// Create an engine over the given collaborators
    pub fn new(config: WizardConfig, catalog: C, variants: V, orders: O) -> ConfiguratorResult<Self> {
        config.validate()?;
        let resolver = DomainResolver::new(config.custom_option_id);
        Ok(Self {
            resolver,
            synthesizer: FieldSynthesizer::new(resolver),
            propagator: Propagator::new(&config),
            adapter: FieldAdapter::new(config.custom_option_id),
            navigator: StepNavigator::new(),
            materializer: ViewMaterializer::new(&config),
            config,
            catalog,
            variants,
            orders,
            sessions: HashMap::new(),
        })
    }

    pub fn config(&self) -> &WizardConfig {
        &self.config
    }

    pub fn catalog(&self) -> &C {
        &self.catalog
    }

    pub fn variants(&self) -> &V {
        &self.variants
    }

    pub fn orders(&self) -> &O {
        &self.orders
    }

    // ── Session Lifecycle ────────────────────────────────────────────

    /// Open an empty session in the `select` state
    pub fn open_session(&mut self) -> SessionId {
        self.insert_session(ConfigurationSession::new())
    }

    /// Open a session whose result is added to `order_id`
    pub fn open_session_for_order(&mut self, order_id: OrderId) -> SessionId {
        self.insert_session(ConfigurationSession::new().with_order(order_id))
    }

    /// Open a session reconfiguring an existing variant.
    ///
    /// The session starts from the variant's template, values and custom
    /// values. With `order_line_id` the finished product replaces the one
    /// on that line.
    pub fn open_for_product(
        &mut self,
        product_id: ProductId,
        order_line_id: Option<OrderLineId>,
    ) -> ConfiguratorResult<SessionId> {
        let product = self.variants.get_variant(product_id)?;
        let template = self.load_template(product.template_id)?;

        let mut session = ConfigurationSession::new();
        session.product_tmpl_id = Some(template.id);
        session.value_ids = product.value_ids;
        session.custom_values = product.custom_values;
        session.product_id = Some(product_id);
        session.order_line_id = order_line_id;

        let open = self.open_steps(&template, &session.value_ids)?;
        session.state = self.navigator.initial_state(&template, &open);

        tracing::info!(
            session_id = %session.id,
            product_id = %product_id,
            template_id = %template.id,
            "Reconfiguration session opened"
        );
        Ok(self.insert_session(session))
    }

    /// Resume a previously persisted session
    pub fn restore_session(&mut self, session: ConfigurationSession) -> ConfiguratorResult<SessionId> {
        if let Some(template_id) = session.product_tmpl_id {
            let template = self.load_template(template_id)?;
            session.state.validate_for(&template)?;
        }
        Ok(self.insert_session(session))
    }

    pub fn session(&self, id: &SessionId) -> ConfiguratorResult<&ConfigurationSession> {
        self.sessions
            .get(id)
            .ok_or_else(|| ConfiguratorError::SessionNotFound(id.clone()))
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// Drop a session without producing anything
    pub fn discard_session(&mut self, id: &SessionId) -> ConfiguratorResult<ConfigurationSession> {
        let session = self
            .sessions
            .remove(id)
            .ok_or_else(|| ConfiguratorError::SessionNotFound(id.clone()))?;
        tracing::info!(session_id = %id, "Configuration session discarded");
        Ok(session)
    }

    /// Choose the template to configure.
    ///
    /// Re-assigning the same template is a no-op. Switching templates is
    /// only allowed while the session holds no selections.
    pub fn assign_template(
        &mut self,
        id: &SessionId,
        template_id: TemplateId,
    ) -> ConfiguratorResult<WizardState> {
        let template = self.load_template(template_id)?;
        let open = self.open_steps(&template, &BTreeSet::new())?;
        let initial = self.navigator.initial_state(&template, &open);

        let session = self.session_mut(id)?;
        match session.product_tmpl_id {
            Some(current) if current == template_id => return Ok(session.state),
            Some(current) if session.has_selections() => {
                return Err(ConfiguratorError::ConfigurationConflict(format!(
                    "session {} holds selections for template {}; clear them before switching to {}",
                    id, current, template_id
                )))
            }
            _ => {}
        }

        session.clear_selections();
        session.product_tmpl_id = Some(template_id);
        session.state = initial;
        session.touch();

        tracing::info!(
            session_id = %id,
            template_id = %template_id,
            state = %initial,
            "Template assigned"
        );
        Ok(initial)
    }

    // ── Fields ───────────────────────────────────────────────────────

    /// Dynamic field descriptors for the session's current state
    pub fn synthesize(&self, id: &SessionId) -> ConfiguratorResult<BTreeMap<FieldId, FieldDescriptor>> {
        let session = self.session(id)?;
        let Some(template_id) = session.product_tmpl_id else {
            return Ok(BTreeMap::new());
        };
        let template = self.load_template(template_id)?;
        let constraints = ConstraintSet::load(&self.catalog, &template);
        Ok(self.synthesizer.synthesize(&template, session, &constraints))
    }

    /// Current field values of the session
    pub fn load(&self, id: &SessionId) -> ConfiguratorResult<BTreeMap<FieldId, FieldValue>> {
        let session = self.session(id)?;
        let Some(template_id) = session.product_tmpl_id else {
            return Ok(BTreeMap::new());
        };
        let template = self.load_template(template_id)?;
        Ok(self.adapter.load(&template, session))
    }

    /// Persist field edits; all or nothing
    pub fn save(
        &mut self,
        id: &SessionId,
        edits: &BTreeMap<FieldId, FieldValue>,
    ) -> ConfiguratorResult<()> {
        let template = self.template_of(id)?;
        let adapter = self.adapter;
        let session = self.session_mut(id)?;
        adapter.save(&template, session, edits)?;
        tracing::debug!(session_id = %id, edits = edits.len(), "Field values saved");
        Ok(())
    }

    /// Propagate one field edit against the values shown in the view
    pub fn propagate(
        &self,
        id: &SessionId,
        view_values: &BTreeMap<FieldId, FieldValue>,
        edited_field: FieldId,
        edited_value: FieldValue,
    ) -> ConfiguratorResult<PropagationOutcome> {
        let session = self.session(id)?;
        let template = self.template_of(id)?;
        let constraints = ConstraintSet::load(&self.catalog, &template);
        self.propagator.propagate(
            &template,
            session,
            &constraints,
            view_values,
            edited_field,
            edited_value,
        )
    }

    // ── Navigation ───────────────────────────────────────────────────

    /// States the host may offer for the session, in wizard order
    pub fn state_selection(&self, id: &SessionId) -> ConfiguratorResult<Vec<(WizardState, String)>> {
        let session = self.session(id)?;
        let open = match session.product_tmpl_id {
            Some(template_id) => {
                let template = self.load_template(template_id)?;
                self.open_steps(&template, &session.value_ids)?
            }
            None => Vec::new(),
        };
        Ok(self.navigator.state_selection(session, &open))
    }

    /// Move to the next or previous page; finalizes past the last page
    pub fn advance(&mut self, id: &SessionId, direction: Direction) -> ConfiguratorResult<AdvanceOutcome> {
        let session = self.session(id)?;
        if session.product_tmpl_id.is_none() && direction == Direction::Next {
            return Err(ConfiguratorError::TemplateNotAssigned(id.clone()));
        }

        let transition = match session.product_tmpl_id {
            Some(template_id) => {
                let template = self.load_template(template_id)?;
                let open = self.open_steps(&template, &session.value_ids)?;
                self.navigator.navigate(&template, session, &open, direction)
            }
            None => Transition::Moved {
                from: session.state,
                to: WizardState::Select,
            },
        };

        match transition {
            Transition::Moved { from, to } => {
                let session = self.session_mut(id)?;
                session.state = to;
                session.touch();
                tracing::info!(
                    session_id = %id,
                    direction = %direction,
                    from = %from,
                    to = %to,
                    "Wizard state changed"
                );
                Ok(AdvanceOutcome::Moved(to))
            }
            Transition::Finalize => self.finalize(id).map(AdvanceOutcome::Completed),
        }
    }

    /// Turn the session into a variant and attach it to its order.
    ///
    /// The session is removed only once every collaborator succeeded; on
    /// any failure it stays as it was.
    pub fn finalize(&mut self, id: &SessionId) -> ConfiguratorResult<Completion> {
        let session = self.session(id)?;
        let template = self.template_of(id)?;
        let constraints = ConstraintSet::load(&self.catalog, &template);
        self.check_complete(&template, session, &constraints)?;

        let display_name = variant_display_name(
            &template,
            &session.value_ids,
            &session.custom_values,
            |v| self.catalog.value_name(v),
        );
        let request = VariantRequest {
            template_id: template.id,
            value_ids: session.value_ids.clone(),
            custom_values: session.custom_values.clone(),
            display_name,
        };
        let product = self.variants.create_or_get_variant(&request)?;

        let order_line_id = match session.order_target() {
            Some(target) => {
                let new_line = matches!(target, OrderTarget::Order(_));
                let values = OrderLineValues::for_product(&product, new_line);
                Some(self.orders.attach_to_order(target, &values)?)
            }
            None => None,
        };

        self.sessions.remove(id);
        tracing::info!(
            session_id = %id,
            product_id = %product.id,
            name = %product.display_name,
            "Configuration completed"
        );
        Ok(Completion {
            product,
            order_line_id,
        })
    }

    // ── Views ────────────────────────────────────────────────────────

    /// Insert the session's dynamic form into `base`.
    ///
    /// Stored values no longer compatible with the rules are repaired and
    /// saved first, the same way an edit would repair them.
    pub fn materialize(&mut self, id: &SessionId, base: &LayoutNode) -> ConfiguratorResult<LayoutNode> {
        let session = self.session(id)?;
        let Some(template_id) = session.product_tmpl_id else {
            return Ok(base.clone());
        };
        let template = self.load_template(template_id)?;
        let constraints = ConstraintSet::load(&self.catalog, &template);

        let repairs = self.propagator.normalize(&template, session, &constraints);
        if !repairs.is_quiet() {
            tracing::debug!(
                session_id = %id,
                repaired = repairs.updated_values.len(),
                "Stale selections repaired before rendering"
            );
            let adapter = self.adapter;
            let session = self.session_mut(id)?;
            adapter.save(&template, session, &repairs.updated_values)?;
        }

        let fields = self.synthesizer.synthesize(&template, self.session(id)?, &constraints);
        self.materializer
            .materialize(base, &template, &fields, &constraints)
    }

    /// Materialize and hand the layout to a renderer
    pub fn render<R: ViewRenderer>(
        &mut self,
        id: &SessionId,
        base: &LayoutNode,
        renderer: &R,
    ) -> ConfiguratorResult<R::Output> {
        let layout = self.materialize(id, base)?;
        renderer.render(&layout)
    }

    // ── Internals ────────────────────────────────────────────────────

    fn insert_session(&mut self, session: ConfigurationSession) -> SessionId {
        let id = session.id.clone();
        tracing::info!(session_id = %id, state = %session.state, "Configuration session opened");
        self.sessions.insert(id.clone(), session);
        id
    }

    fn session_mut(&mut self, id: &SessionId) -> ConfiguratorResult<&mut ConfigurationSession> {
        self.sessions
            .get_mut(id)
            .ok_or_else(|| ConfiguratorError::SessionNotFound(id.clone()))
    }

    fn template_of(&self, id: &SessionId) -> ConfiguratorResult<ProductTemplate> {
        let template_id = self
            .session(id)?
            .product_tmpl_id
            .ok_or_else(|| ConfiguratorError::TemplateNotAssigned(id.clone()))?;
        self.load_template(template_id)
    }

    /// Fetch a template; templates listing the custom option marker as a
    /// real value are rejected
    fn load_template(&self, template_id: TemplateId) -> ConfiguratorResult<ProductTemplate> {
        let template = self.catalog.get_template(template_id)?;
        template.check_reserved_value(self.config.custom_option_id)?;
        Ok(template)
    }

    fn open_steps(
        &self,
        template: &ProductTemplate,
        value_ids: &BTreeSet<ValueId>,
    ) -> ConfiguratorResult<Vec<ConfigStepLine>> {
        if !template.has_steps() {
            return Ok(Vec::new());
        }
        self.catalog.get_open_steps(template.id, value_ids)
    }

    /// Every required line that is still reachable must hold a value, and
    /// every stored value must be compatible with the rest
    fn check_complete(
        &self,
        template: &ProductTemplate,
        session: &ConfigurationSession,
        constraints: &ConstraintSet,
    ) -> ConfiguratorResult<()> {
        // With every step closed the wizard shows all lines on one page
        let open = self.open_steps(template, &session.value_ids)?;
        let reachable = |line: &AttributeLine| {
            open.is_empty() || open.iter().any(|s| s.governs(line.attribute_id()))
        };

        for line in template.sorted_lines() {
            let attribute_id = line.attribute_id();
            let stored: Vec<ValueId> = line
                .value_ids
                .iter()
                .copied()
                .filter(|v| session.value_ids.contains(v))
                .collect();
            let custom = session.custom_value(attribute_id).filter(|_| line.custom);
            let has_custom = custom.is_some_and(|c| !c.is_blank(line.attribute.custom_type));

            if custom.is_some() && !has_custom && reachable(line) {
                return Err(ConfiguratorError::InvalidConfiguration(format!(
                    "a custom value is required for {}",
                    line.attribute.name
                )));
            }
            if line.required && reachable(line) && stored.is_empty() && !has_custom {
                return Err(ConfiguratorError::InvalidConfiguration(format!(
                    "a value is required for {}",
                    line.attribute.name
                )));
            }
            if !line.multi && stored.len() > 1 {
                return Err(ConfiguratorError::InvalidConfiguration(format!(
                    "{} accepts a single value",
                    line.attribute.name
                )));
            }
            let domain = self
                .resolver
                .available_values(line, &session.value_ids, constraints);
            if let Some(value) = stored.iter().find(|v| !domain.contains(v)) {
                return Err(ConfiguratorError::InvalidConfiguration(format!(
                    "value {} of {} is not compatible with the other selections",
                    value, line.attribute.name
                )));
            }
        }
        Ok(())
    }
}
