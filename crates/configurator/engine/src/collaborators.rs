//! Outbound collaborators: variant factory, order sink and view renderer
//!
//! These are traits so that the engine can be driven by in-memory
//! implementations in tests and demos while a host plugs in its own
//! product and order storage.

use configurator_types::{
    ConfiguratorError, ConfiguratorResult, CustomValue, LayoutNode, OrderId, OrderLineId,
    OrderLineValues, OrderTarget, Product, ProductId, TemplateId, ValueId,
};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

// ── Variant Factory ──────────────────────────────────────────────────

/// Everything needed to find or create the variant of a configuration
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VariantRequest {
    pub template_id: TemplateId,
    pub value_ids: BTreeSet<ValueId>,
    pub custom_values: Vec<CustomValue>,
    pub display_name: String,
}

/// Creates (or reuses) concrete product variants.
pub trait VariantFactory: Send + Sync {
    /// Return the variant matching the request, creating it if needed.
    fn create_or_get_variant(&self, request: &VariantRequest) -> ConfiguratorResult<Product>;

    /// Look up an existing variant, e.g. to reconfigure it.
    fn get_variant(&self, id: ProductId) -> ConfiguratorResult<Product>;
}

/// Variant store kept in memory.
///
/// Requests with the same template, values and custom values map to the
/// same variant.
pub struct InMemoryVariantFactory {
    products: RwLock<BTreeMap<ProductId, Product>>,
    next_id: RwLock<u64>,
}

impl InMemoryVariantFactory {
    pub fn new() -> Self {
        Self {
            products: RwLock::new(BTreeMap::new()),
            next_id: RwLock::new(1),
        }
    }

    /// Seed an existing variant
    pub fn insert(&self, product: Product) {
        let mut products = self.products.write();
        let mut next = self.next_id.write();
        *next = (*next).max(product.id.get() + 1);
        products.insert(product.id, product);
    }

    pub fn products(&self) -> Vec<Product> {
        self.products.read().values().cloned().collect()
    }

    pub fn count(&self) -> usize {
        self.products.read().len()
    }
}

impl Default for InMemoryVariantFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl VariantFactory for InMemoryVariantFactory {
    fn create_or_get_variant(&self, request: &VariantRequest) -> ConfiguratorResult<Product> {
        if request.value_ids.is_empty() && request.custom_values.is_empty() {
            return Err(ConfiguratorError::InvalidConfiguration(
                "cannot create a variant without any attribute value".into(),
            ));
        }

        let mut products = self.products.write();
        if let Some(existing) = products.values().find(|p| {
            p.template_id == request.template_id
                && p.value_ids == request.value_ids
                && p.custom_values == request.custom_values
        }) {
            return Ok(existing.clone());
        }

        let mut next = self.next_id.write();
        let product = Product {
            id: ProductId(*next),
            template_id: request.template_id,
            value_ids: request.value_ids.clone(),
            custom_values: request.custom_values.clone(),
            display_name: request.display_name.clone(),
        };
        *next += 1;
        products.insert(product.id, product.clone());
        tracing::info!(product_id = %product.id, name = %product.display_name, "Variant created");
        Ok(product)
    }

    fn get_variant(&self, id: ProductId) -> ConfiguratorResult<Product> {
        self.products
            .read()
            .get(&id)
            .cloned()
            .ok_or(ConfiguratorError::ProductNotFound(id))
    }
}

// ── Order Sink ───────────────────────────────────────────────────────

/// Receives finished configurations.
pub trait OrderSink: Send + Sync {
    /// Add a line to an order or overwrite an existing line.
    fn attach_to_order(
        &self,
        target: OrderTarget,
        values: &OrderLineValues,
    ) -> ConfiguratorResult<OrderLineId>;
}

/// A line of an in-memory order
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OrderLine {
    pub id: OrderLineId,
    pub order_id: OrderId,
    pub product_id: ProductId,
    pub name: String,
}

/// Orders kept in memory, keyed by line id
pub struct InMemoryOrderBook {
    lines: RwLock<BTreeMap<OrderLineId, OrderLine>>,
    next_id: RwLock<u64>,
}

impl InMemoryOrderBook {
    pub fn new() -> Self {
        Self {
            lines: RwLock::new(BTreeMap::new()),
            next_id: RwLock::new(1),
        }
    }

    /// Seed an existing order line
    pub fn insert(&self, line: OrderLine) {
        let mut lines = self.lines.write();
        let mut next = self.next_id.write();
        *next = (*next).max(line.id.get() + 1);
        lines.insert(line.id, line);
    }

    pub fn line(&self, id: OrderLineId) -> Option<OrderLine> {
        self.lines.read().get(&id).cloned()
    }

    /// Lines of an order in creation order
    pub fn lines_of(&self, order_id: OrderId) -> Vec<OrderLine> {
        self.lines
            .read()
            .values()
            .filter(|l| l.order_id == order_id)
            .cloned()
            .collect()
    }
}

impl Default for InMemoryOrderBook {
    fn default() -> Self {
        Self::new()
    }
}

impl OrderSink for InMemoryOrderBook {
    fn attach_to_order(
        &self,
        target: OrderTarget,
        values: &OrderLineValues,
    ) -> ConfiguratorResult<OrderLineId> {
        let mut lines = self.lines.write();
        match target {
            OrderTarget::Line(id) => {
                let line = lines.get_mut(&id).ok_or_else(|| {
                    ConfiguratorError::Collaborator(format!("order line {} not found", id))
                })?;
                line.product_id = values.product_id;
                if let Some(name) = &values.name {
                    line.name = name.clone();
                }
                Ok(id)
            }
            OrderTarget::Order(order_id) => {
                let mut next = self.next_id.write();
                let id = OrderLineId(*next);
                *next += 1;
                lines.insert(
                    id,
                    OrderLine {
                        id,
                        order_id,
                        product_id: values.product_id,
                        name: values.name.clone().unwrap_or_default(),
                    },
                );
                Ok(id)
            }
        }
    }
}

// ── View Renderer ────────────────────────────────────────────────────

/// Turns a materialized layout into the host's view format.
pub trait ViewRenderer {
    type Output;

    fn render(&self, layout: &LayoutNode) -> ConfiguratorResult<Self::Output>;
}

/// Renders layouts as JSON documents
#[derive(Clone, Copy, Debug, Default)]
pub struct JsonViewRenderer {
    pretty: bool,
}

impl JsonViewRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pretty() -> Self {
        Self { pretty: true }
    }
}

impl ViewRenderer for JsonViewRenderer {
    type Output = String;

    fn render(&self, layout: &LayoutNode) -> ConfiguratorResult<String> {
        let rendered = if self.pretty {
            serde_json::to_string_pretty(layout)
        } else {
            serde_json::to_string(layout)
        };
        rendered.map_err(|e| ConfiguratorError::ViewRenderingError(e.to_string()))
    }
}
