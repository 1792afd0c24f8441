//! Product variants and the order lines they end up on

use crate::{CustomValue, OrderId, OrderLineId, ProductId, TemplateId, ValueId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A concrete, purchasable product produced by a complete configuration
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub template_id: TemplateId,
    pub value_ids: BTreeSet<ValueId>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub custom_values: Vec<CustomValue>,
    pub display_name: String,
}

/// Where a finished configuration is attached
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum OrderTarget {
    /// Add a new line to this order
    Order(OrderId),
    /// Overwrite the product of an existing line
    Line(OrderLineId),
}

/// Values written on the order line for a configured product
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OrderLineValues {
    pub product_id: ProductId,
    /// Line description; only set for newly created lines
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl OrderLineValues {
    pub fn for_product(product: &Product, new_line: bool) -> Self {
        Self {
            product_id: product.id,
            name: new_line.then(|| product.display_name.clone()),
        }
    }
}
