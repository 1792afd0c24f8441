//! Product Configurator Wizard Engine
//!
//! Drives a configuration session from template selection to a finished
//! product variant. Dynamic form fields are derived from the template's
//! attribute lines, every edit is propagated through the dependency
//! rules until the selection is consistent again, and the session moves
//! through the template's steps until it can be finalized.
//!
//! # Architecture
//!
//! The [`ConfiguratorEngine`] composes specialized components:
//!
//! - [`DomainResolver`]: Available values per line under the current selection
//! - [`DefaultPicker`]: Fallback value for fields whose value became invalid
//! - [`FieldSynthesizer`]: Field descriptors for a session
//! - [`Propagator`]: Fixed-point propagation of a single edit
//! - [`StepNavigator`]: Next/previous navigation over open steps
//! - [`FieldAdapter`]: Load/save between fields and the persisted session
//! - [`ViewMaterializer`]: Inserts the dynamic form into the host layout
//!
//! Collaborators live behind traits: [`TemplateCatalog`] for metadata,
//! [`VariantFactory`] and [`OrderSink`] for finalization, and
//! [`ViewRenderer`] for the host's view format. In-memory implementations
//! of each are provided.
//!
//! # Example
//!
//! ```rust
//! use configurator_engine::*;
//! use configurator_types::*;
//!
//! let template = ProductTemplate::new(TemplateId(1), "Mug").with_line(
//!     AttributeLine::new(Attribute::new(AttributeId(1), "Size"), [ValueId(1), ValueId(2)])
//!         .required(),
//! );
//! let catalog = InMemoryCatalog::new()
//!     .with_template(template)
//!     .unwrap()
//!     .with_value(AttributeValue::new(ValueId(2), AttributeId(1), "Large"));
//!
//! let mut engine = ConfiguratorEngine::new(
//!     WizardConfig::default(),
//!     catalog,
//!     InMemoryVariantFactory::new(),
//!     InMemoryOrderBook::new(),
//! )
//! .unwrap();
//!
//! let session = engine.open_session_for_order(OrderId(7));
//! engine.assign_template(&session, TemplateId(1)).unwrap();
//!
//! let edits = [(FieldId::attribute(AttributeId(1)), FieldValue::Single(ValueId(2)))]
//!     .into_iter()
//!     .collect();
//! engine.save(&session, &edits).unwrap();
//!
//! match engine.advance(&session, Direction::Next).unwrap() {
//!     AdvanceOutcome::Completed(done) => assert_eq!(done.product.display_name, "Mug (Large)"),
//!     other => panic!("unexpected {:?}", other),
//! }
//! ```

#![deny(unsafe_code)]

pub mod catalog;
pub mod collaborators;
pub mod default_picker;
pub mod domain_resolver;
pub mod field_adapter;
pub mod orchestrator;
pub mod propagation;
pub mod state_machine;
pub mod synthesizer;
pub mod view_materializer;

pub use catalog::{CatalogData, DefaultValue, InMemoryCatalog, TemplateCatalog};
pub use collaborators::{
    InMemoryOrderBook, InMemoryVariantFactory, JsonViewRenderer, OrderLine, OrderSink,
    VariantFactory, VariantRequest, ViewRenderer,
};
pub use default_picker::DefaultPicker;
pub use domain_resolver::{restrict_line, ConstraintSet, DomainResolver};
pub use field_adapter::FieldAdapter;
pub use orchestrator::{AdvanceOutcome, Completion, ConfiguratorEngine};
pub use propagation::{PropagationOutcome, Propagator};
pub use state_machine::{active_step, Direction, StepNavigator, Transition};
pub use synthesizer::FieldSynthesizer;
pub use view_materializer::ViewMaterializer;
