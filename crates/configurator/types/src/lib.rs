//! Product Configurator Domain Types
//!
//! A product configurator turns a configurable product template into a
//! concrete variant by walking the user through a wizard. These are the
//! types shared by the engine and its host.
//!
//! # Key Concepts
//!
//! - **ProductTemplate**: ordered attribute lines (configurable dimensions)
//!   and optional step lines grouping them into wizard pages.
//! - **DependencyRule**: a requires/excludes constraint making one line's
//!   values conditional on another line's selection.
//! - **ConfigurationSession**: the persisted wizard state, with selections
//!   kept compact as a value id set plus custom values.
//! - **FieldId / FieldDescriptor / FieldValue**: the dynamic form fields
//!   derived from attribute lines for a single request; never stored.
//! - **LayoutNode**: the serializable layout tree handed to the renderer.
//! - **WizardConfig**: engine settings, loaded from TOML.
//!
//! # Design Principles
//!
//! 1. Template metadata is immutable to the wizard.
//! 2. Field identity is a typed key, never a string convention.
//! 3. Sessions hold the only mutable state.

#![deny(unsafe_code)]

mod config;
mod display;
mod errors;
mod field;
mod ids;
mod layout;
mod rule;
mod session;
mod template;
mod variant;

pub use config::*;
pub use display::*;
pub use errors::*;
pub use field::*;
pub use ids::*;
pub use layout::*;
pub use rule::*;
pub use session::*;
pub use template::*;
pub use variant::*;
