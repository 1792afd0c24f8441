//! Error types for the configurator layer

use crate::{AttributeId, FieldId, ProductId, SessionId, TemplateId};

/// Errors that can occur in configurator operations
#[derive(Debug, thiserror::Error)]
pub enum ConfiguratorError {
    /// A mutation would break a session invariant (e.g. swapping the
    /// template underneath existing selections)
    #[error("Configuration conflict: {0}")]
    ConfigurationConflict(String),

    /// An edit does not match the cardinality/type of its field
    #[error("Malformed value for field {field}: {reason}")]
    MalformedFieldValue { field: FieldId, reason: String },

    /// Finalization attempted with an incomplete or contradictory selection
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// The base layout lacks the anchor the dynamic form hangs off
    #[error("There was a problem rendering the view: {0}")]
    ViewRenderingError(String),

    #[error("Product template not found: {0}")]
    TemplateNotFound(TemplateId),

    #[error("Configuration session not found: {0}")]
    SessionNotFound(SessionId),

    #[error("Product variant not found: {0}")]
    ProductNotFound(ProductId),

    #[error("Attribute {attribute} is not configurable on template {template}")]
    UnknownAttribute {
        template: TemplateId,
        attribute: AttributeId,
    },

    #[error("Invalid wizard state '{0}'")]
    InvalidState(String),

    #[error("No product template assigned to session {0}")]
    TemplateNotAssigned(SessionId),

    #[error("Template validation error: {0}")]
    TemplateValidation(String),

    #[error("Configuration error: {0}")]
    Config(String),

    /// An external collaborator (variant factory, order sink, renderer) failed
    #[error("Collaborator failure: {0}")]
    Collaborator(String),
}

impl ConfiguratorError {
    pub fn malformed(field: FieldId, reason: impl Into<String>) -> Self {
        Self::MalformedFieldValue {
            field,
            reason: reason.into(),
        }
    }

    /// Errors the user can fix by editing the configuration and retrying
    pub fn is_user_recoverable(&self) -> bool {
        matches!(
            self,
            Self::InvalidConfiguration(_) | Self::MalformedFieldValue { .. }
        )
    }
}

/// Result type alias for configurator operations
pub type ConfiguratorResult<T> = Result<T, ConfiguratorError>;
