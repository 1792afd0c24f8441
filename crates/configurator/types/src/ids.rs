//! Identifiers for configurator records
//!
//! Numeric ids mirror the host's relational keys. Sessions are the only
//! records the engine mints itself, so they use a generated UUID.

use serde::{Deserialize, Serialize};

macro_rules! record_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl $name {
            pub fn new(id: u64) -> Self {
                Self(id)
            }

            pub fn get(&self) -> u64 {
                self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<u64> for $name {
            fn from(id: u64) -> Self {
                Self(id)
            }
        }
    };
}

record_id!(
    /// Product template id
    TemplateId
);
record_id!(
    /// Product attribute id (e.g. "Color")
    AttributeId
);
record_id!(
    /// Product attribute value id (e.g. "Red")
    ValueId
);
record_id!(
    /// Configuration step line id
    StepLineId
);
record_id!(
    /// Concrete product variant id
    ProductId
);
record_id!(
    /// Sales order id
    OrderId
);
record_id!(
    /// Sales order line id
    OrderLineId
);
record_id!(
    /// Stored attachment id (binary custom values)
    AttachmentId
);

// ── Session Identifier ───────────────────────────────────────────────

/// Unique identifier for a configuration session
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SessionId(pub String);

impl SessionId {
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn short(&self) -> &str {
        &self.0[..8.min(self.0.len())]
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
