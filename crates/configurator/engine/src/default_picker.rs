//! Default picker: chooses the value a field falls back to

use configurator_types::ValueId;
use std::collections::BTreeSet;

/// Picks defaults among available values.
///
/// The attribute's designated default wins when it is available;
/// otherwise the lowest available id is taken. The custom option is
/// never picked.
#[derive(Clone, Copy, Debug)]
pub struct DefaultPicker {
    custom_option_id: ValueId,
}

impl DefaultPicker {
    pub fn new(custom_option_id: ValueId) -> Self {
        Self { custom_option_id }
    }

    pub fn pick_default(
        &self,
        available: &BTreeSet<ValueId>,
        designated: Option<ValueId>,
    ) -> Option<ValueId> {
        let mut candidates = available
            .iter()
            .copied()
            .filter(|v| *v != self.custom_option_id);

        match designated {
            Some(value) if value != self.custom_option_id && available.contains(&value) => {
                Some(value)
            }
            _ => candidates.next(),
        }
    }
}
