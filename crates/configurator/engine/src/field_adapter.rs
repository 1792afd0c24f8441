//! Field adapter: converts between dynamic field values and the
//! persisted session form
//!
//! The session stores a flat value id set plus custom values. The view
//! works with one [`FieldValue`] per field. For every line exactly one
//! of the following holds after a save: a listed value is stored, a
//! custom value is stored, or nothing is stored. The custom option is
//! a view-only marker and never lands in `value_ids`.

use configurator_types::{
    AttributeLine, ConfigurationSession, ConfiguratorError, ConfiguratorResult, CustomValue,
    FieldId, FieldKind, FieldValue, ProductTemplate, ValueId,
};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Clone, Copy, Debug)]
pub struct FieldAdapter {
    custom_option_id: ValueId,
}

impl FieldAdapter {
    pub fn new(custom_option_id: ValueId) -> Self {
        Self { custom_option_id }
    }

    // ── Read ─────────────────────────────────────────────────────────

    /// Project the session onto field values.
    ///
    /// Lines holding more than one value while being single-valued are
    /// skipped with a warning; the rest of the map is still returned.
    pub fn load(
        &self,
        template: &ProductTemplate,
        session: &ConfigurationSession,
    ) -> BTreeMap<FieldId, FieldValue> {
        let mut values = BTreeMap::new();

        for line in template.sorted_lines() {
            let attribute_id = line.attribute_id();
            values.insert(
                FieldId::mode(attribute_id),
                FieldValue::Text(line.display_mode.key().to_string()),
            );

            if let Some(custom) = session.custom_value(attribute_id).filter(|_| line.custom) {
                let marker = if line.multi {
                    FieldValue::Multi([self.custom_option_id].into_iter().collect())
                } else {
                    FieldValue::Single(self.custom_option_id)
                };
                values.insert(FieldId::attribute(attribute_id), marker);
                values.insert(FieldId::custom(attribute_id), custom_field_value(line, custom));
                continue;
            }

            let selected: BTreeSet<ValueId> = line
                .value_ids
                .iter()
                .copied()
                .filter(|v| session.value_ids.contains(v))
                .collect();

            let value = if line.multi {
                FieldValue::Multi(selected)
            } else {
                match selected.len() {
                    0 => FieldValue::Empty,
                    1 => selected
                        .into_iter()
                        .next()
                        .map(FieldValue::Single)
                        .unwrap_or_default(),
                    n => {
                        tracing::warn!(
                            session_id = %session.id,
                            attribute_id = %attribute_id,
                            stored = n,
                            "Single-valued line holds several values; skipped"
                        );
                        continue;
                    }
                }
            };
            values.insert(FieldId::attribute(attribute_id), value);
            if line.custom {
                values.insert(FieldId::custom(attribute_id), FieldValue::Empty);
            }
        }

        values
    }

    // ── Write ────────────────────────────────────────────────────────

    /// Apply field edits to the session.
    ///
    /// Atomic: either every edit is applied or the session is untouched.
    pub fn save(
        &self,
        template: &ProductTemplate,
        session: &mut ConfigurationSession,
        edits: &BTreeMap<FieldId, FieldValue>,
    ) -> ConfiguratorResult<()> {
        for field in edits.keys() {
            if template.line(field.attribute_id).is_none() {
                return Err(ConfiguratorError::UnknownAttribute {
                    template: template.id,
                    attribute: field.attribute_id,
                });
            }
        }

        let mut staged = session.clone();

        for line in template.sorted_lines() {
            let attribute_id = line.attribute_id();
            let field_edit = edits.get(&FieldId::attribute(attribute_id));
            let custom_edit = edits.get(&FieldId::custom(attribute_id));
            if field_edit.is_none() && custom_edit.is_none() {
                continue;
            }
            if custom_edit.is_some() && !line.custom {
                return Err(ConfiguratorError::malformed(
                    FieldId::custom(attribute_id),
                    "line does not accept custom values",
                ));
            }

            match field_edit {
                Some(value) if self.is_custom_choice(value) && value.value_ids().len() > 1 => {
                    return Err(ConfiguratorError::malformed(
                        FieldId::attribute(attribute_id),
                        "custom option cannot be combined with listed values",
                    ));
                }
                Some(value) if !self.is_custom_choice(value) => {
                    let ids = self.decode_selection(line, value)?;
                    staged.value_ids.retain(|v| !line.allows(*v));
                    staged.value_ids.extend(ids);
                    staged.set_custom_value(attribute_id, None);
                }
                _ => {
                    if !line.custom {
                        return Err(ConfiguratorError::malformed(
                            FieldId::attribute(attribute_id),
                            "custom option chosen on a line without custom values",
                        ));
                    }
                    let custom = match custom_edit {
                        Some(value) => decode_custom(line, value)?,
                        None => staged
                            .custom_value(attribute_id)
                            .cloned()
                            .unwrap_or(CustomValue {
                                attribute_id,
                                value: None,
                                attachment_ids: Vec::new(),
                            }),
                    };
                    staged.value_ids.retain(|v| !line.allows(*v));
                    staged.set_custom_value(attribute_id, Some(custom));
                }
            }
        }

        staged.value_ids.remove(&self.custom_option_id);
        staged.touch();
        *session = staged;
        Ok(())
    }

    fn is_custom_choice(&self, value: &FieldValue) -> bool {
        value.contains(self.custom_option_id)
    }

    fn decode_selection(
        &self,
        line: &AttributeLine,
        value: &FieldValue,
    ) -> ConfiguratorResult<BTreeSet<ValueId>> {
        let field = FieldId::attribute(line.attribute_id());
        let ids = match (value, line.multi) {
            (FieldValue::Empty, _) => BTreeSet::new(),
            (FieldValue::Single(id), false) => [*id].into_iter().collect(),
            (FieldValue::Multi(ids), true) => ids.clone(),
            (other, true) => {
                return Err(ConfiguratorError::malformed(
                    field,
                    format!("expected a value list, got {}", other.shape()),
                ))
            }
            (other, false) => {
                return Err(ConfiguratorError::malformed(
                    field,
                    format!("expected a single value, got {}", other.shape()),
                ))
            }
        };
        if let Some(foreign) = ids.iter().find(|v| !line.allows(**v)) {
            return Err(ConfiguratorError::malformed(
                field,
                format!("value {} does not belong to the line", foreign),
            ));
        }
        Ok(ids)
    }
}

/// View value of a stored custom value
fn custom_field_value(line: &AttributeLine, custom: &CustomValue) -> FieldValue {
    if line.attribute.custom_type.is_binary() {
        return FieldValue::Attachments(custom.attachment_ids.clone());
    }
    custom
        .value
        .clone()
        .map(FieldValue::Text)
        .unwrap_or_default()
}

fn decode_custom(line: &AttributeLine, value: &FieldValue) -> ConfiguratorResult<CustomValue> {
    let attribute_id = line.attribute_id();
    let binary = line.attribute.custom_type.is_binary();
    match (value, binary) {
        (FieldValue::Empty, _) => Ok(CustomValue {
            attribute_id,
            value: None,
            attachment_ids: Vec::new(),
        }),
        (FieldValue::Text(text), false) => Ok(CustomValue::text(attribute_id, text.clone())),
        (FieldValue::Attachments(ids), true) => {
            Ok(CustomValue::attachments(attribute_id, ids.clone()))
        }
        (other, _) => Err(ConfiguratorError::malformed(
            FieldId::new(attribute_id, FieldKind::Custom),
            format!(
                "expected {}, got {}",
                if binary { "attachments" } else { "text" },
                other.shape()
            ),
        )),
    }
}
